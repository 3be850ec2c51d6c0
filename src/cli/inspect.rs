//! The component run by the `chassis` binary.

use super::Command;
use crate::config::CombinedConfig;
use crate::error::ConfigError;
use crate::format::{format_entries, format_lookup};
use crate::lifecycle::{Configurator, Runnable};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Prints configuration keys or the value of one path.
#[derive(Debug, Default)]
pub struct Inspector {
    command: Command,
    config: Option<Arc<CombinedConfig>>,
}

impl Inspector {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            config: None,
        }
    }

    /// Output of the command against the configuration seen in `init`.
    pub fn render(&self) -> Result<String> {
        let config = self
            .config
            .as_ref()
            .context("inspector used before init")?;
        match &self.command {
            Command::Keys { format } => Ok(format_entries(&config.entries(), *format)?),
            Command::Get { path, format } => format_lookup(config, path, *format)?
                .ok_or_else(|| anyhow::Error::from(ConfigError::missing(path.as_str()))),
        }
    }
}

impl Runnable for Inspector {
    fn name(&self) -> &str {
        "chassis"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self, configurator: &Configurator) -> Result<()> {
        self.config = Some(configurator.combined()?);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        print!("{}", self.render()?);
        Ok(())
    }

    fn terminate(&mut self) {
        self.config = None;
    }
}
