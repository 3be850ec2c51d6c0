//! Application lifecycle around a configured component.
//!
//! [`Configurator::run`] builds the configuration and only when that
//! succeeds drives the component through `init`, `run` and `terminate`.

use crate::config::{BoundView, CombinedConfig, ConfigBuilder, ConfigSession, Schema};
use crate::error::ConfigResult;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info};

/// A component started by a [`Configurator`].
pub trait Runnable {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Read configuration. An error here skips `run` and `terminate`.
    fn init(&mut self, configurator: &Configurator) -> Result<()>;

    fn run(&mut self) -> Result<()>;

    /// Called after `run`, whether it failed or not.
    fn terminate(&mut self);
}

/// Owns the configuration session of an application.
#[derive(Debug)]
pub struct Configurator {
    session: ConfigSession,
}

impl Configurator {
    pub fn new(builder: ConfigBuilder) -> Self {
        Self {
            session: ConfigSession::new(builder),
        }
    }

    pub fn session(&self) -> &ConfigSession {
        &self.session
    }

    pub fn combined(&self) -> ConfigResult<Arc<CombinedConfig>> {
        self.session.combined()
    }

    /// Bind `schema` at the configuration root.
    pub fn create(&self, schema: &Arc<Schema>) -> ConfigResult<BoundView> {
        self.session.bind(schema)
    }

    /// Build the configuration, then run `runnable`.
    pub fn run<R: Runnable + ?Sized>(&self, runnable: &mut R) -> Result<()> {
        let name = runnable.name().to_string();
        info!(name = %name, version = runnable.version(), "Starting");

        let config = match self.session.combined() {
            Ok(config) => config,
            Err(e) => {
                error!(name = %name, code = ?e.code(), "Not started, configuration failed: {}", e);
                return Err(e.into());
            }
        };
        for entry in config.entries() {
            debug!(
                path = %entry.path,
                source = %entry.source,
                values = ?entry.values,
                "Resolved key"
            );
        }

        runnable.init(self)?;
        info!(name = %name, "Initialized");

        let result = runnable.run();
        if let Err(e) = &result {
            error!(name = %name, "Run failed: {:#}", e);
        }

        runnable.terminate();
        info!(name = %name, "Terminated");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScalarType;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        version: Option<String>,
        fail_run: bool,
    }

    impl Runnable for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn version(&self) -> &str {
            "1.0"
        }

        fn init(&mut self, configurator: &Configurator) -> Result<()> {
            self.calls.push("init");
            let schema = Schema::builder("App")
                .scalar("version", "version", ScalarType::String)
                .build()?;
            self.version = Some(configurator.create(&schema)?.string("version")?);
            Ok(())
        }

        fn run(&mut self) -> Result<()> {
            self.calls.push("run");
            if self.fail_run {
                anyhow::bail!("boom");
            }
            Ok(())
        }

        fn terminate(&mut self) {
            self.calls.push("terminate");
        }
    }

    #[test]
    fn test_lifecycle_order() {
        let builder = ConfigBuilder::new().define("version", "0.5.0").unwrap();
        let configurator = Configurator::new(builder);
        let mut recorder = Recorder::default();
        configurator.run(&mut recorder).unwrap();
        assert_eq!(recorder.calls, vec!["init", "run", "terminate"]);
        assert_eq!(recorder.version.as_deref(), Some("0.5.0"));
    }

    #[test]
    fn test_terminate_runs_after_failed_run() {
        let configurator = Configurator::new(ConfigBuilder::new().define("version", "1").unwrap());
        let mut recorder = Recorder {
            fail_run: true,
            ..Default::default()
        };
        assert!(configurator.run(&mut recorder).is_err());
        assert_eq!(recorder.calls, vec!["init", "run", "terminate"]);
    }

    #[test]
    fn test_failed_init_skips_run() {
        // No `version` key, so init fails with a missing property.
        let configurator = Configurator::new(ConfigBuilder::new());
        let mut recorder = Recorder::default();
        assert!(configurator.run(&mut recorder).is_err());
        assert_eq!(recorder.calls, vec!["init"]);
    }
}
