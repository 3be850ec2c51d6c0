//! Build-once access to a combined configuration.

use super::binder::{BoundView, bind};
use super::combined::CombinedConfig;
use super::loader::ConfigBuilder;
use super::path::Locator;
use super::schema::Schema;
use crate::error::ConfigResult;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error};

/// Holds a [`ConfigBuilder`] and the configuration it produced.
///
/// The first caller builds; concurrent callers wait on the lock and share
/// the result. A failed build leaves the slot empty so a later call tries
/// again.
#[derive(Debug)]
pub struct ConfigSession {
    builder: ConfigBuilder,
    slot: Mutex<Option<Arc<CombinedConfig>>>,
}

impl ConfigSession {
    pub fn new(builder: ConfigBuilder) -> Self {
        Self {
            builder,
            slot: Mutex::new(None),
        }
    }

    /// The combined configuration, built on first use.
    pub fn combined(&self) -> ConfigResult<Arc<CombinedConfig>> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(config) = slot.as_ref() {
            return Ok(Arc::clone(config));
        }

        debug!("Building configuration");
        let config = Arc::new(self.builder.build().inspect_err(|e| {
            error!(code = ?e.code(), "Configuration build failed: {}", e);
        })?);
        *slot = Some(Arc::clone(&config));
        Ok(config)
    }

    pub fn is_built(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Bind `schema` at the root of the configuration.
    pub fn bind(&self, schema: &Arc<Schema>) -> ConfigResult<BoundView> {
        let config = self.combined()?;
        Ok(bind(schema, &config, Locator::root()))
    }
}
