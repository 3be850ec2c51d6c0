//! Overlay of configuration sources.
//!
//! Sources are stacked, not folded into one tree: every lookup walks the
//! layers from the top, so a higher source wins any path it defines while
//! lower sources keep answering for paths it does not mention. Repeated
//! groups and value lists are replaced entirely, never concatenated.

use super::combined::{CombinedConfig, ConfigSource, SourceOrigin};
use super::node::ConfigNode;
use super::overrides::Overrides;
use tracing::debug;

/// Label of the synthetic source built from `key=value` overrides.
pub const OVERRIDES_LABEL: &str = "overrides";

/// Stack `sources` (lowest priority first) under the override set.
///
/// The override set always becomes the top layer, even when empty, so the
/// layout of a combined configuration does not depend on the command line.
///
/// # Example
/// ```
/// use chassis_config::config::{ConfigNode, Overrides, merge};
///
/// let base = ConfigNode::root().with_child(ConfigNode::leaf("version", ["2.1"]));
/// let overrides = Overrides::new().with("version", "0.5.0").unwrap();
/// let combined = merge(vec![("base.yaml".to_string(), base)], &overrides);
///
/// assert_eq!(combined.values("version")[0].to_string(), "0.5.0");
/// ```
pub fn merge(sources: Vec<(String, ConfigNode)>, overrides: &Overrides) -> CombinedConfig {
    let mut layers: Vec<ConfigSource> = sources
        .into_iter()
        .map(|(label, root)| ConfigSource::new(label, SourceOrigin::File, root))
        .collect();
    layers.push(ConfigSource::new(
        OVERRIDES_LABEL,
        SourceOrigin::Overrides,
        overrides.to_node(),
    ));

    debug!(
        layers = layers.len(),
        overrides = overrides.len(),
        "Combined configuration sources"
    );
    CombinedConfig::from_sources(layers)
}
