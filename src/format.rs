//! Output formatting for text and JSON.

use crate::config::{CombinedConfig, ResolvedEntry, Scalar};
use clap::ValueEnum;
use serde_json::json;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One `path = values` line per key
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

fn join_values(values: &[Scalar]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format resolved entries, one per key.
pub fn format_entries(entries: &[ResolvedEntry], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(entries),
        OutputFormat::Text => {
            let width = entries.iter().map(|e| e.path.len()).max().unwrap_or(0);
            let mut out = String::new();
            for entry in entries {
                out.push_str(&format!(
                    "{:width$} = {}  ({})\n",
                    entry.path,
                    join_values(&entry.values),
                    entry.source,
                    width = width
                ));
            }
            Ok(out)
        }
    }
}

/// Format the values found at `path`, or `None` if nothing defines it.
pub fn format_lookup(
    config: &CombinedConfig,
    path: &str,
    format: OutputFormat,
) -> serde_json::Result<Option<String>> {
    let resolution = config.lookup(path);
    let Some(source) = resolution.source().and_then(|i| config.source(i)) else {
        return Ok(None);
    };
    let values: Vec<Scalar> = resolution
        .matches()
        .iter()
        .flat_map(|m| m.node.values().iter().cloned())
        .collect();

    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "path": path,
            "source": source.label(),
            "values": values,
        }))
        .map(Some),
        OutputFormat::Text => {
            let mut out = String::new();
            for value in &values {
                out.push_str(&format!("{}\n", value));
            }
            Ok(Some(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigNode, Overrides, merge};

    fn config() -> CombinedConfig {
        let base = ConfigNode::root()
            .with_child(ConfigNode::leaf("version", ["2.1"]))
            .with_child(ConfigNode::leaf("authors", ["Tick", "Trick"]));
        merge(
            vec![("base.yaml".into(), base)],
            &Overrides::new().with("hash", "15").unwrap(),
        )
    }

    #[test]
    fn test_text_entries() {
        let text = format_entries(&config().entries(), OutputFormat::Text).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "authors = Tick, Trick  (base.yaml)");
        assert_eq!(lines[2], "hash    = 15  (overrides)");
    }

    #[test]
    fn test_json_entries() {
        let text = format_entries(&config().entries(), OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["path"], "version");
        assert_eq!(parsed[1]["values"], json!(["Tick", "Trick"]));
    }

    #[test]
    fn test_lookup() {
        let config = config();
        assert_eq!(
            format_lookup(&config, "/authors", OutputFormat::Text).unwrap().as_deref(),
            Some("Tick\nTrick\n")
        );
        assert!(format_lookup(&config, "missing", OutputFormat::Text).unwrap().is_none());

        let json = format_lookup(&config, "hash", OutputFormat::Json).unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["source"], "overrides");
        assert_eq!(parsed["values"], json!(["15"]));
    }
}
