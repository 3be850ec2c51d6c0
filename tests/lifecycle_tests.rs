//! Integration tests for the configured lifecycle.
//!
//! A component is only initialized, run and terminated when every
//! configuration source loads.

use anyhow::Result;
use chassis_config::config::{ConfigBuilder, ScalarType, Schema};
use chassis_config::{ConfigError, Configurator, ErrorCode, Runnable};
use std::fs;
use tempfile::TempDir;

#[derive(Default)]
struct Component {
    calls: Vec<&'static str>,
    hash: Option<i64>,
}

impl Runnable for Component {
    fn name(&self) -> &str {
        "component"
    }

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn init(&mut self, configurator: &Configurator) -> Result<()> {
        self.calls.push("init");
        let schema = Schema::builder("Component")
            .scalar("hash", "hash", ScalarType::I64)
            .build()?;
        self.hash = Some(configurator.create(&schema)?.i64("hash")?);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.calls.push("run");
        Ok(())
    }

    fn terminate(&mut self) {
        self.calls.push("terminate");
    }
}

fn error_code(err: &anyhow::Error) -> ErrorCode {
    err.downcast_ref::<ConfigError>()
        .map(ConfigError::code)
        .expect("expected a configuration error")
}

#[test]
fn test_full_lifecycle() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("example-config.yaml");
    fs::write(&path, "hash: 0xA1\n").unwrap();

    let builder = ConfigBuilder::new()
        .file(&path)
        .define("hash", "15")
        .unwrap();
    let configurator = Configurator::new(builder);
    let mut component = Component::default();
    configurator.run(&mut component).unwrap();

    assert_eq!(component.calls, vec!["init", "run", "terminate"]);
    assert_eq!(component.hash, Some(15));
}

#[test]
fn test_unsupported_format_skips_lifecycle() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.xlsx");
    fs::write(&path, "not a spreadsheet").unwrap();

    let configurator = Configurator::new(ConfigBuilder::new().file(&path));
    let mut component = Component::default();
    let err = configurator.run(&mut component).unwrap_err();

    assert_eq!(error_code(&err), ErrorCode::UnsupportedSourceFormat);
    assert!(component.calls.is_empty());
}

#[test]
fn test_missing_file_skips_lifecycle() {
    let temp = TempDir::new().unwrap();
    let configurator = Configurator::new(
        ConfigBuilder::new().file(temp.path().join("missing-config.yaml")),
    );
    let mut component = Component::default();
    let err = configurator.run(&mut component).unwrap_err();

    assert_eq!(error_code(&err), ErrorCode::SourceLoadFailed);
    assert!(component.calls.is_empty());
}

#[test]
fn test_property_list_has_no_loader() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("overlay-config.plist");
    fs::write(&path, "{ hash = 15; }").unwrap();

    let configurator = Configurator::new(ConfigBuilder::new().file(&path));
    let mut component = Component::default();
    let err = configurator.run(&mut component).unwrap_err();

    assert_eq!(error_code(&err), ErrorCode::UnsupportedSourceFormat);
    assert!(component.calls.is_empty());
}
