//! KDL configuration parser

use std::path::Path;

use crate::error::ConfigError;
use crate::model::*;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl uses an older miette version, so we need to extract offset/len manually
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node)?;
            }
            "joypad" => {
                config.joypads.push(parse_joypad(node)?);
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    let mut names = std::collections::HashSet::new();
    for joypad in &config.joypads {
        if !names.insert(joypad.name.as_str()) {
            return Err(ConfigError::Invalid {
                message: format!("Joypad '{}' is defined more than once", joypad.name),
            });
        }
    }

    Ok(config)
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    if let Some(val) = string_value(child) {
                        global.log_level = val
                            .parse()
                            .map_err(|e| ConfigError::Invalid { message: e })?;
                    }
                }
                "tick-interval-ms" => {
                    if let Some(val) = integer_value(child, 1, 1000)? {
                        global.tick_interval_ms = val as u64;
                    }
                }
                "startup-delay-ms" => {
                    if let Some(val) = integer_value(child, 0, 10_000)? {
                        global.startup_delay_ms = val as u64;
                    }
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_joypad(node: &kdl::KdlNode) -> Result<JoypadConfig, ConfigError> {
    let name = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
        .ok_or_else(|| ConfigError::MissingField {
            field: "joypad name (e.g., `joypad \"My Joypad\" { ... }`)".to_string(),
        })?;

    if name.trim().is_empty() {
        return Err(ConfigError::Invalid {
            message: "Joypad name must not be empty".to_string(),
        });
    }

    let mut joypad = JoypadConfig::new(name);

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "vendor-product" => {
                    if let Some(val) = string_value(child) {
                        let (vendor, product) =
                            parse_vendor_product(val).ok_or_else(|| ConfigError::Invalid {
                                message: format!(
                                    "Joypad '{}': vendor-product must look like \"045e:028e\", got \"{}\"",
                                    joypad.name, val
                                ),
                            })?;
                        joypad.vendor = vendor;
                        joypad.product = product;
                    }
                }
                "ff-effects-max" => {
                    if let Some(val) = integer_value(child, 1, 255)? {
                        joypad.ff_effects_max = val as u32;
                    }
                }
                name => {
                    tracing::warn!("Unknown joypad config option: {}", name);
                }
            }
        }
    }

    Ok(joypad)
}

fn string_value(node: &kdl::KdlNode) -> Option<&str> {
    node.entries().first().and_then(|e| e.value().as_string())
}

/// First argument of `node` as an integer within `[min, max]`
fn integer_value(node: &kdl::KdlNode, min: i64, max: i64) -> Result<Option<i64>, ConfigError> {
    let Some(entry) = node.entries().first() else {
        return Ok(None);
    };
    let option = node.name().value().to_string();
    let value = entry.value().as_i64().ok_or_else(|| ConfigError::Invalid {
        message: format!("{} expects an integer", option),
    })?;
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            option,
            value,
            min,
            max,
        });
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_config() {
        let config = r#"
            global {
                log-level "debug"
                tick-interval-ms 10
                startup-delay-ms 250
            }

            joypad "Test Joypad" {
                vendor-product "28de:1205"
                ff-effects-max 32
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.global.log_level, LogLevel::Debug);
        assert_eq!(result.global.tick_interval_ms, 10);
        assert_eq!(result.global.startup_delay_ms, 250);
        assert_eq!(result.joypads.len(), 1);

        let joypad = &result.joypads[0];
        assert_eq!(joypad.name, "Test Joypad");
        assert_eq!(joypad.vendor, 0x28de);
        assert_eq!(joypad.product, 0x1205);
        assert_eq!(joypad.ff_effects_max, 32);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let result = parse_config_str("").unwrap();
        assert_eq!(result.global, GlobalConfig::default());
        assert_eq!(result.global.tick_interval().as_millis(), 20);
        assert_eq!(result.global.startup_delay().as_millis(), 100);
        assert!(result.joypads.is_empty());
    }

    #[test]
    fn test_joypad_defaults_when_options_omitted() {
        let config = r#"
            joypad "Plain" {
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.joypads[0], JoypadConfig::new("Plain"));
    }

    #[test]
    fn test_joypad_missing_name_error() {
        let config = r#"
            joypad {
                ff-effects-max 4
            }
        "#;

        let err = parse_config_str(config).unwrap_err();
        match err {
            ConfigError::MissingField { field } => {
                assert!(field.contains("joypad name"));
            }
            _ => panic!("Expected MissingField error, got: {:?}", err),
        }
    }

    #[test]
    fn test_duplicate_joypad_names_rejected() {
        let config = r#"
            joypad "Pad" {}
            joypad "Pad" {}
        "#;

        let err = parse_config_str(config).unwrap_err();
        match err {
            ConfigError::Invalid { message } => assert!(message.contains("Pad")),
            _ => panic!("Expected Invalid error, got: {:?}", err),
        }
    }

    #[test]
    fn test_invalid_vendor_product() {
        let config = r#"
            joypad "Pad" {
                vendor-product "xbox"
            }
        "#;

        let err = parse_config_str(config).unwrap_err();
        match err {
            ConfigError::Invalid { message } => {
                assert!(message.contains("vendor-product"));
                assert!(message.contains("xbox"));
            }
            _ => panic!("Expected Invalid error, got: {:?}", err),
        }
    }

    #[test]
    fn test_tick_interval_out_of_range() {
        let config = r#"
            global {
                tick-interval-ms 0
            }
        "#;

        let err = parse_config_str(config).unwrap_err();
        match err {
            ConfigError::OutOfRange { option, value, .. } => {
                assert_eq!(option, "tick-interval-ms");
                assert_eq!(value, 0);
            }
            _ => panic!("Expected OutOfRange error, got: {:?}", err),
        }
    }

    #[test]
    fn test_non_integer_option_rejected() {
        let config = r#"
            joypad "Pad" {
                ff-effects-max "many"
            }
        "#;

        let err = parse_config_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_invalid_log_level() {
        let config = r#"
            global {
                log-level "chatty"
            }
        "#;

        let err = parse_config_str(config).unwrap_err();
        match err {
            ConfigError::Invalid { message } => assert!(message.contains("chatty")),
            _ => panic!("Expected Invalid error, got: {:?}", err),
        }
    }

    #[test]
    fn test_kdl_syntax_error_has_span() {
        let err = parse_config_str("joypad \"Pad\" {").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_unknown_nodes_are_ignored() {
        let config = r#"
            keyboard "Not a joypad" {}
            joypad "Pad" {
                color "red"
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.joypads.len(), 1);
    }

    #[test]
    fn test_parse_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.kdl");
        std::fs::write(&path, "joypad \"File Pad\" {}\n").unwrap();

        let result = parse_config(&path).unwrap();
        assert_eq!(result.joypads[0].name, "File Pad");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = parse_config(Path::new("/nonexistent/rumblepad/config.kdl")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
