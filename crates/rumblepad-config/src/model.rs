//! Configuration data model

use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub joypads: Vec<JoypadConfig>,
}

/// Global settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
    /// Period of the force-feedback control loop, in milliseconds
    pub tick_interval_ms: u64,
    /// Wait before the first read from a new device node, in milliseconds
    pub startup_delay_ms: u64,
}

impl GlobalConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            tick_interval_ms: 20,
            startup_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// A virtual joypad to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoypadConfig {
    /// Device name reported by evdev
    pub name: String,
    /// USB vendor id
    pub vendor: u16,
    /// USB product id
    pub product: u16,
    /// Number of effect slots games may upload into
    pub ff_effects_max: u32,
}

impl JoypadConfig {
    /// Xbox 360 controller ids, which games recognise without extra mappings
    pub const DEFAULT_VENDOR: u16 = 0x045e;
    pub const DEFAULT_PRODUCT: u16 = 0x028e;
    pub const DEFAULT_FF_EFFECTS_MAX: u32 = 16;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor: Self::DEFAULT_VENDOR,
            product: Self::DEFAULT_PRODUCT,
            ff_effects_max: Self::DEFAULT_FF_EFFECTS_MAX,
        }
    }

    /// Get vendor:product string (e.g., "045e:028e")
    pub fn vendor_product(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor, self.product)
    }
}

/// Parse a `vvvv:pppp` hex pair.
pub fn parse_vendor_product(value: &str) -> Option<(u16, u16)> {
    let (vendor, product) = value.split_once(':')?;
    if vendor.len() != 4 || product.len() != 4 {
        return None;
    }
    let vendor = u16::from_str_radix(vendor, 16).ok()?;
    let product = u16::from_str_radix(product, 16).ok()?;
    Some((vendor, product))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vendor_product() {
        assert_eq!(parse_vendor_product("045e:028e"), Some((0x045e, 0x028e)));
        assert_eq!(parse_vendor_product("28DE:1205"), Some((0x28de, 0x1205)));
        assert_eq!(parse_vendor_product("45e:28e"), None);
        assert_eq!(parse_vendor_product("045e028e"), None);
        assert_eq!(parse_vendor_product("zzzz:028e"), None);
    }

    #[test]
    fn test_joypad_defaults() {
        let joypad = JoypadConfig::new("Pad");
        assert_eq!(joypad.vendor_product(), "045e:028e");
        assert_eq!(joypad.ff_effects_max, 16);
    }

    #[test]
    fn test_log_level_round_trips_through_filter_directive() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let parsed: LogLevel = level.parse().unwrap();
            assert_eq!(parsed.as_str(), level);
        }
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
