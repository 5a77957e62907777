//! Configuration parsing for rumblepad
//!
//! This crate handles parsing the KDL configuration file that describes the
//! virtual joypads the daemon creates and the timing of their listeners.

mod error;
mod model;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use parser::{parse_config, parse_config_str};
