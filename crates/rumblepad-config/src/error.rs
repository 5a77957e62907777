use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse KDL")]
    #[diagnostic(code(rumblepad::config::parse_error))]
    ParseError {
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source]
        source: kdl::KdlError,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(rumblepad::config::invalid))]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    #[diagnostic(code(rumblepad::config::missing_field))]
    MissingField { field: String },

    #[error("Value out of range for {option}: {value} (expected {min}..={max})")]
    #[diagnostic(code(rumblepad::config::out_of_range))]
    OutOfRange {
        option: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
