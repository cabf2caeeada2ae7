use std::path::PathBuf;

use thiserror::Error;

/// Boxed error as reported by handlers and article producers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main library error type that encompasses all reader and writer failure modes
#[derive(Error, Debug)]
pub enum BmecatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to seek back to start of document: {0}")]
    Rewind(#[source] std::io::Error),

    #[error("Unable to read XML declaration in pass {pass}: {source}")]
    Declaration {
        pass: u8,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error(
        "Malformed XML in pass {pass} around byte offset {offset} (last SUPPLIER_AID {last_article:?}): {source}"
    )]
    Xml {
        pass: u8,
        offset: u64,
        last_article: Option<String>,
        #[source]
        source: quick_xml::Error,
    },

    #[error(
        "Unable to decode {element} around byte offset {offset} (last SUPPLIER_AID {last_article:?}): {details}"
    )]
    Decode {
        element: &'static str,
        offset: u64,
        last_article: Option<String>,
        details: String,
    },

    #[error("Handler for {element} {id:?} returned an error around byte offset {offset}: {source}")]
    Handler {
        element: &'static str,
        id: String,
        offset: u64,
        #[source]
        source: HandlerError,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Unable to write {part}: {details}")]
    Encode { part: String, details: String },

    #[error("Article producer reported an error: {0}")]
    Producer(#[source] BoxError),

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },
}

impl BmecatError {
    /// Build an [`BmecatError::Encode`] for the structural part that failed.
    pub fn encode(part: impl Into<String>, err: impl std::fmt::Display) -> Self {
        BmecatError::Encode {
            part: part.into(),
            details: err.to_string(),
        }
    }

    /// True if the operation was stopped through its [`crate::CancelContext`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BmecatError::Cancelled)
    }
}

/// Outcome a reader callback can report back instead of success
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Stop reading. Returned from the header callback this ends the read cleanly.
    #[error("end of stream")]
    EndOfStream,

    #[error(transparent)]
    Failed(#[from] BoxError),
}

impl HandlerError {
    pub fn failed(err: impl Into<BoxError>) -> Self {
        HandlerError::Failed(err.into())
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, HandlerError::EndOfStream)
    }
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, BmecatError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type returned by reader callbacks
pub type HandlerResult = std::result::Result<(), HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmecat_error_display() {
        let io_error = BmecatError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        ));
        assert!(io_error.to_string().contains("IO error"));

        let unknown = BmecatError::UnknownEncoding("klingon".to_string());
        assert_eq!(unknown.to_string(), "Unknown encoding: klingon");

        let decode = BmecatError::Decode {
            element: "ARTICLE",
            offset: 4711,
            last_article: Some("1000".to_string()),
            details: "missing field `SUPPLIER_AID`".to_string(),
        };
        let message = decode.to_string();
        assert!(message.contains("ARTICLE"));
        assert!(message.contains("4711"));
        assert!(message.contains("1000"));
    }

    #[test]
    fn test_handler_error_wrapping() {
        let err = BmecatError::Handler {
            element: "CATALOG_STRUCTURE",
            id: "G1".to_string(),
            offset: 12,
            source: HandlerError::failed("boom"),
        };
        let message = err.to_string();
        assert!(message.contains("CATALOG_STRUCTURE"));
        assert!(message.contains("\"G1\""));
        assert!(message.contains("boom"));
    }

    #[test]
    fn test_cancelled_is_distinguishable() {
        assert!(BmecatError::Cancelled.is_cancelled());
        assert!(!BmecatError::UnknownEncoding("x".to_string()).is_cancelled());
    }

    #[test]
    fn test_end_of_stream_predicate() {
        assert!(HandlerError::EndOfStream.is_end_of_stream());
        assert!(!HandlerError::failed("nope").is_end_of_stream());
    }

    #[test]
    fn test_declaration_error_names_pass() {
        let err = BmecatError::Declaration {
            pass: 2,
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"),
        };
        assert_eq!(err.to_string(), "Unable to read XML declaration in pass 2: gone");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("Indent character must be ASCII".to_string());
        assert!(err.to_string().contains("validation error"));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let err = BmecatError::Rewind(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "not seekable",
        ));
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "not seekable");
    }
}
