use std::path::PathBuf;

/// Errors that can occur while loading, aggregating, or rendering reports.
///
/// Library crates use this type directly; it implements
/// `miette::Diagnostic` so the binary can propagate it with `?`.
///
/// # Examples
///
/// ```
/// use cadence_core::CadenceError;
///
/// let err = CadenceError::Config("smoothing window must be positive".into());
/// assert!(err.to_string().contains("smoothing window"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CadenceError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// A field did not match its expected format.
    #[error("parse error: {0}")]
    Parse(String),

    /// CSV reading or writing failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Chart rendering failure.
    #[error("chart error: {0}")]
    Chart(String),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        let err: CadenceError = io_err.into();
        assert!(err.to_string().contains("locked"));
    }

    #[test]
    fn parse_error_displays_message() {
        let err = CadenceError::Parse("row 3: bad date".into());
        assert_eq!(err.to_string(), "parse error: row 3: bad date");
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = CadenceError::FileNotFound(PathBuf::from("/tmp/firefox_commits.csv"));
        assert!(err.to_string().contains("/tmp/firefox_commits.csv"));
    }

    #[test]
    fn json_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("[{").unwrap_err();
        let err: CadenceError = json_err.into();
        assert!(err.to_string().starts_with("serialization error"));
    }
}
