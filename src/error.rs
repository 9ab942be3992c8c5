//! Typed errors for the static `has` transform.
//!
//! Everything that can go wrong but still leaves a sensible output (unknown
//! flags, unknown feature sets, modules that never import `has`) is handled
//! in place. Only the conditions below abort a run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StaticHasError {
    /// The source text is not valid ECMAScript.
    #[error("Parse error in {file} at {line}:{column}: {message}")]
    Parse {
        file: String,
        message: String,
        /// 1-indexed
        line: usize,
        /// 0-indexed, in characters
        column: usize,
    },

    /// The recorded edits cannot be applied to the source text.
    #[error("Emit error: {message}")]
    Emit { message: String },

    /// The prior source map could not be read, or the new one written.
    #[error("Source map error: {0}")]
    SourceMap(#[from] sourcemap::Error),

    /// Transform options did not deserialize.
    #[error("Config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The elision report could not be serialized.
    #[error("Report error: {0}")]
    Report(#[source] serde_json::Error),

    /// A feature set document is malformed.
    #[error("Feature set error for {name}: {message}")]
    FeatureSet { name: String, message: String },
}

impl StaticHasError {
    pub fn parse_at(
        file: impl Into<String>,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
            line,
            column,
        }
    }

    pub fn emit(message: impl Into<String>) -> Self {
        Self::Emit {
            message: message.into(),
        }
    }

    pub fn config(err: serde_json::Error) -> Self {
        Self::Config {
            message: err.to_string(),
            source: Some(err),
        }
    }

    pub fn report(err: serde_json::Error) -> Self {
        Self::Report(err)
    }

    pub fn feature_set(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FeatureSet {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type StaticHasResult<T> = Result<T, StaticHasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_location() {
        let err = StaticHasError::parse_at("main.js", "Unexpected token", 3, 7);
        assert_eq!(
            err.to_string(),
            "Parse error in main.js at 3:7: Unexpected token"
        );
        assert!(matches!(err, StaticHasError::Parse { line: 3, column: 7, .. }));
    }

    #[test]
    fn config_error_keeps_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StaticHasError::config(json_err);
        assert!(err.to_string().starts_with("Config error: "));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn emit_error_message() {
        let err = StaticHasError::emit("overlapping edits at 4..9");
        assert_eq!(err.to_string(), "Emit error: overlapping edits at 4..9");
    }
}
