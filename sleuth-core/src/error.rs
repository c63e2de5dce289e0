//! Error types for the Sleuth research core.
//!
//! Uses `thiserror` for public API error types with structured error variants
//! covering input validation, capabilities, LLM synthesis, caching and configuration.
//!
//! Only [`InputError`] (and failures of the orchestration control flow itself)
//! abort a research call. Every other domain is recovered at its call site.

/// Top-level error type for the Sleuth core library.
#[derive(Debug, thiserror::Error)]
pub enum SleuthError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors in the caller-supplied topic or options.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Research topic must not be empty")]
    EmptyTopic,

    #[error("Research topic is too long: {len} characters (max {max})")]
    TopicTooLong { len: usize, max: usize },

    #[error("Invalid option '{field}': {reason}")]
    InvalidOption { field: String, reason: String },
}

/// Errors from capability loading and invocation.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("Capability not found: {name}")]
    NotFound { name: String },

    #[error("Capability already registered: {name}")]
    AlreadyRegistered { name: String },

    #[error("Capability '{name}' is a {actual} capability, expected {expected}")]
    KindMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid plugin manifest for '{name}': {reason}")]
    Manifest { name: String, reason: String },

    #[error("Capability '{name}' failed: {message}")]
    Execution { name: String, message: String },

    #[error("Capability '{name}' timed out after {timeout_secs}s")]
    Timeout { name: String, timeout_secs: u64 },
}

/// Errors from the synthesis (LLM) boundary.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Missing credential: environment variable '{env_var}' is not set")]
    MissingCredential { env_var: String },

    #[error("LLM provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },
}

/// Errors from the result cache tiers.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache IO failure on {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration value {field} = {value} is outside {range}")]
    OutOfRange {
        field: &'static str,
        value: String,
        range: &'static str,
    },

    #[error("Configuration load error: {message}")]
    Load { message: String },
}

/// A type alias for results using the top-level `SleuthError`.
pub type Result<T> = std::result::Result<T, SleuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_input() {
        let err = SleuthError::Input(InputError::EmptyTopic);
        assert_eq!(
            err.to_string(),
            "Input error: Research topic must not be empty"
        );
    }

    #[test]
    fn test_error_display_capability() {
        let err = SleuthError::Capability(CapabilityError::Timeout {
            name: "search".into(),
            timeout_secs: 30,
        });
        assert_eq!(
            err.to_string(),
            "Capability error: Capability 'search' timed out after 30s"
        );
    }

    #[test]
    fn test_error_display_llm() {
        let err = SleuthError::Llm(LlmError::MissingCredential {
            env_var: "OPENAI_API_KEY".into(),
        });
        assert_eq!(
            err.to_string(),
            "LLM error: Missing credential: environment variable 'OPENAI_API_KEY' is not set"
        );
    }

    #[test]
    fn test_error_display_config_range() {
        let err = ConfigError::OutOfRange {
            field: "llm.temperature",
            value: "3.5".into(),
            range: "[0, 2]",
        };
        assert_eq!(
            err.to_string(),
            "Configuration value llm.temperature = 3.5 is outside [0, 2]"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SleuthError = io_err.into();
        assert!(matches!(err, SleuthError::Io(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: SleuthError = serde_err.into();
        assert!(matches!(err, SleuthError::Serialization(_)));
    }
}
