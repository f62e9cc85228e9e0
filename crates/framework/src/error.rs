//! Error types for building plugins and decision trees.
//!
//! Every variant is raised while a configuration is being loaded. Evaluating
//! a filter never produces an error: an empty candidate set is a normal
//! outcome and drives branching instead.

use thiserror::Error;

/// Errors that can occur while loading a scheduler configuration
///
/// The `#[derive(Error)]` macro from thiserror implements `std::error::Error`
/// and `Display` from the `#[error(...)]` attributes.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A decision tree without its `current` entry
    #[error("missing required current filter")]
    MissingCurrent,

    /// A tree entry carrying both a reference and a nested tree
    #[error("ambiguous entry: both reference and nested tree specified")]
    AmbiguousEntry,

    /// A tree entry carrying neither a reference nor a nested tree
    #[error("entry must specify either a reference or a nested tree")]
    EmptyEntry,

    /// A reference to a plugin name nothing was registered under
    #[error("undefined reference: {0}")]
    UndefinedReference(String),

    /// A reference resolved to a plugin without the filter capability
    #[error("{0} is not a filter")]
    NotAFilter(String),

    /// A reference resolved to a plugin without the picker capability
    #[error("{0} is not a picker")]
    NotAPicker(String),

    /// A plugin referring back to itself while it is being built
    #[error("cyclic reference: {0} refers back to a plugin that is still being built")]
    CyclicReference(String),

    /// Plugin parameters that don't match the plugin's schema
    #[error("failed to parse the parameters of the '{name}' plugin: {source}")]
    InvalidParameters {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// No factory registered for the requested plugin type
    #[error("unknown plugin type '{plugin_type}' for plugin '{name}'")]
    UnknownPluginType { name: String, plugin_type: String },

    /// Two plugins declared under the same name
    #[error("plugin '{0}' is defined more than once")]
    DuplicatePlugin(String),

    /// A plugin failed to build; wraps the underlying cause with its name
    #[error("failed to build plugin '{name}': {source}")]
    Plugin {
        name: String,
        #[source]
        source: Box<ConfigError>,
    },

    /// I/O error occurred while reading a configuration file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON or doesn't match the expected schema
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Strip any [`ConfigError::Plugin`] wrappers and return the root cause.
    pub fn root_cause(&self) -> &ConfigError {
        match self {
            ConfigError::Plugin { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_reference() {
        let err = ConfigError::UndefinedReference("low-queue".to_string());
        assert_eq!(err.to_string(), "undefined reference: low-queue");

        let err = ConfigError::NotAFilter("picker".to_string());
        assert_eq!(err.to_string(), "picker is not a filter");
    }

    #[test]
    fn test_root_cause_unwraps_nested_plugin_errors() {
        let err = ConfigError::Plugin {
            name: "outer".to_string(),
            source: Box::new(ConfigError::Plugin {
                name: "inner".to_string(),
                source: Box::new(ConfigError::MissingCurrent),
            }),
        };

        assert!(matches!(err.root_cause(), ConfigError::MissingCurrent));
        assert!(err.to_string().contains("outer"));
    }
}
