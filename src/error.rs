//! Error types for osconnect operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`ConnectError`].
pub type Result<T> = std::result::Result<T, ConnectError>;

/// Errors that can occur while resolving targets or opening sessions.
///
/// All errors implement `std::error::Error` and can be chained with `source()`.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// No target-selection mode could be resolved.
    #[error("Cloud name not defined. Please specify it as a parameter or set ENV var OS_CLOUD")]
    NoTargets,

    /// The same target identifier was requested more than once.
    #[error("duplicate target: {0}")]
    DuplicateTarget(String),

    /// A request parameter has an unusable value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Listing the configured profiles failed.
    #[error("cannot enumerate clouds: {0}")]
    Enumeration(#[source] Box<ConnectError>),

    /// No clouds.yaml was found on the search path.
    #[error("no clouds.yaml found (searched: {})", display_paths(.searched))]
    ConfigNotFound {
        /// Candidate locations, in search order
        searched: Vec<PathBuf>,
    },

    /// The requested profile is not defined in the configuration store.
    #[error("cloud {0} not found in clouds.yaml")]
    ProfileNotFound(String),

    /// Cloud name is empty or contains characters that cannot be a key.
    #[error("invalid cloud name: {0}")]
    InvalidCloudName(String),

    /// An auth field needed by the selected auth method is absent.
    #[error("cloud {cloud}: missing auth field '{field}'")]
    MissingAuthField {
        /// Cloud name or caller-chosen key
        cloud: String,
        /// Name of the missing field
        field: String,
    },

    /// No provider is registered for the requested auth type.
    #[error("unsupported auth type: {0}")]
    UnsupportedAuthType(String),

    /// The identity service rejected the credentials.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The identity service answered with an unexpected status.
    #[error("identity service returned {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// Connection or authorization of a named profile failed.
    #[error("Cannot connect to cloud {cloud}. Error: {source}. config files: {}", display_paths(.searched))]
    Cloud {
        /// Profile name
        cloud: String,
        /// Config files consulted while resolving the profile
        searched: Vec<PathBuf>,
        /// Underlying error
        #[source]
        source: Box<ConnectError>,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error in clouds.yaml or a credentials file.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP transport error.
    #[cfg(feature = "keystone")]
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConnectError {
    /// Wraps an error with the name of the profile that produced it.
    ///
    /// # Example
    ///
    /// ```
    /// use osconnect::ConnectError;
    ///
    /// let err = ConnectError::AuthenticationFailed("bad password".to_string());
    /// let wrapped = ConnectError::cloud_op("prod", Vec::new(), err);
    ///
    /// assert_eq!(
    ///     wrapped.to_string(),
    ///     "Cannot connect to cloud prod. Error: authentication failed: bad password. config files: (none)"
    /// );
    /// ```
    pub fn cloud_op(cloud: impl Into<String>, searched: Vec<PathBuf>, err: ConnectError) -> Self {
        Self::Cloud {
            cloud: cloud.into(),
            searched,
            source: Box::new(err),
        }
    }

    /// Returns true for errors raised before any connection was attempted.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoTargets
                | Self::DuplicateTarget(_)
                | Self::InvalidParameter(_)
                | Self::InvalidCloudName(_)
        )
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "(none)".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
