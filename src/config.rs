//! Connection request configuration.

use crate::profile::InlineCredentials;
use crate::{ConnectError, Result};

/// Default number of connection attempts in flight.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Environment variable holding a comma-separated list of cloud names.
pub const OS_CLOUD_ENV: &str = "OS_CLOUD";

/// Describes which clouds to connect to.
///
/// Use the builder pattern for ergonomic configuration:
///
/// ```
/// use osconnect::ConnectRequest;
///
/// let request = ConnectRequest::new()
///     .with_clouds(["ie2-osp10-inf", "ie2-osp10-lab"])
///     .with_concurrency(4);
///
/// assert_eq!(request.clouds.len(), 2);
/// assert!(!request.all_clouds);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectRequest {
    /// Profile names, in the order results should appear. Empty means unset.
    pub clouds: Vec<String>,

    /// Target every profile in clouds.yaml; `clouds` is ignored
    pub all_clouds: bool,

    /// Inline credential records; when set, profiles are not consulted
    pub creds: Option<Vec<InlineCredentials>>,

    /// Maximum connection attempts in flight (default: 10)
    pub concurrency: usize,
}

impl Default for ConnectRequest {
    fn default() -> Self {
        Self {
            clouds: Vec::new(),
            all_clouds: false,
            creds: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ConnectRequest {
    /// Creates an empty request.
    ///
    /// With nothing else set, targets come from `OS_CLOUD`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the explicit profile list.
    pub fn with_clouds<I, S>(mut self, clouds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clouds = clouds.into_iter().map(Into::into).collect();
        self
    }

    /// Targets every profile in clouds.yaml.
    pub fn with_all_clouds(mut self, all_clouds: bool) -> Self {
        self.all_clouds = all_clouds;
        self
    }

    /// Uses inline credentials instead of profiles.
    pub fn with_creds(mut self, creds: Vec<InlineCredentials>) -> Self {
        self.creds = Some(creds);
        self
    }

    /// Sets how many connection attempts may run at once.
    ///
    /// `1` gives strictly sequential attempts in input order.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Checks the request for values that can never work.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::InvalidParameter`] if `concurrency` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ConnectError::InvalidParameter(
                "concurrency must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Splits an `OS_CLOUD` value into cloud names.
///
/// Entries are trimmed and blank entries dropped.
///
/// ```
/// use osconnect::config::split_cloud_list;
///
/// assert_eq!(split_cloud_list("x, y,,z "), vec!["x", "y", "z"]);
/// assert!(split_cloud_list(" ").is_empty());
/// ```
pub fn split_cloud_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
