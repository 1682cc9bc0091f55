//! Parameter front-end.
//!
//! Accepts assessment parameters in the shape an automation tool passes
//! them (`clouds`, `all_clouds`, `threads_nr`), checks their types, and runs
//! the connector. Any connector error becomes a failed
//! [`AssessmentOutcome`] whose message carries the original error text; no
//! partial results are reported on that path.

use crate::config::{split_cloud_list, ConnectRequest, DEFAULT_CONCURRENCY};
use crate::connector::{Connections, Connector};
use crate::profile::InlineCredentials;
use crate::{ConnectError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::path::Path;

/// Assessment parameters.
///
/// ```
/// use osconnect::frontend::AssessmentParams;
///
/// let params: AssessmentParams = serde_json::from_str(r#"{"clouds": ["ie2-osp10-inf"]}"#).unwrap();
/// assert_eq!(params.clouds, vec!["ie2-osp10-inf"]);
/// assert!(!params.all_clouds);
/// assert_eq!(params.threads_nr, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssessmentParams {
    /// Names of the clouds to scan. A comma-separated string is accepted too.
    #[serde(default, deserialize_with = "string_or_list")]
    pub clouds: Vec<String>,

    /// Scan every cloud in clouds.yaml
    #[serde(default)]
    pub all_clouds: bool,

    /// Maximum connection attempts in flight
    #[serde(default = "default_threads_nr")]
    pub threads_nr: i64,
}

fn default_threads_nr() -> i64 {
    DEFAULT_CONCURRENCY as i64
}

fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::One(s) => split_cloud_list(&s),
        StringOrList::Many(v) => v,
    })
}

impl Default for AssessmentParams {
    fn default() -> Self {
        Self {
            clouds: Vec::new(),
            all_clouds: false,
            threads_nr: default_threads_nr(),
        }
    }
}

impl AssessmentParams {
    /// Parses parameters from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts the parameters into a connector request.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::InvalidParameter`] unless `threads_nr` is positive.
    pub fn to_request(&self) -> Result<ConnectRequest> {
        let concurrency = usize::try_from(self.threads_nr)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConnectError::InvalidParameter(format!(
                    "threads_nr must be a positive integer, got {}",
                    self.threads_nr
                ))
            })?;

        Ok(ConnectRequest::new()
            .with_clouds(self.clouds.clone())
            .with_all_clouds(self.all_clouds)
            .with_concurrency(concurrency))
    }
}

/// Per-cloud line of a successful outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudStatus {
    pub cloud: String,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// What the front-end reports back.
#[derive(Debug, Clone)]
pub enum AssessmentOutcome {
    /// Sessions were obtained; the caller owns further reporting.
    Connected {
        connections: Connections,
    },
    /// The run was aborted.
    Failed {
        msg: String,
    },
}

impl AssessmentOutcome {
    /// Builds the failure outcome for a connector error.
    pub fn from_error(err: &ConnectError) -> Self {
        Self::Failed {
            msg: format!("Cannot connect to openstack. Error: {}", err),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Per-cloud summary, in input order. Empty for a failed outcome.
    pub fn statuses(&self) -> Vec<CloudStatus> {
        match self {
            Self::Failed { .. } => Vec::new(),
            Self::Connected { connections } => connections
                .entries()
                .into_iter()
                .map(|(cloud, session)| CloudStatus {
                    cloud: cloud.to_string(),
                    connected: session.is_some(),
                    project_id: session.and_then(|s| s.project_id().map(str::to_string)),
                    expires_at: session.and_then(|s| s.expires_at()),
                })
                .collect(),
        }
    }

    /// Renders the outcome as a module result document.
    ///
    /// ```
    /// use osconnect::frontend::AssessmentOutcome;
    /// use osconnect::ConnectError;
    ///
    /// let outcome = AssessmentOutcome::from_error(&ConnectError::NoTargets);
    /// let doc = outcome.to_json();
    ///
    /// assert_eq!(doc["failed"], true);
    /// assert_eq!(doc["changed"], false);
    /// assert!(doc["msg"].as_str().unwrap().starts_with("Cannot connect to openstack. Error:"));
    /// ```
    pub fn to_json(&self) -> Value {
        match self {
            Self::Failed { msg } => json!({
                "changed": false,
                "failed": true,
                "msg": msg,
            }),
            Self::Connected { .. } => json!({
                "changed": false,
                "failed": false,
                "clouds": self.statuses(),
            }),
        }
    }
}

/// Runs an assessment from front-end parameters.
pub async fn run_assessment(connector: &Connector, params: &AssessmentParams) -> AssessmentOutcome {
    match params.to_request() {
        Ok(request) => run_request(connector, &request).await,
        Err(e) => AssessmentOutcome::from_error(&e),
    }
}

/// Runs an assessment from a prepared request.
pub async fn run_request(connector: &Connector, request: &ConnectRequest) -> AssessmentOutcome {
    match connector.connect(request).await {
        Ok(connections) => {
            tracing::info!(
                clouds = connections.len(),
                failed = connections.failed().len(),
                "assessment connections ready"
            );
            AssessmentOutcome::Connected { connections }
        }
        Err(e) => {
            tracing::error!(error = %e, "assessment aborted");
            AssessmentOutcome::from_error(&e)
        }
    }
}

/// Loads inline credential records from a YAML or JSON file.
///
/// The file must hold a list of records, each with a `cloud` key.
pub async fn load_credentials(path: impl AsRef<Path>) -> Result<Vec<InlineCredentials>> {
    let data = tokio::fs::read_to_string(path.as_ref()).await?;
    Ok(serde_yaml::from_str(&data)?)
}
