//! Mock provider for testing.
//!
//! Selected with `auth_type: mock`. Every connection succeeds unless the
//! profile asks for a failure through its auth section:
//!
//! ```yaml
//! clouds:
//!   broken:
//!     auth_type: mock
//!     auth:
//!       fail: authorize   # or: connect
//!       delay_ms: 50      # optional, delays authorize()
//! ```
//!
//! Attempts are counted per cloud name so tests can assert which targets
//! were tried.

use crate::profile::{CloudProfile, Interface};
use crate::provider::Connection;
use crate::session::CatalogEntry;
use crate::{ConnectError, Result, Session};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// Auth type that selects this provider.
pub const AUTH_TYPE: &str = "mock";

static ATTEMPTS: OnceLock<Mutex<HashMap<String, usize>>> = OnceLock::new();

fn attempts_table() -> &'static Mutex<HashMap<String, usize>> {
    ATTEMPTS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn record_attempt(cloud: &str) {
    let mut table = attempts_table().lock().unwrap_or_else(|e| e.into_inner());
    *table.entry(cloud.to_string()).or_default() += 1;
}

/// Returns how many connect attempts were made for a cloud name.
pub fn attempts(cloud: &str) -> usize {
    let table = attempts_table().lock().unwrap_or_else(|e| e.into_inner());
    table.get(cloud).copied().unwrap_or(0)
}

/// Stage at which a mock connection fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Connect,
    Authorize,
}

/// Mock connection with error injection.
///
/// # Example
///
/// ```
/// use osconnect::providers::mock::{FailAt, MockConnection};
/// use osconnect::provider::Connection;
/// use osconnect::CloudProfile;
///
/// #[tokio::main]
/// async fn main() {
///     let mut ok = MockConnection::new(CloudProfile::new("lab")).unwrap();
///     assert!(ok.authorize().await.is_ok());
///
///     let mut broken = MockConnection::new(CloudProfile::new("broken")).unwrap();
///     broken.fail = Some(FailAt::Authorize);
///     assert!(broken.authorize().await.is_err());
/// }
/// ```
pub struct MockConnection {
    profile: CloudProfile,
    /// Failure to inject
    pub fail: Option<FailAt>,
    /// Delay before `authorize()` completes
    pub delay: std::time::Duration,
}

impl MockConnection {
    /// Creates a mock connection, honoring `fail` and `delay_ms` auth keys.
    ///
    /// # Errors
    ///
    /// Fails with [`ConnectError::Other`] when the profile asks for a
    /// connect-stage failure, and with [`ConnectError::InvalidParameter`]
    /// for an unknown `fail` value.
    pub fn new(profile: CloudProfile) -> Result<Self> {
        record_attempt(&profile.name);

        let fail = match profile.auth.extra_str("fail") {
            None => None,
            Some("connect") => {
                return Err(ConnectError::Other(anyhow::anyhow!(
                    "mock connect failure for {}",
                    profile.name
                )))
            }
            Some("authorize") => Some(FailAt::Authorize),
            Some(other) => {
                return Err(ConnectError::InvalidParameter(format!(
                    "mock fail stage must be 'connect' or 'authorize', got '{}'",
                    other
                )))
            }
        };

        let delay = profile
            .auth
            .extra
            .get("delay_ms")
            .and_then(serde_json::Value::as_u64)
            .map(std::time::Duration::from_millis)
            .unwrap_or_default();

        Ok(Self {
            profile,
            fail,
            delay,
        })
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn provider(&self) -> &str {
        "mock"
    }

    fn cloud(&self) -> &str {
        &self.profile.name
    }

    async fn authorize(&mut self) -> Result<Arc<dyn Session>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.fail {
            Some(FailAt::Connect) => Err(ConnectError::Other(anyhow::anyhow!(
                "mock connect failure for {}",
                self.profile.name
            ))),
            Some(FailAt::Authorize) => Err(ConnectError::AuthenticationFailed(format!(
                "mock authorize failure for {}",
                self.profile.name
            ))),
            None => Ok(Arc::new(MockSession::new(&self.profile))),
        }
    }
}

/// Mock session valid for one hour.
#[derive(Debug, Clone)]
pub struct MockSession {
    cloud: String,
    token: String,
    expires_at: DateTime<Utc>,
    project_id: String,
    region: Option<String>,
    interface: Interface,
}

impl MockSession {
    fn new(profile: &CloudProfile) -> Self {
        Self {
            cloud: profile.name.clone(),
            token: format!("mock-{}", uuid::Uuid::new_v4()),
            expires_at: Utc::now() + Duration::hours(1),
            project_id: profile
                .auth
                .project_id
                .clone()
                .unwrap_or_else(|| "mock-project".to_string()),
            region: profile.region_name.clone(),
            interface: profile.interface,
        }
    }
}

impl Session for MockSession {
    fn cloud(&self) -> &str {
        &self.cloud
    }

    fn token(&self) -> &str {
        &self.token
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        Some(self.expires_at)
    }

    fn project_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }

    fn catalog(&self) -> &[CatalogEntry] {
        &[]
    }

    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn interface(&self) -> Interface {
        self.interface
    }
}

/// Registers the mock provider with the factory.
pub fn register() {
    crate::factory::register_provider(AUTH_TYPE, |profile| {
        Ok(Box::new(MockConnection::new(profile)?))
    });
}
