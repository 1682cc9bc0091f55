//! Keystone session implementation.

use crate::profile::Interface;
use crate::session::CatalogEntry;
use crate::Session;
use chrono::{DateTime, Utc};

/// Session backed by a Keystone-issued token.
///
/// The token is not refreshed; once `expires_at` passes the caller must open
/// a new session.
#[derive(Clone)]
pub struct KeystoneSession {
    pub(crate) cloud: String,
    pub(crate) identity_url: String,
    pub(crate) token: String,
    pub(crate) expires_at: Option<DateTime<Utc>>,
    pub(crate) project_id: Option<String>,
    pub(crate) user_id: Option<String>,
    pub(crate) catalog: Vec<CatalogEntry>,
    pub(crate) region: Option<String>,
    pub(crate) interface: Interface,
}

impl KeystoneSession {
    /// Returns the identity endpoint the token was issued by.
    pub fn identity_url(&self) -> &str {
        &self.identity_url
    }

    /// Returns the id of the authenticated user.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

impl std::fmt::Debug for KeystoneSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeystoneSession")
            .field("cloud", &self.cloud)
            .field("identity_url", &self.identity_url)
            .field("expires_at", &self.expires_at)
            .field("project_id", &self.project_id)
            .field("services", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl Session for KeystoneSession {
    fn cloud(&self) -> &str {
        &self.cloud
    }

    fn token(&self) -> &str {
        &self.token
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn interface(&self) -> Interface {
        self.interface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_at: Option<DateTime<Utc>>) -> KeystoneSession {
        KeystoneSession {
            cloud: "lab".into(),
            identity_url: "https://ks/v3".into(),
            token: "gAAAAB-secret-token".into(),
            expires_at,
            project_id: Some("p".into()),
            user_id: Some("u".into()),
            catalog: Vec::new(),
            region: None,
            interface: Interface::Public,
        }
    }

    #[test]
    fn test_validity_follows_expiry() {
        assert!(session(Some(Utc::now() + Duration::hours(1))).is_valid());
        assert!(!session(Some(Utc::now() - Duration::seconds(1))).is_valid());
        assert!(session(None).is_valid());
    }

    #[test]
    fn test_debug_hides_token() {
        let rendered = format!("{:?}", session(None));
        assert!(rendered.contains("lab"));
        assert!(!rendered.contains("secret-token"));
    }
}
