//! Connection settings for a single cloud.
//!
//! A [`CloudProfile`] is what a provider needs to open a session. It is
//! produced either from a named entry in clouds.yaml (see
//! [`CloudConfigStore`](crate::clouds::CloudConfigStore)) or from an
//! [`InlineCredentials`] record supplied by the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Auth type used when none is given.
pub const DEFAULT_AUTH_TYPE: &str = "password";

/// Endpoint interface used for catalog lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    /// Public endpoints (default)
    #[default]
    #[serde(alias = "publicURL")]
    Public,
    /// Internal endpoints
    #[serde(alias = "internalURL")]
    Internal,
    /// Admin endpoints
    #[serde(alias = "adminURL")]
    Admin,
}

impl std::fmt::Display for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Internal => write!(f, "internal"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// The `auth` section of a cloud entry.
///
/// Every field is optional here; each provider decides which ones its auth
/// method requires. Keys this struct does not know are kept in `extra`.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub auth_url: Option<String>,
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub password: Option<String>,
    pub project_name: Option<String>,
    pub project_id: Option<String>,
    pub user_domain_name: Option<String>,
    pub user_domain_id: Option<String>,
    pub project_domain_name: Option<String>,
    pub project_domain_id: Option<String>,
    /// Applies to both user and project when the specific fields are absent
    pub domain_name: Option<String>,
    pub domain_id: Option<String>,
    pub token: Option<String>,
    pub application_credential_id: Option<String>,
    pub application_credential_name: Option<String>,
    pub application_credential_secret: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl AuthSettings {
    /// Looks up an unrecognized auth key as a string.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

// Secrets stay out of logs and panic messages.
impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(v: &Option<String>) -> Option<&'static str> {
            v.as_ref().map(|_| "<redacted>")
        }
        f.debug_struct("AuthSettings")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .field("password", &redact(&self.password))
            .field("project_name", &self.project_name)
            .field("project_id", &self.project_id)
            .field("user_domain_name", &self.user_domain_name)
            .field("project_domain_name", &self.project_domain_name)
            .field("domain_name", &self.domain_name)
            .field("token", &redact(&self.token))
            .field("application_credential_id", &self.application_credential_id)
            .field(
                "application_credential_secret",
                &redact(&self.application_credential_secret),
            )
            .finish_non_exhaustive()
    }
}

/// Fully resolved connection settings for one cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudProfile {
    /// Profile name, or the caller-chosen key for inline credentials
    pub name: String,
    /// Auth plugin name (`password`, `token`, `v3applicationcredential`, ...)
    pub auth_type: String,
    pub auth: AuthSettings,
    pub region_name: Option<String>,
    pub interface: Interface,
    /// Verify TLS certificates (default: true)
    pub verify: bool,
    /// CA bundle to trust in addition to the system roots
    pub cacert: Option<PathBuf>,
    /// Keys of the cloud entry that are not modelled above
    pub options: BTreeMap<String, Value>,
}

impl CloudProfile {
    /// Creates a profile with password auth and default settings.
    ///
    /// # Example
    ///
    /// ```
    /// use osconnect::CloudProfile;
    ///
    /// let profile = CloudProfile::new("lab");
    /// assert_eq!(profile.auth_type, "password");
    /// assert!(profile.verify);
    /// ```
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auth_type: DEFAULT_AUTH_TYPE.to_string(),
            auth: AuthSettings::default(),
            region_name: None,
            interface: Interface::default(),
            verify: true,
            cacert: None,
            options: BTreeMap::new(),
        }
    }

    /// Sets the auth type.
    pub fn with_auth_type(mut self, auth_type: impl Into<String>) -> Self {
        self.auth_type = auth_type.into();
        self
    }

    /// Replaces the auth settings.
    pub fn with_auth(mut self, auth: AuthSettings) -> Self {
        self.auth = auth;
        self
    }

    /// Sets the region used for catalog lookups.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region_name = Some(region.into());
        self
    }

    /// Gets a scalar profile option as a string.
    ///
    /// YAML often carries numbers and booleans unquoted
    /// (`identity_api_version: 3`); those are rendered as text.
    pub fn get_option(&self, key: &str) -> Option<String> {
        match self.options.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Connection parameters supplied directly by the caller.
///
/// The layout matches a flat clouds.yaml entry: auth fields sit next to
/// `region_name` and friends rather than under an `auth` key. `cloud` is only
/// used as the key of the returned mapping.
///
/// ```
/// use osconnect::InlineCredentials;
///
/// let creds: InlineCredentials = serde_json::from_str(r#"{
///     "auth_url": "https://keystone.example.com:13000/v3",
///     "username": "admin",
///     "password": "secret",
///     "project_name": "admin",
///     "cloud": "my_cloud"
/// }"#).unwrap();
///
/// assert_eq!(creds.cloud, "my_cloud");
/// assert_eq!(creds.auth.username.as_deref(), Some("admin"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineCredentials {
    /// Caller-chosen key for the result mapping
    pub cloud: String,
    #[serde(default)]
    pub auth_type: Option<String>,
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub interface: Option<Interface>,
    #[serde(default)]
    pub verify: Option<bool>,
    #[serde(default)]
    pub cacert: Option<PathBuf>,
    #[serde(flatten)]
    pub auth: AuthSettings,
}

impl InlineCredentials {
    /// Converts the record into a profile, using exactly the supplied fields.
    pub fn to_profile(&self) -> CloudProfile {
        CloudProfile {
            name: self.cloud.clone(),
            auth_type: self
                .auth_type
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTH_TYPE.to_string()),
            auth: self.auth.clone(),
            region_name: self.region_name.clone(),
            interface: self.interface.unwrap_or_default(),
            verify: self.verify.unwrap_or(true),
            cacert: self.cacert.clone(),
            options: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_to_profile() {
        let creds: InlineCredentials = serde_json::from_value(serde_json::json!({
            "auth_url": "https://keystone:13000/v3",
            "username": "admin",
            "password": "pw",
            "project_name": "admin",
            "region_name": "regionOne",
            "interface": "internal",
            "cloud": "lab",
        }))
        .unwrap();

        let profile = creds.to_profile();
        assert_eq!(profile.name, "lab");
        assert_eq!(profile.auth_type, "password");
        assert_eq!(profile.region_name.as_deref(), Some("regionOne"));
        assert_eq!(profile.interface, Interface::Internal);
        assert_eq!(profile.auth.password.as_deref(), Some("pw"));
        assert!(profile.auth.extra.is_empty());
    }

    #[test]
    fn test_unknown_auth_keys_kept() {
        let auth: AuthSettings = serde_json::from_value(serde_json::json!({
            "username": "u",
            "fail": "authorize",
        }))
        .unwrap();
        assert_eq!(auth.extra_str("fail"), Some("authorize"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let auth = AuthSettings {
            username: Some("admin".into()),
            password: Some("hunter2".into()),
            token: Some("gAAAA".into()),
            ..Default::default()
        };
        let rendered = format!("{:?}", auth);
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("gAAAA"));
    }

    #[test]
    fn test_get_option_renders_scalars() {
        let mut profile = CloudProfile::new("lab");
        profile.options.insert("identity_api_version".into(), Value::from(3));
        profile.options.insert("cloud_type".into(), Value::from("osp"));
        profile.options.insert("nested".into(), serde_json::json!({ "a": 1 }));

        assert_eq!(profile.get_option("identity_api_version").as_deref(), Some("3"));
        assert_eq!(profile.get_option("cloud_type").as_deref(), Some("osp"));
        assert_eq!(profile.get_option("nested"), None);
        assert_eq!(profile.get_option("missing"), None);
    }

    #[test]
    fn test_interface_aliases() {
        let i: Interface = serde_json::from_str("\"publicURL\"").unwrap();
        assert_eq!(i, Interface::Public);
        assert_eq!(Interface::Admin.to_string(), "admin");
    }
}
