//! Keystone connection: request building and token exchange.

use crate::profile::{AuthSettings, CloudProfile};
use crate::provider::Connection;
use crate::providers::keystone::KeystoneSession;
use crate::session::CatalogEntry;
use crate::validation::{require_field, validate_auth_url};
use crate::{ConnectError, Result, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;

const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";
const DEFAULT_DOMAIN: &str = "Default";

/// How a user is identified in a password or application-credential request.
#[derive(Debug, Clone, PartialEq)]
enum UserRef {
    Id(String),
    Name { name: String, domain: Value },
}

impl UserRef {
    fn to_json(&self) -> Value {
        match self {
            Self::Id(id) => json!({ "id": id }),
            Self::Name { name, domain } => json!({ "name": name, "domain": domain }),
        }
    }
}

/// The identity method sent to Keystone.
///
/// Built once when the connection is created, so a profile with missing
/// fields fails at connect time rather than after a network round-trip.
#[derive(Clone, PartialEq)]
pub enum AuthMethod {
    Password {
        /// `{"id": ..}` or `{"name": .., "domain": {..}}`
        user: Value,
        password: String,
    },
    Token {
        token: String,
    },
    ApplicationCredential {
        /// Either `{"id": ..}` or `{"name": .., "user": {..}}`
        credential: Value,
        secret: String,
    },
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { user, .. } => f
                .debug_struct("Password")
                .field("user", user)
                .finish_non_exhaustive(),
            Self::Token { .. } => f.debug_struct("Token").finish_non_exhaustive(),
            Self::ApplicationCredential { credential, .. } => f
                .debug_struct("ApplicationCredential")
                .field("credential", credential)
                .finish_non_exhaustive(),
        }
    }
}

impl AuthMethod {
    /// Derives the identity method from a profile's auth type and fields.
    pub fn from_profile(profile: &CloudProfile) -> Result<Self> {
        let cloud = profile.name.as_str();
        let auth = &profile.auth;

        match profile.auth_type.as_str() {
            "password" | "v3password" => Ok(Self::Password {
                user: user_ref(cloud, auth)?.to_json(),
                password: require_field(cloud, "password", auth.password.as_deref())?
                    .to_string(),
            }),
            "token" | "v3token" => Ok(Self::Token {
                token: require_field(cloud, "token", auth.token.as_deref())?.to_string(),
            }),
            "v3applicationcredential" => {
                let secret = require_field(
                    cloud,
                    "application_credential_secret",
                    auth.application_credential_secret.as_deref(),
                )?
                .to_string();

                let credential = match auth.application_credential_id.as_deref() {
                    Some(id) if !id.trim().is_empty() => json!({ "id": id }),
                    _ => {
                        let name = require_field(
                            cloud,
                            "application_credential_name",
                            auth.application_credential_name.as_deref(),
                        )?;
                        json!({ "name": name, "user": user_ref(cloud, auth)?.to_json() })
                    }
                };

                Ok(Self::ApplicationCredential { credential, secret })
            }
            other => Err(ConnectError::UnsupportedAuthType(other.to_string())),
        }
    }

    fn to_identity(&self) -> Value {
        match self {
            Self::Password { user, password } => {
                let mut user = user.clone();
                user["password"] = json!(password);
                json!({ "methods": ["password"], "password": { "user": user } })
            }
            Self::Token { token } => json!({ "methods": ["token"], "token": { "id": token } }),
            Self::ApplicationCredential { credential, secret } => {
                let mut credential = credential.clone();
                credential["secret"] = json!(secret);
                json!({
                    "methods": ["application_credential"],
                    "application_credential": credential,
                })
            }
        }
    }

    fn allows_scope(&self) -> bool {
        !matches!(self, Self::ApplicationCredential { .. })
    }
}

fn domain_ref(id: Option<&str>, name: Option<&str>) -> Value {
    match (id, name) {
        (Some(id), _) => json!({ "id": id }),
        (None, Some(name)) => json!({ "name": name }),
        (None, None) => json!({ "name": DEFAULT_DOMAIN }),
    }
}

fn user_ref(cloud: &str, auth: &AuthSettings) -> Result<UserRef> {
    if let Some(id) = auth.user_id.as_deref().filter(|s| !s.trim().is_empty()) {
        return Ok(UserRef::Id(id.to_string()));
    }
    let name = require_field(cloud, "username", auth.username.as_deref())?;
    Ok(UserRef::Name {
        name: name.to_string(),
        domain: domain_ref(
            auth.user_domain_id.as_deref().or(auth.domain_id.as_deref()),
            auth.user_domain_name
                .as_deref()
                .or(auth.domain_name.as_deref()),
        ),
    })
}

fn project_scope(auth: &AuthSettings) -> Option<Value> {
    if let Some(id) = auth.project_id.as_deref() {
        return Some(json!({ "project": { "id": id } }));
    }
    let name = auth.project_name.as_deref()?;
    Some(json!({
        "project": {
            "name": name,
            "domain": domain_ref(
                auth.project_domain_id.as_deref().or(auth.domain_id.as_deref()),
                auth.project_domain_name
                    .as_deref()
                    .or(auth.domain_name.as_deref()),
            ),
        }
    }))
}

// Version discovery is not performed; identity v3 is assumed.
fn normalize_auth_url(mut url: Url) -> Url {
    let path = url.path().trim_end_matches('/').to_string();
    if path.ends_with("/v3") {
        url.set_path(&path);
    } else {
        url.set_path(&format!("{}/v3", path));
    }
    url
}

fn join_path(base: &Url, segment: &str) -> Url {
    let mut url = base.clone();
    url.set_path(&format!("{}/{}", base.path().trim_end_matches('/'), segment));
    url
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    project: Option<IdRef>,
    #[serde(default)]
    user: Option<IdRef>,
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Keystone identity v3 connection.
pub struct KeystoneConnection {
    profile: CloudProfile,
    identity_url: Url,
    method: AuthMethod,
    client: Option<reqwest::Client>,
}

impl KeystoneConnection {
    /// Creates a connection from a profile.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::MissingAuthField`]: a field the auth type needs is absent
    /// - [`ConnectError::InvalidParameter`]: `auth_url` is not http(s), or the
    ///   profile asks for an identity API version other than 3
    pub fn new(profile: CloudProfile) -> Result<Self> {
        let auth_url = require_field(&profile.name, "auth_url", profile.auth.auth_url.as_deref())?;
        let auth_url = validate_auth_url(&profile.name, auth_url)?;

        if let Some(version) = profile.get_option("identity_api_version") {
            if version != "3" && version != "3.0" {
                return Err(ConnectError::InvalidParameter(format!(
                    "cloud {}: identity_api_version {} is not supported",
                    profile.name, version
                )));
            }
        }

        let method = AuthMethod::from_profile(&profile)?;
        let identity_url = normalize_auth_url(auth_url);

        Ok(Self {
            profile,
            identity_url,
            method,
            client: None,
        })
    }

    /// Normalizes an auth URL so that its path ends in `/v3`.
    ///
    /// The query string, if any, is kept.
    ///
    /// ```
    /// use osconnect::providers::keystone::KeystoneConnection;
    ///
    /// assert_eq!(
    ///     KeystoneConnection::identity_url("lab", "https://ks:5000/").unwrap().as_str(),
    ///     "https://ks:5000/v3"
    /// );
    /// assert_eq!(
    ///     KeystoneConnection::identity_url("lab", "https://ks:13000/v3").unwrap().as_str(),
    ///     "https://ks:13000/v3"
    /// );
    /// assert_eq!(
    ///     KeystoneConnection::identity_url("lab", "https://ks/identity?x=1").unwrap().as_str(),
    ///     "https://ks/identity/v3?x=1"
    /// );
    /// ```
    pub fn identity_url(cloud: &str, auth_url: &str) -> Result<Url> {
        Ok(normalize_auth_url(validate_auth_url(cloud, auth_url)?))
    }

    /// Builds the `POST /auth/tokens` request body.
    pub fn auth_request(&self) -> Value {
        let mut auth = json!({ "identity": self.method.to_identity() });
        if self.method.allows_scope() {
            if let Some(scope) = project_scope(&self.profile.auth) {
                auth["scope"] = scope;
            }
        }
        json!({ "auth": auth })
    }

    async fn client(&mut self) -> Result<reqwest::Client> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("osconnect/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!self.profile.verify);

        if let Some(cacert) = &self.profile.cacert {
            let pem = tokio::fs::read(cacert).await?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        let client = builder.build()?;
        self.client = Some(client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Connection for KeystoneConnection {
    fn provider(&self) -> &str {
        "keystone"
    }

    fn cloud(&self) -> &str {
        &self.profile.name
    }

    async fn authorize(&mut self) -> Result<Arc<dyn Session>> {
        let client = self.client().await?;
        let url = join_path(&self.identity_url, "auth/tokens");

        tracing::debug!(cloud = %self.profile.name, %url, method = ?self.method, "requesting token");

        let response = client
            .post(url)
            .json(&self.auth_request())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectError::AuthenticationFailed(error_message(&body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectError::Http {
                status: status.as_u16(),
                body: error_message(&body),
            });
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ConnectError::Other(anyhow::anyhow!(
                    "identity response carried no {} header",
                    SUBJECT_TOKEN_HEADER
                ))
            })?;

        let body: TokenResponse = response.json().await?;

        tracing::debug!(
            cloud = %self.profile.name,
            expires_at = ?body.token.expires_at,
            services = body.token.catalog.len(),
            "token issued"
        );

        Ok(Arc::new(KeystoneSession {
            cloud: self.profile.name.clone(),
            identity_url: self.identity_url.to_string(),
            token,
            expires_at: body.token.expires_at,
            project_id: body.token.project.map(|p| p.id),
            user_id: body.token.user.map(|u| u.id),
            catalog: body.token.catalog,
            region: self.profile.region_name.clone(),
            interface: self.profile.interface,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.client = None;
        Ok(())
    }
}
