//! Keystone identity v3 provider.
//!
//! This provider authenticates directly against the OpenStack identity API
//! (`POST /v3/auth/tokens`) using `reqwest`.
//!
//! # Supported auth types
//!
//! | `auth_type` | Required auth fields |
//! |-------------|----------------------|
//! | `password`, `v3password` | `auth_url`, `username` or `user_id`, `password` |
//! | `token`, `v3token` | `auth_url`, `token` |
//! | `v3applicationcredential` | `auth_url`, `application_credential_secret`, and `application_credential_id` or `application_credential_name` + user |
//!
//! Project scope comes from `project_id`, or `project_name` plus a project
//! domain (`project_domain_id`, `project_domain_name`, `domain_id`,
//! `domain_name`, falling back to `Default`). Without a project the token is
//! unscoped.
//!
//! # Example
//!
//! ```no_run
//! use osconnect::{factory, AuthSettings, CloudProfile};
//!
//! #[tokio::main]
//! async fn main() -> osconnect::Result<()> {
//!     osconnect::init();
//!
//!     let profile = CloudProfile::new("lab").with_auth(AuthSettings {
//!         auth_url: Some("https://keystone.lab:5000".into()),
//!         username: Some("admin".into()),
//!         password: Some("secret".into()),
//!         project_name: Some("admin".into()),
//!         ..Default::default()
//!     });
//!
//!     let mut connection = factory::connect(profile)?;
//!     let session = connection.authorize().await?;
//!     println!("compute: {:?}", session.endpoint("compute"));
//!     Ok(())
//! }
//! ```

mod connection;
mod session;

pub use connection::{AuthMethod, KeystoneConnection};
pub use session::KeystoneSession;

/// Auth types handled by this provider.
pub const AUTH_TYPES: &[&str] = &[
    "password",
    "v3password",
    "token",
    "v3token",
    "v3applicationcredential",
];

/// Registers the Keystone provider with the factory.
pub fn register() {
    for auth_type in AUTH_TYPES {
        crate::factory::register_provider(auth_type, |profile| {
            Ok(Box::new(KeystoneConnection::new(profile)?))
        });
    }
}
