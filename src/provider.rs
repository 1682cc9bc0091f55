//! Connection trait implemented by session providers.
//!
//! A provider turns a [`CloudProfile`](crate::CloudProfile) into a
//! [`Connection`] (the "connect" step, see
//! [`factory::connect`](crate::factory::connect)) and then exchanges the
//! profile's credentials for a [`Session`] (the "authorize" step).

use crate::{Result, Session};
use async_trait::async_trait;
use std::sync::Arc;

/// Connection represents a configured but not yet authorized link to a cloud.
///
/// All implementations must be `Send + Sync` so attempts can run on any
/// tokio worker.
///
/// # Implementations
///
/// - **HTTP**: Keystone identity v3 (`password`, `token`,
///   `v3applicationcredential`)
/// - **Testing**: Mock provider with error injection
///
/// # Example
///
/// ```no_run
/// use osconnect::{factory, CloudConfigStore};
///
/// #[tokio::main]
/// async fn main() -> osconnect::Result<()> {
///     osconnect::init();
///
///     let store = CloudConfigStore::load().await?;
///     let profile = store.profile("lab")?;
///
///     let mut connection = factory::connect(profile)?;
///     let session = connection.authorize().await?;
///
///     println!("{} token expires at {:?}", session.cloud(), session.expires_at());
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Connection: Send + Sync {
    /// Returns the provider name (e.g., "keystone", "mock").
    fn provider(&self) -> &str;

    /// Returns the cloud name or caller-chosen key.
    fn cloud(&self) -> &str;

    /// Performs the credential exchange and returns an authorized session.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::AuthenticationFailed`](crate::ConnectError::AuthenticationFailed):
    ///   the identity service rejected the credentials
    /// - [`ConnectError::Http`](crate::ConnectError::Http):
    ///   the identity service answered with an unexpected status
    async fn authorize(&mut self) -> Result<Arc<dyn Session>>;

    /// Releases provider resources.
    ///
    /// Sessions already handed out stay usable.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
