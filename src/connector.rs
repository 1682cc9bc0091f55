//! Multi-cloud connection fan-out.
//!
//! The connector resolves a [`ConnectRequest`] into targets and opens one
//! session per target. The failure policy depends on where the targets came
//! from, and the result type says which one applied:
//!
//! - **Profiles** are all-or-nothing. The first failure in input order
//!   aborts the call, remaining attempts are cancelled, and no mapping is
//!   returned ([`Connections::AllOrNothing`]).
//! - **Inline credentials** are best-effort. A failed record is logged and
//!   maps to `None`; the call still succeeds ([`Connections::BestEffort`]).
//!
//! Attempts run with at most `concurrency` in flight. Results keep input
//! order either way.

use crate::clouds::CloudConfigStore;
use crate::config::ConnectRequest;
use crate::profile::{CloudProfile, InlineCredentials};
use crate::resolve::{os_cloud_from_env, resolve, ResolveContext, Targets};
use crate::{factory, ConnectError, Result, Session};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

/// Immutable mapping from target key to value, in input order.
///
/// Built once by the connector; there is no way to add or remove entries
/// afterwards.
#[derive(Debug, Clone)]
pub struct SessionMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> SessionMap<V> {
    pub(crate) fn from_entries(entries: Vec<(String, V)>) -> Self {
        Self { entries }
    }

    /// Looks up the value for a key.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys in input order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a, V> IntoIterator for &'a SessionMap<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a V)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Result of a connect call, tagged with the failure policy that applied.
#[derive(Debug, Clone)]
pub enum Connections {
    /// Every profile connected.
    AllOrNothing(SessionMap<Arc<dyn Session>>),
    /// One entry per inline record; `None` marks a failed attempt.
    BestEffort(SessionMap<Option<Arc<dyn Session>>>),
}

impl Connections {
    pub fn len(&self) -> usize {
        match self {
            Self::AllOrNothing(map) => map.len(),
            Self::BestEffort(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in input order.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::AllOrNothing(map) => map.keys().collect(),
            Self::BestEffort(map) => map.keys().collect(),
        }
    }

    /// Returns the session for a key, or `None` if the key is unknown or
    /// its attempt failed.
    pub fn session(&self, key: &str) -> Option<&Arc<dyn Session>> {
        match self {
            Self::AllOrNothing(map) => map.get(key),
            Self::BestEffort(map) => map.get(key).and_then(Option::as_ref),
        }
    }

    /// Entries in input order, with `None` for failed attempts.
    pub fn entries(&self) -> Vec<(&str, Option<&Arc<dyn Session>>)> {
        match self {
            Self::AllOrNothing(map) => map.iter().map(|(k, s)| (k, Some(s))).collect(),
            Self::BestEffort(map) => map.iter().map(|(k, s)| (k, s.as_ref())).collect(),
        }
    }

    /// Keys whose attempt failed. Always empty for [`Connections::AllOrNothing`].
    pub fn failed(&self) -> Vec<&str> {
        match self {
            Self::AllOrNothing(_) => Vec::new(),
            Self::BestEffort(map) => map
                .iter()
                .filter(|(_, s)| s.is_none())
                .map(|(k, _)| k)
                .collect(),
        }
    }
}

/// Opens a connection for a profile and authorizes it.
async fn open_session(profile: CloudProfile) -> Result<Arc<dyn Session>> {
    let mut connection = factory::connect(profile)?;
    connection.authorize().await
}

async fn open_profile(store: &CloudConfigStore, name: &str) -> Result<Arc<dyn Session>> {
    let profile = store.profile(name)?;
    open_session(profile).await
}

/// Connects to clouds described by a [`ConnectRequest`].
///
/// # Example
///
/// ```no_run
/// use osconnect::{CloudConfigStore, ConnectRequest, Connector};
///
/// #[tokio::main]
/// async fn main() -> osconnect::Result<()> {
///     osconnect::init();
///
///     let connector = Connector::new(CloudConfigStore::load().await?);
///     let request = ConnectRequest::new().with_clouds(["ie2-osp10-inf"]);
///
///     let connections = connector.connect(&request).await?;
///     for key in connections.keys() {
///         println!("connected to {}", key);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Connector {
    store: CloudConfigStore,
}

impl Connector {
    /// Creates a connector over a configuration store.
    pub fn new(store: CloudConfigStore) -> Self {
        Self { store }
    }

    /// Returns the configuration store.
    pub fn store(&self) -> &CloudConfigStore {
        &self.store
    }

    /// Resolves the request's targets and connects to them.
    ///
    /// `OS_CLOUD` is read from the process environment; see
    /// [`Connector::connect_with_env`] to supply it explicitly.
    ///
    /// # Errors
    ///
    /// - Configuration errors ([`ConnectError::NoTargets`],
    ///   [`ConnectError::InvalidParameter`], ...): raised before any attempt
    /// - [`ConnectError::Enumeration`]: `all_clouds` could not list profiles
    /// - [`ConnectError::Cloud`]: a profile failed to connect or authorize
    pub async fn connect(&self, request: &ConnectRequest) -> Result<Connections> {
        let os_cloud = os_cloud_from_env();
        self.connect_with_env(request, os_cloud.as_deref()).await
    }

    /// Like [`Connector::connect`], with an explicit `OS_CLOUD` value.
    pub async fn connect_with_env(
        &self,
        request: &ConnectRequest,
        os_cloud: Option<&str>,
    ) -> Result<Connections> {
        request.validate()?;

        let targets = resolve(&ResolveContext::new(request, &self.store, os_cloud))?;
        match targets {
            Targets::Profiles(names) => self
                .connect_profiles(&names, request.concurrency)
                .await
                .map(Connections::AllOrNothing),
            Targets::Inline(creds) => Ok(Connections::BestEffort(
                self.connect_inline(&creds, request.concurrency).await,
            )),
        }
    }

    /// Connects to every named profile, or to none.
    ///
    /// The first failure in input order aborts the call; attempts still in
    /// flight are dropped and no further attempts start.
    pub async fn connect_profiles(
        &self,
        names: &[String],
        concurrency: usize,
    ) -> Result<SessionMap<Arc<dyn Session>>> {
        let config_files = if self.store.loaded_files().is_empty() {
            self.store.searched_files()
        } else {
            self.store.loaded_files()
        };

        let entries: Vec<(String, Arc<dyn Session>)> = stream::iter(names.iter().cloned())
            .map(|name| async move {
                match open_profile(&self.store, &name).await {
                    Ok(session) => {
                        tracing::info!(cloud = %name, "connected");
                        Ok((name, session))
                    }
                    Err(e) => {
                        tracing::debug!(cloud = %name, error = %e, "connection failed, aborting");
                        Err(ConnectError::cloud_op(name, config_files.to_vec(), e))
                    }
                }
            })
            .buffered(concurrency.max(1))
            .try_collect()
            .await?;

        Ok(SessionMap::from_entries(entries))
    }

    /// Connects with each credential record independently.
    ///
    /// Never fails as a whole: a failed record is logged and maps to `None`.
    /// Keys are taken as given; [`Connector::connect`] rejects duplicates
    /// before calling this.
    pub async fn connect_inline(
        &self,
        creds: &[InlineCredentials],
        concurrency: usize,
    ) -> SessionMap<Option<Arc<dyn Session>>> {
        let entries: Vec<(String, Option<Arc<dyn Session>>)> = stream::iter(creds)
            .map(|record| async move {
                let key = record.cloud.clone();
                match open_session(record.to_profile()).await {
                    Ok(session) => {
                        tracing::info!(cloud = %key, "connected");
                        (key, Some(session))
                    }
                    Err(e) => {
                        tracing::warn!(cloud = %key, error = %e, "Cannot connect to cloud");
                        (key, None)
                    }
                }
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        SessionMap::from_entries(entries)
    }
}
