//! Authorized session handles.
//!
//! This module provides the [`Session`] trait returned by every provider and
//! the service catalog types used for endpoint lookups.

use crate::profile::Interface;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session represents an authorized connection to one cloud.
///
/// Sessions are opaque to the connector: it only holds them and hands them
/// back to the caller. Lifetime and cleanup belong to the caller.
///
/// # Thread Safety
///
/// All session implementations must be `Send + Sync` so that result mappings
/// can be shared across async tasks.
pub trait Session: Send + Sync + std::fmt::Debug {
    /// Returns the cloud name or caller-chosen key this session belongs to.
    fn cloud(&self) -> &str;

    /// Returns the auth token to send as `X-Auth-Token`.
    fn token(&self) -> &str;

    /// Returns when the token expires, if the provider reported it.
    fn expires_at(&self) -> Option<DateTime<Utc>>;

    /// Returns the id of the project the token is scoped to.
    fn project_id(&self) -> Option<&str>;

    /// Returns the service catalog delivered with the token.
    fn catalog(&self) -> &[CatalogEntry];

    /// Returns the region the session was configured with.
    fn region(&self) -> Option<&str>;

    /// Returns the interface the session was configured with.
    fn interface(&self) -> Interface;

    /// Checks whether the token is still within its lifetime.
    fn is_valid(&self) -> bool {
        match self.expires_at() {
            Some(expiry) => Utc::now() < expiry,
            None => true,
        }
    }

    /// Finds the endpoint URL of a service.
    ///
    /// Uses the session's interface and region. An endpoint without a region
    /// matches any region.
    fn endpoint(&self, service_type: &str) -> Option<&str> {
        find_endpoint(self.catalog(), service_type, self.interface(), self.region())
    }
}

/// One service in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// One endpoint of a catalog service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub interface: Interface,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    pub url: String,
}

/// Finds a service endpoint in a catalog.
///
/// # Example
///
/// ```
/// use osconnect::session::{find_endpoint, CatalogEntry, Endpoint};
/// use osconnect::Interface;
///
/// let catalog = vec![CatalogEntry {
///     service_type: "compute".into(),
///     name: Some("nova".into()),
///     endpoints: vec![Endpoint {
///         interface: Interface::Public,
///         region: Some("regionOne".into()),
///         region_id: None,
///         url: "https://nova:8774/v2.1".into(),
///     }],
/// }];
///
/// assert_eq!(
///     find_endpoint(&catalog, "compute", Interface::Public, Some("regionOne")),
///     Some("https://nova:8774/v2.1")
/// );
/// assert_eq!(find_endpoint(&catalog, "compute", Interface::Admin, None), None);
/// ```
pub fn find_endpoint<'a>(
    catalog: &'a [CatalogEntry],
    service_type: &str,
    interface: Interface,
    region: Option<&str>,
) -> Option<&'a str> {
    catalog
        .iter()
        .filter(|entry| entry.service_type == service_type)
        .flat_map(|entry| entry.endpoints.iter())
        .find(|ep| {
            ep.interface == interface
                && match (region, ep.region.as_deref().or(ep.region_id.as_deref())) {
                    (Some(wanted), Some(actual)) => wanted == actual,
                    _ => true,
                }
        })
        .map(|ep| ep.url.as_str())
}
