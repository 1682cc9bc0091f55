//! osconnect - Open authorized sessions to one or more OpenStack clouds.
//!
//! osconnect resolves which clouds to talk to and opens one authorized
//! session per cloud. Clouds come from named clouds.yaml profiles, from
//! every profile at once, from inline credentials, or from `OS_CLOUD`. The
//! result is an ordered mapping from cloud name to session handle, ready for
//! an inventory or assessment tool to use.
//!
//! # Features
//!
//! - **clouds.yaml aware**: Standard search path plus `secure.yaml` overlay
//! - **Two failure policies**: Profiles are all-or-nothing, inline
//!   credentials are best-effort, and the result type says which applied
//! - **Bounded parallelism**: Attempts overlap up to a configurable limit
//!   while results keep input order
//! - **Pluggable providers**: Keystone v3 over HTTP, plus a mock provider
//!   for tests
//!
//! # Quick Start
//!
//! ```no_run
//! use osconnect::{ConnectRequest, Connections};
//!
//! #[tokio::main]
//! async fn main() -> osconnect::Result<()> {
//!     let request = ConnectRequest::new()
//!         .with_clouds(["ie2-osp10-inf", "ie2-osp10-lab"])
//!         .with_concurrency(4);
//!
//!     let connections = osconnect::connect(&request).await?;
//!
//!     if let Connections::AllOrNothing(sessions) = &connections {
//!         for (cloud, session) in sessions {
//!             println!("{}: compute at {:?}", cloud, session.endpoint("compute"));
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Providers
//!
//! | Provider | Feature Flag | `auth_type` values |
//! |----------|-------------|--------------------|
//! | Mock | `mock` (default) | `mock` |
//! | Keystone v3 | `keystone` (default) | `password`, `v3password`, `token`, `v3token`, `v3applicationcredential` |

pub mod clouds;
pub mod config;
pub mod connector;
pub mod error;
pub mod factory;
pub mod frontend;
pub mod profile;
pub mod provider;
pub mod providers;
pub mod resolve;
pub mod session;
pub mod validation;

pub use clouds::CloudConfigStore;
pub use config::ConnectRequest;
pub use connector::{Connections, Connector, SessionMap};
pub use error::{ConnectError, Result};
pub use profile::{AuthSettings, CloudProfile, InlineCredentials, Interface};
pub use provider::Connection;
pub use session::Session;

use std::path::PathBuf;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the osconnect library.
///
/// This registers all compiled providers with the factory. It's called
/// automatically by [`connect`], but must be called explicitly before using
/// [`Connector`] or [`factory::connect`] directly (it's idempotent).
pub fn init() {
    INIT.call_once(providers::register_all);
}

/// Connects to the clouds described by `request`.
///
/// clouds.yaml is read from the default search path only when the targets
/// are profiles. Inline credentials, or a request that names no targets at
/// all, never touch the file.
///
/// # Errors
///
/// See [`Connector::connect`].
pub async fn connect(request: &ConnectRequest) -> Result<Connections> {
    let os_cloud = resolve::os_cloud_from_env();
    connect_from(
        request,
        os_cloud.as_deref(),
        &clouds::default_search_paths(),
        clouds::secure_file_override(),
    )
    .await
}

async fn connect_from(
    request: &ConnectRequest,
    os_cloud: Option<&str>,
    candidates: &[PathBuf],
    secure: Option<PathBuf>,
) -> Result<Connections> {
    init();

    let store = if resolve::reads_profiles(request, os_cloud) {
        CloudConfigStore::load_from(candidates, secure).await?
    } else {
        CloudConfigStore::empty()
    };

    Connector::new(store).connect_with_env(request, os_cloud).await
}
