//! Provider factory and registration system.

use crate::provider::Connection;
use crate::{CloudProfile, ConnectError, Result};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

/// Factory function type for creating connections.
///
/// Calling the factory is the "connect" step: it validates the profile and
/// prepares a client, but performs no credential exchange.
pub type ProviderFactory = fn(CloudProfile) -> Result<Box<dyn Connection>>;

static PROVIDER_REGISTRY: OnceLock<RwLock<HashMap<String, ProviderFactory>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, ProviderFactory>> {
    PROVIDER_REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers a provider factory for an auth type.
///
/// This is typically called from provider modules' `register()` functions
/// during library initialization. Registering the same auth type twice
/// replaces the earlier factory.
///
/// # Example
///
/// ```no_run
/// use osconnect::factory::register_provider;
/// use osconnect::provider::Connection;
/// use osconnect::{CloudProfile, Result};
///
/// fn my_factory(profile: CloudProfile) -> Result<Box<dyn Connection>> {
///     // Validate the profile and build a connection
///     # unimplemented!()
/// }
///
/// pub fn register() {
///     register_provider("v3oidcpassword", my_factory);
/// }
/// ```
pub fn register_provider(auth_type: &str, factory: ProviderFactory) {
    let mut reg = registry().write().unwrap_or_else(|e| e.into_inner());
    reg.insert(auth_type.to_string(), factory);
}

/// Opens a connection for a profile.
///
/// The factory is looked up by `profile.auth_type`. If none is registered,
/// an error is returned with a hint to check feature flags.
///
/// # Errors
///
/// Returns an error if:
/// - No provider handles the auth type (missing feature flag or `init()` call)
/// - The provider rejects the profile (missing auth fields, bad URL, ...)
pub fn connect(profile: CloudProfile) -> Result<Box<dyn Connection>> {
    let factory = {
        let reg = registry().read().unwrap_or_else(|e| e.into_inner());
        *reg.get(&profile.auth_type).ok_or_else(|| {
            ConnectError::UnsupportedAuthType(format!(
                "{} (did you enable the provider's feature flag and call osconnect::init()?)",
                profile.auth_type
            ))
        })?
    };

    factory(profile)
}

/// Lists registered auth types, sorted.
pub fn registered_auth_types() -> Vec<String> {
    let reg = registry().read().unwrap_or_else(|e| e.into_inner());
    let mut names: Vec<String> = reg.keys().cloned().collect();
    names.sort();
    names
}
