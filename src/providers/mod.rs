//! Session provider implementations.

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "keystone")]
pub mod keystone;

/// Registers all compiled providers with the factory.
///
/// This should be called automatically when the library is used,
/// but can also be called explicitly if needed.
pub fn register_all() {
    #[cfg(feature = "mock")]
    mock::register();

    #[cfg(feature = "keystone")]
    keystone::register();
}
