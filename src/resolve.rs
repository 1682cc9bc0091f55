//! Target resolution.
//!
//! A request can name its targets in several ways. Each way is a
//! [`Resolver`]: a pure function from the [`ResolveContext`] to an optional
//! target list. [`RESOLVERS`] lists them in precedence order and the first
//! one that answers wins:
//!
//! 1. inline credentials
//! 2. `all_clouds` (enumerate clouds.yaml)
//! 3. an explicit, non-empty `clouds` list
//! 4. the `OS_CLOUD` environment value
//!
//! If none answers, resolution fails with [`ConnectError::NoTargets`].

use crate::clouds::CloudConfigStore;
use crate::config::{split_cloud_list, ConnectRequest, OS_CLOUD_ENV};
use crate::profile::InlineCredentials;
use crate::validation::validate_cloud_name;
use crate::{ConnectError, Result};
use std::collections::HashSet;

/// What the connector should connect to.
#[derive(Debug, Clone, PartialEq)]
pub enum Targets {
    /// Profile names, resolved against clouds.yaml
    Profiles(Vec<String>),
    /// Credential records supplied by the caller
    Inline(Vec<InlineCredentials>),
}

impl Targets {
    /// Result-mapping keys, in input order.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Profiles(names) => names.iter().map(String::as_str).collect(),
            Self::Inline(creds) => creds.iter().map(|c| c.cloud.as_str()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Profiles(names) => names.len(),
            Self::Inline(creds) => creds.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a resolver may look at.
///
/// The environment is captured up front so resolvers stay pure.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub request: &'a ConnectRequest,
    pub store: &'a CloudConfigStore,
    pub os_cloud: Option<&'a str>,
}

impl<'a> ResolveContext<'a> {
    /// Creates a context with an explicit `OS_CLOUD` value.
    pub fn new(
        request: &'a ConnectRequest,
        store: &'a CloudConfigStore,
        os_cloud: Option<&'a str>,
    ) -> Self {
        Self {
            request,
            store,
            os_cloud,
        }
    }
}

/// Reads `OS_CLOUD` from the process environment.
///
/// Unset and non-UTF-8 values both read as `None`.
pub fn os_cloud_from_env() -> Option<String> {
    std::env::var(OS_CLOUD_ENV).ok()
}

/// A target-selection rule. `None` means "not applicable, try the next one".
pub type Resolver = fn(&ResolveContext<'_>) -> Option<Result<Targets>>;

/// Resolvers in precedence order, with names for logging.
pub const RESOLVERS: &[(&str, Resolver)] = &[
    ("inline", from_inline),
    ("all_clouds", from_all_clouds),
    ("clouds", from_explicit),
    ("environment", from_environment),
];

fn from_inline(ctx: &ResolveContext<'_>) -> Option<Result<Targets>> {
    ctx.request
        .creds
        .as_ref()
        .map(|creds| Ok(Targets::Inline(creds.clone())))
}

fn from_all_clouds(ctx: &ResolveContext<'_>) -> Option<Result<Targets>> {
    if !ctx.request.all_clouds {
        return None;
    }
    Some(
        ctx.store
            .cloud_names()
            .map(Targets::Profiles)
            .map_err(|e| ConnectError::Enumeration(Box::new(e))),
    )
}

fn from_explicit(ctx: &ResolveContext<'_>) -> Option<Result<Targets>> {
    if ctx.request.clouds.is_empty() {
        return None;
    }
    Some(Ok(Targets::Profiles(ctx.request.clouds.clone())))
}

fn from_environment(ctx: &ResolveContext<'_>) -> Option<Result<Targets>> {
    let names = split_cloud_list(ctx.os_cloud?);
    if names.is_empty() {
        return None;
    }
    Some(Ok(Targets::Profiles(names)))
}

/// Reports whether resolving `request` will look up clouds.yaml profiles.
///
/// Which resolver applies never depends on the store's contents, so
/// callers can use this to skip loading clouds.yaml entirely.
///
/// ```
/// use osconnect::resolve::reads_profiles;
/// use osconnect::ConnectRequest;
///
/// assert!(!reads_profiles(&ConnectRequest::new(), None));
/// assert!(!reads_profiles(&ConnectRequest::new(), Some(" , ")));
/// assert!(reads_profiles(&ConnectRequest::new(), Some("lab")));
/// assert!(reads_profiles(&ConnectRequest::new().with_all_clouds(true), None));
/// assert!(!reads_profiles(&ConnectRequest::new().with_all_clouds(true).with_creds(vec![]), None));
/// ```
pub fn reads_profiles(request: &ConnectRequest, os_cloud: Option<&str>) -> bool {
    let empty = CloudConfigStore::empty();
    let ctx = ResolveContext::new(request, &empty, os_cloud);
    matches!(
        RESOLVERS.iter().find_map(|(_, resolver)| resolver(&ctx)),
        Some(Ok(Targets::Profiles(_)))
    )
}

/// Runs the resolvers in order and checks the winning target list.
///
/// # Errors
///
/// - [`ConnectError::NoTargets`]: no resolver applied
/// - [`ConnectError::Enumeration`]: listing clouds.yaml failed
/// - [`ConnectError::InvalidCloudName`]: a target key is unusable
/// - [`ConnectError::DuplicateTarget`]: a key appears twice
///
/// # Example
///
/// ```
/// use osconnect::resolve::{resolve, ResolveContext, Targets};
/// use osconnect::{CloudConfigStore, ConnectRequest};
///
/// let request = ConnectRequest::new();
/// let store = CloudConfigStore::empty();
/// let ctx = ResolveContext::new(&request, &store, Some("x,y"));
///
/// assert_eq!(
///     resolve(&ctx).unwrap(),
///     Targets::Profiles(vec!["x".into(), "y".into()])
/// );
/// ```
pub fn resolve(ctx: &ResolveContext<'_>) -> Result<Targets> {
    for (name, resolver) in RESOLVERS {
        if let Some(result) = resolver(ctx) {
            let targets = result?;
            tracing::debug!(resolver = *name, targets = targets.len(), "resolved targets");
            check_keys(&targets)?;
            return Ok(targets);
        }
    }
    Err(ConnectError::NoTargets)
}

fn check_keys(targets: &Targets) -> Result<()> {
    let mut seen = HashSet::new();
    for key in targets.keys() {
        validate_cloud_name(key)?;
        if !seen.insert(key) {
            return Err(ConnectError::DuplicateTarget(key.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CloudConfigStore {
        CloudConfigStore::from_yaml_str(
            "clouds:\n  A: {auth_type: mock}\n  B: {auth_type: mock}\n  C: {auth_type: mock}\n",
        )
        .unwrap()
    }

    fn creds(key: &str) -> InlineCredentials {
        serde_json::from_value(serde_json::json!({ "cloud": key, "auth_type": "mock" })).unwrap()
    }

    #[test]
    fn test_all_clouds_ignores_explicit_list() {
        let request = ConnectRequest::new()
            .with_all_clouds(true)
            .with_clouds(["Z"]);
        let store = store();

        let targets = resolve(&ResolveContext::new(&request, &store, Some("E"))).unwrap();
        assert_eq!(
            targets,
            Targets::Profiles(vec!["A".into(), "B".into(), "C".into()])
        );
    }

    #[test]
    fn test_explicit_list_beats_environment() {
        let request = ConnectRequest::new().with_clouds(["B", "A"]);
        let store = store();

        let targets = resolve(&ResolveContext::new(&request, &store, Some("C"))).unwrap();
        assert_eq!(targets.keys(), vec!["B", "A"]);
    }

    #[test]
    fn test_environment_fallback_keeps_order() {
        let request = ConnectRequest::new();
        let store = store();

        let targets = resolve(&ResolveContext::new(&request, &store, Some("x,y"))).unwrap();
        assert_eq!(targets, Targets::Profiles(vec!["x".into(), "y".into()]));
    }

    #[test]
    fn test_nothing_supplied_fails() {
        let request = ConnectRequest::new();
        let store = store();

        let err = resolve(&ResolveContext::new(&request, &store, None)).unwrap_err();
        assert!(matches!(err, ConnectError::NoTargets));

        let err = resolve(&ResolveContext::new(&request, &store, Some(" , "))).unwrap_err();
        assert!(matches!(err, ConnectError::NoTargets));
    }

    #[test]
    fn test_inline_takes_precedence() {
        let request = ConnectRequest::new()
            .with_all_clouds(true)
            .with_clouds(["A"])
            .with_creds(vec![creds("k1"), creds("k2")]);
        let store = store();

        let targets = resolve(&ResolveContext::new(&request, &store, Some("B"))).unwrap();
        assert!(matches!(targets, Targets::Inline(_)));
        assert_eq!(targets.keys(), vec!["k1", "k2"]);
    }

    #[tokio::test]
    async fn test_enumeration_error_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let store = CloudConfigStore::load_from(&[dir.path().join("clouds.yaml")], None)
            .await
            .unwrap();
        let request = ConnectRequest::new().with_all_clouds(true);

        let err = resolve(&ResolveContext::new(&request, &store, Some("A"))).unwrap_err();
        match err {
            ConnectError::Enumeration(inner) => {
                assert!(matches!(*inner, ConnectError::ConfigNotFound { .. }))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_all_clouds_on_empty_document() {
        let request = ConnectRequest::new().with_all_clouds(true);
        let store = CloudConfigStore::from_yaml_str("clouds: {}").unwrap();

        assert!(resolve(&ResolveContext::new(&request, &store, None))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_duplicates_rejected() {
        let request = ConnectRequest::new().with_clouds(["A", "B", "A"]);
        let store = store();

        let err = resolve(&ResolveContext::new(&request, &store, None)).unwrap_err();
        assert!(matches!(err, ConnectError::DuplicateTarget(ref k) if k == "A"));

        let request = ConnectRequest::new().with_creds(vec![creds("k"), creds("k")]);
        let err = resolve(&ResolveContext::new(&request, &store, None)).unwrap_err();
        assert!(matches!(err, ConnectError::DuplicateTarget(_)));
    }

    #[test]
    fn test_invalid_key_rejected() {
        let request = ConnectRequest::new().with_creds(vec![creds("")]);
        let store = store();

        let err = resolve(&ResolveContext::new(&request, &store, None)).unwrap_err();
        assert!(matches!(err, ConnectError::InvalidCloudName(_)));
    }
}
