//! clouds.yaml configuration store.
//!
//! Named cloud profiles live in a `clouds.yaml` file owned by the operator.
//! The store finds that file on the usual search path, overlays an optional
//! `secure.yaml` (so passwords can be kept in a separate file), and resolves
//! individual entries into [`CloudProfile`]s. It never writes.
//!
//! ```yaml
//! clouds:
//!   ie2-osp10-inf:
//!     auth:
//!       auth_url: https://keystone.example.com:13000/v3
//!       username: admin
//!       project_name: admin
//!       user_domain_name: Default
//!     region_name: regionOne
//!     interface: public
//! ```

use crate::profile::{AuthSettings, CloudProfile, Interface, DEFAULT_AUTH_TYPE};
use crate::{ConnectError, Result};
use serde::Deserialize;
use serde_json::Value;
use serde_yaml::Mapping;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Environment variable naming an explicit clouds.yaml.
pub const CONFIG_FILE_ENV: &str = "OS_CLIENT_CONFIG_FILE";

/// Environment variable naming an explicit secure.yaml.
pub const SECURE_FILE_ENV: &str = "OS_CLIENT_SECURE_FILE";

const CONFIG_FILE_NAMES: &[&str] = &["clouds.yaml", "clouds.yml"];
const SECURE_FILE_NAMES: &[&str] = &["secure.yaml", "secure.yml"];

/// Raw shape of one entry under `clouds:`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CloudEntry {
    auth: AuthSettings,
    auth_type: Option<String>,
    region_name: Option<String>,
    interface: Option<Interface>,
    verify: Option<bool>,
    cacert: Option<PathBuf>,
    #[serde(flatten)]
    options: BTreeMap<String, Value>,
}

/// Read-only view of the operator's cloud profiles.
///
/// # Example
///
/// ```
/// use osconnect::clouds::CloudConfigStore;
///
/// let store = CloudConfigStore::from_yaml_str(r#"
/// clouds:
///   lab:
///     auth:
///       auth_url: https://keystone.lab:5000/v3
///       username: admin
///       password: secret
///       project_name: admin
///   prod:
///     auth:
///       auth_url: https://keystone.prod:5000/v3
/// "#).unwrap();
///
/// assert_eq!(store.cloud_names().unwrap(), vec!["lab", "prod"]);
/// let lab = store.profile("lab").unwrap();
/// assert_eq!(lab.auth.username.as_deref(), Some("admin"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CloudConfigStore {
    clouds: Mapping,
    loaded: Vec<PathBuf>,
    searched: Vec<PathBuf>,
}

impl CloudConfigStore {
    /// Creates a store with no profiles.
    ///
    /// Useful when only inline credentials will be used.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads clouds.yaml from the default search path.
    ///
    /// A missing file is not an error: the store is empty and remembers
    /// which locations were searched. Unreadable or malformed files are.
    pub async fn load() -> Result<Self> {
        Self::load_from(&default_search_paths(), secure_file_override()).await
    }

    /// Loads a specific clouds.yaml, plus the secure.yaml next to it.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = fs::read_to_string(&path).await?;
        let mut store = Self::from_yaml_str(&data)?;
        store.loaded.push(path.clone());
        store.searched.push(path.clone());

        if let Some(secure) = find_existing(&sibling_secure_files(&path)).await {
            store.overlay_secure(&secure).await?;
        }
        Ok(store)
    }

    /// Parses clouds.yaml content held in memory.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(Self {
            clouds: parse_clouds(yaml)?,
            loaded: Vec::new(),
            searched: Vec::new(),
        })
    }

    /// Loads the first existing file from `candidates`.
    ///
    /// `secure` overrides the secure.yaml location; otherwise a secure.yaml
    /// in the same directory as the chosen clouds.yaml is used. A secure.yaml
    /// only overlays a clouds.yaml; on its own it is ignored.
    pub async fn load_from(candidates: &[PathBuf], secure: Option<PathBuf>) -> Result<Self> {
        let mut store = match find_existing(candidates).await {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading clouds.yaml");
                let data = fs::read_to_string(&path).await?;
                let mut store = Self::from_yaml_str(&data)?;
                store.loaded.push(path);
                store
            }
            None => {
                tracing::debug!("no clouds.yaml found on search path");
                Self::empty()
            }
        };
        store.searched = candidates.to_vec();

        let Some(main) = store.loaded.first() else {
            if let Some(path) = secure {
                tracing::debug!(path = %path.display(), "ignoring secure.yaml without clouds.yaml");
            }
            return Ok(store);
        };

        let secure = match secure {
            Some(path) => Some(path),
            None => find_existing(&sibling_secure_files(main)).await,
        };
        if let Some(path) = secure {
            if fs::try_exists(&path).await? {
                store.overlay_secure(&path).await?;
            }
        }

        Ok(store)
    }

    async fn overlay_secure(&mut self, path: &Path) -> Result<()> {
        tracing::debug!(path = %path.display(), "overlaying secure.yaml");
        let data = fs::read_to_string(path).await?;
        let secure = parse_clouds(&data)?;
        merge_mapping(&mut self.clouds, secure);
        self.loaded.push(path.to_path_buf());
        Ok(())
    }

    /// Lists every profile name, in file order.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::ConfigNotFound`] if no configuration file was
    /// loaded and no profiles were supplied in memory.
    pub fn cloud_names(&self) -> Result<Vec<String>> {
        if self.clouds.is_empty() && self.loaded.is_empty() && !self.searched.is_empty() {
            return Err(ConnectError::ConfigNotFound {
                searched: self.searched.clone(),
            });
        }

        self.clouds.keys().map(cloud_key).collect()
    }

    /// Checks whether a profile is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    // Keys such as `123:` are numbers in YAML but names to the operator.
    fn entry(&self, name: &str) -> Option<&serde_yaml::Value> {
        self.clouds.get(name).or_else(|| {
            self.clouds
                .iter()
                .find(|(key, _)| matches!(cloud_key(key), Ok(ref k) if k == name))
                .map(|(_, value)| value)
        })
    }

    /// Resolves one profile into connection settings.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::ProfileNotFound`]: no entry with that name
    /// - [`ConnectError::Yaml`]: the entry has the wrong shape
    pub fn profile(&self, name: &str) -> Result<CloudProfile> {
        let raw = self
            .entry(name)
            .ok_or_else(|| ConnectError::ProfileNotFound(name.to_string()))?;

        let entry: CloudEntry = serde_yaml::from_value(raw.clone())?;

        Ok(CloudProfile {
            name: name.to_string(),
            auth_type: entry
                .auth_type
                .unwrap_or_else(|| DEFAULT_AUTH_TYPE.to_string()),
            auth: entry.auth,
            region_name: entry.region_name,
            interface: entry.interface.unwrap_or_default(),
            verify: entry.verify.unwrap_or(true),
            cacert: entry.cacert,
            options: entry.options,
        })
    }

    /// Files that contributed to this store, main file first.
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded
    }

    /// Locations consulted when looking for clouds.yaml.
    pub fn searched_files(&self) -> &[PathBuf] {
        &self.searched
    }
}

/// Returns the clouds.yaml search path, highest priority first.
///
/// 1. `$OS_CLIENT_CONFIG_FILE`
/// 2. the current directory
/// 3. the user config directory (`$XDG_CONFIG_HOME/openstack`)
/// 4. `~/.config/openstack`
/// 5. `/etc/openstack`
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(config) = dirs_next::config_dir() {
        dirs.push(config.join("openstack"));
    }
    if let Some(home) = dirs_next::home_dir() {
        dirs.push(home.join(".config").join("openstack"));
    }
    dirs.push(PathBuf::from("/etc/openstack"));

    let mut paths = Vec::new();
    if let Ok(explicit) = std::env::var(CONFIG_FILE_ENV) {
        paths.push(PathBuf::from(explicit));
    }
    for dir in dirs {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if !paths.contains(&candidate) {
                paths.push(candidate);
            }
        }
    }
    paths
}

/// Returns the secure.yaml location named by `$OS_CLIENT_SECURE_FILE`, if set.
pub fn secure_file_override() -> Option<PathBuf> {
    std::env::var(SECURE_FILE_ENV).ok().map(PathBuf::from)
}

fn sibling_secure_files(main: &Path) -> Vec<PathBuf> {
    let dir = main.parent().unwrap_or_else(|| Path::new("."));
    SECURE_FILE_NAMES.iter().map(|n| dir.join(n)).collect()
}

async fn find_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    for candidate in candidates {
        if matches!(fs::try_exists(candidate).await, Ok(true)) {
            return Some(candidate.clone());
        }
    }
    None
}

fn parse_clouds(yaml: &str) -> Result<Mapping> {
    #[derive(Deserialize)]
    struct CloudsFile {
        #[serde(default)]
        clouds: Option<Mapping>,
    }

    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }
    let file: CloudsFile = serde_yaml::from_str(yaml)?;
    Ok(file.clouds.unwrap_or_default())
}

/// Renders a `clouds:` key as a profile name.
fn cloud_key(key: &serde_yaml::Value) -> Result<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(ConnectError::InvalidCloudName(format!(
            "clouds.yaml key {:?} is not a scalar",
            other
        ))),
    }
}

/// Recursively overlays `overlay` onto `base`. Scalars and sequences replace.
fn merge_mapping(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(serde_yaml::Value::Mapping(existing)), serde_yaml::Value::Mapping(incoming)) => {
                merge_mapping(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CLOUDS: &str = r#"
clouds:
  zeta:
    auth:
      auth_url: https://zeta:5000/v3
      username: admin
      project_name: admin
    region_name: RegionOne
    interface: internal
    verify: false
    identity_api_version: 3
  alpha:
    auth_type: v3applicationcredential
    auth:
      auth_url: https://alpha:5000
      application_credential_id: abc
"#;

    #[test]
    fn test_names_keep_file_order() {
        let store = CloudConfigStore::from_yaml_str(CLOUDS).unwrap();
        assert_eq!(store.cloud_names().unwrap(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_profile_fields() {
        let store = CloudConfigStore::from_yaml_str(CLOUDS).unwrap();
        let zeta = store.profile("zeta").unwrap();

        assert_eq!(zeta.auth_type, "password");
        assert_eq!(zeta.region_name.as_deref(), Some("RegionOne"));
        assert_eq!(zeta.interface, Interface::Internal);
        assert!(!zeta.verify);
        assert_eq!(zeta.options.get("identity_api_version"), Some(&Value::from(3)));

        let alpha = store.profile("alpha").unwrap();
        assert_eq!(alpha.auth_type, "v3applicationcredential");
        assert_eq!(alpha.auth.application_credential_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_missing_profile() {
        let store = CloudConfigStore::from_yaml_str(CLOUDS).unwrap();
        assert!(matches!(
            store.profile("nope"),
            Err(ConnectError::ProfileNotFound(ref n)) if n == "nope"
        ));
    }

    #[test]
    fn test_empty_document() {
        let store = CloudConfigStore::from_yaml_str("").unwrap();
        assert!(store.cloud_names().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_secure_yaml_overlay() {
        let dir = tempdir().unwrap();
        let main = dir.path().join("clouds.yaml");
        std::fs::write(&main, CLOUDS).unwrap();
        std::fs::write(
            dir.path().join("secure.yaml"),
            "clouds:\n  zeta:\n    auth:\n      password: from-secure\n      username: ops\n",
        )
        .unwrap();

        let store = CloudConfigStore::from_path(&main).await.unwrap();
        let zeta = store.profile("zeta").unwrap();

        assert_eq!(zeta.auth.password.as_deref(), Some("from-secure"));
        assert_eq!(zeta.auth.username.as_deref(), Some("ops"));
        assert_eq!(zeta.auth.auth_url.as_deref(), Some("https://zeta:5000/v3"));
        assert_eq!(store.loaded_files().len(), 2);
    }

    #[tokio::test]
    async fn test_search_path_first_existing_wins() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a").join("clouds.yaml");
        let second = dir.path().join("b").join("clouds.yaml");
        std::fs::create_dir_all(second.parent().unwrap()).unwrap();
        std::fs::write(&second, CLOUDS).unwrap();

        let store = CloudConfigStore::load_from(&[first.clone(), second.clone()], None)
            .await
            .unwrap();

        assert_eq!(store.loaded_files(), &[second]);
        assert_eq!(store.searched_files().len(), 2);
        assert!(store.contains("alpha"));
    }

    #[tokio::test]
    async fn test_nothing_found_fails_enumeration() {
        let dir = tempdir().unwrap();
        let candidates = vec![dir.path().join("clouds.yaml")];

        let store = CloudConfigStore::load_from(&candidates, None).await.unwrap();

        assert!(matches!(
            store.cloud_names(),
            Err(ConnectError::ConfigNotFound { .. })
        ));
        assert!(matches!(
            store.profile("lab"),
            Err(ConnectError::ProfileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let main = dir.path().join("clouds.yaml");
        std::fs::write(&main, "clouds: [unterminated").unwrap();

        let result = CloudConfigStore::load_from(&[main], None).await;
        assert!(matches!(result, Err(ConnectError::Yaml(_))));
    }

    #[tokio::test]
    async fn test_secure_override_path() {
        let dir = tempdir().unwrap();
        let main = dir.path().join("clouds.yaml");
        let secure = dir.path().join("elsewhere").join("passwords.yaml");
        std::fs::create_dir_all(secure.parent().unwrap()).unwrap();
        std::fs::write(&main, CLOUDS).unwrap();
        std::fs::write(
            dir.path().join("secure.yaml"),
            "clouds:\n  zeta:\n    auth:\n      password: sibling\n",
        )
        .unwrap();
        std::fs::write(&secure, "clouds:\n  zeta:\n    auth:\n      password: override\n").unwrap();

        let store = CloudConfigStore::load_from(&[main.clone()], Some(secure.clone()))
            .await
            .unwrap();

        assert_eq!(
            store.profile("zeta").unwrap().auth.password.as_deref(),
            Some("override")
        );
        assert_eq!(store.loaded_files(), &[main, secure]);
    }

    #[tokio::test]
    async fn test_secure_alone_is_not_a_config() {
        let dir = tempdir().unwrap();
        let secure = dir.path().join("secure.yaml");
        std::fs::write(&secure, "clouds:\n  ghost:\n    auth:\n      password: pw\n").unwrap();

        let store = CloudConfigStore::load_from(&[dir.path().join("clouds.yaml")], Some(secure))
            .await
            .unwrap();

        assert!(store.loaded_files().is_empty());
        assert!(!store.contains("ghost"));
        assert!(matches!(
            store.cloud_names(),
            Err(ConnectError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn test_secure_file_env() {
        std::env::set_var(SECURE_FILE_ENV, "/srv/openstack/secure.yaml");
        let found = secure_file_override();
        std::env::remove_var(SECURE_FILE_ENV);

        assert_eq!(found, Some(PathBuf::from("/srv/openstack/secure.yaml")));
    }

    #[test]
    fn test_numeric_cloud_key() {
        let store = CloudConfigStore::from_yaml_str(
            "clouds:\n  123:\n    auth_type: mock\n  lab:\n    auth_type: mock\n",
        )
        .unwrap();

        assert_eq!(store.cloud_names().unwrap(), vec!["123", "lab"]);
        assert!(store.contains("123"));
        assert_eq!(store.profile("123").unwrap().name, "123");
    }

    #[test]
    fn test_non_scalar_cloud_key_reported() {
        let store = CloudConfigStore::from_yaml_str("clouds:\n  ? [a, b]\n  : {auth_type: mock}\n").unwrap();

        assert!(matches!(
            store.cloud_names(),
            Err(ConnectError::InvalidCloudName(_))
        ));
    }

    #[test]
    fn test_default_search_paths_end_in_etc() {
        let paths = default_search_paths();
        assert!(paths
            .iter()
            .any(|p| p == Path::new("/etc/openstack/clouds.yaml")));
    }
}
