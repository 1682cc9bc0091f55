//! Input validation for cloud names and auth settings.

use crate::{ConnectError, Result};
use url::Url;

/// Maximum allowed length for cloud names and caller-chosen keys.
const MAX_NAME_LENGTH: usize = 255;

/// Validates a cloud name or inline-credential key.
///
/// Rejects:
/// - Empty names
/// - Excessive length (>255 bytes)
/// - Commas, which would not survive the `OS_CLOUD` list syntax
/// - Control characters
///
/// # Errors
///
/// Returns [`ConnectError::InvalidCloudName`] if validation fails.
///
/// # Example
///
/// ```
/// use osconnect::validation::validate_cloud_name;
///
/// assert!(validate_cloud_name("ie2-osp10-inf").is_ok());
/// assert!(validate_cloud_name("lab_2.region-a").is_ok());
///
/// assert!(validate_cloud_name("").is_err());
/// assert!(validate_cloud_name("a,b").is_err());
/// ```
pub fn validate_cloud_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConnectError::InvalidCloudName(
            "name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(ConnectError::InvalidCloudName(format!(
            "name exceeds maximum length of {} characters",
            MAX_NAME_LENGTH
        )));
    }

    if name.contains(',') {
        return Err(ConnectError::InvalidCloudName(format!(
            "{}: name contains ','",
            name
        )));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(ConnectError::InvalidCloudName(format!(
            "{:?}: name contains control characters",
            name
        )));
    }

    Ok(())
}

/// Returns the value of a required auth field, or a [`ConnectError::MissingAuthField`].
///
/// Blank strings count as missing. A present value is returned untouched,
/// surrounding whitespace included.
pub fn require_field<'a>(cloud: &str, field: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConnectError::MissingAuthField {
            cloud: cloud.to_string(),
            field: field.to_string(),
        }),
    }
}

/// Parses an auth URL, requiring an `http` or `https` scheme and a host.
///
/// ```
/// use osconnect::validation::validate_auth_url;
///
/// let url = validate_auth_url("lab", "https://keystone.lab:13000/v3").unwrap();
/// assert_eq!(url.host_str(), Some("keystone.lab"));
///
/// assert!(validate_auth_url("lab", "https://ks host").is_err());
/// ```
pub fn validate_auth_url(cloud: &str, auth_url: &str) -> Result<Url> {
    let invalid = |reason: String| {
        ConnectError::InvalidParameter(format!(
            "cloud {}: auth_url '{}' {}",
            cloud, auth_url, reason
        ))
    };

    let url = Url::parse(auth_url).map_err(|e| invalid(format!("is not a valid URL: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("must use http or https, not {}", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("has no host".to_string()));
    }

    Ok(url)
}
