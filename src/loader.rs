//! Definition and payload loading from various sources.
//!
//! Handles loading JSON from files, strings, and HTTP URLs.

use std::path::Path;

use crate::definition::Definition;
use crate::error::DefinitionError;
use crate::types::Value;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `DefinitionError::FileNotFound` if the file doesn't exist,
/// or `DefinitionError::InvalidJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<serde_json::Value, DefinitionError> {
    if !path.exists() {
        return Err(DefinitionError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| DefinitionError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "loaded file");
    serde_json::from_str(&content).map_err(|source| DefinitionError::InvalidJson { source })
}

/// Load a definition from a file path.
///
/// # Errors
///
/// Returns IO and JSON errors from [`load_json`], or
/// `DefinitionError::InvalidDefinition` if the document is not a definition.
pub fn load_definition(path: &Path) -> Result<Definition, DefinitionError> {
    Definition::from_json(load_json(path)?)
}

/// Load a definition from a JSON string.
///
/// # Errors
///
/// Returns `DefinitionError::InvalidJson` if the string isn't valid JSON.
pub fn load_definition_str(content: &str) -> Result<Definition, DefinitionError> {
    let json = serde_json::from_str(content).map_err(|source| DefinitionError::InvalidJson { source })?;
    Definition::from_json(json)
}

/// Load a definition from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `DefinitionError::NetworkError` if the request fails,
/// or `DefinitionError::InvalidDefinition` if the response isn't a definition.
#[cfg(feature = "remote")]
pub fn load_definition_url(url: &str) -> Result<Definition, DefinitionError> {
    let network = |source| DefinitionError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    // Check for HTTP errors before parsing
    let response = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(network)?;

    let json: serde_json::Value = response.json().map_err(network)?;
    tracing::debug!(url, "fetched definition");
    Definition::from_json(json)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a definition from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_definition_auto(source: &str) -> Result<Definition, DefinitionError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_definition_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(DefinitionError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_definition(Path::new(source))
    }
}

/// Load a payload to validate from a JSON file.
///
/// # Errors
///
/// Same as [`load_json`].
pub fn load_payload(path: &Path) -> Result<Value, DefinitionError> {
    load_json(path).map(Value::from)
}
