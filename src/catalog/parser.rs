//! Manifest parser: converts raw YAML/JSON/TOML text into [`SequenceDefinition`]s.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;

use crate::domain::model::SequenceDefinition;
use crate::error::CatalogError;

/// Supported manifest input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// YAML format (`.yaml` / `.yml`).
    Yaml,
    /// JSON format (`.json`).
    Json,
    /// TOML format (`.toml`).
    Toml,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(ManifestFormat::Yaml),
            "json" => Some(ManifestFormat::Json),
            "toml" => Some(ManifestFormat::Toml),
            _ => None,
        }
    }
}

/// Parse a document of any supported format into a JSON value.
pub(crate) fn parse_value(content: &str, format: ManifestFormat) -> Result<Value, String> {
    match format {
        #[cfg(feature = "manifest-yaml")]
        ManifestFormat::Yaml => serde_saphyr::from_str(content).map_err(|e| e.to_string()),
        #[cfg(not(feature = "manifest-yaml"))]
        ManifestFormat::Yaml => Err("YAML support is not enabled".to_string()),
        ManifestFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        #[cfg(feature = "manifest-toml")]
        ManifestFormat::Toml => {
            // Go through toml::Value so fields typed as serde_json::Value
            // (payload-like data) come out as plain JSON.
            let toml_val: toml::Value = toml::from_str(content).map_err(|e| e.to_string())?;
            Ok(toml_value_to_json(toml_val))
        }
        #[cfg(not(feature = "manifest-toml"))]
        ManifestFormat::Toml => Err("TOML support is not enabled".to_string()),
    }
}

/// Parse and deserialize a document into `T`.
pub(crate) fn parse_document<T: DeserializeOwned>(
    content: &str,
    format: ManifestFormat,
) -> Result<T, String> {
    let value = parse_value(content, format)?;
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Convert a [`toml::Value`] into a [`serde_json::Value`].
///
/// TOML has no null, and `Datetime` values are stringified.
#[cfg(feature = "manifest-toml")]
fn toml_value_to_json(val: toml::Value) -> Value {
    match val {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_value_to_json).collect()),
        toml::Value::Table(tbl) => Value::Object(
            tbl.into_iter()
                .map(|(k, v)| (k, toml_value_to_json(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
    }
}

/// Parse a manifest into sequence definitions.
///
/// Accepted shapes: a single definition, a list of definitions, or an object
/// with a `sequences` list.
pub fn parse_manifest(
    content: &str,
    format: ManifestFormat,
) -> Result<Vec<SequenceDefinition>, CatalogError> {
    let value = parse_value(content, format).map_err(CatalogError::Parse)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("sequences") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(CatalogError::Parse(
                    "'sequences' must be a list".to_string(),
                ))
            }
            None => vec![Value::Object(map)],
        },
        _ => {
            return Err(CatalogError::Parse(
                "manifest must be a sequence or a list of sequences".to_string(),
            ))
        }
    };
    items
        .into_iter()
        .map(|item| {
            let mut def: SequenceDefinition =
                serde_json::from_value(item).map_err(|e| CatalogError::Parse(e.to_string()))?;
            def.normalize();
            Ok(def)
        })
        .collect()
}

/// Read a manifest file, picking the format from its extension.
pub fn load_manifest_file(path: impl AsRef<Path>) -> Result<Vec<SequenceDefinition>, CatalogError> {
    let path = path.as_ref();
    let format = ManifestFormat::from_path(path)
        .ok_or_else(|| CatalogError::UnsupportedFormat(path.display().to_string()))?;
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io(e.to_string()))?;
    parse_manifest(&content, format)
}
