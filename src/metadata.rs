use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// One index definition from the dump metadata. Parsed for completeness,
/// never applied to the SQLite side.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct IndexSpec {
    pub v: serde_json::Value,
    pub key: serde_json::Map<String, serde_json::Value>,
    pub name: String,
}

/// The metadata.json descriptor that mongodump writes next to each BSON file.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub database: String,
    pub collection: String,
    pub collection_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub uuid: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub indexes: Vec<IndexSpec>,
}

impl Metadata {
    /// Parse a metadata descriptor from raw JSON bytes. Unknown fields are
    /// ignored, missing fields default to empty.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).context("failed to parse metadata JSON")
    }

    /// Read and parse a metadata.json file. Any failure here is fatal to the
    /// whole run.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("Parsing metadata file {}", path.display());
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read metadata file {}", path.display()))?;
        let metadata = Self::from_slice(&data)?;
        tracing::info!(
            "Metadata parsed: database {:?}, collection {:?}",
            metadata.database,
            metadata.resolved_name()
        );
        if !metadata.indexes.is_empty() {
            tracing::debug!(
                "{} index definitions in metadata (not applied)",
                metadata.indexes.len()
            );
        }
        Ok(metadata)
    }

    // `collection` wins; `collectionName` is the legacy spelling kept by older dumps.
    fn resolved_name(&self) -> &str {
        if self.collection.is_empty() {
            &self.collection_name
        } else {
            &self.collection
        }
    }

    /// Resolved target collection name. Errors when neither metadata field
    /// names one, since an empty table name is never valid downstream.
    pub fn collection_name(&self) -> Result<&str> {
        let name = self.resolved_name();
        if name.is_empty() {
            bail!("metadata names no collection (both \"collection\" and \"collectionName\" are empty)");
        }
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "database": "appdb",
        "collection": "user-profiles",
        "collectionName": "",
        "type": "collection",
        "uuid": "8e74b4f2c0a94a2f9a8f1f0f8c2f5e11",
        "metadata": {"options": {}},
        "indexes": [
            {"v": 2, "key": {"_id": 1}, "name": "_id_"},
            {"v": 2, "key": {"email": 1}, "name": "email_1"}
        ]
    }"#;

    #[test]
    fn parses_full_descriptor() {
        let metadata = Metadata::from_slice(SAMPLE.as_bytes()).unwrap();
        assert_eq!(metadata.database, "appdb");
        assert_eq!(metadata.uuid, "8e74b4f2c0a94a2f9a8f1f0f8c2f5e11");
        assert_eq!(metadata.collection_name().unwrap(), "user-profiles");
        assert_eq!(metadata.indexes.len(), 2);
        assert_eq!(metadata.indexes[1].name, "email_1");
    }

    #[test]
    fn legacy_collection_name_fallback() {
        let metadata = Metadata::from_slice(br#"{"collectionName": "orders"}"#).unwrap();
        assert_eq!(metadata.collection_name().unwrap(), "orders");
    }

    #[test]
    fn collection_field_takes_precedence() {
        let metadata = Metadata::from_slice(
            br#"{"collection": "orders", "collectionName": "legacy_orders"}"#,
        )
        .unwrap();
        assert_eq!(metadata.collection_name().unwrap(), "orders");
    }

    #[test]
    fn empty_collection_name_rejected() {
        let metadata = Metadata::from_slice(br#"{"database": "appdb"}"#).unwrap();
        assert!(metadata.collection_name().is_err());
    }

    #[test]
    fn unknown_fields_ignored() {
        let metadata =
            Metadata::from_slice(br#"{"collection": "c", "somethingNew": [1, 2, 3]}"#).unwrap();
        assert_eq!(metadata.collection_name().unwrap(), "c");
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(Metadata::from_slice(b"{not json").is_err());
    }
}
