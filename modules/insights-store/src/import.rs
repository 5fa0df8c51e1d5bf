//! Seed the insight collection from a JSON export.

use std::path::Path;

use bson::{Bson, Document};
use tracing::info;

use insights_common::InsightsError;

use crate::store::InsightStore;

/// Parse a JSON array of records, or a single record object.
///
/// MongoDB extended JSON (`{"$oid": ...}`, `{"$date": ...}`) is honored.
pub fn parse_records(raw: &str) -> Result<Vec<Document>, InsightsError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| InsightsError::Import(format!("invalid JSON: {e}")))?;
    let bson = Bson::try_from(value)
        .map_err(|e| InsightsError::Import(format!("unsupported JSON value: {e}")))?;

    match bson {
        Bson::Document(doc) => Ok(vec![doc]),
        Bson::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Bson::Document(doc) => Ok(doc),
                other => Err(InsightsError::Import(format!(
                    "record {i} is not an object: {other}"
                ))),
            })
            .collect(),
        other => Err(InsightsError::Import(format!(
            "expected an array or object, got {other}"
        ))),
    }
}

/// Insert `records` only when the collection is empty.
/// Returns the number inserted, 0 when the collection already had data.
pub async fn import_if_empty(
    store: &dyn InsightStore,
    records: Vec<Document>,
) -> Result<u64, InsightsError> {
    let existing = store.count().await?;
    if existing > 0 {
        info!(existing, "Collection already populated, skipping import");
        return Ok(0);
    }
    let inserted = store.insert_many(records).await?;
    info!(inserted, "Imported insight records");
    Ok(inserted)
}

/// Read a JSON file and import it with [`import_if_empty`].
pub async fn import_json_file(store: &dyn InsightStore, path: &Path) -> Result<u64, InsightsError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| InsightsError::Import(format!("failed to read {}: {e}", path.display())))?;
    let records = parse_records(&raw)?;
    import_if_empty(store, records).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryInsightStore;
    use bson::doc;

    #[test]
    fn parses_array_of_records() {
        let records =
            parse_records(r#"[{"topic": "oil", "intensity": 6}, {"topic": "gas"}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_str("topic").unwrap(), "oil");
        assert_eq!(records[0].get_i32("intensity").unwrap(), 6);
    }

    #[test]
    fn parses_single_object() {
        let records = parse_records(r#"{"topic": "oil"}"#).unwrap();
        assert_eq!(records, vec![doc! { "topic": "oil" }]);
    }

    #[test]
    fn rejects_scalars_and_mixed_arrays() {
        assert!(matches!(parse_records("42"), Err(InsightsError::Import(_))));
        assert!(matches!(parse_records(r#"[{"a": 1}, 2]"#), Err(InsightsError::Import(_))));
        assert!(matches!(parse_records("not json"), Err(InsightsError::Import(_))));
    }

    #[tokio::test]
    async fn import_skips_populated_collection() {
        let store = MemoryInsightStore::new(vec![doc! { "topic": "existing" }]);
        let inserted = import_if_empty(&store, vec![doc! { "topic": "new" }]).await.unwrap();
        assert_eq!(inserted, 0);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn import_fills_empty_collection() {
        let store = MemoryInsightStore::default();
        let records = parse_records(r#"[{"topic": "oil"}, {"topic": "gas"}]"#).unwrap();
        assert_eq!(import_if_empty(&store, records).await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
