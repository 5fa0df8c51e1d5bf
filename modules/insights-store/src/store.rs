use async_trait::async_trait;
use bson::{doc, Bson, Document};

use insights_common::InsightsError;

use crate::pipeline::Pipeline;
use crate::predicate::Predicate;

/// Fields returned by a find; `_id` is always hidden.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub fields: Vec<String>,
}

impl Projection {
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn to_document(&self) -> Document {
        let mut projection = doc! { "_id": 0 };
        for field in &self.fields {
            projection.insert(field.as_str(), 1);
        }
        projection
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub projection: Option<Projection>,
    pub limit: Option<i64>,
}

/// Read/write access to the insight collection.
///
/// Implemented by [`crate::MongoInsightStore`] for production and by
/// [`crate::MemoryInsightStore`] for tests and fixtures.
#[async_trait]
pub trait InsightStore: Send + Sync {
    /// Records matching `filter`, shaped by `options`.
    async fn find(
        &self,
        filter: &Predicate,
        options: FindOptions,
    ) -> Result<Vec<Document>, InsightsError>;

    /// Distinct values of `field` across the collection.
    async fn distinct(&self, field: &str) -> Result<Vec<Bson>, InsightsError>;

    /// Run match → group → sort → limit and return the bucket documents.
    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>, InsightsError>;

    async fn count(&self) -> Result<u64, InsightsError>;

    /// Insert records, returning how many were written.
    async fn insert_many(&self, records: Vec<Document>) -> Result<u64, InsightsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_hides_id() {
        let projection = Projection::only(["title", "insight"]);
        assert_eq!(projection.to_document(), doc! { "_id": 0, "title": 1, "insight": 1 });
    }
}
