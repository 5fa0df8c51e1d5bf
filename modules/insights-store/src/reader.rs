use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::Collection;
use tracing::debug;

use insights_common::InsightsError;

use crate::pipeline::Pipeline;
use crate::predicate::Predicate;
use crate::store::{FindOptions, InsightStore};
use crate::MongoClient;

/// [`InsightStore`] backed by a MongoDB collection.
#[derive(Clone)]
pub struct MongoInsightStore {
    collection: Collection<Document>,
}

impl MongoInsightStore {
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }

    pub fn from_client(client: &MongoClient, collection: &str) -> Self {
        Self::new(client.collection(collection))
    }
}

fn db_error(op: &'static str) -> impl Fn(mongodb::error::Error) -> InsightsError {
    move |e| InsightsError::Database(format!("{op} failed: {e}"))
}

#[async_trait]
impl InsightStore for MongoInsightStore {
    async fn find(
        &self,
        filter: &Predicate,
        options: FindOptions,
    ) -> Result<Vec<Document>, InsightsError> {
        let query = filter.to_document();
        debug!(filter = %query, "find");

        let mut action = self.collection.find(query);
        if let Some(projection) = &options.projection {
            action = action.projection(projection.to_document());
        }
        if let Some(limit) = options.limit {
            action = action.limit(limit);
        }

        let cursor = action.await.map_err(db_error("Find"))?;
        cursor.try_collect().await.map_err(db_error("Find cursor"))
    }

    async fn distinct(&self, field: &str) -> Result<Vec<Bson>, InsightsError> {
        self.collection
            .distinct(field, doc! {})
            .await
            .map_err(db_error("Distinct"))
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>, InsightsError> {
        let stages = pipeline.stages();
        debug!(stages = stages.len(), group = %pipeline.group.key, "aggregate");

        let cursor = self
            .collection
            .aggregate(stages)
            .await
            .map_err(db_error("Aggregate"))?;
        cursor.try_collect().await.map_err(db_error("Aggregate cursor"))
    }

    async fn count(&self) -> Result<u64, InsightsError> {
        self.collection
            .count_documents(doc! {})
            .await
            .map_err(db_error("Count"))
    }

    async fn insert_many(&self, records: Vec<Document>) -> Result<u64, InsightsError> {
        if records.is_empty() {
            return Ok(0);
        }
        let result = self
            .collection
            .insert_many(records)
            .await
            .map_err(db_error("Insert"))?;
        Ok(result.inserted_ids.len() as u64)
    }
}
