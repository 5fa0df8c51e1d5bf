//! In-process [`InsightStore`] that evaluates predicates and pipelines over a
//! vector of documents, following MongoDB's semantics for the operators the
//! API uses. Serves tests and local fixtures without a running database.

use std::cmp::Ordering;

use async_trait::async_trait;
use bson::{Bson, Document};
use regex::RegexBuilder;
use tokio::sync::RwLock;

use insights_common::InsightsError;

use crate::pipeline::{Accumulator, Pipeline, SortOrder, GROUP_KEY};
use crate::predicate::{Condition, Predicate};
use crate::store::{FindOptions, InsightStore, Projection};

#[derive(Default)]
pub struct MemoryInsightStore {
    records: RwLock<Vec<Document>>,
}

impl MemoryInsightStore {
    pub fn new(records: Vec<Document>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl InsightStore for MemoryInsightStore {
    async fn find(
        &self,
        filter: &Predicate,
        options: FindOptions,
    ) -> Result<Vec<Document>, InsightsError> {
        let records = self.records.read().await;
        let limit = options.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(records
            .iter()
            .filter(|doc| matches(doc, filter))
            .take(limit)
            .map(|doc| match &options.projection {
                Some(projection) => project(doc, projection),
                None => doc.clone(),
            })
            .collect())
    }

    async fn distinct(&self, field: &str) -> Result<Vec<Bson>, InsightsError> {
        let records = self.records.read().await;
        let mut values: Vec<Bson> = Vec::new();
        for value in records.iter().filter_map(|doc| doc.get(field)) {
            let items = match value {
                Bson::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            for item in items {
                if !values.iter().any(|v| bson_eq(v, &item)) {
                    values.push(item);
                }
            }
        }
        values.sort_by(compare_bson);
        Ok(values)
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>, InsightsError> {
        let records = self.records.read().await;
        let matching: Vec<&Document> = records
            .iter()
            .filter(|doc| matches(doc, &pipeline.filter))
            .collect();

        let mut buckets: Vec<(Bson, Vec<&Document>)> = Vec::new();
        for doc in matching {
            let key = doc.get(&pipeline.group.key).cloned().unwrap_or(Bson::Null);
            match buckets.iter().position(|(k, _)| bson_eq(k, &key)) {
                Some(i) => buckets[i].1.push(doc),
                None => buckets.push((key, vec![doc])),
            }
        }

        let mut rows: Vec<Document> = buckets
            .into_iter()
            .map(|(key, members)| {
                let mut row = Document::new();
                row.insert(GROUP_KEY, key);
                for (name, accumulator) in &pipeline.group.accumulators {
                    row.insert(name.as_str(), accumulate(accumulator, &members));
                }
                row
            })
            .collect();

        if let Some(sort) = &pipeline.sort {
            rows.sort_by(|a, b| {
                let ordering = compare_bson(
                    a.get(&sort.field).unwrap_or(&Bson::Null),
                    b.get(&sort.field).unwrap_or(&Bson::Null),
                );
                match sort.order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = pipeline.limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn count(&self) -> Result<u64, InsightsError> {
        Ok(self.records.read().await.len() as u64)
    }

    async fn insert_many(&self, records: Vec<Document>) -> Result<u64, InsightsError> {
        let inserted = records.len() as u64;
        self.records.write().await.extend(records);
        Ok(inserted)
    }
}

// --- Predicate evaluation ---

fn matches(doc: &Document, predicate: &Predicate) -> bool {
    let clauses_hold = predicate
        .clauses()
        .all(|(field, condition)| holds(doc.get(field), condition));
    let alternatives = predicate.alternatives();
    clauses_hold && (alternatives.is_empty() || alternatives.iter().any(|alt| matches(doc, alt)))
}

fn holds(value: Option<&Bson>, condition: &Condition) -> bool {
    match condition {
        Condition::Equals(expected) => value.is_some_and(|v| bson_eq(v, expected)),
        Condition::ContainsIgnoreCase(text) => match value {
            Some(Bson::String(s)) => RegexBuilder::new(&regex::escape(text))
                .case_insensitive(true)
                .build()
                .is_ok_and(|re| re.is_match(s)),
            _ => false,
        },
        Condition::Present => !matches!(value, None | Some(Bson::Null)),
        Condition::PresentNonEmpty => match value {
            None | Some(Bson::Null) => false,
            Some(Bson::String(s)) => !s.is_empty(),
            Some(_) => true,
        },
    }
}

fn project(doc: &Document, projection: &Projection) -> Document {
    let mut shaped = Document::new();
    for field in &projection.fields {
        if let Some(value) = doc.get(field) {
            shaped.insert(field.as_str(), value.clone());
        }
    }
    shaped
}

// --- Accumulators ---

fn accumulate(accumulator: &Accumulator, members: &[&Document]) -> Bson {
    match accumulator {
        Accumulator::Avg(field) => {
            let values: Vec<f64> = members
                .iter()
                .filter_map(|d| d.get(field).and_then(as_number))
                .collect();
            if values.is_empty() {
                Bson::Null
            } else {
                Bson::Double(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        Accumulator::Sum(field) => Bson::Double(
            members
                .iter()
                .filter_map(|d| d.get(field).and_then(as_number))
                .sum(),
        ),
        Accumulator::Count => match i32::try_from(members.len()) {
            Ok(n) => Bson::Int32(n),
            Err(_) => Bson::Int64(members.len() as i64),
        },
        Accumulator::AddToSet(field) => {
            let mut set: Vec<Bson> = Vec::new();
            for value in members.iter().filter_map(|d| d.get(field)) {
                if !set.iter().any(|v| bson_eq(v, value)) {
                    set.push(value.clone());
                }
            }
            Bson::Array(set)
        }
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

// --- Comparison ---

/// Equality with numeric types compared by value, as MongoDB does.
fn bson_eq(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Rank of a value's type in MongoDB's cross-type sort order.
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 13,
        _ => 12,
    }
}

fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}
