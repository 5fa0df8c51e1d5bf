//! Aggregation pipeline: match → group → sort → limit.

use bson::{doc, Bson, Document};

use crate::predicate::Predicate;

/// Name of the group key in aggregation output.
pub const GROUP_KEY: &str = "_id";

/// Per-bucket accumulation.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Mean of numeric values; null when none contributed.
    Avg(String),
    /// Sum of numeric values.
    Sum(String),
    /// Number of records in the bucket.
    Count,
    /// Distinct values of the field, for records where it exists.
    AddToSet(String),
}

impl Accumulator {
    pub fn avg(field: impl Into<String>) -> Self {
        Accumulator::Avg(field.into())
    }

    pub fn sum(field: impl Into<String>) -> Self {
        Accumulator::Sum(field.into())
    }

    pub fn add_to_set(field: impl Into<String>) -> Self {
        Accumulator::AddToSet(field.into())
    }

    pub fn to_document(&self) -> Document {
        match self {
            Accumulator::Avg(field) => doc! { "$avg": field_ref(field) },
            Accumulator::Sum(field) => doc! { "$sum": field_ref(field) },
            Accumulator::Count => doc! { "$sum": 1 },
            Accumulator::AddToSet(field) => doc! { "$addToSet": field_ref(field) },
        }
    }
}

fn field_ref(field: &str) -> String {
    format!("${field}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    pub key: String,
    pub accumulators: Vec<(String, Accumulator)>,
}

impl Grouping {
    pub fn by(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            accumulators: Vec::new(),
        }
    }

    pub fn accumulate(mut self, name: impl Into<String>, accumulator: Accumulator) -> Self {
        self.accumulators.push((name.into(), accumulator));
        self
    }

    pub fn to_document(&self) -> Document {
        let mut group = Document::new();
        group.insert(GROUP_KEY, field_ref(&self.key));
        for (name, accumulator) in &self.accumulators {
            group.insert(name.as_str(), accumulator.to_document());
        }
        group
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn direction(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

/// Sort on the group key or on one accumulator output.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn by_key(order: SortOrder) -> Self {
        Self::by(GROUP_KEY, order)
    }

    pub fn by(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub filter: Predicate,
    pub group: Grouping,
    pub sort: Option<Sort>,
    pub limit: Option<i64>,
}

impl Pipeline {
    pub fn new(filter: Predicate, group: Grouping) -> Self {
        Self {
            filter,
            group,
            sort: None,
            limit: None,
        }
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limited(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render as MongoDB aggregation stages, in execution order.
    pub fn stages(&self) -> Vec<Document> {
        let mut stages = vec![
            doc! { "$match": self.filter.to_document() },
            doc! { "$group": self.group.to_document() },
        ];
        if let Some(sort) = &self.sort {
            let mut spec = Document::new();
            spec.insert(sort.field.as_str(), Bson::Int32(sort.order.direction()));
            stages.push(doc! { "$sort": spec });
        }
        if let Some(limit) = self.limit {
            stages.push(doc! { "$limit": limit });
        }
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Condition;

    #[test]
    fn stages_are_match_group_sort_limit() {
        let pipeline = Pipeline::new(
            Predicate::new().with("topic", Condition::PresentNonEmpty),
            Grouping::by("topic")
                .accumulate("intensity_avg", Accumulator::avg("intensity"))
                .accumulate("count", Accumulator::Count),
        )
        .sorted(Sort::by("count", SortOrder::Descending))
        .limited(20);

        let stages = pipeline.stages();
        assert_eq!(stages.len(), 4);
        assert_eq!(
            stages[1],
            doc! { "$group": {
                "_id": "$topic",
                "intensity_avg": { "$avg": "$intensity" },
                "count": { "$sum": 1 },
            }}
        );
        assert_eq!(stages[2], doc! { "$sort": { "count": -1 } });
        assert_eq!(stages[3], doc! { "$limit": 20_i64 });
    }

    #[test]
    fn unsorted_unlimited_pipeline_has_two_stages() {
        let pipeline = Pipeline::new(Predicate::new(), Grouping::by("region"));
        let stages = pipeline.stages();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0], doc! { "$match": {} });
    }

    #[test]
    fn sort_by_key_targets_group_id() {
        let pipeline = Pipeline::new(Predicate::new(), Grouping::by("start_year"))
            .sorted(Sort::by_key(SortOrder::Ascending));
        assert_eq!(pipeline.stages()[2], doc! { "$sort": { "_id": 1 } });
    }

    #[test]
    fn add_to_set_references_field() {
        assert_eq!(
            Accumulator::add_to_set("source").to_document(),
            doc! { "$addToSet": "$source" }
        );
    }
}
