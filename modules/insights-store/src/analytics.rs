//! Filtered and aggregated views served by the dashboard API.
//!
//! Each operation builds its pipeline with a pure `*_pipeline` function, runs
//! it through the injected [`InsightStore`], and reshapes the bucket documents
//! into typed rows.
//!
//! Filter options are rendered as strings for every field, not only
//! `end_year`, then sorted and deduplicated; the store's ordering is dropped.

use std::sync::Arc;

use bson::{Bson, Document};
use serde_json::Value;
use tracing::debug;

use insights_common::{
    Dimension, DimensionSummary, FilterOptions, GroupBy, InsightsError, Metric, MetricPoint,
    RankedGroup, RegionSummary, TopNGroup, YearPoint,
};

use crate::filter::{build_filter, FilterParams};
use crate::pipeline::{Accumulator, Grouping, Pipeline, Sort, SortOrder, GROUP_KEY};
use crate::predicate::{Condition, Predicate};
use crate::store::{FindOptions, InsightStore, Projection};

pub const DEFAULT_TOP_N: i64 = 10;
pub const MAX_TOP_N: i64 = 100;
pub const TOPIC_LIMIT: i64 = 20;
pub const COUNTRY_INSIGHTS_LIMIT: i64 = 20;

/// Fields returned by the country insights view.
pub const COUNTRY_INSIGHT_FIELDS: [&str; 7] = [
    "title", "insight", "topic", "sector", "intensity", "likelihood", "relevance",
];

/// Aggregation dispatcher over a shared store handle.
#[derive(Clone)]
pub struct InsightAnalytics {
    store: Arc<dyn InsightStore>,
}

impl InsightAnalytics {
    pub fn new(store: Arc<dyn InsightStore>) -> Self {
        Self { store }
    }

    /// Full records matching the filters.
    pub async fn list(&self, params: &FilterParams) -> Result<Vec<Document>, InsightsError> {
        let filter = build_filter(params);
        self.store.find(&filter, FindOptions::default()).await
    }

    /// Distinct non-empty values for every filterable field.
    pub async fn filter_options(&self) -> Result<FilterOptions, InsightsError> {
        let (end_year, topics, sectors, regions, pestle, sources, countries) = futures::try_join!(
            self.distinct_values("end_year"),
            self.distinct_values("topic"),
            self.distinct_values("sector"),
            self.distinct_values("region"),
            self.distinct_values("pestle"),
            self.distinct_values("source"),
            self.distinct_values("country"),
        )?;
        Ok(FilterOptions {
            end_year,
            topics,
            sectors,
            regions,
            pestle,
            sources,
            countries,
        })
    }

    async fn distinct_values(&self, field: &str) -> Result<Vec<String>, InsightsError> {
        let values = self.store.distinct(field).await?;
        let mut options: Vec<String> = values
            .iter()
            .filter(|v| is_truthy(v))
            .map(display_value)
            .collect();
        options.sort();
        options.dedup();
        Ok(options)
    }

    pub async fn metrics_by_group(
        &self,
        params: &FilterParams,
        group_by: GroupBy,
        metric: Metric,
    ) -> Result<Vec<MetricPoint>, InsightsError> {
        let rows = self.run(metrics_pipeline(params, group_by, metric)).await?;
        Ok(rows
            .iter()
            .map(|row| MetricPoint {
                name: group_key(row),
                value: number(row, "average"),
                count: count(row),
                sum: number(row, "sum").unwrap_or(0.0),
            })
            .collect())
    }

    pub async fn top_n(
        &self,
        params: &FilterParams,
        group: TopNGroup,
        metric: Metric,
        limit: i64,
    ) -> Result<Vec<RankedGroup>, InsightsError> {
        let rows = self.run(top_n_pipeline(params, group, metric, limit)).await?;
        Ok(rows
            .iter()
            .map(|row| RankedGroup {
                name: group_key(row),
                value: number(row, "average"),
                count: count(row),
            })
            .collect())
    }

    pub async fn time_series(
        &self,
        params: &FilterParams,
        metric: Metric,
    ) -> Result<Vec<YearPoint>, InsightsError> {
        let rows = self.run(time_series_pipeline(params, metric)).await?;
        Ok(rows
            .iter()
            .map(|row| YearPoint {
                year: group_key(row),
                value: number(row, "average"),
                count: count(row),
            })
            .collect())
    }

    pub async fn topic_analysis(
        &self,
        params: &FilterParams,
    ) -> Result<Vec<DimensionSummary>, InsightsError> {
        let rows = self.run(topic_pipeline(params)).await?;
        Ok(rows.iter().map(|row| summarize(Dimension::Topic, row)).collect())
    }

    pub async fn region_analysis(
        &self,
        params: &FilterParams,
    ) -> Result<Vec<RegionSummary>, InsightsError> {
        let rows = self.run(region_pipeline(params)).await?;
        Ok(rows
            .iter()
            .map(|row| RegionSummary {
                summary: summarize(Dimension::Region, row),
                topics: truthy_strings(row, "topics"),
                sources: truthy_strings(row, "sources"),
            })
            .collect())
    }

    pub async fn sector_analysis(
        &self,
        params: &FilterParams,
    ) -> Result<Vec<DimensionSummary>, InsightsError> {
        let rows = self.run(dimension_pipeline(params, Dimension::Sector)).await?;
        Ok(rows.iter().map(|row| summarize(Dimension::Sector, row)).collect())
    }

    pub async fn pest_analysis(
        &self,
        params: &FilterParams,
    ) -> Result<Vec<DimensionSummary>, InsightsError> {
        let rows = self.run(dimension_pipeline(params, Dimension::Pestle)).await?;
        Ok(rows.iter().map(|row| summarize(Dimension::Pestle, row)).collect())
    }

    /// Up to 20 insights for one country, projected to the display fields.
    ///
    /// `country` is mandatory and is checked before anything touches the store.
    pub async fn country_insights(
        &self,
        params: &FilterParams,
    ) -> Result<Vec<Document>, InsightsError> {
        let filter = country_insights_filter(params)?;
        let options = FindOptions {
            projection: Some(Projection::only(COUNTRY_INSIGHT_FIELDS)),
            limit: Some(COUNTRY_INSIGHTS_LIMIT),
        };
        self.store.find(&filter, options).await
    }

    async fn run(&self, pipeline: Pipeline) -> Result<Vec<Document>, InsightsError> {
        debug!(group = %pipeline.group.key, limit = ?pipeline.limit, "running aggregation");
        self.store.aggregate(&pipeline).await
    }
}

// --- Pipeline construction ---

/// Average and sum of `metric` per group, ordered by group key.
pub fn metrics_pipeline(params: &FilterParams, group_by: GroupBy, metric: Metric) -> Pipeline {
    let group_field = group_by.field();
    let filter = build_filter(params)
        .with(metric.field(), Condition::Present)
        .with(group_field, Condition::Present);

    Pipeline::new(
        filter,
        Grouping::by(group_field)
            .accumulate("average", Accumulator::avg(metric.field()))
            .accumulate("count", Accumulator::Count)
            .accumulate("sum", Accumulator::sum(metric.field())),
    )
    .sorted(Sort::by_key(SortOrder::Ascending))
}

/// Groups ranked by average `metric`, highest first.
pub fn top_n_pipeline(
    params: &FilterParams,
    group: TopNGroup,
    metric: Metric,
    limit: i64,
) -> Pipeline {
    let filter = build_filter(params)
        .with(metric.field(), Condition::Present)
        .with(group.field(), Condition::PresentNonEmpty);

    Pipeline::new(
        filter,
        Grouping::by(group.field())
            .accumulate("average", Accumulator::avg(metric.field()))
            .accumulate("count", Accumulator::Count),
    )
    .sorted(Sort::by("average", SortOrder::Descending))
    .limited(limit)
}

/// Average `metric` per `start_year`, for records carrying either year.
pub fn time_series_pipeline(params: &FilterParams, metric: Metric) -> Pipeline {
    let mut filter = build_filter(params).with(metric.field(), Condition::Present);
    filter.any_of(vec![
        Predicate::new().with("start_year", Condition::Present),
        Predicate::new().with("end_year", Condition::Present),
    ]);

    Pipeline::new(
        filter,
        Grouping::by("start_year")
            .accumulate("average", Accumulator::avg(metric.field()))
            .accumulate("count", Accumulator::Count),
    )
    .sorted(Sort::by_key(SortOrder::Ascending))
}

/// Top 20 topics by record count.
pub fn topic_pipeline(params: &FilterParams) -> Pipeline {
    let mut pipeline = dimension_pipeline(params, Dimension::Topic).limited(TOPIC_LIMIT);
    if params.exact_topic_match() {
        if let Some(topic) = params.active_topic() {
            pipeline.filter.set("topic", Condition::equals(topic));
            pipeline.filter.and("topic", Condition::PresentNonEmpty);
        }
    }
    pipeline
}

/// Region buckets, also collecting the topics and sources seen in each.
pub fn region_pipeline(params: &FilterParams) -> Pipeline {
    let mut pipeline = dimension_pipeline(params, Dimension::Region);
    pipeline.group = pipeline
        .group
        .accumulate("topics", Accumulator::add_to_set("topic"))
        .accumulate("sources", Accumulator::add_to_set("source"));
    pipeline
}

/// Averages of all three metrics per `dimension`, most frequent first.
pub fn dimension_pipeline(params: &FilterParams, dimension: Dimension) -> Pipeline {
    let field = dimension.field();
    let filter = build_filter(params).with(field, Condition::PresentNonEmpty);

    let mut group = Grouping::by(field);
    for metric in [Metric::Intensity, Metric::Likelihood, Metric::Relevance] {
        group = group.accumulate(average_name(metric), Accumulator::avg(metric.field()));
    }
    group = group.accumulate("count", Accumulator::Count);

    Pipeline::new(filter, group).sorted(Sort::by("count", SortOrder::Descending))
}

/// Filter for the country insights view; the `country` parameter replaces any
/// country clause the generic filters produced.
pub fn country_insights_filter(params: &FilterParams) -> Result<Predicate, InsightsError> {
    let country = params
        .country
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(InsightsError::MissingParameter("country"))?;

    let mut filter = build_filter(params);
    filter.set("country", Condition::equals(country));
    Ok(filter)
}

fn average_name(metric: Metric) -> &'static str {
    match metric {
        Metric::Intensity => "intensity_avg",
        Metric::Likelihood => "likelihood_avg",
        Metric::Relevance => "relevance_avg",
    }
}

// --- Result reshaping ---

fn summarize(dimension: Dimension, row: &Document) -> DimensionSummary {
    DimensionSummary {
        dimension,
        key: group_key(row),
        intensity: number(row, average_name(Metric::Intensity)),
        likelihood: number(row, average_name(Metric::Likelihood)),
        relevance: number(row, average_name(Metric::Relevance)),
        count: count(row),
    }
}

fn group_key(row: &Document) -> Value {
    row.get(GROUP_KEY)
        .cloned()
        .unwrap_or(Bson::Null)
        .into_relaxed_extjson()
}

fn number(row: &Document, key: &str) -> Option<f64> {
    match row.get(key)? {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn count(row: &Document) -> i64 {
    number(row, "count").map(|n| n as i64).unwrap_or(0)
}

/// Non-empty strings of an accumulated set, sorted for stable output.
fn truthy_strings(row: &Document, key: &str) -> Vec<String> {
    let mut values: Vec<String> = row
        .get_array(key)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| match v {
                    Bson::String(s) if !s.is_empty() => Some(s.clone()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    values.sort();
    values
}

fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Null | Bson::Undefined => false,
        Bson::String(s) => !s.is_empty(),
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::Array(items) => !items.is_empty(),
        Bson::Document(doc) => !doc.is_empty(),
        _ => true,
    }
}

fn display_value(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        Bson::Double(n) => n.to_string(),
        other => other.clone().into_relaxed_extjson().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn params(pairs: &[(&str, &str)]) -> FilterParams {
        FilterParams::from_pairs(pairs.iter().map(|(k, v)| (*k, v.to_string())))
    }

    #[test]
    fn year_grouping_uses_start_year_despite_end_year_filter() {
        let pipeline = metrics_pipeline(
            &params(&[("end_year", "2030")]),
            GroupBy::Year,
            Metric::Intensity,
        );
        assert_eq!(pipeline.group.key, "start_year");
        assert_eq!(
            pipeline.filter.conditions_for("end_year").collect::<Vec<_>>(),
            vec![&Condition::equals("2030")]
        );
        assert_eq!(
            pipeline.filter.conditions_for("start_year").collect::<Vec<_>>(),
            vec![&Condition::Present]
        );
    }

    #[test]
    fn metrics_pipeline_renders_expected_stages() {
        let stages =
            metrics_pipeline(&FilterParams::default(), GroupBy::Country, Metric::Relevance)
                .stages();
        assert_eq!(
            stages,
            vec![
                doc! { "$match": {
                    "relevance": { "$exists": true, "$ne": Bson::Null },
                    "country": { "$exists": true, "$ne": Bson::Null },
                }},
                doc! { "$group": {
                    "_id": "$country",
                    "average": { "$avg": "$relevance" },
                    "count": { "$sum": 1 },
                    "sum": { "$sum": "$relevance" },
                }},
                doc! { "$sort": { "_id": 1 } },
            ]
        );
    }

    #[test]
    fn top_n_sorts_by_average_and_limits() {
        let pipeline =
            top_n_pipeline(&FilterParams::default(), TopNGroup::Region, Metric::Likelihood, 3);
        assert_eq!(pipeline.limit, Some(3));
        assert_eq!(pipeline.sort, Some(Sort::by("average", SortOrder::Descending)));
        assert_eq!(
            pipeline.filter.conditions_for("region").collect::<Vec<_>>(),
            vec![&Condition::PresentNonEmpty]
        );
    }

    #[test]
    fn time_series_requires_either_year() {
        let pipeline = time_series_pipeline(&FilterParams::default(), Metric::Intensity);
        assert_eq!(pipeline.filter.alternatives().len(), 2);
        assert_eq!(pipeline.group.key, "start_year");
    }

    #[test]
    fn topic_pipeline_keeps_containment_without_exact_match() {
        let pipeline = topic_pipeline(&params(&[("topic", "oil")]));
        assert_eq!(pipeline.limit, Some(TOPIC_LIMIT));
        assert_eq!(
            pipeline.filter.conditions_for("topic").collect::<Vec<_>>(),
            vec![&Condition::ContainsIgnoreCase("oil".into()), &Condition::PresentNonEmpty]
        );
    }

    #[test]
    fn topic_pipeline_exact_match_uses_equality() {
        let pipeline = topic_pipeline(&params(&[("topic", "oil"), ("exact_match", "true")]));
        assert_eq!(
            pipeline.filter.conditions_for("topic").collect::<Vec<_>>(),
            vec![&Condition::equals("oil"), &Condition::PresentNonEmpty]
        );
    }

    #[test]
    fn region_pipeline_collects_topics_and_sources() {
        let pipeline = region_pipeline(&FilterParams::default());
        let names: Vec<&str> = pipeline
            .group
            .accumulators
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["intensity_avg", "likelihood_avg", "relevance_avg", "count", "topics", "sources"]
        );
        assert_eq!(pipeline.limit, None);
    }

    #[test]
    fn country_is_required() {
        let err = country_insights_filter(&FilterParams::default()).unwrap_err();
        assert!(matches!(err, InsightsError::MissingParameter("country")));

        let err = country_insights_filter(&params(&[("country", "")])).unwrap_err();
        assert!(matches!(err, InsightsError::MissingParameter("country")));
    }

    #[test]
    fn country_parameter_overrides_all_sentinel() {
        let filter =
            country_insights_filter(&params(&[("country", "all"), ("sector", "Energy")])).unwrap();
        assert_eq!(filter.to_document(), doc! { "sector": "Energy", "country": "all" });
    }

    #[test]
    fn truthy_strings_drop_null_and_empty() {
        let row = doc! { "topics": ["gas", Bson::Null, "", "oil"] };
        assert_eq!(truthy_strings(&row, "topics"), vec!["gas", "oil"]);
        assert!(truthy_strings(&doc! {}, "topics").is_empty());
    }

    #[test]
    fn display_value_stringifies_years() {
        assert_eq!(display_value(&Bson::Int32(2030)), "2030");
        assert_eq!(display_value(&Bson::String("2031".into())), "2031");
        assert!(!is_truthy(&Bson::Int32(0)));
        assert!(!is_truthy(&Bson::String(String::new())));
    }
}
