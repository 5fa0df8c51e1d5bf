//! Per-endpoint query objects.
//!
//! Built from the raw query pairs so a repeated name keeps its first value.
//! Filter parameters pass through untouched; the selector parameters are
//! checked against their allow-lists before any store call.

use insights_common::{AllowList, GroupBy, InsightsError, Metric, TopNGroup};
use insights_store::analytics::{DEFAULT_TOP_N, MAX_TOP_N};
use insights_store::FilterParams;

/// Query string as `(name, value)` pairs in request order.
pub type QueryPairs = Vec<(String, String)>;

/// Filter parameters recognized in `pairs`.
pub fn filters(pairs: &[(String, String)]) -> FilterParams {
    FilterParams::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

fn first(pairs: &[(String, String)], name: &str) -> Option<String> {
    pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
}

#[derive(Debug)]
pub struct MetricsQuery {
    metric: Option<String>,
    group_by: Option<String>,
    pub filters: FilterParams,
}

impl MetricsQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            metric: first(pairs, "metric"),
            group_by: first(pairs, "group_by"),
            filters: filters(pairs),
        }
    }

    pub fn validate(&self) -> Result<(Metric, GroupBy), InsightsError> {
        let metric = Metric::parse_param(self.metric.as_deref())?;
        let group_by = GroupBy::parse_param(self.group_by.as_deref())?;
        Ok((metric, group_by))
    }
}

#[derive(Debug)]
pub struct TopNQuery {
    metric: Option<String>,
    group_by: Option<String>,
    limit: Option<String>,
    pub filters: FilterParams,
}

impl TopNQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            metric: first(pairs, "metric"),
            group_by: first(pairs, "group_by"),
            limit: first(pairs, "limit"),
            filters: filters(pairs),
        }
    }

    pub fn validate(&self) -> Result<(Metric, TopNGroup, i64), InsightsError> {
        let metric = Metric::parse_param(self.metric.as_deref())?;
        let group = TopNGroup::parse_param(self.group_by.as_deref())?;
        let limit = parse_limit(self.limit.as_deref())?;
        Ok((metric, group, limit))
    }
}

#[derive(Debug)]
pub struct TimeSeriesQuery {
    metric: Option<String>,
    pub filters: FilterParams,
}

impl TimeSeriesQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            metric: first(pairs, "metric"),
            filters: filters(pairs),
        }
    }

    pub fn validate(&self) -> Result<Metric, InsightsError> {
        Metric::parse_param(self.metric.as_deref())
    }
}

/// Absent means [`DEFAULT_TOP_N`]; anything but a positive integer is rejected.
/// Large values are capped at [`MAX_TOP_N`].
pub fn parse_limit(raw: Option<&str>) -> Result<i64, InsightsError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_TOP_N);
    };
    let invalid = |reason: &str| InsightsError::InvalidValue {
        name: "limit",
        reason: reason.to_string(),
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(n.min(MAX_TOP_N)),
        Ok(_) => Err(invalid("must be a positive integer")),
        Err(_) => Err(invalid(&format!("expected an integer, got {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(parse_limit(None).unwrap(), 10);
        assert_eq!(parse_limit(Some("3")).unwrap(), 3);
        assert_eq!(parse_limit(Some("5000")).unwrap(), 100);
    }

    #[test]
    fn limit_rejects_non_positive_and_garbage() {
        for raw in ["0", "-2", "abc", "", "2.5"] {
            let err = parse_limit(Some(raw)).unwrap_err();
            assert_eq!(err.parameter(), Some("limit"), "{raw:?}");
        }
    }

    fn pairs(raw: &[(&str, &str)]) -> QueryPairs {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn repeated_names_keep_the_first_value() {
        let query = TopNQuery::from_pairs(&pairs(&[
            ("limit", "3"),
            ("sector", "Energy"),
            ("limit", "abc"),
            ("sector", "Retail"),
        ]));
        assert_eq!(query.validate().unwrap().2, 3);
        assert_eq!(query.filters.sector.as_deref(), Some("Energy"));
    }

    #[test]
    fn metric_is_checked_before_group_by() {
        let query = MetricsQuery {
            metric: Some("bogus".into()),
            group_by: Some("bogus".into()),
            filters: FilterParams::default(),
        };
        assert_eq!(query.validate().unwrap_err().parameter(), Some("metric"));
    }

    #[test]
    fn top_n_accepts_source_grouping() {
        let query = TopNQuery {
            metric: Some("relevance".into()),
            group_by: Some("source".into()),
            limit: None,
            filters: FilterParams::default(),
        };
        let (metric, group, limit) = query.validate().unwrap();
        assert_eq!(metric, Metric::Relevance);
        assert_eq!(group, TopNGroup::Source);
        assert_eq!(limit, 10);
    }
}
