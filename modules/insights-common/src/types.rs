use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::InsightsError;

/// Value meaning "do not filter on this field".
pub const ALL_SENTINEL: &str = "all";

// --- Allow-lists ---

/// An enumerated query parameter with a fixed set of accepted spellings.
pub trait AllowList: Sized + Copy + Default + 'static {
    /// Query parameter name, used in error messages.
    const PARAM: &'static str;

    fn variants() -> &'static [Self];

    fn as_str(self) -> &'static str;

    fn allowed() -> Vec<&'static str> {
        Self::variants().iter().map(|v| v.as_str()).collect()
    }

    /// Absent values fall back to the default; anything outside the list is rejected.
    fn parse_param(raw: Option<&str>) -> Result<Self, InsightsError> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        Self::variants()
            .iter()
            .copied()
            .find(|v| v.as_str() == raw)
            .ok_or_else(|| InsightsError::InvalidParameter {
                name: Self::PARAM,
                allowed: Self::allowed(),
            })
    }
}

/// Numeric record field that can be averaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Metric {
    #[default]
    Intensity,
    Likelihood,
    Relevance,
}

impl Metric {
    pub fn field(self) -> &'static str {
        self.as_str()
    }
}

impl AllowList for Metric {
    const PARAM: &'static str = "metric";

    fn variants() -> &'static [Self] {
        &[Metric::Intensity, Metric::Likelihood, Metric::Relevance]
    }

    fn as_str(self) -> &'static str {
        match self {
            Metric::Intensity => "intensity",
            Metric::Likelihood => "likelihood",
            Metric::Relevance => "relevance",
        }
    }
}

/// Grouping accepted by the metrics endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GroupBy {
    #[default]
    Year,
    Country,
    Topic,
    Region,
    Sector,
    Pestle,
}

impl GroupBy {
    /// Record field the aggregation groups on.
    ///
    /// `year` groups on `start_year`, while the `end_year` query parameter
    /// filters on `end_year`. The dashboard relies on both behaviors.
    pub fn field(self) -> &'static str {
        match self {
            GroupBy::Year => "start_year",
            other => other.as_str(),
        }
    }
}

impl AllowList for GroupBy {
    const PARAM: &'static str = "group_by";

    fn variants() -> &'static [Self] {
        &[
            GroupBy::Year,
            GroupBy::Country,
            GroupBy::Topic,
            GroupBy::Region,
            GroupBy::Sector,
            GroupBy::Pestle,
        ]
    }

    fn as_str(self) -> &'static str {
        match self {
            GroupBy::Year => "year",
            GroupBy::Country => "country",
            GroupBy::Topic => "topic",
            GroupBy::Region => "region",
            GroupBy::Sector => "sector",
            GroupBy::Pestle => "pestle",
        }
    }
}

/// Grouping accepted by the top-N endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TopNGroup {
    #[default]
    Country,
    Topic,
    Region,
    Sector,
    Pestle,
    Source,
}

impl TopNGroup {
    pub fn field(self) -> &'static str {
        self.as_str()
    }
}

impl AllowList for TopNGroup {
    const PARAM: &'static str = "group_by";

    fn variants() -> &'static [Self] {
        &[
            TopNGroup::Country,
            TopNGroup::Topic,
            TopNGroup::Region,
            TopNGroup::Sector,
            TopNGroup::Pestle,
            TopNGroup::Source,
        ]
    }

    fn as_str(self) -> &'static str {
        match self {
            TopNGroup::Country => "country",
            TopNGroup::Topic => "topic",
            TopNGroup::Region => "region",
            TopNGroup::Sector => "sector",
            TopNGroup::Pestle => "pestle",
            TopNGroup::Source => "source",
        }
    }
}

/// Categorical field summarized by the analysis endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Topic,
    Region,
    Sector,
    Pestle,
}

impl Dimension {
    pub fn field(self) -> &'static str {
        match self {
            Dimension::Topic => "topic",
            Dimension::Region => "region",
            Dimension::Sector => "sector",
            Dimension::Pestle => "pestle",
        }
    }
}

// --- Result rows ---

/// One bucket of `/api/metrics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub name: Value,
    pub value: Option<f64>,
    pub count: i64,
    pub sum: f64,
}

/// One bucket of `/api/topN`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedGroup {
    pub name: Value,
    pub value: Option<f64>,
    pub count: i64,
}

/// One bucket of `/api/timeseries`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearPoint {
    pub year: Value,
    pub value: Option<f64>,
    pub count: i64,
}

/// Per-dimension averages of all three metrics.
///
/// Serializes with the dimension's field name as the key of the bucket value,
/// e.g. `{"sector": "Energy", "intensity": 6.5, ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionSummary {
    pub dimension: Dimension,
    pub key: Value,
    pub intensity: Option<f64>,
    pub likelihood: Option<f64>,
    pub relevance: Option<f64>,
    pub count: i64,
}

impl Serialize for DimensionSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry(self.dimension.field(), &self.key)?;
        map.serialize_entry("intensity", &self.intensity)?;
        map.serialize_entry("likelihood", &self.likelihood)?;
        map.serialize_entry("relevance", &self.relevance)?;
        map.serialize_entry("count", &self.count)?;
        map.end()
    }
}

/// Region bucket with the topics and sources seen inside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    #[serde(flatten)]
    pub summary: DimensionSummary,
    pub topics: Vec<String>,
    pub sources: Vec<String>,
}

/// Distinct values available for each filter dropdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub end_year: Vec<String>,
    pub topics: Vec<String>,
    pub sectors: Vec<String>,
    pub regions: Vec<String>,
    pub pestle: Vec<String>,
    pub sources: Vec<String>,
    pub countries: Vec<String>,
}
