//! Translate request query parameters into a [`Predicate`].

use insights_common::ALL_SENTINEL;

use crate::predicate::{Condition, Predicate};

/// The common filter parameters every endpoint accepts.
///
/// Values stay as raw strings; [`build_filter`] decides what they mean.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    pub end_year: Option<String>,
    pub topic: Option<String>,
    pub sector: Option<String>,
    pub region: Option<String>,
    pub pestle: Option<String>,
    pub source: Option<String>,
    pub country: Option<String>,
    pub exact_match: Option<String>,
}

impl FilterParams {
    /// Collect recognized parameters from raw `(name, value)` pairs.
    /// Unknown names are ignored; a repeated name keeps the first value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_ref() {
                "end_year" => &mut params.end_year,
                "topic" => &mut params.topic,
                "sector" => &mut params.sector,
                "region" => &mut params.region,
                "pestle" => &mut params.pestle,
                "source" => &mut params.source,
                "country" => &mut params.country,
                "exact_match" => &mut params.exact_match,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }

    /// `exact_match=true` (any case) switches topic matching to equality.
    pub fn exact_topic_match(&self) -> bool {
        self.exact_match
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// The topic value when it constrains the result.
    pub fn active_topic(&self) -> Option<&str> {
        active(&self.topic)
    }

    fn equality_fields(&self) -> [(&'static str, &Option<String>); 5] {
        [
            ("sector", &self.sector),
            ("region", &self.region),
            ("pestle", &self.pestle),
            ("source", &self.source),
            ("country", &self.country),
        ]
    }
}

/// Absent, empty and `"all"` values impose no constraint.
fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty() && *v != ALL_SENTINEL)
}

/// Build the record filter for a request.
///
/// `topic` matches as a case-insensitive substring unless `exact_match` is
/// true; every other field matches exactly. No recognized parameters yields an
/// empty predicate, which matches every record.
pub fn build_filter(params: &FilterParams) -> Predicate {
    let mut predicate = Predicate::new();

    if let Some(end_year) = active(&params.end_year) {
        predicate.and("end_year", Condition::equals(end_year));
    }

    if let Some(topic) = params.active_topic() {
        let condition = if params.exact_topic_match() {
            Condition::equals(topic)
        } else {
            Condition::ContainsIgnoreCase(topic.to_string())
        };
        predicate.and("topic", condition);
    }

    for (field, value) in params.equality_fields() {
        if let Some(value) = active(value) {
            predicate.and(field, Condition::equals(value));
        }
    }

    predicate
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn params(pairs: &[(&str, &str)]) -> FilterParams {
        FilterParams::from_pairs(pairs.iter().map(|(k, v)| (*k, v.to_string())))
    }

    #[test]
    fn no_params_builds_empty_predicate() {
        assert!(build_filter(&FilterParams::default()).is_empty());
    }

    #[test]
    fn all_sentinel_and_empty_values_are_ignored() {
        let p = params(&[
            ("end_year", "all"),
            ("topic", "all"),
            ("sector", "all"),
            ("region", ""),
            ("pestle", "all"),
            ("source", "all"),
            ("country", "all"),
        ]);
        assert!(build_filter(&p).is_empty());
    }

    #[test]
    fn topic_defaults_to_case_insensitive_containment() {
        let p = params(&[("topic", "Oil")]);
        assert_eq!(
            build_filter(&p).to_document(),
            doc! { "topic": { "$regex": "Oil", "$options": "i" } }
        );
    }

    #[test]
    fn exact_match_false_keeps_containment() {
        let p = params(&[("topic", "gas"), ("exact_match", "false")]);
        let conditions: Vec<_> = build_filter(&p).conditions_for("topic").cloned().collect();
        assert_eq!(conditions, vec![Condition::ContainsIgnoreCase("gas".into())]);
    }

    #[test]
    fn exact_match_true_is_case_insensitive_flag() {
        let p = params(&[("topic", "gas"), ("exact_match", "TRUE")]);
        assert_eq!(build_filter(&p).to_document(), doc! { "topic": "gas" });
    }

    #[test]
    fn other_fields_match_exactly() {
        let p = params(&[
            ("end_year", "2027"),
            ("sector", "Energy"),
            ("region", "Northern America"),
            ("pestle", "Economic"),
            ("source", "EIA"),
            ("country", "United States of America"),
        ]);
        assert_eq!(
            build_filter(&p).to_document(),
            doc! {
                "end_year": "2027",
                "sector": "Energy",
                "region": "Northern America",
                "pestle": "Economic",
                "source": "EIA",
                "country": "United States of America",
            }
        );
    }

    #[test]
    fn unknown_params_are_ignored() {
        let p = params(&[("metric", "likelihood"), ("group_by", "region"), ("limit", "3")]);
        assert!(build_filter(&p).is_empty());
    }

    #[test]
    fn exact_match_alone_adds_nothing() {
        let p = params(&[("exact_match", "true")]);
        assert!(build_filter(&p).is_empty());
    }

    #[test]
    fn first_repeated_value_wins() {
        let p = params(&[("sector", "Energy"), ("sector", "Retail")]);
        assert_eq!(p.sector.as_deref(), Some("Energy"));
    }
}
