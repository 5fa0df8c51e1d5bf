//! Structured filter over insight record fields.
//!
//! A [`Predicate`] is built per request and rendered either to a MongoDB
//! `$match` document or evaluated directly by the in-memory store.

use bson::{doc, Bson, Document};

/// Constraint on a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value exactly.
    Equals(Bson),
    /// Field is a string containing the text, ignoring case.
    ContainsIgnoreCase(String),
    /// Field exists and is not null.
    Present,
    /// Field exists, is not null and is not the empty string.
    PresentNonEmpty,
}

impl Condition {
    pub fn equals(value: impl Into<Bson>) -> Self {
        Condition::Equals(value.into())
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            Condition::Equals(value) => value.clone(),
            Condition::ContainsIgnoreCase(text) => Bson::Document(doc! {
                "$regex": regex::escape(text),
                "$options": "i",
            }),
            Condition::Present => Bson::Document(doc! {
                "$exists": true,
                "$ne": Bson::Null,
            }),
            Condition::PresentNonEmpty => Bson::Document(doc! {
                "$exists": true,
                "$nin": ["", Bson::Null],
            }),
        }
    }
}

/// Conjunction of field clauses, optionally combined with one group of
/// alternatives of which at least one must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<(String, Condition)>,
    any_of: Vec<Predicate>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the predicate matches every record.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty() && self.any_of.is_empty()
    }

    /// Add a clause. Clauses on the same field are AND-ed.
    pub fn and(&mut self, field: impl Into<String>, condition: Condition) -> &mut Self {
        self.clauses.push((field.into(), condition));
        self
    }

    /// Replace every clause on `field` with `condition`.
    pub fn set(&mut self, field: impl Into<String>, condition: Condition) -> &mut Self {
        let field = field.into();
        self.clauses.retain(|(f, _)| *f != field);
        self.clauses.push((field, condition));
        self
    }

    /// Builder form of [`Predicate::and`].
    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.and(field, condition);
        self
    }

    /// Require at least one of `alternatives` to match.
    pub fn any_of(&mut self, alternatives: Vec<Predicate>) -> &mut Self {
        self.any_of = alternatives;
        self
    }

    pub fn clauses(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.clauses.iter().map(|(f, c)| (f.as_str(), c))
    }

    pub fn conditions_for<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a Condition> + 'a {
        self.clauses
            .iter()
            .filter(move |(f, _)| f == field)
            .map(|(_, c)| c)
    }

    pub fn alternatives(&self) -> &[Predicate] {
        &self.any_of
    }

    /// Render as a MongoDB query document.
    ///
    /// A field with a single clause renders inline; a field with several goes
    /// into a top-level `$and` so no operator key is overwritten.
    pub fn to_document(&self) -> Document {
        let mut fields: Vec<&str> = Vec::new();
        for (field, _) in &self.clauses {
            if !fields.contains(&field.as_str()) {
                fields.push(field.as_str());
            }
        }

        let mut query = Document::new();
        let mut conjunction: Vec<Bson> = Vec::new();
        for field in fields {
            let conditions: Vec<&Condition> = self.conditions_for(field).collect();
            if let [single] = conditions.as_slice() {
                query.insert(field, single.to_bson());
            } else {
                for condition in conditions {
                    let mut clause = Document::new();
                    clause.insert(field, condition.to_bson());
                    conjunction.push(Bson::Document(clause));
                }
            }
        }

        if !conjunction.is_empty() {
            query.insert("$and", conjunction);
        }
        if !self.any_of.is_empty() {
            let alternatives: Vec<Bson> = self
                .any_of
                .iter()
                .map(|p| Bson::Document(p.to_document()))
                .collect();
            query.insert("$or", alternatives);
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_predicate_renders_empty_document() {
        let p = Predicate::new();
        assert!(p.is_empty());
        assert_eq!(p.to_document(), Document::new());
    }

    #[test]
    fn contains_escapes_regex_metacharacters() {
        let p = Predicate::new().with("topic", Condition::ContainsIgnoreCase("c++ (gas)".into()));
        assert_eq!(
            p.to_document(),
            doc! { "topic": { "$regex": r"c\+\+ \(gas\)", "$options": "i" } }
        );
    }

    #[test]
    fn single_clause_renders_inline() {
        let p = Predicate::new()
            .with("sector", Condition::equals("Energy"))
            .with("intensity", Condition::Present);
        assert_eq!(
            p.to_document(),
            doc! {
                "sector": "Energy",
                "intensity": { "$exists": true, "$ne": Bson::Null },
            }
        );
    }

    #[test]
    fn repeated_field_goes_into_and() {
        let p = Predicate::new()
            .with("region", Condition::equals("Europe"))
            .with("region", Condition::PresentNonEmpty);
        assert_eq!(
            p.to_document(),
            doc! {
                "$and": [
                    { "region": "Europe" },
                    { "region": { "$exists": true, "$nin": ["", Bson::Null] } },
                ]
            }
        );
    }

    #[test]
    fn set_replaces_existing_clauses() {
        let mut p = Predicate::new()
            .with("country", Condition::equals("India"))
            .with("country", Condition::Present);
        p.set("country", Condition::equals("Japan"));
        assert_eq!(p.conditions_for("country").count(), 1);
        assert_eq!(p.to_document(), doc! { "country": "Japan" });
    }

    #[test]
    fn alternatives_render_as_or() {
        let mut p = Predicate::new().with("likelihood", Condition::Present);
        p.any_of(vec![
            Predicate::new().with("start_year", Condition::Present),
            Predicate::new().with("end_year", Condition::Present),
        ]);
        assert_eq!(
            p.to_document(),
            doc! {
                "likelihood": { "$exists": true, "$ne": Bson::Null },
                "$or": [
                    { "start_year": { "$exists": true, "$ne": Bson::Null } },
                    { "end_year": { "$exists": true, "$ne": Bson::Null } },
                ]
            }
        );
    }
}
