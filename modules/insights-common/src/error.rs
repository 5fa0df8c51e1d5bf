use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightsError {
    /// A query parameter carried a value outside its allow-list.
    #[error("Invalid {name}. Allowed values: {}", .allowed.join(", "))]
    InvalidParameter {
        name: &'static str,
        allowed: Vec<&'static str>,
    },

    #[error("Invalid {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("{0} parameter is required")]
    MissingParameter(&'static str),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl InsightsError {
    /// True for errors caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            InsightsError::InvalidParameter { .. }
                | InsightsError::InvalidValue { .. }
                | InsightsError::MissingParameter(_)
        )
    }

    /// Name of the offending query parameter, if any.
    pub fn parameter(&self) -> Option<&'static str> {
        match self {
            InsightsError::InvalidParameter { name, .. }
            | InsightsError::InvalidValue { name, .. }
            | InsightsError::MissingParameter(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_names_allowed_values() {
        let err = InsightsError::InvalidParameter {
            name: "metric",
            allowed: vec!["intensity", "likelihood", "relevance"],
        };
        assert_eq!(
            err.to_string(),
            "Invalid metric. Allowed values: intensity, likelihood, relevance"
        );
        assert!(err.is_client_error());
        assert_eq!(err.parameter(), Some("metric"));
    }

    #[test]
    fn database_error_is_not_client_error() {
        let err = InsightsError::Database("connection reset".into());
        assert!(!err.is_client_error());
        assert_eq!(err.parameter(), None);
    }
}
