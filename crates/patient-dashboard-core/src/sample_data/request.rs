//! Requests to the demographic data service.

use serde::{Deserialize, Serialize};

/// A `GET` against the random demographic data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemographicRequest {
    FirstNames { quantity: usize },
    Surnames { quantity: usize },
    Addresses { number: usize },
}

impl DemographicRequest {
    /// Endpoint path, relative to the API root.
    pub fn path(&self) -> &'static str {
        match self {
            DemographicRequest::FirstNames { .. } | DemographicRequest::Surnames { .. } => "Name",
            DemographicRequest::Addresses { .. } => "Misc/Random-Address",
        }
    }

    /// Query pairs in the order the service documents them.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            DemographicRequest::FirstNames { quantity } => vec![
                ("nameType", "firstname".to_string()),
                ("quantity", quantity.to_string()),
            ],
            DemographicRequest::Surnames { quantity } => vec![
                ("nameType", "surname".to_string()),
                ("quantity", quantity.to_string()),
            ],
            DemographicRequest::Addresses { number } => vec![("number", number.to_string())],
        }
    }

    /// Path and query joined, e.g. `Name?nameType=firstname&quantity=10`.
    pub fn path_and_query(&self) -> String {
        let query = self
            .query()
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path(), query)
    }

    /// How many values the request asks for.
    pub fn count(&self) -> usize {
        match self {
            DemographicRequest::FirstNames { quantity }
            | DemographicRequest::Surnames { quantity } => *quantity,
            DemographicRequest::Addresses { number } => *number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(
            DemographicRequest::FirstNames { quantity: 10 }.path_and_query(),
            "Name?nameType=firstname&quantity=10"
        );
        assert_eq!(
            DemographicRequest::Surnames { quantity: 3 }.path_and_query(),
            "Name?nameType=surname&quantity=3"
        );
        assert_eq!(
            DemographicRequest::Addresses { number: 10 }.path_and_query(),
            "Misc/Random-Address?number=10"
        );
    }
}
