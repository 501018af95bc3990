//! URL predicate deciding which observed calls are in scope.

use serde::{Deserialize, Serialize};

/// Substring rule set: a URL is in scope when it contains any fragment.
/// An empty rule set matches every URL.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UrlFilter {
    fragments: Vec<String>,
}

impl UrlFilter {
    pub fn new(fragments: Vec<String>) -> Self {
        Self { fragments }
    }

    pub fn contains(fragment: impl Into<String>) -> Self {
        Self {
            fragments: vec![fragment.into()],
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        self.fragments.is_empty() || self.fragments.iter().any(|f| url.contains(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_match_is_substring_based() {
        let filter = UrlFilter::contains("example.com/api");
        assert!(filter.matches("https://example.com/api/league/1"));
        assert!(!filter.matches("https://other.com/api/league/1"));
    }

    #[test]
    fn any_fragment_suffices() {
        let filter = UrlFilter::new(vec!["api.host".into(), "/graphql".into()]);
        assert!(filter.matches("https://api.host/v1"));
        assert!(filter.matches("https://web.host/graphql"));
        assert!(!filter.matches("https://web.host/assets/logo.png"));
    }

    #[test]
    fn empty_rule_set_matches_everything() {
        let filter = UrlFilter::default();
        assert!(filter.matches("https://anything.at.all"));
    }
}
