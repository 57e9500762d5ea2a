//! Attribute-type to matching-rule resolution.
//!
//! The schema provider is an external collaborator in production; the
//! map-backed [`StaticSchema`] serves configuration-driven setups and tests.

use std::sync::Arc;

use ahash::AHashMap;
use dirix_matching::MatchingRule;

/// Resolves an attribute type to its configured matching rules. Any rule may
/// be absent, which disables the corresponding index kinds for the type.
pub trait SchemaProvider: Send + Sync {
    fn equality_rule(&self, attribute: &str) -> Option<Arc<dyn MatchingRule>>;
    fn ordering_rule(&self, attribute: &str) -> Option<Arc<dyn MatchingRule>>;
    fn substring_rule(&self, attribute: &str) -> Option<Arc<dyn MatchingRule>>;
    fn approximate_rule(&self, attribute: &str) -> Option<Arc<dyn MatchingRule>>;
}

/// The matching rules configured for one attribute type.
#[derive(Clone, Default)]
pub struct AttributeRules {
    pub equality: Option<Arc<dyn MatchingRule>>,
    pub ordering: Option<Arc<dyn MatchingRule>>,
    pub substring: Option<Arc<dyn MatchingRule>>,
    pub approximate: Option<Arc<dyn MatchingRule>>,
}

impl AttributeRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_equality(mut self, rule: Arc<dyn MatchingRule>) -> Self {
        self.equality = Some(rule);
        self
    }

    pub fn with_ordering(mut self, rule: Arc<dyn MatchingRule>) -> Self {
        self.ordering = Some(rule);
        self
    }

    pub fn with_substring(mut self, rule: Arc<dyn MatchingRule>) -> Self {
        self.substring = Some(rule);
        self
    }

    pub fn with_approximate(mut self, rule: Arc<dyn MatchingRule>) -> Self {
        self.approximate = Some(rule);
        self
    }

    /// Uses one rule for equality, ordering, and substring matching, the
    /// common configuration for string attributes.
    pub fn uniform(rule: Arc<dyn MatchingRule>) -> Self {
        Self {
            equality: Some(rule.clone()),
            ordering: Some(rule.clone()),
            substring: rule.kind().supports_substrings().then(|| rule.clone()),
            approximate: None,
        }
    }
}

/// Map-backed schema provider.
#[derive(Default)]
pub struct StaticSchema {
    by_attribute: AHashMap<String, AttributeRules>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, attribute: impl Into<String>, rules: AttributeRules) {
        self.by_attribute.insert(attribute.into(), rules);
    }

    fn rules(&self, attribute: &str) -> Option<&AttributeRules> {
        self.by_attribute.get(attribute)
    }
}

impl SchemaProvider for StaticSchema {
    fn equality_rule(&self, attribute: &str) -> Option<Arc<dyn MatchingRule>> {
        self.rules(attribute)?.equality.clone()
    }

    fn ordering_rule(&self, attribute: &str) -> Option<Arc<dyn MatchingRule>> {
        self.rules(attribute)?.ordering.clone()
    }

    fn substring_rule(&self, attribute: &str) -> Option<Arc<dyn MatchingRule>> {
        self.rules(attribute)?.substring.clone()
    }

    fn approximate_rule(&self, attribute: &str) -> Option<Arc<dyn MatchingRule>> {
        self.rules(attribute)?.approximate.clone()
    }
}
