use serde::{Deserialize, Serialize};
use validator::Validate;

/// Dynamic routing rule, evaluated in declaration order against the request
/// path remaining after the API context path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct RoutingRule {
    /// Regular expression; the first matching rule wins
    #[validate(length(min = 1_u64))]
    pub pattern: String,
    /// Restrict the rule to these HTTP methods (empty matches every method)
    #[serde(default)]
    pub methods: Vec<String>,
    /// Name of an endpoint or of an endpoint group
    #[validate(length(min = 1_u64))]
    pub target: String,
    /// Replacement path, `$1`-style captures are expanded
    #[serde(default)]
    pub path: Option<String>,
}

impl RoutingRule {
    pub fn matches_method(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }
}
