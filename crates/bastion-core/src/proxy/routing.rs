//! Dynamic routing.
//!
//! A router inspects the inbound request and may pin it to a named endpoint
//! or endpoint group. It only selects; retries and breakers stay with the
//! coordinator. Routers are injected per API, [`RuleRouter`] being the
//! configuration-driven implementation.

use axum::http::{HeaderMap, Method};
use bastion_types::{ConfigError, RoutingRule};
use regex::Regex;
use std::fmt;

/// Request attributes visible to a router.
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'a> {
    pub method: &'a Method,
    /// Path remaining after the API context path
    pub path: &'a str,
    pub headers: &'a HeaderMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Load-balance over the API's first endpoint group
    Default,
    /// Every attempt goes to this endpoint
    Endpoint { name: String, path: Option<String> },
    /// Attempts are balanced over this group
    Group { name: String, path: Option<String> },
}

pub trait DynamicRouter: Send + Sync + fmt::Debug {
    fn route(&self, request: &RouteRequest<'_>) -> RouteDecision;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetKind {
    Endpoint,
    Group,
}

#[derive(Debug)]
struct CompiledRule {
    regex: Regex,
    rule: RoutingRule,
    kind: TargetKind,
}

/// Ordered regex rules; the first rule matching method and path wins.
#[derive(Debug, Default)]
pub struct RuleRouter {
    rules: Vec<CompiledRule>,
}

impl RuleRouter {
    /// Compile `rules`, resolving each target against the API's group and
    /// endpoint names.
    pub fn compile(
        rules: &[RoutingRule],
        group_names: &[&str],
        endpoint_names: &[&str],
    ) -> Result<Self, ConfigError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let regex = Regex::new(&rule.pattern).map_err(|e| {
                ConfigError::invalid(format!("routing.{}", rule.pattern), e.to_string())
            })?;
            let kind = if group_names.contains(&rule.target.as_str()) {
                TargetKind::Group
            } else if endpoint_names.contains(&rule.target.as_str()) {
                TargetKind::Endpoint
            } else {
                return Err(ConfigError::invalid(
                    "routing",
                    format!("unknown target '{}'", rule.target),
                ));
            };
            compiled.push(CompiledRule { regex, rule: rule.clone(), kind });
        }
        Ok(Self { rules: compiled })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl DynamicRouter for RuleRouter {
    fn route(&self, request: &RouteRequest<'_>) -> RouteDecision {
        for compiled in &self.rules {
            if !compiled.rule.matches_method(request.method.as_str()) {
                continue;
            }
            let Some(captures) = compiled.regex.captures(request.path) else {
                continue;
            };
            let path = compiled.rule.path.as_ref().map(|template| {
                let mut expanded = String::new();
                captures.expand(template, &mut expanded);
                expanded
            });
            let name = compiled.rule.target.clone();
            return match compiled.kind {
                TargetKind::Endpoint => RouteDecision::Endpoint { name, path },
                TargetKind::Group => RouteDecision::Group { name, path },
            };
        }
        RouteDecision::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, target: &str, path: Option<&str>) -> RoutingRule {
        RoutingRule {
            pattern: pattern.to_string(),
            methods: vec![],
            target: target.to_string(),
            path: path.map(str::to_string),
        }
    }

    fn route(router: &RuleRouter, method: Method, path: &str) -> RouteDecision {
        let headers = HeaderMap::new();
        router.route(&RouteRequest { method: &method, path, headers: &headers })
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let router = RuleRouter::compile(
            &[
                rule("^/items/(\\d+)$", "second-group-endpoint-1", Some("/item/$1")),
                rule("^/items", "second-group", None),
            ],
            &["default-group", "second-group"],
            &["second-group-endpoint-1"],
        )
        .expect("rules compile");

        assert_eq!(
            route(&router, Method::GET, "/items/42"),
            RouteDecision::Endpoint {
                name: "second-group-endpoint-1".to_string(),
                path: Some("/item/42".to_string())
            }
        );
        assert_eq!(
            route(&router, Method::GET, "/items"),
            RouteDecision::Group { name: "second-group".to_string(), path: None }
        );
        assert_eq!(route(&router, Method::GET, "/other"), RouteDecision::Default);
    }

    #[test]
    fn test_method_filter() {
        let mut post_only = rule(".*", "g", None);
        post_only.methods = vec!["POST".to_string()];
        let router = RuleRouter::compile(&[post_only], &["g"], &[]).expect("rules compile");

        assert_eq!(route(&router, Method::GET, "/x"), RouteDecision::Default);
        assert!(matches!(route(&router, Method::POST, "/x"), RouteDecision::Group { .. }));
    }

    #[test]
    fn test_invalid_pattern_and_unknown_target_rejected() {
        assert!(RuleRouter::compile(&[rule("(", "g", None)], &["g"], &[]).is_err());
        assert!(RuleRouter::compile(&[rule(".*", "nope", None)], &["g"], &[]).is_err());
        assert!(RuleRouter::default().is_empty());
    }
}
