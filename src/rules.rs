//! Compiled app-name rules: config-order first-match, case-insensitive
//! glob patterns over the app name.

use regex::{escape, Regex};

use crate::common::config::{Config, Layer, Rule};

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pattern: Regex,
    pub target_space_label: Option<String>,
    pub manage_override: Option<bool>,
    pub opacity: Option<f64>,
    pub layer: Option<Layer>,
}

/// A rule's effect on a matched app, with `manage = false` short-circuiting
/// layout tracking and sync-planner moves while the window stays queryable.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEffect {
    pub manage: bool,
    pub target_space_label: Option<String>,
    pub opacity: Option<f64>,
    pub layer: Option<Layer>,
}

impl Default for RuleEffect {
    fn default() -> Self {
        RuleEffect { manage: true, target_space_label: None, opacity: None, layer: None }
    }
}

fn glob_to_regex(pattern: &str) -> Regex {
    let mut out = String::from("(?i)^");
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).unwrap_or_else(|_| Regex::new("$^").unwrap())
}

fn compile(rule: &Rule) -> CompiledRule {
    CompiledRule {
        pattern: glob_to_regex(&rule.app_name_pattern),
        target_space_label: rule.target_space_label.clone(),
        manage_override: rule.manage_override,
        opacity: rule.opacity,
        layer: rule.layer,
    }
}

/// The rule engine: config-order list of compiled patterns, tried
/// first-match-wins against an app name.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    pub fn from_config(config: &Config) -> Self {
        RuleEngine { rules: config.rules.iter().map(compile).collect() }
    }

    /// No match yields the default effect: manage, no target label, no
    /// opacity/layer override.
    pub fn resolve(&self, app_name: &str) -> RuleEffect {
        for rule in &self.rules {
            if rule.pattern.is_match(app_name) {
                return RuleEffect {
                    manage: rule.manage_override.unwrap_or(true),
                    target_space_label: rule.target_space_label.clone(),
                    opacity: rule.opacity,
                    layer: rule.layer,
                };
            }
        }
        RuleEffect::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Rule;

    fn config_with(rules: Vec<Rule>) -> Config { Config { rules, ..Config::default() } }

    #[test]
    fn first_match_wins() {
        let config = config_with(vec![
            Rule {
                app_name_pattern: "Term*".into(),
                target_space_label: Some("code".into()),
                manage_override: None,
                opacity: None,
                layer: None,
            },
            Rule {
                app_name_pattern: "Terminal".into(),
                target_space_label: Some("other".into()),
                manage_override: None,
                opacity: None,
                layer: None,
            },
        ]);
        let engine = RuleEngine::from_config(&config);
        assert_eq!(engine.resolve("Terminal").target_space_label, Some("code".into()));
    }

    #[test]
    fn glob_is_case_insensitive() {
        let config = config_with(vec![Rule {
            app_name_pattern: "safari".into(),
            target_space_label: None,
            manage_override: None,
            opacity: None,
            layer: None,
        }]);
        let engine = RuleEngine::from_config(&config);
        assert!(engine.resolve("Safari").manage);
    }

    #[test]
    fn manage_false_short_circuits() {
        let config = config_with(vec![Rule {
            app_name_pattern: "Finder".into(),
            target_space_label: Some("code".into()),
            manage_override: Some(false),
            opacity: None,
            layer: None,
        }]);
        let engine = RuleEngine::from_config(&config);
        let effect = engine.resolve("Finder");
        assert!(!effect.manage);
    }

    #[test]
    fn no_match_yields_default_effect() {
        let engine = RuleEngine::from_config(&Config::default());
        assert_eq!(engine.resolve("Anything"), RuleEffect::default());
    }
}
