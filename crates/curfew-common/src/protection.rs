//! Name- and tag-based protection rules
//!
//! A resource is protected when any blacklist pattern matches its name, or
//! when any protected tag key carries one of its accepted values. Patterns
//! use shell-glob semantics (`*`, `?`), match case-insensitively, and are
//! anchored to the full name so `prod` does not match `reproduce`.

use crate::record::ResourceRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Protection rule for one resource kind, as written in the policy file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtectionRule {
    /// Glob patterns matched against the resource name
    pub blacklist_patterns: Vec<String>,
    /// Tag key -> accepted values that protect the resource
    pub protected_tags: BTreeMap<String, BTreeSet<String>>,
}

/// Malformed protection rule. Disables the affected resource kind for the
/// run; other kinds continue.
#[derive(Debug, Error)]
pub enum ProtectionConfigError {
    #[error("empty blacklist pattern")]
    EmptyPattern,

    #[error("empty value set for protected tag `{key}`")]
    EmptyTagValues { key: String },

    #[error("invalid blacklist pattern `{pattern}`: {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Why a resource is protected, kept for the audit trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectionMatch {
    /// Name matched this blacklist pattern
    Pattern(String),
    /// Resource carries this protected tag key/value
    Tag { key: String, value: String },
}

impl std::fmt::Display for ProtectionMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtectionMatch::Pattern(p) => write!(f, "name matches `{p}`"),
            ProtectionMatch::Tag { key, value } => write!(f, "tag {key}={value}"),
        }
    }
}

/// Compiled form of a [`ProtectionRule`], built once per run
#[derive(Debug, Clone)]
pub struct CompiledProtection {
    patterns: Vec<(String, Regex)>,
    protected_tags: BTreeMap<String, BTreeSet<String>>,
}

impl CompiledProtection {
    pub fn compile(rule: &ProtectionRule) -> Result<Self, ProtectionConfigError> {
        let mut patterns = Vec::with_capacity(rule.blacklist_patterns.len());
        for pattern in &rule.blacklist_patterns {
            if pattern.is_empty() {
                return Err(ProtectionConfigError::EmptyPattern);
            }
            let regex = glob_to_regex(pattern).map_err(|source| {
                ProtectionConfigError::BadPattern {
                    pattern: pattern.clone(),
                    source,
                }
            })?;
            patterns.push((pattern.clone(), regex));
        }

        for (key, values) in &rule.protected_tags {
            if values.is_empty() {
                return Err(ProtectionConfigError::EmptyTagValues { key: key.clone() });
            }
        }

        Ok(Self {
            patterns,
            protected_tags: rule.protected_tags.clone(),
        })
    }

    /// An empty rule set that protects nothing
    pub fn none() -> Self {
        Self {
            patterns: Vec::new(),
            protected_tags: BTreeMap::new(),
        }
    }

    /// Blacklist patterns are checked first, then protected tags.
    /// `None` means the resource is not protected.
    pub fn evaluate(&self, record: &ResourceRecord) -> Option<ProtectionMatch> {
        for (pattern, regex) in &self.patterns {
            if regex.is_match(&record.name) {
                return Some(ProtectionMatch::Pattern(pattern.clone()));
            }
        }

        for (key, values) in &self.protected_tags {
            if let Some(value) = record.tags.get(key) {
                if values.contains(value) {
                    return Some(ProtectionMatch::Tag {
                        key: key.clone(),
                        value: value.clone(),
                    });
                }
            }
        }

        None
    }
}

/// Translate a shell glob into an anchored, case-insensitive regex.
fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push_str("(?i)^");
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_kind::ResourceKind;
    use std::collections::HashMap;

    fn record(name: &str, tags: &[(&str, &str)]) -> ResourceRecord {
        ResourceRecord {
            kind: ResourceKind::ComputeInstance,
            region: "us-east-1".to_string(),
            id: "i-0abc".to_string(),
            name: name.to_string(),
            created_at: None,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            parent: None,
            arn: None,
            instance_class: None,
            size_factor: 1.0,
        }
    }

    fn rule(patterns: &[&str], tags: &[(&str, &[&str])]) -> CompiledProtection {
        let rule = ProtectionRule {
            blacklist_patterns: patterns.iter().map(|p| p.to_string()).collect(),
            protected_tags: tags
                .iter()
                .map(|(k, vs)| {
                    (
                        k.to_string(),
                        vs.iter().map(|v| v.to_string()).collect::<BTreeSet<_>>(),
                    )
                })
                .collect(),
        };
        CompiledProtection::compile(&rule).unwrap()
    }

    #[test]
    fn glob_star_matches_any_run() {
        let p = rule(&["prod-*"], &[]);
        assert!(p.evaluate(&record("prod-api", &[])).is_some());
        assert!(p.evaluate(&record("prod-", &[])).is_some());
        assert!(p.evaluate(&record("staging-api", &[])).is_none());
    }

    #[test]
    fn glob_is_anchored_not_substring() {
        let p = rule(&["prod"], &[]);
        // Full-name match only: "reproduce" must not be protected
        assert!(p.evaluate(&record("prod", &[])).is_some());
        assert!(p.evaluate(&record("reproduce", &[])).is_none());
        assert!(p.evaluate(&record("prod-api", &[])).is_none());
    }

    #[test]
    fn glob_is_case_insensitive() {
        let p = rule(&["PROD-*"], &[]);
        assert!(p.evaluate(&record("prod-db", &[])).is_some());
    }

    #[test]
    fn glob_question_mark_matches_one_char() {
        let p = rule(&["node-?"], &[]);
        assert!(p.evaluate(&record("node-1", &[])).is_some());
        assert!(p.evaluate(&record("node-12", &[])).is_none());
    }

    #[test]
    fn regex_metacharacters_in_patterns_are_literal() {
        let p = rule(&["api.v2"], &[]);
        assert!(p.evaluate(&record("api.v2", &[])).is_some());
        // A regex dot would match this; a literal dot must not
        assert!(p.evaluate(&record("apixv2", &[])).is_none());
    }

    #[test]
    fn protected_tag_value_matches() {
        let p = rule(&[], &[("Environment", &["production", "staging"])]);
        let m = p
            .evaluate(&record("anything", &[("Environment", "production")]))
            .unwrap();
        assert_eq!(
            m,
            ProtectionMatch::Tag {
                key: "Environment".to_string(),
                value: "production".to_string(),
            }
        );
    }

    #[test]
    fn tag_key_with_unlisted_value_is_not_protected() {
        let p = rule(&[], &[("Environment", &["production"])]);
        assert!(p
            .evaluate(&record("x", &[("Environment", "dev")]))
            .is_none());
    }

    #[test]
    fn pattern_match_wins_over_tag_match() {
        let p = rule(&["keep-*"], &[("Environment", &["production"])]);
        let m = p
            .evaluate(&record("keep-me", &[("Environment", "production")]))
            .unwrap();
        assert!(matches!(m, ProtectionMatch::Pattern(_)));
    }

    #[test]
    fn empty_pattern_is_rejected() {
        let rule = ProtectionRule {
            blacklist_patterns: vec![String::new()],
            protected_tags: BTreeMap::new(),
        };
        assert!(matches!(
            CompiledProtection::compile(&rule),
            Err(ProtectionConfigError::EmptyPattern)
        ));
    }

    #[test]
    fn empty_tag_value_set_is_rejected() {
        let rule = ProtectionRule {
            blacklist_patterns: Vec::new(),
            protected_tags: [("Owner".to_string(), BTreeSet::new())].into(),
        };
        assert!(matches!(
            CompiledProtection::compile(&rule),
            Err(ProtectionConfigError::EmptyTagValues { .. })
        ));
    }

    #[test]
    fn empty_rule_protects_nothing() {
        let p = CompiledProtection::none();
        assert!(p.evaluate(&record("prod-db", &[("Environment", "production")])).is_none());
    }
}
