//! robots.txt rule parsing
//!
//! Only `Disallow:` lines are honored; `Allow:`, `User-agent:`, comments and
//! unknown directives are ignored. Each rule is a path prefix.

use chrono::{DateTime, Utc};

/// Disallow rules of one origin
#[derive(Debug, Clone)]
pub struct RobotsRuleSet {
    disallow: Vec<String>,

    /// When the rules were fetched
    pub fetched_at: DateTime<Utc>,
}

impl RobotsRuleSet {
    /// Parses raw robots.txt content
    pub fn parse(content: &str) -> Self {
        let disallow = content
            .lines()
            .filter_map(|line| {
                let line = line.split('#').next().unwrap_or_default().trim();
                let (key, value) = line.split_once(':')?;
                if !key.trim().eq_ignore_ascii_case("disallow") {
                    return None;
                }
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_string())
            })
            .collect();

        Self {
            disallow,
            fetched_at: Utc::now(),
        }
    }

    /// The "no rules" set used whenever robots.txt is unavailable
    pub fn allow_all() -> Self {
        Self {
            disallow: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    pub fn disallow_rules(&self) -> &[String] {
        &self.disallow
    }

    /// Checks a URL path against the stored prefixes
    pub fn is_allowed(&self, path: &str) -> bool {
        !self.disallow.iter().any(|rule| rule_matches(rule, path))
    }
}

/// Matching semantics of a single rule:
/// - `/foo*` matches any path starting with `/foo`
/// - `/foo/` matches any path starting with `/foo/`
/// - `/foo` matches `/foo` itself and anything below `/foo/`, never `/foobar`
fn rule_matches(rule: &str, path: &str) -> bool {
    if let Some(prefix) = rule.strip_suffix('*') {
        return path.starts_with(prefix);
    }

    if rule.ends_with('/') {
        return path.starts_with(rule);
    }

    match path.strip_prefix(rule) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
