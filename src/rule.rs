use crate::cache;
use std::borrow::Cow;
use thiserror::Error;

/// A single pure text transformation: match a pattern, substitute new text.
///
/// Rules carry no state and touch no files; [`PatchRule::apply`] maps an input
/// string to an output string and nothing else. Ordering only matters relative
/// to other rules applied to the same content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRule {
    /// Stable name used in reports and error messages
    pub name: String,
    /// How the rule locates text to replace
    pub matcher: Matcher,
    /// Replacement text; regex rules may reference captures ($1, ${name})
    pub replacement: String,
}

/// Matching strategy for a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Exact substring match, replaced everywhere it occurs
    Literal(String),
    /// Regular expression (full `regex` crate syntax)
    Regex(String),
}

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("rule '{name}' has an invalid pattern: {source}")]
    BadPattern {
        name: String,
        #[source]
        source: Box<regex::Error>,
    },
}

impl PatchRule {
    /// Create a literal substring rule.
    pub fn literal(
        name: impl Into<String>,
        search: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            matcher: Matcher::Literal(search.into()),
            replacement: replacement.into(),
        }
    }

    /// Create a regex rule. The pattern is compiled lazily on first apply;
    /// use [`PatchRule::compile`] to surface pattern errors eagerly.
    pub fn regex(
        name: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            matcher: Matcher::Regex(pattern.into()),
            replacement: replacement.into(),
        }
    }

    /// Eagerly compile the matcher, so malformed patterns are rejected
    /// before any file is touched (config loading calls this per rule).
    pub fn compile(&self) -> Result<(), RuleError> {
        if let Matcher::Regex(pattern) = &self.matcher {
            cache::get_or_compile(pattern).map_err(|source| RuleError::BadPattern {
                name: self.name.clone(),
                source: Box::new(source),
            })?;
        }
        Ok(())
    }

    /// Apply this rule to `content`, returning the transformed text.
    ///
    /// An unmatched rule is a silent no-op: the borrowed input is returned
    /// untouched, which lets callers detect "nothing happened" cheaply.
    pub fn apply<'a>(&self, content: &'a str) -> Result<Cow<'a, str>, RuleError> {
        match &self.matcher {
            Matcher::Literal(search) => {
                if search.is_empty() || !content.contains(search.as_str()) {
                    Ok(Cow::Borrowed(content))
                } else {
                    Ok(Cow::Owned(content.replace(search.as_str(), &self.replacement)))
                }
            }
            Matcher::Regex(pattern) => {
                let re = cache::get_or_compile(pattern).map_err(|source| {
                    RuleError::BadPattern {
                        name: self.name.clone(),
                        source: Box::new(source),
                    }
                })?;
                Ok(re.replace_all(content, self.replacement.as_str()))
            }
        }
    }
}

/// Fold a rule chain over `content` in declared order.
///
/// Each rule sees the output of the previous rule, not the original input;
/// later rules may depend on earlier normalization.
pub fn apply_rules(rules: &[PatchRule], content: &str) -> Result<String, RuleError> {
    let mut current = content.to_string();
    for rule in rules {
        if let Cow::Owned(next) = rule.apply(&current)? {
            current = next;
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_rule_replaces_all_occurrences() {
        let rule = PatchRule::literal("swap", "foo", "bar");
        let out = rule.apply("foo baz foo").unwrap();
        assert_eq!(out, "bar baz bar");
    }

    #[test]
    fn literal_rule_unmatched_is_borrowed_noop() {
        let rule = PatchRule::literal("swap", "foo", "bar");
        let out = rule.apply("nothing here").unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, "nothing here");
    }

    #[test]
    fn empty_literal_search_never_matches() {
        let rule = PatchRule::literal("empty", "", "bar");
        let out = rule.apply("abc").unwrap();
        assert_eq!(out, "abc");
    }

    #[test]
    fn regex_rule_expands_captures() {
        let rule = PatchRule::regex("px-to-em", r"(\d+)px", "${1}em");
        let out = rule.apply("margin: 10px 4px").unwrap();
        assert_eq!(out, "margin: 10em 4em");
    }

    #[test]
    fn regex_rule_named_captures() {
        let rule = PatchRule::regex(
            "swap-args",
            r"call\((?P<a>\w+), (?P<b>\w+)\)",
            "call(${b}, ${a})",
        );
        let out = rule.apply("call(x, y)").unwrap();
        assert_eq!(out, "call(y, x)");
    }

    #[test]
    fn bad_pattern_surfaces_rule_name() {
        let rule = PatchRule::regex("broken", r"(unclosed", "x");
        let err = rule.apply("content").unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn compile_rejects_bad_pattern_eagerly() {
        let rule = PatchRule::regex("broken", r"[z-a]", "x");
        assert!(rule.compile().is_err());
        assert!(PatchRule::literal("ok", "a", "b").compile().is_ok());
    }

    #[test]
    fn apply_rules_chains_in_declared_order() {
        // The second rule only matches once the first has stripped the suffix.
        let rules = vec![
            PatchRule::literal("strip-string-call", ".String()", ""),
            PatchRule::regex("id-accessor", r"x\.ID\b", "x.Id"),
        ];
        let out = apply_rules(&rules, "x.ID.String()").unwrap();
        assert_eq!(out, "x.Id");
    }

    #[test]
    fn apply_rules_reversed_order_differs() {
        // The rename pattern only matches after the strip has run, so
        // reversing the chain produces a different result.
        let chained = vec![
            PatchRule::regex("strip", r"\.String\(\)$", ""),
            PatchRule::regex("rename", r"x\.ID$", "x.Id"),
        ];
        let reversed: Vec<_> = chained.iter().rev().cloned().collect();

        assert_eq!(apply_rules(&chained, "x.ID.String()").unwrap(), "x.Id");
        assert_eq!(
            apply_rules(&reversed, "x.ID.String()").unwrap(),
            "x.ID",
            "rename anchored at end cannot fire before the strip"
        );
    }

    #[test]
    fn apply_rules_empty_chain_is_identity() {
        let out = apply_rules(&[], "unchanged").unwrap();
        assert_eq!(out, "unchanged");
    }
}
