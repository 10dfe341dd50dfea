//! Sanitization rule table.
//!
//! Rules are data, not code: the built-in table is `rules.toml` (embedded at compile
//! time) and users can append more through `[[rules]]` entries in `recipe-audit.toml`.
//! Both use the same [`RuleSpec`] schema:
//!
//! ```toml
//! [[rules]]
//! name = "mpi-variant"
//! pass = "macro-calls"
//! pattern = '''\{\{\s*mpi_variant\s*\([^)]*\)\s*\}\}'''
//! action = "replace"
//! replacement = "{{ mpi }}"
//! ```
//!
//! # Ordering
//!
//! A compiled [`RuleTable`] is ordered by [`Pass`], then non-fallback before fallback
//! rules, then declaration order (built-ins first). The order is fixed for the life of
//! the table, so every recipe sees exactly the same sequence of transforms.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::AuditError;

/// Source text of the built-in rule table.
pub const BUILTIN_RULES: &str = include_str!("rules.toml");

/// Named sanitization passes, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pass {
    /// `{% ... %}` control flow and `{# ... #}` comments
    ConditionalBlocks,
    /// `{{ compiler('c') }}`, `{{ pin_subpackage(...) }}` and other macro calls
    MacroCalls,
    /// Filters, concatenation, pin bounds and environment lookups
    InterpolationModifiers,
    /// Tabs, stray interpolation at line start, templated scalars
    Cosmetic,
}

impl Pass {
    /// All passes in execution order.
    pub const ALL: [Pass; 4] =
        [Pass::ConditionalBlocks, Pass::MacroCalls, Pass::InterpolationModifiers, Pass::Cosmetic];

    /// Name as written in rule files.
    pub fn as_str(self) -> &'static str {
        match self {
            Pass::ConditionalBlocks => "conditional-blocks",
            Pass::MacroCalls => "macro-calls",
            Pass::InterpolationModifiers => "interpolation-modifiers",
            Pass::Cosmetic => "cosmetic",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a rule does with its matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// Substitute every match with `replacement` (`${1}` expands capture groups)
    Replace,
    /// Prefix every matching line with `#` at its indentation
    CommentLine,
    /// Remove every matching line
    DeleteLine,
    /// Wrap the `value` capture of a matching sequence item in single quotes
    QuoteItem,
    /// Turn every tab inside each match into two spaces
    ExpandTabs,
}

/// Serialized form of a rule, shared by `rules.toml` and user configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Unique, human-readable rule name
    pub name: String,
    /// Pass the rule belongs to
    pub pass: Pass,
    /// Free-form explanation, ignored by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Literal substring matcher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
    /// Regular-expression matcher (multi-line mode: `^`/`$` match at line boundaries)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Action applied to matches
    pub action: ActionKind,
    /// Replacement text for [`ActionKind::Replace`]; empty when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    /// Re-apply until the text stops changing
    #[serde(default)]
    pub repeat: bool,
    /// Run after the other rules of the same pass
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    version: u32,
    #[serde(default)]
    rules: Vec<RuleSpec>,
}

/// Compiled matcher of a rule.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Plain substring
    Literal(String),
    /// Compiled regular expression
    Pattern(Regex),
}

impl Matcher {
    /// Whether the matcher hits anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Literal(literal) => text.contains(literal.as_str()),
            Matcher::Pattern(regex) => regex.is_match(text),
        }
    }

    /// Number of non-overlapping matches in `text`.
    pub fn count(&self, text: &str) -> usize {
        match self {
            Matcher::Literal(literal) => text.matches(literal.as_str()).count(),
            Matcher::Pattern(regex) => regex.find_iter(text).count(),
        }
    }
}

/// Compiled action of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Substitute matches with the given text
    Replace(String),
    /// Comment out matching lines
    CommentLine,
    /// Delete matching lines
    DeleteLine,
    /// Quote the `value` capture of matching sequence items
    QuoteItem,
    /// Expand tabs inside matches
    ExpandTabs,
}

/// A compiled, immutable sanitization rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub pass: Pass,
    pub matcher: Matcher,
    pub action: Action,
    pub repeat: bool,
    pub fallback: bool,
}

impl Rule {
    /// Compile a [`RuleSpec`], validating matcher and action.
    pub fn compile(spec: &RuleSpec) -> Result<Self, AuditError> {
        let invalid = |reason: String| AuditError::InvalidRule {
            name: spec.name.clone(),
            reason,
        };

        if spec.name.trim().is_empty() {
            return Err(invalid("rule name must not be empty".to_string()));
        }

        let matcher = match (&spec.literal, &spec.pattern) {
            (Some(_), Some(_)) => {
                return Err(invalid("set either 'literal' or 'pattern', not both".to_string()));
            }
            (None, None) => {
                return Err(invalid("one of 'literal' or 'pattern' is required".to_string()));
            }
            (Some(literal), None) => {
                if literal.is_empty() {
                    return Err(invalid("'literal' must not be empty".to_string()));
                }
                Matcher::Literal(literal.clone())
            }
            (None, Some(pattern)) => {
                let regex = Regex::new(&format!("(?m){pattern}"))
                    .map_err(|e| invalid(format!("invalid pattern: {e}")))?;
                Matcher::Pattern(regex)
            }
        };

        let action = match spec.action {
            ActionKind::Replace => Action::Replace(spec.replacement.clone().unwrap_or_default()),
            ActionKind::CommentLine => Action::CommentLine,
            ActionKind::DeleteLine => Action::DeleteLine,
            ActionKind::QuoteItem => {
                let Matcher::Pattern(regex) = &matcher else {
                    return Err(invalid("'quote-item' needs a pattern".to_string()));
                };
                let names: Vec<&str> = regex.capture_names().flatten().collect();
                if !names.contains(&"lead") || !names.contains(&"value") {
                    return Err(invalid(
                        "'quote-item' pattern needs named groups 'lead' and 'value'".to_string(),
                    ));
                }
                Action::QuoteItem
            }
            ActionKind::ExpandTabs => Action::ExpandTabs,
        };

        if spec.replacement.is_some() && spec.action != ActionKind::Replace {
            return Err(invalid("'replacement' is only valid with action 'replace'".to_string()));
        }

        Ok(Self {
            name: spec.name.clone(),
            pass: spec.pass,
            matcher,
            action,
            repeat: spec.repeat,
            fallback: spec.fallback,
        })
    }
}

/// Ordered, versioned, read-only table of sanitization rules.
#[derive(Debug, Clone)]
pub struct RuleTable {
    version: u32,
    specs: Vec<RuleSpec>,
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Load the built-in table.
    pub fn builtin() -> Result<Self, AuditError> {
        Self::from_toml(BUILTIN_RULES)
    }

    /// Parse and compile a rule table from TOML text.
    pub fn from_toml(source: &str) -> Result<Self, AuditError> {
        let file: RuleFile = toml::from_str(source).map_err(|e| AuditError::ConfigError {
            message: format!("invalid rule table: {e}"),
        })?;
        Self::compile(file.version, file.rules)
    }

    /// Compile specs into an ordered table.
    pub fn compile(version: u32, specs: Vec<RuleSpec>) -> Result<Self, AuditError> {
        let mut seen = std::collections::HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(AuditError::InvalidRule {
                    name: spec.name.clone(),
                    reason: "duplicate rule name".to_string(),
                });
            }
        }

        let mut rules = specs.iter().map(Rule::compile).collect::<Result<Vec<_>, _>>()?;
        // Stable: keeps declaration order inside each (pass, fallback) group
        rules.sort_by_key(|rule| (rule.pass, rule.fallback));

        Ok(Self {
            version,
            specs,
            rules,
        })
    }

    /// Return a new table with `extra` appended to the declared rules.
    pub fn with_rules(&self, extra: &[RuleSpec]) -> Result<Self, AuditError> {
        if extra.is_empty() {
            return Ok(self.clone());
        }
        let mut specs = self.specs.clone();
        specs.extend_from_slice(extra);
        Self::compile(self.version, specs)
    }

    /// Version declared by the rule file.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Rules in execution order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules of one pass, in execution order.
    pub fn pass_rules(&self, pass: Pass) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |rule| rule.pass == pass)
    }

    /// Look up a rule by name.
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
