//! Template sanitization for recipe metadata documents.
//!
//! `meta.yaml` files are YAML extended with a Jinja-like template language. A YAML
//! parser cannot read `{% if %}` blocks, `{{ compiler('c') }}` calls or `{{ name|lower }}`
//! filters, so the [`Sanitizer`] rewrites the raw text into something it can: control
//! flow is commented out, macro calls collapse into bare placeholders, modifiers are
//! stripped and the remaining stray interpolations are commented or quoted.
//!
//! The transforms come from a [`RuleTable`] (see [`rules`]) applied in a fixed order.
//! A rule that matches nothing is a no-op, and sanitization itself never fails:
//! whatever is still unparseable afterwards is the extractor's problem.
//!
//! ```
//! use recipe_audit_cli::sanitize::Sanitizer;
//!
//! let sanitizer = Sanitizer::builtin().unwrap();
//! let text = sanitizer.sanitize("  - {{ pin_subpackage('libtiff', max_pin='x') }}\n");
//! assert_eq!(text, "  - {{ pin }}\n");
//! ```

pub mod rules;

pub use rules::{Action, ActionKind, Matcher, Pass, Rule, RuleSpec, RuleTable};

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::constants::MAX_RULE_REPEAT;
use crate::core::AuditError;

/// Number of times one rule changed a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    pub rule: String,
    pub pass: Pass,
    pub count: usize,
}

/// Sanitized text plus the rules that fired, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SanitizeReport {
    pub text: String,
    pub hits: Vec<RuleHit>,
}

impl SanitizeReport {
    /// Total number of rewrites across all rules.
    pub fn total_hits(&self) -> usize {
        self.hits.iter().map(|hit| hit.count).sum()
    }

    /// Hit count of one rule (0 when it never fired).
    pub fn hits_for(&self, rule: &str) -> usize {
        self.hits.iter().filter(|hit| hit.rule == rule).map(|hit| hit.count).sum()
    }
}

/// Applies a [`RuleTable`] to raw document text.
///
/// Cloning is cheap: the compiled table is shared, read-only, by every clone, so one
/// sanitizer can serve any number of concurrent recipe workers.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    table: Arc<RuleTable>,
}

impl Sanitizer {
    pub fn new(table: RuleTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Sanitizer over the built-in rule table.
    pub fn builtin() -> Result<Self, AuditError> {
        Ok(Self::new(RuleTable::builtin()?))
    }

    /// Sanitizer over the built-in table extended with user rules.
    pub fn with_user_rules(extra: &[RuleSpec]) -> Result<Self, AuditError> {
        Ok(Self::new(RuleTable::builtin()?.with_rules(extra)?))
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Sanitize `raw`, discarding hit statistics.
    pub fn sanitize(&self, raw: &str) -> String {
        self.sanitize_with_report(raw).text
    }

    /// Sanitize `raw` and record how often each rule fired.
    pub fn sanitize_with_report(&self, raw: &str) -> SanitizeReport {
        let mut text = raw.to_string();
        let mut hits = Vec::new();

        for rule in self.table.rules() {
            let (next, count) = apply_rule(rule, text);
            text = next;
            if count > 0 {
                debug!("Rule '{}' ({}) rewrote {} site(s)", rule.name, rule.pass, count);
                hits.push(RuleHit {
                    rule: rule.name.clone(),
                    pass: rule.pass,
                    count,
                });
            }
        }

        SanitizeReport {
            text,
            hits,
        }
    }
}

/// Apply one rule, honoring `repeat`. Returns the new text and the number of rewrites.
fn apply_rule(rule: &Rule, text: String) -> (String, usize) {
    let rounds = if rule.repeat {
        MAX_RULE_REPEAT
    } else {
        1
    };

    let mut text = text;
    let mut total = 0;
    for _ in 0..rounds {
        let (next, count) = apply_once(rule, &text);
        if count == 0 {
            break;
        }
        total += count;
        text = next;
    }
    (text, total)
}

fn apply_once(rule: &Rule, text: &str) -> (String, usize) {
    match &rule.action {
        Action::Replace(replacement) => replace(&rule.matcher, text, replacement),
        Action::CommentLine => rewrite_lines(text, |body| {
            if is_comment(body) || !rule.matcher.is_match(body) {
                return LineEdit::Keep;
            }
            LineEdit::Replace(comment_out(body))
        }),
        Action::DeleteLine => rewrite_lines(text, |body| {
            if rule.matcher.is_match(body) {
                LineEdit::Delete
            } else {
                LineEdit::Keep
            }
        }),
        Action::QuoteItem => rewrite_lines(text, |body| match &rule.matcher {
            Matcher::Pattern(regex) => quote_item(regex, body).map_or(LineEdit::Keep, LineEdit::Replace),
            Matcher::Literal(_) => LineEdit::Keep,
        }),
        Action::ExpandTabs => expand_tabs(&rule.matcher, text),
    }
}

fn replace(matcher: &Matcher, text: &str, replacement: &str) -> (String, usize) {
    let count = matcher.count(text);
    if count == 0 {
        return (text.to_string(), 0);
    }
    let next = match matcher {
        Matcher::Literal(literal) => text.replace(literal.as_str(), replacement),
        Matcher::Pattern(regex) => regex.replace_all(text, replacement).into_owned(),
    };
    // A replacement identical to its match is not a rewrite
    if next == text {
        return (next, 0);
    }
    (next, count)
}

/// Two spaces per tab, matching the indentation step of conda recipes.
const TAB_EXPANSION: &str = "  ";

/// Replace every tab inside each match, in a single sweep.
fn expand_tabs(matcher: &Matcher, text: &str) -> (String, usize) {
    match matcher {
        Matcher::Literal(literal) => {
            if !literal.contains('\t') {
                return (text.to_string(), 0);
            }
            let count = text.matches(literal.as_str()).count();
            (text.replace(literal.as_str(), &literal.replace('\t', TAB_EXPANSION)), count)
        }
        Matcher::Pattern(regex) => {
            let mut count = 0;
            let next = regex
                .replace_all(text, |caps: &regex::Captures<'_>| {
                    let matched = &caps[0];
                    if matched.contains('\t') {
                        count += 1;
                    }
                    matched.replace('\t', TAB_EXPANSION)
                })
                .into_owned();
            (next, count)
        }
    }
}

enum LineEdit {
    Keep,
    Replace(String),
    Delete,
}

/// Rewrite `text` line by line. Line endings (`\n` or `\r\n`) are preserved and never
/// passed to `edit`.
fn rewrite_lines(text: &str, mut edit: impl FnMut(&str) -> LineEdit) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut count = 0;

    for line in text.split_inclusive('\n') {
        let (body, ending) = split_line_ending(line);
        match edit(body) {
            LineEdit::Keep => out.push_str(line),
            LineEdit::Replace(new_body) => {
                count += 1;
                out.push_str(&new_body);
                out.push_str(ending);
            }
            LineEdit::Delete => count += 1,
        }
    }

    (out, count)
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

fn is_comment(body: &str) -> bool {
    body.trim_start().starts_with('#')
}

/// Insert `#` after the indentation so the line keeps its position in the document.
fn comment_out(body: &str) -> String {
    let indent = body.len() - body.trim_start().len();
    format!("{}#{}", &body[..indent], &body[indent..])
}

/// Wrap the `value` capture in single quotes. YAML escapes `'` inside single quotes
/// by doubling it.
fn quote_item(regex: &regex::Regex, body: &str) -> Option<String> {
    let caps = regex.captures(body)?;
    let whole = caps.get(0)?;
    let lead = caps.name("lead")?.as_str();
    let value = caps.name("value")?.as_str();
    let trail = caps.name("trail").map_or("", |m| m.as_str());

    Some(format!(
        "{}{}'{}'{}{}",
        &body[..whole.start()],
        lead,
        value.replace('\'', "''"),
        trail,
        &body[whole.end()..]
    ))
}
