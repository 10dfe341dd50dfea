//! YAML parsing and test-declaration classification.
//!
//! The extractor is the last stage of the per-document pipeline. It parses sanitized
//! text and pulls the `test` section apart:
//!
//! ```yaml
//! test:
//!   requires:
//!     - pytest
//!   imports:
//!     - numpy
//!   commands:
//!     - pytest --pyargs numpy
//! ```
//!
//! Every piece is optional. A missing `test` key, a `test: null`, or a missing
//! `imports` list all mean "zero items", never an error. Only a document the YAML
//! parser rejects produces a [`ParseFailure`].

use serde::Serialize;
use serde_yaml::Value;

/// A document that is still not valid YAML after sanitization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseFailure {
    /// Parser diagnostic
    pub message: String,
    /// 1-based line of the failure, when the parser reports one
    pub line: Option<usize>,
    /// 1-based column of the failure, when the parser reports one
    pub column: Option<usize>,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{} (line {line}, column {column})", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

impl ParseFailure {
    /// Text of the offending line in `text`, for diagnostics.
    pub fn offending_line<'a>(&self, text: &'a str) -> Option<&'a str> {
        let line = self.line?;
        text.lines().nth(line.checked_sub(1)?)
    }
}

/// Parse sanitized text into a YAML tree.
///
/// An empty document parses to `Value::Null`.
pub fn parse_document(text: &str) -> Result<Value, ParseFailure> {
    serde_yaml::from_str::<Value>(text).map_err(|e| {
        let location = e.location();
        ParseFailure {
            message: e.to_string(),
            line: location.as_ref().map(|l| l.line()),
            column: location.as_ref().map(|l| l.column()),
        }
    })
}

/// The `test` sub-section of a recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestDeclaration {
    pub requires: Vec<String>,
    pub imports: Vec<String>,
    pub commands: Vec<String>,
}

impl TestDeclaration {
    /// Pull the declaration out of a parsed document, tolerating any missing piece.
    pub fn from_fields(fields: &Value) -> Self {
        let Some(test) = fields.get("test").filter(|t| t.is_mapping()) else {
            return Self::default();
        };
        Self {
            requires: string_items(test.get("requires")),
            imports: string_items(test.get("imports")),
            commands: string_items(test.get("commands")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.requires.is_empty() && self.imports.is_empty() && self.commands.is_empty()
    }
}

/// Items of a YAML sequence as text. A lone scalar is one item; nulls are skipped.
fn string_items(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(other) => scalar_text(other).into_iter().collect(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        // Nested mappings/sequences: keep them countable
        other => Some(interpolation_text(other).unwrap_or_else(|| nested_text(other))),
    }
}

/// An item left as `{{ name }}` parses as the flow mapping `{{name: null}: null}`.
/// Give it back its template spelling.
fn interpolation_text(value: &Value) -> Option<String> {
    let (key, rest) = single_entry(value)?;
    if !rest.is_null() {
        return None;
    }
    let (name, rest) = single_entry(key)?;
    if !rest.is_null() {
        return None;
    }
    Some(format!("{{{{ {} }}}}", scalar_text(name)?))
}

fn single_entry(value: &Value) -> Option<(&Value, &Value)> {
    let mapping = value.as_mapping().filter(|m| m.len() == 1)?;
    mapping.iter().next()
}

fn nested_text(value: &Value) -> String {
    // Mapping keys that are themselves collections cannot be serialized back
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{value:?}"))
}

/// Classified test declaration of one recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// The document has a `test` mapping at all
    pub has_test_section: bool,
    pub has_import_test: bool,
    pub has_command_test: bool,
    pub declaration: TestDeclaration,
}

impl Classification {
    pub fn from_fields(fields: &Value) -> Self {
        let has_test_section = fields.get("test").is_some_and(Value::is_mapping);
        let declaration = TestDeclaration::from_fields(fields);
        Self {
            has_test_section,
            has_import_test: !declaration.imports.is_empty(),
            has_command_test: !declaration.commands.is_empty(),
            declaration,
        }
    }

    pub fn requires_count(&self) -> usize {
        self.declaration.requires.len()
    }

    pub fn imports_count(&self) -> usize {
        self.declaration.imports.len()
    }

    pub fn commands_count(&self) -> usize {
        self.declaration.commands.len()
    }
}

/// Parse and classify in one step.
pub fn extract(text: &str) -> Result<(Value, Classification), ParseFailure> {
    let fields = parse_document(text)?;
    let classification = Classification::from_fields(&fields);
    Ok((fields, classification))
}
