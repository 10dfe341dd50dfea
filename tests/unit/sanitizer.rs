//! Sanitizer behavior over whole documents: identity on plain YAML, idempotence,
//! convergence of equivalent macro spellings, and rule ordering.

use recipe_audit_cli::extract;
use recipe_audit_cli::sanitize::{Pass, RuleSpec, RuleTable, Sanitizer};
use recipe_audit_cli::templating::TemplateRenderer;
use recipe_audit_cli::test_utils::MetaFixture;

const SPLIT_FEEDSTOCK: &str = r#"{% set version = "0.4.1" %}
{% set build = 2 %}

package:
  name: libfoo-split
  version: {{ version }}

source:
  - url: https://github.com/foo/foo/archive/v{{ version }}.tar.gz
    sha256: abc

build:
  number: {{ build }}
  skip: true  # [win and py<38]

requirements:
  build:
    - {{ compiler("cxx") }}
    - {{ stdlib('c') }}
    - {{ cdt('mesa-libgl-devel') }}  # [linux]
    - cmake
  host:
    - python
    - numpy {{ numpy }}
  run:
    - {{ pin_subpackage('libfoo', max_pin='x.x') }}
    - {{ pin_compatible("numpy") }}

test:
  requires:
    - pytest
  imports:
    - foo
    - foo.core
  commands:
    - test -f $PREFIX/lib/libfoo${SHLIB_EXT}  # [unix]
    - if not exist %LIBRARY_BIN%\foo.dll exit 1  # [win]
    - {{ PYTHON }} -m pytest tests -k "not slow"

about:
  home: https://github.com/foo/foo
  license: BSD-3-Clause
"#;

const NOARCH_FEEDSTOCK: &str = r#"{% set name = "Foo-Bar" %}
{% set version = environ.get('GIT_DESCRIBE_TAG', '0.0.0') %}

package:
  name: {{ name|lower }}
  version: {{ version|replace("-", "_") }}

build:
  noarch: python
  number: 0
  string: {{ 'cuda' if cuda_compiler_version != 'None' else 'cpu' }}_{{ PKG_BUILDNUM }}
  script: {{ PYTHON }} -m pip install . --no-deps -vv

requirements:
  host:
    - python >=3.8
    - pip
  run:
    - python >=3.8
    - {{ os.environ.get('EXTRA_DEP', 'six') }}

test:
  imports:
    - foo_bar
"#;

const TABBED_FEEDSTOCK: &str = "{# maintained by bot #}\npackage:\n\tname: tabbed\n{{ macro_block }}\ntest:\n\tcommands:\n\t\t- tabbed --help\n";

/// Tab indentation far deeper than any single rule round would reach, plus a
/// quoted `#` inside a templated command.
fn deeply_tabbed_feedstock() -> String {
    format!(
        "test:\n\timports:\n{}- {{{{ name }}}}\n\tcommands:\n\t\t- {{{{ PYTHON }}}} -c \"print('#')\"  # [unix]\n",
        "\t".repeat(18)
    )
}

const PLAIN_DOCUMENTS: &[&str] = &[
    "package:\n  name: plain\n  version: 1.0.0\n",
    "package:\n  name: scripted\nbuild:\n  number: 3\n  skip: true  # [win]\ntest:\n  source_files:\n    - tests/\n  commands:\n    - pytest tests  # [linux]\n",
    "test:\n  imports: [a, b.c]\n  requires: [pytest, 'hypothesis >=6']\nabout:\n  summary: \"uses ${PREFIX} and 100% of {braces}\"\n",
    "",
];

fn sanitizer() -> Sanitizer {
    Sanitizer::builtin().expect("built-in rules compile")
}

fn corpus() -> Vec<String> {
    let mut docs: Vec<String> =
        [SPLIT_FEEDSTOCK, NOARCH_FEEDSTOCK, TABBED_FEEDSTOCK].iter().map(|s| s.to_string()).collect();
    docs.extend(PLAIN_DOCUMENTS.iter().map(|s| s.to_string()));
    docs.push(MetaFixture::templated("numpy").content);
    docs.push(MetaFixture::unparseable().content);
    docs.push(deeply_tabbed_feedstock());
    docs
}

/// Full pipeline minus I/O: sanitize, render per line, parse.
fn classify(raw: &str) -> extract::Classification {
    let sanitized = sanitizer().sanitize(raw);
    let rendered = TemplateRenderer::default().render(&sanitized);
    match extract::extract(&rendered.text) {
        Ok((_, classification)) => classification,
        Err(failure) => panic!("document failed to parse: {failure}\n---\n{}", rendered.text),
    }
}

#[test]
fn test_plain_documents_untouched() {
    let s = sanitizer();
    for doc in PLAIN_DOCUMENTS {
        let report = s.sanitize_with_report(doc);
        assert_eq!(report.text, *doc);
        assert_eq!(report.total_hits(), 0, "rules fired on {doc:?}: {:?}", report.hits);
    }
}

#[test]
fn test_sanitize_is_idempotent_over_corpus() {
    let s = sanitizer();
    for doc in corpus() {
        let once = s.sanitize(&doc);
        let twice = s.sanitize_with_report(&once);
        assert_eq!(twice.text, once, "second pass changed:\n{once}");
        assert!(twice.hits.is_empty(), "second pass fired {:?} on:\n{once}", twice.hits);
    }
}

#[test]
fn test_split_feedstock_classifies() {
    let c = classify(SPLIT_FEEDSTOCK);
    assert!(c.has_test_section);
    assert_eq!(c.declaration.imports, vec!["foo", "foo.core"]);
    assert_eq!(c.declaration.requires, vec!["pytest"]);
    assert_eq!(c.commands_count(), 3);
    assert_eq!(c.declaration.commands[0], "test -f $PREFIX/lib/libfoo${SHLIB_EXT}");
    assert_eq!(c.declaration.commands[2], "{{ PYTHON }} -m pytest tests -k \"not slow\"");
}

#[test]
fn test_noarch_feedstock_classifies() {
    let c = classify(NOARCH_FEEDSTOCK);
    assert!(c.has_import_test);
    assert!(!c.has_command_test);
    assert_eq!(c.declaration.imports, vec!["foo_bar"]);
}

#[test]
fn test_tabbed_feedstock_classifies() {
    let report = sanitizer().sanitize_with_report(TABBED_FEEDSTOCK);
    assert_eq!(report.hits_for("template-comment"), 1);
    assert_eq!(report.hits_for("top-level-interpolation"), 1);
    assert!(report.text.contains("\n#{{ macro_block }}\n"));
    assert!(!report.text.contains('\t'));

    let c = classify(TABBED_FEEDSTOCK);
    assert_eq!(c.declaration.commands, vec!["tabbed --help"]);
}

#[test]
fn test_deeply_tabbed_feedstock_classifies() {
    let report = sanitizer().sanitize_with_report(&deeply_tabbed_feedstock());
    assert!(!report.text.contains('\t'));
    assert_eq!(report.hits_for("indentation-tabs"), 4);

    let c = classify(&deeply_tabbed_feedstock());
    assert_eq!(c.declaration.imports, vec!["{{ name }}"]);
    assert_eq!(c.declaration.commands, vec!["{{ PYTHON }} -c \"print('#')\""]);
}

#[test]
fn test_equivalent_requirement_spellings_parse_identically() {
    let spellings = [
        "requirements:\n  build:\n    - {{ compiler('c') }}\n  run:\n    - {{ pin_subpackage('foo', max_pin='x.x') }}\n",
        "requirements:\n  build:\n    - {{ compiler(\"c\") }}\n  run:\n    - {{ pin_subpackage(\"foo\", exact=True) }}\n",
        "requirements:\n  build:\n    - {{compiler('c')}}\n  run:\n    - {{ pin_subpackage('foo') }}\n",
    ];

    let s = sanitizer();
    let renderer = TemplateRenderer::default();
    let parsed: Vec<_> = spellings
        .iter()
        .map(|raw| {
            let rendered = renderer.render(&s.sanitize(raw));
            extract::parse_document(&rendered.text).expect("parses")
        })
        .collect();

    assert_eq!(parsed[0], parsed[1]);
    assert_eq!(parsed[0], parsed[2]);
    let build = &parsed[0]["requirements"]["build"][0];
    assert_eq!(build.as_str(), Some("compiler"));
}

#[test]
fn test_unparseable_fixture_still_fails() {
    let s = sanitizer();
    let rendered = TemplateRenderer::default().render(&s.sanitize(&MetaFixture::unparseable().content));
    let failure = extract::parse_document(&rendered.text).unwrap_err();
    assert!(failure.line.is_some());
}

#[test]
fn test_user_rule_runs_before_generic_fallback() {
    let extra: RuleSpec = toml::from_str(
        r#"
name = "mpi-variant"
pass = "macro-calls"
pattern = '''\{\{\s*mpi_variant\s*\([^)]*\)\s*\}\}'''
action = "replace"
replacement = "{{ mpi }}"
"#,
    )
    .unwrap();

    let table = RuleTable::builtin().unwrap().with_rules(&[extra]).unwrap();
    let names: Vec<&str> = table.pass_rules(Pass::MacroCalls).map(|r| r.name.as_str()).collect();
    let user = names.iter().position(|n| *n == "mpi-variant").unwrap();
    let generic = names.iter().position(|n| *n == "generic-macro").unwrap();
    assert!(user < generic, "order was {names:?}");
    assert_eq!(names.last(), Some(&"generic-macro"));

    let report = Sanitizer::new(table).sanitize_with_report("deps:\n  - {{ mpi_variant('openmpi') }}\n");
    assert_eq!(report.text, "deps:\n  - {{ mpi }}\n");
    assert_eq!(report.hits_for("mpi-variant"), 1);
    assert_eq!(report.hits_for("generic-macro"), 0);
}

#[test]
fn test_rule_table_from_toml_rejects_bad_regex() {
    let err = RuleTable::from_toml(
        r#"
version = 1

[[rules]]
name = "broken"
pass = "cosmetic"
pattern = "(unclosed"
action = "comment-line"
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("broken"), "{err}");
}
