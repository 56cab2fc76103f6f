//! Placeholder interpolation engine
//!
//! Rewrites one string field at a time. Grammar, applied left to right:
//!
//! - `$$` is a literal `$` and never starts a placeholder
//! - `${name.path}` and `$name.path` are placeholders; each dotted segment is made of
//!   word characters, `-` and `_`
//!
//! A field that is exactly one placeholder takes the referenced value with its native
//! type. Anywhere else the value is rendered as text and spliced in. Substituted text is
//! never scanned again.

use super::error::ResolveError;
use super::fuzzy::fuzzy_get;
use super::references::{ReferenceTable, StepRecord, PREVIOUS};
use super::scope::Scope;
use super::temp::TempAllocator;
use crate::environment::expand_home;
use crate::manifest::{Node, Scalar};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use std::path::PathBuf;
use tracing::trace;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([\w-]+(?:\.[\w-]+)*)\}|\$([\w-]+(?:\.[\w-]+)*)")
        .expect("Invalid placeholder pattern")
});

const DATA: &str = "data";
const TMP: &str = "tmp";
const ENV: &str = "env";

/// Resolves placeholders against a data root, a temp allocator, the current scope and the
/// table of completed steps
#[derive(Debug)]
pub struct InterpolationEngine {
    data_root: PathBuf,
    temp: TempAllocator,
}

impl InterpolationEngine {
    /// Engine whose temp resources live under `<data_root>/tmp`
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        let temp = TempAllocator::new(data_root.join(TMP));
        Self { data_root, temp }
    }

    /// Resolve every placeholder in `field`
    pub fn interpolate(
        &self,
        field: &str,
        scope: &Scope,
        references: &ReferenceTable,
    ) -> Result<Scalar, ResolveError> {
        let (mut text, mut literals) = unescape(field);
        let mut cursor = 0;

        while cursor <= text.len() {
            let Some(caps) = PLACEHOLDER.captures_at(&text, cursor) else {
                break;
            };
            let Some(span) = caps.get(0).map(|m| m.range()) else {
                break;
            };
            if literals.contains(&span.start) {
                cursor = span.start + 1;
                continue;
            }

            let path = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let value = self.lookup(&path, scope, references)?;
            trace!("Resolved '${{{}}}' to {:?}", path, value);

            if span.start == 0 && span.end == text.len() {
                return Ok(finish(value));
            }

            let rendered = value.to_string();
            splice(&mut text, &mut literals, span.clone(), &rendered);
            cursor = span.start + rendered.len();
        }

        Ok(finish(Scalar::Str(text)))
    }

    /// Classify a dotted placeholder path and fetch its value
    fn lookup(
        &self,
        path: &str,
        scope: &Scope,
        references: &ReferenceTable,
    ) -> Result<Scalar, ResolveError> {
        let segments: Vec<&str> = path.split('.').collect();
        let (head, rest) = match segments.split_first() {
            Some((head, rest)) => (*head, rest),
            None => (path, &[][..]),
        };

        if head == DATA && rest.is_empty() {
            return Ok(Scalar::Str(self.data_root.to_string_lossy().into_owned()));
        }

        if head == TMP {
            let allocated = match rest {
                ["dir"] => self.temp.allocate_dir()?,
                ["file"] => self.temp.allocate_file()?,
                _ => {
                    return Err(ResolveError::InvalidTmp {
                        placeholder: path.to_string(),
                    })
                }
            };
            return Ok(Scalar::Str(allocated.to_string_lossy().into_owned()));
        }

        if rest.is_empty() {
            if let Some(node) = scope.lookup(head) {
                return descend(node, &[], path);
            }
        }

        if head == PREVIOUS {
            let record = references
                .previous()
                .ok_or_else(|| ResolveError::InvalidPrevious {
                    placeholder: path.to_string(),
                })?;
            return descend_record(record, rest, path);
        }

        match references.lookup(head) {
            Some(record) => descend_record(record, rest, path),
            None => Err(ResolveError::UnresolvableName {
                name: path.to_string(),
                fields: scope.field_names(),
                steps: references.keys(),
            }),
        }
    }
}

/// Collapse `$$` to `$`, returning the rewritten text and the byte offset of each
/// literal `$` it produced
fn unescape(field: &str) -> (String, Vec<usize>) {
    let mut text = String::with_capacity(field.len());
    let mut literals = Vec::new();
    let mut rest = field;
    while let Some(idx) = rest.find("$$") {
        text.push_str(&rest[..idx]);
        literals.push(text.len());
        text.push('$');
        rest = &rest[idx + 2..];
    }
    text.push_str(rest);
    (text, literals)
}

/// Replace `span` with `rendered`, shifting literal offsets past the splice
fn splice(text: &mut String, literals: &mut [usize], span: Range<usize>, rendered: &str) {
    let old_len = span.len();
    let start = span.start;
    text.replace_range(span, rendered);
    for pos in literals.iter_mut().filter(|pos| **pos > start) {
        *pos = *pos + rendered.len() - old_len;
    }
}

fn finish(value: Scalar) -> Scalar {
    match value {
        Scalar::Str(s) => Scalar::Str(expand_home(&s)),
        other => other,
    }
}

/// Descend into a step record; a first-level key missing from the record falls back to
/// the step's environment
fn descend_record(record: &StepRecord, rest: &[&str], path: &str) -> Result<Scalar, ResolveError> {
    let Some((first, tail)) = rest.split_first() else {
        return Err(ResolveError::IncompleteKeyPath {
            placeholder: path.to_string(),
            kind: "step",
        });
    };

    if let Some(node) = fuzzy_get(record, first) {
        return descend(node, tail, path);
    }
    if let Some(node) = record
        .get(ENV)
        .and_then(Node::as_map)
        .and_then(|env| fuzzy_get(env, first))
    {
        return descend(node, tail, path);
    }

    let mut available: Vec<String> = record.keys().cloned().collect();
    if let Some(env) = record.get(ENV).and_then(Node::as_map) {
        available.extend(env.keys().cloned());
    }
    Err(ResolveError::KeyNotFound {
        placeholder: path.to_string(),
        segment: first.to_string(),
        available,
    })
}

/// Follow `segments` from `node` down to a single scalar
fn descend(node: &Node, segments: &[&str], path: &str) -> Result<Scalar, ResolveError> {
    let mut current = node;
    for (i, segment) in segments.iter().enumerate() {
        current = match current {
            Node::Map(map) => fuzzy_get(map, segment).ok_or_else(|| ResolveError::KeyNotFound {
                placeholder: path.to_string(),
                segment: segment.to_string(),
                available: map.keys().cloned().collect(),
            })?,
            Node::List(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index))
                .ok_or_else(|| ResolveError::InvalidIndex {
                    placeholder: path.to_string(),
                    segment: segment.to_string(),
                    len: items.len(),
                })?,
            Node::Scalar(scalar) => {
                return Err(ResolveError::ExtraKeySegments {
                    placeholder: path.to_string(),
                    kind: scalar.kind(),
                    at: segments[..i].join("."),
                    extra: segments[i..].join("."),
                })
            }
        };
    }

    match current {
        Node::Scalar(scalar) => Ok(scalar.clone()),
        other => Err(ResolveError::IncompleteKeyPath {
            placeholder: path.to_string(),
            kind: other.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use std::path::Path;
    use tempfile::TempDir;

    fn frame(pairs: &[(&str, Scalar)]) -> IndexMap<String, Node> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Node::Scalar(v.clone())))
            .collect()
    }

    fn scope_with(pairs: &[(&str, Scalar)]) -> Scope {
        let mut scope = Scope::new();
        scope.push(frame(pairs));
        scope
    }

    fn engine() -> (TempDir, InterpolationEngine) {
        let dir = TempDir::new().unwrap();
        let engine = InterpolationEngine::new(dir.path());
        (dir, engine)
    }

    fn resolve(field: &str, scope: &Scope) -> Result<Scalar, ResolveError> {
        let (_dir, engine) = engine();
        engine.interpolate(field, scope, &ReferenceTable::new())
    }

    #[test]
    fn test_plain_text_unchanged() {
        let scope = Scope::new();
        assert_eq!(resolve("no placeholders", &scope).unwrap(), "no placeholders".into());
        assert_eq!(resolve("costs 5$", &scope).unwrap(), "costs 5$".into());
    }

    #[test]
    fn test_braced_and_bare_forms() {
        let scope = scope_with(&[("VAR", "value".into())]);
        assert_eq!(resolve("${VAR}", &scope).unwrap(), "value".into());
        assert_eq!(resolve("$VAR", &scope).unwrap(), "value".into());
        assert_eq!(resolve("a-$VAR/b", &scope).unwrap(), "a-value/b".into());
    }

    #[test]
    fn test_escape_sequences() {
        let scope = scope_with(&[("VAR", "value".into())]);
        assert_eq!(resolve("$$VAR", &scope).unwrap(), "$VAR".into());
        assert_eq!(resolve("$$${VAR}", &scope).unwrap(), "$value".into());
        assert_eq!(resolve("$$$${VAR}", &scope).unwrap(), "$${VAR}".into());
        assert_eq!(resolve("${VAR}$$", &scope).unwrap(), "value$".into());
    }

    #[test]
    fn test_literal_positions_shift_after_splice() {
        let scope = scope_with(&[("LONG", "a-much-longer-value".into()), ("X", "x".into())]);
        assert_eq!(
            resolve("${LONG} $$X ${X}", &scope).unwrap(),
            "a-much-longer-value $X x".into()
        );
        assert_eq!(resolve("$X$$X", &scope).unwrap(), "x$X".into());
    }

    #[test]
    fn test_whole_field_preserves_type() {
        let scope = scope_with(&[
            ("COUNT", Scalar::Int(3)),
            ("RATIO", Scalar::Float(0.5)),
            ("FLAG", Scalar::Bool(false)),
            ("NOTHING", Scalar::Null),
        ]);
        assert_eq!(resolve("${COUNT}", &scope).unwrap(), Scalar::Int(3));
        assert_eq!(resolve("$RATIO", &scope).unwrap(), Scalar::Float(0.5));
        assert_eq!(resolve("${FLAG}", &scope).unwrap(), Scalar::Bool(false));
        assert_eq!(resolve("${NOTHING}", &scope).unwrap(), Scalar::Null);
    }

    #[test]
    fn test_embedded_values_are_stringified() {
        let scope = scope_with(&[("COUNT", Scalar::Int(3)), ("NOTHING", Scalar::Null)]);
        assert_eq!(resolve("n=${COUNT}", &scope).unwrap(), "n=3".into());
        assert_eq!(resolve("${NOTHING}!", &scope).unwrap(), "null!".into());
        assert_eq!(resolve(" ${COUNT}", &scope).unwrap(), " 3".into());
    }

    #[test]
    fn test_no_rescan_of_substituted_text() {
        let scope = scope_with(&[("A", "${B}".into()), ("B", "never".into())]);
        assert_eq!(resolve("x${A}", &scope).unwrap(), "x${B}".into());
        assert_eq!(resolve("${A}", &scope).unwrap(), "${B}".into());
    }

    #[test]
    fn test_data_root() {
        let (dir, engine) = engine();
        let value = engine
            .interpolate("${data}/out", &Scope::new(), &ReferenceTable::new())
            .unwrap();
        assert_eq!(
            value,
            Scalar::Str(format!("{}/out", dir.path().to_string_lossy()))
        );
    }

    #[test]
    fn test_tmp_allocations_are_distinct() {
        let (dir, engine) = engine();
        let value = engine
            .interpolate("${tmp.dir} ${tmp.dir}", &Scope::new(), &ReferenceTable::new())
            .unwrap();
        let text = value.as_str().unwrap().to_string();
        let parts: Vec<&str> = text.split(' ').collect();
        assert_eq!(parts.len(), 2);
        assert_ne!(parts[0], parts[1]);
        for part in parts {
            assert!(Path::new(part).is_dir());
            assert!(Path::new(part).starts_with(dir.path().join("tmp")));
        }

        let file = engine
            .interpolate("${tmp.file}", &Scope::new(), &ReferenceTable::new())
            .unwrap();
        assert!(Path::new(file.as_str().unwrap()).is_file());
    }

    #[test]
    fn test_invalid_tmp_usage() {
        for field in ["${tmp}", "${tmp.folder}", "${tmp.dir.x}"] {
            let err = resolve(field, &Scope::new()).unwrap_err();
            assert!(matches!(err, ResolveError::InvalidTmp { .. }), "{field}");
        }
    }

    #[test]
    fn test_previous_requires_completed_step() {
        let err = resolve("${previous.output}", &Scope::new()).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidPrevious { .. }));
    }

    #[test]
    fn test_unresolvable_name_lists_scope() {
        let scope = scope_with(&[("SOURCE", "s".into())]);
        let err = resolve("${missing}", &scope).unwrap_err();
        match err {
            ResolveError::UnresolvableName { fields, steps, .. } => {
                assert_eq!(fields, vec!["SOURCE"]);
                assert!(steps.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn table_with_download() -> ReferenceTable {
        let mut env = IndexMap::new();
        env.insert("OUTPUT".to_string(), Node::from("/data/tmp/x"));
        let mut record = IndexMap::new();
        record.insert("name".to_string(), Node::from("download"));
        record.insert("target".to_string(), Node::from("fetch"));
        record.insert("env".to_string(), Node::Map(env));
        record.insert(
            "outputs".to_string(),
            Node::List(vec![Node::from("a.csv"), Node::from("b.csv")]),
        );
        record.insert("retries".to_string(), Node::Scalar(Scalar::Int(2)));

        let mut table = ReferenceTable::new();
        table.bind("download", record.clone());
        table.bind_previous(record);
        table
    }

    #[test]
    fn test_step_references_and_key_paths() {
        let (_dir, engine) = engine();
        let table = table_with_download();
        let scope = Scope::new();

        let cases = [
            ("${download.target}", Scalar::from("fetch")),
            ("${Download.Env.output}", Scalar::from("/data/tmp/x")),
            ("${previous.OUTPUT}", Scalar::from("/data/tmp/x")),
            ("${previous.output}", Scalar::from("/data/tmp/x")),
            ("${download.outputs.1}", Scalar::from("b.csv")),
            ("${download.retries}", Scalar::Int(2)),
        ];
        for (field, expected) in cases {
            assert_eq!(engine.interpolate(field, &scope, &table).unwrap(), expected, "{field}");
        }
    }

    #[test]
    fn test_key_path_failures() {
        let (_dir, engine) = engine();
        let table = table_with_download();
        let scope = Scope::new();

        let err = engine.interpolate("${download.env}", &scope, &table).unwrap_err();
        assert!(matches!(err, ResolveError::IncompleteKeyPath { kind: "record", .. }));

        let err = engine.interpolate("${download}", &scope, &table).unwrap_err();
        assert!(matches!(err, ResolveError::IncompleteKeyPath { kind: "step", .. }));

        let err = engine.interpolate("${download.outputs}", &scope, &table).unwrap_err();
        assert!(matches!(err, ResolveError::IncompleteKeyPath { kind: "list", .. }));

        let err = engine
            .interpolate("${download.target.name}", &scope, &table)
            .unwrap_err();
        match err {
            ResolveError::ExtraKeySegments { at, extra, .. } => {
                assert_eq!(at, "");
                assert_eq!(extra, "name");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = engine.interpolate("${download.outputs.7}", &scope, &table).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidIndex { len: 2, .. }));

        let err = engine.interpolate("${download.nope}", &scope, &table).unwrap_err();
        assert!(matches!(err, ResolveError::KeyNotFound { .. }));
    }

    #[test]
    fn test_container_shadows_step_reference() {
        let (_dir, engine) = engine();
        let table = table_with_download();
        let scope = scope_with(&[("download", "local".into())]);

        assert_eq!(
            engine.interpolate("${download}", &scope, &table).unwrap(),
            "local".into()
        );
    }

    #[test]
    fn test_home_expansion_of_result() {
        let scope = scope_with(&[("DIR", "~/jobs".into())]);
        let value = resolve("${DIR}", &scope).unwrap();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(value, Scalar::Str(home.join("jobs").to_string_lossy().into_owned()));
        }
    }

    #[test]
    fn test_unescape_records_positions() {
        let (text, literals) = unescape("a$$b$$$$c");
        assert_eq!(text, "a$b$$c");
        assert_eq!(literals, vec![1, 3, 4]);
    }
}
