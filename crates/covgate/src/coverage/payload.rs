//! Coverage payload decoding
//!
//! The instrumentation runtime reports one object per file, keyed by absolute
//! path. Two shapes are accepted:
//!
//! ```text
//! istanbul:    { "statementMap": {..}, "fnMap": {..}, "branchMap": {..},
//!                "s": {"0": 3}, "f": {"0": 1}, "b": {"0": [1, 0]} }
//! pre-counted: { "lines": {"total": 10, "covered": 8, "skipped": 0}, .. }
//! ```
//!
//! Records written to `coverage-final.json` (`{"path", "counts", "detail"}`)
//! are accepted as well, so a previous run's report can be gated again.

use super::{
    BranchHit, FileCoverageRecord, FileDetail, FunctionHit, MetricCounts, MetricMap, StatementHit,
};
use crate::result::{CovgateError, CovgateResult};
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Source position
#[derive(Debug, Clone, Copy, Deserialize)]
struct Position {
    line: u32,
}

/// Source range, optionally flagged as skipped
#[derive(Debug, Clone, Deserialize)]
struct Range {
    start: Position,
    #[serde(default)]
    skip: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RawFunction {
    name: Option<String>,
    line: Option<u32>,
    decl: Option<Range>,
    loc: Option<Range>,
    #[serde(default)]
    skip: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RawBranch {
    line: Option<u32>,
    loc: Option<Range>,
    #[serde(default)]
    locations: Vec<Range>,
    #[serde(default)]
    skip: bool,
}

/// Per-file object emitted by istanbul-compatible instrumenters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IstanbulFile {
    statement_map: BTreeMap<String, Range>,
    #[serde(default)]
    fn_map: BTreeMap<String, RawFunction>,
    #[serde(default)]
    branch_map: BTreeMap<String, RawBranch>,
    s: BTreeMap<String, u64>,
    #[serde(default)]
    f: BTreeMap<String, u64>,
    #[serde(default)]
    b: BTreeMap<String, Vec<u64>>,
}

/// Unit ids are decimal strings; order them numerically.
fn by_unit_id<'a, T>(
    path: &str,
    map: &'a BTreeMap<String, T>,
) -> CovgateResult<Vec<(u32, &'a str, &'a T)>> {
    let mut units = map
        .iter()
        .map(|(key, value)| {
            key.parse::<u32>()
                .map(|id| (id, key.as_str(), value))
                .map_err(|_| {
                    CovgateError::invalid_payload(format!("{path}: unit id `{key}` is not numeric"))
                })
        })
        .collect::<CovgateResult<Vec<_>>>()?;
    units.sort_by_key(|(id, _, _)| *id);
    Ok(units)
}

impl IstanbulFile {
    fn into_detail(self, path: &str) -> CovgateResult<FileDetail> {
        let statements = by_unit_id(path, &self.statement_map)?
            .into_iter()
            .map(|(_, key, range)| StatementHit {
                line: range.start.line,
                hits: self.s.get(key).copied().unwrap_or(0),
                skipped: range.skip,
            })
            .collect();

        let functions = by_unit_id(path, &self.fn_map)?
            .into_iter()
            .map(|(id, key, func)| {
                let line = func
                    .decl
                    .as_ref()
                    .or(func.loc.as_ref())
                    .map(|range| range.start.line)
                    .or(func.line)
                    .unwrap_or(0);
                FunctionHit {
                    name: func
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("(anonymous_{id})")),
                    line,
                    hits: self.f.get(key).copied().unwrap_or(0),
                    skipped: func.skip || func.decl.as_ref().is_some_and(|d| d.skip),
                }
            })
            .collect();

        let mut branches = Vec::new();
        for (id, key, branch) in by_unit_id(path, &self.branch_map)? {
            let line = branch
                .loc
                .as_ref()
                .map(|range| range.start.line)
                .or(branch.line)
                .unwrap_or(0);
            let hits = self.b.get(key).map(Vec::as_slice).unwrap_or_default();
            let arms = branch.locations.len().max(hits.len());
            branches.extend((0..arms).map(|arm| BranchHit {
                line,
                block: id,
                arm: arm as u32,
                hits: hits.get(arm).copied().unwrap_or(0),
                skipped: branch.skip || branch.locations.get(arm).is_some_and(|l| l.skip),
            }));
        }

        Ok(FileDetail {
            statements,
            functions,
            branches,
        })
    }
}

/// Decode one file entry, dispatching on the istanbul `statementMap` key.
fn decode_file(path: &str, raw: serde_json::Value) -> CovgateResult<FileCoverageRecord> {
    let unrecognised =
        |e: serde_json::Error| CovgateError::invalid_payload(format!("{path}: {e}"));

    if raw.get("statementMap").is_some() {
        let istanbul: IstanbulFile = serde_json::from_value(raw).map_err(unrecognised)?;
        return Ok(FileCoverageRecord::from_detail(
            path,
            istanbul.into_detail(path)?,
        ));
    }

    if raw.get("counts").is_some() {
        let record: FileCoverageRecord = serde_json::from_value(raw).map_err(unrecognised)?;
        if !record.detail().is_empty() {
            return Ok(FileCoverageRecord::from_detail(path, record.detail().clone()));
        }
        return checked_counts(path, *record.counts());
    }

    let counts: MetricMap<MetricCounts> = serde_json::from_value(raw).map_err(unrecognised)?;
    checked_counts(path, counts)
}

fn checked_counts(
    path: &str,
    counts: MetricMap<MetricCounts>,
) -> CovgateResult<FileCoverageRecord> {
    if !counts.is_consistent() {
        return Err(CovgateError::invalid_payload(format!(
            "{path}: covered + skipped exceeds total"
        )));
    }
    Ok(FileCoverageRecord::from_counts(path, counts))
}

/// Coverage records of one test run, keyed by absolute file path
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoveragePayload {
    files: BTreeMap<String, FileCoverageRecord>,
}

impl CoveragePayload {
    /// Empty payload
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a payload from its JSON text
    pub fn from_json_str(json: &str) -> CovgateResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json_value(value)
    }

    /// Decode a payload from a parsed JSON value
    pub fn from_json_value(value: serde_json::Value) -> CovgateResult<Self> {
        let serde_json::Value::Object(entries) = value else {
            return Err(CovgateError::invalid_payload(
                "expected an object keyed by file path",
            ));
        };

        let mut payload = Self::new();
        for (path, raw) in entries {
            payload.insert(decode_file(&path, raw)?);
        }
        Ok(payload)
    }

    /// Add a record, joining with any record already present for its path
    pub fn insert(&mut self, record: FileCoverageRecord) {
        let path = record.path().to_string();
        let joined = match self.files.remove(&path) {
            Some(existing) => existing.join(record),
            None => record,
        };
        let _ = self.files.insert(path, joined);
    }

    /// Join every record of `other` into this payload
    pub fn extend(&mut self, other: Self) {
        for record in other.files.into_values() {
            self.insert(record);
        }
    }

    /// Record for a path
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileCoverageRecord> {
        self.files.get(path)
    }

    /// Records in path order
    pub fn records(&self) -> impl Iterator<Item = &FileCoverageRecord> + '_ {
        self.files.values()
    }

    /// Number of files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// No files reported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<FileCoverageRecord> for CoveragePayload {
    fn from_iter<I: IntoIterator<Item = FileCoverageRecord>>(iter: I) -> Self {
        let mut payload = Self::new();
        for record in iter {
            payload.insert(record);
        }
        payload
    }
}

impl Serialize for CoveragePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.files.serialize(serializer)
    }
}

fn bundle_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"__coverage__='([^;]*)';(?:\r\n?|\n)").expect("bundle pattern is valid")
    })
}

/// Extract the coverage payload embedded in an instrumented bundle.
///
/// Every `__coverage__='<json>';` assignment is decoded and the results are
/// joined; a bundle without assignments yields an empty payload.
pub fn extract_bundle_payload(bundle: &str) -> CovgateResult<CoveragePayload> {
    let mut payload = CoveragePayload::new();
    for capture in bundle_pattern().captures_iter(bundle) {
        if let Some(json) = capture.get(1) {
            payload.extend(CoveragePayload::from_json_str(json.as_str())?);
        }
    }
    Ok(payload)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const ISTANBUL_FILE: &str = r#"{
        "/app/src/a.js": {
            "path": "/app/src/a.js",
            "statementMap": {
                "0": {"start": {"line": 1, "column": 0}, "end": {"line": 1, "column": 10}},
                "1": {"start": {"line": 2, "column": 2}, "end": {"line": 2, "column": 8}},
                "2": {"start": {"line": 2, "column": 9}, "end": {"line": 2, "column": 12}},
                "10": {"start": {"line": 5, "column": 0}, "end": {"line": 5, "column": 4}, "skip": true}
            },
            "fnMap": {
                "0": {"name": "add", "decl": {"start": {"line": 1, "column": 9}, "end": {"line": 1, "column": 12}}, "loc": {"start": {"line": 1, "column": 0}, "end": {"line": 3, "column": 1}}},
                "1": {"decl": {"start": {"line": 4, "column": 0}, "end": {"line": 4, "column": 1}}}
            },
            "branchMap": {
                "0": {"type": "if", "loc": {"start": {"line": 2, "column": 2}, "end": {"line": 2, "column": 20}}, "locations": [
                    {"start": {"line": 2, "column": 2}, "end": {"line": 2, "column": 20}},
                    {"start": {"line": 2, "column": 2}, "end": {"line": 2, "column": 20}}
                ]}
            },
            "s": {"0": 4, "1": 0, "2": 2, "10": 0},
            "f": {"0": 4, "1": 0},
            "b": {"0": [2, 0]},
            "hash": "abc123"
        }
    }"#;

    #[test]
    fn test_decode_istanbul_file() {
        let payload = CoveragePayload::from_json_str(ISTANBUL_FILE).unwrap();
        let record = payload.get("/app/src/a.js").unwrap();
        let counts = record.counts();
        assert_eq!(counts.statements, MetricCounts::new(4, 2).with_skipped(1));
        assert_eq!(counts.lines, MetricCounts::new(3, 2).with_skipped(1));
        assert_eq!(counts.functions, MetricCounts::new(2, 1));
        assert_eq!(counts.branches, MetricCounts::new(2, 1));
    }

    #[test]
    fn test_numeric_keys_keep_source_order() {
        let payload = CoveragePayload::from_json_str(ISTANBUL_FILE).unwrap();
        let detail = payload.get("/app/src/a.js").unwrap().detail();
        let lines: Vec<_> = detail.statements.iter().map(|s| s.line).collect();
        assert_eq!(lines, [1, 2, 2, 5]);
    }

    #[test]
    fn test_anonymous_function_name() {
        let payload = CoveragePayload::from_json_str(ISTANBUL_FILE).unwrap();
        let detail = payload.get("/app/src/a.js").unwrap().detail();
        assert_eq!(detail.functions[0].name, "add");
        assert_eq!(detail.functions[1].name, "(anonymous_1)");
        assert_eq!(detail.functions[1].line, 4);
    }

    #[test]
    fn test_decode_precounted_file() {
        let payload = CoveragePayload::from_json_str(
            r#"{"a.js": {"lines": {"total": 10, "covered": 8}}, "b.js": {"lines": {"total": 5, "covered": 5}}}"#,
        )
        .unwrap();
        assert_eq!(payload.len(), 2);
        assert_eq!(
            payload.get("a.js").unwrap().counts().lines,
            MetricCounts::new(10, 8)
        );
        assert!(payload.get("a.js").unwrap().detail().is_empty());
    }

    #[test]
    fn test_reject_inconsistent_counts() {
        let err = CoveragePayload::from_json_str(
            r#"{"a.js": {"lines": {"total": 2, "covered": 2, "skipped": 1}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CovgateError::InvalidPayload { .. }));
    }

    #[test]
    fn test_reject_unrecognised_shape() {
        let err = CoveragePayload::from_json_str(r#"{"a.js": {"lines": 3}}"#).unwrap_err();
        assert!(err.to_string().contains("a.js"));
    }

    #[test]
    fn test_reread_final_report() {
        let original = CoveragePayload::from_json_str(ISTANBUL_FILE).unwrap();
        let written = serde_json::to_string(&original).unwrap();
        let reread = CoveragePayload::from_json_str(&written).unwrap();
        assert_eq!(reread, original);
    }

    #[test]
    fn test_reread_counts_only_record() {
        let reread = CoveragePayload::from_json_str(
            r#"{"b.js": {"path": "b.js", "counts": {"lines": {"total": 5, "covered": 5}}}}"#,
        )
        .unwrap();
        assert_eq!(reread.get("b.js").unwrap().counts().lines.covered, 5);
    }

    #[test]
    fn test_reject_non_object_payload() {
        let err = CoveragePayload::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, CovgateError::InvalidPayload { .. }));
    }

    #[test]
    fn test_insert_same_path_joins() {
        let mut payload = CoveragePayload::new();
        let low = FileCoverageRecord::from_counts(
            "a.js",
            MetricMap {
                lines: MetricCounts::new(4, 1),
                ..MetricMap::default()
            },
        );
        let high = FileCoverageRecord::from_counts(
            "a.js",
            MetricMap {
                lines: MetricCounts::new(4, 3),
                ..MetricMap::default()
            },
        );
        payload.insert(high.clone());
        payload.insert(low);
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.get("a.js"), Some(&high));
    }

    #[test]
    fn test_extract_bundle_payload_multiple_matches() {
        let bundle = concat!(
            "var x = 1;\n",
            "__coverage__='{\"/a.js\":{\"lines\":{\"total\":2,\"covered\":1}}}';\n",
            "function f() {}\n",
            "__coverage__='{\"/b.js\":{\"lines\":{\"total\":3,\"covered\":3}}}';\r\n",
        );
        let payload = extract_bundle_payload(bundle).unwrap();
        assert_eq!(payload.len(), 2);
        assert!(payload.get("/a.js").is_some());
        assert!(payload.get("/b.js").is_some());
    }

    #[test]
    fn test_extract_bundle_without_coverage() {
        let payload = extract_bundle_payload("console.log('hi');\n").unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_payload_serializes_as_path_map() {
        let payload: CoveragePayload = vec![FileCoverageRecord::from_counts(
            "a.js",
            MetricMap::default(),
        )]
        .into_iter()
        .collect();
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("a.js").is_some());
    }
}
