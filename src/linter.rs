//! Definition linting - static analysis of definition files.
//!
//! Checks definition files for:
//! - JSON syntax errors (E001)
//! - Documents that don't decode or compile as definitions (E002)
//! - Unions and intersections with fewer than two branches (W001)
//! - Lower bounds above upper bounds (W002)

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::definition::{display_pointer, pointer_child, Definition, DefinitionKind};
use crate::error::DefinitionError;
use crate::loader::load_json;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON pointer to the issue (e.g., "/shape/id/pattern")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_definition_files(path);
    let results: Vec<FileResult> = files.iter().map(|file| lint_file(file, path)).collect();

    let count = |severity: Severity| {
        results
            .iter()
            .flat_map(|r| &r.diagnostics)
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    tracing::debug!(files = files.len(), errors, warnings, "lint finished");
    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors,
        warnings,
        results,
    }
}

/// Lint a single definition file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();
    let mut report = |severity: Severity, code: &str, path: String, message: String| {
        diagnostics.push(Diagnostic {
            severity,
            code: code.to_string(),
            file: file.to_path_buf(),
            path,
            message,
        });
    };

    match load_json(file) {
        Err(e) => report(Severity::Error, "E001", "/".into(), format!("syntax error: {}", e)),
        Ok(json) => match Definition::from_json(json) {
            Err(e) => report(Severity::Error, "E002", error_pointer(&e), e.to_string()),
            Ok(definition) => {
                if let Err(e) = definition.compile() {
                    report(Severity::Error, "E002", error_pointer(&e), e.to_string());
                }
                check_definition(&definition, "", &mut report);
            }
        },
    }

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

fn error_pointer(error: &DefinitionError) -> String {
    match error {
        DefinitionError::InvalidDefinition { path, .. } | DefinitionError::InvalidPattern { path, .. } => {
            path.clone()
        }
        _ => "/".to_string(),
    }
}

/// Recursively check a decoded definition for suspicious constructs.
fn check_definition<F>(definition: &Definition, pointer: &str, report: &mut F)
where
    F: FnMut(Severity, &str, String, String),
{
    let mut check_bounds = |low: Option<f64>, high: Option<f64>| {
        if let (Some(low), Some(high)) = (low, high) {
            if low > high {
                report(
                    Severity::Warning,
                    "W002",
                    display_pointer(pointer),
                    format!("min {} is greater than max {}; nothing can match", low, high),
                );
            }
        }
    };

    match &definition.kind {
        DefinitionKind::String(rules) => check_bounds(
            rules.min.map(|n| n as f64),
            rules.max.map(|n| n as f64),
        ),
        DefinitionKind::Number(rules) => check_bounds(rules.min, rules.max),
        DefinitionKind::Array(rules) => {
            check_bounds(rules.min.map(|n| n as f64), rules.max.map(|n| n as f64));
            check_definition(&rules.items, &pointer_child(pointer, "items"), report);
        }
        DefinitionKind::Object(rules) => {
            let shape = pointer_child(pointer, "shape");
            for (key, field) in &rules.shape {
                check_definition(field, &pointer_child(&shape, key), report);
            }
        }
        DefinitionKind::Record(rules) => {
            if let Some(key) = &rules.key {
                check_definition(key, &pointer_child(pointer, "key"), report);
            }
            check_definition(&rules.value, &pointer_child(pointer, "value"), report);
        }
        DefinitionKind::Union(rules) => {
            check_branches("union", "anyOf", &rules.any_of, pointer, report);
        }
        DefinitionKind::Intersection(rules) => {
            check_branches("intersection", "allOf", &rules.all_of, pointer, report);
        }
        DefinitionKind::Boolean | DefinitionKind::Date(_) | DefinitionKind::Enum(_) => {}
    }
}

fn check_branches<F>(kind: &str, field: &str, branches: &[Definition], pointer: &str, report: &mut F)
where
    F: FnMut(Severity, &str, String, String),
{
    let at = pointer_child(pointer, field);
    if branches.len() < 2 {
        report(
            Severity::Warning,
            "W001",
            at.clone(),
            format!("{} has {} branch(es); use the branch directly", kind, branches.len()),
        );
    }
    for (index, branch) in branches.iter().enumerate() {
        check_definition(branch, &pointer_child(&at, &index.to_string()), report);
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_definition_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn lint_str(content: &str) -> FileResult {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        lint_file(file.path(), file.path().parent().unwrap())
    }

    #[test]
    fn lint_valid_definition() {
        let result = lint_str(
            r#"{
            "type": "object",
            "shape": {
                "id": { "type": "string", "min": 1 }
            }
        }"#,
        );
        assert_eq!(result.status, FileStatus::Ok);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn lint_invalid_json_syntax() {
        let result = lint_str("{ not valid json }");
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, "E001");
    }

    #[test]
    fn lint_unknown_type() {
        let result = lint_str(r#"{"type": "tuple"}"#);
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(result.diagnostics[0].code, "E002");
    }

    #[test]
    fn lint_bad_pattern_points_at_node() {
        let result = lint_str(
            r#"{"type": "object", "shape": {"code": {"type": "string", "pattern": "(["}}}"#,
        );
        assert_eq!(result.status, FileStatus::Error);
        let diagnostic = &result.diagnostics[0];
        assert_eq!(diagnostic.code, "E002");
        assert_eq!(diagnostic.path, "/shape/code/pattern");
    }

    #[test]
    fn lint_single_branch_union() {
        let result = lint_str(r#"{"type": "union", "anyOf": [{"type": "string"}]}"#);
        assert_eq!(result.status, FileStatus::Warning);
        assert_eq!(result.diagnostics[0].code, "W001");
        assert_eq!(result.diagnostics[0].path, "/anyOf");
    }

    #[test]
    fn lint_inverted_bounds() {
        let result = lint_str(
            r#"{"type": "array", "items": {"type": "number", "min": 10, "max": 1}}"#,
        );
        assert_eq!(result.status, FileStatus::Warning);
        assert_eq!(result.diagnostics[0].code, "W002");
        assert_eq!(result.diagnostics[0].path, "/items");
    }

    #[test]
    fn lint_directory() {
        let dir = tempdir().unwrap();

        std::fs::write(dir.path().join("valid.json"), r#"{"type": "string"}"#).unwrap();
        std::fs::write(dir.path().join("invalid.json"), "{ not json }").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let result = lint(dir.path(), false);
        assert_eq!(result.files_checked, 2);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 1);
        assert!(!result.is_ok());
    }

    #[test]
    fn lint_strict_mode() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.json");
        // Warning only: single-branch intersection
        std::fs::write(
            &file_path,
            r#"{"type": "intersection", "allOf": [{"type": "string"}]}"#,
        )
        .unwrap();

        // Non-strict: warnings don't cause failure
        let result = lint(&file_path, false);
        assert_eq!(result.files_checked, 1);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 0);

        // Strict: warnings cause failure
        let result = lint(&file_path, true);
        assert_eq!(result.passed, 0);
        assert_eq!(result.failed, 1);
    }
}
