use crate::error::{ProfilerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::Value;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Format used for the `metadata.timestamp` field
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Snapshot of a registry at export time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub functions: Vec<FunctionReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub total_time: f64,
    pub program_name: String,
    pub timestamp: String,
}

/// Per-timer statistics, in registry insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionReport {
    pub name: String,
    pub exec_time: f64,
    pub call_count: u64,
    pub avg_time: f64,
}

impl Report {
    /// Serialize the report as pretty-printed JSON with a trailing newline
    pub fn render(&self) -> Result<String> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, ReportFormatter::new());
        self.serialize(&mut serializer)
            .map_err(ProfilerError::Serialization)?;
        buf.push(b'\n');
        String::from_utf8(buf)
            .map_err(|e| ProfilerError::InvalidReport(format!("report is not UTF-8: {e}")))
    }

    /// Commit the rendered report to `path`.
    ///
    /// Content goes to a temporary file in the destination directory which is
    /// renamed over `path` only once fully written. On any failure the
    /// temporary file is removed and an existing report at `path` is untouched.
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        let io_err = |source: std::io::Error| ProfilerError::IoError {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let rendered = self.render()?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(rendered.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    /// Parse and validate a report from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| ProfilerError::InvalidReport(format!("not valid JSON: {e}")))?;
        validate_structure(&value)?;

        let report: Report = serde_json::from_value(value)
            .map_err(|e| ProfilerError::InvalidReport(e.to_string()))?;
        report.validate()?;
        Ok(report)
    }

    /// Load and validate a report file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ProfilerError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Check value-level constraints that the JSON shape cannot express
    pub fn validate(&self) -> Result<()> {
        if !self.metadata.total_time.is_finite() || self.metadata.total_time < 0.0 {
            return Err(ProfilerError::InvalidReport(format!(
                "total_time must be a non-negative number, got {}",
                self.metadata.total_time
            )));
        }

        for function in &self.functions {
            if function.call_count == 0 {
                return Err(ProfilerError::InvalidReport(format!(
                    "function {:?} has call_count 0",
                    function.name
                )));
            }
            if function.exec_time < 0.0 || function.avg_time < 0.0 {
                return Err(ProfilerError::InvalidReport(format!(
                    "function {:?} has a negative time",
                    function.name
                )));
            }
        }

        Ok(())
    }

    /// Functions ordered by accumulated time, slowest first
    pub fn slowest(&self, limit: usize) -> Vec<&FunctionReport> {
        let mut functions: Vec<&FunctionReport> = self.functions.iter().collect();
        functions.sort_by(|a, b| b.exec_time.total_cmp(&a.exec_time));
        functions.truncate(limit);
        functions
    }

    /// Human-readable table of the slowest functions
    pub fn summary(&self, limit: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "📊 {} @ {} - {} functions, {:.6}s total",
            self.metadata.program_name,
            self.metadata.timestamp,
            self.functions.len(),
            self.metadata.total_time
        );

        let width = self
            .functions
            .iter()
            .map(|f| f.name.chars().count())
            .max()
            .unwrap_or(0)
            .max(8);

        let _ = writeln!(
            out,
            "{:<width$}  {:>8}  {:>12}  {:>12}  {:>7}",
            "function", "calls", "total (s)", "avg (s)", "share"
        );
        for function in self.slowest(limit) {
            let share = if self.metadata.total_time > 0.0 {
                function.exec_time / self.metadata.total_time * 100.0
            } else {
                0.0
            };
            let _ = writeln!(
                out,
                "{:<width$}  {:>8}  {:>12.6}  {:>12.6}  {:>6.1}%",
                function.name, function.call_count, function.exec_time, function.avg_time, share
            );
        }
        out
    }
}

/// Required keys, checked before typed deserialization for clearer errors
fn validate_structure(value: &Value) -> Result<()> {
    let invalid = |msg: &str| Err(ProfilerError::InvalidReport(msg.to_string()));

    let (Some(metadata), Some(functions)) = (value.get("metadata"), value.get("functions")) else {
        return invalid("missing metadata or functions");
    };

    for key in ["total_time", "program_name", "timestamp"] {
        if metadata.get(key).is_none() {
            return Err(ProfilerError::InvalidReport(format!(
                "metadata is missing {key}"
            )));
        }
    }

    let Some(functions) = functions.as_array() else {
        return invalid("functions is not a list");
    };

    for (i, function) in functions.iter().enumerate() {
        for key in ["name", "exec_time", "call_count", "avg_time"] {
            if function.get(key).is_none() {
                return Err(ProfilerError::InvalidReport(format!(
                    "function #{i} is missing {key}"
                )));
            }
        }
    }

    Ok(())
}

/// Pretty JSON formatter that escapes `/` and writes floats with six
/// fractional digits, matching the report layout consumers expect
pub struct ReportFormatter {
    inner: PrettyFormatter<'static>,
}

impl ReportFormatter {
    pub fn new() -> Self {
        Self {
            inner: PrettyFormatter::new(),
        }
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for ReportFormatter {
    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        write!(writer, "{value:.6}")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut parts = fragment.split('/');
        if let Some(first) = parts.next() {
            writer.write_all(first.as_bytes())?;
        }
        for part in parts {
            writer.write_all(b"\\/")?;
            writer.write_all(part.as_bytes())?;
        }
        Ok(())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}

/// Report file name for a program, e.g. `profiler_data_myprog.json`.
///
/// The program name is reduced to a single path component: separators and
/// control characters become `_`.
pub fn report_file_name(prefix: &str, program_name: &str) -> String {
    let mut stem: String = program_name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    if stem.is_empty() {
        stem.push_str("unnamed");
    }
    format!("{prefix}{stem}.json")
}

/// Full destination path for a program's report
pub fn report_path(output_dir: &Path, prefix: &str, program_name: &str) -> PathBuf {
    output_dir.join(report_file_name(prefix, program_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Report {
        Report {
            metadata: ReportMetadata {
                total_time: 4.5,
                program_name: "bench/run".to_string(),
                timestamp: "2026-10-18 12:00:00".to_string(),
            },
            functions: vec![
                FunctionReport {
                    name: "a".to_string(),
                    exec_time: 1.5,
                    call_count: 1,
                    avg_time: 1.5,
                },
                FunctionReport {
                    name: "b".to_string(),
                    exec_time: 3.0,
                    call_count: 2,
                    avg_time: 1.5,
                },
            ],
        }
    }

    #[test]
    fn render_escapes_structural_and_control_characters() {
        let mut report = sample();
        report.metadata.program_name = "a/b".to_string();
        report.functions[0].name = "q\"\\/\n\t\r\u{08}\u{0C}\u{01}".to_string();

        let rendered = report.render().unwrap();
        assert!(rendered.contains(r#""program_name": "a\/b""#));
        assert!(rendered.contains(r#""name": "q\"\\\/\n\t\r\b\f\u0001""#));
        assert_eq!(Report::from_json(&rendered).unwrap(), report);
    }

    #[test]
    fn slashes_inside_longer_fragments_are_all_escaped() {
        let mut report = sample();
        report.functions[1].name = "/mod/sub/fn/".to_string();
        let rendered = report.render().unwrap();
        assert!(rendered.contains(r#""name": "\/mod\/sub\/fn\/""#));
    }

    #[test]
    fn render_uses_fixed_precision_and_no_trailing_comma() {
        let rendered = sample().render().unwrap();
        assert!(rendered.contains("\"total_time\": 4.500000,"));
        assert!(rendered.contains("\"program_name\": \"bench\\/run\","));
        assert!(rendered.contains("\"call_count\": 2,"));
        assert!(rendered.ends_with("\"avg_time\": 1.500000\n    }\n  ]\n}\n"));
    }

    #[test]
    fn render_with_no_functions_is_valid_json() {
        let mut report = sample();
        report.functions.clear();
        let parsed = Report::from_json(&report.render().unwrap()).unwrap();
        assert!(parsed.functions.is_empty());
    }

    #[test]
    fn rendered_report_parses_back() {
        let report = sample();
        assert_eq!(Report::from_json(&report.render().unwrap()).unwrap(), report);
    }

    #[test]
    fn structure_validation_names_the_missing_key() {
        let err = Report::from_json(r#"{"metadata": {"total_time": 1.0}, "functions": []}"#)
            .unwrap_err();
        assert!(err.to_string().contains("program_name"));

        let err = Report::from_json(
            r#"{"metadata": {"total_time": 1.0, "program_name": "p", "timestamp": "t"},
                "functions": [{"name": "f", "exec_time": 1.0, "call_count": 1}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("avg_time"));

        let err = Report::from_json(
            r#"{"metadata": {"total_time": 1.0, "program_name": "p", "timestamp": "t"},
                "functions": {}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProfilerError::InvalidReport(_)));
    }

    #[test]
    fn value_validation_rejects_zero_calls() {
        let mut report = sample();
        report.functions[0].call_count = 0;
        assert!(matches!(
            report.validate(),
            Err(ProfilerError::InvalidReport(_))
        ));
    }

    #[test]
    fn slowest_orders_by_exec_time() {
        let report = sample();
        let names: Vec<&str> = report.slowest(5).iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(report.slowest(1).len(), 1);
    }

    #[test]
    fn file_name_is_a_single_component() {
        assert_eq!(
            report_file_name("profiler_data_", "app"),
            "profiler_data_app.json"
        );
        assert_eq!(
            report_file_name("profiler_data_", "../etc/x"),
            "profiler_data_.._etc_x.json"
        );
        assert_eq!(
            report_file_name("profiler_data_", ""),
            "profiler_data_unnamed.json"
        );
    }

    #[test]
    fn write_atomic_replaces_existing_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiler_data_app.json");
        fs::write(&path, "old").unwrap();

        sample().write_atomic(&path).unwrap();

        assert_eq!(Report::load(&path).unwrap(), sample());
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn write_atomic_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        let err = sample().write_atomic(&path).unwrap_err();
        assert!(matches!(err, ProfilerError::IoError { .. }));
        assert!(!path.exists());
    }
}
