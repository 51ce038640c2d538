//! Run manifest generation.
//!
//! Every run records what it produced: the suite, the parameters it was
//! started with and the files written, stamped with the generation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of the manifest inside the output directory.
pub const MANIFEST_NAME: &str = "manifest";

/// Summary of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Benchmark suite (`micro` or `ssb`).
    pub suite: String,
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
    /// Effective run parameters.
    pub parameters: BTreeMap<String, String>,
    /// Figures written, in order.
    pub figures: Vec<String>,
    /// Table dumps written, in order.
    pub tables: Vec<String>,
    pub duration_seconds: f64,
}

impl RunManifest {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            generated_at: Utc::now(),
            parameters: BTreeMap::new(),
            figures: Vec::new(),
            tables: Vec::new(),
            duration_seconds: 0.0,
        }
    }

    pub fn parameter(mut self, key: &str, value: impl ToString) -> Self {
        self.parameters.insert(key.to_string(), value.to_string());
        self
    }

    /// Sort the written files into figures and table dumps.
    pub fn record_files(&mut self, files: &[PathBuf]) {
        for file in files {
            let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match Path::new(name).extension().and_then(|e| e.to_str()) {
                Some("pdf") => self.figures.push(name.to_string()),
                Some("json") => self.tables.push(name.to_string()),
                _ => {}
            }
        }
    }

    pub fn finish(mut self, duration_seconds: f64) -> Self {
        self.generated_at = Utc::now();
        self.duration_seconds = duration_seconds;
        self
    }
}

/// One-line human summary of a manifest.
pub fn generate_summary(manifest: &RunManifest) -> String {
    let mut summary = format!(
        "{} figure(s) for the {} suite in {:.1}s",
        manifest.figures.len(),
        manifest.suite,
        manifest.duration_seconds
    );
    if !manifest.tables.is_empty() {
        summary.push_str(&format!(", {} table dump(s)", manifest.tables.len()));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_manifest() -> RunManifest {
        let mut manifest = RunManifest::new("ssb")
            .parameter("scale_factor", 100)
            .parameter("processing_style", "vec512");
        manifest.record_files(&[
            PathBuf::from("/out/figure07_ssb_formats.pdf"),
            PathBuf::from("/out/figure07_ssb_formats_legend.pdf"),
            PathBuf::from("/out/runtimes_morphstore.json"),
            PathBuf::from("/out/notes.txt"),
        ]);
        manifest.finish(2.5)
    }

    #[test]
    fn test_record_files() {
        let manifest = create_test_manifest();

        assert_eq!(manifest.figures.len(), 2);
        assert_eq!(manifest.tables, vec!["runtimes_morphstore.json"]);
        assert_eq!(manifest.parameters["scale_factor"], "100");
    }

    #[test]
    fn test_generate_summary() {
        let summary = generate_summary(&create_test_manifest());

        assert!(summary.contains("2 figure(s)"));
        assert!(summary.contains("ssb"));
        assert!(summary.contains("1 table dump(s)"));
    }

    #[test]
    fn test_manifest_json() {
        let json = serde_json::to_string_pretty(&create_test_manifest()).unwrap();

        assert!(json.contains("\"generated_at\""));
        assert!(json.contains("\"figures\""));
        let parsed: RunManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.suite, "ssb");
    }
}
