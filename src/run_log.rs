use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One conversion run as recorded for the operator. Users only ever see
/// short status messages; the full detail lands here.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RunLogEntry {
    pub(crate) ts: String,
    pub(crate) chat_id: i64,
    pub(crate) files: usize,
    pub(crate) tables: usize,
    pub(crate) outputs: usize,
    pub(crate) outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) detail: Option<String>,
}

pub(crate) fn log_dir_path(work_dir: &Path) -> PathBuf {
    work_dir.join("logs")
}

pub(crate) fn append_run_jsonl(
    log_dir: &Path,
    entry: &RunLogEntry,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(log_dir)?;
    let date_str = Utc::now().format("%Y-%m-%d");
    let filename = format!("convert-{}.jsonl", date_str);
    let path = log_dir.join(filename);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{}", json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(outcome: &str) -> RunLogEntry {
        RunLogEntry {
            ts: Utc::now().to_rfc3339(),
            chat_id: 42,
            files: 2,
            tables: 5,
            outputs: 1,
            outcome: outcome.to_string(),
            detail: None,
        }
    }

    #[test]
    fn appends_one_line_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = log_dir_path(dir.path());
        append_run_jsonl(&log_dir, &entry("ok")).unwrap();
        append_run_jsonl(&log_dir, &entry("empty")).unwrap();

        let files: Vec<_> = fs::read_dir(&log_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(files.len(), 1);
        let content = fs::read_to_string(files[0].path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: RunLogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.outcome, "ok");
        assert_eq!(first.chat_id, 42);
    }

    #[test]
    fn detail_is_omitted_when_absent() {
        let json = serde_json::to_string(&entry("ok")).unwrap();
        assert!(!json.contains("detail"));
    }
}
