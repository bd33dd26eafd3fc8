use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::util::env_optional;

pub(crate) const DEFAULT_WORK_DIR: &str = "./downloads";

/// Resolved bridge settings. The work dir holds downloaded inputs,
/// generated outputs, and the run log, and is exclusively owned by this
/// process.
pub(crate) struct BotConfig {
    pub(crate) work_dir: PathBuf,
    pub(crate) tables_per_file: usize,
    pub(crate) poll_timeout: u64,
    pub(crate) poll_limit: usize,
}

pub(crate) fn resolve_work_dir(cli_dir: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_dir {
        return path;
    }
    if let Some(value) = env_optional("TABLECOURIER_WORK_DIR") {
        return PathBuf::from(value);
    }
    PathBuf::from(DEFAULT_WORK_DIR)
}

/// Every per-chat artifact (downloaded input or generated output) is named
/// `{chat_id}_...`. A file matching that shape at startup was left behind
/// by a crashed run.
pub(crate) fn is_chat_artifact(name: &str) -> bool {
    let rest = name.strip_prefix('-').unwrap_or(name);
    match rest.find('_') {
        Some(pos) if pos > 0 => rest[..pos].bytes().all(|b| b.is_ascii_digit()),
        _ => false,
    }
}

/// Create the work dir and sweep orphaned chat artifacts from a previous
/// crash. The logs subdirectory is untouched.
pub(crate) fn prepare_work_dir(work_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(work_dir)?;
    for entry in fs::read_dir(work_dir)?.flatten() {
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_chat_artifact(name) {
                let _ = fs::remove_file(entry.path());
                eprintln!("[bridge] cleaned up orphaned file: {name}");
            }
        }
    }
    Ok(())
}
