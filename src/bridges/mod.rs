pub(crate) mod telegram;

pub(crate) use telegram::*;

use std::path::PathBuf;

use crate::{BotConfig, env_optional, prepare_work_dir, resolve_work_dir};
use self::telegram::run_telegram_bridge;

pub(crate) fn run_bridge(
    token: Option<String>,
    work_dir: Option<PathBuf>,
    tables_per_file: usize,
    poll_timeout: u64,
    poll_limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let token = token
        .or_else(|| env_optional("TELEGRAM_BOT_TOKEN"))
        .ok_or("Missing TELEGRAM_BOT_TOKEN")?;
    let work_dir = resolve_work_dir(work_dir);
    prepare_work_dir(&work_dir)?;
    let config = BotConfig {
        work_dir,
        tables_per_file: tables_per_file.max(1),
        poll_timeout,
        poll_limit,
    };
    run_telegram_bridge(token, config)
}
