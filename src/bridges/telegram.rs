use std::fs;
use std::io::Read;
use std::path::Path;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::{Client, multipart};
use serde::Deserialize;
use serde_json;

use crate::{
    BotConfig, ConvertError, RunLogEntry, SessionStore, append_run_jsonl, convert_files,
    log_dir_path, sanitize_file_name, short_hash,
};

const NO_TIMEOUT_MS: u64 = u64::MAX;
const UPLOAD_TIMEOUT_MS: u64 = 120_000;
// The Bot API refuses getFile downloads above 20 MB.
const MAX_DOWNLOAD_BYTES: u64 = 20_000_000;
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const WELCOME: &str = "Welcome to the docx table converter!\n\n\
    Send one or more .docx files. When you are done uploading, use /convert \
    to repackage every table they contain into fresh documents.";
const USAGE_HINT: &str =
    "Send .docx files, then use /convert. Commands: /start, /convert, /status, /cancel.";

#[derive(Debug, Deserialize)]
pub(crate) struct TelegramUpdateResponse {
    pub(crate) ok: bool,
    #[serde(default)]
    pub(crate) result: Vec<TelegramUpdate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TelegramUpdate {
    pub(crate) update_id: i64,
    #[serde(default)]
    pub(crate) message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TelegramMessage {
    pub(crate) chat: TelegramChat,
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default)]
    pub(crate) document: Option<TelegramDocument>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TelegramChat {
    pub(crate) id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TelegramDocument {
    pub(crate) file_id: String,
    #[serde(default)]
    pub(crate) file_name: Option<String>,
    #[serde(default)]
    pub(crate) mime_type: Option<String>,
}

fn telegram_base_url(token: &str) -> String {
    match std::env::var("TELEGRAM_API_BASE") {
        Ok(base) => format!("{base}/bot{token}"),
        Err(_) => format!("https://api.telegram.org/bot{token}"),
    }
}

pub(crate) fn telegram_send_message(
    agent: &ureq::Agent,
    base_url: &str,
    chat_id: i64,
    text: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{base_url}/sendMessage");
    let payload = serde_json::json!({
        "chat_id": chat_id,
        "text": text
    });
    agent
        .post(&url)
        .set("content-type", "application/json")
        .send_json(payload)
        .map_err(|err| format!("Telegram send error: {err}"))?;
    Ok(())
}

pub(crate) fn telegram_download_file_bytes(
    agent: &ureq::Agent,
    base_url: &str,
    file_id: &str,
) -> Option<Vec<u8>> {
    let url = format!("{base_url}/getFile");
    let payload = serde_json::json!({"file_id": file_id});
    let resp = agent
        .post(&url)
        .set("content-type", "application/json")
        .send_json(payload)
        .ok()?;
    let data: serde_json::Value = resp.into_json().ok()?;
    let file_path = data["result"]["file_path"].as_str()?;
    // Build download URL: need token from base_url and correct API base
    let token_part = base_url.split("/bot").last()?;
    let api_base = std::env::var("TELEGRAM_API_BASE")
        .unwrap_or_else(|_| "https://api.telegram.org".to_string());
    let download_url = format!("{api_base}/file/bot{token_part}/{file_path}");
    let dl_resp = agent.get(&download_url).call().ok()?;
    let mut bytes = Vec::new();
    dl_resp
        .into_reader()
        .take(MAX_DOWNLOAD_BYTES)
        .read_to_end(&mut bytes)
        .ok()?;
    if bytes.is_empty() {
        return None;
    }
    Some(bytes)
}

fn telegram_send_document(
    client: &Client,
    base_url: &str,
    chat_id: i64,
    path: &Path,
    file_name: &str,
) -> Result<(), String> {
    let bytes = fs::read(path).map_err(|e| format!("read {} failed: {e}", path.display()))?;
    let form = multipart::Form::new()
        .text("chat_id", chat_id.to_string())
        .part(
            "document",
            multipart::Part::bytes(bytes)
                .file_name(file_name.to_string())
                .mime_str(DOCX_MIME)
                .map_err(|e| format!("document upload prepare error: {e}"))?,
        );

    let response = client
        .post(format!("{base_url}/sendDocument"))
        .multipart(form)
        .send()
        .map_err(|e| format!("sendDocument request error: {e}"))?;

    let result: serde_json::Value = response
        .json()
        .map_err(|e| format!("sendDocument decode error: {e}"))?;

    if result.get("ok").and_then(|v| v.as_bool()) != Some(true) {
        let err = result
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        return Err(format!("sendDocument error: {err}"));
    }

    Ok(())
}

pub(crate) fn chat_artifact_prefix(chat_id: i64) -> String {
    format!("{chat_id}_")
}

/// Remove every file the chat's current run put into the work dir. Inputs
/// and outputs share the `{chat_id}_` prefix, so one sweep covers both,
/// partial outputs included.
fn sweep_chat_artifacts(work_dir: &Path, chat_id: i64) {
    let prefix = chat_artifact_prefix(chat_id);
    if let Ok(entries) = fs::read_dir(work_dir) {
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(&prefix) {
                    let _ = fs::remove_file(entry.path());
                }
            }
        }
    }
}

struct BridgeContext {
    http_agent: ureq::Agent,
    upload_client: Client,
    base_url: String,
    config: BotConfig,
}

fn send(ctx: &BridgeContext, chat_id: i64, text: &str) {
    if let Err(err) = telegram_send_message(&ctx.http_agent, &ctx.base_url, chat_id, text) {
        eprintln!("Telegram send failed: {err}");
    }
}

fn handle_document(
    ctx: &BridgeContext,
    sessions: &mut SessionStore,
    chat_id: i64,
    doc: &TelegramDocument,
) {
    let name = doc.file_name.as_deref().unwrap_or("upload.docx");
    let looks_docx = name.ends_with(".docx") || doc.mime_type.as_deref() == Some(DOCX_MIME);
    if !looks_docx {
        send(ctx, chat_id, "Please send only .docx files.");
        return;
    }

    let Some(bytes) = telegram_download_file_bytes(&ctx.http_agent, &ctx.base_url, &doc.file_id)
    else {
        eprintln!("[bridge] download failed for chat {chat_id}: {name}");
        send(
            ctx,
            chat_id,
            "An error occurred while receiving your file. Please try again.",
        );
        return;
    };

    let stored = format!(
        "{}{}_{}",
        chat_artifact_prefix(chat_id),
        short_hash(&bytes),
        sanitize_file_name(name)
    );
    let path = ctx.config.work_dir.join(stored);
    if let Err(err) = fs::write(&path, &bytes) {
        eprintln!("[bridge] failed to store upload for chat {chat_id}: {err}");
        send(
            ctx,
            chat_id,
            "An error occurred while receiving your file. Please try again.",
        );
        return;
    }

    sessions.push(chat_id, path);
    let count = sessions.file_count(chat_id);
    send(
        ctx,
        chat_id,
        &format!(
            "File received ({count} queued). Send another .docx file or use /convert to process them all."
        ),
    );
}

fn handle_cancel(ctx: &BridgeContext, sessions: &mut SessionStore, chat_id: i64) {
    let files = sessions.take(chat_id);
    if files.is_empty() {
        send(ctx, chat_id, "Nothing queued.");
        return;
    }
    let count = files.len();
    sweep_chat_artifacts(&ctx.config.work_dir, chat_id);
    send(
        ctx,
        chat_id,
        &format!("Cancelled; removed {count} queued file(s)."),
    );
}

fn handle_convert(ctx: &BridgeContext, sessions: &mut SessionStore, chat_id: i64) {
    let inputs = sessions.take(chat_id);
    if inputs.is_empty() {
        send(
            ctx,
            chat_id,
            "You haven't sent any .docx files yet. Send at least one file before using /convert.",
        );
        return;
    }
    send(ctx, chat_id, "Processing your files, this may take a moment.");

    let prefix = chat_artifact_prefix(chat_id);
    let result = convert_files(
        &inputs,
        &ctx.config.work_dir,
        ctx.config.tables_per_file,
        &prefix,
    );

    let mut entry = RunLogEntry {
        ts: Utc::now().to_rfc3339(),
        chat_id,
        files: inputs.len(),
        tables: 0,
        outputs: 0,
        outcome: String::new(),
        detail: None,
    };

    match result {
        Ok(outcome) if outcome.total_tables == 0 => {
            entry.outcome = "empty".to_string();
            send(
                ctx,
                chat_id,
                "No tables were found in the document(s) you sent.",
            );
        }
        Ok(outcome) => {
            entry.tables = outcome.total_tables;
            entry.outputs = outcome.outputs.len();
            send(
                ctx,
                chat_id,
                &format!(
                    "Conversion complete! Found {} table(s). Sending {} file(s)...",
                    outcome.total_tables,
                    outcome.outputs.len()
                ),
            );
            let mut delivered = 0usize;
            for output in &outcome.outputs {
                match telegram_send_document(
                    &ctx.upload_client,
                    &ctx.base_url,
                    chat_id,
                    &output.path,
                    &output.name,
                ) {
                    Ok(()) => delivered += 1,
                    Err(err) => {
                        eprintln!("[bridge] upload failed for chat {chat_id}: {err}");
                        entry.detail = Some(err);
                        break;
                    }
                }
            }
            if delivered == outcome.outputs.len() {
                entry.outcome = "ok".to_string();
            } else {
                entry.outcome = "upload_error".to_string();
                send(ctx, chat_id, "An error occurred while sending the results.");
            }
        }
        Err(ConvertError::Read { file, source }) => {
            eprintln!("[bridge] chat {chat_id}: failed to read {file}: {source}");
            entry.outcome = "read_error".to_string();
            entry.detail = Some(format!("{file}: {source}"));
            send(
                ctx,
                chat_id,
                &format!(
                    "Could not read {file}. Please make sure every upload is a valid .docx file, then send the batch again."
                ),
            );
        }
        Err(err) => {
            eprintln!("[bridge] chat {chat_id}: conversion failed: {err}");
            entry.outcome = "build_error".to_string();
            entry.detail = Some(err.to_string());
            send(
                ctx,
                chat_id,
                "An error occurred during the conversion process.",
            );
        }
    }

    sweep_chat_artifacts(&ctx.config.work_dir, chat_id);

    if let Err(err) = append_run_jsonl(&log_dir_path(&ctx.config.work_dir), &entry) {
        eprintln!("[bridge] failed to append run log: {err}");
    }
}

fn handle_message(ctx: &BridgeContext, sessions: &mut SessionStore, message: &TelegramMessage) {
    let chat_id = message.chat.id;
    if let Some(doc) = &message.document {
        handle_document(ctx, sessions, chat_id, doc);
        return;
    }

    let text = message.text.as_deref().unwrap_or("").trim();
    // Commands may carry a @botname suffix in group chats.
    let command = text.split_whitespace().next().unwrap_or("");
    let command = command.split('@').next().unwrap_or(command);
    match command {
        "/start" => send(ctx, chat_id, WELCOME),
        "/convert" => handle_convert(ctx, sessions, chat_id),
        "/status" => {
            let count = sessions.file_count(chat_id);
            send(ctx, chat_id, &format!("{count} file(s) queued."));
        }
        "/cancel" => handle_cancel(ctx, sessions, chat_id),
        "" => {}
        _ => send(ctx, chat_id, USAGE_HINT),
    }
}

pub(crate) fn run_telegram_bridge(
    token: String,
    config: BotConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let base_url = telegram_base_url(&token);
    let http_agent = ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_millis(NO_TIMEOUT_MS))
        .timeout_write(Duration::from_millis(NO_TIMEOUT_MS))
        .timeout_read(Duration::from_millis(NO_TIMEOUT_MS))
        .build();
    let upload_client = Client::builder()
        .timeout(Duration::from_millis(UPLOAD_TIMEOUT_MS))
        .build()?;
    let ctx = BridgeContext {
        http_agent,
        upload_client,
        base_url,
        config,
    };
    let mut sessions = SessionStore::new();

    eprintln!(
        "[bridge] telegram bridge running, work dir {}",
        ctx.config.work_dir.display()
    );

    let mut offset: Option<i64> = None;
    loop {
        let mut request = ctx
            .http_agent
            .get(&format!("{}/getUpdates", ctx.base_url))
            .query("limit", &ctx.config.poll_limit.to_string())
            .query("timeout", &ctx.config.poll_timeout.to_string());
        if let Some(last) = offset {
            request = request.query("offset", &(last + 1).to_string());
        }

        let response = request.call();
        let payload = match response {
            Ok(resp) => resp.into_json::<TelegramUpdateResponse>(),
            Err(err) => {
                eprintln!("Telegram poll error: {err}");
                thread::sleep(Duration::from_secs(2));
                continue;
            }
        };
        let update = match payload {
            Ok(update) => update,
            Err(err) => {
                eprintln!("Telegram decode error: {err}");
                thread::sleep(Duration::from_secs(2));
                continue;
            }
        };
        if !update.ok {
            eprintln!("Telegram API returned ok=false");
            thread::sleep(Duration::from_secs(2));
            continue;
        }

        for entry in update.result {
            offset = Some(entry.update_id);
            let Some(message) = entry.message else {
                continue;
            };
            handle_message(&ctx, &mut sessions, &message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_update_deserializes() {
        let json = r#"{
            "ok": true,
            "result": [{
                "update_id": 10,
                "message": {
                    "message_id": 5,
                    "chat": {"id": 42, "type": "private"},
                    "from": {"id": 42, "first_name": "A"},
                    "document": {
                        "file_id": "abc123",
                        "file_name": "report.docx",
                        "mime_type": "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                    }
                }
            }]
        }"#;
        let parsed: TelegramUpdateResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.result.len(), 1);
        let message = parsed.result[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, 42);
        let doc = message.document.as_ref().unwrap();
        assert_eq!(doc.file_id, "abc123");
        assert_eq!(doc.file_name.as_deref(), Some("report.docx"));
    }

    #[test]
    fn command_update_deserializes() {
        let json = r#"{
            "ok": true,
            "result": [{
                "update_id": 11,
                "message": {
                    "chat": {"id": -1001234, "type": "group"},
                    "text": "/convert@tablecourier_bot"
                }
            }]
        }"#;
        let parsed: TelegramUpdateResponse = serde_json::from_str(json).unwrap();
        let message = parsed.result[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, -1001234);
        assert_eq!(message.text.as_deref(), Some("/convert@tablecourier_bot"));
        assert!(message.document.is_none());
    }

    #[test]
    fn update_without_message_is_skippable() {
        let json = r#"{"ok": true, "result": [{"update_id": 12}]}"#;
        let parsed: TelegramUpdateResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.result[0].message.is_none());
    }

    #[test]
    fn sweep_removes_only_this_chats_files() {
        let dir = tempfile::tempdir().unwrap();
        let mine_in = dir.path().join("7_aa11bb22_input.docx");
        let mine_out = dir.path().join("7_tables_part_01.docx");
        let other = dir.path().join("8_cc33dd44_input.docx");
        fs::write(&mine_in, b"x").unwrap();
        fs::write(&mine_out, b"x").unwrap();
        fs::write(&other, b"x").unwrap();

        sweep_chat_artifacts(dir.path(), 7);
        assert!(!mine_in.exists());
        assert!(!mine_out.exists());
        assert!(other.exists());
    }

    #[test]
    fn stored_names_match_the_startup_sweep_pattern() {
        let name = format!(
            "{}{}_{}",
            chat_artifact_prefix(-1001234),
            short_hash(b"payload"),
            sanitize_file_name("report.docx")
        );
        assert!(crate::config::is_chat_artifact(&name));
    }
}
