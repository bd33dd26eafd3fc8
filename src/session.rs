use std::collections::HashMap;
use std::path::PathBuf;

/// Per-chat accumulation of downloaded file paths, in upload order.
///
/// Owned by the bridge loop and passed into each handler; cleared by
/// `take` when a convert trigger drains it. There is no cross-chat
/// sharing: a chat's list is only touched while handling that chat's
/// own updates.
#[derive(Default)]
pub(crate) struct SessionStore {
    files: HashMap<i64, Vec<PathBuf>>,
}

impl SessionStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, chat_id: i64, path: PathBuf) {
        self.files.entry(chat_id).or_default().push(path);
    }

    pub(crate) fn file_count(&self, chat_id: i64) -> usize {
        self.files.get(&chat_id).map(Vec::len).unwrap_or(0)
    }

    /// Remove and return the chat's queued files. The session is empty
    /// afterwards regardless of what the caller does with the list.
    pub(crate) fn take(&mut self, chat_id: i64) -> Vec<PathBuf> {
        self.files.remove(&chat_id).unwrap_or_default()
    }
}
