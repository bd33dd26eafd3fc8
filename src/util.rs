use std::env;

pub(crate) fn env_optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Short content hash used to keep same-named uploads from colliding on disk.
pub(crate) fn short_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().chars().take(8).collect()
}

/// Reduce an attacker-controlled attachment name to something safe to join
/// onto the work dir. Path separators, control characters, and leading dots
/// are stripped; the result is capped at 120 characters.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '/' | '\\' | ':' => out.push('_'),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    let trimmed = out.trim().trim_start_matches(['.', '_']);
    let mut cleaned: String = trimmed.chars().take(120).collect();
    if cleaned.is_empty() {
        cleaned = "upload.docx".to_string();
    }
    cleaned
}
