#![allow(clippy::module_name_repetitions)]
//! Canonical file paths under the data directory.

use std::path::{Path, PathBuf};

/// Returns the directory holding one seen-state file per instance.
#[must_use]
pub fn seen_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("seen")
}

/// Returns the seen-state file for `instance_id`.
///
/// Bytes outside `[A-Za-z0-9_-]` are written as `%XX`, so every instance
/// maps to its own file directly inside [`seen_dir`].
#[must_use]
pub fn seen_path(data_dir: &Path, instance_id: &str) -> PathBuf {
    seen_dir(data_dir).join(format!("{}.json", encode_file_stem(instance_id)))
}

fn encode_file_stem(instance_id: &str) -> String {
    use std::fmt::Write as _;

    let mut stem = String::with_capacity(instance_id.len());
    for byte in instance_id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-') {
            stem.push(char::from(byte));
        } else {
            let _ = write!(stem, "%{byte:02X}");
        }
    }
    stem
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub async fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !tokio::fs::try_exists(path).await? {
        tokio::fs::create_dir_all(path).await?;
    }
    Ok(())
}
