use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub fn read_text(p: &Path) -> Result<String> {
    fs::read_to_string(p).map_err(|e| Error::io(format!("failed to read {}: {e}", p.display())))
}

pub fn ensure_dir(p: &Path) -> Result<()> {
    fs::create_dir_all(p)
        .map_err(|e| Error::io(format!("failed to create dir {}: {e}", p.display())))
}

/// Write `s` to `p`, replacing any previous file.
pub fn write_text(p: &Path, s: &str) -> Result<()> {
    if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    fs::write(p, s).map_err(|e| Error::io(format!("failed to write {}: {e}", p.display())))
}

pub fn to_json_pretty<T: serde::Serialize>(v: &T) -> Result<String> {
    serde_json::to_string_pretty(v).map_err(|e| Error::io(format!("json encode error: {e}")))
}
