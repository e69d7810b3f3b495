//! Template substitution.
//!
//! Inline placeholders are replaced wherever they occur. Block placeholders
//! stand alone on a line and expand into zero or more lines that reuse the
//! placeholder's indentation.

use std::sync::LazyLock;

use regex::Regex;

use crate::facts::FactBundle;

static LEFTOVER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__[A-Z0-9][A-Z0-9_]*__").expect("valid placeholder regex"));

/// Inline placeholders paired with their values.
pub fn inline_substitutions(facts: &FactBundle) -> [(&'static str, &str); 11] {
    [
        ("__RELEASE__", facts.target.release.as_str()),
        ("__ARCH__", facts.arch.as_str()),
        ("__LINUX_IMAGE__", facts.linux_image.as_str()),
        ("__DTB__", facts.dtb.as_str()),
        ("__SECURITY_SUITE__", facts.security_suite.as_str()),
        ("__SYSTEMD_TIMESYNCD__", facts.systemd_timesyncd.as_str()),
        ("__RASPI_FIRMWARE__", facts.raspi_firmware.as_str()),
        ("__WIRELESS_FIRMWARE__", facts.wireless_firmware.as_str()),
        ("__SERIAL_CONSOLE__", facts.serial_console.as_str()),
        ("__HOST__", facts.hostname.as_str()),
        ("__TOUCH_MACHINE_ID__", facts.touch_machine_id.as_str()),
    ]
}

/// Block placeholders paired with their lines, in the order they are applied.
pub fn block_substitutions(facts: &FactBundle) -> [(&'static str, &[String]); 4] {
    [
        ("__FIX_FIRMWARE_PKG_NAME__", facts.fix_firmware_cmds.as_slice()),
        ("__EXTRA_ROOT_SHELL_CMDS__", facts.extra_root_shell_cmds.as_slice()),
        ("__EXTRA_CHROOT_SHELL_CMDS__", facts.extra_chroot_shell_cmds.as_slice()),
        ("__BACKPORTS__", facts.backports_stanza.as_slice()),
    ]
}

/// Substitute every placeholder. The result still needs
/// [`crate::sanitize::sanitize`] to drop lines left empty by the expansion.
pub fn render(template: &str, facts: &FactBundle) -> String {
    let mut out = template.to_string();
    for (placeholder, value) in inline_substitutions(facts) {
        if out.contains(placeholder) {
            out = out.replace(placeholder, value);
        } else {
            tracing::debug!(placeholder, "inline placeholder not used by template");
        }
    }
    for (placeholder, lines) in block_substitutions(facts) {
        out = align_replace(&out, placeholder, lines);
    }
    out
}

/// Replace the first line consisting only of `placeholder` (plus leading
/// whitespace) with `replacement`, each line prefixed by that whitespace.
///
/// Text without a matching line is returned unchanged.
pub fn align_replace<S: AsRef<str>>(text: &str, placeholder: &str, replacement: &[S]) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let Some(idx) = lines
        .iter()
        .position(|line| line.trim_start() == placeholder)
    else {
        tracing::debug!(placeholder, "block placeholder not found");
        return text.to_string();
    };

    let line = lines[idx];
    let indent = &line[..line.len() - line.trim_start().len()];
    tracing::debug!(
        placeholder,
        line = idx + 1,
        inserted = replacement.len(),
        "expanding block placeholder"
    );

    let mut out = String::with_capacity(text.len());
    for l in &lines[..idx] {
        out.push_str(l);
        out.push('\n');
    }
    for r in replacement {
        out.push_str(indent);
        out.push_str(r.as_ref());
        out.push('\n');
    }
    for l in &lines[idx + 1..] {
        out.push_str(l);
        out.push('\n');
    }
    out
}

/// Placeholder-shaped tokens still present in `text`, in order of appearance.
pub fn leftover_tokens(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in LEFTOVER_TOKEN.find_iter(text) {
        if !out.iter().any(|t| t == m.as_str()) {
            out.push(m.as_str().to_string());
        }
    }
    out
}
