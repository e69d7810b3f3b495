use std::sync::LazyLock;

use regex::Regex;

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+$").expect("valid blank-line regex"));
static EMPTY_LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+-\s*$").expect("valid list-item regex"));

/// Whether a rendered line is an artifact of a placeholder that expanded to
/// nothing. Zero-length lines are kept as section separators.
pub fn is_residue(line: &str) -> bool {
    BLANK_LINE.is_match(line) || EMPTY_LIST_ITEM.is_match(line)
}

/// Drop residue lines and terminate the text with exactly one newline.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 1);
    for line in text.lines().filter(|l| !is_residue(l)) {
        out.push_str(line);
        out.push('\n');
    }
    if out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{is_residue, sanitize};

    #[test]
    fn drops_whitespace_only_lines() {
        assert_eq!(sanitize("a\n   \n\t\nb\n"), "a\nb\n");
    }

    #[test]
    fn drops_dangling_list_markers() {
        assert_eq!(sanitize("pkgs:\n  - one\n  -\n  -   \n  - two"), "pkgs:\n  - one\n  - two\n");
    }

    #[test]
    fn keeps_empty_separators_and_real_items() {
        assert_eq!(sanitize("a\n\nb\n"), "a\n\nb\n");
        assert!(!is_residue("  - x"));
        assert!(!is_residue("-"));
        assert!(!is_residue("  --"));
    }

    #[test]
    fn ends_with_single_newline() {
        assert_eq!(sanitize("a"), "a\n");
        assert_eq!(sanitize("a\n"), "a\n");
        assert_eq!(sanitize("  \n"), "\n");
    }
}
