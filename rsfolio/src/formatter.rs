//! Inline markup reconstruction for a single line of fragments.
//!
//! Fragments are concatenated exactly as the extractor delivered them; the
//! only whitespace added is the single space moved outside an emphasis span
//! when the fragment itself began or ended with whitespace.

use crate::config::LayoutConfig;
use crate::models::Fragment;

/// Renders a footnote marker token.
pub fn footnote_marker(number: &str) -> String {
    format!("[^{}]", number)
}

fn wrap_preserving_spaces(text: &str, stripped: &str, delimiter: &str) -> String {
    let prefix = if text.starts_with(char::is_whitespace) { " " } else { "" };
    let suffix = if text.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{}{}{}{}{}", prefix, delimiter, stripped, delimiter, suffix)
}

/// Renders one fragment according to its style.
pub fn format_fragment(fragment: &Fragment, config: &LayoutConfig) -> String {
    let text = fragment.text.as_str();
    let stripped = text.trim();

    if fragment.is_superscript(config.superscript_size) {
        return footnote_marker(stripped);
    }
    if fragment.is_italic() && !fragment.is_bold() {
        if stripped.is_empty() {
            return text.to_string();
        }
        return wrap_preserving_spaces(text, stripped, "*");
    }
    if fragment.is_bold() && !fragment.is_italic() {
        // small bold runs are typesetting noise, not emphasis
        if stripped.is_empty() || fragment.size < config.bold_min_size {
            return text.to_string();
        }
        return wrap_preserving_spaces(text, stripped, "**");
    }
    text.to_string()
}

/// Renders the fragments of one line into a markdown string.
///
/// Fragments set in an ornament font are dropped.
pub fn format_line(fragments: &[Fragment], config: &LayoutConfig) -> String {
    fragments
        .iter()
        .filter(|fragment| !config.is_ornament_font(&fragment.font))
        .map(|fragment| format_fragment(fragment, config))
        .collect()
}
