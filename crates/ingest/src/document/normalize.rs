use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use mdchunk_core::text::{is_fence_line, is_list_item};

/// Lowercase word ending a sentence, glued to a capitalised word.
static GLUED_SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\p{Ll}{2}[.!?])(\p{Lu}\p{Ll})").expect("Invalid regex"));

/// Unify line endings and repair sentences concatenated without a space.
///
/// Fenced code and indented code outside lists are copied verbatim; tokens
/// that look like URLs, e-mail addresses or inline code are never touched.
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len() + 16);
    let mut in_fence = false;
    // Indented lines belong to the list above them until an unindented line ends it.
    let mut in_list = false;

    for (i, line) in unified.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let indented = line.starts_with("    ") || line.starts_with('\t');
        if !in_fence && !indented && !line.trim().is_empty() {
            in_list = is_list_item(line);
        }
        if is_fence_line(line) {
            in_fence = !in_fence;
            out.push_str(line);
        } else if in_fence || (indented && !in_list) {
            out.push_str(line);
        } else {
            out.push_str(&fix_glued_sentences(line));
        }
    }
    out
}

fn fix_glued_sentences(line: &str) -> Cow<'_, str> {
    if !GLUED_SENTENCE.is_match(line) {
        return Cow::Borrowed(line);
    }
    let fixed: Vec<Cow<'_, str>> = line
        .split(' ')
        .map(|token| {
            if is_opaque_token(token) {
                Cow::Borrowed(token)
            } else {
                GLUED_SENTENCE.replace_all(token, "${1} ${2}")
            }
        })
        .collect();
    Cow::Owned(fixed.join(" "))
}

fn is_opaque_token(token: &str) -> bool {
    token.contains("://")
        || token.starts_with("www.")
        || token.contains('@')
        || token.contains('`')
        || token.contains("](")
}
