//! Human-readable summaries of revision comparisons.
//!
//! The comparison service returns a rendered diff as an HTML table. Only the
//! inline change markers matter here:
//! - `<ins ...>text</ins>` for inserted text
//! - `<del ...>text</del>` for removed text
//!
//! [`summarize`] collects the text of both kinds of span and renders a
//! compact fragment, deletions first:
//!
//! ```
//! use changefeed::summarize;
//!
//! let summary = summarize(Some("<del>old</del> and <ins>new</ins>"));
//! assert_eq!(summary.as_deref(), Some("<del>old</del><br><ins>new</ins>"));
//! ```

mod spans;

pub use spans::{strip_tags, tagged_spans};

const INSERT_TAG: &str = "ins";
const DELETE_TAG: &str = "del";
const LINE_BREAK: &str = "<br>";

/// Text fragments of every `tag` span, tags stripped, blanks dropped.
fn fragments(markup: &str, tag: &str) -> Vec<String> {
    tagged_spans(markup, tag)
        .into_iter()
        .map(|span| strip_tags(span).trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}

fn push_wrapped(out: &mut String, tag: &str, parts: &[String]) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    out.push_str(&parts.join(" "));
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

/// Summarize a comparison's markup.
///
/// Returns `None` when the markup is absent or has no inserted or removed
/// text. Never fails: malformed markup just yields fewer matches.
pub fn summarize(markup: Option<&str>) -> Option<String> {
    let markup = markup?;

    let deletions = fragments(markup, DELETE_TAG);
    let insertions = fragments(markup, INSERT_TAG);

    if deletions.is_empty() && insertions.is_empty() {
        return None;
    }

    let mut out = String::new();
    if !deletions.is_empty() {
        push_wrapped(&mut out, DELETE_TAG, &deletions);
    }
    if !insertions.is_empty() {
        if !out.is_empty() {
            out.push_str(LINE_BREAK);
        }
        push_wrapped(&mut out, INSERT_TAG, &insertions);
    }

    Some(out)
}
