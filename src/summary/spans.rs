//! Minimal scanner for tagged spans in HTML-like markup.
//!
//! Linear-time and allocation-light: it looks for literal opening and
//! closing tags and never backtracks. Anything it cannot make sense of is
//! skipped.

/// Contents of every `<tag ...>...</tag>` span in `markup`, in order.
///
/// The opening tag may carry attributes. A span ends at the first matching
/// closing tag, so nested spans of the same tag are not supported. An
/// opening tag without a closing tag ends the scan.
pub fn tagged_spans<'a>(markup: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(found) = markup[pos..].find(&open) {
        let name_end = pos + found + open.len();

        // `<insert>` is not `<ins>`.
        let boundary = markup[name_end..].chars().next();
        if !matches!(boundary, Some(c) if c == '>' || c.is_ascii_whitespace()) {
            pos = name_end;
            continue;
        }

        let Some(gt) = markup[name_end..].find('>') else {
            break;
        };
        let content_start = name_end + gt + 1;

        let Some(len) = markup[content_start..].find(&close) else {
            break;
        };
        let content_end = content_start + len;

        spans.push(&markup[content_start..content_end]);
        pos = content_end + close.len();
    }

    spans
}

/// Remove every `<...>` tag from `text`.
///
/// A `<` with no later `>` (or an empty `<>`) is kept as literal text.
pub fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let after = &rest[lt + 1..];
        match after.find('>') {
            Some(gt) if gt > 0 => rest = &after[gt + 1..],
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);

    out
}
