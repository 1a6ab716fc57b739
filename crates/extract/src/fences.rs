const FENCE: &str = "```";

/// Remove one enclosing Markdown code fence from model output.
///
/// The opening fence line (including any language tag) is dropped up to the
/// first newline; a trailing fence is only removed when an opening one was.
pub fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    if !text.starts_with(FENCE) {
        return text;
    }

    let body = match text.split_once('\n') {
        Some((_, rest)) => rest,
        None => return "",
    };
    let body = body.strip_suffix(FENCE).unwrap_or(body);
    body.trim()
}
