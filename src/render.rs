use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Spans never cross a line terminator (\n, \r, U+2028, U+2029).
    static ref BOLD: Regex = Regex::new(r"\*\*([^\n\r\x{2028}\x{2029}]*?)\*\*").unwrap();
    static ref ITALIC: Regex = Regex::new(r"\*([^\n\r\x{2028}\x{2029}]*?)\*").unwrap();
}

/// Renders the bot's Markdown subset (bold, italic, line breaks) into markup.
///
/// Steps run in a fixed order: escape, bold, italic, line breaks. Bold must run
/// before italic since `*` is a prefix of `**`. Quotes are not escaped, so the
/// output is only safe in element content, never inside an attribute value.
pub fn render_markdown(text: Option<&str>) -> String {
    match text {
        Some(text) if !text.is_empty() => {
            let escaped = escape_html(text);
            let bold = BOLD.replace_all(&escaped, "<strong>$1</strong>");
            let italic = ITALIC.replace_all(&bold, "<em>$1</em>");
            line_breaks(&italic)
        }
        _ => String::new(),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn line_breaks(text: &str) -> String {
    text.replace('\n', "<br>")
}

/// Escapes text for element content and double-quoted attributes.
pub(crate) fn escape_attr(text: &str) -> String {
    escape_html(text).replace('"', "&quot;").replace('\'', "&#39;")
}
