//! Attribution header comments for production output.

/// Comment syntax for a given output kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    Html,
    Block,
}

/// Prepend `text` as a comment to `content`.
///
/// Empty attribution text leaves the content untouched.
pub fn prepend(style: CommentStyle, text: &str, content: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return content.to_string();
    }

    match style {
        CommentStyle::Html => format!("<!--\n  {}\n-->\n{}", text, content),
        CommentStyle::Block => format!("/*\n  {}\n*/\n{}", text.replace("*/", "* /"), content),
    }
}
