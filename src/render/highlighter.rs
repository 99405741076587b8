//! Highlighters that add emphasis spans to plain text

use super::style::StyleRef;
use super::text::Text;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Converts plain text into emphasised text
pub trait Highlighter: Send + Sync {
    fn highlight(&self, text: Text) -> Text;

    /// Build highlighted text from a plain string
    fn apply(&self, plain: &str) -> Text {
        self.highlight(Text::new(plain))
    }
}

impl fmt::Debug for dyn Highlighter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<highlighter>")
    }
}

/// Leaves text untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHighlighter;

impl Highlighter for NullHighlighter {
    fn highlight(&self, text: Text) -> Text {
        text
    }
}

static REPR_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"[\[\](){}]", "repr.brace"),
        (r#"(?:b?'[^'\n]*'|b?"[^"\n]*")"#, "repr.str"),
        (r"\b(?:True|true)\b", "repr.bool_true"),
        (r"\b(?:False|false)\b", "repr.bool_false"),
        (r"\b(?:None|null)\b", "repr.none"),
        (r"\.\.\.", "repr.ellipsis"),
        (r"(?:^|[\s=(\[,])(/[-\w./+]+)", "repr.path"),
        (
            r"(?:^|[^\w.])(-?\d+(?:\.\d+)?(?:e[-+]?\d+)?|0x[0-9a-fA-F]+)\b",
            "repr.number",
        ),
        (r"(?:https?|file|wss?)://[-0-9a-zA-Z$_+!`(),.?/;:&=%#~@]*", "repr.url"),
    ]
    .into_iter()
    .filter_map(|(pattern, style)| Regex::new(pattern).ok().map(|re| (re, style)))
    .collect()
});

/// Highlights numbers, strings, booleans, `None`, braces, paths and URLs
///
/// Patterns with a capture group style only the group, so the number in
/// `x=10` does not swallow the `=`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReprHighlighter;

impl Highlighter for ReprHighlighter {
    fn highlight(&self, mut text: Text) -> Text {
        let plain = text.plain().to_string();
        for (pattern, style) in REPR_PATTERNS.iter() {
            for captures in pattern.captures_iter(&plain) {
                let found = captures.get(1).or_else(|| captures.get(0));
                if let Some(m) = found {
                    text.stylize(StyleRef::from(*style), m.start(), m.end());
                }
            }
        }
        text
    }
}
