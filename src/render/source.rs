//! Source reading and syntax highlighting for traceback frames

use super::style::StyleRef;
use super::text::Text;
use crate::core::error::{LogError, Result};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

/// Language used to highlight a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lexer {
    Rust,
    Python,
    Text,
}

impl Lexer {
    pub fn name(self) -> &'static str {
        match self {
            Lexer::Rust => "rust",
            Lexer::Python => "python",
            Lexer::Text => "text",
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Lexer::Rust => &[
                "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else",
                "enum", "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop",
                "match", "mod", "move", "mut", "pub", "ref", "return", "self", "Self", "static",
                "struct", "super", "trait", "true", "type", "unsafe", "use", "where", "while",
            ],
            Lexer::Python => &[
                "False", "None", "True", "and", "as", "assert", "async", "await", "break",
                "class", "continue", "def", "del", "elif", "else", "except", "finally", "for",
                "from", "global", "if", "import", "in", "is", "lambda", "nonlocal", "not", "or",
                "pass", "raise", "return", "try", "while", "with", "yield",
            ],
            Lexer::Text => &[],
        }
    }

    fn comment_prefix(self) -> Option<&'static str> {
        match self {
            Lexer::Rust => Some("//"),
            Lexer::Python => Some("#"),
            Lexer::Text => None,
        }
    }
}

/// Reads source files and turns them into highlighted lines
pub trait SourceService: Send + Sync {
    fn exists(&self, path: &str) -> bool;

    fn read_code(&self, path: &str) -> Result<Arc<str>>;

    fn guess_lexer(&self, path: &str, code: &str) -> Lexer;

    /// One highlighted [`Text`] per source line
    fn highlight_lines(&self, code: &str, lexer: Lexer) -> Vec<Text>;
}

static STRING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\\n]|\\.)*'"#).ok());
static NUMBER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(?:0x[0-9a-fA-F_]+|\d[\d_]*(?:\.\d+)?)\b").ok());
static WORD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b[A-Za-z_]\w*\b").ok());
static CALL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b([A-Za-z_]\w*)\s*\(").ok());

/// Filesystem-backed source service with a per-instance file cache
#[derive(Debug, Default)]
pub struct FileSourceService {
    cache: Mutex<HashMap<String, Arc<str>>>,
}

impl FileSourceService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files currently cached
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}

impl SourceService for FileSourceService {
    fn exists(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }

    fn read_code(&self, path: &str) -> Result<Arc<str>> {
        if let Some(code) = self.cache.lock().get(path) {
            return Ok(Arc::clone(code));
        }
        let code: Arc<str> = std::fs::read_to_string(path)
            .map_err(|e| LogError::source_unavailable(path, e.to_string()))?
            .into();
        self.cache.lock().insert(path.to_string(), Arc::clone(&code));
        Ok(code)
    }

    fn guess_lexer(&self, path: &str, code: &str) -> Lexer {
        match Path::new(path).extension().and_then(|ext| ext.to_str()) {
            Some("rs") => Lexer::Rust,
            Some("py" | "pyi" | "pyw") => Lexer::Python,
            _ => match code.lines().next() {
                Some(first) if first.starts_with("#!") && first.contains("python") => Lexer::Python,
                _ => Lexer::Text,
            },
        }
    }

    fn highlight_lines(&self, code: &str, lexer: Lexer) -> Vec<Text> {
        code.lines().map(|line| highlight_line(line, lexer)).collect()
    }
}

fn highlight_line(line: &str, lexer: Lexer) -> Text {
    let mut text = Text::styled(line, "pygments.text");
    if lexer == Lexer::Text {
        return text;
    }

    let keywords = lexer.keywords();
    if let Some(word) = WORD.as_ref() {
        for m in word.find_iter(line) {
            if keywords.contains(&m.as_str()) {
                text.stylize("pygments.keyword", m.start(), m.end());
            }
        }
    }
    if let Some(call) = CALL.as_ref() {
        for captures in call.captures_iter(line) {
            if let Some(name) = captures.get(1) {
                if !keywords.contains(&name.as_str()) {
                    text.stylize("pygments.function", name.start(), name.end());
                }
            }
        }
    }
    if let Some(number) = NUMBER.as_ref() {
        text.highlight_regex(number, &StyleRef::from("pygments.number"));
    }
    if let Some(string) = STRING.as_ref() {
        text.highlight_regex(string, &StyleRef::from("pygments.string"));
    }
    if let Some(prefix) = lexer.comment_prefix() {
        if let Some(start) = comment_start(line, prefix) {
            text.stylize("pygments.comment", start, line.len());
        }
    }
    text
}

/// Byte offset of a line comment, ignoring prefixes inside string literals
fn comment_start(line: &str, prefix: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => quote = Some(c),
            None if line[idx..].starts_with(prefix) => return Some(idx),
            None => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_code_caches_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "fn main() {{}}").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let service = FileSourceService::new();
        assert!(service.exists(&path));
        assert_eq!(&*service.read_code(&path).unwrap(), "fn main() {}\n");
        assert_eq!(service.cached(), 1);
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let service = FileSourceService::new();
        assert!(!service.exists("/definitely/not/here.rs"));
        assert!(matches!(
            service.read_code("/definitely/not/here.rs"),
            Err(LogError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_guess_lexer() {
        let service = FileSourceService::new();
        assert_eq!(service.guess_lexer("a.rs", ""), Lexer::Rust);
        assert_eq!(service.guess_lexer("a.py", ""), Lexer::Python);
        assert_eq!(service.guess_lexer("run", "#!/usr/bin/env python3\n"), Lexer::Python);
        assert_eq!(service.guess_lexer("notes.txt", "hello"), Lexer::Text);
    }

    #[test]
    fn test_highlight_marks_keywords_and_comments() {
        let service = FileSourceService::new();
        let lines = service.highlight_lines("let x = 1; // \"note\"", Lexer::Rust);
        let line = &lines[0];
        let styles: Vec<String> = line.spans().iter().map(|s| s.style.to_string()).collect();
        assert!(styles.contains(&"pygments.keyword".to_string()));
        assert!(styles.contains(&"pygments.number".to_string()));
        assert_eq!(line.spans().last().unwrap().style.to_string(), "pygments.comment");
        assert_eq!(comment_start("s = '#'  # real", "#"), Some(9));
    }
}
