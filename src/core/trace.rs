//! Exception-chain model rendered by the traceback renderer

use super::error::{LogError, Result};
use std::error::Error as StdError;
use std::fmt::Write as _;
use std::panic::Location;

/// One call frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub filename: String,
    pub lineno: u32,
    pub name: String,
    /// Rendered local variables as `(name, repr)` pairs
    pub locals: Option<Vec<(String, String)>>,
}

impl Frame {
    pub fn new(filename: impl Into<String>, lineno: u32, name: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            lineno,
            name: name.into(),
            locals: None,
        }
    }

    /// Frame for the caller's location
    #[track_caller]
    pub fn here(name: impl Into<String>) -> Self {
        let location = Location::caller();
        Frame::new(location.file(), location.line(), name)
    }

    #[must_use]
    pub fn with_locals<I, K, V>(mut self, locals: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.locals = Some(
            locals
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Frames whose filename starts with `<` have no backing file
    pub fn is_synthetic(&self) -> bool {
        self.filename.starts_with('<')
    }
}

/// Location details of a syntax error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxErrorDetail {
    pub filename: String,
    pub lineno: u32,
    /// 1-based column of the offending token
    pub offset: usize,
    pub line: String,
    pub msg: String,
}

/// One exception of a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    pub exc_type: String,
    pub exc_value: String,
    pub syntax_error: Option<SyntaxErrorDetail>,
    /// Linked to the adjacent stack as a direct cause rather than as
    /// an error raised while handling it
    pub is_cause: bool,
    /// Oldest call first; `None` when no frame information was captured
    pub frames: Option<Vec<Frame>>,
}

impl Stack {
    pub fn new(exc_type: impl Into<String>, exc_value: impl Into<String>) -> Self {
        Self {
            exc_type: exc_type.into(),
            exc_value: exc_value.into(),
            syntax_error: None,
            is_cause: false,
            frames: Some(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
        self.frames = Some(frames);
        self
    }

    #[must_use]
    pub fn without_frames(mut self) -> Self {
        self.frames = None;
        self
    }

    #[must_use]
    pub fn with_cause(mut self, is_cause: bool) -> Self {
        self.is_cause = is_cause;
        self
    }

    #[must_use]
    pub fn with_syntax_error(mut self, detail: SyntaxErrorDetail) -> Self {
        self.syntax_error = Some(detail);
        self
    }

    pub fn frames(&self) -> &[Frame] {
        self.frames.as_deref().unwrap_or(&[])
    }

    /// `"type: value"`, or only the type when the value is empty
    pub fn summary(&self) -> String {
        match &self.syntax_error {
            Some(detail) => format!("{}: {}", self.exc_type, detail.msg),
            None if self.exc_value.is_empty() => self.exc_type.clone(),
            None => format!("{}: {}", self.exc_type, self.exc_value),
        }
    }
}

/// Exception chain in raise order, newest last
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    pub stacks: Vec<Stack>,
}

impl Trace {
    pub fn new(stacks: Vec<Stack>) -> Self {
        Self { stacks }
    }

    /// Build a chain from an error and its `source()` chain
    ///
    /// The deepest source becomes the first stack. Every stack that has a
    /// source is marked as caused by it. No frames are captured.
    pub fn from_error(error: &(dyn StdError + 'static)) -> Self {
        let mut chain: Vec<&(dyn StdError + 'static)> = vec![error];
        let mut current = error;
        while let Some(source) = current.source() {
            chain.push(source);
            current = source;
        }

        let last = chain.len() - 1;
        let stacks = chain
            .iter()
            .enumerate()
            .rev()
            .map(|(idx, err)| {
                Stack::new(error_type_name(*err), err.to_string()).with_cause(idx < last)
            })
            .collect();
        Trace { stacks }
    }

    /// Build a chain from a typed error, naming the outermost stack after `E`
    pub fn from_typed<E: StdError + 'static>(error: &E) -> Self {
        let mut trace = Trace::from_error(error);
        if let Some(stack) = trace.stacks.last_mut() {
            stack.exc_type = short_type_name::<E>();
        }
        trace
    }

    #[must_use]
    pub fn with_stack(mut self, stack: Stack) -> Self {
        self.stacks.push(stack);
        self
    }

    /// Check the chain is renderable
    pub fn validate(&self) -> Result<()> {
        if self.stacks.is_empty() {
            return Err(LogError::malformed_trace("exception chain is empty"));
        }
        let newest = self.stacks.len() - 1;
        for (idx, stack) in self.stacks.iter().enumerate() {
            match &stack.frames {
                None if idx != newest => {
                    return Err(LogError::malformed_trace(format!(
                        "stack {} ({}) has no frame list",
                        idx, stack.exc_type
                    )));
                }
                None => {}
                Some(frames) => {
                    if let Some(frame) = frames.iter().find(|f| f.lineno == 0 && !f.is_synthetic())
                    {
                        return Err(LogError::malformed_trace(format!(
                            "frame '{}' in {} has no line number",
                            frame.name, frame.filename
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Plain-text traceback, oldest exception first
    pub fn format_plain(&self) -> String {
        let mut out = String::new();
        for (idx, stack) in self.stacks.iter().enumerate() {
            if idx > 0 {
                let link = if self.stacks[idx].is_cause {
                    "The above exception was the direct cause of the following exception:"
                } else {
                    "During handling of the above exception, another exception occurred:"
                };
                let _ = write!(out, "\n{}\n\n", link);
            }
            let frames = stack.frames();
            if !frames.is_empty() {
                out.push_str("Traceback (most recent call last):\n");
                for frame in frames {
                    let _ = writeln!(
                        out,
                        "  File \"{}\", line {}, in {}",
                        frame.filename, frame.lineno, frame.name
                    );
                }
            }
            if let Some(detail) = &stack.syntax_error {
                let _ = writeln!(out, "  File \"{}\", line {}", detail.filename, detail.lineno);
                let _ = writeln!(out, "    {}", detail.line.trim_end());
                let _ = writeln!(out, "    {}^", " ".repeat(detail.offset.saturating_sub(1)));
            }
            out.push_str(&stack.summary());
            out.push('\n');
        }
        if out.ends_with('\n') {
            out.pop();
        }
        out
    }
}

fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Best guess at a type name for a type-erased error, from its `Debug` output
fn error_type_name(error: &dyn StdError) -> String {
    let debug = format!("{:?}", error);
    let ident: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if ident.is_empty() || !ident.starts_with(|c: char| c.is_ascii_uppercase()) {
        "Error".to_string()
    } else {
        ident
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct RootCause;

    impl fmt::Display for RootCause {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "disk full")
        }
    }

    impl StdError for RootCause {}

    #[derive(Debug)]
    struct SaveFailed {
        source: RootCause,
    }

    impl fmt::Display for SaveFailed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "could not save")
        }
    }

    impl StdError for SaveFailed {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.source)
        }
    }

    #[test]
    fn test_from_error_builds_raise_order() {
        let err = SaveFailed { source: RootCause };
        let trace = Trace::from_typed(&err);

        assert_eq!(trace.stacks.len(), 2);
        assert_eq!(trace.stacks[0].exc_type, "RootCause");
        assert_eq!(trace.stacks[0].exc_value, "disk full");
        assert!(!trace.stacks[0].is_cause);
        assert_eq!(trace.stacks[1].exc_type, "SaveFailed");
        assert!(trace.stacks[1].is_cause);
        assert!(trace.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_frames_on_older_stack() {
        let trace = Trace::new(vec![
            Stack::new("KeyError", "'a'").without_frames(),
            Stack::new("ValueError", "bad"),
        ]);
        assert!(matches!(trace.validate(), Err(LogError::MalformedTrace { .. })));

        let trace = Trace::new(vec![
            Stack::new("KeyError", "'a'"),
            Stack::new("ValueError", "bad").without_frames(),
        ]);
        assert!(trace.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_line_on_real_file() {
        let trace = Trace::new(vec![
            Stack::new("E", "x").with_frames(vec![Frame::new("src/main.rs", 0, "main")])
        ]);
        assert!(trace.validate().is_err());

        let trace = Trace::new(vec![
            Stack::new("E", "x").with_frames(vec![Frame::new("<stdin>", 0, "main")])
        ]);
        assert!(trace.validate().is_ok());
        assert!(Trace::default().validate().is_err());
    }

    #[test]
    fn test_format_plain() {
        let trace = Trace::new(vec![Stack::new("ValueError", "bad input")
            .with_frames(vec![Frame::new("app.rs", 12, "run")])]);
        assert_eq!(
            trace.format_plain(),
            "Traceback (most recent call last):\n  File \"app.rs\", line 12, in run\nValueError: bad input"
        );
    }

    #[test]
    fn test_frame_here_captures_location() {
        let frame = Frame::here("test");
        assert_eq!(frame.filename, file!());
        assert!(frame.lineno > 0);
    }
}
