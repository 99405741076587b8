//! Styled text, display blocks and the renderers that produce them

pub mod block;
pub mod highlighter;
pub mod layout;
pub mod source;
pub mod style;
pub mod text;
pub mod traceback;

pub use block::{blocks_to_plain, Block, Column, Grid, Panel};
pub use highlighter::{Highlighter, NullHighlighter, ReprHighlighter};
pub use layout::{LayoutInput, LayoutRenderer};
pub use source::{FileSourceService, Lexer, SourceService};
pub use style::{Style, StyleRef, Theme};
pub use text::{cell_width, escape_markup, Justify, Span, Text};
pub use traceback::TracebackRenderer;
