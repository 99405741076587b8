//! Display blocks exchanged between the renderers and output targets

use super::style::StyleRef;
use super::text::{Justify, Text};

/// Column definition of a [`Grid`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Column {
    /// Fixed width in cells
    pub width: Option<usize>,
    /// Share of the remaining width; ratio columns expand
    pub ratio: Option<usize>,
    pub justify: Justify,
    /// Style applied under every cell of the column
    pub style: Option<StyleRef>,
    pub no_wrap: bool,
}

impl Column {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn ratio(mut self, ratio: usize) -> Self {
        self.ratio = Some(ratio);
        self
    }

    #[must_use]
    pub fn justify(mut self, justify: Justify) -> Self {
        self.justify = justify;
        self
    }

    #[must_use]
    pub fn style(mut self, style: impl Into<StyleRef>) -> Self {
        self.style = Some(style.into());
        self
    }

    #[must_use]
    pub fn no_wrap(mut self) -> Self {
        self.no_wrap = true;
        self
    }
}

/// Borderless table used for log rows, source windows and locals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Block>>,
    /// Spaces between adjacent columns
    pub gap: usize,
    /// Spaces before the first and after the last column
    pub edge: usize,
    /// Blank lines above the grid
    pub top: usize,
}

impl Grid {
    pub fn new() -> Self {
        Self {
            gap: 1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_gap(mut self, gap: usize) -> Self {
        self.gap = gap;
        self
    }

    #[must_use]
    pub fn with_edge(mut self, edge: usize) -> Self {
        self.edge = edge;
        self
    }

    #[must_use]
    pub fn with_top(mut self, top: usize) -> Self {
        self.top = top;
        self
    }

    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub fn add_row(&mut self, row: Vec<Block>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Bordered box around a list of blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Panel {
    pub title: Option<Text>,
    pub body: Vec<Block>,
    pub border_style: Option<StyleRef>,
    /// Maximum outer width; the target width applies when unset
    pub width: Option<usize>,
    /// Horizontal padding inside the border
    pub padding: usize,
}

impl Panel {
    pub fn new(body: Vec<Block>) -> Self {
        Self {
            body,
            padding: 1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: Text) -> Self {
        self.title = Some(title);
        self
    }

    #[must_use]
    pub fn with_border_style(mut self, style: impl Into<StyleRef>) -> Self {
        self.border_style = Some(style.into());
        self
    }

    #[must_use]
    pub fn with_width(mut self, width: Option<usize>) -> Self {
        self.width = width;
        self
    }
}

/// One renderable unit of console output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Text(Text),
    Group(Vec<Block>),
    Grid(Grid),
    Panel(Panel),
}

impl Block {
    /// Blocks with nothing to show are dropped from layouts
    pub fn is_empty(&self) -> bool {
        match self {
            Block::Text(_) => false,
            Block::Group(blocks) => blocks.is_empty(),
            Block::Grid(grid) => grid.is_empty(),
            Block::Panel(_) => false,
        }
    }

    /// Best-effort unstyled rendering, used for diagnostics
    pub fn to_plain(&self) -> String {
        let mut out = Vec::new();
        self.collect_plain(&mut out);
        out.join("\n")
    }

    fn collect_plain(&self, out: &mut Vec<String>) {
        match self {
            Block::Text(text) => out.push(text.plain().to_string()),
            Block::Group(blocks) => blocks.iter().for_each(|b| b.collect_plain(out)),
            Block::Grid(grid) => {
                for row in &grid.rows {
                    let cells: Vec<String> = row
                        .iter()
                        .map(Block::to_plain)
                        .filter(|cell| !cell.trim().is_empty())
                        .collect();
                    out.push(cells.join(" "));
                }
            }
            Block::Panel(panel) => {
                if let Some(title) = &panel.title {
                    out.push(title.plain().to_string());
                }
                panel.body.iter().for_each(|b| b.collect_plain(out));
            }
        }
    }
}

impl From<Text> for Block {
    fn from(text: Text) -> Self {
        Block::Text(text)
    }
}

impl From<Grid> for Block {
    fn from(grid: Grid) -> Self {
        Block::Grid(grid)
    }
}

impl From<Panel> for Block {
    fn from(panel: Panel) -> Self {
        Block::Panel(panel)
    }
}

impl From<&str> for Block {
    fn from(plain: &str) -> Self {
        Block::Text(Text::new(plain))
    }
}

/// Plain text of a block list, one block per line
pub fn blocks_to_plain(blocks: &[Block]) -> String {
    blocks.iter().map(Block::to_plain).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_blocks() {
        assert!(Block::Grid(Grid::new()).is_empty());
        assert!(Block::Group(Vec::new()).is_empty());
        assert!(!Block::Text(Text::new("")).is_empty());
    }

    #[test]
    fn test_plain_rendering_of_grid_and_panel() {
        let mut grid = Grid::new();
        grid.add_column(Column::new());
        grid.add_column(Column::new().ratio(1));
        grid.add_row(vec!["INFO".into(), "started".into()]);

        let panel = Panel::new(vec![Block::Grid(grid)]).with_title(Text::new("Traceback"));
        assert_eq!(Block::Panel(panel).to_plain(), "Traceback\nINFO started");
    }
}
