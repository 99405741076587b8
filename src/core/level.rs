//! Severity levels: the level table, lookup and heterogeneous comparison

use super::error::{LogError, Result};
use crate::render::style::{palette, Style};
use crate::render::text::cell_width;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// One severity classification
///
/// Equality between two levels requires matching rank, icon and style, so
/// `SUCCESS` and `WARNING` compare unequal even though they share rank 30.
/// Ordering only ever looks at the rank, see [`Level::compare`].
#[derive(Debug, Clone)]
pub struct Level {
    name: Cow<'static, str>,
    rank: u32,
    icon: Cow<'static, str>,
    style: Style,
}

impl Level {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        rank: u32,
        icon: impl Into<Cow<'static, str>>,
        style: Style,
    ) -> Self {
        Self {
            name: name.into(),
            rank,
            icon: icon.into(),
            style,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Theme key for this level, e.g. `logging.level.warning`
    pub fn style_name(&self) -> String {
        format!("logging.level.{}", self.name.to_lowercase())
    }

    /// Resolve `key` against the standard table
    pub fn lookup<'a>(key: impl Into<LevelKey<'a>>) -> Result<Level> {
        LevelTable::standard().lookup(key)
    }

    /// Order by rank; names cannot be ordered
    pub fn compare<'a>(&self, other: impl Into<LevelOperand<'a>>) -> Result<Ordering> {
        match other.into() {
            LevelOperand::Level(level) => Ok(self.rank.cmp(&level.rank)),
            LevelOperand::Rank(rank) => Ok(self.rank.cmp(&rank)),
            LevelOperand::Name(name) => {
                Err(LogError::type_mismatch("<", "Level", format!("str '{}'", name)))
            }
        }
    }

    /// Equality against a level, a rank or a name
    pub fn equals<'a>(&self, other: impl Into<LevelOperand<'a>>) -> bool {
        match other.into() {
            LevelOperand::Level(level) => self == level,
            LevelOperand::Rank(rank) => self.rank == rank,
            LevelOperand::Name(name) => self.matches_name(name),
        }
    }

    fn matches_name(&self, name: &str) -> bool {
        name == self.name || name == self.name.to_lowercase() || name == self.name.to_uppercase()
    }

    /// Whether a record at this level passes a `threshold`
    pub fn is_enabled_for(&self, threshold: &Level) -> bool {
        self.rank >= threshold.rank
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank && self.icon == other.icon && self.style == other.style
    }
}

impl Eq for Level {}

impl PartialEq<u32> for Level {
    fn eq(&self, other: &u32) -> bool {
        self.rank == *other
    }
}

impl PartialEq<str> for Level {
    fn eq(&self, other: &str) -> bool {
        self.matches_name(other)
    }
}

impl PartialEq<&str> for Level {
    fn eq(&self, other: &&str) -> bool {
        self.matches_name(other)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        Level::lookup(s)
    }
}

/// Right-hand side of a level comparison
#[derive(Debug, Clone, Copy)]
pub enum LevelOperand<'a> {
    Level(&'a Level),
    Rank(u32),
    Name(&'a str),
}

impl<'a> From<&'a Level> for LevelOperand<'a> {
    fn from(level: &'a Level) -> Self {
        LevelOperand::Level(level)
    }
}

impl From<u32> for LevelOperand<'_> {
    fn from(rank: u32) -> Self {
        LevelOperand::Rank(rank)
    }
}

impl<'a> From<&'a str> for LevelOperand<'a> {
    fn from(name: &'a str) -> Self {
        LevelOperand::Name(name)
    }
}

/// Any form a level can be looked up by
#[derive(Debug, Clone)]
pub enum LevelKey<'a> {
    Name(Cow<'a, str>),
    Rank(i64),
    Level(Level),
}

impl<'a> From<&'a str> for LevelKey<'a> {
    fn from(name: &'a str) -> Self {
        LevelKey::Name(Cow::Borrowed(name))
    }
}

impl From<String> for LevelKey<'_> {
    fn from(name: String) -> Self {
        LevelKey::Name(Cow::Owned(name))
    }
}

impl From<u32> for LevelKey<'_> {
    fn from(rank: u32) -> Self {
        LevelKey::Rank(i64::from(rank))
    }
}

impl From<i32> for LevelKey<'_> {
    fn from(rank: i32) -> Self {
        LevelKey::Rank(i64::from(rank))
    }
}

impl From<Level> for LevelKey<'_> {
    fn from(level: Level) -> Self {
        LevelKey::Level(level)
    }
}

impl From<&Level> for LevelKey<'_> {
    fn from(level: &Level) -> Self {
        LevelKey::Level(level.clone())
    }
}

impl fmt::Display for LevelKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelKey::Name(name) => write!(f, "{}", name),
            LevelKey::Rank(rank) => write!(f, "{}", rank),
            LevelKey::Level(level) => write!(f, "{}", level),
        }
    }
}

/// Fixed set of levels plus aliases
#[derive(Debug, Clone)]
pub struct LevelTable {
    levels: Vec<Level>,
    /// Lower-cased canonical name to index
    by_name: HashMap<String, usize>,
    /// Lower-cased alias to index, consulted first
    aliases: HashMap<String, usize>,
    alias_names: Vec<String>,
}

impl LevelTable {
    /// Build a table from levels in declaration order and `(alias, target)` pairs
    ///
    /// Names and aliases match case-insensitively, so `"aUDIT"` finds a level
    /// declared as `"Audit"`. Two names that differ only in case are rejected
    /// as duplicates.
    pub fn new(levels: Vec<Level>, aliases: &[(&str, &str)]) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(levels.len());
        for (idx, level) in levels.iter().enumerate() {
            if by_name.insert(level.name.to_lowercase(), idx).is_some() {
                return Err(LogError::config(
                    "LevelTable",
                    format!("duplicate level name '{}'", level.name),
                ));
            }
        }

        let mut alias_map = HashMap::with_capacity(aliases.len());
        let mut alias_names = Vec::with_capacity(aliases.len());
        for (alias, target) in aliases {
            let idx = *by_name.get(&target.to_lowercase()).ok_or_else(|| {
                LogError::config(
                    "LevelTable",
                    format!("alias '{}' points at unknown level '{}'", alias, target),
                )
            })?;
            alias_map.insert(alias.to_lowercase(), idx);
            alias_names.push(alias.to_string());
        }

        Ok(Self {
            levels,
            by_name,
            aliases: alias_map,
            alias_names,
        })
    }

    /// The process-wide standard table, built on first use
    pub fn standard() -> &'static LevelTable {
        static STANDARD: OnceLock<LevelTable> = OnceLock::new();
        STANDARD.get_or_init(|| {
            use palette::*;

            let levels = vec![
                Level::new("NOTSET", 0, "", Style::new().fg(DARK_GREY).dim()),
                Level::new("TRACE", 5, "✏️", Style::new().fg(GREY)),
                Level::new("DEBUG", 10, "🐛", Style::new().fg(LIGHT_GREY).bold()),
                Level::new("INFO", 20, "ℹ️", Style::new().fg(WHITE)),
                Level::new("SUCCESS", 30, "✅", Style::new().fg(GREEN)),
                Level::new("WARNING", 30, "⚠️", Style::new().fg(YELLOW)),
                Level::new("ERROR", 40, "❌", Style::new().fg(RED)),
                Level::new("CRITICAL", 50, "💊", Style::new().fg(RED).bold().blink()),
            ];
            // Names and aliases are static and distinct
            match LevelTable::new(levels, &[("WARN", "WARNING"), ("FATAL", "CRITICAL")]) {
                Ok(table) => table,
                Err(e) => unreachable!("standard level table is invalid: {}", e),
            }
        })
    }

    /// Resolve a name, alias, rank or level
    ///
    /// Names are matched case-insensitively, aliases before canonical
    /// names. A rank resolves to the first level declared with that rank.
    /// A level is returned unchanged.
    pub fn lookup<'a>(&self, key: impl Into<LevelKey<'a>>) -> Result<Level> {
        let key = key.into();
        let idx = match &key {
            LevelKey::Level(level) => return Ok(level.clone()),
            LevelKey::Name(name) => {
                let normalized = name.to_lowercase();
                self.aliases
                    .get(&normalized)
                    .or_else(|| self.by_name.get(&normalized))
                    .copied()
            }
            LevelKey::Rank(rank) => self
                .levels
                .iter()
                .position(|level| i64::from(level.rank) == *rank),
        };
        idx.map(|idx| self.levels[idx].clone())
            .ok_or_else(|| LogError::not_found(key.to_string()))
    }

    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }

    /// Canonical names followed by aliases
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.levels
            .iter()
            .map(Level::name)
            .chain(self.alias_names.iter().map(String::as_str))
    }

    /// Width of the longest name, aliases included
    pub fn max_name_width(&self) -> usize {
        self.names().map(cell_width).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

macro_rules! standard_levels {
    ($($fn_name:ident => $name:literal),* $(,)?) => {
        impl Level {
            $(
                #[doc = concat!("The standard `", $name, "` level")]
                pub fn $fn_name() -> Level {
                    match LevelTable::standard().lookup($name) {
                        Ok(level) => level,
                        Err(e) => unreachable!("{}", e),
                    }
                }
            )*
        }
    };
}

standard_levels! {
    notset => "NOTSET",
    trace => "TRACE",
    debug => "DEBUG",
    info => "INFO",
    success => "SUCCESS",
    warning => "WARNING",
    error => "ERROR",
    critical => "CRITICAL",
}
