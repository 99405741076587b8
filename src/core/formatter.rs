//! Placeholder substitution for message templates and record formats
//!
//! Three placeholder conventions are supported:
//!
//! - [`FormatStyle::Percent`]: `%s`, `%(name)s`, `%05.2f`, `%%`
//! - [`FormatStyle::Brace`]: `{}`, `{0}`, `{name}`, `{name!r:>10}`, `{{`
//! - [`FormatStyle::Dollar`]: `$name`, `${name}`, `$$`

use super::args::{Args, FieldValue};
use super::error::{LogError, Result};
use super::record::Record;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Placeholder convention, chosen once per handler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatStyle {
    #[default]
    #[serde(alias = "%")]
    Percent,
    #[serde(alias = "{")]
    Brace,
    #[serde(alias = "$")]
    Dollar,
}

impl FormatStyle {
    /// Template that renders only the message
    pub fn default_template(self) -> &'static str {
        match self {
            FormatStyle::Percent => "%(message)s",
            FormatStyle::Brace => "{message}",
            FormatStyle::Dollar => "${message}",
        }
    }

    /// Whether `template` references the named field
    pub fn references(self, template: &str, field: &str) -> bool {
        match self {
            FormatStyle::Percent => template.contains(&format!("%({})", field)),
            FormatStyle::Brace => {
                template.contains(&format!("{{{}}}", field))
                    || template.contains(&format!("{{{}:", field))
                    || template.contains(&format!("{{{}!", field))
            }
            FormatStyle::Dollar => {
                template.contains(&format!("${{{}}}", field))
                    || template
                        .match_indices(&format!("${}", field))
                        .any(|(idx, m)| {
                            !template[idx + m.len()..]
                                .starts_with(|c: char| c.is_alphanumeric() || c == '_')
                        })
            }
        }
    }
}

impl fmt::Display for FormatStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            FormatStyle::Percent => "%",
            FormatStyle::Brace => "{",
            FormatStyle::Dollar => "$",
        };
        write!(f, "{}", symbol)
    }
}

impl FromStr for FormatStyle {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "%" | "percent" => Ok(FormatStyle::Percent),
            "{" | "brace" => Ok(FormatStyle::Brace),
            "$" | "dollar" => Ok(FormatStyle::Dollar),
            _ => Err(LogError::config(
                "FormatStyle",
                format!("style must be one of '%', '{{', '$', got '{}'", s),
            )),
        }
    }
}

/// Substitute `args` into `template`
///
/// `Args::None` returns the template unchanged, whatever its contents.
pub fn format_args(template: &str, args: &Args, style: FormatStyle) -> Result<String> {
    if args.is_none() {
        return Ok(template.to_string());
    }
    match style {
        FormatStyle::Percent => percent::format(template, args),
        FormatStyle::Brace => brace::format(template, args),
        FormatStyle::Dollar => dollar::format(template, args),
    }
    .map_err(|message| LogError::format(template, message))
}

/// Width, precision and flags shared by the percent and brace conventions
#[derive(Debug, Default, Clone, Copy)]
struct Spec {
    fill: char,
    align: Option<char>,
    sign: Option<char>,
    alternate: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
}

impl Spec {
    fn new() -> Self {
        Self {
            fill: ' ',
            ..Self::default()
        }
    }
}

fn convert(value: &FieldValue, conversion: char, spec: &Spec) -> std::result::Result<String, String> {
    let numeric = |kind: &str| {
        format!(
            "%{} format: a real number is required, not {}",
            kind,
            value.kind()
        )
    };
    let body = match conversion {
        's' => truncate(&value.to_string(), spec.precision),
        'r' | 'a' => truncate(&value.repr(), spec.precision),
        'd' | 'i' | 'u' => {
            let n = value.as_int().ok_or_else(|| numeric("d"))?;
            signed(n.unsigned_abs().to_string(), n < 0, spec.sign)
        }
        'f' | 'F' => {
            let f = value.as_float().ok_or_else(|| numeric("f"))?;
            let digits = format!("{:.*}", spec.precision.unwrap_or(6), f.abs());
            signed(digits, f.is_sign_negative() && f != 0.0, spec.sign)
        }
        'e' | 'E' => {
            let f = value.as_float().ok_or_else(|| numeric("e"))?;
            let mut digits = exponent(f.abs(), spec.precision.unwrap_or(6));
            if conversion == 'E' {
                digits = digits.to_uppercase();
            }
            signed(digits, f.is_sign_negative() && f != 0.0, spec.sign)
        }
        'x' | 'X' | 'o' | 'b' => {
            let n = value.as_int().ok_or_else(|| numeric(&conversion.to_string()))?;
            let magnitude = n.unsigned_abs();
            let (digits, prefix) = match conversion {
                'x' => (format!("{:x}", magnitude), "0x"),
                'X' => (format!("{:X}", magnitude), "0X"),
                'o' => (format!("{:o}", magnitude), "0o"),
                _ => (format!("{:b}", magnitude), "0b"),
            };
            let digits = if spec.alternate {
                format!("{}{}", prefix, digits)
            } else {
                digits
            };
            signed(digits, n < 0, spec.sign)
        }
        'c' => match value {
            FieldValue::String(s) if s.chars().count() == 1 => s.clone(),
            other => other
                .as_int()
                .and_then(|n| u32::try_from(n).ok())
                .and_then(char::from_u32)
                .map(String::from)
                .ok_or_else(|| "%c requires an int or a single character".to_string())?,
        },
        other => return Err(format!("unsupported format character '{}'", other)),
    };
    let is_numeric = !matches!(conversion, 's' | 'r' | 'a' | 'c');
    Ok(pad(body, spec, is_numeric))
}

fn truncate(s: &str, precision: Option<usize>) -> String {
    match precision {
        Some(p) => s.chars().take(p).collect(),
        None => s.to_string(),
    }
}

fn signed(digits: String, negative: bool, sign: Option<char>) -> String {
    match (negative, sign) {
        (true, _) => format!("-{}", digits),
        (false, Some('+')) => format!("+{}", digits),
        (false, Some(' ')) => format!(" {}", digits),
        _ => digits,
    }
}

/// `1.500000e+02` style exponent notation
fn exponent(value: f64, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, value);
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => raw,
    }
}

fn pad(body: String, spec: &Spec, numeric: bool) -> String {
    let len = body.chars().count();
    if len >= spec.width {
        return body;
    }
    let gap = spec.width - len;
    let align = spec
        .align
        .unwrap_or(if spec.zero && numeric { '=' } else if numeric { '>' } else { '<' });
    let fill = if spec.zero && spec.align.is_none() { '0' } else { spec.fill };
    let filler = |n: usize| fill.to_string().repeat(n);
    match align {
        '<' => format!("{}{}", body, filler(gap)),
        '^' => format!("{}{}{}", filler(gap / 2), body, filler(gap - gap / 2)),
        '=' => {
            let split = body
                .char_indices()
                .find(|(_, c)| !matches!(c, '+' | '-' | ' '))
                .map(|(idx, _)| idx)
                .unwrap_or(0);
            let (sign, digits) = body.split_at(split);
            let (prefix, digits) = match digits.get(..2) {
                Some("0x" | "0X" | "0o" | "0b") => digits.split_at(2),
                _ => ("", digits),
            };
            format!("{}{}{}{}", sign, prefix, filler(gap), digits)
        }
        _ => format!("{}{}", filler(gap), body),
    }
}

mod percent {
    use super::*;

    pub(super) fn format(template: &str, args: &Args) -> std::result::Result<String, String> {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.char_indices().peekable();
        let mut next_positional = 0usize;

        while let Some((_, c)) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            let mut key = None;
            if let Some((start, '(')) = chars.peek().copied() {
                chars.next();
                let mut depth = 1;
                let mut end = None;
                for (idx, c) in chars.by_ref() {
                    match c {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                end = Some(idx);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let end = end.ok_or_else(|| "incomplete format key".to_string())?;
                key = Some(&template[start + 1..end]);
            }

            let mut spec = Spec::new();
            while let Some((_, flag)) = chars.peek().copied() {
                match flag {
                    '-' => spec.align = Some('<'),
                    '+' => spec.sign = Some('+'),
                    ' ' => {
                        if spec.sign.is_none() {
                            spec.sign = Some(' ')
                        }
                    }
                    '0' => spec.zero = true,
                    '#' => spec.alternate = true,
                    _ => break,
                }
                chars.next();
            }
            match spec.align {
                Some(_) => spec.zero = false,
                None if !spec.zero => spec.align = Some('>'),
                None => {}
            }
            spec.width = read_number(&mut chars).unwrap_or(0);
            if let Some((_, '.')) = chars.peek().copied() {
                chars.next();
                spec.precision = Some(read_number(&mut chars).unwrap_or(0));
            }
            let conversion = match chars.next() {
                Some((_, conv)) => conv,
                None => return Err("incomplete format".to_string()),
            };
            if conversion == '%' && key.is_none() {
                out.push('%');
                continue;
            }

            let value = match key {
                Some(name) => match args {
                    Args::Named(map) => map
                        .get(name)
                        .ok_or_else(|| format!("missing key '{}'", name))?,
                    _ => return Err("format requires a mapping".to_string()),
                },
                None => {
                    let value = match args {
                        Args::Positional(values) => values.get(next_positional),
                        _ => return Err("format requires positional arguments".to_string()),
                    }
                    .ok_or_else(|| "not enough arguments for format string".to_string())?;
                    next_positional += 1;
                    value
                }
            };
            out.push_str(&convert(value, conversion, &spec)?);
        }

        if let Args::Positional(values) = args {
            if next_positional < values.len() {
                return Err("not all arguments converted during string formatting".to_string());
            }
        }
        Ok(out)
    }

    fn read_number<I: Iterator<Item = (usize, char)>>(
        chars: &mut std::iter::Peekable<I>,
    ) -> Option<usize> {
        let mut value: Option<usize> = None;
        while let Some(digit) = chars.peek().and_then(|(_, c)| c.to_digit(10)) {
            value = Some(value.unwrap_or(0) * 10 + digit as usize);
            chars.next();
        }
        value
    }
}

mod brace {
    use super::*;

    #[derive(PartialEq)]
    enum Numbering {
        Unset,
        Auto,
        Manual,
    }

    pub(super) fn format(template: &str, args: &Args) -> std::result::Result<String, String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        let mut auto_index = 0usize;
        let mut numbering = Numbering::Unset;

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if tail.starts_with("{{") {
                out.push('{');
                rest = &tail[2..];
                continue;
            }
            if tail.starts_with("}}") {
                out.push('}');
                rest = &tail[2..];
                continue;
            }
            if tail.starts_with('}') {
                return Err("single '}' encountered in format string".to_string());
            }
            let close = tail
                .find('}')
                .ok_or_else(|| "expected '}' before end of string".to_string())?;
            let field = &tail[1..close];
            rest = &tail[close + 1..];

            let (field, format_spec) = match field.split_once(':') {
                Some((f, s)) => (f, Some(s)),
                None => (field, None),
            };
            let (field, conversion) = match field.split_once('!') {
                Some((f, c)) => (f, Some(c)),
                None => (field, None),
            };

            let value = if field.is_empty() {
                if numbering == Numbering::Manual {
                    return Err(
                        "cannot switch from manual field specification to automatic field numbering"
                            .to_string(),
                    );
                }
                numbering = Numbering::Auto;
                auto_index += 1;
                positional(args, auto_index - 1)?
            } else if let Ok(index) = field.parse::<usize>() {
                if numbering == Numbering::Auto {
                    return Err(
                        "cannot switch from automatic field numbering to manual field specification"
                            .to_string(),
                    );
                }
                numbering = Numbering::Manual;
                positional(args, index)?
            } else {
                args.get_name(field)
                    .ok_or_else(|| format!("missing key '{}'", field))?
            };

            let converted;
            let value = match conversion {
                None => value,
                Some("s") => {
                    converted = FieldValue::String(value.to_string());
                    &converted
                }
                Some("r") | Some("a") => {
                    converted = FieldValue::String(value.repr());
                    &converted
                }
                Some(other) => return Err(format!("unknown conversion specifier {}", other)),
            };
            out.push_str(&apply_spec(value, format_spec.unwrap_or(""))?);
        }
        out.push_str(rest);
        Ok(out)
    }

    fn positional(args: &Args, index: usize) -> std::result::Result<&FieldValue, String> {
        args.get_index(index)
            .ok_or_else(|| format!("replacement index {} out of range", index))
    }

    fn apply_spec(value: &FieldValue, format_spec: &str) -> std::result::Result<String, String> {
        let mut spec = Spec::new();
        let chars: Vec<char> = format_spec.chars().collect();
        let mut i = 0;

        let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');
        if chars.len() >= 2 && is_align(chars[1]) {
            spec.fill = chars[0];
            spec.align = Some(chars[1]);
            i = 2;
        } else if chars.first().copied().is_some_and(is_align) {
            spec.align = Some(chars[0]);
            i = 1;
        }
        if let Some(&sign @ ('+' | '-' | ' ')) = chars.get(i) {
            if sign != '-' {
                spec.sign = Some(sign);
            }
            i += 1;
        }
        if chars.get(i) == Some(&'#') {
            spec.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            spec.zero = true;
            i += 1;
        }
        let mut width = String::new();
        while let Some(c) = chars.get(i).filter(|c| c.is_ascii_digit()) {
            width.push(*c);
            i += 1;
        }
        spec.width = width.parse().unwrap_or(0);
        if chars.get(i) == Some(&'.') {
            i += 1;
            let mut precision = String::new();
            while let Some(c) = chars.get(i).filter(|c| c.is_ascii_digit()) {
                precision.push(*c);
                i += 1;
            }
            spec.precision = Some(precision.parse().map_err(|_| "format specifier missing precision")?);
        }
        let kind = chars.get(i).copied();
        if chars.len() > i + 1 {
            return Err(format!("invalid format specifier '{}'", format_spec));
        }

        let conversion = match kind {
            Some(c) => c,
            None => match value {
                FieldValue::Int(_) | FieldValue::Bool(_) if spec.precision.is_none() => 'd',
                FieldValue::Float(_) if spec.precision.is_some() => 'f',
                FieldValue::Float(f) => {
                    let body = signed(format_float(f.abs()), f.is_sign_negative(), spec.sign);
                    return Ok(pad(body, &spec, true));
                }
                _ => 's',
            },
        };
        if conversion == 'd' {
            if let FieldValue::Float(_) | FieldValue::String(_) | FieldValue::Null = value {
                return Err(format!(
                    "unknown format code 'd' for object of type '{}'",
                    value.kind()
                ));
            }
        }
        if conversion == 's' && !matches!(value, FieldValue::String(_)) && kind.is_some() {
            return Err(format!(
                "unknown format code 's' for object of type '{}'",
                value.kind()
            ));
        }
        convert(value, conversion, &spec)
    }

    /// Shortest representation that keeps a decimal point
    fn format_float(f: f64) -> String {
        let s = f.to_string();
        if s.contains(['.', 'e', 'i', 'N']) {
            s
        } else {
            format!("{}.0", s)
        }
    }
}

mod dollar {
    use super::*;

    pub(super) fn format(template: &str, args: &Args) -> std::result::Result<String, String> {
        let map = match args {
            Args::Named(map) => map,
            _ => return Err("dollar placeholders require named arguments".to_string()),
        };
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos + 1..];
            if let Some(after) = tail.strip_prefix('$') {
                out.push('$');
                rest = after;
                continue;
            }
            let (name, after) = if let Some(braced) = tail.strip_prefix('{') {
                let close = braced
                    .find('}')
                    .ok_or_else(|| format!("invalid placeholder at index {}", template.len() - tail.len() - 1))?;
                (&braced[..close], &braced[close + 1..])
            } else {
                let end = tail
                    .char_indices()
                    .find(|(idx, c)| {
                        !(c.is_ascii_alphanumeric() || *c == '_') || (*idx == 0 && c.is_ascii_digit())
                    })
                    .map(|(idx, _)| idx)
                    .unwrap_or(tail.len());
                (&tail[..end], &tail[end..])
            };
            if !is_identifier(name) {
                return Err(format!(
                    "invalid placeholder at index {}",
                    template.len() - tail.len() - 1
                ));
            }
            let value = map
                .get(name)
                .ok_or_else(|| format!("missing key '{}'", name))?;
            out.push_str(&value.to_string());
            rest = after;
        }
        out.push_str(rest);
        Ok(out)
    }

    fn is_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

/// Record fields a formatter template may reference
pub const RECORD_FIELDS: &[&str] = &[
    "message",
    "asctime",
    "created",
    "msecs",
    "levelname",
    "levelno",
    "name",
    "pathname",
    "filename",
    "module",
    "lineno",
    "funcName",
    "thread",
    "threadName",
    "process",
];

/// Default `asctime` pattern, `2024-01-31 12:00:00,123`
pub const DEFAULT_DATEFMT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Record-level template, applied after message arguments are substituted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formatter {
    fmt: String,
    datefmt: Option<String>,
    style: FormatStyle,
}

impl Formatter {
    /// Build and validate a formatter; `fmt = None` renders only the message
    pub fn new(fmt: Option<&str>, datefmt: Option<&str>, style: FormatStyle) -> Result<Self> {
        let formatter = Self {
            fmt: fmt.unwrap_or(style.default_template()).to_string(),
            datefmt: datefmt.map(str::to_string),
            style,
        };
        formatter.validate()?;
        if let Some(datefmt) = &formatter.datefmt {
            validate_datefmt(datefmt)?;
        }
        Ok(formatter)
    }

    fn validate(&self) -> Result<()> {
        let sample = Args::Named(
            RECORD_FIELDS
                .iter()
                .map(|field| (field.to_string(), FieldValue::Int(0)))
                .collect(),
        );
        format_args(&self.fmt, &sample, self.style).map_err(|e| match e {
            LogError::Format { message, .. } => LogError::config(
                "Formatter",
                format!("invalid template '{}': {}", self.fmt, message),
            ),
            other => other,
        })?;
        Ok(())
    }

    pub fn fmt(&self) -> &str {
        &self.fmt
    }

    pub fn datefmt(&self) -> Option<&str> {
        self.datefmt.as_deref()
    }

    pub fn style(&self) -> FormatStyle {
        self.style
    }

    pub fn uses_time(&self) -> bool {
        self.style.references(&self.fmt, "asctime")
    }

    /// Substitute record fields and the already formatted `message`
    pub fn format_message(&self, record: &Record, message: &str) -> Result<String> {
        let mut fields = record_fields(record);
        fields.insert("message".to_string(), FieldValue::from(message));
        if self.uses_time() {
            fields.insert(
                "asctime".to_string(),
                FieldValue::from(record.asctime(self.datefmt())),
            );
        }
        format_args(&self.fmt, &Args::Named(fields), self.style)
    }

    /// Full plain rendering, including the exception summary when present
    pub fn format(&self, record: &Record, message: &str) -> Result<String> {
        let mut out = self.format_message(record, message)?;
        if let Some(trace) = &record.exception {
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&trace.format_plain());
        }
        Ok(out)
    }
}

/// Reject strftime patterns chrono cannot render
pub(crate) fn validate_datefmt(pattern: &str) -> Result<()> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(LogError::config(
            "Formatter",
            format!("invalid datefmt '{}'", pattern),
        ));
    }
    Ok(())
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            fmt: FormatStyle::Percent.default_template().to_string(),
            datefmt: None,
            style: FormatStyle::Percent,
        }
    }
}

fn record_fields(record: &Record) -> BTreeMap<String, FieldValue> {
    let created = record.timestamp.timestamp_micros() as f64 / 1_000_000.0;
    let pathname = record.file.clone().unwrap_or_default();
    let filename = std::path::Path::new(&pathname)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let module = record
        .module_path
        .clone()
        .unwrap_or_else(|| filename.trim_end_matches(".rs").to_string());

    let mut fields = BTreeMap::new();
    fields.insert("name".to_string(), FieldValue::from(record.name.as_str()));
    fields.insert("levelname".to_string(), FieldValue::from(record.level.name()));
    fields.insert("levelno".to_string(), FieldValue::from(record.level.rank()));
    fields.insert("created".to_string(), FieldValue::Float(created));
    fields.insert(
        "msecs".to_string(),
        FieldValue::Int(i64::from(record.timestamp.timestamp_subsec_millis())),
    );
    fields.insert("pathname".to_string(), FieldValue::String(pathname));
    fields.insert("filename".to_string(), FieldValue::String(filename));
    fields.insert("module".to_string(), FieldValue::String(module));
    fields.insert("lineno".to_string(), FieldValue::from(record.line.unwrap_or(0)));
    fields.insert(
        "funcName".to_string(),
        FieldValue::from(record.function.as_deref().unwrap_or("<module>")),
    );
    fields.insert("thread".to_string(), FieldValue::from(record.thread_id.as_str()));
    fields.insert(
        "threadName".to_string(),
        FieldValue::from(record.thread_name.as_deref().unwrap_or("unnamed")),
    );
    fields.insert("process".to_string(), FieldValue::from(std::process::id()));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level::Level;

    fn pos<V: Into<FieldValue>>(values: Vec<V>) -> Args {
        Args::positional(values)
    }

    #[test]
    fn test_no_args_is_verbatim() {
        let out = format_args("100% done %s {x} $y", &Args::None, FormatStyle::Percent).unwrap();
        assert_eq!(out, "100% done %s {x} $y");
    }

    #[test]
    fn test_percent_positional_and_specs() {
        let out = format_args("%s has %d items (%.1f%%)", &Args::positional::<_, FieldValue>(vec![
            "cart".into(),
            3.into(),
            42.56.into(),
        ]), FormatStyle::Percent)
        .unwrap();
        assert_eq!(out, "cart has 3 items (42.6%)");

        assert_eq!(format_args("[%5s]", &pos(vec!["ab"]), FormatStyle::Percent).unwrap(), "[   ab]");
        assert_eq!(format_args("[%-5s]", &pos(vec!["ab"]), FormatStyle::Percent).unwrap(), "[ab   ]");
        assert_eq!(format_args("%05d", &pos(vec![-42]), FormatStyle::Percent).unwrap(), "-0042");
        assert_eq!(format_args("%x %#X", &pos(vec![255, 255]), FormatStyle::Percent).unwrap(), "ff 0XFF");
        assert_eq!(format_args("%r", &pos(vec!["hi"]), FormatStyle::Percent).unwrap(), "'hi'");
        assert_eq!(format_args("%.2e", &pos(vec![1500.0]), FormatStyle::Percent).unwrap(), "1.50e+03");
    }

    #[test]
    fn test_percent_named() {
        let args = Args::named([("user", FieldValue::from("ann")), ("n", FieldValue::from(2))]);
        let out = format_args("%(user)s logged in %(n)d times", &args, FormatStyle::Percent).unwrap();
        assert_eq!(out, "ann logged in 2 times");
    }

    #[test]
    fn test_percent_errors() {
        let err = format_args("%s %s", &pos(vec![1]), FormatStyle::Percent).unwrap_err();
        assert!(matches!(err, LogError::Format { .. }));
        assert!(err.to_string().contains("not enough arguments"));

        let err = format_args("%s", &pos(vec![1, 2]), FormatStyle::Percent).unwrap_err();
        assert!(err.to_string().contains("not all arguments converted"));

        let err = format_args("%d", &pos(vec!["x"]), FormatStyle::Percent).unwrap_err();
        assert!(err.to_string().contains("real number is required"));

        let err = format_args("%(missing)s", &Args::named([("a", 1)]), FormatStyle::Percent)
            .unwrap_err();
        assert!(err.to_string().contains("missing key 'missing'"));
    }

    #[test]
    fn test_brace_fields() {
        let out = format_args("{} + {} = {}", &pos(vec![1, 2, 3]), FormatStyle::Brace).unwrap();
        assert_eq!(out, "1 + 2 = 3");

        let out = format_args("{1}{0}{{}}", &pos(vec!["a", "b"]), FormatStyle::Brace).unwrap();
        assert_eq!(out, "ba{}");

        let args = Args::named([("name", FieldValue::from("db")), ("ms", FieldValue::from(3.14159))]);
        let out = format_args("{name!r:>6}|{ms:.2f}|{ms}", &args, FormatStyle::Brace).unwrap();
        assert_eq!(out, "  'db'|3.14|3.14159");

        assert_eq!(format_args("{:*^7}", &pos(vec!["mid"]), FormatStyle::Brace).unwrap(), "**mid**");
        assert_eq!(format_args("{:04d}", &pos(vec![7]), FormatStyle::Brace).unwrap(), "0007");
        assert_eq!(format_args("{}", &pos(vec![2.0]), FormatStyle::Brace).unwrap(), "2.0");
    }

    #[test]
    fn test_brace_errors() {
        assert!(format_args("{} {1}", &pos(vec![1, 2]), FormatStyle::Brace).is_err());
        assert!(format_args("{5}", &pos(vec![1]), FormatStyle::Brace).is_err());
        assert!(format_args("oops }", &pos(vec![1]), FormatStyle::Brace).is_err());
        assert!(format_args("{:d}", &pos(vec!["x"]), FormatStyle::Brace).is_err());
    }

    #[test]
    fn test_dollar_placeholders() {
        let args = Args::named([("who", "ann"), ("what", "tea")]);
        let out = format_args("$who likes ${what}s, costs $$3", &args, FormatStyle::Dollar).unwrap();
        assert_eq!(out, "ann likes teas, costs $3");

        assert!(format_args("$who", &pos(vec![1]), FormatStyle::Dollar).is_err());
        assert!(format_args("$1", &args, FormatStyle::Dollar).is_err());
        assert!(format_args("$nobody", &args, FormatStyle::Dollar).is_err());
    }

    #[test]
    fn test_style_parsing_and_time_detection() {
        assert_eq!("{".parse::<FormatStyle>().unwrap(), FormatStyle::Brace);
        assert_eq!("dollar".parse::<FormatStyle>().unwrap(), FormatStyle::Dollar);
        assert!("#".parse::<FormatStyle>().is_err());

        let style: FormatStyle = serde_json::from_str("\"$\"").unwrap();
        assert_eq!(style, FormatStyle::Dollar);

        assert!(FormatStyle::Percent.references("%(asctime)s %(message)s", "asctime"));
        assert!(FormatStyle::Dollar.references("$asctime $message", "asctime"));
        assert!(!FormatStyle::Dollar.references("$asctimes", "asctime"));
        assert!(FormatStyle::Brace.references("{asctime:>20}", "asctime"));
    }

    #[test]
    fn test_formatter_validates_template() {
        assert!(Formatter::new(Some("%(levelname)s %(message)s"), None, FormatStyle::Percent).is_ok());
        assert!(matches!(
            Formatter::new(Some("%(bogus)s"), None, FormatStyle::Percent),
            Err(LogError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_formatter_rejects_bad_datefmt() {
        let err = Formatter::new(Some("%(asctime)s %(message)s"), Some("%Q"), FormatStyle::Percent)
            .unwrap_err();
        assert!(matches!(err, LogError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("%Q"));

        assert!(Formatter::new(None, Some("%Y-%m-%d %H:%M"), FormatStyle::Percent).is_ok());
        assert!(validate_datefmt("[%x %X]").is_ok());
        assert!(validate_datefmt("%H:%M:%").is_err());
    }

    #[test]
    fn test_formatter_substitutes_record_fields() {
        let record = Record::new(Level::warning(), "disk low")
            .with_name("storage")
            .with_location("src/disk.rs", 42, "app::disk");
        let formatter =
            Formatter::new(Some("{levelname}:{name}:{module}:{lineno} {message}"), None, FormatStyle::Brace)
                .unwrap();
        let out = formatter.format_message(&record, "disk low").unwrap();
        assert_eq!(out, "WARNING:storage:app::disk:42 disk low");
        assert!(!formatter.uses_time());
    }
}
