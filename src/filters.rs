//! Template Filters - LaTeX-safe text
//!
//! Pure `&str -> String` functions, registered on the template environment.

use chrono::format::{self, Parsed, StrftimeItems};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Escape sequence for one character, `None` if it passes through.
fn latex_replacement(c: char) -> Option<&'static str> {
    let escaped = match c {
        '&' => r"\&",
        '%' => r"\%",
        '$' => r"\$",
        '#' => r"\#",
        '_' => r"\_",
        '{' => r"\{",
        '}' => r"\}",
        '~' => r"\textasciitilde{}",
        '^' => r"\textasciicircum{}",
        '\\' => r"\textbackslash{}",
        '<' => r"\textless{}",
        '>' => r"\textgreater{}",
        '|' => r"\textbar{}",
        '\'' => r"\textquotesingle{}",
        _ => return None,
    };
    Some(escaped)
}

/// Escape LaTeX special characters, one input character at a time.
pub fn latex_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match latex_replacement(c) {
            Some(escaped) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    out
}

fn link_pattern() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    LINK.get_or_init(|| {
        Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap_or_else(|e| unreachable!("link regex: {e}"))
    })
}

/// Rewrite `[label](url)` links to `\href{url}{label}`, then escape `%`.
pub fn markdown_to_latex(text: &str) -> String {
    link_pattern()
        .replace_all(text, r"\href{${2}}{${1}}")
        .replace('%', r"\%")
}

#[derive(Clone, Copy)]
enum Precision {
    Day,
    Month,
}

/// Tried in order; first match wins.
const DATE_FORMATS: [(&str, Precision); 4] = [
    ("%d-%m-%Y", Precision::Day),
    ("%m-%Y", Precision::Month),
    ("%Y-%m-%d", Precision::Day),
    ("%Y-%m", Precision::Month),
];

/// chrono's `%Y` takes any digit count; the year here must be exactly four.
fn has_full_year(input: &str, fmt: &str) -> bool {
    let year = if fmt.starts_with("%Y") {
        input.split('-').next()
    } else {
        input.rsplit('-').next()
    };
    year.is_some_and(|y| y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit()))
}

fn parse_date(input: &str, fmt: &str, precision: Precision) -> Option<NaiveDate> {
    if !has_full_year(input, fmt) {
        return None;
    }
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, input, StrftimeItems::new(fmt)).ok()?;
    if let Precision::Month = precision {
        parsed.set_day(1).ok()?;
    }
    parsed.to_naive_date().ok()
}

/// Reformat a date as `Jan 2024`; unknown shapes come back unchanged.
pub fn format_date(date: &str) -> String {
    DATE_FORMATS
        .iter()
        .find_map(|(fmt, precision)| parse_date(date, fmt, *precision))
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_else(|| date.to_string())
}
