//! Caption text normalization
//!
//! Straight quotes are turned into their typographic forms first and the
//! result is HTML-escaped afterwards, so escaping never hides a quote from
//! the substitution pass.

use std::fmt::Write;

const LEFT_DOUBLE: char = '\u{201C}';
const RIGHT_DOUBLE: char = '\u{201D}';
const LEFT_SINGLE: char = '\u{2018}';
const RIGHT_SINGLE: char = '\u{2019}';
const PRIME: char = '\u{2032}';
const DOUBLE_PRIME: char = '\u{2033}';
const TRIPLE_PRIME: char = '\u{2034}';

/// Quote-normalize and escape caption text for embedding in markup.
pub fn normalize_caption(raw: &str) -> String {
    escape_html(&smart_quotes(raw))
}

/// Replace ASCII `"` and `'` with curly quotes, apostrophes and primes.
///
/// ```rust
/// use caption_shot::smart_quotes;
///
/// assert_eq!(smart_quotes("\"don't\""), "\u{201C}don\u{2019}t\u{201D}");
/// assert_eq!(smart_quotes("6'2\""), "6\u{2032}2\u{2033}");
/// ```
pub fn smart_quotes(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 8);
    let mut double_open = false;
    let mut single_open = false;
    let mut i = 0;

    while i < chars.len() {
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = |offset: usize| chars.get(i + offset).copied();

        match chars[i] {
            '\'' => {
                let run = chars[i..].iter().take_while(|&&c| c == '\'').count();
                if run >= 3 {
                    out.push(TRIPLE_PRIME);
                    i += 3;
                    continue;
                }
                if run == 2 {
                    out.push(DOUBLE_PRIME);
                    i += 2;
                    continue;
                }

                let quote = if is_letter(prev) && is_letter(next(1)) {
                    RIGHT_SINGLE
                } else if opens(prev) && is_year_abbreviation(next(1), next(2), next(3)) {
                    RIGHT_SINGLE
                } else if opens(prev) && is_visible(next(1)) {
                    single_open = true;
                    LEFT_SINGLE
                } else if is_digit(prev) && !single_open {
                    PRIME
                } else {
                    single_open = false;
                    RIGHT_SINGLE
                };
                out.push(quote);
            }
            '"' => {
                let quote = if opens(prev) && is_visible(next(1)) && !double_open {
                    double_open = true;
                    LEFT_DOUBLE
                } else if double_open {
                    double_open = false;
                    RIGHT_DOUBLE
                } else if is_digit(prev) {
                    DOUBLE_PRIME
                } else {
                    RIGHT_DOUBLE
                };
                out.push(quote);
            }
            c => out.push(c),
        }
        i += 1;
    }

    out
}

/// HTML-escape text so it can only ever be literal content.
///
/// Markup-significant characters go through `tera::escape_html`; every
/// non-ASCII character becomes a hexadecimal character reference, so the
/// output is plain ASCII.
pub fn escape_html(input: &str) -> String {
    let escaped = tera::escape_html(input);
    let mut out = String::with_capacity(escaped.len());

    for c in escaped.chars() {
        match c {
            '`' => out.push_str("&#x60;"),
            c if c.is_ascii() => out.push(c),
            c => {
                let _ = write!(out, "&#x{:X};", c as u32);
            }
        }
    }

    out
}

fn opens(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => {
            c.is_whitespace()
                || matches!(
                    c,
                    '(' | '[' | '{' | '<' | '-' | '\u{2013}' | '\u{2014}' | '"' | '\''
                )
        }
    }
}

fn is_letter(c: Option<char>) -> bool {
    c.map_or(false, char::is_alphabetic)
}

fn is_digit(c: Option<char>) -> bool {
    c.map_or(false, |c| c.is_ascii_digit())
}

fn is_visible(c: Option<char>) -> bool {
    c.map_or(false, |c| !c.is_whitespace())
}

// '93, '07s
fn is_year_abbreviation(first: Option<char>, second: Option<char>, third: Option<char>) -> bool {
    is_digit(first) && is_digit(second) && !is_digit(third)
}
