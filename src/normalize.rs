//! Conversion of catalog text tokens into numbers
//!
//! The catalog formats numbers the Chilean way: `.` groups thousands and `,`
//! marks decimals (`UF 3.500,50`, `120,5 m²`). Each function picks one
//! whitespace-delimited token, rewrites it into Rust's float/integer syntax
//! and parses it.

use crate::FormatError;

const THOUSANDS_SEPARATOR: char = '.';
const DECIMAL_COMMA: char = ',';

/// Parse a price such as `$ 100.000.000` or `UF 3.500,50`
///
/// The first token is the currency marker and is ignored; the second token
/// is the amount.
///
/// # Examples
///
/// ```ignore
/// use listing_harvest::normalize::parse_money;
///
/// assert_eq!(parse_money("$ 100.000.000")?, 100_000_000.0);
/// assert_eq!(parse_money("UF 3.500,50")?, 3500.5);
/// ```
pub fn parse_money(text: &str) -> Result<f64, FormatError> {
    let token = token_at(text, 1)?;
    parse_float(token)
}

/// Parse a count such as `3`, `1.250` or `3 m2`
///
/// Only the first token is read, so trailing units are dropped.
pub fn parse_integer(text: &str) -> Result<u32, FormatError> {
    let token = token_at(text, 0)?;
    let digits: String = token.chars().filter(|c| *c != THOUSANDS_SEPARATOR).collect();

    digits
        .parse()
        .map_err(|source| FormatError::InvalidInteger {
            text: token.to_string(),
            source,
        })
}

/// Parse a surface such as `120,5 m2` or `1.200 m²`
///
/// Like [`parse_integer`] but keeps the fractional part.
pub fn parse_area(text: &str) -> Result<f64, FormatError> {
    let token = token_at(text, 0)?;
    parse_float(token)
}

fn token_at(text: &str, position: usize) -> Result<&str, FormatError> {
    text.split_whitespace()
        .nth(position)
        .ok_or_else(|| FormatError::MissingToken {
            text: text.to_string(),
            position,
        })
}

fn parse_float(token: &str) -> Result<f64, FormatError> {
    let rewritten: String = token
        .chars()
        .filter(|c| *c != THOUSANDS_SEPARATOR)
        .map(|c| if c == DECIMAL_COMMA { '.' } else { c })
        .collect();

    rewritten
        .parse()
        .map_err(|source| FormatError::InvalidFloat {
            text: token.to_string(),
            source,
        })
}
