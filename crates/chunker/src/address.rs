//! A1 notation helpers.
//!
//! Columns map to 0-based indices with base-26 letter arithmetic
//! (A=0 … Z=25, AA=26 …). Rows are 1-based in A1 text and 0-based here.

use crate::error::{ChunkerError, Result};
use std::fmt;

/// Excel's widest column is XFD, three letters.
const MAX_COLUMN_LETTERS: usize = 3;

/// Convert column index to letter(s): 0 -> A, 25 -> Z, 26 -> AA, etc.
#[must_use]
pub fn column_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col + 1;
    while n > 0 {
        n -= 1;
        result.insert(0, char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    result
}

/// Convert column letters to a 0-based index: A -> 0, AA -> 26.
#[must_use]
pub fn letters_to_column(letters: &str) -> Option<usize> {
    if letters.is_empty() || letters.len() > MAX_COLUMN_LETTERS {
        return None;
    }

    let mut col = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
        col = col * 26 + digit;
    }
    Some(col - 1)
}

/// A single cell position (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: usize,
    pub col: usize,
}

impl CellAddress {
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parse "B7" or "$B$7".
    pub fn parse(text: &str) -> Result<Self> {
        let cleaned: String = text.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| ChunkerError::invalid_address(text))?;
        let (letters, digits) = cleaned.split_at(split);

        let col = letters_to_column(letters).ok_or_else(|| ChunkerError::invalid_address(text))?;
        let row: usize = digits
            .parse()
            .map_err(|_| ChunkerError::invalid_address(text))?;
        if row == 0 {
            return Err(ChunkerError::invalid_address(text));
        }

        Ok(Self::new(row - 1, col))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.col), self.row + 1)
    }
}

/// A rectangular, inclusive cell range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct A1Range {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl A1Range {
    /// Build a range from inclusive 0-based bounds, normalising corner order.
    #[must_use]
    pub fn from_bounds(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        Self {
            start: CellAddress::new(top.min(bottom), left.min(right)),
            end: CellAddress::new(top.max(bottom), left.max(right)),
        }
    }

    /// Parse "A1:C10", "$A$1:$C$10" or a single cell "B2".
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let mut parts = trimmed.split(':');
        let first = parts.next().ok_or_else(|| ChunkerError::invalid_range(text))?;
        let second = parts.next();
        if parts.next().is_some() {
            return Err(ChunkerError::invalid_range(text));
        }

        let start = CellAddress::parse(first).map_err(|_| ChunkerError::invalid_range(text))?;
        let end = match second {
            Some(s) => CellAddress::parse(s).map_err(|_| ChunkerError::invalid_range(text))?,
            None => start,
        };

        Ok(Self::from_bounds(start.row, start.col, end.row, end.col))
    }

    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.end.row - self.start.row + 1
    }

    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.end.col - self.start.col + 1
    }

    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.row_count() * self.column_count()
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Split `Sheet1!A1:B2` / `'My Sheet'!A1` into sheet name and range text.
///
/// A leading `=` is accepted. Doubled quotes inside quoted names are unescaped.
#[must_use]
pub fn split_sheet_qualified(reference: &str) -> Option<(String, &str)> {
    let reference = reference.trim();
    let reference = reference.strip_prefix('=').unwrap_or(reference);
    let bang = reference.rfind('!')?;
    let (sheet_part, rest) = reference.split_at(bang);
    let range = &rest[1..];

    let sheet = if let Some(quoted) = sheet_part.strip_prefix('\'') {
        quoted.strip_suffix('\'')?.replace("''", "'")
    } else {
        sheet_part.to_string()
    };

    if sheet.is_empty() || range.is_empty() {
        return None;
    }
    Some((sheet, range))
}
