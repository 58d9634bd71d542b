//! Cell reference parsing and formatting.
//!
//! Converts between spreadsheet-style references ("A1", "B2", "AA100") and
//! 1-based column/row coordinates, plus rectangular merge ranges ("A3:B3").
//!
//! # Examples
//!
//! ```
//! use tabula_engine::engine::CellRef;
//!
//! let cell: CellRef = "B3".parse().unwrap();
//! assert_eq!(cell.col, 2);
//! assert_eq!(cell.row, 3);
//! assert_eq!(cell.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]+)(?<numbers>[0-9]+)$").expect("A1 regex must compile")
    })
}

/// A reference to a cell by 1-based column and row.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(col: usize, row: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell reference from spreadsheet notation.
    /// Returns None if the input is invalid or names row/column zero.
    pub fn parse_a1(name: &str) -> Option<CellRef> {
        let caps = a1_re().captures(name.trim())?;
        let col = Self::letters_to_col(&caps["letters"])?;
        let row = caps["numbers"].parse::<usize>().ok()?;
        if row == 0 {
            return None;
        }
        Some(CellRef::new(col, row))
    }

    /// Convert column letters to a 1-based index (A -> 1, Z -> 26, AA -> 27).
    pub fn letters_to_col(letters: &str) -> Option<usize> {
        let mut col = 0usize;
        for c in letters.to_ascii_uppercase().bytes() {
            if !c.is_ascii_uppercase() {
                return None;
            }
            let digit = (c - b'A') as usize + 1;
            col = col.checked_mul(26)?.checked_add(digit)?;
        }
        (col > 0).then_some(col)
    }

    /// Convert a 1-based column index to letters (1 -> A, 26 -> Z, 27 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CellRef::col_to_letters(self.col), self.row)
    }
}

/// A merged cell range, stored with `start` at the top-left corner.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct MergeRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl MergeRange {
    /// Build a range from any two corners.
    pub fn new(a: CellRef, b: CellRef) -> MergeRange {
        MergeRange {
            start: CellRef::new(a.col.min(b.col), a.row.min(b.row)),
            end: CellRef::new(a.col.max(b.col), a.row.max(b.row)),
        }
    }

    /// True when the range lies entirely on `row`.
    pub fn is_within_row(&self, row: usize) -> bool {
        self.start.row == row && self.end.row == row
    }

    pub fn contains(&self, cell: &CellRef) -> bool {
        (self.start.col..=self.end.col).contains(&cell.col)
            && (self.start.row..=self.end.row).contains(&cell.row)
    }
}

impl std::str::FromStr for MergeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid merge range: {}", s))?;
        Ok(MergeRange::new(a.parse()?, b.parse()?))
    }
}

impl fmt::Display for MergeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}
