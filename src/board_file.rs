//! The board file format.
//!
//! ```text
//! G C R
//! C*R cells, '*' alive and '.' dead
//! ```
//!
//! `G` is the number of generations, `C` the columns and `R` the rows.
//! Characters other than `*` and `.` after the header are ignored, so the
//! cells may be laid out one row per line or all on one line.

use std::fs;
use std::path::Path;

use crate::error::{LifeError, Result};
use crate::grid::{Board, ALIVE, DEAD};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardFile {
    pub generations: u32,
    pub board: Board,
}

fn next_header<'a>(rest: &mut &'a str, name: &str) -> Result<usize> {
    let trimmed = rest.trim_start();
    let end = trimmed
        .find(char::is_whitespace)
        .unwrap_or(trimmed.len());
    let (token, tail) = trimmed.split_at(end);
    *rest = tail;
    if token.is_empty() {
        return Err(LifeError::Parse(format!("missing {}", name)));
    }
    token
        .parse()
        .map_err(|_| LifeError::Parse(format!("{} must be a non-negative integer, got {:?}", name, token)))
}

impl BoardFile {
    pub fn parse(text: &str) -> Result<Self> {
        let mut rest = text;
        let generations = next_header(&mut rest, "generation count")?;
        let columns = next_header(&mut rest, "column count")?;
        let rows = next_header(&mut rest, "row count")?;

        let generations = u32::try_from(generations)
            .map_err(|_| LifeError::Parse(format!("{} generations is too many", generations)))?;
        if columns == 0 || rows == 0 {
            return Err(LifeError::Parse(format!(
                "board must be at least 1x1, got {}x{}",
                columns, rows
            )));
        }

        let expected = columns.checked_mul(rows).ok_or_else(|| {
            LifeError::Parse(format!("a {}x{} board has too many cells", columns, rows))
        })?;
        let cells: Vec<u8> = rest
            .chars()
            .filter_map(|c| match c {
                '*' => Some(ALIVE),
                '.' => Some(DEAD),
                _ => None,
            })
            .take(expected)
            .collect();
        if cells.len() < expected {
            return Err(LifeError::Parse(format!(
                "expected {} cells for a {}x{} board, found {}",
                expected,
                columns,
                rows,
                cells.len()
            )));
        }

        Ok(Self {
            generations,
            board: Board::from_cells(columns, rows, cells)?,
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }
}
