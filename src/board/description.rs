//! Text description of a recognized board, as read by the solver.
//!
//! ```text
//! 5 5
//! ??R?? 1
//! ...
//! 1 0 2 1 1
//! ```
//!
//! The first line is `rows cols`, then one line per row of `R` (tree) and
//! `?` (unknown) followed by a space and the row clue, then the column clues
//! separated by single spaces.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Tree,
    Unknown,
}

impl Cell {
    fn symbol(self) -> char {
        match self {
            Cell::Tree => 'R',
            Cell::Unknown => '?',
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardDescription {
    pub cells: Vec<Vec<Cell>>,
    pub row_clues: Vec<String>,
    pub col_clues: Vec<String>,
}

impl BoardDescription {
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn lines(&self) -> Vec<String> {
        let size = self.size();
        let mut lines = Vec::with_capacity(size + 2);
        lines.push(format!("{} {}", size, size));
        for (row, clue) in self.cells.iter().zip(&self.row_clues) {
            let cells: String = row.iter().map(|c| c.symbol()).collect();
            lines.push(format!("{} {}", cells, clue));
        }
        lines.push(self.col_clues.join(" "));
        lines
    }
}

impl fmt::Display for BoardDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
