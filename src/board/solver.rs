//! Boundary to the external `tents-demo` solver.
//!
//! The solver is run as `<bin> stdin`, reads a board description on stdin and
//! prints tent positions as `r,c|r,c|...` on stdout.

use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::description::BoardDescription;
use crate::calibration::CellBounds;
use crate::error::FatalError;

pub struct Solver {
    bin: PathBuf,
}

impl Solver {
    /// Fails when the binary does not exist.
    pub fn new(bin: impl Into<PathBuf>) -> Result<Self> {
        let bin = bin.into();
        if !bin.is_file() {
            return Err(FatalError::SolverUnavailable { path: bin }.into());
        }
        Ok(Self { bin })
    }

    /// Returns tent positions as `(row, col)`.
    pub fn solve(&self, desc: &BoardDescription) -> Result<Vec<(usize, usize)>> {
        crate::log(&format!("Running solver: {}", self.bin.display()));
        let mut child = Command::new(&self.bin)
            .arg("stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start solver: {}", self.bin.display()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Solver stdin not captured"))?;
        stdin
            .write_all(desc.to_string().as_bytes())
            .context("Failed to write board to solver")?;
        drop(stdin);

        let output = child.wait_with_output().context("Failed to wait for solver")?;
        if !output.status.success() {
            return Err(anyhow!(
                "Solver exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let positions = parse_solution(&String::from_utf8_lossy(&output.stdout))?;
        crate::log(&format!("Received {} tent position(s)", positions.len()));

        let size = desc.size();
        if let Some(&(r, c)) = positions.iter().find(|&&(r, c)| r >= size || c >= size) {
            return Err(anyhow!("Solver placed a tent at {},{} outside a {}x{} board", r, c, size, size));
        }
        Ok(positions)
    }
}

/// Parses `r,c|r,c|...`; surrounding whitespace is ignored and empty
/// output means no tents.
pub fn parse_solution(output: &str) -> Result<Vec<(usize, usize)>> {
    let output = output.trim();
    if output.is_empty() {
        return Ok(Vec::new());
    }

    output
        .split('|')
        .map(|pair| -> Result<(usize, usize)> {
            let (r, c) = pair
                .split_once(',')
                .ok_or_else(|| anyhow!("Malformed tent position: {:?}", pair))?;
            let r = r.trim().parse().with_context(|| format!("Bad row in {:?}", pair))?;
            let c = c.trim().parse().with_context(|| format!("Bad column in {:?}", pair))?;
            Ok((r, c))
        })
        .collect()
}

/// Screen points to tap: every tent cell's center, twice (the first tap
/// marks the cell as grass, the second as a tent).
pub fn tap_plan(bounds: &CellBounds, tents: &[(usize, usize)]) -> Vec<(u32, u32)> {
    tents
        .iter()
        .flat_map(|&(r, c)| {
            let center = bounds.center(r, c);
            [center, center]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cell;
    use crate::test_utils::BoardSpec;
    use tempfile::tempdir;

    #[test]
    fn test_parse_solution() {
        assert_eq!(parse_solution("0,1|2,3\n").unwrap(), vec![(0, 1), (2, 3)]);
        assert_eq!(parse_solution("  \n").unwrap(), vec![]);
        assert!(parse_solution("0,1|2").is_err());
        assert!(parse_solution("a,1").is_err());
    }

    #[test]
    fn test_missing_binary_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tents-demo");

        let err = Solver::new(&path).err().unwrap();

        assert_eq!(
            err.downcast_ref::<FatalError>(),
            Some(&FatalError::SolverUnavailable { path })
        );
    }

    #[test]
    fn test_tap_plan() {
        let bounds = BoardSpec::new(5).cell_bounds();

        let plan = tap_plan(&bounds, &[(0, 0), (4, 1)]);

        assert_eq!(plan, vec![(86, 156), (86, 156), (140, 372), (140, 372)]);
    }

    #[cfg(unix)]
    #[test]
    fn test_solve_with_script() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let bin = dir.path().join("tents-demo");
        std::fs::write(&bin, "#!/bin/sh\n[ \"$1\" = stdin ] || exit 2\ncat > /dev/null\necho '0,1|1,0'\n").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let desc = BoardDescription {
            cells: vec![vec![Cell::Tree; 2]; 2],
            row_clues: vec!["1".into(), "1".into()],
            col_clues: vec!["1".into(), "1".into()],
        };

        let tents = Solver::new(&bin).unwrap().solve(&desc).unwrap();
        assert_eq!(tents, vec![(0, 1), (1, 0)]);
    }
}
