//! Board recognition and the solver boundary.

pub mod description;
pub mod extract;
pub mod recognize;
pub mod solver;

pub use description::{BoardDescription, Cell};
pub use recognize::{append_record, recognize, Recognition};
pub use solver::{parse_solution, tap_plan, Solver};
