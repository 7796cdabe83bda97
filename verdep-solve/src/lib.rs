#![doc = include_str!("../README.md")]

mod digest;
mod error;
mod queue;
mod satisfy;
mod selection;
mod solution;
mod solver;
mod types;

pub use error::{Error, SolveFailure};
pub use solution::Solution;
pub use solver::{SolveParameters, Solver, StdlibPredicate};
pub use types::{Atom, Dependency};
