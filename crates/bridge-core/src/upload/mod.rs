//! Post-run uploads. None of these feed back into the exit outcome.

pub mod artifact;
pub mod sarif;
