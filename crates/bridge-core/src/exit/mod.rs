pub mod classify;
pub mod policy;
