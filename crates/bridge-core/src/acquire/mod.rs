//! Bridge acquisition: what to fetch, from where, and whether to fetch at all.

pub mod decision;
pub mod repository;
pub mod request;
pub mod resolve;
