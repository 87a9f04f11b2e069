//! On-disk Bridge installations: layout, probing, fetching and extraction.

pub mod extract;
pub mod fetch;
pub mod layout;
