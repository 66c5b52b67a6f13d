//! Concrete upstream integrations.

pub mod londonair;
