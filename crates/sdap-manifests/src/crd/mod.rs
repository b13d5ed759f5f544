//! Custom resources which are part of a composition.
pub mod git_based_config;
