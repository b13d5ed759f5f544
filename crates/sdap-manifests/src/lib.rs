//! Composition of the Kubernetes manifests of an SDAP (nexus) deployment.
//!
//! [`composer::compose`] takes the layered [`config::Values`], decides which resources are part of
//! the deployment and renders them into a consistent [`composer::Bundle`].
pub mod builder;
#[cfg(feature = "clap")]
pub mod cli;
pub mod composer;
pub mod config;
pub mod crd;
pub mod derived;
pub mod kvp;
pub mod logging;
pub mod manifest;
pub mod selector;
pub mod templates;
pub mod validation;
pub mod yaml;

pub use composer::{Bundle, compose};
