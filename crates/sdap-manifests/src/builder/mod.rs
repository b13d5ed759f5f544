//! This module provides builders for various (Kubernetes) objects.
//!
//! They are often not _pure_ builders but contain extra logic to reject inconsistent objects, such
//! as two different volumes sharing a name.
//!
pub mod meta;
pub mod pod;
