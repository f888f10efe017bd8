//! Video annotation engine: viewport fitting, resolution-independent
//! shapes, timeline range selection, preview sampling over a shared
//! decode resource, and the comment store with its persistence service.

pub mod comments;
pub mod error;
pub mod geometry;
pub mod timeline;
pub mod video;
pub mod web;

pub use error::{AnnotateError, AnnotateResult};
