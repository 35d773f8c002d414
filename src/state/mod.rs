//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `VisitedSet`: normalized page URLs claimed by a crawl session
//! - `ResourceSet`: discovered resources, streamed to the output sink once each

mod resources;
mod visited;

pub use resources::ResourceSet;
pub use visited::VisitedSet;
