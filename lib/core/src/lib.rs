//! Core identifiers and error handling shared by the pathway crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{EdgeId, NodeId, ParseIdError, WorkflowId};
