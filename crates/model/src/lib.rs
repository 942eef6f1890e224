//! An abstraction layer for the LLM backends the tutor can talk to.
//!
//! This crate establishes an unified protocol for the orchestrators to
//! interact with a locally hosted model or a cloud model, so that the
//! user can switch between them without the core codebase noticing.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the backend implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
