//! An article tutor wired to real backends.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring the tutor into your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod backend;
pub mod render;
mod session;
pub mod speech;

pub use backend::ProviderFactory;
pub use session::{Session, SessionBuilder};

/// Re-exports of [`tutor_core`] crate.
pub mod core {
    pub use tutor_core::*;
}
