//! Bookshelf application library
//!
//! The `books` module and the bootstrap that wires it to a document store, an
//! image store and the HTTP server.

pub mod bootstrap;
pub mod modules;

pub use bootstrap::{run, App};
