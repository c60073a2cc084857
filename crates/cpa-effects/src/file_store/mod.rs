//! File-store handlers

pub mod local;

pub use local::{LocalFileStoreHandler, LocalFileStoreSession};
