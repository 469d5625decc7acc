#![warn(missing_docs)]
//! # siphon-backend
//!
//! Storage backends for Siphon's shared state: cached resolutions and
//! per-caller rate counters.
//!
//! The [`Backend`] trait is a small key-value interface over raw bytes with
//! a compare-and-swap primitive, so limiter and cache state can be backed by
//! memory, a directory of files, or an external store interchangeably.
//! [`BackendExt`] layers typed JSON accessors on top.
//!
//! Two implementations ship here:
//!
//! - [`MemoryBackend`] - dashmap-based, per-process, with real CAS
//! - [`FileBackend`] - one file per key under a root directory; survives
//!   process restart, CAS is read-compare-write (see its docs for the
//!   tolerated race)

pub mod backend;
pub mod error;
pub mod file;
pub mod memory;

pub use backend::{Backend, BackendExt, BackendResult, DeleteStatus, Raw};
pub use error::BackendError;
pub use file::FileBackend;
pub use memory::MemoryBackend;
