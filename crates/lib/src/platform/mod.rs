//! Platform-level layout of the files hatskit reads and writes.

pub mod paths;

pub use paths::Workspace;
