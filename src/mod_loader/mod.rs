//! Module File Loader Domain
//!
//! Handles file I/O for loading M.K. modules from disk. Decoding itself is
//! delegated to [`mod_parser`](crate::mod_parser), which never touches the
//! filesystem.

pub mod loader;

pub use loader::ModFileLoader;

use crate::mod_parser::Module;
use crate::Result;
use std::path::Path;

/// Convenience function to load a module file from disk
pub fn load_file(path: impl AsRef<Path>) -> Result<Module> {
    ModFileLoader::load(path)
}

/// Convenience function to decode a module already held in memory
pub fn load_bytes(data: &[u8]) -> Result<Module> {
    ModFileLoader::load_from_bytes(data)
}
