//! Module File Loader
//!
//! Reads module files from disk and hands the bytes to the registered
//! format parser.

use crate::mod_parser::{FormatParser, ModParser, Module};
use crate::Result;
use std::fs;
use std::path::Path;

/// Loads module files from disk
pub struct ModFileLoader;

impl ModFileLoader {
    /// Load and decode a module file
    pub fn load(path: impl AsRef<Path>) -> Result<Module> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "read module file");
        Self::load_from_bytes(&data)
    }

    /// Decode a module from bytes already in memory
    pub fn load_from_bytes(data: &[u8]) -> Result<Module> {
        let parser = ModParser;
        Ok(parser.parse(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mod_parser::tests::create_minimal_mod;
    use crate::{FormatError, ReplayerError};

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ModFileLoader::load("/nonexistent/path/song.mod");
        assert!(matches!(result, Err(ReplayerError::Io(_))));
    }

    #[test]
    fn test_load_from_bytes() {
        let data = create_minimal_mod(&[0, 1], 2, 2);
        let module = ModFileLoader::load_from_bytes(&data).unwrap();
        assert_eq!(module.patterns.len(), 2);
        assert_eq!(module.sequence.len(), 2);
    }

    #[test]
    fn test_format_error_is_wrapped() {
        let result = ModFileLoader::load_from_bytes(&[0u8; 64]);
        assert!(matches!(
            result,
            Err(ReplayerError::Format(FormatError::Truncated { .. }))
        ));
    }

    #[test]
    fn test_load_from_disk() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&create_minimal_mod(&[0], 1, 1)).unwrap();
        let module = ModFileLoader::load(file.path()).unwrap();
        assert_eq!(module.name, "test song");
    }
}
