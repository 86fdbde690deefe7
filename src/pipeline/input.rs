//! Input validation: check a user-supplied path before handing it to pdfium.
//!
//! pdfium reports a missing or non-PDF file as an opaque load error. Checking
//! existence, readability and the `%PDF` magic bytes up front gives callers a
//! precise [`CutError`] instead.

use crate::error::CutError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a local PDF path and return it as an owned `PathBuf`.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<PathBuf, CutError> {
    let path = path.as_ref().to_path_buf();

    if !path.is_file() {
        return Err(CutError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            match f.read_exact(&mut magic) {
                Ok(()) if &magic == b"%PDF" => {}
                Ok(()) => return Err(CutError::NotAPdf { path, magic }),
                // Shorter than four bytes.
                Err(_) => return Err(CutError::NotAPdf { path, magic }),
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(CutError::PermissionDenied { path });
        }
        Err(_) => return Err(CutError::FileNotFound { path }),
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file() {
        let err = resolve_input("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, CutError::FileNotFound { .. }));
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_input(dir.path()).unwrap_err();
        assert!(matches!(err, CutError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04rest").unwrap();
        let err = resolve_input(f.path()).unwrap_err();
        assert!(matches!(err, CutError::NotAPdf { magic, .. } if &magic == b"PK\x03\x04"));
    }

    #[test]
    fn too_short() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        assert!(matches!(
            resolve_input(f.path()),
            Err(CutError::NotAPdf { .. })
        ));
    }

    #[test]
    fn pdf_magic_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n").unwrap();
        assert_eq!(resolve_input(f.path()).unwrap(), f.path());
    }
}
