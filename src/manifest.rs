//! Descriptor files and the CURRENT pointer.
//!
//! A descriptor (`{db}-MANIFEST-{n:06}`) holds one encoded `Version`. The
//! CURRENT file names the descriptor to load on open; it is replaced by
//! writing a temp file and renaming it over the old one, so a crash leaves
//! either the old or the new pointer in place.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::filename::{current_file_name, db_dir, descriptor_file_name, temp_file_name};

/// Write and fsync descriptor `number`.
pub fn write_descriptor(db_name: &Path, number: u64, data: &[u8]) -> Result<()> {
    let mut file = File::create(descriptor_file_name(db_name, number))?;
    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}

pub fn read_descriptor(db_name: &Path, number: u64) -> Result<Vec<u8>> {
    Ok(fs::read(descriptor_file_name(db_name, number))?)
}

/// Point CURRENT at descriptor `number`.
pub fn set_current_file(db_name: &Path, number: u64) -> Result<()> {
    let tmp = temp_file_name(db_name, number);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(number.to_string().as_bytes())?;
        file.sync_all()?;
    }
    if let Err(e) = fs::rename(&tmp, current_file_name(db_name)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    sync_dir(db_dir(db_name))
}

/// Descriptor number CURRENT points at, or `None` for a fresh database.
pub fn read_current_file(db_name: &Path) -> Result<Option<u64>> {
    let contents = match fs::read_to_string(current_file_name(db_name)) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    contents
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::Corruption(format!("CURRENT holds {contents:?}")))
}

/// Make a rename durable by syncing the directory that holds it.
fn sync_dir(dir: &Path) -> Result<()> {
    #[cfg(unix)]
    File::open(dir)?.sync_all()?;
    #[cfg(not(unix))]
    let _ = dir;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn current_file_roundtrip() {
        let dir = tempdir().unwrap();
        let db_name = dir.path().join("db");
        assert_eq!(read_current_file(&db_name).unwrap(), None);

        set_current_file(&db_name, 7).unwrap();
        assert_eq!(read_current_file(&db_name).unwrap(), Some(7));
        set_current_file(&db_name, 12).unwrap();
        assert_eq!(read_current_file(&db_name).unwrap(), Some(12));

        // The temp file is gone after the rename.
        assert!(!temp_file_name(&db_name, 12).exists());
        assert_eq!(fs::read_to_string(current_file_name(&db_name)).unwrap(), "12");
    }

    #[test]
    fn garbage_current_is_corruption() {
        let dir = tempdir().unwrap();
        let db_name = dir.path().join("db");
        fs::write(current_file_name(&db_name), "not a number").unwrap();
        assert!(matches!(read_current_file(&db_name), Err(Error::Corruption(_))));
    }

    #[test]
    fn descriptor_roundtrip() {
        let dir = tempdir().unwrap();
        let db_name = dir.path().join("db");
        write_descriptor(&db_name, 3, b"catalog").unwrap();
        assert_eq!(read_descriptor(&db_name, 3).unwrap(), b"catalog");
        assert!(read_descriptor(&db_name, 4).is_err());
    }
}
