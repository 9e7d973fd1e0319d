//! Names of every file the engine owns.
//!
//! All files share the database name as a prefix, so a database called
//! `data/ASUKA` lives in `data/` as `ASUKA-000001.sst`, `ASUKA-MANIFEST-000007`,
//! `ASUKA-CURRENT`, and so on.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Kind of engine-owned file, recovered from a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Table(u64),
    Log(u64),
    Descriptor(u64),
    Temp(u64),
    Current,
}

fn with_suffix(db_name: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(db_name.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

pub fn table_file_name(db_name: &Path, number: u64) -> PathBuf {
    with_suffix(db_name, &format!("-{number:06}.sst"))
}

pub fn log_file_name(db_name: &Path, number: u64) -> PathBuf {
    with_suffix(db_name, &format!("-{number:06}.log"))
}

pub fn descriptor_file_name(db_name: &Path, number: u64) -> PathBuf {
    with_suffix(db_name, &format!("-MANIFEST-{number:06}"))
}

pub fn current_file_name(db_name: &Path) -> PathBuf {
    with_suffix(db_name, "-CURRENT")
}

pub fn temp_file_name(db_name: &Path, number: u64) -> PathBuf {
    with_suffix(db_name, &format!("-{number:06}.tmp"))
}

/// Directory holding the database files.
pub fn db_dir(db_name: &Path) -> &Path {
    match db_name.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Classify `file_name` (a bare name from the database directory). Files
/// belonging to other databases or other programs yield `None`.
pub fn parse_file_name(db_name: &Path, file_name: &str) -> Option<FileType> {
    let prefix = db_name.file_name()?.to_str()?;
    let rest = file_name.strip_prefix(prefix)?.strip_prefix('-')?;

    if rest == "CURRENT" {
        return Some(FileType::Current);
    }
    if let Some(number) = rest.strip_prefix("MANIFEST-") {
        return parse_number(number).map(FileType::Descriptor);
    }
    let (number, suffix) = rest.split_once('.')?;
    let number = parse_number(number)?;
    match suffix {
        "sst" => Some(FileType::Table(number)),
        "log" => Some(FileType::Log(number)),
        "tmp" => Some(FileType::Temp(number)),
        _ => None,
    }
}

fn parse_number(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_the_prefix_scheme() {
        let db = Path::new("data/ASUKA");
        assert_eq!(table_file_name(db, 12), PathBuf::from("data/ASUKA-000012.sst"));
        assert_eq!(log_file_name(db, 3), PathBuf::from("data/ASUKA-000003.log"));
        assert_eq!(
            descriptor_file_name(db, 7),
            PathBuf::from("data/ASUKA-MANIFEST-000007")
        );
        assert_eq!(current_file_name(db), PathBuf::from("data/ASUKA-CURRENT"));
        assert_eq!(temp_file_name(db, 7), PathBuf::from("data/ASUKA-000007.tmp"));
        assert_eq!(db_dir(db), Path::new("data"));
        assert_eq!(db_dir(Path::new("ASUKA")), Path::new("."));
    }

    #[test]
    fn parse_roundtrips_generated_names() {
        let db = Path::new("/tmp/db");
        assert_eq!(parse_file_name(db, "db-000012.sst"), Some(FileType::Table(12)));
        assert_eq!(parse_file_name(db, "db-000003.log"), Some(FileType::Log(3)));
        assert_eq!(parse_file_name(db, "db-MANIFEST-000007"), Some(FileType::Descriptor(7)));
        assert_eq!(parse_file_name(db, "db-000007.tmp"), Some(FileType::Temp(7)));
        assert_eq!(parse_file_name(db, "db-CURRENT"), Some(FileType::Current));
    }

    #[test]
    fn parse_ignores_foreign_files() {
        let db = Path::new("/tmp/db");
        assert_eq!(parse_file_name(db, "other-000012.sst"), None);
        assert_eq!(parse_file_name(db, "db-abc.sst"), None);
        assert_eq!(parse_file_name(db, "db-000012.txt"), None);
        assert_eq!(parse_file_name(db, "db-MANIFEST-"), None);
        assert_eq!(parse_file_name(db, "dbx-000001.sst"), None);
    }
}
