use std::{
    fs::{self, File},
    io::{self, Cursor, Read},
    path::{Component, Path, PathBuf},
};

use crate::{
    report::{EntryError, EntryOutcome, ExtractionResult},
    rewrite::RewriteSpec,
    trace,
};

/// Errors that abort extraction. Files written before the error stay on disk.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("archive is corrupted: {0}")]
    CorruptArchive(#[source] zip::result::ZipError),

    #[error("failed to read '{path}' from archive: {source}")]
    ReadFailed { path: String, source: io::Error },
}

/// A zip archive held in memory.
pub struct Archive<'a> {
    inner: zip::ZipArchive<Cursor<&'a [u8]>>,
}

/// A read-only view of one archive member.
pub struct ArchiveEntry<'a> {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    content: Box<dyn Read + 'a>,
}

impl ArchiveEntry<'_> {
    /// Reads the whole entry into memory.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::ReadFailed`] if the entry data is damaged.
    pub fn read_content(&mut self) -> Result<Vec<u8>, FatalError> {
        let mut buf = Vec::with_capacity(usize::try_from(self.size).unwrap_or_default());
        self.content
            .read_to_end(&mut buf)
            .map_err(|source| FatalError::ReadFailed {
                path: self.path.clone(),
                source,
            })?;

        Ok(buf)
    }
}

impl<'a> Archive<'a> {
    /// # Errors
    ///
    /// Returns [`FatalError::CorruptArchive`] if `bytes` is not a zip archive.
    pub fn open(bytes: &'a [u8]) -> Result<Self, FatalError> {
        let inner =
            zip::ZipArchive::new(Cursor::new(bytes)).map_err(FatalError::CorruptArchive)?;

        Ok(Self { inner })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Returns the entry at `index`, in the order stored in the archive.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::ReadFailed`] if the entry header can not be read.
    pub fn entry(&mut self, index: usize) -> Result<ArchiveEntry<'_>, FatalError> {
        let file = self
            .inner
            .by_index(index)
            .map_err(|e| FatalError::ReadFailed {
                path: format!("#{index}"),
                source: io::Error::other(e),
            })?;

        Ok(ArchiveEntry {
            path: file.name().to_owned(),
            is_dir: file.is_dir(),
            size: file.size(),
            content: Box::new(file),
        })
    }
}

/// Where an archive path lands relative to the destination root.
#[derive(Debug, PartialEq, Eq)]
pub enum Stripped {
    /// The entry is the wrapper directory itself.
    Root,
    Relative(PathBuf),
}

/// Drops the first `/`-delimited segment of an archive path.
///
/// Returns `None` when the path has no second segment, is absolute after
/// stripping or tries to climb out with `..`.
#[must_use]
pub fn strip_wrapper(path: &str) -> Option<Stripped> {
    let (_, rest) = path.split_once('/')?;

    let mut relative = PathBuf::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s => relative.push(s),
        }
    }

    if rest.starts_with('/')
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    if relative.as_os_str().is_empty() {
        Some(Stripped::Root)
    } else {
        Some(Stripped::Relative(relative))
    }
}

/// Extracts `archive` under `destination`, replacing the search term of
/// `rewrite` in every regular file.
///
/// `destination` must already exist. Entries are processed one by one in
/// archive order; problems with a single entry are recorded in the returned
/// [`ExtractionResult`] and the next entry is processed.
///
/// # Errors
///
/// Returns [`FatalError::CorruptArchive`] before anything is written if the
/// bytes are not a zip archive and [`FatalError::ReadFailed`] if an entry's
/// data can not be read.
pub fn extract_and_rewrite(
    archive: &[u8],
    destination: &Path,
    rewrite: &RewriteSpec,
) -> Result<ExtractionResult, FatalError> {
    let mut archive = Archive::open(archive)?;
    let mut result = ExtractionResult::default();

    for index in 0..archive.len() {
        let mut entry = archive.entry(index)?;

        let relative = match strip_wrapper(&entry.path) {
            Some(Stripped::Relative(relative)) => relative,
            Some(Stripped::Root) if entry.is_dir => {
                result.push(EntryOutcome::skipped(&entry.path));
                continue;
            }
            Some(Stripped::Root) | None => {
                trace!("Skipping malformed entry: {}", entry.path);
                let error = EntryError::MalformedPath(entry.path.clone());
                result.push(EntryOutcome::failed(&entry.path, error));
                continue;
            }
        };

        let target = destination.join(relative);

        let outcome = if entry.is_dir {
            match create_dir(&target) {
                Ok(()) => EntryOutcome::created(&entry.path, 0),
                Err(e) => EntryOutcome::failed(&entry.path, e),
            }
        } else {
            write_file(&mut entry, &target, rewrite)?
        };

        result.push(outcome);
    }

    Ok(result)
}

fn create_dir(path: &Path) -> Result<(), EntryError> {
    fs::create_dir_all(path).map_err(|source| EntryError::DirectoryCreateFailed {
        path: path.to_owned(),
        source,
    })
}

fn write_file(
    entry: &mut ArchiveEntry<'_>,
    target: &Path,
    rewrite: &RewriteSpec,
) -> Result<EntryOutcome, FatalError> {
    // Archives are not required to list parent directories.
    if let Some(parent) = target.parent() {
        if let Err(e) = create_dir(parent) {
            return Ok(EntryOutcome::failed(&entry.path, e));
        }
    }

    let file = match File::create(target) {
        Ok(file) => file,
        Err(source) => {
            let error = EntryError::FileCreateFailed {
                path: target.to_owned(),
                source,
            };
            return Ok(EntryOutcome::failed(&entry.path, error));
        }
    };

    trace!("Writing file: {}", entry.path);

    let content = entry.read_content()?;
    let replaced = rewrite.apply(&content);

    if replaced.occurrences() > 0 {
        trace!("Found '{}' in file: {}", rewrite.search_term(), entry.path);
    }

    let written = replaced
        .write_to(io::BufWriter::new(&file))
        .and_then(|()| file.set_len(replaced.len() as u64));

    match written {
        Ok(()) => Ok(EntryOutcome::created(&entry.path, replaced.occurrences())),
        Err(source) => Ok(EntryOutcome::failed(
            &entry.path,
            EntryError::FileWriteFailed {
                path: target.to_owned(),
                source,
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Outcome;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_of(entries: &[(&str, Option<&str>)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        for (name, contents) in entries {
            match contents {
                Some(contents) => {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(contents.as_bytes()).unwrap();
                }
                None => writer.add_directory(*name, options).unwrap(),
            }
        }

        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn strips_first_segment() {
        assert_eq!(
            strip_wrapper("octo-tpl-1a2b3c/src/main.rs"),
            Some(Stripped::Relative(PathBuf::from("src/main.rs")))
        );
        assert_eq!(
            strip_wrapper("octo-tpl-1a2b3c/src/"),
            Some(Stripped::Relative(PathBuf::from("src")))
        );
        assert_eq!(strip_wrapper("octo-tpl-1a2b3c/"), Some(Stripped::Root));
    }

    #[test]
    fn rejects_paths_without_second_segment() {
        assert_eq!(strip_wrapper("README.md"), None);
        assert_eq!(strip_wrapper(""), None);
    }

    #[test]
    fn rejects_escaping_paths() {
        assert_eq!(strip_wrapper("wrapper/../etc/passwd"), None);
        assert_eq!(strip_wrapper("wrapper//etc/passwd"), None);
        assert_eq!(strip_wrapper("wrapper/a/../../b"), None);
    }

    #[test]
    fn corrupt_archive_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let spec = RewriteSpec::new("a", "b");

        let err = extract_and_rewrite(b"definitely not a zip", dir.path(), &spec).unwrap_err();

        assert!(matches!(err, FatalError::CorruptArchive(_)), "{err}");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn extracts_and_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = zip_of(&[
            ("wrapper/", None),
            ("wrapper/README.md", Some("Welcome to my-template")),
            ("wrapper/src/", None),
            ("wrapper/src/index.js", Some("console.log(1);\n")),
        ]);
        let spec = RewriteSpec::new("my-template", "cool-app");

        let result = extract_and_rewrite(&bytes, dir.path(), &spec).unwrap();

        assert!(result.is_clean());
        assert_eq!(result.count(Outcome::Skipped), 1);
        assert_eq!(result.count(Outcome::Created), 3);
        assert_eq!(
            fs::read_to_string(dir.path().join("README.md")).unwrap(),
            "Welcome to cool-app"
        );
        assert_eq!(
            fs::read(dir.path().join("src/index.js")).unwrap(),
            b"console.log(1);\n"
        );
    }

    #[test]
    fn creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = zip_of(&[("wrapper/a/b/c.txt", Some("deep"))]);

        let result = extract_and_rewrite(&bytes, dir.path(), &RewriteSpec::new("x", "y")).unwrap();

        assert!(result.is_clean());
        assert_eq!(fs::read(dir.path().join("a/b/c.txt")).unwrap(), b"deep");
    }

    #[test]
    fn malformed_entries_do_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = zip_of(&[
            ("stray.txt", Some("no wrapper")),
            ("wrapper/kept.txt", Some("kept")),
        ]);

        let result = extract_and_rewrite(&bytes, dir.path(), &RewriteSpec::new("x", "y")).unwrap();

        assert_eq!(result.entries[0].outcome, Outcome::Failed);
        assert!(matches!(
            result.entries[0].error,
            Some(EntryError::MalformedPath(_))
        ));
        assert_eq!(result.entries[1].outcome, Outcome::Created);
        assert!(!dir.path().join("stray.txt").exists());
        assert!(dir.path().join("kept.txt").exists());
    }

    #[test]
    fn overwrites_larger_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "x".repeat(4096)).unwrap();
        let bytes = zip_of(&[("wrapper/Cargo.toml", Some("name = \"template-name\""))]);

        extract_and_rewrite(&bytes, dir.path(), &RewriteSpec::new("template-name", "app")).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("Cargo.toml")).unwrap(),
            "name = \"app\""
        );
    }

    #[test]
    fn damaged_entry_data_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let payload = b"stored payload guarded by crc";

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("wrapper/data.bin", options).unwrap();
        writer.write_all(payload).unwrap();
        let mut bytes = writer.finish().unwrap().into_inner();

        let at = bytes
            .windows(payload.len())
            .position(|w| w == payload)
            .unwrap();
        bytes[at] ^= 0xff;

        let err = extract_and_rewrite(&bytes, dir.path(), &RewriteSpec::new("x", "y")).unwrap_err();

        match err {
            FatalError::ReadFailed { path, .. } => assert_eq!(path, "wrapper/data.bin"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn failed_directory_does_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the directory should go.
        fs::write(dir.path().join("src"), "in the way").unwrap();
        let bytes = zip_of(&[("wrapper/src/", None), ("wrapper/next.txt", Some("next"))]);

        let result = extract_and_rewrite(&bytes, dir.path(), &RewriteSpec::new("x", "y")).unwrap();

        assert_eq!(result.entries[0].outcome, Outcome::Failed);
        assert!(matches!(
            result.entries[0].error,
            Some(EntryError::DirectoryCreateFailed { .. })
        ));
        assert_eq!(result.entries[1].outcome, Outcome::Created);
        assert_eq!(fs::read(dir.path().join("next.txt")).unwrap(), b"next");
    }

    #[test]
    fn records_replacement_counts() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = zip_of(&[("wrapper/a.txt", Some("tpl tpl tpl"))]);

        let spec = RewriteSpec::new("tpl", "app");
        let result = extract_and_rewrite(&bytes, dir.path(), &spec).unwrap();

        assert_eq!(result.get("wrapper/a.txt").unwrap().replacements, 3);
        assert_eq!(result.rewritten(), 1);
    }
}
