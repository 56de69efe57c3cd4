use anyhow::{anyhow, ensure, Context};
use std::path::{Path, PathBuf};

use crate::{
    extract::{extract_and_rewrite, FatalError},
    fetch::{ArchiveRequest, FetchError, Fetcher},
    report::ExtractionResult,
    rewrite::RewriteSpec,
    trace,
};

#[derive(Debug, thiserror::Error)]
pub enum ScaffoldError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] FatalError),
}

/// Downloads `request` and extracts it into `destination`, rewriting the
/// template identifier as it goes.
///
/// Nothing is written when the download fails.
///
/// # Errors
///
/// Returns [`ScaffoldError::Fetch`] if the archive could not be downloaded and
/// [`ScaffoldError::Extract`] if it could not be read.
pub fn scaffold(
    fetcher: &Fetcher,
    request: &ArchiveRequest,
    destination: &Path,
    rewrite: &RewriteSpec,
) -> Result<ExtractionResult, ScaffoldError> {
    let archive = fetcher.fetch(request)?;

    trace!(
        "Extracting {} bytes into {}",
        archive.len(),
        destination.display()
    );

    Ok(extract_and_rewrite(&archive, destination, rewrite)?)
}

/// Checks that `name` can be used both as a directory name and as the
/// replacement for the template identifier.
///
/// # Errors
///
/// Returns an [`Err`] if the name is blank, `.`/`..`, or contains a path separator.
pub fn validate_project_name(name: &str) -> anyhow::Result<()> {
    ensure!(!name.trim().is_empty(), anyhow!("Project name can't be empty"));
    ensure!(
        name.trim() == name,
        anyhow!("Project name can't start or end with whitespace")
    );
    ensure!(
        name != "." && name != "..",
        anyhow!("Project name can't be '{name}'")
    );
    ensure!(
        !name.contains(['/', '\\']),
        anyhow!("Project name can't contain path separators")
    );

    Ok(())
}

/// Creates `<parent>/<name>` and returns its path.
///
/// # Errors
///
/// Returns an [`Err`] if the path exists and is not a directory, exists and is
/// not empty while `overwrite` is unset, or can't be created.
pub fn create_project_dir(parent: &Path, name: &str, overwrite: bool) -> anyhow::Result<PathBuf> {
    validate_project_name(name)?;

    let root = parent.join(name);

    if root.exists() {
        ensure!(
            root.is_dir(),
            anyhow!("Path {} exists but is not a directory", root.display())
        );

        let empty = root
            .read_dir()
            .with_context(|| format!("Failed to read {}", root.display()))?
            .next()
            .is_none();

        ensure!(
            empty || overwrite,
            anyhow!(
                "Directory {} already exists and is not empty. Use --overwrite to write into it",
                root.display()
            )
        );
    }

    std::fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create directory {}", root.display()))?;

    Ok(root)
}
