//! Create projects from template repositories hosted on GitHub or a compatible
//! service.
//!
//! The template is downloaded as a zip archive, the archive's top level folder
//! is dropped and every occurrence of the template identifier in file contents
//! is replaced with the new project's name:
//!
//! ```no_run
//! use ::scaffold::{scaffold, ArchiveRequest, Fetcher, RewriteSpec};
//!
//! let request = ArchiveRequest::new("smokeyblues", "aws-sstv4-notes", "main");
//! let rewrite = RewriteSpec::new("aws-sstv4-notes", "notes");
//!
//! std::fs::create_dir_all("notes")?;
//! let result = scaffold(&Fetcher::default(), &request, "notes".as_ref(), &rewrite)?;
//! assert!(result.is_clean());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod args;
pub mod config;
pub mod extract;
pub mod fetch;
mod log;
pub mod prompt;
pub mod report;
pub mod rewrite;
pub mod scaffold;

pub use extract::{extract_and_rewrite, FatalError};
pub use fetch::{ArchiveRequest, FetchError, Fetcher};
pub use report::{EntryError, EntryOutcome, ExtractionResult, Outcome};
pub use rewrite::RewriteSpec;
pub use scaffold::{scaffold, ScaffoldError};
