use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort the run before diagnostics even get a chance to
/// run (§7: "I/O errors... fatal, exit 1").
#[derive(Debug, Error)]
pub enum Error {
    #[error("reading \"{}\" failed: {source}", path.display())]
    ReadInput { path: PathBuf, source: std::io::Error },

    #[error("writing \"{}\" failed: {source}", path.display())]
    WriteOutput { path: PathBuf, source: std::io::Error },
}
