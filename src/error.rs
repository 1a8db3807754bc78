use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Whether a failed file operation was reading or writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => f.write_str("read from"),
            Access::Write => f.write_str("write to"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CaptionError {
    #[error("missing required arguments: --input-image and --output-image")]
    Usage,

    #[error("no caption text provided (pass --text or pipe text on stdin)")]
    MissingInput,

    #[error("\"{}\" is a directory", .0.display())]
    InvalidPath(PathBuf),

    #[error("couldn't {access} \"{}\"", .path.display())]
    Permission { path: PathBuf, access: Access },

    #[error("couldn't read from \"{}\"", .0.display())]
    NotFound(PathBuf),

    #[error("template error: {0}")]
    Template(String),

    #[error("unsupported screenshot format: {0}")]
    UnsupportedFormat(String),

    #[error("screenshot failed: {0}")]
    Screenshot(String),

    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl CaptionError {
    /// Map an I/O failure on `path` to the user-facing taxonomy.
    ///
    /// Directory, permission and missing-path failures become their own
    /// variants; anything else stays an unclassified `Io` error.
    pub fn from_io(err: io::Error, path: &Path, access: Access) -> Self {
        match err.kind() {
            io::ErrorKind::IsADirectory => CaptionError::InvalidPath(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => CaptionError::Permission {
                path: path.to_path_buf(),
                access,
            },
            io::ErrorKind::NotFound => CaptionError::NotFound(path.to_path_buf()),
            _ => CaptionError::Io(format!("{}: {}", path.display(), err)),
        }
    }

    /// True for the file/path errors that carry a one-line user message.
    pub fn is_classified(&self) -> bool {
        matches!(
            self,
            CaptionError::InvalidPath(_)
                | CaptionError::Permission { .. }
                | CaptionError::NotFound(_)
        )
    }

    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl From<io::Error> for CaptionError {
    fn from(err: io::Error) -> Self {
        CaptionError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CaptionError {
    fn from(err: serde_json::Error) -> Self {
        CaptionError::Serialization(err.to_string())
    }
}

impl From<tera::Error> for CaptionError {
    fn from(err: tera::Error) -> Self {
        // tera keeps the interesting part (missing variable, bad syntax) in the source chain
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        CaptionError::Template(message)
    }
}

impl From<chromiumoxide::error::CdpError> for CaptionError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        CaptionError::Screenshot(err.to_string())
    }
}
