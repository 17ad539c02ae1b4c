//! Asset tasks.

pub mod clean;
pub mod copy;
pub mod html;
pub mod images;
pub mod script_helpers;
pub mod scripts;
pub mod styles;

use std::fs;
use std::path::Path;

use crate::task::TaskError;

pub use clean::CleanTask;
pub use copy::{CopyTask, FolderCopyTask, VendorTask};
pub use html::HtmlTask;
pub use images::ImageTask;
pub use scripts::ScriptTask;
pub use styles::StyleTask;

/// Read a UTF-8 source file.
pub(crate) fn read_source(path: &Path) -> Result<String, TaskError> {
    fs::read_to_string(path).map_err(|e| TaskError::ReadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Write `contents`, creating parent directories as needed.
pub(crate) fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TaskError::WriteError {
            path: parent.display().to_string(),
            message: e.to_string(),
        })?;
    }

    fs::write(path, contents).map_err(|e| TaskError::WriteError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Copy one file, creating parent directories as needed.
pub(crate) fn copy_file(from: &Path, to: &Path) -> Result<(), TaskError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| TaskError::WriteError {
            path: parent.display().to_string(),
            message: e.to_string(),
        })?;
    }

    fs::copy(from, to).map_err(|e| TaskError::WriteError {
        path: to.display().to_string(),
        message: e.to_string(),
    })?;

    Ok(())
}

/// Whether a path is a source map (a development-only artifact).
pub(crate) fn is_source_map(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("map")
}
