//! Verbatim copy tasks: loose files, plugins, folders and vendor assets.

use std::path::{Path, PathBuf};

use crate::context::BuildContext;
use crate::registry::{Destination, PathRegistry, VendorConfig, VendorCopy};
use crate::source::{SourceFile, SourceSet};
use crate::task::{Category, Task, TaskError, TaskReport};
use crate::tasks::{copy_file, is_source_map};

/// Copies one registry source set into a directory below the output root.
pub struct CopyTask {
    name: &'static str,
    sources: fn(&PathRegistry) -> SourceSet,
    destination: PathBuf,
}

impl CopyTask {
    /// Loose static files copied to the output root.
    pub fn others() -> Self {
        Self {
            name: "others",
            sources: PathRegistry::others,
            destination: PathBuf::new(),
        }
    }

    /// Plugin files copied to `plugins/`.
    pub fn plugins() -> Self {
        Self {
            name: "plugins",
            sources: PathRegistry::plugins,
            destination: PathBuf::from("plugins"),
        }
    }
}

impl Task for CopyTask {
    fn name(&self) -> &'static str {
        self.name
    }

    fn category(&self) -> Category {
        Category::Copy
    }

    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError> {
        let files = (self.sources)(ctx.registry()).resolve(ctx.root())?;
        if files.is_empty() {
            tracing::warn!("{}: no files matched", self.name);
        }

        let copied = copy_all(&files, &ctx.output_dir(&self.destination), ctx.is_production(), None)?;
        Ok(TaskReport::files(copied))
    }
}

/// Copies each configured folder below `src` into the output root.
#[derive(Debug, Default)]
pub struct FolderCopyTask;

impl Task for FolderCopyTask {
    fn name(&self) -> &'static str {
        "folders"
    }

    fn category(&self) -> Category {
        Category::Copy
    }

    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError> {
        let registry = ctx.registry();
        let mut copied = 0;

        for folder in &registry.paths.folders {
            let files = registry.folder(folder).resolve(ctx.root())?;
            if files.is_empty() {
                tracing::debug!("folders: {} is empty or missing", folder);
            }
            copied += copy_all(&files, &ctx.output_dir(folder), ctx.is_production(), None)?;
        }

        Ok(TaskReport::files(copied))
    }
}

/// Stages one vendor asset group into the sources or the output tree.
pub struct VendorTask {
    name: &'static str,
    select: fn(&VendorConfig) -> &VendorCopy,
}

impl VendorTask {
    pub fn icons_stylesheet() -> Self {
        Self {
            name: "icons-stylesheet",
            select: select_icons_stylesheet,
        }
    }

    pub fn icon_fonts() -> Self {
        Self {
            name: "icon-fonts",
            select: select_icon_fonts,
        }
    }

    pub fn bootstrap_styles() -> Self {
        Self {
            name: "bootstrap-styles",
            select: select_bootstrap_styles,
        }
    }

    pub fn bootstrap_script() -> Self {
        Self {
            name: "bootstrap-script",
            select: select_bootstrap_script,
        }
    }
}

fn select_icons_stylesheet(vendor: &VendorConfig) -> &VendorCopy {
    &vendor.icons_stylesheet
}

fn select_icon_fonts(vendor: &VendorConfig) -> &VendorCopy {
    &vendor.icon_fonts
}

fn select_bootstrap_styles(vendor: &VendorConfig) -> &VendorCopy {
    &vendor.bootstrap_styles
}

fn select_bootstrap_script(vendor: &VendorConfig) -> &VendorCopy {
    &vendor.bootstrap_script
}

impl Task for VendorTask {
    fn name(&self) -> &'static str {
        self.name
    }

    fn category(&self) -> Category {
        Category::Copy
    }

    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError> {
        let copy = (self.select)(&ctx.registry().vendor);
        let files = copy.sources().resolve(ctx.root())?;

        if files.is_empty() {
            tracing::warn!(
                "{}: nothing matched {} (are the vendor packages installed?)",
                self.name,
                copy.from.join(", ")
            );
            return Ok(TaskReport::default());
        }

        let rename = match (&copy.rename, files.len()) {
            (Some(rename), 1) => Some(rename.as_str()),
            (Some(rename), n) => {
                tracing::warn!("{}: ignoring rename to {} for {} files", self.name, rename, n);
                None
            }
            (None, _) => None,
        };

        // Sources are staged in full; only output copies drop maps in production.
        let (target, strip_maps) = match &copy.to {
            Destination::Source(dir) => (ctx.source_dir(dir), false),
            Destination::Output(dir) => (ctx.output_dir(dir), ctx.is_production()),
        };

        let copied = copy_all(&files, &target, strip_maps, rename)?;
        Ok(TaskReport::files(copied))
    }
}

/// Copy files below `target`, preserving their relative paths.
///
/// With `strip_maps` set, source maps are skipped.
fn copy_all(
    files: &[SourceFile],
    target: &Path,
    strip_maps: bool,
    rename: Option<&str>,
) -> Result<usize, TaskError> {
    let mut copied = 0;

    for file in files {
        if strip_maps && is_source_map(&file.path) {
            tracing::debug!("Skipping source map {}", file.path.display());
            continue;
        }

        let relative = match rename {
            Some(name) => file.relative.with_file_name(name),
            None => file.relative.clone(),
        };

        copy_file(&file.path, &target.join(relative))?;
        copied += 1;
    }

    Ok(copied)
}
