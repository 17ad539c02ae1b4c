//! Path registry and project settings.
//!
//! Everything here is plain data deserialized from `sitewright.toml`. Every
//! field has a default, so an empty file describes the stock project layout.

use std::path::PathBuf;

use serde::Deserialize;

use crate::source::SourceSet;

/// Where a vendor copy lands.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// A directory inside the project sources (staged before compilation)
    Source(PathBuf),
    /// A directory below the mode-selected output root
    Output(PathBuf),
}

/// A third-party file group staged into the sources or the output tree.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VendorCopy {
    /// Glob patterns relative to the project root
    pub from: Vec<String>,
    /// Target directory
    pub to: Destination,
    /// Rename for single-file copies
    #[serde(default)]
    pub rename: Option<String>,
}

impl VendorCopy {
    fn new(from: &[&str], to: Destination, rename: Option<&str>) -> Self {
        Self {
            from: from.iter().map(|s| s.to_string()).collect(),
            to,
            rename: rename.map(str::to_string),
        }
    }

    /// Source set for this copy.
    pub fn sources(&self) -> SourceSet {
        SourceSet::new(self.from.clone())
    }
}

/// Source globs and output roots.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of all project sources
    pub src: PathBuf,
    /// Page-level markup files
    pub html: Vec<String>,
    /// Partials (watched only; pages include them)
    pub partials: Vec<String>,
    /// Directory include directives resolve against
    pub include_dir: PathBuf,
    /// Plugin files copied verbatim
    pub plugins: Vec<String>,
    /// Script entries in bundle order
    pub scripts: Vec<String>,
    /// Top-level style entries
    pub styles: Vec<String>,
    /// Style files whose change triggers a recompile
    pub styles_watch: Vec<String>,
    /// Raster and vector images
    pub images: Vec<String>,
    /// Loose static files copied to the output root
    pub others: Vec<String>,
    /// Folders below `src` copied verbatim
    pub folders: Vec<String>,
    /// Development output root
    pub dev_dir: PathBuf,
    /// Production output root
    pub build_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();

        Self {
            src: PathBuf::from("src"),
            html: strings(&["src/**/*.html"]),
            partials: strings(&["src/partials/**/*.htm"]),
            include_dir: PathBuf::from("src/partials"),
            plugins: strings(&["src/plugins/**/*"]),
            scripts: strings(&[
                "src/js/common.js",
                "src/js/homepage.js",
                "src/js/vendor/*.js",
            ]),
            styles: strings(&["src/scss/*.scss"]),
            styles_watch: strings(&["src/scss/**/*.scss"]),
            images: strings(&["src/images/**/*.{png,jpg,jpeg,gif,svg}"]),
            others: strings(&["src/*.{php,ico,png,htaccess,xml}"]),
            folders: strings(&["data", "files"]),
            dev_dir: PathBuf::from("dev"),
            build_dir: PathBuf::from("build"),
        }
    }
}

/// Third-party assets staged at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VendorConfig {
    /// Icon stylesheet, staged as a Sass partial
    pub icons_stylesheet: VendorCopy,
    /// Icon font files
    pub icon_fonts: VendorCopy,
    /// Framework Sass sources
    pub bootstrap_styles: VendorCopy,
    /// Framework script bundle, staged into the script vendor folder
    pub bootstrap_script: VendorCopy,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            icons_stylesheet: VendorCopy::new(
                &["node_modules/bootstrap-icons/font/bootstrap-icons.scss"],
                Destination::Source(PathBuf::from("src/scss")),
                Some("_bootstrap-icons.scss"),
            ),
            icon_fonts: VendorCopy::new(
                &["node_modules/bootstrap-icons/font/fonts/**/*"],
                Destination::Output(PathBuf::from("css/fonts")),
                None,
            ),
            bootstrap_styles: VendorCopy::new(
                &["node_modules/bootstrap/scss/**/*"],
                Destination::Source(PathBuf::from("src/scss/bootstrap")),
                None,
            ),
            bootstrap_script: VendorCopy::new(
                &["node_modules/bootstrap/dist/js/bootstrap.bundle.min.js"],
                Destination::Source(PathBuf::from("src/js/vendor")),
                None,
            ),
        }
    }
}

/// Site-wide output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Attribution text prepended to production HTML, CSS and JS
    pub attribution: String,
    /// File name of the script bundle
    pub bundle: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            attribution: "built with sitewright".to_string(),
            bundle: "app.js".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Transpile target, e.g. "es2015"
    pub target: String,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            target: "es2015".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// JPEG re-encode quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { jpeg_quality: 85 }
    }
}

/// What a sequence does when a task fails.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the sequence and report the error
    Halt,
    /// Log the error and run the next task
    Continue,
}

/// Per-category failure policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FailureConfig {
    pub clean: FailurePolicy,
    pub html: FailurePolicy,
    pub styles: FailurePolicy,
    pub scripts: FailurePolicy,
    pub images: FailurePolicy,
    pub copy: FailurePolicy,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            clean: FailurePolicy::Halt,
            html: FailurePolicy::Halt,
            styles: FailurePolicy::Continue,
            scripts: FailurePolicy::Halt,
            images: FailurePolicy::Halt,
            copy: FailurePolicy::Halt,
        }
    }
}

/// The complete registry a build runs against.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathRegistry {
    pub paths: PathsConfig,
    pub vendor: VendorConfig,
    pub site: SiteConfig,
    pub scripts: ScriptsConfig,
    pub images: ImagesConfig,
    pub failure: FailureConfig,
}

impl PathRegistry {
    pub fn html(&self) -> SourceSet {
        SourceSet::new(self.paths.html.clone())
    }

    pub fn partials(&self) -> SourceSet {
        SourceSet::new(self.paths.partials.clone())
    }

    pub fn plugins(&self) -> SourceSet {
        SourceSet::new(self.paths.plugins.clone())
    }

    pub fn scripts(&self) -> SourceSet {
        SourceSet::new(self.paths.scripts.clone())
    }

    pub fn styles(&self) -> SourceSet {
        SourceSet::new(self.paths.styles.clone())
    }

    pub fn styles_watch(&self) -> SourceSet {
        SourceSet::new(self.paths.styles_watch.clone())
    }

    pub fn images(&self) -> SourceSet {
        SourceSet::new(self.paths.images.clone())
    }

    pub fn others(&self) -> SourceSet {
        SourceSet::new(self.paths.others.clone())
    }

    /// Source set for one of the verbatim-copied folders.
    pub fn folder(&self, folder: &str) -> SourceSet {
        let pattern = format!("{}/{}/**/*", glob_path(&self.paths.src), folder);
        SourceSet::new(vec![pattern])
    }
}

/// Render a relative path with forward slashes for use in a glob.
fn glob_path(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "/").trim_end_matches('/').to_string()
}
