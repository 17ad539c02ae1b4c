//! Initialize a project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Starter files, relative to the project root.
const STARTER_FILES: &[(&str, &str)] = &[
    ("src/index.html", DEFAULT_INDEX),
    ("src/partials/header.htm", DEFAULT_HEADER),
    ("src/scss/main.scss", DEFAULT_STYLES),
    ("src/js/common.js", DEFAULT_COMMON_JS),
    ("src/js/homepage.js", DEFAULT_HOMEPAGE_JS),
];

/// Run the init command.
pub async fn run(root: &Path, config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing sitewright...");

    if config_path.exists() && !yes {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite.",
            config_path.display()
        );
        return Ok(());
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).context("Failed to create project directory")?;
    }
    fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    tracing::info!("Created {}", config_path.display());

    for (rel, contents) in STARTER_FILES {
        let path = root.join(rel);
        if path.exists() && !yes {
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", rel))?;
        tracing::info!("Created {}", rel);
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'sitewright' to start the development server.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Sitewright Configuration
#
# Every setting is optional; the values below are the defaults.

[paths]
src = "src"
html = ["src/**/*.html"]
partials = ["src/partials/**/*.htm"]
include_dir = "src/partials"
plugins = ["src/plugins/**/*"]
# Bundle order follows this list
scripts = ["src/js/common.js", "src/js/homepage.js", "src/js/vendor/*.js"]
styles = ["src/scss/*.scss"]
styles_watch = ["src/scss/**/*.scss"]
images = ["src/images/**/*.{png,jpg,jpeg,gif,svg}"]
others = ["src/*.{php,ico,png,htaccess,xml}"]
folders = ["data", "files"]
dev_dir = "dev"
build_dir = "build"

[vendor.icons_stylesheet]
from = ["node_modules/bootstrap-icons/font/bootstrap-icons.scss"]
to = { source = "src/scss" }
rename = "_bootstrap-icons.scss"

[vendor.icon_fonts]
from = ["node_modules/bootstrap-icons/font/fonts/**/*"]
to = { output = "css/fonts" }

[vendor.bootstrap_styles]
from = ["node_modules/bootstrap/scss/**/*"]
to = { source = "src/scss/bootstrap" }

[vendor.bootstrap_script]
from = ["node_modules/bootstrap/dist/js/bootstrap.bundle.min.js"]
to = { source = "src/js/vendor" }

[site]
# Prepended to production HTML, CSS and JS
attribution = "built with sitewright"
bundle = "app.js"

[scripts]
target = "es2015"

[images]
jpeg_quality = 85

[server]
port = 3000
host = "127.0.0.1"
open = true

# "halt" stops the sequence, "continue" logs and moves on
[failure]
clean = "halt"
html = "halt"
styles = "continue"
scripts = "halt"
images = "halt"
copy = "halt"
"#;

const DEFAULT_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>Home</title>
    <link rel="stylesheet" href="css/main.css">
  </head>
  <body>
    @@include('header.htm', {"title": "Welcome"})
    <main>
      <p>Edit src/index.html to get started.</p>
    </main>
    <script src="js/app.js"></script>
  </body>
</html>
"#;

const DEFAULT_HEADER: &str = r#"<header>
  <h1>@@title</h1>
</header>
"#;

const DEFAULT_STYLES: &str = r#"$accent: #0d6efd;

body {
  margin: 0;
  font-family: system-ui, sans-serif;
}

header h1 {
  color: $accent;
}
"#;

const DEFAULT_COMMON_JS: &str = r#"const ready = (fn) => document.addEventListener('DOMContentLoaded', fn);
"#;

const DEFAULT_HOMEPAGE_JS: &str = r#"ready(() => {
  document.body.classList.add('loaded');
});
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_config_and_starter_site() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("sitewright.toml");

        run(temp.path(), &config_path, false).await.unwrap();

        assert!(config_path.exists());
        for (rel, _) in STARTER_FILES {
            assert!(temp.path().join(rel).exists(), "{rel} missing");
        }
    }

    #[test]
    fn default_config_matches_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sitewright.toml");
        fs::write(&path, DEFAULT_CONFIG).unwrap();

        let loaded = config::load(&path).unwrap();
        let defaults = sitewright_pipeline::PathRegistry::default();

        assert_eq!(loaded.registry.paths.scripts, defaults.paths.scripts);
        assert_eq!(loaded.registry.vendor.icon_fonts, defaults.vendor.icon_fonts);
        assert_eq!(loaded.registry.vendor.icons_stylesheet, defaults.vendor.icons_stylesheet);
        assert_eq!(loaded.registry.failure.styles, defaults.failure.styles);
        assert_eq!(loaded.server.port, 3000);
    }

    #[tokio::test]
    async fn keeps_existing_config_without_yes() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("sitewright.toml");
        fs::write(&config_path, "# mine\n").unwrap();

        run(temp.path(), &config_path, false).await.unwrap();

        assert_eq!(fs::read_to_string(&config_path).unwrap(), "# mine\n");
    }
}
