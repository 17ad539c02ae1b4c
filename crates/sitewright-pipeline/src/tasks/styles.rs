//! Style compilation.
//!
//! Each top-level entry is compiled with grass, then run through lightningcss
//! for vendor prefixing against a fixed browser set. Production output is
//! minified and headered; development output is expanded and gets a source
//! map next to it.

use std::path::{Path, PathBuf};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;

use crate::context::BuildContext;
use crate::header::{self, CommentStyle};
use crate::source::SourceFile;
use crate::task::{Category, Task, TaskError, TaskReport};
use crate::tasks::write_output;

/// Compiles every style entry into `css/`.
#[derive(Debug, Default)]
pub struct StyleTask;

/// Browsers the prefixer targets, encoded as `major << 16`.
fn browser_targets() -> Targets {
    Targets::from(Browsers {
        chrome: Some(90 << 16),
        edge: Some(90 << 16),
        firefox: Some(88 << 16),
        safari: Some(13 << 16),
        ios_saf: Some(13 << 16),
        samsung: Some(14 << 16),
        opera: Some(76 << 16),
        android: Some(90 << 16),
        ..Browsers::default()
    })
}

/// Output of one compiled entry.
struct CompiledStyle {
    css: String,
    map: Option<String>,
}

impl Task for StyleTask {
    fn name(&self) -> &'static str {
        "styles"
    }

    fn category(&self) -> Category {
        Category::Styles
    }

    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError> {
        let entries: Vec<SourceFile> = ctx
            .registry()
            .styles()
            .resolve(ctx.root())?
            .into_iter()
            .filter(|f| !is_partial(&f.path))
            .collect();

        let css_dir = ctx.output_dir("css");
        let mut written = 0;
        let mut failures = Vec::new();

        for entry in &entries {
            let css_name = entry.relative.with_extension("css");
            let target = css_dir.join(&css_name);

            let compiled = match compile(ctx, entry, &css_name) {
                Ok(compiled) => compiled,
                Err(message) => {
                    tracing::error!("{}: {}", entry.path.display(), message);
                    failures.push(format!("{}: {}", entry.path.display(), message));
                    continue;
                }
            };

            match compiled.map {
                Some(map) => {
                    let map_path = map_path_for(&target);
                    let map_name = map_path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or_default()
                        .to_string();
                    let css = format!("{}\n/*# sourceMappingURL={} */\n", compiled.css, map_name);
                    write_output(&target, css)?;
                    write_output(&map_path, map)?;
                    written += 2;
                }
                None => {
                    write_output(&target, compiled.css)?;
                    written += 1;
                }
            }

            tracing::debug!("Wrote {}", target.display());
        }

        if failures.is_empty() {
            Ok(TaskReport::files(written))
        } else {
            Err(TaskError::StyleErrors(failures))
        }
    }
}

fn compile(ctx: &BuildContext, entry: &SourceFile, css_name: &Path) -> Result<CompiledStyle, String> {
    let mut options = grass::Options::default()
        .style(grass::OutputStyle::Expanded)
        .quiet(true)
        .load_path(ctx.root().join("node_modules"));
    if let Some(parent) = entry.path.parent() {
        options = options.load_path(parent);
    }

    let css = grass::from_path(&entry.path, &options).map_err(|e| e.to_string())?;

    let mut stylesheet = StyleSheet::parse(
        &css,
        ParserOptions {
            filename: css_name.display().to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;

    stylesheet
        .minify(MinifyOptions {
            targets: browser_targets(),
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;

    if ctx.is_production() {
        let result = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                targets: browser_targets(),
                ..PrinterOptions::default()
            })
            .map_err(|e| e.to_string())?;

        let attribution = &ctx.registry().site.attribution;
        return Ok(CompiledStyle {
            css: header::prepend(CommentStyle::Block, attribution, &result.code),
            map: None,
        });
    }

    // The embedded content is grass output, not the Sass source.
    let source_name = format!(
        "{} (compiled)",
        entry
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("style.scss")
    );
    let mut source_map = SourceMap::new("/");
    let index = source_map.add_source(&source_name);
    source_map
        .set_source_content(index as usize, &css)
        .map_err(|e| format!("{:?}", e))?;

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: false,
            targets: browser_targets(),
            source_map: Some(&mut source_map),
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let map = source_map.to_json(None).map_err(|e| format!("{:?}", e))?;

    Ok(CompiledStyle {
        css: result.code,
        map: Some(map),
    })
}

/// Sass partials (`_name.scss`) are only compiled through imports.
fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

fn map_path_for(css: &Path) -> PathBuf {
    let mut name = css.file_name().unwrap_or_default().to_os_string();
    name.push(".map");
    css.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Mode;
    use crate::tasks::testing::{context, tree, write};
    use std::fs;
    use tempfile::tempdir;

    fn site() -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/scss/_vars.scss", "$accent: #ff0000;\n");
        write(
            temp.path(),
            "src/scss/main.scss",
            "@import 'vars';\n.card {\n  color: $accent;\n  user-select: none;\n}\n",
        );
        temp
    }

    #[test]
    fn development_writes_css_and_map() {
        let temp = site();

        StyleTask.run(&context(temp.path(), Mode::Development)).unwrap();

        let css_dir = temp.path().join("dev/css");
        assert_eq!(tree(&css_dir), vec!["main.css", "main.css.map"]);

        let css = fs::read_to_string(css_dir.join("main.css")).unwrap();
        assert!(css.contains(".card"));
        assert!(css.contains("-webkit-user-select"));
        assert!(css.contains("sourceMappingURL=main.css.map"));
        assert!(!css.contains("built with sitewright"));
    }

    #[test]
    fn development_map_names_compiled_source() {
        let temp = site();

        StyleTask.run(&context(temp.path(), Mode::Development)).unwrap();

        let map: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(temp.path().join("dev/css/main.css.map")).unwrap(),
        )
        .unwrap();
        assert_eq!(map["sources"], serde_json::json!(["main.scss (compiled)"]));

        let content = map["sourcesContent"][0].as_str().unwrap();
        assert!(content.contains("color: #ff0000"));
        assert!(!content.contains("$accent"));
    }

    #[test]
    fn production_minifies_without_maps() {
        let temp = site();

        StyleTask.run(&context(temp.path(), Mode::Production)).unwrap();

        let css_dir = temp.path().join("build/css");
        assert_eq!(tree(&css_dir), vec!["main.css"]);

        let css = fs::read_to_string(css_dir.join("main.css")).unwrap();
        assert!(css.starts_with("/*\n  built with sitewright\n*/\n"));
        assert!(css.contains(".card{"));
        assert!(!css.contains("sourceMappingURL"));
    }

    #[test]
    fn source_maps_are_deterministic() {
        let temp = site();
        let ctx = context(temp.path(), Mode::Development);
        let map_path = temp.path().join("dev/css/main.css.map");

        StyleTask.run(&ctx).unwrap();
        let first = fs::read_to_string(&map_path).unwrap();
        StyleTask.run(&ctx).unwrap();
        let second = fs::read_to_string(&map_path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn compile_error_is_reported_after_other_entries() {
        let temp = site();
        write(temp.path(), "src/scss/broken.scss", ".x { color: $undefined; }\n");

        let err = StyleTask
            .run(&context(temp.path(), Mode::Development))
            .unwrap_err();

        match err {
            TaskError::StyleErrors(failures) => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].contains("broken.scss"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(temp.path().join("dev/css/main.css").exists());
    }
}
