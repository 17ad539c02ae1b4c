//! Script transpilation and bundling.
//!
//! Entries are transpiled one by one with oxc and concatenated in declared
//! order, after the definitions of any transform helpers they call.
//! Development bundles carry an index source map whose sections are the
//! per-file maps; production bundles are minified and headered.

use std::path::Path;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{HelperLoaderMode, TransformOptions, Transformer};
use serde_json::{json, Value};

use crate::context::BuildContext;
use crate::header::{self, CommentStyle};
use crate::task::{Category, Task, TaskError, TaskReport};
use crate::tasks::{read_source, script_helpers, write_output};

/// Bundles every script entry into `js/<bundle>`.
#[derive(Debug, Default)]
pub struct ScriptTask;

/// One transpiled entry.
#[derive(Debug, Clone)]
pub struct TranspiledScript {
    pub code: String,
    /// Source map JSON, when requested
    pub map: Option<String>,
}

impl Task for ScriptTask {
    fn name(&self) -> &'static str {
        "scripts"
    }

    fn category(&self) -> Category {
        Category::Scripts
    }

    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError> {
        let registry = ctx.registry();
        let bundle_name = &registry.site.bundle;
        let options = transform_options(&registry.scripts.target).map_err(|message| {
            TaskError::ScriptError {
                path: format!("target '{}'", registry.scripts.target),
                message,
            }
        })?;

        let entries = registry.scripts().resolve(ctx.root())?;
        let with_maps = !ctx.is_production();

        let mut transpiled = Vec::with_capacity(entries.len());
        for entry in &entries {
            let source = read_source(&entry.path)?;
            let map_source = entry.path.strip_prefix(ctx.root()).unwrap_or(&entry.path);
            let script = transpile(map_source, &source, &options, with_maps).map_err(|message| {
                TaskError::ScriptError {
                    path: entry.path.display().to_string(),
                    message,
                }
            })?;
            tracing::debug!("Transpiled {}", entry.path.display());
            transpiled.push(script);
        }

        let js_dir = ctx.output_dir("js");
        let target = js_dir.join(bundle_name);

        let mut bundle = script_helpers::prelude(transpiled.iter().map(|s| s.code.as_str()))
            .map_err(|message| TaskError::ScriptError {
                path: target.display().to_string(),
                message,
            })?;
        let mut sections = Vec::new();

        for (index, (entry, script)) in entries.iter().zip(transpiled).enumerate() {
            if index > 0 {
                bundle.push('\n');
            }

            if let Some(map) = script.map {
                let line = bundle.matches('\n').count();
                let map: Value = serde_json::from_str(&map).map_err(|e| TaskError::ScriptError {
                    path: entry.path.display().to_string(),
                    message: format!("invalid source map: {}", e),
                })?;
                sections.push(json!({
                    "offset": { "line": line, "column": 0 },
                    "map": map,
                }));
            }

            bundle.push_str(&script.code);
        }

        if entries.is_empty() {
            tracing::warn!("No script entries matched; writing an empty bundle");
        }

        if ctx.is_production() {
            let minified = minify(&bundle).map_err(|message| TaskError::ScriptError {
                path: target.display().to_string(),
                message,
            })?;
            let output = header::prepend(CommentStyle::Block, &registry.site.attribution, &minified);
            write_output(&target, output)?;
            return Ok(TaskReport::files(1));
        }

        let map_name = format!("{}.map", bundle_name);
        let index_map = json!({
            "version": 3,
            "file": bundle_name,
            "sections": sections,
        });
        let map_json = serde_json::to_string(&index_map).map_err(|e| TaskError::WriteError {
            path: map_name.clone(),
            message: e.to_string(),
        })?;

        if !bundle.is_empty() && !bundle.ends_with('\n') {
            bundle.push('\n');
        }
        bundle.push_str(&format!("//# sourceMappingURL={}\n", map_name));

        write_output(&target, bundle)?;
        write_output(&js_dir.join(&map_name), map_json)?;

        Ok(TaskReport::files(2))
    }
}

/// Transform options for a syntax target such as `es2015`.
///
/// Helper calls go through a `babelHelpers` global that the bundle defines
/// itself, so every entry runs from a plain `<script>` tag.
pub fn transform_options(target: &str) -> Result<TransformOptions, String> {
    let mut options = TransformOptions::from_target(target).map_err(|e| e.to_string())?;
    options.helper_loader.mode = HelperLoaderMode::External;
    Ok(options)
}

/// Transpile one script to the configured syntax target.
///
/// `source_path` names the file inside the emitted source map.
pub fn transpile(
    source_path: &Path,
    source: &str,
    options: &TransformOptions,
    with_map: bool,
) -> Result<TranspiledScript, String> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if let Some(error) = parsed.errors.first() {
        return Err(error.to_string());
    }

    let mut program = parsed.program;
    let scoping = SemanticBuilder::new()
        .build(&program)
        .semantic
        .into_scoping();

    let transformed =
        Transformer::new(&allocator, source_path, options).build_with_scoping(scoping, &mut program);
    if let Some(error) = transformed.errors.first() {
        return Err(error.to_string());
    }

    let generated = Codegen::new()
        .with_options(CodegenOptions {
            source_map_path: with_map.then(|| source_path.to_path_buf()),
            ..CodegenOptions::default()
        })
        .build(&program);

    Ok(TranspiledScript {
        code: generated.code,
        map: generated.map.map(|map| map.to_json_string()),
    })
}

/// Compress and mangle a bundle.
fn minify(source: &str) -> Result<String, String> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if let Some(error) = parsed.errors.first() {
        return Err(error.to_string());
    }

    let mut program = parsed.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;

    Ok(code)
}
