//! HTML page assembly.

use minify_html::Cfg;

use crate::context::BuildContext;
use crate::header::{self, CommentStyle};
use crate::include::IncludeResolver;
use crate::task::{Category, Task, TaskError, TaskReport};
use crate::tasks::{read_source, write_output};

/// Inlines partials into every page and writes the result to the output root.
#[derive(Debug, Default)]
pub struct HtmlTask;

impl Task for HtmlTask {
    fn name(&self) -> &'static str {
        "html"
    }

    fn category(&self) -> Category {
        Category::Html
    }

    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError> {
        let registry = ctx.registry();
        let resolver = IncludeResolver::new(ctx.source_dir(&registry.paths.include_dir));
        let pages = registry.html().resolve(ctx.root())?;
        let output_root = ctx.output_root();

        for page in &pages {
            let source = read_source(&page.path)?;
            let mut html = resolver.expand(&source, &page.path)?;

            if ctx.is_production() {
                html = collapse_whitespace(&html);
                html = header::prepend(CommentStyle::Html, &registry.site.attribution, &html);
            }

            let target = output_root.join(&page.relative);
            write_output(&target, html)?;
            tracing::debug!("Wrote {}", target.display());
        }

        Ok(TaskReport::files(pages.len()))
    }
}

/// Collapse insignificant whitespace while keeping the document structure.
fn collapse_whitespace(html: &str) -> String {
    let mut cfg = Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = true;
    cfg.do_not_minify_doctype = true;
    cfg.keep_spaces_between_attributes = true;

    let minified = minify_html::minify(html.as_bytes(), &cfg);
    String::from_utf8_lossy(&minified).into_owned()
}
