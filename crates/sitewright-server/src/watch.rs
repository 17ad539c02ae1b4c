//! Re-run asset tasks when sources change and notify browsers.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::Receiver;

use sitewright_pipeline::{
    run_task,
    tasks::{CopyTask, HtmlTask, ImageTask, ScriptTask, StyleTask},
    BuildContext, PathRegistry, Task,
};

use crate::reload::{ReloadHub, ReloadMessage};
use crate::server::ServerError;
use crate::watcher::FileWatcher;

/// How long after the first change further changes join its batch.
const DEBOUNCE: Duration = Duration::from_millis(150);

/// What a changed source file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WatchCategory {
    Html,
    Partials,
    Scripts,
    Images,
    Styles,
    Others,
}

impl WatchCategory {
    pub const ALL: [WatchCategory; 6] = [
        WatchCategory::Html,
        WatchCategory::Partials,
        WatchCategory::Scripts,
        WatchCategory::Images,
        WatchCategory::Styles,
        WatchCategory::Others,
    ];

    fn matches(self, registry: &PathRegistry, relative: &Path) -> bool {
        let set = match self {
            WatchCategory::Html => registry.html(),
            WatchCategory::Partials => registry.partials(),
            WatchCategory::Scripts => registry.scripts(),
            WatchCategory::Images => registry.images(),
            WatchCategory::Styles => registry.styles_watch(),
            WatchCategory::Others => registry.others(),
        };
        set.matches(relative)
    }

    /// The asset task to re-run. Partials rebuild the pages.
    fn rerun(self) -> Rerun {
        match self {
            WatchCategory::Html | WatchCategory::Partials => Rerun::Html,
            WatchCategory::Scripts => Rerun::Scripts,
            WatchCategory::Images => Rerun::Images,
            WatchCategory::Styles => Rerun::Styles,
            WatchCategory::Others => Rerun::Others,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rerun {
    Html,
    Images,
    Styles,
    Scripts,
    Others,
}

impl Rerun {
    fn task(self) -> Arc<dyn Task> {
        match self {
            Rerun::Html => Arc::new(HtmlTask),
            Rerun::Images => Arc::new(ImageTask),
            Rerun::Styles => Arc::new(StyleTask),
            Rerun::Scripts => Arc::new(ScriptTask),
            Rerun::Others => Arc::new(CopyTask::others()),
        }
    }
}

/// Categories a path relative to the project root belongs to.
pub fn classify(registry: &PathRegistry, relative: &Path) -> Vec<WatchCategory> {
    WatchCategory::ALL
        .into_iter()
        .filter(|category| category.matches(registry, relative))
        .collect()
}

/// Wait for a change, then collect every change arriving within `window`.
///
/// Returns `None` once the channel is closed and drained.
async fn next_batch(rx: &mut Receiver<PathBuf>, window: Duration) -> Option<Vec<PathBuf>> {
    let mut batch = vec![rx.recv().await?];
    let deadline = Instant::now() + window;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Some(path)) => batch.push(path),
            Ok(None) | Err(_) => break,
        }
    }

    Some(batch)
}

/// Watches the source root and drives incremental rebuilds.
pub struct WatchLoop {
    ctx: BuildContext,
    hub: ReloadHub,
    root: PathBuf,
}

impl WatchLoop {
    pub fn new(ctx: BuildContext, hub: ReloadHub) -> Self {
        // notify reports canonical paths.
        let root = ctx
            .root()
            .canonicalize()
            .unwrap_or_else(|_| ctx.root().to_path_buf());
        Self { ctx, hub, root }
    }

    /// Watch until the watcher shuts down.
    pub async fn run(self) -> Result<(), ServerError> {
        let src = self.ctx.source_dir(&self.ctx.registry().paths.src);
        let (watcher, mut rx) =
            FileWatcher::new(&[src]).map_err(|e| ServerError::WatchError(e.to_string()))?;

        tracing::info!("Watching for changes...");

        while let Some(batch) = next_batch(&mut rx, DEBOUNCE).await {
            self.handle_batch(&batch).await;
        }

        drop(watcher);
        Ok(())
    }

    /// Re-run the tasks affected by `paths` and notify browsers.
    ///
    /// Returns the message broadcast, if any task ran successfully.
    pub async fn handle_batch(&self, paths: &[PathBuf]) -> Option<ReloadMessage> {
        let registry = self.ctx.registry();
        let mut reruns = BTreeSet::new();

        for path in paths {
            let relative = self.relative(path);
            for category in classify(registry, &relative) {
                tracing::debug!("{} changed ({:?})", relative.display(), category);
                reruns.insert(category.rerun());
            }
        }

        if reruns.is_empty() {
            return None;
        }

        let mut succeeded = 0;
        for rerun in &reruns {
            let task = rerun.task();
            let name = task.name();
            let start = Instant::now();

            match run_task(task, self.ctx.clone()).await {
                Ok(report) => {
                    succeeded += 1;
                    tracing::info!(
                        "Rebuilt {} ({} files, {}ms)",
                        name,
                        report.files,
                        start.elapsed().as_millis()
                    );
                }
                Err(e) => tracing::error!("Task {} failed: {}", name, e),
            }
        }

        if succeeded == 0 {
            return None;
        }

        let msg = if reruns.iter().all(|r| *r == Rerun::Styles) {
            ReloadMessage::Css
        } else {
            ReloadMessage::Reload
        };
        self.hub.send(msg.clone());
        Some(msg)
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .or_else(|_| path.strip_prefix(self.ctx.root()))
            .unwrap_or(path)
            .to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewright_pipeline::Mode;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn watch_loop(root: &Path) -> (WatchLoop, ReloadHub) {
        let hub = ReloadHub::new();
        let ctx = BuildContext::new(root, Mode::Development, Arc::new(PathRegistry::default()));
        (WatchLoop::new(ctx, hub.clone()), hub)
    }

    #[test]
    fn classifies_by_registry_globs() {
        let registry = PathRegistry::default();

        assert_eq!(
            classify(&registry, Path::new("src/about.html")),
            vec![WatchCategory::Html]
        );
        assert_eq!(
            classify(&registry, Path::new("src/partials/header.htm")),
            vec![WatchCategory::Partials]
        );
        assert_eq!(
            classify(&registry, Path::new("src/scss/components/_nav.scss")),
            vec![WatchCategory::Styles]
        );
        assert_eq!(
            classify(&registry, Path::new("src/js/vendor/slider.js")),
            vec![WatchCategory::Scripts]
        );
        assert_eq!(
            classify(&registry, Path::new("src/images/logo.svg")),
            vec![WatchCategory::Images]
        );
        assert_eq!(
            classify(&registry, Path::new("src/favicon.ico")),
            vec![WatchCategory::Others]
        );
    }

    #[test]
    fn ignores_unwatched_files() {
        let registry = PathRegistry::default();

        assert!(classify(&registry, Path::new("src/data/prices.json")).is_empty());
        assert!(classify(&registry, Path::new("README.md")).is_empty());
    }

    #[tokio::test]
    async fn style_change_swaps_css() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/scss/main.scss", "$c: red;\n.a { color: $c; }\n");
        write(temp.path(), "src/scss/_vars.scss", "$x: 1;\n");

        let (watch, hub) = watch_loop(temp.path());
        let mut rx = hub.subscribe();

        let msg = watch
            .handle_batch(&[temp.path().join("src/scss/_vars.scss")])
            .await;

        assert_eq!(msg, Some(ReloadMessage::Css));
        assert_eq!(rx.try_recv().unwrap(), ReloadMessage::Css);
        assert!(temp.path().join("dev/css/main.css").exists());
    }

    #[tokio::test]
    async fn partial_change_rebuilds_pages() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/partials/footer.htm", "<footer>v2</footer>");
        write(
            temp.path(),
            "src/index.html",
            "<body>@@include('footer.htm')</body>",
        );

        let (watch, _hub) = watch_loop(temp.path());

        let msg = watch
            .handle_batch(&[
                temp.path().join("src/partials/footer.htm"),
                temp.path().join("src/scss/main.scss"),
            ])
            .await;

        assert_eq!(msg, Some(ReloadMessage::Reload));
        let html = fs::read_to_string(temp.path().join("dev/index.html")).unwrap();
        assert_eq!(html, "<body><footer>v2</footer></body>");
    }

    #[tokio::test]
    async fn failed_rebuild_sends_nothing() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/index.html", "@@include('missing.htm')");

        let (watch, hub) = watch_loop(temp.path());
        let mut rx = hub.subscribe();

        let msg = watch
            .handle_batch(&[temp.path().join("src/index.html")])
            .await;

        assert_eq!(msg, None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn batches_changes_within_window() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        tx.send(PathBuf::from("src/a.html")).await.unwrap();
        tx.send(PathBuf::from("src/b.html")).await.unwrap();

        let late = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE * 3).await;
            late.send(PathBuf::from("src/c.html")).await.unwrap();
        });

        let first = next_batch(&mut rx, DEBOUNCE).await.unwrap();
        assert_eq!(first, vec![PathBuf::from("src/a.html"), PathBuf::from("src/b.html")]);

        let second = next_batch(&mut rx, DEBOUNCE).await.unwrap();
        assert_eq!(second, vec![PathBuf::from("src/c.html")]);

        drop(tx);
        assert_eq!(next_batch(&mut rx, DEBOUNCE).await, None);
    }

    #[tokio::test]
    async fn quick_edits_broadcast_once() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/scss/main.scss", ".a { color: red; }\n");
        write(temp.path(), "src/scss/_vars.scss", "$x: 1;\n");

        let (watch, hub) = watch_loop(temp.path());
        let mut rx = hub.subscribe();
        let handle = tokio::spawn(watch.run());

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(300)).await;

        write(temp.path(), "src/scss/main.scss", ".a { color: blue; }\n");
        write(temp.path(), "src/scss/_vars.scss", "$x: 2;\n");

        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timeout waiting for reload message")
            .unwrap();
        assert_eq!(msg, ReloadMessage::Css);

        tokio::time::sleep(DEBOUNCE * 4).await;
        assert!(rx.try_recv().is_err());

        handle.abort();
    }

    #[test]
    fn unrelated_change_is_ignored() {
        let temp = tempdir().unwrap();
        let (watch, _hub) = watch_loop(temp.path());

        let msg = tokio_test::block_on(watch.handle_batch(&[temp.path().join("notes.txt")]));

        assert_eq!(msg, None);
    }
}
