//! Partial-include directives for HTML pages.
//!
//! Supported syntax:
//!
//! ```text
//! @@include('header.htm')
//! @@include("card.htm", { "title": "Hello" })
//! ```
//!
//! Paths resolve against a fixed include directory. Parameters are a JSON
//! object; inside the included partial every `@@name` token whose name is a
//! parameter key is replaced by the value. Includes nest; a partial that
//! includes itself (directly or indirectly) is an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)@@include\(\s*(?:'([^']*)'|"([^"]*)")\s*(?:,\s*(\{.*?\}))?\s*\)"#)
        .expect("include pattern is valid")
});

static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@@([A-Za-z_][A-Za-z0-9_.]*)").expect("variable pattern is valid"));

const MAX_DEPTH: usize = 32;

/// Errors that can occur while resolving includes.
#[derive(Debug, thiserror::Error)]
pub enum IncludeError {
    #[error("Partial not found: {path} (included from {from})")]
    Missing { path: String, from: String },

    #[error("Invalid include parameters in {from}: {message}")]
    InvalidParams { from: String, message: String },

    #[error("Include cycle: {0}")]
    Cycle(String),

    #[error("Malformed include directive in {from}: {snippet}")]
    Malformed { from: String, snippet: String },
}

/// Resolves `@@include` directives against one directory.
#[derive(Debug, Clone)]
pub struct IncludeResolver {
    include_dir: PathBuf,
}

impl IncludeResolver {
    pub fn new(include_dir: impl Into<PathBuf>) -> Self {
        Self {
            include_dir: include_dir.into(),
        }
    }

    /// Expand every include in `source`. `origin` names the file for errors.
    pub fn expand(&self, source: &str, origin: &Path) -> Result<String, IncludeError> {
        let mut stack = vec![origin.to_path_buf()];
        self.expand_inner(source, &mut stack)
    }

    fn expand_inner(&self, source: &str, stack: &mut Vec<PathBuf>) -> Result<String, IncludeError> {
        let from = stack
            .last()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        if stack.len() > MAX_DEPTH {
            return Err(IncludeError::Cycle(describe_stack(stack)));
        }

        let mut output = String::with_capacity(source.len());
        let mut last = 0;

        for caps in INCLUDE_RE.captures_iter(source) {
            let whole = caps.get(0).expect("capture 0 always present");
            output.push_str(&source[last..whole.start()]);
            last = whole.end();

            let target = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().trim())
                .unwrap_or_default();

            if target.is_empty() {
                return Err(IncludeError::Malformed {
                    from,
                    snippet: whole.as_str().to_string(),
                });
            }

            let params = match caps.get(3) {
                Some(json) => parse_params(json.as_str(), &from)?,
                None => Map::new(),
            };

            let path = self.include_dir.join(target);
            if stack.contains(&path) {
                stack.push(path);
                return Err(IncludeError::Cycle(describe_stack(stack)));
            }

            let partial = fs::read_to_string(&path).map_err(|_| IncludeError::Missing {
                path: path.display().to_string(),
                from: from.clone(),
            })?;

            let partial = substitute(&partial, &params);

            stack.push(path);
            let expanded = self.expand_inner(&partial, stack)?;
            stack.pop();

            output.push_str(&expanded);
        }

        output.push_str(&source[last..]);

        // A directive the pattern could not parse must not leak into output.
        if let Some(pos) = output.find("@@include") {
            let snippet: String = output[pos..].chars().take(60).collect();
            return Err(IncludeError::Malformed { from, snippet });
        }

        Ok(output)
    }
}

fn parse_params(json: &str, from: &str) -> Result<Map<String, Value>, IncludeError> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(IncludeError::InvalidParams {
            from: from.to_string(),
            message: "parameters must be a JSON object".to_string(),
        }),
        Err(e) => Err(IncludeError::InvalidParams {
            from: from.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Replace `@@key` tokens with parameter values. Unknown keys stay as-is.
fn substitute(partial: &str, params: &Map<String, Value>) -> String {
    if params.is_empty() {
        return partial.to_string();
    }

    VARIABLE_RE
        .replace_all(partial, |caps: &Captures| {
            let key = &caps[1];
            match lookup(params, key) {
                Some(Value::String(s)) => s.clone(),
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Resolve dotted keys (`@@card.title`) through nested objects.
fn lookup<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = params.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn describe_stack(stack: &[PathBuf]) -> String {
    stack
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
