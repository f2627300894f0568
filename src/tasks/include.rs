// src/tasks/include.rs

//! Markup assembly from include directives.
//!
//! With the default `@@` prefix, a page may contain
//!
//! ```text
//! @@include('partials/header.html', { "title": "Home" })
//! ```
//!
//! The directive is replaced by the named file (resolved against the
//! including file's directory), expanded recursively. Inside the included
//! file, `@@title` is replaced by the context value.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::fs::FileSystem;

use super::minify::collapse_whitespace;
use super::output::write_if_changed;
use super::sources::normalize_path;
use super::{Task, TaskContext, TaskError, TaskReport};

/// Nesting deeper than this is treated as runaway recursion.
pub const MAX_INCLUDE_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeOptions {
    pub prefix: String,
    pub collapse_whitespace: bool,
}

pub fn run(task: &Task, opts: &IncludeOptions, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
    let fs = ctx.fs.as_ref();
    let dest = ctx.dest_dir(task);
    let expander = Expander::new(fs, &opts.prefix)?;

    // Every page must assemble before any of them is written.
    let mut pages = Vec::new();
    for source in task.sources().collect(fs, &ctx.root)? {
        let mut html = expander.expand_file(&source.path)?;
        if opts.collapse_whitespace {
            html = collapse_whitespace(&html);
        }
        pages.push((source, html));
    }

    let mut report = TaskReport::default();
    for (source, html) in pages {
        let target = dest.join(&source.rel);
        if write_if_changed(fs, &target, html.as_bytes())? {
            debug!(task = %task.name(), page = ?source.path, "assembled page");
            report.written.push(target.clone());
        }
        report.outputs.push(target);
    }
    Ok(report)
}

/// Recursive include expansion over a [`FileSystem`].
pub struct Expander<'a> {
    fs: &'a dyn FileSystem,
    prefix: String,
    directive: Regex,
}

impl<'a> Expander<'a> {
    pub fn new(fs: &'a dyn FileSystem, prefix: &str) -> Result<Self, TaskError> {
        let pattern = format!(
            r#"(?s){}include\(\s*(?:'([^']*)'|"([^"]*)")\s*(?:,\s*(\{{.*?\}}))?\s*\)"#,
            regex::escape(prefix)
        );
        let directive = Regex::new(&pattern)
            .map_err(|e| TaskError::Io(anyhow::anyhow!("include directive pattern: {e}")))?;
        Ok(Self {
            fs,
            prefix: prefix.to_string(),
            directive,
        })
    }

    /// Read `path` and expand every directive in it.
    pub fn expand_file(&self, path: &Path) -> Result<String, TaskError> {
        let mut stack = Vec::new();
        self.expand(path, &Map::new(), &mut stack)
    }

    fn expand(
        &self,
        path: &Path,
        context: &Map<String, Value>,
        stack: &mut Vec<PathBuf>,
    ) -> Result<String, TaskError> {
        let path = normalize_path(path);
        if stack.contains(&path) {
            let chain: Vec<String> = stack
                .iter()
                .chain(std::iter::once(&path))
                .map(|p| p.display().to_string())
                .collect();
            return Err(TaskError::transform(
                &path,
                format!("include cycle: {}", chain.join(" -> ")),
            ));
        }
        if stack.len() >= MAX_INCLUDE_DEPTH {
            return Err(TaskError::transform(
                &path,
                format!("includes nested deeper than {MAX_INCLUDE_DEPTH} levels"),
            ));
        }

        let text = self.fs.read_to_string(&path)?;
        let text = substitute(&text, &self.prefix, context);
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();

        stack.push(path.clone());
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in self.directive.captures_iter(&text) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&text[last..whole.start()]);
            last = whole.end();

            let target = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let child_context = match caps.get(3) {
                Some(json) => parse_context(json.as_str()).map_err(|message| {
                    TaskError::transform(&path, format!("include '{target}': {message}"))
                })?,
                None => Map::new(),
            };

            let child = normalize_path(&base.join(target));
            if !self.fs.is_file(&child) {
                return Err(TaskError::transform(
                    &path,
                    format!("included file '{target}' not found"),
                ));
            }
            let expanded = self.expand(&child, &child_context, stack)?;
            out.push_str(&expanded);
        }
        out.push_str(&text[last..]);
        stack.pop();
        Ok(out)
    }
}

fn parse_context(json: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("context must be a JSON object".to_string()),
        Err(e) => Err(format!("invalid context: {e}")),
    }
}

/// Replace `<prefix><key>` with the context value. Longer keys go first so
/// `@@title` never clobbers `@@titleSuffix`.
fn substitute(text: &str, prefix: &str, context: &Map<String, Value>) -> String {
    if context.is_empty() {
        return text.to_string();
    }
    let mut keys: Vec<&String> = context.keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let mut out = text.to_string();
    for key in keys {
        let value = match &context[key.as_str()] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out = out.replace(&format!("{prefix}{key}"), &value);
    }
    out
}
