// src/tasks/sprite.rs

//! SVG sprite sheet in "stack" layout.
//!
//! Every icon becomes a nested `<svg id="...">`; only the one addressed by
//! the URL fragment is displayed, so `sprite.svg#social--github` works both
//! as an `<img>` source and a CSS background.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::output::write_if_changed;
use super::{Task, TaskContext, TaskError, TaskReport};

static PROLOG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<\?xml.*?\?>|<!DOCTYPE[^>]*>|<!--.*?-->").expect("valid regex")
});
static ROOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<svg\b([^>]*?)(/?)>(.*)").expect("valid regex")
});
static CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</svg\s*>").expect("valid regex"));
static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][\w:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid regex")
});

/// Root attributes that the sprite sets itself or that make no sense nested.
const DROPPED_ATTRIBUTES: &[&str] = &["id", "version", "x", "y"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteOptions {
    /// File name of the sheet inside `dest`.
    pub output: String,
}

/// One parsed icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub id: String,
    pub attributes: Vec<(String, String)>,
    pub body: String,
}

pub fn run(task: &Task, opts: &SpriteOptions, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
    let fs = ctx.fs.as_ref();
    let mut report = TaskReport::default();

    let mut icons = Vec::new();
    for source in task.sources().collect(fs, &ctx.root)? {
        let text = fs.read_to_string(&source.path)?;
        let icon = parse_icon(&icon_id(&source.rel), &text)
            .map_err(|message| TaskError::transform(&source.path, message))?;
        icons.push(icon);
    }

    if icons.is_empty() {
        debug!(task = %task.name(), "no icons matched; sprite not produced");
        return Ok(report);
    }
    icons.sort_by(|a, b| a.id.cmp(&b.id));

    let target = ctx.dest_dir(task).join(&opts.output);
    if write_if_changed(fs, &target, render(&icons).as_bytes())? {
        debug!(task = %task.name(), icons = icons.len(), "sprite written");
        report.written.push(target.clone());
    }
    report.outputs.push(target);
    Ok(report)
}

/// Fragment id for an icon: its path relative to the glob base, without
/// extension, with directories joined by `--`.
pub fn icon_id(rel: &Path) -> String {
    let stem = rel.with_extension("");
    stem.to_string_lossy()
        .replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("--")
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}

/// Extract the root `<svg>` attributes and inner markup of an icon file.
pub fn parse_icon(id: &str, text: &str) -> Result<Icon, String> {
    let text = PROLOG.replace_all(text, "");
    let caps = ROOT
        .captures(&text)
        .ok_or_else(|| "no <svg> root element".to_string())?;

    let attrs = caps.get(1).map_or("", |m| m.as_str());
    let self_closing = caps.get(2).is_some_and(|m| !m.as_str().is_empty());
    let rest = caps.get(3).map_or("", |m| m.as_str());

    let body = if self_closing {
        String::new()
    } else {
        let close = CLOSE
            .find_iter(rest)
            .last()
            .ok_or_else(|| "unterminated <svg> element".to_string())?;
        rest[..close.start()].trim().to_string()
    };

    let attributes = ATTR
        .captures_iter(attrs)
        .filter_map(|c| {
            let name = c.get(1)?.as_str().to_string();
            let value = c.get(2).or_else(|| c.get(3))?.as_str().replace('"', "&quot;");
            Some((name, value))
        })
        .filter(|(name, _)| {
            !(name == "xmlns" || name.starts_with("xmlns:") || DROPPED_ATTRIBUTES.contains(&name.as_str()))
        })
        .collect();

    Ok(Icon {
        id: id.to_string(),
        attributes,
        body,
    })
}

/// Render icons (already sorted) as a stack sprite.
pub fn render(icons: &[Icon]) -> String {
    let mut out = String::from(concat!(
        r#"<?xml version="1.0" encoding="utf-8"?>"#,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
        "<style>:root>svg{display:none}:root>svg:target{display:inline}</style>",
    ));
    for icon in icons {
        out.push_str("<svg id=\"");
        out.push_str(&icon.id);
        out.push('"');
        for (name, value) in &icon.attributes {
            out.push_str(&format!(" {name}=\"{value}\""));
        }
        out.push('>');
        out.push_str(&icon.body);
        out.push_str("</svg>");
    }
    out.push_str("</svg>");
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::config::{PathsSection, TaskConfig};
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;
    use crate::types::TaskKind;

    fn sprite_task() -> (Task, SpriteOptions) {
        let mut cfg = TaskConfig::of_kind(TaskKind::Sprite);
        cfg.src = vec!["src/icons/**/*.svg".to_string()];
        cfg.dest = Some(PathBuf::from("dist/sprite"));
        let task = Task::from_config("sprite", &cfg, &PathsSection::default()).unwrap();
        (task, SpriteOptions { output: "sprite.svg".to_string() })
    }

    #[test]
    fn ids_come_from_relative_paths() {
        assert_eq!(icon_id(Path::new("arrow.svg")), "arrow");
        assert_eq!(icon_id(Path::new("social/git hub.svg")), "social--git-hub");
    }

    #[test]
    fn parse_strips_prolog_and_namespace() {
        let text = r#"<?xml version="1.0"?>
<!-- generator -->
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill='none' id="old">
  <path d="M0 0h24"/>
</svg>
"#;
        let icon = parse_icon("a", text).unwrap();
        assert_eq!(
            icon.attributes,
            vec![
                ("viewBox".to_string(), "0 0 24 24".to_string()),
                ("fill".to_string(), "none".to_string()),
            ]
        );
        assert_eq!(icon.body, r#"<path d="M0 0h24"/>"#);
    }

    #[test]
    fn nested_svg_elements_keep_their_closing_tags() {
        let icon = parse_icon("a", "<svg><svg><rect/></svg></svg>").unwrap();
        assert_eq!(icon.body, "<svg><rect/></svg>");
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(parse_icon("a", "<html></html>").is_err());
        assert!(parse_icon("a", "<svg viewBox=\"0 0 1 1\"><path/>").is_err());
    }

    #[test]
    fn sheet_is_sorted_and_stable() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/icons/zoom.svg", r#"<svg viewBox="0 0 1 1"><g/></svg>"#);
        fs.add_file("/p/src/icons/social/github.svg", r#"<svg viewBox="0 0 2 2"><p/></svg>"#);
        let ctx = TaskContext::new("/p", Arc::new(fs.clone()));
        let (task, opts) = sprite_task();

        let report = run(&task, &opts, &ctx).unwrap();
        let target = PathBuf::from("/p/dist/sprite/sprite.svg");
        assert_eq!(report.outputs, vec![target.clone()]);
        assert_eq!(report.written, vec![target.clone()]);

        let sheet = fs.read_to_string(&target).unwrap();
        let github = sheet.find(r#"id="social--github""#).unwrap();
        let zoom = sheet.find(r#"id="zoom""#).unwrap();
        assert!(github < zoom);
        assert!(sheet.ends_with("</svg></svg>"));

        let again = run(&task, &opts, &ctx).unwrap();
        assert!(again.written.is_empty());
    }

    #[test]
    fn malformed_icon_fails_the_task() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/icons/bad.svg", "not svg");
        let ctx = TaskContext::new("/p", Arc::new(fs));
        let (task, opts) = sprite_task();
        let err = run(&task, &opts, &ctx).unwrap_err();
        assert!(matches!(err, TaskError::Transform { .. }));
    }

    #[test]
    fn zero_icons_produce_no_sheet() {
        let fs = MockFileSystem::new();
        let ctx = TaskContext::new("/p", Arc::new(fs.clone()));
        let (task, opts) = sprite_task();
        let report = run(&task, &opts, &ctx).unwrap();
        assert!(report.outputs.is_empty());
        assert!(fs.files().is_empty());
    }
}
