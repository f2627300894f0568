// src/tasks/sources.rs

//! Source glob expansion.
//!
//! Patterns are relative to the project root and use `/` separators. `*`
//! never crosses a directory boundary; `**` does. Each matched file keeps its
//! path relative to the pattern's *glob base*: the leading directories that
//! contain no glob syntax (`src/assets/images/static/**/*` has base
//! `src/assets/images/static`). Outputs mirror that relative path.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

use crate::fs::{FileSystem, walk_files};

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// A matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute (root-joined) path.
    pub path: PathBuf,
    /// Path relative to the glob base of the pattern that matched it.
    pub rel: PathBuf,
}

#[derive(Debug, Clone)]
struct SourceGlob {
    pattern: String,
    base: PathBuf,
    matcher: GlobMatcher,
}

/// Compiled set of source patterns for one task.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    globs: Vec<SourceGlob>,
}

impl SourceSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut globs = Vec::with_capacity(patterns.len());
        for raw in patterns {
            let pattern = normalize_pattern(raw);
            if Path::new(&pattern).is_absolute() {
                anyhow::bail!("source pattern must be relative to the project root: {raw}");
            }
            let matcher = compile_glob(&pattern)?;
            globs.push(SourceGlob {
                base: glob_base(&pattern),
                pattern,
                matcher,
            });
        }
        Ok(Self { globs })
    }

    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.globs.iter().map(|g| g.pattern.as_str())
    }

    /// Expand every pattern below `root`. Files matched by several patterns
    /// are reported once, for the first pattern that matched. Missing base
    /// directories simply match nothing.
    pub fn collect(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<SourceFile>> {
        let mut found: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

        for glob in &self.globs {
            let base_abs = root.join(&glob.base);
            for file in walk_files(fs, &base_abs)? {
                if found.contains_key(&file) {
                    continue;
                }
                let Ok(rel_root) = file.strip_prefix(root) else {
                    continue;
                };
                let rel_root = rel_root.to_string_lossy().replace('\\', "/");
                if !glob.matcher.is_match(&rel_root) {
                    continue;
                }
                let rel = file
                    .strip_prefix(&base_abs)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| PathBuf::from(&rel_root));
                found.insert(file, rel);
            }
        }

        Ok(found
            .into_iter()
            .map(|(path, rel)| SourceFile { path, rel })
            .collect())
    }
}

/// Compile a single glob with `*` confined to one path component.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?;
    Ok(glob.compile_matcher())
}

/// Strip a leading `./` so patterns match root-relative paths.
pub fn normalize_pattern(pattern: &str) -> String {
    let mut p = pattern.trim();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p.to_string()
}

/// Leading directory components of `pattern` that contain no glob syntax.
///
/// A fully literal pattern (a single file) has its parent directory as base.
pub fn glob_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern.split('/').collect();
    let literal: Vec<&str> = parts
        .iter()
        .take_while(|part| !part.contains(GLOB_META))
        .copied()
        .collect();

    let take = if literal.len() == parts.len() {
        literal.len().saturating_sub(1)
    } else {
        literal.len()
    };

    parts[..take].iter().collect()
}

/// Lexically resolve `.` and `..` components without touching the disk.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn glob_base_stops_at_first_meta_component() {
        assert_eq!(glob_base("src/assets/images/static/**/*"), PathBuf::from("src/assets/images/static"));
        assert_eq!(glob_base("src/*.html"), PathBuf::from("src"));
        assert_eq!(glob_base("*.html"), PathBuf::new());
        assert_eq!(glob_base("src/index.html"), PathBuf::from("src"));
        assert_eq!(
            glob_base("dist/assets/images/**/*.{gif,png}"),
            PathBuf::from("dist/assets/images")
        );
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/index.html", "i");
        fs.add_file("/p/src/partials/header.html", "h");

        let set = SourceSet::new(&["./src/*.html".to_string()]).unwrap();
        let files = set.collect(&fs, Path::new("/p")).unwrap();
        assert_eq!(
            files,
            vec![SourceFile {
                path: PathBuf::from("/p/src/index.html"),
                rel: PathBuf::from("index.html"),
            }]
        );
    }

    #[test]
    fn recursive_matches_keep_relative_structure() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/img/static/a.png", "a");
        fs.add_file("/p/src/img/static/deep/b.jpg", "b");
        fs.add_file("/p/src/img/icons/c.svg", "c");

        let set = SourceSet::new(&["src/img/static/**/*".to_string()]).unwrap();
        let rels: Vec<PathBuf> = set
            .collect(&fs, Path::new("/p"))
            .unwrap()
            .into_iter()
            .map(|f| f.rel)
            .collect();
        assert_eq!(rels, vec![PathBuf::from("a.png"), PathBuf::from("deep/b.jpg")]);
    }

    #[test]
    fn missing_base_matches_nothing() {
        let fs = MockFileSystem::new();
        let set = SourceSet::new(&["src/fonts/*.ttf".to_string()]).unwrap();
        assert!(set.collect(&fs, Path::new("/p")).unwrap().is_empty());
    }

    #[test]
    fn invalid_and_absolute_patterns_are_rejected() {
        assert!(SourceSet::new(&["src/[".to_string()]).is_err());
        assert!(SourceSet::new(&["/etc/*".to_string()]).is_err());
    }

    #[test]
    fn normalize_path_resolves_parent_components() {
        assert_eq!(
            normalize_path(Path::new("/p/src/partials/../index.html")),
            PathBuf::from("/p/src/index.html")
        );
    }
}
