//! Import resolution and url rewriting
//!
//! Resolvers locate the stylesheet named by an `@import`. The url helpers
//! compute the prefix applied to relative `url(...)` references of imported
//! files so they keep pointing at the same resources.

use crate::error::{CompilerError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Content of an imported stylesheet and the uri it was found under
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSource {
    pub uri: String,
    pub content: String,
}

pub trait ImportResolver {
    /// Find `target` as imported from `importer`; `Ok(None)` when not found
    fn resolve(&self, importer: &str, target: &str) -> Result<Option<ResolvedSource>>;
}

/// File names tried for an import target, in order
fn candidates(target: &str) -> Vec<String> {
    let (dir, name) = match target.rfind('/') {
        Some(i) => (&target[..=i], &target[i + 1..]),
        None => ("", target),
    };
    let mut names = vec![target.to_string()];
    if name.ends_with(".scss") {
        names.push(format!("{}_{}", dir, name));
    } else {
        names.push(format!("{}.scss", target));
        names.push(format!("{}_{}.scss", dir, name));
        names.push(format!("{}/_index.scss", target));
    }
    names
}

/// Resolves imports against the importing file's directory, then against
/// each configured search directory
#[derive(Debug, Clone, Default)]
pub struct FilesystemResolver {
    search_paths: Vec<PathBuf>,
}

impl FilesystemResolver {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }
}

impl ImportResolver for FilesystemResolver {
    fn resolve(&self, importer: &str, target: &str) -> Result<Option<ResolvedSource>> {
        let base_dir = Path::new(importer).parent().unwrap_or(Path::new("")).to_path_buf();
        let directories = std::iter::once(base_dir).chain(self.search_paths.iter().cloned());

        for directory in directories {
            for candidate in candidates(target) {
                let path = directory.join(&candidate);
                if !path.is_file() {
                    continue;
                }
                log::debug!("Resolved import '{}' -> {}", target, path.display());
                let content = fs::read_to_string(&path).map_err(|e| {
                    CompilerError::import(format!("Cannot read '{}': {}", path.display(), e))
                })?;
                return Ok(Some(ResolvedSource {
                    uri: path.to_string_lossy().to_string(),
                    content,
                }));
            }
        }
        Ok(None)
    }
}

/// In-memory stylesheets keyed by path, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    files: HashMap<String, String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: &str, content: &str) {
        self.files.insert(clean_path(path), content.to_string());
    }
}

impl ImportResolver for MemoryResolver {
    fn resolve(&self, importer: &str, target: &str) -> Result<Option<ResolvedSource>> {
        let base_dir = match importer.rfind('/') {
            Some(i) => &importer[..=i],
            None => "",
        };
        for candidate in candidates(target) {
            let uri = clean_path(&format!("{}{}", base_dir, candidate));
            if let Some(content) = self.files.get(&uri) {
                return Ok(Some(ResolvedSource {
                    uri,
                    content: content.clone(),
                }));
            }
        }
        Ok(None)
    }
}

/// Imports that stay as literal `@import` statements in the output
pub fn is_plain_css_import(target: &str, has_media: bool) -> bool {
    has_media
        || target.ends_with(".css")
        || target.starts_with("http://")
        || target.starts_with("https://")
        || target.starts_with("//")
}

/// Url prefix of a stylesheet imported as `target` from a file whose own
/// prefix is `current_prefix`
pub fn url_prefix_for(current_prefix: &str, target: &str) -> String {
    let directory = match target.rfind('/') {
        Some(i) => &target[..=i],
        None => "",
    };
    if directory.starts_with('/') {
        return clean_path(directory);
    }
    clean_path(&format!("{}{}", current_prefix, directory))
}

/// Normalise `.` and `..` segments; a trailing `/` is kept
pub fn clean_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    let mut cleaned = segments.join("/");
    if absolute {
        cleaned.insert(0, '/');
    }
    if trailing && !segments.is_empty() {
        cleaned.push('/');
    }
    cleaned
}

/// Prefix a url path unless it is absolute, has a scheme or is a fragment
pub fn prefix_url_path(prefix: &str, path: &str) -> String {
    let trimmed = path.trim();
    if prefix.is_empty()
        || trimmed.is_empty()
        || trimmed.starts_with('/')
        || trimmed.starts_with('#')
        || trimmed.contains(':')
        || trimmed.contains("#{")
    {
        return path.to_string();
    }
    clean_path(&format!("{}{}", prefix, trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_candidates_include_partials_and_index() {
        assert_eq!(
            candidates("theme/colors"),
            vec![
                "theme/colors",
                "theme/colors.scss",
                "theme/_colors.scss",
                "theme/colors/_index.scss"
            ]
        );
        assert_eq!(candidates("base.scss"), vec!["base.scss", "_base.scss"]);
    }

    #[test]
    fn test_filesystem_resolver_finds_partial() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/_buttons.scss"), ".btn { color: red; }").unwrap();
        let main = dir.path().join("main.scss");

        let resolver = FilesystemResolver::new(Vec::new());
        let resolved = resolver
            .resolve(&main.to_string_lossy(), "lib/buttons")
            .unwrap()
            .unwrap();
        assert!(resolved.uri.ends_with("_buttons.scss"));
        assert!(resolved.content.contains(".btn"));
        assert!(resolver.resolve(&main.to_string_lossy(), "missing").unwrap().is_none());
    }

    #[test]
    fn test_filesystem_resolver_uses_search_paths() {
        let dir = TempDir::new().unwrap();
        let vendor = dir.path().join("vendor");
        fs::create_dir(&vendor).unwrap();
        fs::write(vendor.join("grid.scss"), ".row {}").unwrap();

        let resolver = FilesystemResolver::new(vec![vendor]);
        let resolved = resolver.resolve("main.scss", "grid").unwrap();
        assert!(resolved.is_some());
    }

    #[test]
    fn test_memory_resolver_relative_to_importer() {
        let resolver = MemoryResolver::new().with_file("styles/_vars.scss", "$a: 1;");
        let resolved = resolver.resolve("styles/main.scss", "vars").unwrap().unwrap();
        assert_eq!(resolved.uri, "styles/_vars.scss");
    }

    #[test]
    fn test_plain_css_imports() {
        assert!(is_plain_css_import("reset.css", false));
        assert!(is_plain_css_import("http://fonts.example.com/x", false));
        assert!(is_plain_css_import("print", true));
        assert!(!is_plain_css_import("theme/base", false));
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("a/./b/../c"), "a/c");
        assert_eq!(clean_path("../a/b/"), "../a/b/");
        assert_eq!(clean_path("a/../../b"), "../b");
        assert_eq!(clean_path("/x/../y"), "/y");
    }

    #[test]
    fn test_url_prefix() {
        assert_eq!(url_prefix_for("", "theme/base"), "theme/");
        assert_eq!(url_prefix_for("theme/", "../shared/mixins"), "shared/");
        assert_eq!(url_prefix_for("", "base"), "");
        assert_eq!(prefix_url_path("theme/", "img/a.png"), "theme/img/a.png");
        assert_eq!(prefix_url_path("theme/", "../img/a.png"), "img/a.png");
        assert_eq!(prefix_url_path("theme/", "data:image/png;base64,xx"), "data:image/png;base64,xx");
        assert_eq!(prefix_url_path("theme/", "/abs.png"), "/abs.png");
    }
}
