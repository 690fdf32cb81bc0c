//! SCSS Compiler
//!
//! Compiles SCSS stylesheets to plain CSS.
//!
//! # Features
//!
//! - Nested rules with `&` parent references and nested properties
//! - Variables with `!default` and `!global`, interpolation with `#{}`
//! - Mixins with arguments and `@content`, user-defined `@function`s
//! - Control directives: `@if`, `@each`, `@for`, `@while`
//! - `@extend` with placeholder selectors
//! - `@import` inlining with url rewriting of imported stylesheets
//! - `@media` bubbling and merging
//!
//! # Basic Usage
//!
//! ```rust
//! use scssc::{compile_source, Result};
//!
//! fn main() -> Result<()> {
//!     let css = compile_source("$c: red; .a { .b { color: $c; } }", "main.scss")?;
//!     assert_eq!(css, ".a .b {\n\tcolor: red;\n}\n");
//!     Ok(())
//! }
//! ```
//!
//! # Compilation Pipeline
//!
//! 1. **Parse**: lexer and recursive-descent parser build the [`Stylesheet`] tree
//! 2. **Traverse**: variables, mixins, control flow and imports are evaluated
//!    and nested rules are flattened
//! 3. **Extend**: recorded `@extend`s rewrite the selector lists, placeholders
//!    and redundant selectors are removed
//! 4. **Render**: the plain CSS tree is printed

pub mod types;
pub mod error;
pub mod lexer;
pub mod value;
pub mod color;
pub mod selector;
pub mod context;
pub mod evaluator;
pub mod functions;

pub mod ast;
pub mod parser;
pub mod importer;
pub mod traverse;
pub mod extend_resolver;
pub mod codegen;
pub mod cli;

use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

// Re-export commonly used types and functions
pub use error::{CompilerError, Result};
pub use types::*;
pub use lexer::{Lexer, Token, TokenType};
pub use ast::{Node, NodeKind, Stylesheet};
pub use parser::Parser;
pub use context::ScssContext;
pub use importer::{FilesystemResolver, ImportResolver, MemoryResolver, ResolvedSource};
pub use value::Value;
pub use selector::{Selector, SelectorSet};
pub use codegen::CssWriter;
pub use cli::EnhancedCli;

/// Compiler version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Compiler build information
pub const BUILD_INFO: CompilerInfo = CompilerInfo {
    version: VERSION,
    name: NAME,
    description: DESCRIPTION,
    supported_features: &[
        "variables",
        "nesting",
        "mixins",
        "functions",
        "control-directives",
        "extend",
        "placeholders",
        "imports",
        "media-bubbling",
        "interpolation",
    ],
};

#[derive(Debug, Clone)]
pub struct CompilerInfo {
    pub version: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub supported_features: &'static [&'static str],
}

/// Compilation options and settings
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Log each pipeline phase at info level
    pub debug_mode: bool,

    /// How `url(...)` references of imported stylesheets are rewritten
    pub url_mode: UrlMode,

    /// Additional directories searched by `@import`
    pub include_directories: Vec<String>,

    /// Global variables injected before compilation, as SCSS value text
    pub custom_variables: HashMap<String, String>,

    /// Maximum nesting of `@import`
    pub max_import_depth: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            debug_mode: false,
            url_mode: UrlMode::default(),
            include_directories: Vec::new(),
            custom_variables: HashMap::new(),
            max_import_depth: MAX_IMPORT_DEPTH,
        }
    }
}

/// Compilation statistics and metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompilationStats {
    /// Source size in bytes
    pub source_size: u64,

    /// Rendered CSS size in bytes
    pub output_size: u64,

    /// Number of style rules in the output
    pub rule_count: usize,

    /// Number of `@media` blocks in the output
    pub media_count: usize,

    /// Number of stylesheets inlined by `@import`
    pub import_count: usize,

    /// Number of `@extend` directives recorded
    pub extension_count: usize,

    /// Number of warnings raised
    pub warning_count: usize,

    /// Compilation time in milliseconds
    pub compile_time_ms: u64,
}

/// Compile a file with default options
pub fn compile_file(input_path: &str, output_path: &str) -> Result<CompilationStats> {
    compile_file_with_options(input_path, output_path, CompilerOptions::default())
}

/// Compile a file with custom options
pub fn compile_file_with_options(
    input_path: &str,
    output_path: &str,
    options: CompilerOptions,
) -> Result<CompilationStats> {
    let start_time = Instant::now();

    if options.debug_mode {
        log::info!("{} v{}", NAME, VERSION);
        log::info!("Compiling '{}' to '{}'...", input_path, output_path);
        log::debug!("Compiler options: {:?}", options);
    }

    let source = fs::read_to_string(input_path).map_err(|e| CompilerError::FileNotFound {
        path: format!("{}: {}", input_path, e),
    })?;

    let debug_mode = options.debug_mode;
    let (css, mut stats) = compile_source_with_options(&source, input_path, options)?;
    fs::write(output_path, &css)?;
    stats.compile_time_ms = start_time.elapsed().as_millis() as u64;

    if debug_mode {
        log::info!("Compilation successful!");
        log::info!("Source size: {} bytes", stats.source_size);
        log::info!("Output size: {} bytes", stats.output_size);
        log::info!("Compile time: {}ms", stats.compile_time_ms);
    }

    Ok(stats)
}

/// Compile SCSS source to CSS with default options
pub fn compile_source(source: &str, filename: &str) -> Result<String> {
    let (css, _stats) = compile_source_with_options(source, filename, CompilerOptions::default())?;
    Ok(css)
}

/// Compile SCSS source to CSS with custom options. `filename` locates
/// relative imports and appears in diagnostics.
pub fn compile_source_with_options(
    source: &str,
    filename: &str,
    options: CompilerOptions,
) -> Result<(String, CompilationStats)> {
    let start_time = Instant::now();

    let search_paths: Vec<PathBuf> = options.include_directories.iter().map(PathBuf::from).collect();
    let mut context = ScssContext::with_resolver(options.url_mode, Box::new(FilesystemResolver::new(search_paths)));
    context.set_max_import_depth(options.max_import_depth);
    inject_custom_variables(&options.custom_variables, &mut context)?;

    if options.debug_mode {
        log::info!("Phase 1: parsing {} ({} bytes)", filename, source.len());
    }
    let stylesheet = Stylesheet::parse(source, filename)?;

    if options.debug_mode {
        log::info!("Phase 2-3: traversing and resolving extensions");
    }
    let compiled = stylesheet.compile_with(&mut context)?;

    if options.debug_mode {
        log::info!("Phase 4: rendering CSS");
    }
    let css = compiled.print_state();

    let (rule_count, media_count) = count_output_nodes(&compiled.children);
    let stats = CompilationStats {
        source_size: source.len() as u64,
        output_size: css.len() as u64,
        rule_count,
        media_count,
        import_count: context.import_count(),
        extension_count: context.extensions().len(),
        warning_count: context.warnings().len(),
        compile_time_ms: start_time.elapsed().as_millis() as u64,
    };
    log::debug!("Compilation stats: {:?}", stats);

    Ok((css, stats))
}

/// Bind each custom variable in the root scope. Names may carry a leading `$`.
fn inject_custom_variables(variables: &HashMap<String, String>, context: &mut ScssContext) -> Result<()> {
    if variables.is_empty() {
        return Ok(());
    }
    let identifier = regex::Regex::new(r"^[A-Za-z_-][A-Za-z0-9_-]*$").map_err(|e| CompilerError::InvalidFormat {
        message: format!("Invalid identifier pattern: {}", e),
    })?;

    let position = SourcePosition::new("<custom variables>", 0, 0);
    for (name, text) in variables {
        let name = name.strip_prefix('$').unwrap_or(name);
        if !identifier.is_match(name) {
            return Err(CompilerError::InvalidFormat {
                message: format!("Invalid custom variable name '{}'", name),
            });
        }
        let value = parser::parse_value(text, &position)?;
        let value = evaluator::evaluate_arithmetic(&value, context, &position)?;
        log::debug!("Custom variable ${} = {}", name, value);
        context.set_global_variable(name, value);
    }
    Ok(())
}

/// Style rules and `@media` blocks in a compiled tree
fn count_output_nodes(nodes: &[Node]) -> (usize, usize) {
    nodes.iter().fold((0, 0), |(rules, media), node| match &node.kind {
        NodeKind::Block(_) => (rules + 1, media),
        NodeKind::Media(inner) => {
            let (r, m) = count_output_nodes(&inner.children);
            (rules + r, media + m + 1)
        }
        NodeKind::AtRule(rule) => {
            let (r, m) = rule.children.as_deref().map_or((0, 0), count_output_nodes);
            (rules + r, media + m)
        }
        _ => (rules, media),
    })
}

/// Check if the compiler handles a specific SCSS feature
pub fn supports_feature(feature: &str) -> bool {
    BUILD_INFO.supported_features.contains(&feature)
}

/// Get compiler build information
pub fn build_info() -> &'static CompilerInfo {
    &BUILD_INFO
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn css(source: &str) -> String {
        compile_source(source, "main.scss").unwrap()
    }

    #[test]
    fn test_division_needs_a_variable_operand() {
        assert_eq!(css("$x: 10px; div { width: $x/2; }"), "div {\n\twidth: 5px;\n}\n");
        assert_eq!(css("div { width: 10px/2; }"), "div {\n\twidth: 10px/2;\n}\n");
        assert_eq!(css("div { font: 12px/1.5 sans-serif; }"), "div {\n\tfont: 12px/1.5 sans-serif;\n}\n");
    }

    #[test]
    fn test_nth_bounds() {
        assert_eq!(css(".a { b: nth((1, 2, 3), 2); }"), ".a {\n\tb: 2;\n}\n");
        for index in ["0", "4"] {
            let source = format!(".a {{ b: nth((1, 2, 3), {}); }}", index);
            let result = compile_source(&source, "main.scss");
            assert!(matches!(result, Err(CompilerError::Compile { .. })), "index {}", index);
        }
    }

    #[test]
    fn test_if_function_is_lazy() {
        assert_eq!(css(".a { b: if(true, 1, (1/0)); }"), ".a {\n\tb: 1;\n}\n");
    }

    #[test]
    fn test_extend_and_placeholders() {
        assert_eq!(css(".a.b { color: red; } .c { @extend .a; }"), ".a.b, .b.c {\n\tcolor: red;\n}\n");
        assert_eq!(css("%foo { color: red; }"), "");
    }

    #[test]
    fn test_nested_media_bubbles_to_top() {
        assert_eq!(
            css("@media screen { @media (min-width:1px) { .a { color: red; } } }"),
            "@media screen and (min-width:1px) {\n\t.a {\n\t\tcolor: red;\n\t}\n}\n"
        );
    }

    #[test]
    fn test_custom_variables() {
        let mut options = CompilerOptions::default();
        options.custom_variables.insert("$accent".to_string(), "#336699".to_string());
        options.custom_variables.insert("gutter".to_string(), "4px * 2".to_string());

        let (css, _) = compile_source_with_options(
            "$gutter: 1px !default; .a { color: $accent; margin: $gutter; }",
            "main.scss",
            options,
        )
        .unwrap();
        assert_eq!(css, ".a {\n\tcolor: #336699;\n\tmargin: 8px;\n}\n");

        let mut invalid = CompilerOptions::default();
        invalid.custom_variables.insert("bad name".to_string(), "1".to_string());
        let result = compile_source_with_options("", "main.scss", invalid);
        assert!(matches!(result, Err(CompilerError::InvalidFormat { .. })));
    }

    #[test]
    fn test_compile_file_with_imports_and_stats() {
        let temp_dir = TempDir::new().unwrap();
        let lib_dir = temp_dir.path().join("lib");
        fs::create_dir(&lib_dir).unwrap();
        fs::write(lib_dir.join("_mixins.scss"), "@mixin pad { padding: 1px; }\n%base { margin: 0; }").unwrap();

        let input_path = temp_dir.path().join("main.scss");
        let output_path = temp_dir.path().join("main.css");
        fs::write(
            &input_path,
            "@import \"mixins\";\n.a { @include pad; @extend %base; @media print { color: black; } }",
        )
        .unwrap();

        let options = CompilerOptions {
            include_directories: vec![lib_dir.to_string_lossy().to_string()],
            ..Default::default()
        };
        let stats = compile_file_with_options(
            input_path.to_str().unwrap(),
            output_path.to_str().unwrap(),
            options,
        )
        .unwrap();

        let output = fs::read_to_string(&output_path).unwrap();
        assert_eq!(
            output,
            ".a {\n\tmargin: 0;\n}\n\n.a {\n\tpadding: 1px;\n}\n\n@media print {\n\t.a {\n\t\tcolor: black;\n\t}\n}\n"
        );
        assert_eq!(stats.import_count, 1);
        assert_eq!(stats.extension_count, 1);
        assert_eq!(stats.rule_count, 3);
        assert_eq!(stats.media_count, 1);
        assert_eq!(stats.output_size, output.len() as u64);
    }

    #[test]
    fn test_missing_input_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.scss");
        let output = temp_dir.path().join("out.css");
        let result = compile_file(missing.to_str().unwrap(), output.to_str().unwrap());
        assert!(matches!(result, Err(CompilerError::FileNotFound { .. })));
    }

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert_eq!(info.name, "scssc");
        assert!(supports_feature("extend"));
        assert!(!supports_feature("modules"));
    }

    #[test]
    fn test_compiler_options_default() {
        let options = CompilerOptions::default();
        assert!(!options.debug_mode);
        assert_eq!(options.url_mode, UrlMode::Mixed);
        assert!(options.include_directories.is_empty());
        assert!(options.custom_variables.is_empty());
        assert_eq!(options.max_import_depth, MAX_IMPORT_DEPTH);
    }
}
