//! Compile-time context: lexical scopes and pass-one bookkeeping
//!
//! One [`ScssContext`] is built per compile. It holds:
//! - a strict stack of scope frames (variables, mixins, functions, parent block)
//! - the extensions recorded by `@extend`, consumed by the rewrite pass
//! - the import stack with the url prefix of each imported file
//! - the `@content` blocks of the mixins currently being expanded
//!
//! Variable assignment policy: a plain `$x: v` rebinds the innermost frame
//! that already binds `$x`, walking outward through every frame; if no frame
//! binds it the name is defined in the current frame. `!global` always writes
//! the root frame and `!default` assigns only when the name is unbound or null.
//! Mixin and function parameters and loop variables are always local.

use crate::ast::{FunctionDefinition, MixinDefinition, Node};
use crate::error::{CompilerError, Result};
use crate::importer::{FilesystemResolver, ImportResolver, ResolvedSource};
use crate::selector::{Selector, SimpleSelectorSequence};
use crate::types::{SourcePosition, UrlMode, MAX_CALL_DEPTH, MAX_IMPORT_DEPTH};
use crate::value::Value;
use indexmap::IndexMap;
use std::rc::Rc;

/// A recorded `@extend`: which compound is extended, by which selector, and
/// the selectors enclosing the extending rule when it was declared
#[derive(Debug, Clone)]
pub struct Extension {
    pub target: SimpleSelectorSequence,
    pub extending: Selector,
    pub context: Vec<Selector>,
    pub optional: bool,
    pub position: SourcePosition,
}

impl Extension {
    pub fn new(
        target: SimpleSelectorSequence,
        extending: Selector,
        context: Vec<Selector>,
        optional: bool,
        position: SourcePosition,
    ) -> Self {
        Self {
            target,
            extending,
            context,
            optional,
            position,
        }
    }
}

/// The rule enclosing the node being traversed
#[derive(Debug, Clone, PartialEq)]
pub enum ParentBlock {
    TopLevel,
    Block {
        selectors: Vec<Selector>,
        /// Selectors of the rule enclosing this one
        parent_selectors: Vec<Selector>,
    },
}

impl ParentBlock {
    pub fn selectors(&self) -> &[Selector] {
        match self {
            ParentBlock::TopLevel => &[],
            ParentBlock::Block { selectors, .. } => selectors,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScopeFrame {
    variables: IndexMap<String, Value>,
    mixins: IndexMap<String, Rc<MixinDefinition>>,
    functions: IndexMap<String, Rc<FunctionDefinition>>,
    /// `None` inherits the parent block of the enclosing frame
    parent_block: Option<ParentBlock>,
}

/// Body passed to a mixin with `@include name { ... }`
#[derive(Debug, Clone)]
pub struct ContentBlock {
    pub children: Rc<Vec<Node>>,
    /// Number of frames visible at the include site
    pub scope_depth: usize,
}

#[derive(Debug, Clone)]
struct ImportFrame {
    uri: String,
    url_prefix: String,
}

pub struct ScssContext {
    frames: Vec<ScopeFrame>,
    extensions: Vec<Extension>,
    url_mode: UrlMode,
    resolver: Box<dyn ImportResolver>,
    imports: Vec<ImportFrame>,
    max_import_depth: usize,
    import_count: usize,
    content_stack: Vec<Option<ContentBlock>>,
    call_depth: usize,
    warnings: Vec<String>,
}

/// `$foo-bar` and `$foo_bar` name the same binding
fn normalize(name: &str) -> String {
    name.replace('_', "-")
}

impl ScssContext {
    pub fn new(url_mode: UrlMode) -> Self {
        Self::with_resolver(url_mode, Box::new(FilesystemResolver::new(Vec::new())))
    }

    pub fn with_resolver(url_mode: UrlMode, resolver: Box<dyn ImportResolver>) -> Self {
        let root = ScopeFrame {
            parent_block: Some(ParentBlock::TopLevel),
            ..ScopeFrame::default()
        };
        Self {
            frames: vec![root],
            extensions: Vec::new(),
            url_mode,
            resolver,
            imports: Vec::new(),
            max_import_depth: MAX_IMPORT_DEPTH,
            import_count: 0,
            content_stack: Vec::new(),
            call_depth: 0,
            warnings: Vec::new(),
        }
    }

    pub fn url_mode(&self) -> UrlMode {
        self.url_mode
    }

    pub fn set_max_import_depth(&mut self, depth: usize) {
        self.max_import_depth = depth;
    }

    // --- scopes ---

    pub fn open_scope(&mut self) {
        self.frames.push(ScopeFrame::default());
    }

    pub fn close_scope(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        } else {
            log::warn!("Attempted to close the root scope");
        }
    }

    pub fn scope_depth(&self) -> usize {
        self.frames.len()
    }

    /// Detach every frame above `depth` so lookups see only the outer
    /// frames. Must be paired with [`restore_frames`](Self::restore_frames).
    pub fn hide_frames_above(&mut self, depth: usize) -> Vec<ScopeFrame> {
        let depth = depth.clamp(1, self.frames.len());
        self.frames.split_off(depth)
    }

    pub fn restore_frames(&mut self, frames: Vec<ScopeFrame>) {
        self.frames.extend(frames);
    }

    // --- variables ---

    pub fn variable(&self, name: &str) -> Option<&Value> {
        let key = normalize(name);
        self.frames.iter().rev().find_map(|frame| frame.variables.get(&key))
    }

    pub fn set_variable(&mut self, name: &str, value: Value) {
        let key = normalize(name);
        if let Some(frame) = self.frames.iter_mut().rev().find(|f| f.variables.contains_key(&key)) {
            frame.variables.insert(key, value);
        } else {
            self.define_local_key(key, value);
        }
    }

    pub fn set_variable_default(&mut self, name: &str, value: Value) {
        if self.variable(name).map_or(true, Value::is_null) {
            self.set_variable(name, value);
        }
    }

    pub fn set_global_variable(&mut self, name: &str, value: Value) {
        self.frames[0].variables.insert(normalize(name), value);
    }

    pub fn define_local(&mut self, name: &str, value: Value) {
        self.define_local_key(normalize(name), value);
    }

    fn define_local_key(&mut self, key: String, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.variables.insert(key, value);
        }
    }

    // --- mixins and functions ---

    pub fn define_mixin(&mut self, mixin: Rc<MixinDefinition>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.mixins.insert(normalize(&mixin.name), mixin);
        }
    }

    pub fn mixin(&self, name: &str) -> Option<Rc<MixinDefinition>> {
        let key = normalize(name);
        self.frames.iter().rev().find_map(|f| f.mixins.get(&key).cloned())
    }

    pub fn define_function(&mut self, function: Rc<FunctionDefinition>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.functions.insert(normalize(&function.name), function);
        }
    }

    pub fn function(&self, name: &str) -> Option<Rc<FunctionDefinition>> {
        let key = normalize(name);
        self.frames.iter().rev().find_map(|f| f.functions.get(&key).cloned())
    }

    /// Guard against runaway mixin or function recursion
    pub fn enter_call(&mut self, name: &str, position: &SourcePosition) -> Result<()> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(CompilerError::compile(
                position,
                format!("Maximum call depth ({}) exceeded calling '{}'", MAX_CALL_DEPTH, name),
            ));
        }
        self.call_depth += 1;
        Ok(())
    }

    pub fn exit_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    // --- parent block ---

    pub fn parent_block(&self) -> &ParentBlock {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.parent_block.as_ref())
            .unwrap_or(&ParentBlock::TopLevel)
    }

    pub fn set_parent_block(&mut self, block: ParentBlock) {
        if let Some(frame) = self.frames.last_mut() {
            frame.parent_block = Some(block);
        }
    }

    // --- extensions ---

    pub fn add_extension(&mut self, extension: Extension) {
        log::trace!("Recorded @extend {} by {}", extension.target, extension.extending);
        self.extensions.push(extension);
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    // --- mixin content ---

    pub fn push_content(&mut self, content: Option<ContentBlock>) {
        self.content_stack.push(content);
    }

    pub fn pop_content(&mut self) -> Option<ContentBlock> {
        self.content_stack.pop().flatten()
    }

    pub fn current_content(&self) -> Option<ContentBlock> {
        self.content_stack.last().cloned().flatten()
    }

    // --- imports ---

    pub fn enter_root(&mut self, uri: &str) {
        self.imports.clear();
        self.imports.push(ImportFrame {
            uri: uri.to_string(),
            url_prefix: String::new(),
        });
    }

    pub fn current_uri(&self) -> &str {
        self.imports.last().map(|f| f.uri.as_str()).unwrap_or("")
    }

    /// Url prefix of the file being traversed; empty for the root stylesheet
    pub fn url_prefix(&self) -> &str {
        self.imports.last().map(|f| f.url_prefix.as_str()).unwrap_or("")
    }

    pub fn enter_import(&mut self, uri: &str, url_prefix: String) -> Result<()> {
        if self.imports.len() > self.max_import_depth {
            return Err(CompilerError::limit("import depth", self.max_import_depth));
        }
        if self.imports.iter().any(|f| f.uri == uri) {
            return Err(CompilerError::import(format!("Circular import detected: '{}'", uri)));
        }
        log::debug!("Importing {} (url prefix '{}')", uri, url_prefix);
        self.import_count += 1;
        self.imports.push(ImportFrame {
            uri: uri.to_string(),
            url_prefix,
        });
        Ok(())
    }

    pub fn exit_import(&mut self) {
        if self.imports.len() > 1 {
            self.imports.pop();
        }
    }

    pub fn import_count(&self) -> usize {
        self.import_count
    }

    pub fn resolve_import(&self, target: &str) -> Result<Option<ResolvedSource>> {
        self.resolver.resolve(self.current_uri(), target)
    }

    // --- diagnostics ---

    pub fn warn(&mut self, position: &SourcePosition, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}: {}", position, message);
        self.warnings.push(format!("{}: {}", position, message));
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(v: f64) -> Value {
        Value::number(v, "px")
    }

    #[test]
    fn test_scope_lookup_walks_outward() {
        let mut ctx = ScssContext::new(UrlMode::Mixed);
        ctx.set_variable("width", px(10.0));
        ctx.open_scope();
        ctx.define_local("inner", px(1.0));
        assert_eq!(ctx.variable("width"), Some(&px(10.0)));
        assert_eq!(ctx.variable("inner"), Some(&px(1.0)));
        ctx.close_scope();
        assert!(ctx.variable("inner").is_none());
    }

    #[test]
    fn test_assignment_rebinds_existing_outer_binding() {
        let mut ctx = ScssContext::new(UrlMode::Mixed);
        ctx.set_variable("x", px(1.0));
        ctx.open_scope();
        ctx.set_variable("x", px(2.0));
        ctx.set_variable("fresh", px(3.0));
        ctx.close_scope();
        assert_eq!(ctx.variable("x"), Some(&px(2.0)));
        assert!(ctx.variable("fresh").is_none());
    }

    #[test]
    fn test_local_parameter_shadows_without_leaking() {
        let mut ctx = ScssContext::new(UrlMode::Mixed);
        ctx.set_variable("x", px(1.0));
        ctx.open_scope();
        ctx.define_local("x", px(5.0));
        ctx.set_variable("x", px(6.0));
        assert_eq!(ctx.variable("x"), Some(&px(6.0)));
        ctx.close_scope();
        assert_eq!(ctx.variable("x"), Some(&px(1.0)));
    }

    #[test]
    fn test_default_and_global_flags() {
        let mut ctx = ScssContext::new(UrlMode::Mixed);
        ctx.set_variable_default("a", px(1.0));
        ctx.set_variable_default("a", px(2.0));
        assert_eq!(ctx.variable("a"), Some(&px(1.0)));

        ctx.open_scope();
        ctx.open_scope();
        ctx.set_global_variable("g", px(4.0));
        ctx.close_scope();
        ctx.close_scope();
        assert_eq!(ctx.variable("g"), Some(&px(4.0)));
    }

    #[test]
    fn test_hyphen_and_underscore_names_match() {
        let mut ctx = ScssContext::new(UrlMode::Mixed);
        ctx.set_variable("main_color", Value::ident("red"));
        assert_eq!(ctx.variable("main-color"), Some(&Value::ident("red")));
    }

    #[test]
    fn test_root_scope_is_never_closed() {
        let mut ctx = ScssContext::new(UrlMode::Mixed);
        ctx.close_scope();
        assert_eq!(ctx.scope_depth(), 1);
        assert_eq!(ctx.parent_block(), &ParentBlock::TopLevel);
    }

    #[test]
    fn test_hidden_frames_are_restored() {
        let mut ctx = ScssContext::new(UrlMode::Mixed);
        ctx.open_scope();
        ctx.define_local("inner", px(1.0));
        let hidden = ctx.hide_frames_above(1);
        assert!(ctx.variable("inner").is_none());
        ctx.restore_frames(hidden);
        assert_eq!(ctx.variable("inner"), Some(&px(1.0)));
    }

    #[test]
    fn test_circular_import_rejected() {
        let mut ctx = ScssContext::new(UrlMode::Relative);
        ctx.enter_root("main.scss");
        ctx.enter_import("a.scss", "a/".to_string()).unwrap();
        assert_eq!(ctx.url_prefix(), "a/");
        assert!(ctx.enter_import("main.scss", String::new()).is_err());
        ctx.exit_import();
        assert_eq!(ctx.url_prefix(), "");
        assert_eq!(ctx.import_count(), 1);
    }
}
