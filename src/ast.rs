//! Syntax tree for SCSS stylesheets
//!
//! The parser produces a [`Stylesheet`] of un-evaluated nodes; traversal
//! consumes it and produces a new tree containing only plain CSS nodes.

use crate::context::ScssContext;
use crate::error::Result;
use crate::functions::FormalArguments;
use crate::selector::Selector;
use crate::types::{SourcePosition, UrlMode};
use crate::value::{Argument, Interpolation, Value};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Node {
    pub position: SourcePosition,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(position: SourcePosition, kind: NodeKind) -> Self {
        Self { position, kind }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Block(BlockNode),
    Declaration(DeclarationNode),
    Variable(VariableNode),
    Media(MediaNode),
    Extend(ExtendNode),
    MixinDef(Rc<MixinDefinition>),
    Include(IncludeNode),
    Content,
    FunctionDef(Rc<FunctionDefinition>),
    Return(Value),
    If(IfNode),
    Each(EachNode),
    For(ForNode),
    While(WhileNode),
    Import(ImportNode),
    Comment(String),
    AtRule(AtRuleNode),
    Diagnostic(DiagnosticNode),
}

/// Selectors of a rule, either parsed up front or waiting on interpolation
#[derive(Debug, Clone)]
pub enum SelectorSource {
    Parsed(Vec<Selector>),
    Interpolated(Interpolation),
}

#[derive(Debug, Clone)]
pub struct BlockNode {
    pub selectors: SelectorSource,
    pub children: Vec<Node>,
}

impl BlockNode {
    pub fn resolved(selectors: Vec<Selector>, children: Vec<Node>) -> Self {
        Self {
            selectors: SelectorSource::Parsed(selectors),
            children,
        }
    }

    pub fn selector_list(&self) -> &[Selector] {
        match &self.selectors {
            SelectorSource::Parsed(selectors) => selectors,
            SelectorSource::Interpolated(_) => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeclarationNode {
    pub name: Interpolation,
    pub value: Value,
    pub important: bool,
}

#[derive(Debug, Clone)]
pub struct VariableNode {
    pub name: String,
    pub value: Value,
    pub default: bool,
    pub global: bool,
}

#[derive(Debug, Clone)]
pub struct MediaNode {
    pub query: Interpolation,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct ExtendNode {
    pub selectors: SelectorSource,
    pub optional: bool,
}

#[derive(Debug)]
pub struct MixinDefinition {
    pub name: String,
    pub parameters: FormalArguments,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct IncludeNode {
    pub name: String,
    pub args: Vec<Argument>,
    pub content: Option<Rc<Vec<Node>>>,
}

#[derive(Debug)]
pub struct FunctionDefinition {
    pub name: String,
    pub parameters: FormalArguments,
    pub children: Vec<Node>,
}

/// `@if` with its `@else if` / `@else` chain; `None` marks the final `@else`
#[derive(Debug, Clone)]
pub struct IfNode {
    pub branches: Vec<(Option<Value>, Vec<Node>)>,
}

#[derive(Debug, Clone)]
pub struct EachNode {
    pub variables: Vec<String>,
    pub list: Value,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct ForNode {
    pub variable: String,
    pub from: Value,
    pub to: Value,
    /// `through` includes the end bound, `to` excludes it
    pub inclusive: bool,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct WhileNode {
    pub condition: Value,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct ImportNode {
    pub uri: Value,
    pub media: Option<Interpolation>,
}

#[derive(Debug, Clone)]
pub struct AtRuleNode {
    pub name: String,
    pub prelude: Interpolation,
    pub children: Option<Vec<Node>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Warn,
    Debug,
    Error,
}

#[derive(Debug, Clone)]
pub struct DiagnosticNode {
    pub level: DiagnosticLevel,
    pub message: Value,
}

/// Root of a parsed or compiled stylesheet
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub uri: String,
    pub charset: Option<String>,
    pub children: Vec<Node>,
}

impl Stylesheet {
    pub fn parse(source: &str, uri: &str) -> Result<Stylesheet> {
        crate::parser::parse_stylesheet(source, uri)
    }

    /// Compile with a fresh context. The tree is consumed: compiling the same
    /// source twice requires a second parse or a clone.
    pub fn compile(self, url_mode: UrlMode) -> Result<Stylesheet> {
        let mut context = ScssContext::new(url_mode);
        self.compile_with(&mut context)
    }

    /// Run the traversal pass followed by the `@extend` rewrite pass
    pub fn compile_with(self, context: &mut ScssContext) -> Result<Stylesheet> {
        log::debug!("Traversing {}", self.uri);
        let Stylesheet { uri, charset, children } = self;
        context.enter_root(&uri);
        let traversed = crate::traverse::traverse_stylesheet(children, context)?;

        log::debug!("Resolving {} extension(s)", context.extensions().len());
        let children = crate::extend_resolver::modify_tree(traversed, context)?;

        Ok(Stylesheet { uri, charset, children })
    }

    pub fn print_state(&self) -> String {
        crate::codegen::CssWriter::new().render(self)
    }
}
