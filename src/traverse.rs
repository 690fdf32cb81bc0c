//! Pass one: evaluate a parsed stylesheet into plain CSS nodes
//!
//! Nested rules are flattened into top-level siblings with `&` resolved,
//! `@media` bubbles out of rules, mixins, control directives and imports
//! are expanded in place, and every `@extend` is recorded in the context
//! for the rewrite pass. The input tree is only read; traversal builds a
//! new one.

use crate::ast::{
    AtRuleNode, BlockNode, DeclarationNode, EachNode, ExtendNode, ForNode, IfNode, ImportNode, IncludeNode, MediaNode,
    Node, NodeKind, SelectorSource, WhileNode,
};
use crate::context::{ContentBlock, Extension, ParentBlock, ScssContext};
use crate::error::{CompilerError, Result};
use crate::evaluator::{
    assign_variable, bind_each_variables, bind_parameters, each_items, emit_diagnostic, evaluate, evaluate_arguments,
    for_range, interpolate, scoped, select_branch,
};
use crate::importer::{is_plain_css_import, url_prefix_for};
use crate::parser::parse_stylesheet;
use crate::selector::{parse_selector_list, Selector};
use crate::types::{SourcePosition, UrlMode, MAX_WHILE_ITERATIONS};
use crate::value::{Interpolation, Value};
use std::rc::Rc;

pub fn traverse_stylesheet(children: Vec<Node>, context: &mut ScssContext) -> Result<Vec<Node>> {
    let mut output = Vec::new();
    traverse_children(&children, context, &mut output)?;

    if let Some(node) = output.iter().find(|n| matches!(n.kind, NodeKind::Declaration(_))) {
        return Err(CompilerError::compile(
            &node.position,
            "Properties are only allowed within rules, directives or other properties",
        ));
    }
    log::debug!("Traversal produced {} top-level node(s)", output.len());
    Ok(output)
}

fn traverse_children(nodes: &[Node], context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    for node in nodes {
        traverse_node(node, context, out)?;
    }
    Ok(())
}

fn traverse_node(node: &Node, context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    let position = &node.position;
    match &node.kind {
        NodeKind::Block(block) => traverse_block(block, position, context, out),
        NodeKind::Declaration(declaration) => {
            out.push(Node::new(
                position.clone(),
                NodeKind::Declaration(evaluate_declaration(declaration, context, position)?),
            ));
            Ok(())
        }
        NodeKind::Variable(variable) => assign_variable(variable, context, position),
        NodeKind::Media(media) => traverse_media(media, position, context, out),
        NodeKind::Extend(extend) => record_extend(extend, position, context),
        NodeKind::MixinDef(mixin) => {
            context.define_mixin(Rc::clone(mixin));
            Ok(())
        }
        NodeKind::FunctionDef(function) => {
            context.define_function(Rc::clone(function));
            Ok(())
        }
        NodeKind::Include(include) => traverse_include(include, position, context, out),
        NodeKind::Content => traverse_content(context, out),
        NodeKind::Return(_) => Err(CompilerError::compile(position, "@return may only be used within a function")),
        NodeKind::If(if_node) => traverse_if(if_node, position, context, out),
        NodeKind::Each(each) => traverse_each(each, position, context, out),
        NodeKind::For(for_node) => traverse_for(for_node, position, context, out),
        NodeKind::While(while_node) => traverse_while(while_node, position, context, out),
        NodeKind::Import(import) => traverse_import(import, position, context, out),
        NodeKind::Comment(_) => {
            out.push(node.clone());
            Ok(())
        }
        NodeKind::AtRule(rule) => traverse_at_rule(rule, position, context, out),
        NodeKind::Diagnostic(diagnostic) => emit_diagnostic(diagnostic, context, position),
    }
}

// --- control directives ---

fn traverse_if(if_node: &IfNode, position: &SourcePosition, context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    match select_branch(&if_node.branches, context, position)? {
        Some(children) => scoped(context, |ctx| traverse_children(children, ctx, out)),
        None => Ok(()),
    }
}

fn traverse_each(each: &EachNode, position: &SourcePosition, context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    for item in each_items(each, context, position)? {
        scoped(context, |ctx| {
            bind_each_variables(&each.variables, &item, ctx);
            traverse_children(&each.children, ctx, out)
        })?;
    }
    Ok(())
}

fn traverse_for(for_node: &ForNode, position: &SourcePosition, context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    for index in for_range(for_node, context, position)? {
        scoped(context, |ctx| {
            ctx.define_local(&for_node.variable, index);
            traverse_children(&for_node.children, ctx, out)
        })?;
    }
    Ok(())
}

fn traverse_while(while_node: &WhileNode, position: &SourcePosition, context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    let mut iterations = 0;
    while evaluate(&while_node.condition, context, true, position)?.is_truthy() {
        iterations += 1;
        if iterations > MAX_WHILE_ITERATIONS {
            return Err(CompilerError::limit("@while iterations", MAX_WHILE_ITERATIONS));
        }
        scoped(context, |ctx| traverse_children(&while_node.children, ctx, out))?;
    }
    Ok(())
}

// --- rules ---

fn traverse_block(block: &BlockNode, position: &SourcePosition, context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    let own = resolve_selectors(&block.selectors, context, position)?;
    let (selectors, parent_selectors) = match context.parent_block().clone() {
        ParentBlock::TopLevel => (strip_top_level_parents(own, context, position), Vec::new()),
        ParentBlock::Block { selectors: parents, .. } => (nest_selectors(&own, &parents, position)?, parents),
    };
    if selectors.is_empty() {
        return Ok(());
    }
    log::trace!("Traversing rule {}", join_selectors(&selectors));

    let mut results = Vec::new();
    scoped(context, |ctx| {
        ctx.set_parent_block(ParentBlock::Block {
            selectors: selectors.clone(),
            parent_selectors,
        });
        traverse_children(&block.children, ctx, &mut results)
    })?;

    // Own declarations form one block placed before the nested rules
    let (leaves, nested): (Vec<Node>, Vec<Node>) = results
        .into_iter()
        .partition(|n| matches!(n.kind, NodeKind::Declaration(_) | NodeKind::Comment(_)));
    if !leaves.is_empty() {
        out.push(Node::new(
            position.clone(),
            NodeKind::Block(BlockNode::resolved(selectors, leaves)),
        ));
    }
    out.extend(nested);
    Ok(())
}

fn resolve_selectors(source: &SelectorSource, context: &mut ScssContext, position: &SourcePosition) -> Result<Vec<Selector>> {
    match source {
        SelectorSource::Parsed(selectors) => Ok(selectors.clone()),
        SelectorSource::Interpolated(interpolation) => {
            let text = interpolate(interpolation, context, position)?;
            parse_selector_list(&text, position)
        }
    }
}

/// Parent selectors are the outer loop so rules of one parent stay together
fn nest_selectors(own: &[Selector], parents: &[Selector], position: &SourcePosition) -> Result<Vec<Selector>> {
    let mut nested: Vec<Selector> = Vec::with_capacity(own.len() * parents.len());
    for parent in parents {
        for selector in own {
            let resolved = selector.replace_parent_references(parent, position)?;
            if !nested.contains(&resolved) {
                nested.push(resolved);
            }
        }
    }
    Ok(nested)
}

fn strip_top_level_parents(selectors: Vec<Selector>, context: &mut ScssContext, position: &SourcePosition) -> Vec<Selector> {
    let mut kept = Vec::with_capacity(selectors.len());
    for selector in selectors {
        if !selector.has_parent_reference() {
            kept.push(selector);
            continue;
        }
        context.warn(
            position,
            format!("Base-level rules cannot contain the parent-selector-referencing character '&' in \"{}\"", selector),
        );
        if let Some(stripped) = selector.strip_parent_references() {
            kept.push(stripped);
        }
    }
    kept
}

fn join_selectors(selectors: &[Selector]) -> String {
    selectors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn evaluate_declaration(
    declaration: &DeclarationNode,
    context: &mut ScssContext,
    position: &SourcePosition,
) -> Result<DeclarationNode> {
    let name = interpolate(&declaration.name, context, position)?;
    let mut value = evaluate(&declaration.value, context, false, position)?;

    let prefix = context.url_prefix();
    if !prefix.is_empty() {
        let rewrite = match context.url_mode() {
            UrlMode::Relative => true,
            UrlMode::Mixed => value.is_single_url(),
            UrlMode::Absolute => false,
        };
        if rewrite {
            value = value.update_url(prefix);
        }
    }

    Ok(DeclarationNode {
        name: Interpolation::literal(name),
        value,
        important: declaration.important,
    })
}

// --- media and other at-rules ---

fn traverse_media(media: &MediaNode, position: &SourcePosition, context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    let query = interpolate(&media.query, context, position)?.trim().to_string();

    let mut results = Vec::new();
    traverse_bubbling(&media.children, position, context, &mut results)?;

    // Media nested directly in this one merges into a single query
    let mut children = Vec::new();
    let mut merged = Vec::new();
    for result in results {
        match result.kind {
            NodeKind::Media(inner) => {
                let inner_query = inner.query.to_string();
                let combined = match (query.is_empty(), inner_query.is_empty()) {
                    (true, _) => inner_query,
                    (_, true) => query.clone(),
                    _ => format!("{} and {}", query, inner_query),
                };
                merged.push(Node::new(
                    result.position,
                    NodeKind::Media(MediaNode {
                        query: Interpolation::literal(combined),
                        children: inner.children,
                    }),
                ));
            }
            kind => children.push(Node::new(result.position, kind)),
        }
    }

    if !children.is_empty() {
        out.push(Node::new(
            position.clone(),
            NodeKind::Media(MediaNode {
                query: Interpolation::literal(query),
                children,
            }),
        ));
    }
    out.extend(merged);
    Ok(())
}

/// Traverse the body of a directive that moves to the top level. Inside a
/// rule the body is wrapped in a copy of the enclosing rule first, so its
/// declarations keep their selectors once lifted out.
fn traverse_bubbling(children: &[Node], position: &SourcePosition, context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    match context.parent_block().clone() {
        ParentBlock::TopLevel => scoped(context, |ctx| traverse_children(children, ctx, out)),
        ParentBlock::Block { selectors, .. } => {
            let wrapper = Node::new(
                position.clone(),
                NodeKind::Block(BlockNode::resolved(selectors, children.to_vec())),
            );
            scoped(context, |ctx| {
                ctx.set_parent_block(ParentBlock::TopLevel);
                traverse_node(&wrapper, ctx, out)
            })
        }
    }
}

/// Directives whose body holds its own rules or descriptors rather than
/// declarations for the enclosing selector
fn keeps_own_body(name: &str) -> bool {
    name.ends_with("keyframes") || name == "font-face" || name == "page"
}

fn traverse_at_rule(rule: &AtRuleNode, position: &SourcePosition, context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    let prelude = interpolate(&rule.prelude, context, position)?;
    let children = match &rule.children {
        None => None,
        Some(children) => {
            let mut results = Vec::new();
            if keeps_own_body(&rule.name) {
                scoped(context, |ctx| {
                    ctx.set_parent_block(ParentBlock::TopLevel);
                    traverse_children(children, ctx, &mut results)
                })?;
            } else {
                traverse_bubbling(children, position, context, &mut results)?;
            }
            Some(results)
        }
    };
    out.push(Node::new(
        position.clone(),
        NodeKind::AtRule(AtRuleNode {
            name: rule.name.clone(),
            prelude: Interpolation::literal(prelude.trim()),
            children,
        }),
    ));
    Ok(())
}

// --- extend ---

fn record_extend(extend: &ExtendNode, position: &SourcePosition, context: &mut ScssContext) -> Result<()> {
    let (selectors, parent_selectors) = match context.parent_block() {
        ParentBlock::TopLevel => {
            return Err(CompilerError::compile(position, "@extend may only be used within rules"));
        }
        ParentBlock::Block {
            selectors,
            parent_selectors,
        } => (selectors.clone(), parent_selectors.clone()),
    };

    for target in resolve_selectors(&extend.selectors, context, position)? {
        let sequence = match target.last_sequence() {
            Some(sequence) if target.is_simple() => sequence.clone(),
            _ => {
                return Err(CompilerError::parse(
                    position,
                    format!("Nested selector not allowed in @extend-clause: \"{}\"", target),
                ))
            }
        };
        for selector in &selectors {
            context.add_extension(Extension::new(
                sequence.clone(),
                selector.clone(),
                parent_selectors.clone(),
                extend.optional,
                position.clone(),
            ));
        }
    }
    Ok(())
}

// --- mixins ---

fn traverse_include(include: &IncludeNode, position: &SourcePosition, context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    let mixin = context
        .mixin(&include.name)
        .ok_or_else(|| CompilerError::compile(position, format!("Undefined mixin: '{}'", include.name)))?;
    let args = evaluate_arguments(&include.args, context, position)?;
    let bound = mixin.parameters.bind(&mixin.name, &args, position)?;
    let content = include.content.as_ref().map(|children| ContentBlock {
        children: Rc::clone(children),
        scope_depth: context.scope_depth(),
    });
    log::trace!("Including mixin {}", mixin.name);

    context.enter_call(&mixin.name, position)?;
    context.push_content(content);
    let result = scoped(context, |ctx| {
        bind_parameters(&bound, ctx, position)?;
        traverse_children(&mixin.children, ctx, out)
    });
    context.pop_content();
    context.exit_call();
    result
}

/// `@content` runs with the frames visible at the include site only
fn traverse_content(context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    let content = match context.current_content() {
        Some(content) => content,
        None => return Ok(()),
    };
    let parent = context.parent_block().clone();
    let own = context.pop_content();
    let hidden = context.hide_frames_above(content.scope_depth);
    let result = scoped(context, |ctx| {
        ctx.set_parent_block(parent);
        traverse_children(&content.children, ctx, out)
    });
    context.restore_frames(hidden);
    context.push_content(own);
    result
}

// --- imports ---

fn traverse_import(import: &ImportNode, position: &SourcePosition, context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    let uri = evaluate(&import.uri, context, false, position)?;
    let media = match &import.media {
        Some(media) => Some(interpolate(media, context, position)?.trim().to_string()),
        None => None,
    };
    let has_media = media.as_deref().map_or(false, |m| !m.is_empty() && !m.eq_ignore_ascii_case("all"));

    let target = match &uri {
        Value::Str { text, .. } | Value::Ident(text) => Some(text.clone()),
        _ => None,
    };
    if let Some(target) = target.filter(|t| !is_plain_css_import(t, has_media)) {
        return inline_import(&target, position, context, out);
    }

    let uri = if context.url_mode() == UrlMode::Relative {
        uri.update_url(context.url_prefix())
    } else {
        uri
    };
    log::trace!("Passing through @import {}", uri);
    out.push(Node::new(
        position.clone(),
        NodeKind::Import(ImportNode {
            uri,
            media: media.filter(|m| !m.is_empty()).map(Interpolation::literal),
        }),
    ));
    Ok(())
}

/// Parse the imported file and traverse its children in place of the import
fn inline_import(target: &str, position: &SourcePosition, context: &mut ScssContext, out: &mut Vec<Node>) -> Result<()> {
    let resolved = context.resolve_import(target)?.ok_or_else(|| {
        CompilerError::import(format!(
            "File to import not found or unreadable: '{}' (imported from {} at line {})",
            target,
            context.current_uri(),
            position.line
        ))
    })?;
    let prefix = url_prefix_for(context.url_prefix(), target);
    let stylesheet = parse_stylesheet(&resolved.content, &resolved.uri)?;

    context.enter_import(&resolved.uri, prefix)?;
    let result = traverse_children(&stylesheet.children, context, out);
    context.exit_import();
    result
}
