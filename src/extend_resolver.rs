//! Pass two: apply the recorded `@extend`s to the traversed tree
//!
//! Each rule's selector list grows to its closure under the recorded
//! extensions. Selectors that can never match (placeholders, conflicting
//! ids) are then removed, followed by the generated selectors made
//! redundant by a more general one. Rules left without selectors are
//! dropped, and so are `@media` blocks left empty.

use crate::ast::{AtRuleNode, BlockNode, MediaNode, Node, NodeKind};
use crate::context::{Extension, ScssContext};
use crate::error::{CompilerError, Result};
use crate::selector::{Selector, SelectorSet};
use crate::types::MAX_EXTEND_SELECTORS;
use std::collections::VecDeque;

pub fn modify_tree(nodes: Vec<Node>, context: &mut ScssContext) -> Result<Vec<Node>> {
    let mut resolver = ExtendResolver::new(context.extensions().to_vec());
    let nodes = resolver.rewrite_nodes(nodes)?;

    for extension in resolver.unmatched() {
        context.warn(
            &extension.position,
            format!(
                "\"{}\" failed to @extend \"{}\": the selector was not found. Use \"@extend {} !optional\" if the extend should be able to fail.",
                extension.extending, extension.target, extension.target
            ),
        );
    }
    Ok(nodes)
}

struct ExtendResolver {
    extensions: Vec<Extension>,
    /// Whether each extension produced at least one selector
    matched: Vec<bool>,
}

impl ExtendResolver {
    fn new(extensions: Vec<Extension>) -> Self {
        let matched = vec![false; extensions.len()];
        Self { extensions, matched }
    }

    fn unmatched(&self) -> impl Iterator<Item = &Extension> {
        self.extensions
            .iter()
            .zip(&self.matched)
            .filter(|(extension, matched)| !**matched && !extension.optional)
            .map(|(extension, _)| extension)
    }

    fn rewrite_nodes(&mut self, nodes: Vec<Node>) -> Result<Vec<Node>> {
        let mut output = Vec::with_capacity(nodes.len());
        for node in nodes {
            let Node { position, kind } = node;
            let kind = match kind {
                NodeKind::Block(block) => {
                    let original = block.selector_list().to_vec();
                    let selectors = self.extend_selectors(original)?;
                    if selectors.is_empty() {
                        log::trace!("Dropping rule at {} with no matchable selector", position);
                        continue;
                    }
                    NodeKind::Block(BlockNode::resolved(selectors, block.children))
                }
                NodeKind::Media(media) => {
                    let children = self.rewrite_nodes(media.children)?;
                    if children.is_empty() {
                        continue;
                    }
                    NodeKind::Media(MediaNode {
                        query: media.query,
                        children,
                    })
                }
                NodeKind::AtRule(rule) => {
                    let children = match rule.children {
                        Some(children) => Some(self.rewrite_nodes(children)?),
                        None => None,
                    };
                    NodeKind::AtRule(AtRuleNode {
                        name: rule.name,
                        prelude: rule.prelude,
                        children,
                    })
                }
                other => other,
            };
            output.push(Node::new(position, kind));
        }
        Ok(output)
    }

    /// Closure of `original` under every extension, in first-seen order
    fn extend_selectors(&mut self, original: Vec<Selector>) -> Result<Vec<Selector>> {
        let mut set: SelectorSet = original.into_iter().collect();
        let original_count = set.len();

        let mut queue: VecDeque<Selector> = set.iter().cloned().collect();
        while let Some(selector) = queue.pop_front() {
            for (index, extension) in self.extensions.iter().enumerate() {
                for generated in selector.extend_with(extension) {
                    self.matched[index] = true;
                    if !set.insert(generated.clone()) {
                        continue;
                    }
                    if set.len() > MAX_EXTEND_SELECTORS {
                        return Err(CompilerError::limit("@extend selectors per rule", MAX_EXTEND_SELECTORS));
                    }
                    log::trace!("{} extended to {}", selector, generated);
                    queue.push_back(generated);
                }
            }
        }

        let matchable = |s: &Selector| !s.cannot_match_anything() && !s.has_placeholder();
        let protected = set.iter().take(original_count).filter(|s| matchable(s)).count();
        set.retain(matchable);
        set.eliminate_redundant_from(protected);
        Ok(set.into_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Stylesheet;
    use crate::types::UrlMode;

    fn compile(source: &str) -> (String, ScssContext) {
        let mut context = ScssContext::new(UrlMode::Mixed);
        let css = Stylesheet::parse(source, "main.scss")
            .unwrap()
            .compile_with(&mut context)
            .unwrap()
            .print_state();
        (css, context)
    }

    #[test]
    fn test_extend_compound_selector() {
        let (css, context) = compile(".a.b { color: red; }\n.c { @extend .a; }");
        assert_eq!(css, ".a.b, .b.c {\n\tcolor: red;\n}\n");
        assert!(context.warnings().is_empty());
    }

    #[test]
    fn test_extend_chain() {
        let (css, _) = compile(".a { x: 1; }\n.b { @extend .a; }\n.c { @extend .b; }");
        assert_eq!(css, ".a, .b, .c {\n\tx: 1;\n}\n");
    }

    #[test]
    fn test_placeholders_never_reach_output() {
        let (css, _) = compile("%unused { a: b; }");
        assert_eq!(css, "");

        let (css, _) = compile("%button { padding: 0; }\n.save { @extend %button; color: green; }");
        assert_eq!(css, ".save {\n\tpadding: 0;\n}\n\n.save {\n\tcolor: green;\n}\n");
    }

    #[test]
    fn test_extend_reaches_into_media() {
        let (css, _) = compile("@media print { .a { x: 1; } }\n.b { @extend .a; }");
        assert_eq!(css, "@media print {\n\t.a, .b {\n\t\tx: 1;\n\t}\n}\n");
    }

    #[test]
    fn test_media_under_placeholder_follows_extends() {
        let (css, _) = compile("%panel { @media print { x: 1; } }");
        assert_eq!(css, "");

        let (css, _) = compile("%panel { @media print { x: 1; } }\n.card { @extend %panel; }");
        assert_eq!(css, "@media print {\n\t.card {\n\t\tx: 1;\n\t}\n}\n");
    }

    #[test]
    fn test_unmatched_extend_warns_unless_optional() {
        let (_, context) = compile(".a { @extend .missing; }");
        assert_eq!(context.warnings().len(), 1);
        assert!(context.warnings()[0].contains("failed to @extend \".missing\""));

        let (_, context) = compile(".a { @extend .missing !optional; }");
        assert!(context.warnings().is_empty());
    }

    #[test]
    fn test_conflicting_ids_are_discarded() {
        let (css, _) = compile("#a.x { y: 1; }\n#b { @extend .x; }");
        assert_eq!(css, "#a.x {\n\ty: 1;\n}\n");
    }
}
