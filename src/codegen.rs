//! CSS text generation for compiled stylesheets

use crate::ast::{AtRuleNode, BlockNode, DeclarationNode, Node, NodeKind, Stylesheet};

/// Renders a compiled [`Stylesheet`]. Top-level statements are separated by
/// a blank line and nested statements are indented with tabs.
pub struct CssWriter {
    indent: &'static str,
}

impl Default for CssWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CssWriter {
    pub fn new() -> Self {
        Self { indent: "\t" }
    }

    pub fn render(&self, stylesheet: &Stylesheet) -> String {
        let mut parts = Vec::with_capacity(stylesheet.children.len() + 1);
        if let Some(charset) = &stylesheet.charset {
            parts.push(format!("@charset \"{}\";", charset));
        }
        parts.extend(
            stylesheet
                .children
                .iter()
                .map(|node| self.render_node(node, 0))
                .filter(|text| !text.is_empty()),
        );
        if parts.is_empty() {
            return String::new();
        }

        let mut css = parts.join("\n\n");
        css.push('\n');
        log::debug!("Rendered {} top-level statement(s), {} bytes", parts.len(), css.len());
        css
    }

    fn pad(&self, depth: usize) -> String {
        self.indent.repeat(depth)
    }

    /// Empty string for nodes that produce no output
    fn render_node(&self, node: &Node, depth: usize) -> String {
        match &node.kind {
            NodeKind::Block(block) => self.render_block(block, depth),
            NodeKind::Declaration(declaration) => self.render_declaration(declaration, depth),
            NodeKind::Media(media) => {
                let header = format!("@media {}", media.query.to_string().trim());
                self.render_body(&header, &media.children, depth)
            }
            NodeKind::AtRule(rule) => self.render_at_rule(rule, depth),
            NodeKind::Import(import) => {
                let media = match &import.media {
                    Some(media) => format!(" {}", media),
                    None => String::new(),
                };
                format!("{}@import {}{};", self.pad(depth), import.uri, media)
            }
            NodeKind::Comment(text) => format!("{}{}", self.pad(depth), text),
            // Only plain CSS nodes survive traversal
            _ => String::new(),
        }
    }

    fn render_block(&self, block: &BlockNode, depth: usize) -> String {
        let selectors = block
            .selector_list()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        self.render_body(&selectors, &block.children, depth)
    }

    fn render_at_rule(&self, rule: &AtRuleNode, depth: usize) -> String {
        let prelude = rule.prelude.to_string();
        let header = match prelude.trim() {
            "" => format!("@{}", rule.name),
            prelude => format!("@{} {}", rule.name, prelude),
        };
        match &rule.children {
            None => format!("{}{};", self.pad(depth), header),
            Some(children) => self.render_body(&header, children, depth),
        }
    }

    /// `header { ... }` around the rendered children; nothing when every
    /// child renders empty
    fn render_body(&self, header: &str, children: &[Node], depth: usize) -> String {
        let lines: Vec<String> = children
            .iter()
            .map(|child| self.render_node(child, depth + 1))
            .filter(|text| !text.is_empty())
            .collect();
        if lines.is_empty() {
            return String::new();
        }
        let pad = self.pad(depth);
        format!("{}{} {{\n{}\n{}}}", pad, header, lines.join("\n"), pad)
    }

    fn render_declaration(&self, declaration: &DeclarationNode, depth: usize) -> String {
        let value = declaration.value.to_string();
        let value = value.trim();
        if value.is_empty() {
            return String::new();
        }
        let important = if declaration.important { " !important" } else { "" };
        format!("{}{}: {}{};", self.pad(depth), declaration.name, value, important)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::parse_selector_list;
    use crate::types::{SourcePosition, UrlMode};
    use crate::value::{Interpolation, Value};

    fn declaration(name: &str, value: Value, important: bool) -> Node {
        Node::new(
            SourcePosition::new("main.scss", 1, 1),
            NodeKind::Declaration(DeclarationNode {
                name: Interpolation::literal(name),
                value,
                important,
            }),
        )
    }

    fn compile(source: &str) -> String {
        Stylesheet::parse(source, "main.scss")
            .unwrap()
            .compile(UrlMode::Mixed)
            .unwrap()
            .print_state()
    }

    #[test]
    fn test_render_block_skips_empty_values() {
        let position = SourcePosition::new("main.scss", 1, 1);
        let selectors = parse_selector_list(".a, .b > p", &position).unwrap();
        let stylesheet = Stylesheet {
            uri: "main.scss".to_string(),
            charset: Some("UTF-8".to_string()),
            children: vec![Node::new(
                position,
                NodeKind::Block(BlockNode::resolved(
                    selectors,
                    vec![
                        declaration("color", Value::ident("red"), true),
                        declaration("margin", Value::Null, false),
                    ],
                )),
            )],
        };

        assert_eq!(
            CssWriter::new().render(&stylesheet),
            "@charset \"UTF-8\";\n\n.a, .b > p {\n\tcolor: red !important;\n}\n"
        );
    }

    #[test]
    fn test_blocks_without_output_are_omitted() {
        assert_eq!(compile(".a { b: null; }"), "");
        assert_eq!(compile("@media print { .a { b: null; } }"), "");
        assert_eq!(compile(""), "");
    }

    #[test]
    fn test_comments_and_bodiless_at_rules() {
        let css = compile("/* head */\n@namespace svg \"http://www.w3.org/2000/svg\";\n.a { /* note */ b: c; }");
        assert_eq!(
            css,
            "/* head */\n\n@namespace svg \"http://www.w3.org/2000/svg\";\n\n.a {\n\t/* note */\n\tb: c;\n}\n"
        );
    }

    #[test]
    fn test_numbers_and_colors() {
        let css = compile(".a { w: (10px / 3); c: #ff0000 + #000001; d: #FFF; }");
        assert_eq!(css, ".a {\n\tw: 3.33333px;\n\tc: #ff0001;\n\td: #FFF;\n}\n");
    }
}
