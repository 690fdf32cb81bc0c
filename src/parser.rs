//! Parser for SCSS stylesheets
//!
//! A statement is classified by looking ahead to its first top-level `{`,
//! `;` or `}`: a brace opens a rule (or a nested property group), anything
//! else ends a declaration. Selectors, media queries and at-rule preludes
//! are kept as source text with their `#{...}` parts parsed as expressions.

use crate::ast::{
    AtRuleNode, BlockNode, DeclarationNode, DiagnosticLevel, DiagnosticNode, EachNode, ExtendNode, ForNode,
    FunctionDefinition, IfNode, ImportNode, IncludeNode, MediaNode, MixinDefinition, Node, NodeKind, SelectorSource,
    Stylesheet, VariableNode, WhileNode,
};
use crate::color::Color;
use crate::error::{CompilerError, Result};
use crate::functions::FormalArguments;
use crate::lexer::{Lexer, Token, TokenType};
use crate::selector::parse_selector_list;
use crate::types::SourcePosition;
use crate::value::{Argument, ExprToken, FunctionCall, InterpPart, Interpolation, ListSeparator, Operator, Value};
use std::rc::Rc;

pub fn parse_stylesheet(source: &str, uri: &str) -> Result<Stylesheet> {
    let tokens = Lexer::new(source, uri).tokenize()?;
    log::trace!("Lexed {} tokens from {}", tokens.len(), uri);

    let mut parser = Parser::new(tokens, source, uri);
    let children = parser.parse_statements(false)?;
    Ok(Stylesheet {
        uri: uri.to_string(),
        charset: parser.charset.take(),
        children,
    })
}

/// Parse a standalone value, such as one given on the command line or the
/// inside of a `#{...}` embedded in a string
pub fn parse_value(text: &str, position: &SourcePosition) -> Result<Value> {
    let tokens = Lexer::at(text, position).tokenize()?;
    let mut parser = Parser::new(tokens, text, &position.uri);
    parser.skip_whitespace();
    let value = parser.parse_value_list()?;
    parser.skip_whitespace();
    if !parser.is_at_end() {
        return Err(parser.error(format!("Unexpected {} in value", parser.peek().token_type)));
    }
    Ok(value)
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    source: Vec<char>,
    filename: String,
    /// Identifiers that end an expression, such as `to` inside `@for`
    stop_words: &'static [&'static str],
    charset: Option<String>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, source: &str, filename: &str) -> Self {
        Self {
            tokens,
            current: 0,
            source: source.chars().collect(),
            filename: filename.to_string(),
            stop_words: &[],
            charset: None,
        }
    }

    // --- statements ---

    fn parse_statements(&mut self, nested: bool) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        loop {
            self.skip_separators();
            let token = self.peek().clone();
            match &token.token_type {
                TokenType::Eof => {
                    if nested {
                        return Err(self.error_at(&token, "Expected '}' before end of file"));
                    }
                    break;
                }
                TokenType::RightBrace => {
                    if !nested {
                        return Err(self.error_at(&token, "Unexpected '}'"));
                    }
                    self.advance();
                    break;
                }
                TokenType::Comment(text) => {
                    self.advance();
                    nodes.push(Node::new(self.position_of(&token), NodeKind::Comment(text.clone())));
                }
                TokenType::AtKeyword(name) => {
                    let name = name.to_ascii_lowercase();
                    self.advance();
                    nodes.extend(self.parse_at_rule(&name, &token)?);
                }
                TokenType::Variable(_) if self.next_significant_is_colon() => {
                    nodes.push(self.parse_variable_declaration()?);
                }
                _ => nodes.extend(self.parse_rule_or_declaration()?),
            }
        }
        Ok(nodes)
    }

    fn parse_variable_declaration(&mut self) -> Result<Node> {
        let token = self.advance_cloned();
        let name = match &token.token_type {
            TokenType::Variable(name) => name.clone(),
            other => return Err(self.error_at(&token, format!("Expected a variable, found {}", other))),
        };
        self.skip_whitespace();
        self.consume(&TokenType::Colon, "Expected ':' after variable name")?;
        self.skip_whitespace();
        let value = self.parse_value_list()?;

        let (mut default, mut global) = (false, false);
        loop {
            self.skip_whitespace();
            match &self.peek().token_type {
                TokenType::Bang(flag) if flag == "default" => default = true,
                TokenType::Bang(flag) if flag == "global" => global = true,
                TokenType::Bang(flag) => {
                    return Err(self.error(format!("Unknown flag !{} in variable declaration", flag)));
                }
                _ => break,
            }
            self.advance();
        }
        self.end_statement()?;

        Ok(Node::new(
            self.position_of(&token),
            NodeKind::Variable(VariableNode {
                name,
                value,
                default,
                global,
            }),
        ))
    }

    fn parse_rule_or_declaration(&mut self) -> Result<Vec<Node>> {
        if !self.opens_block() {
            return Ok(vec![self.parse_declaration()?]);
        }
        if self.is_nested_property() {
            return self.parse_nested_property();
        }
        Ok(vec![self.parse_rule()?])
    }

    /// True when the statement at the cursor reaches a `{` before ending
    fn opens_block(&self) -> bool {
        let mut parens = 0usize;
        let mut interpolation = 0usize;
        for token in &self.tokens[self.current..] {
            match token.token_type {
                TokenType::LeftParen | TokenType::LeftBracket => parens += 1,
                TokenType::RightParen | TokenType::RightBracket => parens = parens.saturating_sub(1),
                TokenType::InterpolationStart => interpolation += 1,
                TokenType::RightBrace if interpolation > 0 => interpolation -= 1,
                TokenType::LeftBrace if parens == 0 => return true,
                TokenType::Semicolon | TokenType::RightBrace if parens == 0 => return false,
                TokenType::Eof => return false,
                _ => {}
            }
        }
        false
    }

    /// `font: { ... }` or `font: 12px { ... }`, as opposed to `a:hover { ... }`
    fn is_nested_property(&self) -> bool {
        let kinds: Vec<&TokenType> = self.tokens[self.current..].iter().take(3).map(|t| &t.token_type).collect();
        matches!(
            kinds.as_slice(),
            [TokenType::Ident(_), TokenType::Colon, TokenType::Whitespace | TokenType::LeftBrace]
        )
    }

    fn parse_nested_property(&mut self) -> Result<Vec<Node>> {
        let token = self.advance_cloned();
        let prefix = match &token.token_type {
            TokenType::Ident(name) => name.clone(),
            other => return Err(self.error_at(&token, format!("Expected a property name, found {}", other))),
        };
        let position = self.position_of(&token);
        self.advance();
        self.skip_whitespace();

        let mut nodes = Vec::new();
        if !self.check(&TokenType::LeftBrace) {
            let value = self.parse_value_list()?;
            let important = self.parse_important()?;
            nodes.push(Node::new(
                position,
                NodeKind::Declaration(DeclarationNode {
                    name: Interpolation::literal(prefix.clone()),
                    value,
                    important,
                }),
            ));
            self.skip_whitespace();
        }
        self.consume(&TokenType::LeftBrace, "Expected '{' after nested property")?;

        for child in self.parse_statements(true)? {
            let Node { position, kind } = child;
            let kind = match kind {
                NodeKind::Declaration(mut declaration) => {
                    declaration.name.parts.insert(0, InterpPart::Literal(format!("{}-", prefix)));
                    NodeKind::Declaration(declaration)
                }
                other => other,
            };
            nodes.push(Node::new(position, kind));
        }
        Ok(nodes)
    }

    fn parse_rule(&mut self) -> Result<Node> {
        let start = self.peek().clone();
        let position = self.position_of(&start);
        let selectors = self.parse_interpolated_until(|t| matches!(t, TokenType::LeftBrace), false)?;
        self.consume(&TokenType::LeftBrace, "Expected '{' after selector")?;
        let selectors = self.selector_source(selectors, &position)?;
        let children = self.parse_statements(true)?;
        Ok(Node::new(position, NodeKind::Block(BlockNode { selectors, children })))
    }

    fn parse_declaration(&mut self) -> Result<Node> {
        let start = self.peek().clone();
        let position = self.position_of(&start);
        let name = self.parse_interpolated_until(
            |t| matches!(t, TokenType::Colon | TokenType::Semicolon | TokenType::RightBrace),
            false,
        )?;
        if name.parts.is_empty() {
            return Err(self.error_at(&start, format!("Unexpected {}", start.token_type)));
        }
        if !self.check(&TokenType::Colon) {
            return Err(self.error_at(&start, format!("Expected ':' after property name \"{}\"", name)));
        }
        self.advance();
        self.skip_whitespace();

        let custom_property = name.as_plain().map_or(false, |n| n.starts_with("--"));
        let value = if custom_property {
            Value::Interpolated {
                parts: self.parse_interpolated_until(|t| matches!(t, TokenType::Semicolon | TokenType::RightBrace), false)?,
                quote: None,
            }
        } else {
            self.parse_value_list()?
        };
        let important = self.parse_important()?;
        self.end_statement()?;

        Ok(Node::new(
            position,
            NodeKind::Declaration(DeclarationNode { name, value, important }),
        ))
    }

    fn parse_important(&mut self) -> Result<bool> {
        self.skip_whitespace();
        match &self.peek().token_type {
            TokenType::Bang(flag) if flag == "important" => {
                self.advance();
                Ok(true)
            }
            TokenType::Bang(flag) => Err(self.error(format!("Unexpected !{}", flag))),
            _ => Ok(false),
        }
    }

    fn selector_source(&self, selectors: Interpolation, position: &SourcePosition) -> Result<SelectorSource> {
        match selectors.as_plain() {
            Some(text) => Ok(SelectorSource::Parsed(parse_selector_list(&text, position)?)),
            None => Ok(SelectorSource::Interpolated(selectors)),
        }
    }

    // --- at-rules ---

    fn parse_at_rule(&mut self, name: &str, token: &Token) -> Result<Vec<Node>> {
        let position = self.position_of(token);
        self.skip_whitespace();

        let kind = match name {
            "charset" => {
                let charset = self.advance_cloned();
                match &charset.token_type {
                    TokenType::String { value, .. } => self.charset = Some(value.clone()),
                    other => return Err(self.error_at(&charset, format!("Expected a string after @charset, found {}", other))),
                }
                self.end_statement()?;
                return Ok(Vec::new());
            }
            "import" => return self.parse_import(position),
            "media" => {
                let query = self.parse_interpolated_until(
                    |t| matches!(t, TokenType::LeftBrace | TokenType::Semicolon | TokenType::RightBrace),
                    true,
                )?;
                let children = self.parse_body("@media")?;
                NodeKind::Media(MediaNode { query, children })
            }
            "extend" => {
                let target = self.parse_interpolated_until(
                    |t| matches!(t, TokenType::Semicolon | TokenType::RightBrace | TokenType::Bang(_)),
                    false,
                )?;
                if target.parts.is_empty() {
                    return Err(self.error_at(token, "Expected a selector after @extend"));
                }
                let optional = match &self.peek().token_type {
                    TokenType::Bang(flag) if flag == "optional" => {
                        self.advance();
                        true
                    }
                    TokenType::Bang(flag) => return Err(self.error(format!("Unexpected !{} in @extend", flag))),
                    _ => false,
                };
                self.end_statement()?;
                NodeKind::Extend(ExtendNode {
                    selectors: self.selector_source(target, &position)?,
                    optional,
                })
            }
            "mixin" => {
                let name = self.expect_identifier("Expected a mixin name")?;
                let parameters = self.parse_parameters()?;
                let children = self.parse_body("@mixin")?;
                NodeKind::MixinDef(Rc::new(MixinDefinition {
                    name,
                    parameters,
                    children,
                }))
            }
            "include" => {
                let name = self.expect_identifier("Expected a mixin name")?;
                self.skip_whitespace();
                let args = if self.check(&TokenType::LeftParen) {
                    self.advance();
                    self.parse_arguments()?
                } else {
                    Vec::new()
                };
                self.skip_whitespace();
                let content = if self.check(&TokenType::LeftBrace) {
                    self.advance();
                    Some(Rc::new(self.parse_statements(true)?))
                } else {
                    self.end_statement()?;
                    None
                };
                NodeKind::Include(IncludeNode { name, args, content })
            }
            "content" => {
                self.end_statement()?;
                NodeKind::Content
            }
            "function" => {
                let name = self.expect_identifier("Expected a function name")?;
                let parameters = self.parse_parameters()?;
                let children = self.parse_body("@function")?;
                NodeKind::FunctionDef(Rc::new(FunctionDefinition {
                    name,
                    parameters,
                    children,
                }))
            }
            "return" => {
                let value = self.parse_value_list()?;
                self.end_statement()?;
                NodeKind::Return(value)
            }
            "if" => self.parse_if()?,
            "else" => return Err(self.error_at(token, "@else must follow an @if block")),
            "each" => self.parse_each()?,
            "for" => self.parse_for()?,
            "while" => {
                let condition = self.parse_value_list()?;
                let children = self.parse_body("@while")?;
                NodeKind::While(WhileNode { condition, children })
            }
            "warn" | "debug" | "error" => {
                let level = match name {
                    "warn" => DiagnosticLevel::Warn,
                    "debug" => DiagnosticLevel::Debug,
                    _ => DiagnosticLevel::Error,
                };
                let message = self.parse_value_list()?;
                self.end_statement()?;
                NodeKind::Diagnostic(DiagnosticNode { level, message })
            }
            _ => {
                let prelude = self.parse_interpolated_until(
                    |t| matches!(t, TokenType::LeftBrace | TokenType::Semicolon | TokenType::RightBrace),
                    false,
                )?;
                let children = if self.check(&TokenType::LeftBrace) {
                    self.advance();
                    Some(self.parse_statements(true)?)
                } else {
                    self.end_statement()?;
                    None
                };
                NodeKind::AtRule(AtRuleNode {
                    name: name.to_string(),
                    prelude,
                    children,
                })
            }
        };
        Ok(vec![Node::new(position, kind)])
    }

    /// One node per imported target; the media query applies to all of them
    fn parse_import(&mut self, position: SourcePosition) -> Result<Vec<Node>> {
        let mut targets = Vec::new();
        loop {
            self.skip_whitespace();
            match &self.peek().token_type {
                TokenType::String { .. } | TokenType::RawFunction { .. } | TokenType::Ident(_) => {
                    targets.push(self.parse_primary()?);
                }
                other => return Err(self.error(format!("Expected a file to import, found {}", other))),
            }
            self.skip_whitespace();
            if !self.check(&TokenType::Comma) {
                break;
            }
            self.advance();
        }

        let media = self.parse_interpolated_until(|t| matches!(t, TokenType::Semicolon | TokenType::RightBrace), true)?;
        self.end_statement()?;
        let media = if media.parts.is_empty() { None } else { Some(media) };

        Ok(targets
            .into_iter()
            .map(|uri| {
                Node::new(
                    position.clone(),
                    NodeKind::Import(ImportNode {
                        uri,
                        media: media.clone(),
                    }),
                )
            })
            .collect())
    }

    fn parse_if(&mut self) -> Result<NodeKind> {
        let condition = self.parse_value_list()?;
        let children = self.parse_body("@if")?;
        let mut branches = vec![(Some(condition), children)];

        loop {
            let saved = self.current;
            self.skip_whitespace();
            match &self.peek().token_type {
                TokenType::AtKeyword(word) if word.eq_ignore_ascii_case("else") => {
                    self.advance();
                }
                _ => {
                    self.current = saved;
                    break;
                }
            }
            self.skip_whitespace();
            if matches!(&self.peek().token_type, TokenType::Ident(word) if word == "if") {
                self.advance();
                self.skip_whitespace();
                let condition = self.parse_value_list()?;
                let children = self.parse_body("@else if")?;
                branches.push((Some(condition), children));
            } else {
                let children = self.parse_body("@else")?;
                branches.push((None, children));
                break;
            }
        }
        Ok(NodeKind::If(IfNode { branches }))
    }

    fn parse_each(&mut self) -> Result<NodeKind> {
        let mut variables = Vec::new();
        loop {
            self.skip_whitespace();
            let token = self.advance_cloned();
            match &token.token_type {
                TokenType::Variable(name) => variables.push(name.clone()),
                other => return Err(self.error_at(&token, format!("Expected a variable in @each, found {}", other))),
            }
            self.skip_whitespace();
            if !self.check(&TokenType::Comma) {
                break;
            }
            self.advance();
        }
        self.expect_keyword("in")?;
        self.skip_whitespace();
        let list = self.parse_value_list()?;
        let children = self.parse_body("@each")?;
        Ok(NodeKind::Each(EachNode {
            variables,
            list,
            children,
        }))
    }

    fn parse_for(&mut self) -> Result<NodeKind> {
        let token = self.advance_cloned();
        let variable = match &token.token_type {
            TokenType::Variable(name) => name.clone(),
            other => return Err(self.error_at(&token, format!("Expected a variable in @for, found {}", other))),
        };
        self.skip_whitespace();
        self.expect_keyword("from")?;
        self.skip_whitespace();
        let from = self.with_stop_words(&["through", "to"], |parser| parser.parse_space_expression())?;
        self.skip_whitespace();

        let token = self.advance_cloned();
        let inclusive = match &token.token_type {
            TokenType::Ident(word) if word == "through" => true,
            TokenType::Ident(word) if word == "to" => false,
            other => {
                return Err(self.error_at(&token, format!("Expected 'through' or 'to' in @for, found {}", other)));
            }
        };
        self.skip_whitespace();
        let to = self.parse_space_expression()?;
        let children = self.parse_body("@for")?;
        Ok(NodeKind::For(ForNode {
            variable,
            from,
            to,
            inclusive,
            children,
        }))
    }

    fn parse_body(&mut self, directive: &str) -> Result<Vec<Node>> {
        self.skip_whitespace();
        self.consume(&TokenType::LeftBrace, &format!("Expected '{{' after {}", directive))?;
        self.parse_statements(true)
    }

    fn parse_parameters(&mut self) -> Result<FormalArguments> {
        let mut parameters = FormalArguments::new();
        self.skip_whitespace();
        if !self.check(&TokenType::LeftParen) {
            return Ok(parameters);
        }
        self.advance();

        loop {
            self.skip_whitespace();
            let token = self.advance_cloned();
            let name = match &token.token_type {
                TokenType::RightParen => break,
                TokenType::Variable(name) => name.clone(),
                other => return Err(self.error_at(&token, format!("Expected a parameter, found {}", other))),
            };
            self.skip_whitespace();
            parameters = if self.check(&TokenType::Colon) {
                self.advance();
                self.skip_whitespace();
                let default = self.parse_space_expression()?;
                parameters.optional(&name, default)
            } else if self.parse_ellipsis() {
                parameters.rest(&name)
            } else {
                parameters.required(&name)
            };

            self.skip_whitespace();
            let separator = self.advance_cloned();
            match &separator.token_type {
                TokenType::Comma => {}
                TokenType::RightParen => break,
                other => {
                    return Err(self.error_at(&separator, format!("Expected ',' or ')' in parameters, found {}", other)));
                }
            }
        }
        Ok(parameters)
    }

    // --- values ---

    /// Comma separated list of space expressions
    fn parse_value_list(&mut self) -> Result<Value> {
        let first = self.parse_space_expression()?;
        self.skip_whitespace();
        if !self.check(&TokenType::Comma) {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.check(&TokenType::Comma) {
            self.advance();
            self.skip_whitespace();
            if self.ends_expression(&self.peek().token_type) {
                break;
            }
            items.push(self.parse_space_expression()?);
            self.skip_whitespace();
        }
        Ok(Value::list(items, ListSeparator::Comma))
    }

    /// Operands and operators up to a comma or the end of the value.
    /// Whitespace is kept because it separates the items of space lists.
    fn parse_space_expression(&mut self) -> Result<Value> {
        let mut tokens = Vec::new();
        loop {
            if self.skip_whitespace() && !tokens.is_empty() {
                tokens.push(ExprToken::Whitespace);
            }
            let token_type = self.peek().token_type.clone();
            if self.ends_expression(&token_type) {
                break;
            }
            if let Some(operator) = operator_for(&token_type) {
                self.advance();
                tokens.push(ExprToken::Operator(operator));
                continue;
            }
            tokens.push(ExprToken::Operand(self.parse_primary()?));
        }

        if tokens.is_empty() {
            return Err(self.error(format!("Expected an expression, found {}", self.peek().token_type)));
        }
        Ok(Value::expression(tokens))
    }

    fn ends_expression(&self, token_type: &TokenType) -> bool {
        match token_type {
            TokenType::Comma
            | TokenType::Semicolon
            | TokenType::LeftBrace
            | TokenType::RightBrace
            | TokenType::RightParen
            | TokenType::RightBracket
            | TokenType::Colon
            | TokenType::Dot
            | TokenType::Bang(_)
            | TokenType::Eof => true,
            TokenType::Ident(word) => self.stop_words.contains(&word.as_str()),
            _ => false,
        }
    }

    fn parse_primary(&mut self) -> Result<Value> {
        if self.check(&TokenType::InterpolationStart) {
            return self.parse_interpolated_word(Vec::new());
        }

        let token = self.advance_cloned();
        match &token.token_type {
            TokenType::Number { value, unit } => Ok(Value::number(*value, unit.clone())),
            TokenType::Hash(name) => Ok(match Color::from_hex(name) {
                Some(color) => Value::Color(color),
                None => Value::Ident(format!("#{}", name)),
            }),
            TokenType::String { value, quote } => {
                if value.contains("#{") {
                    Ok(Value::Interpolated {
                        parts: Interpolation {
                            parts: self.split_interpolation(value, &token)?,
                        },
                        quote: Some(*quote),
                    })
                } else {
                    Ok(Value::Str {
                        text: value.clone(),
                        quote: *quote,
                    })
                }
            }
            TokenType::Variable(name) => Ok(Value::Variable(name.clone())),
            TokenType::RawFunction { name, raw } => {
                let argument = if raw.contains("#{") {
                    Value::Interpolated {
                        parts: Interpolation {
                            parts: self.split_interpolation(raw, &token)?,
                        },
                        quote: None,
                    }
                } else {
                    Value::Ident(raw.clone())
                };
                Ok(Value::Function(FunctionCall {
                    name: name.clone(),
                    args: vec![Argument::positional(argument)],
                }))
            }
            TokenType::Ident(name) => self.parse_identifier(name.clone()),
            TokenType::LeftParen => {
                self.skip_whitespace();
                if self.check(&TokenType::RightParen) {
                    self.advance();
                    return Ok(Value::list(Vec::new(), ListSeparator::Space));
                }
                let inner = self.with_stop_words(&[], |parser| parser.parse_value_list())?;
                self.skip_whitespace();
                self.consume(&TokenType::RightParen, "Expected ')'")?;
                Ok(Value::Paren(Box::new(inner)))
            }
            TokenType::Ampersand => Ok(Value::ident("&")),
            TokenType::Delim(c) => Ok(Value::Ident(c.to_string())),
            other => Err(self.error_at(&token, format!("Unexpected {} in expression", other))),
        }
    }

    fn parse_identifier(&mut self, name: String) -> Result<Value> {
        if self.check_adjacent(&TokenType::LeftParen) {
            self.advance();
            let args = self.parse_arguments()?;
            return Ok(Value::Function(FunctionCall { name, args }));
        }
        if self.check_adjacent(&TokenType::InterpolationStart) {
            return self.parse_interpolated_word(vec![InterpPart::Literal(name)]);
        }
        Ok(match name.as_str() {
            "null" => Value::Null,
            _ => Value::Ident(name),
        })
    }

    /// A word glued together from identifiers and `#{...}`, e.g. `col-#{$i}`
    fn parse_interpolated_word(&mut self, mut parts: Vec<InterpPart>) -> Result<Value> {
        loop {
            if !parts.is_empty() && self.peek().start != self.previous_end() {
                break;
            }
            let token = self.peek().clone();
            match &token.token_type {
                TokenType::InterpolationStart => parts.push(InterpPart::Expr(self.parse_interpolation_expr()?)),
                TokenType::Ident(_) | TokenType::Number { .. } | TokenType::Hash(_) => {
                    parts.push(InterpPart::Literal(self.text_of(&token)));
                    self.advance();
                }
                _ => break,
            }
        }
        Ok(Value::Interpolated {
            parts: Interpolation { parts },
            quote: None,
        })
    }

    /// Arguments after the opening `(`, up to and including the closing `)`
    fn parse_arguments(&mut self) -> Result<Vec<Argument>> {
        self.with_stop_words(&[], |parser| {
            let mut args = Vec::new();
            loop {
                parser.skip_whitespace();
                if parser.check(&TokenType::RightParen) {
                    parser.advance();
                    break;
                }

                let name = match &parser.peek().token_type {
                    TokenType::Variable(name) if parser.next_significant_is_colon() => {
                        let name = name.clone();
                        parser.advance();
                        parser.skip_whitespace();
                        parser.advance();
                        parser.skip_whitespace();
                        Some(name)
                    }
                    _ => None,
                };
                let value = parser.parse_space_expression()?;
                let splat = parser.parse_ellipsis();
                args.push(Argument { name, value, splat });

                parser.skip_whitespace();
                let separator = parser.advance_cloned();
                match &separator.token_type {
                    TokenType::Comma => {}
                    TokenType::RightParen => break,
                    other => {
                        return Err(parser.error_at(&separator, format!("Expected ',' or ')' in arguments, found {}", other)));
                    }
                }
            }
            Ok(args)
        })
    }

    fn parse_ellipsis(&mut self) -> bool {
        let dots = self.tokens[self.current..]
            .iter()
            .take(3)
            .filter(|t| t.token_type == TokenType::Dot)
            .count();
        if dots == 3 {
            self.current += 3;
            true
        } else {
            false
        }
    }

    /// Parse `#{ expression }` starting at the `#{` token
    fn parse_interpolation_expr(&mut self) -> Result<Value> {
        self.advance();
        self.skip_whitespace();
        let value = self.with_stop_words(&[], |parser| parser.parse_value_list())?;
        self.skip_whitespace();
        self.consume(&TokenType::RightBrace, "Expected '}' to close interpolation")?;
        Ok(value)
    }

    // --- raw text with interpolation ---

    /// Source text up to a top-level `stop` token, with `#{...}` parsed.
    /// `allow_variables` turns bare `$name` references into expressions,
    /// as media queries accept them.
    fn parse_interpolated_until(&mut self, stop: fn(&TokenType) -> bool, allow_variables: bool) -> Result<Interpolation> {
        let mut builder = InterpolationBuilder::default();
        let mut depth = 0usize;
        loop {
            let token = self.peek().clone();
            match &token.token_type {
                TokenType::Eof => break,
                t if depth == 0 && stop(t) => break,
                TokenType::InterpolationStart => {
                    builder.push_expr(self.parse_interpolation_expr()?);
                    continue;
                }
                TokenType::Variable(name) if allow_variables => builder.push_expr(Value::Variable(name.clone())),
                TokenType::String { value, quote } => {
                    builder.push_text(&quote.to_string());
                    builder.extend(self.split_interpolation(value, &token)?);
                    builder.push_text(&quote.to_string());
                }
                TokenType::RawFunction { name, raw } => {
                    builder.push_text(&format!("{}(", name));
                    builder.extend(self.split_interpolation(raw, &token)?);
                    builder.push_text(")");
                }
                TokenType::Whitespace => builder.push_text(" "),
                TokenType::Comment(_) => {}
                other => {
                    match other {
                        TokenType::LeftParen | TokenType::LeftBracket => depth += 1,
                        TokenType::RightParen | TokenType::RightBracket => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    builder.push_text(&self.text_of(&token));
                }
            }
            self.advance();
        }
        Ok(builder.finish())
    }

    /// Split text containing `#{...}` into literal and expression parts
    fn split_interpolation(&self, text: &str, origin: &Token) -> Result<Vec<InterpPart>> {
        let position = self.position_of(origin);
        let mut parts = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find("#{") {
            if start > 0 {
                parts.push(InterpPart::Literal(rest[..start].to_string()));
            }
            let inner_start = start + 2;
            let length = matching_brace(&rest[inner_start..])
                .ok_or_else(|| CompilerError::parse(&position, "Unterminated interpolation"))?;
            let inner = &rest[inner_start..inner_start + length];
            parts.push(InterpPart::Expr(parse_value(inner, &position)?));
            rest = &rest[inner_start + length + 1..];
        }
        if !rest.is_empty() {
            parts.push(InterpPart::Literal(rest.to_string()));
        }
        Ok(parts)
    }

    // --- token helpers ---

    fn with_stop_words<T>(
        &mut self,
        words: &'static [&'static str],
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = std::mem::replace(&mut self.stop_words, words);
        let result = body(self);
        self.stop_words = saved;
        result
    }

    fn expect_identifier(&mut self, message: &str) -> Result<String> {
        self.skip_whitespace();
        let token = self.advance_cloned();
        match &token.token_type {
            TokenType::Ident(name) => Ok(name.clone()),
            other => Err(self.error_at(&token, format!("{}, found {}", message, other))),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        let token = self.advance_cloned();
        match &token.token_type {
            TokenType::Ident(word) if word == keyword => Ok(()),
            other => Err(self.error_at(&token, format!("Expected '{}', found {}", keyword, other))),
        }
    }

    /// A statement ends at `;`, or right before the `}` closing its block
    fn end_statement(&mut self) -> Result<()> {
        self.skip_whitespace();
        match self.peek().token_type {
            TokenType::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenType::RightBrace | TokenType::Eof => Ok(()),
            ref other => Err(self.error(format!("Expected ';', found {}", other))),
        }
    }

    fn next_significant_is_colon(&self) -> bool {
        self.tokens[self.current + 1..]
            .iter()
            .find(|t| !matches!(t.token_type, TokenType::Whitespace | TokenType::Comment(_)))
            .map_or(false, |t| t.token_type == TokenType::Colon)
    }

    /// Skip whitespace and comments; true if anything was skipped
    fn skip_whitespace(&mut self) -> bool {
        let start = self.current;
        while matches!(self.peek().token_type, TokenType::Whitespace | TokenType::Comment(_)) {
            self.advance();
        }
        self.current > start
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek().token_type, TokenType::Whitespace | TokenType::Semicolon) {
            self.advance();
        }
    }

    fn text_of(&self, token: &Token) -> String {
        let end = token.end.min(self.source.len());
        self.source[token.start.min(end)..end].iter().collect()
    }

    fn position_of(&self, token: &Token) -> SourcePosition {
        SourcePosition::new(self.filename.clone(), token.line, token.column)
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> CompilerError {
        CompilerError::parse(&self.position_of(token), message)
    }

    fn error(&self, message: impl Into<String>) -> CompilerError {
        self.error_at(self.peek(), message)
    }

    fn check(&self, token_type: &TokenType) -> bool {
        std::mem::discriminant(&self.peek().token_type) == std::mem::discriminant(token_type)
    }

    /// Like [`check`](Self::check), but only with no whitespace before the token
    fn check_adjacent(&self, token_type: &TokenType) -> bool {
        self.check(token_type) && self.peek().start == self.previous_end()
    }

    fn previous_end(&self) -> usize {
        self.current
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(usize::MAX, |t| t.end)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    /// Consume the current token and return a copy; at the end this
    /// returns the end-of-file token without moving
    fn advance_cloned(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn consume(&mut self, token_type: &TokenType, message: &str) -> Result<()> {
        if self.check(token_type) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("{}, found {}", message, self.peek().token_type)))
        }
    }
}

fn operator_for(token_type: &TokenType) -> Option<Operator> {
    Some(match token_type {
        TokenType::Plus => Operator::Plus,
        TokenType::Minus => Operator::Minus,
        TokenType::Star => Operator::Times,
        TokenType::Slash => Operator::Div,
        TokenType::Percent => Operator::Mod,
        TokenType::EqualEqual => Operator::Eq,
        TokenType::NotEqual => Operator::Ne,
        TokenType::Less => Operator::Lt,
        TokenType::LessEqual => Operator::Le,
        TokenType::Greater => Operator::Gt,
        TokenType::GreaterEqual => Operator::Ge,
        TokenType::Ident(word) if word == "and" => Operator::And,
        TokenType::Ident(word) if word == "or" => Operator::Or,
        TokenType::Ident(word) if word == "not" => Operator::Not,
        _ => return None,
    })
}

/// Byte offset of the `}` closing an interpolation whose body starts `text`
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '{' => depth += 1,
                '}' if depth == 0 => return Some(i),
                '}' => depth -= 1,
                _ => {}
            },
        }
    }
    None
}

#[derive(Default)]
struct InterpolationBuilder {
    parts: Vec<InterpPart>,
    text: String,
}

impl InterpolationBuilder {
    fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn push_expr(&mut self, value: Value) {
        self.flush();
        self.parts.push(InterpPart::Expr(value));
    }

    fn extend(&mut self, parts: Vec<InterpPart>) {
        for part in parts {
            match part {
                InterpPart::Literal(text) => self.push_text(&text),
                InterpPart::Expr(value) => self.push_expr(value),
            }
        }
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.parts.push(InterpPart::Literal(std::mem::take(&mut self.text)));
        }
    }

    /// Collapse into an interpolation with surrounding whitespace trimmed
    fn finish(mut self) -> Interpolation {
        self.flush();
        if let Some(InterpPart::Literal(text)) = self.parts.first_mut() {
            *text = text.trim_start().to_string();
        }
        if let Some(InterpPart::Literal(text)) = self.parts.last_mut() {
            *text = text.trim_end().to_string();
        }
        self.parts.retain(|p| !matches!(p, InterpPart::Literal(text) if text.is_empty()));
        Interpolation { parts: self.parts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<Node> {
        parse_stylesheet(source, "test.scss").unwrap().children
    }

    fn block(node: &Node) -> &BlockNode {
        match &node.kind {
            NodeKind::Block(block) => block,
            other => panic!("Expected a block, got {:?}", other),
        }
    }

    fn declaration(node: &Node) -> &DeclarationNode {
        match &node.kind {
            NodeKind::Declaration(declaration) => declaration,
            other => panic!("Expected a declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rule_with_nested_rule() {
        let nodes = parse(".nav {\n  color: red;\n  a:hover { color: blue }\n}");
        assert_eq!(nodes.len(), 1);
        let nav = block(&nodes[0]);
        assert_eq!(nav.selector_list()[0].to_string(), ".nav");
        assert_eq!(nav.children.len(), 2);

        let color = declaration(&nav.children[0]);
        assert_eq!(color.name.to_string(), "color");
        assert_eq!(color.value, Value::ident("red"));

        let link = block(&nav.children[1]);
        assert_eq!(link.selector_list()[0].to_string(), "a:hover");
        assert_eq!(nodes[0].position.line, 1);
        assert_eq!(nav.children[1].position.line, 3);
    }

    #[test]
    fn test_unexpected_tokens_report_positions() {
        let cases = [
            ("@charset 5;", "Expected a string after @charset"),
            ("@each 1 in a b { }", "Expected a variable in @each"),
            ("@for i from 1 to 2 { }", "Expected a variable in @for"),
            ("@mixin m(a) { }", "Expected a parameter"),
            ("@mixin m($a $b) { }", "Expected ',' or ')' in parameters"),
        ];
        for (source, message) in cases {
            match parse_stylesheet(source, "test.scss") {
                Err(CompilerError::Parse { line, message: text, .. }) => {
                    assert_eq!(line, 1, "{}", source);
                    assert!(text.contains(message), "{}: {}", source, text);
                }
                other => panic!("Expected a parse error for {}, got {:?}", source, other),
            }
        }
    }

    #[test]
    fn test_string_and_url_values() {
        let stylesheet = parse_stylesheet(
            "@charset \"UTF-8\";\na { content: \"#{$a}-x\"; b: \"plain\"; c: url(#{$p}/a.png); }",
            "test.scss",
        )
        .unwrap();
        assert_eq!(stylesheet.charset.as_deref(), Some("UTF-8"));

        let children = &block(&stylesheet.children[0]).children;
        assert!(matches!(declaration(&children[0]).value, Value::Interpolated { quote: Some('"'), .. }));
        assert_eq!(declaration(&children[1]).value, Value::quoted("plain"));
        match &declaration(&children[2]).value {
            Value::Function(call) => {
                assert_eq!(call.name, "url");
                assert!(matches!(call.args[0].value, Value::Interpolated { quote: None, .. }));
            }
            other => panic!("Expected a url call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_variable_flags() {
        let nodes = parse("$width: 10px !default;\n$theme: dark !global;");
        match (&nodes[0].kind, &nodes[1].kind) {
            (NodeKind::Variable(width), NodeKind::Variable(theme)) => {
                assert_eq!(width.name, "width");
                assert_eq!(width.value, Value::number(10.0, "px"));
                assert!(width.default && !width.global);
                assert!(theme.global && !theme.default);
            }
            other => panic!("Unexpected nodes {:?}", other),
        }
    }

    #[test]
    fn test_nested_properties_are_flattened() {
        let nodes = parse("a { font: 12px { family: serif; weight: bold; } }");
        let children = &block(&nodes[0]).children;
        let names: Vec<String> = children.iter().map(|n| declaration(n).name.to_string()).collect();
        assert_eq!(names, vec!["font", "font-family", "font-weight"]);
    }

    #[test]
    fn test_interpolated_selector_waits_for_traversal() {
        let nodes = parse(".col-#{$i} { width: 1px; }");
        match &block(&nodes[0]).selectors {
            SelectorSource::Interpolated(interpolation) => {
                assert_eq!(interpolation.parts[0], InterpPart::Literal(".col-".into()));
                assert_eq!(interpolation.parts[1], InterpPart::Expr(Value::Variable("i".into())));
            }
            other => panic!("Expected an interpolated selector, got {:?}", other),
        }
    }

    #[test]
    fn test_expression_tokens() {
        let nodes = parse("a { width: $a + 2px; margin: 0 auto; font: 12px/30px serif; }");
        let children = &block(&nodes[0]).children;
        assert_eq!(
            declaration(&children[0]).value,
            Value::Expression(vec![
                ExprToken::Operand(Value::Variable("a".into())),
                ExprToken::Whitespace,
                ExprToken::Operator(Operator::Plus),
                ExprToken::Whitespace,
                ExprToken::Operand(Value::number(2.0, "px")),
            ])
        );
        assert_eq!(declaration(&children[1]).value.to_string(), "0 auto");
        assert!(!declaration(&children[2]).value.contains_arithmetical_operator());
        assert_eq!(declaration(&children[2]).value.to_string(), "12px/30px serif");
    }

    #[test]
    fn test_important_and_custom_property() {
        let nodes = parse("a { color: red !important; --gap: 1px  #{$x}; }");
        let children = &block(&nodes[0]).children;
        assert!(declaration(&children[0]).important);
        assert_eq!(declaration(&children[1]).name.to_string(), "--gap");
    }

    #[test]
    fn test_mixin_and_include() {
        let nodes = parse(
            "@mixin box($size, $color: red, $rest...) { width: $size; }\n\
             .a { @include box(10px, $color: blue) { top: 0; } }",
        );
        match &nodes[0].kind {
            NodeKind::MixinDef(mixin) => {
                assert_eq!(mixin.name, "box");
                let names: Vec<&str> = mixin.parameters.parameters().iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["size", "color"]);
                assert_eq!(mixin.parameters.rest_name(), Some("rest"));
            }
            other => panic!("Expected a mixin, got {:?}", other),
        }
        match &block(&nodes[1]).children[0].kind {
            NodeKind::Include(include) => {
                assert_eq!(include.name, "box");
                assert_eq!(include.args.len(), 2);
                assert_eq!(include.args[1].name.as_deref(), Some("color"));
                assert_eq!(include.content.as_ref().map(|c| c.len()), Some(1));
            }
            other => panic!("Expected an include, got {:?}", other),
        }
    }

    #[test]
    fn test_function_call_arguments() {
        let nodes = parse("$x: darken($c, 10%) rgba(0, 0, 0, .5) join($list...);");
        let value = match &nodes[0].kind {
            NodeKind::Variable(variable) => &variable.value,
            other => panic!("Expected a variable, got {:?}", other),
        };
        let functions: Vec<&FunctionCall> = match value {
            Value::Expression(tokens) => tokens
                .iter()
                .filter_map(|t| match t {
                    ExprToken::Operand(Value::Function(call)) => Some(call),
                    _ => None,
                })
                .collect(),
            other => panic!("Expected an expression, got {:?}", other),
        };
        assert_eq!(functions.len(), 3);
        assert_eq!(functions[0].args.len(), 2);
        assert_eq!(functions[1].args.len(), 4);
        assert!(functions[2].args[0].splat);
    }

    #[test]
    fn test_control_directives() {
        let nodes = parse(
            "@if $a == 1 { a { b: c } } @else if $a == 2 { } @else { }\n\
             @for $i from 1 through $n { }\n\
             @each $name, $glyph in (a b, c d) { }\n\
             @while $i > 0 { }",
        );
        assert_eq!(nodes.len(), 4);
        match &nodes[0].kind {
            NodeKind::If(node) => {
                assert_eq!(node.branches.len(), 3);
                assert!(node.branches[2].0.is_none());
            }
            other => panic!("Expected @if, got {:?}", other),
        }
        match &nodes[1].kind {
            NodeKind::For(node) => {
                assert_eq!(node.variable, "i");
                assert_eq!(node.from, Value::number(1.0, ""));
                assert_eq!(node.to, Value::Variable("n".into()));
                assert!(node.inclusive);
            }
            other => panic!("Expected @for, got {:?}", other),
        }
        match &nodes[2].kind {
            NodeKind::Each(node) => assert_eq!(node.variables, vec!["name", "glyph"]),
            other => panic!("Expected @each, got {:?}", other),
        }
        assert!(matches!(nodes[3].kind, NodeKind::While(_)));
    }

    #[test]
    fn test_imports_and_charset() {
        let sheet = parse_stylesheet(
            "@charset \"UTF-8\";\n@import \"a\", \"b\";\n@import url(print.css) print;",
            "test.scss",
        )
        .unwrap();
        assert_eq!(sheet.charset.as_deref(), Some("UTF-8"));
        assert_eq!(sheet.children.len(), 3);
        match &sheet.children[2].kind {
            NodeKind::Import(import) => {
                assert!(import.uri.is_single_url());
                assert_eq!(import.media.as_ref().map(|m| m.to_string()), Some("print".into()));
            }
            other => panic!("Expected an import, got {:?}", other),
        }
    }

    #[test]
    fn test_media_extend_and_generic_at_rules() {
        let nodes = parse(
            "@media screen and (max-width: $w) { a { b: c } }\n\
             .b { @extend %base !optional; }\n\
             @font-face { font-family: x; }\n\
             /* note */",
        );
        match &nodes[0].kind {
            NodeKind::Media(media) => {
                assert_eq!(media.query.parts[0], InterpPart::Literal("screen and (max-width: ".into()));
                assert_eq!(media.query.parts[1], InterpPart::Expr(Value::Variable("w".into())));
            }
            other => panic!("Expected @media, got {:?}", other),
        }
        match &block(&nodes[1]).children[0].kind {
            NodeKind::Extend(extend) => assert!(extend.optional),
            other => panic!("Expected @extend, got {:?}", other),
        }
        match &nodes[2].kind {
            NodeKind::AtRule(rule) => {
                assert_eq!(rule.name, "font-face");
                assert_eq!(rule.children.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("Expected an at-rule, got {:?}", other),
        }
        assert!(matches!(&nodes[3].kind, NodeKind::Comment(text) if text == "/* note */"));
    }

    #[test]
    fn test_string_interpolation() {
        let value = parse_value("\"icon-#{$name}.png\"", &SourcePosition::new("test.scss", 1, 1)).unwrap();
        match value {
            Value::Interpolated { parts, quote } => {
                assert_eq!(quote, Some('"'));
                assert_eq!(parts.parts.len(), 3);
            }
            other => panic!("Expected an interpolated string, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_stylesheet("a { color: red;", "test.scss"),
            Err(CompilerError::Parse { .. })
        ));
        assert!(parse_stylesheet("a { color red; }", "test.scss").is_err());
        assert!(parse_stylesheet("}", "test.scss").is_err());
        assert!(parse_stylesheet("@else { }", "test.scss").is_err());
    }
}
