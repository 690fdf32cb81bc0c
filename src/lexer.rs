//! Lexical analysis for SCSS source text
//!
//! Tokens keep their character offsets so the parser can recover the exact
//! source text of selectors and at-rule preludes.

use crate::error::{CompilerError, Result};
use crate::types::SourcePosition;
use std::fmt;

/// Functions whose argument is kept as raw text instead of being parsed
const RAW_FUNCTIONS: &[&str] = &["url", "calc", "var", "env", "expression", "-webkit-calc", "-moz-calc"];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    Ident(String),
    Variable(String),
    AtKeyword(String),
    Number { value: f64, unit: String },
    Hash(String),
    /// Quoted string; the value is the raw text between the quotes
    String { value: String, quote: char },
    RawFunction { name: String, raw: String },
    /// `#{`
    InterpolationStart,

    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Colon,
    Semicolon,
    Comma,
    Dot,
    Ampersand,
    Tilde,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    /// `!important`, `!default`, `!global`, `!optional`
    Bang(String),
    Whitespace,
    Comment(String),
    Delim(char),
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub line: usize,
    pub column: usize,
    /// Character offsets of the token in the source
    pub start: usize,
    pub end: usize,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Ident(name) => write!(f, "identifier '{}'", name),
            TokenType::Variable(name) => write!(f, "variable '${}'", name),
            TokenType::AtKeyword(name) => write!(f, "'@{}'", name),
            TokenType::Number { value, unit } => write!(f, "number '{}{}'", value, unit),
            TokenType::Hash(name) => write!(f, "'#{}'", name),
            TokenType::String { value, quote } => write!(f, "string {}{}{}", quote, value, quote),
            TokenType::RawFunction { name, .. } => write!(f, "'{}(...)'", name),
            TokenType::InterpolationStart => write!(f, "'#{{'"),
            TokenType::LeftBrace => write!(f, "'{{'"),
            TokenType::RightBrace => write!(f, "'}}'"),
            TokenType::LeftParen => write!(f, "'('"),
            TokenType::RightParen => write!(f, "')'"),
            TokenType::LeftBracket => write!(f, "'['"),
            TokenType::RightBracket => write!(f, "']'"),
            TokenType::Colon => write!(f, "':'"),
            TokenType::Semicolon => write!(f, "';'"),
            TokenType::Comma => write!(f, "','"),
            TokenType::Dot => write!(f, "'.'"),
            TokenType::Ampersand => write!(f, "'&'"),
            TokenType::Tilde => write!(f, "'~'"),
            TokenType::Plus => write!(f, "'+'"),
            TokenType::Minus => write!(f, "'-'"),
            TokenType::Star => write!(f, "'*'"),
            TokenType::Slash => write!(f, "'/'"),
            TokenType::Percent => write!(f, "'%'"),
            TokenType::EqualEqual => write!(f, "'=='"),
            TokenType::NotEqual => write!(f, "'!='"),
            TokenType::Less => write!(f, "'<'"),
            TokenType::LessEqual => write!(f, "'<='"),
            TokenType::Greater => write!(f, "'>'"),
            TokenType::GreaterEqual => write!(f, "'>='"),
            TokenType::Bang(word) => write!(f, "'!{}'", word),
            TokenType::Whitespace => write!(f, "whitespace"),
            TokenType::Comment(_) => write!(f, "comment"),
            TokenType::Delim(c) => write!(f, "'{}'", c),
            TokenType::Eof => write!(f, "end of file"),
        }
    }
}

fn is_name_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || !ch.is_ascii()
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii()
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    filename: String,
}

impl Lexer {
    pub fn new(input: &str, filename: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            filename: filename.to_string(),
        }
    }

    /// Start counting lines and columns from an offset inside a larger file
    pub fn at(input: &str, origin: &SourcePosition) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: origin.line.max(1),
            column: origin.column.max(1),
            filename: origin.uri.clone(),
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens: Vec<Token> = Vec::new();

        while !self.is_at_end() {
            let previous = tokens.last().map(|t| &t.token_type);
            let allow_negative = !matches!(
                previous,
                Some(
                    TokenType::Ident(_)
                        | TokenType::Variable(_)
                        | TokenType::Number { .. }
                        | TokenType::String { .. }
                        | TokenType::RightParen
                        | TokenType::RightBracket
                        | TokenType::Hash(_)
                )
            );
            if let Some(token) = self.next_token(allow_negative)? {
                tokens.push(token);
            }
        }

        tokens.push(Token {
            token_type: TokenType::Eof,
            line: self.line,
            column: self.column,
            start: self.position,
            end: self.position,
        });
        Ok(tokens)
    }

    fn error(&self, message: impl Into<String>) -> CompilerError {
        CompilerError::Parse {
            file: self.filename.clone(),
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn next_token(&mut self, allow_negative: bool) -> Result<Option<Token>> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        let ch = self.advance();

        let token_type = match ch {
            c if c.is_whitespace() => {
                while self.peek().map_or(false, char::is_whitespace) {
                    self.advance();
                }
                TokenType::Whitespace
            }
            '/' if self.peek() == Some('/') => {
                while self.peek().map_or(false, |c| c != '\n') {
                    self.advance();
                }
                return Ok(None);
            }
            '/' if self.peek() == Some('*') => {
                self.advance();
                let text = self.read_block_comment()?;
                TokenType::Comment(text)
            }
            '{' => TokenType::LeftBrace,
            '}' => TokenType::RightBrace,
            '(' => TokenType::LeftParen,
            ')' => TokenType::RightParen,
            '[' => TokenType::LeftBracket,
            ']' => TokenType::RightBracket,
            ':' => TokenType::Colon,
            ';' => TokenType::Semicolon,
            ',' => TokenType::Comma,
            '&' => TokenType::Ampersand,
            '~' => TokenType::Tilde,
            '+' => TokenType::Plus,
            '*' => TokenType::Star,
            '/' => TokenType::Slash,
            '%' => TokenType::Percent,
            '=' if self.match_char('=') => TokenType::EqualEqual,
            '!' if self.match_char('=') => TokenType::NotEqual,
            '<' if self.match_char('=') => TokenType::LessEqual,
            '<' => TokenType::Less,
            '>' if self.match_char('=') => TokenType::GreaterEqual,
            '>' => TokenType::Greater,
            '!' => {
                while self.peek().map_or(false, char::is_whitespace) {
                    self.advance();
                }
                let word = self.read_name();
                if word.is_empty() {
                    TokenType::Delim('!')
                } else {
                    TokenType::Bang(word.to_ascii_lowercase())
                }
            }
            '"' | '\'' => {
                let value = self.read_string(ch)?;
                TokenType::String { value, quote: ch }
            }
            '#' if self.peek() == Some('{') => {
                self.advance();
                TokenType::InterpolationStart
            }
            '#' => {
                let name = self.read_name();
                if name.is_empty() {
                    TokenType::Delim('#')
                } else {
                    TokenType::Hash(name)
                }
            }
            '$' => {
                let name = self.read_name();
                if name.is_empty() {
                    return Err(self.error("Expected a variable name after '$'"));
                }
                TokenType::Variable(name)
            }
            '@' => {
                let name = self.read_name();
                if name.is_empty() {
                    return Err(self.error("Expected a directive name after '@'"));
                }
                TokenType::AtKeyword(name)
            }
            c if c.is_ascii_digit() || (c == '.' && self.peek().map_or(false, |n| n.is_ascii_digit())) => {
                self.read_number(Some(c))?
            }
            '-' if allow_negative && self.starts_number() => match self.read_number(None)? {
                TokenType::Number { value, unit } => TokenType::Number { value: -value, unit },
                other => other,
            },
            '-' if self.peek().map_or(false, |c| is_name_start(c) || c == '-') => self.read_identifier(ch)?,
            '-' => TokenType::Minus,
            '.' => TokenType::Dot,
            '\\' => self.read_identifier(ch)?,
            c if is_name_start(c) => self.read_identifier(c)?,
            c => TokenType::Delim(c),
        };

        Ok(Some(Token {
            token_type,
            line: start_line,
            column: start_column,
            start,
            end: self.position,
        }))
    }

    fn advance(&mut self) -> char {
        match self.input.get(self.position) {
            Some(&ch) => {
                self.position += 1;
                if ch == '\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
                ch
            }
            None => '\0',
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// After a `-`: a digit, or `.` followed by a digit
    fn starts_number(&self) -> bool {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => self.peek_next().map_or(false, |c| c.is_ascii_digit()),
            _ => false,
        }
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if is_name_char(ch) {
                name.push(self.advance());
            } else if ch == '\\' {
                name.push(self.advance());
                if !self.is_at_end() {
                    name.push(self.advance());
                }
            } else {
                break;
            }
        }
        name
    }

    fn read_identifier(&mut self, first: char) -> Result<TokenType> {
        let mut name = first.to_string();
        if first == '\\' && !self.is_at_end() {
            name.push(self.advance());
        }
        name.push_str(&self.read_name());

        if self.peek() == Some('(') && RAW_FUNCTIONS.contains(&name.to_ascii_lowercase().as_str()) {
            if name.eq_ignore_ascii_case("url") && self.url_is_quoted() {
                return Ok(TokenType::Ident(name));
            }
            self.advance();
            let raw = self.read_raw_arguments()?;
            return Ok(TokenType::RawFunction { name, raw });
        }
        Ok(TokenType::Ident(name))
    }

    /// `url("...")` is an ordinary function call with a string argument
    fn url_is_quoted(&self) -> bool {
        self.input[self.position + 1..]
            .iter()
            .find(|c| !c.is_whitespace())
            .map_or(false, |&c| c == '"' || c == '\'')
    }

    /// Text up to the matching `)`, which is consumed but not returned
    fn read_raw_arguments(&mut self) -> Result<String> {
        let mut raw = String::new();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        loop {
            if self.is_at_end() {
                return Err(self.error("Unterminated function arguments"));
            }
            let ch = self.advance();
            match quote {
                Some(q) => {
                    if ch == '\\' && !self.is_at_end() {
                        raw.push(ch);
                        raw.push(self.advance());
                        continue;
                    }
                    if ch == q {
                        quote = None;
                    }
                }
                None => match ch {
                    '"' | '\'' => quote = Some(ch),
                    '(' => depth += 1,
                    ')' if depth == 0 => return Ok(raw),
                    ')' => depth -= 1,
                    _ => {}
                },
            }
            raw.push(ch);
        }
    }

    /// `consumed` is the first character when the lexer already took it
    fn read_number(&mut self, consumed: Option<char>) -> Result<TokenType> {
        let mut text: String = consumed.into_iter().collect();
        let mut seen_dot = text.contains('.');
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(self.advance());
            } else if ch == '.' && !seen_dot && self.peek_next().map_or(false, |c| c.is_ascii_digit()) {
                seen_dot = true;
                text.push(self.advance());
            } else {
                break;
            }
        }
        let value: f64 = text
            .parse()
            .map_err(|_| self.error(format!("Invalid number: {}", text)))?;

        let unit = if self.peek() == Some('%') {
            self.advance();
            "%".to_string()
        } else if self.peek().map_or(false, is_name_start) {
            self.read_name()
        } else {
            String::new()
        };
        Ok(TokenType::Number { value, unit })
    }

    fn read_string(&mut self, quote: char) -> Result<String> {
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => return Err(self.error("Unterminated string")),
                Some(ch) if ch == quote => {
                    self.advance();
                    return Ok(value);
                }
                Some('\\') => {
                    value.push(self.advance());
                    if !self.is_at_end() {
                        value.push(self.advance());
                    }
                }
                Some(_) => value.push(self.advance()),
            }
        }
    }

    fn read_block_comment(&mut self) -> Result<String> {
        let mut text = String::from("/*");
        loop {
            if self.is_at_end() {
                return Err(self.error("Unterminated comment"));
            }
            let ch = self.advance();
            text.push(ch);
            if ch == '*' && self.peek() == Some('/') {
                text.push(self.advance());
                return Ok(text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(source: &str) -> Vec<TokenType> {
        Lexer::new(source, "test.scss")
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .filter(|t| !matches!(t, TokenType::Whitespace | TokenType::Eof))
            .collect()
    }

    fn number(value: f64, unit: &str) -> TokenType {
        TokenType::Number {
            value,
            unit: unit.to_string(),
        }
    }

    #[test]
    fn test_declaration_tokens() {
        assert_eq!(
            types("width: $x / 2;"),
            vec![
                TokenType::Ident("width".into()),
                TokenType::Colon,
                TokenType::Variable("x".into()),
                TokenType::Slash,
                number(2.0, ""),
                TokenType::Semicolon,
            ]
        );
    }

    #[test]
    fn test_numbers_and_units() {
        assert_eq!(
            types("10px 1.5em 50% .5 -3px"),
            vec![number(10.0, "px"), number(1.5, "em"), number(50.0, "%"), number(0.5, ""), number(-3.0, "px")]
        );
    }

    #[test]
    fn test_minus_after_operand_is_an_operator() {
        assert_eq!(
            types("$a -$b"),
            vec![TokenType::Variable("a".into()), TokenType::Minus, TokenType::Variable("b".into())]
        );
        assert_eq!(
            types("$a - 1"),
            vec![TokenType::Variable("a".into()), TokenType::Minus, number(1.0, "")]
        );
        assert_eq!(types("-webkit-box"), vec![TokenType::Ident("-webkit-box".into())]);
    }

    #[test]
    fn test_raw_url_and_quoted_url() {
        assert_eq!(
            types("url(img/a.png)"),
            vec![TokenType::RawFunction {
                name: "url".into(),
                raw: "img/a.png".into()
            }]
        );
        assert_eq!(
            types("url(\"a.png\")"),
            vec![
                TokenType::Ident("url".into()),
                TokenType::LeftParen,
                TokenType::String {
                    value: "a.png".into(),
                    quote: '"'
                },
                TokenType::RightParen,
            ]
        );
        assert_eq!(
            types("calc(100% - (2 * #{$x}))"),
            vec![TokenType::RawFunction {
                name: "calc".into(),
                raw: "100% - (2 * #{$x})".into()
            }]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(types("a // gone\nb"), vec![TokenType::Ident("a".into()), TokenType::Ident("b".into())]);
        assert_eq!(types("/* kept */"), vec![TokenType::Comment("/* kept */".into())]);
    }

    #[test]
    fn test_interpolation_and_flags() {
        assert_eq!(
            types("#{$a} !important !default #fff"),
            vec![
                TokenType::InterpolationStart,
                TokenType::Variable("a".into()),
                TokenType::RightBrace,
                TokenType::Bang("important".into()),
                TokenType::Bang("default".into()),
                TokenType::Hash("fff".into()),
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("a {\n  color: red;\n}", "test.scss").tokenize().unwrap();
        let color = tokens
            .iter()
            .find(|t| t.token_type == TokenType::Ident("color".into()))
            .unwrap();
        assert_eq!((color.line, color.column), (2, 3));
        assert_eq!((color.start, color.end), (6, 11));
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        let result = Lexer::new("a { content: \"oops; }", "test.scss").tokenize();
        assert!(matches!(result, Err(CompilerError::Parse { .. })));
    }
}
