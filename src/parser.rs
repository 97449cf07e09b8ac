use std::mem;

use thiserror::Error;
use tracing::trace;

use crate::{
    ast::{Arg, FilterNode, FilterTree, FunctionCall, Name, ParseContext, Spanned, Token},
    lexer::{LexError, Lexer},
    value::Value,
};

/// Malformed filter text. Nothing is compiled when this is returned.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {context}")]
pub struct ParseError {
    pub message: String,
    pub context: ParseContext,
}

impl ParseError {
    pub fn new(message: impl Into<String>, context: ParseContext) -> Self {
        ParseError {
            message: message.into(),
            context,
        }
    }

    pub fn line(&self) -> usize {
        self.context.line
    }

    pub fn column(&self) -> usize {
        self.context.column
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        let context = e.context();
        ParseError {
            message: e.to_string(),
            context,
        }
    }
}

/// Parse filter text into a [`FilterTree`] without caching.
///
/// # Examples
///
/// ```
/// let tree = prune_lang::compile("id,owner{name}").unwrap();
/// assert_eq!(tree.nodes().len(), 2);
/// assert!(tree.nodes()[1].has_nested_spec());
/// ```
pub fn compile(filter: &str) -> Result<FilterTree, ParseError> {
    let lexer = Lexer::new(filter);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

pub struct Parser {
    source: String,
    tokens: Vec<Spanned>,
    position: usize,
    current_token: Token,
    current_context: ParseContext,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let source = lexer.source();
        let tokens = lexer.tokenize()?;
        let first = tokens.first().cloned().unwrap_or(Spanned {
            token: Token::Eof,
            context: ParseContext::new(1, 1),
        });

        Ok(Parser {
            source,
            tokens,
            position: 0,
            current_token: first.token,
            current_context: first.context,
        })
    }

    fn advance(&mut self) {
        self.position += 1;
        match self.tokens.get(self.position) {
            Some(next) => {
                self.current_token = next.token.clone();
                self.current_context = next.context;
            }
            None => self.current_token = Token::Eof,
        }
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset).map(|s| &s.token)
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.error(format!(
                "Expected {}, got {}",
                describe(&expected),
                describe(&self.current_token)
            )));
        }
        self.advance();
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current_context)
    }

    /// `.` followed by `name(` starts a value function rather than a path
    fn is_call_after_dot(&self) -> bool {
        matches!(self.peek(1), Some(Token::Identifier(_))) && matches!(self.peek(2), Some(Token::LParen))
    }

    /// Parse a complete filter
    pub fn parse(&mut self) -> Result<FilterTree, ParseError> {
        let mut nodes = Vec::new();
        let mut stage = 0;

        loop {
            let start = self.current_context;
            let mut selectors = Vec::new();

            if !self.check(&Token::Pipe) && !self.check(&Token::Eof) {
                selectors = self.parse_selector_list()?;
            }

            if selectors.is_empty() {
                selectors.push(FilterNode::named(Name::AnyDeep, start));
            }

            nodes.extend(finish_block(selectors).iter().map(|n| n.with_stage(stage)));

            if self.check(&Token::Pipe) {
                self.advance();
                stage += 1;
            } else {
                break;
            }
        }

        self.expect(Token::Eof)?;
        trace!(filter = %self.source, stages = stage + 1, "parsed filter");

        Ok(FilterTree::new(mem::take(&mut self.source), nodes))
    }

    fn parse_selector_list(&mut self) -> Result<Vec<FilterNode>, ParseError> {
        let mut selectors = vec![self.parse_selector()?];

        while self.check(&Token::Comma) {
            self.advance();
            selectors.push(self.parse_selector()?);
        }

        Ok(selectors)
    }

    fn parse_selector(&mut self) -> Result<FilterNode, ParseError> {
        let negated = if self.check(&Token::Minus) {
            self.advance();
            true
        } else {
            false
        };

        let mut segments = vec![self.parse_segment()?];

        while self.check(&Token::Dot) && !self.is_call_after_dot() {
            self.advance(); // consume '.'
            segments.push(self.parse_segment()?);
        }

        // a.b.c is a{b{c}}; the negation belongs to the leaf
        let mut node = segments.pop().ok_or_else(|| self.error("Expected field name"))?;
        node.negated = negated;

        while let Some(mut parent) = segments.pop() {
            if parent.nested {
                return Err(ParseError::new(
                    format!("Nested block on '{}' cannot be followed by '.'", parent.name.raw()),
                    parent.context,
                ));
            }
            parent.nested = true;
            parent.children = finish_block(vec![node]);
            node = parent;
        }

        Ok(node)
    }

    fn parse_segment(&mut self) -> Result<FilterNode, ParseError> {
        let context = self.current_context;

        let name = match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Identifier(name) | Token::Quoted(name) => Name::Exact(name),
            Token::Integer(n) => Name::Exact(n.to_string()),
            Token::Star => Name::AnyShallow,
            Token::DoubleStar => Name::AnyDeep,
            Token::Variable(name) => Name::Variable(name),
            Token::Glob(glob) => Name::glob(&glob)
                .map_err(|e| ParseError::new(format!("Invalid pattern '{}': {}", glob, e), context))?,
            Token::Regex {
                pattern,
                case_insensitive,
            } => Name::regex(&pattern, case_insensitive)
                .map_err(|e| ParseError::new(format!("Invalid regex '{}': {}", pattern, e), context))?,
            token => {
                return Err(ParseError::new(
                    format!("Expected field name, got {}", describe(&token)),
                    context,
                ));
            }
        };
        self.advance();

        let mut node = FilterNode::named(name, context);

        if node.is_any_deep() && self.check(&Token::LBrace) && matches!(self.peek(1), Some(Token::Integer(_))) {
            self.parse_depth_bound(&mut node)?;
        }

        loop {
            if self.check(&Token::Colon) {
                self.advance();
                node.key_functions.push(self.parse_call()?);
            } else if self.check(&Token::Dot) && self.is_call_after_dot() {
                self.advance();
                node.value_functions.push(self.parse_call()?);
            } else if self.check(&Token::LBracket) {
                self.advance();
                node.value_functions.push(self.parse_call()?);
                while self.check(&Token::Dot) || self.check(&Token::Comma) {
                    self.advance();
                    node.value_functions.push(self.parse_call()?);
                }
                self.expect(Token::RBracket)?;
            } else {
                break;
            }
        }

        if self.check(&Token::LBrace) {
            self.advance();
            node.nested = true;

            if self.check(&Token::RBrace) {
                node.empty_nested = true;
            } else {
                node.children = finish_block(self.parse_selector_list()?);
            }

            self.expect(Token::RBrace)?;
        }

        Ok(node)
    }

    fn parse_depth_bound(&mut self, node: &mut FilterNode) -> Result<(), ParseError> {
        self.expect(Token::LBrace)?;

        let min = self.parse_depth()?;
        let mut max = None;

        if self.check(&Token::Comma) {
            self.advance();
            if !self.check(&Token::RBrace) {
                let context = self.current_context;
                let bound = self.parse_depth()?;
                if bound <= min {
                    return Err(ParseError::new(
                        format!("Max depth {} must be greater than min depth {}", bound, min),
                        context,
                    ));
                }
                max = Some(bound);
            }
        }

        self.expect(Token::RBrace)?;
        node.min_depth = Some(min);
        node.max_depth = max;
        Ok(())
    }

    fn parse_depth(&mut self) -> Result<usize, ParseError> {
        match self.current_token {
            Token::Integer(n) if n >= 0 => {
                self.advance();
                usize::try_from(n).map_err(|_| self.error(format!("Depth {} is out of range", n)))
            }
            _ => Err(self.error(format!(
                "Expected depth, got {}",
                describe(&self.current_token)
            ))),
        }
    }

    fn parse_call(&mut self) -> Result<FunctionCall, ParseError> {
        let context = self.current_context;

        let name = match &self.current_token {
            Token::Identifier(name) => name.clone(),
            token => {
                return Err(self.error(format!(
                    "Expected function name, got {}",
                    describe(token)
                )));
            }
        };
        self.advance();
        self.expect(Token::LParen)?;

        let mut args = Vec::new();
        while !self.check(&Token::RParen) {
            args.push(self.parse_arg()?);

            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RParen)?;

        Ok(FunctionCall::new(name, args, context))
    }

    fn parse_arg(&mut self) -> Result<Arg, ParseError> {
        let arg = match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Quoted(s) => Arg::Literal(Value::String(s)),
            Token::Integer(n) => Arg::Literal(Value::Integer(n)),
            Token::Float(n) => Arg::Literal(Value::Float(n)),
            Token::Variable(name) => Arg::Variable(name),
            Token::Identifier(word) => match word.as_str() {
                "true" => Arg::Literal(Value::Boolean(true)),
                "false" => Arg::Literal(Value::Boolean(false)),
                "null" => Arg::Literal(Value::Null),
                _ => {
                    return Err(self.error(format!(
                        "Unexpected identifier '{}' in arguments (quote strings)",
                        word
                    )));
                }
            },
            Token::Minus => {
                self.advance();
                return match self.current_token {
                    Token::Integer(n) => {
                        self.advance();
                        Ok(Arg::Literal(Value::Integer(-n)))
                    }
                    Token::Float(n) => {
                        self.advance();
                        Ok(Arg::Literal(Value::Float(-n)))
                    }
                    _ => Err(self.error("Expected number after '-'")),
                };
            }
            token => {
                return Err(self.error(format!("Unexpected {} in arguments", describe(&token))));
            }
        };

        self.advance();
        Ok(arg)
    }
}

/// Merge mergeable siblings and complete all-negated blocks with `*`
fn finish_block(nodes: Vec<FilterNode>) -> Vec<FilterNode> {
    let mut merged: Vec<FilterNode> = Vec::with_capacity(nodes.len());

    for node in nodes {
        match merged.iter_mut().find(|existing| mergeable(existing, &node)) {
            Some(existing) => {
                let mut children = mem::take(&mut existing.children);
                children.extend(node.children);
                existing.children = finish_block(children);
                existing.key_functions.extend(node.key_functions);
                existing.value_functions.extend(node.value_functions);
            }
            None => merged.push(node),
        }
    }

    if let Some(last) = merged.last()
        && merged.iter().all(|n| n.negated)
    {
        let context = last.context;
        merged.push(FilterNode::named(Name::AnyShallow, context));
    }

    merged
}

fn mergeable(a: &FilterNode, b: &FilterNode) -> bool {
    a.name == b.name
        && a.negated == b.negated
        && a.nested
        && b.nested
        && !a.empty_nested
        && !b.empty_nested
        && a.min_depth == b.min_depth
        && a.max_depth == b.max_depth
}

fn describe(token: &Token) -> String {
    match token {
        Token::Identifier(s) => format!("identifier '{}'", s),
        Token::Quoted(s) => format!("string \"{}\"", s),
        Token::Integer(n) => format!("integer {}", n),
        Token::Float(n) => format!("number {}", n),
        Token::Star => "'*'".to_string(),
        Token::DoubleStar => "'**'".to_string(),
        Token::Glob(s) => format!("pattern '{}'", s),
        Token::Regex { pattern, .. } => format!("regex ~{}~", pattern),
        Token::Variable(s) => format!("variable @{}", s),
        Token::Minus => "'-'".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Pipe => "'|'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::LBracket => "'['".to_string(),
        Token::RBracket => "']'".to_string(),
        Token::LBrace => "'{'".to_string(),
        Token::RBrace => "'}'".to_string(),
        Token::Eof => "end of input".to_string(),
    }
}
