use thiserror::Error;

use crate::ast::{ParseContext, Spanned, Token};

/// Errors raised while splitting a filter into tokens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("Unexpected character '{ch}' at {context}")]
    UnexpectedChar { ch: char, context: ParseContext },

    #[error("Unterminated string starting at {context}")]
    UnterminatedString { context: ParseContext },

    #[error("Unterminated regex starting at {context}")]
    UnterminatedRegex { context: ParseContext },

    #[error("Invalid escape sequence '\\{ch}' at {context}")]
    InvalidEscape { ch: char, context: ParseContext },

    #[error("Invalid number '{text}' at {context}")]
    InvalidNumber { text: String, context: ParseContext },

    #[error("Expected variable name after '@' at {context}")]
    EmptyVariable { context: ParseContext },
}

impl LexError {
    pub fn context(&self) -> ParseContext {
        match self {
            LexError::UnexpectedChar { context, .. }
            | LexError::UnterminatedString { context }
            | LexError::UnterminatedRegex { context }
            | LexError::InvalidEscape { context, .. }
            | LexError::InvalidNumber { context, .. }
            | LexError::EmptyVariable { context } => *context,
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

fn is_name_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$' || ch == '*'
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '-' || ch == '*'
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// The full input text
    pub fn source(&self) -> String {
        self.input.iter().collect()
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if self.current_char() == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
    }

    fn context(&self) -> ParseContext {
        ParseContext::new(self.line, self.column)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_name(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if is_name_char(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_quoted(&mut self, quote: char, start: ParseContext) -> Result<String, LexError> {
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    let escape_at = self.context();
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some(ch) => {
                            return Err(LexError::InvalidEscape {
                                ch,
                                context: escape_at,
                            });
                        }
                        None => return Err(LexError::UnterminatedString { context: start }),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedString { context: start })
    }

    fn read_regex(&mut self, start: ParseContext) -> Result<Token, LexError> {
        let mut pattern = String::new();
        self.advance(); // opening ~

        loop {
            match self.current_char() {
                None => return Err(LexError::UnterminatedRegex { context: start }),
                Some('~') => {
                    self.advance();
                    break;
                }
                Some('\\') if self.peek_char(1) == Some('~') => {
                    pattern.push('~');
                    self.advance();
                    self.advance();
                }
                Some(ch) => {
                    pattern.push(ch);
                    self.advance();
                }
            }
        }

        let case_insensitive = self.current_char() == Some('i');
        if case_insensitive {
            self.advance();
        }

        Ok(Token::Regex {
            pattern,
            case_insensitive,
        })
    }

    fn read_number(&mut self, start: ParseContext) -> Result<Token, LexError> {
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Field names such as `2fa` start with digits
        if !is_float && self.current_char().is_some_and(|c| c.is_alphabetic() || c == '_') {
            number.push_str(&self.read_name());
            return Ok(Token::Identifier(number));
        }

        if is_float {
            number
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| LexError::InvalidNumber {
                    text: number,
                    context: start,
                })
        } else {
            number
                .parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| LexError::InvalidNumber {
                    text: number,
                    context: start,
                })
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    pub fn next_token(&mut self) -> Result<Spanned, LexError> {
        self.skip_whitespace();
        let context = self.context();

        let token = match self.current_char() {
            None => Token::Eof,
            Some(',') => self.single(Token::Comma),
            Some('.') => self.single(Token::Dot),
            Some(':') => self.single(Token::Colon),
            Some('|') => self.single(Token::Pipe),
            Some('-') => self.single(Token::Minus),
            Some('(') => self.single(Token::LParen),
            Some(')') => self.single(Token::RParen),
            Some('[') => self.single(Token::LBracket),
            Some(']') => self.single(Token::RBracket),
            Some('{') => self.single(Token::LBrace),
            Some('}') => self.single(Token::RBrace),
            Some('"') => Token::Quoted(self.read_quoted('"', context)?),
            Some('\'') => Token::Quoted(self.read_quoted('\'', context)?),
            Some('~') => self.read_regex(context)?,
            Some('@') => {
                self.advance();
                let name = self.read_name();
                if name.is_empty() {
                    return Err(LexError::EmptyVariable { context });
                }
                Token::Variable(name)
            }
            Some(ch) if is_name_start(ch) => {
                let name = self.read_name();
                match name.as_str() {
                    "*" => Token::Star,
                    "**" => Token::DoubleStar,
                    n if n.contains('*') => Token::Glob(n.to_string()),
                    _ => Token::Identifier(name),
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(context)?,
            Some(ch) => return Err(LexError::UnexpectedChar { ch, context }),
        };

        Ok(Spanned { token, context })
    }

    /// Lex the whole input, ending with [`Token::Eof`]
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(
            tokens("*,**,na*e"),
            vec![
                Token::Star,
                Token::Comma,
                Token::DoubleStar,
                Token::Comma,
                Token::Glob("na*e".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_positions_track_lines() {
        let spanned = Lexer::new("id,\n  name").tokenize().unwrap();
        assert_eq!(spanned[2].context, ParseContext::new(2, 3));
    }

    #[test]
    fn test_digit_leading_name() {
        assert_eq!(tokens("2fa"), vec![Token::Identifier("2fa".into()), Token::Eof]);
    }
}
