//! Expression tokenizer
//!
//! Converts expressions like "[Total Cholesterol] - ([Triglycerides] / 5)"
//! into a sequence of tokens that can be parsed into an AST.

use std::iter::Peekable;
use std::str::Chars;

use super::evaluator::EvalError;

/// A token in a formula or range expression
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A numeric literal (e.g., 5, 0.25, .5, 1.5e3)
    Number(f64),
    /// A bracketed parameter reference; holds the name between the brackets
    Reference(String),
    /// Arithmetic operators: + - * /
    Operator(char),
    OpenParen,
    CloseParen,
}

/// Tokenizer for formula expressions
pub struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer for the given expression.
    ///
    /// A leading '=' is tolerated, as template editors sometimes store one.
    pub fn new(expression: &'a str) -> Self {
        let expression = expression.trim_start();
        let expression = expression.strip_prefix('=').unwrap_or(expression);
        Self {
            chars: expression.chars().peekable(),
            position: 0,
        }
    }

    /// Tokenize the entire expression into a vector of tokens
    pub fn tokenize(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Get the next token, or None if at end of input
    fn next_token(&mut self) -> Result<Option<Token>, EvalError> {
        self.skip_whitespace();

        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '[' => self.read_reference()?,
            '(' => {
                self.advance();
                Token::OpenParen
            }
            ')' => {
                self.advance();
                Token::CloseParen
            }
            '+' | '-' | '*' | '/' => {
                self.advance();
                Token::Operator(c)
            }
            c if c.is_ascii_digit() || c == '.' => self.read_number()?,
            ']' => {
                return Err(EvalError::syntax(
                    "Unexpected ']' without matching '['",
                    self.position,
                ));
            }
            c => {
                return Err(EvalError::syntax(
                    format!("Unexpected character: '{}'", c),
                    self.position,
                ));
            }
        };

        Ok(Some(token))
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Push consecutive ASCII digits onto `buf`
    fn read_digits(&mut self, buf: &mut String) {
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            buf.push(c);
            self.advance();
        }
    }

    /// Read a number (integer, decimal, or scientific notation)
    fn read_number(&mut self) -> Result<Token, EvalError> {
        let start_pos = self.position;
        let mut num_str = String::new();

        self.read_digits(&mut num_str);

        if self.peek() == Some('.') {
            num_str.push('.');
            self.advance();
            self.read_digits(&mut num_str);
        }

        if let Some(e) = self.peek().filter(|c| *c == 'e' || *c == 'E') {
            num_str.push(e);
            self.advance();
            if let Some(sign) = self.peek().filter(|c| *c == '+' || *c == '-') {
                num_str.push(sign);
                self.advance();
            }
            self.read_digits(&mut num_str);
        }

        num_str
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| EvalError::syntax(format!("Invalid number: {}", num_str), start_pos))
    }

    /// Read `[Name]`. The name is everything between the brackets, verbatim.
    fn read_reference(&mut self) -> Result<Token, EvalError> {
        let start_pos = self.position;
        self.advance(); // consume '['
        let mut name = String::new();

        loop {
            match self.advance() {
                None => {
                    return Err(EvalError::syntax("Unterminated reference", start_pos));
                }
                Some(']') => break,
                Some('[') => {
                    return Err(EvalError::syntax(
                        "Nested '[' inside reference",
                        self.position - 1,
                    ));
                }
                Some(c) => name.push(c),
            }
        }

        if name.trim().is_empty() {
            return Err(EvalError::syntax("Empty reference '[]'", start_pos));
        }

        Ok(Token::Reference(name))
    }
}

/// Convenience function to tokenize an expression string
pub fn tokenize(expression: &str) -> Result<Vec<Token>, EvalError> {
    Tokenizer::new(expression).tokenize()
}
