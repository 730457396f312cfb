//! Expression parser
//!
//! Converts a sequence of tokens into an Abstract Syntax Tree (AST).
//! Uses recursive descent parsing with operator precedence.

use super::evaluator::EvalError;
use super::tokenizer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(BinaryOp::Add),
            '-' => Some(BinaryOp::Sub),
            '*' => Some(BinaryOp::Mul),
            '/' => Some(BinaryOp::Div),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

/// Abstract Syntax Tree node for arithmetic expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// A `[Name]` parameter reference
    Reference(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Collect every referenced name, in first-occurrence order, without duplicates
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Reference(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expr::Unary { operand, .. } => operand.collect_references(names),
            Expr::Binary { left, right, .. } => {
                left.collect_references(names);
                right.collect_references(names);
            }
        }
    }
}

/// Deepest AST (and deepest parenthesis/unary nesting) the parser accepts.
/// Parsing, evaluation and drop all recurse once per level.
pub const MAX_DEPTH: usize = 256;

/// An AST node with its depth
type Parsed = (Expr, usize);

/// Parser for expression tokens
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    nesting: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            nesting: 0,
        }
    }

    /// Parse the tokens into an AST
    pub fn parse(mut self) -> Result<Expr, EvalError> {
        if self.tokens.is_empty() {
            return Err(EvalError::Empty);
        }
        check_parentheses(&self.tokens)?;

        let (expr, _) = self.expression()?;

        if let Some(token) = self.peek() {
            return Err(EvalError::syntax(
                format!("Unexpected token after expression: {:?}", token),
                self.position,
            ));
        }

        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Consume the current token if it is one of `ops`
    fn match_any_operator(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token::Operator(c)) if ops.contains(c) => {
                let c = *c;
                self.position += 1;
                Some(c)
            }
            _ => None,
        }
    }

    fn match_binary(&mut self, ops: &[char]) -> Option<BinaryOp> {
        self.match_any_operator(ops).and_then(BinaryOp::from_char)
    }

    /// Expression: term
    fn expression(&mut self) -> Result<Parsed, EvalError> {
        self.term()
    }

    /// Term: factor (( "+" | "-" ) factor)*
    fn term(&mut self) -> Result<Parsed, EvalError> {
        let (mut left, mut depth) = self.factor()?;

        while let Some(op) = self.match_binary(&['+', '-']) {
            let (right, right_depth) = self.factor()?;
            depth = self.deepen(depth.max(right_depth))?;
            left = binary(op, left, right);
        }

        Ok((left, depth))
    }

    /// Factor: unary (( "*" | "/" ) unary)*
    fn factor(&mut self) -> Result<Parsed, EvalError> {
        let (mut left, mut depth) = self.unary()?;

        while let Some(op) = self.match_binary(&['*', '/']) {
            let (right, right_depth) = self.unary()?;
            depth = self.deepen(depth.max(right_depth))?;
            left = binary(op, left, right);
        }

        Ok((left, depth))
    }

    /// Unary: ( "-" | "+" ) unary | primary
    fn unary(&mut self) -> Result<Parsed, EvalError> {
        let op = match self.match_any_operator(&['-', '+']) {
            Some('-') => UnaryOp::Minus,
            Some(_) => UnaryOp::Plus,
            None => return self.primary(),
        };
        self.enter()?;
        let (operand, depth) = self.unary()?;
        self.nesting -= 1;
        Ok((
            Expr::Unary {
                op,
                operand: Box::new(operand),
            },
            self.deepen(depth)?,
        ))
    }

    /// Primary: NUMBER | REFERENCE | "(" expression ")"
    fn primary(&mut self) -> Result<Parsed, EvalError> {
        let position = self.position;

        match self.advance() {
            Some(Token::Number(n)) => Ok((Expr::Number(n), 1)),
            Some(Token::Reference(name)) => Ok((Expr::Reference(name), 1)),
            Some(Token::OpenParen) => {
                self.enter()?;
                let parsed = self.expression()?;
                self.nesting -= 1;
                match self.advance() {
                    Some(Token::CloseParen) => Ok(parsed),
                    _ => Err(EvalError::UnbalancedParentheses),
                }
            }
            Some(token) => Err(EvalError::syntax(
                format!("Unexpected token: {:?}", token),
                position,
            )),
            None => Err(EvalError::syntax("Unexpected end of expression", position)),
        }
    }

    /// Track recursion through parentheses and unary operators
    fn enter(&mut self) -> Result<(), EvalError> {
        self.nesting += 1;
        if self.nesting > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok(())
    }

    /// Depth of a node built over a child of depth `child`
    fn deepen(&self, child: usize) -> Result<usize, EvalError> {
        let depth = child + 1;
        if depth > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok(depth)
    }

    fn too_deep(&self) -> EvalError {
        EvalError::syntax("expression too deep", self.position)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Reject `(1 + 2` and `1 + 2)` before parsing, so they report as
/// unbalanced rather than as a generic syntax error
fn check_parentheses(tokens: &[Token]) -> Result<(), EvalError> {
    let mut depth: usize = 0;
    for token in tokens {
        match token {
            Token::OpenParen => depth += 1,
            Token::CloseParen => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(EvalError::UnbalancedParentheses)?;
            }
            _ => {}
        }
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(EvalError::UnbalancedParentheses)
    }
}

/// Convenience function to parse tokens into an AST
pub fn parse(tokens: Vec<Token>) -> Result<Expr, EvalError> {
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expression::tokenizer::tokenize;

    fn parse_formula(formula: &str) -> Result<Expr, EvalError> {
        parse(tokenize(formula)?)
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_formula("42").unwrap(), Expr::Number(42.0));
    }

    #[test]
    fn test_parse_negative_number() {
        assert_eq!(
            parse_formula("-42").unwrap(),
            Expr::Unary {
                op: UnaryOp::Minus,
                operand: num(42.0),
            }
        );
    }

    #[test]
    fn test_parse_precedence() {
        // 1 + 2 * 3 => 1 + (2 * 3)
        assert_eq!(
            parse_formula("1 + 2 * 3").unwrap(),
            Expr::Binary {
                op: BinaryOp::Add,
                left: num(1.0),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: num(2.0),
                    right: num(3.0),
                }),
            }
        );
    }

    #[test]
    fn test_parse_left_associative_subtraction() {
        // 10 - 4 - 3 => (10 - 4) - 3
        assert_eq!(
            parse_formula("10 - 4 - 3").unwrap(),
            Expr::Binary {
                op: BinaryOp::Sub,
                left: Box::new(Expr::Binary {
                    op: BinaryOp::Sub,
                    left: num(10.0),
                    right: num(4.0),
                }),
                right: num(3.0),
            }
        );
    }

    #[test]
    fn test_parse_references() {
        let expr = parse_formula("[A] * ([B] + [A]) / [C]").unwrap();
        assert_eq!(expr.references(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_formula(""), Err(EvalError::Empty));
        assert_eq!(parse_formula("   "), Err(EvalError::Empty));
    }

    #[test]
    fn test_parse_unbalanced_parentheses() {
        assert_eq!(
            parse_formula("(1 + 2"),
            Err(EvalError::UnbalancedParentheses)
        );
        assert_eq!(
            parse_formula("1 + 2)"),
            Err(EvalError::UnbalancedParentheses)
        );
        assert_eq!(
            parse_formula(")1 + 2("),
            Err(EvalError::UnbalancedParentheses)
        );
    }

    #[test]
    fn test_parse_syntax_errors() {
        for bad in ["[A] +", "* 2", "1 2", "()", "[A] [B]", "1.2.3", "3 * / 4"] {
            assert!(
                matches!(parse_formula(bad), Err(EvalError::Syntax { .. })),
                "expected syntax error for {:?}",
                bad
            );
        }
    }

    fn too_deep(result: Result<Expr, EvalError>) -> bool {
        matches!(
            result,
            Err(EvalError::Syntax { message, .. }) if message == "expression too deep"
        )
    }

    #[test]
    fn test_parse_depth_limit() {
        let long_sum = vec!["1"; 10_000].join("+");
        assert!(too_deep(parse_formula(&long_sum)));

        let nested = format!("{}1{}", "(".repeat(5_000), ")".repeat(5_000));
        assert!(too_deep(parse_formula(&nested)));

        let negations = format!("{}1", "- ".repeat(5_000));
        assert!(too_deep(parse_formula(&negations)));
    }

    #[test]
    fn test_parse_within_depth_limit() {
        let sum = vec!["[A]"; MAX_DEPTH / 2].join(" + ");
        assert!(parse_formula(&sum).is_ok());

        let nested = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse_formula(&nested).unwrap(), Expr::Number(1.0));
    }
}
