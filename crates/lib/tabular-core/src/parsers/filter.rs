//! Parser for row filter expressions.
//!
//! The accepted language is a closed subset: literals, column references,
//! boolean/comparison/arithmetic operators, `in` lists and a handful of
//! whitelisted column methods. Everything that could name code, assign state
//! or reach outside the row is rejected before evaluation.

use std::{error::Error, fmt};

use tabular_store::models::Value;
use tabular_store::schema::MAX_FILTER_DEPTH;

const BLOCKED_WORDS: &[&str] = &["import", "lambda", "exec", "eval"];

/// Whether a rejected expression was dangerous or just unreadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterErrorKind {
    Forbidden,
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParseError {
    pub kind: FilterErrorKind,
    pub message: String,
}

impl FilterParseError {
    fn forbidden(message: impl Into<String>) -> Self {
        Self {
            kind: FilterErrorKind::Forbidden,
            message: message.into(),
        }
    }

    fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: FilterErrorKind::Malformed,
            message: message.into(),
        }
    }
}

impl fmt::Display for FilterParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for FilterParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Whitelisted column methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Contains,
    StartsWith,
    EndsWith,
    IsNull,
    NotNull,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column(String),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    In {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Method {
        column: String,
        method: Method,
        argument: Option<String>,
    },
}

impl Expr {
    /// Column names referenced anywhere in the expression, in first-use order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_columns(&mut names);
        names
    }

    fn collect_columns<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::Column(name) | Self::Method { column: name, .. } => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Self::Unary { expr, .. } => expr.collect_columns(names),
            Self::Binary { left, right, .. } => {
                left.collect_columns(names);
                right.collect_columns(names);
            }
            Self::In { expr, list, .. } => {
                expr.collect_columns(names);
                for item in list {
                    item.collect_columns(names);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Quoted(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Tilde,
    Bang,
    Eof,
}

impl Token {
    fn is_word(&self, word: &str) -> bool {
        matches!(self, Self::Ident(value) if value.eq_ignore_ascii_case(word))
    }
}

/// Parser for filter expressions.
pub struct FilterParser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl FilterParser {
    /// Parses a filter expression.
    ///
    /// # Errors
    /// Returns `FilterParseError` with kind `Forbidden` for constructs outside
    /// the safe subset and `Malformed` for syntax errors.
    pub fn parse(text: &str) -> Result<Expr, FilterParseError> {
        let tokens = tokenize(text)?;
        if tokens.len() == 1 {
            return Err(FilterParseError::malformed("filter expression is empty"));
        }
        let mut parser = Self {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.parse_or()?;
        if parser.current() != &Token::Eof {
            return Err(FilterParseError::malformed(format!(
                "unexpected {} after expression",
                describe(parser.current())
            )));
        }
        Ok(expr)
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos + 1).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), FilterParseError> {
        if self.current() == expected {
            self.advance();
            Ok(())
        } else {
            Err(FilterParseError::malformed(format!(
                "expected {}, found {}",
                describe(expected),
                describe(self.current())
            )))
        }
    }

    /// Enters one nesting level, failing once the tree would exceed
    /// `MAX_FILTER_DEPTH`. Callers restore `depth` when they return.
    fn nest(&mut self) -> Result<(), FilterParseError> {
        self.depth += 1;
        if self.depth > MAX_FILTER_DEPTH {
            return Err(FilterParseError::malformed(format!(
                "expression nests too deeply (limit {MAX_FILTER_DEPTH})"
            )));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Expr, FilterParseError> {
        let outer = self.depth;
        let mut left = self.parse_and()?;
        while self.current() == &Token::Pipe || self.current().is_word("or") {
            self.advance();
            self.nest()?;
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, FilterParseError> {
        let outer = self.depth;
        let mut left = self.parse_not()?;
        while self.current() == &Token::Amp || self.current().is_word("and") {
            self.advance();
            self.nest()?;
            let right = self.parse_not()?;
            left = binary(BinaryOp::And, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, FilterParseError> {
        if matches!(self.current(), Token::Tilde | Token::Bang) || self.current().is_word("not") {
            self.advance();
            self.nest()?;
            let expr = self.parse_not()?;
            self.depth -= 1;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, FilterParseError> {
        let left = self.parse_additive()?;
        let expr = if let Some(op) = comparison_op(self.current()) {
            self.advance();
            let right = self.parse_additive()?;
            binary(op, left, right)
        } else if self.current().is_word("in") {
            self.advance();
            let list = self.parse_list()?;
            Expr::In {
                expr: Box::new(left),
                list,
                negated: false,
            }
        } else if self.current().is_word("not") && self.peek().is_word("in") {
            self.advance();
            self.advance();
            let list = self.parse_list()?;
            Expr::In {
                expr: Box::new(left),
                list,
                negated: true,
            }
        } else {
            return Ok(left);
        };

        if comparison_op(self.current()).is_some() || self.current().is_word("in") {
            return Err(FilterParseError::malformed(
                "chained comparisons are not supported; combine them with `and`",
            ));
        }
        Ok(expr)
    }

    fn parse_list(&mut self) -> Result<Vec<Expr>, FilterParseError> {
        let close = match self.current() {
            Token::LBracket => Token::RBracket,
            Token::LParen => Token::RParen,
            other => {
                return Err(FilterParseError::malformed(format!(
                    "expected a list after `in`, found {}",
                    describe(other)
                )));
            }
        };
        self.advance();
        let mut items = Vec::new();
        if self.current() == &close {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.parse_additive()?);
            if self.current() == &Token::Comma {
                self.advance();
                if self.current() == &close {
                    break;
                }
                continue;
            }
            break;
        }
        self.expect(&close)?;
        Ok(items)
    }

    fn parse_additive(&mut self) -> Result<Expr, FilterParseError> {
        let outer = self.depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => {
                    self.depth = outer;
                    return Ok(left);
                }
            };
            self.advance();
            self.nest()?;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, FilterParseError> {
        let outer = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => {
                    self.depth = outer;
                    return Ok(left);
                }
            };
            self.advance();
            self.nest()?;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, FilterParseError> {
        if self.current() == &Token::Minus {
            self.advance();
            self.nest()?;
            let expr = self.parse_unary()?;
            self.depth -= 1;
            return Ok(match expr {
                Expr::Literal(Value::Int(value)) => Expr::Literal(Value::Int(-value)),
                Expr::Literal(Value::Float(value)) => Expr::Literal(Value::Float(-value)),
                other => Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(other),
                },
            });
        }
        if self.current() == &Token::Plus {
            self.advance();
            self.nest()?;
            let expr = self.parse_unary()?;
            self.depth -= 1;
            return Ok(expr);
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, FilterParseError> {
        let primary = self.parse_primary()?;
        if self.current() == &Token::LParen {
            let name = match &primary {
                Expr::Column(name) => name.clone(),
                _ => "expression".to_string(),
            };
            return Err(FilterParseError::forbidden(format!(
                "function calls are not allowed: `{name}(...)`"
            )));
        }
        if self.current() != &Token::Dot {
            return Ok(primary);
        }
        let Expr::Column(column) = primary else {
            return Err(FilterParseError::forbidden(
                "attribute access is only allowed on columns",
            ));
        };
        self.parse_method(column)
    }

    fn parse_method(&mut self, column: String) -> Result<Expr, FilterParseError> {
        self.advance();
        let first = self.attribute_name()?;
        let (method, takes_argument) = if first == "str" {
            self.expect(&Token::Dot)?;
            let name = self.attribute_name()?;
            let method = match name.as_str() {
                "contains" => Method::Contains,
                "startswith" => Method::StartsWith,
                "endswith" => Method::EndsWith,
                _ => {
                    return Err(FilterParseError::forbidden(format!(
                        "method `str.{name}` is not allowed"
                    )));
                }
            };
            (method, true)
        } else {
            let method = match first.as_str() {
                "isna" | "isnull" => Method::IsNull,
                "notna" | "notnull" => Method::NotNull,
                _ => {
                    return Err(FilterParseError::forbidden(format!(
                        "attribute `{first}` is not allowed"
                    )));
                }
            };
            (method, false)
        };

        self.expect(&Token::LParen)?;
        let argument = if takes_argument {
            match self.advance() {
                Token::Str(value) => Some(value),
                other => {
                    return Err(FilterParseError::malformed(format!(
                        "string methods take one string literal, found {}",
                        describe(&other)
                    )));
                }
            }
        } else {
            None
        };
        self.expect(&Token::RParen)?;

        if self.current() == &Token::Dot {
            return Err(FilterParseError::forbidden(
                "method results cannot be chained",
            ));
        }
        Ok(Expr::Method {
            column,
            method,
            argument,
        })
    }

    fn attribute_name(&mut self) -> Result<String, FilterParseError> {
        match self.advance() {
            Token::Ident(name) => Ok(name),
            other => Err(FilterParseError::malformed(format!(
                "expected an attribute name, found {}",
                describe(&other)
            ))),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, FilterParseError> {
        match self.advance() {
            Token::Int(value) => Ok(Expr::Literal(Value::Int(value))),
            Token::Float(value) => Ok(Expr::Literal(Value::Float(value))),
            Token::Str(value) => Ok(Expr::Literal(Value::Text(value))),
            Token::Quoted(name) => Ok(Expr::Column(name)),
            Token::Ident(word) => Ok(match word.as_str() {
                "true" | "True" => Expr::Literal(Value::Bool(true)),
                "false" | "False" => Expr::Literal(Value::Bool(false)),
                "null" | "None" => Expr::Literal(Value::Null),
                _ if is_keyword(&word) => {
                    return Err(FilterParseError::malformed(format!(
                        "unexpected keyword `{word}`"
                    )));
                }
                _ => Expr::Column(word),
            }),
            Token::LParen => {
                self.nest()?;
                let expr = self.parse_or()?;
                self.expect(&Token::RParen)?;
                self.depth -= 1;
                Ok(expr)
            }
            other => Err(FilterParseError::malformed(format!(
                "unexpected {}",
                describe(&other)
            ))),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

const fn comparison_op(token: &Token) -> Option<BinaryOp> {
    match token {
        Token::EqEq => Some(BinaryOp::Eq),
        Token::NotEq => Some(BinaryOp::NotEq),
        Token::Lt => Some(BinaryOp::Lt),
        Token::Le => Some(BinaryOp::Le),
        Token::Gt => Some(BinaryOp::Gt),
        Token::Ge => Some(BinaryOp::Ge),
        _ => None,
    }
}

fn is_keyword(word: &str) -> bool {
    ["and", "or", "not", "in"]
        .iter()
        .any(|keyword| word.eq_ignore_ascii_case(keyword))
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(name) => format!("`{name}`"),
        Token::Quoted(name) => format!("`{name}`"),
        Token::Str(value) => format!("string {value:?}"),
        Token::Int(value) => format!("number {value}"),
        Token::Float(value) => format!("number {value}"),
        Token::LParen => "`(`".to_string(),
        Token::RParen => "`)`".to_string(),
        Token::LBracket => "`[`".to_string(),
        Token::RBracket => "`]`".to_string(),
        Token::Comma => "`,`".to_string(),
        Token::Dot => "`.`".to_string(),
        Token::EqEq => "`==`".to_string(),
        Token::NotEq => "`!=`".to_string(),
        Token::Lt => "`<`".to_string(),
        Token::Le => "`<=`".to_string(),
        Token::Gt => "`>`".to_string(),
        Token::Ge => "`>=`".to_string(),
        Token::Plus => "`+`".to_string(),
        Token::Minus => "`-`".to_string(),
        Token::Star => "`*`".to_string(),
        Token::Slash => "`/`".to_string(),
        Token::Percent => "`%`".to_string(),
        Token::Amp => "`&`".to_string(),
        Token::Pipe => "`|`".to_string(),
        Token::Tilde => "`~`".to_string(),
        Token::Bang => "`!`".to_string(),
        Token::Eof => "end of expression".to_string(),
    }
}

#[allow(clippy::too_many_lines)]
fn tokenize(text: &str) -> Result<Vec<Token>, FilterParseError> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let (token, width) = match (c, next) {
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            (',', _) => (Token::Comma, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('~', _) => (Token::Tilde, 1),
            ('=', Some('=')) => (Token::EqEq, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('!', _) => (Token::Bang, 1),
            ('<', Some('=')) => (Token::Le, 2),
            ('<', Some('>')) => (Token::NotEq, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', Some('=')) => (Token::Ge, 2),
            ('>', _) => (Token::Gt, 1),
            ('&', Some('&')) => (Token::Amp, 2),
            ('&', _) => (Token::Amp, 1),
            ('|', Some('|')) => (Token::Pipe, 2),
            ('|', _) => (Token::Pipe, 1),
            ('.', Some(digit)) if digit.is_ascii_digit() => {
                let (token, width) = lex_number(&chars[i..])?;
                (token, width)
            }
            ('.', _) => (Token::Dot, 1),
            ('=', _) => {
                return Err(FilterParseError::forbidden(
                    "assignment is not allowed; use `==` to compare",
                ));
            }
            (':', _) => {
                return Err(FilterParseError::forbidden("assignment is not allowed"));
            }
            ('@', _) => {
                return Err(FilterParseError::forbidden(
                    "variable references (`@name`) are not allowed",
                ));
            }
            (';', _) => {
                return Err(FilterParseError::forbidden(
                    "statement separators are not allowed",
                ));
            }
            ('\'' | '"', _) => lex_string(&chars[i..])?,
            ('`', _) => {
                let (token, width) = lex_string(&chars[i..])?;
                let Token::Str(name) = token else {
                    return Err(FilterParseError::malformed("invalid quoted column"));
                };
                (Token::Quoted(name), width)
            }
            (digit, _) if digit.is_ascii_digit() => lex_number(&chars[i..])?,
            (start, _) if start.is_alphabetic() || start == '_' => {
                let mut end = i;
                while end < len && (chars[end].is_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let word: String = chars[i..end].iter().collect();
                check_word(&word)?;
                (Token::Ident(word), end - i)
            }
            (other, _) => {
                return Err(FilterParseError::malformed(format!(
                    "unexpected character `{other}`"
                )));
            }
        };
        tokens.push(token);
        i += width;
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

fn check_word(word: &str) -> Result<(), FilterParseError> {
    if word.contains("__") {
        return Err(FilterParseError::forbidden(format!(
            "dunder names are not allowed: `{word}`"
        )));
    }
    if BLOCKED_WORDS.contains(&word) {
        return Err(FilterParseError::forbidden(format!(
            "`{word}` is not allowed in filter expressions"
        )));
    }
    Ok(())
}

/// Lexes a quoted literal starting at `chars[0]`; returns the token and width.
fn lex_string(chars: &[char]) -> Result<(Token, usize), FilterParseError> {
    let quote = chars[0];
    let mut value = String::new();
    let mut i = 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                value.push(match chars[i + 1] {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                i += 2;
            }
            c if c == quote => return Ok((Token::Str(value), i + 1)),
            c => {
                value.push(c);
                i += 1;
            }
        }
    }
    Err(FilterParseError::malformed("unterminated string literal"))
}

fn lex_number(chars: &[char]) -> Result<(Token, usize), FilterParseError> {
    let mut i = 0;
    let mut is_float = false;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() || c == '_' {
            i += 1;
        } else if c == '.' && !is_float && chars.get(i + 1).is_some_and(char::is_ascii_digit) {
            is_float = true;
            i += 1;
        } else if (c == 'e' || c == 'E')
            && chars
                .get(i + 1)
                .is_some_and(|next| next.is_ascii_digit() || *next == '-' || *next == '+')
        {
            is_float = true;
            i += 2;
        } else {
            break;
        }
    }
    let text: String = chars[..i].iter().filter(|c| **c != '_').collect();
    if chars.get(i).is_some_and(|c| c.is_alphabetic()) {
        return Err(FilterParseError::malformed(format!("invalid number `{text}`")));
    }
    let token = if is_float {
        text.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Token::Float)
    } else {
        text.parse::<i64>().ok().map(Token::Int)
    };
    token
        .map(|token| (token, i))
        .ok_or_else(|| FilterParseError::malformed(format!("invalid number `{text}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> Expr {
        FilterParser::parse(text).unwrap_or_else(|err| panic!("{text}: {err}"))
    }

    fn parse_kind(text: &str) -> FilterErrorKind {
        match FilterParser::parse(text) {
            Ok(expr) => panic!("{text} should fail, parsed {expr:?}"),
            Err(err) => err.kind,
        }
    }

    #[test]
    fn parses_precedence() {
        let expr = parse_ok("age == 24 | point > 80 & state == \"CA\"");
        let Expr::Binary { op, right, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn arithmetic_binds_tighter_than_comparison() {
        let expr = parse_ok("price * 2 >= 100");
        let Expr::Binary { op, left, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Ge);
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn parses_in_lists_and_methods() {
        assert!(matches!(
            parse_ok("region not in ['north', 'south']"),
            Expr::In { negated: true, .. }
        ));
        assert!(matches!(
            parse_ok("name.str.contains(\"太郎\")"),
            Expr::Method {
                method: Method::Contains,
                ..
            }
        ));
        assert!(matches!(
            parse_ok("`unit price`.isna()"),
            Expr::Method {
                method: Method::IsNull,
                ..
            }
        ));
    }

    #[test]
    fn collects_referenced_columns() {
        let expr = parse_ok("a > 1 and (b == 'x' or a < 5) and c.notna()");
        assert_eq!(expr.columns(), vec!["a", "b", "c"]);
    }

    #[test]
    fn negative_literals_fold() {
        assert_eq!(
            parse_ok("delta > -5"),
            binary(
                BinaryOp::Gt,
                Expr::Column("delta".to_string()),
                Expr::Literal(Value::Int(-5))
            )
        );
    }

    #[test]
    fn rejects_code_execution_constructs() {
        assert_eq!(parse_kind("__import__('os').system('ls')"), FilterErrorKind::Forbidden);
        assert_eq!(parse_kind("@limit > 3"), FilterErrorKind::Forbidden);
        assert_eq!(parse_kind("open('x') == 1"), FilterErrorKind::Forbidden);
        assert_eq!(parse_kind("a = 1"), FilterErrorKind::Forbidden);
        assert_eq!(parse_kind("a > 1; b"), FilterErrorKind::Forbidden);
        assert_eq!(parse_kind("name.upper() == 'X'"), FilterErrorKind::Forbidden);
        assert_eq!(parse_kind("name.str.replace('a')"), FilterErrorKind::Forbidden);
        assert_eq!(parse_kind("lambda == 1"), FilterErrorKind::Forbidden);
    }

    #[test]
    fn reports_syntax_errors_as_malformed() {
        assert_eq!(parse_kind("(a > 1"), FilterErrorKind::Malformed);
        assert_eq!(parse_kind("a >"), FilterErrorKind::Malformed);
        assert_eq!(parse_kind("'open"), FilterErrorKind::Malformed);
        assert_eq!(parse_kind("1 < a < 5"), FilterErrorKind::Malformed);
        assert_eq!(parse_kind("   "), FilterErrorKind::Malformed);
        assert_eq!(parse_kind("a > 1 b"), FilterErrorKind::Malformed);
        assert_eq!(parse_kind("a ^ 2"), FilterErrorKind::Malformed);
    }

    #[test]
    fn deep_nesting_is_malformed() {
        let nested = |depth: usize| format!("{}a > 1{}", "(".repeat(depth), ")".repeat(depth));
        parse_ok(&nested(MAX_FILTER_DEPTH - 1));
        assert_eq!(parse_kind(&nested(MAX_FILTER_DEPTH + 1)), FilterErrorKind::Malformed);
        assert_eq!(parse_kind(&nested(20_000)), FilterErrorKind::Malformed);

        assert_eq!(parse_kind(&format!("{}a", "not ".repeat(5_000))), FilterErrorKind::Malformed);
        assert_eq!(parse_kind(&format!("{}1 > a", "-".repeat(5_000))), FilterErrorKind::Malformed);
        let chain = vec!["a"; 5_000].join(" + ");
        assert_eq!(parse_kind(&format!("{chain} > 1")), FilterErrorKind::Malformed);
    }

    #[test]
    fn depth_is_released_between_siblings() {
        // Each group stays shallow even though the groups together exceed the cap.
        let groups = vec!["((a > 1))"; MAX_FILTER_DEPTH / 2 + 8].join(" and ");
        parse_ok(&groups);
        let sums = vec!["(a + 1) * 2 > 3"; 8].join(" or ");
        parse_ok(&sums);
    }
}
