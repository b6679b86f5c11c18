//! Static validation of restricted query statements.
//!
//! Statements are checked token by token before any engine sees them. Only a
//! single `SELECT` over catalog tables passes; everything that could write,
//! define, reach the network or run user code is rejected.

use serde::Serialize;

use super::QueryError;

const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "UPSERT", "DELETE", "DROP", "CREATE", "ALTER", "DEFINE", "REMOVE",
    "RELATE", "LET", "BEGIN", "COMMIT", "CANCEL", "KILL", "LIVE", "USE", "INFO", "SLEEP",
    "THROW", "REBUILD", "OPTION", "FUNCTION",
];

const FORBIDDEN_NAMESPACES: &[&str] = &["http", "fn"];

/// A statement that passed validation, ready to be wrapped by an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedStatement {
    /// Statement text without surrounding whitespace or a trailing `;`.
    pub statement: String,
    /// Tables named after `FROM`, in first-use order.
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
    Semicolon,
    Comma,
    Open(char),
    Close(char),
    PathSep,
    Other,
}

/// Tokens of a statement plus the byte offset of its terminating `;`.
struct Lexed {
    tokens: Vec<Token>,
    terminator: Option<usize>,
}

/// Validates a statement against the read-only rules and the known tables.
///
/// # Errors
/// Returns `Malformed` for empty, unterminated or unbalanced input, `Forbidden` for
/// anything other than a single `SELECT` free of write/define keywords and
/// network or user-function namespaces, and `TableNotFound` when a `FROM`
/// clause names a table outside `known_tables`.
pub fn validate_statement(
    text: &str,
    known_tables: &[String],
) -> Result<ValidatedStatement, QueryError> {
    let Lexed { tokens, terminator } = tokenize(text)?;
    let Some(first) = tokens.first() else {
        return Err(QueryError::Malformed("query is empty".to_string()));
    };
    if !matches!(first, Token::Word(word) if word.eq_ignore_ascii_case("SELECT")) {
        return Err(QueryError::Forbidden(
            "only SELECT statements are allowed".to_string(),
        ));
    }

    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Word(word) => {
                if let Some(keyword) = FORBIDDEN_KEYWORDS
                    .iter()
                    .find(|keyword| word.eq_ignore_ascii_case(keyword))
                {
                    return Err(QueryError::Forbidden(format!(
                        "`{keyword}` is not allowed in read-only queries"
                    )));
                }
                let is_namespace = tokens.get(index + 1) == Some(&Token::PathSep);
                if is_namespace
                    && FORBIDDEN_NAMESPACES
                        .iter()
                        .any(|namespace| word.eq_ignore_ascii_case(namespace))
                {
                    return Err(QueryError::Forbidden(format!(
                        "`{word}::` functions are not allowed"
                    )));
                }
            }
            Token::Semicolon if index + 1 < tokens.len() => {
                return Err(QueryError::Forbidden(
                    "only a single statement is allowed".to_string(),
                ));
            }
            _ => {}
        }
    }

    check_balanced(&tokens)?;

    let tables = referenced_tables(&tokens);
    if let Some(missing) = tables.iter().find(|table| !known_tables.contains(table)) {
        return Err(QueryError::TableNotFound(missing.clone()));
    }

    let body = terminator.map_or(text, |end| &text[..end]);
    let statement = body.trim().to_string();
    Ok(ValidatedStatement { statement, tables })
}

/// Brackets, braces and parentheses must pair up in order. A statement that
/// closes more than it opens could end an enclosing subquery early.
fn check_balanced(tokens: &[Token]) -> Result<(), QueryError> {
    let mut open: Vec<char> = Vec::new();
    for token in tokens {
        match token {
            Token::Open(ch) => open.push(*ch),
            Token::Close(ch) => {
                let expected = match ch {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if open.pop() != Some(expected) {
                    return Err(QueryError::Malformed(format!("unbalanced `{ch}`")));
                }
            }
            _ => {}
        }
    }
    match open.last() {
        Some(ch) => Err(QueryError::Malformed(format!("unclosed `{ch}`"))),
        None => Ok(()),
    }
}

/// Table names following each `FROM`, including comma-separated lists.
fn referenced_tables(tokens: &[Token]) -> Vec<String> {
    let mut tables: Vec<String> = Vec::new();
    let mut index = 0;
    while index < tokens.len() {
        let is_from = matches!(&tokens[index], Token::Word(word) if word.eq_ignore_ascii_case("FROM"));
        index += 1;
        if !is_from {
            continue;
        }
        if matches!(tokens.get(index), Some(Token::Word(word)) if word.eq_ignore_ascii_case("ONLY"))
        {
            index += 1;
        }
        loop {
            let name = match tokens.get(index) {
                Some(Token::Word(name) | Token::Quoted(name)) => name.clone(),
                _ => break,
            };
            if !tables.contains(&name) {
                tables.push(name);
            }
            index += 1;
            // Skip a record id suffix such as `sales:3`.
            while matches!(tokens.get(index), Some(Token::Other)) {
                index += 1;
                if matches!(tokens.get(index), Some(Token::Word(_))) {
                    index += 1;
                }
            }
            if tokens.get(index) != Some(&Token::Comma) {
                break;
            }
            index += 1;
        }
    }
    tables
}

fn tokenize(text: &str) -> Result<Lexed, QueryError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut terminator = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match (c, next) {
            (c, _) if c.is_whitespace() => i += 1,
            ('-', Some('-')) | ('/', Some('/')) | ('#', _) => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            ('/', Some('*')) => {
                let end = (i + 2..chars.len().saturating_sub(1))
                    .find(|&at| chars[at] == '*' && chars[at + 1] == '/')
                    .ok_or_else(|| QueryError::Malformed("unterminated comment".to_string()))?;
                i = end + 2;
            }
            ('\'' | '"', _) => {
                let (_, width) = quoted(&chars[i..], c)?;
                tokens.push(Token::Other);
                i += width;
            }
            ('`', _) => {
                let (name, width) = quoted(&chars[i..], '`')?;
                tokens.push(Token::Quoted(name));
                i += width;
            }
            ('⟨', _) => {
                let (name, width) = quoted(&chars[i..], '⟩')?;
                tokens.push(Token::Quoted(name));
                i += width;
            }
            (':', Some(':')) => {
                tokens.push(Token::PathSep);
                i += 2;
            }
            (';', _) => {
                if terminator.is_none() {
                    terminator = Some(chars[..i].iter().map(|ch| ch.len_utf8()).sum());
                }
                tokens.push(Token::Semicolon);
                i += 1;
            }
            (',', _) => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ('(' | '[' | '{', _) => {
                tokens.push(Token::Open(c));
                i += 1;
            }
            (')' | ']' | '}', _) => {
                tokens.push(Token::Close(c));
                i += 1;
            }
            (c, _) if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
            _ => {
                tokens.push(Token::Other);
                i += 1;
            }
        }
    }
    Ok(Lexed { tokens, terminator })
}

/// Reads a delimited literal starting at `chars[0]`; returns its contents and
/// width. `close` ends the literal; backslash escapes the next character.
fn quoted(chars: &[char], close: char) -> Result<(String, usize), QueryError> {
    let mut value = String::new();
    let mut i = 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                value.push(chars[i + 1]);
                i += 2;
            }
            c if c == close => return Ok((value, i + 1)),
            c => {
                value.push(c);
                i += 1;
            }
        }
    }
    Err(QueryError::Malformed("unterminated literal".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryErrorKind;

    fn known() -> Vec<String> {
        vec!["sales".to_string(), "people".to_string()]
    }

    fn kind(text: &str) -> QueryErrorKind {
        validate_statement(text, &known())
            .expect_err("statement should be rejected")
            .kind()
    }

    #[test]
    fn accepts_plain_select() {
        let validated = validate_statement(
            "SELECT region, math::sum(amount) AS total FROM sales GROUP BY region;",
            &known(),
        )
        .expect("select should pass");
        assert_eq!(validated.tables, vec!["sales".to_string()]);
        assert!(!validated.statement.ends_with(';'));
    }

    #[test]
    fn collects_every_from_target() {
        let validated = validate_statement(
            "select * from sales, `people` where amount > (SELECT VALUE 1 FROM ONLY sales:1)",
            &known(),
        )
        .expect("select should pass");
        assert_eq!(
            validated.tables,
            vec!["sales".to_string(), "people".to_string()]
        );
    }

    #[test]
    fn rejects_writes_and_definitions() {
        assert_eq!(kind("DELETE sales"), QueryErrorKind::Forbidden);
        assert_eq!(kind("SELECT * FROM sales; DELETE sales"), QueryErrorKind::Forbidden);
        assert_eq!(
            kind("SELECT * FROM (UPDATE sales SET amount = 0)"),
            QueryErrorKind::Forbidden
        );
        assert_eq!(kind("INFO FOR DB"), QueryErrorKind::Forbidden);
        assert_eq!(kind("LET $x = 1"), QueryErrorKind::Forbidden);
    }

    #[test]
    fn rejects_network_and_custom_functions() {
        assert_eq!(
            kind("SELECT http::get('http://example.com') FROM sales"),
            QueryErrorKind::Forbidden
        );
        assert_eq!(kind("SELECT fn::leak() FROM sales"), QueryErrorKind::Forbidden);
        assert_eq!(
            kind("SELECT function() { return 1; } FROM sales"),
            QueryErrorKind::Forbidden
        );
    }

    #[test]
    fn unbalanced_delimiters_are_malformed() {
        assert_eq!(kind("SELECT * FROM sales) LIMIT 1000 --"), QueryErrorKind::Malformed);
        assert_eq!(kind("SELECT * FROM sales WHERE (amount > 1"), QueryErrorKind::Malformed);
        assert_eq!(kind("SELECT [1, 2) FROM sales"), QueryErrorKind::Malformed);
        validate_statement("SELECT * FROM sales WHERE region = ')' /* ( */", &known())
            .expect("delimiters inside literals and comments are inert");
    }

    #[test]
    fn statement_ends_at_its_terminator() {
        let validated = validate_statement("SELECT * FROM sales; -- trailing note", &known())
            .expect("a comment may follow the terminator");
        assert_eq!(validated.statement, "SELECT * FROM sales");

        let validated = validate_statement("SELECT '測定;' AS label FROM sales;", &known())
            .expect("semicolons inside literals are inert");
        assert_eq!(validated.statement, "SELECT '測定;' AS label FROM sales");
    }

    #[test]
    fn keywords_inside_literals_are_ignored() {
        let validated = validate_statement(
            "SELECT * FROM sales WHERE region = 'DELETE; DROP' -- remove later",
            &known(),
        )
        .expect("literal contents are inert");
        assert_eq!(validated.tables, vec!["sales".to_string()]);
    }

    #[test]
    fn unknown_tables_are_not_found() {
        assert_eq!(kind("SELECT * FROM orders"), QueryErrorKind::NotFound);
        assert_eq!(
            kind("SELECT * FROM _tabular_catalog"),
            QueryErrorKind::NotFound
        );
        assert_eq!(
            kind("SELECT * FROM type::table('people')"),
            QueryErrorKind::NotFound
        );
    }

    #[test]
    fn empty_and_unterminated_input_is_malformed() {
        assert_eq!(kind("   "), QueryErrorKind::Malformed);
        assert_eq!(kind("-- just a comment"), QueryErrorKind::Malformed);
        assert_eq!(kind("SELECT * FROM sales WHERE region = 'north"), QueryErrorKind::Malformed);
        assert_eq!(kind("SELECT * FROM sales /* open"), QueryErrorKind::Malformed);
    }
}
