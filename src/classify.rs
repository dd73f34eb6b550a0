//! Best-effort statement kind detection.
//!
//! Classification is advisory: results are only used to label result sets,
//! never to decide what runs. Any failure degrades to an empty sequence.

use serde::Serialize;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, TokenizerError};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Command type of one SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    Other,
    Unknown,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Create => "CREATE",
            StatementKind::Drop => "DROP",
            StatementKind::Alter => "ALTER",
            StatementKind::Other => "OTHER",
            StatementKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("failed to tokenize sql: {0}")]
    Tokenize(#[from] TokenizerError),
}

/// Splits SQL text into statements and tags each with its kind.
pub trait StatementClassifier: Send + Sync {
    fn classify(&self, sql: &str) -> Result<Vec<StatementKind>, ClassifyError>;
}

/// Default classifier: tags statements by their leading keyword.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl StatementClassifier for KeywordClassifier {
    fn classify(&self, sql: &str) -> Result<Vec<StatementKind>, ClassifyError> {
        let dialect = SQLiteDialect {};
        let tokens = Tokenizer::new(&dialect, sql).tokenize()?;
        Ok(split_statements(tokens)
            .iter()
            .map(|statement| statement_kind(statement))
            .collect())
    }
}

/// Classifies `sql`, returning an empty sequence when the classifier fails.
pub fn identify_commands(classifier: &dyn StatementClassifier, sql: &str) -> Vec<StatementKind> {
    match classifier.classify(sql) {
        Ok(commands) => commands,
        Err(err) => {
            debug!(error = %err, "sqlite.classify.failed");
            Vec::new()
        }
    }
}

/// Groups significant tokens into statements on top-level semicolons.
/// Trigger bodies (`BEGIN ... END`) stay inside their statement.
fn split_statements(tokens: Vec<Token>) -> Vec<Vec<Token>> {
    let mut statements = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut block_depth = 0usize;

    for token in tokens {
        match &token {
            Token::Whitespace(_) => continue,
            Token::SemiColon if block_depth == 0 => {
                if !current.is_empty() {
                    statements.push(std::mem::take(&mut current));
                }
                continue;
            }
            Token::Word(word) => match word.keyword {
                Keyword::BEGIN if is_trigger(&current) => block_depth += 1,
                Keyword::CASE if block_depth > 0 => block_depth += 1,
                Keyword::END if block_depth > 0 => block_depth -= 1,
                _ => {}
            },
            _ => {}
        }
        current.push(token);
    }

    if !current.is_empty() {
        statements.push(current);
    }
    statements
}

fn keywords(tokens: &[Token]) -> impl Iterator<Item = Keyword> + '_ {
    tokens.iter().filter_map(|token| match token {
        Token::Word(word) => Some(word.keyword),
        _ => None,
    })
}

fn is_trigger(tokens: &[Token]) -> bool {
    let mut words = keywords(tokens);
    words.next() == Some(Keyword::CREATE) && words.any(|k| k == Keyword::TRIGGER)
}

fn statement_kind(tokens: &[Token]) -> StatementKind {
    match keywords(tokens).next() {
        Some(Keyword::SELECT | Keyword::VALUES) => StatementKind::Select,
        Some(Keyword::INSERT | Keyword::REPLACE) => StatementKind::Insert,
        Some(Keyword::UPDATE) => StatementKind::Update,
        Some(Keyword::DELETE) => StatementKind::Delete,
        Some(Keyword::CREATE) => StatementKind::Create,
        Some(Keyword::DROP) => StatementKind::Drop,
        Some(Keyword::ALTER) => StatementKind::Alter,
        Some(Keyword::WITH) => common_table_target(tokens),
        Some(Keyword::NoKeyword) | None => StatementKind::Unknown,
        Some(_) => StatementKind::Other,
    }
}

/// Kind of the statement a `WITH` clause feeds: the first data keyword at
/// parenthesis depth zero.
fn common_table_target(tokens: &[Token]) -> StatementKind {
    let mut depth = 0usize;
    for token in tokens {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Word(word) if depth == 0 => match word.keyword {
                Keyword::SELECT | Keyword::VALUES => return StatementKind::Select,
                Keyword::INSERT | Keyword::REPLACE => return StatementKind::Insert,
                Keyword::UPDATE => return StatementKind::Update,
                Keyword::DELETE => return StatementKind::Delete,
                _ => {}
            },
            _ => {}
        }
    }
    StatementKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use StatementKind::*;

    fn classify(sql: &str) -> Vec<StatementKind> {
        identify_commands(&KeywordClassifier, sql)
    }

    #[test]
    fn one_kind_per_statement_in_order() {
        let sql = "select * from a; insert into a values (1); update a set x = 2; \
                   delete from a; create table b (id int); alter table b add c int; drop table b";
        assert_eq!(
            classify(sql),
            vec![Select, Insert, Update, Delete, Create, Alter, Drop]
        );
    }

    #[test]
    fn blank_statements_are_skipped() {
        assert_eq!(classify(" ; select 1;; -- trailing\n"), vec![Select]);
        assert!(classify("").is_empty());
    }

    #[test]
    fn with_clause_resolves_to_its_target() {
        assert_eq!(
            classify("WITH t(x) AS (SELECT 1) DELETE FROM a WHERE id IN (SELECT x FROM t)"),
            vec![Delete]
        );
        assert_eq!(classify("WITH t AS (DELETE FROM a) SELECT 1"), vec![Select]);
    }

    #[test]
    fn trigger_bodies_stay_in_one_statement() {
        let sql = "CREATE TRIGGER trg AFTER INSERT ON a BEGIN \
                     UPDATE a SET x = CASE WHEN x > 1 THEN 1 ELSE 0 END; \
                     DELETE FROM b; \
                   END; SELECT 1";
        assert_eq!(classify(sql), vec![Create, Select]);
    }

    #[test]
    fn other_and_unknown_statements() {
        assert_eq!(
            classify("PRAGMA table_info('a'); BEGIN; selct 1; REPLACE INTO a VALUES (1)"),
            vec![Other, Other, Unknown, Insert]
        );
    }

    #[test]
    fn tokenizer_failure_yields_empty_sequence() {
        assert!(classify("select 'unterminated").is_empty());
    }

    #[test]
    fn kinds_render_uppercase() {
        assert_eq!(Select.to_string(), "SELECT");
        assert_eq!(serde_json::to_string(&Other).unwrap(), r#""OTHER""#);
    }
}
