//! `WHERE` clause and trailing-modifier composition.
//!
//! Composition is positional and textual: predicates render in the order
//! given, and nothing is inserted between them. Callers place connectives
//! (`AND`, `OR`) explicitly between conditions; two conditions in a row
//! are rejected rather than joined with a guessed `AND`.
//!
//! ```text
//! [id = 5]                      ->  " WHERE  id = $1 "
//! [user_id = u, AND, is_read = f] ->  " WHERE  user_id = $1  AND  is_read = $2 "
//! [limit 10]                    ->  " limit 10 "
//! ```
//!
//! Values go through a [`ValueSink`]; identifiers, operators, connectives
//! and modifier tokens are spliced as text and are validated here.

use std::fmt;

use crate::value::{SqlValue, ValueSink};

/// Errors raised while composing a clause.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    /// A raw predicate had neither one nor three parts.
    #[error("predicate must have 1 or 3 parts, got {0}")]
    Arity(usize),

    /// Two conditions appeared with no `AND`/`OR` between them.
    #[error("missing connective before condition on `{0}`")]
    MissingConnective(String),

    /// A column name is not a plain identifier.
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    /// A comparison operator is not supported.
    #[error("unsupported operator `{0}`")]
    UnsupportedOperator(String),

    /// A connective fragment is not one of `AND`, `OR`, `NOT`, `(`, `)`.
    #[error("unsupported connective `{0}`")]
    UnsupportedConnective(String),

    /// A modifier token contains characters outside `[A-Za-z0-9_,.]`, or
    /// the modifier is empty.
    #[error("invalid modifier token `{0}`")]
    InvalidModifier(String),
}

// ---------------------------------------------------------------------------
// Operators and connectives
// ---------------------------------------------------------------------------

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `LIKE`
    Like,
}

impl Operator {
    /// SQL spelling of the operator.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
        }
    }

    /// Parse a raw operator token.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::UnsupportedOperator`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, ComposeError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "=" => Ok(Self::Eq),
            "!=" | "<>" => Ok(Self::NotEq),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "LIKE" => Ok(Self::Like),
            _ => Err(ComposeError::UnsupportedOperator(raw.to_owned())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Logical fragment placed between conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    /// `AND`
    And,
    /// `OR`
    Or,
    /// `NOT`
    Not,
    /// `(`
    Open,
    /// `)`
    Close,
}

impl Connective {
    /// SQL spelling of the fragment.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Open => "(",
            Self::Close => ")",
        }
    }

    /// Parse a raw fragment, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::UnsupportedConnective`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, ComposeError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            "NOT" => Ok(Self::Not),
            "(" => Ok(Self::Open),
            ")" => Ok(Self::Close),
            _ => Err(ComposeError::UnsupportedConnective(raw.to_owned())),
        }
    }

    /// Whether this fragment joins two conditions.
    const fn joins(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// One element of a `WHERE` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// A logical fragment inserted verbatim (the 1-part form).
    Connective(Connective),
    /// `column operator value` (the 3-part form).
    Condition {
        /// Column name.
        column: String,
        /// Comparison operator.
        operator: Operator,
        /// Compared value.
        value: SqlValue,
    },
}

impl Predicate {
    /// `column = value`.
    pub fn eq(column: &str, value: impl Into<SqlValue>) -> Self {
        Self::compare(column, Operator::Eq, value)
    }

    /// `column operator value`.
    pub fn compare(column: &str, operator: Operator, value: impl Into<SqlValue>) -> Self {
        Self::Condition {
            column: column.to_owned(),
            operator,
            value: value.into(),
        }
    }

    /// The `AND` connective.
    pub const fn and() -> Self {
        Self::Connective(Connective::And)
    }

    /// The `OR` connective.
    pub const fn or() -> Self {
        Self::Connective(Connective::Or)
    }

    /// Build a predicate from raw string parts.
    ///
    /// One part is a connective; three parts are `column operator value`
    /// with the value taken as text.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Arity`] for any other number of parts, or the
    /// parse error of the connective or operator.
    pub fn from_parts(parts: &[&str]) -> Result<Self, ComposeError> {
        match parts {
            [fragment] => Connective::parse(fragment).map(Self::Connective),
            [column, operator, value] => Ok(Self::compare(
                column,
                Operator::parse(operator)?,
                SqlValue::from(*value),
            )),
            _ => Err(ComposeError::Arity(parts.len())),
        }
    }
}

/// Join conditions with `AND`: `[a, AND, b, AND, c]`.
pub fn all_of(conditions: impl IntoIterator<Item = Predicate>) -> Vec<Predicate> {
    interleave(conditions, Predicate::and)
}

/// Join conditions with `OR`: `[a, OR, b, OR, c]`.
pub fn any_of(conditions: impl IntoIterator<Item = Predicate>) -> Vec<Predicate> {
    interleave(conditions, Predicate::or)
}

fn interleave(
    conditions: impl IntoIterator<Item = Predicate>,
    connective: fn() -> Predicate,
) -> Vec<Predicate> {
    let mut out = Vec::new();
    for condition in conditions {
        if !out.is_empty() {
            out.push(connective());
        }
        out.push(condition);
    }
    out
}

/// Render predicates as a `WHERE` clause.
///
/// Empty input renders nothing. Otherwise the clause is `" WHERE "`
/// followed by each predicate wrapped in single spaces.
///
/// # Errors
///
/// Returns [`ComposeError::MissingConnective`] when a condition directly
/// follows another condition, or [`ComposeError::InvalidIdentifier`] for a
/// column that is not a plain identifier.
pub fn compose_where<S: ValueSink>(
    predicates: &[Predicate],
    sink: &mut S,
) -> Result<String, ComposeError> {
    if predicates.is_empty() {
        return Ok(String::new());
    }

    let mut clause = String::from(" WHERE ");
    let mut after_condition = false;
    for predicate in predicates {
        match predicate {
            Predicate::Connective(connective) => {
                if connective.joins() {
                    after_condition = false;
                }
                clause.push_str(&format!(" {} ", connective.as_sql()));
            }
            Predicate::Condition {
                column,
                operator,
                value,
            } => {
                if after_condition {
                    return Err(ComposeError::MissingConnective(column.clone()));
                }
                validate_identifier(column)?;
                let placeholder = sink.placeholder(value.clone());
                clause.push_str(&format!(" {column} {operator} {placeholder} "));
                after_condition = true;
            }
        }
    }
    Ok(clause)
}

/// Check that `name` is a plain, optionally qualified, SQL identifier.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidIdentifier`] otherwise.
pub fn validate_identifier(name: &str) -> Result<(), ComposeError> {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if starts_well && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        Ok(())
    } else {
        Err(ComposeError::InvalidIdentifier(name.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Sort direction for [`Modifier::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A trailing clause such as `ORDER BY id DESC` or `LIMIT 10`, kept as its
/// space-separated tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    tokens: Vec<String>,
}

impl Modifier {
    /// Build a modifier from raw tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidModifier`] if there are no tokens or a
    /// token holds anything but ASCII letters, digits, `_`, `,` or `.`.
    pub fn new<I, T>(tokens: I) -> Result<Self, ComposeError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            return Err(ComposeError::InvalidModifier(String::new()));
        }
        if let Some(bad) = tokens.iter().find(|token| !is_modifier_token(token)) {
            return Err(ComposeError::InvalidModifier(bad.clone()));
        }
        Ok(Self { tokens })
    }

    /// `LIMIT n`.
    pub fn limit(n: u32) -> Self {
        Self {
            tokens: vec![String::from("LIMIT"), n.to_string()],
        }
    }

    /// `OFFSET n`.
    pub fn offset(n: u32) -> Self {
        Self {
            tokens: vec![String::from("OFFSET"), n.to_string()],
        }
    }

    /// `ORDER BY column direction`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidIdentifier`] if `column` is not a
    /// plain identifier.
    pub fn order_by(column: &str, direction: Direction) -> Result<Self, ComposeError> {
        validate_identifier(column)?;
        Ok(Self {
            tokens: vec![
                String::from("ORDER"),
                String::from("BY"),
                column.to_owned(),
                direction.as_sql().to_owned(),
            ],
        })
    }

    /// The tokens joined by single spaces.
    pub fn render(&self) -> String {
        self.tokens.join(" ")
    }
}

fn is_modifier_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ',' | '.'))
}

/// Render modifiers in order, each wrapped in single spaces.
///
/// Empty input renders nothing.
pub fn compose_modifiers(modifiers: &[Modifier]) -> String {
    modifiers
        .iter()
        .map(|modifier| format!(" {} ", modifier.render()))
        .collect()
}
