//! Error types.
//!
//! Only JSON and template syntax errors are fatal to a render call. Expression
//! failures and unresolved references are reported through `tracing` and
//! degrade to empty output, so they never reach the caller.

/// Top-level error returned by the render entry points.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("JSON syntax error: {0}")]
    Json(#[from] JsonError),
    #[error("template syntax error: {0}")]
    Template(#[from] TemplateError),
    #[error("invalid input encoding: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at offset {offset}")]
pub struct JsonError {
    pub kind: JsonErrorKind,
    /// Byte offset into the JSON text.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JsonErrorKind {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("comments are not allowed")]
    CommentNotAllowed,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("invalid number")]
    InvalidNumber,
    #[error("invalid escape sequence")]
    InvalidEscape,
    #[error("invalid unicode escape")]
    InvalidUnicode,
    #[error("control character in string")]
    ControlCharacter,
    #[error("trailing characters after document")]
    TrailingCharacters,
    #[error("nesting too deep")]
    TooDeep,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at offset {offset}")]
pub struct TemplateError {
    pub kind: TemplateErrorKind,
    /// Byte offset of the offending tag in the template text.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateErrorKind {
    /// A tag opener without its closing `}` or `>`.
    #[error("unclosed tag `{0}`")]
    UnclosedTag(&'static str),
    /// A `<loop>` or `<if>` block without its end tag.
    #[error("missing end tag for `<{0}>`")]
    UnclosedBlock(&'static str),
    /// A closing or branch tag with no open block to attach to.
    #[error("unexpected `{0}`")]
    UnexpectedTag(&'static str),
    #[error("missing required attribute `{0}`")]
    MissingAttribute(&'static str),
    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),
    #[error("malformed attribute list")]
    MalformedAttribute,
    #[error("invalid variable path `{0}`")]
    InvalidPath(String),
    #[error("nesting too deep")]
    TooDeep,
}

/// Failure while evaluating a `math` body or a `case` attribute.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected `{0}` in expression")]
    Unexpected(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unbalanced parentheses")]
    Unbalanced,
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFinite,
    #[error("`{0}` is not a number")]
    NotANumber(String),
    #[error("cannot order `{0}` against `{1}`")]
    Incomparable(String, String),
    #[error("expression nesting too deep")]
    TooDeep,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_kind_and_offset() {
        let err = Error::from(JsonError {
            kind: JsonErrorKind::UnexpectedChar('x'),
            offset: 3,
        });
        assert_eq!(err.to_string(), "JSON syntax error: unexpected character 'x' at offset 3");

        let err = Error::from(TemplateError {
            kind: TemplateErrorKind::UnclosedBlock("loop"),
            offset: 0,
        });
        assert_eq!(err.to_string(), "template syntax error: missing end tag for `<loop>` at offset 0");
    }
}
