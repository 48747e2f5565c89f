use thiserror::Error;

/// Errors raised while rewriting named parameters into positional placeholders
///
/// All of these are detected before any statement is executed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterParseError {
    #[error("Parameter :{name} referenced at offset {offset} has no bound value")]
    MissingParameter { name: String, offset: usize },

    #[error("Invalid parameter name: {0} (must start with a letter, then letters, digits or underscore)")]
    InvalidParameterName(String),

    #[error("Parameter {name} supplied more than once")]
    DuplicateParameter { name: String },

    #[error("Parameter :{name} is bound to an empty list")]
    EmptyList { name: String },

    #[error("Unterminated {quote} literal starting at offset {offset}")]
    UnterminatedLiteral { quote: char, offset: usize },

    #[error("Unterminated block comment starting at offset {offset}")]
    UnterminatedComment { offset: usize },

    #[error("Parameter :{name} expects {expected} values in every batch iteration, got {found}")]
    ReplaceCountMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}
