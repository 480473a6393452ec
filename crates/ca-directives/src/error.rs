use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("unrecognized directive token(s): {}", .0.join(" "))]
    Unrecognized(Vec<String>),

    #[error("directive {flag} expects a value")]
    MissingValue { flag: String },

    #[error("invalid value '{value}' for {flag} (expected one of: {})", .expected.join(", "))]
    InvalidChoice {
        flag: String,
        value: String,
        expected: Vec<&'static str>,
    },

    #[error("no wire field mapping for parameter: {0}")]
    Mapping(String),

    #[error("invalid parameter registry: {0}")]
    Registry(String),
}

impl DirectiveError {
    /// Returns `true` for errors caused by the script text itself.
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            DirectiveError::Unrecognized(_)
                | DirectiveError::MissingValue { .. }
                | DirectiveError::InvalidChoice { .. }
        )
    }
}

pub type DirectiveResult<T> = Result<T, DirectiveError>;
