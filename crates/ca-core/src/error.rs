use ca_directives::DirectiveError;
use thiserror::Error;

/// Failure of one step of the agent pipeline.
///
/// The rendered message is what the job-management service receives as the
/// report message of a rejected or aborted submission.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid job script directives: {0}")]
    DirectiveParse(DirectiveError),

    #[error("could not map job parameters: {0}")]
    Mapping(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("job submission failed: {0}")]
    Submission(String),

    #[error("could not update job-management API: {0}")]
    ApiUpdate(String),

    #[error("could not fetch from job-management API: {0}")]
    Fetch(String),

    #[error("could not resolve username: {0}")]
    UserMapping(String),

    #[error("{0}")]
    Script(String),

    #[error("malformed job submission record: {0}")]
    MalformedRecord(String),

    #[error("could not stage job script files: {0}")]
    Staging(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<DirectiveError> for AgentError {
    fn from(e: DirectiveError) -> Self {
        if e.is_parse() {
            AgentError::DirectiveParse(e)
        } else {
            AgentError::Mapping(e.to_string())
        }
    }
}

pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_errors_split_into_parse_and_mapping() {
        let parse: AgentError = DirectiveError::Unrecognized(vec!["--x".into()]).into();
        assert!(matches!(parse, AgentError::DirectiveParse(_)));
        assert_eq!(
            parse.to_string(),
            "invalid job script directives: unrecognized directive token(s): --x"
        );

        let mapping: AgentError = DirectiveError::Mapping("foo".into()).into();
        assert!(matches!(mapping, AgentError::Mapping(_)));
    }
}
