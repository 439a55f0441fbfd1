use dotchat::{EmptyTurnError, SessionError};
use thiserror::Error;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_USAGE: u8 = 2;

/// Invocation errors reported with [`EXIT_USAGE`].
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("--assume-yes and --assume-no are mutually exclusive")]
    ConflictingAssume,
    #[error("STDOUT must not be TTY when STDIN is TTY")]
    StdoutNotTerminal,
    #[error("Must use -y or -n when STDIN is not TTY")]
    MissingAssumeForPipe,
    #[error(transparent)]
    EmptyTurn(#[from] EmptyTurnError),
}

/// Routes admission failures to [`UsageError`]; every other session error stays fatal.
pub fn classify_session_error(error: SessionError) -> anyhow::Error {
    match error {
        SessionError::EmptyTurn(error) => UsageError::EmptyTurn(error).into(),
        other => other.into(),
    }
}

/// Exit status for an error returned from the pipeline.
#[must_use]
pub fn exit_code_for(error: &anyhow::Error) -> u8 {
    if error.downcast_ref::<UsageError>().is_some() {
        EXIT_USAGE
    } else {
        EXIT_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn usage_errors_exit_with_two_even_with_context() {
        let error = anyhow::Error::from(UsageError::ConflictingAssume).context("validating flags");
        assert_eq!(exit_code_for(&error), EXIT_USAGE);
    }

    #[test]
    fn empty_turns_are_usage_errors() {
        let error = classify_session_error(SessionError::EmptyTurn(EmptyTurnError::NoMessages));
        assert_eq!(exit_code_for(&error), EXIT_USAGE);
        assert!(error.to_string().contains("empty message"));
    }

    #[test]
    fn other_failures_exit_with_one() {
        let error: anyhow::Error = Err::<(), _>(std::io::Error::other("disk full"))
            .context("saving session")
            .expect_err("error expected");
        assert_eq!(exit_code_for(&error), EXIT_FAILURE);
    }
}
