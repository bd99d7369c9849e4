use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    /// A collaborator (roster, marks, submission sink, snapshot writer) failed.
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt data: {0}")]
    Corrupt(String),
}

impl EngineError {
    /// Wire code used in IPC error responses.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::Invalid(_) => "bad_params",
            EngineError::Unavailable(_) => "unavailable",
            EngineError::Corrupt(_) => "corrupt",
        }
    }

    pub fn unavailable(e: anyhow::Error) -> Self {
        EngineError::Unavailable(format!("{e:#}"))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_ipc_vocabulary() {
        assert_eq!(EngineError::NotFound("x".into()).code(), "not_found");
        assert_eq!(EngineError::Invalid("x".into()).code(), "bad_params");
        assert_eq!(EngineError::Unavailable("x".into()).code(), "unavailable");
        assert_eq!(EngineError::Corrupt("x".into()).code(), "corrupt");
    }

    #[test]
    fn unavailable_keeps_context_chain() {
        let e = anyhow::anyhow!("socket closed").context("fetch roster");
        let mapped = EngineError::unavailable(e);
        assert_eq!(
            mapped,
            EngineError::Unavailable("fetch roster: socket closed".into())
        );
    }
}
