//! Expression evaluation errors

/// Failure reported by a security service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityError {
    /// Backend could not be reached
    #[error("security service unavailable: {0}")]
    Unavailable(String),
}

/// Expression evaluation error
///
/// Cloneable so that errors raised inside model callbacks can be recovered
/// from the scripting runtime's error chain.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    /// Expression does not parse
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Expression raised a runtime error
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// Binding rejected by the sandbox
    #[error("sandbox violation: {0}")]
    SandboxViolation(String),

    /// Instruction or memory limit exceeded
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// Model method called with an unusable argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Current user is unknown to the security service
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// Security service lookup failed
    #[error("security lookup failed: {0}")]
    Security(#[from] SecurityError),

    /// Scripting runtime could not be set up
    #[error("scripting runtime error: {0}")]
    Runtime(String),
}

impl ExprError {
    /// Map a scripting error, recovering errors raised by model callbacks
    #[must_use]
    pub fn from_lua(error: &mlua::Error) -> Self {
        match error {
            mlua::Error::SyntaxError { message, .. } => Self::Syntax(message.clone()),
            mlua::Error::MemoryError(message) => Self::ResourceLimit(message.clone()),
            _ => raised_by_model(error).unwrap_or_else(|| Self::Evaluation(error.to_string())),
        }
    }
}

fn raised_by_model(error: &mlua::Error) -> Option<ExprError> {
    match error {
        mlua::Error::CallbackError { cause, .. } | mlua::Error::WithContext { cause, .. } => {
            raised_by_model(cause)
        }
        mlua::Error::ExternalError(inner) => inner.downcast_ref::<ExprError>().cloned(),
        _ => None,
    }
}
