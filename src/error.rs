use lambda_runtime::Diagnostic;
use serde::Serialize;
use thiserror::Error;

pub const SERIALIZATION_ERROR_TYPE: &str = "Runtime.SerializationError";
pub const HANDLER_PANIC_ERROR_TYPE: &str = "Runtime.HandlerPanic";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub path: String,
    pub line: i32,
    pub label: String,
}

/// A failed invoke, in the shape the Runtime API expects on the wire.
///
/// `fatal` never reaches the wire; it tells the loop to stop once the failure
/// has been reported.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvokeError {
    #[serde(rename = "errorType")]
    pub error_type: String,
    #[serde(rename = "errorMessage")]
    pub message: String,
    #[serde(rename = "stackTrace")]
    pub stack_trace: Vec<StackFrame>,
    #[serde(skip)]
    pub fatal: bool,
}

impl InvokeError {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            stack_trace: Vec::new(),
            fatal: false,
        }
    }

    pub(crate) fn panic(message: impl Into<String>, stack_trace: Vec<StackFrame>) -> Self {
        Self {
            error_type: HANDLER_PANIC_ERROR_TYPE.to_string(),
            message: message.into(),
            stack_trace,
            fatal: true,
        }
    }
}

impl From<Diagnostic> for InvokeError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::new(diagnostic.error_type, diagnostic.error_message)
    }
}

impl From<ContextError> for InvokeError {
    fn from(err: ContextError) -> Self {
        Self::new(err.error_type(), err.to_string())
    }
}

/// Malformed invoke metadata. Always reported back, never fatal.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to parse deadline: {0}")]
    Deadline(#[from] std::num::ParseIntError),
    #[error("failed to unmarshal client context json: {0}")]
    ClientContext(#[source] serde_json::Error),
    #[error("failed to unmarshal cognito identity json: {0}")]
    CognitoIdentity(#[source] serde_json::Error),
}

impl ContextError {
    pub fn error_type(&self) -> &'static str {
        match self {
            ContextError::Deadline(_) => "Runtime.InvalidDeadline",
            ContextError::ClientContext(_) => "Runtime.InvalidClientContext",
            ContextError::CognitoIdentity(_) => "Runtime.InvalidCognitoIdentity",
        }
    }
}

/// Errors that end the invoke loop.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to fetch the next invoke: {0}")]
    Next(lambda_runtime::Error),
    #[error("unexpected error occurred when sending the function response to the API: {0}")]
    SendResponse(lambda_runtime::Error),
    #[error("unexpected error occurred when sending the function error to the API: {0}")]
    SendFailure(lambda_runtime::Error),
    #[error("unexpected error occurred when serializing the function error cause for X-Ray: {0}")]
    XRayCause(#[source] serde_json::Error),
    #[error("calling the handler function resulted in a panic, the process should exit")]
    HandlerPanicked,
}
