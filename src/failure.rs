use std::collections::HashSet;
use std::env;

use bytes::Bytes;
use serde::Serialize;

use crate::error::{InvokeError, RuntimeError, StackFrame, SERIALIZATION_ERROR_TYPE};
use crate::invoke::{Invoke, RuntimeApiClient, CONTENT_TYPE_JSON};

/// Serializes `value`, falling back to a fixed-shape serialization error
/// payload when that fails. The result is always valid JSON.
pub fn safe_marshal<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    match serde_json::to_vec(value) {
        Ok(payload) => payload,
        Err(err) => serde_json::json!({
            "errorType": SERIALIZATION_ERROR_TYPE,
            "errorMessage": err.to_string(),
            "stackTrace": [],
        })
        .to_string()
        .into_bytes(),
    }
}

#[derive(Debug, Serialize)]
pub struct XRayException<'a> {
    #[serde(rename = "type")]
    pub error_type: &'a str,
    pub message: &'a str,
    pub stack: &'a [StackFrame],
}

/// Error cause document attached to failure reports for X-Ray.
#[derive(Debug, Serialize)]
pub struct XRayError<'a> {
    pub working_directory: String,
    pub exceptions: Vec<XRayException<'a>>,
    pub paths: Vec<&'a str>,
}

pub fn make_xray_error(invoke_err: &InvokeError) -> XRayError<'_> {
    let mut seen = HashSet::with_capacity(invoke_err.stack_trace.len());
    let paths = invoke_err
        .stack_trace
        .iter()
        .map(|frame| frame.path.as_str())
        .filter(|path| seen.insert(*path))
        .collect();

    let working_directory = env::current_dir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default();

    XRayError {
        working_directory,
        exceptions: vec![XRayException {
            error_type: &invoke_err.error_type,
            message: &invoke_err.message,
            stack: &invoke_err.stack_trace,
        }],
        paths,
    }
}

/// Logs and transmits a failed invoke together with its X-Ray cause.
pub async fn report_failure<C>(client: &C, invoke: &Invoke, invoke_err: &InvokeError) -> Result<(), RuntimeError>
where
    C: RuntimeApiClient + ?Sized,
{
    let payload = safe_marshal(invoke_err);
    tracing::error!(request_id = %invoke.id, "{}", String::from_utf8_lossy(&payload));

    let cause = serde_json::to_vec(&make_xray_error(invoke_err)).map_err(RuntimeError::XRayCause)?;

    client
        .failure(invoke, Bytes::from(payload), CONTENT_TYPE_JSON, Bytes::from(cause))
        .await
        .map_err(RuntimeError::SendFailure)
}
