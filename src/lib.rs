//! Invoke-processing core of a Lambda-style runtime.
//!
//! [`Runtime`] fetches invokes from a [`RuntimeApiClient`], builds an
//! [`InvocationContext`] for each one, runs the [`Handler`] behind a panic
//! boundary, and reports exactly one success or failure per invoke.
//! Failures carry an X-Ray cause document alongside the error payload.

mod config;
mod context;
mod crash;
mod error;
mod failure;
mod handler;
mod invoke;
mod response;
mod runtime;
mod signal;
mod time;

#[cfg(test)]
mod testing;

pub use config::FunctionConfig;
pub use context::{
    build_context, BaseContext, ClientApplication, ClientContext, CognitoIdentity, InvocationContext,
    TRACE_ID_ENV,
};
pub use crash::call_handler;
pub use error::{
    ContextError, InvokeError, RuntimeError, StackFrame, HANDLER_PANIC_ERROR_TYPE, SERIALIZATION_ERROR_TYPE,
};
pub use failure::{make_xray_error, report_failure, safe_marshal, XRayError, XRayException};
pub use handler::{handler_fn, BoxedResult, Handler, HandlerFn, HandlerResult, Release, Typed};
pub use invoke::{
    Invoke, RuntimeApiClient, CONTENT_TYPE_BYTES, CONTENT_TYPE_JSON, HEADER_CLIENT_CONTEXT,
    HEADER_COGNITO_IDENTITY, HEADER_DEADLINE_MS, HEADER_INVOKED_FUNCTION_ARN, HEADER_REQUEST_ID,
    HEADER_TRACE_ID,
};
pub use response::{negotiate, Negotiated};
pub use runtime::{start_runtime_loop, Runtime};
pub use signal::{PostInvokeSignal, WaitOutcome, POST_INVOKE_WAIT};
pub use time::unix_millis;

pub use lambda_runtime::{Diagnostic, Error};
