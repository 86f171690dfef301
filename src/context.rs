use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::SystemTime;

use serde::Deserialize;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::config::FunctionConfig;
use crate::error::ContextError;
use crate::invoke::{
    Invoke, HEADER_CLIENT_CONTEXT, HEADER_COGNITO_IDENTITY, HEADER_DEADLINE_MS,
    HEADER_INVOKED_FUNCTION_ARN, HEADER_TRACE_ID,
};
use crate::signal::PostInvokeSignal;
use crate::time::{deadline_instant, unix_millis};

/// Process-wide variable read by tracing instrumentation.
pub const TRACE_ID_ENV: &str = "_X_AMZN_TRACE_ID";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientApplication {
    pub installation_id: String,
    pub app_title: String,
    pub app_version_code: String,
    pub app_package_name: String,
}

/// Client-supplied metadata forwarded by mobile SDK callers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientContext {
    pub client: ClientApplication,
    pub env: HashMap<String, String>,
    pub custom: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CognitoIdentity {
    #[serde(rename = "cognitoIdentityId")]
    pub identity_id: String,
    #[serde(rename = "cognitoIdentityPoolId")]
    pub identity_pool_id: String,
}

/// State shared by every invoke a loop processes.
#[derive(Clone, Debug, Default)]
pub struct BaseContext {
    pub env_config: Arc<FunctionConfig>,
    /// Parent of every per-invoke token; cancelling it cancels the invoke in flight.
    pub cancel: CancellationToken,
    pub post_invoke: Option<PostInvokeSignal>,
}

impl BaseContext {
    pub fn new(env_config: FunctionConfig) -> Self {
        Self {
            env_config: Arc::new(env_config),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::new(FunctionConfig::from_env())
    }

    pub fn with_post_invoke_signal(mut self, signal: PostInvokeSignal) -> Self {
        self.post_invoke = Some(signal);
        self
    }
}

/// Everything handler code gets to know about the invoke it is serving.
#[derive(Clone, Debug)]
pub struct InvocationContext {
    pub request_id: String,
    pub invoked_function_arn: String,
    pub client_context: ClientContext,
    pub identity: CognitoIdentity,
    pub deadline: SystemTime,
    pub xray_trace_id: String,
    pub env_config: Arc<FunctionConfig>,
    cancel: CancellationToken,
    post_invoke: Option<PostInvokeSignal>,
}

impl InvocationContext {
    /// Token cancelled at the deadline, or when the invoke finishes.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn post_invoke_signal(&self) -> Option<&PostInvokeSignal> {
        self.post_invoke.as_ref()
    }
}

/// Builds the per-invoke context from protocol headers.
///
/// The returned guard cancels the context when dropped; the caller keeps it
/// alive until the invoke has been reported. Must run inside a tokio runtime,
/// since the deadline timer is a spawned task.
pub fn build_context(
    invoke: &Invoke,
    base: &BaseContext,
) -> Result<(InvocationContext, DropGuard), ContextError> {
    let deadline_ms = invoke.header(HEADER_DEADLINE_MS).parse::<i64>()?;
    let deadline = unix_millis(deadline_ms);

    let client_context: ClientContext =
        parse_optional_json(invoke.header(HEADER_CLIENT_CONTEXT)).map_err(ContextError::ClientContext)?;
    let identity: CognitoIdentity = parse_optional_json(invoke.header(HEADER_COGNITO_IDENTITY))
        .map_err(ContextError::CognitoIdentity)?;

    let cancel = base.cancel.child_token();
    spawn_deadline_timer(cancel.clone(), deadline);

    let xray_trace_id = invoke.header(HEADER_TRACE_ID).to_string();
    set_ambient_trace_id(&xray_trace_id);

    let ctx = InvocationContext {
        request_id: invoke.id.clone(),
        invoked_function_arn: invoke.header(HEADER_INVOKED_FUNCTION_ARN).to_string(),
        client_context,
        identity,
        deadline,
        xray_trace_id,
        env_config: Arc::clone(&base.env_config),
        cancel: cancel.clone(),
        post_invoke: base.post_invoke.clone(),
    };
    Ok((ctx, cancel.drop_guard()))
}

// An absent header is the zero value; a present one must be valid JSON.
fn parse_optional_json<T>(raw: &str) -> Result<T, serde_json::Error>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if raw.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(raw)
}

fn spawn_deadline_timer(cancel: CancellationToken, deadline: SystemTime) {
    let at = deadline_instant(deadline);
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep_until(at) => cancel.cancel(),
            _ = cancel.cancelled() => {}
        }
    });
}

// Compatibility shim for instrumentation that only reads the environment.
// Overwritten once per invoke, so it is only meaningful while a single
// invoke runs at a time.
fn set_ambient_trace_id(trace_id: &str) {
    env::set_var(TRACE_ID_ENV, trace_id);
}
