use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use lambda_runtime::Error;

pub const HEADER_REQUEST_ID: &str = "lambda-runtime-aws-request-id";
pub const HEADER_DEADLINE_MS: &str = "lambda-runtime-deadline-ms";
pub const HEADER_INVOKED_FUNCTION_ARN: &str = "lambda-runtime-invoked-function-arn";
pub const HEADER_CLIENT_CONTEXT: &str = "lambda-runtime-client-context";
pub const HEADER_COGNITO_IDENTITY: &str = "lambda-runtime-cognito-identity";
pub const HEADER_TRACE_ID: &str = "lambda-runtime-trace-id";

pub const CONTENT_TYPE_BYTES: &str = "application/octet-stream";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// One unit of work handed out by the Runtime API.
#[derive(Clone, Debug)]
pub struct Invoke {
    pub id: String,
    pub headers: HeaderMap,
    pub payload: Bytes,
}

impl Invoke {
    pub fn new(id: impl Into<String>, headers: HeaderMap, payload: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            headers,
            payload: payload.into(),
        }
    }

    /// Case-insensitive header lookup. Absent or non-UTF-8 values read as "".
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
    }
}

/// The control-plane client the invoke loop drives.
///
/// Every error returned here is treated as non-recoverable by the loop.
#[async_trait]
pub trait RuntimeApiClient: Send + Sync {
    /// Blocks until the next invoke is available.
    async fn next(&self) -> Result<Invoke, Error>;

    async fn success(&self, invoke: &Invoke, payload: Bytes, content_type: &str) -> Result<(), Error>;

    /// Reports a failed invoke. `xray_cause` is the serialized trace error document.
    async fn failure(
        &self,
        invoke: &Invoke,
        payload: Bytes,
        content_type: &str,
        xray_cause: Bytes,
    ) -> Result<(), Error>;
}
