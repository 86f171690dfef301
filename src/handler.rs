use std::future::Future;
use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use lambda_runtime::Diagnostic;

use crate::context::InvocationContext;

/// What a handler hands back on success.
///
/// Only `payload` is required. The other two methods are optional
/// capabilities: a result that knows its media type overrides
/// `content_type`, and a result backed by an external resource (open file,
/// socket) exposes it through `releasable` so the loop can let go of it once
/// the payload has been sent.
pub trait HandlerResult: Send {
    fn payload(&mut self) -> Bytes;

    fn content_type(&self) -> Option<String> {
        None
    }

    fn releasable(&mut self) -> Option<&mut dyn Release> {
        None
    }
}

pub trait Release: Send {
    fn release(&mut self) -> io::Result<()>;
}

pub type BoxedResult = Box<dyn HandlerResult>;

impl HandlerResult for Bytes {
    fn payload(&mut self) -> Bytes {
        self.clone()
    }
}

impl HandlerResult for Vec<u8> {
    fn payload(&mut self) -> Bytes {
        Bytes::from(std::mem::take(self))
    }
}

impl HandlerResult for String {
    fn payload(&mut self) -> Bytes {
        Bytes::from(std::mem::take(self))
    }
}

// Serialized as-is; content type stays opaque unless wrapped in `Typed`.
impl HandlerResult for serde_json::Value {
    fn payload(&mut self) -> Bytes {
        Bytes::from(self.to_string())
    }
}

/// A payload with an explicit content type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Typed {
    pub body: Bytes,
    pub content_type: String,
}

impl Typed {
    pub fn new(body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
        }
    }

    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::new(body, crate::invoke::CONTENT_TYPE_JSON)
    }
}

impl HandlerResult for Typed {
    fn payload(&mut self) -> Bytes {
        self.body.clone()
    }

    fn content_type(&self) -> Option<String> {
        Some(self.content_type.clone())
    }
}

/// The uniform byte-in/byte-out shape user logic is adapted into.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, ctx: InvocationContext, payload: Bytes) -> Result<BoxedResult, Diagnostic>;
}

pub struct HandlerFn<F> {
    f: F,
}

/// Wraps an async function or closure as a [`Handler`].
pub fn handler_fn<F, Fut, R>(f: F) -> HandlerFn<F>
where
    F: Fn(InvocationContext, Bytes) -> Fut,
    Fut: Future<Output = Result<R, Diagnostic>>,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut, R> Handler for HandlerFn<F>
where
    F: Fn(InvocationContext, Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Diagnostic>> + Send,
    R: HandlerResult + 'static,
{
    async fn call(&self, ctx: InvocationContext, payload: Bytes) -> Result<BoxedResult, Diagnostic> {
        let result = (self.f)(ctx, payload).await?;
        Ok(Box::new(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_results_have_no_capabilities() {
        let mut value = serde_json::json!({"n": 2});
        assert_eq!(value.payload(), Bytes::from_static(br#"{"n":2}"#));
        assert_eq!(value.content_type(), None);
        assert!(value.releasable().is_none());

        let mut text = String::from("hello");
        assert_eq!(text.payload(), Bytes::from_static(b"hello"));
        assert!(text.content_type().is_none());
    }

    #[test]
    fn typed_exposes_its_content_type() {
        let mut typed = Typed::new("<p>hi</p>", "text/html");
        assert_eq!(typed.payload(), Bytes::from_static(b"<p>hi</p>"));
        assert_eq!(typed.content_type().as_deref(), Some("text/html"));
        assert_eq!(Typed::json("{}").content_type.as_str(), "application/json");
    }
}
