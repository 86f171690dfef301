use bytes::Bytes;

use crate::handler::BoxedResult;
use crate::invoke::CONTENT_TYPE_BYTES;

/// A handler result ready to be transmitted.
///
/// Holds on to the original result so that a releasable one is released when
/// this value is dropped, i.e. after the payload has been handed off, on
/// every path out of the transmit step.
pub struct Negotiated {
    pub payload: Bytes,
    pub content_type: String,
    result: BoxedResult,
}

pub fn negotiate(mut result: BoxedResult) -> Negotiated {
    let content_type = result
        .content_type()
        .unwrap_or_else(|| CONTENT_TYPE_BYTES.to_string());
    let payload = result.payload();
    Negotiated {
        payload,
        content_type,
        result,
    }
}

impl Drop for Negotiated {
    fn drop(&mut self) {
        if let Some(resource) = self.result.releasable() {
            if let Err(err) = resource.release() {
                tracing::warn!(error = %err, "failed to release the function response");
            }
        }
    }
}
