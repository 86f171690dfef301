//! In-memory Runtime API and invoke fixtures for the test suite.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use lambda_runtime::Error;

use crate::invoke::{Invoke, RuntimeApiClient, HEADER_DEADLINE_MS};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that write the ambient trace-id variable.
pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) struct InvokeBuilder {
    id: String,
    headers: HeaderMap,
    payload: Bytes,
}

impl InvokeBuilder {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            headers: HeaderMap::new(),
            payload: Bytes::new(),
        }
    }

    pub(crate) fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(value).unwrap(),
        );
        self
    }

    pub(crate) fn deadline_ms(self, ms: i64) -> Self {
        self.header(HEADER_DEADLINE_MS, &ms.to_string())
    }

    pub(crate) fn deadline_in(self, after: Duration) -> Self {
        let at = SystemTime::now() + after;
        let ms = at.duration_since(UNIX_EPOCH).unwrap().as_millis() as i64;
        self.deadline_ms(ms)
    }

    pub(crate) fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = Bytes::copy_from_slice(payload);
        self
    }

    pub(crate) fn build(self) -> Invoke {
        Invoke::new(self.id, self.headers, self.payload)
    }
}

/// A well-formed invoke with a deadline one minute out.
pub(crate) fn invoke_with(id: &str, payload: &[u8]) -> Invoke {
    InvokeBuilder::new(id)
        .deadline_in(Duration::from_secs(60))
        .payload(payload)
        .build()
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Report {
    Success {
        request_id: String,
        payload: Bytes,
        content_type: String,
    },
    Failure {
        request_id: String,
        payload: Bytes,
        content_type: String,
        xray_cause: Bytes,
    },
}

impl Report {
    pub(crate) fn request_id(&self) -> &str {
        match self {
            Report::Success { request_id, .. } | Report::Failure { request_id, .. } => request_id,
        }
    }

    pub(crate) fn failure_json(&self) -> (serde_json::Value, serde_json::Value) {
        match self {
            Report::Failure {
                payload, xray_cause, ..
            } => (
                serde_json::from_slice(payload).unwrap(),
                serde_json::from_slice(xray_cause).unwrap(),
            ),
            other => panic!("expected a failure report, got {other:?}"),
        }
    }
}

/// Hands out queued invokes in order and records every report it receives.
/// Once the queue is drained `next` fails, which ends the loop.
#[derive(Default)]
pub(crate) struct MockClient {
    queue: Mutex<VecDeque<Invoke>>,
    reports: Mutex<Vec<Report>>,
    fetched: Mutex<usize>,
    reject_success: bool,
    reject_failure: bool,
}

impl MockClient {
    pub(crate) fn with_invokes(invokes: impl IntoIterator<Item = Invoke>) -> Self {
        Self {
            queue: Mutex::new(invokes.into_iter().collect()),
            ..Self::default()
        }
    }

    pub(crate) fn rejecting_success(mut self) -> Self {
        self.reject_success = true;
        self
    }

    pub(crate) fn rejecting_failure(mut self) -> Self {
        self.reject_failure = true;
        self
    }

    pub(crate) fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    pub(crate) fn fetched(&self) -> usize {
        *self.fetched.lock().unwrap()
    }
}

#[async_trait]
impl RuntimeApiClient for MockClient {
    async fn next(&self) -> Result<Invoke, Error> {
        let invoke = self.queue.lock().unwrap().pop_front();
        match invoke {
            Some(invoke) => {
                *self.fetched.lock().unwrap() += 1;
                Ok(invoke)
            }
            None => Err("no more invokes".into()),
        }
    }

    async fn success(&self, invoke: &Invoke, payload: Bytes, content_type: &str) -> Result<(), Error> {
        if self.reject_success {
            return Err("connection reset".into());
        }
        self.reports.lock().unwrap().push(Report::Success {
            request_id: invoke.id.clone(),
            payload,
            content_type: content_type.to_string(),
        });
        Ok(())
    }

    async fn failure(
        &self,
        invoke: &Invoke,
        payload: Bytes,
        content_type: &str,
        xray_cause: Bytes,
    ) -> Result<(), Error> {
        if self.reject_failure {
            return Err("connection reset".into());
        }
        self.reports.lock().unwrap().push(Report::Failure {
            request_id: invoke.id.clone(),
            payload,
            content_type: content_type.to_string(),
            xray_cause,
        });
        Ok(())
    }
}
