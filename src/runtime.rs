use std::sync::Arc;

use tracing::debug;

use crate::context::{build_context, BaseContext};
use crate::crash::call_handler;
use crate::error::{InvokeError, RuntimeError};
use crate::failure::report_failure;
use crate::handler::Handler;
use crate::invoke::{Invoke, RuntimeApiClient};
use crate::response::negotiate;
use crate::signal::POST_INVOKE_WAIT;

/// Drives one worker: fetch, execute, report, repeat.
///
/// Invokes are processed strictly one at a time, in fetch order.
pub struct Runtime<C, H> {
    client: C,
    handler: Arc<H>,
    base: BaseContext,
}

impl<C, H> Runtime<C, H>
where
    C: RuntimeApiClient,
    H: Handler,
{
    pub fn new(client: C, handler: H, base: BaseContext) -> Self {
        Self {
            client,
            handler: Arc::new(handler),
            base,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs until an invoke produces a non-recoverable error.
    ///
    /// Never returns `Ok`: fetch and transmit failures, as well as a handler
    /// panic (after it has been reported), end the loop with an error.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        loop {
            let invoke = self.client.next().await.map_err(RuntimeError::Next)?;
            self.handle_invoke(&invoke).await?;

            if let Some(signal) = &self.base.post_invoke {
                signal.wait(POST_INVOKE_WAIT).await;
            }
        }
    }

    /// Processes a single invoke through to its one terminal report.
    ///
    /// Malformed metadata and handler errors are reported and yield `Ok`.
    pub async fn handle_invoke(&self, invoke: &Invoke) -> Result<(), RuntimeError> {
        let (ctx, _cancel_on_exit) = match build_context(invoke, &self.base) {
            Ok(built) => built,
            Err(err) => return report_failure(&self.client, invoke, &InvokeError::from(err)).await,
        };
        debug!(request_id = %invoke.id, "invoking handler");

        let result = match call_handler(Arc::clone(&self.handler), ctx, invoke.payload.clone()).await {
            Ok(result) => result,
            Err(invoke_err) => {
                report_failure(&self.client, invoke, &invoke_err).await?;
                if invoke_err.fatal {
                    return Err(RuntimeError::HandlerPanicked);
                }
                return Ok(());
            }
        };

        let response = negotiate(result);
        self.client
            .success(invoke, response.payload.clone(), &response.content_type)
            .await
            .map_err(RuntimeError::SendResponse)
    }
}

/// Runs the invoke loop against `client` with the function environment
/// read from the process.
pub async fn start_runtime_loop<C, H>(client: C, handler: H) -> Result<(), RuntimeError>
where
    C: RuntimeApiClient,
    H: Handler,
{
    Runtime::new(client, handler, BaseContext::from_env()).run().await
}
