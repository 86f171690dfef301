use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, Mutex, Once};

use bytes::Bytes;

use crate::context::InvocationContext;
use crate::error::{InvokeError, StackFrame};
use crate::handler::{BoxedResult, Handler};

static PANIC_CAPTURE: Once = Once::new();

type PanicSlot = Arc<Mutex<Option<Vec<StackFrame>>>>;

tokio::task_local! {
    // Set only while the handler task is being polled, so panics raised on
    // other tasks or threads never land in it.
    static PANIC_SITE: PanicSlot;
}

/// Runs the handler behind the loop's single recovery boundary.
///
/// A returned `Diagnostic` becomes a recoverable `InvokeError`; a panic
/// anywhere in the handler task becomes a fatal one carrying the panic
/// message and whatever stack could be captured.
pub async fn call_handler<H>(
    handler: Arc<H>,
    ctx: InvocationContext,
    payload: Bytes,
) -> Result<BoxedResult, InvokeError>
where
    H: Handler,
{
    install_panic_capture();

    let site = PanicSlot::default();
    let task = tokio::spawn(PANIC_SITE.scope(Arc::clone(&site), async move {
        handler.call(ctx, payload).await
    }));
    match task.await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(diagnostic)) => Err(InvokeError::from(diagnostic)),
        Err(err) if err.is_panic() => {
            let message = panic_message(err.into_panic());
            Err(InvokeError::panic(message, take_frames(&site)))
        }
        Err(err) => Err(InvokeError::panic(err.to_string(), Vec::new())),
    }
}

// Chains onto whatever hook is already installed so default panic output
// is unchanged.
fn install_panic_capture() {
    PANIC_CAPTURE.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            record_panic(info);
            previous(info);
        }));
    });
}

fn record_panic(info: &PanicHookInfo<'_>) {
    let _ = PANIC_SITE.try_with(|site| {
        let Ok(mut slot) = site.lock() else {
            return;
        };
        // The first panic is the one that started unwinding.
        if slot.is_none() {
            *slot = Some(panic_frames(info));
        }
    });
}

fn panic_frames(info: &PanicHookInfo<'_>) -> Vec<StackFrame> {
    let mut frames = Vec::new();
    if let Some(location) = info.location() {
        frames.push(StackFrame {
            path: location.file().to_string(),
            line: location.line() as i32,
            label: "panic".to_string(),
        });
    }
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        frames.extend(skip_panic_machinery(parse_backtrace(&backtrace.to_string())));
    }
    frames
}

fn take_frames(site: &PanicSlot) -> Vec<StackFrame> {
    site.lock()
        .map(|mut slot| slot.take().unwrap_or_default())
        .unwrap_or_default()
}

// Drops the hook and unwinding entry frames that sit above the code that
// actually panicked.
fn skip_panic_machinery(frames: Vec<StackFrame>) -> Vec<StackFrame> {
    let is_machinery =
        |frame: &StackFrame| frame.label.ends_with("rust_begin_unwind") || frame.label.starts_with("core::panicking::");
    match frames.iter().position(is_machinery) {
        Some(entry) => frames
            .into_iter()
            .skip(entry)
            .skip_while(|frame| is_machinery(frame))
            .collect(),
        None => frames,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked with a non-string payload".to_string()
    }
}

/// Parses the text rendering of a `std::backtrace::Backtrace`.
///
/// Symbol lines (`  3: crate::module::function`) set the label for the
/// `at path:line:column` lines that follow. Symbols without a source
/// location are skipped.
pub(crate) fn parse_backtrace(rendered: &str) -> Vec<StackFrame> {
    let mut frames = Vec::new();
    let mut label = String::new();

    for line in rendered.lines() {
        let line = line.trim();
        if let Some(location) = line.strip_prefix("at ") {
            if let Some((path, line_no)) = split_location(location) {
                frames.push(StackFrame {
                    path: path.to_string(),
                    line: line_no,
                    label: label.clone(),
                });
            }
        } else if let Some((index, symbol)) = line.split_once(": ") {
            if index.chars().all(|c| c.is_ascii_digit()) {
                label = symbol.to_string();
            }
        }
    }
    frames
}

// "path:line:column" where path may itself contain ':'.
fn split_location(location: &str) -> Option<(&str, i32)> {
    let mut parts = location.rsplitn(3, ':');
    let _column = parts.next()?;
    let line = parts.next()?.parse().ok()?;
    let path = parts.next()?;
    Some((path, line))
}
