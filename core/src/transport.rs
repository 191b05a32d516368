//! Seam between the engine and whatever actually moves bytes.
//!
//! # Design
//! A `TransportProvider` turns an `HttpRequest` into a `TransportHandle`
//! that has not started yet. The engine starts it once with a single
//! completion callback and may later ask it to cancel. Cancellation is
//! best-effort: a transport may still invoke the callback afterwards, and
//! the engine discards that late result.

use std::sync::Arc;

use crate::error::TransportError;
use crate::http::{HttpRequest, RawResponse};

/// What the transport reports when the exchange ends.
///
/// Both fields may be set at once, for example when a connection drops
/// after the status line was read.
#[derive(Debug, Clone, Default)]
pub struct TransportResult {
    pub response: Option<RawResponse>,
    pub error: Option<TransportError>,
}

impl TransportResult {
    pub fn response(response: RawResponse) -> Self {
        Self {
            response: Some(response),
            error: None,
        }
    }

    pub fn failed(error: TransportError) -> Self {
        Self {
            response: None,
            error: Some(error),
        }
    }
}

/// Invoked by the transport at most once.
pub type CompletionCallback = Box<dyn FnOnce(TransportResult) + Send + 'static>;

/// One exchange, owned by the request that created it.
///
/// The completion callback keeps its request alive. A handle that stores
/// it should drop it once it has run or after `cancel`; a handle that
/// neither answers nor is cancelled keeps the request alive with it.
pub trait TransportHandle: Send + Sync {
    /// Begin the exchange. `on_complete` may run on any thread, including
    /// synchronously inside this call.
    fn start(&self, on_complete: CompletionCallback);

    /// Ask the transport to abandon the exchange. No acknowledgement. May
    /// arrive while `start` is still running on another thread.
    fn cancel(&self);
}

/// Factory for transport handles.
pub trait TransportProvider: Send + Sync {
    fn handle(&self, request: HttpRequest) -> Arc<dyn TransportHandle>;
}
