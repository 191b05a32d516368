//! Request lifecycle: registration, start, cancellation, delivery.
//!
//! # Design
//! `NetworkRequest` is a cheap handle around shared state guarded by one
//! mutex. The mutex covers the pending -> completed transition, so the
//! transport callback and `cancel()` cannot both win: whichever takes the
//! lock first and finds the request pending completes it, and the other
//! becomes a no-op. The transport is always started and cancelled with the
//! lock released, which keeps synchronous transports from deadlocking.
//!
//! Delivery is always asynchronous. Listeners registered before delivery
//! are drained in registration order on the delivery context; listeners
//! registered afterwards are scheduled there individually with the stored
//! outcome, so late registrations are never dropped. A panicking listener
//! is logged and does not keep the remaining listeners from firing. A
//! panicking transformer turns the outcome into a `TransformFailed` failure.
//!
//! While in flight the transport's completion callback holds the request
//! state, and the request holds the transport handle. Completion and
//! `cancel()` both drop the handle; a transport that never answers and is
//! never cancelled keeps the request alive.
//!
//! `FailedRequest` is the pre-flight variant: completed from construction,
//! it only ever reports its fixed error.

use std::fmt;
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::context::{BackgroundContext, DeliveryContext, RequestContext, ResponseTransformer};
use crate::error::RequestError;
use crate::http::HttpRequest;
use crate::interpret::{interpret, LatestData};
use crate::listener::{Listener, ListenerKind};
use crate::outcome::{Entity, ResponseInfo};
use crate::transport::{TransportHandle, TransportProvider, TransportResult};

/// The contract shared by every kind of request.
pub trait Request: Send + Sync {
    /// Register a listener. It fires at most once, with the final outcome,
    /// on the delivery context, even when added after completion.
    fn add_listener(&self, listener: Listener);

    /// Finalize with a cancellation failure unless already completed.
    fn cancel(&self);

    fn is_completed(&self) -> bool;

    fn description(&self) -> &str;
}

/// Typed, chainable registrations on top of `Request::add_listener`.
pub trait RequestExt: Request {
    fn on_completion(&self, f: impl FnOnce(&ResponseInfo) + Send + 'static) -> &Self {
        self.add_listener(Listener::new(ListenerKind::Completion, f));
        self
    }

    fn on_success(&self, f: impl FnOnce(&Entity) + Send + 'static) -> &Self {
        self.add_listener(Listener::new(ListenerKind::Success, with_entity(f)));
        self
    }

    fn on_new_data(&self, f: impl FnOnce(&Entity) + Send + 'static) -> &Self {
        self.add_listener(Listener::new(ListenerKind::NewData, with_entity(f)));
        self
    }

    fn on_not_modified(&self, f: impl FnOnce(&Entity) + Send + 'static) -> &Self {
        self.add_listener(Listener::new(ListenerKind::NotModified, with_entity(f)));
        self
    }

    fn on_failure(&self, f: impl FnOnce(&RequestError) + Send + 'static) -> &Self {
        self.add_listener(Listener::new(ListenerKind::Failure, move |info: &ResponseInfo| {
            if let Some(err) = info.outcome.error() {
                f(err);
            }
        }));
        self
    }
}

impl<R: Request + ?Sized> RequestExt for R {}

fn with_entity(
    f: impl FnOnce(&Entity) + Send + 'static,
) -> impl FnOnce(&ResponseInfo) + Send + 'static {
    move |info: &ResponseInfo| {
        if let Some(entity) = info.outcome.entity() {
            f(entity);
        }
    }
}

/// Run one listener. A panic is logged and contained.
fn fire_isolated(listener: Listener, info: &ResponseInfo, request: &str) {
    if catch_unwind(AssertUnwindSafe(|| listener.fire(info))).is_err() {
        tracing::error!(request = %request, "listener panicked during delivery");
    }
}

// ---------------------------------------------------------------------------
// Network request
// ---------------------------------------------------------------------------

enum Phase {
    /// Transport created but not started.
    Ready(Arc<dyn TransportHandle>),
    /// Cycle with the transport's callback until completion or cancel.
    InFlight(Arc<dyn TransportHandle>),
    Completed,
}

struct State {
    phase: Phase,
    listeners: Vec<Listener>,
    delivered: Option<ResponseInfo>,
}

struct Inner {
    id: Uuid,
    description: String,
    context: RequestContext,
    latest: Arc<dyn LatestData>,
    state: Mutex<State>,
}

/// A request that goes through a transport.
///
/// Clones share the same underlying request.
#[derive(Clone)]
pub struct NetworkRequest {
    inner: Arc<Inner>,
}

impl NetworkRequest {
    /// Create the request and its transport handle. Nothing is sent until
    /// `start` is called.
    pub fn new(
        request: HttpRequest,
        provider: &dyn TransportProvider,
        context: RequestContext,
        latest: Arc<dyn LatestData>,
    ) -> Self {
        let description = request.description();
        let handle = provider.handle(request);
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                description,
                context,
                latest,
                state: Mutex::new(State {
                    phase: Phase::Ready(handle),
                    listeners: Vec::new(),
                    delivered: None,
                }),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Start the transport. Repeated calls are logged and ignored, as is
    /// starting a request that was cancelled before it ever started.
    pub fn start(&self) -> &Self {
        let handle = {
            let mut state = self.inner.state.lock();
            match mem::replace(&mut state.phase, Phase::Completed) {
                Phase::Ready(handle) => {
                    state.phase = Phase::InFlight(Arc::clone(&handle));
                    handle
                }
                Phase::InFlight(handle) => {
                    state.phase = Phase::InFlight(handle);
                    tracing::warn!(
                        request_id = %self.inner.id,
                        request = %self.inner.description,
                        "start called twice; ignoring"
                    );
                    return self;
                }
                Phase::Completed => {
                    tracing::debug!(
                        request_id = %self.inner.id,
                        request = %self.inner.description,
                        "start on completed request; ignoring"
                    );
                    return self;
                }
            }
        };

        tracing::debug!(
            request_id = %self.inner.id,
            request = %self.inner.description,
            "starting request"
        );
        let inner = Arc::clone(&self.inner);
        handle.start(Box::new(move |result| Inner::transport_completed(&inner, result)));
        self
    }
}

impl Request for NetworkRequest {
    fn add_listener(&self, listener: Listener) {
        let mut state = self.inner.state.lock();
        let Some(info) = state.delivered.clone() else {
            state.listeners.push(listener);
            return;
        };
        drop(state);
        let inner = Arc::clone(&self.inner);
        self.inner.context.delivery.dispatch(Box::new(move || {
            fire_isolated(listener, &info, &inner.description);
        }));
    }

    fn cancel(&self) {
        let handle = {
            let mut state = self.inner.state.lock();
            match mem::replace(&mut state.phase, Phase::Completed) {
                Phase::Completed => {
                    tracing::debug!(
                        request_id = %self.inner.id,
                        request = %self.inner.description,
                        "cancel after completion; ignoring"
                    );
                    return;
                }
                Phase::Ready(_) => None,
                Phase::InFlight(handle) => Some(handle),
            }
        };

        tracing::debug!(
            request_id = %self.inner.id,
            request = %self.inner.description,
            "request cancelled"
        );
        if let Some(handle) = handle {
            handle.cancel();
        }
        Inner::schedule_delivery(&self.inner, ResponseInfo::failure(RequestError::cancelled()));
    }

    fn is_completed(&self) -> bool {
        matches!(self.inner.state.lock().phase, Phase::Completed)
    }

    fn description(&self) -> &str {
        &self.inner.description
    }
}

impl fmt::Debug for NetworkRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkRequest")
            .field("id", &self.inner.id)
            .field("description", &self.inner.description)
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl Inner {
    fn transport_completed(this: &Arc<Self>, result: TransportResult) {
        {
            let mut state = this.state.lock();
            if matches!(state.phase, Phase::Completed) {
                tracing::debug!(
                    request_id = %this.id,
                    request = %this.description,
                    "discarding transport result for completed request"
                );
                return;
            }
            state.phase = Phase::Completed;
        }

        let info = interpret(result, this.latest.as_ref());
        tracing::debug!(
            request_id = %this.id,
            request = %this.description,
            success = info.outcome.is_success(),
            is_new = info.is_new,
            "request completed"
        );

        if !info.is_new {
            Self::schedule_delivery(this, info);
            return;
        }

        let inner = Arc::clone(this);
        this.context.background.spawn(Box::new(move || {
            let transformer = &inner.context.transformer;
            let transformed =
                catch_unwind(AssertUnwindSafe(|| transformer.transform(info.outcome)));
            let info = match transformed {
                Ok(outcome) => ResponseInfo::new_data(outcome),
                Err(_) => {
                    tracing::error!(
                        request_id = %inner.id,
                        request = %inner.description,
                        "response transformer panicked"
                    );
                    ResponseInfo::failure(RequestError::transform_failed())
                }
            };
            Self::schedule_delivery(&inner, info);
        }));
    }

    fn schedule_delivery(this: &Arc<Self>, info: ResponseInfo) {
        let inner = Arc::clone(this);
        this.context.delivery.dispatch(Box::new(move || inner.deliver(info)));
    }

    fn deliver(&self, info: ResponseInfo) {
        let listeners = {
            let mut state = self.state.lock();
            state.delivered = Some(info.clone());
            mem::take(&mut state.listeners)
        };
        tracing::debug!(
            request_id = %self.id,
            request = %self.description,
            listeners = listeners.len(),
            "delivering outcome"
        );
        for listener in listeners {
            fire_isolated(listener, &info, &self.description);
        }
    }
}

// ---------------------------------------------------------------------------
// Pre-flight failure
// ---------------------------------------------------------------------------

/// A request that failed before it could reach the transport.
pub struct FailedRequest {
    error: RequestError,
    description: String,
    delivery: Arc<dyn DeliveryContext>,
}

impl FailedRequest {
    pub fn new(
        error: RequestError,
        description: impl Into<String>,
        delivery: Arc<dyn DeliveryContext>,
    ) -> Self {
        let description = description.into();
        tracing::debug!(request = %description, error = %error, "request failed before start");
        Self {
            error,
            description,
            delivery,
        }
    }

    pub fn error(&self) -> &RequestError {
        &self.error
    }
}

impl Request for FailedRequest {
    fn add_listener(&self, listener: Listener) {
        if !listener.kind().accepts_failure() {
            return;
        }
        let info = ResponseInfo::failure(self.error.clone());
        let description = self.description.clone();
        self.delivery.dispatch(Box::new(move || {
            fire_isolated(listener, &info, &description);
        }));
    }

    fn cancel(&self) {}

    fn is_completed(&self) -> bool {
        true
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for FailedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailedRequest")
            .field("description", &self.description)
            .field("error", &self.error)
            .finish()
    }
}
