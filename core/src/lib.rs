//! Lifecycle engine for a single in-flight HTTP exchange.
//!
//! # Overview
//! A request is started against a pluggable transport, classifies whatever
//! the transport reports into an `Outcome`, optionally transforms it on a
//! background context, and delivers it exactly once to every registered
//! listener on a serialized delivery context. It can be cancelled at any
//! point; cancellation and the transport's answer race under one lock and
//! exactly one of them decides the outcome.
//!
//! # Design
//! - The core does no I/O. `TransportProvider` / `TransportHandle` are the
//!   seam to whatever moves bytes.
//! - Execution contexts are injected through `RequestContext`, so tests run
//!   on `ManualQueue` and production code on tokio.
//! - Failures are values (`Outcome::Failure`), never panics or `Err`s across
//!   the asynchronous boundary.
//! - `FailedRequest` stands in for requests that cannot be attempted and
//!   obeys the same delivery rules.

pub mod client;
pub mod context;
pub mod error;
pub mod http;
pub mod interpret;
pub mod listener;
pub mod outcome;
pub mod request;
pub mod transport;

pub use client::Client;
pub use context::{
    BackgroundContext, DeliveryContext, Identity, Job, ManualQueue, RequestContext,
    ResponseTransformer, SerialQueue, TokioBackground,
};
pub use error::{ErrorKind, RequestError, TransportError, TransportErrorKind};
pub use http::{HttpRequest, RawResponse, RequestMethod};
pub use interpret::{interpret, LatestData, NoLatestData};
pub use listener::{Listener, ListenerKind};
pub use outcome::{Entity, Outcome, ResponseInfo};
pub use request::{FailedRequest, NetworkRequest, Request, RequestExt};
pub use transport::{CompletionCallback, TransportHandle, TransportProvider, TransportResult};
