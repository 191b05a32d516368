//! Listener records: a kind tag plus the callable to run.

use std::fmt;

use crate::outcome::{Outcome, ResponseInfo};

/// Which outcomes a listener wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Completion,
    Success,
    NewData,
    NotModified,
    Failure,
}

impl ListenerKind {
    pub fn matches(self, info: &ResponseInfo) -> bool {
        match (self, &info.outcome) {
            (ListenerKind::Completion, _) => true,
            (ListenerKind::Success, Outcome::Success(_)) => true,
            (ListenerKind::NewData, Outcome::Success(_)) => info.is_new,
            (ListenerKind::NotModified, Outcome::Success(_)) => !info.is_new,
            (ListenerKind::Failure, Outcome::Failure(_)) => true,
            _ => false,
        }
    }

    /// Whether this kind can ever match a failed outcome.
    pub fn accepts_failure(self) -> bool {
        matches!(self, ListenerKind::Completion | ListenerKind::Failure)
    }
}

type Callback = Box<dyn FnOnce(&ResponseInfo) + Send + 'static>;

/// A registered callback. Consumed when it fires, so it cannot fire twice.
pub struct Listener {
    kind: ListenerKind,
    callback: Callback,
}

impl Listener {
    pub fn new(kind: ListenerKind, callback: impl FnOnce(&ResponseInfo) + Send + 'static) -> Self {
        Self {
            kind,
            callback: Box::new(callback),
        }
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }

    /// Run the callback if the outcome matches. Returns whether it ran.
    pub fn fire(self, info: &ResponseInfo) -> bool {
        if self.kind.matches(info) {
            (self.callback)(info);
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("kind", &self.kind).finish_non_exhaustive()
    }
}
