//! Lifecycle of one asynchronous operation.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "kebab-case")]
pub enum Attempt<T, E = String> {
    NotStarted,
    Processing,
    Success(T),
    Error(E),
}

impl<T, E> Attempt<T, E> {
    /// Settled either way. `NotStarted` has not settled.
    pub fn has_finished(&self) -> bool { matches!(self, Attempt::Success(_) | Attempt::Error(_)) }

    pub fn is_processing(&self) -> bool { matches!(self, Attempt::Processing) }

    pub fn data(&self) -> Option<&T> {
        match self {
            Attempt::Success(d) => Some(d),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            Attempt::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attempt<U, E> {
        match self {
            Attempt::NotStarted => Attempt::NotStarted,
            Attempt::Processing => Attempt::Processing,
            Attempt::Success(d) => Attempt::Success(f(d)),
            Attempt::Error(e) => Attempt::Error(e),
        }
    }
}

impl<T, E> Default for Attempt<T, E> {
    fn default() -> Self { Attempt::NotStarted }
}

impl<T, E> From<Result<T, E>> for Attempt<T, E> {
    fn from(r: Result<T, E>) -> Self {
        match r {
            Ok(d) => Attempt::Success(d),
            Err(e) => Attempt::Error(e),
        }
    }
}
