//! The tri-state outcome of running a service.
//!
//! A [`RunResult`] carries a signed status code and an optional payload of
//! any type:
//!
//! | status | meaning |
//! |--------|---------|
//! | `0`    | inert, nothing meaningful happened yet |
//! | `> 0`  | success |
//! | `< 0`  | failure |
//!
//! The payload is type-erased and checked on extraction. Asking for the wrong
//! type yields `None`, never a panic.
//!
//! ```rust,ignore
//! let result = RunResult::success().with_payload(42u32);
//! assert_eq!(result.as_value::<u32>(), Some(42));
//! assert_eq!(result.as_value::<i64>(), None);
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

/// Signed status code of a [`RunResult`].
pub type RetCode = i32;

/// Coarse classification of a [`RunResult`]'s status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// `status == 0`.
    Inert,
    /// `status > 0`.
    Success,
    /// `status < 0`.
    Failure,
}

impl Outcome {
    /// Classifies a raw status code.
    pub fn of(code: RetCode) -> Self {
        match code {
            0 => Self::Inert,
            c if c > 0 => Self::Success,
            _ => Self::Failure,
        }
    }

    /// Returns the outcome as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inert => "inert",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-tagged payload slot.
#[derive(Clone)]
struct Payload {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

/// The outcome of one service run.
///
/// Cloning is cheap: the payload is shared, not copied.
#[derive(Clone, Default)]
pub struct RunResult {
    status: RetCode,
    payload: Option<Payload>,
}

impl RunResult {
    /// The only status code that means "inert".
    pub const INERT: RetCode = 0;
    /// Canonical success code.
    pub const SUCCESS: RetCode = 1;
    /// Canonical failure code.
    pub const FAILURE: RetCode = -1;

    /// The canonical empty result.
    pub const fn inert() -> Self {
        Self {
            status: Self::INERT,
            payload: None,
        }
    }

    /// A result with [`SUCCESS`](Self::SUCCESS) status and no payload.
    pub const fn success() -> Self {
        Self::with_code(Self::SUCCESS)
    }

    /// A result with [`FAILURE`](Self::FAILURE) status and no payload.
    pub const fn failure() -> Self {
        Self::with_code(Self::FAILURE)
    }

    /// A result with an arbitrary status code and no payload.
    pub const fn with_code(status: RetCode) -> Self {
        Self {
            status,
            payload: None,
        }
    }

    /// A failure carrying the error's message as a `String` payload.
    pub fn failed_with(error: impl fmt::Display) -> Self {
        Self::failure().with_payload(error.to_string())
    }

    /// Attaches a payload, replacing any previous one.
    pub fn with_payload<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.payload = Some(Payload {
            type_name: type_name::<T>(),
            value: Arc::new(value),
        });
        self
    }

    /// Returns the raw status code.
    pub fn status(&self) -> RetCode {
        self.status
    }

    /// Returns the status classification.
    pub fn outcome(&self) -> Outcome {
        Outcome::of(self.status)
    }

    /// `true` iff `status == 0`.
    pub fn is_inert(&self) -> bool {
        self.status == Self::INERT
    }

    /// `true` iff `status > 0`.
    pub fn is_success(&self) -> bool {
        self.status > Self::INERT
    }

    /// `true` iff `status < 0`.
    pub fn is_failure(&self) -> bool {
        self.status < Self::INERT
    }

    /// Returns `true` if a payload is attached.
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Returns the type name of the attached payload, if any.
    pub fn payload_type_name(&self) -> Option<&'static str> {
        self.payload.as_ref().map(|p| p.type_name)
    }

    /// Borrows the payload if it is exactly a `T`.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref()?.value.downcast_ref::<T>()
    }

    /// Copies the payload out if it is exactly a `T`.
    pub fn as_value<T: Any + Clone>(&self) -> Option<T> {
        self.payload::<T>().cloned()
    }
}

impl fmt::Debug for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunResult")
            .field("status", &self.status)
            .field("payload", &self.payload_type_name())
            .finish()
    }
}
