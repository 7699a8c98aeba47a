//! The four-variant outcome observed by consumers.

use std::fmt;

use crate::error::Unsettled;

/// Observable state of an asynchronous computation.
///
/// Exactly one variant is active at a time. Within one epoch the state only
/// moves forward: `NotAsked`/`Loading` to one of the terminal variants.
///
/// # Example
///
/// ```
/// use remote_flow::ResultState;
///
/// let state: ResultState<u32, String> = ResultState::success(42);
/// assert_eq!(state.value(), Some(&42));
/// assert!(state.is_settled());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResultState<T, E> {
    /// No computation has been associated yet.
    NotAsked,
    /// A computation is pending.
    Loading,
    /// The computation fulfilled with a value.
    Success(T),
    /// The computation failed. The payload is passed through untouched.
    Failure(E),
}

/// Payload-free discriminant of a [`ResultState`], used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateKind {
    /// See [`ResultState::NotAsked`].
    NotAsked,
    /// See [`ResultState::Loading`].
    Loading,
    /// See [`ResultState::Success`].
    Success,
    /// See [`ResultState::Failure`].
    Failure,
}

impl<T, E> ResultState<T, E> {
    /// Create a `Success` state.
    #[inline]
    pub fn success(value: T) -> Self {
        ResultState::Success(value)
    }

    /// Create a `Failure` state.
    #[inline]
    pub fn failure(error: E) -> Self {
        ResultState::Failure(error)
    }

    /// Check if no computation is associated.
    pub fn is_not_asked(&self) -> bool {
        matches!(self, ResultState::NotAsked)
    }

    /// Check if a computation is pending.
    pub fn is_loading(&self) -> bool {
        matches!(self, ResultState::Loading)
    }

    /// Check if the computation fulfilled.
    pub fn is_success(&self) -> bool {
        matches!(self, ResultState::Success(_))
    }

    /// Check if the computation failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, ResultState::Failure(_))
    }

    /// Check if the state is terminal (`Success` or `Failure`).
    pub fn is_settled(&self) -> bool {
        self.is_success() || self.is_failure()
    }

    /// Get the payload-free discriminant.
    pub fn kind(&self) -> StateKind {
        match self {
            ResultState::NotAsked => StateKind::NotAsked,
            ResultState::Loading => StateKind::Loading,
            ResultState::Success(_) => StateKind::Success,
            ResultState::Failure(_) => StateKind::Failure,
        }
    }

    /// Get the value if the state is `Success`.
    pub fn value(&self) -> Option<&T> {
        match self {
            ResultState::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Get the error if the state is `Failure`.
    pub fn error(&self) -> Option<&E> {
        match self {
            ResultState::Failure(error) => Some(error),
            _ => None,
        }
    }

    /// Borrow the payloads.
    pub fn as_ref(&self) -> ResultState<&T, &E> {
        match self {
            ResultState::NotAsked => ResultState::NotAsked,
            ResultState::Loading => ResultState::Loading,
            ResultState::Success(value) => ResultState::Success(value),
            ResultState::Failure(error) => ResultState::Failure(error),
        }
    }

    /// Transform the `Success` payload, leaving other variants untouched.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ResultState<U, E> {
        match self {
            ResultState::NotAsked => ResultState::NotAsked,
            ResultState::Loading => ResultState::Loading,
            ResultState::Success(value) => ResultState::Success(f(value)),
            ResultState::Failure(error) => ResultState::Failure(error),
        }
    }

    /// Transform the `Failure` payload, leaving other variants untouched.
    pub fn map_err<E2, F: FnOnce(E) -> E2>(self, f: F) -> ResultState<T, E2> {
        match self {
            ResultState::NotAsked => ResultState::NotAsked,
            ResultState::Loading => ResultState::Loading,
            ResultState::Success(value) => ResultState::Success(value),
            ResultState::Failure(error) => ResultState::Failure(f(error)),
        }
    }

    /// Convert to a `Result` - unsettled states become `Err(Unsettled)`.
    ///
    /// Use this with the `?` operator to propagate "not ready yet" upward
    /// while keeping the computation's own outcome as the inner `Result`.
    ///
    /// ```
    /// use remote_flow::{ResultState, Unsettled};
    ///
    /// let loading: ResultState<u32, String> = ResultState::Loading;
    /// assert_eq!(loading.settled(), Err(Unsettled::Loading));
    ///
    /// let failed: ResultState<u32, String> = ResultState::failure("boom".into());
    /// assert_eq!(failed.settled(), Ok(Err("boom".to_string())));
    /// ```
    pub fn settled(self) -> Result<Result<T, E>, Unsettled> {
        match self {
            ResultState::NotAsked => Err(Unsettled::NotAsked),
            ResultState::Loading => Err(Unsettled::Loading),
            ResultState::Success(value) => Ok(Ok(value)),
            ResultState::Failure(error) => Ok(Err(error)),
        }
    }
}

impl<T, E> Default for ResultState<T, E> {
    fn default() -> Self {
        ResultState::NotAsked
    }
}

impl<T, E> From<Result<T, E>> for ResultState<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => ResultState::Success(value),
            Err(error) => ResultState::Failure(error),
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKind::NotAsked => write!(f, "not-asked"),
            StateKind::Loading => write!(f, "loading"),
            StateKind::Success => write!(f, "success"),
            StateKind::Failure => write!(f, "failure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_not_asked() {
        let state: ResultState<i32, String> = ResultState::default();
        assert!(state.is_not_asked());
        assert_eq!(state.kind(), StateKind::NotAsked);
    }

    #[test]
    fn test_from_result() {
        let ok: ResultState<i32, &str> = Ok(1).into();
        assert_eq!(ok, ResultState::Success(1));

        let err: ResultState<i32, &str> = Err("boom").into();
        assert_eq!(err, ResultState::Failure("boom"));
    }

    #[test]
    fn test_predicates() {
        let loading: ResultState<i32, ()> = ResultState::Loading;
        assert!(loading.is_loading());
        assert!(!loading.is_settled());

        let failure: ResultState<i32, ()> = ResultState::failure(());
        assert!(failure.is_failure());
        assert!(failure.is_settled());
        assert_eq!(failure.value(), None);
        assert_eq!(failure.error(), Some(&()));
    }

    #[test]
    fn test_map_leaves_other_variants() {
        let state: ResultState<i32, String> = ResultState::success(2);
        assert_eq!(state.map(|v| v * 10), ResultState::Success(20));

        let state: ResultState<i32, String> = ResultState::Loading;
        assert_eq!(state.map(|v| v * 10), ResultState::Loading);

        let state: ResultState<i32, String> = ResultState::failure("x".into());
        assert_eq!(state.map_err(|e| e.len()), ResultState::Failure(1));
    }

    #[test]
    fn test_settled_reports_unsettled_variants() {
        let state: ResultState<i32, ()> = ResultState::NotAsked;
        assert_eq!(state.settled(), Err(Unsettled::NotAsked));

        let state: ResultState<i32, ()> = ResultState::success(7);
        assert_eq!(state.settled(), Ok(Ok(7)));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(StateKind::Loading.to_string(), "loading");
        assert_eq!(StateKind::Failure.to_string(), "failure");
    }
}
