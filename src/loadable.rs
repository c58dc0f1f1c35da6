//! Async fetch state as a single value.
//!
//! `Loadable<T>` replaces the ad hoc `is_loading` / `has_error` flag pairs
//! a view model would otherwise juggle: every asynchronous fetch is in
//! exactly one of four states, and rendering folds over them exhaustively.
//!
//! # Example
//!
//! ```ignore
//! let mut recommendations: Loadable<Vec<Activity>> = Loadable::Idle;
//!
//! recommendations = Loadable::loading();
//! recommendations = match client.fetch_recommendations().await {
//!     Ok(list) => Loadable::Loaded(list),
//!     Err(e) => Loadable::Failed(e),
//! };
//!
//! // In render
//! recommendations.render(
//!     |progress, _msg| spinner(progress),
//!     |list| activity_list(list),
//!     |err| retry_banner(err),
//! );
//! ```
//!
//! `Loadable` is a plain value, not a state machine object: transitions are
//! caller-driven reassignment, and any variant may overwrite any other.

use crate::error::Error;

/// The lifecycle of an asynchronous fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Loadable<T> {
  /// No fetch attempted yet.
  Idle,
  /// Fetch in flight, with optional progress and status message.
  Loading {
    progress: Option<f32>,
    message: Option<String>,
  },
  /// Fetch completed successfully.
  Loaded(T),
  /// Fetch failed.
  Failed(Error),
}

impl<T> Loadable<T> {
  /// A loading state with no progress information.
  pub fn loading() -> Self {
    Loadable::Loading {
      progress: None,
      message: None,
    }
  }

  /// A loading state with progress (0.0..=1.0) and a status message.
  pub fn loading_with(progress: Option<f32>, message: Option<&str>) -> Self {
    Loadable::Loading {
      progress,
      message: message.map(String::from),
    }
  }

  /// Build from a fetch result.
  pub fn from_result(result: Result<T, Error>) -> Self {
    match result {
      Ok(value) => Loadable::Loaded(value),
      Err(e) => Loadable::Failed(e),
    }
  }

  pub fn is_idle(&self) -> bool {
    matches!(self, Loadable::Idle)
  }

  pub fn is_loading(&self) -> bool {
    matches!(self, Loadable::Loading { .. })
  }

  pub fn is_loaded(&self) -> bool {
    matches!(self, Loadable::Loaded(_))
  }

  pub fn is_failed(&self) -> bool {
    matches!(self, Loadable::Failed(_))
  }

  /// The loaded value, if any.
  pub fn value(&self) -> Option<&T> {
    match self {
      Loadable::Loaded(value) => Some(value),
      _ => None,
    }
  }

  /// The error, if the fetch failed.
  pub fn error(&self) -> Option<&Error> {
    match self {
      Loadable::Failed(e) => Some(e),
      _ => None,
    }
  }

  /// Loading progress, if known.
  pub fn progress(&self) -> Option<f32> {
    match self {
      Loadable::Loading { progress, .. } => *progress,
      _ => None,
    }
  }

  /// Loading status message, if any.
  pub fn message(&self) -> Option<&str> {
    match self {
      Loadable::Loading { message, .. } => message.as_deref(),
      _ => None,
    }
  }

  /// Transform the loaded value; all other states pass through unchanged.
  pub fn map<U, F>(self, f: F) -> Loadable<U>
  where
    F: FnOnce(T) -> U,
  {
    match self {
      Loadable::Loaded(value) => Loadable::Loaded(f(value)),
      Loadable::Idle => Loadable::Idle,
      Loadable::Loading { progress, message } => Loadable::Loading { progress, message },
      Loadable::Failed(e) => Loadable::Failed(e),
    }
  }

  /// Chain a dependent fetch: `f` runs only on a loaded value and returns
  /// its own `Loadable`; non-loaded states short-circuit.
  pub fn and_then<U, F>(self, f: F) -> Loadable<U>
  where
    F: FnOnce(T) -> Loadable<U>,
  {
    match self {
      Loadable::Loaded(value) => f(value),
      Loadable::Idle => Loadable::Idle,
      Loadable::Loading { progress, message } => Loadable::Loading { progress, message },
      Loadable::Failed(e) => Loadable::Failed(e),
    }
  }

  /// Reject a successfully fetched but semantically invalid value: a loaded
  /// value failing `predicate` becomes `Failed(error)`.
  pub fn filter<F>(self, predicate: F, error: Error) -> Loadable<T>
  where
    F: FnOnce(&T) -> bool,
  {
    match self {
      Loadable::Loaded(value) => {
        if predicate(&value) {
          Loadable::Loaded(value)
        } else {
          Loadable::Failed(error)
        }
      }
      other => other,
    }
  }

  /// Convert a failure into a loaded default (read-through default).
  pub fn replace_error(self, default: T) -> Loadable<T> {
    match self {
      Loadable::Failed(_) => Loadable::Loaded(default),
      other => other,
    }
  }

  /// Fold the current state into a rendered value.
  ///
  /// Exactly one callback runs. `Idle` renders through the loading callback
  /// with no progress, so the UI shows the same placeholder before a fetch
  /// starts as it does while one runs.
  pub fn render<R>(
    &self,
    loading: impl FnOnce(Option<f32>, Option<&str>) -> R,
    loaded: impl FnOnce(&T) -> R,
    failed: impl FnOnce(&Error) -> R,
  ) -> R {
    match self {
      Loadable::Idle => loading(None, None),
      Loadable::Loading { progress, message } => loading(*progress, message.as_deref()),
      Loadable::Loaded(value) => loaded(value),
      Loadable::Failed(e) => failed(e),
    }
  }
}

impl<T: Clone> Loadable<T> {
  /// Merge two loadables into a loadable of a pair.
  ///
  /// Rules, checked in order:
  /// - either failed: failed with that error, left side first
  /// - either loading: loading, with averaged progress and joined messages
  /// - both loaded: loaded pair
  /// - otherwise idle
  pub fn combine_with<U: Clone>(&self, other: &Loadable<U>) -> Loadable<(T, U)> {
    if let Loadable::Failed(e) = self {
      return Loadable::Failed(e.clone());
    }
    if let Loadable::Failed(e) = other {
      return Loadable::Failed(e.clone());
    }

    if self.is_loading() || other.is_loading() {
      let progress = match (self.progress(), other.progress()) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
      };
      let message = match (self.message(), other.message()) {
        (Some(a), Some(b)) => Some(format!("{}; {}", a, b)),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
      };
      return Loadable::Loading { progress, message };
    }

    match (self, other) {
      (Loadable::Loaded(a), Loadable::Loaded(b)) => Loadable::Loaded((a.clone(), b.clone())),
      _ => Loadable::Idle,
    }
  }
}

impl<T> Default for Loadable<T> {
  fn default() -> Self {
    Loadable::Idle
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn failed<T>() -> Loadable<T> {
    Loadable::Failed(Error::Network("connection reset".to_string()))
  }

  #[test]
  fn test_accessors_match_exactly_one_state() {
    let states: Vec<Loadable<i32>> =
      vec![Loadable::Idle, Loadable::loading(), Loadable::Loaded(1), failed()];

    for state in &states {
      let flags = [
        state.is_idle(),
        state.is_loading(),
        state.is_loaded(),
        state.is_failed(),
      ];
      assert_eq!(flags.iter().filter(|f| **f).count(), 1);
    }
  }

  #[test]
  fn test_map_transforms_only_loaded() {
    assert_eq!(Loadable::Loaded(2).map(|v| v * 10), Loadable::Loaded(20));
    assert_eq!(Loadable::<i32>::Idle.map(|v| v * 10), Loadable::Idle);
    assert!(Loadable::<i32>::loading().map(|v| v * 10).is_loading());
    assert!(failed::<i32>().map(|v| v * 10).is_failed());
  }

  #[test]
  fn test_and_then_short_circuits() {
    let chained = Loadable::Loaded(2).and_then(|v| Loadable::Loaded(v + 1));
    assert_eq!(chained, Loadable::Loaded(3));

    let chained = Loadable::Loaded(2).and_then(|_| failed::<i32>());
    assert!(chained.is_failed());

    let chained = failed::<i32>().and_then(|v| Loadable::Loaded(v + 1));
    assert!(chained.is_failed());

    let chained = Loadable::<i32>::loading().and_then(|v| Loadable::Loaded(v + 1));
    assert!(chained.is_loading());
  }

  #[test]
  fn test_filter_rejects_invalid_values() {
    let ok = Loadable::Loaded(5).filter(|v| *v > 0, Error::AuthExpired);
    assert_eq!(ok, Loadable::Loaded(5));

    let rejected = Loadable::Loaded(-5).filter(|v| *v > 0, Error::AuthExpired);
    assert_eq!(rejected.error(), Some(&Error::AuthExpired));

    // Non-loaded states are untouched
    assert!(Loadable::<i32>::Idle.filter(|_| false, Error::AuthExpired).is_idle());
  }

  #[test]
  fn test_replace_error_yields_default() {
    assert_eq!(failed::<i32>().replace_error(0), Loadable::Loaded(0));
    assert_eq!(Loadable::Loaded(7).replace_error(0), Loadable::Loaded(7));
    assert!(Loadable::<i32>::loading().replace_error(0).is_loading());
  }

  #[test]
  fn test_combine_failure_is_left_biased() {
    let left: Loadable<i32> = Loadable::Failed(Error::AuthExpired);
    let right: Loadable<i32> = Loadable::Failed(Error::Network("down".to_string()));

    let combined = left.combine_with(&right);
    assert_eq!(combined.error(), Some(&Error::AuthExpired));

    // A failure on either side beats loading and loaded
    let combined = Loadable::Loaded(1).combine_with(&right);
    assert_eq!(combined.error(), Some(&Error::Network("down".to_string())));
    let combined = Loadable::<i32>::loading().combine_with(&right);
    assert!(combined.is_failed());
  }

  #[test]
  fn test_combine_loading_averages_progress() {
    let a = Loadable::<i32>::loading_with(Some(0.25), Some("profile"));
    let b = Loadable::<i32>::loading_with(Some(0.75), Some("activities"));

    match a.combine_with(&b) {
      Loadable::Loading { progress, message } => {
        assert_eq!(progress, Some(0.5));
        assert_eq!(message.as_deref(), Some("profile; activities"));
      }
      other => panic!("expected loading, got {:?}", other),
    }

    // One-sided progress passes through
    let c = Loadable::Loaded(1);
    match c.combine_with(&a) {
      Loadable::Loading { progress, .. } => assert_eq!(progress, Some(0.25)),
      other => panic!("expected loading, got {:?}", other),
    }
  }

  #[test]
  fn test_combine_loaded_pair() {
    let combined = Loadable::Loaded(1).combine_with(&Loadable::Loaded("x"));
    assert_eq!(combined, Loadable::Loaded((1, "x")));

    // Idle on either side (without failure/loading) stays idle
    assert!(Loadable::Loaded(1).combine_with(&Loadable::<i32>::Idle).is_idle());
  }

  #[test]
  fn test_combinator_chains_stay_within_four_states() {
    // Any sequence of combinators lands in one of the four variants.
    let states: Vec<Loadable<i32>> =
      vec![Loadable::Idle, Loadable::loading(), Loadable::Loaded(4), failed()];

    for state in states {
      let result = state
        .map(|v| v + 1)
        .and_then(|v| Loadable::Loaded(v * 2))
        .filter(|v| *v < 100, Error::AuthExpired)
        .replace_error(0)
        .combine_with(&Loadable::Loaded(1));

      let flags = [
        result.is_idle(),
        result.is_loading(),
        result.is_loaded(),
        result.is_failed(),
      ];
      assert_eq!(flags.iter().filter(|f| **f).count(), 1);
    }
  }

  #[test]
  fn test_render_is_exhaustive() {
    let describe = |state: &Loadable<i32>| {
      state.render(
        |progress, _| format!("loading {:?}", progress),
        |v| format!("loaded {}", v),
        |e| format!("failed {}", e),
      )
    };

    assert_eq!(describe(&Loadable::Idle), "loading None");
    assert_eq!(
      describe(&Loadable::loading_with(Some(0.5), None)),
      "loading Some(0.5)"
    );
    assert_eq!(describe(&Loadable::Loaded(3)), "loaded 3");
    assert!(describe(&failed()).starts_with("failed"));
  }
}
