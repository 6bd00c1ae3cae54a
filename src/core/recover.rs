//! Ordered-fallback execution.
//!
//! Several parts of the pipeline share the same recovery shape: try a list
//! of strategies in order, keep the first success, and swallow each failure
//! before moving to the next. Model loading tries three serialization
//! shapes this way, and report assembly tries the collaborator before local
//! synthesis. This module implements that pattern once instead of repeating
//! try/recover chains.

use crate::core::errors::DermaError;

/// A single named fallible strategy in an ordered-fallback chain.
pub type Attempt<'a, T> = Box<dyn FnOnce() -> Result<T, DermaError> + 'a>;

/// Runs the given strategies in order and returns the first success.
///
/// Each failure is logged at debug level and recorded; if every strategy
/// fails, the failures are aggregated into a single
/// [`DermaError::AttemptsExhausted`] that names each strategy and its error
/// in order.
///
/// # Arguments
///
/// * `what` - Human-readable description of the goal (used in logs and the
///   aggregated error).
/// * `attempts` - Named strategies, tried in order.
pub fn first_success<T>(
    what: &str,
    attempts: Vec<(&'static str, Attempt<'_, T>)>,
) -> Result<T, DermaError> {
    let mut failures: Vec<(&'static str, String)> = Vec::new();

    for (name, attempt) in attempts {
        match attempt() {
            Ok(value) => {
                if !failures.is_empty() {
                    tracing::debug!(
                        strategy = name,
                        skipped = failures.len(),
                        "{what}: strategy succeeded after earlier failures"
                    );
                }
                return Ok(value);
            }
            Err(err) => {
                tracing::debug!(strategy = name, error = %err, "{what}: strategy failed");
                failures.push((name, err.to_string()));
            }
        }
    }

    let summary = failures
        .iter()
        .map(|(name, msg)| format!("{name}: {msg}"))
        .collect::<Vec<_>>()
        .join("; ");

    Err(DermaError::AttemptsExhausted {
        what: what.to_string(),
        summary,
    })
}
