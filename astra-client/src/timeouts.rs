//! Timeout resolution policy and the multi-call budget tracker.
//!
//! Two concerns live here. [`first_valid_timeout`] picks the effective
//! deadline for a single call from the caller-supplied parameters and the
//! configured defaults, remembering *which* parameter won so timeout errors
//! can name it. [`MultiCallTimeoutManager`] stretches one overall budget
//! across the several HTTP requests of a logical operation (create a
//! database, then poll it until active), deducting elapsed time before each
//! sub-request.

use std::time::Instant;

use astra_core::{ApiFamily, Error, Result, TimeoutContext};

use crate::config::FullTimeoutOptions;

/// Label reported when a multi-call manager's own budget is the binding
/// constraint on a sub-request.
pub const OVERALL_TIMEOUT_LABEL: &str = "overall timeout";

/// Picks the first explicitly-set timeout from `candidates`, in order,
/// falling back to `fallback` (a configured default, always resolved).
///
/// An explicitly-supplied value is honored even when it is zero: zero is a
/// real value meaning "no deadline" (see [`TimeoutContext`]), never "unset".
pub fn first_valid_timeout(
    candidates: &[(Option<u64>, &'static str)],
    fallback: (u64, &'static str),
) -> (u64, &'static str) {
    candidates
        .iter()
        .find_map(|(value, label)| value.map(|ms| (ms, *label)))
        .unwrap_or(fallback)
}

/// Per-call timeout overrides accepted by every facade method.
///
/// `max_time_ms` is the deprecated generic alias: it applies wherever the
/// specific parameter is unset, with lower priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeoutOverride {
    /// Deadline for each single HTTP request issued by the method.
    pub request_timeout_ms: Option<u64>,
    /// Overall budget for the method (the method decides which configured
    /// default this falls back to).
    pub method_timeout_ms: Option<u64>,
    /// Deprecated alias for both of the above.
    pub max_time_ms: Option<u64>,
}

impl TimeoutOverride {
    /// No overrides: every value comes from the configured defaults.
    pub fn none() -> Self {
        Self::default()
    }

    /// Resolves the per-request deadline against the configured defaults.
    pub fn resolve_request(&self, options: &FullTimeoutOptions) -> (u64, &'static str) {
        first_valid_timeout(
            &[
                (self.request_timeout_ms, "request_timeout_ms"),
                (self.max_time_ms, "max_time_ms"),
            ],
            (options.request_timeout_ms, "request_timeout_ms"),
        )
    }

    /// Resolves the overall method budget against a configured default
    /// (whose label the caller supplies, e.g. `"database_admin_timeout_ms"`).
    pub fn resolve_method(
        &self,
        default_ms: u64,
        default_label: &'static str,
    ) -> (u64, &'static str) {
        first_valid_timeout(
            &[
                (self.method_timeout_ms, default_label),
                (self.max_time_ms, "max_time_ms"),
            ],
            (default_ms, default_label),
        )
    }
}

/// Tracks an overall deadline shared by the sequential sub-requests of one
/// logical operation.
///
/// Created once per operation, consulted before every sub-request through
/// [`remaining_timeout`](Self::remaining_timeout), and discarded when the
/// operation ends. An overall budget of `None` or zero means the operation
/// has no deadline of its own (sub-requests are then bounded only by their
/// per-request cap).
#[derive(Debug)]
pub struct MultiCallTimeoutManager {
    overall_timeout_ms: Option<u64>,
    overall_label: &'static str,
    family: ApiFamily,
    deadline: Option<Instant>,
}

impl MultiCallTimeoutManager {
    /// Starts tracking an overall budget from now.
    pub fn new(overall_timeout_ms: Option<u64>, family: ApiFamily) -> Self {
        let deadline = match overall_timeout_ms {
            None | Some(0) => None,
            Some(ms) => Some(Instant::now() + std::time::Duration::from_millis(ms)),
        };
        Self {
            overall_timeout_ms,
            overall_label: OVERALL_TIMEOUT_LABEL,
            family,
            deadline,
        }
    }

    /// Names the parameter the overall budget came from, for error messages.
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.overall_label = label;
        self
    }

    /// Computes the deadline for the next sub-request.
    ///
    /// This is a pre-flight check: when the overall budget is already
    /// exhausted it fails with the family-appropriate timeout error
    /// *without issuing any request*. Otherwise the returned context carries
    /// `min(remaining, cap)`, labeled with the cap's label when the cap is
    /// the binding constraint and with the overall budget's label otherwise.
    /// A `cap_time_ms` of `None` or zero means "no per-request cap".
    pub fn remaining_timeout(
        &self,
        cap_time_ms: Option<u64>,
        cap_timeout_label: &'static str,
    ) -> Result<TimeoutContext> {
        let cap = match cap_time_ms {
            None | Some(0) => None,
            Some(ms) => Some(ms),
        };
        let deadline = match self.deadline {
            None => {
                let context = match cap {
                    Some(cap_ms) => TimeoutContext::new(Some(cap_ms)).with_label(cap_timeout_label),
                    None => TimeoutContext::new(None),
                };
                return Ok(context.with_nominal_ms(self.overall_timeout_ms));
            }
            Some(deadline) => deadline,
        };

        let now = Instant::now();
        let remaining_ms = deadline.saturating_duration_since(now).as_millis() as u64;
        if remaining_ms == 0 {
            return Err(Error::Timeout {
                family: self.family,
                message: format!(
                    "operation timed out: the {} ms budget set by '{}' is exhausted",
                    self.overall_timeout_ms.unwrap_or(0),
                    self.overall_label,
                ),
                context: TimeoutContext::new(None)
                    .with_nominal_ms(self.overall_timeout_ms)
                    .with_label(self.overall_label),
            });
        }

        let (request_ms, label) = match cap {
            Some(cap_ms) if cap_ms < remaining_ms => (cap_ms, cap_timeout_label),
            Some(_) | None => (remaining_ms, self.overall_label),
        };
        Ok(TimeoutContext::new(Some(request_ms))
            .with_label(label)
            .with_nominal_ms(self.overall_timeout_ms))
    }
}
