//! Soft-failure results
//!
//! Stages that may fall back to a safe default (the normalizer, the page
//! validator and the field extractor) return an [`Outcome`] so callers can
//! tell a genuine result from a default that was substituted after a failure.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome<T> {
    /// The stage produced this value from real evidence
    Resolved(T),
    /// The stage failed and fell back to this value
    Degraded { value: T, reason: String },
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn value(&self) -> &T {
        match self {
            Self::Resolved(value) | Self::Degraded { value, .. } => value,
        }
    }

    #[must_use]
    pub fn into_value(self) -> T {
        match self {
            Self::Resolved(value) | Self::Degraded { value, .. } => value,
        }
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Reason the default was taken, if any
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Resolved(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Resolved(value) => Outcome::Resolved(f(value)),
            Self::Degraded { value, reason } => Outcome::Degraded {
                value: f(value),
                reason,
            },
        }
    }
}
