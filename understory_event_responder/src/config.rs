// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine policies.

/// Policies for a [`ResponderSystem`](crate::dispatcher::ResponderSystem).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponderConfig {
    /// Whether [`release_ownership`](crate::context::ResponderContext::release_ownership)
    /// returns `true` after an actual release.
    ///
    /// Off by default: release reports `false` whether or not anything was
    /// released, so callers cannot tell a release from a no-op.
    pub release_reports_success: bool,
    /// Upper bound on back-to-back ownership notification passes.
    ///
    /// Ownership-change handlers may themselves request or release ownership,
    /// which schedules another pass. Once the bound is hit the remaining changes
    /// are dropped with a warning. `0` behaves like `1`: the first change is
    /// always notified.
    pub max_ownership_passes: usize,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            release_reports_success: false,
            max_ownership_passes: 32,
        }
    }
}
