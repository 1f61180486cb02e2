// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::period::YearMonth;

/// Decides which months keep durable start balances.
///
/// The window is the last `months_back` months, the current month and every
/// future month. Months at or before the window's first month are anchors:
/// their start balances are persisted. Months after it are always derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceWindow {
    pub months_back: u32,
    pub now: YearMonth,
}

impl PersistenceWindow {
    pub fn new(now: YearMonth, months_back: u32) -> Self {
        Self { months_back, now }
    }

    /// Oldest month inside the window.
    pub fn first_month(&self) -> YearMonth {
        self.now.shift(-(self.months_back as i32))
    }

    /// True when `ym` must carry persisted start balances after a pass.
    pub fn persists_start(&self, ym: YearMonth) -> bool {
        ym <= self.first_month()
    }
}
