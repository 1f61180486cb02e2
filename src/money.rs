// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Two-decimal currency normalization.
//!
//! Every derived monetary value goes through [`round`] before it is stored,
//! carried into the next month or compared for change.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits kept for every amount.
pub const SCALE: u32 = 2;

/// Bias applied to floats before rounding so that `1.005` lands on `1.01`.
const FLOAT_EPSILON: f64 = 1e-9;

pub fn round(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts a float (e.g. a legacy stored value) to a rounded amount.
pub fn from_f64(x: f64) -> Option<Decimal> {
    let biased = if x >= 0.0 {
        x + FLOAT_EPSILON
    } else {
        x - FLOAT_EPSILON
    };
    Decimal::from_f64(biased).map(round)
}

/// True when `x * 100` is not an integer, i.e. the value carries sub-cent noise.
pub fn needs_fix(x: Decimal) -> bool {
    let cents = x * Decimal::ONE_HUNDRED;
    cents.fract() != Decimal::ZERO
}

/// Float flavour of [`needs_fix`] with the `1e-9` tolerance.
pub fn needs_fix_f64(x: f64) -> bool {
    let cents = x * 100.0;
    (cents - cents.round()).abs() > FLOAT_EPSILON
}

/// Equality after rounding both sides.
pub fn same_amount(a: Decimal, b: Decimal) -> bool {
    round(a) == round(b)
}

pub fn sum<I: IntoIterator<Item = Decimal>>(values: I) -> Decimal {
    round(values.into_iter().fold(Decimal::ZERO, |acc, v| acc + v))
}

pub fn parse(s: &str) -> Option<Decimal> {
    s.trim().parse::<Decimal>().ok().map(round)
}

pub fn format(x: Decimal) -> String {
    format!("{:.2}", round(x))
}
