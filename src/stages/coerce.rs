// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Numeric coercion of loosely typed cells

use crate::source::Cell;

/// Coerce a join key to an integer
///
/// Numbers (and text that parses as one, after trimming) are truncated
/// toward zero, so `7.5` joins as `7`. NULL, blobs, non-numeric text, NaN,
/// infinities and values outside the `i64` range yield `None`.
pub fn coerce_key(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Integer(i) => Some(*i),
        Cell::Real(r) => truncated(*r),
        Cell::Text(s) => parse_number(s).and_then(|n| match n {
            Number::Integer(i) => Some(i),
            Number::Real(r) => truncated(r),
        }),
        Cell::Null | Cell::Blob(_) => None,
    }
}

/// Coerce a quantity
///
/// `Ok(None)` for NULL or blank text. Quantities are summed into an integer
/// artifact, so a non-integral number is rejected rather than rounded: `Err`
/// carries the offending text.
pub fn coerce_quantity(cell: &Cell) -> Result<Option<i64>, String> {
    let value = match cell {
        Cell::Null => return Ok(None),
        Cell::Text(s) if s.trim().is_empty() => return Ok(None),
        Cell::Integer(i) => Some(*i),
        Cell::Real(r) => whole(*r),
        Cell::Text(s) => parse_number(s).and_then(|n| match n {
            Number::Integer(i) => Some(i),
            Number::Real(r) => whole(r),
        }),
        Cell::Blob(_) => None,
    };
    value.map(Some).ok_or_else(|| cell.render())
}

enum Number {
    Integer(i64),
    Real(f64),
}

fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<i64>()
        .map(Number::Integer)
        .ok()
        .or_else(|| text.parse::<f64>().ok().map(Number::Real))
}

// i64::MAX is not exactly representable; stay strictly inside the range
const LIMIT: f64 = 9_223_372_036_854_775_808.0;

fn truncated(value: f64) -> Option<i64> {
    let value = value.trunc();
    if value.is_finite() && value >= -LIMIT && value < LIMIT {
        Some(value as i64)
    } else {
        None
    }
}

fn whole(value: f64) -> Option<i64> {
    if value.fract() == 0.0 {
        truncated(value)
    } else {
        None
    }
}
