// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Fixed-precision rounding primitives for monetary values.

use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};

/// The maximum supported decimal precision.
pub const MAX_PRECISION: u8 = 16;

/// Returns `10^precision`.
#[must_use]
pub fn pow10(precision: u8) -> f64 {
    10f64.powi(i32::from(precision))
}

/// Returns the size of one point at the given price precision.
#[must_use]
pub fn point_size(precision: u8) -> f64 {
    10f64.powi(-i32::from(precision))
}

/// Rounds a value to the given decimal precision, midpoint away from zero.
///
/// Values outside the `Decimal` range fall back to scaled f64 rounding.
#[must_use]
pub fn round_to_precision(value: f64, precision: u8) -> f64 {
    let precision = precision.min(MAX_PRECISION);
    match Decimal::from_f64(value) {
        Some(decimal) => decimal
            .round_dp_with_strategy(u32::from(precision), RoundingStrategy::MidpointAwayFromZero)
            .to_f64()
            .unwrap_or(value),
        None => {
            let scalar = pow10(precision);
            (value * scalar).round() / scalar
        }
    }
}

/// Rounds a value up (away from zero) to the given decimal precision.
#[must_use]
pub fn round_up_to_precision(value: f64, precision: u8) -> f64 {
    let precision = precision.min(MAX_PRECISION);
    match Decimal::from_f64(value) {
        Some(decimal) => decimal
            .round_dp_with_strategy(u32::from(precision), RoundingStrategy::AwayFromZero)
            .to_f64()
            .unwrap_or(value),
        None => {
            let scalar = pow10(precision);
            let scaled = value * scalar;
            let rounded = if value >= 0.0 {
                scaled.ceil()
            } else {
                scaled.floor()
            };
            rounded / scalar
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1.23456, 2, 1.23)]
    #[case(2.5, 0, 3.0)]
    #[case(-2.5, 0, -3.0)]
    #[case(0.0, 2, 0.0)]
    #[case(1.2386, 3, 1.239)]
    fn test_round_to_precision(#[case] value: f64, #[case] precision: u8, #[case] expected: f64) {
        assert_eq!(round_to_precision(value, precision), expected);
    }

    #[rstest]
    #[case(10.0625, 1, 10.1)]
    #[case(-10.0625, 1, -10.1)]
    #[case(1.25, 2, 1.25)]
    #[case(0.5, 0, 1.0)]
    fn test_round_up_to_precision(
        #[case] value: f64,
        #[case] precision: u8,
        #[case] expected: f64,
    ) {
        assert_eq!(round_up_to_precision(value, precision), expected);
    }

    #[rstest]
    fn test_point_size() {
        assert_eq!(point_size(5), 0.00001);
        assert_eq!(pow10(2), 100.0);
    }

    #[rstest]
    fn test_round_matches_decimal_arithmetic() {
        use rust_decimal::prelude::ToPrimitive;
        use rust_decimal_macros::dec;

        let expected = dec!(1.24).to_f64().unwrap();
        assert_eq!(round_to_precision(1.2386, 2), expected);
        assert_eq!(round_up_to_precision(1.231, 2), expected);
    }
}
