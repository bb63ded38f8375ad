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

//! Severity-ordered calculation errors and boundary rejection errors.
//!
//! Hot-path computations return a [`CalcError`] out-of-band alongside a
//! sentinel zero value and never panic, since they run per tick. Admission
//! control boundaries translate the taxonomy into an [`EngineError`] so
//! callers can pattern match on the rejection kind.

use std::fmt::{Display, Formatter};

use ustr::Ustr;

use crate::enums::QuoteSide;

/// A calculation error, totally ordered by severity.
///
/// `None < OffQuotes < Misconfiguration`. Values are cheap to copy (payloads
/// are interned strings) so rate nodes cache them as singletons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CalcError {
    /// Healthy, no error.
    #[default]
    None,
    /// A required live quote is currently unavailable.
    OffQuotes {
        /// The symbol missing the quote.
        symbol: Ustr,
        /// The side of the missing quote.
        side: QuoteSide,
        /// Whether the quote was required by a cross-instrument conversion hop.
        cross: bool,
    },
    /// Required static configuration is absent from the catalogue.
    Misconfiguration {
        /// What is missing or inconsistent.
        detail: Ustr,
    },
}

impl CalcError {
    /// Creates an off-quotes error for the given symbol and side.
    #[must_use]
    pub fn off_quotes(symbol: Ustr, side: QuoteSide) -> Self {
        Self::OffQuotes {
            symbol,
            side,
            cross: false,
        }
    }

    /// Creates an off-quotes error triggered by a cross-instrument hop.
    #[must_use]
    pub fn off_cross_quotes(symbol: Ustr, side: QuoteSide) -> Self {
        Self::OffQuotes {
            symbol,
            side,
            cross: true,
        }
    }

    /// Creates a misconfiguration error with the given detail.
    #[must_use]
    pub fn misconfiguration(detail: &str) -> Self {
        Self::Misconfiguration {
            detail: Ustr::from(detail),
        }
    }

    /// Returns the severity rank of the error.
    #[must_use]
    pub const fn severity(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::OffQuotes { .. } => 1,
            Self::Misconfiguration { .. } => 2,
        }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        !self.is_none()
    }

    #[must_use]
    pub const fn is_off_quotes(&self) -> bool {
        matches!(self, Self::OffQuotes { .. })
    }

    #[must_use]
    pub const fn is_misconfiguration(&self) -> bool {
        matches!(self, Self::Misconfiguration { .. })
    }

    /// Returns the higher-severity of the two errors, favoring `self` on ties.
    #[must_use]
    pub const fn worst(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    /// Translates the error into a boundary [`EngineError`].
    ///
    /// Returns `None` for the healthy variant.
    #[must_use]
    pub fn into_engine_error(self) -> Option<EngineError> {
        match self {
            Self::None => None,
            Self::OffQuotes {
                symbol,
                cross: false,
                ..
            } => Some(EngineError::OffQuotes { symbol }),
            Self::OffQuotes {
                symbol, cross: true, ..
            } => Some(EngineError::OffCrossQuotes { symbol }),
            Self::Misconfiguration { detail } => {
                Some(EngineError::Misconfiguration(detail.to_string()))
            }
        }
    }
}

impl Display for CalcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::OffQuotes {
                symbol,
                side,
                cross,
            } => {
                if *cross {
                    write!(f, "OffCrossQuotes({symbol}, {side})")
                } else {
                    write!(f, "OffQuotes({symbol}, {side})")
                }
            }
            Self::Misconfiguration { detail } => write!(f, "Misconfiguration({detail})"),
        }
    }
}

/// A rejection raised at an admission-control boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// A required quote for the symbol is currently unavailable.
    #[error("off quotes for '{symbol}'")]
    OffQuotes { symbol: Ustr },
    /// A required quote on a cross conversion instrument is unavailable.
    #[error("off quotes on cross instrument '{symbol}'")]
    OffCrossQuotes { symbol: Ustr },
    /// Required static configuration is missing or unsupported.
    #[error("misconfiguration: {0}")]
    Misconfiguration(String),
    /// The account's free margin cannot cover the requested increase.
    #[error("not enough money: required margin {required}, equity {equity}")]
    NotEnoughMoney { required: f64, equity: f64 },
    /// The symbol is not present in the market catalogue.
    #[error("symbol not found: '{0}'")]
    SymbolNotFound(Ustr),
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;
    use ustr::Ustr;

    use super::*;

    fn all_errors() -> Vec<CalcError> {
        vec![
            CalcError::None,
            CalcError::off_quotes(Ustr::from("EURUSD"), QuoteSide::Bid),
            CalcError::off_cross_quotes(Ustr::from("USDJPY"), QuoteSide::Ask),
            CalcError::misconfiguration("no conversion path from AUD to JPY"),
        ]
    }

    #[rstest]
    fn test_severity_total_order() {
        let none = CalcError::None;
        let off = CalcError::off_quotes(Ustr::from("EURUSD"), QuoteSide::Bid);
        let bad = CalcError::misconfiguration("missing symbol");
        assert!(none.severity() < off.severity());
        assert!(off.severity() < bad.severity());
    }

    #[rstest]
    fn test_worst_none_identity() {
        for error in all_errors() {
            assert_eq!(error.worst(CalcError::None), error);
            assert_eq!(CalcError::None.worst(error), error);
        }
    }

    #[rstest]
    fn test_worst_is_idempotent() {
        for error in all_errors() {
            assert_eq!(error.worst(error), error);
        }
    }

    #[rstest]
    fn test_into_engine_error_mapping() {
        assert!(CalcError::None.into_engine_error().is_none());
        assert!(matches!(
            CalcError::off_quotes(Ustr::from("EURUSD"), QuoteSide::Bid).into_engine_error(),
            Some(EngineError::OffQuotes { .. })
        ));
        assert!(matches!(
            CalcError::off_cross_quotes(Ustr::from("EURUSD"), QuoteSide::Ask).into_engine_error(),
            Some(EngineError::OffCrossQuotes { .. })
        ));
        assert!(matches!(
            CalcError::misconfiguration("x").into_engine_error(),
            Some(EngineError::Misconfiguration(_))
        ));
    }

    #[rstest]
    fn test_display() {
        assert_eq!(
            CalcError::off_quotes(Ustr::from("EURUSD"), QuoteSide::Bid).to_string(),
            "OffQuotes(EURUSD, BID)"
        );
        assert_eq!(
            CalcError::off_cross_quotes(Ustr::from("USDJPY"), QuoteSide::Ask).to_string(),
            "OffCrossQuotes(USDJPY, ASK)"
        );
    }

    proptest! {
        #[test]
        fn prop_worst_severity_commutative(a in 0usize..4, b in 0usize..4) {
            let errors = all_errors();
            let lhs = errors[a].worst(errors[b]);
            let rhs = errors[b].worst(errors[a]);
            // Ties may favor either operand, severity must agree
            prop_assert_eq!(lhs.severity(), rhs.severity());
            prop_assert_eq!(lhs.severity(), errors[a].severity().max(errors[b].severity()));
        }
    }
}
