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

//! Lazily evaluated, usage-counted currency conversion formulas.
//!
//! A formula converts amounts from an instrument currency into the account
//! deposit currency through zero, one or two live rate legs. Formulas are
//! interned in the registry's arena per `(source, target, kind)` and only
//! attach to their upstream rate nodes while their usage count is positive,
//! which keeps dormant calculators free of subscription overhead.

use std::{cell::RefCell, rc::Rc};

use ustr::Ustr;

use crate::{
    enums::{ConversionKind, QuoteSide},
    errors::CalcError,
    rates::SymbolRateNode,
};

/// A shared handle to a symbol rate node.
pub type RateNodeRef = Rc<RefCell<SymbolRateNode>>;

/// A shared handle to a conversion formula.
pub type FormulaRef = Rc<RefCell<ConversionFormula>>;

/// One live-rate hop of a conversion path.
#[derive(Debug, Clone)]
pub struct FormulaLeg {
    /// The rate node supplying the quote.
    pub node: RateNodeRef,
    /// Which side of the quote this hop consumes.
    pub side: QuoteSide,
    /// Whether the hop divides by the quote instead of multiplying.
    pub invert: bool,
    /// Whether the hop goes through an intermediate instrument.
    pub cross: bool,
}

/// Returns the quote side a conversion hop must consume.
///
/// Converting an amount of the pair's base currency into its quote currency
/// sells the base at the bid for a surplus and buys it back at the ask for a
/// deficit; margin conversion always takes the conservative (ask) side. An
/// inverted hop flips the side.
#[must_use]
pub const fn leg_side(kind: ConversionKind, inverted: bool) -> QuoteSide {
    let direct = match kind {
        ConversionKind::PositiveProfit => QuoteSide::Bid,
        ConversionKind::NegativeProfit | ConversionKind::Margin => QuoteSide::Ask,
    };
    if inverted {
        match direct {
            QuoteSide::Bid => QuoteSide::Ask,
            QuoteSide::Ask => QuoteSide::Bid,
        }
    } else {
        direct
    }
}

/// A resolved, lazily evaluated rate path from a source currency to the
/// deposit currency.
#[derive(Debug)]
pub struct ConversionFormula {
    /// The currency amounts are converted from.
    pub source: Ustr,
    /// The currency amounts are converted to.
    pub target: Ustr,
    /// The conversion kind this formula serves.
    pub kind: ConversionKind,
    legs: Vec<FormulaLeg>,
    path_error: CalcError,
    usage: u32,
    active: bool,
}

impl ConversionFormula {
    /// Creates a resolved formula over the given legs (empty legs = identity).
    #[must_use]
    pub fn resolved(source: Ustr, target: Ustr, kind: ConversionKind, legs: Vec<FormulaLeg>) -> Self {
        Self {
            source,
            target,
            kind,
            legs,
            path_error: CalcError::None,
            usage: 0,
            active: false,
        }
    }

    /// Creates a formula for which no conversion path exists.
    #[must_use]
    pub fn unresolved(source: Ustr, target: Ustr, kind: ConversionKind) -> Self {
        Self {
            source,
            target,
            kind,
            legs: Vec::new(),
            path_error: CalcError::misconfiguration(&format!(
                "no conversion path from '{source}' to '{target}'"
            )),
            usage: 0,
            active: false,
        }
    }

    /// Returns the current conversion rate, or the current error.
    ///
    /// Evaluation is on demand and does not require the formula to be active.
    pub fn value(&self) -> Result<f64, CalcError> {
        if self.path_error.is_error() {
            return Err(self.path_error);
        }
        let mut rate = 1.0;
        for leg in &self.legs {
            let quote = leg.node.borrow().quote(leg.side, leg.cross)?;
            if leg.invert {
                rate /= quote;
            } else {
                rate *= quote;
            }
        }
        Ok(rate)
    }

    /// Converts an amount into the target currency.
    pub fn convert(&self, amount: f64) -> Result<f64, CalcError> {
        Ok(amount * self.value()?)
    }

    /// Returns the error a consumer would currently observe, if any.
    #[must_use]
    pub fn current_error(&self) -> CalcError {
        match self.value() {
            Ok(_) => CalcError::None,
            Err(error) => error,
        }
    }

    /// Increments the usage count, attaching to upstream nodes on the 0→1
    /// transition.
    pub fn add_usage(&mut self) {
        self.usage += 1;
        if self.usage == 1 {
            self.attach();
        }
    }

    /// Decrements the usage count, detaching from upstream nodes on the 1→0
    /// transition. The count never goes negative.
    pub fn remove_usage(&mut self) {
        debug_assert!(self.usage > 0, "conversion formula usage underflow");
        if self.usage == 0 {
            return;
        }
        self.usage -= 1;
        if self.usage == 0 {
            self.detach();
        }
    }

    /// Replaces the formula's path after a catalogue change, preserving the
    /// usage count and re-attaching when the formula is in active use.
    pub fn rebuild(&mut self, resolution: Option<Vec<FormulaLeg>>) {
        let was_active = self.active;
        if was_active {
            self.detach();
        }
        match resolution {
            Some(legs) => {
                self.legs = legs;
                self.path_error = CalcError::None;
            }
            None => {
                self.legs = Vec::new();
                self.path_error = CalcError::misconfiguration(&format!(
                    "no conversion path from '{}' to '{}'",
                    self.source, self.target
                ));
            }
        }
        if was_active {
            self.attach();
        }
    }

    /// Returns the current usage count.
    #[must_use]
    pub const fn usage(&self) -> u32 {
        self.usage
    }

    /// Returns whether the formula is attached to its upstream nodes.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    fn attach(&mut self) {
        for leg in &self.legs {
            leg.node.borrow_mut().attach();
        }
        self.active = true;
    }

    fn detach(&mut self) {
        for leg in &self.legs {
            leg.node.borrow_mut().detach();
        }
        self.active = false;
    }
}

/// A scoped usage token over a calculator's conversion formulas.
///
/// Acquires one usage on construction and releases it when dropped,
/// regardless of exit path. One-off checks hold a guard so the registry can
/// still garbage-collect the backing subscriptions afterwards.
#[derive(Debug)]
pub struct UsageGuard {
    formulas: Vec<FormulaRef>,
}

impl UsageGuard {
    /// Acquires one usage on each of the given formulas.
    #[must_use]
    pub fn new(formulas: Vec<FormulaRef>) -> Self {
        for formula in &formulas {
            formula.borrow_mut().add_usage();
        }
        Self { formulas }
    }
}

impl Drop for UsageGuard {
    fn drop(&mut self) {
        for formula in &self.formulas {
            formula.borrow_mut().remove_usage();
        }
    }
}
