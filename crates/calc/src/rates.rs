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

//! Per-symbol live rate nodes.

use ustr::Ustr;

use crate::{enums::QuoteSide, errors::CalcError};

/// Holds the live best bid/ask for one symbol.
///
/// Nodes are created lazily on first reference and owned by the registry for
/// its whole lifetime; a symbol leaving the catalogue disables its node
/// rather than destroying it. The "no bid", "no ask" and "no symbol" errors
/// are cached on the node so hot paths hand out copies without formatting.
#[derive(Debug)]
pub struct SymbolRateNode {
    /// The symbol this node holds quotes for.
    pub symbol: Ustr,
    /// The current best bid, if any.
    pub bid: Option<f64>,
    /// The current best ask, if any.
    pub ask: Option<f64>,
    /// Whether the current bid is indicative (not tradable).
    pub bid_indicative: bool,
    /// Whether the current ask is indicative (not tradable).
    pub ask_indicative: bool,
    /// Whether the symbol is present in the current catalogue.
    pub enabled: bool,
    subscribers: u32,
    err_no_bid: CalcError,
    err_no_ask: CalcError,
    err_no_bid_cross: CalcError,
    err_no_ask_cross: CalcError,
    err_no_symbol: CalcError,
}

impl SymbolRateNode {
    /// Creates a new [`SymbolRateNode`] instance with no quote.
    #[must_use]
    pub fn new(symbol: Ustr) -> Self {
        Self {
            symbol,
            bid: None,
            ask: None,
            bid_indicative: false,
            ask_indicative: false,
            enabled: true,
            subscribers: 0,
            err_no_bid: CalcError::off_quotes(symbol, QuoteSide::Bid),
            err_no_ask: CalcError::off_quotes(symbol, QuoteSide::Ask),
            err_no_bid_cross: CalcError::off_cross_quotes(symbol, QuoteSide::Bid),
            err_no_ask_cross: CalcError::off_cross_quotes(symbol, QuoteSide::Ask),
            err_no_symbol: CalcError::misconfiguration(&format!("symbol '{symbol}' not found")),
        }
    }

    /// Applies a new tick to the node.
    pub fn update(
        &mut self,
        bid: Option<f64>,
        ask: Option<f64>,
        bid_indicative: bool,
        ask_indicative: bool,
    ) {
        self.bid = bid;
        self.ask = ask;
        self.bid_indicative = bid_indicative;
        self.ask_indicative = ask_indicative;
    }

    /// Drops the current quote entirely.
    pub fn clear(&mut self) {
        self.bid = None;
        self.ask = None;
        self.bid_indicative = false;
        self.ask_indicative = false;
    }

    /// Marks the node as absent from the catalogue.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.clear();
    }

    /// Marks the node as present in the catalogue.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Returns the quote for the given side.
    ///
    /// `cross` marks the resulting off-quotes error as caused by a
    /// cross-instrument conversion hop.
    pub fn quote(&self, side: QuoteSide, cross: bool) -> Result<f64, CalcError> {
        if !self.enabled {
            return Err(self.err_no_symbol);
        }
        match side {
            QuoteSide::Bid => self.bid.ok_or(if cross {
                self.err_no_bid_cross
            } else {
                self.err_no_bid
            }),
            QuoteSide::Ask => self.ask.ok_or(if cross {
                self.err_no_ask_cross
            } else {
                self.err_no_ask
            }),
        }
    }

    /// Returns the quote for the given side, rejecting indicative ticks.
    pub fn firm_quote(&self, side: QuoteSide) -> Result<f64, CalcError> {
        let value = self.quote(side, false)?;
        let indicative = match side {
            QuoteSide::Bid => self.bid_indicative,
            QuoteSide::Ask => self.ask_indicative,
        };
        if indicative {
            return Err(match side {
                QuoteSide::Bid => self.err_no_bid,
                QuoteSide::Ask => self.err_no_ask,
            });
        }
        Ok(value)
    }

    /// Returns the cached "no symbol" error for this node.
    #[must_use]
    pub const fn no_symbol_error(&self) -> CalcError {
        self.err_no_symbol
    }

    /// Returns the number of actively attached formula legs.
    #[must_use]
    pub const fn subscribers(&self) -> u32 {
        self.subscribers
    }

    /// Registers an active formula leg on this node.
    pub fn attach(&mut self) {
        self.subscribers += 1;
    }

    /// Deregisters an active formula leg from this node.
    pub fn detach(&mut self) {
        debug_assert!(self.subscribers > 0, "rate node subscriber underflow");
        self.subscribers = self.subscribers.saturating_sub(1);
    }
}
