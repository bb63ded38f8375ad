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

//! Static symbol and currency configuration.
//!
//! Configuration is replaced wholesale on registry re-initialization and is
//! referenced by calculators, never mutated in place.

use ahash::AHashSet;
use anyhow::Context;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::enums::{MarginMode, SwapType};

/// Static configuration for a currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    /// The ISO-style currency code.
    pub code: Ustr,
    /// The decimal precision for amounts in this currency.
    pub precision: u8,
}

impl CurrencyInfo {
    /// Creates a new [`CurrencyInfo`] instance.
    #[must_use]
    pub fn new(code: &str, precision: u8) -> Self {
        Self {
            code: Ustr::from(code),
            precision,
        }
    }
}

const fn default_reduction() -> f64 {
    1.0
}

/// Static configuration for a tradable instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// The symbol name.
    pub symbol: Ustr,
    /// The currency margin is denominated in (the base currency).
    pub margin_currency: Ustr,
    /// The currency profit is denominated in (the quote currency).
    pub profit_currency: Ustr,
    /// Units of the base asset per one lot.
    pub contract_size: f64,
    /// The price precision in decimal places.
    pub precision: u8,
    /// The fractional margin requirement per unit of volume.
    pub margin_factor: f64,
    /// Margin reduction applied to stop and stop-limit orders, in `(0, 1]`.
    #[serde(default = "default_reduction")]
    pub stop_order_margin_reduction: f64,
    /// Margin reduction applied to hidden limit orders, in `(0, 1]`.
    #[serde(default = "default_reduction")]
    pub hidden_limit_order_margin_reduction: f64,
    /// The margin calculation mode.
    pub margin_mode: MarginMode,
    /// Whether swaps accrue on open positions.
    #[serde(default)]
    pub swap_enabled: bool,
    /// The swap size interpretation.
    #[serde(default = "SymbolInfo::default_swap_type")]
    pub swap_type: SwapType,
    /// The swap size for long exposure.
    #[serde(default)]
    pub swap_size_long: f64,
    /// The swap size for short exposure.
    #[serde(default)]
    pub swap_size_short: f64,
    /// The weekday on which three days of swap are charged at once.
    #[serde(default)]
    pub triple_swap_day: Option<Weekday>,
}

impl SymbolInfo {
    /// Creates a new [`SymbolInfo`] instance with swaps disabled and no
    /// order-type margin reductions.
    #[must_use]
    pub fn new(
        symbol: &str,
        margin_currency: &str,
        profit_currency: &str,
        contract_size: f64,
        precision: u8,
        margin_factor: f64,
        margin_mode: MarginMode,
    ) -> Self {
        Self {
            symbol: Ustr::from(symbol),
            margin_currency: Ustr::from(margin_currency),
            profit_currency: Ustr::from(profit_currency),
            contract_size,
            precision,
            margin_factor,
            stop_order_margin_reduction: 1.0,
            hidden_limit_order_margin_reduction: 1.0,
            margin_mode,
            swap_enabled: false,
            swap_type: SwapType::Points,
            swap_size_long: 0.0,
            swap_size_short: 0.0,
            triple_swap_day: None,
        }
    }

    const fn default_swap_type() -> SwapType {
        SwapType::Points
    }

    /// Returns whether the symbol has both settlement currencies configured.
    #[must_use]
    pub fn has_currencies(&self) -> bool {
        !self.margin_currency.is_empty() && !self.profit_currency.is_empty()
    }
}

/// A full market catalogue as delivered by the configuration source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketConfig {
    /// The tradable symbols.
    pub symbols: Vec<SymbolInfo>,
    /// The currencies the symbols settle in.
    pub currencies: Vec<CurrencyInfo>,
}

impl MarketConfig {
    /// Parses a catalogue from JSON and validates currency references.
    pub fn from_json(data: &str) -> anyhow::Result<Self> {
        let config: Self =
            serde_json::from_str(data).context("Failed to parse market configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every symbol settles in a listed currency.
    pub fn validate(&self) -> anyhow::Result<()> {
        let codes: AHashSet<Ustr> = self.currencies.iter().map(|info| info.code).collect();
        for info in &self.symbols {
            if !info.has_currencies() {
                anyhow::bail!("symbol '{}' has no settlement currencies", info.symbol);
            }
            for currency in [info.margin_currency, info.profit_currency] {
                if !codes.contains(&currency) {
                    anyhow::bail!(
                        "symbol '{}' references unlisted currency '{currency}'",
                        info.symbol
                    );
                }
            }
        }
        Ok(())
    }
}
