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

//! Type stubs to facilitate testing.

use rstest::fixture;
use ustr::Ustr;

use crate::{
    config::{CurrencyInfo, SymbolInfo},
    enums::MarginMode,
    registry::{MarketRegistry, RegistryUsagePolicy},
};

/// A small catalogue of symbols covering forex majors, a JPY pair and a
/// leverage-insensitive CFD.
#[fixture]
pub fn test_symbols() -> Vec<SymbolInfo> {
    vec![
        SymbolInfo::new("EURUSD", "EUR", "USD", 100_000.0, 5, 0.01, MarginMode::Forex),
        SymbolInfo::new("USDJPY", "USD", "JPY", 100_000.0, 3, 0.01, MarginMode::Forex),
        SymbolInfo::new("XAUUSD", "XAU", "USD", 100.0, 2, 0.01, MarginMode::Cfd),
    ]
}

/// The currencies referenced by [`test_symbols`].
#[fixture]
pub fn test_currencies() -> Vec<CurrencyInfo> {
    vec![
        CurrencyInfo::new("USD", 2),
        CurrencyInfo::new("EUR", 2),
        CurrencyInfo::new("JPY", 0),
        CurrencyInfo::new("XAU", 2),
    ]
}

/// An initialized registry with firm quotes on every stub symbol.
#[fixture]
pub fn test_registry() -> MarketRegistry {
    let mut registry = MarketRegistry::new(RegistryUsagePolicy::OnDemand);
    registry.init(test_symbols(), test_currencies());
    registry.update_rate(Ustr::from("EURUSD"), Some(1.1048), Some(1.1050), false, false);
    registry.update_rate(Ustr::from("USDJPY"), Some(155.00), Some(155.04), false, false);
    registry.update_rate(Ustr::from("XAUUSD"), Some(2650.0), Some(2650.5), false, false);
    registry
}
