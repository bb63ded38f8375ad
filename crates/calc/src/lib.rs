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

//! A real-time margin, profit and equity calculation engine for multi-currency
//! trading accounts.
//!
//! The `fxcalc` crate maintains, per account, the derived state a trading
//! platform must keep current on every quote tick:
//!
//! - Margin requirements per order, position, symbol netting and account.
//! - Unrealized profit, commission and swap in the account's deposit currency.
//! - Equity, margin level, free margin and an overall calculation status.
//! - Admission control for new orders (margin sufficiency and quote validity).
//! - Per-currency asset snapshots for margin accounts, and a locked/free
//!   asset ledger for cash accounts.
//!
//! All currency conversion flows through lazily evaluated, usage-counted
//! conversion formulas resolved from the live symbol catalogue, so dormant
//! calculators cost nothing and a missing quote is a first-class error
//! rather than a crash. Hot-path computations return their error out of band
//! and never panic.
//!
//! The engine is synchronous and single-writer per account: callers serialize
//! mutations (snapshot, quotes, orders, positions) and read derived values
//! back immediately.

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod account;
pub mod calculator;
pub mod cash;
pub mod config;
pub mod conversion;
pub mod enums;
pub mod errors;
pub mod netting;
pub mod orders;
pub mod rates;
pub mod registry;
pub mod rounding;

#[cfg(any(test, feature = "stubs"))]
pub mod stubs;

pub use crate::{
    account::{AccountAsset, MarginAccountCalculator},
    calculator::{CalcInitState, OrderCalculator, ProfitCalc, SwapCalc},
    cash::{CashAccountCalculator, CashAsset},
    config::{CurrencyInfo, SymbolInfo},
    conversion::{ConversionFormula, FormulaLeg, FormulaRef, RateNodeRef, UsageGuard},
    enums::{
        AccountingMode, CalcStatus, CommissionChargeType, CommissionType, ConversionKind,
        MarginMode, OrderSide, OrderType, QuoteSide, SwapType,
    },
    errors::{CalcError, EngineError},
    netting::{StatsChange, SymbolNetting},
    orders::{AccountSnapshot, Order, Position},
    rates::SymbolRateNode,
    registry::{CalculatorRef, MarketRegistry, RegistryRef, RegistryUsagePolicy},
};
