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

//! Account-owned order, position and snapshot value types.

use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::enums::{AccountingMode, OrderSide, OrderType};

/// An open order as reported by the account info source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// The order identifier, unique within the account.
    pub id: u64,
    /// The symbol the order is placed on.
    pub symbol: Ustr,
    /// The order type.
    pub order_type: OrderType,
    /// The order side.
    pub side: OrderSide,
    /// The remaining order volume in base units.
    pub amount: f64,
    /// The open (or requested) price.
    pub price: f64,
    /// Whether the order is a hidden limit order.
    #[serde(default)]
    pub hidden: bool,
    /// Whether the order is contingent (activates on another order).
    #[serde(default)]
    pub contingent: bool,
    /// Commission already charged against the order.
    #[serde(default)]
    pub commission: f64,
    /// Swap already accrued against the order.
    #[serde(default)]
    pub swap: f64,
}

impl Order {
    /// Creates a new market [`Order`] with no commission or swap accrued.
    #[must_use]
    pub fn market(id: u64, symbol: &str, side: OrderSide, amount: f64, price: f64) -> Self {
        Self {
            id,
            symbol: Ustr::from(symbol),
            order_type: OrderType::Market,
            side,
            amount,
            price,
            hidden: false,
            contingent: false,
            commission: 0.0,
            swap: 0.0,
        }
    }

    /// Returns whether the order represents live filled exposure.
    #[must_use]
    pub fn is_filled_exposure(&self) -> bool {
        self.order_type == OrderType::Market
    }
}

/// A two-sided net position as reported by the account info source.
///
/// Net accounts carry at most one position per symbol; both sides are kept so
/// a partially hedged transition never loses information.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// The symbol the position is held on.
    pub symbol: Ustr,
    /// The long side volume in base units.
    pub long_amount: f64,
    /// The long side volume-weighted average price.
    pub long_price: f64,
    /// The short side volume in base units.
    pub short_amount: f64,
    /// The short side volume-weighted average price.
    pub short_price: f64,
    /// Commission already charged against the position.
    #[serde(default)]
    pub commission: f64,
    /// Swap already accrued against the position.
    #[serde(default)]
    pub swap: f64,
}

impl Position {
    /// Creates a new one-sided [`Position`].
    #[must_use]
    pub fn new(symbol: &str, side: OrderSide, amount: f64, price: f64) -> Self {
        let (long_amount, long_price, short_amount, short_price) = match side {
            OrderSide::Buy => (amount, price, 0.0, 0.0),
            OrderSide::Sell => (0.0, 0.0, amount, price),
        };
        Self {
            symbol: Ustr::from(symbol),
            long_amount,
            long_price,
            short_amount,
            short_price,
            commission: 0.0,
            swap: 0.0,
        }
    }

    /// Returns whether both sides are flat.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.long_amount == 0.0 && self.short_amount == 0.0
    }
}

/// The account-level snapshot consumed by the calculators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// The account balance in the deposit currency.
    pub balance: f64,
    /// The account leverage.
    pub leverage: f64,
    /// The deposit currency code.
    pub currency: Ustr,
    /// The accounting mode.
    pub accounting: AccountingMode,
}

impl AccountSnapshot {
    /// Creates a new [`AccountSnapshot`] instance.
    #[must_use]
    pub fn new(balance: f64, leverage: f64, currency: &str, accounting: AccountingMode) -> Self {
        Self {
            balance,
            leverage,
            currency: Ustr::from(currency),
            accounting,
        }
    }
}
