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

//! Per account-symbol netting of orders and positions.
//!
//! Every mutation recomputes only the touched entity and emits a
//! [`StatsChange`] delta for the account aggregator; the whole symbol is
//! recomputed only when the backing calculator itself was rebuilt.

use std::ops::{Add, AddAssign};

use ahash::AHashMap;
use ustr::Ustr;

use crate::{
    conversion::UsageGuard,
    enums::{AccountingMode, OrderSide},
    errors::CalcError,
    orders::{Order, Position},
    registry::CalculatorRef,
};

/// A delta of a netting's contribution to the account totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsChange {
    /// The change in margin contribution.
    pub margin: f64,
    /// The change in profit contribution.
    pub profit: f64,
    /// The change in the number of entities in error.
    pub errors: i64,
}

impl Add for StatsChange {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            margin: self.margin + rhs.margin,
            profit: self.profit + rhs.profit,
            errors: self.errors + rhs.errors,
        }
    }
}

impl AddAssign for StatsChange {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// The computed contribution of one order or position.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityStats {
    /// The margin requirement on the buy side.
    pub buy_margin: f64,
    /// The margin requirement on the sell side.
    pub sell_margin: f64,
    /// The unrealized profit.
    pub profit: f64,
    /// 1 when the entity is in error, else 0.
    pub errors: i64,
    /// The worst error observed while computing the entity.
    pub error: CalcError,
}

/// Aggregates all orders and positions of one account on one symbol into a
/// single margin/profit/error contribution.
///
/// Holds a usage token on the calculator's conversion formulas for its whole
/// lifetime, so live exposure keeps the conversions warm. Becomes eligible
/// for disposal when no orders or positions remain.
#[derive(Debug)]
pub struct SymbolNetting {
    /// The symbol this netting aggregates.
    pub symbol: Ustr,
    accounting: AccountingMode,
    calculator: CalculatorRef,
    _usage: UsageGuard,
    orders: AHashMap<u64, (Order, EntityStats)>,
    position: Option<(Position, EntityStats)>,
    buy_margin: f64,
    sell_margin: f64,
    profit: f64,
    errors: i64,
}

impl SymbolNetting {
    /// Creates a new empty [`SymbolNetting`] instance.
    #[must_use]
    pub fn new(symbol: Ustr, accounting: AccountingMode, calculator: CalculatorRef) -> Self {
        let usage = calculator.borrow().usage();
        Self {
            symbol,
            accounting,
            calculator,
            _usage: usage,
            orders: AHashMap::new(),
            position: None,
            buy_margin: 0.0,
            sell_margin: 0.0,
            profit: 0.0,
            errors: 0,
        }
    }

    /// The netting's margin contribution to the account.
    ///
    /// Gross accounting margins the hedged sides independently and takes
    /// the larger; net accounting offsets them.
    #[must_use]
    pub fn margin_contribution(&self) -> f64 {
        match self.accounting {
            AccountingMode::Gross => self.buy_margin.max(self.sell_margin),
            AccountingMode::Net => (self.buy_margin - self.sell_margin).abs(),
        }
    }

    /// The netting's profit contribution to the account.
    #[must_use]
    pub const fn profit(&self) -> f64 {
        self.profit
    }

    /// The number of entities currently in error.
    #[must_use]
    pub const fn errors(&self) -> i64 {
        self.errors
    }

    /// The raw buy-side margin total.
    #[must_use]
    pub const fn buy_margin(&self) -> f64 {
        self.buy_margin
    }

    /// The raw sell-side margin total.
    #[must_use]
    pub const fn sell_margin(&self) -> f64 {
        self.sell_margin
    }

    /// Returns whether the netting holds no orders or positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty() && self.position.is_none()
    }

    /// Returns the worst error across all entities.
    #[must_use]
    pub fn worst_error(&self) -> CalcError {
        let mut worst = CalcError::None;
        for (_, stats) in self.orders.values() {
            worst = worst.worst(stats.error);
        }
        if let Some((_, stats)) = &self.position {
            worst = worst.worst(stats.error);
        }
        worst
    }

    /// Returns the computed stats of an order, if present.
    #[must_use]
    pub fn order_stats(&self, order_id: u64) -> Option<&EntityStats> {
        self.orders.get(&order_id).map(|(_, stats)| stats)
    }

    /// Returns the computed stats of the position, if present.
    #[must_use]
    pub fn position_stats(&self) -> Option<&EntityStats> {
        self.position.as_ref().map(|(_, stats)| stats)
    }

    /// Iterates the orders held by the netting.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().map(|(order, _)| order)
    }

    /// Returns the position held by the netting, if any.
    #[must_use]
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref().map(|(position, _)| position)
    }

    /// Adds (or replaces) an order and returns the contribution delta.
    pub fn upsert_order(&mut self, order: Order, leverage: f64) -> StatsChange {
        let before = self.contribution();
        if let Some((_, old)) = self.orders.remove(&order.id) {
            self.subtract(&old);
        }
        let stats = self.compute_order(&order, leverage);
        self.accumulate(&stats);
        self.orders.insert(order.id, (order, stats));
        self.delta(before)
    }

    /// Removes an order and returns the contribution delta.
    pub fn remove_order(&mut self, order_id: u64) -> StatsChange {
        let before = self.contribution();
        if let Some((_, old)) = self.orders.remove(&order_id) {
            self.subtract(&old);
        }
        self.delta(before)
    }

    /// Replaces the position (clearing it when empty) and returns the
    /// contribution delta.
    pub fn update_position(&mut self, position: Position, leverage: f64) -> StatsChange {
        let before = self.contribution();
        if let Some((_, old)) = self.position.take() {
            self.subtract(&old);
        }
        if !position.is_empty() {
            let stats = self.compute_position(&position, leverage);
            self.accumulate(&stats);
            self.position = Some((position, stats));
        }
        self.delta(before)
    }

    /// Recomputes every entity from current quotes and configuration.
    ///
    /// Called after the backing calculator was rebuilt by a registry
    /// re-initialization, or when a quote batch touched this symbol.
    pub fn refresh(&mut self, leverage: f64) -> StatsChange {
        let before = self.contribution();
        self.buy_margin = 0.0;
        self.sell_margin = 0.0;
        self.profit = 0.0;
        self.errors = 0;

        let orders: Vec<Order> = self.orders.values().map(|(order, _)| *order).collect();
        for order in orders {
            let stats = self.compute_order(&order, leverage);
            self.accumulate(&stats);
            self.orders.insert(order.id, (order, stats));
        }
        if let Some((position, _)) = self.position {
            let stats = self.compute_position(&position, leverage);
            self.accumulate(&stats);
            self.position = Some((position, stats));
        }
        self.delta(before)
    }

    fn compute_order(&self, order: &Order, leverage: f64) -> EntityStats {
        let calculator = self.calculator.borrow();
        let mut stats = EntityStats::default();
        let (margin, margin_error) = calculator.margin(
            order.amount,
            leverage,
            order.order_type,
            order.hidden,
            order.contingent,
        );
        match order.side {
            OrderSide::Buy => stats.buy_margin = margin,
            OrderSide::Sell => stats.sell_margin = margin,
        }
        stats.error = margin_error;
        if order.is_filled_exposure() {
            let profit = calculator.profit(order.price, order.amount, order.side, None);
            stats.profit = profit.profit;
            stats.error = stats.error.worst(profit.error);
        }
        stats.errors = i64::from(stats.error.is_error());
        stats
    }

    fn compute_position(&self, position: &Position, leverage: f64) -> EntityStats {
        let calculator = self.calculator.borrow();
        let mut stats = EntityStats::default();

        let (buy_margin, buy_error) = calculator.margin(
            position.long_amount,
            leverage,
            crate::enums::OrderType::Market,
            false,
            false,
        );
        let (sell_margin, sell_error) = calculator.margin(
            position.short_amount,
            leverage,
            crate::enums::OrderType::Market,
            false,
            false,
        );
        stats.buy_margin = buy_margin;
        stats.sell_margin = sell_margin;
        stats.error = buy_error.worst(sell_error);

        if position.long_amount > 0.0 {
            let profit = calculator.profit(
                position.long_price,
                position.long_amount,
                OrderSide::Buy,
                None,
            );
            stats.profit += profit.profit;
            stats.error = stats.error.worst(profit.error);
        }
        if position.short_amount > 0.0 {
            let profit = calculator.profit(
                position.short_price,
                position.short_amount,
                OrderSide::Sell,
                None,
            );
            stats.profit += profit.profit;
            stats.error = stats.error.worst(profit.error);
        }
        stats.errors = i64::from(stats.error.is_error());
        stats
    }

    fn accumulate(&mut self, stats: &EntityStats) {
        self.buy_margin += stats.buy_margin;
        self.sell_margin += stats.sell_margin;
        self.profit += stats.profit;
        self.errors += stats.errors;
    }

    fn subtract(&mut self, stats: &EntityStats) {
        self.buy_margin -= stats.buy_margin;
        self.sell_margin -= stats.sell_margin;
        self.profit -= stats.profit;
        self.errors -= stats.errors;
    }

    fn contribution(&self) -> (f64, f64, i64) {
        (self.margin_contribution(), self.profit, self.errors)
    }

    fn delta(&self, before: (f64, f64, i64)) -> StatsChange {
        StatsChange {
            margin: self.margin_contribution() - before.0,
            profit: self.profit - before.1,
            errors: self.errors - before.2,
        }
    }
}
