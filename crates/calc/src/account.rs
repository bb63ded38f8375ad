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

//! The margin account calculator.
//!
//! Aggregates per-symbol nettings into account-level margin, profit, equity
//! and status, and answers admission-control checks for new orders.

use ahash::AHashMap;
use indexmap::IndexMap;
use ustr::Ustr;

use crate::{
    enums::{AccountingMode, CalcStatus, ConversionKind, OrderSide},
    errors::{CalcError, EngineError},
    netting::{StatsChange, SymbolNetting},
    orders::{AccountSnapshot, Order, Position},
    registry::RegistryRef,
    rounding::round_to_precision,
};

/// One per-currency entry of the account asset snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountAsset {
    /// The exposure currency.
    pub currency: Ustr,
    /// The signed exposure in the native currency.
    pub amount: f64,
    /// The exposure converted to the deposit currency and rounded to its
    /// precision (zero on error).
    pub deposit_value: f64,
    /// The conversion error, if any.
    pub error: CalcError,
}

#[derive(Debug, Clone, Copy)]
struct OrderEntry {
    symbol: Ustr,
    commission: f64,
    swap: f64,
}

/// Aggregates all open orders and positions of one margin account.
///
/// Margin and profit are maintained incrementally from netting deltas;
/// commission and swap accumulate directly from order and position fields.
/// The worst error is cached and rescanned only when the aggregate error
/// count crosses zero or a netting in error improves.
#[derive(Debug)]
pub struct MarginAccountCalculator {
    registry: RegistryRef,
    snapshot: Option<AccountSnapshot>,
    nettings: IndexMap<Ustr, SymbolNetting>,
    order_index: AHashMap<u64, OrderEntry>,
    position_charges: AHashMap<Ustr, (f64, f64)>,
    margin: f64,
    profit: f64,
    commission: f64,
    swap: f64,
    error_count: i64,
    worst_error: CalcError,
}

impl MarginAccountCalculator {
    /// Creates a new empty [`MarginAccountCalculator`] instance.
    #[must_use]
    pub fn new(registry: RegistryRef) -> Self {
        Self {
            registry,
            snapshot: None,
            nettings: IndexMap::new(),
            order_index: AHashMap::new(),
            position_charges: AHashMap::new(),
            margin: 0.0,
            profit: 0.0,
            commission: 0.0,
            swap: 0.0,
            error_count: 0,
            worst_error: CalcError::None,
        }
    }

    /// Applies the account snapshot.
    ///
    /// Must precede any order or position update. Changing the deposit
    /// currency or the accounting mode rebuilds every netting against the
    /// new calculators.
    pub fn apply_snapshot(&mut self, snapshot: AccountSnapshot) {
        let rebuild = self.snapshot.is_some_and(|previous| {
            previous.currency != snapshot.currency || previous.accounting != snapshot.accounting
        });
        self.snapshot = Some(snapshot);
        if rebuild {
            log::info!(
                "Rebuilding account nettings for deposit currency '{}'",
                snapshot.currency
            );
            self.rebuild_nettings();
        }
    }

    /// Adds an open order.
    pub fn add_order(&mut self, order: Order) {
        if self.snapshot.is_none() {
            log::error!("Ignoring order {} before account snapshot", order.id);
            return;
        }
        self.commission += order.commission;
        self.swap += order.swap;
        self.order_index.insert(
            order.id,
            OrderEntry {
                symbol: order.symbol,
                commission: order.commission,
                swap: order.swap,
            },
        );
        self.route_order(order);
    }

    /// Adds a batch of open orders.
    pub fn add_orders<I: IntoIterator<Item = Order>>(&mut self, orders: I) {
        for order in orders {
            self.add_order(order);
        }
    }

    /// Applies a change to an open order (falls back to an add when the
    /// order is unknown).
    ///
    /// An order moving to a different symbol leaves its old netting before
    /// joining the new one.
    pub fn update_order(&mut self, order: Order) {
        let Some(entry) = self.order_index.get_mut(&order.id) else {
            self.add_order(order);
            return;
        };
        self.commission += order.commission - entry.commission;
        self.swap += order.swap - entry.swap;
        entry.commission = order.commission;
        entry.swap = order.swap;
        let previous_symbol = entry.symbol;
        entry.symbol = order.symbol;
        if previous_symbol != order.symbol
            && let Some(netting) = self.nettings.get_mut(&previous_symbol)
        {
            let change = netting.remove_order(order.id);
            let observed = netting.worst_error();
            let empty = netting.is_empty();
            self.apply_change(change, observed);
            if empty {
                self.nettings.shift_remove(&previous_symbol);
            }
        }
        self.route_order(order);
    }

    /// Removes an open order, disposing the netting when it empties.
    pub fn remove_order(&mut self, order_id: u64) {
        let Some(entry) = self.order_index.remove(&order_id) else {
            return;
        };
        self.commission -= entry.commission;
        self.swap -= entry.swap;
        if let Some(netting) = self.nettings.get_mut(&entry.symbol) {
            let change = netting.remove_order(order_id);
            let observed = netting.worst_error();
            let empty = netting.is_empty();
            self.apply_change(change, observed);
            if empty {
                self.nettings.shift_remove(&entry.symbol);
            }
        }
    }

    /// Replaces the position on the given symbol (an empty position clears
    /// it).
    pub fn update_position(&mut self, position: Position) {
        if self.snapshot.is_none() {
            log::error!(
                "Ignoring position on '{}' before account snapshot",
                position.symbol
            );
            return;
        }
        let symbol = position.symbol;
        let (previous_commission, previous_swap) = self
            .position_charges
            .get(&symbol)
            .copied()
            .unwrap_or((0.0, 0.0));
        if position.is_empty() {
            self.position_charges.remove(&symbol);
            self.commission -= previous_commission;
            self.swap -= previous_swap;
        } else {
            self.position_charges
                .insert(symbol, (position.commission, position.swap));
            self.commission += position.commission - previous_commission;
            self.swap += position.swap - previous_swap;
        }
        self.route_position(position);
    }

    /// Clears the position on the given symbol.
    pub fn clear_position(&mut self, symbol: Ustr) {
        self.update_position(Position {
            symbol,
            long_amount: 0.0,
            long_price: 0.0,
            short_amount: 0.0,
            short_price: 0.0,
            commission: 0.0,
            swap: 0.0,
        });
    }

    /// Recomputes the nettings of the given symbols from current quotes.
    pub fn refresh_symbols(&mut self, symbols: &[Ustr]) {
        let leverage = self.leverage();
        for symbol in symbols {
            if let Some(netting) = self.nettings.get_mut(symbol) {
                let change = netting.refresh(leverage);
                let observed = netting.worst_error();
                self.apply_change(change, observed);
            }
        }
    }

    /// Recomputes every netting, after a market re-initialization.
    pub fn refresh_all(&mut self) {
        let leverage = self.leverage();
        let mut total = StatsChange::default();
        for netting in self.nettings.values_mut() {
            total += netting.refresh(leverage);
        }
        self.margin += total.margin;
        self.profit += total.profit;
        self.error_count += total.errors;
        self.rescan_worst_error();
    }

    /// The account margin in the deposit currency.
    #[must_use]
    pub const fn margin(&self) -> f64 {
        self.margin
    }

    /// The unrealized profit in the deposit currency.
    #[must_use]
    pub const fn profit(&self) -> f64 {
        self.profit
    }

    /// The accumulated commission in the deposit currency.
    #[must_use]
    pub const fn commission(&self) -> f64 {
        self.commission
    }

    /// The accumulated swap in the deposit currency.
    #[must_use]
    pub const fn swap(&self) -> f64 {
        self.swap
    }

    /// The account balance from the last snapshot.
    #[must_use]
    pub fn balance(&self) -> f64 {
        self.snapshot.map_or(0.0, |snapshot| snapshot.balance)
    }

    /// Equity is balance plus profit, commission and swap.
    #[must_use]
    pub fn equity(&self) -> f64 {
        self.balance() + self.profit + self.commission + self.swap
    }

    /// The equity-to-margin ratio (zero with no margin in use).
    #[must_use]
    pub fn margin_level(&self) -> f64 {
        if self.margin > 0.0 {
            self.equity() / self.margin
        } else {
            0.0
        }
    }

    /// Equity not reserved as margin.
    #[must_use]
    pub fn free_margin(&self) -> f64 {
        self.equity() - self.margin
    }

    /// Holds iff the aggregate error count is non-positive.
    #[must_use]
    pub const fn is_calculated(&self) -> bool {
        self.error_count <= 0
    }

    /// The cached worst error across all nettings.
    #[must_use]
    pub const fn worst_error(&self) -> CalcError {
        self.worst_error
    }

    /// The overall calculation status.
    #[must_use]
    pub fn status(&self) -> CalcStatus {
        if self.snapshot.is_none() {
            return CalcStatus::NotCalculated;
        }
        match self.worst_error {
            CalcError::None => CalcStatus::Calculated,
            CalcError::OffQuotes { .. } => CalcStatus::CalculatedWithErrors,
            CalcError::Misconfiguration { .. } => CalcStatus::Misconfiguration,
        }
    }

    /// Returns the netting for a symbol, if any exposure exists.
    #[must_use]
    pub fn netting(&self, symbol: Ustr) -> Option<&SymbolNetting> {
        self.nettings.get(&symbol)
    }

    /// Decides whether the account can take on `delta` more margin on the
    /// given symbol and side.
    ///
    /// A shrinking total margin is always accepted; otherwise the post-trade
    /// account margin must stay strictly under equity.
    #[must_use]
    pub fn can_increase_margin_by(&self, symbol: Ustr, side: OrderSide, delta: f64) -> bool {
        let Some(snapshot) = self.snapshot else {
            return false;
        };
        let (current, proposed) = match self.nettings.get(&symbol) {
            None => (0.0, delta),
            Some(netting) => {
                let buy = netting.buy_margin();
                let sell = netting.sell_margin();
                let proposed = match snapshot.accounting {
                    AccountingMode::Gross => match side {
                        OrderSide::Buy => sell.max(buy + delta),
                        OrderSide::Sell => (sell + delta).max(buy),
                    },
                    AccountingMode::Net => {
                        let (same, opposite) = match side {
                            OrderSide::Buy => (buy, sell),
                            OrderSide::Sell => (sell, buy),
                        };
                        if same != 0.0 {
                            same + delta
                        } else if opposite != 0.0 {
                            // a reducing trade shrinks net margin, a
                            // reversing trade flips it
                            (opposite - delta).abs()
                        } else {
                            delta
                        }
                    }
                };
                (netting.margin_contribution(), proposed)
            }
        };
        let increment = proposed - current;
        increment <= 0.0 || self.margin + increment < self.equity()
    }

    /// Checks whether a new order could open right now.
    ///
    /// Validates the symbol, the opening quote and the margin sufficiency,
    /// holding a scoped usage token over the conversions for the duration
    /// of the check.
    pub fn can_open_order(&mut self, order: &Order) -> Result<(), EngineError> {
        let Some(snapshot) = self.snapshot else {
            return Err(EngineError::Misconfiguration(
                "account snapshot not applied".to_string(),
            ));
        };
        if self.registry.borrow().symbol(order.symbol).is_none() {
            return Err(EngineError::SymbolNotFound(order.symbol));
        }
        let calculator = self
            .registry
            .borrow_mut()
            .calculator(order.symbol, snapshot.currency);
        let calculator = calculator.borrow();
        let _usage = calculator.usage();

        calculator
            .check_order_open_price(order.side)
            .map_err(boundary)?;
        let (delta, error) = calculator.margin(
            order.amount,
            snapshot.leverage,
            order.order_type,
            order.hidden,
            order.contingent,
        );
        if error.is_error() {
            return Err(boundary(error));
        }
        if self.can_increase_margin_by(order.symbol, order.side, delta) {
            Ok(())
        } else {
            Err(EngineError::NotEnoughMoney {
                required: delta,
                equity: self.equity(),
            })
        }
    }

    /// Builds the per-currency asset snapshot.
    ///
    /// Filled exposure contributes its net amount in the margin currency and
    /// the opposite notional in the profit currency; the deposit currency
    /// receives a synthetic exposure of free margin times leverage. Each
    /// exposure converts to the deposit currency by its sign and rounds to
    /// the deposit currency precision; zero exposures are pruned. A failed
    /// conversion reports a zero deposit value alongside its error.
    #[must_use]
    pub fn assets(&self) -> Vec<AccountAsset> {
        let Some(snapshot) = self.snapshot else {
            return Vec::new();
        };
        let mut exposures: IndexMap<Ustr, f64> = IndexMap::new();
        let mut registry = self.registry.borrow_mut();
        for netting in self.nettings.values() {
            let Some(info) = registry.symbol(netting.symbol).copied() else {
                continue;
            };
            let mut net_amount = 0.0;
            let mut notional = 0.0;
            for order in netting.orders() {
                if !order.is_filled_exposure() {
                    continue;
                }
                let signed = match order.side {
                    OrderSide::Buy => order.amount,
                    OrderSide::Sell => -order.amount,
                };
                net_amount += signed;
                notional += signed * order.price;
            }
            if let Some(position) = netting.position() {
                net_amount += position.long_amount - position.short_amount;
                notional += position.long_amount * position.long_price
                    - position.short_amount * position.short_price;
            }
            if net_amount != 0.0 {
                *exposures.entry(info.margin_currency).or_insert(0.0) += net_amount;
                *exposures.entry(info.profit_currency).or_insert(0.0) -= notional;
            }
        }
        *exposures.entry(snapshot.currency).or_insert(0.0) +=
            self.free_margin() * snapshot.leverage;

        let precision = registry.currency_precision(snapshot.currency);
        let mut assets = Vec::new();
        for (currency, amount) in exposures {
            if amount == 0.0 {
                continue;
            }
            let kind = if amount >= 0.0 {
                ConversionKind::PositiveProfit
            } else {
                ConversionKind::NegativeProfit
            };
            let formula = registry.formula(currency, snapshot.currency, kind);
            let (deposit_value, error) = match formula.borrow().value() {
                Ok(rate) => (round_to_precision(amount * rate, precision), CalcError::None),
                Err(error) => (0.0, error),
            };
            assets.push(AccountAsset {
                currency,
                amount,
                deposit_value,
                error,
            });
        }
        assets
    }

    fn leverage(&self) -> f64 {
        self.snapshot.map_or(1.0, |snapshot| snapshot.leverage)
    }

    fn netting_mut(&mut self, symbol: Ustr) -> Option<&mut SymbolNetting> {
        let snapshot = self.snapshot?;
        if !self.nettings.contains_key(&symbol) {
            let calculator = self
                .registry
                .borrow_mut()
                .calculator(symbol, snapshot.currency);
            self.nettings.insert(
                symbol,
                SymbolNetting::new(symbol, snapshot.accounting, calculator),
            );
        }
        self.nettings.get_mut(&symbol)
    }

    fn route_order(&mut self, order: Order) {
        let leverage = self.leverage();
        let result = self.netting_mut(order.symbol).map(|netting| {
            let change = netting.upsert_order(order, leverage);
            (change, netting.worst_error())
        });
        if let Some((change, observed)) = result {
            self.apply_change(change, observed);
        }
    }

    fn route_position(&mut self, position: Position) {
        let leverage = self.leverage();
        let symbol = position.symbol;
        let result = self.netting_mut(symbol).map(|netting| {
            let change = netting.update_position(position, leverage);
            (change, netting.worst_error(), netting.is_empty())
        });
        if let Some((change, observed, empty)) = result {
            self.apply_change(change, observed);
            if empty {
                self.nettings.shift_remove(&symbol);
            }
        }
    }

    fn apply_change(&mut self, change: StatsChange, observed: CalcError) {
        self.margin += change.margin;
        self.profit += change.profit;
        self.error_count += change.errors;
        if self.error_count <= 0 {
            self.worst_error = CalcError::None;
        } else if observed.severity() >= self.worst_error.severity() {
            self.worst_error = observed;
        } else if change.errors < 0 {
            // the cleared error may have been the cached worst
            self.rescan_worst_error();
        }
    }

    fn rescan_worst_error(&mut self) {
        if self.error_count <= 0 {
            self.worst_error = CalcError::None;
            return;
        }
        self.worst_error = self
            .nettings
            .values()
            .fold(CalcError::None, |worst, netting| {
                worst.worst(netting.worst_error())
            });
    }

    fn rebuild_nettings(&mut self) {
        let mut orders = Vec::new();
        let mut positions = Vec::new();
        for netting in self.nettings.values() {
            orders.extend(netting.orders().copied());
            if let Some(position) = netting.position() {
                positions.push(*position);
            }
        }
        self.nettings.clear();
        self.margin = 0.0;
        self.profit = 0.0;
        self.error_count = 0;
        self.worst_error = CalcError::None;
        for order in orders {
            self.route_order(order);
        }
        for position in positions {
            self.route_position(position);
        }
    }
}

fn boundary(error: CalcError) -> EngineError {
    error
        .into_engine_error()
        .unwrap_or_else(|| EngineError::Misconfiguration("calculation failed".to_string()))
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use rstest::rstest;
    use ustr::Ustr;

    use super::*;
    use crate::{
        enums::OrderType,
        registry::{MarketRegistry, RegistryUsagePolicy},
        stubs::{test_currencies, test_registry, test_symbols},
    };

    fn account(accounting: AccountingMode) -> MarginAccountCalculator {
        let registry = Rc::new(RefCell::new(test_registry()));
        let mut account = MarginAccountCalculator::new(registry);
        account.apply_snapshot(AccountSnapshot::new(10_000.0, 100.0, "USD", accounting));
        account
    }

    #[rstest]
    fn test_empty_account_is_not_calculated_until_snapshot() {
        let registry = Rc::new(RefCell::new(test_registry()));
        let account = MarginAccountCalculator::new(registry);
        assert_eq!(account.status(), CalcStatus::NotCalculated);
        assert_eq!(account.equity(), 0.0);
        assert_eq!(account.margin_level(), 0.0);
    }

    #[rstest]
    fn test_equity_and_margin_level() {
        let mut account = account(AccountingMode::Gross);
        account.add_order(Order::market(1, "EURUSD", OrderSide::Buy, 100_000.0, 1.1000));

        let margin = 10.0 * 1.1050;
        assert!((account.margin() - margin).abs() < 1e-9);
        assert!((account.profit() - 480.0).abs() < 1e-9);
        assert!((account.equity() - 10_480.0).abs() < 1e-9);
        assert!((account.margin_level() - 10_480.0 / margin).abs() < 1e-9);
        assert!((account.free_margin() - (10_480.0 - margin)).abs() < 1e-9);
        assert_eq!(account.status(), CalcStatus::Calculated);
        assert!(account.is_calculated());
    }

    #[rstest]
    fn test_commission_and_swap_accumulate_from_fields() {
        let mut account = account(AccountingMode::Gross);
        let mut order = Order::market(1, "EURUSD", OrderSide::Buy, 100_000.0, 1.1000);
        order.commission = -7.0;
        order.swap = -1.5;
        account.add_order(order);
        assert_eq!(account.commission(), -7.0);
        assert_eq!(account.swap(), -1.5);
        assert!((account.equity() - (10_000.0 + 480.0 - 7.0 - 1.5)).abs() < 1e-9);

        order.swap = -3.0;
        account.update_order(order);
        assert_eq!(account.swap(), -3.0);

        account.remove_order(1);
        assert_eq!(account.commission(), 0.0);
        assert_eq!(account.swap(), 0.0);
        assert_eq!(account.margin(), 0.0);
        assert!(account.netting(Ustr::from("EURUSD")).is_none());
    }

    #[rstest]
    fn test_margin_conservation_across_sequences() {
        let mut account = account(AccountingMode::Gross);
        account.add_orders([
            Order::market(1, "EURUSD", OrderSide::Buy, 100_000.0, 1.1000),
            Order::market(2, "EURUSD", OrderSide::Sell, 40_000.0, 1.1030),
            Order::market(3, "USDJPY", OrderSide::Buy, 50_000.0, 154.50),
        ]);
        account.update_position(Position::new("XAUUSD", OrderSide::Buy, 10.0, 2600.0));
        account.remove_order(2);

        let incremental = account.margin();
        account.refresh_all();
        assert!((account.margin() - incremental).abs() < 1e-9);

        let netted: f64 = ["EURUSD", "USDJPY", "XAUUSD"]
            .iter()
            .filter_map(|symbol| account.netting(Ustr::from(symbol)))
            .map(SymbolNetting::margin_contribution)
            .sum();
        assert!((account.margin() - netted).abs() < 1e-9);
    }

    #[rstest]
    fn test_missing_quote_degrades_and_recovers() {
        let registry = Rc::new(RefCell::new(MarketRegistry::new(
            RegistryUsagePolicy::OnDemand,
        )));
        registry.borrow_mut().init(test_symbols(), test_currencies());
        let eurusd = Ustr::from("EURUSD");
        registry
            .borrow_mut()
            .update_rate(eurusd, Some(1.1048), Some(1.1050), false, false);

        let mut account = MarginAccountCalculator::new(registry.clone());
        account.apply_snapshot(AccountSnapshot::new(
            10_000.0,
            100.0,
            "USD",
            AccountingMode::Gross,
        ));
        // XAUUSD has no quote yet
        let xauusd = Ustr::from("XAUUSD");
        account.add_order(Order::market(1, "XAUUSD", OrderSide::Buy, 100.0, 2600.0));
        assert_eq!(account.status(), CalcStatus::CalculatedWithErrors);
        assert!(!account.is_calculated());
        assert!(account.worst_error().is_off_quotes());
        assert_eq!(account.margin(), 0.0);

        registry
            .borrow_mut()
            .update_rate(xauusd, Some(2650.0), Some(2650.5), false, false);
        account.refresh_symbols(&[xauusd]);
        assert_eq!(account.status(), CalcStatus::Calculated);
        assert!(account.margin() > 0.0);
    }

    #[rstest]
    fn test_can_increase_margin_gross_hedge_is_free() {
        let mut account = account(AccountingMode::Gross);
        account.add_order(Order::market(1, "EURUSD", OrderSide::Buy, 100_000.0, 1.1000));
        let eurusd = Ustr::from("EURUSD");
        // selling under the buy-side margin does not increase the max
        assert!(account.can_increase_margin_by(eurusd, OrderSide::Sell, 5.0));
        // an enormous increase on the buy side exceeds equity
        assert!(!account.can_increase_margin_by(eurusd, OrderSide::Buy, 1e9));
    }

    #[rstest]
    fn test_can_increase_margin_net_reversal() {
        let mut account = account(AccountingMode::Net);
        account.update_position(Position::new("EURUSD", OrderSide::Sell, 100_000.0, 1.1000));
        let eurusd = Ustr::from("EURUSD");
        let sell_margin = account.netting(eurusd).unwrap().sell_margin();
        // a buy offsetting half the short shrinks net margin
        assert!(account.can_increase_margin_by(eurusd, OrderSide::Buy, sell_margin / 2.0));
        // a buy reversing far beyond equity is rejected
        assert!(!account.can_increase_margin_by(
            eurusd,
            OrderSide::Buy,
            sell_margin + 1e9
        ));
    }

    #[rstest]
    fn test_can_open_order_accepts_and_rejects() {
        let mut account = account(AccountingMode::Gross);
        let order = Order::market(1, "EURUSD", OrderSide::Buy, 100_000.0, 1.1050);
        assert!(account.can_open_order(&order).is_ok());

        let mut poor = {
            let registry = Rc::new(RefCell::new(test_registry()));
            let mut account = MarginAccountCalculator::new(registry);
            account.apply_snapshot(AccountSnapshot::new(
                5.0,
                100.0,
                "USD",
                AccountingMode::Gross,
            ));
            account
        };
        assert!(matches!(
            poor.can_open_order(&order),
            Err(EngineError::NotEnoughMoney { .. })
        ));
    }

    #[rstest]
    fn test_can_open_order_unknown_symbol() {
        let mut account = account(AccountingMode::Gross);
        let order = Order::market(1, "GBPUSD", OrderSide::Buy, 100_000.0, 1.2500);
        assert!(matches!(
            account.can_open_order(&order),
            Err(EngineError::SymbolNotFound(_))
        ));
    }

    #[rstest]
    fn test_can_open_order_off_quotes() {
        let registry = Rc::new(RefCell::new(MarketRegistry::new(
            RegistryUsagePolicy::OnDemand,
        )));
        registry.borrow_mut().init(test_symbols(), test_currencies());
        let mut account = MarginAccountCalculator::new(registry);
        account.apply_snapshot(AccountSnapshot::new(
            10_000.0,
            100.0,
            "USD",
            AccountingMode::Gross,
        ));
        let order = Order::market(1, "EURUSD", OrderSide::Buy, 100_000.0, 1.1050);
        assert!(matches!(
            account.can_open_order(&order),
            Err(EngineError::OffQuotes { .. })
        ));
    }

    #[rstest]
    fn test_contingent_order_reserves_no_margin() {
        let mut account = account(AccountingMode::Gross);
        let mut order = Order::market(1, "EURUSD", OrderSide::Buy, 100_000.0, 1.1000);
        order.order_type = OrderType::Limit;
        order.contingent = true;
        account.add_order(order);
        assert_eq!(account.margin(), 0.0);
    }

    #[rstest]
    fn test_assets_snapshot() {
        let mut account = account(AccountingMode::Gross);
        account.add_order(Order::market(1, "EURUSD", OrderSide::Buy, 100_000.0, 1.1000));

        let assets = account.assets();
        assert_eq!(assets.len(), 2);

        let eur = assets
            .iter()
            .find(|asset| asset.currency.as_str() == "EUR")
            .unwrap();
        assert_eq!(eur.amount, 100_000.0);
        assert!(eur.error.is_none());
        // positive EUR exposure sells at the bid
        assert!((eur.deposit_value - 110_480.0).abs() < 0.01);

        let usd = assets
            .iter()
            .find(|asset| asset.currency.as_str() == "USD")
            .unwrap();
        // -notional plus free margin times leverage, identity conversion
        let free = account.free_margin();
        assert!((usd.amount - (-110_000.0 + free * 100.0)).abs() < 1e-6);
        assert!((usd.deposit_value - usd.amount).abs() < 0.01);
    }

    #[rstest]
    fn test_assets_carries_conversion_error() {
        let registry = Rc::new(RefCell::new(MarketRegistry::new(
            RegistryUsagePolicy::OnDemand,
        )));
        registry.borrow_mut().init(test_symbols(), test_currencies());
        let mut account = MarginAccountCalculator::new(registry);
        account.apply_snapshot(AccountSnapshot::new(
            10_000.0,
            100.0,
            "USD",
            AccountingMode::Gross,
        ));
        // no EURUSD quote at all
        account.add_order(Order::market(1, "EURUSD", OrderSide::Buy, 100_000.0, 1.1000));

        let assets = account.assets();
        let eur = assets
            .iter()
            .find(|asset| asset.currency.as_str() == "EUR")
            .unwrap();
        assert_eq!(eur.amount, 100_000.0);
        assert_eq!(eur.deposit_value, 0.0);
        assert!(eur.error.is_off_quotes());

        // the deposit-currency exposure converts at identity regardless
        let usd = assets
            .iter()
            .find(|asset| asset.currency.as_str() == "USD")
            .unwrap();
        assert!(usd.error.is_none());
    }

    #[rstest]
    fn test_update_order_symbol_change_moves_netting() {
        let mut account = account(AccountingMode::Gross);
        let mut order = Order::market(1, "EURUSD", OrderSide::Buy, 100_000.0, 1.1000);
        account.add_order(order);
        assert!((account.margin() - 10.0 * 1.1050).abs() < 1e-9);

        order.symbol = Ustr::from("USDJPY");
        order.price = 154.50;
        account.update_order(order);

        assert!(account.netting(Ustr::from("EURUSD")).is_none());
        assert!(account.netting(Ustr::from("USDJPY")).is_some());
        // USDJPY margins in USD, converting at identity
        assert!((account.margin() - 10.0).abs() < 1e-9);

        account.remove_order(1);
        assert_eq!(account.margin(), 0.0);
        assert!(account.netting(Ustr::from("USDJPY")).is_none());
    }

    #[rstest]
    fn test_assets_prunes_offsetting_exposure() {
        let mut account = account(AccountingMode::Net);
        account.add_orders([
            Order::market(1, "EURUSD", OrderSide::Buy, 100_000.0, 1.1000),
            Order::market(2, "EURUSD", OrderSide::Sell, 100_000.0, 1.1000),
        ]);
        let assets = account.assets();
        // flat EUR exposure is pruned, only the deposit currency remains
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].currency.as_str(), "USD");
    }
}
