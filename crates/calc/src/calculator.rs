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

//! The per (symbol, deposit-currency) order and position calculator.
//!
//! Computes margin, profit, commission and swap for one instrument,
//! consuming the conversion resolver's formulas. All computation methods
//! return a value plus an out-of-band [`CalcError`] and never panic, since
//! they run once per tick on the hot path.

use chrono::{DateTime, Datelike, Utc, Weekday};

use ustr::Ustr;

use crate::{
    config::SymbolInfo,
    conversion::{FormulaRef, RateNodeRef, UsageGuard},
    enums::{CommissionChargeType, CommissionType, OrderSide, OrderType, QuoteSide, SwapType},
    errors::CalcError,
    orders::Position,
    rounding::point_size,
};

/// The initialization state of a calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcInitState {
    Uninitialized,
    Ready,
    ConfigError,
}

/// The result of a profit calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitCalc {
    /// The profit in the deposit currency (zero on error).
    pub profit: f64,
    /// The close price used (zero when no quote was available).
    pub close_price: f64,
    /// The conversion rate applied (zero on error).
    pub conversion_rate: f64,
    /// The calculation error, if any.
    pub error: CalcError,
}

impl ProfitCalc {
    fn error(error: CalcError) -> Self {
        Self {
            profit: 0.0,
            close_price: 0.0,
            conversion_rate: 0.0,
            error,
        }
    }
}

/// The result of a swap calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapCalc {
    /// The swap in the deposit currency (zero on error).
    pub swap: f64,
    /// The swap size interpretation of the instrument.
    pub swap_type: SwapType,
    /// The swap size selected for the exposure side.
    pub size: f64,
    /// The calculation error, if any.
    pub error: CalcError,
}

/// A computation unit bound to one (symbol, deposit currency) pair.
///
/// Cached by the registry for its whole lifetime and never duplicated for
/// the same key. `init` re-resolves the cached configuration after any
/// catalogue change; in the `ConfigError` state every computation method
/// short-circuits to the cached initialization error.
#[derive(Debug)]
pub struct OrderCalculator {
    /// The symbol this calculator computes for.
    pub symbol: Ustr,
    /// The account deposit currency amounts are converted into.
    pub deposit_currency: Ustr,
    node: RateNodeRef,
    margin_conversion: FormulaRef,
    profit_positive: FormulaRef,
    profit_negative: FormulaRef,
    info: Option<SymbolInfo>,
    state: CalcInitState,
    init_error: CalcError,
    factor_market: f64,
    factor_stop: f64,
    factor_hidden_limit: f64,
}

impl OrderCalculator {
    /// Creates a new uninitialized [`OrderCalculator`] instance.
    #[must_use]
    pub fn new(
        symbol: Ustr,
        deposit_currency: Ustr,
        node: RateNodeRef,
        margin_conversion: FormulaRef,
        profit_positive: FormulaRef,
        profit_negative: FormulaRef,
    ) -> Self {
        Self {
            symbol,
            deposit_currency,
            node,
            margin_conversion,
            profit_positive,
            profit_negative,
            info: None,
            state: CalcInitState::Uninitialized,
            init_error: CalcError::misconfiguration("calculator not initialized"),
            factor_market: 0.0,
            factor_stop: 0.0,
            factor_hidden_limit: 0.0,
        }
    }

    /// (Re)initializes the calculator from the current catalogue entry.
    ///
    /// Passing `None` means the symbol is unknown to the catalogue.
    pub fn init(&mut self, info: Option<&SymbolInfo>) {
        match info {
            None => {
                self.info = None;
                self.state = CalcInitState::ConfigError;
                self.init_error = self.node.borrow().no_symbol_error();
            }
            Some(info) if !info.has_currencies() => {
                self.info = None;
                self.state = CalcInitState::ConfigError;
                self.init_error = CalcError::misconfiguration(&format!(
                    "symbol '{}' has no margin/profit currency configured",
                    self.symbol
                ));
            }
            Some(info) => {
                self.factor_market = info.margin_factor;
                self.factor_stop = info.margin_factor * info.stop_order_margin_reduction;
                self.factor_hidden_limit =
                    info.margin_factor * info.hidden_limit_order_margin_reduction;
                self.info = Some(*info);
                self.state = CalcInitState::Ready;
                self.init_error = CalcError::None;
            }
        }
    }

    /// Replaces the calculator's conversion formulas.
    ///
    /// Called by the registry when a catalogue change resolves the symbol's
    /// currencies to different formulas. Outstanding usage guards keep
    /// holding (and eventually release) the formulas they were acquired on.
    pub fn rebind(
        &mut self,
        margin_conversion: FormulaRef,
        profit_positive: FormulaRef,
        profit_negative: FormulaRef,
    ) {
        self.margin_conversion = margin_conversion;
        self.profit_positive = profit_positive;
        self.profit_negative = profit_negative;
    }

    /// Returns the current initialization state.
    #[must_use]
    pub const fn state(&self) -> CalcInitState {
        self.state
    }

    /// Returns the cached initialization error (`None` variant when ready).
    #[must_use]
    pub const fn init_error(&self) -> CalcError {
        self.init_error
    }

    /// Acquires a scoped usage token over the three conversion formulas.
    ///
    /// One-off checks hold the token for the duration of the check so the
    /// formulas do not stay permanently subscribed.
    #[must_use]
    pub fn usage(&self) -> UsageGuard {
        UsageGuard::new(vec![
            self.margin_conversion.clone(),
            self.profit_positive.clone(),
            self.profit_negative.clone(),
        ])
    }

    /// Calculates the margin requirement for an order.
    ///
    /// Contingent orders reserve no margin. Stop and stop-limit orders apply
    /// the stop-order reduction, hidden limit orders the hidden-limit
    /// reduction. Leverage applies only to leverage-aware margin modes.
    #[must_use]
    pub fn margin(
        &self,
        volume: f64,
        leverage: f64,
        order_type: OrderType,
        hidden: bool,
        contingent: bool,
    ) -> (f64, CalcError) {
        let info = match &self.info {
            Some(info) => info,
            None => return (0.0, self.init_error),
        };
        if contingent || volume == 0.0 {
            return (0.0, CalcError::None);
        }
        let factor = if order_type.is_stop() {
            self.factor_stop
        } else if hidden && order_type == OrderType::Limit {
            self.factor_hidden_limit
        } else {
            self.factor_market
        };
        let leverage = if info.margin_mode.is_leverage_aware() && leverage > 0.0 {
            leverage
        } else {
            1.0
        };
        let raw = volume * factor / leverage;
        match self.margin_conversion.borrow().convert(raw) {
            Ok(margin) => (margin, CalcError::None),
            Err(error) => (0.0, error),
        }
    }

    /// Calculates the margin requirement of a two-sided net position.
    ///
    /// Sums the long-side and short-side contributions; if either side
    /// errors the whole result short-circuits to zero with that error.
    #[must_use]
    pub fn position_margin(&self, position: &Position, leverage: f64) -> (f64, CalcError) {
        let (long, error) =
            self.margin(position.long_amount, leverage, OrderType::Market, false, false);
        if error.is_error() {
            return (0.0, error);
        }
        let (short, error) =
            self.margin(position.short_amount, leverage, OrderType::Market, false, false);
        if error.is_error() {
            return (0.0, error);
        }
        (long + short, CalcError::None)
    }

    /// Calculates the unrealized profit of an open exposure.
    ///
    /// Without a fixed close price the current bid (closing a buy) or ask
    /// (closing a sell) is used; a missing quote on that side errors.
    #[must_use]
    pub fn profit(
        &self,
        open_price: f64,
        volume: f64,
        side: OrderSide,
        fixed_close_price: Option<f64>,
    ) -> ProfitCalc {
        if self.init_error.is_error() {
            return ProfitCalc::error(self.init_error);
        }
        let close_price = match fixed_close_price {
            Some(price) => price,
            None => {
                let close_side = match side {
                    OrderSide::Buy => QuoteSide::Bid,
                    OrderSide::Sell => QuoteSide::Ask,
                };
                match self.node.borrow().quote(close_side, false) {
                    Ok(price) => price,
                    Err(error) => return ProfitCalc::error(error),
                }
            }
        };
        let raw = match side {
            OrderSide::Buy => (close_price - open_price) * volume,
            OrderSide::Sell => (open_price - close_price) * volume,
        };
        match self.convert_profit(raw) {
            Ok((profit, conversion_rate)) => ProfitCalc {
                profit,
                close_price,
                conversion_rate,
                error: CalcError::None,
            },
            Err(error) => ProfitCalc {
                profit: 0.0,
                close_price,
                conversion_rate: 0.0,
                error,
            },
        }
    }

    /// Calculates the commission charge for a fill.
    ///
    /// A zero commission value is always zero and bypasses conversion.
    #[must_use]
    pub fn commission(
        &self,
        amount: f64,
        value: f64,
        commission_type: CommissionType,
        charge_type: CommissionChargeType,
    ) -> (f64, CalcError) {
        let info = match &self.info {
            Some(info) => info,
            None => return (0.0, self.init_error),
        };
        if value == 0.0 {
            return (0.0, CalcError::None);
        }
        let units = match charge_type {
            CommissionChargeType::PerTrade => 1.0,
            CommissionChargeType::PerLot => amount / info.contract_size,
        };
        match commission_type {
            // Absolute values are already deposit denominated
            CommissionType::Absolute => (-(units * value), CalcError::None),
            CommissionType::Percent => match self.margin_conversion.borrow().value() {
                Ok(margin_rate) => (-(amount * value * margin_rate / 100.0), CalcError::None),
                Err(error) => (0.0, error),
            },
            CommissionType::PerUnit => {
                let raw = -(units * value * point_size(info.precision));
                match self.convert_profit(raw) {
                    Ok((commission, _)) => (commission, CalcError::None),
                    Err(error) => (0.0, error),
                }
            }
        }
    }

    /// Calculates the swap accrued by an exposure at rollover.
    ///
    /// Weekend rollovers charge nothing; the configured triple-swap weekday
    /// charges three days at once.
    #[must_use]
    pub fn swap(&self, amount: f64, side: OrderSide, now: DateTime<Utc>) -> SwapCalc {
        let info = match &self.info {
            Some(info) => info,
            None => {
                return SwapCalc {
                    swap: 0.0,
                    swap_type: SwapType::Points,
                    size: 0.0,
                    error: self.init_error,
                };
            }
        };
        let size = match side {
            OrderSide::Buy => info.swap_size_long,
            OrderSide::Sell => info.swap_size_short,
        };
        let mut result = SwapCalc {
            swap: 0.0,
            swap_type: info.swap_type,
            size,
            error: CalcError::None,
        };
        if !info.swap_enabled || amount == 0.0 || size == 0.0 {
            return result;
        }
        let weekday = now.weekday();
        if matches!(weekday, Weekday::Sat | Weekday::Sun) {
            return result;
        }
        let days = if info.triple_swap_day == Some(weekday) {
            3.0
        } else {
            1.0
        };
        let converted = match info.swap_type {
            SwapType::Points => {
                let raw = amount * size * point_size(info.precision) * days;
                self.convert_profit(raw).map(|(swap, _)| swap)
            }
            SwapType::PercentPerYear => {
                let daily = size.signum() * ((1.0 + size.abs()).powf(1.0 / 365.0) - 1.0);
                let raw = amount * daily * days;
                self.margin_conversion.borrow().convert(raw)
            }
        };
        match converted {
            Ok(swap) => result.swap = swap,
            Err(error) => result.error = error,
        }
        result
    }

    /// Returns the price a new order on the given side would open at.
    ///
    /// Buy orders open at the ask, sell orders at the bid; an indicative
    /// tick on that side is rejected as off quotes.
    pub fn order_open_price(&self, side: OrderSide) -> Result<f64, CalcError> {
        if self.init_error.is_error() {
            return Err(self.init_error);
        }
        let quote_side = match side {
            OrderSide::Buy => QuoteSide::Ask,
            OrderSide::Sell => QuoteSide::Bid,
        };
        self.node.borrow().firm_quote(quote_side)
    }

    /// Validates that a new order on the given side could currently open.
    pub fn check_order_open_price(&self, side: OrderSide) -> Result<(), CalcError> {
        self.order_open_price(side).map(|_| ())
    }

    /// Converts a signed profit amount, picking the formula matching its sign.
    ///
    /// Returns the converted amount and the conversion rate applied.
    pub fn convert_profit(&self, raw: f64) -> Result<(f64, f64), CalcError> {
        let formula = if raw >= 0.0 {
            &self.profit_positive
        } else {
            &self.profit_negative
        };
        let rate = formula.borrow().value()?;
        Ok((raw * rate, rate))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;
    use crate::{
        config::SymbolInfo,
        conversion::ConversionFormula,
        enums::{ConversionKind, MarginMode},
        rates::SymbolRateNode,
    };

    fn identity(kind: ConversionKind) -> FormulaRef {
        Rc::new(RefCell::new(ConversionFormula::resolved(
            Ustr::from("USD"),
            Ustr::from("USD"),
            kind,
            vec![],
        )))
    }

    fn eurusd_info() -> SymbolInfo {
        let mut info =
            SymbolInfo::new("EURUSD", "EUR", "USD", 100_000.0, 5, 0.01, MarginMode::Forex);
        info.stop_order_margin_reduction = 0.5;
        info.hidden_limit_order_margin_reduction = 0.8;
        info
    }

    /// A calculator for EURUSD into a USD deposit account, with the margin
    /// conversion fixed at 1:1 so expected values stay exact.
    fn calculator() -> OrderCalculator {
        let node = Rc::new(RefCell::new(SymbolRateNode::new(Ustr::from("EURUSD"))));
        node.borrow_mut()
            .update(Some(1.1048), Some(1.1050), false, false);
        let mut calc = OrderCalculator::new(
            Ustr::from("EURUSD"),
            Ustr::from("USD"),
            node,
            identity(ConversionKind::Margin),
            identity(ConversionKind::PositiveProfit),
            identity(ConversionKind::NegativeProfit),
        );
        calc.init(Some(&eurusd_info()));
        calc
    }

    #[rstest]
    fn test_margin_scenario_a() {
        // 1.0 lot EURUSD, factor 0.01, leverage 100 -> 100000 * 0.01 / 100
        let calc = calculator();
        let (margin, error) = calc.margin(100_000.0, 100.0, OrderType::Market, false, false);
        assert!(error.is_none());
        assert_eq!(margin, 10.0);
    }

    #[rstest]
    fn test_margin_scenario_b_stop_reduction() {
        let calc = calculator();
        let (margin, error) = calc.margin(100_000.0, 100.0, OrderType::Stop, false, false);
        assert!(error.is_none());
        assert_eq!(margin, 5.0);
    }

    #[rstest]
    fn test_margin_hidden_limit_reduction() {
        let calc = calculator();
        let (market, _) = calc.margin(100_000.0, 100.0, OrderType::Market, false, false);
        let (hidden, _) = calc.margin(100_000.0, 100.0, OrderType::Limit, true, false);
        let (stop, _) = calc.margin(100_000.0, 100.0, OrderType::Stop, false, false);
        assert_eq!(hidden, 8.0);
        // reductions never increase margin
        assert!(stop <= market);
        assert!(hidden <= market);
    }

    #[rstest]
    fn test_margin_contingent_is_zero() {
        let calc = calculator();
        let (margin, error) = calc.margin(100_000.0, 100.0, OrderType::Limit, false, true);
        assert!(error.is_none());
        assert_eq!(margin, 0.0);
    }

    #[rstest]
    fn test_margin_ignores_leverage_for_cfd() {
        let node = Rc::new(RefCell::new(SymbolRateNode::new(Ustr::from("XAUUSD"))));
        let mut calc = OrderCalculator::new(
            Ustr::from("XAUUSD"),
            Ustr::from("USD"),
            node,
            identity(ConversionKind::Margin),
            identity(ConversionKind::PositiveProfit),
            identity(ConversionKind::NegativeProfit),
        );
        let info = SymbolInfo::new("XAUUSD", "XAU", "USD", 100.0, 2, 0.5, MarginMode::Cfd);
        calc.init(Some(&info));
        let (margin, error) = calc.margin(100.0, 100.0, OrderType::Market, false, false);
        assert!(error.is_none());
        assert_eq!(margin, 50.0);
    }

    #[rstest]
    fn test_profit_scenario_c() {
        // long 1.0 lot at 1.1000, bid 1.1048 -> (1.1048 - 1.1000) * 100000
        let calc = calculator();
        let result = calc.profit(1.1000, 100_000.0, OrderSide::Buy, None);
        assert!(result.error.is_none());
        assert_eq!(result.close_price, 1.1048);
        assert_eq!(result.conversion_rate, 1.0);
        assert!((result.profit - 480.0).abs() < 1e-9);
    }

    #[rstest]
    fn test_profit_sell_side_uses_ask() {
        let calc = calculator();
        let result = calc.profit(1.1100, 100_000.0, OrderSide::Sell, None);
        assert!(result.error.is_none());
        assert_eq!(result.close_price, 1.1050);
        assert!((result.profit - 500.0).abs() < 1e-9);
    }

    #[rstest]
    fn test_profit_fixed_close_price() {
        let calc = calculator();
        let result = calc.profit(1.1000, 100_000.0, OrderSide::Buy, Some(1.1100));
        assert!(result.error.is_none());
        assert!((result.profit - 1000.0).abs() < 1e-9);
    }

    #[rstest]
    fn test_profit_off_quotes() {
        let calc = calculator();
        // drop the quote entirely
        let node = Rc::new(RefCell::new(SymbolRateNode::new(Ustr::from("EURUSD"))));
        let mut calc2 = OrderCalculator::new(
            calc.symbol,
            calc.deposit_currency,
            node,
            identity(ConversionKind::Margin),
            identity(ConversionKind::PositiveProfit),
            identity(ConversionKind::NegativeProfit),
        );
        calc2.init(Some(&eurusd_info()));
        let result = calc2.profit(1.1000, 100_000.0, OrderSide::Buy, None);
        assert_eq!(result.profit, 0.0);
        assert!(result.error.is_off_quotes());
    }

    #[rstest]
    fn test_commission_zero_value_bypasses_conversion() {
        let calc = calculator();
        let (commission, error) = calc.commission(
            100_000.0,
            0.0,
            CommissionType::Percent,
            CommissionChargeType::PerLot,
        );
        assert!(error.is_none());
        assert_eq!(commission, 0.0);
    }

    #[rstest]
    fn test_commission_absolute_per_lot() {
        let calc = calculator();
        let (commission, error) = calc.commission(
            200_000.0,
            5.0,
            CommissionType::Absolute,
            CommissionChargeType::PerLot,
        );
        assert!(error.is_none());
        assert_eq!(commission, -10.0);
    }

    #[rstest]
    fn test_commission_percent_uses_margin_rate() {
        let calc = calculator();
        let (commission, error) = calc.commission(
            100_000.0,
            0.002,
            CommissionType::Percent,
            CommissionChargeType::PerTrade,
        );
        assert!(error.is_none());
        assert!((commission - -2.0).abs() < 1e-9);
    }

    #[rstest]
    fn test_commission_per_unit_scales_by_point() {
        let calc = calculator();
        let (commission, error) = calc.commission(
            100_000.0,
            3.0,
            CommissionType::PerUnit,
            CommissionChargeType::PerLot,
        );
        assert!(error.is_none());
        // 1 lot * 3 points * 0.00001
        assert!((commission - -0.00003).abs() < 1e-12);
    }

    fn swap_calculator(swap_type: SwapType, long: f64, short: f64) -> OrderCalculator {
        let node = Rc::new(RefCell::new(SymbolRateNode::new(Ustr::from("EURUSD"))));
        node.borrow_mut()
            .update(Some(1.1048), Some(1.1050), false, false);
        let mut info = eurusd_info();
        info.swap_enabled = true;
        info.swap_type = swap_type;
        info.swap_size_long = long;
        info.swap_size_short = short;
        info.triple_swap_day = Some(Weekday::Wed);
        let mut calc = OrderCalculator::new(
            Ustr::from("EURUSD"),
            Ustr::from("USD"),
            node,
            identity(ConversionKind::Margin),
            identity(ConversionKind::PositiveProfit),
            identity(ConversionKind::NegativeProfit),
        );
        calc.init(Some(&info));
        calc
    }

    #[rstest]
    fn test_swap_scenario_e_triple_day_and_weekend() {
        let calc = swap_calculator(SwapType::PercentPerYear, 0.05, -0.03);
        // 2025-01-01 is a Wednesday, 2025-01-04 a Saturday, 2025-01-02 a Thursday
        let wednesday = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let thursday = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let saturday = Utc.with_ymd_and_hms(2025, 1, 4, 0, 0, 0).unwrap();

        let single = calc.swap(100_000.0, OrderSide::Buy, thursday);
        let triple = calc.swap(100_000.0, OrderSide::Buy, wednesday);
        let weekend = calc.swap(100_000.0, OrderSide::Buy, saturday);

        assert!(single.error.is_none());
        let daily = 1.05f64.powf(1.0 / 365.0) - 1.0;
        assert!((single.swap - 100_000.0 * daily).abs() < 1e-9);
        assert!((triple.swap - 3.0 * single.swap).abs() < 1e-9);
        assert_eq!(weekend.swap, 0.0);
        assert_eq!(triple.size, 0.05);
        assert_eq!(triple.swap_type, SwapType::PercentPerYear);
    }

    #[rstest]
    fn test_swap_points_converts_like_profit() {
        let calc = swap_calculator(SwapType::Points, 2.0, -1.5);
        let thursday = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let result = calc.swap(100_000.0, OrderSide::Sell, thursday);
        assert!(result.error.is_none());
        // 100000 * -1.5 * 0.00001
        assert!((result.swap - -1.5).abs() < 1e-9);
        assert_eq!(result.size, -1.5);
    }

    #[rstest]
    fn test_swap_negative_percent_charges() {
        let calc = swap_calculator(SwapType::PercentPerYear, -0.05, 0.0);
        let thursday = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let result = calc.swap(100_000.0, OrderSide::Buy, thursday);
        assert!(result.error.is_none());
        let daily = -(1.05f64.powf(1.0 / 365.0) - 1.0);
        assert!((result.swap - 100_000.0 * daily).abs() < 1e-9);
    }

    #[rstest]
    fn test_order_open_price_sides() {
        let calc = calculator();
        assert_eq!(calc.order_open_price(OrderSide::Buy), Ok(1.1050));
        assert_eq!(calc.order_open_price(OrderSide::Sell), Ok(1.1048));
    }

    #[rstest]
    fn test_order_open_price_rejects_indicative() {
        let node = Rc::new(RefCell::new(SymbolRateNode::new(Ustr::from("EURUSD"))));
        node.borrow_mut()
            .update(Some(1.1048), Some(1.1050), false, true);
        let mut calc = OrderCalculator::new(
            Ustr::from("EURUSD"),
            Ustr::from("USD"),
            node,
            identity(ConversionKind::Margin),
            identity(ConversionKind::PositiveProfit),
            identity(ConversionKind::NegativeProfit),
        );
        calc.init(Some(&eurusd_info()));
        assert!(calc.check_order_open_price(OrderSide::Buy).is_err());
        assert!(calc.check_order_open_price(OrderSide::Sell).is_ok());
    }

    #[rstest]
    fn test_config_error_short_circuits() {
        let node = Rc::new(RefCell::new(SymbolRateNode::new(Ustr::from("EURUSD"))));
        let mut calc = OrderCalculator::new(
            Ustr::from("EURUSD"),
            Ustr::from("USD"),
            node,
            identity(ConversionKind::Margin),
            identity(ConversionKind::PositiveProfit),
            identity(ConversionKind::NegativeProfit),
        );
        calc.init(None);
        assert_eq!(calc.state(), CalcInitState::ConfigError);
        let (margin, error) = calc.margin(100_000.0, 100.0, OrderType::Market, false, false);
        assert_eq!(margin, 0.0);
        assert!(error.is_misconfiguration());
        assert_eq!(calc.profit(1.1, 1.0, OrderSide::Buy, None).error, error);
    }

    #[rstest]
    fn test_position_margin_sums_sides() {
        let calc = calculator();
        let position = Position {
            symbol: Ustr::from("EURUSD"),
            long_amount: 100_000.0,
            long_price: 1.1000,
            short_amount: 50_000.0,
            short_price: 1.1020,
            commission: 0.0,
            swap: 0.0,
        };
        let (margin, error) = calc.position_margin(&position, 100.0);
        assert!(error.is_none());
        assert_eq!(margin, 15.0);
    }
}
