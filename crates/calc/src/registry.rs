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

//! The market registry owning catalogues, rate nodes, the conversion
//! formula arena and the calculator cache.

use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;
use indexmap::IndexMap;
use ustr::Ustr;

use crate::{
    calculator::OrderCalculator,
    config::{CurrencyInfo, SymbolInfo},
    conversion::{ConversionFormula, FormulaLeg, FormulaRef, RateNodeRef, UsageGuard, leg_side},
    enums::ConversionKind,
    rates::SymbolRateNode,
};

/// A shared handle to an order calculator.
pub type CalculatorRef = Rc<RefCell<OrderCalculator>>;

/// A shared handle to the market registry.
pub type RegistryRef = Rc<RefCell<MarketRegistry>>;

/// Whether the registry keeps a permanent usage token on calculators it
/// creates.
///
/// `KeepWarm` keeps background pricing hot for account-less consumers;
/// `OnDemand` relies purely on caller-scoped tokens so dormant calculators
/// carry no subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryUsagePolicy {
    KeepWarm,
    OnDemand,
}

/// Owns the symbol/currency catalogue, the per-symbol rate nodes, the
/// conversion formula arena and one cached [`OrderCalculator`] per
/// (symbol, deposit-currency) key.
#[derive(Debug)]
pub struct MarketRegistry {
    symbols: IndexMap<Ustr, SymbolInfo>,
    currencies: IndexMap<Ustr, CurrencyInfo>,
    pairs: AHashMap<(Ustr, Ustr), Ustr>,
    nodes: AHashMap<Ustr, RateNodeRef>,
    formulas: AHashMap<(Ustr, Ustr, ConversionKind), FormulaRef>,
    calculators: AHashMap<(Ustr, Ustr), CalculatorRef>,
    policy: RegistryUsagePolicy,
    warm_guards: AHashMap<(Ustr, Ustr), UsageGuard>,
}

impl MarketRegistry {
    /// Creates a new empty [`MarketRegistry`] instance.
    #[must_use]
    pub fn new(policy: RegistryUsagePolicy) -> Self {
        Self {
            symbols: IndexMap::new(),
            currencies: IndexMap::new(),
            pairs: AHashMap::new(),
            nodes: AHashMap::new(),
            formulas: AHashMap::new(),
            calculators: AHashMap::new(),
            policy,
            warm_guards: AHashMap::new(),
        }
    }

    /// (Re)initializes the catalogue.
    ///
    /// Diffs the old and new symbol sets, disables nodes for removed symbols
    /// (keeping the node objects), re-resolves every cached conversion
    /// formula preserving usage counts, and re-runs `init` on every cached
    /// calculator, whose initialization error may change.
    pub fn init(&mut self, symbols: Vec<SymbolInfo>, currencies: Vec<CurrencyInfo>) {
        let mut removed = 0usize;
        for symbol in self.symbols.keys() {
            if !symbols.iter().any(|info| info.symbol == *symbol) {
                if let Some(node) = self.nodes.get(symbol) {
                    node.borrow_mut().disable();
                }
                removed += 1;
            }
        }

        self.symbols = symbols.into_iter().map(|info| (info.symbol, info)).collect();
        self.currencies = currencies
            .into_iter()
            .map(|info| (info.code, info))
            .collect();

        self.pairs.clear();
        for info in self.symbols.values() {
            self.pairs
                .entry((info.margin_currency, info.profit_currency))
                .or_insert(info.symbol);
        }

        for (symbol, node) in &self.nodes {
            if self.symbols.contains_key(symbol) {
                node.borrow_mut().enable();
            }
        }

        let formula_keys: Vec<(Ustr, Ustr, ConversionKind)> =
            self.formulas.keys().copied().collect();
        for (source, target, kind) in formula_keys {
            let legs = self.resolve_legs(source, target, kind);
            if let Some(formula) = self.formulas.get(&(source, target, kind)) {
                formula.clone().borrow_mut().rebuild(legs);
            }
        }

        let calculator_keys: Vec<(Ustr, Ustr)> = self.calculators.keys().copied().collect();
        for (symbol, deposit) in calculator_keys {
            let calculator = self.calculators[&(symbol, deposit)].clone();
            match self.symbols.get(&symbol).copied() {
                Some(info) => {
                    let margin = self.formula(info.margin_currency, deposit, ConversionKind::Margin);
                    let positive =
                        self.formula(info.profit_currency, deposit, ConversionKind::PositiveProfit);
                    let negative =
                        self.formula(info.profit_currency, deposit, ConversionKind::NegativeProfit);
                    let mut calc = calculator.borrow_mut();
                    calc.rebind(margin, positive, negative);
                    calc.init(Some(&info));
                }
                None => calculator.borrow_mut().init(None),
            }
            if self.policy == RegistryUsagePolicy::KeepWarm {
                let guard = calculator.borrow().usage();
                self.warm_guards.insert((symbol, deposit), guard);
            }
        }

        log::info!(
            "Initialized market registry: {} symbols, {} currencies ({removed} removed)",
            self.symbols.len(),
            self.currencies.len(),
        );
    }

    /// Applies a live tick to a symbol's rate node.
    ///
    /// Returns `false` when the symbol is unknown to the catalogue.
    pub fn update_rate(
        &mut self,
        symbol: Ustr,
        bid: Option<f64>,
        ask: Option<f64>,
        bid_indicative: bool,
        ask_indicative: bool,
    ) -> bool {
        if !self.symbols.contains_key(&symbol) {
            log::debug!("Discarding tick for unknown symbol '{symbol}'");
            return false;
        }
        self.node(symbol)
            .borrow_mut()
            .update(bid, ask, bid_indicative, ask_indicative);
        true
    }

    /// Returns the rate node for a symbol, creating it on first reference.
    pub fn node(&mut self, symbol: Ustr) -> RateNodeRef {
        if let Some(node) = self.nodes.get(&symbol) {
            return node.clone();
        }
        let mut node = SymbolRateNode::new(symbol);
        if !self.symbols.contains_key(&symbol) {
            node.disable();
        }
        let node = Rc::new(RefCell::new(node));
        self.nodes.insert(symbol, node.clone());
        node
    }

    /// Returns the interned conversion formula for the given key, resolving
    /// it on first request.
    pub fn formula(&mut self, source: Ustr, target: Ustr, kind: ConversionKind) -> FormulaRef {
        if let Some(formula) = self.formulas.get(&(source, target, kind)) {
            return formula.clone();
        }
        let formula = match self.resolve_legs(source, target, kind) {
            Some(legs) => ConversionFormula::resolved(source, target, kind, legs),
            None => ConversionFormula::unresolved(source, target, kind),
        };
        let formula = Rc::new(RefCell::new(formula));
        self.formulas.insert((source, target, kind), formula.clone());
        formula
    }

    /// Returns the cached calculator for (symbol, deposit currency),
    /// creating and initializing it on first request.
    pub fn calculator(&mut self, symbol: Ustr, deposit_currency: Ustr) -> CalculatorRef {
        if let Some(calculator) = self.calculators.get(&(symbol, deposit_currency)) {
            return calculator.clone();
        }
        let node = self.node(symbol);
        let info = self.symbols.get(&symbol).copied();
        let (margin, positive, negative) = match &info {
            Some(info) => (
                self.formula(info.margin_currency, deposit_currency, ConversionKind::Margin),
                self.formula(
                    info.profit_currency,
                    deposit_currency,
                    ConversionKind::PositiveProfit,
                ),
                self.formula(
                    info.profit_currency,
                    deposit_currency,
                    ConversionKind::NegativeProfit,
                ),
            ),
            // unknown symbol: placeholder formulas, replaced on re-init
            None => (
                Rc::new(RefCell::new(ConversionFormula::unresolved(
                    symbol,
                    deposit_currency,
                    ConversionKind::Margin,
                ))),
                Rc::new(RefCell::new(ConversionFormula::unresolved(
                    symbol,
                    deposit_currency,
                    ConversionKind::PositiveProfit,
                ))),
                Rc::new(RefCell::new(ConversionFormula::unresolved(
                    symbol,
                    deposit_currency,
                    ConversionKind::NegativeProfit,
                ))),
            ),
        };
        let mut calculator =
            OrderCalculator::new(symbol, deposit_currency, node, margin, positive, negative);
        calculator.init(info.as_ref());
        let calculator = Rc::new(RefCell::new(calculator));
        self.calculators
            .insert((symbol, deposit_currency), calculator.clone());
        if self.policy == RegistryUsagePolicy::KeepWarm {
            let guard = calculator.borrow().usage();
            self.warm_guards.insert((symbol, deposit_currency), guard);
        }
        calculator
    }

    /// Returns the catalogue entry for a symbol.
    #[must_use]
    pub fn symbol(&self, symbol: Ustr) -> Option<&SymbolInfo> {
        self.symbols.get(&symbol)
    }

    /// Returns the catalogue entry for a currency.
    #[must_use]
    pub fn currency(&self, code: Ustr) -> Option<&CurrencyInfo> {
        self.currencies.get(&code)
    }

    /// Returns the decimal precision of a currency (2 when unknown).
    #[must_use]
    pub fn currency_precision(&self, code: Ustr) -> u8 {
        self.currencies.get(&code).map_or(2, |info| info.precision)
    }

    /// Finds the symbol quoting `to` per one unit of `from`, directly or
    /// inverted.
    fn find_hop(&self, from: Ustr, to: Ustr) -> Option<(Ustr, bool)> {
        if let Some(symbol) = self.pairs.get(&(from, to)) {
            return Some((*symbol, false));
        }
        self.pairs.get(&(to, from)).map(|symbol| (*symbol, true))
    }

    /// Resolves the rate path from `source` to `target`.
    ///
    /// Tries a direct pair, then an inverted pair, then a single
    /// intermediate currency in catalogue insertion order. Returns `None`
    /// when no path exists.
    fn resolve_legs(
        &mut self,
        source: Ustr,
        target: Ustr,
        kind: ConversionKind,
    ) -> Option<Vec<FormulaLeg>> {
        if source == target {
            return Some(Vec::new());
        }
        if let Some((symbol, invert)) = self.find_hop(source, target) {
            let node = self.node(symbol);
            return Some(vec![FormulaLeg {
                node,
                side: leg_side(kind, invert),
                invert,
                cross: false,
            }]);
        }
        let codes: Vec<Ustr> = self.currencies.keys().copied().collect();
        for via in codes {
            if via == source || via == target {
                continue;
            }
            let (first, second) = match (self.find_hop(source, via), self.find_hop(via, target)) {
                (Some(first), Some(second)) => (first, second),
                _ => continue,
            };
            let first_node = self.node(first.0);
            let second_node = self.node(second.0);
            return Some(vec![
                FormulaLeg {
                    node: first_node,
                    side: leg_side(kind, first.1),
                    invert: first.1,
                    cross: true,
                },
                FormulaLeg {
                    node: second_node,
                    side: leg_side(kind, second.1),
                    invert: second.1,
                    cross: true,
                },
            ]);
        }
        None
    }
}
