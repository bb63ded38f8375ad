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

//! The cash account calculator.
//!
//! Cash accounts carry no margin netting; they keep a per-currency asset
//! ledger with amounts locked against resting orders.

use indexmap::IndexMap;
use ustr::Ustr;

use crate::errors::EngineError;

/// One per-currency asset of a cash account.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CashAsset {
    /// The total amount held.
    pub amount: f64,
    /// The amount locked against resting orders.
    pub locked: f64,
}

impl CashAsset {
    /// The amount not locked against orders.
    #[must_use]
    pub fn free(&self) -> f64 {
        self.amount - self.locked
    }
}

/// Maintains the asset ledger of one cash account.
#[derive(Debug, Default)]
pub struct CashAccountCalculator {
    assets: IndexMap<Ustr, CashAsset>,
}

impl CashAccountCalculator {
    /// Creates a new empty [`CashAccountCalculator`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds, replaces or removes an asset.
    ///
    /// A zero amount removes the entry; locks held against the currency are
    /// carried over on replacement.
    pub fn apply_asset(&mut self, currency: Ustr, amount: f64) {
        if amount == 0.0 {
            self.assets.shift_remove(&currency);
            return;
        }
        let asset = self.assets.entry(currency).or_default();
        asset.amount = amount;
    }

    /// Locks an amount of the currency against a resting order.
    pub fn lock(&mut self, currency: Ustr, amount: f64) {
        let asset = self.assets.entry(currency).or_default();
        asset.locked += amount;
    }

    /// Releases a previously locked amount.
    pub fn unlock(&mut self, currency: Ustr, amount: f64) {
        if let Some(asset) = self.assets.get_mut(&currency) {
            asset.locked = (asset.locked - amount).max(0.0);
        }
    }

    /// Returns the asset entry for a currency, if held.
    #[must_use]
    pub fn asset(&self, currency: Ustr) -> Option<&CashAsset> {
        self.assets.get(&currency)
    }

    /// The free (unlocked) amount of a currency.
    #[must_use]
    pub fn free(&self, currency: Ustr) -> f64 {
        self.assets.get(&currency).map_or(0.0, CashAsset::free)
    }

    /// Checks whether an amount of the currency can be reserved.
    pub fn can_reserve(&self, currency: Ustr, amount: f64) -> Result<(), EngineError> {
        let free = self.free(currency);
        if amount <= free {
            Ok(())
        } else {
            Err(EngineError::NotEnoughMoney {
                required: amount,
                equity: free,
            })
        }
    }

    /// Iterates all held assets.
    pub fn assets(&self) -> impl Iterator<Item = (Ustr, &CashAsset)> {
        self.assets.iter().map(|(currency, asset)| (*currency, asset))
    }
}
