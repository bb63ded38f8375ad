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

//! Enumerations for the calculation engine domain model.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::errors::EngineError;

/// The side of an order or exposure.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// The type of an order.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderType {
    /// Returns whether the order type carries a stop trigger.
    #[must_use]
    pub const fn is_stop(&self) -> bool {
        matches!(self, Self::Stop | Self::StopLimit)
    }
}

/// The side of a quote.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteSide {
    Bid,
    Ask,
}

/// The accounting mode of a margin account.
///
/// Gross accounts margin buy and sell exposure on a symbol independently
/// (hedged); net accounts merge both sides into one net exposure.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountingMode {
    Gross,
    Net,
}

impl AccountingMode {
    /// Parses an externally supplied accounting mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the mode is not a supported accounting mode;
    /// this is a configuration defect rather than a runtime condition.
    pub fn parse(value: &str) -> Result<Self, EngineError> {
        match value.to_ascii_uppercase().as_str() {
            "GROSS" => Ok(Self::Gross),
            "NET" => Ok(Self::Net),
            _ => Err(EngineError::Misconfiguration(format!(
                "unsupported accounting mode '{value}'"
            ))),
        }
    }
}

/// The margin calculation mode of an instrument.
///
/// Leverage applies only to `Forex` and `CfdLeverage` instruments; all other
/// modes treat the account leverage as 1.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarginMode {
    Forex,
    Cfd,
    CfdLeverage,
}

impl MarginMode {
    /// Returns whether account leverage scales the margin requirement.
    #[must_use]
    pub const fn is_leverage_aware(&self) -> bool {
        matches!(self, Self::Forex | Self::CfdLeverage)
    }
}

/// The commission value interpretation.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionType {
    Absolute,
    Percent,
    PerUnit,
}

/// How a commission value is charged.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionChargeType {
    PerTrade,
    PerLot,
}

/// The swap size interpretation of an instrument.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapType {
    Points,
    PercentPerYear,
}

/// The calculation health of an account.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalcStatus {
    /// All figures are current and error free.
    Calculated,
    /// Figures are current but at least one entity is off quotes.
    CalculatedWithErrors,
    /// Static configuration required for calculation is missing.
    Misconfiguration,
    /// No account snapshot has been applied yet.
    NotCalculated,
}

/// The kind of a currency conversion formula.
///
/// Profit conversions are split by the sign of the amount being converted,
/// since a surplus is sold at the bid while a deficit is bought at the ask.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversionKind {
    Margin,
    PositiveProfit,
    NegativeProfit,
}
