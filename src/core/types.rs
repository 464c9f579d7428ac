use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INITIAL_ASSETS_MAX: f64 = 999_999_999_999.0;
pub const MONTHLY_INVESTS_MAX: f64 = 999_999_999.0;
pub const INVEST_DURATION_MAX: f64 = 100.0;
pub const INTEREST_RATE_MAX: f64 = 100.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputField {
    InitialAssets,
    MonthlyInvests,
    InvestDuration,
    InterestRate,
}

impl InputField {
    /// Form order.
    pub const ALL: [InputField; 4] = [
        InputField::InitialAssets,
        InputField::MonthlyInvests,
        InputField::InvestDuration,
        InputField::InterestRate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            InputField::InitialAssets => "보유 자산",
            InputField::MonthlyInvests => "매월 투자금",
            InputField::InvestDuration => "투자기간(년)",
            InputField::InterestRate => "연이율(%)",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            InputField::InitialAssets => "assets",
            InputField::MonthlyInvests => "monthly",
            InputField::InvestDuration => "duration",
            InputField::InterestRate => "rate",
        }
    }

    /// Inclusive upper bound for committed values.
    pub fn max(self) -> f64 {
        match self {
            InputField::InitialAssets => INITIAL_ASSETS_MAX,
            InputField::MonthlyInvests => MONTHLY_INVESTS_MAX,
            InputField::InvestDuration => INVEST_DURATION_MAX,
            InputField::InterestRate => INTEREST_RATE_MAX,
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown field '{0}' (expected one of: assets, monthly, duration, rate)")]
pub struct UnknownFieldError(pub String);

impl FromStr for InputField {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "assets" | "initialAssets" | "initial-assets" => Ok(InputField::InitialAssets),
            "monthly" | "monthlyInvests" | "monthly-invests" => Ok(InputField::MonthlyInvests),
            "duration" | "investDuration" | "invest-duration" => Ok(InputField::InvestDuration),
            "rate" | "interestRate" | "interest-rate" => Ok(InputField::InterestRate),
            other => Err(UnknownFieldError(other.to_string())),
        }
    }
}

/// Plain copy of the four form values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSnapshot {
    pub initial_assets: f64,
    pub monthly_invests: f64,
    pub invest_duration: f64,
    pub interest_rate: f64,
}

impl InputSnapshot {
    pub fn get(&self, field: InputField) -> f64 {
        match field {
            InputField::InitialAssets => self.initial_assets,
            InputField::MonthlyInvests => self.monthly_invests,
            InputField::InvestDuration => self.invest_duration,
            InputField::InterestRate => self.interest_rate,
        }
    }

    pub fn set(&mut self, field: InputField, value: f64) {
        let slot = match field {
            InputField::InitialAssets => &mut self.initial_assets,
            InputField::MonthlyInvests => &mut self.monthly_invests,
            InputField::InvestDuration => &mut self.invest_duration,
            InputField::InterestRate => &mut self.interest_rate,
        };
        *slot = value;
    }
}
