use rust_decimal::Decimal;
use std::{collections::BTreeMap, fmt::Display};
use time::Date;

/// Units by currency.
pub type Balance = BTreeMap<String, Decimal>;

/// Slack allowed when checking that weights sum as required.
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 4); // 0.0001

/// A `portfolio-weight` directive, as extracted from the ledger.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct WeightDirective<'a> {
    pub date: Date,
    pub account: &'a str,
    pub value: WeightValue<'a>,
    pub bucket: Option<&'a str>,
}

/// The raw value of a weight directive, a bare number or an amount.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum WeightValue<'a> {
    Number(Decimal),
    Amount(Decimal, &'a str),
}

/// A `portfolio-exclude` directive, removing an account from the rebalancing report.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ExcludeDirective<'a> {
    pub date: Date,
    pub account: &'a str,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum WeightEntry<'a> {
    /// Fraction of the bucket's allocation, in [0, 1] when valid.
    Percentage(Decimal),
    /// Absolute amount in the operating currency, not yet converted.
    Amount(Decimal, &'a str),
}

impl WeightEntry<'_> {
    pub fn percentage(&self) -> Option<Decimal> {
        use WeightEntry::*;

        match self {
            Percentage(weight) => Some(*weight),
            Amount(..) => None,
        }
    }
}

impl Display for WeightEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use WeightEntry::*;

        match self {
            Percentage(weight) => write!(f, "{weight}"),
            Amount(number, currency) => write!(f, "{number} {currency}"),
        }
    }
}

/// Weights by target account, for each bucket.
pub type WeightMap<'a> = BTreeMap<&'a str, BTreeMap<&'a str, WeightEntry<'a>>>;

/// Absolute weight of each leaf account.
pub type Allocation<'a> = BTreeMap<&'a str, Decimal>;
