use hashbrown::HashSet;
use rust_decimal::Decimal;
use time::Date;

use super::{AccountTree, Allocation, ExcludeDirective, PricePoint, PriceTable, RebalanceError};

/// Accounts closed or excluded from the portfolio as of the given date.
pub fn skipped_accounts<'a, I>(
    closed: I,
    excludes: &[ExcludeDirective<'a>],
    as_of: Option<Date>,
) -> HashSet<&'a str>
where
    I: IntoIterator<Item = (&'a str, Date)>,
{
    let in_effect = |date: Date| as_of.is_none_or(|as_of| date <= as_of);

    closed
        .into_iter()
        .filter_map(|(account, date)| in_effect(date).then_some(account))
        .chain(
            excludes
                .iter()
                .filter_map(|exclude| in_effect(exclude.date).then_some(exclude.account)),
        )
        .collect()
}

/// Restrict the weights to the accounts not skipped, scaled to sum to one.
///
/// If all the remaining weights are zero, they are replaced by an equal share.
pub fn renormalize<'a>(weights: &Allocation<'a>, skipped: &HashSet<&str>) -> Allocation<'a> {
    let included = weights
        .iter()
        .filter(|(account, _)| !skipped.contains(*account))
        .map(|(account, weight)| (*account, *weight))
        .collect::<Allocation>();

    if included.is_empty() {
        return included;
    }

    let total = included.values().copied().sum::<Decimal>();
    if total > Decimal::ZERO {
        included
            .into_iter()
            .map(|(account, weight)| (account, weight / total))
            .collect()
    } else {
        let share = Decimal::ONE / Decimal::from(included.len());
        included
            .into_keys()
            .map(|account| (account, share))
            .collect()
    }
}

/// What is held in a single account, valued in the operating currency.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Holding<'a> {
    pub account: &'a str,
    pub commodity: &'a str,
    pub units: Decimal,
    pub market_value: Decimal,
    pub price: Option<PricePoint>,
}

impl<'a> Holding<'a> {
    /// The holding of an account whose principal commodity is the first of its open currencies.
    pub fn from_account(
        account: &'a AccountTree,
        currencies: &[&'a str],
        prices: &PriceTable<'_>,
        as_of: Option<Date>,
    ) -> Result<Self, RebalanceError> {
        let commodity = *currencies
            .first()
            .ok_or_else(|| RebalanceError::MissingCurrency(account.name.clone()))?;

        Ok(Self {
            account: account.name.as_str(),
            commodity,
            units: account
                .balance
                .get(commodity)
                .copied()
                .unwrap_or_default(),
            market_value: prices.account_value(account, as_of),
            price: prices.price_point(commodity, as_of),
        })
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct RebalanceRow<'a> {
    pub holding: Holding<'a>,
    pub current: Decimal,
    pub target: Decimal,
    /// Amount to buy, or sell if negative, in the operating currency.
    pub amount_delta: Decimal,
    /// Units of the commodity to buy or sell, if it has a price.
    pub quantity_delta: Option<Decimal>,
}

/// The current allocation of the portfolio compared with its target.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Rebalance<'a> {
    pub operating_currency: &'a str,
    pub total: Decimal,
    pub rows: Vec<RebalanceRow<'a>>,
}

impl<'a> Rebalance<'a> {
    /// Compare holdings against target weights, which should already be renormalized.
    ///
    /// Holdings with no target weight are left out.
    pub fn new<I>(holdings: I, targets: &Allocation<'_>, operating_currency: &'a str) -> Self
    where
        I: IntoIterator<Item = Holding<'a>>,
    {
        let mut holdings = holdings
            .into_iter()
            .filter(|holding| targets.contains_key(holding.account))
            .collect::<Vec<_>>();
        holdings.sort_by(|h0, h1| h0.account.cmp(h1.account));

        let total = holdings
            .iter()
            .map(|holding| holding.market_value)
            .sum::<Decimal>();

        let rows = holdings
            .into_iter()
            .map(|holding| {
                let current = if total.is_zero() {
                    Decimal::ZERO
                } else {
                    holding.market_value / total
                };
                let target = targets
                    .get(holding.account)
                    .copied()
                    .unwrap_or_default();
                let amount_delta = target * total - holding.market_value;
                let quantity_delta = if holding.commodity == operating_currency {
                    Some(amount_delta)
                } else {
                    holding
                        .price
                        .filter(|point| !point.price.is_zero())
                        .map(|point| amount_delta / point.price)
                };

                RebalanceRow {
                    holding,
                    current,
                    target,
                    amount_delta,
                    quantity_delta,
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "rebalance {} rows with total {total} {operating_currency}",
            rows.len()
        );

        Self {
            operating_currency,
            total,
            rows,
        }
    }
}
