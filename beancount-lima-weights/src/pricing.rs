use hashbrown::HashMap;
use rust_decimal::Decimal;
use time::Date;

use super::{AccountTree, Balance};

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct PricePoint {
    pub date: Date,
    pub price: Decimal,
}

/// Prices of commodities in the operating currency, by date.
#[derive(Clone, Debug)]
pub struct PriceTable<'a> {
    operating_currency: &'a str,
    // each list sorted by date, with at most one price per date
    prices: HashMap<&'a str, Vec<PricePoint>>,
}

impl<'a> PriceTable<'a> {
    pub fn new(operating_currency: &'a str) -> Self {
        Self {
            operating_currency,
            prices: HashMap::default(),
        }
    }

    /// Add a price for one unit of `commodity`, replacing any previous price on the same date.
    pub fn insert(&mut self, date: Date, commodity: &'a str, price: Decimal) {
        let points = self.prices.entry(commodity).or_default();
        match points.binary_search_by(|point| point.date.cmp(&date)) {
            Ok(i) => points[i].price = price,
            Err(i) => points.insert(i, PricePoint { date, price }),
        }
    }

    /// Latest price on or before `date`, or the latest of all if there is no date.
    pub fn price_point(&self, commodity: &str, date: Option<Date>) -> Option<PricePoint> {
        if commodity == self.operating_currency {
            return None;
        }

        let points = self.prices.get(commodity)?;
        match date {
            None => points.last().copied(),
            Some(date) => {
                let n = points.partition_point(|point| point.date <= date);
                n.checked_sub(1).map(|i| points[i])
            }
        }
    }

    /// Value of the balance in the operating currency, ignoring commodities without a price.
    pub fn market_value(&self, balance: &Balance, date: Option<Date>) -> Decimal {
        balance
            .iter()
            .filter_map(|(cur, units)| {
                if cur == self.operating_currency {
                    Some(*units)
                } else if let Some(point) = self.price_point(cur, date) {
                    Some(*units * point.price)
                } else {
                    tracing::debug!("no price for {cur} as of {date:?}, ignoring {units} {cur}");
                    None
                }
            })
            .sum()
    }

    /// Value of the subtree of an account in the operating currency.
    pub fn account_value(&self, account: &AccountTree, date: Option<Date>) -> Decimal {
        self.market_value(&account.balance, date)
    }
}
