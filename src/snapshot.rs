use beancount_lima_weights::{
    AccountTree, Balance, ExcludeDirective, PriceTable, WeightDirective, WeightValue,
};
use color_eyre::eyre::{eyre, Result, WrapErr};
use hashbrown::HashMap;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::{fs::File, io::BufReader, path::Path};
use time::Date;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Booked ledger data, as exported for portfolio reporting.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Snapshot {
    pub(crate) operating_currency: String,
    pub(crate) root_account: String,
    #[serde(default)]
    pub(crate) accounts: Vec<Account>,
    #[serde(default)]
    pub(crate) prices: Vec<Price>,
    #[serde(default)]
    pub(crate) weights: Vec<Weight>,
    #[serde(default)]
    pub(crate) excludes: Vec<Exclude>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Account {
    pub(crate) account: String,
    #[serde(default)]
    pub(crate) balance: Balance,
    /// Currencies constrained by the open directive, principal commodity first.
    #[serde(default)]
    pub(crate) currencies: Vec<String>,
    #[serde(default, with = "iso_date::option")]
    pub(crate) closed: Option<Date>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Price {
    #[serde(with = "iso_date")]
    pub(crate) date: Date,
    pub(crate) commodity: String,
    pub(crate) price: Decimal,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Weight {
    #[serde(with = "iso_date")]
    pub(crate) date: Date,
    pub(crate) account: String,
    /// Either a bare number or an amount such as `2000 USD`.
    pub(crate) weight: String,
    #[serde(default)]
    pub(crate) bucket: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Exclude {
    #[serde(with = "iso_date")]
    pub(crate) date: Date,
    pub(crate) account: String,
}

impl Snapshot {
    pub(crate) fn load_from(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .wrap_err_with(|| format!("Failed to open snapshot {}", path.to_string_lossy()))?;
        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))
            .wrap_err_with(|| format!("Failed to parse snapshot {}", path.to_string_lossy()))?;

        tracing::debug!(
            "loaded {} accounts, {} prices, {} weights, {} excludes from {}",
            snapshot.accounts.len(),
            snapshot.prices.len(),
            snapshot.weights.len(),
            snapshot.excludes.len(),
            path.to_string_lossy()
        );

        Ok(snapshot)
    }

    pub(crate) fn tree<'a>(&'a self, root: &'a str) -> AccountTree {
        AccountTree::from_balances(
            root,
            self.accounts
                .iter()
                .map(|account| (account.account.as_str(), &account.balance)),
        )
    }

    pub(crate) fn accounts_by_name(&self) -> HashMap<&str, &Account> {
        self.accounts
            .iter()
            .map(|account| (account.account.as_str(), account))
            .collect()
    }

    /// Weight directives in date order.
    pub(crate) fn weight_directives(&self) -> Result<Vec<WeightDirective<'_>>> {
        let mut directives = self
            .weights
            .iter()
            .map(|weight| {
                Ok(WeightDirective {
                    date: weight.date,
                    account: weight.account.as_str(),
                    value: parse_weight_value(&weight.weight).wrap_err_with(|| {
                        format!("bad weight for {} on {}", &weight.account, weight.date)
                    })?,
                    bucket: weight.bucket.as_deref(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        directives.sort_by_key(|directive| directive.date);
        Ok(directives)
    }

    pub(crate) fn exclude_directives(&self) -> Vec<ExcludeDirective<'_>> {
        self.excludes
            .iter()
            .map(|exclude| ExcludeDirective {
                date: exclude.date,
                account: exclude.account.as_str(),
            })
            .collect()
    }

    pub(crate) fn closed_accounts(&self) -> impl Iterator<Item = (&str, Date)> {
        self.accounts.iter().filter_map(|account| {
            account
                .closed
                .map(|closed| (account.account.as_str(), closed))
        })
    }

    pub(crate) fn price_table<'a>(&'a self, operating_currency: &'a str) -> PriceTable<'a> {
        let mut prices = PriceTable::new(operating_currency);
        for price in self.prices.iter() {
            prices.insert(price.date, price.commodity.as_str(), price.price);
        }
        prices
    }
}

fn parse_weight_value(s: &str) -> Result<WeightValue<'_>> {
    let mut tokens = s.split_whitespace();

    let number = tokens
        .next()
        .ok_or_else(|| eyre!("empty weight"))?
        .parse::<Decimal>()
        .wrap_err_with(|| format!("bad number in weight {s}"))?;

    match (tokens.next(), tokens.next()) {
        (None, _) => Ok(WeightValue::Number(number)),
        (Some(currency), None) => Ok(WeightValue::Amount(number, currency)),
        (Some(_), Some(_)) => Err(eyre!("unexpected trailing text in weight {s}")),
    }
}
