use beancount_lima_weights::{
    compute_weights, is_ancestor_or_self,
    rebalance::{renormalize, skipped_accounts, Holding, Rebalance},
    AccountTree, Allocation, PriceTable, WeightDirective,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, Result, WrapErr};
use std::path::PathBuf;
use time::{macros::format_description, Date};
use tracing_subscriber::EnvFilter;

use crate::{
    report::{write_rebalance, write_weights},
    snapshot::Snapshot,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Extensible comma-separated options, each split on `=`: root=<account>, currency=<currency>
    #[clap(short, value_delimiter = ',')]
    options: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Target weights of the leaf accounts under the portfolio root
    Weights(ReportArgs),

    /// Current holdings compared with their target weights
    Rebalance(ReportArgs),
}

#[derive(Args)]
struct ReportArgs {
    /// Ledger snapshot JSON file path
    snapshot: PathBuf,

    /// Ignore directives dated after this, and value holdings at this date
    #[clap(long, value_parser = parse_date)]
    as_of: Option<Date>,

    /// Portfolio root account, overriding the snapshot
    #[clap(long)]
    root: Option<String>,

    /// Output format, defaults to table
    #[clap(short, value_enum, default_value_t)]
    format: Format,
}

#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub(crate) enum Format {
    #[default]
    Table,
    Json,
}

#[derive(Default, Debug)]
struct Options<'a> {
    root: Option<&'a str>,
    currency: Option<&'a str>,
}

impl<'a> Options<'a> {
    fn parse(options: &'a [String]) -> Result<Self> {
        let mut parsed = Options::default();

        for option in options {
            match option.split_once('=') {
                Some(("root", root)) => parsed.root = Some(root),
                Some(("currency", currency)) => parsed.currency = Some(currency),
                _ => return Err(eyre!("unknown option {option}")),
            }
        }

        Ok(parsed)
    }
}

fn parse_date(s: &str) -> Result<Date, time::error::Parse> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
}

/// Everything the weight computation borrows from the snapshot.
struct Portfolio<'a> {
    root: &'a str,
    operating_currency: &'a str,
    tree: AccountTree,
    directives: Vec<WeightDirective<'a>>,
    prices: PriceTable<'a>,
}

impl<'a> Portfolio<'a> {
    fn new(snapshot: &'a Snapshot, args: &'a ReportArgs, options: &Options<'a>) -> Result<Self> {
        let root = args
            .root
            .as_deref()
            .or(options.root)
            .unwrap_or(&snapshot.root_account);
        let operating_currency = options.currency.unwrap_or(&snapshot.operating_currency);

        if !snapshot
            .accounts
            .iter()
            .any(|account| is_ancestor_or_self(root, &account.account))
        {
            return Err(eyre!("root account {root} not found"));
        }

        Ok(Portfolio {
            root,
            operating_currency,
            tree: snapshot.tree(root),
            directives: snapshot.weight_directives()?,
            prices: snapshot.price_table(operating_currency),
        })
    }

    fn weights(&self, as_of: Option<Date>) -> Result<Allocation<'_>> {
        compute_weights(
            &self.tree,
            &self.directives,
            self.root,
            self.operating_currency,
            as_of,
            |node| self.prices.account_value(node, as_of),
        )
        .wrap_err_with(|| format!("Failed to compute weights for {}", self.root))
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let out_w = &std::io::stdout();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let options = Options::parse(&cli.options)?;

    match &cli.command {
        Command::Weights(args) => {
            let snapshot = Snapshot::load_from(&args.snapshot)?;
            let portfolio = Portfolio::new(&snapshot, args, &options)?;
            let weights = portfolio.weights(args.as_of)?;

            write_weights(&weights, args.format, out_w)
        }

        Command::Rebalance(args) => {
            let snapshot = Snapshot::load_from(&args.snapshot)?;
            let portfolio = Portfolio::new(&snapshot, args, &options)?;
            let weights = portfolio.weights(args.as_of)?;

            let excludes = snapshot.exclude_directives();
            let skipped = skipped_accounts(snapshot.closed_accounts(), &excludes, args.as_of);
            let targets = renormalize(&weights, &skipped);

            let accounts = snapshot.accounts_by_name();
            let holdings = targets
                .keys()
                .map(|account| -> Result<Holding<'_>> {
                    let node = portfolio
                        .tree
                        .find(account)
                        .ok_or_else(|| eyre!("account {account} not found in tree"))?;
                    let currencies = accounts
                        .get(account)
                        .map(|entry| {
                            entry
                                .currencies
                                .iter()
                                .map(String::as_str)
                                .collect::<Vec<_>>()
                        })
                        .unwrap_or_default();
                    Ok(Holding::from_account(
                        node,
                        &currencies,
                        &portfolio.prices,
                        args.as_of,
                    )?)
                })
                .collect::<Result<Vec<_>>>()?;

            let rebalance = Rebalance::new(holdings, &targets, portfolio.operating_currency);
            write_rebalance(&rebalance, args.format, out_w)
        }
    }
}

pub(crate) mod report;
pub(crate) mod snapshot;

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_options() {
        let options = vec!["root=Assets:US".to_string(), "currency=NZD".to_string()];
        let parsed = Options::parse(&options).unwrap();

        assert_eq!(parsed.root, Some("Assets:US"));
        assert_eq!(parsed.currency, Some("NZD"));
        assert!(Options::parse(&["verbose".to_string()]).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-03-01").unwrap(), date!(2024-03-01));
        assert!(parse_date("2024-13-01").is_err());
    }

    const SNAPSHOT: &str = r#"
{
  "operating-currency": "USD",
  "root-account": "Assets",
  "accounts": [
    {"account": "Assets:US:Cash", "balance": {"USD": "1000"}, "currencies": ["USD"]},
    {"account": "Assets:UK:Cash", "balance": {"USD": "3000"}, "currencies": ["USD"]}
  ],
  "weights": [{"date": "2024-01-01", "account": "Assets:UK", "weight": "0.75"}]
}
"#;

    fn report_args(root: Option<&str>) -> ReportArgs {
        ReportArgs {
            snapshot: PathBuf::from("snapshot.json"),
            as_of: None,
            root: root.map(str::to_string),
            format: Format::Table,
        }
    }

    #[test]
    fn test_portfolio_weights() {
        let snapshot: Snapshot = serde_json::from_str(SNAPSHOT).unwrap();
        let args = report_args(None);
        let portfolio = Portfolio::new(&snapshot, &args, &Options::default()).unwrap();

        assert_eq!(
            portfolio.weights(None).unwrap(),
            Allocation::from([
                ("Assets:UK:Cash", rust_decimal_macros::dec!(0.75)),
                ("Assets:US:Cash", rust_decimal_macros::dec!(0.25)),
            ])
        );
    }

    #[test]
    fn test_unknown_root() {
        let snapshot: Snapshot = serde_json::from_str(SNAPSHOT).unwrap();

        for (args, options) in [
            (report_args(Some("Assets:Typo")), Options::default()),
            (
                report_args(None),
                Options {
                    root: Some("Assets:Typo"),
                    currency: None,
                },
            ),
        ] {
            let Err(e) = Portfolio::new(&snapshot, &args, &options) else {
                panic!("unexpected success for unknown root");
            };
            assert_eq!(e.to_string(), "root account Assets:Typo not found");
        }
    }

    #[test]
    fn test_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
