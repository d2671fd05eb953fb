use rust_decimal::Decimal;
use std::collections::BTreeMap;
use time::{macros::format_description, Date};
use tracing_subscriber::EnvFilter;

use crate::{
    compute_weights, AccountTree, Allocation, Balance, ExcludeDirective, PriceTable,
    WeightDirective, WeightError, WeightValue, TOLERANCE,
};

pub(crate) const OPERATING_CURRENCY: &str = "USD";

/// Ledger fragment for tests, parsed from a line-oriented source:
///
/// ```text
/// Assets:US:Cash 2000 USD              ; an account, with optional balances
/// 2024-01-01 weight Assets:US:Cash 0.2 ; a weight, with optional CURRENCY and explicit bucket
/// 2024-01-01 exclude Assets:US:Cash
/// 2024-01-01 price ITOT 100.00         ; price in the operating currency
/// ```
pub(crate) struct Fixture<'a> {
    pub(crate) tree: AccountTree,
    pub(crate) weights: Vec<WeightDirective<'a>>,
    pub(crate) excludes: Vec<ExcludeDirective<'a>>,
    pub(crate) prices: PriceTable<'a>,
}

impl<'a> Fixture<'a> {
    pub(crate) fn parse(root: &'a str, source: &'a str) -> Self {
        let mut balances = Vec::<(&'a str, Balance)>::default();
        let mut weights = Vec::default();
        let mut excludes = Vec::default();
        let mut prices = PriceTable::new(OPERATING_CURRENCY);

        for line in source.lines() {
            let line = line.split(';').next().unwrap_or_default();
            let mut tokens = line.split_whitespace();

            let Some(first) = tokens.next() else {
                continue;
            };

            if let Ok(date) = Date::parse(first, format_description!("[year]-[month]-[day]")) {
                match tokens.next() {
                    Some("weight") => {
                        let account = tokens.next().expect("weight account");
                        let number = number(tokens.next().expect("weight value"));
                        let rest = tokens.collect::<Vec<_>>();
                        let (value, bucket) = match rest.as_slice() {
                            [] => (WeightValue::Number(number), None),
                            [bucket] if !is_currency(bucket) => {
                                (WeightValue::Number(number), Some(*bucket))
                            }
                            [currency] => (WeightValue::Amount(number, *currency), None),
                            [currency, bucket] => {
                                (WeightValue::Amount(number, *currency), Some(*bucket))
                            }
                            _ => panic!("bad weight directive {line}"),
                        };
                        weights.push(WeightDirective {
                            date,
                            account,
                            value,
                            bucket,
                        });
                    }
                    Some("exclude") => {
                        excludes.push(ExcludeDirective {
                            date,
                            account: tokens.next().expect("exclude account"),
                        });
                    }
                    Some("price") => {
                        let commodity = tokens.next().expect("price commodity");
                        prices.insert(date, commodity, number(tokens.next().expect("price")));
                    }
                    _ => panic!("unknown directive {line}"),
                }
            } else {
                let mut balance = Balance::default();
                let rest = tokens.collect::<Vec<_>>();
                for amount in rest.chunks(2) {
                    match amount {
                        [units, currency] => {
                            balance.insert(currency.to_string(), number(units));
                        }
                        _ => panic!("bad balance for {first}"),
                    }
                }
                balances.push((first, balance));
            }
        }

        let tree = AccountTree::from_balances(
            root,
            balances
                .iter()
                .map(|(account, balance)| (*account, balance)),
        );

        Self {
            tree,
            weights,
            excludes,
            prices,
        }
    }

    pub(crate) fn compute(&self, as_of: Option<Date>) -> Result<Allocation<'_>, WeightError> {
        compute_weights(
            &self.tree,
            &self.weights,
            &self.tree.name,
            OPERATING_CURRENCY,
            as_of,
            |node| self.prices.account_value(node, as_of),
        )
    }
}

fn is_currency(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn number(s: &str) -> Decimal {
    s.parse::<Decimal>()
        .unwrap_or_else(|e| panic!("bad number {s}: {e}"))
}

pub(crate) fn weights_test(root: &str, source: &str, expected: &[(&str, Decimal)]) {
    weights_as_of_test(root, source, None, expected)
}

pub(crate) fn weights_as_of_test(
    root: &str,
    source: &str,
    as_of: Option<Date>,
    expected: &[(&str, Decimal)],
) {
    init_tracing();

    let fixture = Fixture::parse(root, source);
    match fixture.compute(as_of) {
        Ok(actual) => {
            check_invariants(&fixture.tree, &actual);

            let expected = expected.iter().copied().collect::<BTreeMap<_, _>>();
            assert_eq!(actual, expected);
        }
        Err(e) => panic!("unexpected failure {e}\n{source}"),
    }
}

pub(crate) fn weights_test_err(root: &str, source: &str, expected_err: WeightError) {
    init_tracing();

    let fixture = Fixture::parse(root, source);
    match fixture.compute(None) {
        Ok(actual) => panic!("unexpected success {actual:?}\n{source}"),
        Err(e) => assert_eq!(e, expected_err),
    }
}

/// Every leaf is weighted, in [0, 1], and the leaf weights sum to one.
pub(crate) fn check_invariants(tree: &AccountTree, allocation: &Allocation<'_>) {
    fn subtree_weight(node: &AccountTree, allocation: &Allocation<'_>) -> Decimal {
        if node.is_leaf() {
            let weight = *allocation
                .get(node.name.as_str())
                .unwrap_or_else(|| panic!("missing weight for {}", &node.name));
            assert!(
                (Decimal::ZERO..=Decimal::ONE).contains(&weight),
                "weight {weight} for {} out of range",
                &node.name
            );
            weight
        } else {
            node.children
                .iter()
                .map(|child| subtree_weight(child, allocation))
                .sum()
        }
    }

    assert_eq!(allocation.len(), tree.leaves().count());
    let total = subtree_weight(tree, allocation);
    assert!(
        (total - Decimal::ONE).abs() <= TOLERANCE,
        "leaf weights sum to {total}"
    );
}

pub(crate) fn third() -> Decimal {
    Decimal::ONE / Decimal::from(3)
}

pub(crate) fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).unwrap();
    });
}
