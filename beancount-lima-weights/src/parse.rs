use hashbrown::HashSet;
use time::Date;

use super::{ancestors, ParseError, WeightDirective, WeightEntry, WeightMap, WeightValue};

fn is_effective(directive: &WeightDirective<'_>, as_of: Option<Date>) -> bool {
    as_of.is_none_or(|as_of| directive.date <= as_of)
}

/// Accounts which are the target of at least one directive effective at `as_of`.
pub fn accounts_with_weights<'a>(
    directives: &[WeightDirective<'a>],
    as_of: Option<Date>,
) -> HashSet<&'a str> {
    directives
        .iter()
        .filter(|directive| is_effective(directive, as_of))
        .map(|directive| directive.account)
        .collect()
}

/// The bucket for an account is its closest proper ancestor which has a weight directive,
/// otherwise the root account.
pub fn infer_bucket<'a>(
    account: &'a str,
    accounts_with_weights: &HashSet<&'a str>,
    root_account: &'a str,
) -> &'a str {
    ancestors(account)
        .find(|ancestor| accounts_with_weights.contains(ancestor))
        .unwrap_or(root_account)
}

/// Group the weight directives effective at `as_of` by bucket.
///
/// Directives are expected in date order, so where an account is weighted more than once in the
/// same bucket, the later directive wins.
pub fn parse<'a>(
    directives: &[WeightDirective<'a>],
    root_account: &'a str,
    default_currency: &str,
    as_of: Option<Date>,
) -> Result<WeightMap<'a>, ParseError> {
    let accounts_with_weights = accounts_with_weights(directives, as_of);
    let mut weight_map = WeightMap::default();

    for directive in directives
        .iter()
        .filter(|directive| is_effective(directive, as_of))
    {
        let bucket = directive.bucket.unwrap_or_else(|| {
            infer_bucket(directive.account, &accounts_with_weights, root_account)
        });

        let entry = match directive.value {
            WeightValue::Number(weight) => WeightEntry::Percentage(weight),
            WeightValue::Amount(number, currency) => {
                if currency != default_currency {
                    return Err(ParseError::ForeignCurrency {
                        account: directive.account.to_string(),
                        currency: currency.to_string(),
                        default_currency: default_currency.to_string(),
                    });
                }
                WeightEntry::Amount(number, currency)
            }
        };

        tracing::debug!(
            "{} weight {} for {} in bucket {}",
            directive.date,
            &entry,
            directive.account,
            bucket
        );
        weight_map
            .entry(bucket)
            .or_default()
            .insert(directive.account, entry);
    }

    Ok(weight_map)
}
