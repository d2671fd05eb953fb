use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::{AccountIndex, AccountTree, ConversionError, WeightEntry, WeightMap};

/// Convert absolute amount weights to percentages of their bucket's total value.
///
/// `value` gives the total market value of a bucket in `default_currency`, and is called at most
/// once per bucket, only for buckets which contain an absolute amount.  Buckets of percentages
/// only are passed through untouched, even if unknown, and left for validation to reject.
pub fn convert<'a, V>(
    weight_map: WeightMap<'a>,
    index: &AccountIndex<'_>,
    default_currency: &str,
    value: V,
) -> Result<WeightMap<'a>, ConversionError>
where
    V: Fn(&AccountTree) -> Decimal,
{
    let mut converted = WeightMap::default();

    for (bucket, weights) in weight_map {
        let mut bucket_total = None;
        let mut converted_weights = BTreeMap::default();

        for (account, weight) in weights {
            let percentage = match weight {
                WeightEntry::Percentage(percentage) => percentage,
                WeightEntry::Amount(amount, currency) => {
                    let total = match bucket_total {
                        Some(total) => total,
                        None => {
                            let node = index.get(bucket).ok_or_else(|| {
                                ConversionError::UnknownBucket(bucket.to_string())
                            })?;
                            let total = value(node);
                            tracing::debug!("bucket {bucket} total {total} {default_currency}");
                            bucket_total = Some(total);
                            total
                        }
                    };

                    if total.is_zero() {
                        return Err(ConversionError::ZeroBucketTotal {
                            account: account.to_string(),
                            bucket: bucket.to_string(),
                        });
                    }

                    // overflow means the ratio is far beyond one
                    let percentage = amount
                        .checked_div(total)
                        .filter(|percentage| *percentage <= Decimal::ONE)
                        .ok_or_else(|| ConversionError::AmountExceedsBucket {
                            account: account.to_string(),
                            bucket: bucket.to_string(),
                            amount,
                            currency: currency.to_string(),
                            bucket_total: total,
                        })?;

                    tracing::debug!("converted {amount} {currency} for {account} to {percentage}");
                    percentage
                }
            };

            converted_weights.insert(account, WeightEntry::Percentage(percentage));
        }

        converted.insert(bucket, converted_weights);
    }

    Ok(converted)
}
