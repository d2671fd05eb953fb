use rust_decimal::Decimal;

use super::{
    is_ancestor_or_self, AccountIndex, ValidationError, ValidationErrors, WeightEntry, WeightMap,
    TOLERANCE,
};

/// Check every weight in the map, collecting all the problems found rather than stopping at the
/// first.
///
/// Only percentages are expected here, so any absolute amount still present is treated as
/// out of range.
pub fn validate(weight_map: &WeightMap<'_>, index: &AccountIndex<'_>) -> Result<(), ValidationErrors> {
    use ValidationError::*;

    let mut errors = Vec::default();

    for (bucket, weights) in weight_map {
        if !index.contains(bucket) {
            errors.push(UnknownBucket(bucket.to_string()));
            continue;
        }

        let mut total = Decimal::ZERO;

        for (account, weight) in weights {
            if !index.contains(account) {
                errors.push(UnknownAccount(account.to_string()));
                continue;
            }

            let weight = match weight {
                WeightEntry::Percentage(weight) if is_in_range(*weight) => *weight,
                WeightEntry::Percentage(weight) | WeightEntry::Amount(weight, _) => {
                    errors.push(WeightOutOfRange {
                        account: account.to_string(),
                        weight: *weight,
                    });
                    continue;
                }
            };

            if !is_ancestor_or_self(bucket, account) {
                errors.push(NotAncestor {
                    bucket: bucket.to_string(),
                    account: account.to_string(),
                });
                continue;
            }

            total += weight;
        }

        if total > Decimal::ONE + TOLERANCE {
            errors.push(BucketExceedsOne {
                bucket: bucket.to_string(),
                total,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!("validate found {} errors", errors.len());
        Err(ValidationErrors::new(errors))
    }
}

fn is_in_range(weight: Decimal) -> bool {
    (Decimal::ZERO..=Decimal::ONE).contains(&weight)
}
