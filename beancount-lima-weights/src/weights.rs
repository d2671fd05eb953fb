use rust_decimal::Decimal;
use time::Date;

use super::{
    convert, distribute, parse, validate, AccountIndex, AccountTree, Allocation, WeightDirective,
    WeightError,
};

/// Compute the target weight of every leaf account under `tree`, from the weight directives
/// effective at `as_of`.
///
/// `value` is the market value in `default_currency` of the holdings of an account and all its
/// descendants, and is only required for directives which weight by absolute amount.
pub fn compute_weights<'a, V>(
    tree: &'a AccountTree,
    directives: &[WeightDirective<'a>],
    root_account: &'a str,
    default_currency: &str,
    as_of: Option<Date>,
    value: V,
) -> Result<Allocation<'a>, WeightError>
where
    V: Fn(&AccountTree) -> Decimal,
{
    let weight_map = parse(directives, root_account, default_currency, as_of)?;
    tracing::debug!(
        "parsed {} directives into {} buckets",
        directives.len(),
        weight_map.len()
    );

    let index = AccountIndex::new(tree);
    let weight_map = convert(weight_map, &index, default_currency, value)?;
    validate(&weight_map, &index)?;

    let allocation = distribute(tree, &weight_map, Decimal::ONE)?;
    tracing::debug!(
        "allocated weights to {} leaves of {}",
        allocation.len(),
        &tree.name
    );

    Ok(allocation)
}
