use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::{is_ancestor_or_self, AccountTree, Allocation, AllocationError, WeightMap, TOLERANCE};

/// Absolute weights required for descendant accounts, by account.
type TargetWeights<'a> = BTreeMap<&'a str, Decimal>;

/// Distribute `allocated` over the leaves of the tree, top-down.
///
/// At each node, the weight allocated to the node is shared among its children in order of
/// precedence:
/// 1. a child weighted directly in the node's bucket gets that fraction of the node's allocation
/// 2. a child containing accounts with target weights, whether from the node's own bucket or
///    propagated from an ancestor bucket, gets the sum of those
/// 3. any other children share the remainder equally
///
/// A target weight propagated from above is dropped where the node's bucket weights the same
/// account itself.
///
/// The weight map is expected to have been converted and validated already.
pub fn distribute<'a>(
    root: &'a AccountTree,
    weight_map: &WeightMap<'a>,
    allocated: Decimal,
) -> Result<Allocation<'a>, AllocationError> {
    let mut allocation = Allocation::default();
    distribute_node(
        root,
        weight_map,
        allocated,
        TargetWeights::default(),
        &mut allocation,
    )?;
    Ok(allocation)
}

fn distribute_node<'a>(
    node: &'a AccountTree,
    weight_map: &WeightMap<'a>,
    allocated: Decimal,
    target_weights: TargetWeights<'a>,
    allocation: &mut Allocation<'a>,
) -> Result<(), AllocationError> {
    if node.is_leaf() {
        allocation.insert(node.name.as_str(), allocated);
        return Ok(());
    }

    let n_children = node.children.len();
    let mut child_local_weights = vec![None; n_children];
    let mut child_target_weights = vec![TargetWeights::default(); n_children];

    let local_weights = weight_map.get(node.name.as_str());

    if let Some(local_weights) = local_weights {
        for (account, entry) in local_weights {
            let Some(weight) = entry.percentage() else {
                tracing::warn!("ignoring unconverted weight {entry} for {account}");
                continue;
            };

            match child_containing(node, account) {
                Some((i, true)) => {
                    child_local_weights[i] = Some(weight);
                }
                Some((i, false)) => {
                    child_target_weights[i].insert(*account, weight * allocated);
                }
                None => {
                    tracing::warn!(
                        "ignoring weight {weight} for {account} in bucket {}, which has no child containing it",
                        &node.name
                    );
                }
            }
        }
    }

    for (account, weight) in target_weights {
        if local_weights.is_some_and(|local_weights| local_weights.contains_key(account)) {
            tracing::debug!(
                "target weight {weight} for {account} overridden in bucket {}",
                &node.name
            );
            continue;
        }

        if let Some((i, _)) = child_containing(node, account) {
            child_target_weights[i].insert(account, weight);
        }
    }

    let mut child_weights = child_local_weights
        .into_iter()
        .zip(child_target_weights.iter())
        .map(|(local_weight, target_weights)| match local_weight {
            Some(local_weight) => Some(local_weight * allocated),
            None if !target_weights.is_empty() => {
                Some(target_weights.values().copied().sum::<Decimal>())
            }
            None => None,
        })
        .collect::<Vec<_>>();

    let weighted_total = child_weights.iter().flatten().copied().sum::<Decimal>();
    let remaining = allocated - weighted_total;
    let n_unweighted = child_weights.iter().filter(|w| w.is_none()).count();

    if remaining < -TOLERANCE {
        return Err(AllocationError::Overallocated {
            account: node.name.clone(),
            allocated,
            excess: -remaining,
        });
    }

    if n_unweighted > 0 {
        let equal_share = if remaining > Decimal::ZERO {
            remaining / Decimal::from(n_unweighted)
        } else {
            Decimal::ZERO
        };

        for weight in child_weights.iter_mut().filter(|w| w.is_none()) {
            *weight = Some(equal_share);
        }
    } else if remaining > TOLERANCE {
        return Err(AllocationError::Underallocated {
            account: node.name.clone(),
            allocated,
            leftover: remaining,
        });
    }

    let child_weights = child_weights
        .into_iter()
        .map(|w| w.unwrap_or_default())
        .collect::<Vec<_>>();

    let total = child_weights.iter().copied().sum::<Decimal>();
    if (total - allocated).abs() > TOLERANCE {
        return Err(AllocationError::Inconsistent {
            account: node.name.clone(),
            allocated,
            total,
        });
    }

    tracing::debug!(
        "distributed {allocated} for {} as {:?}",
        &node.name,
        node.children
            .iter()
            .map(|child| child.name.as_str())
            .zip(child_weights.iter())
            .collect::<Vec<_>>()
    );

    for ((child, child_weight), target_weights) in node
        .children
        .iter()
        .zip(child_weights)
        .zip(child_target_weights)
    {
        distribute_node(child, weight_map, child_weight, target_weights, allocation)?;
    }

    Ok(())
}

/// Index of the child containing the account, and whether it is the account itself.
fn child_containing(node: &AccountTree, account: &str) -> Option<(usize, bool)> {
    node.children
        .iter()
        .position(|child| is_ancestor_or_self(&child.name, account))
        .map(|i| (i, node.children[i].name == account))
}
