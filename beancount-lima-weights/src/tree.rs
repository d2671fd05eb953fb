use hashbrown::HashMap;
use rust_decimal::Decimal;

use super::Balance;

pub(crate) const SEPARATOR: char = ':';

/// A node in the chart of accounts, with the balance of its whole subtree.
///
/// Each child's name extends its parent's name by one `:`-separated component.
#[derive(PartialEq, Eq, Clone, Default, Debug)]
pub struct AccountTree {
    pub name: String,
    pub children: Vec<AccountTree>,
    pub balance: Balance,
}

impl AccountTree {
    pub fn new<S>(name: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            children: Vec::default(),
            balance: Balance::default(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Find the node with the given name in this subtree.
    pub fn find(&self, name: &str) -> Option<&AccountTree> {
        if self.name == name {
            Some(self)
        } else if is_ancestor_or_self(&self.name, name) {
            self.children
                .iter()
                .find(|child| is_ancestor_or_self(&child.name, name))
                .and_then(|child| child.find(name))
        } else {
            None
        }
    }

    /// Depth-first pre-order traversal of this subtree.
    pub fn iter(&self) -> impl Iterator<Item = &AccountTree> {
        let mut stack = vec![self];

        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    pub fn leaves(&self) -> impl Iterator<Item = &AccountTree> {
        self.iter().filter(|node| node.is_leaf())
    }

    /// Build the tree rooted at `root` from per-account balances.
    ///
    /// Accounts outside `root` are ignored.  Intermediate accounts are created as required,
    /// and every balance is rolled up into all its ancestors.  Children are ordered by name.
    pub fn from_balances<'a, I>(root: &'a str, balances: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Balance)>,
    {
        let mut builder = TreeBuilder::default();
        builder.node(root);

        for (account, balance) in balances {
            if !is_ancestor_or_self(root, account) {
                tracing::debug!("from_balances ignoring {account} outside {root}");
                continue;
            }

            let mut name = account;
            loop {
                let node = builder.node(name);
                for (cur, units) in balance.iter() {
                    *node.balance.entry(cur.clone()).or_insert(Decimal::ZERO) += *units;
                }

                if name == root {
                    break;
                }
                let parent_name = parent(name).unwrap_or(root);
                builder.child(parent_name, name);
                name = parent_name;
            }
        }

        builder.build(root)
    }
}

#[derive(Default, Debug)]
struct TreeBuilder<'a> {
    // hashbrown HashMaps are used here for their Entry API
    nodes: HashMap<&'a str, AccountTree>,
    children: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> TreeBuilder<'a> {
    fn node(&mut self, name: &'a str) -> &mut AccountTree {
        self.nodes
            .entry(name)
            .or_insert_with(|| AccountTree::new(name))
    }

    fn child(&mut self, parent: &'a str, child: &'a str) {
        let children = self.children.entry(parent).or_default();
        if !children.contains(&child) {
            children.push(child);
        }
    }

    fn build(mut self, root: &'a str) -> AccountTree {
        self.take(root)
    }

    fn take(&mut self, name: &'a str) -> AccountTree {
        let mut node = self.nodes.remove(name).unwrap_or_else(|| AccountTree::new(name));
        let mut names = self.children.remove(name).unwrap_or_default();
        names.sort();

        node.children = names.into_iter().map(|name| self.take(name)).collect();
        node
    }
}

/// Lookup of every account in a tree by name.
#[derive(Debug)]
pub struct AccountIndex<'a>(HashMap<&'a str, &'a AccountTree>);

impl<'a> AccountIndex<'a> {
    pub fn new(tree: &'a AccountTree) -> Self {
        Self(tree.iter().map(|node| (node.name.as_str(), node)).collect())
    }

    pub fn get(&self, name: &str) -> Option<&'a AccountTree> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Whether `ancestor` is `descendant` or one of its ancestors in the account hierarchy.
pub fn is_ancestor_or_self(ancestor: &str, descendant: &str) -> bool {
    match descendant.strip_prefix(ancestor) {
        Some("") => true,
        Some(rest) => rest.starts_with(SEPARATOR),
        None => false,
    }
}

pub(crate) fn parent(account: &str) -> Option<&str> {
    account.rfind(SEPARATOR).map(|i| &account[..i])
}

/// The proper ancestors of an account, closest first.
pub fn ancestors(account: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(parent(account), |account| parent(*account))
}
