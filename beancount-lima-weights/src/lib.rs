mod convert;
pub use convert::convert;

mod distribute;
pub use distribute::distribute;

mod errors;
pub use errors::{
    AllocationError, ConversionError, ParseError, RebalanceError, ValidationError,
    ValidationErrors, WeightError,
};

mod parse;
pub use parse::{accounts_with_weights, infer_bucket, parse};

mod pricing;
pub use pricing::{PricePoint, PriceTable};

mod public_types;
pub use public_types::{
    Allocation, Balance, ExcludeDirective, WeightDirective, WeightEntry, WeightMap, WeightValue,
    TOLERANCE,
};

pub mod rebalance;

mod tree;
pub use tree::{ancestors, is_ancestor_or_self, AccountIndex, AccountTree};

mod validate;
pub use validate::validate;

mod weights;
pub use weights::compute_weights;
