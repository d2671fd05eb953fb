use rust_decimal::Decimal;
use std::{error::Error, fmt::Display};

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum WeightError {
    Parse(ParseError),
    Conversion(ConversionError),
    Validation(ValidationErrors),
    Allocation(AllocationError),
}

impl Display for WeightError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use WeightError::*;

        match self {
            Parse(e) => write!(f, "{e}"),
            Conversion(e) => write!(f, "{e}"),
            Validation(e) => write!(f, "{e}"),
            Allocation(e) => write!(f, "{e}"),
        }
    }
}

impl Error for WeightError {}

impl From<ParseError> for WeightError {
    fn from(value: ParseError) -> Self {
        WeightError::Parse(value)
    }
}

impl From<ConversionError> for WeightError {
    fn from(value: ConversionError) -> Self {
        WeightError::Conversion(value)
    }
}

impl From<ValidationErrors> for WeightError {
    fn from(value: ValidationErrors) -> Self {
        WeightError::Validation(value)
    }
}

impl From<AllocationError> for WeightError {
    fn from(value: AllocationError) -> Self {
        WeightError::Allocation(value)
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum ParseError {
    ForeignCurrency {
        account: String,
        currency: String,
        default_currency: String,
    },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ParseError::*;

        match self {
            ForeignCurrency {
                account,
                currency,
                default_currency,
            } => write!(
                f,
                "weight for '{account}' uses currency '{currency}', but only '{default_currency}' is allowed"
            ),
        }
    }
}

impl Error for ParseError {}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum ConversionError {
    UnknownBucket(String),
    ZeroBucketTotal {
        account: String,
        bucket: String,
    },
    AmountExceedsBucket {
        account: String,
        bucket: String,
        amount: Decimal,
        currency: String,
        bucket_total: Decimal,
    },
}

impl Display for ConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ConversionError::*;

        match self {
            UnknownBucket(bucket) => write!(f, "bucket '{bucket}' not found in account tree"),
            ZeroBucketTotal { account, bucket } => write!(
                f,
                "cannot convert absolute amount for '{account}': bucket '{bucket}' has zero total value"
            ),
            AmountExceedsBucket {
                account,
                bucket,
                amount,
                currency,
                bucket_total,
            } => {
                write!(
                    f,
                    "absolute amount {amount} {currency} for '{account}' exceeds bucket '{bucket}' total of {bucket_total} {currency}"
                )?;
                match amount
                    .checked_div(*bucket_total)
                    .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                {
                    Some(percent) => write!(f, " (would be {}%)", percent.round_dp(2)),
                    None => Ok(()),
                }
            }
        }
    }
}

impl Error for ConversionError {}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub enum ValidationError {
    UnknownBucket(String),
    UnknownAccount(String),
    WeightOutOfRange { account: String, weight: Decimal },
    NotAncestor { bucket: String, account: String },
    BucketExceedsOne { bucket: String, total: Decimal },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ValidationError::*;

        match self {
            UnknownBucket(bucket) => write!(f, "bucket account '{bucket}' not found in tree"),
            UnknownAccount(account) => write!(f, "account '{account}' not found in tree"),
            WeightOutOfRange { account, weight } => {
                write!(f, "weight {weight} for '{account}' must be in [0, 1]")
            }
            NotAncestor { bucket, account } => {
                write!(f, "bucket '{bucket}' is not ancestor of '{account}'")
            }
            BucketExceedsOne { bucket, total } => write!(
                f,
                "total custom weights in bucket '{bucket}' exceed 1.0: {total}"
            ),
        }
    }
}

impl Error for ValidationError {}

/// All the validation failures for a weight map, sorted and without duplicates.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub(crate) fn new(mut errors: Vec<ValidationError>) -> Self {
        errors.sort();
        errors.dedup();
        Self(errors)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("weight validation errors:")?;
        for e in self.0.iter() {
            write!(f, "\n{e}")?;
        }
        Ok(())
    }
}

impl Error for ValidationErrors {}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum AllocationError {
    Underallocated {
        account: String,
        allocated: Decimal,
        leftover: Decimal,
    },
    Overallocated {
        account: String,
        allocated: Decimal,
        excess: Decimal,
    },
    Inconsistent {
        account: String,
        allocated: Decimal,
        total: Decimal,
    },
}

impl Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use AllocationError::*;

        match self {
            Underallocated {
                account,
                allocated,
                leftover,
            } => write!(
                f,
                "all children of '{account}' have explicit weights but they sum to {}, leaving {leftover} unallocated; add explicit weights for all siblings or ensure they sum to {allocated}",
                *allocated - *leftover
            ),
            Overallocated {
                account,
                allocated,
                excess,
            } => write!(
                f,
                "explicit weights for children of '{account}' sum to {}, exceeding its allocation of {allocated} by {excess}",
                *allocated + *excess
            ),
            Inconsistent {
                account,
                allocated,
                total,
            } => write!(
                f,
                "weights for children of '{account}' sum to {total}, expected {allocated}"
            ),
        }
    }
}

impl Error for AllocationError {}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum RebalanceError {
    MissingCurrency(String),
}

impl Display for RebalanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use RebalanceError::*;

        match self {
            MissingCurrency(account) => write!(
                f,
                "account '{account}' has no currencies in its open directive"
            ),
        }
    }
}

impl Error for RebalanceError {}
