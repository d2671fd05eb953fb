use rust_decimal_macros::dec;
use std::cell::Cell;

use super::{weights_test_err, Fixture};
use crate::{
    convert, AccountIndex, ConversionError, ValidationError, ValidationErrors, WeightEntry,
    WeightError, WeightMap,
};

#[test]
fn test_amount_in_bucket_with_zero_total() {
    weights_test_err(
        "Assets",
        r#"
Assets:A
Assets:B
2024-01-01 weight Assets:A 100 USD
"#,
        WeightError::Conversion(ConversionError::ZeroBucketTotal {
            account: "Assets:A".to_string(),
            bucket: "Assets".to_string(),
        }),
    );
}

#[test]
fn test_amount_in_unknown_bucket() {
    weights_test_err(
        "Assets",
        r#"
Assets:A 100 USD
Assets:B 100 USD
2024-01-01 weight Assets:A 100 USD Assets:Gone
"#,
        WeightError::Conversion(ConversionError::UnknownBucket("Assets:Gone".to_string())),
    );
}

#[test]
fn test_percentage_in_unknown_bucket_left_for_validation() {
    weights_test_err(
        "Assets",
        r#"
Assets:A 100 USD
Assets:B 100 USD
2024-01-01 weight Assets:A 0.5 Assets:Gone
"#,
        WeightError::Validation(ValidationErrors::new(vec![ValidationError::UnknownBucket(
            "Assets:Gone".to_string(),
        )])),
    );
}

#[test]
fn test_amount_exceeds_bucket_message() {
    let fixture = Fixture::parse(
        "Assets",
        r#"
Assets:A 300 USD
Assets:B
2024-01-01 weight Assets:A 400 USD
"#,
    );
    let e = fixture.compute(None).unwrap_err();
    assert_eq!(
        e.to_string(),
        "absolute amount 400 USD for 'Assets:A' exceeds bucket 'Assets' total of 300 USD (would be 133.33%)"
    );
}

#[test]
fn test_bucket_valued_once() {
    let fixture = Fixture::parse(
        "Assets",
        r#"
Assets:A 600 USD
Assets:B 400 USD
2024-01-01 price ITOT 100
"#,
    );
    let index = AccountIndex::new(&fixture.tree);

    let mut weight_map = WeightMap::default();
    let bucket = weight_map.entry("Assets").or_default();
    bucket.insert("Assets:A", WeightEntry::Amount(dec!(500), "USD"));
    bucket.insert("Assets:B", WeightEntry::Amount(dec!(100), "USD"));
    weight_map
        .entry("Assets:Gone")
        .or_default()
        .insert("Assets:Gone:X", WeightEntry::Percentage(dec!(0.5)));

    let calls = Cell::new(0);
    let converted = convert(weight_map, &index, "USD", |node| {
        calls.set(calls.get() + 1);
        fixture.prices.account_value(node, None)
    })
    .unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(
        converted["Assets"]
            .iter()
            .map(|(account, weight)| (*account, *weight))
            .collect::<Vec<_>>(),
        vec![
            ("Assets:A", WeightEntry::Percentage(dec!(0.5))),
            ("Assets:B", WeightEntry::Percentage(dec!(0.1))),
        ]
    );
    assert_eq!(
        converted["Assets:Gone"]["Assets:Gone:X"],
        WeightEntry::Percentage(dec!(0.5))
    );
}

#[test]
fn test_amount_overflowing_tiny_bucket() {
    let source = r#"
Assets:A 0.0000000001 USD
Assets:B
2024-01-01 weight Assets:A 100000000000000000000 USD
"#;
    weights_test_err(
        "Assets",
        source,
        WeightError::Conversion(ConversionError::AmountExceedsBucket {
            account: "Assets:A".to_string(),
            bucket: "Assets".to_string(),
            amount: dec!(100000000000000000000),
            currency: "USD".to_string(),
            bucket_total: dec!(0.0000000001),
        }),
    );

    let e = Fixture::parse("Assets", source).compute(None).unwrap_err();
    assert_eq!(
        e.to_string(),
        "absolute amount 100000000000000000000 USD for 'Assets:A' exceeds bucket 'Assets' total of 0.0000000001 USD"
    );
}
