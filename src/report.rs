use beancount_lima_weights::{rebalance::Rebalance, Allocation};
use color_eyre::eyre::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::{BufWriter, Write};
use tabulator::{Align, Cell};

use crate::Format;

const GUTTER_MINOR: &str = " ";
const GUTTER_MEDIUM: &str = "  ";

pub(crate) fn write_weights<W>(weights: &Allocation<'_>, format: Format, out_w: W) -> Result<()>
where
    W: Write,
{
    match format {
        Format::Table => write_cell(&weights_to_cell(weights), out_w),
        Format::Json => write_json(weights, out_w),
    }
}

pub(crate) fn write_rebalance<W>(rebalance: &Rebalance<'_>, format: Format, out_w: W) -> Result<()>
where
    W: Write,
{
    match format {
        Format::Table => write_cell(&rebalance_to_cell(rebalance), out_w),
        Format::Json => write_json(&RebalanceReport::from(rebalance), out_w),
    }
}

fn write_cell<W>(cell: &Cell, out_w: W) -> Result<()>
where
    W: Write,
{
    let mut buffered_out_w = BufWriter::new(out_w);
    writeln!(buffered_out_w, "{}", cell)?;
    buffered_out_w.flush()?;

    Ok(())
}

fn write_json<T, W>(x: &T, out_w: W) -> Result<()>
where
    T: Serialize,
    W: Write,
{
    let mut buffered_out_w = BufWriter::new(out_w);
    serde_json::to_writer(&mut buffered_out_w, x)?;
    writeln!(buffered_out_w)?;
    buffered_out_w.flush()?;

    Ok(())
}

fn weights_to_cell<'a>(weights: &'a Allocation<'a>) -> Cell {
    Cell::Stack(
        weights
            .iter()
            .map(|(account, weight)| {
                Cell::Row(
                    vec![
                        (*account, Align::Left).into(),
                        percent(*weight).into(),
                        ("%", Align::Left).into(),
                    ],
                    GUTTER_MEDIUM,
                )
            })
            .collect::<Vec<_>>(),
    )
}

fn rebalance_to_cell<'a>(rebalance: &'a Rebalance<'a>) -> Cell {
    let header = Cell::Row(
        [
            "account", "units", "", "value", "current%", "target%", "delta", "", "quantity",
            "price date",
        ]
        .into_iter()
        .map(|label| (label, Align::Left).into())
        .collect::<Vec<_>>(),
        GUTTER_MEDIUM,
    );

    let rows = rebalance.rows.iter().map(|row| {
        let holding = &row.holding;
        Cell::Row(
            vec![
                (holding.account, Align::Left).into(),
                holding.units.into(),
                (holding.commodity, Align::Left).into(),
                holding.market_value.round_dp(2).into(),
                percent(row.current).into(),
                percent(row.target).into(),
                row.amount_delta.round_dp(2).into(),
                (rebalance.operating_currency, Align::Left).into(),
                row.quantity_delta
                    .map(|quantity| {
                        Cell::Row(
                            vec![
                                quantity.round_dp(4).into(),
                                (holding.commodity, Align::Left).into(),
                            ],
                            GUTTER_MINOR,
                        )
                    })
                    .unwrap_or(Cell::Empty),
                holding
                    .price
                    .map(|point| (point.date.to_string(), Align::Left).into())
                    .unwrap_or(Cell::Empty),
            ],
            GUTTER_MEDIUM,
        )
    });

    let total = Cell::Row(
        vec![
            ("total", Align::Left).into(),
            rebalance.total.round_dp(2).into(),
            (rebalance.operating_currency, Align::Left).into(),
        ],
        GUTTER_MEDIUM,
    );

    Cell::Stack(
        std::iter::once(header)
            .chain(rows)
            .chain(std::iter::once(total))
            .collect::<Vec<_>>(),
    )
}

fn percent(weight: Decimal) -> Decimal {
    (weight * Decimal::ONE_HUNDRED).round_dp(2)
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "kebab-case")]
struct RebalanceReport<'a> {
    operating_currency: &'a str,
    total: Decimal,
    rows: Vec<RebalanceReportRow<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "kebab-case")]
struct RebalanceReportRow<'a> {
    account: &'a str,
    commodity: &'a str,
    units: Decimal,
    market_value: Decimal,
    current: Decimal,
    target: Decimal,
    amount_delta: Decimal,
    quantity_delta: Option<Decimal>,
    price: Option<Decimal>,
    price_date: Option<String>,
}

impl<'a> From<&Rebalance<'a>> for RebalanceReport<'a> {
    fn from(value: &Rebalance<'a>) -> Self {
        RebalanceReport {
            operating_currency: value.operating_currency,
            total: value.total,
            rows: value
                .rows
                .iter()
                .map(|row| RebalanceReportRow {
                    account: row.holding.account,
                    commodity: row.holding.commodity,
                    units: row.holding.units,
                    market_value: row.holding.market_value,
                    current: row.current,
                    target: row.target,
                    amount_delta: row.amount_delta,
                    quantity_delta: row.quantity_delta,
                    price: row.holding.price.map(|point| point.price),
                    price_date: row.holding.price.map(|point| point.date.to_string()),
                })
                .collect(),
        }
    }
}
