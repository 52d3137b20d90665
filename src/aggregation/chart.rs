use std::collections::HashMap;

use serde::Serialize;

use crate::storage::entities::Transaction;

/// Slice colours of the doughnut chart, reused in order when there are more categories.
pub const CHART_PALETTE: [&str; 6] = [
    "#FF6384", "#36A2EB", "#FFCE56", "#4BC0C0", "#9966FF", "#FF9F40",
];

/// Category label → summed amount, in the order labels were first seen. Labels are compared
/// exactly as stored, "奶茶" and "奶茶 " are different categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTotals {
    entries: Vec<(String, f64)>,
}

impl CategoryTotals {
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(label, total)| (label.as_str(), *total))
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.iter().find(|(l, _)| *l == label).map(|(_, total)| total)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn category_totals<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> CategoryTotals {
    let mut positions = HashMap::<&str, usize>::new();
    let mut entries: Vec<(String, f64)> = vec![];
    for transaction in transactions {
        match positions.get(transaction.item.as_str()) {
            Some(&position) => entries[position].1 += transaction.money,
            None => {
                positions.insert(&transaction.item, entries.len());
                entries.push((transaction.item.clone(), transaction.money));
            }
        }
    }
    CategoryTotals { entries }
}

/// Ready to hand to a doughnut chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoughnutDataset {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
    pub background_color: Vec<&'static str>,
}

/// Returns `None` when there is nothing to chart.
pub fn doughnut_dataset<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> Option<DoughnutDataset> {
    let totals = category_totals(transactions);
    if totals.is_empty() {
        return None;
    }
    let (labels, data) = totals
        .entries
        .into_iter()
        .unzip::<_, _, Vec<_>, Vec<_>>();
    let background_color = CHART_PALETTE
        .iter()
        .copied()
        .cycle()
        .take(labels.len())
        .collect();
    Some(DoughnutDataset {
        labels,
        data,
        background_color,
    })
}
