use std::{
    borrow::Borrow,
    collections::{HashMap, hash_map::Entry},
    hash::Hash,
};

use chrono::TimeZone;
use serde::Serialize;
use tracing::instrument;

use crate::storage::entities::{Memo, Transaction};

use super::temporal::{Dated, TemporalNormalizer};

/// Records sharing a grouping key. Members keep the newest first order of the grouping pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket<'a, K, T> {
    pub key: K,
    pub records: Vec<&'a T>,
}

impl<K, T> Bucket<'_, K, T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<K> Bucket<'_, K, Transaction> {
    pub fn total(&self) -> f64 {
        total(self.records.iter().copied())
    }
}

/// Sorts `records` newest first and buckets them by `key`. Buckets come out in the order the
/// sorted list first meets each key, so the newest bucket is first.
pub fn group_newest_first<'a, T, K, Tz>(
    records: impl IntoIterator<Item = &'a T>,
    normalizer: &TemporalNormalizer<Tz>,
    key: impl Fn(&T) -> K,
) -> Vec<Bucket<'a, K, T>>
where
    T: Dated + 'a,
    K: Eq + Hash + Clone,
    Tz: TimeZone,
{
    let mut positions = HashMap::<K, usize>::new();
    let mut buckets: Vec<Bucket<'a, K, T>> = vec![];

    for record in normalizer.sort_newest_first(records) {
        match positions.entry(key(record)) {
            Entry::Occupied(position) => buckets[*position.get()].records.push(record),
            Entry::Vacant(position) => {
                buckets.push(Bucket {
                    key: position.key().clone(),
                    records: vec![record],
                });
                position.insert(buckets.len() - 1);
            }
        }
    }

    buckets
}

/// Day buckets keyed by the display date, not by the instant. Two rows shown under the same
/// date always share a bucket regardless of time zone.
#[instrument(skip_all)]
pub fn group_transactions_by_day<'a, Tz: TimeZone>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    normalizer: &TemporalNormalizer<Tz>,
) -> Vec<Bucket<'a, String, Transaction>> {
    group_newest_first(transactions, normalizer, |t| t.display_date().into_owned())
}

/// Month buckets keyed by the `<year>年<month>月` prefix of the display date.
pub fn group_transactions_by_month<'a, Tz: TimeZone>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    normalizer: &TemporalNormalizer<Tz>,
) -> Vec<Bucket<'a, String, Transaction>> {
    group_newest_first(transactions, normalizer, |t| {
        let date = t.display_date();
        match date.split_once('月') {
            Some((month, _)) => format!("{month}月"),
            None => date.into_owned(),
        }
    })
}

/// Day buckets of memos keyed by the date part of their display time. Works on anything that
/// borrows as a memo, so callers can carry extra data such as the stored position.
pub fn group_memos_by_day<'a, M, Tz>(
    memos: impl IntoIterator<Item = &'a M>,
    normalizer: &TemporalNormalizer<Tz>,
) -> Vec<Bucket<'a, String, M>>
where
    M: Dated + Borrow<Memo> + 'a,
    Tz: TimeZone,
{
    group_newest_first(memos, normalizer, |m| {
        <M as Borrow<Memo>>::borrow(m).display_day().to_string()
    })
}

pub fn total<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> f64 {
    transactions.into_iter().map(|t| t.money).sum()
}
