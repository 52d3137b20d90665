use std::fmt::Write;

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregation::{
    range::{DayRange, filter_by_range},
    temporal::TemporalNormalizer,
};

use super::{
    entities::{Credential, Memo, Theme, Todo, Transaction},
    store::{MergeReport, RecordStore},
};

/// Everything the store holds.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle<'a> {
    pub transactions: &'a [Transaction],
    pub memos: &'a [Memo],
    pub todos: &'a [Todo],
    pub passwords: &'a [Credential],
    pub custom_tags: &'a [String],
    pub current_theme: &'a Theme,
}

/// Transactions and memos inside a range, todos and credentials whole.
#[derive(Debug, Serialize)]
pub struct RangeExportBundle<'a> {
    pub transactions: Vec<&'a Transaction>,
    pub memos: Vec<&'a Memo>,
    pub todos: &'a [Todo],
    pub passwords: &'a [Credential],
}

/// Any export read back in. Every section is optional and the theme is never imported.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBundle {
    pub transactions: Option<Vec<Transaction>>,
    pub memos: Option<Vec<Memo>>,
    pub todos: Option<Vec<Todo>>,
    pub passwords: Option<Vec<Credential>>,
    pub custom_tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub transactions: MergeReport,
    pub memos: usize,
    pub todos: Option<usize>,
    pub credentials: usize,
    pub categories: usize,
}

impl RecordStore {
    pub fn export_all(&self) -> ExportBundle<'_> {
        ExportBundle {
            transactions: &self.transactions,
            memos: &self.memos,
            todos: &self.todos,
            passwords: &self.credentials,
            custom_tags: &self.custom_categories,
            current_theme: &self.theme,
        }
    }

    pub fn export_range<Tz: TimeZone>(
        &self,
        range: &DayRange,
        normalizer: &TemporalNormalizer<Tz>,
    ) -> Result<RangeExportBundle<'_>> {
        if !range.is_bounded() {
            bail!("Exporting a range needs both a start and an end date");
        }
        Ok(RangeExportBundle {
            transactions: filter_by_range(&self.transactions, range, normalizer),
            memos: filter_by_range(&self.memos, range, normalizer),
            todos: &self.todos,
            passwords: &self.credentials,
        })
    }

    /// Transactions are merged by id, memos and credentials appended, todos replaced and custom
    /// categories unioned.
    pub fn import(&mut self, bundle: ImportBundle) -> ImportReport {
        let mut report = ImportReport::default();
        if let Some(transactions) = bundle.transactions {
            report.transactions = self.merge_transactions(transactions);
        }
        if let Some(memos) = bundle.memos {
            report.memos = self.append_memos(memos);
        }
        if let Some(todos) = bundle.todos {
            report.todos = Some(todos.len());
            self.replace_todos(todos);
        }
        if let Some(credentials) = bundle.passwords {
            report.credentials = self.append_credentials(credentials);
        }
        if let Some(labels) = bundle.custom_tags {
            report.categories = self.union_categories(labels);
        }
        info!("Imported {report:?}");
        report
    }
}

pub fn parse_import(json: &str) -> Result<ImportBundle> {
    Ok(serde_json::from_str(json)?)
}

const CREDENTIAL_SEPARATOR: &str = "------------------------------";

/// Human readable dump of every credential, secrets in clear text. `None` when there is nothing
/// to export.
pub fn credentials_to_text<Tz: TimeZone>(
    credentials: &[Credential],
    exported_at: DateTime<Tz>,
) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    if credentials.is_empty() {
        return None;
    }
    let mut content = format!(
        "=== 我的密码本 ===\n导出时间: {}\n\n",
        exported_at.format("%Y/%m/%d %H:%M:%S")
    );
    for credential in credentials {
        // Writing to a String can't fail.
        let _ = write!(
            content,
            "【{}】\n账号: {}\n密码: {}\n",
            credential.title, credential.account, credential.secret
        );
        if let Some(url) = credential.url() {
            let _ = writeln!(content, "备注: {url}");
        }
        content.push_str(CREDENTIAL_SEPARATOR);
        content.push('\n');
    }
    Some(content)
}

pub const CREDENTIALS_FILE_NAME: &str = "我的密码本.txt";

pub fn full_export_file_name(date: NaiveDate) -> String {
    format!("备份_{}.json", date.format("%Y-%m-%d"))
}

pub fn range_export_file_name(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "范围备份_{}_{}.json",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    )
}
