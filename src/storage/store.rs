use std::collections::HashSet;

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, TimeZone};
use clap::ValueEnum;
use tracing::{debug, info};

use crate::aggregation::{
    range::DayRange,
    temporal::{Dated, TemporalNormalizer},
};

use super::entities::{Credential, Memo, PLACEHOLDER_TITLE, Theme, Todo, Transaction};

/// Categories offered before anything custom is added. They are never persisted.
pub const FIXED_CATEGORIES: [&str; 5] = ["早餐", "午餐", "晚餐", "奶茶", "生活用品"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TitleTarget {
    Accounting,
    Memo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub transactions: usize,
    pub memos: usize,
}

/// Owns every collection. Transactions, memos and todos are kept newest first, credentials and
/// custom categories in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    pub(super) transactions: Vec<Transaction>,
    pub(super) memos: Vec<Memo>,
    pub(super) todos: Vec<Todo>,
    pub(super) credentials: Vec<Credential>,
    pub(super) custom_categories: Vec<String>,
    pub(super) theme: Theme,
}

impl RecordStore {
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn memos(&self) -> &[Memo] {
        &self.memos
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    pub fn custom_categories(&self) -> &[String] {
        &self.custom_categories
    }

    /// Fixed categories followed by custom ones.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        FIXED_CATEGORIES
            .into_iter()
            .chain(self.custom_categories.iter().map(String::as_str))
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn total_spent(&self) -> f64 {
        self.transactions.iter().map(|t| t.money).sum()
    }

    fn has_category(&self, label: &str) -> bool {
        self.categories().any(|c| c == label)
    }

    /// Ids are the creation instant in milliseconds, moved past the largest id on collision.
    /// When the largest id is `i64::MAX` the closest free id below the instant is taken instead.
    fn next_id(taken: impl Iterator<Item = i64>, moment_millis: i64) -> Result<i64> {
        let taken = taken.collect::<HashSet<_>>();
        if !taken.contains(&moment_millis) {
            return Ok(moment_millis);
        }
        taken
            .iter()
            .max()
            .and_then(|max| max.checked_add(1))
            .or_else(|| (i64::MIN..moment_millis).rev().find(|id| !taken.contains(id)))
            .ok_or_else(|| anyhow!("No free id left for {moment_millis}"))
    }

    pub fn add_transaction<Tz: TimeZone>(
        &mut self,
        item: &str,
        money: f64,
        moment: DateTime<Tz>,
    ) -> Result<&Transaction> {
        let item = item.trim();
        if item.is_empty() {
            bail!("A bill needs a category");
        }
        if !money.is_finite() || money == 0. {
            bail!("Amount {money} is not a valid expense");
        }

        let id = Self::next_id(
            self.transactions.iter().map(|t| t.id),
            moment.timestamp_millis(),
        )?;
        if !self.has_category(item) {
            info!("Remembering new category {item:?}");
            self.custom_categories.push(item.to_string());
        }
        self.transactions
            .insert(0, Transaction::new(id, item, money, moment));
        debug!("Added transaction {id}");
        Ok(&self.transactions[0])
    }

    pub fn delete_transaction(&mut self, id: i64) -> Result<Transaction> {
        let position = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| anyhow!("No bill with id {id}"))?;
        Ok(self.transactions.remove(position))
    }

    /// Appends rows whose id isn't present yet. Running it twice with the same rows adds nothing
    /// the second time.
    pub fn merge_transactions(
        &mut self,
        incoming: impl IntoIterator<Item = Transaction>,
    ) -> MergeReport {
        let mut report = MergeReport::default();
        for transaction in incoming {
            if self.transactions.iter().any(|t| t.id == transaction.id) {
                debug!("Skipping transaction {} which already exists", transaction.id);
                report.skipped += 1;
            } else {
                self.transactions.push(transaction);
                report.added += 1;
            }
        }
        report
    }

    /// A memo needs text or a picture.
    pub fn add_memo<Tz: TimeZone>(
        &mut self,
        text: &str,
        image: Option<String>,
        moment: DateTime<Tz>,
    ) -> Result<&Memo> {
        let memo = Memo::new(text, image, moment);
        if memo.text.is_empty() && memo.image().is_none() {
            bail!("A memo needs text or an image");
        }
        self.memos.insert(0, memo);
        Ok(&self.memos[0])
    }

    pub fn delete_memo(&mut self, index: usize) -> Result<Memo> {
        if index >= self.memos.len() {
            bail!("No memo at position {index}");
        }
        Ok(self.memos.remove(index))
    }

    pub fn append_memos(&mut self, memos: impl IntoIterator<Item = Memo>) -> usize {
        let before = self.memos.len();
        self.memos.extend(memos);
        self.memos.len() - before
    }

    pub fn add_todo(&mut self, text: &str) -> Result<&Todo> {
        let text = text.trim();
        if text.is_empty() {
            bail!("A todo needs text");
        }
        self.todos.insert(
            0,
            Todo {
                text: text.to_string(),
                completed: false,
            },
        );
        Ok(&self.todos[0])
    }

    /// Returns the new completion state.
    pub fn toggle_todo(&mut self, index: usize) -> Result<bool> {
        let todo = self
            .todos
            .get_mut(index)
            .ok_or_else(|| anyhow!("No todo at position {index}"))?;
        todo.completed = !todo.completed;
        Ok(todo.completed)
    }

    pub fn delete_todo(&mut self, index: usize) -> Result<Todo> {
        if index >= self.todos.len() {
            bail!("No todo at position {index}");
        }
        Ok(self.todos.remove(index))
    }

    pub fn replace_todos(&mut self, todos: Vec<Todo>) {
        self.todos = todos;
    }

    pub fn add_credential<Tz: TimeZone>(
        &mut self,
        title: &str,
        account: &str,
        secret: &str,
        url: &str,
        moment: DateTime<Tz>,
    ) -> Result<&Credential> {
        let (title, account, secret) = (title.trim(), account.trim(), secret.trim());
        if title.is_empty() || account.is_empty() || secret.is_empty() {
            bail!("A credential needs a title, an account and a secret");
        }
        let id = Self::next_id(
            self.credentials.iter().map(|c| c.id),
            moment.timestamp_millis(),
        )?;
        self.credentials.push(Credential {
            id,
            title: title.to_string(),
            account: account.to_string(),
            secret: secret.to_string(),
            url: url.trim().to_string(),
        });
        Ok(&self.credentials[self.credentials.len() - 1])
    }

    pub fn delete_credential(&mut self, id: i64) -> Result<Credential> {
        let position = self
            .credentials
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| anyhow!("No credential with id {id}"))?;
        Ok(self.credentials.remove(position))
    }

    pub fn append_credentials(&mut self, credentials: impl IntoIterator<Item = Credential>) -> usize {
        let before = self.credentials.len();
        self.credentials.extend(credentials);
        self.credentials.len() - before
    }

    pub fn add_category(&mut self, label: &str) -> Result<()> {
        let label = label.trim();
        if label.is_empty() {
            bail!("A category needs a name");
        }
        if self.has_category(label) {
            bail!("Category {label:?} already exists");
        }
        self.custom_categories.push(label.to_string());
        Ok(())
    }

    /// Only custom categories can be deleted.
    pub fn delete_category(&mut self, label: &str) -> Result<()> {
        if FIXED_CATEGORIES.contains(&label) {
            bail!("Category {label:?} is built in");
        }
        let position = self
            .custom_categories
            .iter()
            .position(|c| c == label)
            .ok_or_else(|| anyhow!("No custom category {label:?}"))?;
        self.custom_categories.remove(position);
        Ok(())
    }

    /// Union preserving the current order, new labels appended in the order given.
    pub fn union_categories(&mut self, labels: impl IntoIterator<Item = String>) -> usize {
        let mut added = 0;
        for label in labels {
            if !self.custom_categories.contains(&label) {
                self.custom_categories.push(label);
                added += 1;
            }
        }
        added
    }

    pub fn set_theme(&mut self, color: Option<&str>, gradient: Option<bool>) {
        if let Some(color) = color {
            self.theme.color = color.to_string();
        }
        if let Some(gradient) = gradient {
            self.theme.gradient = gradient;
        }
    }

    pub fn reset_theme(&mut self) {
        self.theme = Theme::default();
    }

    /// Blank text stores a placeholder title.
    pub fn set_title(&mut self, target: TitleTarget, text: &str) {
        let text = if text.trim().is_empty() {
            PLACEHOLDER_TITLE
        } else {
            text
        };
        let title = match target {
            TitleTarget::Accounting => &mut self.theme.titles.accounting,
            TitleTarget::Memo => &mut self.theme.titles.memo,
        };
        *title = text.to_string();
    }

    /// Deletes transactions and/or memos dated inside the range. An unbounded range deletes
    /// nothing.
    pub fn purge_range<Tz: TimeZone>(
        &mut self,
        range: &DayRange,
        normalizer: &TemporalNormalizer<Tz>,
        transactions: bool,
        memos: bool,
    ) -> Result<PurgeReport> {
        if !transactions && !memos {
            bail!("Nothing selected to delete");
        }
        let Some(bounds) = range.resolve(normalizer.timezone()) else {
            bail!("Deleting needs both a start and an end date");
        };

        fn retain_outside<T: Dated>(
            records: &mut Vec<T>,
            inside: impl Fn(&T) -> bool,
        ) -> usize {
            let before = records.len();
            records.retain(|r| !inside(r));
            before - records.len()
        }

        let mut report = PurgeReport::default();
        if transactions {
            report.transactions = retain_outside(&mut self.transactions, |t| {
                bounds.contains(normalizer.normalize(t))
            });
        }
        if memos {
            report.memos =
                retain_outside(&mut self.memos, |m| bounds.contains(normalizer.normalize(m)));
        }
        info!(
            "Purged {} transactions and {} memos",
            report.transactions, report.memos
        );
        Ok(report)
    }

    /// Back to an empty store with the default theme.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeZone};

    use crate::{
        aggregation::{range::DayRange, temporal::TemporalNormalizer},
        storage::entities::{Memo, Transaction},
    };

    use super::{FIXED_CATEGORIES, MergeReport, RecordStore, TitleTarget};

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn at(day: u32, hour: u32) -> chrono::DateTime<FixedOffset> {
        offset().with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn new_bills_go_first_and_remember_category() {
        let mut store = RecordStore::default();
        store.add_transaction("奶茶", 15., at(1, 9)).unwrap();
        store.add_transaction(" 电影 ", 40., at(1, 20)).unwrap();

        assert_eq!(store.transactions()[0].item, "电影");
        assert_eq!(store.transactions()[1].date_string.as_deref(), Some("2024年5月1日"));
        assert_eq!(store.custom_categories(), ["电影"]);
        assert_eq!(store.categories().count(), FIXED_CATEGORIES.len() + 1);
        assert_eq!(store.total_spent(), 55.);
    }

    #[test]
    fn invalid_bills_are_rejected() {
        let mut store = RecordStore::default();

        assert!(store.add_transaction("", 15., at(1, 9)).is_err());
        assert!(store.add_transaction("午餐", 0., at(1, 9)).is_err());
        assert!(store.add_transaction("午餐", f64::NAN, at(1, 9)).is_err());
        assert!(store.transactions().is_empty());
    }

    #[test]
    fn same_millisecond_ids_are_bumped() {
        let mut store = RecordStore::default();
        let first = store.add_transaction("午餐", 10., at(1, 12)).unwrap().id;
        let second = store.add_transaction("晚餐", 20., at(1, 12)).unwrap().id;

        assert_eq!(second, first + 1);
        store.delete_transaction(first).unwrap();
        assert!(store.delete_transaction(first).is_err());
    }

    #[test]
    fn colliding_id_next_to_max_id_goes_below_instant() {
        let moment = at(1, 12).timestamp_millis();
        let mut store = RecordStore::default();
        store.merge_transactions([
            Transaction::legacy(i64::MAX, "午餐", 10., "2024年5月1日"),
            Transaction::legacy(moment, "晚餐", 20., "2024年5月1日"),
        ]);

        let id = store.add_transaction("奶茶", 15., at(1, 12)).unwrap().id;

        assert_eq!(id, moment - 1);
        assert_eq!(store.transactions().len(), 3);
    }

    #[test]
    fn merge_skips_existing_ids() {
        let mut store = RecordStore::default();
        store.merge_transactions([Transaction::legacy(1, "午餐", 10., "2024年5月1日")]);

        let report = store.merge_transactions([
            Transaction::legacy(1, "午餐", 99., "2024年5月1日"),
            Transaction::legacy(2, "晚餐", 20., "2024年5月1日"),
        ]);

        assert_eq!(report, MergeReport { added: 1, skipped: 1 });
        assert_eq!(store.transactions().iter().filter(|t| t.id == 1).count(), 1);
        assert_eq!(store.transactions()[0].money, 10.);
    }

    #[test]
    fn memo_needs_text_or_image() {
        let mut store = RecordStore::default();

        assert!(store.add_memo("", None, at(3, 10)).is_err());
        store.add_memo("", Some("data:image/jpeg;base64,AA".into()), at(3, 10)).unwrap();
        store.add_memo("hello", None, at(3, 11)).unwrap();

        assert_eq!(store.memos()[0].text, "hello");
        assert!(store.delete_memo(2).is_err());
        assert_eq!(store.delete_memo(1).unwrap().text, "");
    }

    #[test]
    fn todos_toggle_and_delete() {
        let mut store = RecordStore::default();
        store.add_todo("first").unwrap();
        store.add_todo("second").unwrap();

        assert_eq!(store.todos()[0].text, "second");
        assert!(store.toggle_todo(1).unwrap());
        assert!(!store.toggle_todo(1).unwrap());
        assert!(store.toggle_todo(2).is_err());
        assert_eq!(store.delete_todo(0).unwrap().text, "second");
    }

    #[test]
    fn credentials_require_all_fields() {
        let mut store = RecordStore::default();

        assert!(store.add_credential("mail", "", "pw", "", at(1, 1)).is_err());
        let id = store
            .add_credential("mail", "me", "pw", " https://mail ", at(1, 1))
            .unwrap()
            .id;

        assert_eq!(store.credentials()[0].url(), Some("https://mail"));
        store.delete_credential(id).unwrap();
        assert!(store.credentials().is_empty());
    }

    #[test]
    fn categories_reject_duplicates_and_builtins() {
        let mut store = RecordStore::default();
        store.add_category("电影").unwrap();

        assert!(store.add_category("电影").is_err());
        assert!(store.add_category("早餐").is_err());
        assert!(store.delete_category("早餐").is_err());
        assert_eq!(store.union_categories(["电影".into(), "书".into()]), 1);
        store.delete_category("电影").unwrap();
        assert_eq!(store.custom_categories(), ["书"]);
    }

    #[test]
    fn blank_title_gets_placeholder() {
        let mut store = RecordStore::default();
        store.set_title(TitleTarget::Memo, "  ");
        store.set_title(TitleTarget::Accounting, "花销");
        store.set_theme(Some("#ff0000"), Some(false));

        assert_eq!(store.theme().titles.memo, "我的标题");
        assert_eq!(store.theme().titles.accounting, "花销");
        assert!(!store.theme().gradient);

        store.reset_theme();
        assert_eq!(store.theme().color, "#007aff");
    }

    #[test]
    fn purge_removes_only_selected_kinds_in_range() {
        let mut store = RecordStore::default();
        store.add_transaction("午餐", 10., at(1, 12)).unwrap();
        store.add_transaction("午餐", 10., at(3, 12)).unwrap();
        store.add_memo("inside", None, at(2, 8)).unwrap();
        store.append_memos([Memo::legacy("legacy inside", "5月3日 23:00")]);
        store.add_memo("outside", None, at(9, 8)).unwrap();
        let normalizer = TemporalNormalizer::with_year(offset(), 2024);
        let range = DayRange::between(
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
        );

        let report = store.purge_range(&range, &normalizer, false, true).unwrap();

        assert_eq!(report.memos, 2);
        assert_eq!(report.transactions, 0);
        assert_eq!(store.memos().len(), 1);
        assert_eq!(store.transactions().len(), 2);

        let report = store.purge_range(&range, &normalizer, true, false).unwrap();
        assert_eq!(report.transactions, 1);
        assert!(store
            .purge_range(&DayRange::unbounded(), &normalizer, true, true)
            .is_err());
        assert!(store.purge_range(&range, &normalizer, false, false).is_err());
    }

    #[test]
    fn clear_resets_everything() {
        let mut store = RecordStore::default();
        store.add_todo("x").unwrap();
        store.set_theme(Some("#000000"), None);
        store.clear();

        assert_eq!(store, RecordStore::default());
    }
}
