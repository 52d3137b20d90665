use std::{borrow::Borrow, fmt::Write, path::PathBuf};

use anyhow::Result;
use chrono::TimeZone;
use clap::Subcommand;
use tracing::info;

use crate::{
    aggregation::{
        grouping::{
            Bucket, group_memos_by_day, group_transactions_by_day, group_transactions_by_month,
            total,
        },
        range::{DayRange, filter_by_range},
        temporal::{Dated, Dating, TemporalNormalizer},
    },
    storage::{
        entities::{Memo, Transaction},
        exchange::{CREDENTIALS_FILE_NAME, credentials_to_text},
        store::RecordStore,
    },
};

use super::{Context, Outcome, range::RangeArgs};

#[derive(Subcommand, Debug)]
pub enum BillCommand {
    #[command(about = "Record an expense. Unknown categories are remembered")]
    Add {
        item: String,
        #[arg(allow_negative_numbers = true)]
        money: f64,
    },
    #[command(about = "List expenses grouped by day, newest first")]
    List {
        #[arg(long, help = "Group by month instead of by day")]
        monthly: bool,
        #[command(flatten)]
        range: RangeArgs,
    },
    #[command(about = "Delete an expense by id")]
    Delete { id: i64 },
    #[command(about = "Sum of expenses")]
    Total {
        #[command(flatten)]
        range: RangeArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum MemoCommand {
    #[command(about = "Write a memo. Needs text or an image")]
    Add {
        #[arg(default_value = "")]
        text: String,
        #[arg(long, help = "Image as a URL or data URL")]
        image: Option<String>,
    },
    #[command(about = "List memos grouped by day, newest first")]
    List {
        #[command(flatten)]
        range: RangeArgs,
    },
    #[command(about = "Delete a memo by the position shown in `memo list`")]
    Delete { index: usize },
}

#[derive(Subcommand, Debug)]
pub enum TodoCommand {
    Add { text: String },
    #[command(about = "Flip a todo between done and open")]
    Toggle { index: usize },
    Delete { index: usize },
    List,
}

#[derive(Subcommand, Debug)]
pub enum CredentialCommand {
    Add {
        title: String,
        account: String,
        secret: String,
        #[arg(long, default_value = "", help = "Website or any note")]
        url: String,
    },
    List {
        #[arg(long, help = "Show secrets instead of masking them")]
        reveal: bool,
    },
    Delete { id: i64 },
    #[command(about = "Write every credential to a plain text file, secrets included")]
    Export {
        #[arg(long, help = "Output file. Defaults to 我的密码本.txt in the current directory")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    Add { label: String },
    #[command(about = "Delete a custom category")]
    Delete { label: String },
    List,
}

fn print_transaction_buckets(buckets: &[Bucket<'_, String, Transaction>]) {
    for bucket in buckets {
        println!("{}\t{}", bucket.key, bucket.total());
        for transaction in &bucket.records {
            println!(
                "\t{}\t{}\t{}",
                transaction.id, transaction.item, transaction.money
            );
        }
        println!();
    }
}

pub fn process_bill_command(
    command: BillCommand,
    store: &mut RecordStore,
    context: &Context,
) -> Result<Outcome> {
    match command {
        BillCommand::Add { item, money } => {
            let transaction = store.add_transaction(&item, money, context.now())?;
            println!("{}\t{}\t{}", transaction.id, transaction.item, transaction.money);
            Ok(Outcome::Changed)
        }
        BillCommand::List { monthly, range } => {
            let range = range.to_day_range(context.date_style, context.now())?;
            let transactions =
                filter_by_range(store.transactions(), &range, &context.normalizer);
            let buckets = if monthly {
                group_transactions_by_month(transactions, &context.normalizer)
            } else {
                group_transactions_by_day(transactions, &context.normalizer)
            };
            if buckets.is_empty() {
                println!("No bills yet");
            }
            print_transaction_buckets(&buckets);
            Ok(Outcome::Unchanged)
        }
        BillCommand::Delete { id } => {
            let removed = store.delete_transaction(id)?;
            info!("Deleted bill {}", removed.id);
            Ok(Outcome::Changed)
        }
        BillCommand::Total { range } => {
            let range = range.to_day_range(context.date_style, context.now())?;
            println!(
                "{}",
                total(filter_by_range(
                    store.transactions(),
                    &range,
                    &context.normalizer
                ))
            );
            Ok(Outcome::Unchanged)
        }
    }
}

fn memo_line(index: usize, memo: &Memo) -> String {
    let picture = if memo.image().is_some() { " 📷" } else { "" };
    format!("\t{index}\t{}\t{}{picture}", memo.time, memo.text)
}

/// A memo together with its position in the store, which is what `memo delete` takes.
struct Positioned<'a> {
    index: usize,
    memo: &'a Memo,
}

impl Dated for Positioned<'_> {
    fn dating(&self) -> Dating<'_> {
        self.memo.dating()
    }
}

impl Borrow<Memo> for Positioned<'_> {
    fn borrow(&self) -> &Memo {
        self.memo
    }
}

/// Day headers followed by indexed memo lines, newest first. Empty when nothing is in range.
fn memo_listing<Tz: TimeZone>(
    memos: &[Memo],
    range: &DayRange,
    normalizer: &TemporalNormalizer<Tz>,
) -> String {
    let positioned = memos
        .iter()
        .enumerate()
        .map(|(index, memo)| Positioned { index, memo })
        .collect::<Vec<_>>();
    let in_range = filter_by_range(&positioned, range, normalizer);

    let mut listing = String::new();
    for bucket in group_memos_by_day(in_range, normalizer) {
        // Writing to a String can't fail.
        let _ = writeln!(listing, "{}", bucket.key);
        for entry in bucket.records {
            let _ = writeln!(listing, "{}", memo_line(entry.index, entry.memo));
        }
        listing.push('\n');
    }
    listing
}

pub fn process_memo_command(
    command: MemoCommand,
    store: &mut RecordStore,
    context: &Context,
) -> Result<Outcome> {
    match command {
        MemoCommand::Add { text, image } => {
            let memo = store.add_memo(&text, image, context.now())?;
            println!("{}", memo.time);
            Ok(Outcome::Changed)
        }
        MemoCommand::List { range } => {
            let range = range.to_day_range(context.date_style, context.now())?;
            let listing = memo_listing(store.memos(), &range, &context.normalizer);
            if listing.is_empty() {
                println!("暂无动态");
            }
            print!("{listing}");
            Ok(Outcome::Unchanged)
        }
        MemoCommand::Delete { index } => {
            store.delete_memo(index)?;
            Ok(Outcome::Changed)
        }
    }
}

pub fn process_todo_command(command: TodoCommand, store: &mut RecordStore) -> Result<Outcome> {
    match command {
        TodoCommand::Add { text } => {
            store.add_todo(&text)?;
            Ok(Outcome::Changed)
        }
        TodoCommand::Toggle { index } => {
            let completed = store.toggle_todo(index)?;
            println!("{}", if completed { "done" } else { "open" });
            Ok(Outcome::Changed)
        }
        TodoCommand::Delete { index } => {
            store.delete_todo(index)?;
            Ok(Outcome::Changed)
        }
        TodoCommand::List => {
            for (index, todo) in store.todos().iter().enumerate() {
                let mark = if todo.completed { "[x]" } else { "[ ]" };
                println!("{index}\t{mark}\t{}", todo.text);
            }
            Ok(Outcome::Unchanged)
        }
    }
}

pub async fn process_credential_command(
    command: CredentialCommand,
    store: &mut RecordStore,
    context: &Context,
) -> Result<Outcome> {
    match command {
        CredentialCommand::Add {
            title,
            account,
            secret,
            url,
        } => {
            let credential = store.add_credential(&title, &account, &secret, &url, context.now())?;
            println!("{}", credential.id);
            Ok(Outcome::Changed)
        }
        CredentialCommand::List { reveal } => {
            // Newest first
            for credential in store.credentials().iter().rev() {
                println!(
                    "{}\t{}\t👤 {}\t🔑 {}{}",
                    credential.id,
                    credential.title,
                    credential.account,
                    credential.shown_secret(reveal),
                    credential
                        .url()
                        .map(|url| format!("\t🔗 {url}"))
                        .unwrap_or_default()
                );
            }
            Ok(Outcome::Unchanged)
        }
        CredentialCommand::Delete { id } => {
            store.delete_credential(id)?;
            Ok(Outcome::Changed)
        }
        CredentialCommand::Export { output } => {
            let Some(content) = credentials_to_text(store.credentials(), context.now()) else {
                println!("空空如也");
                return Ok(Outcome::Unchanged);
            };
            let path = output.unwrap_or_else(|| PathBuf::from(CREDENTIALS_FILE_NAME));
            tokio::fs::write(&path, content).await?;
            info!("Exported credentials to {path:?}");
            println!("{}", path.display());
            Ok(Outcome::Unchanged)
        }
    }
}

pub fn process_category_command(
    command: CategoryCommand,
    store: &mut RecordStore,
) -> Result<Outcome> {
    match command {
        CategoryCommand::Add { label } => {
            store.add_category(&label)?;
            Ok(Outcome::Changed)
        }
        CategoryCommand::Delete { label } => {
            store.delete_category(&label)?;
            Ok(Outcome::Changed)
        }
        CategoryCommand::List => {
            for label in store.categories() {
                println!("{label}");
            }
            Ok(Outcome::Unchanged)
        }
    }
}
