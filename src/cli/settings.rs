use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Subcommand;
use serde_json::json;
use tracing::info;

use crate::{
    aggregation::color::ThemeStyle,
    storage::{
        exchange::{full_export_file_name, parse_import, range_export_file_name},
        store::{RecordStore, TitleTarget},
    },
};

use super::{Context, Outcome, range::RangeArgs};

#[derive(Subcommand, Debug)]
pub enum ThemeCommand {
    #[command(about = "Print the theme and the colors derived from it")]
    Show,
    Set {
        #[arg(long, help = "Hex color such as #007aff")]
        color: Option<String>,
        #[arg(long, help = "Use a gradient background")]
        gradient: Option<bool>,
    },
    #[command(about = "Back to the default theme")]
    Reset,
    #[command(about = "Rename a page title. Blank text stores a placeholder")]
    Title {
        #[arg(value_enum)]
        target: TitleTarget,
        #[arg(default_value = "")]
        text: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DataCommand {
    #[command(
        about = "Write a JSON backup. With --start and --end only bills and memos in that range are included"
    )]
    Export {
        #[arg(long, help = "Directory for the backup. Defaults to the current directory")]
        output: Option<PathBuf>,
        #[command(flatten)]
        range: RangeArgs,
    },
    #[command(about = "Merge a JSON backup into the stored data")]
    Import { path: PathBuf },
    #[command(about = "Delete bills and/or memos inside a range")]
    Purge {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, help = "Delete bills")]
        bills: bool,
        #[arg(long, help = "Delete memos")]
        memos: bool,
    },
    #[command(about = "Delete everything")]
    Clear {
        #[arg(long, help = "Confirm deleting all stored data")]
        yes: bool,
    },
}

/// Only full `#rrggbb` colors are stored, the lightened gradient end needs all six digits.
fn validate_color(color: &str) -> Result<()> {
    match color.strip_prefix('#') {
        Some(digits) if digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_hexdigit()) => {
            Ok(())
        }
        _ => bail!("{color:?} is not a #rrggbb color"),
    }
}

pub fn process_theme_command(command: ThemeCommand, store: &mut RecordStore) -> Result<Outcome> {
    match command {
        ThemeCommand::Show => {
            let theme = store.theme();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "theme": theme,
                    "style": ThemeStyle::derive(theme),
                }))?
            );
            Ok(Outcome::Unchanged)
        }
        ThemeCommand::Set { color, gradient } => {
            if let Some(color) = &color {
                validate_color(color)?;
            }
            store.set_theme(color.as_deref(), gradient);
            Ok(Outcome::Changed)
        }
        ThemeCommand::Reset => {
            store.reset_theme();
            Ok(Outcome::Changed)
        }
        ThemeCommand::Title { target, text } => {
            store.set_title(target, &text);
            Ok(Outcome::Changed)
        }
    }
}

pub async fn process_data_command(
    command: DataCommand,
    store: &mut RecordStore,
    context: &Context,
) -> Result<Outcome> {
    match command {
        DataCommand::Export { output, range } => {
            let range = range.to_day_range(context.date_style, context.now())?;
            let (file_name, content) = match (range.start, range.end) {
                (Some(start), Some(end)) => (
                    range_export_file_name(start, end),
                    serde_json::to_string(&store.export_range(&range, &context.normalizer)?)?,
                ),
                (None, None) => (
                    full_export_file_name(context.now().date_naive()),
                    serde_json::to_string(&store.export_all())?,
                ),
                _ => bail!("A range export needs both --start and --end"),
            };
            let path = output.unwrap_or_default().join(file_name);
            tokio::fs::write(&path, content).await?;
            info!("Exported data to {path:?}");
            println!("{}", path.display());
            Ok(Outcome::Unchanged)
        }
        DataCommand::Import { path } => {
            let content = tokio::fs::read_to_string(&path).await?;
            let report = store.import(parse_import(&content)?);
            println!(
                "bills: {} added, {} skipped\nmemos: {} added\ntodos: {}\ncredentials: {} added\ncategories: {} added",
                report.transactions.added,
                report.transactions.skipped,
                report.memos,
                report
                    .todos
                    .map_or("unchanged".to_string(), |count| format!("replaced with {count}")),
                report.credentials,
                report.categories,
            );
            Ok(Outcome::Changed)
        }
        DataCommand::Purge {
            range,
            bills,
            memos,
        } => {
            let range = range.to_bounded_range(context.date_style, context.now())?;
            let report = store.purge_range(&range, &context.normalizer, bills, memos)?;
            println!(
                "Deleted {} bills and {} memos",
                report.transactions, report.memos
            );
            Ok(Outcome::Changed)
        }
        DataCommand::Clear { yes } => {
            if !yes {
                bail!("Refusing to delete everything without --yes");
            }
            store.clear();
            Ok(Outcome::Cleared)
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Local, TimeZone};
    use tempfile::tempdir;

    use crate::{
        cli::{Context, Outcome, range::{DateStyle, RangeArgs}},
        storage::store::{RecordStore, TitleTarget},
        utils::clock::FixedClock,
    };

    use super::{DataCommand, ThemeCommand, process_data_command, process_theme_command};

    fn context() -> Context {
        let moment = Local.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap();
        Context::new(Box::new(FixedClock::at(moment)), DateStyle::Uk)
    }

    #[test]
    fn theme_rejects_invalid_colors() {
        let mut store = RecordStore::default();

        assert!(process_theme_command(
            ThemeCommand::Set {
                color: Some("blue".into()),
                gradient: None
            },
            &mut store
        )
        .is_err());
        for color in ["#fff", "#00ff0", "#00ff00ff", "00ff00", "#00gg00"] {
            let set = ThemeCommand::Set {
                color: Some(color.into()),
                gradient: None,
            };
            assert!(process_theme_command(set, &mut store).is_err(), "{color}");
        }
        assert_eq!(store.theme().color, "#007aff");

        process_theme_command(
            ThemeCommand::Set {
                color: Some("#00FF00".into()),
                gradient: None,
            },
            &mut store,
        )
        .unwrap();
        assert_eq!(store.theme().color, "#00FF00");

        process_theme_command(
            ThemeCommand::Title {
                target: TitleTarget::Accounting,
                text: String::new(),
            },
            &mut store,
        )
        .unwrap();
        assert_eq!(store.theme().titles.accounting, "我的标题");
    }

    #[tokio::test]
    async fn test_export_then_import_adds_nothing_new() -> Result<()> {
        let dir = tempdir()?;
        let context = context();
        let mut store = RecordStore::default();
        store.add_transaction("午餐", 12., context.now())?;

        process_data_command(
            DataCommand::Export {
                output: Some(dir.path().to_owned()),
                range: RangeArgs::default(),
            },
            &mut store,
            &context,
        )
        .await?;
        let path = dir.path().join("备份_2024-05-03.json");
        assert!(path.exists());

        let outcome =
            process_data_command(DataCommand::Import { path }, &mut store, &context).await?;

        assert_eq!(outcome, Outcome::Changed);
        assert_eq!(store.transactions().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_needs_confirmation() -> Result<()> {
        let context = context();
        let mut store = RecordStore::default();
        store.add_todo("x")?;

        assert!(process_data_command(DataCommand::Clear { yes: false }, &mut store, &context)
            .await
            .is_err());
        assert_eq!(store.todos().len(), 1);

        let outcome =
            process_data_command(DataCommand::Clear { yes: true }, &mut store, &context).await?;
        assert_eq!(outcome, Outcome::Cleared);
        assert!(store.todos().is_empty());
        Ok(())
    }
}
