pub mod range;
pub mod records;
pub mod reports;
pub mod settings;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use range::DateStyle;
use records::{
    BillCommand, CategoryCommand, CredentialCommand, MemoCommand, TodoCommand,
    process_bill_command, process_category_command, process_credential_command,
    process_memo_command, process_todo_command,
};
use reports::{
    CalendarCommand, ChartCommand, TreeCommand, process_calendar_command, process_chart_command,
    process_tree_command,
};
use settings::{DataCommand, ThemeCommand, process_data_command, process_theme_command};
use tracing::{debug, info, level_filters::LevelFilter};

use crate::{
    aggregation::temporal::TemporalNormalizer,
    storage::{
        persistence::{FileKeyValueStore, clear_all},
        store::RecordStore,
    },
    utils::{
        clock::{Clock, DefaultClock},
        dir::{create_application_default_path, create_dir},
        logging::{CLI_PREFIX, enable_logging},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Daybook", version, long_about = None)]
#[command(about = "Personal record keeper for expenses, memos, todos and credentials", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Enable trace logging")]
    log: bool,
    #[arg(long, global = true, help = "Also print logs to the console")]
    log_console: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Record, list and delete expenses")]
    Bill {
        #[command(subcommand)]
        command: BillCommand,
    },
    #[command(about = "Write, list and delete memos")]
    Memo {
        #[command(subcommand)]
        command: MemoCommand,
    },
    #[command(about = "Manage the todo list")]
    Todo {
        #[command(subcommand)]
        command: TodoCommand,
    },
    #[command(about = "Manage stored credentials")]
    Credential {
        #[command(subcommand)]
        command: CredentialCommand,
    },
    #[command(about = "Manage expense categories")]
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },
    #[command(about = "Show a month calendar of expenses or memo pictures")]
    Calendar {
        #[command(flatten)]
        command: CalendarCommand,
    },
    #[command(about = "Show spending per category")]
    Chart {
        #[command(flatten)]
        command: ChartCommand,
    },
    #[command(about = "Print the memo tree grouped by month")]
    Tree {
        #[command(flatten)]
        command: TreeCommand,
    },
    #[command(about = "Change colors and titles")]
    Theme {
        #[command(subcommand)]
        command: ThemeCommand,
    },
    #[command(about = "Export, import, purge or clear stored data")]
    Data {
        #[command(subcommand)]
        command: DataCommand,
    },
}

/// What a command did to the store, decides what gets persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Changed,
    Cleared,
}

/// Shared by every command.
pub struct Context {
    clock: Box<dyn Clock>,
    pub normalizer: TemporalNormalizer<Local>,
    pub date_style: DateStyle,
}

impl Context {
    pub fn new(clock: Box<dyn Clock>, date_style: DateStyle) -> Self {
        let normalizer = TemporalNormalizer::local(&clock);
        Self {
            clock,
            normalizer,
            date_style,
        }
    }

    pub fn now(&self) -> DateTime<Local> {
        self.clock.time().with_timezone(&Local)
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let application_path = match args.dir {
        Some(dir) => create_dir(dir)?,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &application_path, logging_level, args.log_console)?;
    debug!("Using application directory {application_path:?}");

    let storage = FileKeyValueStore::new(application_path.join("data"))?;
    let mut store = RecordStore::load(&storage).await?;
    let context = Context::new(Box::new(DefaultClock), args.date_style);

    match execute(args.commands, &mut store, &context).await? {
        Outcome::Unchanged => {}
        Outcome::Changed => store.save(&storage).await?,
        Outcome::Cleared => {
            clear_all(&storage).await?;
            info!("Cleared all stored data");
        }
    }
    Ok(())
}

async fn execute(commands: Commands, store: &mut RecordStore, context: &Context) -> Result<Outcome> {
    match commands {
        Commands::Bill { command } => process_bill_command(command, store, context),
        Commands::Memo { command } => process_memo_command(command, store, context),
        Commands::Todo { command } => process_todo_command(command, store),
        Commands::Credential { command } => {
            process_credential_command(command, store, context).await
        }
        Commands::Category { command } => process_category_command(command, store),
        Commands::Calendar { command } => process_calendar_command(command, store, context),
        Commands::Chart { command } => process_chart_command(command, store, context),
        Commands::Tree { command } => process_tree_command(command, store, context),
        Commands::Theme { command } => process_theme_command(command, store),
        Commands::Data { command } => process_data_command(command, store, context).await,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};
    use clap::CommandFactory;

    use crate::utils::clock::FixedClock;

    use super::{Args, Context, range::DateStyle};

    #[test]
    fn args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn context_uses_clock_year() {
        let moment = Local.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap();
        let context = Context::new(Box::new(FixedClock::at(moment)), DateStyle::Uk);

        assert_eq!(context.normalizer.current_year(), 2021);
        assert_eq!(context.now(), moment);
    }
}
