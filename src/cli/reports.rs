use std::fmt::Write;

use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::Datelike;
use clap::ValueEnum;
use tracing::debug;

use crate::{
    aggregation::{
        calendar::{GridCell, WEEK_LENGTH, expense_calendar, memo_calendar},
        chart::doughnut_dataset,
        grouping::total,
        hierarchy::{TreeMode, build_month_tree_in_range},
        range::filter_by_range,
    },
    storage::store::RecordStore,
    utils::time::month_label,
};

use super::{Context, Outcome, range::RangeArgs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CalendarKind {
    Expenses,
    Memos,
}

#[derive(Debug, clap::Args)]
pub struct CalendarCommand {
    #[arg(value_enum)]
    kind: CalendarKind,
    #[arg(long, help = "Defaults to the current year")]
    year: Option<i32>,
    #[arg(long, help = "1 to 12. Defaults to the current month")]
    month: Option<u32>,
    #[arg(long, help = "Print the grid as JSON")]
    json: bool,
}

#[derive(Debug, clap::Args)]
pub struct ChartCommand {
    #[command(flatten)]
    range: RangeArgs,
    #[arg(long, help = "Print the chart dataset as JSON")]
    json: bool,
}

#[derive(Debug, clap::Args)]
pub struct TreeCommand {
    #[arg(long, value_enum, default_value_t = TreeMode::Fruit)]
    mode: TreeMode,
    #[command(flatten)]
    range: RangeArgs,
}

const WEEKDAYS: [&str; WEEK_LENGTH] = ["日", "一", "二", "三", "四", "五", "六"];
const CELL_WIDTH: usize = 8;

fn pad(text: &str) -> String {
    let width = text.chars().count();
    format!("{text}{}", " ".repeat(CELL_WIDTH.saturating_sub(width)))
}

/// Text grid: a line of day numbers followed by a line of payloads for every week. Padding is
/// computed on plain text before colouring so escape codes don't shift columns.
pub fn render_grid<P>(
    title: &str,
    cells: &[GridCell<P>],
    payload_text: impl Fn(&P) -> String,
    colored: bool,
) -> String {
    let paint = |style: Style, text: String| {
        if colored {
            style.paint(text).to_string()
        } else {
            text
        }
    };

    let mut output = format!("{title}\n");
    for weekday in WEEKDAYS {
        output.push_str(&pad(weekday));
    }
    output.push('\n');

    for week in cells.chunks(WEEK_LENGTH) {
        let mut days = String::new();
        let mut payloads = String::new();
        for cell in week {
            match cell {
                GridCell::Blank => {
                    days.push_str(&pad(""));
                    payloads.push_str(&pad(""));
                }
                GridCell::Day {
                    day,
                    is_today,
                    payload,
                } => {
                    let style = if *is_today {
                        Colour::Blue.bold()
                    } else {
                        Style::new()
                    };
                    days.push_str(&paint(style, pad(&day.to_string())));
                    let text = payload.as_ref().map(&payload_text).unwrap_or_default();
                    payloads.push_str(&paint(Colour::Green.normal(), pad(&text)));
                }
            }
        }
        // Writing to a String can't fail.
        let _ = writeln!(output, "{}\n{}", days.trim_end(), payloads.trim_end());
    }
    output
}

pub fn process_calendar_command(
    CalendarCommand {
        kind,
        year,
        month,
        json,
    }: CalendarCommand,
    store: &RecordStore,
    context: &Context,
) -> Result<Outcome> {
    let today = context.now().date_naive();
    let year = year.unwrap_or(today.year());
    let month = month.unwrap_or(today.month());
    let title = month_label(year, month);
    debug!("Building {kind:?} calendar for {title}");

    match kind {
        CalendarKind::Expenses => {
            let cells = expense_calendar(
                store.transactions(),
                year,
                month,
                Some(today),
                &context.normalizer,
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&cells)?);
            } else {
                print!(
                    "{}",
                    render_grid(&title, &cells, |total| total.to_string(), true)
                );
            }
        }
        CalendarKind::Memos => {
            let cells = memo_calendar(store.memos(), year, month, Some(today), &context.normalizer);
            if json {
                println!("{}", serde_json::to_string_pretty(&cells)?);
            } else {
                print!(
                    "{}",
                    render_grid(&title, &cells, |_| "📷".to_string(), true)
                );
                for cell in &cells {
                    if let (Some(day), Some(memo)) = (cell.day(), cell.payload()) {
                        println!("{day}\t{}\t{}", memo.time, memo.text);
                    }
                }
            }
        }
    }
    Ok(Outcome::Unchanged)
}

pub fn process_chart_command(
    ChartCommand { range, json }: ChartCommand,
    store: &RecordStore,
    context: &Context,
) -> Result<Outcome> {
    let range = range.to_day_range(context.date_style, context.now())?;
    let transactions = filter_by_range(store.transactions(), &range, &context.normalizer);
    let spent = total(transactions.iter().copied());
    let Some(dataset) = doughnut_dataset(transactions) else {
        println!("No bills to chart");
        return Ok(Outcome::Unchanged);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&dataset)?);
        return Ok(Outcome::Unchanged);
    }
    for ((label, value), color) in dataset
        .labels
        .iter()
        .zip(&dataset.data)
        .zip(&dataset.background_color)
    {
        let share = if spent == 0. { 0. } else { value / spent * 100. };
        println!("{color}\t{share:.0}%\t{value}\t{label}");
    }
    Ok(Outcome::Unchanged)
}

pub fn process_tree_command(
    TreeCommand { mode, range }: TreeCommand,
    store: &RecordStore,
    context: &Context,
) -> Result<Outcome> {
    let range = range.to_day_range(context.date_style, context.now())?;
    match build_month_tree_in_range(store.memos(), &range, &context.normalizer, mode) {
        Some(tree) => println!("{}", serde_json::to_string_pretty(&tree)?),
        None => println!("暂无动态"),
    }
    Ok(Outcome::Unchanged)
}
