//! Month → memo tree for the node-link view ("life orchard").
//!
//! Months are taken from the memo's display string, not from its instant, so the tree always
//! agrees with what the list shows next to each memo.

use std::collections::{HashMap, hash_map::Entry};

use chrono::TimeZone;
use clap::ValueEnum;
use serde::Serialize;

use crate::storage::entities::Memo;

use super::{
    range::{DayRange, filter_by_range},
    temporal::TemporalNormalizer,
};

/// Characters of memo text shown on a leaf.
pub const PREVIEW_CHARS: usize = 8;
pub const ELLIPSIS: &str = "...";
/// Leaf value for memos that only have a picture.
pub const IMAGE_ONLY_VALUE: &str = "[图]";

const ROOT_SIZE: u32 = 50;
const MONTH_SIZE: u32 = 35;
const LEAF_SIZE: u32 = 20;
const IMAGE_LEAF_SIZE: [u32; 2] = [50, 50];

const FRUITS: [&str; 12] = [
    "🍊", "🍓", "🍍", "🍒", "🍈", "🍑", "🍉", "🍇", "🍐", "🍎", "🍌", "🥝",
];
const FLOWERS: [&str; 12] = [
    "🌺", "🌸", "🌷", "🌹", "💐", "🪷", "🌻", "🌼", "🏵️", "🍁", "🥀", "❄️",
];

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeMode {
    #[default]
    Fruit,
    Flower,
}

impl TreeMode {
    pub fn icons(&self) -> &'static [&'static str; 12] {
        match self {
            TreeMode::Fruit => &FRUITS,
            TreeMode::Flower => &FLOWERS,
        }
    }

    /// Used when a month token isn't a month.
    pub fn fallback_icon(&self) -> &'static str {
        match self {
            TreeMode::Fruit => "🍎",
            TreeMode::Flower => "🌸",
        }
    }

    pub fn root_icon(&self) -> &'static str {
        match self {
            TreeMode::Fruit => "🌳",
            TreeMode::Flower => "💐",
        }
    }

    pub fn root_label(&self) -> &'static str {
        match self {
            TreeMode::Fruit => "生活\n果园",
            TreeMode::Flower => "生活\n花园",
        }
    }

    pub fn toggled(&self) -> TreeMode {
        match self {
            TreeMode::Fruit => TreeMode::Flower,
            TreeMode::Flower => TreeMode::Fruit,
        }
    }

    /// `month` is 1 based.
    pub fn month_icon(&self, month: Option<usize>) -> &'static str {
        month
            .and_then(|m| m.checked_sub(1))
            .and_then(|index| self.icons().get(index))
            .copied()
            .unwrap_or_else(|| self.fallback_icon())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NodeSymbol {
    Emoji(&'static str),
    /// The memo's own picture payload.
    Image(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SymbolSize {
    Square(u32),
    Rect([u32; 2]),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub symbol: NodeSymbol,
    pub symbol_size: SymbolSize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// `"5月3日 10:00"` → `"5月"`. Strings without `月` keep their whole text as the token.
pub fn month_token(time: &str) -> String {
    let month = time.split_once('月').map_or(time, |(month, _)| month);
    format!("{month}月")
}

fn month_number(token: &str) -> Option<usize> {
    token.trim_end_matches('月').trim().parse().ok()
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let mut shown = chars.by_ref().take(PREVIEW_CHARS).collect::<String>();
    if chars.next().is_some() {
        shown.push_str(ELLIPSIS);
    }
    shown
}

fn leaf(memo: &Memo, month_icon: &'static str) -> TreeNode {
    let (symbol, symbol_size) = match memo.image() {
        Some(image) => (
            NodeSymbol::Image(image.to_string()),
            SymbolSize::Rect(IMAGE_LEAF_SIZE),
        ),
        None => (NodeSymbol::Emoji(month_icon), SymbolSize::Square(LEAF_SIZE)),
    };
    let value = if memo.text.is_empty() {
        IMAGE_ONLY_VALUE.to_string()
    } else {
        memo.text.clone()
    };
    TreeNode {
        name: format!("{}\n{}", memo.display_day(), preview(&memo.text)),
        value: Some(value),
        symbol,
        symbol_size,
        children: vec![],
    }
}

/// Builds root → month → memo. Months appear in the order `memos` first mentions them. Returns
/// `None` when there is nothing to draw.
pub fn build_month_tree<'a>(
    memos: impl IntoIterator<Item = &'a Memo>,
    mode: TreeMode,
) -> Option<TreeNode> {
    let mut positions = HashMap::<String, usize>::new();
    let mut months: Vec<(String, Vec<&Memo>)> = vec![];
    for memo in memos {
        match positions.entry(month_token(&memo.time)) {
            Entry::Occupied(position) => months[*position.get()].1.push(memo),
            Entry::Vacant(position) => {
                months.push((position.key().clone(), vec![memo]));
                position.insert(months.len() - 1);
            }
        }
    }
    if months.is_empty() {
        return None;
    }

    let children = months
        .into_iter()
        .map(|(token, memos)| {
            let icon = mode.month_icon(month_number(&token));
            TreeNode {
                children: memos.into_iter().map(|memo| leaf(memo, icon)).collect(),
                name: token,
                value: None,
                symbol: NodeSymbol::Emoji(icon),
                symbol_size: SymbolSize::Square(MONTH_SIZE),
            }
        })
        .collect();

    Some(TreeNode {
        name: mode.root_label().to_string(),
        value: None,
        symbol: NodeSymbol::Emoji(mode.root_icon()),
        symbol_size: SymbolSize::Square(ROOT_SIZE),
        children,
    })
}

/// Same as [build_month_tree] restricted to memos inside `range`.
pub fn build_month_tree_in_range<'a, Tz: TimeZone>(
    memos: impl IntoIterator<Item = &'a Memo>,
    range: &DayRange,
    normalizer: &TemporalNormalizer<Tz>,
    mode: TreeMode,
) -> Option<TreeNode> {
    build_month_tree(filter_by_range(memos, range, normalizer), mode)
}
