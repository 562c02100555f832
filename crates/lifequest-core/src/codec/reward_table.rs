//! RewardTable - タスク本文の報酬テーブルを読む
//!
//!
//! ```text
//! | 次数 | 项目 | 值 |
//! |---|---|---|
//! | 1次 | 经验值 | 50 |
//! | 3次 | 资源/金币 | 10 |
//! ```
//!
//! # 解析ルール
//! - 列はヘッダ名で探す。名前がなければ位置（次数・项目・值）で読む
//! - 本文の最初のテーブルだけを読む
//! - 不正な行は `RewardTable::rejected` に集め、テーブル全体は失敗させない

use crate::domain::{QuestError, QuestResult, RewardRule, RewardTable, RewardTarget};

const COL_FREQUENCY: &str = "次数";
const COL_TARGET: &str = "项目";
const COL_AMOUNT: &str = "值";

#[derive(Debug, Clone, Copy)]
struct Columns {
    frequency: usize,
    target: usize,
    amount: usize,
}

impl Columns {
    fn from_header(header: &[&str]) -> Self {
        let find = |name: &str| header.iter().position(|cell| *cell == name);
        match (find(COL_FREQUENCY), find(COL_TARGET), find(COL_AMOUNT)) {
            (Some(frequency), Some(target), Some(amount)) => Self {
                frequency,
                target,
                amount,
            },
            _ => Self {
                frequency: 0,
                target: 1,
                amount: 2,
            },
        }
    }
}

pub fn parse_reward_table(body: &str) -> RewardTable {
    let mut table = RewardTable::default();

    let rows: Vec<Vec<&str>> = body
        .lines()
        .map(str::trim)
        .skip_while(|line| !line.starts_with('|'))
        .take_while(|line| line.starts_with('|'))
        .map(split_row)
        .collect();

    let Some((header, rest)) = rows.split_first() else {
        return table;
    };
    let columns = Columns::from_header(header);

    for (index, row) in rest.iter().enumerate() {
        if is_separator(row) || row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        match parse_row(row, columns) {
            Ok(rule) => table.rules.push(rule),
            Err(err) => {
                tracing::debug!(row = index + 1, error = %err, "reward row rejected");
                table.rejected.push(err);
            }
        }
    }

    table
}

fn split_row(line: &str) -> Vec<&str> {
    let inner = line.trim_start_matches('|');
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(str::trim).collect()
}

fn is_separator(row: &[&str]) -> bool {
    row.iter()
        .all(|cell| !cell.is_empty() && cell.chars().all(|c| matches!(c, '-' | ':' | ' ')))
}

fn parse_row(row: &[&str], columns: Columns) -> QuestResult<RewardRule> {
    let cell = |index: usize, name: &str| {
        row.get(index)
            .copied()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| QuestError::parse(name, "empty cell"))
    };

    let frequency = parse_frequency(cell(columns.frequency, COL_FREQUENCY)?)?;
    let target = RewardTarget::parse(cell(columns.target, COL_TARGET)?)?;
    let raw_amount = cell(columns.amount, COL_AMOUNT)?;
    let amount: i64 = raw_amount
        .trim_start_matches('+')
        .parse()
        .map_err(|_| QuestError::parse(COL_AMOUNT, format!("not an integer: {raw_amount:?}")))?;

    RewardRule::new(frequency, target, amount)
}

/// 最初の数字列: `"3次"` -> 3, `"每5次"` -> 5
fn parse_frequency(raw: &str) -> QuestResult<u32> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return Err(QuestError::parse(
            COL_FREQUENCY,
            format!("no number in {raw:?}"),
        ));
    }
    digits
        .parse()
        .map_err(|_| QuestError::parse(COL_FREQUENCY, format!("out of range: {raw:?}")))
}
