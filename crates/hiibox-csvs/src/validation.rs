/*!
# CSV Validation & I/O

Reading, writing and row-level validation for the reward and task catalogues.
A catalogue that reads successfully is safe to import: every row carries the
columns its type requires and identifiers are unique.
*/

use crate::{
    errors::{CsvError, CsvResult},
    schemas::{
        RewardCsvRow, TaskCsvRow, RARITIES, REWARDS_CSV_HEADERS, REWARD_TYPES, TASKS_CSV_HEADERS,
        TASK_KINDS,
    },
};
use csv::{Reader, Writer};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

// ================================================================================================
// CSV Reading with Validation
// ================================================================================================

/// Read and validate a rewards CSV file
pub fn read_rewards_csv<P: AsRef<Path>>(path: P) -> CsvResult<Vec<RewardCsvRow>> {
    let file = File::open(path)?;
    let mut rdr = Reader::from_reader(file);

    let headers = rdr.headers()?;
    validate_headers(headers.iter(), REWARDS_CSV_HEADERS, "rewards.csv")?;

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: RewardCsvRow = result?;
        rows.push(row);
    }

    validate_reward_rows(&rows)?;
    Ok(rows)
}

/// Read and validate a tasks CSV file
pub fn read_tasks_csv<P: AsRef<Path>>(path: P) -> CsvResult<Vec<TaskCsvRow>> {
    let file = File::open(path)?;
    let mut rdr = Reader::from_reader(file);

    let headers = rdr.headers()?;
    validate_headers(headers.iter(), TASKS_CSV_HEADERS, "tasks.csv")?;

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: TaskCsvRow = result?;
        rows.push(row);
    }

    validate_task_rows(&rows)?;
    Ok(rows)
}

// ================================================================================================
// CSV Writing
// ================================================================================================

/// Write rewards CSV (csv crate writes the headers from the first row)
pub fn write_rewards_csv<P: AsRef<Path>>(path: P, rows: &[RewardCsvRow]) -> CsvResult<()> {
    validate_reward_rows(rows)?;

    let file = File::create(path)?;
    let mut wtr = Writer::from_writer(file);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write tasks CSV (csv crate writes the headers from the first row)
pub fn write_tasks_csv<P: AsRef<Path>>(path: P, rows: &[TaskCsvRow]) -> CsvResult<()> {
    validate_task_rows(rows)?;

    let file = File::create(path)?;
    let mut wtr = Writer::from_writer(file);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

// ================================================================================================
// Row Validation
// ================================================================================================

/// Validate reward rows
///
/// Ensures:
/// - The table is non-empty and names are unique
/// - `box_tier`, when given, is a lowercase slug
/// - `type` and `rarity` are recognised
/// - Explicit weights are finite and positive
/// - Each type carries its payload columns
pub fn validate_reward_rows(rows: &[RewardCsvRow]) -> CsvResult<()> {
    if rows.is_empty() {
        return Err(CsvError::SchemaValidation(
            "Rewards CSV file is empty".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for (i, row) in rows.iter().enumerate() {
        let invalid = |message: String| CsvError::InvalidRow { row: i + 1, message };

        if !names.insert(row.name.as_str()) {
            return Err(CsvError::Duplicate {
                field: "name",
                value: row.name.clone(),
            });
        }
        if !is_tier_slug(row.box_tier()) {
            return Err(invalid(format!("invalid box tier '{}'", row.box_tier())));
        }
        if !REWARD_TYPES.contains(&row.reward_type.as_str()) {
            return Err(invalid(format!("unknown reward type '{}'", row.reward_type)));
        }
        if !RARITIES.contains(&row.rarity.as_str()) {
            return Err(invalid(format!("unknown rarity '{}'", row.rarity)));
        }
        if let Some(weight) = row.weight {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(invalid(format!("weight must be positive, got {}", weight)));
            }
        }

        match row.reward_type.as_str() {
            "token" => {
                match row.amount {
                    Some(amount) if amount > Decimal::ZERO => {}
                    _ => return Err(invalid("token reward requires a positive amount".into())),
                }
                if row.symbol.as_deref().unwrap_or("").is_empty() {
                    return Err(invalid("token reward requires a symbol".into()));
                }
            }
            "points" => match row.amount {
                Some(amount) if amount > Decimal::ZERO && amount.fract().is_zero() => {}
                _ => {
                    return Err(invalid(
                        "points reward requires a positive whole amount".into(),
                    ))
                }
            },
            "collectible" => {
                if row.collection.as_deref().unwrap_or("").is_empty() {
                    return Err(invalid("collectible reward requires a collection".into()));
                }
            }
            "ticket" => {
                if row.event.as_deref().unwrap_or("").is_empty() {
                    return Err(invalid("ticket reward requires an event".into()));
                }
            }
            _ => unreachable!("reward type checked above"),
        }
    }

    Ok(())
}

fn is_tier_slug(tier: &str) -> bool {
    !tier.is_empty()
        && tier
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Validate task rows
///
/// Ensures:
/// - Task ids are unique and non-empty
/// - `kind` is recognised
/// - NFT tasks name a collection and a minimum balance
/// - Every task can grant at least one key
pub fn validate_task_rows(rows: &[TaskCsvRow]) -> CsvResult<()> {
    if rows.is_empty() {
        return Err(CsvError::SchemaValidation(
            "Tasks CSV file is empty".to_string(),
        ));
    }

    let mut ids = HashSet::new();
    for (i, row) in rows.iter().enumerate() {
        let invalid = |message: String| CsvError::InvalidRow { row: i + 1, message };

        if row.id.trim().is_empty() {
            return Err(invalid("task id is empty".into()));
        }
        if !ids.insert(row.id.as_str()) {
            return Err(CsvError::Duplicate {
                field: "id",
                value: row.id.clone(),
            });
        }
        if !TASK_KINDS.contains(&row.kind.as_str()) {
            return Err(invalid(format!("unknown task kind '{}'", row.kind)));
        }

        let proportional = row.keys_per_nft.unwrap_or(0) > 0;
        if row.kind == "nft" {
            if row.collection.as_deref().unwrap_or("").is_empty() {
                return Err(invalid("nft task requires a collection".into()));
            }
            if row.min_balance.unwrap_or(0) == 0 {
                return Err(invalid("nft task requires min_balance >= 1".into()));
            }
        } else if row.keys_per_nft.is_some() || row.max_keys.is_some() {
            return Err(invalid(format!(
                "{} task cannot use proportional awards",
                row.kind
            )));
        }

        if row.reward_keys == 0 && !proportional {
            return Err(invalid("task grants no keys".into()));
        }
    }

    Ok(())
}

// ================================================================================================
// Header Validation
// ================================================================================================

fn validate_headers<'a, I>(actual: I, expected: &[&str], file_type: &str) -> CsvResult<()>
where
    I: Iterator<Item = &'a str>,
{
    let actual_headers: Vec<&str> = actual.collect();

    if actual_headers.len() != expected.len() {
        return Err(CsvError::SchemaValidation(format!(
            "{}: expected {} headers, found {}",
            file_type,
            expected.len(),
            actual_headers.len()
        )));
    }

    for (i, (actual, expected)) in actual_headers.iter().zip(expected.iter()).enumerate() {
        if actual != expected {
            return Err(CsvError::SchemaValidation(format!(
                "{}: header {} should be '{}', found '{}'",
                file_type,
                i + 1,
                expected,
                actual
            )));
        }
    }

    Ok(())
}

// ================================================================================================
// Tests
// ================================================================================================
