//! Sheet locator: maps worksheet names of the form `재무상태표(전체)` to sheet keys

use crate::error::{StatementError, StatementResult};
use crate::types::{SheetKey, StatementType, UnitType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::warn;

static SHEET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(자금계산서|재무상태표|운영계산서)\s*\(\s*(전체|등록금|비등록금)\s*\)\s*$")
        .expect("sheet name pattern is valid")
});

/// What to do when two sheets of one workbook map to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateSheetPolicy {
    /// Later sheet in workbook order replaces the earlier one
    #[default]
    LastWins,
    /// Earlier sheet is kept
    FirstWins,
    /// The workbook is rejected
    Error,
}

/// Parse one sheet name into its key, if it follows the naming convention.
pub fn parse_sheet_name(name: &str) -> Option<SheetKey> {
    let caps = SHEET_PATTERN.captures(name)?;
    let statement = StatementType::from_label(caps.get(1)?.as_str())?;
    let unit = UnitType::from_label(caps.get(2)?.as_str())?;
    Some(SheetKey::new(statement, unit))
}

/// Sheet key → actual sheet name for one workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SheetMap {
    sheets: BTreeMap<SheetKey, String>,
}

impl SheetMap {
    pub fn get(&self, key: &SheetKey) -> Option<&str> {
        self.sheets.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SheetKey, &String)> {
        self.sheets.iter()
    }
}

/// Match sheet names against the `<statement>(<unit>)` convention.
///
/// Names that do not match are ignored. Collisions are resolved by `policy`
/// and always logged.
pub fn match_sheets<S: AsRef<str>>(
    names: &[S],
    policy: DuplicateSheetPolicy,
) -> StatementResult<SheetMap> {
    let mut sheets: BTreeMap<SheetKey, String> = BTreeMap::new();

    for name in names {
        let name = name.as_ref();
        let Some(key) = parse_sheet_name(name) else {
            continue;
        };

        if let Some(existing) = sheets.get(&key) {
            warn!(
                key = %key,
                first = %existing,
                second = %name,
                ?policy,
                "Duplicate statement sheet"
            );
            match policy {
                DuplicateSheetPolicy::LastWins => {}
                DuplicateSheetPolicy::FirstWins => continue,
                DuplicateSheetPolicy::Error => {
                    return Err(StatementError::DuplicateSheet {
                        key: key.to_string(),
                        first: existing.clone(),
                        second: name.to_string(),
                    });
                }
            }
        }
        sheets.insert(key, name.to_string());
    }

    Ok(SheetMap { sheets })
}
