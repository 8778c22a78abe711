//! Declared raw schema for the league game log.
//!
//! Maps upstream headers onto [`PlayerGameLogRecord`] columns and coerces the
//! loosely typed upstream values. Fetching never coerces; this is the only
//! place raw values change type.

use std::collections::BTreeSet;

use serde_json::Value;
use time::macros::format_description;
use time::Date;
use tracing::warn;

use crate::domain::{RawRecordMap, WinLoss, WorkUnitKey};
use crate::{PlayerGameLogRecord, SchemaError};

/// Version tag of the header mapping below.
pub const RAW_SCHEMA_VERSION: &str = "player_game_logs.v1";

/// Headers a work unit must carry.
pub const REQUIRED_HEADERS: [&str; 11] = [
    "GAME_ID",
    "GAME_DATE",
    "TEAM_ABBREVIATION",
    "PLAYER_ID",
    "PLAYER_NAME",
    "WL",
    "MIN",
    "PTS",
    "REB",
    "AST",
    "PLUS_MINUS",
];

/// Headers mapped when present.
pub const OPTIONAL_HEADERS: [&str; 2] = ["TEAM_ID", "MATCHUP"];

/// Check the header set of a unit's records against the raw schema.
///
/// Returns the headers outside the mapping, which are dropped.
pub fn check_headers(records: &[RawRecordMap]) -> Result<Vec<String>, SchemaError> {
    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };

    let missing = REQUIRED_HEADERS
        .iter()
        .filter(|header| !first.contains_key(**header))
        .map(|header| (*header).to_string())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(SchemaError::MissingHeaders { missing });
    }

    let known = REQUIRED_HEADERS
        .iter()
        .chain(OPTIONAL_HEADERS.iter())
        .copied()
        .collect::<BTreeSet<_>>();
    Ok(first
        .keys()
        .filter(|header| !known.contains(header.as_str()))
        .cloned()
        .collect())
}

/// Normalize every raw record of `unit` into a typed row.
pub fn normalize_unit(
    unit: &WorkUnitKey,
    records: &[RawRecordMap],
) -> Result<Vec<PlayerGameLogRecord>, SchemaError> {
    let unmapped = check_headers(records)?;
    if !unmapped.is_empty() {
        warn!(unit = %unit, ?unmapped, schema = RAW_SCHEMA_VERSION, "dropping unmapped upstream headers");
    }

    records
        .iter()
        .enumerate()
        .map(|(row, record)| normalize_record(unit, row, record))
        .collect()
}

fn normalize_record(
    unit: &WorkUnitKey,
    row: usize,
    record: &RawRecordMap,
) -> Result<PlayerGameLogRecord, SchemaError> {
    let field = Field { row, record };

    let win_loss = field
        .required_text("WL", "win_loss")?
        .parse::<WinLoss>()
        .map_err(|error| field.invalid("win_loss", error.to_string()))?;

    Ok(PlayerGameLogRecord {
        season: unit.as_str().to_string(),
        game_id: field.required_text("GAME_ID", "game_id")?,
        game_date: field.game_date()?,
        team_id: field.optional_integer("TEAM_ID", "team_id")?,
        team_abbr: field.required_text("TEAM_ABBREVIATION", "team_abbr")?,
        matchup: field.optional_text("MATCHUP"),
        player_id: field
            .optional_integer("PLAYER_ID", "player_id")?
            .ok_or_else(|| field.invalid("player_id", "is required"))?,
        player_name: field.required_text("PLAYER_NAME", "player_name")?,
        minutes: field.minutes()?,
        points: field.optional_integer("PTS", "points")?,
        rebounds: field.optional_integer("REB", "rebounds")?,
        assists: field.optional_integer("AST", "assists")?,
        plus_minus: field.optional_float("PLUS_MINUS", "plus_minus")?,
        win_loss: win_loss.as_str().to_string(),
    })
}

struct Field<'a> {
    row: usize,
    record: &'a RawRecordMap,
}

impl Field<'_> {
    fn invalid(&self, field: &'static str, reason: impl Into<String>) -> SchemaError {
        SchemaError::InvalidValue {
            row: self.row,
            field,
            reason: reason.into(),
        }
    }

    fn value(&self, header: &str) -> Option<&Value> {
        self.record.get(header).filter(|value| !value.is_null())
    }

    fn optional_text(&self, header: &str) -> Option<String> {
        match self.value(header)? {
            Value::String(text) => Some(text.trim().to_string()),
            other => Some(other.to_string()),
        }
    }

    fn required_text(&self, header: &str, field: &'static str) -> Result<String, SchemaError> {
        match self.value(header) {
            Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Some(Value::Number(number)) => Ok(number.to_string()),
            Some(other) => Err(self.invalid(field, format!("must be text, got {other}"))),
            None => Err(self.invalid(field, "is required")),
        }
    }

    fn game_date(&self) -> Result<String, SchemaError> {
        let raw = self.required_text("GAME_DATE", "game_date")?;
        let day = raw.split('T').next().unwrap_or_default();
        let date = Date::parse(day, format_description!("[year]-[month]-[day]"))
            .map_err(|error| self.invalid("game_date", format!("'{raw}' is not YYYY-MM-DD: {error}")))?;
        Ok(date.to_string())
    }

    fn optional_integer(&self, header: &str, field: &'static str) -> Result<Option<i64>, SchemaError> {
        let Some(value) = self.value(header) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(number) => number.as_i64().or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0 && float.is_finite())
                    .map(|float| float as i64)
            }),
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| self.invalid(field, format!("must be an integer, got {value}")))
    }

    fn optional_float(&self, header: &str, field: &'static str) -> Result<Option<f64>, SchemaError> {
        let Some(value) = self.value(header) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .filter(|float| float.is_finite())
            .map(Some)
            .ok_or_else(|| self.invalid(field, format!("must be a number, got {value}")))
    }

    /// `MIN` is either a number of minutes or `MM:SS`.
    fn minutes(&self) -> Result<Option<f64>, SchemaError> {
        if let Some(Value::String(text)) = self.value("MIN") {
            if let Some((minutes, seconds)) = text.trim().split_once(':') {
                return match (minutes.parse::<u32>(), seconds.parse::<u32>()) {
                    (Ok(minutes), Ok(seconds)) if seconds < 60 => {
                        Ok(Some(f64::from(minutes) + f64::from(seconds) / 60.0))
                    }
                    _ => Err(self.invalid("minutes_played", format!("'{text}' is not MM:SS"))),
                };
            }
        }
        self.optional_float("MIN", "minutes_played")
    }
}
