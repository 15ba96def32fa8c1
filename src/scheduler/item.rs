//! Scheduled notification input, pending item and receipt types

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::notification::{NotificationBuilder, NotificationPayload, PayloadDefaults};

use super::ScheduleError;

/// Tag placed in `data.type` of a fired notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduledKind {
    TimeBlock,
    EarlyWarning,
}

impl ScheduledKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduledKind::TimeBlock => "time-block",
            ScheduledKind::EarlyWarning => "early-warning",
        }
    }
}

/// One notification to schedule, as received over HTTP.
///
/// Used for both `/schedule-notification` and each element of
/// `/schedule-bulk`; `id` and `isEarlyWarning` only matter for the latter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItemInput {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub scheduled_time: Option<Value>,
    #[serde(default)]
    pub block_id: Option<Value>,
    #[serde(default)]
    pub is_early_warning: Option<bool>,
}

impl ScheduleItemInput {
    /// Validate the fire time and turn the input into a request
    pub fn into_request(self) -> Result<ScheduleRequest, ScheduleError> {
        let scheduled_time = parse_scheduled_time(self.scheduled_time.as_ref())?;
        Ok(ScheduleRequest {
            id: self.id.filter(|v| !v.is_null()),
            title: self.title,
            body: self.body,
            scheduled_time,
            block_id: self.block_id.filter(|v| !v.is_null()),
            is_early_warning: self.is_early_warning.unwrap_or(false),
        })
    }
}

/// A validated request to fire a notification at `scheduled_time`
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub id: Option<Value>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub scheduled_time: DateTime<Utc>,
    pub block_id: Option<Value>,
    pub is_early_warning: bool,
}

impl ScheduleRequest {
    pub fn new(scheduled_time: DateTime<Utc>) -> Self {
        Self {
            id: None,
            title: None,
            body: None,
            scheduled_time,
            block_id: None,
            is_early_warning: false,
        }
    }
}

/// A notification waiting for its timer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledItem {
    /// Internal key; unique per armed timer even when caller ids collide
    pub key: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub title: String,
    pub body: String,
    #[serde(serialize_with = "serialize_millis")]
    pub scheduled_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<Value>,
    pub is_early_warning: bool,
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: DateTime<Utc>,
}

impl ScheduledItem {
    pub fn from_request(request: ScheduleRequest, created_at: DateTime<Utc>) -> Self {
        let resolved = NotificationBuilder::new(PayloadDefaults::SCHEDULED)
            .title(request.title)
            .body(request.body)
            .build();

        Self {
            key: Uuid::new_v4(),
            id: request.id,
            title: resolved.title,
            body: resolved.body,
            scheduled_time: request.scheduled_time,
            block_id: request.block_id,
            is_early_warning: request.is_early_warning,
            created_at,
        }
    }

    pub fn kind(&self) -> ScheduledKind {
        if self.is_early_warning {
            ScheduledKind::EarlyWarning
        } else {
            ScheduledKind::TimeBlock
        }
    }

    /// Opaque `data` handed to the client when this item fires
    pub fn data(&self) -> Value {
        let mut data = serde_json::Map::new();
        if let Some(block_id) = &self.block_id {
            data.insert("blockId".to_string(), block_id.clone());
        }
        if let Some(id) = &self.id {
            data.insert("id".to_string(), id.clone());
        }
        if self.is_early_warning {
            data.insert("isEarlyWarning".to_string(), Value::Bool(true));
        }
        data.insert("type".to_string(), Value::String(self.kind().as_str().to_string()));
        Value::Object(data)
    }

    /// Payload delivered when the timer fires
    pub fn payload(&self) -> NotificationPayload {
        NotificationBuilder::new(PayloadDefaults::SCHEDULED)
            .title(Some(self.title.clone()))
            .body(Some(self.body.clone()))
            .data(Some(self.data()))
            .build()
    }
}

/// Returned when an item has been armed
#[derive(Debug, Clone)]
pub struct ScheduleReceipt {
    pub key: Uuid,
    pub scheduled_for: DateTime<Utc>,
    pub delay: Duration,
}

impl ScheduleReceipt {
    /// Fire time as RFC 3339 with milliseconds, e.g. `2026-10-17T09:30:00.000Z`
    pub fn scheduled_for_iso(&self) -> String {
        format_millis(&self.scheduled_for)
    }

    /// Delay rounded to whole seconds, e.g. `"90 seconds"`
    pub fn delay_label(&self) -> String {
        delay_label(self.delay)
    }
}

pub fn delay_label(delay: Duration) -> String {
    let seconds = (delay.as_millis() + 500) / 1000;
    format!("{} seconds", seconds)
}

pub fn format_millis(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_millis<S: serde::Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_millis(time))
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a `scheduledTime` value.
///
/// Accepts RFC 3339 strings, zone-less date-times with a `T` or space
/// separator and bare dates (all read as UTC), and numbers of milliseconds
/// since the Unix epoch.
pub fn parse_scheduled_time(value: Option<&Value>) -> Result<DateTime<Utc>, ScheduleError> {
    let value = match value {
        None | Some(Value::Null) => return Err(ScheduleError::MissingTime),
        Some(value) => value,
    };

    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(time) = DateTime::parse_from_rfc3339(s) {
                return Ok(time.with_timezone(&Utc));
            }
            NAIVE_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                })
                .map(|naive| Utc.from_utc_datetime(&naive))
                .ok_or_else(|| ScheduleError::InvalidTime(s.to_string()))
        }
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| ScheduleError::InvalidTime(n.to_string())),
        other => Err(ScheduleError::InvalidTime(other.to_string())),
    }
}
