use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::FieldError;

/// Text written for a timestamp that was never set.
pub const ZERO_TIMESTAMP: &str = "0001-01-01T00:00:00Z";

// Unix seconds of `ZERO_TIMESTAMP`
const ZERO_UNIX_SECONDS: i64 = -62_135_596_800;

/// The durable rate-limit and quota state of a geocoding client.
///
/// Serialized as exactly four newline-separated lines: the credential, the
/// last request time, the quota-exceeded flag and the quota reset instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateRecord {
    /// API key sent with every request
    pub credential: String,
    /// Admission instant of the most recent request, `None` if never
    pub last_request_time: Option<DateTime<Utc>>,
    /// Whether the daily quota was observed to be exhausted
    pub quota_exceeded: bool,
    /// Instant at which an exhausted quota resets, only meaningful while
    /// `quota_exceeded` is set
    pub quota_reset_at: Option<DateTime<Utc>>,
}

impl StateRecord {
    /// Creates an otherwise empty record holding `credential`
    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self { credential: credential.into(), ..Default::default() }
    }

    /// Serializes the record into its four line text form.
    #[must_use]
    pub fn encode(&self) -> String {
        [
            self.credential.clone(),
            format_timestamp(self.last_request_time),
            self.quota_exceeded.to_string(),
            format_timestamp(self.quota_reset_at),
        ]
        .join("\n")
    }

    /// Parses a record from its text form.
    ///
    /// Missing trailing lines take their zero value and lines past the
    /// fourth are ignored. A line that is present but fails to parse also
    /// takes its zero value and is reported in the returned errors.
    pub fn decode(text: &str) -> (Self, Vec<FieldError>) {
        let mut record = Self::default();
        let mut errors = Vec::new();
        let mut lines = text.lines();

        if let Some(line) = lines.next() {
            record.credential = line.trim().to_string();
        }
        if let Some(line) = lines.next() {
            record.last_request_time = parse_timestamp(line)
                .unwrap_or_else(|message| {
                    errors.push(FieldError {
                        line: 2,
                        field: "last_request_time",
                        message,
                    });
                    None
                });
        }
        if let Some(line) = lines.next() {
            record.quota_exceeded = parse_bool(line).unwrap_or_else(|message| {
                errors.push(FieldError { line: 3, field: "quota_exceeded", message });
                false
            });
        }
        if let Some(line) = lines.next() {
            record.quota_reset_at = parse_timestamp(line).unwrap_or_else(
                |message| {
                    errors.push(FieldError {
                        line: 4,
                        field: "quota_reset_at",
                        message,
                    });
                    None
                },
            );
        }

        (record, errors)
    }
}

fn format_timestamp(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(time) => time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        None => ZERO_TIMESTAMP.to_string(),
    }
}

fn parse_timestamp(
    line: &str,
) -> Result<Option<DateTime<Utc>>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let time = DateTime::parse_from_rfc3339(line)
        .map_err(|e| format!("invalid timestamp '{line}': {e}"))?
        .with_timezone(&Utc);
    if time.timestamp() == ZERO_UNIX_SECONDS && time.timestamp_subsec_nanos() == 0
    {
        return Ok(None);
    }
    Ok(Some(time))
}

fn parse_bool(line: &str) -> Result<bool, String> {
    match line.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(format!("invalid boolean '{other}'")),
    }
}
