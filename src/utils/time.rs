//! Timestamp helpers: RFC 3339 serde for stored chats and short display forms.

use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::FormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

const CLOCK_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]");
const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Deserialize an RFC 3339 formatted string into an OffsetDateTime
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime into an RFC 3339 formatted string
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = datetime
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

/// `HH:MM` in the local timezone, falling back to UTC when it is unknown.
pub fn format_clock(datetime: OffsetDateTime) -> String {
    format_with(datetime.to_offset(local_offset()), CLOCK_FORMAT)
}

/// `YYYY-MM-DD` in the local timezone, falling back to UTC when it is unknown.
pub fn format_date(datetime: OffsetDateTime) -> String {
    format_with(datetime.to_offset(local_offset()), DATE_FORMAT)
}

fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

fn format_with(datetime: OffsetDateTime, format: &[FormatItem<'_>]) -> String {
    datetime.format(format).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn clock_and_date_shapes() {
        let at = datetime!(2024-01-01 10:05:00 UTC);
        let clock = format_with(at, CLOCK_FORMAT);
        let date = format_with(at, DATE_FORMAT);
        assert_eq!(clock, "10:05");
        assert_eq!(date, "2024-01-01");
        assert_eq!(format_clock(at).len(), 5);
        assert_eq!(format_date(at).len(), 10);
    }
}
