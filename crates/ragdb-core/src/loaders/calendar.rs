//! iCalendar (`.ics`) loader: one document per `VEVENT`.
//!
//! Event text is flattened as
//! `Event/Start/End/Location/Organizer/Status/Description` lines. Times keep
//! their zone: UTC and `TZID` stamps render with an offset, floating times
//! without one, all-day values as a bare date.
use anyhow::anyhow;
use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use icalendar::{Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike};
use tracing::warn;

use crate::error::{Error, Result};
use crate::loaders::DocumentLoader;
use crate::types::LoadedDocument;

const STAMP: &str = "%Y-%m-%d %H:%M:%S";
const STAMP_WITH_OFFSET: &str = "%Y-%m-%d %H:%M:%S%:z";

pub struct IcsLoader;

impl DocumentLoader for IcsLoader {
    fn load(&self, bytes: &[u8]) -> Result<Vec<LoadedDocument>> {
        let raw = std::str::from_utf8(bytes).map_err(|e| Error::loader("ics", e))?;
        if !raw.lines().any(|l| l.trim().eq_ignore_ascii_case("BEGIN:VCALENDAR")) {
            return Err(Error::loader("ics", anyhow!("missing BEGIN:VCALENDAR")));
        }
        let calendar: Calendar = raw.parse().map_err(|e| Error::loader("ics", anyhow!("{e}")))?;

        calendar
            .components
            .iter()
            .filter_map(|component| match component {
                CalendarComponent::Event(event) => Some(event_document(event)),
                _ => None,
            })
            .collect()
    }
}

fn event_document(event: &Event) -> Result<LoadedDocument> {
    let start = event
        .get_start()
        .map(render_time)
        .ok_or_else(|| Error::loader("ics", anyhow!("VEVENT without DTSTART")))?;
    let end = event.get_end().map(render_time).unwrap_or_default();
    let summary = event.get_summary().unwrap_or_default().to_string();
    let description = event.get_description().unwrap_or_default().to_string();
    let location = event.get_location().unwrap_or_default().to_string();
    let organizer = event.property_value("ORGANIZER").unwrap_or_default().to_string();
    let status = event.property_value("STATUS").unwrap_or_default().to_string();

    let text = format!(
        "Event: {summary}\nStart: {start}\nEnd: {end}\nLocation: {location}\nOrganizer: {organizer}\nStatus: {status}\nDescription: {description}"
    );
    Ok(LoadedDocument::new(text)
        .with_meta("summary", summary)
        .with_meta("start", start)
        .with_meta("end", end)
        .with_meta("location", location)
        .with_meta("organizer", organizer)
        .with_meta("status", status))
}

fn render_time(value: DatePerhapsTime) -> String {
    match value {
        DatePerhapsTime::Date(date) => date.format("%Y-%m-%d").to_string(),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(at)) => at.format(STAMP_WITH_OFFSET).to_string(),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(at)) => at.format(STAMP).to_string(),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            in_zone(&date_time, &tzid)
        }
    }
}

/// Local wall time in `tzid`; unknown zones and skipped local times fall back
/// to the floating rendering.
fn in_zone(local: &NaiveDateTime, tzid: &str) -> String {
    let Ok(tz) = tzid.parse::<Tz>() else {
        warn!(tzid, "unknown TZID, keeping floating time");
        return local.format(STAMP).to_string();
    };
    match tz.from_local_datetime(local).earliest() {
        Some(at) => at.format(STAMP_WITH_OFFSET).to_string(),
        None => {
            warn!(tzid, %local, "local time does not exist in zone");
            local.format(STAMP).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CAL: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//ragdb//tests//EN\r\n\
BEGIN:VEVENT\r\n\
UID:review@example.com\r\n\
SUMMARY:Design review\r\n\
DTSTART:20240501T090000Z\r\n\
DTEND:20240501T100000Z\r\n\
LOCATION:Room 4\r\n\
ORGANIZER;CN=Ops:mailto:ops@example.com\r\n\
STATUS:CONFIRMED\r\n\
DESCRIPTION:Walk through the\r\n  index layout\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:holiday@example.com\r\n\
SUMMARY:Holiday\r\n\
DTSTART;VALUE=DATE:20240704\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn flattens_each_event() {
        let docs = IcsLoader.load(CAL.as_bytes()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(
            docs[0].text,
            "Event: Design review\nStart: 2024-05-01 09:00:00+00:00\nEnd: 2024-05-01 10:00:00+00:00\n\
Location: Room 4\nOrganizer: mailto:ops@example.com\nStatus: CONFIRMED\n\
Description: Walk through the index layout"
        );
        assert_eq!(docs[0].metadata["summary"], json!("Design review"));
        assert!(docs[0].metadata.get("source").is_none());
        assert_eq!(docs[1].metadata["start"], json!("2024-07-04"));
        assert_eq!(docs[1].metadata["end"], json!(""));
    }

    #[test]
    fn tzid_times_carry_the_zone_offset() {
        let cal = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:standup@example.com\r\n\
SUMMARY:Standup\r\nDTSTART;TZID=Europe/Oslo:20240501T090000\r\n\
DTEND;TZID=Europe/Oslo:20241105T093000\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let docs = IcsLoader.load(cal.as_bytes()).unwrap();
        assert_eq!(docs[0].metadata["start"], json!("2024-05-01 09:00:00+02:00"));
        assert_eq!(docs[0].metadata["end"], json!("2024-11-05 09:30:00+01:00"), "after the switch to winter time");
    }

    #[test]
    fn floating_and_unknown_zone_times_have_no_offset() {
        let cal = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:f@example.com\r\n\
DTSTART:20240501T090000\r\nDTEND;TZID=Mars/Olympus:20240501T100000\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let docs = IcsLoader.load(cal.as_bytes()).unwrap();
        assert_eq!(docs[0].metadata["start"], json!("2024-05-01 09:00:00"));
        assert_eq!(docs[0].metadata["end"], json!("2024-05-01 10:00:00"));
    }

    #[test]
    fn event_without_start_fails() {
        let cal = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nSUMMARY:x\nEND:VEVENT\nEND:VCALENDAR\n";
        assert!(IcsLoader.load(cal.as_bytes()).is_err());
    }

    #[test]
    fn non_calendar_input_fails() {
        assert!(IcsLoader.load(b"hello").is_err());
    }
}
