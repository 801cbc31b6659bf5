use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

const ISO_DATE: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");
const MEDIUM_DATE: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none], [year]");

/// `YYYY-MM-DD`, as expected by date inputs of edit forms.
pub fn format_iso(date: &Date) -> String {
    date.format(ISO_DATE).unwrap_or_default()
}

/// Human readable date, like `Oct 19, 2026`.
pub fn format_medium(date: &Date) -> String {
    date.format(MEDIUM_DATE).unwrap_or_default()
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, keeping only its date.
pub fn parse_date(value: &str) -> Option<Date> {
    Date::parse(value, ISO_DATE)
        .ok()
        .or_else(|| OffsetDateTime::parse(value, &Rfc3339).ok().map(|t| t.date()))
}
