use chrono::{DateTime, Utc};

/// `EEE, dd MMM yyyy HH:mm:ss Z`, the fixed-width form mail servers stamp on the Date header.
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Parse a Date header value. Anything that does not match the fixed format is `None`.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw.trim(), DATE_FORMAT)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}
