//! `day`, `date`, `datetime`, `month`, `time`, `year`: the current
//! UTC time, formatted.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};

use crate::value::Value;

pub fn format_date(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d").to_string()
}

/// RFC 3339, whole seconds, `Z` for UTC.
pub fn format_datetime(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn format_time(t: &DateTime<Utc>) -> String {
    t.format("%H:%M:%S").to_string()
}

pub fn day(_args: &[Value]) -> Value {
    Value::Int(Utc::now().day() as i64)
}

pub fn month(_args: &[Value]) -> Value {
    Value::Int(Utc::now().month() as i64)
}

pub fn year(_args: &[Value]) -> Value {
    Value::Int(Utc::now().year() as i64)
}

pub fn date(_args: &[Value]) -> Value {
    format_date(&Utc::now()).into()
}

pub fn datetime(_args: &[Value]) -> Value {
    format_datetime(&Utc::now()).into()
}

pub fn time(_args: &[Value]) -> Value {
    format_time(&Utc::now()).into()
}
