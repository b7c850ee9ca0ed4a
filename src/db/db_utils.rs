use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, Value};
use serde_json::{Map, Number, Value as JsonValue};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Converts a DuckDB value into its JSON representation for result rows.
/// Temporal values become ISO-style strings, wide integers that do not fit
/// an i64 become strings, blobs become base64, nested values become JSON
/// arrays and objects.
pub fn value_to_json(value: Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(v) => JsonValue::Bool(v),
        Value::TinyInt(v) => v.into(),
        Value::SmallInt(v) => v.into(),
        Value::Int(v) => v.into(),
        Value::BigInt(v) => v.into(),
        Value::HugeInt(v) => i64::try_from(v)
            .map(JsonValue::from)
            .unwrap_or_else(|_| JsonValue::String(v.to_string())),
        Value::UTinyInt(v) => v.into(),
        Value::USmallInt(v) => v.into(),
        Value::UInt(v) => v.into(),
        Value::UBigInt(v) => v.into(),
        Value::Float(v) => float_to_json(f64::from(v)),
        Value::Double(v) => float_to_json(v),
        Value::Decimal(d) => {
            let text = d.to_string();
            text.parse::<Number>()
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::String(text))
        }
        Value::Text(s) => JsonValue::String(s),
        Value::Enum(s) => JsonValue::String(s),
        Value::Date32(days) => NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
            .map(|d| JsonValue::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(JsonValue::Null),
        Value::Timestamp(unit, v) => DateTime::from_timestamp_micros(to_micros(unit, v))
            .map(|ts| {
                JsonValue::String(ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string())
            })
            .unwrap_or(JsonValue::Null),
        Value::Time64(unit, v) => time_of_day(to_micros(unit, v))
            .map(|t| JsonValue::String(t.format("%H:%M:%S%.f").to_string()))
            .unwrap_or_else(|| JsonValue::String(format!("{:?}", Value::Time64(unit, v)))),
        Value::Interval { months, days, nanos } => JsonValue::String(format_interval(months, days, nanos)),
        Value::Blob(bytes) => JsonValue::String(BASE64.encode(bytes)),
        Value::List(items) | Value::Array(items) => {
            JsonValue::Array(items.into_iter().map(value_to_json).collect())
        }
        Value::Struct(fields) => JsonValue::Object(
            fields
                .iter()
                .map(|(name, v)| (name.clone(), value_to_json(v.clone())))
                .collect(),
        ),
        Value::Map(entries) => {
            let mut object = Map::new();
            for (key, v) in entries.iter() {
                object.insert(map_key(key.clone()), value_to_json(v.clone()));
            }
            JsonValue::Object(object)
        }
        Value::Union(inner) => value_to_json(*inner),
    }
}

/// JSON object keys must be strings; text keys are used as-is, anything else
/// by its JSON rendering.
fn map_key(key: Value) -> String {
    match value_to_json(key) {
        JsonValue::String(s) => s,
        other => other.to_string(),
    }
}

fn time_of_day(micros: i64) -> Option<NaiveTime> {
    let secs = u32::try_from(micros.div_euclid(MICROS_PER_SECOND)).ok()?;
    let nanos = u32::try_from(micros.rem_euclid(MICROS_PER_SECOND) * 1_000).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
}

/// Renders an interval the way DuckDB prints one, e.g. `1 year 2 months 3 days 04:05:06`.
fn format_interval(months: i32, days: i32, nanos: i64) -> String {
    let mut parts = Vec::new();
    let (years, months) = (months / 12, months % 12);
    for (amount, unit) in [(years, "year"), (months, "month"), (days, "day")] {
        if amount != 0 {
            let plural = if amount.abs() == 1 { "" } else { "s" };
            parts.push(format!("{} {}{}", amount, unit, plural));
        }
    }

    if nanos != 0 || parts.is_empty() {
        let sign = if nanos < 0 { "-" } else { "" };
        let micros = nanos.unsigned_abs() / 1_000;
        let total_secs = micros / MICROS_PER_SECOND as u64;
        let fraction = micros % MICROS_PER_SECOND as u64;
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            total_secs / 3600,
            (total_secs / 60) % 60,
            total_secs % 60
        );
        if fraction != 0 {
            clock.push_str(&format!(".{:06}", fraction));
        }
        parts.push(clock);
    }

    parts.join(" ")
}

fn float_to_json(v: f64) -> JsonValue {
    Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(MICROS_PER_SECOND),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}
