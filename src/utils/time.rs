use mongodb::bson::DateTime;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub fn to_chrono(value: DateTime) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp_millis(value.timestamp_millis()).unwrap_or_default()
}

pub fn from_chrono(value: chrono::DateTime<chrono::Utc>) -> DateTime {
    DateTime::from_millis(value.timestamp_millis())
}

pub fn add_days(value: DateTime, days: i32) -> DateTime {
    DateTime::from_millis(value.timestamp_millis().saturating_add(days as i64 * MILLIS_PER_DAY))
}
