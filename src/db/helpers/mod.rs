use chrono::{DateTime, NaiveDate, Utc};

use crate::db::error::{GatewayError, GatewayResult};

pub fn parse_datetime(value: &str, field: &str) -> GatewayResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| GatewayError::Storage(format!("invalid {field} '{value}': {err}")))
}

pub fn parse_date(value: &str, field: &str) -> GatewayResult<NaiveDate> {
    value
        .parse()
        .map_err(|err| GatewayError::Storage(format!("invalid {field} '{value}': {err}")))
}

pub fn to_u64(value: i64, field: &str) -> GatewayResult<u64> {
    u64::try_from(value)
        .map_err(|_| GatewayError::Storage(format!("{field} contains negative value {value}")))
}
