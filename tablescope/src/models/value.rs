use bytes::{BufMut, BytesMut};
use ordered_float::OrderedFloat;
use rust_decimal::Decimal;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, Kind, ToSql, Type};
use uuid::Uuid;

type BoxedError = Box<dyn Error + Sync + Send>;

/// A single cell value, as read from or written to any column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DatabaseValue {
    Null,
    String(String),
    Number(Number),
    Boolean(bool),
    Timestamp(#[serde(with = "time::serde::rfc3339")] OffsetDateTime),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Integer(i64),
    Float(OrderedFloat<f64>),
    Decimal(Decimal),
}

/// Raised when a value cannot be encoded for, or decoded from, a Postgres type.
#[derive(Error, Debug)]
pub enum ValueConversionError {
    #[error("Cannot convert '{value}' to postgres type {type_name}")]
    InvalidText { value: String, type_name: String },

    #[error("Value {value} is out of range for postgres type {type_name}")]
    OutOfRange { value: String, type_name: String },

    #[error("Postgres type {0} is not supported")]
    UnsupportedType(String),
}

impl ValueConversionError {
    fn invalid_text(value: &str, ty: &Type) -> BoxedError {
        Box::new(ValueConversionError::InvalidText {
            value: value.to_string(),
            type_name: ty.name().to_string(),
        })
    }

    fn out_of_range(value: impl Display, ty: &Type) -> BoxedError {
        Box::new(ValueConversionError::OutOfRange {
            value: value.to_string(),
            type_name: ty.name().to_string(),
        })
    }
}

impl DatabaseValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{i}"),
            Number::Float(v) => write!(f, "{v}"),
            Number::Decimal(d) => write!(f, "{d}"),
        }
    }
}

impl Display for DatabaseValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseValue::Null => f.write_str("null"),
            DatabaseValue::String(s) => f.write_str(s),
            DatabaseValue::Number(n) => write!(f, "{n}"),
            DatabaseValue::Boolean(b) => write!(f, "{b}"),
            DatabaseValue::Timestamp(ts) => match ts.format(&Rfc3339) {
                Ok(s) => f.write_str(&s),
                Err(_) => write!(f, "{ts}"),
            },
        }
    }
}

impl ToSql for DatabaseValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxedError> {
        match self {
            DatabaseValue::Null => Ok(IsNull::Yes),
            DatabaseValue::Boolean(b) if *ty == Type::BOOL => b.to_sql(ty, out),
            DatabaseValue::Number(n) => encode_number(n, ty, out),
            DatabaseValue::Timestamp(ts) => encode_timestamp(ts, ty, out),
            DatabaseValue::String(s) => encode_text(s, ty, out),
            other => encode_text(&other.to_string(), ty, out),
        }
    }

    // The server decides the parameter type, the value adapts to it in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn encode_number(number: &Number, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxedError> {
    match (number, ty) {
        (Number::Integer(i), &Type::INT2) => i16::try_from(*i)
            .map_err(|_| ValueConversionError::out_of_range(i, ty))?
            .to_sql(ty, out),
        (Number::Integer(i), &Type::INT4) => i32::try_from(*i)
            .map_err(|_| ValueConversionError::out_of_range(i, ty))?
            .to_sql(ty, out),
        (Number::Integer(i), &Type::INT8) => i.to_sql(ty, out),
        (Number::Integer(i), &Type::OID) => u32::try_from(*i)
            .map_err(|_| ValueConversionError::out_of_range(i, ty))?
            .to_sql(ty, out),
        (Number::Integer(i), &Type::FLOAT8) => (*i as f64).to_sql(ty, out),
        (Number::Integer(i), &Type::NUMERIC) => Decimal::from(*i).to_sql(ty, out),
        (Number::Float(f), &Type::FLOAT4) => (f.into_inner() as f32).to_sql(ty, out),
        (Number::Float(f), &Type::FLOAT8) => f.into_inner().to_sql(ty, out),
        (Number::Decimal(d), &Type::NUMERIC) => d.to_sql(ty, out),
        (n, ty) => encode_text(&n.to_string(), ty, out),
    }
}

fn encode_timestamp(ts: &OffsetDateTime, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxedError> {
    let utc = ts.to_offset(UtcOffset::UTC);
    match *ty {
        Type::TIMESTAMPTZ => utc.to_sql(ty, out),
        Type::TIMESTAMP => PrimitiveDateTime::new(utc.date(), utc.time()).to_sql(ty, out),
        Type::DATE => utc.date().to_sql(ty, out),
        _ => encode_text(&utc.format(&Rfc3339)?, ty, out),
    }
}

/// Encodes the text form of a value as the binary representation of `ty`,
/// the way the server would parse a literal of that type.
fn encode_text(value: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxedError> {
    let trimmed = value.trim();
    let invalid = || ValueConversionError::invalid_text(value, ty);

    match *ty {
        Type::BOOL => parse_bool(trimmed).ok_or_else(invalid)?.to_sql(ty, out),
        Type::INT2 => trimmed.parse::<i16>().map_err(|_| invalid())?.to_sql(ty, out),
        Type::INT4 => trimmed.parse::<i32>().map_err(|_| invalid())?.to_sql(ty, out),
        Type::INT8 => trimmed.parse::<i64>().map_err(|_| invalid())?.to_sql(ty, out),
        Type::OID => trimmed.parse::<u32>().map_err(|_| invalid())?.to_sql(ty, out),
        Type::FLOAT4 => trimmed.parse::<f32>().map_err(|_| invalid())?.to_sql(ty, out),
        Type::FLOAT8 => trimmed.parse::<f64>().map_err(|_| invalid())?.to_sql(ty, out),
        Type::NUMERIC => parse_decimal(trimmed).ok_or_else(invalid)?.to_sql(ty, out),
        Type::UUID => Uuid::parse_str(trimmed).map_err(|_| invalid())?.to_sql(ty, out),
        Type::TIMESTAMPTZ => parse_offset_date_time(trimmed).ok_or_else(invalid)?.to_sql(ty, out),
        Type::TIMESTAMP => parse_primitive_date_time(trimmed).ok_or_else(invalid)?.to_sql(ty, out),
        Type::DATE => parse_date(trimmed).ok_or_else(invalid)?.to_sql(ty, out),
        Type::JSON => {
            out.put_slice(value.as_bytes());
            Ok(IsNull::No)
        }
        Type::JSONB => {
            // jsonb binary format version
            out.put_u8(1);
            out.put_slice(value.as_bytes());
            Ok(IsNull::No)
        }
        _ if matches!(ty.kind(), Kind::Enum(_)) => {
            out.put_slice(value.as_bytes());
            Ok(IsNull::No)
        }
        _ if <&str as ToSql>::accepts(ty) => value.to_sql(ty, out),
        _ => Err(Box::new(ValueConversionError::UnsupportedType(ty.name().to_string()))),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_decimal(value: &str) -> Option<Decimal> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

fn parse_date(value: &str) -> Option<Date> {
    Date::parse(value, format_description!("[year]-[month]-[day]")).ok()
}

fn parse_primitive_date_time(value: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            value,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
        )
    })
    .ok()
    .or_else(|| {
        OffsetDateTime::parse(value, &Rfc3339)
            .ok()
            .map(|ts| ts.to_offset(UtcOffset::UTC))
            .map(|ts| PrimitiveDateTime::new(ts.date(), ts.time()))
    })
    .or_else(|| parse_date(value).map(|d| d.midnight()))
}

fn parse_offset_date_time(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .or_else(|_| {
            // The text format Postgres itself produces, e.g. `2024-01-02 03:04:05.123+02`
            OffsetDateTime::parse(
                value,
                format_description!(
                    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]][offset_hour sign:mandatory][optional [:[offset_minute]]]"
                ),
            )
        })
        .ok()
        .or_else(|| parse_primitive_date_time(value).map(|ts| ts.assume_utc()))
}

impl<'a> FromSql<'a> for DatabaseValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxedError> {
        let value: DatabaseValue = match *ty {
            Type::BOOL => DatabaseValue::Boolean(bool::from_sql(ty, raw)?),
            Type::INT2 => Number::Integer(i16::from_sql(ty, raw)?.into()).into(),
            Type::INT4 => Number::Integer(i32::from_sql(ty, raw)?.into()).into(),
            Type::INT8 => Number::Integer(i64::from_sql(ty, raw)?).into(),
            Type::OID => Number::Integer(u32::from_sql(ty, raw)?.into()).into(),
            Type::FLOAT4 => Number::Float(OrderedFloat(f32::from_sql(ty, raw)?.into())).into(),
            Type::FLOAT8 => Number::Float(OrderedFloat(f64::from_sql(ty, raw)?)).into(),
            Type::NUMERIC => Number::Decimal(Decimal::from_sql(ty, raw)?).into(),
            Type::TIMESTAMPTZ => DatabaseValue::Timestamp(OffsetDateTime::from_sql(ty, raw)?),
            Type::TIMESTAMP => DatabaseValue::Timestamp(PrimitiveDateTime::from_sql(ty, raw)?.assume_utc()),
            Type::DATE => DatabaseValue::String(Date::from_sql(ty, raw)?.to_string()),
            Type::UUID => DatabaseValue::String(Uuid::from_sql(ty, raw)?.to_string()),
            Type::JSON => DatabaseValue::String(std::str::from_utf8(raw)?.to_string()),
            Type::JSONB => match raw.split_first() {
                Some((1, json)) => DatabaseValue::String(std::str::from_utf8(json)?.to_string()),
                _ => return Err(Box::new(ValueConversionError::UnsupportedType("jsonb".to_string()))),
            },
            _ if matches!(ty.kind(), Kind::Enum(_)) || <&str as FromSql>::accepts(ty) => {
                DatabaseValue::String(std::str::from_utf8(raw)?.to_string())
            }
            _ => return Err(Box::new(ValueConversionError::UnsupportedType(ty.name().to_string()))),
        };

        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxedError> {
        Ok(DatabaseValue::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Catalog type names (`pg_type.typname`) that [`DatabaseValue`] can read directly.
/// Columns of any other type are read through their text representation.
pub(crate) const NATIVELY_DECODED_TYPES: &[&str] = &[
    "bool",
    "int2",
    "int4",
    "int8",
    "oid",
    "float4",
    "float8",
    "numeric",
    "timestamptz",
    "timestamp",
    "date",
    "uuid",
    "json",
    "jsonb",
    "text",
    "varchar",
    "bpchar",
    "name",
];

impl From<Number> for DatabaseValue {
    fn from(value: Number) -> Self {
        DatabaseValue::Number(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Number(Number::Integer(value))
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Number(Number::Integer(value.into()))
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Number(Number::Float(OrderedFloat(value)))
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Boolean(value)
    }
}

impl From<OffsetDateTime> for DatabaseValue {
    fn from(value: OffsetDateTime) -> Self {
        DatabaseValue::Timestamp(value)
    }
}

impl<T: Into<DatabaseValue>> From<Option<T>> for DatabaseValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(DatabaseValue::Null)
    }
}

impl From<serde_json::Value> for DatabaseValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => DatabaseValue::Null,
            serde_json::Value::Bool(b) => DatabaseValue::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Number::Integer(i).into()
                } else if let Some(u) = n.as_u64() {
                    Number::Decimal(Decimal::from(u)).into()
                } else if let Some(f) = n.as_f64() {
                    Number::Float(OrderedFloat(f)).into()
                } else {
                    DatabaseValue::String(n.to_string())
                }
            }
            serde_json::Value::String(s) => DatabaseValue::String(s),
            other => DatabaseValue::String(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn encode(value: impl Into<DatabaseValue>, ty: &Type) -> Result<BytesMut, BoxedError> {
        let mut out = BytesMut::new();
        value.into().to_sql(ty, &mut out)?;
        Ok(out)
    }

    #[test]
    fn text_is_parsed_as_the_inferred_type() {
        assert_eq!(&encode("18", &Type::INT4).unwrap()[..], &18i32.to_be_bytes());
        assert_eq!(&encode(" 18 ", &Type::INT8).unwrap()[..], &18i64.to_be_bytes());
        assert_eq!(&encode("yes", &Type::BOOL).unwrap()[..], &[1]);
        assert_eq!(&encode("hello", &Type::TEXT).unwrap()[..], b"hello");
        assert_eq!(&encode("{\"a\":1}", &Type::JSONB).unwrap()[..], b"\x01{\"a\":1}");
    }

    #[test]
    fn numbers_are_narrowed_to_integer_columns() {
        assert_eq!(&encode(42i64, &Type::INT2).unwrap()[..], &42i16.to_be_bytes());
        assert_eq!(&encode(2.0, &Type::INT4).unwrap()[..], &2i32.to_be_bytes());

        let err = encode(100_000i64, &Type::INT2).unwrap_err();
        assert!(err.is::<ValueConversionError>());

        let err = encode(1.5, &Type::INT4).unwrap_err();
        assert!(err.is::<ValueConversionError>());
    }

    #[test]
    fn non_text_values_convert_to_text_columns() {
        assert_eq!(&encode(12i64, &Type::VARCHAR).unwrap()[..], b"12");
        assert_eq!(&encode(true, &Type::TEXT).unwrap()[..], b"true");
    }

    #[test]
    fn invalid_text_is_rejected() {
        let err = encode("eighteen", &Type::INT4).unwrap_err();
        let err = err.downcast::<ValueConversionError>().unwrap();
        assert_eq!(err.to_string(), "Cannot convert 'eighteen' to postgres type int4");
    }

    #[test]
    fn null_is_null_for_every_type() {
        let mut out = BytesMut::new();
        let result = DatabaseValue::Null.to_sql(&Type::INT4, &mut out).unwrap();
        assert!(matches!(result, IsNull::Yes));
        assert!(out.is_empty());
    }

    #[test]
    fn parses_timestamps_in_common_formats() {
        let expected = datetime!(2024-01-02 03:04:05 UTC);
        assert_eq!(parse_offset_date_time("2024-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_offset_date_time("2024-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_offset_date_time("2024-01-02 05:04:05+02"), Some(datetime!(2024-01-02 05:04:05 +2)));
        assert_eq!(
            parse_primitive_date_time("2024-01-02"),
            Some(datetime!(2024-01-02 00:00:00))
        );
    }

    #[test]
    fn round_trips_through_binary_format() {
        let ts = datetime!(2024-01-02 03:04:05 UTC);
        let raw = encode(ts, &Type::TIMESTAMPTZ).unwrap();
        assert_eq!(
            DatabaseValue::from_sql(&Type::TIMESTAMPTZ, &raw).unwrap(),
            DatabaseValue::Timestamp(ts)
        );

        let raw = encode("12.50", &Type::NUMERIC).unwrap();
        assert_eq!(
            DatabaseValue::from_sql(&Type::NUMERIC, &raw).unwrap(),
            DatabaseValue::Number(Number::Decimal(Decimal::new(1250, 2)))
        );
    }

    #[test]
    fn serializes_untagged() {
        let values = vec![
            DatabaseValue::Null,
            DatabaseValue::from("a"),
            DatabaseValue::from(1i64),
            DatabaseValue::from(true),
            DatabaseValue::from(datetime!(2024-01-02 03:04:05 UTC)),
        ];

        assert_eq!(
            serde_json::to_string(&values).unwrap(),
            r#"[null,"a",1,true,"2024-01-02T03:04:05Z"]"#
        );
    }

    #[test]
    fn converts_from_json() {
        assert_eq!(DatabaseValue::from(serde_json::json!(null)), DatabaseValue::Null);
        assert_eq!(DatabaseValue::from(serde_json::json!(5)), DatabaseValue::from(5i64));
        assert_eq!(DatabaseValue::from(serde_json::json!("x")), DatabaseValue::from("x"));
        assert_eq!(
            DatabaseValue::from(serde_json::json!({"a": [1]})),
            DatabaseValue::from("{\"a\":[1]}")
        );
    }
}
