use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// The SQL Server shapes a cell can take on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Bit,
    SmallInt,
    Int,
    BigInt,
    Real,
    Float,
    Decimal,
    NVarChar,
    Date,
    DateTime,
    Uuid,
}

impl SqlType {
    /// The DDL type text used when creating destination tables.
    pub fn ddl(&self) -> &'static str {
        match self {
            SqlType::Bit => "BIT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Int => "INT",
            SqlType::BigInt => "BIGINT",
            SqlType::Real => "REAL",
            SqlType::Float => "FLOAT",
            SqlType::Decimal => "DECIMAL(38, 18)",
            SqlType::NVarChar => "NVARCHAR(MAX)",
            SqlType::Date => "DATE",
            SqlType::DateTime => "DATETIME2",
            SqlType::Uuid => "UNIQUEIDENTIFIER",
        }
    }

    /// Narrowest type the text parses as. Used for header-less CSV ingestion.
    pub fn infer(text: &str) -> SqlType {
        if text.parse::<i64>().is_ok() {
            return SqlType::BigInt;
        }
        if text.parse::<f64>().is_ok() {
            return SqlType::Float;
        }
        if NaiveDate::parse_from_str(text, DATE_FORMAT).is_ok() {
            return SqlType::Date;
        }
        if NaiveDateTime::parse_from_str(text, DATETIME_FORMAT).is_ok() {
            return SqlType::DateTime;
        }
        if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
            return SqlType::Bit;
        }
        if Uuid::from_str(text).is_ok() {
            return SqlType::Uuid;
        }
        SqlType::NVarChar
    }

    /// Widens two inferred types to one that holds both.
    pub fn unify(self, other: SqlType) -> SqlType {
        match (self, other) {
            (a, b) if a == b => a,
            (SqlType::BigInt, SqlType::Float) | (SqlType::Float, SqlType::BigInt) => SqlType::Float,
            (SqlType::Date, SqlType::DateTime) | (SqlType::DateTime, SqlType::Date) => {
                SqlType::DateTime
            }
            _ => SqlType::NVarChar,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ddl())
    }
}

/// A single typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bit(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Float(f64),
    Decimal(Decimal),
    NVarChar(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
}

impl SqlValue {
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bit(_) => Some(SqlType::Bit),
            SqlValue::SmallInt(_) => Some(SqlType::SmallInt),
            SqlValue::Int(_) => Some(SqlType::Int),
            SqlValue::BigInt(_) => Some(SqlType::BigInt),
            SqlValue::Real(_) => Some(SqlType::Real),
            SqlValue::Float(_) => Some(SqlType::Float),
            SqlValue::Decimal(_) => Some(SqlType::Decimal),
            SqlValue::NVarChar(_) => Some(SqlType::NVarChar),
            SqlValue::Date(_) => Some(SqlType::Date),
            SqlValue::DateTime(_) => Some(SqlType::DateTime),
            SqlValue::Uuid(_) => Some(SqlType::Uuid),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::NVarChar(text) => Some(text),
            _ => None,
        }
    }

    /// The text written to the bcp data file.
    ///
    /// Booleans become 1/0 and nulls become an empty field, which is what
    /// SQL Server expects from character-mode bcp.
    pub fn to_flat_field(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::Bit(value) => (if *value { "1" } else { "0" }).to_string(),
            SqlValue::SmallInt(value) => value.to_string(),
            SqlValue::Int(value) => value.to_string(),
            SqlValue::BigInt(value) => value.to_string(),
            SqlValue::Real(value) => value.to_string(),
            SqlValue::Float(value) => value.to_string(),
            SqlValue::Decimal(value) => value.to_string(),
            SqlValue::NVarChar(value) => value.clone(),
            SqlValue::Date(value) => value.format(DATE_FORMAT).to_string(),
            SqlValue::DateTime(value) => value.format(DATETIME_FORMAT).to_string(),
            SqlValue::Uuid(value) => value.to_string(),
        }
    }

    /// Decodes a flat-file field against the column type it came from.
    ///
    /// An empty field is a null. A field that does not parse falls back to
    /// text rather than failing the whole file, type coercion differences are
    /// inherent to character-mode bcp.
    pub fn parse_typed(text: &str, sql_type: SqlType) -> SqlValue {
        if text.is_empty() {
            return SqlValue::Null;
        }

        let parsed = match sql_type {
            SqlType::Bit => match text {
                "1" => Some(SqlValue::Bit(true)),
                "0" => Some(SqlValue::Bit(false)),
                _ if text.eq_ignore_ascii_case("true") => Some(SqlValue::Bit(true)),
                _ if text.eq_ignore_ascii_case("false") => Some(SqlValue::Bit(false)),
                _ => None,
            },
            SqlType::SmallInt => text.parse().ok().map(SqlValue::SmallInt),
            SqlType::Int => text.parse().ok().map(SqlValue::Int),
            SqlType::BigInt => text.parse().ok().map(SqlValue::BigInt),
            SqlType::Real => text.parse().ok().map(SqlValue::Real),
            SqlType::Float => text.parse().ok().map(SqlValue::Float),
            SqlType::Decimal => Decimal::from_str(text).ok().map(SqlValue::Decimal),
            SqlType::NVarChar => Some(SqlValue::NVarChar(text.to_string())),
            SqlType::Date => {
                NaiveDate::parse_from_str(text, DATE_FORMAT).ok().map(SqlValue::Date)
            }
            SqlType::DateTime => NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
                .ok()
                .map(SqlValue::DateTime),
            SqlType::Uuid => Uuid::from_str(text).ok().map(SqlValue::Uuid),
        };

        parsed.unwrap_or_else(|| SqlValue::NVarChar(text.to_string()))
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bit(value)
    }
}

impl From<i16> for SqlValue {
    fn from(value: i16) -> Self {
        SqlValue::SmallInt(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::BigInt(value)
    }
}

impl From<f32> for SqlValue {
    fn from(value: f32) -> Self {
        SqlValue::Real(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<Decimal> for SqlValue {
    fn from(value: Decimal) -> Self {
        SqlValue::Decimal(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::NVarChar(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::NVarChar(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::DateTime(value)
    }
}

impl From<Uuid> for SqlValue {
    fn from(value: Uuid) -> Self {
        SqlValue::Uuid(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_field_rendering() {
        assert_eq!(SqlValue::Null.to_flat_field(), "");
        assert_eq!(SqlValue::Bit(true).to_flat_field(), "1");
        assert_eq!(SqlValue::Bit(false).to_flat_field(), "0");
        assert_eq!(SqlValue::BigInt(-42).to_flat_field(), "-42");
        assert_eq!(SqlValue::Float(1.5).to_flat_field(), "1.5");
        assert_eq!(SqlValue::NVarChar("Frodo".to_string()).to_flat_field(), "Frodo");
        assert_eq!(
            SqlValue::Date(NaiveDate::from_ymd_opt(2019, 8, 3).unwrap()).to_flat_field(),
            "2019-08-03"
        );
    }

    #[test]
    fn test_datetime_round_trip() {
        let datetime = NaiveDate::from_ymd_opt(2019, 8, 3)
            .unwrap()
            .and_hms_micro_opt(23, 7, 15, 250_000)
            .unwrap();
        let rendered = SqlValue::DateTime(datetime).to_flat_field();
        assert_eq!(
            SqlValue::parse_typed(&rendered, SqlType::DateTime),
            SqlValue::DateTime(datetime)
        );
    }

    #[test]
    fn test_parse_typed() {
        assert_eq!(SqlValue::parse_typed("", SqlType::BigInt), SqlValue::Null);
        assert_eq!(SqlValue::parse_typed("17", SqlType::BigInt), SqlValue::BigInt(17));
        assert_eq!(SqlValue::parse_typed("1", SqlType::Bit), SqlValue::Bit(true));
        assert_eq!(
            SqlValue::parse_typed("2.25", SqlType::Decimal),
            SqlValue::Decimal(Decimal::from_str("2.25").unwrap())
        );
        // unparseable input degrades to text instead of failing the file
        assert_eq!(
            SqlValue::parse_typed("not-a-number", SqlType::BigInt),
            SqlValue::NVarChar("not-a-number".to_string())
        );
    }

    #[test]
    fn test_infer() {
        assert_eq!(SqlType::infer("12"), SqlType::BigInt);
        assert_eq!(SqlType::infer("12.5"), SqlType::Float);
        assert_eq!(SqlType::infer("2019-08-03"), SqlType::Date);
        assert_eq!(SqlType::infer("true"), SqlType::Bit);
        assert_eq!(SqlType::infer("Sam"), SqlType::NVarChar);
    }

    #[test]
    fn test_unify() {
        assert_eq!(SqlType::BigInt.unify(SqlType::Float), SqlType::Float);
        assert_eq!(SqlType::Date.unify(SqlType::DateTime), SqlType::DateTime);
        assert_eq!(SqlType::BigInt.unify(SqlType::NVarChar), SqlType::NVarChar);
        assert_eq!(SqlType::Uuid.unify(SqlType::Uuid), SqlType::Uuid);
    }
}
