//! Mapping between semantic field types and MySQL column types.
//!
//! Three directions are covered:
//!
//! - [`FieldType::sql_type`]: the canonical column type for a semantic type
//! - [`compare`]: whether a live column type (as reported by
//!   `SHOW COLUMNS`) satisfies a declared field
//! - [`FieldType::is_value_compatible`]: whether a raw string is a legal
//!   value for a type, used for default values
//!
//! Live types are normalised by [`parse_live_type`], which upper-cases the
//! text and splits off a single `(n)` length suffix.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::types::{FieldSpec, FieldType};

static LENGTH_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]+)\((\d+)(?:,\s*\d+)?\)(?:\s+UNSIGNED)?$").expect("static regex")
});

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Default expressions accepted for timestamp-like columns.
pub const TIMESTAMP_EXPRESSIONS: [&str; 2] = ["CURRENT_TIMESTAMP", "NOW()"];

impl FieldType {
    /// Canonical MySQL column type, without any length suffix.
    ///
    /// `ENUM` and `SET` render their bare keyword; the literal list is added
    /// by [`column_type`].
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldType::String | FieldType::VarChar => "VARCHAR",
            FieldType::Char => "CHAR",
            FieldType::Text => "TEXT",
            FieldType::TinyText => "TINYTEXT",
            FieldType::MediumText => "MEDIUMTEXT",
            FieldType::LongText => "LONGTEXT",
            FieldType::Int => "INT",
            FieldType::TinyInt => "TINYINT",
            FieldType::SmallInt => "SMALLINT",
            FieldType::MediumInt => "MEDIUMINT",
            FieldType::BigInt => "BIGINT",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Real => "REAL",
            FieldType::Decimal => "DECIMAL",
            FieldType::Bool => "BOOLEAN",
            FieldType::Date => "DATE",
            FieldType::Time => "TIME",
            FieldType::DateTime => "DATETIME",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Year => "YEAR",
            FieldType::Json => "JSON",
            FieldType::Enum => "ENUM",
            FieldType::Set => "SET",
            FieldType::Binary | FieldType::Blob => "BLOB",
            FieldType::TinyBlob => "TINYBLOB",
            FieldType::MediumBlob => "MEDIUMBLOB",
            FieldType::LongBlob => "LONGBLOB",
            FieldType::Uuid => "CHAR",
            FieldType::Geometry => "GEOMETRY",
            FieldType::Point => "POINT",
            FieldType::LineString => "LINESTRING",
            FieldType::Polygon => "POLYGON",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Int
                | FieldType::TinyInt
                | FieldType::SmallInt
                | FieldType::MediumInt
                | FieldType::BigInt
        )
    }

    /// Integer, floating point, decimal and boolean types.
    pub fn is_numeric(self) -> bool {
        self.is_integer()
            || matches!(
                self,
                FieldType::Float
                    | FieldType::Double
                    | FieldType::Real
                    | FieldType::Decimal
                    | FieldType::Bool
            )
    }

    /// Character types that hold short strings (`VARCHAR`/`CHAR` family).
    pub fn is_string(self) -> bool {
        matches!(
            self,
            FieldType::String | FieldType::VarChar | FieldType::Char | FieldType::Uuid
        )
    }

    pub fn is_text(self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::TinyText | FieldType::MediumText | FieldType::LongText
        )
    }

    pub fn is_blob(self) -> bool {
        matches!(
            self,
            FieldType::Binary
                | FieldType::Blob
                | FieldType::TinyBlob
                | FieldType::MediumBlob
                | FieldType::LongBlob
        )
    }

    pub fn is_spatial(self) -> bool {
        matches!(
            self,
            FieldType::Geometry | FieldType::Point | FieldType::LineString | FieldType::Polygon
        )
    }

    /// Types carrying a literal list (`ENUM`, `SET`).
    pub fn has_literals(self) -> bool {
        matches!(self, FieldType::Enum | FieldType::Set)
    }

    /// Length implied by the type's rendering when none is declared.
    pub fn implicit_length(self) -> Option<u32> {
        match self {
            FieldType::Uuid => Some(36),
            FieldType::Decimal => Some(10),
            _ => None,
        }
    }

    /// Reports whether `value` is a legal literal for this type.
    ///
    /// Integers and floats must parse, dates and times must match
    /// `YYYY-MM-DD` / `YYYY-MM-DD HH:MM:SS` / `HH:MM:SS`, JSON must parse,
    /// booleans accept `0`, `1`, `true` and `false`. Everything else passes.
    ///
    /// # Examples
    ///
    /// ```
    /// use modelsync_core::FieldType;
    ///
    /// assert!(FieldType::Int.is_value_compatible("42"));
    /// assert!(!FieldType::Int.is_value_compatible("4.2"));
    /// assert!(FieldType::Timestamp.is_value_compatible("CURRENT_TIMESTAMP"));
    /// assert!(FieldType::Json.is_value_compatible(r#"{"a":1}"#));
    /// assert!(!FieldType::Bool.is_value_compatible("yes"));
    /// ```
    pub fn is_value_compatible(self, value: &str) -> bool {
        match self {
            ty if ty.is_integer() => value.parse::<i64>().is_ok(),
            FieldType::Float | FieldType::Double | FieldType::Real | FieldType::Decimal => {
                value.parse::<f64>().is_ok()
            }
            FieldType::Bool => matches!(value, "0" | "1" | "true" | "false"),
            FieldType::Date => {
                NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok()
                    || NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).is_ok()
            }
            FieldType::Time => {
                NaiveTime::parse_from_str(value, TIME_FORMAT).is_ok()
                    || NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok()
                    || NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).is_ok()
            }
            FieldType::DateTime | FieldType::Timestamp => {
                NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).is_ok()
                    || TIMESTAMP_EXPRESSIONS.contains(&value)
            }
            FieldType::Year => value.len() == 4 && value.parse::<u16>().is_ok(),
            FieldType::Json => serde_json::from_str::<serde_json::Value>(value).is_ok(),
            _ => true,
        }
    }
}

/// Full column type of a declared field, e.g. `VARCHAR(100)` or
/// `ENUM('a','b')`.
///
/// # Examples
///
/// ```
/// use modelsync_core::{FieldSpec, FieldType, column_type};
///
/// assert_eq!(column_type(&FieldSpec::new("n", FieldType::VarChar).length(100)), "VARCHAR(100)");
/// assert_eq!(column_type(&FieldSpec::new("d", FieldType::Decimal).length(12)), "DECIMAL(12,2)");
/// assert_eq!(column_type(&FieldSpec::new("u", FieldType::Uuid)), "CHAR(36)");
/// assert_eq!(
///     column_type(&FieldSpec::new("s", FieldType::Enum).values(["on", "off"])),
///     "ENUM('on','off')"
/// );
/// ```
pub fn column_type(field: &FieldSpec) -> String {
    let ty = field.field_type;
    if ty.has_literals() {
        return format!("{}({})", ty.sql_type(), literal_list(&field.values));
    }
    match ty {
        FieldType::Decimal => {
            let precision = if field.length > 0 { field.length } else { 10 };
            format!("DECIMAL({precision},2)")
        }
        FieldType::Uuid => "CHAR(36)".to_string(),
        FieldType::Bool => ty.sql_type().to_string(),
        _ if field.length > 0 => format!("{}({})", ty.sql_type(), field.length),
        _ => ty.sql_type().to_string(),
    }
}

fn literal_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Splits a live column type into its upper-cased base and length.
///
/// Only a single numeric length (optionally followed by a scale, which is
/// dropped) is recognised; anything else, such as `ENUM('a','b')`, comes
/// back whole with length `0`.
///
/// # Examples
///
/// ```
/// use modelsync_core::parse_live_type;
///
/// assert_eq!(parse_live_type("varchar(20)"), ("VARCHAR".to_string(), 20));
/// assert_eq!(parse_live_type("decimal(10,2)"), ("DECIMAL".to_string(), 10));
/// assert_eq!(parse_live_type("text"), ("TEXT".to_string(), 0));
/// assert_eq!(parse_live_type("enum('a','b')"), ("ENUM('A','B')".to_string(), 0));
/// ```
pub fn parse_live_type(live: &str) -> (String, u32) {
    let upper = live.trim().to_uppercase();
    if let Some(caps) = LENGTH_SUFFIX.captures(&upper) {
        let length = caps[2].parse().unwrap_or(0);
        return (caps[1].to_string(), length);
    }
    (upper, 0)
}

/// Semantic types a live base type is accepted for.
fn accepted_types(base: &str) -> &'static [FieldType] {
    match base {
        "TINYINT" => &[FieldType::TinyInt, FieldType::Bool],
        "SMALLINT" => &[FieldType::SmallInt],
        "MEDIUMINT" => &[FieldType::MediumInt],
        "INT" | "INTEGER" => &[FieldType::Int],
        "BIGINT" => &[FieldType::BigInt],
        "VARCHAR" => &[FieldType::VarChar, FieldType::String],
        "CHAR" => &[FieldType::Char, FieldType::String, FieldType::Uuid],
        "TEXT" => &[FieldType::Text, FieldType::String],
        "TINYTEXT" => &[FieldType::TinyText],
        "MEDIUMTEXT" => &[FieldType::MediumText],
        "LONGTEXT" => &[FieldType::LongText, FieldType::Json],
        "BOOL" | "BOOLEAN" => &[FieldType::Bool, FieldType::TinyInt],
        "DECIMAL" | "NUMERIC" => &[FieldType::Decimal],
        "FLOAT" => &[FieldType::Float],
        "DOUBLE" | "REAL" => &[FieldType::Double, FieldType::Real],
        "JSON" => &[FieldType::Json],
        "BLOB" => &[FieldType::Blob, FieldType::Binary],
        "TINYBLOB" => &[FieldType::TinyBlob],
        "MEDIUMBLOB" => &[FieldType::MediumBlob],
        "LONGBLOB" => &[FieldType::LongBlob],
        "DATE" => &[FieldType::Date],
        "TIME" => &[FieldType::Time],
        "DATETIME" => &[FieldType::DateTime],
        "TIMESTAMP" => &[FieldType::Timestamp],
        "YEAR" => &[FieldType::Year],
        "GEOMETRY" => &[FieldType::Geometry],
        "POINT" => &[FieldType::Point],
        "LINESTRING" => &[FieldType::LineString],
        "POLYGON" => &[FieldType::Polygon],
        _ => &[],
    }
}

/// Reports whether a live column type satisfies the declared field's type.
///
/// The live text is normalised with [`parse_live_type`] and its base (the
/// part before any `(`) looked up in a fixed acceptance table, so `TINYINT`
/// satisfies both `TinyInt` and `Bool`. `ENUM` and `SET` instead require the
/// rendered literal list to match the live text exactly, ignoring case.
///
/// # Examples
///
/// ```
/// use modelsync_core::{FieldSpec, FieldType, compare};
///
/// let flag = FieldSpec::new("active", FieldType::Bool);
/// assert!(compare(&flag, "tinyint(1)"));
/// assert!(!compare(&flag, "int(11)"));
///
/// let gender = FieldSpec::new("gender", FieldType::Enum).values(["male", "female"]);
/// assert!(compare(&gender, "enum('male','female')"));
/// assert!(!compare(&gender, "enum('male','female','other')"));
/// ```
pub fn compare(field: &FieldSpec, live: &str) -> bool {
    let (normalised, _) = parse_live_type(live);
    let base = normalised.split('(').next().unwrap_or_default();

    if field.field_type.has_literals() {
        if base != field.field_type.sql_type() {
            return false;
        }
        let expected = format!(
            "{}({})",
            field.field_type.sql_type(),
            literal_list(&field.values)
        );
        return normalised == expected.to_uppercase();
    }

    accepted_types(base).contains(&field.field_type)
}
