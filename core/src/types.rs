//! Declarative table and column model.
//!
//! A [`TableModel`] is a named, ordered collection of [`FieldSpec`]s. Each
//! field describes one column independent of any live database state: its
//! semantic [`FieldType`], length, nullability, default, auto-increment,
//! [`IndexFlags`] and an optional [`ForeignKey`]. Models are validated once
//! when they are constructed and are immutable afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::validate::{ValidationError, validate_table};

/// Semantic column type.
///
/// Mapped to a MySQL column type by [`FieldType::sql_type`]. Parsed from
/// lowercase names (`"varchar"`, `"int"`, ...), with `integer` and `boolean`
/// accepted as aliases.
///
/// # Examples
///
/// ```
/// use modelsync_core::FieldType;
///
/// let ty: FieldType = "boolean".parse().unwrap();
/// assert_eq!(ty, FieldType::Bool);
/// assert_eq!(ty.sql_type(), "BOOLEAN");
/// assert!("money".parse::<FieldType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    VarChar,
    Char,
    Text,
    TinyText,
    MediumText,
    LongText,
    #[serde(alias = "integer")]
    Int,
    TinyInt,
    SmallInt,
    MediumInt,
    BigInt,
    Float,
    Double,
    Real,
    Decimal,
    #[serde(alias = "boolean")]
    Bool,
    Date,
    Time,
    DateTime,
    Timestamp,
    Year,
    Json,
    Enum,
    Set,
    Binary,
    Blob,
    TinyBlob,
    MediumBlob,
    LongBlob,
    Uuid,
    Geometry,
    Point,
    LineString,
    Polygon,
}

impl FieldType {
    /// Every semantic type, in declaration order.
    pub const ALL: [FieldType; 35] = [
        FieldType::String,
        FieldType::VarChar,
        FieldType::Char,
        FieldType::Text,
        FieldType::TinyText,
        FieldType::MediumText,
        FieldType::LongText,
        FieldType::Int,
        FieldType::TinyInt,
        FieldType::SmallInt,
        FieldType::MediumInt,
        FieldType::BigInt,
        FieldType::Float,
        FieldType::Double,
        FieldType::Real,
        FieldType::Decimal,
        FieldType::Bool,
        FieldType::Date,
        FieldType::Time,
        FieldType::DateTime,
        FieldType::Timestamp,
        FieldType::Year,
        FieldType::Json,
        FieldType::Enum,
        FieldType::Set,
        FieldType::Binary,
        FieldType::Blob,
        FieldType::TinyBlob,
        FieldType::MediumBlob,
        FieldType::LongBlob,
        FieldType::Uuid,
        FieldType::Geometry,
        FieldType::Point,
        FieldType::LineString,
        FieldType::Polygon,
    ];

    /// Lowercase name used in model files.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::VarChar => "varchar",
            FieldType::Char => "char",
            FieldType::Text => "text",
            FieldType::TinyText => "tinytext",
            FieldType::MediumText => "mediumtext",
            FieldType::LongText => "longtext",
            FieldType::Int => "int",
            FieldType::TinyInt => "tinyint",
            FieldType::SmallInt => "smallint",
            FieldType::MediumInt => "mediumint",
            FieldType::BigInt => "bigint",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Real => "real",
            FieldType::Decimal => "decimal",
            FieldType::Bool => "bool",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::DateTime => "datetime",
            FieldType::Timestamp => "timestamp",
            FieldType::Year => "year",
            FieldType::Json => "json",
            FieldType::Enum => "enum",
            FieldType::Set => "set",
            FieldType::Binary => "binary",
            FieldType::Blob => "blob",
            FieldType::TinyBlob => "tinyblob",
            FieldType::MediumBlob => "mediumblob",
            FieldType::LongBlob => "longblob",
            FieldType::Uuid => "uuid",
            FieldType::Geometry => "geometry",
            FieldType::Point => "point",
            FieldType::LineString => "linestring",
            FieldType::Polygon => "polygon",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a type name does not match any [`FieldType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field type: {0}")]
pub struct UnknownFieldType(pub String);

impl FromStr for FieldType {
    type Err = UnknownFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "integer" => return Ok(FieldType::Int),
            "boolean" => return Ok(FieldType::Bool),
            _ => {}
        }
        FieldType::ALL
            .iter()
            .copied()
            .find(|ty| ty.name() == lowered)
            .ok_or_else(|| UnknownFieldType(s.to_string()))
    }
}

/// Index membership of a single column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexFlags {
    pub primary: bool,
    pub unique: bool,
    pub indexed: bool,
    pub fulltext: bool,
    pub spatial: bool,
}

/// Foreign-key reference from a column to another table's column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
    /// `ON DELETE` action, e.g. `CASCADE` or `SET NULL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
    /// `ON UPDATE` action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
}

/// Declaration of one column.
///
/// Built with [`FieldSpec::new`] and the chained setters, or deserialized
/// from a model file.
///
/// # Examples
///
/// ```
/// use modelsync_core::{FieldSpec, FieldType};
///
/// let id = FieldSpec::new("id", FieldType::Int).length(11).primary().auto_increment();
/// assert!(id.index.primary);
/// assert!(!id.nullable);
///
/// let status = FieldSpec::new("status", FieldType::Enum).values(["active", "banned"]);
/// assert_eq!(status.values.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub length: u32,
    #[serde(default)]
    pub nullable: bool,
    /// Raw default value. Model files may give it as a number or boolean.
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<String>,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(flatten)]
    pub index: IndexFlags,
    /// Literal values of an `ENUM` or `SET` column, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKey>,
    /// Owning table, assigned when the field is registered in a [`TableModel`].
    #[serde(skip)]
    table: Option<String>,
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

impl FieldSpec {
    /// Creates a non-nullable field without length, default or indexes.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            length: 0,
            nullable: false,
            default: None,
            auto_increment: false,
            index: IndexFlags::default(),
            values: Vec::new(),
            foreign_key: None,
            table: None,
        }
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.index.primary = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.index.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.index.indexed = true;
        self
    }

    pub fn fulltext(mut self) -> Self {
        self.index.fulltext = true;
        self
    }

    pub fn spatial(mut self) -> Self {
        self.index.spatial = true;
        self
    }

    /// Sets the literal list of an `ENUM`/`SET` column.
    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn references(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }

    /// Name of the owning table, once registered.
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Derives a foreign-key column referencing this primary-key field.
    ///
    /// The derived field keeps the name, type, length and nullability of the
    /// source, drops auto-increment, and takes the given index flags.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ForeignKeySource`] if this field is not a
    /// primary key of a registered table.
    ///
    /// # Examples
    ///
    /// ```
    /// use modelsync_core::{FieldSpec, FieldType, TableModel};
    ///
    /// let roles = TableModel::new(
    ///     "roles",
    ///     vec![FieldSpec::new("id", FieldType::Int).length(11).primary().auto_increment()],
    ///     vec![],
    /// )
    /// .unwrap();
    ///
    /// let role_id = roles
    ///     .primary()
    ///     .unwrap()
    ///     .to_foreign_key(Some("CASCADE"), None, false, true, false)
    ///     .unwrap();
    /// let fk = role_id.foreign_key.as_ref().unwrap();
    /// assert_eq!(fk.table, "roles");
    /// assert_eq!(fk.column, "id");
    /// assert!(role_id.index.indexed);
    /// assert!(!role_id.auto_increment);
    /// ```
    pub fn to_foreign_key(
        &self,
        on_delete: Option<&str>,
        on_update: Option<&str>,
        primary: bool,
        indexed: bool,
        unique: bool,
    ) -> Result<FieldSpec, ValidationError> {
        let table = match (&self.table, self.index.primary) {
            (Some(table), true) => table.clone(),
            _ => return Err(ValidationError::ForeignKeySource(self.name.clone())),
        };

        Ok(FieldSpec {
            name: self.name.clone(),
            field_type: self.field_type,
            length: self.length,
            nullable: self.nullable,
            default: self.default.clone(),
            auto_increment: false,
            index: IndexFlags {
                primary,
                unique,
                indexed,
                ..IndexFlags::default()
            },
            values: self.values.clone(),
            foreign_key: Some(ForeignKey {
                table,
                column: self.name.clone(),
                on_delete: on_delete.map(String::from),
                on_update: on_update.map(String::from),
            }),
            table: None,
        })
    }

    pub(crate) fn set_table(&mut self, table: &str) {
        self.table = Some(table.to_string());
    }
}

/// A validated table declaration.
///
/// Holds the fields in declaration order, the names of tables that must be
/// reconciled first, and an index of the primary-key field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableModel {
    name: String,
    fields: Vec<FieldSpec>,
    primary: Option<usize>,
    depends_on: Vec<String>,
}

impl TableModel {
    /// Registers `fields` under `name` and validates the result.
    ///
    /// Every field receives `name` as its table back-reference. Validation
    /// failures are fatal for the model: an invalid declaration is a
    /// programming error and never reaches the database.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, see
    /// [`validate_table`](crate::validate_table).
    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldSpec>,
        depends_on: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let mut fields = fields;
        for field in &mut fields {
            field.set_table(&name);
        }

        validate_table(&name, &fields)?;

        let primary = fields.iter().position(|f| f.index.primary);
        Ok(Self {
            name,
            fields,
            primary,
            depends_on,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The primary-key field, if the table declares one.
    pub fn primary(&self) -> Option<&FieldSpec> {
        self.primary.map(|idx| &self.fields[idx])
    }

    /// Tables that must be reconciled before this one.
    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}
