//! Column type tables.
//!
//! Three mappings live here: the type token written in a definition file
//! to a [`LogicalType`], a logical type to its Postgres [`StorageType`],
//! and a storage type to the Rust type used by generated code.

use std::fmt;

use serde::Serialize;

use crate::error::{ParseError, Result};

/// A column type as written in a definition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Byte,
    Float32,
    Float64,
    Bool,
    #[serde(rename = "time.Time")]
    Time,
    String,
    Rune,
    #[serde(rename = "[]byte")]
    Bytes,
}

impl LogicalType {
    /// Parses a type token, ignoring case. `time` is accepted as a short
    /// form of `time.Time`.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let ty = match token.to_ascii_lowercase().as_str() {
            "int" => Self::Int,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "uint" => Self::Uint,
            "uint8" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "uintptr" => Self::Uintptr,
            "byte" => Self::Byte,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "bool" => Self::Bool,
            "time.time" | "time" => Self::Time,
            "string" => Self::String,
            "rune" => Self::Rune,
            "[]byte" => Self::Bytes,
            _ => return None,
        };
        Some(ty)
    }

    /// The canonical spelling of this type.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint => "uint",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Uintptr => "uintptr",
            Self::Byte => "byte",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Time => "time.Time",
            Self::String => "string",
            Self::Rune => "rune",
            Self::Bytes => "[]byte",
        }
    }

    /// Whether this is one of the integer types usable as a primary key.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int
                | Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Uint
                | Self::Uint8
                | Self::Uint16
                | Self::Uint32
                | Self::Uint64
                | Self::Uintptr
                | Self::Byte
        )
    }

    /// Whether `[size:n]` may be applied.
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::String)
    }

    /// Resolves the Postgres column type.
    ///
    /// `size` bounds a `string` column; it is ignored for other types, the
    /// parser rejects it before this point.
    #[must_use]
    pub const fn storage_type(self, size: Option<u32>) -> StorageType {
        match self {
            Self::Int
            | Self::Int8
            | Self::Int16
            | Self::Int32
            | Self::Uint
            | Self::Uint8
            | Self::Uint16
            | Self::Uint32
            | Self::Uintptr
            | Self::Byte => StorageType::Integer,
            Self::Int64 | Self::Uint64 => StorageType::BigInt,
            Self::Float32 => StorageType::Real,
            Self::Float64 => StorageType::DoublePrecision,
            Self::Bool => StorageType::Boolean,
            Self::Time => StorageType::Timestamp,
            Self::String => StorageType::Varchar(size),
            Self::Rune => StorageType::Varchar(None),
            Self::Bytes => StorageType::Bytea,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A Postgres column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum StorageType {
    /// `integer`
    Integer,
    /// `bigint`
    BigInt,
    /// `real`
    Real,
    /// `double precision`
    DoublePrecision,
    /// `boolean`
    Boolean,
    /// `timestamp without time zone`
    Timestamp,
    /// `character varying`, optionally bounded.
    Varchar(Option<u32>),
    /// `bytea`
    Bytea,
}

impl StorageType {
    /// The Rust type generated code uses for a column of this type.
    #[must_use]
    pub const fn rust_type(self) -> &'static str {
        match self {
            Self::Integer => "i32",
            Self::BigInt => "i64",
            Self::Real => "f32",
            Self::DoublePrecision => "f64",
            Self::Boolean => "bool",
            Self::Timestamp => "chrono::NaiveDateTime",
            Self::Varchar(_) => "String",
            Self::Bytea => "Vec<u8>",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("integer"),
            Self::BigInt => f.write_str("bigint"),
            Self::Real => f.write_str("real"),
            Self::DoublePrecision => f.write_str("double precision"),
            Self::Boolean => f.write_str("boolean"),
            Self::Timestamp => f.write_str("timestamp without time zone"),
            Self::Varchar(None) => f.write_str("character varying"),
            Self::Varchar(Some(n)) => write!(f, "character varying({n})"),
            Self::Bytea => f.write_str("bytea"),
        }
    }
}

impl From<StorageType> for String {
    fn from(ty: StorageType) -> Self {
        ty.to_string()
    }
}

/// The nullable form of a column type, rendered as `Option<T>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NullableType(LogicalType);

impl NullableType {
    /// The wrapped logical type.
    #[must_use]
    pub const fn inner(self) -> LogicalType {
        self.0
    }
}

/// Maps a type token and optional size to its storage type.
///
/// # Errors
///
/// Returns [`ParseError::UnsupportedType`] for tokens with no mapping.
pub fn map_logical_to_storage(type_token: &str, size: Option<u32>) -> Result<StorageType> {
    LogicalType::from_token(type_token)
        .map(|ty| ty.storage_type(size))
        .ok_or_else(|| ParseError::UnsupportedType(type_token.to_string()))
}

/// Returns the nullable wrapper for `logical`.
///
/// # Errors
///
/// Returns [`ParseError::UnsupportedNullableType`] for types outside the
/// nullable set.
pub fn wrap_nullable(logical: LogicalType) -> Result<NullableType> {
    match logical {
        LogicalType::Int
        | LogicalType::Int32
        | LogicalType::Int64
        | LogicalType::Uint32
        | LogicalType::Float32
        | LogicalType::Float64
        | LogicalType::Bool
        | LogicalType::Time
        | LogicalType::String
        | LogicalType::Bytes => Ok(NullableType(logical)),
        other => Err(ParseError::UnsupportedNullableType(other.token().to_string())),
    }
}
