//! Column line parsing.

use super::scan::{split_column_line, ColumnLine};
use crate::config::NamingPolicy;
use crate::error::{ParseError, Result};
use crate::names::validate_identifier;
use crate::schema::{wrap_nullable, ColumnDescriptor, LogicalType};

/// Parses one column line inside an entity block.
///
/// Returns `Ok(None)` when the line carries `[ignore]`; such a line is
/// dropped before its name or type are looked at.
pub(crate) fn parse_column(line: &str, naming: NamingPolicy) -> Result<Option<ColumnDescriptor>> {
    let ColumnLine {
        words,
        options,
        metadata,
    } = split_column_line(line)?;
    if options.iter().any(|opt| opt == "ignore") {
        return Ok(None);
    }

    let [name, type_token, ..] = words.as_slice() else {
        return Err(ParseError::structural(format!(
            "column line '{}' needs a name and a type",
            line.trim()
        )));
    };

    validate_identifier(name).map_err(ParseError::invalid_name("column"))?;
    let storage_name = naming
        .resolve(name)
        .map_err(ParseError::invalid_name("column"))?;
    let source_type = LogicalType::from_token(type_token)
        .ok_or_else(|| ParseError::UnsupportedType(type_token.clone()))?;

    let mut column = ColumnDescriptor::new(name.as_str(), storage_name, source_type);
    column.metadata = metadata;
    let mut wants_null = false;

    for option in &options {
        match option.as_str() {
            "primary" => {
                if !source_type.is_integer() {
                    return Err(ParseError::InvalidPrimaryKeyType {
                        column: name.clone(),
                        ty: type_token.clone(),
                    });
                }
                column.is_primary = true;
            }
            "index" => column.is_indexed = true,
            "patch" => column.is_patchable = true,
            "deleted" => {
                require(source_type == LogicalType::Bool, name, option, "requires type bool")?;
                column.is_soft_delete_flag = true;
            }
            "deletedon" => {
                require(
                    source_type == LogicalType::Time,
                    name,
                    option,
                    "requires type time.Time",
                )?;
                column.is_soft_delete_timestamp = true;
            }
            "nulls" => wants_null = true,
            other => {
                if let Some(size) = other.strip_prefix("size:") {
                    require(source_type.is_text(), name, option, "is only allowed on string columns")?;
                    let size = size
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| unsupported(name, option, "needs a positive number"))?;
                    column.size = Some(size);
                } else {
                    return Err(unsupported(name, option, "is not a column option"));
                }
            }
        }
    }

    column.storage_type = source_type.storage_type(column.size);
    // The soft-delete flag is always NOT NULL DEFAULT false.
    if wants_null && !column.is_soft_delete_flag {
        column.nullable = Some(wrap_nullable(source_type)?);
    }

    Ok(Some(column))
}

fn unsupported(column: &str, option: &str, reason: &str) -> ParseError {
    ParseError::UnsupportedOption {
        column: column.to_string(),
        option: option.to_string(),
        reason: reason.to_string(),
    }
}

fn require(ok: bool, column: &str, option: &str, reason: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(unsupported(column, option, reason))
    }
}
