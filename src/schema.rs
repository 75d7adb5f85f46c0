//! Maps between dBase field descriptors and attribute value types.
//!
//! The mapping is not bijective: both `Integer` and `Real` become Numeric
//! fields (told apart by decimal count), and `Float` fields come back as
//! `Real`. Text fields have no fixed width, so deriving a descriptor for a
//! text column needs a full scan of the values first -- which is why writing
//! a table is a two-pass affair: scan, then emit.
use std::error;
use std::fmt;
use encoding::{self, Encoding};
use dbf::{AttributeValue, DbfField, DbfType};

const MAX_CHARACTER_FIELD_LENGTH: usize = 255;
const INTEGER_FIELD_LENGTH: usize = 16;
const REAL_FIELD_LENGTH: usize = 33;
const REAL_FIELD_DECIMALS: usize = 16;
const DATE_FIELD_LENGTH: usize = 8;

#[derive(Debug)]
pub enum SchemaError {
    /// A column cannot be represented as a dBase field: either its type has
    /// no mapping or a text column is too wide for the format.
    UnsupportedType(String),
    /// The names, types and rows handed in don't line up with each other.
    Mismatch(String),
}

impl error::Error for SchemaError {}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SchemaError::UnsupportedType(ref description) => { write!(f, "Unsupported type: {}", description) },
            SchemaError::Mismatch(ref description) => { write!(f, "Schema mismatch: {}", description) },
        }
    }
}

/// The value-type side of a column. `Geometry` marks the column that lives
/// in the ".shp" file; it has no dBase field.
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum AttributeType {
    Boolean,
    Text,
    Integer,
    Real,
    Date,
    Geometry,
}

/// Derives the dBase field descriptors for an attribute schema.
///
/// Fixed-width types map directly (Boolean to L/1, Integer to N/16/0, Real
/// to N/33/16, Date to D/8), and every value is checked to fit its field's
/// width. Text columns take the maximum encoded byte length observed across
/// `rows`, so all rows must be known up front. Geometry columns are skipped.
/// Field offsets are computed here; nothing is trusted from the caller.
pub fn fields_from_attribute_types(
    names: &[&str],
    types: &[AttributeType],
    rows: &[&[AttributeValue]],
    encoding: encoding::EncodingRef,
) -> Result<Box<[DbfField]>, SchemaError> {
    if names.len() != types.len() {
        return Err(SchemaError::Mismatch(format!("{} column names for {} column types", names.len(), types.len())));
    }
    for (row_number, row) in rows.iter().enumerate() {
        if row.len() != types.len() {
            return Err(SchemaError::Mismatch(format!("Row {} has {} values, but the schema has {} columns", row_number, row.len(), types.len())));
        }
    }

    let mut fields = Vec::with_capacity(types.len());
    let mut offset = 1; // byte 0 of each record is the deleted flag
    for (i, (&name, &attribute_type)) in names.iter().zip(types.iter()).enumerate() {
        let (data_type, len, decimal_count) = match attribute_type {
            AttributeType::Geometry => { continue; },
            AttributeType::Boolean => (DbfType::Logical, 1, 0),
            AttributeType::Integer => {
                check_numeric_column_fits(name, i, rows, INTEGER_FIELD_LENGTH, 0)?;
                (DbfType::Numeric, INTEGER_FIELD_LENGTH, 0)
            },
            AttributeType::Real => {
                check_numeric_column_fits(name, i, rows, REAL_FIELD_LENGTH, REAL_FIELD_DECIMALS)?;
                (DbfType::Numeric, REAL_FIELD_LENGTH, REAL_FIELD_DECIMALS)
            },
            AttributeType::Date => {
                check_date_column_fits(name, i, rows)?;
                (DbfType::Date, DATE_FIELD_LENGTH, 0)
            },
            AttributeType::Text => {
                let len = text_column_width(name, i, rows, encoding)?;
                (DbfType::Character, len, 0)
            },
        };

        fields.push(DbfField {
            name: name.to_string(),
            data_type: data_type,
            offset: offset,
            len: len,
            decimal_count: decimal_count,
        });
        offset += len;
    }

    Ok(fields.into_boxed_slice())
}

/// The maximum encoded byte length of column `i` across all rows. A column
/// of nothing but empty/Null values still gets the minimum width of 1.
fn text_column_width(
    name: &str,
    i: usize,
    rows: &[&[AttributeValue]],
    encoding: encoding::EncodingRef,
) -> Result<usize, SchemaError> {
    let mut max_len = 0;
    for row in rows.iter() {
        let value_len = match row[i] {
            AttributeValue::Text(ref s) => {
                match encoding.encode(s, encoding::EncoderTrap::Replace) {
                    Ok(bytes) => bytes.len(),
                    Err(_) => s.len(),
                }
            },
            AttributeValue::Null => 0,
            ref other => {
                return Err(SchemaError::Mismatch(format!("Column {:?} is a text column, but a row holds {:?}", name, other)));
            }
        };
        if value_len > max_len {
            max_len = value_len;
        }
    }

    if max_len > MAX_CHARACTER_FIELD_LENGTH {
        return Err(SchemaError::UnsupportedType(format!("Text column {:?} needs {} bytes, but the format caps Character fields at {}", name, max_len, MAX_CHARACTER_FIELD_LENGTH)));
    }

    Ok(::std::cmp::max(max_len, 1))
}

/// Renders every value of numeric column `i` exactly the way the writer
/// will and fails if any rendering is wider than the field, so a width
/// problem surfaces during the scan instead of mid-emit.
fn check_numeric_column_fits(
    name: &str,
    i: usize,
    rows: &[&[AttributeValue]],
    len: usize,
    decimal_count: usize,
) -> Result<(), SchemaError> {
    for row in rows.iter() {
        let text = match row[i] {
            AttributeValue::Null => { continue; },
            AttributeValue::Integer(v) => {
                if decimal_count == 0 {
                    format!("{}", v)
                } else {
                    format!("{:.*}", decimal_count, v as f64)
                }
            },
            AttributeValue::Real(x) => format!("{:.*}", decimal_count, x),
            AttributeValue::Text(ref s) => s.clone(),
            ref other => {
                return Err(SchemaError::Mismatch(format!("Column {:?} is a numeric column, but a row holds {:?}", name, other)));
            }
        };
        if text.len() > len {
            return Err(SchemaError::UnsupportedType(format!("Column {:?} holds {:?}, which needs {} bytes, but its field is {} bytes wide", name, text, text.len(), len)));
        }
    }
    Ok(())
}

/// A date field is exactly 8 bytes, so every value of date column `i` must
/// print as YYYYMMDD.
fn check_date_column_fits(
    name: &str,
    i: usize,
    rows: &[&[AttributeValue]],
) -> Result<(), SchemaError> {
    for row in rows.iter() {
        match row[i] {
            AttributeValue::Null => {},
            AttributeValue::Date(ref d) => {
                if format!("{:04}{:02}{:02}", d.year, d.month, d.day).len() != DATE_FIELD_LENGTH {
                    return Err(SchemaError::UnsupportedType(format!("Column {:?} holds the date {}, which does not print as YYYYMMDD", name, d)));
                }
            },
            ref other => {
                return Err(SchemaError::Mismatch(format!("Column {:?} is a date column, but a row holds {:?}", name, other)));
            }
        }
    }
    Ok(())
}

/// The inverse mapping: the attribute type each dBase field decodes to.
/// Numeric fields with a zero decimal count come back as `Integer`, all
/// other Numeric and Float fields as `Real`.
pub fn attribute_types_from_fields(fields: &[DbfField]) -> Box<[AttributeType]> {
    fields.iter().map(|field| {
        match field.data_type {
            DbfType::Logical => AttributeType::Boolean,
            DbfType::Character => AttributeType::Text,
            DbfType::Date => AttributeType::Date,
            DbfType::Numeric => {
                if field.decimal_count == 0 { AttributeType::Integer } else { AttributeType::Real }
            },
            DbfType::Float => AttributeType::Real,
        }
    }).collect::<Vec<_>>().into_boxed_slice()
}

#[cfg(test)]
mod test {
    use encoding;
    use dbf::{AttributeValue, DbfDate, DbfField, DbfType};
    use super::*;

    fn text_row(s: &str) -> Box<[AttributeValue]> {
        vec![ AttributeValue::Text(s.to_string()) ].into_boxed_slice()
    }

    #[test]
    fn text_width_is_longest_observed_value() {
        let rows = vec![ text_row("ab"), text_row("longer value"), text_row("x") ];
        let row_refs: Vec<&[AttributeValue]> = rows.iter().map(|r| &**r).collect();
        let fields = fields_from_attribute_types(
            &[ "name" ], &[ AttributeType::Text ], &row_refs, encoding::all::UTF_8,
        ).unwrap();
        assert_eq!(1, fields.len());
        assert_eq!(DbfType::Character, fields[0].data_type);
        assert_eq!(12, fields[0].len);
    }

    #[test]
    fn text_wider_than_255_is_unsupported() {
        let long = "x".repeat(256);
        let rows = vec![ text_row(&long) ];
        let row_refs: Vec<&[AttributeValue]> = rows.iter().map(|r| &**r).collect();
        match fields_from_attribute_types(&[ "name" ], &[ AttributeType::Text ], &row_refs, encoding::all::UTF_8) {
            Err(SchemaError::UnsupportedType(_)) => {},
            other => panic!("expected UnsupportedType, got {:?}", other),
        }
    }

    #[test]
    fn fixed_width_mappings() {
        let fields = fields_from_attribute_types(
            &[ "flag", "count", "ratio", "when" ],
            &[ AttributeType::Boolean, AttributeType::Integer, AttributeType::Real, AttributeType::Date ],
            &[],
            encoding::all::UTF_8,
        ).unwrap();

        assert_eq!((DbfType::Logical, 1, 0), (fields[0].data_type, fields[0].len, fields[0].decimal_count));
        assert_eq!((DbfType::Numeric, 16, 0), (fields[1].data_type, fields[1].len, fields[1].decimal_count));
        assert_eq!((DbfType::Numeric, 33, 16), (fields[2].data_type, fields[2].len, fields[2].decimal_count));
        assert_eq!((DbfType::Date, 8, 0), (fields[3].data_type, fields[3].len, fields[3].decimal_count));

        // offsets follow the deleted-flag byte
        assert_eq!(1, fields[0].offset);
        assert_eq!(2, fields[1].offset);
        assert_eq!(18, fields[2].offset);
        assert_eq!(51, fields[3].offset);
    }

    #[test]
    fn numeric_value_wider_than_its_field_is_unsupported() {
        // i64::min_value() prints as 20 characters; Integer fields hold 16
        let rows = vec![
            vec![ AttributeValue::Integer(::std::i64::MIN) ].into_boxed_slice(),
        ];
        let row_refs: Vec<&[AttributeValue]> = rows.iter().map(|r| &**r as &[AttributeValue]).collect();
        match fields_from_attribute_types(&[ "count" ], &[ AttributeType::Integer ], &row_refs, encoding::all::UTF_8) {
            Err(SchemaError::UnsupportedType(_)) => {},
            other => panic!("expected UnsupportedType, got {:?}", other),
        }
    }

    #[test]
    fn five_digit_year_is_unsupported() {
        let rows = vec![
            vec![ AttributeValue::Date(DbfDate { year: 12345, month: 1, day: 1 }) ].into_boxed_slice(),
        ];
        let row_refs: Vec<&[AttributeValue]> = rows.iter().map(|r| &**r as &[AttributeValue]).collect();
        match fields_from_attribute_types(&[ "when" ], &[ AttributeType::Date ], &row_refs, encoding::all::UTF_8) {
            Err(SchemaError::UnsupportedType(_)) => {},
            other => panic!("expected UnsupportedType, got {:?}", other),
        }
    }

    #[test]
    fn geometry_columns_are_skipped() {
        let rows = vec![
            vec![ AttributeValue::Null, AttributeValue::Text("ab".to_string()) ].into_boxed_slice(),
        ];
        let row_refs: Vec<&[AttributeValue]> = rows.iter().map(|r| &**r as &[AttributeValue]).collect();
        let fields = fields_from_attribute_types(
            &[ "geom", "name" ],
            &[ AttributeType::Geometry, AttributeType::Text ],
            &row_refs,
            encoding::all::UTF_8,
        ).unwrap();
        assert_eq!(1, fields.len());
        assert_eq!("name", fields[0].name);
        assert_eq!(1, fields[0].offset);
    }

    #[test]
    fn types_from_fields_round() {
        let fields = vec![
            DbfField::new("l", DbfType::Logical, 1, 0),
            DbfField::new("c", DbfType::Character, 12, 0),
            DbfField::new("d", DbfType::Date, 8, 0),
            DbfField::new("i", DbfType::Numeric, 16, 0),
            DbfField::new("r", DbfType::Numeric, 33, 16),
            DbfField::new("f", DbfType::Float, 20, 5),
        ];
        assert_eq!(
            vec![
                AttributeType::Boolean,
                AttributeType::Text,
                AttributeType::Date,
                AttributeType::Integer,
                AttributeType::Real,
                AttributeType::Real,
            ].into_boxed_slice(),
            attribute_types_from_fields(&fields)
        );
    }

    #[test]
    fn empty_text_column_still_gets_a_width() {
        let rows = vec![
            vec![ AttributeValue::Null ].into_boxed_slice(),
        ];
        let row_refs: Vec<&[AttributeValue]> = rows.iter().map(|r| &**r as &[AttributeValue]).collect();
        let fields = fields_from_attribute_types(
            &[ "name" ], &[ AttributeType::Text ], &row_refs, encoding::all::UTF_8,
        ).unwrap();
        assert_eq!(1, fields[0].len);
    }
}
