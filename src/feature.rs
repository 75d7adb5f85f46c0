//! Pairs a ".shp" geometry stream with its ".dbf" attribute table.
//!
//! The two files carry no record identifiers; alignment is purely
//! positional, so the pairing walks both streams in lockstep and treats one
//! file ending before the other as corruption.
use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use encoding;
use dbf;
use schema;
use shp;

#[derive(Debug)]
pub enum ShapefileError {
    ShpError(shp::ShpError),
    DbfError(dbf::DbfError),
    SchemaError(schema::SchemaError),
    JoinError(String),
}

impl error::Error for ShapefileError {
    fn cause(&self) -> Option<&error::Error> {
        match *self {
            ShapefileError::ShpError(ref err) => Some(err),
            ShapefileError::DbfError(ref err) => Some(err),
            ShapefileError::SchemaError(ref err) => Some(err),
            ShapefileError::JoinError(_) => None,
        }
    }
}

impl fmt::Display for ShapefileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ShapefileError::ShpError(ref err) => err.fmt(f),
            ShapefileError::DbfError(ref err) => err.fmt(f),
            ShapefileError::SchemaError(ref err) => err.fmt(f),
            ShapefileError::JoinError(ref description) => write!(f, "Join error: {}", description),
        }
    }
}

/// One geometry plus its attribute row. `index` is the feature's 0-based
/// position in the file pair -- the only identity these formats have.
#[derive(Debug,Clone,PartialEq)]
pub struct Feature {
    pub index: usize,
    pub geometry: shp::Geometry,
    pub row: Box<[dbf::AttributeValue]>,
}

/// Iterates over ".shp" and ".dbf" records simultaneously.
///
/// # Examples
///
/// ```
/// # extern crate encoding;
/// # extern crate shapefile;
/// # fn main() {
/// use std::io;
/// use shapefile::{AttributeType, AttributeValue, Geometry, Point, ShapefileReader};
///
/// let input = vec![
///     (Geometry::Point(Point(295.0, -249.0)),
///      vec![ AttributeValue::Text("bar".to_string()) ].into_boxed_slice()),
/// ];
/// let mut shp_bytes = Vec::new();
/// let mut dbf_bytes = Vec::new();
/// shapefile::write(&mut shp_bytes, &mut dbf_bytes,
///                  &[ "foo" ], &[ AttributeType::Text ],
///                  &input, encoding::all::UTF_8).unwrap();
///
/// // builder returns Result<ShapefileReader, ShapefileError>
/// let mut reader = ShapefileReader::new(
///     io::Cursor::new(shp_bytes),
///     io::Cursor::new(dbf_bytes),
///     encoding::all::UTF_8,
/// ).unwrap();
///
/// // reader.next(), an Iterator method, returns
/// // Option<Result<Feature, ShapefileError>>
/// let feature = reader.next().unwrap().unwrap();
/// assert_eq!(0, feature.index);
/// assert_eq!(Geometry::Point(Point(295.0, -249.0)), feature.geometry);
/// assert_eq!(AttributeValue::Text("bar".to_string()), feature.row[0]);
/// assert!(reader.next().is_none());
/// # }
/// ```
pub struct ShapefileReader<R: io::Read, S: io::Read> {
    shp_reader: shp::ShpReader<R>,
    dbf_reader: dbf::DbfReader<S>,
    n_features_read: usize,
}

impl<R: io::Read, S: io::Read> ShapefileReader<R, S> {
    pub fn new(r: R, s: S, encoding: encoding::EncodingRef) -> Result<ShapefileReader<R, S>, ShapefileError> {
        match (shp::ShpReader::new(r), dbf::DbfReader::new(s, encoding)) {
            // Check failures
            (Err(err), _) => Err(ShapefileError::ShpError(err)),
            (_, Err(err)) => Err(ShapefileError::DbfError(err)),

            (Ok(shp_reader), Ok(dbf_reader)) => {
                Ok(ShapefileReader {
                    shp_reader: shp_reader,
                    dbf_reader: dbf_reader,
                    n_features_read: 0,
                })
            }
        }
    }

    pub fn fields(&self) -> &[dbf::DbfField] {
        self.dbf_reader.fields()
    }

    pub fn get_field(&self, name: &str) -> Option<&dbf::DbfField> {
        self.dbf_reader.get_field(name)
    }

    pub fn bounding_box(&self) -> &shp::BoundingBox {
        &self.shp_reader.header.bounding_box
    }

    pub fn shape_type(&self) -> shp::ShapeType {
        self.shp_reader.header.shape_type
    }

    /// Restricts attribute decoding to the named columns. Rows of features
    /// yielded afterwards hold only those values, in field order; the other
    /// columns are never materialized.
    pub fn project(&mut self, names: &[&str]) -> Result<(), ShapefileError> {
        let mask: Vec<bool> = self.dbf_reader.fields().iter()
            .map(|field| names.contains(&&field.name[..]))
            .collect();
        for name in names.iter() {
            if self.get_field(name).is_none() {
                return Err(ShapefileError::DbfError(dbf::DbfError::ParseError(format!("The table has no field named {:?}", name))));
            }
        }
        self.dbf_reader.project(mask.into_boxed_slice()).map_err(ShapefileError::DbfError)
    }
}

impl<R: io::Read, S: io::Read> Iterator for ShapefileReader<R, S> {
    type Item = Result<Feature, ShapefileError>;

    fn next(&mut self) -> Option<Self::Item> {
        match (self.shp_reader.next(), self.dbf_reader.next()) {
            // Check for end of files: both must run out on the same record
            (None, None) => None,
            (Some(_), None) => Some(Err(ShapefileError::JoinError("'.shp' file has an extra record: the '.dbf' file ended first".to_string()))),
            (None, Some(_)) => Some(Err(ShapefileError::JoinError("'.dbf' file has an extra record: the '.shp' file ended first".to_string()))),

            // check for errors
            (Some(Err(err)), _) => Some(Err(ShapefileError::ShpError(err))),
            (_, Some(Err(err))) => Some(Err(ShapefileError::DbfError(err))),

            // we have a feature!
            (Some(Ok((_, geometry))), Some(Ok(row))) => {
                let index = self.n_features_read;
                self.n_features_read += 1;
                Some(Ok(Feature {
                    index: index,
                    geometry: geometry,
                    row: row,
                }))
            }
        }
    }
}

/// Writes a matched ".shp"/".dbf" pair.
///
/// `types` describes the columns of each feature's attribute row;
/// `AttributeType::Geometry` columns belong to the ".shp" side and are not
/// written into the table (their row values are ignored). The dBase field
/// layout is derived from the rows first (text columns need a full scan for
/// their width), so schema problems surface before either file receives a
/// byte.
pub fn write<W: io::Write, X: io::Write>(
    shp_file: W,
    dbf_file: X,
    names: &[&str],
    types: &[schema::AttributeType],
    features: &[(shp::Geometry, Box<[dbf::AttributeValue]>)],
    encoding: encoding::EncodingRef,
) -> Result<(), ShapefileError> {
    // scan pass: derive the table layout from all rows
    let rows: Vec<&[dbf::AttributeValue]> = features.iter().map(|f| &*f.1).collect();
    let fields = schema::fields_from_attribute_types(names, types, &rows, encoding)
        .map_err(ShapefileError::SchemaError)?;

    let table_columns: Vec<usize> = types.iter().enumerate()
        .filter(|&(_, t)| *t != schema::AttributeType::Geometry)
        .map(|(i, _)| i)
        .collect();

    let geometries: Vec<shp::Geometry> = features.iter().map(|f| f.0.clone()).collect();
    let table_rows: Vec<Box<[dbf::AttributeValue]>> = features.iter().map(|f| {
        table_columns.iter().map(|&i| f.1[i].clone()).collect::<Vec<_>>().into_boxed_slice()
    }).collect();

    // emit pass: geometry file, then the table
    let mut shp_writer = shp::ShpWriter::new(shp_file);
    shp_writer.write_all(&geometries).map_err(ShapefileError::ShpError)?;

    let mut dbf_writer = dbf::DbfWriter::new(dbf_file, encoding);
    dbf_writer.write_all(&fields, &table_rows).map_err(ShapefileError::DbfError)
}

/// Open by ".shp" filename.
///
/// This will automatically search for the accompanying ".dbf"; it will fail
/// if that file does not exist.
pub fn open(shp_path: &Path, encoding: encoding::EncodingRef) -> Result<ShapefileReader<io::BufReader<fs::File>, io::BufReader<fs::File>>, ShapefileError> {
    match shp::open(shp_path) {
        Err(err) => Err(ShapefileError::ShpError(err)),
        Ok(shp_reader) => {
            let mut dbf_path = PathBuf::from(shp_path);
            dbf_path.set_extension("dbf");

            match dbf::open(dbf_path.as_path(), encoding) {
                Err(err) => Err(ShapefileError::DbfError(err)),
                Ok(dbf_reader) => {
                    Ok(ShapefileReader {
                        shp_reader: shp_reader,
                        dbf_reader: dbf_reader,
                        n_features_read: 0,
                    })
                }
            }
        }
    }
}

/// Write by ".shp" filename; the ".dbf" lands next to it.
pub fn write_path(
    shp_path: &Path,
    names: &[&str],
    types: &[schema::AttributeType],
    features: &[(shp::Geometry, Box<[dbf::AttributeValue]>)],
    encoding: encoding::EncodingRef,
) -> Result<(), ShapefileError> {
    let shp_file = match fs::File::create(shp_path) {
        Err(err) => { return Err(ShapefileError::ShpError(shp::ShpError::IOError(err))); }
        Ok(f) => io::BufWriter::new(f),
    };

    let mut dbf_path = PathBuf::from(shp_path);
    dbf_path.set_extension("dbf");
    let dbf_file = match fs::File::create(dbf_path.as_path()) {
        Err(err) => { return Err(ShapefileError::DbfError(dbf::DbfError::IOError(err))); }
        Ok(f) => io::BufWriter::new(f),
    };

    write(shp_file, dbf_file, names, types, features, encoding)
}

#[cfg(test)]
mod test {
    use std::io;
    use encoding;
    use dbf::{self, AttributeValue};
    use schema::AttributeType;
    use shp::{self, Geometry, Point};
    use super::*;

    fn point_feature(x: f64, name: &str) -> (Geometry, Box<[AttributeValue]>) {
        (
            Geometry::Point(Point(x, -x)),
            vec![ AttributeValue::Text(name.to_string()) ].into_boxed_slice(),
        )
    }

    fn write_pair(features: &[(Geometry, Box<[AttributeValue]>)]) -> (Vec<u8>, Vec<u8>) {
        let mut shp_bytes = Vec::new();
        let mut dbf_bytes = Vec::new();
        write(&mut shp_bytes, &mut dbf_bytes,
              &[ "name" ], &[ AttributeType::Text ],
              features, encoding::all::UTF_8).unwrap();
        (shp_bytes, dbf_bytes)
    }

    fn reader_for(shp_bytes: Vec<u8>, dbf_bytes: Vec<u8>) -> ShapefileReader<io::Cursor<Vec<u8>>, io::Cursor<Vec<u8>>> {
        ShapefileReader::new(io::Cursor::new(shp_bytes), io::Cursor::new(dbf_bytes), encoding::all::UTF_8).unwrap()
    }

    #[test]
    fn pairs_records_in_lockstep() {
        let input = vec![
            point_feature(1., "one"),
            point_feature(2., "two"),
            point_feature(3., "three"),
        ];
        let (shp_bytes, dbf_bytes) = write_pair(&input);

        let features: Vec<Feature> = reader_for(shp_bytes, dbf_bytes).map(|f| f.unwrap()).collect();
        assert_eq!(3, features.len());
        for (i, feature) in features.iter().enumerate() {
            assert_eq!(i, feature.index);
            assert_eq!(input[i].0, feature.geometry);
            assert_eq!(input[i].1, feature.row);
        }
    }

    #[test]
    fn extra_shp_record_is_a_join_error() {
        let mut shp_bytes = Vec::new();
        {
            let mut writer = shp::ShpWriter::new(&mut shp_bytes);
            writer.write_all(&[
                Geometry::Point(Point(1., 1.)),
                Geometry::Point(Point(2., 2.)),
                Geometry::Point(Point(3., 3.)),
            ]).unwrap();
        }

        let mut dbf_bytes = Vec::new();
        {
            let fields = vec![ dbf::DbfField::new("name", dbf::DbfType::Character, 3, 0) ];
            let rows: Vec<Box<[AttributeValue]>> = vec![
                vec![ AttributeValue::Text("one".to_string()) ].into_boxed_slice(),
                vec![ AttributeValue::Text("two".to_string()) ].into_boxed_slice(),
            ];
            let mut writer = dbf::DbfWriter::new(&mut dbf_bytes, encoding::all::UTF_8);
            writer.write_all(&fields, &rows).unwrap();
        }

        let mut reader = reader_for(shp_bytes, dbf_bytes);
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(ShapefileError::JoinError(ref description)) => {
                assert!(description.contains("extra record"), "{}", description);
            }
            other => panic!("expected JoinError, got {:?}", other),
        }
    }

    #[test]
    fn extra_dbf_record_is_a_join_error() {
        let mut shp_bytes = Vec::new();
        {
            let mut writer = shp::ShpWriter::new(&mut shp_bytes);
            writer.write_all(&[ Geometry::Point(Point(1., 1.)) ]).unwrap();
        }

        let mut dbf_bytes = Vec::new();
        {
            let fields = vec![ dbf::DbfField::new("name", dbf::DbfType::Character, 3, 0) ];
            let rows: Vec<Box<[AttributeValue]>> = vec![
                vec![ AttributeValue::Text("one".to_string()) ].into_boxed_slice(),
                vec![ AttributeValue::Text("two".to_string()) ].into_boxed_slice(),
            ];
            let mut writer = dbf::DbfWriter::new(&mut dbf_bytes, encoding::all::UTF_8);
            writer.write_all(&fields, &rows).unwrap();
        }

        let mut reader = reader_for(shp_bytes, dbf_bytes);
        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(ShapefileError::JoinError(_)) => {},
            other => panic!("expected JoinError, got {:?}", other),
        }
    }

    #[test]
    fn projection_narrows_rows() {
        let mut shp_bytes = Vec::new();
        let mut dbf_bytes = Vec::new();
        let input = vec![
            (
                Geometry::Point(Point(1., 1.)),
                vec![
                    AttributeValue::Text("one".to_string()),
                    AttributeValue::Integer(7),
                ].into_boxed_slice(),
            ),
        ];
        write(&mut shp_bytes, &mut dbf_bytes,
              &[ "name", "count" ], &[ AttributeType::Text, AttributeType::Integer ],
              &input, encoding::all::UTF_8).unwrap();

        let mut reader = reader_for(shp_bytes, dbf_bytes);
        reader.project(&[ "count" ]).unwrap();
        let feature = reader.next().unwrap().unwrap();
        assert_eq!(1, feature.row.len());
        assert_eq!(AttributeValue::Integer(7), feature.row[0]);
    }

    #[test]
    fn unknown_projection_column_is_an_error() {
        let (shp_bytes, dbf_bytes) = write_pair(&[ point_feature(1., "one") ]);
        let mut reader = reader_for(shp_bytes, dbf_bytes);
        assert!(reader.project(&[ "nope" ]).is_err());
    }

    #[test]
    fn geometry_columns_stay_out_of_the_table() {
        let mut shp_bytes = Vec::new();
        let mut dbf_bytes = Vec::new();
        let input = vec![
            (
                Geometry::Point(Point(5., 6.)),
                vec![
                    AttributeValue::Null, // the geometry column's placeholder
                    AttributeValue::Text("one".to_string()),
                ].into_boxed_slice(),
            ),
        ];
        write(&mut shp_bytes, &mut dbf_bytes,
              &[ "geom", "name" ], &[ AttributeType::Geometry, AttributeType::Text ],
              &input, encoding::all::UTF_8).unwrap();

        let mut reader = reader_for(shp_bytes, dbf_bytes);
        assert_eq!(1, reader.fields().len());
        assert_eq!("name", reader.fields()[0].name);
        let feature = reader.next().unwrap().unwrap();
        assert_eq!(1, feature.row.len());
        assert_eq!(AttributeValue::Text("one".to_string()), feature.row[0]);
        assert_eq!(Geometry::Point(Point(5., 6.)), feature.geometry);
    }

    #[test]
    fn wide_numeric_value_fails_before_any_byte_is_written() {
        let mut shp_bytes = Vec::new();
        let mut dbf_bytes = Vec::new();
        let input = vec![
            (
                Geometry::Point(Point(1., 1.)),
                vec![ AttributeValue::Integer(::std::i64::MIN) ].into_boxed_slice(),
            ),
        ];
        let result = write(&mut shp_bytes, &mut dbf_bytes,
                           &[ "count" ], &[ AttributeType::Integer ],
                           &input, encoding::all::UTF_8);
        match result {
            Err(ShapefileError::SchemaError(_)) => {},
            other => panic!("expected SchemaError, got {:?}", other),
        }
        assert!(shp_bytes.is_empty());
        assert!(dbf_bytes.is_empty());
    }

    #[test]
    fn schema_errors_surface_before_any_byte_is_written() {
        let mut shp_bytes = Vec::new();
        let mut dbf_bytes = Vec::new();
        let long = "x".repeat(256);
        let input = vec![
            (
                Geometry::Point(Point(1., 1.)),
                vec![ AttributeValue::Text(long) ].into_boxed_slice(),
            ),
        ];
        let result = write(&mut shp_bytes, &mut dbf_bytes,
                           &[ "name" ], &[ AttributeType::Text ],
                           &input, encoding::all::UTF_8);
        match result {
            Err(ShapefileError::SchemaError(_)) => {},
            other => panic!("expected SchemaError, got {:?}", other),
        }
        assert!(shp_bytes.is_empty());
        assert!(dbf_bytes.is_empty());
    }
}
