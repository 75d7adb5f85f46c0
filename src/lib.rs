//! Reads and writes ESRI Shapefiles: a ".shp" geometry file paired with a
//! ".dbf" attribute table.
//!
//! The two files are framed independently but must agree record-for-record:
//! record `i` of the ".shp" file is the geometry of row `i` of the ".dbf"
//! table. [`ShapefileReader`] walks both files in lockstep and yields one
//! [`Feature`] (geometry + attribute row) per step; [`write`] goes the other
//! way, deriving the dBase field layout from the attribute values first and
//! then streaming both files.
//!
//! There are two pieces of information these files _don't_ contain:
//!
//! * The _projection_ isn't specified. Sometimes there's a ".prj" file that
//!   contains that information, but this library ignores it and returns
//!   `f64` points as stored.
//! * The _text encoding_ of ".dbf" character fields isn't specified. Callers
//!   pick one (`open_ascii`, `open_utf8`, `open_windows1252`, or any
//!   `encoding::EncodingRef`).
//!
//! # Examples
//!
//! Write a Shapefile pair to memory and read it back:
//!
//! ```
//! # extern crate encoding;
//! # extern crate shapefile;
//! # fn main() {
//! use std::io;
//! use shapefile::{AttributeType, AttributeValue, Geometry, Point};
//!
//! let input = vec![
//!     (Geometry::Point(Point(1.0, 2.0)),
//!      vec![ AttributeValue::Text("first".to_string()) ].into_boxed_slice()),
//!     (Geometry::Point(Point(3.0, 4.0)),
//!      vec![ AttributeValue::Text("second".to_string()) ].into_boxed_slice()),
//! ];
//!
//! let mut shp_bytes = Vec::new();
//! let mut dbf_bytes = Vec::new();
//! shapefile::write(
//!     &mut shp_bytes,
//!     &mut dbf_bytes,
//!     &[ "name" ],
//!     &[ AttributeType::Text ],
//!     &input,
//!     encoding::all::UTF_8,
//! ).unwrap();
//!
//! let reader = shapefile::ShapefileReader::new(
//!     io::Cursor::new(shp_bytes),
//!     io::Cursor::new(dbf_bytes),
//!     encoding::all::UTF_8,
//! ).unwrap();
//!
//! let output: Vec<_> = reader.map(|r| r.unwrap()).collect();
//! assert_eq!(2, output.len());
//! assert_eq!(Geometry::Point(Point(3.0, 4.0)), output[1].geometry);
//! assert_eq!(AttributeValue::Text("second".to_string()), output[1].row[0]);
//! # }
//! ```
extern crate byteorder;
extern crate encoding;
extern crate itertools;
#[macro_use] extern crate lazy_static;
extern crate regex;

use std::fs;
use std::io;
use std::path::Path;

pub mod dbf;
pub mod feature;
pub mod schema;
pub mod shp;

pub use dbf::{AttributeValue, DbfDate, DbfField, DbfReader, DbfType, DbfWriter};
pub use feature::{Feature, ShapefileError, ShapefileReader};
pub use feature::{open, write, write_path};
pub use schema::{AttributeType, SchemaError};
pub use shp::{BoundingBox, Geometry, Part, Point, Ring, ShapeType, ShpReader, ShpWriter};

pub fn open_ascii(shp_path: &Path) -> Result<ShapefileReader<io::BufReader<fs::File>, io::BufReader<fs::File>>, ShapefileError> {
    open(shp_path, encoding::all::ASCII)
}

pub fn open_utf8(shp_path: &Path) -> Result<ShapefileReader<io::BufReader<fs::File>, io::BufReader<fs::File>>, ShapefileError> {
    open(shp_path, encoding::all::UTF_8)
}

pub fn open_windows1252(shp_path: &Path) -> Result<ShapefileReader<io::BufReader<fs::File>, io::BufReader<fs::File>>, ShapefileError> {
    open(shp_path, encoding::all::WINDOWS_1252)
}
