//! Reads and writes ESRI ".shp" Shapefiles, as per
//! https://www.esri.com/library/whitepapers/pdfs/shapefile.pdf
//!
//! The 100-byte main header mixes big-endian and little-endian fields at
//! fixed offsets, so every field is coded individually instead of running a
//! single byte order over the whole stream.
use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use itertools::Itertools;

const SHP_HEADER_LENGTH: usize = 100;
const SHP_RECORD_HEADER_LENGTH: usize = 8;
const SHP_MAGIC_NUMBER: u32 = 9994;
const SHP_VERSION: u32 = 1000;
const SHP_POINT_LENGTH: usize = 16;

#[derive(Debug)]
pub enum ShpError {
    IOError(io::Error),
    ParseError(String),
}

impl error::Error for ShpError {
    fn cause(&self) -> Option<&error::Error> {
        match *self {
            ShpError::IOError(ref err) => { Some(err) },
            ShpError::ParseError(_) => { None },
        }
    }
}

impl fmt::Display for ShpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ShpError::IOError(ref err) => { err.fmt(f) },
            ShpError::ParseError(ref description) => { write!(f, "Parse error: {}", description) },
        }
    }
}

/// The shape types this library supports.
///
/// A ".shp" file is monotyped: the main header declares one of these, and
/// every record in the file must carry the same tag -- except `Null`, the
/// empty-geometry placeholder, which is valid in any file.
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum ShapeType {
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
}

impl ShapeType {
    fn with_u32(u: u32) -> Option<ShapeType> {
        match u {
            0 => Some(ShapeType::Null),
            1 => Some(ShapeType::Point),
            3 => Some(ShapeType::PolyLine),
            5 => Some(ShapeType::Polygon),
            8 => Some(ShapeType::MultiPoint),
            _ => None,
        }
    }

    fn as_u32(self) -> u32 {
        match self {
            ShapeType::Null => 0,
            ShapeType::Point => 1,
            ShapeType::PolyLine => 3,
            ShapeType::Polygon => 5,
            ShapeType::MultiPoint => 8,
        }
    }
}

/// (min_x, min_y, max_x, max_y), as stored in the main header and in
/// PolyLine/Polygon/MultiPoint record bodies.
#[derive(Debug,Copy,Clone,PartialEq)]
pub struct BoundingBox(pub f64, pub f64, pub f64, pub f64);

#[derive(Debug,Copy,Clone)]
pub struct ShpHeader {
    pub file_n_bytes: usize,
    pub shape_type: ShapeType,
    pub bounding_box: BoundingBox,
}

#[derive(Debug,Clone,Copy,PartialEq,PartialOrd)]
pub struct Point(pub f64, pub f64);

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.0, self.1)
    }
}

/// One open run of coordinates within a PolyLine record.
#[derive(Debug,Clone,PartialEq)]
pub struct Part(pub Box<[Point]>);

/// One closed run of coordinates within a Polygon record. The format stores
/// rings with the first point repeated at the end; winding order is kept
/// exactly as stored, outer rings and holes are not told apart here.
#[derive(Debug,Clone,PartialEq)]
pub struct Ring(pub Box<[Point]>);

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut r = write!(f, "[");
        for (i, &point) in self.0.iter().enumerate() {
            if i > 0 {
                r = r.and_then(|_| write!(f, ","));
            }
            r = r.and_then(|_| write!(f, "{}", point));
        }
        r.and_then(|_| write!(f, "]"))
    }
}

/// One decoded ".shp" record body.
#[derive(Debug,Clone,PartialEq)]
pub enum Geometry {
    Null,
    Point(Point),
    PolyLine(Box<[Part]>),
    Polygon(Box<[Ring]>),
    MultiPoint(Box<[Point]>),
}

#[derive(Debug)]
struct Bounds {
    seen: bool,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    fn new() -> Bounds {
        Bounds { seen: false, min_x: 0., min_y: 0., max_x: 0., max_y: 0. }
    }

    fn extend(&mut self, point: &Point) {
        if !self.seen {
            self.seen = true;
            self.min_x = point.0;
            self.max_x = point.0;
            self.min_y = point.1;
            self.max_y = point.1;
            return;
        }
        if point.0 < self.min_x { self.min_x = point.0; }
        if point.0 > self.max_x { self.max_x = point.0; }
        if point.1 < self.min_y { self.min_y = point.1; }
        if point.1 > self.max_y { self.max_y = point.1; }
    }

    fn to_bounding_box(&self) -> BoundingBox {
        BoundingBox(self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl Geometry {
    pub fn shape_type(&self) -> ShapeType {
        match *self {
            Geometry::Null => ShapeType::Null,
            Geometry::Point(_) => ShapeType::Point,
            Geometry::PolyLine(_) => ShapeType::PolyLine,
            Geometry::Polygon(_) => ShapeType::Polygon,
            Geometry::MultiPoint(_) => ShapeType::MultiPoint,
        }
    }

    fn each_point<F>(&self, f: &mut F) where F: FnMut(&Point) {
        match *self {
            Geometry::Null => {},
            Geometry::Point(ref point) => { f(point); },
            Geometry::PolyLine(ref parts) => {
                for part in parts.iter() {
                    for point in part.0.iter() { f(point); }
                }
            },
            Geometry::Polygon(ref rings) => {
                for ring in rings.iter() {
                    for point in ring.0.iter() { f(point); }
                }
            },
            Geometry::MultiPoint(ref points) => {
                for point in points.iter() { f(point); }
            },
        }
    }

    /// The bounding box of all coordinates in the geometry; all-zero for
    /// `Null` and other empty geometries.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bounds = Bounds::new();
        self.each_point(&mut |point| bounds.extend(point));
        bounds.to_bounding_box()
    }

    /// The record's content length, in 16-bit words: the size of the body
    /// this geometry encodes to, excluding the 8-byte record header.
    pub fn content_words(&self) -> usize {
        match *self {
            Geometry::Null => 2,
            Geometry::Point(_) => 10,
            Geometry::MultiPoint(ref points) => 20 + 8 * points.len(),
            Geometry::PolyLine(ref parts) => {
                let n_points: usize = parts.iter().map(|part| part.0.len()).sum();
                22 + 2 * parts.len() + 8 * n_points
            },
            Geometry::Polygon(ref rings) => {
                let n_points: usize = rings.iter().map(|ring| ring.0.len()).sum();
                22 + 2 * rings.len() + 8 * n_points
            },
        }
    }
}

/// Reads the first 100 bytes of the file.
///
/// Side-effect: advances the file cursor 100 bytes.
fn read_shp_header<R: io::Read>(file: &mut R) -> Result<ShpHeader, ShpError> {
    let mut buf = [ 0u8; SHP_HEADER_LENGTH ];

    match file.read_exact(&mut buf) {
        Err(err) => { Err(ShpError::IOError(err)) },
        Ok(_) => {
            let magic_number = BigEndian::read_u32(&buf[0..4]);
            let file_len = BigEndian::read_u32(&buf[24..28]);
            let version = LittleEndian::read_u32(&buf[28..32]);
            let shape_type_u32 = LittleEndian::read_u32(&buf[32..36]);
            let bounding_box = BoundingBox(
                LittleEndian::read_f64(&buf[36..44]),
                LittleEndian::read_f64(&buf[44..52]),
                LittleEndian::read_f64(&buf[52..60]),
                LittleEndian::read_f64(&buf[60..68]),
            );

            if magic_number != SHP_MAGIC_NUMBER {
                return Err(ShpError::ParseError(format!("File has wrong magic number: found {}, expected {}", magic_number, SHP_MAGIC_NUMBER)));
            }

            if version != SHP_VERSION {
                return Err(ShpError::ParseError(format!("File has wrong version: found {}, expected {}", version, SHP_VERSION)));
            }

            match ShapeType::with_u32(shape_type_u32) {
                Some(shape_type) => {
                    Ok(ShpHeader {
                        // the header counts 16-bit words
                        file_n_bytes: (file_len * 2) as usize,
                        shape_type: shape_type,
                        bounding_box: bounding_box,
                    })
                }
                None => {
                    Err(ShpError::ParseError(format!("File has unsupported shape type {}", shape_type_u32)))
                }
            }
        }
    }
}

/// Writes the 100-byte main header. The reserved Z/M range doubles at bytes
/// 68-99 are zero-filled.
fn write_shp_header<W: io::Write>(file: &mut W, header: &ShpHeader) -> Result<(), ShpError> {
    let mut buf = [ 0u8; SHP_HEADER_LENGTH ];

    BigEndian::write_u32(&mut buf[0..4], SHP_MAGIC_NUMBER);
    // bytes 4..24: five unused big-endian words, left zero
    BigEndian::write_u32(&mut buf[24..28], (header.file_n_bytes / 2) as u32);
    LittleEndian::write_u32(&mut buf[28..32], SHP_VERSION);
    LittleEndian::write_u32(&mut buf[32..36], header.shape_type.as_u32());
    LittleEndian::write_f64(&mut buf[36..44], header.bounding_box.0);
    LittleEndian::write_f64(&mut buf[44..52], header.bounding_box.1);
    LittleEndian::write_f64(&mut buf[52..60], header.bounding_box.2);
    LittleEndian::write_f64(&mut buf[60..68], header.bounding_box.3);

    file.write_all(&buf).map_err(ShpError::IOError)
}

fn parse_point(buf: &[u8]) -> Point {
    Point(
        LittleEndian::read_f64(&buf[0..8]),
        LittleEndian::read_f64(&buf[8..16]),
    )
}

fn write_point(buf: &mut [u8], point: &Point) {
    LittleEndian::write_f64(&mut buf[0..8], point.0);
    LittleEndian::write_f64(&mut buf[8..16], point.1);
}

fn parse_point_record(buf: &[u8], record_number: u32) -> Result<Geometry, ShpError> {
    let needed_len = 4 + SHP_POINT_LENGTH;
    if buf.len() != needed_len {
        return Err(ShpError::ParseError(format!("Record number {} needs {} bytes, but the record header says it has {}", record_number, needed_len, buf.len())));
    }
    Ok(Geometry::Point(parse_point(&buf[4..20])))
}

fn parse_multipoint_record(buf: &[u8], record_number: u32) -> Result<Geometry, ShpError> {
    if buf.len() < 40 {
        return Err(ShpError::ParseError(format!("Record number {} is truncated: a MultiPoint body needs at least 40 bytes, found {}", record_number, buf.len())));
    }

    // bytes 4..36 are the record's own bounding box: author-supplied
    // metadata, not re-validated here
    let num_points = LittleEndian::read_u32(&buf[36..40]) as usize;

    let needed_len = 40 + SHP_POINT_LENGTH * num_points;
    if buf.len() != needed_len {
        return Err(ShpError::ParseError(format!("Record number {} needs {} bytes (it has {} points), but the record header says it has {}", record_number, needed_len, num_points, buf.len())));
    }

    let mut points = Vec::<Point>::with_capacity(num_points);
    for chunk in buf[40..].chunks(SHP_POINT_LENGTH) {
        points.push(parse_point(chunk));
    }

    Ok(Geometry::MultiPoint(points.into_boxed_slice()))
}

/// Splits a PolyLine/Polygon body into its coordinate runs. The two types
/// share one physical layout; only the interpretation of a run differs.
fn parse_poly_runs(buf: &[u8], record_number: u32) -> Result<Vec<Box<[Point]>>, ShpError> {
    if buf.len() < 44 {
        return Err(ShpError::ParseError(format!("Record number {} is truncated: a PolyLine/Polygon body needs at least 44 bytes, found {}", record_number, buf.len())));
    }

    let num_parts = LittleEndian::read_u32(&buf[36..40]) as usize;
    if num_parts == 0 {
        return Err(ShpError::ParseError(format!("Record number {} has no parts", record_number)));
    }

    let num_points = LittleEndian::read_u32(&buf[40..44]) as usize;

    let needed_len = 44 + 4 * num_parts + SHP_POINT_LENGTH * num_points;
    if needed_len != buf.len() {
        return Err(ShpError::ParseError(format!("Record number {} needs {} bytes (it has {} parts and {} points), but the record header says it has {}", record_number, needed_len, num_parts, num_points, buf.len())));
    }

    let mut points = Vec::<Point>::with_capacity(num_points);
    for chunk in buf[44 + 4 * num_parts ..].chunks(SHP_POINT_LENGTH) {
        points.push(parse_point(chunk));
    }

    // part-start offsets into the flat point array; the last part runs to
    // num_points, so append that as a sentinel
    let mut offsets: Vec<usize> = buf[44 .. 44 + 4 * num_parts].chunks(4)
        .map(|b| LittleEndian::read_u32(b) as usize)
        .collect();
    offsets.push(num_points);

    let mut runs = Vec::<Box<[Point]>>::with_capacity(num_parts);
    for (&part_start, &part_end) in offsets.iter().tuple_windows() {
        if part_start > part_end || part_end > num_points {
            return Err(ShpError::ParseError(format!("Record number {} has a part with points {}-{}, but there are only {} points in the record", record_number, part_start, part_end, num_points)));
        }

        let mut run = vec![ Point(0., 0.); part_end - part_start ].into_boxed_slice();
        run.copy_from_slice(&points[part_start .. part_end]);
        runs.push(run);
    }

    Ok(runs)
}

/// Decodes one record body. The body's own leading 4 bytes are the record's
/// little-endian shape-type tag; it must match the file-level type, except
/// that `Null` is accepted anywhere.
fn parse_record(buf: &[u8], record_number: u32, file_type: ShapeType) -> Result<Geometry, ShpError> {
    if buf.len() < 4 {
        return Err(ShpError::ParseError(format!("Record number {} is truncated: no shape-type tag", record_number)));
    }

    let shape_type_u32 = LittleEndian::read_u32(&buf[0..4]);
    let shape_type = match ShapeType::with_u32(shape_type_u32) {
        Some(shape_type) => shape_type,
        None => {
            return Err(ShpError::ParseError(format!("Record number {} has unsupported shape type {}", record_number, shape_type_u32)));
        }
    };

    if shape_type != ShapeType::Null && shape_type != file_type {
        return Err(ShpError::ParseError(format!("Record number {} has a shape type mismatch: found {:?}, the file is typed {:?}", record_number, shape_type, file_type)));
    }

    match shape_type {
        ShapeType::Null => {
            if buf.len() != 4 {
                return Err(ShpError::ParseError(format!("Record number {} is a Null shape but has a {}-byte body", record_number, buf.len())));
            }
            Ok(Geometry::Null)
        },
        ShapeType::Point => parse_point_record(buf, record_number),
        ShapeType::MultiPoint => parse_multipoint_record(buf, record_number),
        ShapeType::PolyLine => {
            parse_poly_runs(buf, record_number).map(|runs| {
                let parts: Vec<Part> = runs.into_iter().map(Part).collect();
                Geometry::PolyLine(parts.into_boxed_slice())
            })
        },
        ShapeType::Polygon => {
            parse_poly_runs(buf, record_number).map(|runs| {
                let rings: Vec<Ring> = runs.into_iter().map(Ring).collect();
                Geometry::Polygon(rings.into_boxed_slice())
            })
        },
    }
}

fn encode_poly_body(buf: &mut [u8], bounding_box: &BoundingBox, runs: &[&[Point]]) {
    LittleEndian::write_f64(&mut buf[4..12], bounding_box.0);
    LittleEndian::write_f64(&mut buf[12..20], bounding_box.1);
    LittleEndian::write_f64(&mut buf[20..28], bounding_box.2);
    LittleEndian::write_f64(&mut buf[28..36], bounding_box.3);

    let num_points: usize = runs.iter().map(|run| run.len()).sum();
    LittleEndian::write_u32(&mut buf[36..40], runs.len() as u32);
    LittleEndian::write_u32(&mut buf[40..44], num_points as u32);

    let mut offset = 0;
    for (i, run) in runs.iter().enumerate() {
        LittleEndian::write_u32(&mut buf[44 + 4 * i .. 48 + 4 * i], offset as u32);
        offset += run.len();
    }

    let points_at = 44 + 4 * runs.len();
    let mut i = 0;
    for run in runs.iter() {
        for point in run.iter() {
            write_point(&mut buf[points_at + SHP_POINT_LENGTH * i ..], point);
            i += 1;
        }
    }
}

/// Encodes one record body, leading shape-type tag included. The buffer is
/// exactly `geometry.content_words() * 2` bytes long.
fn encode_record_body(geometry: &Geometry) -> Vec<u8> {
    let mut buf = vec![ 0u8; geometry.content_words() * 2 ];
    LittleEndian::write_u32(&mut buf[0..4], geometry.shape_type().as_u32());

    match *geometry {
        Geometry::Null => {},
        Geometry::Point(ref point) => {
            write_point(&mut buf[4..20], point);
        },
        Geometry::MultiPoint(ref points) => {
            let bounding_box = geometry.bounding_box();
            LittleEndian::write_f64(&mut buf[4..12], bounding_box.0);
            LittleEndian::write_f64(&mut buf[12..20], bounding_box.1);
            LittleEndian::write_f64(&mut buf[20..28], bounding_box.2);
            LittleEndian::write_f64(&mut buf[28..36], bounding_box.3);
            LittleEndian::write_u32(&mut buf[36..40], points.len() as u32);
            for (i, point) in points.iter().enumerate() {
                write_point(&mut buf[40 + SHP_POINT_LENGTH * i ..], point);
            }
        },
        Geometry::PolyLine(ref parts) => {
            let runs: Vec<&[Point]> = parts.iter().map(|part| &*part.0).collect();
            encode_poly_body(&mut buf, &geometry.bounding_box(), &runs);
        },
        Geometry::Polygon(ref rings) => {
            let runs: Vec<&[Point]> = rings.iter().map(|ring| &*ring.0).collect();
            encode_poly_body(&mut buf, &geometry.bounding_box(), &runs);
        },
    }

    buf
}

/// Fills `buf` from the file. `Ok(false)` means the stream ended before the
/// first byte -- a clean end-of-stream at a record boundary. Ending anywhere
/// else inside the buffer is a parse error, not an IO error.
fn fill<R: io::Read>(file: &mut R, buf: &mut [u8]) -> Result<bool, ShpError> {
    let mut n_read = 0;
    while n_read < buf.len() {
        match file.read(&mut buf[n_read..]) {
            Ok(0) => {
                if n_read == 0 {
                    return Ok(false);
                }
                return Err(ShpError::ParseError(String::from("File ends in the middle of a record")));
            }
            Ok(n) => { n_read += n; }
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => { return Err(ShpError::IOError(err)); }
        }
    }
    Ok(true)
}

/// Reads the next record from the file, returning its record number, its
/// geometry and the number of bytes it consumed (record header included).
/// `Ok(None)` means the stream ended cleanly at a record boundary.
///
/// Side effect: advances the file cursor to the next record.
fn read_record<R: io::Read>(file: &mut R, file_type: ShapeType) -> Result<Option<(u32, Geometry, usize)>, ShpError> {
    let mut header_buf = [ 0u8; SHP_RECORD_HEADER_LENGTH ];

    if !fill(file, &mut header_buf)? {
        return Ok(None);
    }

    let record_number = BigEndian::read_u32(&header_buf[0..4]);
    let content_length = BigEndian::read_u32(&header_buf[4..8]) as usize;

    let mut buf = vec![ 0u8; content_length * 2 ];
    if !fill(file, &mut buf)? {
        return Err(ShpError::ParseError(format!("File ends before the body of record number {}", record_number)));
    }

    parse_record(&buf, record_number, file_type)
        .map(|geometry| Some((record_number, geometry, header_buf.len() + buf.len())))
}

/// Reads an ESRI ".shp" Shapefile record by record.
///
/// # Example
///
/// ```
/// use std::io;
/// use shapefile::shp::{Geometry, Point, ShpReader, ShpWriter};
///
/// let mut bytes = Vec::new();
/// {
///     let mut writer = ShpWriter::new(&mut bytes);
///     writer.write_all(&[ Geometry::Point(Point(10.0, 20.0)) ]).unwrap();
/// }
///
/// // builder returns Result<ShpReader, ShpError>
/// let mut reader = ShpReader::new(io::Cursor::new(bytes)).unwrap();
///
/// // reader.next(), an Iterator method, returns
/// // Option<Result<(u32, Geometry), ShpError>>
/// let (record_number, geometry) = reader.next().unwrap().unwrap();
/// assert_eq!(1, record_number);
/// assert_eq!(Geometry::Point(Point(10.0, 20.0)), geometry);
/// assert!(reader.next().is_none());
/// ```
#[derive(Debug)]
pub struct ShpReader<R: io::Read> {
    file: R,
    pub n_bytes_already_read: usize,
    pub header: ShpHeader,
}

impl<R: io::Read> ShpReader<R> {
    pub fn new(mut file: R) -> Result<ShpReader<R>, ShpError> {
        read_shp_header(&mut file).map(move |shp_header| {
            ShpReader::<R> {
                file: file,
                n_bytes_already_read: SHP_HEADER_LENGTH,
                header: shp_header,
            }
        })
    }
}

impl<R: io::Read> Iterator for ShpReader<R> {
    type Item = Result<(u32, Geometry), ShpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.n_bytes_already_read >= self.header.file_n_bytes {
            return None;
        }
        match read_record(&mut self.file, self.header.shape_type) {
            Err(err) => Some(Err(err)),
            Ok(None) => None,
            Ok(Some((record_number, geometry, n_bytes))) => {
                self.n_bytes_already_read += n_bytes;
                if self.n_bytes_already_read > self.header.file_n_bytes {
                    Some(Err(ShpError::ParseError(format!("The Shapefile header suggests the file is {} bytes long, but it's longer than that.", self.header.file_n_bytes))))
                } else {
                    Some(Ok((record_number, geometry)))
                }
            }
        }
    }
}

/// Writes an ESRI ".shp" Shapefile.
///
/// The header's file length and bounding box must be known before the first
/// byte goes out, so `write_all` runs a scan pass over all geometries
/// (uniform-type check, lengths, bounds) and only then emits the file.
#[derive(Debug)]
pub struct ShpWriter<W: io::Write> {
    file: W,
}

impl<W: io::Write> ShpWriter<W> {
    pub fn new(file: W) -> ShpWriter<W> {
        ShpWriter { file: file }
    }

    /// Writes a complete ".shp" file: the 100-byte header, then one framed
    /// record per geometry, numbered sequentially from 1.
    ///
    /// All non-Null geometries must share one shape type; `Null` is allowed
    /// anywhere. A file of nothing but `Null` geometries is typed `Null`.
    /// A PolyLine/Polygon with no parts is refused: the format has no
    /// representation for it. Nothing is written once any check fails.
    pub fn write_all(&mut self, geometries: &[Geometry]) -> Result<(), ShpError> {
        // scan pass: file type, total length, bounding box
        let mut file_type = ShapeType::Null;
        for (i, geometry) in geometries.iter().enumerate() {
            // a PolyLine/Polygon record holds at least one run; an empty one
            // would encode to a body no reader accepts
            match *geometry {
                Geometry::PolyLine(ref parts) if parts.is_empty() => {
                    return Err(ShpError::ParseError(format!("Geometry {} is a PolyLine with no parts", i + 1)));
                },
                Geometry::Polygon(ref rings) if rings.is_empty() => {
                    return Err(ShpError::ParseError(format!("Geometry {} is a Polygon with no rings", i + 1)));
                },
                _ => {},
            }

            let shape_type = geometry.shape_type();
            if shape_type == ShapeType::Null {
                continue;
            }
            if file_type == ShapeType::Null {
                file_type = shape_type;
            } else if shape_type != file_type {
                return Err(ShpError::ParseError(format!("Geometry {} is a {:?}, but earlier geometries are {:?}: a '.shp' file holds one shape type", i + 1, shape_type, file_type)));
            }
        }

        let mut file_n_bytes = SHP_HEADER_LENGTH;
        let mut bounds = Bounds::new();
        for geometry in geometries.iter() {
            file_n_bytes += SHP_RECORD_HEADER_LENGTH + 2 * geometry.content_words();
            geometry.each_point(&mut |point| bounds.extend(point));
        }

        // emit pass
        write_shp_header(&mut self.file, &ShpHeader {
            file_n_bytes: file_n_bytes,
            shape_type: file_type,
            bounding_box: bounds.to_bounding_box(),
        })?;

        for (i, geometry) in geometries.iter().enumerate() {
            let body = encode_record_body(geometry);
            let mut header_buf = [ 0u8; SHP_RECORD_HEADER_LENGTH ];
            BigEndian::write_u32(&mut header_buf[0..4], (i + 1) as u32);
            BigEndian::write_u32(&mut header_buf[4..8], (body.len() / 2) as u32);
            self.file.write_all(&header_buf).map_err(ShpError::IOError)?;
            self.file.write_all(&body).map_err(ShpError::IOError)?;
        }

        self.file.flush().map_err(ShpError::IOError)
    }
}

/// Opens a ".shp" file for reading.
pub fn open(path: &Path) -> Result<ShpReader<io::BufReader<fs::File>>, ShpError> {
    match fs::File::open(path) {
        Err(err) => Err(ShpError::IOError(err)),
        Ok(f) => {
            let r = io::BufReader::new(f);
            ShpReader::new(r)
        }
    }
}

/// Creates a ".shp" file for writing.
pub fn create(path: &Path) -> Result<ShpWriter<io::BufWriter<fs::File>>, ShpError> {
    match fs::File::create(path) {
        Err(err) => Err(ShpError::IOError(err)),
        Ok(f) => Ok(ShpWriter::new(io::BufWriter::new(f))),
    }
}

#[cfg(test)]
mod test {
    use std::io;
    use super::*;
    use byteorder::{BigEndian, ByteOrder};

    fn round_trip(geometries: &[Geometry]) -> (ShpHeader, Vec<Geometry>) {
        let mut bytes = Vec::new();
        {
            let mut writer = ShpWriter::new(&mut bytes);
            writer.write_all(geometries).unwrap();
        }
        let mut reader = ShpReader::new(io::Cursor::new(bytes)).unwrap();
        let header = reader.header;
        let mut result = Vec::new();
        for (i, item) in reader.by_ref().enumerate() {
            let (record_number, geometry) = item.unwrap();
            assert_eq!((i + 1) as u32, record_number);
            result.push(geometry);
        }
        (header, result)
    }

    fn is_parse_error(err: ShpError) -> bool {
        match err {
            ShpError::ParseError(_) => true,
            ShpError::IOError(_) => false,
        }
    }

    #[test]
    fn point_round_trip() {
        let input = vec![
            Geometry::Point(Point(1.5, -2.5)),
            Geometry::Point(Point(0., 0.)),
        ];
        let (header, output) = round_trip(&input);
        assert_eq!(ShapeType::Point, header.shape_type);
        assert_eq!(input, output);
    }

    #[test]
    fn polygon_round_trip_with_bounding_box() {
        let ring = Ring(vec![
            Point(0., 0.), Point(0., 300.), Point(300., 300.), Point(300., 0.), Point(0., 0.),
        ].into_boxed_slice());
        let input = vec![ Geometry::Polygon(vec![ ring ].into_boxed_slice()) ];

        let (header, output) = round_trip(&input);
        assert_eq!(input, output);
        assert_eq!(BoundingBox(0., 0., 300., 300.), header.bounding_box);
        match output[0] {
            Geometry::Polygon(ref rings) => {
                assert_eq!(1, rings.len());
                assert_eq!(5, rings[0].0.len());
            }
            ref other => panic!("expected a Polygon, got {:?}", other),
        }
        assert_eq!(BoundingBox(0., 0., 300., 300.), output[0].bounding_box());
    }

    #[test]
    fn multi_part_polyline_round_trip() {
        let input = vec![ Geometry::PolyLine(vec![
            Part(vec![ Point(0., 0.), Point(1., 1.), Point(2., 0.) ].into_boxed_slice()),
            Part(vec![ Point(5., 5.), Point(6., 6.) ].into_boxed_slice()),
        ].into_boxed_slice()) ];
        let (header, output) = round_trip(&input);
        assert_eq!(ShapeType::PolyLine, header.shape_type);
        assert_eq!(input, output);
    }

    #[test]
    fn multipoint_round_trip() {
        let input = vec![ Geometry::MultiPoint(vec![
            Point(-1., -2.), Point(3., 4.), Point(0.5, 0.25),
        ].into_boxed_slice()) ];
        let (header, output) = round_trip(&input);
        assert_eq!(ShapeType::MultiPoint, header.shape_type);
        assert_eq!(BoundingBox(-1., -2., 3., 4.), header.bounding_box);
        assert_eq!(input, output);
    }

    #[test]
    fn null_record_accepted_in_typed_file() {
        let input = vec![
            Geometry::Point(Point(1., 1.)),
            Geometry::Null,
            Geometry::Point(Point(2., 2.)),
        ];
        let (header, output) = round_trip(&input);
        assert_eq!(ShapeType::Point, header.shape_type);
        assert_eq!(input, output);
    }

    #[test]
    fn all_null_file_is_typed_null() {
        let input = vec![ Geometry::Null, Geometry::Null ];
        let (header, output) = round_trip(&input);
        assert_eq!(ShapeType::Null, header.shape_type);
        assert_eq!(input, output);
    }

    #[test]
    fn mixed_shape_types_refused_on_write() {
        let mut bytes = Vec::new();
        let mut writer = ShpWriter::new(&mut bytes);
        let ring = Ring(vec![ Point(0., 0.), Point(0., 1.), Point(1., 1.), Point(0., 0.) ].into_boxed_slice());
        let err = writer.write_all(&[
            Geometry::Point(Point(1., 1.)),
            Geometry::Polygon(vec![ ring ].into_boxed_slice()),
        ]).unwrap_err();
        assert!(is_parse_error(err));
        assert!(bytes.is_empty()); // refused before the first byte
    }

    #[test]
    fn empty_poly_geometries_refused_on_write() {
        for geometry in vec![
            Geometry::Polygon(vec![].into_boxed_slice()),
            Geometry::PolyLine(vec![].into_boxed_slice()),
        ] {
            let mut bytes = Vec::new();
            let mut writer = ShpWriter::new(&mut bytes);
            let err = writer.write_all(&[ geometry ]).unwrap_err();
            assert!(is_parse_error(err));
            assert!(bytes.is_empty()); // refused before the first byte
        }
    }

    #[test]
    fn record_type_must_match_file_type() {
        // a Polygon-typed file whose single record is a Point
        let body = encode_record_body(&Geometry::Point(Point(1., 2.)));
        let mut bytes = Vec::new();
        write_shp_header(&mut bytes, &ShpHeader {
            file_n_bytes: SHP_HEADER_LENGTH + SHP_RECORD_HEADER_LENGTH + body.len(),
            shape_type: ShapeType::Polygon,
            bounding_box: BoundingBox(0., 0., 0., 0.),
        }).unwrap();
        let mut record_header = [ 0u8; SHP_RECORD_HEADER_LENGTH ];
        BigEndian::write_u32(&mut record_header[0..4], 1);
        BigEndian::write_u32(&mut record_header[4..8], (body.len() / 2) as u32);
        bytes.extend_from_slice(&record_header);
        bytes.extend_from_slice(&body);

        let mut reader = ShpReader::new(io::Cursor::new(bytes)).unwrap();
        let err = reader.next().unwrap().unwrap_err();
        match err {
            ShpError::ParseError(ref description) => {
                assert!(description.contains("shape type mismatch"), "{}", description);
            }
            ref other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn truncated_record_is_a_parse_error() {
        let mut bytes = Vec::new();
        {
            let mut writer = ShpWriter::new(&mut bytes);
            writer.write_all(&[ Geometry::Point(Point(1., 2.)) ]).unwrap();
        }
        bytes.truncate(bytes.len() - 3); // cut into the record body
        let mut reader = ShpReader::new(io::Cursor::new(bytes)).unwrap();
        let err = reader.next().unwrap().unwrap_err();
        assert!(is_parse_error(err));
    }

    #[test]
    fn clean_eof_at_record_boundary_ends_iteration() {
        // header promises two records but the stream ends after one
        let mut bytes = Vec::new();
        {
            let mut writer = ShpWriter::new(&mut bytes);
            writer.write_all(&[
                Geometry::Point(Point(1., 2.)),
                Geometry::Point(Point(3., 4.)),
            ]).unwrap();
        }
        bytes.truncate(SHP_HEADER_LENGTH + SHP_RECORD_HEADER_LENGTH + 20);
        let mut reader = ShpReader::new(io::Cursor::new(bytes)).unwrap();
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().is_none());
    }

    #[test]
    fn content_words_match_encoded_length() {
        let geometries = vec![
            Geometry::Null,
            Geometry::Point(Point(1., 2.)),
            Geometry::MultiPoint(vec![ Point(1., 2.), Point(3., 4.) ].into_boxed_slice()),
            Geometry::PolyLine(vec![
                Part(vec![ Point(0., 0.), Point(1., 1.) ].into_boxed_slice()),
            ].into_boxed_slice()),
        ];
        for geometry in &geometries {
            assert_eq!(geometry.content_words() * 2, encode_record_body(geometry).len());
        }
    }
}
