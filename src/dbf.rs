//! Reads and writes xbase ".dbf" attribute tables, as per
//! https://www.clicketyclick.dk/databases/xbase/format/dbf.html
//!
//! A ".dbf" file is a fixed-width row store: a 32-byte preamble, one 32-byte
//! descriptor per field, a 0x0D terminator, then `n_records` records of
//! exactly `n_bytes_per_record` bytes each (1 deleted-flag byte + the field
//! values in descriptor order).
use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use byteorder::{ByteOrder, LittleEndian};
use encoding::{self, Encoding};
use regex::Regex;

const DBF_HEADER_LENGTH: usize = 32;
const DBF_FIELD_DESCRIPTOR_LENGTH: usize = 32;
const DBF_HEADER_TERMINATOR: u8 = 0x0d;
const DBF_EOF: u8 = 0x1a;
const DBF_VERSION: u8 = 0x03;
const DBF_DELETED_FLAG: u8 = b'*';
const DBF_MAX_FIELD_NAME_LENGTH: usize = 10;
const DBF_MAX_FIELD_LENGTH: usize = 255;

lazy_static! {
    // What a Numeric/Float payload must look like to count as a number.
    // f64::from_str is looser than the format ("inf", "NaN"), so the
    // permissive text fallback is gated on this instead.
    static ref NUMERIC: Regex = Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap();
}

#[derive(Debug)]
pub enum DbfError {
    IOError(io::Error),
    ParseError(String),
}

impl error::Error for DbfError {
    fn cause(&self) -> Option<&error::Error> {
        match *self {
            DbfError::IOError(ref err) => { Some(err) },
            DbfError::ParseError(_) => { None },
        }
    }
}

impl fmt::Display for DbfError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DbfError::IOError(ref err) => { err.fmt(f) },
            DbfError::ParseError(ref description) => { write!(f, "Parse error: {}", description) },
        }
    }
}

/// The dBase field type tags this library supports. Tags are single ASCII
/// characters in the file and are read case-insensitively.
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum DbfType {
    Logical,
    Character,
    Date,
    Numeric,
    Float,
}

impl DbfType {
    fn with_u8(u: u8) -> Option<DbfType> {
        match u.to_ascii_uppercase() {
            b'L' => Some(DbfType::Logical),
            b'C' => Some(DbfType::Character),
            b'D' => Some(DbfType::Date),
            b'N' => Some(DbfType::Numeric),
            b'F' => Some(DbfType::Float),
            _ => None,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            DbfType::Logical => b'L',
            DbfType::Character => b'C',
            DbfType::Date => b'D',
            DbfType::Numeric => b'N',
            DbfType::Float => b'F',
        }
    }
}

/// One column of the table: its name (at most 10 bytes), type tag, width in
/// bytes and decimal-place count, plus its computed offset within a record.
#[derive(Debug,Clone,PartialEq)]
pub struct DbfField {
    pub name: String,
    pub data_type: DbfType,
    pub offset: usize,
    pub len: usize,
    pub decimal_count: usize,
}

impl DbfField {
    pub fn new(name: &str, data_type: DbfType, len: usize, decimal_count: usize) -> DbfField {
        DbfField {
            name: name.to_string(),
            data_type: data_type,
            offset: 0, // recomputed whenever a header is written or parsed
            len: len,
            decimal_count: decimal_count,
        }
    }
}

/// A Date field's payload, kept as the three integers printed in the file
/// (YYYYMMDD). The month is stored exactly as written -- this library does
/// not construct a calendar date, so callers choose their own month
/// convention at the boundary.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct DbfDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl fmt::Display for DbfDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// One decoded field value.
///
/// A nominally Numeric field can decode to `Text`: when the payload isn't
/// parseable as a number, the trimmed text is returned instead of an error,
/// by xbase convention. Blank Numeric/Date fields decode to `Null`, as do
/// uninitialized (`'?'` or blank) Logical fields.
#[derive(Debug,Clone,PartialEq)]
pub enum AttributeValue {
    Null,
    Boolean(bool),
    Text(String),
    Integer(i64),
    Real(f64),
    Date(DbfDate),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Boolean(b) => write!(f, "{}", if b { "T" } else { "F" }),
            AttributeValue::Text(ref s) => write!(f, "{}", s),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Real(x) => write!(f, "{}", x),
            AttributeValue::Date(ref d) => write!(f, "{}", d),
        }
    }
}

#[derive(Debug)]
struct DbfHeader {
    n_records: usize,
    n_header_bytes: usize,
    n_bytes_per_record: usize,
}

pub struct DbfMeta {
    pub n_records: usize,
    pub n_bytes_per_record: usize,
    pub fields: Box<[DbfField]>,
    encoding: encoding::EncodingRef,
}

// encoding::EncodingRef does not implement std::fmt::Debug
impl fmt::Debug for DbfMeta {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("DbfMeta")
            .field("n_records", &self.n_records)
            .field("n_bytes_per_record", &self.n_bytes_per_record)
            .field("fields", &self.fields)
            .field("encoding", &self.encoding.name())
            .finish()
    }
}

/// Reads the first 32 bytes of the file.
///
/// Side-effect: advances the file cursor 32 bytes.
fn read_dbf_header<R: io::Read>(file: &mut R) -> Result<DbfHeader, DbfError> {
    let mut buf: [ u8; DBF_HEADER_LENGTH ] = [ 0; DBF_HEADER_LENGTH ];

    match file.read_exact(&mut buf) {
        Err(err) => { Err(DbfError::IOError(err)) },
        Ok(_) => {
            // It's hard to come up with a ParseError, because virtually any
            // combination of 32 bytes is a valid .dbf header.
            //
            // The one exception: invalid dates. bytes 1-3 (base 0) are "YMD"
            // in hex. All years are valid; there are 12 valid months and 31
            // valid days.
            if buf[2] > 12 || buf[3] > 31 {
                Err(DbfError::ParseError(String::from("The first four bytes of the file mention an invalid creation date. This is not a valid .dbf file.")))
            } else {
                Ok(DbfHeader {
                    n_records: LittleEndian::read_u32(&buf[4..]) as usize,
                    n_header_bytes: LittleEndian::read_u16(&buf[8..]) as usize,
                    n_bytes_per_record: LittleEndian::read_u16(&buf[10..]) as usize,
                })
            }
        }
    }
}

fn parse_field_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}

/// Reads all field descriptors from the file, up to and including the 0x0D
/// header terminator.
///
/// Assumes exactly DBF_HEADER_LENGTH bytes of the file have been read
/// already. In other words, call this after read_dbf_header().
///
/// Side-effect: advances the file cursor to the first data record.
fn read_dbf_fields<R: io::Read>(file: &mut R, dbf_header: &DbfHeader) -> Result<Box<[DbfField]>, DbfError> {
    if dbf_header.n_header_bytes < DBF_HEADER_LENGTH + 1 {
        return Err(DbfError::ParseError(format!("The header says it is {} bytes long, but the fixed preamble alone is {}", dbf_header.n_header_bytes, DBF_HEADER_LENGTH)));
    }

    let mut buf = vec![ 0u8; dbf_header.n_header_bytes - DBF_HEADER_LENGTH ];
    if let Err(err) = file.read_exact(&mut buf) {
        return Err(DbfError::IOError(err));
    }

    let descriptors_len = buf.len() - 1;
    if buf[descriptors_len] != DBF_HEADER_TERMINATOR {
        return Err(DbfError::ParseError(format!("The field descriptors are not followed by the 0x{:02x} header terminator", DBF_HEADER_TERMINATOR)));
    }
    if descriptors_len % DBF_FIELD_DESCRIPTOR_LENGTH != 0 {
        return Err(DbfError::ParseError(format!("The header leaves {} bytes for field descriptors, which is not a multiple of {}", descriptors_len, DBF_FIELD_DESCRIPTOR_LENGTH)));
    }

    let mut fields = Vec::with_capacity(descriptors_len / DBF_FIELD_DESCRIPTOR_LENGTH);
    let mut offset = 1; // byte 0 of each record is the deleted flag
    for descriptor in buf[..descriptors_len].chunks(DBF_FIELD_DESCRIPTOR_LENGTH) {
        let name = parse_field_name(&descriptor[0..11]);
        let data_type = match DbfType::with_u8(descriptor[11]) {
            Some(data_type) => data_type,
            None => {
                return Err(DbfError::ParseError(format!("Field {:?} has unknown type tag 0x{:02x}", name, descriptor[11])));
            }
        };
        let len = descriptor[16] as usize;
        let decimal_count = descriptor[17] as usize;

        fields.push(DbfField {
            name: name,
            data_type: data_type,
            offset: offset,
            len: len,
            decimal_count: decimal_count,
        });
        offset += len;
    }

    // Records may be declared longer than the fields need; the remainder is
    // padding and is skipped on read. Shorter is corrupt.
    if offset > dbf_header.n_bytes_per_record {
        return Err(DbfError::ParseError(format!("The field lengths sum to {} bytes (plus the deleted flag), but the header says each record is only {} bytes", offset - 1, dbf_header.n_bytes_per_record)));
    }

    Ok(fields.into_boxed_slice())
}

/// Reads the header, including field definitions, from a .dbf file.
///
/// Assumes the cursor is at the start of the file.
///
/// Side-effect: advances the file cursor to the first data record.
fn read_dbf_meta<R: io::Read>(file: &mut R, encoding: encoding::EncodingRef) -> Result<DbfMeta, DbfError> {
    read_dbf_header(file).and_then(|dbf_header| {
        read_dbf_fields(file, &dbf_header).map(|dbf_fields| {
            DbfMeta {
                n_records: dbf_header.n_records,
                n_bytes_per_record: dbf_header.n_bytes_per_record,
                fields: dbf_fields,
                encoding: encoding,
            }
        })
    })
}

fn trim_bytes(bytes: &[u8]) -> &[u8] {
    let mut start = 0;
    let mut end = bytes.len();
    while start < end && (bytes[start] == b' ' || bytes[start] == 0) { start += 1; }
    while end > start && (bytes[end - 1] == b' ' || bytes[end - 1] == 0) { end -= 1; }
    &bytes[start..end]
}

fn trim_trailing_bytes(bytes: &[u8]) -> &[u8] {
    let mut end = bytes.len();
    while end > 0 && (bytes[end - 1] == b' ' || bytes[end - 1] == 0) { end -= 1; }
    &bytes[..end]
}

fn decode_text(bytes: &[u8], field: &DbfField, encoding: encoding::EncodingRef) -> Result<String, DbfError> {
    encoding.decode(bytes, encoding::DecoderTrap::Replace)
        .map_err(|err| DbfError::ParseError(format!("Field {:?} holds text that cannot be decoded as {}: {}", field.name, encoding.name(), err)))
}

fn parse_date(bytes: &[u8], field: &DbfField) -> Result<AttributeValue, DbfError> {
    let trimmed = trim_bytes(bytes);
    if trimmed.is_empty() {
        return Ok(AttributeValue::Null);
    }

    let bad_date = || DbfError::ParseError(format!("Field {:?} holds {:?}, which is not a YYYYMMDD date", field.name, String::from_utf8_lossy(bytes)));

    if trimmed.len() != 8 {
        return Err(bad_date());
    }
    let text = match ::std::str::from_utf8(trimmed) {
        Ok(text) => text,
        Err(_) => { return Err(bad_date()); }
    };
    if !text.is_ascii() {
        return Err(bad_date());
    }
    let year = text[0..4].parse::<u16>().map_err(|_| bad_date())?;
    let month = text[4..6].parse::<u8>().map_err(|_| bad_date())?;
    let day = text[6..8].parse::<u8>().map_err(|_| bad_date())?;

    Ok(AttributeValue::Date(DbfDate { year: year, month: month, day: day }))
}

fn parse_number(bytes: &[u8], field: &DbfField, encoding: encoding::EncodingRef) -> Result<AttributeValue, DbfError> {
    let trimmed = trim_bytes(bytes);
    if trimmed.is_empty() {
        return Ok(AttributeValue::Null);
    }

    let text = decode_text(trimmed, field, encoding)?;
    if NUMERIC.is_match(&text) {
        if field.decimal_count == 0 {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(AttributeValue::Integer(i));
            }
        }
        if let Ok(x) = text.parse::<f64>() {
            return Ok(AttributeValue::Real(x));
        }
    }

    // permissive fallback: unparseable numeric payloads become their text
    Ok(AttributeValue::Text(text))
}

fn decode_field(bytes: &[u8], field: &DbfField, encoding: encoding::EncodingRef) -> Result<AttributeValue, DbfError> {
    match field.data_type {
        DbfType::Logical => {
            match bytes.first() {
                Some(&b'T') | Some(&b't') | Some(&b'Y') | Some(&b'y') => Ok(AttributeValue::Boolean(true)),
                // '?' is the uninitialized marker; blanks mean the same
                Some(&b'?') | Some(&b' ') | Some(&0) | None => Ok(AttributeValue::Null),
                Some(_) => Ok(AttributeValue::Boolean(false)),
            }
        },
        DbfType::Character => {
            decode_text(trim_trailing_bytes(bytes), field, encoding).map(AttributeValue::Text)
        },
        DbfType::Date => parse_date(bytes, field),
        DbfType::Numeric | DbfType::Float => parse_number(bytes, field, encoding),
    }
}

/// Reads an xBase ".dbf" file record by record. Soft-deleted records (flag
/// byte `'*'`) are silently skipped; they never reach the caller.
///
/// # Example
///
/// ```
/// # extern crate encoding;
/// # extern crate shapefile;
/// # fn main() {
/// use std::io;
/// use shapefile::dbf::{AttributeValue, DbfField, DbfReader, DbfType, DbfWriter};
///
/// let fields = vec![ DbfField::new("name", DbfType::Character, 6, 0) ];
/// let rows = vec![
///     vec![ AttributeValue::Text("hello".to_string()) ].into_boxed_slice(),
/// ];
///
/// let mut bytes = Vec::new();
/// {
///     let mut writer = DbfWriter::new(&mut bytes, encoding::all::UTF_8);
///     writer.write_all(&fields, &rows).unwrap();
/// }
///
/// let mut reader = DbfReader::new(io::Cursor::new(bytes), encoding::all::UTF_8).unwrap();
/// let row = reader.next().unwrap().unwrap();
/// assert_eq!(AttributeValue::Text("hello".to_string()), row[0]);
/// assert!(reader.next().is_none());
/// # }
/// ```
pub struct DbfReader<R: io::Read> {
    file: R,
    n_records_already_iterated: usize,
    meta: Arc<DbfMeta>,
    mask: Option<Box<[bool]>>,
}

impl<R: io::Read> DbfReader<R> {
    pub fn new(mut file: R, encoding: encoding::EncodingRef) -> Result<DbfReader<R>, DbfError> {
        read_dbf_meta(&mut file, encoding).map(move |dbf_meta| {
            DbfReader::<R> {
                file: file,
                n_records_already_iterated: 0,
                meta: Arc::new(dbf_meta),
                mask: None,
            }
        })
    }

    pub fn fields(&self) -> &[DbfField] {
        &self.meta.fields
    }

    pub fn n_records(&self) -> usize {
        self.meta.n_records
    }

    pub fn get_field(&self, name: &str) -> Option<&DbfField> {
        self.meta.fields.iter().find(|field| field.name == name)
    }

    /// Restricts decoding to the fields whose mask entry is `true`. Rows
    /// yielded afterwards hold only the selected values, in field order;
    /// masked-out fields are never decoded at all.
    pub fn project(&mut self, mask: Box<[bool]>) -> Result<(), DbfError> {
        if mask.len() != self.meta.fields.len() {
            return Err(DbfError::ParseError(format!("The projection mask has {} entries, but the table has {} fields", mask.len(), self.meta.fields.len())));
        }
        self.mask = Some(mask);
        Ok(())
    }

    fn decode_record(&self, bytes: &[u8]) -> Result<Box<[AttributeValue]>, DbfError> {
        let mut values = Vec::with_capacity(self.meta.fields.len());
        for (i, field) in self.meta.fields.iter().enumerate() {
            if let Some(ref mask) = self.mask {
                if !mask[i] {
                    continue;
                }
            }
            let raw = &bytes[field.offset .. field.offset + field.len];
            values.push(decode_field(raw, field, self.meta.encoding)?);
        }
        Ok(values.into_boxed_slice())
    }
}

impl<R: io::Read> Iterator for DbfReader<R> {
    type Item = Result<Box<[AttributeValue]>, DbfError>;

    fn next(&mut self) -> Option<Self::Item> {
        // deleted records still count against n_records, so loop past them
        while self.n_records_already_iterated < self.meta.n_records {
            let mut buf = vec![ 0u8; self.meta.n_bytes_per_record ];
            if let Err(err) = self.file.read_exact(&mut buf) {
                self.n_records_already_iterated = self.meta.n_records; // poison
                return Some(Err(match err.kind() {
                    io::ErrorKind::UnexpectedEof => DbfError::ParseError(String::from("File ends in the middle of a record")),
                    _ => DbfError::IOError(err),
                }));
            }
            self.n_records_already_iterated += 1;

            if buf[0] == DBF_DELETED_FLAG {
                continue;
            }
            return Some(self.decode_record(&buf));
        }
        None
    }
}

fn encode_field(value: &AttributeValue, field: &DbfField, encoding: encoding::EncodingRef, out: &mut [u8]) -> Result<(), DbfError> {
    // `out` arrives blank-filled; encoders only write the payload
    let too_wide = |text: &str| DbfError::ParseError(format!("Value {:?} does not fit in field {:?} (width {})", text, field.name, field.len));

    match (field.data_type, value) {
        (_, &AttributeValue::Null) => {
            if field.data_type == DbfType::Logical {
                out[0] = b'?';
            }
            Ok(())
        },
        (DbfType::Logical, &AttributeValue::Boolean(b)) => {
            out[0] = if b { b'T' } else { b'F' };
            Ok(())
        },
        (DbfType::Character, &AttributeValue::Text(ref s)) => {
            let bytes = match encoding.encode(s, encoding::EncoderTrap::Replace) {
                Ok(bytes) => bytes,
                Err(err) => {
                    return Err(DbfError::ParseError(format!("Value {:?} cannot be encoded as {}: {}", s, encoding.name(), err)));
                }
            };
            // text wider than the field is truncated, not refused
            let n = ::std::cmp::min(bytes.len(), out.len());
            out[..n].copy_from_slice(&bytes[..n]);
            Ok(())
        },
        (DbfType::Date, &AttributeValue::Date(ref date)) => {
            let text = format!("{:04}{:02}{:02}", date.year, date.month, date.day);
            if text.len() != 8 || out.len() < 8 {
                return Err(too_wide(&text));
            }
            out[..8].copy_from_slice(text.as_bytes());
            Ok(())
        },
        (DbfType::Numeric, ref value) | (DbfType::Float, ref value) => {
            let text = match **value {
                AttributeValue::Integer(i) => {
                    if field.decimal_count == 0 {
                        format!("{}", i)
                    } else {
                        format!("{:.*}", field.decimal_count, i as f64)
                    }
                },
                AttributeValue::Real(x) => format!("{:.*}", field.decimal_count, x),
                // the read side's permissive fallback, carried back out
                AttributeValue::Text(ref s) => s.clone(),
                ref other => {
                    return Err(DbfError::ParseError(format!("Field {:?} is {:?}; cannot encode {:?} into it", field.name, field.data_type, other)));
                }
            };
            if text.len() > out.len() {
                return Err(too_wide(&text));
            }
            // numbers are right-justified within the field
            let at = out.len() - text.len();
            out[at..].copy_from_slice(text.as_bytes());
            Ok(())
        },
        (_, other) => {
            Err(DbfError::ParseError(format!("Field {:?} is {:?}; cannot encode {:?} into it", field.name, field.data_type, other)))
        },
    }
}

/// Writes an xBase ".dbf" file.
///
/// The header's record count, header length and record length are all
/// derived from the fields and rows handed to `write_all`; caller-supplied
/// offsets are recomputed, never trusted.
pub struct DbfWriter<W: io::Write> {
    file: W,
    encoding: encoding::EncodingRef,
}

impl<W: io::Write> DbfWriter<W> {
    pub fn new(file: W, encoding: encoding::EncodingRef) -> DbfWriter<W> {
        DbfWriter { file: file, encoding: encoding }
    }

    pub fn write_all(&mut self, fields: &[DbfField], rows: &[Box<[AttributeValue]>]) -> Result<(), DbfError> {
        let n_header_bytes = DBF_HEADER_LENGTH + DBF_FIELD_DESCRIPTOR_LENGTH * fields.len() + 1;
        let mut n_bytes_per_record = 1; // deleted flag
        let mut offsets = Vec::with_capacity(fields.len());
        for field in fields.iter() {
            if field.len == 0 || field.len > DBF_MAX_FIELD_LENGTH {
                return Err(DbfError::ParseError(format!("Field {:?} has width {}; a field is 1-{} bytes wide", field.name, field.len, DBF_MAX_FIELD_LENGTH)));
            }
            offsets.push(n_bytes_per_record);
            n_bytes_per_record += field.len;
        }
        if n_bytes_per_record > u16::max_value() as usize {
            return Err(DbfError::ParseError(format!("The field lengths sum to {} bytes per record; the format caps records at {} bytes", n_bytes_per_record, u16::max_value())));
        }

        let mut header = vec![ 0u8; n_header_bytes ];
        header[0] = DBF_VERSION;
        // last-update date; nothing in this library consumes it
        header[1] = 95;
        header[2] = 7;
        header[3] = 26;
        LittleEndian::write_u32(&mut header[4..8], rows.len() as u32);
        LittleEndian::write_u16(&mut header[8..10], n_header_bytes as u16);
        LittleEndian::write_u16(&mut header[10..12], n_bytes_per_record as u16);

        for (i, field) in fields.iter().enumerate() {
            let descriptor = &mut header[DBF_HEADER_LENGTH + DBF_FIELD_DESCRIPTOR_LENGTH * i ..
                                         DBF_HEADER_LENGTH + DBF_FIELD_DESCRIPTOR_LENGTH * (i + 1)];
            let name_bytes = field.name.as_bytes();
            if name_bytes.len() > DBF_MAX_FIELD_NAME_LENGTH {
                return Err(DbfError::ParseError(format!("Field name {:?} is {} bytes long; the format caps names at {} bytes", field.name, name_bytes.len(), DBF_MAX_FIELD_NAME_LENGTH)));
            }
            for b in descriptor[..11].iter_mut() { *b = b' '; }
            descriptor[..name_bytes.len()].copy_from_slice(name_bytes);
            descriptor[11] = field.data_type.as_u8();
            descriptor[16] = field.len as u8;
            descriptor[17] = field.decimal_count as u8;
        }
        header[n_header_bytes - 1] = DBF_HEADER_TERMINATOR;

        self.file.write_all(&header).map_err(DbfError::IOError)?;

        let mut record = vec![ 0u8; n_bytes_per_record ];
        for (row_number, row) in rows.iter().enumerate() {
            if row.len() != fields.len() {
                return Err(DbfError::ParseError(format!("Row {} has {} values, but the table has {} fields", row_number, row.len(), fields.len())));
            }
            for b in record.iter_mut() { *b = b' '; }
            for ((field, &offset), value) in fields.iter().zip(offsets.iter()).zip(row.iter()) {
                encode_field(value, field, self.encoding, &mut record[offset .. offset + field.len])?;
            }
            self.file.write_all(&record).map_err(DbfError::IOError)?;
        }

        self.file.write_all(&[ DBF_EOF ]).map_err(DbfError::IOError)?;
        self.file.flush().map_err(DbfError::IOError)
    }
}

/// Opens an xBase ".dbf" file from the filesystem.
pub fn open(path: &Path, encoding: encoding::EncodingRef) -> Result<DbfReader<io::BufReader<fs::File>>, DbfError> {
    match fs::File::open(path) {
        Err(err) => { Err(DbfError::IOError(err)) },
        Ok(f) => {
            let r = io::BufReader::new(f);
            DbfReader::new(r, encoding)
        }
    }
}

/// Creates an xBase ".dbf" file for writing.
pub fn create(path: &Path, encoding: encoding::EncodingRef) -> Result<DbfWriter<io::BufWriter<fs::File>>, DbfError> {
    match fs::File::create(path) {
        Err(err) => Err(DbfError::IOError(err)),
        Ok(f) => Ok(DbfWriter::new(io::BufWriter::new(f), encoding)),
    }
}
