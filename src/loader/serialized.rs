//! Java object serialization streams (`.bgw` saves).
//!
//! The simulation writes its world with `ObjectOutputStream`. This module
//! decodes such a stream into a [`serde_json::Value`] tree shaped like the
//! JSON saves, so both formats share one mapping onto save records:
//!
//! - objects become maps of their field values, superclass fields first
//! - `java.util` lists become arrays of the objects written after their
//!   fields
//! - boxed `java.lang` values unwrap to their `value` field
//! - strings, enums and class literals become strings
//!
//! A reference back to an object that is still being converted (a cycle)
//! becomes `null`. Shared references are converted once per occurrence.

use std::collections::HashSet;
use std::io::{self, Read};

use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::debug;

const STREAM_MAGIC: u16 = 0xACED;
const STREAM_VERSION: u16 = 5;
const BASE_WIRE_HANDLE: u32 = 0x7E_0000;

const TC_NULL: u8 = 0x70;
const TC_REFERENCE: u8 = 0x71;
const TC_CLASSDESC: u8 = 0x72;
const TC_OBJECT: u8 = 0x73;
const TC_STRING: u8 = 0x74;
const TC_ARRAY: u8 = 0x75;
const TC_CLASS: u8 = 0x76;
const TC_BLOCKDATA: u8 = 0x77;
const TC_ENDBLOCKDATA: u8 = 0x78;
const TC_RESET: u8 = 0x79;
const TC_BLOCKDATALONG: u8 = 0x7A;
const TC_EXCEPTION: u8 = 0x7B;
const TC_LONGSTRING: u8 = 0x7C;
const TC_PROXYCLASSDESC: u8 = 0x7D;
const TC_ENUM: u8 = 0x7E;

pub(crate) const SC_WRITE_METHOD: u8 = 0x01;
pub(crate) const SC_SERIALIZABLE: u8 = 0x02;
const SC_EXTERNALIZABLE: u8 = 0x04;
const SC_BLOCK_DATA: u8 = 0x08;

/// Collections whose elements follow their fields as written objects.
const LIST_CLASSES: [&str; 3] = ["java.util.ArrayList", "java.util.LinkedList", "java.util.ArrayDeque"];

/// Failure to decode an object stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("not a Java object stream (magic {0:#06x})")]
    BadMagic(u16),

    #[error("unsupported stream version {0}")]
    BadVersion(u16),

    #[error("unexpected type code {0:#04x}")]
    UnexpectedTypeCode(u8),

    #[error("reference to unknown handle {0:#x}")]
    UnknownHandle(u32),

    #[error("invalid field type {0:?}")]
    InvalidFieldType(char),

    #[error("malformed modified UTF-8 string")]
    InvalidString,

    #[error("unsupported stream content: {0}")]
    Unsupported(&'static str),

    #[error("the stream holds a serialized exception")]
    Exception,
}

type StreamResult<T> = std::result::Result<T, StreamError>;

// ============================================================================
// Stream entries
// ============================================================================

/// A field or array element as read from the stream.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Char(u16),
    /// An entry of the arena.
    Entry(usize),
}

#[derive(Debug)]
struct ClassDesc {
    name: String,
    flags: u8,
    fields: Vec<(char, String)>,
    superclass: Option<usize>,
}

#[derive(Debug)]
enum Entry {
    /// Handle assigned, content still being read.
    Pending,
    ClassDesc(ClassDesc),
    String(String),
    Object {
        class: usize,
        fields: Vec<(String, Field)>,
        /// Objects written by the class's own `writeObject`.
        annotations: Vec<Field>,
    },
    Array(Vec<Field>),
    Enum(String),
    Class(String),
}

// ============================================================================
// Reader
// ============================================================================

struct StreamReader<R> {
    input: R,
    /// Every entry ever read; survives stream resets.
    entries: Vec<Entry>,
    /// Wire handle offset to entry index.
    handles: Vec<usize>,
}

impl<R: Read> StreamReader<R> {
    fn new(input: R) -> Self {
        Self {
            input,
            entries: Vec::new(),
            handles: Vec::new(),
        }
    }

    fn bytes<const N: usize>(&mut self) -> StreamResult<[u8; N]> {
        let mut buf = [0; N];
        self.input.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn u8(&mut self) -> StreamResult<u8> {
        Ok(self.bytes::<1>()?[0])
    }

    fn u16(&mut self) -> StreamResult<u16> {
        Ok(u16::from_be_bytes(self.bytes()?))
    }

    fn i32(&mut self) -> StreamResult<i32> {
        Ok(i32::from_be_bytes(self.bytes()?))
    }

    fn i64(&mut self) -> StreamResult<i64> {
        Ok(i64::from_be_bytes(self.bytes()?))
    }

    fn skip(&mut self, len: u64) -> StreamResult<()> {
        let skipped = io::copy(&mut (&mut self.input).take(len), &mut io::sink())?;
        if skipped < len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(())
    }

    fn utf(&mut self) -> StreamResult<String> {
        let len = self.u16()?;
        self.utf_of_len(u64::from(len))
    }

    fn utf_of_len(&mut self, len: u64) -> StreamResult<String> {
        let mut raw = Vec::new();
        (&mut self.input).take(len).read_to_end(&mut raw)?;
        if (raw.len() as u64) < len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        decode_modified_utf8(&raw)
    }

    fn new_handle(&mut self, entry: Entry) -> usize {
        let index = self.entries.len();
        self.entries.push(entry);
        self.handles.push(index);
        index
    }

    fn reference(&mut self) -> StreamResult<usize> {
        let handle = self.i32()? as u32;
        handle
            .checked_sub(BASE_WIRE_HANDLE)
            .and_then(|offset| self.handles.get(offset as usize).copied())
            .ok_or(StreamError::UnknownHandle(handle))
    }

    /// Read the stream header and the first object.
    fn read_root(&mut self) -> StreamResult<Field> {
        let magic = self.u16()?;
        if magic != STREAM_MAGIC {
            return Err(StreamError::BadMagic(magic));
        }
        let version = self.u16()?;
        if version != STREAM_VERSION {
            return Err(StreamError::BadVersion(version));
        }

        loop {
            match self.u8()? {
                TC_BLOCKDATA => {
                    let len = self.u8()?;
                    self.skip(u64::from(len))?;
                }
                TC_BLOCKDATALONG => {
                    let len = self.block_len()?;
                    self.skip(len)?;
                }
                code => return self.object_with(code),
            }
        }
    }

    fn block_len(&mut self) -> StreamResult<u64> {
        u64::try_from(self.i32()?).map_err(|_| StreamError::Unsupported("negative block length"))
    }

    fn object(&mut self) -> StreamResult<Field> {
        let code = self.u8()?;
        self.object_with(code)
    }

    fn object_with(&mut self, code: u8) -> StreamResult<Field> {
        let index = match code {
            TC_NULL => return Ok(Field::Null),
            TC_RESET => {
                self.handles.clear();
                return self.object();
            }
            TC_EXCEPTION => return Err(StreamError::Exception),
            TC_REFERENCE => self.reference()?,
            TC_CLASSDESC => self.class_desc_body()?,
            TC_PROXYCLASSDESC => self.proxy_class_desc_body()?,
            TC_OBJECT => self.new_object()?,
            TC_STRING => {
                let text = self.utf()?;
                self.new_handle(Entry::String(text))
            }
            TC_LONGSTRING => {
                let len = u64::try_from(self.i64()?)
                    .map_err(|_| StreamError::Unsupported("negative string length"))?;
                let text = self.utf_of_len(len)?;
                self.new_handle(Entry::String(text))
            }
            TC_ARRAY => self.new_array()?,
            TC_CLASS => {
                let class = self.required_class()?;
                let name = self.class(class)?.name.clone();
                self.new_handle(Entry::Class(name))
            }
            TC_ENUM => self.new_enum()?,
            other => return Err(StreamError::UnexpectedTypeCode(other)),
        };
        Ok(Field::Entry(index))
    }

    /// Objects up to the end of a block-data annotation. Raw block data is
    /// skipped.
    fn annotation(&mut self) -> StreamResult<Vec<Field>> {
        let mut objects = Vec::new();
        loop {
            match self.u8()? {
                TC_ENDBLOCKDATA => return Ok(objects),
                TC_BLOCKDATA => {
                    let len = self.u8()?;
                    self.skip(u64::from(len))?;
                }
                TC_BLOCKDATALONG => {
                    let len = self.block_len()?;
                    self.skip(len)?;
                }
                code => objects.push(self.object_with(code)?),
            }
        }
    }

    // ========================================================================
    // Class descriptors
    // ========================================================================

    fn class_desc(&mut self) -> StreamResult<Option<usize>> {
        match self.u8()? {
            TC_NULL => Ok(None),
            TC_CLASSDESC => self.class_desc_body().map(Some),
            TC_PROXYCLASSDESC => self.proxy_class_desc_body().map(Some),
            TC_REFERENCE => self.reference().map(Some),
            other => Err(StreamError::UnexpectedTypeCode(other)),
        }
    }

    fn required_class(&mut self) -> StreamResult<usize> {
        self.class_desc()?
            .ok_or(StreamError::Unsupported("missing class descriptor"))
    }

    fn class(&self, index: usize) -> StreamResult<&ClassDesc> {
        match &self.entries[index] {
            Entry::ClassDesc(desc) => Ok(desc),
            _ => Err(StreamError::Unsupported("expected a class descriptor")),
        }
    }

    fn class_desc_body(&mut self) -> StreamResult<usize> {
        let name = self.utf()?;
        let _serial_version_uid = self.i64()?;
        let index = self.new_handle(Entry::Pending);
        let flags = self.u8()?;

        let count = self.u16()?;
        let mut fields = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let code = char::from(self.u8()?);
            let field_name = self.utf()?;
            match code {
                'L' | '[' => {
                    self.object()?;
                }
                'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' => {}
                other => return Err(StreamError::InvalidFieldType(other)),
            }
            fields.push((code, field_name));
        }

        self.annotation()?;
        let superclass = self.class_desc()?;
        self.entries[index] = Entry::ClassDesc(ClassDesc {
            name,
            flags,
            fields,
            superclass,
        });
        Ok(index)
    }

    fn proxy_class_desc_body(&mut self) -> StreamResult<usize> {
        let index = self.new_handle(Entry::Pending);
        let count = self.i32()?;
        for _ in 0..count {
            self.utf()?;
        }
        self.annotation()?;
        let superclass = self.class_desc()?;
        self.entries[index] = Entry::ClassDesc(ClassDesc {
            name: "java.lang.reflect.Proxy".to_string(),
            flags: SC_SERIALIZABLE,
            fields: Vec::new(),
            superclass,
        });
        Ok(index)
    }

    /// `class` and its superclasses, topmost first.
    fn hierarchy(&self, class: usize) -> StreamResult<Vec<usize>> {
        let mut chain = vec![class];
        let mut current = self.class(class)?;
        while let Some(parent) = current.superclass {
            if chain.len() > self.entries.len() {
                return Err(StreamError::Unsupported("cyclic class hierarchy"));
            }
            chain.push(parent);
            current = self.class(parent)?;
        }
        chain.reverse();
        Ok(chain)
    }

    // ========================================================================
    // Instances
    // ========================================================================

    fn new_object(&mut self) -> StreamResult<usize> {
        let class = self.required_class()?;
        let index = self.new_handle(Entry::Pending);

        let mut fields = Vec::new();
        let mut annotations = Vec::new();
        for level in self.hierarchy(class)? {
            let (flags, layout) = {
                let desc = self.class(level)?;
                (desc.flags, desc.fields.clone())
            };

            if flags & SC_EXTERNALIZABLE != 0 {
                if flags & SC_BLOCK_DATA == 0 {
                    return Err(StreamError::Unsupported("externalizable data without block mode"));
                }
                annotations.extend(self.annotation()?);
            } else if flags & SC_SERIALIZABLE != 0 {
                for (code, name) in layout {
                    let value = self.value(code)?;
                    fields.push((name, value));
                }
                if flags & SC_WRITE_METHOD != 0 {
                    annotations.extend(self.annotation()?);
                }
            }
        }

        self.entries[index] = Entry::Object {
            class,
            fields,
            annotations,
        };
        Ok(index)
    }

    fn new_array(&mut self) -> StreamResult<usize> {
        let class = self.required_class()?;
        let element = self.class(class)?.name.chars().nth(1).unwrap_or('L');
        let index = self.new_handle(Entry::Pending);

        let len = usize::try_from(self.i32()?)
            .map_err(|_| StreamError::Unsupported("negative array length"))?;
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(self.value(element)?);
        }
        self.entries[index] = Entry::Array(items);
        Ok(index)
    }

    fn new_enum(&mut self) -> StreamResult<usize> {
        self.required_class()?;
        let index = self.new_handle(Entry::Pending);
        let constant = match self.object()? {
            Field::Entry(name) => match &self.entries[name] {
                Entry::String(text) => text.clone(),
                _ => return Err(StreamError::Unsupported("enum constant is not a string")),
            },
            _ => return Err(StreamError::Unsupported("enum constant is not a string")),
        };
        self.entries[index] = Entry::Enum(constant);
        Ok(index)
    }

    fn value(&mut self, code: char) -> StreamResult<Field> {
        Ok(match code {
            'B' => Field::Integer(i64::from(self.u8()? as i8)),
            'C' => Field::Char(self.u16()?),
            'D' => Field::Float(f64::from_be_bytes(self.bytes()?)),
            'F' => Field::Float(f64::from(f32::from_be_bytes(self.bytes()?))),
            'I' => Field::Integer(i64::from(self.i32()?)),
            'J' => Field::Integer(self.i64()?),
            'S' => Field::Integer(i64::from(i16::from_be_bytes(self.bytes()?))),
            'Z' => Field::Bool(self.u8()? != 0),
            'L' | '[' => self.object()?,
            other => return Err(StreamError::InvalidFieldType(other)),
        })
    }
}

/// Java's modified UTF-8: at most three bytes per UTF-16 unit, surrogates
/// encoded separately, NUL as two bytes.
fn decode_modified_utf8(raw: &[u8]) -> StreamResult<String> {
    let continuation = |byte: Option<&u8>| match byte {
        Some(&b) if b & 0xC0 == 0x80 => Ok(u16::from(b & 0x3F)),
        _ => Err(StreamError::InvalidString),
    };

    let mut units = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter();
    while let Some(&b) = bytes.next() {
        let unit = if b & 0x80 == 0 {
            u16::from(b)
        } else if b & 0xE0 == 0xC0 {
            (u16::from(b & 0x1F) << 6) | continuation(bytes.next())?
        } else if b & 0xF0 == 0xE0 {
            let high = continuation(bytes.next())?;
            let low = continuation(bytes.next())?;
            (u16::from(b & 0x0F) << 12) | (high << 6) | low
        } else {
            return Err(StreamError::InvalidString);
        };
        units.push(unit);
    }

    Ok(char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}

// ============================================================================
// Conversion
// ============================================================================

struct Flattener<'a> {
    entries: &'a [Entry],
    /// Entries being converted, outermost first.
    path: HashSet<usize>,
}

impl Flattener<'_> {
    fn field(&mut self, field: Field) -> Value {
        match field {
            Field::Null => Value::Null,
            Field::Bool(flag) => Value::Bool(flag),
            Field::Integer(n) => Value::from(n),
            Field::Float(x) => Number::from_f64(x).map_or(Value::Null, Value::Number),
            Field::Char(unit) => Value::String(
                char::from_u32(u32::from(unit))
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
                    .to_string(),
            ),
            Field::Entry(index) => self.entry(index),
        }
    }

    fn entry(&mut self, index: usize) -> Value {
        if !self.path.insert(index) {
            return Value::Null;
        }
        let entries = self.entries;
        let value = match &entries[index] {
            Entry::Pending => Value::Null,
            Entry::ClassDesc(desc) => Value::String(desc.name.clone()),
            Entry::String(text) | Entry::Enum(text) | Entry::Class(text) => Value::String(text.clone()),
            Entry::Array(items) => Value::Array(items.iter().map(|&item| self.field(item)).collect()),
            Entry::Object {
                class,
                fields,
                annotations,
            } => {
                let name = match &entries[*class] {
                    Entry::ClassDesc(desc) => desc.name.as_str(),
                    _ => "",
                };
                let boxed = name
                    .strip_prefix("java.lang.")
                    .and_then(|_| fields.iter().find(|(field, _)| field == "value"));

                if LIST_CLASSES.contains(&name) {
                    Value::Array(annotations.iter().map(|&item| self.field(item)).collect())
                } else if let Some(&(_, value)) = boxed {
                    self.field(value)
                } else {
                    let mut map = Map::new();
                    for (field, value) in fields {
                        map.insert(field.clone(), self.field(*value));
                    }
                    Value::Object(map)
                }
            }
        };
        self.path.remove(&index);
        value
    }
}

/// Decode the first object of a serialization stream.
pub fn read_stream<R: Read>(input: R) -> std::result::Result<Value, StreamError> {
    let mut reader = StreamReader::new(input);
    let root = reader.read_root()?;
    debug!(entries = reader.entries.len(), "decoded object stream");

    let mut flattener = Flattener {
        entries: &reader.entries,
        path: HashSet::new(),
    };
    Ok(flattener.field(root))
}
