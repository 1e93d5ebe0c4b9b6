//! Purpose: Serialise frames to and from the self-describing token stream.
//! Exports: `serialize`, `deserialize`.
//! Role: The uncompressed wire grammar; compression and envelopes live above.
//! Invariants: The stream is ASCII tokens: a `{v:1;...}` header followed by
//! Invariants: column-major cells, each terminated by `,`. Text cells escape
//! Invariants: `<` as `<<>` and `,` as `<,>`; the decoder is single-pass.
//! Invariants: Encoder buffer growth doubles and saturates near 2^30.
use std::str::FromStr;

use crate::core::column::{Cell, Column, ElementKind, Flavour};
use crate::core::error::{Error, ErrorKind};
use crate::core::frame::Frame;

const VERSION_BYTE: u8 = b'1';
const INITIAL_CAPACITY: usize = 2048;
// Once a doubling reaches this bound the buffer jumps straight to
// MAX_BUFFER; anything larger fails instead of overflowing.
const DOUBLING_LIMIT: usize = 1 << 30;
const MAX_BUFFER: usize = i32::MAX as usize;

/// Serialises a frame into the uncompressed token stream.
pub fn serialize(frame: &Frame) -> Result<Vec<u8>, Error> {
    let mut buf = TokenBuffer::new();
    buf.push_str("{v:1;i:")?;
    buf.push_str(frame.flavour().token())?;
    buf.push_byte(b';')?;
    buf.push_str(&format!("r:{};", frame.rows()))?;
    buf.push_str(&format!("c:{};", frame.column_count()))?;
    buf.push_str("n:")?;
    if let Some(names) = frame.get_column_names() {
        for name in names {
            buf.push_str(&escape(&name))?;
            buf.push_byte(b',')?;
        }
    }
    buf.push_str(";t:")?;
    for column in frame.columns() {
        buf.push_str(column.kind().token(column.flavour()))?;
        buf.push_byte(b',')?;
    }
    buf.push_str(";}")?;

    for column in frame.columns() {
        let escaped = column.kind().is_text();
        for row in 0..frame.rows() {
            match column.value_at(row) {
                Cell::Null => buf.push_str("null")?,
                cell if escaped => buf.push_str(&escape(&cell.to_string()))?,
                cell => buf.push_str(&cell.to_string())?,
            }
            buf.push_byte(b',')?;
        }
    }
    Ok(buf.into_bytes())
}

/// Deserialises a token stream produced by [`serialize`].
pub fn deserialize(bytes: &[u8]) -> Result<Frame, Error> {
    if bytes.len() <= 3 {
        return Err(Error::new(ErrorKind::Format).with_message("truncated stream"));
    }
    if bytes[3] != VERSION_BYTE {
        return Err(Error::new(ErrorKind::Encoding)
            .with_message(format!("unsupported format version: {}", bytes[3] as char)));
    }
    let mut reader = TokenReader::new(bytes);
    reader.expect(b"{v:1;i:")?;
    let flavour = Flavour::from_token(reader.read_until(b';')?).ok_or_else(|| {
        Error::new(ErrorKind::Format).with_message("unsupported frame flavour")
    })?;
    reader.expect(b"r:")?;
    let rows: usize = parse_token(reader.read_until(b';')?)?;
    reader.expect(b"c:")?;
    let cols: usize = parse_token(reader.read_until(b';')?)?;
    // Every kind token and every cell occupies at least two bytes, so a
    // header declaring more content than the stream carries is rejected
    // before any allocation sized from it.
    let remaining = reader.remaining();
    if cols.saturating_mul(2) > remaining
        || rows.saturating_mul(cols).saturating_mul(2) > remaining
    {
        return Err(Error::new(ErrorKind::Format)
            .with_message("stream shorter than its declared size"));
    }
    reader.expect(b"n:")?;
    let names = if reader.peek() != Some(b';') {
        let mut names = Vec::with_capacity(cols);
        for _ in 0..cols {
            names.push(unescape(reader.read_text_raw()?));
        }
        Some(names)
    } else {
        None
    };
    reader.expect(b";t:")?;
    let mut kinds = Vec::with_capacity(cols);
    for _ in 0..cols {
        let token = reader.read_plain()?;
        let (kind_flavour, kind) = ElementKind::from_token(token).ok_or_else(|| {
            Error::new(ErrorKind::Format).with_message(format!("unknown column kind: {token}"))
        })?;
        if kind_flavour != flavour {
            return Err(Error::new(ErrorKind::Format).with_message(format!(
                "column kind {token} does not belong to a {} frame",
                flavour.token()
            )));
        }
        kinds.push(kind);
    }
    reader.expect(b";}")?;

    let mut columns = Vec::with_capacity(cols);
    for kind in kinds {
        columns.push(match flavour {
            Flavour::Default => read_dense_column(&mut reader, kind, rows)?,
            Flavour::Nullable => read_nullable_column(&mut reader, kind, rows)?,
        });
    }

    if columns.is_empty() {
        return Ok(Frame::new(flavour));
    }
    let frame = match names {
        Some(names) => Frame::with_named_columns(flavour, names, columns),
        None => Frame::with_columns(flavour, columns),
    };
    frame.map_err(|err| {
        Error::new(ErrorKind::Format)
            .with_message("invalid column layout")
            .with_source(err)
    })
}

fn read_dense_column(
    reader: &mut TokenReader<'_>,
    kind: ElementKind,
    rows: usize,
) -> Result<Column, Error> {
    Ok(match kind {
        ElementKind::I8 => Column::from(read_parsed::<i8>(reader, rows)?),
        ElementKind::I16 => Column::from(read_parsed::<i16>(reader, rows)?),
        ElementKind::I32 => Column::from(read_parsed::<i32>(reader, rows)?),
        ElementKind::I64 => Column::from(read_parsed::<i64>(reader, rows)?),
        ElementKind::F32 => Column::from(read_parsed::<f32>(reader, rows)?),
        ElementKind::F64 => Column::from(read_parsed::<f64>(reader, rows)?),
        ElementKind::Bool => Column::from(read_parsed::<bool>(reader, rows)?),
        ElementKind::Char => {
            let mut values = Vec::with_capacity(rows);
            for _ in 0..rows {
                values.push(char_cell(&unescape(reader.read_text_raw()?))?);
            }
            Column::from(values)
        }
        ElementKind::Str => {
            let mut values = Vec::with_capacity(rows);
            for _ in 0..rows {
                values.push(unescape(reader.read_text_raw()?));
            }
            Column::from(values)
        }
    })
}

fn read_nullable_column(
    reader: &mut TokenReader<'_>,
    kind: ElementKind,
    rows: usize,
) -> Result<Column, Error> {
    Ok(match kind {
        ElementKind::I8 => Column::from(read_parsed_nullable::<i8>(reader, rows)?),
        ElementKind::I16 => Column::from(read_parsed_nullable::<i16>(reader, rows)?),
        ElementKind::I32 => Column::from(read_parsed_nullable::<i32>(reader, rows)?),
        ElementKind::I64 => Column::from(read_parsed_nullable::<i64>(reader, rows)?),
        ElementKind::F32 => Column::from(read_parsed_nullable::<f32>(reader, rows)?),
        ElementKind::F64 => Column::from(read_parsed_nullable::<f64>(reader, rows)?),
        ElementKind::Bool => Column::from(read_parsed_nullable::<bool>(reader, rows)?),
        ElementKind::Char => {
            let mut values = Vec::with_capacity(rows);
            for _ in 0..rows {
                let raw = reader.read_text_raw()?;
                values.push(if raw == "null" {
                    None
                } else {
                    Some(char_cell(&unescape(raw))?)
                });
            }
            Column::from(values)
        }
        ElementKind::Str => {
            let mut values = Vec::with_capacity(rows);
            for _ in 0..rows {
                let text = unescape(reader.read_text_raw()?);
                values.push(if text == "null" { None } else { Some(text) });
            }
            Column::from(values)
        }
    })
}

fn read_parsed<T: FromStr>(reader: &mut TokenReader<'_>, rows: usize) -> Result<Vec<T>, Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let mut values = Vec::with_capacity(rows);
    for _ in 0..rows {
        values.push(parse_token(reader.read_plain()?)?);
    }
    Ok(values)
}

fn read_parsed_nullable<T: FromStr>(
    reader: &mut TokenReader<'_>,
    rows: usize,
) -> Result<Vec<Option<T>>, Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let mut values = Vec::with_capacity(rows);
    for _ in 0..rows {
        let token = reader.read_plain()?;
        values.push(if token == "null" {
            None
        } else {
            Some(parse_token(token)?)
        });
    }
    Ok(values)
}

fn parse_token<T: FromStr>(token: &str) -> Result<T, Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    token.parse().map_err(|err| {
        Error::new(ErrorKind::Format)
            .with_message(format!("invalid cell token: {token}"))
            .with_source(err)
    })
}

fn char_cell(text: &str) -> Result<char, Error> {
    text.chars()
        .next()
        .ok_or_else(|| Error::new(ErrorKind::Format).with_message("empty character cell"))
}

fn escape(text: &str) -> String {
    text.replace('<', "<<>").replace(',', "<,>")
}

fn unescape(text: &str) -> String {
    text.replace("<,>", ",").replace("<<>", "<")
}

// Growable emission buffer. Doubles like the column storage does, but
// saturates at MAX_BUFFER once a doubling crosses DOUBLING_LIMIT.
struct TokenBuffer {
    bytes: Vec<u8>,
    len: usize,
}

impl TokenBuffer {
    fn new() -> Self {
        Self {
            bytes: vec![0; INITIAL_CAPACITY],
            len: 0,
        }
    }

    fn push_str(&mut self, text: &str) -> Result<(), Error> {
        self.push_bytes(text.as_bytes())
    }

    fn push_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.reserve(self.len + 1)?;
        self.bytes[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.reserve(self.len + bytes.len())?;
        self.bytes[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    fn reserve(&mut self, min: usize) -> Result<(), Error> {
        if min <= self.bytes.len() {
            return Ok(());
        }
        if min > MAX_BUFFER {
            return Err(Error::new(ErrorKind::Unsupported)
                .with_message("frame exceeds the encoder's addressable buffer"));
        }
        let mut capacity = self.bytes.len();
        while capacity < min {
            capacity *= 2;
            if capacity >= DOUBLING_LIMIT {
                capacity = MAX_BUFFER;
            }
        }
        self.bytes.resize(capacity, 0);
        Ok(())
    }

    fn into_bytes(mut self) -> Vec<u8> {
        self.bytes.truncate(self.len);
        self.bytes
    }
}

// Single-pass, left-to-right token scanner over the byte stream.
struct TokenReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> TokenReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn next_byte(&mut self) -> Result<u8, Error> {
        let byte = self
            .peek()
            .ok_or_else(|| Error::new(ErrorKind::Format).with_message("unexpected end of stream"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn expect(&mut self, literal: &[u8]) -> Result<(), Error> {
        let end = self.pos + literal.len();
        if self.bytes.len() < end || &self.bytes[self.pos..end] != literal {
            return Err(Error::new(ErrorKind::Format).with_message(format!(
                "malformed header near offset {}",
                self.pos
            )));
        }
        self.pos = end;
        Ok(())
    }

    fn read_until(&mut self, terminator: u8) -> Result<&'a str, Error> {
        let start = self.pos;
        loop {
            if self.next_byte()? == terminator {
                return token_utf8(&self.bytes[start..self.pos - 1]);
            }
        }
    }

    // Reads a plain cell token up to its `,` terminator.
    fn read_plain(&mut self) -> Result<&'a str, Error> {
        self.read_until(b',')
    }

    // Reads an escaped text token. A `,` terminates unless it sits
    // between `<` and `>`, which marks it as part of the `<,>` escape.
    fn read_text_raw(&mut self) -> Result<&'a str, Error> {
        let start = self.pos;
        loop {
            if self.next_byte()? == b',' {
                let before = self.bytes.get(self.pos.wrapping_sub(2)).copied();
                let after = self.bytes.get(self.pos).copied();
                if before == Some(b'<') && after == Some(b'>') {
                    continue;
                }
                return token_utf8(&self.bytes[start..self.pos - 1]);
            }
        }
    }
}

fn token_utf8(token: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(token).map_err(|err| {
        Error::new(ErrorKind::Format)
            .with_message("token is not valid utf-8")
            .with_source(err)
    })
}
