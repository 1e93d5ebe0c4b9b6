//! Purpose: Typed column storage, one dense and one nullable flavour per element kind.
//! Exports: `ElementKind`, `Flavour`, `Cell`, `Column`, `NA_TEXT`.
//! Role: Resizable 1-D vectors underpinning frames; structural edits shift in place.
//! Invariants: Dense string columns never hold an empty string; every write path
//! Invariants: coerces null/empty text to `NA_TEXT`. Growth is amortised doubling
//! Invariants: (0 -> 2); shrinking happens only through `match_length`.
use std::fmt;

use crate::core::error::{Error, ErrorKind};

/// Placeholder stored in dense string columns for null or empty input.
pub const NA_TEXT: &str = "n/a";

/// Whether a column or frame admits missing values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flavour {
    Default,
    Nullable,
}

impl Flavour {
    pub(crate) fn token(self) -> &'static str {
        match self {
            Flavour::Default => "default",
            Flavour::Nullable => "nullable",
        }
    }

    pub(crate) fn from_token(token: &str) -> Option<Flavour> {
        match token {
            "default" => Some(Flavour::Default),
            "nullable" => Some(Flavour::Nullable),
            _ => None,
        }
    }
}

/// The element type of a column.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ElementKind {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    Char,
    Str,
}

impl ElementKind {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ElementKind::I8
                | ElementKind::I16
                | ElementKind::I32
                | ElementKind::I64
                | ElementKind::F32
                | ElementKind::F64
        )
    }

    /// Whether cells of this kind carry escaped text on the wire.
    pub(crate) fn is_text(self) -> bool {
        matches!(self, ElementKind::Char | ElementKind::Str)
    }

    /// The column-kind token used by the binary grammar.
    pub(crate) fn token(self, flavour: Flavour) -> &'static str {
        match (flavour, self) {
            (Flavour::Default, ElementKind::I8) => "ByteColumn",
            (Flavour::Default, ElementKind::I16) => "ShortColumn",
            (Flavour::Default, ElementKind::I32) => "IntColumn",
            (Flavour::Default, ElementKind::I64) => "LongColumn",
            (Flavour::Default, ElementKind::F32) => "FloatColumn",
            (Flavour::Default, ElementKind::F64) => "DoubleColumn",
            (Flavour::Default, ElementKind::Bool) => "BooleanColumn",
            (Flavour::Default, ElementKind::Char) => "CharColumn",
            (Flavour::Default, ElementKind::Str) => "StringColumn",
            (Flavour::Nullable, ElementKind::I8) => "NullableByteColumn",
            (Flavour::Nullable, ElementKind::I16) => "NullableShortColumn",
            (Flavour::Nullable, ElementKind::I32) => "NullableIntColumn",
            (Flavour::Nullable, ElementKind::I64) => "NullableLongColumn",
            (Flavour::Nullable, ElementKind::F32) => "NullableFloatColumn",
            (Flavour::Nullable, ElementKind::F64) => "NullableDoubleColumn",
            (Flavour::Nullable, ElementKind::Bool) => "NullableBooleanColumn",
            (Flavour::Nullable, ElementKind::Char) => "NullableCharColumn",
            (Flavour::Nullable, ElementKind::Str) => "NullableStringColumn",
        }
    }

    pub(crate) fn from_token(token: &str) -> Option<(Flavour, ElementKind)> {
        let (flavour, stem) = match token.strip_prefix("Nullable") {
            Some(stem) => (Flavour::Nullable, stem),
            None => (Flavour::Default, token),
        };
        let kind = match stem {
            "ByteColumn" => ElementKind::I8,
            "ShortColumn" => ElementKind::I16,
            "IntColumn" => ElementKind::I32,
            "LongColumn" => ElementKind::I64,
            "FloatColumn" => ElementKind::F32,
            "DoubleColumn" => ElementKind::F64,
            "BooleanColumn" => ElementKind::Bool,
            "CharColumn" => ElementKind::Char,
            "StringColumn" => ElementKind::Str,
            _ => return None,
        };
        Some((flavour, kind))
    }
}

/// A single frame cell, used by the row-level API.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Char(char),
    Str(String),
}

impl Cell {
    /// The element kind this cell carries; `None` for a null cell.
    pub fn kind(&self) -> Option<ElementKind> {
        match self {
            Cell::Null => None,
            Cell::I8(_) => Some(ElementKind::I8),
            Cell::I16(_) => Some(ElementKind::I16),
            Cell::I32(_) => Some(ElementKind::I32),
            Cell::I64(_) => Some(ElementKind::I64),
            Cell::F32(_) => Some(ElementKind::F32),
            Cell::F64(_) => Some(ElementKind::F64),
            Cell::Bool(_) => Some(ElementKind::Bool),
            Cell::Char(_) => Some(ElementKind::Char),
            Cell::Str(_) => Some(ElementKind::Str),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Strict less-than on two cells of the same kind. Null never orders.
    pub(crate) fn lt(&self, other: &Cell) -> bool {
        match (self, other) {
            (Cell::I8(a), Cell::I8(b)) => a < b,
            (Cell::I16(a), Cell::I16(b)) => a < b,
            (Cell::I32(a), Cell::I32(b)) => a < b,
            (Cell::I64(a), Cell::I64(b)) => a < b,
            (Cell::F32(a), Cell::F32(b)) => a < b,
            (Cell::F64(a), Cell::F64(b)) => a < b,
            (Cell::Bool(a), Cell::Bool(b)) => a < b,
            (Cell::Char(a), Cell::Char(b)) => a < b,
            (Cell::Str(a), Cell::Str(b)) => a < b,
            _ => false,
        }
    }

    /// Strict greater-than counterpart of [`Cell::lt`].
    pub(crate) fn gt(&self, other: &Cell) -> bool {
        other.lt(self)
    }
}

/// Renders the cell the way the search and codec surfaces expect: `null`
/// for missing values and floats always carrying a decimal point.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("null"),
            Cell::I8(v) => write!(f, "{v}"),
            Cell::I16(v) => write!(f, "{v}"),
            Cell::I32(v) => write!(f, "{v}"),
            Cell::I64(v) => write!(f, "{v}"),
            Cell::F32(v) => f.write_str(&fmt_float(v.to_string())),
            Cell::F64(v) => f.write_str(&fmt_float(v.to_string())),
            Cell::Bool(v) => write!(f, "{v}"),
            Cell::Char(v) => write!(f, "{v}"),
            Cell::Str(v) => f.write_str(v),
        }
    }
}

// The wire grammar inherited `1.0`-style float tokens, so an integral
// float must not render as a bare integer.
fn fmt_float(mut rendered: String) -> String {
    if rendered
        .bytes()
        .all(|b| b.is_ascii_digit() || b == b'-')
    {
        rendered.push_str(".0");
    }
    rendered
}

#[derive(Clone, Debug)]
enum DenseData {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Char(Vec<char>),
    Str(Vec<String>),
}

#[derive(Clone, Debug)]
enum NullableData {
    I8(Vec<Option<i8>>),
    I16(Vec<Option<i16>>),
    I32(Vec<Option<i32>>),
    I64(Vec<Option<i64>>),
    F32(Vec<Option<f32>>),
    F64(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Char(Vec<Option<char>>),
    Str(Vec<Option<String>>),
}

#[derive(Clone, Debug)]
enum Repr {
    Dense(DenseData),
    Nullable(NullableData),
}

/// A typed, resizable column. The physical length (`capacity`) is managed
/// by the owning frame; slots past the frame's live row count hold vacant
/// filler and are never observable through the frame API.
#[derive(Clone, Debug)]
pub struct Column {
    repr: Repr,
}

/// Filler written into slots vacated by removal or created by growth.
trait Element: Clone {
    fn vacant() -> Self;
}

macro_rules! vacant_zero {
    ($($ty:ty => $value:expr),+ $(,)?) => {
        $(impl Element for $ty {
            fn vacant() -> Self {
                $value
            }
        })+
    };
}

vacant_zero! {
    i8 => 0,
    i16 => 0,
    i32 => 0,
    i64 => 0,
    f32 => 0.0,
    f64 => 0.0,
    bool => false,
    char => '\u{0}',
    String => NA_TEXT.to_string(),
}

impl<T: Clone> Element for Option<T> {
    fn vacant() -> Self {
        None
    }
}

fn grow_entries<T: Element>(entries: &mut Vec<T>) {
    let target = if entries.is_empty() {
        2
    } else {
        entries.len() * 2
    };
    entries.resize(target, T::vacant());
}

fn match_entries<T: Element>(entries: &mut Vec<T>, length: usize) {
    entries.resize(length, T::vacant());
}

// Opens a one-slot gap at `index` by shifting `[index, next)` right. The
// stale value left at `index` is overwritten by the caller.
fn open_gap<T>(entries: &mut [T], index: usize, next: usize) {
    debug_assert!(next < entries.len());
    entries[index..=next].rotate_right(1);
}

fn remove_entries<T: Element>(entries: &mut [T], from: usize, to: usize, next: usize) {
    let width = to - from;
    entries[from..next].rotate_left(width);
    for slot in &mut entries[next - width..next] {
        *slot = T::vacant();
    }
}

// Runs one generic expression against whichever entry vector the column
// holds; `$entries` binds to the `Vec` in every arm.
macro_rules! per_storage {
    ($repr:expr, $entries:ident => $body:expr) => {
        match $repr {
            Repr::Dense(DenseData::I8($entries)) => $body,
            Repr::Dense(DenseData::I16($entries)) => $body,
            Repr::Dense(DenseData::I32($entries)) => $body,
            Repr::Dense(DenseData::I64($entries)) => $body,
            Repr::Dense(DenseData::F32($entries)) => $body,
            Repr::Dense(DenseData::F64($entries)) => $body,
            Repr::Dense(DenseData::Bool($entries)) => $body,
            Repr::Dense(DenseData::Char($entries)) => $body,
            Repr::Dense(DenseData::Str($entries)) => $body,
            Repr::Nullable(NullableData::I8($entries)) => $body,
            Repr::Nullable(NullableData::I16($entries)) => $body,
            Repr::Nullable(NullableData::I32($entries)) => $body,
            Repr::Nullable(NullableData::I64($entries)) => $body,
            Repr::Nullable(NullableData::F32($entries)) => $body,
            Repr::Nullable(NullableData::F64($entries)) => $body,
            Repr::Nullable(NullableData::Bool($entries)) => $body,
            Repr::Nullable(NullableData::Char($entries)) => $body,
            Repr::Nullable(NullableData::Str($entries)) => $body,
        }
    };
}

macro_rules! per_nullable {
    ($data:expr, $entries:ident => $body:expr) => {
        match $data {
            NullableData::I8($entries) => $body,
            NullableData::I16($entries) => $body,
            NullableData::I32($entries) => $body,
            NullableData::I64($entries) => $body,
            NullableData::F32($entries) => $body,
            NullableData::F64($entries) => $body,
            NullableData::Bool($entries) => $body,
            NullableData::Char($entries) => $body,
            NullableData::Str($entries) => $body,
        }
    };
}

impl Column {
    /// An empty dense column of the given kind.
    pub fn dense(kind: ElementKind) -> Column {
        let data = match kind {
            ElementKind::I8 => DenseData::I8(Vec::new()),
            ElementKind::I16 => DenseData::I16(Vec::new()),
            ElementKind::I32 => DenseData::I32(Vec::new()),
            ElementKind::I64 => DenseData::I64(Vec::new()),
            ElementKind::F32 => DenseData::F32(Vec::new()),
            ElementKind::F64 => DenseData::F64(Vec::new()),
            ElementKind::Bool => DenseData::Bool(Vec::new()),
            ElementKind::Char => DenseData::Char(Vec::new()),
            ElementKind::Str => DenseData::Str(Vec::new()),
        };
        Column {
            repr: Repr::Dense(data),
        }
    }

    /// An empty nullable column of the given kind.
    pub fn nullable(kind: ElementKind) -> Column {
        let data = match kind {
            ElementKind::I8 => NullableData::I8(Vec::new()),
            ElementKind::I16 => NullableData::I16(Vec::new()),
            ElementKind::I32 => NullableData::I32(Vec::new()),
            ElementKind::I64 => NullableData::I64(Vec::new()),
            ElementKind::F32 => NullableData::F32(Vec::new()),
            ElementKind::F64 => NullableData::F64(Vec::new()),
            ElementKind::Bool => NullableData::Bool(Vec::new()),
            ElementKind::Char => NullableData::Char(Vec::new()),
            ElementKind::Str => NullableData::Str(Vec::new()),
        };
        Column {
            repr: Repr::Nullable(data),
        }
    }

    /// An empty column matching another column's flavour and kind.
    pub fn like(other: &Column) -> Column {
        match other.flavour() {
            Flavour::Default => Column::dense(other.kind()),
            Flavour::Nullable => Column::nullable(other.kind()),
        }
    }

    pub fn flavour(&self) -> Flavour {
        match &self.repr {
            Repr::Dense(_) => Flavour::Default,
            Repr::Nullable(_) => Flavour::Nullable,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match &self.repr {
            Repr::Dense(data) => match data {
                DenseData::I8(_) => ElementKind::I8,
                DenseData::I16(_) => ElementKind::I16,
                DenseData::I32(_) => ElementKind::I32,
                DenseData::I64(_) => ElementKind::I64,
                DenseData::F32(_) => ElementKind::F32,
                DenseData::F64(_) => ElementKind::F64,
                DenseData::Bool(_) => ElementKind::Bool,
                DenseData::Char(_) => ElementKind::Char,
                DenseData::Str(_) => ElementKind::Str,
            },
            Repr::Nullable(data) => match data {
                NullableData::I8(_) => ElementKind::I8,
                NullableData::I16(_) => ElementKind::I16,
                NullableData::I32(_) => ElementKind::I32,
                NullableData::I64(_) => ElementKind::I64,
                NullableData::F32(_) => ElementKind::F32,
                NullableData::F64(_) => ElementKind::F64,
                NullableData::Bool(_) => ElementKind::Bool,
                NullableData::Char(_) => ElementKind::Char,
                NullableData::Str(_) => ElementKind::Str,
            },
        }
    }

    /// The physical length of the backing vector.
    pub fn capacity(&self) -> usize {
        per_storage!(&self.repr, entries => entries.len())
    }

    /// Reads one slot as a [`Cell`].
    pub fn get(&self, index: usize) -> Result<Cell, Error> {
        self.check_bounds(index)?;
        Ok(self.value_at(index))
    }

    // Unchecked counterpart of `get` for internal loops whose indices
    // are already validated against the frame's live region.
    pub(crate) fn value_at(&self, index: usize) -> Cell {
        match &self.repr {
            Repr::Dense(DenseData::I8(v)) => Cell::I8(v[index]),
            Repr::Dense(DenseData::I16(v)) => Cell::I16(v[index]),
            Repr::Dense(DenseData::I32(v)) => Cell::I32(v[index]),
            Repr::Dense(DenseData::I64(v)) => Cell::I64(v[index]),
            Repr::Dense(DenseData::F32(v)) => Cell::F32(v[index]),
            Repr::Dense(DenseData::F64(v)) => Cell::F64(v[index]),
            Repr::Dense(DenseData::Bool(v)) => Cell::Bool(v[index]),
            Repr::Dense(DenseData::Char(v)) => Cell::Char(v[index]),
            Repr::Dense(DenseData::Str(v)) => Cell::Str(v[index].clone()),
            Repr::Nullable(NullableData::I8(v)) => v[index].map(Cell::I8).unwrap_or(Cell::Null),
            Repr::Nullable(NullableData::I16(v)) => v[index].map(Cell::I16).unwrap_or(Cell::Null),
            Repr::Nullable(NullableData::I32(v)) => v[index].map(Cell::I32).unwrap_or(Cell::Null),
            Repr::Nullable(NullableData::I64(v)) => v[index].map(Cell::I64).unwrap_or(Cell::Null),
            Repr::Nullable(NullableData::F32(v)) => v[index].map(Cell::F32).unwrap_or(Cell::Null),
            Repr::Nullable(NullableData::F64(v)) => v[index].map(Cell::F64).unwrap_or(Cell::Null),
            Repr::Nullable(NullableData::Bool(v)) => v[index].map(Cell::Bool).unwrap_or(Cell::Null),
            Repr::Nullable(NullableData::Char(v)) => v[index].map(Cell::Char).unwrap_or(Cell::Null),
            Repr::Nullable(NullableData::Str(v)) => {
                v[index].clone().map(Cell::Str).unwrap_or(Cell::Null)
            }
        }
    }

    /// Writes one slot. Null is accepted by nullable columns and by dense
    /// string columns (stored as [`NA_TEXT`]); every other combination of
    /// cell and storage kind is rejected.
    pub fn set(&mut self, index: usize, value: Cell) -> Result<(), Error> {
        self.check_bounds(index)?;
        let kind = self.kind();
        match (&mut self.repr, value) {
            (Repr::Dense(DenseData::Str(v)), Cell::Str(x)) => v[index] = coerce_text(x),
            (Repr::Dense(DenseData::Str(v)), Cell::Null) => v[index] = NA_TEXT.to_string(),
            (Repr::Dense(DenseData::I8(v)), Cell::I8(x)) => v[index] = x,
            (Repr::Dense(DenseData::I16(v)), Cell::I16(x)) => v[index] = x,
            (Repr::Dense(DenseData::I32(v)), Cell::I32(x)) => v[index] = x,
            (Repr::Dense(DenseData::I64(v)), Cell::I64(x)) => v[index] = x,
            (Repr::Dense(DenseData::F32(v)), Cell::F32(x)) => v[index] = x,
            (Repr::Dense(DenseData::F64(v)), Cell::F64(x)) => v[index] = x,
            (Repr::Dense(DenseData::Bool(v)), Cell::Bool(x)) => v[index] = x,
            (Repr::Dense(DenseData::Char(v)), Cell::Char(x)) => v[index] = x,
            (Repr::Dense(_), Cell::Null) => {
                return Err(Error::new(ErrorKind::Invalid)
                    .with_message("column does not permit null values"));
            }
            (Repr::Nullable(NullableData::Str(v)), Cell::Str(x)) => {
                v[index] = if x.is_empty() { None } else { Some(x) }
            }
            (Repr::Nullable(NullableData::I8(v)), Cell::I8(x)) => v[index] = Some(x),
            (Repr::Nullable(NullableData::I16(v)), Cell::I16(x)) => v[index] = Some(x),
            (Repr::Nullable(NullableData::I32(v)), Cell::I32(x)) => v[index] = Some(x),
            (Repr::Nullable(NullableData::I64(v)), Cell::I64(x)) => v[index] = Some(x),
            (Repr::Nullable(NullableData::F32(v)), Cell::F32(x)) => v[index] = Some(x),
            (Repr::Nullable(NullableData::F64(v)), Cell::F64(x)) => v[index] = Some(x),
            (Repr::Nullable(NullableData::Bool(v)), Cell::Bool(x)) => v[index] = Some(x),
            (Repr::Nullable(NullableData::Char(v)), Cell::Char(x)) => v[index] = Some(x),
            (Repr::Nullable(data), Cell::Null) => per_nullable!(data, v => v[index] = None),
            (_, value) => {
                return Err(Error::new(ErrorKind::Invalid).with_message(format!(
                    "cell kind mismatch: column holds {kind:?}, got {:?}",
                    value.kind()
                )));
            }
        }
        Ok(())
    }

    /// Shifts `[index, next)` one slot right and writes `value` at `index`.
    /// The caller guarantees `capacity() >= next + 1`.
    pub(crate) fn insert(&mut self, index: usize, next: usize, value: Cell) -> Result<(), Error> {
        per_storage!(&mut self.repr, entries => open_gap(entries, index, next));
        self.set(index, value)
    }

    /// Erases `[from, to)`, shifts `[to, next)` left and vacates the tail.
    pub(crate) fn remove(&mut self, from: usize, to: usize, next: usize) {
        per_storage!(&mut self.repr, entries => remove_entries(entries, from, to, next));
    }

    /// Doubles the backing vector; an empty column grows to two slots.
    pub(crate) fn grow(&mut self) {
        per_storage!(&mut self.repr, entries => grow_entries(entries));
    }

    /// Truncates or vacant-extends the backing vector to exactly `length`.
    pub(crate) fn match_length(&mut self, length: usize) {
        per_storage!(&mut self.repr, entries => match_entries(entries, length));
    }

    fn check_bounds(&self, index: usize) -> Result<(), Error> {
        if index >= self.capacity() {
            return Err(Error::new(ErrorKind::Bounds)
                .with_message(format!("column index {index} out of range")));
        }
        Ok(())
    }
}

fn coerce_text(value: String) -> String {
    if value.is_empty() {
        NA_TEXT.to_string()
    } else {
        value
    }
}

macro_rules! column_from_values {
    ($($ty:ty => $dense:ident),+ $(,)?) => {
        $(
            impl From<Vec<$ty>> for Column {
                fn from(values: Vec<$ty>) -> Column {
                    Column {
                        repr: Repr::Dense(DenseData::$dense(values)),
                    }
                }
            }

            impl From<Vec<Option<$ty>>> for Column {
                fn from(values: Vec<Option<$ty>>) -> Column {
                    Column {
                        repr: Repr::Nullable(NullableData::$dense(values)),
                    }
                }
            }
        )+
    };
}

column_from_values! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    char => Char,
}

impl From<Vec<String>> for Column {
    fn from(values: Vec<String>) -> Column {
        let coerced = values.into_iter().map(coerce_text).collect();
        Column {
            repr: Repr::Dense(DenseData::Str(coerced)),
        }
    }
}

impl<'a> From<Vec<&'a str>> for Column {
    fn from(values: Vec<&'a str>) -> Column {
        values
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
            .into()
    }
}

impl From<Vec<Option<String>>> for Column {
    fn from(values: Vec<Option<String>>) -> Column {
        let normalised = values
            .into_iter()
            .map(|value| value.filter(|text| !text.is_empty()))
            .collect();
        Column {
            repr: Repr::Nullable(NullableData::Str(normalised)),
        }
    }
}

impl<'a> From<Vec<Option<&'a str>>> for Column {
    fn from(values: Vec<Option<&'a str>>) -> Column {
        values
            .into_iter()
            .map(|value| value.map(str::to_string))
            .collect::<Vec<_>>()
            .into()
    }
}
