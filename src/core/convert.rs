//! Purpose: Frame-level conversion utilities: deep copy, horizontal merge,
//! Purpose: and conversion between the dense and nullable flavours.
//! Exports: `copy_of`, `merge`, `convert`.
//! Invariants: Merging never mutates its inputs; name unions reject duplicates.
//! Invariants: Nullable-to-default conversion materialises nulls as the kind's
//! Invariants: vacant value, `"n/a"` for strings.
use crate::core::column::{Cell, Column, ElementKind, Flavour, NA_TEXT};
use crate::core::error::{Error, ErrorKind};
use crate::core::frame::Frame;

/// A structurally independent deep copy, flavour preserved. Equivalent to
/// [`Frame::clone`]; kept as a named operation alongside the other
/// conversion helpers.
pub fn copy_of(frame: &Frame) -> Frame {
    frame.clone()
}

/// Concatenates frames horizontally: the result holds the columns of
/// every input in order, with the union of their name indices. All
/// inputs must share one flavour and one row count; a duplicate name
/// across inputs is rejected.
pub fn merge(frames: &[&Frame]) -> Result<Frame, Error> {
    if frames.len() < 2 {
        return Err(Error::new(ErrorKind::Invalid).with_message("merge requires at least two frames"));
    }
    let flavour = frames[0].flavour();
    let rows = frames[0].rows();
    for frame in frames {
        if frame.flavour() != flavour {
            return Err(Error::new(ErrorKind::Invalid)
                .with_message("merge requires frames of one flavour"));
        }
        if frame.rows() != rows {
            return Err(Error::new(ErrorKind::Invalid).with_message(format!(
                "merge requires equal row counts, got {} and {}",
                rows,
                frame.rows()
            )));
        }
    }
    let mut merged = Frame::new(flavour);
    for frame in frames {
        for (index, column) in frame.columns().iter().enumerate() {
            let mut column = column.clone();
            column.match_length(rows);
            match frame.get_column_name(index)? {
                Some(name) => merged.add_column_named(name.to_string(), column)?,
                None => merged.add_column(column)?,
            }
        }
    }
    Ok(merged)
}

/// Re-expresses a frame in the target flavour. Dense to nullable wraps
/// every value; nullable to dense materialises nulls as the vacant
/// value of the column's kind. Converting to the current flavour is a
/// deep copy.
pub fn convert(frame: &Frame, target: Flavour) -> Result<Frame, Error> {
    if frame.flavour() == target {
        return Ok(frame.clone());
    }
    if frame.column_count() == 0 {
        return Ok(Frame::new(target));
    }
    let mut columns = Vec::with_capacity(frame.column_count());
    for (column, cells) in frame.columns().iter().zip(frame.as_cells()) {
        columns.push(match target {
            Flavour::Nullable => nullable_from_cells(column.kind(), cells),
            Flavour::Default => dense_from_cells(column.kind(), cells),
        });
    }
    let mut converted = Frame::with_columns(target, columns)?;
    if let Some(names) = frame.get_column_names() {
        converted.set_column_names(names)?;
    }
    Ok(converted)
}

fn dense_from_cells(kind: ElementKind, cells: Vec<Cell>) -> Column {
    match kind {
        ElementKind::I8 => collect_dense(cells, |cell| match cell {
            Cell::I8(v) => v,
            _ => 0,
        }),
        ElementKind::I16 => collect_dense(cells, |cell| match cell {
            Cell::I16(v) => v,
            _ => 0,
        }),
        ElementKind::I32 => collect_dense(cells, |cell| match cell {
            Cell::I32(v) => v,
            _ => 0,
        }),
        ElementKind::I64 => collect_dense(cells, |cell| match cell {
            Cell::I64(v) => v,
            _ => 0,
        }),
        ElementKind::F32 => collect_dense(cells, |cell| match cell {
            Cell::F32(v) => v,
            _ => 0.0,
        }),
        ElementKind::F64 => collect_dense(cells, |cell| match cell {
            Cell::F64(v) => v,
            _ => 0.0,
        }),
        ElementKind::Bool => collect_dense(cells, |cell| match cell {
            Cell::Bool(v) => v,
            _ => false,
        }),
        ElementKind::Char => collect_dense(cells, |cell| match cell {
            Cell::Char(v) => v,
            _ => '\u{0}',
        }),
        ElementKind::Str => collect_dense(cells, |cell| match cell {
            Cell::Str(v) => v,
            _ => NA_TEXT.to_string(),
        }),
    }
}

fn nullable_from_cells(kind: ElementKind, cells: Vec<Cell>) -> Column {
    match kind {
        ElementKind::I8 => collect_nullable(cells, |cell| match cell {
            Cell::I8(v) => Some(v),
            _ => None,
        }),
        ElementKind::I16 => collect_nullable(cells, |cell| match cell {
            Cell::I16(v) => Some(v),
            _ => None,
        }),
        ElementKind::I32 => collect_nullable(cells, |cell| match cell {
            Cell::I32(v) => Some(v),
            _ => None,
        }),
        ElementKind::I64 => collect_nullable(cells, |cell| match cell {
            Cell::I64(v) => Some(v),
            _ => None,
        }),
        ElementKind::F32 => collect_nullable(cells, |cell| match cell {
            Cell::F32(v) => Some(v),
            _ => None,
        }),
        ElementKind::F64 => collect_nullable(cells, |cell| match cell {
            Cell::F64(v) => Some(v),
            _ => None,
        }),
        ElementKind::Bool => collect_nullable(cells, |cell| match cell {
            Cell::Bool(v) => Some(v),
            _ => None,
        }),
        ElementKind::Char => collect_nullable(cells, |cell| match cell {
            Cell::Char(v) => Some(v),
            _ => None,
        }),
        ElementKind::Str => collect_nullable(cells, |cell| match cell {
            Cell::Str(v) => Some(v),
            _ => None,
        }),
    }
}

fn collect_dense<T>(cells: Vec<Cell>, value: impl Fn(Cell) -> T) -> Column
where
    Column: From<Vec<T>>,
{
    cells.into_iter().map(value).collect::<Vec<T>>().into()
}

fn collect_nullable<T>(cells: Vec<Cell>, value: impl Fn(Cell) -> Option<T>) -> Column
where
    Column: From<Vec<Option<T>>>,
{
    cells.into_iter().map(value).collect::<Vec<Option<T>>>().into()
}
