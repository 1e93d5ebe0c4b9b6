//! Purpose: The frame container: columns of uniform length with an optional name index.
//! Exports: `Frame`, `ColumnSelector`.
//! Role: Owns all row/column structural edits plus search, sort and statistics.
//! Invariants: Every column shares one physical capacity; the live row count
//! Invariants: `next` never exceeds it. A frame holds columns of exactly one
//! Invariants: flavour, fixed at construction.
use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use crate::core::column::{Cell, Column, ElementKind, Flavour};
use crate::core::error::{Error, ErrorKind};

/// Column addressing accepted by the frame API: a column index (`usize`)
/// or a column name (`&str`).
pub trait ColumnSelector {
    fn resolve(&self, frame: &Frame) -> Result<usize, Error>;
}

impl ColumnSelector for usize {
    fn resolve(&self, frame: &Frame) -> Result<usize, Error> {
        if frame.next.is_none() {
            return Err(Error::new(ErrorKind::Invalid).with_message("frame has no columns"));
        }
        if *self >= frame.columns.len() {
            return Err(Error::new(ErrorKind::Bounds)
                .with_message(format!("column index {self} out of range")));
        }
        Ok(*self)
    }
}

impl ColumnSelector for &str {
    fn resolve(&self, frame: &Frame) -> Result<usize, Error> {
        frame.name_to_index(self)
    }
}

/// A table of typed columns sharing one live row count.
///
/// A frame starts uninitialised (no column ever admitted); the first
/// column added seeds the row count with its own length. All later
/// columns must agree with the frame's flavour and are stretched or
/// truncated to the shared physical capacity.
#[derive(Clone, Debug)]
pub struct Frame {
    flavour: Flavour,
    columns: Vec<Column>,
    names: Option<HashMap<String, usize>>,
    next: Option<usize>,
}

impl Frame {
    /// A frame with no columns. The first column admitted later seeds
    /// the row count.
    pub fn new(flavour: Flavour) -> Frame {
        Frame {
            flavour,
            columns: Vec::new(),
            names: None,
            next: None,
        }
    }

    /// A frame over the given columns, which must be non-empty, of equal
    /// length and of the frame's flavour.
    pub fn with_columns(flavour: Flavour, columns: Vec<Column>) -> Result<Frame, Error> {
        if columns.is_empty() {
            return Err(Error::new(ErrorKind::Invalid).with_message("columns must not be empty"));
        }
        let capacity = columns[0].capacity();
        for column in &columns {
            if column.capacity() != capacity {
                return Err(Error::new(ErrorKind::Invalid)
                    .with_message("columns have deviating lengths"));
            }
            if column.flavour() != flavour {
                return Err(Error::new(ErrorKind::Invalid).with_message(format!(
                    "{:?} frame cannot hold a {:?} column",
                    flavour,
                    column.flavour()
                )));
            }
        }
        Ok(Frame {
            flavour,
            columns,
            names: None,
            next: Some(capacity),
        })
    }

    /// Like [`Frame::with_columns`], assigning one name per column.
    pub fn with_named_columns<I>(
        flavour: Flavour,
        names: I,
        columns: Vec<Column>,
    ) -> Result<Frame, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut frame = Frame::with_columns(flavour, columns)?;
        frame.set_column_names(names)?;
        Ok(frame)
    }

    pub fn flavour(&self) -> Flavour {
        self.flavour
    }

    pub fn is_nullable(&self) -> bool {
        self.flavour == Flavour::Nullable
    }

    /// The live row count. An uninitialised frame reports zero rows.
    pub fn rows(&self) -> usize {
        self.next.unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// The shared physical length of all columns.
    pub fn capacity(&self) -> usize {
        self.columns.first().map(Column::capacity).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    /// The columns in index order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Borrows one column by index or name.
    pub fn column<S: ColumnSelector>(&self, col: S) -> Result<&Column, Error> {
        let col = col.resolve(self)?;
        Ok(&self.columns[col])
    }

    // ---- generic cell access ----------------------------------------

    /// Reads one cell by column and row.
    pub fn cell<S: ColumnSelector>(&self, col: S, row: usize) -> Result<Cell, Error> {
        let col = col.resolve(self)?;
        self.check_row(row)?;
        Ok(self.columns[col].value_at(row))
    }

    /// Writes one cell by column and row, enforcing the column's kind
    /// and the frame's null policy.
    pub fn set_cell<S: ColumnSelector>(
        &mut self,
        col: S,
        row: usize,
        value: Cell,
    ) -> Result<(), Error> {
        let col = col.resolve(self)?;
        self.check_row(row)?;
        self.columns[col].set(row, value)
    }

    // ---- row operations ---------------------------------------------

    /// The row at `index` as one cell per column, in column order.
    pub fn get_row(&self, index: usize) -> Result<Vec<Cell>, Error> {
        self.require_columns()?;
        self.check_row(index)?;
        Ok(self
            .columns
            .iter()
            .map(|column| column.value_at(index))
            .collect())
    }

    /// Overwrites the row at `index` after enforcing kind agreement.
    pub fn set_row(&mut self, index: usize, values: Vec<Cell>) -> Result<(), Error> {
        self.check_row(index)?;
        self.enforce_row_types(&values)?;
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.set(index, value)?;
        }
        Ok(())
    }

    /// Appends a row, growing every column together when the capacity is
    /// exhausted.
    pub fn add_row(&mut self, values: Vec<Cell>) -> Result<(), Error> {
        let next = self.enforce_row_types(&values)?;
        if next >= self.capacity() {
            self.grow_all();
        }
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.set(next, value)?;
        }
        self.next = Some(next + 1);
        Ok(())
    }

    /// Inserts a row at `index`, shifting `[index, rows)` down by one.
    /// Inserting at the current row count is an append.
    pub fn insert_row(&mut self, index: usize, values: Vec<Cell>) -> Result<(), Error> {
        let next = self.enforce_row_types(&values)?;
        if index > next {
            return Err(
                Error::new(ErrorKind::Bounds).with_message(format!("row index {index} out of range"))
            );
        }
        if index == next {
            return self.add_row(values);
        }
        if next >= self.capacity() {
            self.grow_all();
        }
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.insert(index, next, value)?;
        }
        self.next = Some(next + 1);
        Ok(())
    }

    /// Removes the row at `index`.
    pub fn remove_row(&mut self, index: usize) -> Result<(), Error> {
        self.remove_rows(index, index + 1)
    }

    /// Removes the rows `[from, to)`.
    pub fn remove_rows(&mut self, from: usize, to: usize) -> Result<(), Error> {
        let next = self.require_columns()?;
        if from >= to {
            return Err(Error::new(ErrorKind::Invalid)
                .with_message("'to' must be greater than 'from'"));
        }
        if from >= next || to > next {
            return Err(Error::new(ErrorKind::Bounds).with_message(format!(
                "row range {from}..{to} exceeds row count {next}"
            )));
        }
        for column in &mut self.columns {
            column.remove(from, to, next);
        }
        let remaining = next - (to - from);
        self.next = Some(remaining);
        // Reclaim memory once only a third of the capacity is live,
        // keeping a small head room for subsequent appends.
        if remaining * 3 < self.capacity() {
            self.match_all(remaining + 4);
        }
        Ok(())
    }

    /// Removes every row and shrinks the columns to a minimal capacity.
    pub fn clear(&mut self) -> Result<(), Error> {
        let Some(next) = self.next else {
            return Ok(());
        };
        for column in &mut self.columns {
            column.remove(0, next, next);
        }
        self.next = Some(0);
        self.match_all(2);
        Ok(())
    }

    /// Shrinks every column's physical length to the live row count.
    pub fn flush(&mut self) {
        if let Some(next) = self.next {
            if next != self.capacity() {
                self.match_all(next);
            }
        }
    }

    // ---- column operations ------------------------------------------

    /// Appends a column. The first column ever added seeds the row
    /// count with its own length; later columns longer than the frame
    /// force null-filled rows to be appended first (Nullable frames
    /// only) and are then stretched to the shared capacity.
    pub fn add_column(&mut self, column: Column) -> Result<(), Error> {
        let index = self.columns.len();
        self.admit_column(index, column, None)
    }

    /// Appends a column under a name.
    pub fn add_column_named(
        &mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<(), Error> {
        let index = self.columns.len();
        self.admit_column(index, column, Some(name.into()))
    }

    /// Inserts a column at `index`, shifting subsequent columns (and
    /// their name index entries) right.
    pub fn insert_column(&mut self, index: usize, column: Column) -> Result<(), Error> {
        self.admit_column(index, column, None)
    }

    /// Inserts a named column at `index`.
    pub fn insert_column_named(
        &mut self,
        index: usize,
        name: impl Into<String>,
        column: Column,
    ) -> Result<(), Error> {
        self.admit_column(index, column, Some(name.into()))
    }

    /// Removes a column by index or name, shifting the name index down.
    pub fn remove_column<S: ColumnSelector>(&mut self, col: S) -> Result<(), Error> {
        let col = col.resolve(self)?;
        self.columns.remove(col);
        if let Some(names) = &mut self.names {
            names.retain(|_, slot| *slot != col);
            for slot in names.values_mut() {
                if *slot > col {
                    *slot -= 1;
                }
            }
        }
        Ok(())
    }

    /// Replaces the column at `index`. The replacement must be exactly
    /// as long as the live row count.
    pub fn set_column_at(&mut self, index: usize, mut column: Column) -> Result<(), Error> {
        index.resolve(self)?;
        let next = self.require_columns()?;
        if column.flavour() != self.flavour {
            return Err(Error::new(ErrorKind::Invalid).with_message(format!(
                "{:?} frame cannot hold a {:?} column",
                self.flavour,
                column.flavour()
            )));
        }
        if column.capacity() != next {
            return Err(Error::new(ErrorKind::Invalid)
                .with_message(format!("column length must be {next}")));
        }
        column.match_length(self.capacity());
        self.columns[index] = column;
        Ok(())
    }

    fn admit_column(
        &mut self,
        index: usize,
        mut column: Column,
        name: Option<String>,
    ) -> Result<(), Error> {
        if column.flavour() != self.flavour {
            return Err(Error::new(ErrorKind::Invalid).with_message(format!(
                "{:?} frame cannot hold a {:?} column",
                self.flavour,
                column.flavour()
            )));
        }
        if let Some(name) = &name {
            if name.is_empty() {
                return Err(Error::new(ErrorKind::Invalid)
                    .with_message("column name must not be empty"));
            }
            if self.names.as_ref().is_some_and(|names| names.contains_key(name)) {
                return Err(Error::new(ErrorKind::Invalid)
                    .with_message(format!("duplicate column name: {name}")));
            }
        }

        if self.columns.is_empty() {
            if index != 0 {
                return Err(Error::new(ErrorKind::Bounds)
                    .with_message(format!("column index {index} out of range")));
            }
            self.next = Some(column.capacity());
            self.columns.push(column);
        } else {
            if index > self.columns.len() {
                return Err(Error::new(ErrorKind::Bounds)
                    .with_message(format!("column index {index} out of range")));
            }
            let next = self.rows();
            if column.capacity() > next {
                match self.flavour {
                    Flavour::Nullable => {
                        let missing = column.capacity() - next;
                        let width = self.columns.len();
                        for _ in 0..missing {
                            self.add_row(vec![Cell::Null; width])?;
                        }
                    }
                    Flavour::Default => {
                        return Err(Error::new(ErrorKind::Invalid).with_message(
                            "column is longer than the frame and rows cannot be null-padded",
                        ));
                    }
                }
            }
            column.match_length(self.capacity());
            self.columns.insert(index, column);
            if let Some(names) = &mut self.names {
                for slot in names.values_mut() {
                    if *slot >= index {
                        *slot += 1;
                    }
                }
            }
        }
        if let Some(name) = name {
            self.names
                .get_or_insert_with(HashMap::new)
                .insert(name, index);
        }
        Ok(())
    }

    // ---- name index -------------------------------------------------

    /// The name assigned to a column, if any.
    pub fn get_column_name(&self, col: usize) -> Result<Option<&str>, Error> {
        let col = col.resolve(self)?;
        Ok(self.name_of(col))
    }

    /// The index a name resolves to.
    pub fn get_column_index(&self, name: &str) -> Result<usize, Error> {
        self.name_to_index(name)
    }

    /// One entry per column when any name is set: the assigned name, or
    /// the decimal column index for unnamed slots. `None` when the frame
    /// carries no name index at all.
    pub fn get_column_names(&self) -> Option<Vec<String>> {
        self.names.as_ref()?;
        Some(
            (0..self.columns.len())
                .map(|col| match self.name_of(col) {
                    Some(name) => name.to_string(),
                    None => col.to_string(),
                })
                .collect(),
        )
    }

    /// Replaces the whole name index; one unique, non-empty name per
    /// column.
    pub fn set_column_names<I>(&mut self, names: I) -> Result<(), Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.require_columns()?;
        let names: Vec<String> = names
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .collect();
        if names.len() != self.columns.len() {
            return Err(Error::new(ErrorKind::Invalid).with_message(format!(
                "got {} names for {} columns",
                names.len(),
                self.columns.len()
            )));
        }
        let mut index = HashMap::with_capacity(names.len());
        for (col, name) in names.into_iter().enumerate() {
            if name.is_empty() {
                return Err(Error::new(ErrorKind::Invalid)
                    .with_message("column name must not be empty"));
            }
            if index.insert(name.clone(), col).is_some() {
                return Err(Error::new(ErrorKind::Invalid)
                    .with_message(format!("duplicate column name: {name}")));
            }
        }
        self.names = Some(index);
        Ok(())
    }

    /// Names one column. Returns whether an existing name for that
    /// column was overridden.
    pub fn set_column_name(&mut self, col: usize, name: impl Into<String>) -> Result<bool, Error> {
        let col = col.resolve(self)?;
        let name = name.into();
        if name.is_empty() {
            return Err(Error::new(ErrorKind::Invalid).with_message("column name must not be empty"));
        }
        if let Some(names) = &self.names {
            if names.get(&name).is_some_and(|slot| *slot != col) {
                return Err(Error::new(ErrorKind::Invalid)
                    .with_message(format!("duplicate column name: {name}")));
            }
        }
        let names = self.names.get_or_insert_with(HashMap::new);
        let had_name = names.values().any(|slot| *slot == col);
        names.retain(|_, slot| *slot != col);
        names.insert(name, col);
        Ok(had_name)
    }

    /// Drops the whole name index.
    pub fn remove_column_names(&mut self) {
        self.names = None;
    }

    pub fn has_column_names(&self) -> bool {
        self.names.is_some()
    }

    // ---- search -----------------------------------------------------

    /// The first row in `[0, rows)` whose rendered value in the given
    /// column matches the whole-string regex.
    pub fn index_of<S: ColumnSelector>(
        &self,
        col: S,
        pattern: &str,
    ) -> Result<Option<usize>, Error> {
        let col = col.resolve(self)?;
        self.search_from(col, 0, pattern)
    }

    /// Like [`Frame::index_of`], starting the scan at `start`.
    pub fn index_of_from<S: ColumnSelector>(
        &self,
        col: S,
        start: usize,
        pattern: &str,
    ) -> Result<Option<usize>, Error> {
        let col = col.resolve(self)?;
        if start >= self.rows() {
            return Err(Error::new(ErrorKind::Bounds)
                .with_message(format!("start row {start} out of range")));
        }
        self.search_from(col, start, pattern)
    }

    /// Every matching row index, in increasing order.
    pub fn index_of_all<S: ColumnSelector>(
        &self,
        col: S,
        pattern: &str,
    ) -> Result<Vec<usize>, Error> {
        let col = col.resolve(self)?;
        let regex = full_match_regex(pattern)?;
        let column = &self.columns[col];
        Ok((0..self.rows())
            .filter(|&row| regex.is_match(&column.value_at(row).to_string()))
            .collect())
    }

    /// A new frame of the same flavour, schema and names holding the
    /// matching rows in order. No matches yields a zero-row frame.
    pub fn find_all<S: ColumnSelector>(&self, col: S, pattern: &str) -> Result<Frame, Error> {
        let col = col.resolve(self)?;
        let hits = self.index_of_all(col, pattern)?;
        let mut found = Frame::new(self.flavour);
        for column in &self.columns {
            found.add_column(Column::like(column))?;
        }
        for row in hits {
            found.add_row(self.get_row(row)?)?;
        }
        if let Some(names) = self.get_column_names() {
            found.set_column_names(names)?;
        }
        Ok(found)
    }

    fn search_from(
        &self,
        col: usize,
        start: usize,
        pattern: &str,
    ) -> Result<Option<usize>, Error> {
        let regex = full_match_regex(pattern)?;
        let column = &self.columns[col];
        Ok((start..self.rows())
            .find(|&row| regex.is_match(&column.value_at(row).to_string())))
    }

    // ---- statistics -------------------------------------------------

    /// The arithmetic mean of a numeric column; null cells are skipped
    /// and do not count towards the denominator.
    pub fn average<S: ColumnSelector>(&self, col: S) -> Result<f64, Error> {
        let col = col.resolve(self)?;
        let mut sum = 0.0;
        let mut count = 0usize;
        for value in self.numeric_cells(col)? {
            sum += value;
            count += 1;
        }
        if count == 0 {
            return Err(empty_selection());
        }
        Ok(sum / count as f64)
    }

    /// The smallest non-null value of a numeric column.
    pub fn minimum<S: ColumnSelector>(&self, col: S) -> Result<f64, Error> {
        let col = col.resolve(self)?;
        let mut best: Option<f64> = None;
        for value in self.numeric_cells(col)? {
            if best.map_or(true, |current| value < current) {
                best = Some(value);
            }
        }
        best.ok_or_else(empty_selection)
    }

    /// The largest non-null value of a numeric column.
    pub fn maximum<S: ColumnSelector>(&self, col: S) -> Result<f64, Error> {
        let col = col.resolve(self)?;
        let mut best: Option<f64> = None;
        for value in self.numeric_cells(col)? {
            if best.map_or(true, |current| value > current) {
                best = Some(value);
            }
        }
        best.ok_or_else(empty_selection)
    }

    fn numeric_cells(&self, col: usize) -> Result<impl Iterator<Item = f64> + '_, Error> {
        let column = &self.columns[col];
        if !column.kind().is_numeric() {
            return Err(Error::new(ErrorKind::Unsupported).with_message(format!(
                "statistics are undefined for {:?} columns",
                column.kind()
            )));
        }
        Ok((0..self.rows()).filter_map(move |row| match column.value_at(row) {
            Cell::I8(v) => Some(v as f64),
            Cell::I16(v) => Some(v as f64),
            Cell::I32(v) => Some(v as f64),
            Cell::I64(v) => Some(v as f64),
            Cell::F32(v) => Some(v as f64),
            Cell::F64(v) => Some(v),
            _ => None,
        }))
    }

    // ---- sort -------------------------------------------------------

    /// Sorts the whole frame by the given column, permuting the rows of
    /// every column in lockstep. Not stable: equal keys may exchange
    /// positions. In Nullable frames all null keys move to the tail.
    pub fn sort_by<S: ColumnSelector>(&mut self, col: S) -> Result<(), Error> {
        let col = col.resolve(self)?;
        let next = self.rows();
        if next < 2 {
            return Ok(());
        }
        let upper = match self.flavour {
            Flavour::Default => next as isize - 1,
            Flavour::Nullable => self.presort_nulls(col, next)?,
        };
        self.quicksort(col, 0, upper)
    }

    // Swaps all null keys to the tail, returning the last index of the
    // null-free prefix (-1 when every key is null).
    fn presort_nulls(&mut self, col: usize, next: usize) -> Result<isize, Error> {
        let mut tail = next as isize - 1;
        let mut row: isize = 0;
        while row < tail {
            while self.columns[col].value_at(row as usize).is_null() {
                if row == tail {
                    break;
                }
                self.swap_rows(row as usize, tail as usize)?;
                tail -= 1;
            }
            row += 1;
        }
        if tail >= 0 && !self.columns[col].value_at(tail as usize).is_null() {
            Ok(tail)
        } else {
            Ok(tail - 1)
        }
    }

    fn quicksort(&mut self, col: usize, left: isize, right: isize) -> Result<(), Error> {
        if right <= left {
            return Ok(());
        }
        let pivot = self.columns[col].value_at(((left + right) / 2) as usize);
        let mut l = left;
        let mut r = right;
        while l < r {
            while self.columns[col].value_at(l as usize).lt(&pivot) {
                l += 1;
            }
            while self.columns[col].value_at(r as usize).gt(&pivot) {
                r -= 1;
            }
            if l <= r {
                self.swap_rows(l as usize, r as usize)?;
                l += 1;
                r -= 1;
            }
        }
        if left < r {
            self.quicksort(col, left, r)?;
        }
        if right > l {
            self.quicksort(col, l, right)?;
        }
        Ok(())
    }

    fn swap_rows(&mut self, i: usize, j: usize) -> Result<(), Error> {
        for column in &mut self.columns {
            let cache = column.value_at(i);
            let other = column.value_at(j);
            column.set(i, other)?;
            column.set(j, cache)?;
        }
        Ok(())
    }

    // ---- dumps ------------------------------------------------------

    /// The live cells, column-major. Empty for an uninitialised frame.
    pub fn as_cells(&self) -> Vec<Vec<Cell>> {
        let rows = self.rows();
        self.columns
            .iter()
            .map(|column| (0..rows).map(|row| column.value_at(row)).collect())
            .collect()
    }

    // ---- internal helpers -------------------------------------------

    fn require_columns(&self) -> Result<usize, Error> {
        self.next
            .ok_or_else(|| Error::new(ErrorKind::Invalid).with_message("frame has no columns"))
    }

    fn check_row(&self, row: usize) -> Result<(), Error> {
        let next = self.require_columns()?;
        if row >= next {
            return Err(
                Error::new(ErrorKind::Bounds).with_message(format!("row index {row} out of range"))
            );
        }
        Ok(())
    }

    fn name_to_index(&self, name: &str) -> Result<usize, Error> {
        if name.is_empty() {
            return Err(Error::new(ErrorKind::Invalid).with_message("column name must not be empty"));
        }
        let names = self
            .names
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::Invalid).with_message("column names not set"))?;
        names
            .get(name)
            .copied()
            .ok_or_else(|| {
                Error::new(ErrorKind::Invalid).with_message(format!("unknown column name: {name}"))
            })
    }

    fn name_of(&self, col: usize) -> Option<&str> {
        self.names
            .as_ref()?
            .iter()
            .find(|(_, slot)| **slot == col)
            .map(|(name, _)| name.as_str())
    }

    // Validates one row against the schema: the length must equal the
    // column count and each cell must be null (Nullable frames only) or
    // of its column's kind.
    fn enforce_row_types(&self, values: &[Cell]) -> Result<usize, Error> {
        let next = self.require_columns()?;
        if values.len() != self.columns.len() {
            return Err(Error::new(ErrorKind::Invalid).with_message(format!(
                "row length {} does not match column count {}",
                values.len(),
                self.columns.len()
            )));
        }
        for (col, (column, value)) in self.columns.iter().zip(values).enumerate() {
            match value.kind() {
                None => {
                    if self.flavour == Flavour::Default {
                        return Err(Error::new(ErrorKind::Invalid).with_message(format!(
                            "null value at column {col} in a non-nullable frame"
                        )));
                    }
                }
                Some(kind) => {
                    if kind != column.kind() {
                        return Err(Error::new(ErrorKind::Invalid).with_message(format!(
                            "kind mismatch at column {col}: expected {:?}, got {kind:?}",
                            column.kind()
                        )));
                    }
                }
            }
        }
        Ok(next)
    }

    fn grow_all(&mut self) {
        for column in &mut self.columns {
            column.grow();
        }
    }

    fn match_all(&mut self, length: usize) {
        for column in &mut self.columns {
            column.match_length(length);
        }
    }
}

macro_rules! typed_accessors {
    ($($get:ident / $set:ident: $ty:ty => $variant:ident),+ $(,)?) => {
        impl Frame {
            $(
                #[doc = concat!("Reads a `", stringify!($ty), "` cell; `None` only for null cells in Nullable frames.")]
                pub fn $get<S: ColumnSelector>(&self, col: S, row: usize) -> Result<Option<$ty>, Error> {
                    let col = col.resolve(self)?;
                    self.check_row(row)?;
                    let column = &self.columns[col];
                    if column.kind() != ElementKind::$variant {
                        return Err(Error::new(ErrorKind::Invalid).with_message(format!(
                            "column {col} holds {:?}, not {:?}",
                            column.kind(),
                            ElementKind::$variant
                        )));
                    }
                    match column.value_at(row) {
                        Cell::$variant(value) => Ok(Some(value)),
                        _ => Ok(None),
                    }
                }

                #[doc = concat!("Writes a `", stringify!($ty), "` cell; `None` is legal only towards Nullable frames (dense string columns store the placeholder instead).")]
                pub fn $set<S: ColumnSelector>(
                    &mut self,
                    col: S,
                    row: usize,
                    value: Option<$ty>,
                ) -> Result<(), Error> {
                    let col = col.resolve(self)?;
                    self.check_row(row)?;
                    let column = &mut self.columns[col];
                    if column.kind() != ElementKind::$variant {
                        return Err(Error::new(ErrorKind::Invalid).with_message(format!(
                            "column {col} holds {:?}, not {:?}",
                            column.kind(),
                            ElementKind::$variant
                        )));
                    }
                    let cell = match value {
                        Some(value) => Cell::$variant(value),
                        None => Cell::Null,
                    };
                    column.set(row, cell)
                }
            )+
        }
    };
}

typed_accessors! {
    get_i8 / set_i8: i8 => I8,
    get_i16 / set_i16: i16 => I16,
    get_i32 / set_i32: i32 => I32,
    get_i64 / set_i64: i64 => I64,
    get_f32 / set_f32: f32 => F32,
    get_f64 / set_f64: f64 => F64,
    get_bool / set_bool: bool => Bool,
    get_char / set_char: char => Char,
    get_str / set_str: String => Str,
}

fn full_match_regex(pattern: &str) -> Result<Regex, Error> {
    if pattern.is_empty() {
        return Err(Error::new(ErrorKind::Invalid).with_message("pattern must not be empty"));
    }
    // Whole-value matching; a bare pattern is anchored on both ends.
    Regex::new(&format!(r"\A(?:{pattern})\z")).map_err(|err| {
        Error::new(ErrorKind::Invalid)
            .with_message("invalid pattern")
            .with_source(err)
    })
}

fn empty_selection() -> Error {
    Error::new(ErrorKind::Unsupported).with_message("selection holds no values")
}

/// Live-region equality: flavour, schema, names and cell values. The
/// physical capacity beyond the live rows does not participate.
impl PartialEq for Frame {
    fn eq(&self, other: &Frame) -> bool {
        if self.flavour != other.flavour
            || self.columns.len() != other.columns.len()
            || self.rows() != other.rows()
            || self.has_column_names() != other.has_column_names()
        {
            return false;
        }
        for col in 0..self.columns.len() {
            if self.name_of(col) != other.name_of(col) {
                return false;
            }
            if self.columns[col].kind() != other.columns[col].kind() {
                return false;
            }
            for row in 0..self.rows() {
                if self.columns[col].value_at(row) != other.columns[col].value_at(row) {
                    return false;
                }
            }
        }
        true
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.next.is_none() {
            return writeln!(f, "uninitialised frame");
        }
        let rows = self.rows();
        let labels: Vec<String> = match self.get_column_names() {
            Some(names) => names,
            None => (0..self.columns.len()).map(|col| col.to_string()).collect(),
        };
        let mut widths: Vec<usize> = labels.iter().map(String::len).collect();
        for (col, width) in widths.iter_mut().enumerate() {
            for row in 0..rows {
                *width = (*width).max(self.columns[col].value_at(row).to_string().len());
            }
        }
        let index_width = rows.saturating_sub(1).to_string().len().max(1);
        write!(f, "{:_<index_width$}|", "")?;
        for (label, width) in labels.iter().zip(widths.iter().copied()) {
            write!(f, " {label:<width$}")?;
        }
        writeln!(f)?;
        for row in 0..rows {
            write!(f, "{row:<index_width$}|")?;
            for (col, width) in widths.iter().copied().enumerate() {
                write!(f, " {:<width$}", self.columns[col].value_at(row).to_string())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Cell, Column, Flavour, Frame};
    use crate::core::column::NA_TEXT;
    use crate::core::error::ErrorKind;

    fn sample_default() -> Frame {
        Frame::with_named_columns(
            Flavour::Default,
            ["id", "label", "score"],
            vec![
                Column::from(vec![1i32, 2, 3]),
                Column::from(vec!["one", "two", "three"]),
                Column::from(vec![1.5f64, 2.5, 3.5]),
            ],
        )
        .expect("frame")
    }

    fn sample_nullable() -> Frame {
        Frame::with_named_columns(
            Flavour::Nullable,
            ["id", "label"],
            vec![
                Column::from(vec![Some(1i32), None, Some(3)]),
                Column::from(vec![Some("one"), None, Some("three")]),
            ],
        )
        .expect("frame")
    }

    #[test]
    fn construction_seeds_row_count() {
        let frame = sample_default();
        assert_eq!(frame.rows(), 3);
        assert_eq!(frame.column_count(), 3);
        assert_eq!(frame.capacity(), 3);
        assert!(!frame.is_nullable());
    }

    #[test]
    fn uninitialised_frame_reports_zero_rows() {
        let frame = Frame::new(Flavour::Default);
        assert_eq!(frame.rows(), 0);
        assert!(frame.is_empty());
        assert_eq!(frame.column_count(), 0);
    }

    #[test]
    fn mixed_flavours_are_rejected() {
        let err = Frame::with_columns(
            Flavour::Default,
            vec![Column::from(vec![Some(1i32), None])],
        )
        .expect_err("flavour mismatch");
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn deviating_column_lengths_are_rejected() {
        let err = Frame::with_columns(
            Flavour::Default,
            vec![Column::from(vec![1i32, 2]), Column::from(vec![1i64, 2, 3])],
        )
        .expect_err("length mismatch");
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn typed_access_by_index_and_name() {
        let mut frame = sample_default();
        assert_eq!(frame.get_i32(0usize, 1).expect("get"), Some(2));
        assert_eq!(
            frame.get_str("label", 2).expect("get"),
            Some("three".to_string())
        );
        frame.set_f64("score", 0, Some(9.5)).expect("set");
        assert_eq!(frame.get_f64(2usize, 0).expect("get"), Some(9.5));
    }

    #[test]
    fn typed_access_enforces_kind() {
        let frame = sample_default();
        let err = frame.get_i64(0usize, 0).expect_err("kind mismatch");
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn row_index_out_of_range_fails_bounds() {
        let frame = sample_default();
        let err = frame.get_i32(0usize, 3).expect_err("row out of range");
        assert_eq!(err.kind(), ErrorKind::Bounds);
    }

    #[test]
    fn unknown_name_fails() {
        let frame = sample_default();
        let err = frame.get_i32("missing", 0).expect_err("unknown name");
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn add_row_grows_all_columns_together() {
        let mut frame = sample_default();
        for i in 0..10 {
            frame
                .add_row(vec![
                    Cell::I32(10 + i),
                    Cell::Str(format!("row{i}")),
                    Cell::F64(f64::from(i)),
                ])
                .expect("add_row");
        }
        assert_eq!(frame.rows(), 13);
        let capacity = frame.capacity();
        for column in frame.columns() {
            assert_eq!(column.capacity(), capacity);
        }
    }

    #[test]
    fn add_row_rejects_null_in_default_frame() {
        let mut frame = sample_default();
        let err = frame
            .add_row(vec![Cell::I32(7), Cell::Null, Cell::F64(0.0)])
            .expect_err("null row cell");
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(frame.rows(), 3);
    }

    #[test]
    fn add_row_stores_placeholder_for_empty_string() {
        let mut frame = sample_default();
        frame
            .add_row(vec![
                Cell::I32(7),
                Cell::Str(String::new()),
                Cell::F64(0.0),
            ])
            .expect("add_row");
        assert_eq!(
            frame.get_str("label", 3).expect("get"),
            Some(NA_TEXT.to_string())
        );
    }

    #[test]
    fn add_row_rejects_length_mismatch() {
        let mut frame = sample_default();
        let err = frame
            .add_row(vec![Cell::I32(7)])
            .expect_err("length mismatch");
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn insert_row_shifts_subsequent_rows() {
        let mut frame = sample_default();
        frame
            .insert_row(
                1,
                vec![
                    Cell::I32(99),
                    Cell::Str("mid".to_string()),
                    Cell::F64(0.5),
                ],
            )
            .expect("insert_row");
        assert_eq!(frame.rows(), 4);
        assert_eq!(frame.get_i32("id", 0).expect("get"), Some(1));
        assert_eq!(frame.get_i32("id", 1).expect("get"), Some(99));
        assert_eq!(frame.get_i32("id", 2).expect("get"), Some(2));
        assert_eq!(frame.get_i32("id", 3).expect("get"), Some(3));
    }

    #[test]
    fn insert_row_at_row_count_appends() {
        let mut frame = sample_default();
        frame
            .insert_row(
                3,
                vec![Cell::I32(4), Cell::Str("four".to_string()), Cell::F64(4.5)],
            )
            .expect("insert_row");
        assert_eq!(frame.get_i32("id", 3).expect("get"), Some(4));
    }

    #[test]
    fn remove_rows_compacts_capacity() {
        let mut frame = sample_default();
        for i in 0..20 {
            frame
                .add_row(vec![
                    Cell::I32(i),
                    Cell::Str("x".to_string()),
                    Cell::F64(0.0),
                ])
                .expect("add_row");
        }
        frame.remove_rows(0, 21).expect("remove_rows");
        assert_eq!(frame.rows(), 2);
        assert_eq!(frame.capacity(), 6);
        assert_eq!(frame.get_i32("id", 0).expect("get"), Some(18));
        assert_eq!(frame.get_i32("id", 1).expect("get"), Some(19));
    }

    #[test]
    fn remove_rows_validates_range() {
        let mut frame = sample_default();
        assert_eq!(
            frame.remove_rows(2, 2).expect_err("empty range").kind(),
            ErrorKind::Invalid
        );
        assert_eq!(
            frame.remove_rows(0, 4).expect_err("past end").kind(),
            ErrorKind::Bounds
        );
    }

    #[test]
    fn clear_keeps_schema_and_drops_rows() {
        let mut frame = sample_default();
        frame.clear().expect("clear");
        assert_eq!(frame.rows(), 0);
        assert_eq!(frame.column_count(), 3);
        assert_eq!(frame.capacity(), 2);
    }

    #[test]
    fn flush_trims_capacity_to_row_count() {
        let mut frame = sample_default();
        frame
            .add_row(vec![Cell::I32(4), Cell::Str("four".to_string()), Cell::F64(4.5)])
            .expect("add_row");
        assert!(frame.capacity() > frame.rows());
        frame.flush();
        assert_eq!(frame.capacity(), frame.rows());
    }

    #[test]
    fn first_column_seeds_row_count() {
        let mut frame = Frame::new(Flavour::Default);
        frame
            .add_column(Column::from(vec![1i32, 2, 3, 4]))
            .expect("add_column");
        assert_eq!(frame.rows(), 4);
    }

    #[test]
    fn longer_column_pads_nullable_frame_with_null_rows() {
        let mut frame = sample_nullable();
        frame
            .add_column(Column::from(vec![Some(1i64), Some(2), Some(3), Some(4), Some(5)]))
            .expect("add_column");
        assert_eq!(frame.rows(), 5);
        assert_eq!(frame.get_i32("id", 4).expect("get"), None);
        assert_eq!(frame.get_i64(2usize, 4).expect("get"), Some(5));
        let capacity = frame.capacity();
        for column in frame.columns() {
            assert_eq!(column.capacity(), capacity);
        }
    }

    #[test]
    fn longer_column_is_rejected_by_default_frame() {
        let mut frame = sample_default();
        let err = frame
            .add_column(Column::from(vec![1i64, 2, 3, 4]))
            .expect_err("cannot pad");
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn insert_column_shifts_name_index() {
        let mut frame = sample_default();
        frame
            .insert_column_named(1, "flag", Column::from(vec![true, false, true]))
            .expect("insert_column");
        assert_eq!(frame.get_column_index("id").expect("index"), 0);
        assert_eq!(frame.get_column_index("flag").expect("index"), 1);
        assert_eq!(frame.get_column_index("label").expect("index"), 2);
        assert_eq!(frame.get_column_index("score").expect("index"), 3);
    }

    #[test]
    fn remove_column_shifts_name_index_down() {
        let mut frame = sample_default();
        frame.remove_column("label").expect("remove_column");
        assert_eq!(frame.column_count(), 2);
        assert_eq!(frame.get_column_index("id").expect("index"), 0);
        assert_eq!(frame.get_column_index("score").expect("index"), 1);
        assert!(frame.get_column_index("label").is_err());
    }

    #[test]
    fn set_column_at_requires_live_length() {
        let mut frame = sample_default();
        let err = frame
            .set_column_at(0, Column::from(vec![1i32, 2]))
            .expect_err("short column");
        assert_eq!(err.kind(), ErrorKind::Invalid);
        frame
            .set_column_at(0, Column::from(vec![7i32, 8, 9]))
            .expect("set_column_at");
        assert_eq!(frame.get_i32("id", 2).expect("get"), Some(9));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut frame = sample_default();
        let err = frame
            .add_column_named("id", Column::from(vec![0i8, 0, 0]))
            .expect_err("duplicate name");
        assert_eq!(err.kind(), ErrorKind::Invalid);
        let err = frame
            .set_column_names(["a", "a", "b"])
            .expect_err("duplicate name");
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn set_column_name_reports_override() {
        let mut frame = sample_default();
        assert!(frame.set_column_name(0, "key").expect("rename"));
        assert_eq!(frame.get_column_index("key").expect("index"), 0);
        assert!(frame.get_column_index("id").is_err());
        frame.remove_column_names();
        assert!(!frame.has_column_names());
        assert!(!frame.set_column_name(0, "fresh").expect("name"));
    }

    #[test]
    fn unnamed_slots_render_as_indices() {
        let mut frame = Frame::with_columns(
            Flavour::Default,
            vec![Column::from(vec![1i32]), Column::from(vec![2i32])],
        )
        .expect("frame");
        assert_eq!(frame.get_column_names(), None);
        frame.set_column_name(1, "b").expect("name");
        assert_eq!(
            frame.get_column_names(),
            Some(vec!["0".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn index_of_matches_whole_rendered_value() {
        let frame = sample_default();
        assert_eq!(frame.index_of("label", "t.*").expect("search"), Some(1));
        assert_eq!(frame.index_of("id", "3").expect("search"), Some(2));
        // substring only: must not match
        assert_eq!(frame.index_of("label", "hre").expect("search"), None);
    }

    #[test]
    fn index_of_from_respects_start() {
        let frame = sample_default();
        assert_eq!(
            frame.index_of_from("label", 2, "t.*").expect("search"),
            Some(2)
        );
        assert_eq!(
            frame
                .index_of_from("label", 3, "t.*")
                .expect_err("start out of range")
                .kind(),
            ErrorKind::Bounds
        );
    }

    #[test]
    fn index_of_all_is_strictly_increasing() {
        let frame = sample_default();
        assert_eq!(frame.index_of_all("label", "t.*").expect("search"), vec![1, 2]);
        assert!(frame.index_of_all("label", "zzz").expect("search").is_empty());
    }

    #[test]
    fn null_cells_render_as_null_for_search() {
        let frame = sample_nullable();
        assert_eq!(frame.index_of("label", "null").expect("search"), Some(1));
    }

    #[test]
    fn find_all_copies_schema_and_names() {
        let frame = sample_default();
        let found = frame.find_all("label", "t.*").expect("find_all");
        assert_eq!(found.rows(), 2);
        assert_eq!(found.column_count(), 3);
        assert_eq!(found.get_i32("id", 0).expect("get"), Some(2));
        assert_eq!(found.get_i32("id", 1).expect("get"), Some(3));
        let none = frame.find_all("label", "zzz").expect("find_all");
        assert_eq!(none.rows(), 0);
        assert_eq!(none.column_count(), 3);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let frame = sample_default();
        assert_eq!(
            frame.index_of("label", "(").expect_err("bad regex").kind(),
            ErrorKind::Invalid
        );
        assert_eq!(
            frame.index_of("label", "").expect_err("empty regex").kind(),
            ErrorKind::Invalid
        );
    }

    #[test]
    fn statistics_skip_nulls() {
        let frame = Frame::with_columns(
            Flavour::Nullable,
            vec![Column::from(vec![
                Some(1.0f64),
                None,
                Some(3.0),
                None,
                Some(5.0),
            ])],
        )
        .expect("frame");
        assert_eq!(frame.average(0usize).expect("average"), 3.0);
        assert_eq!(frame.minimum(0usize).expect("minimum"), 1.0);
        assert_eq!(frame.maximum(0usize).expect("maximum"), 5.0);
    }

    #[test]
    fn statistics_reject_all_null_and_non_numeric() {
        let frame = Frame::with_columns(
            Flavour::Nullable,
            vec![
                Column::from(vec![None::<f64>, None]),
                Column::from(vec![Some("a"), Some("b")]),
            ],
        )
        .expect("frame");
        assert_eq!(
            frame.average(0usize).expect_err("all null").kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            frame.minimum(1usize).expect_err("non numeric").kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn sort_by_numeric_column_orders_rows() {
        let mut frame = Frame::with_named_columns(
            Flavour::Default,
            ["n", "tag"],
            vec![
                Column::from(vec![4i32, 1, 3, 2]),
                Column::from(vec!["d", "a", "c", "b"]),
            ],
        )
        .expect("frame");
        frame.sort_by("n").expect("sort");
        for (row, expected) in [(0, "a"), (1, "b"), (2, "c"), (3, "d")] {
            assert_eq!(frame.get_i32("n", row).expect("get"), Some(row as i32 + 1));
            assert_eq!(frame.get_str("tag", row).expect("get"), Some(expected.to_string()));
        }
    }

    #[test]
    fn sort_by_moves_nulls_to_tail() {
        let mut frame = Frame::with_named_columns(
            Flavour::Nullable,
            ["n", "tag"],
            vec![
                Column::from(vec![Some(3i32), None, Some(1), None, Some(2)]),
                Column::from(vec![Some("c"), Some("x"), Some("a"), Some("y"), Some("b")]),
            ],
        )
        .expect("frame");
        frame.sort_by("n").expect("sort");
        assert_eq!(frame.get_i32("n", 0).expect("get"), Some(1));
        assert_eq!(frame.get_i32("n", 1).expect("get"), Some(2));
        assert_eq!(frame.get_i32("n", 2).expect("get"), Some(3));
        assert_eq!(frame.get_i32("n", 3).expect("get"), None);
        assert_eq!(frame.get_i32("n", 4).expect("get"), None);
        assert_eq!(frame.get_str("tag", 0).expect("get"), Some("a".to_string()));
        assert_eq!(frame.get_str("tag", 1).expect("get"), Some("b".to_string()));
        assert_eq!(frame.get_str("tag", 2).expect("get"), Some("c".to_string()));
        let mut tail: Vec<String> = (3..5)
            .map(|row| frame.get_str("tag", row).expect("get").expect("value"))
            .collect();
        tail.sort();
        assert_eq!(tail, ["x", "y"]);
    }

    #[test]
    fn sort_by_all_null_column_is_a_no_op() {
        let mut frame = Frame::with_columns(
            Flavour::Nullable,
            vec![Column::from(vec![None::<i32>, None, None])],
        )
        .expect("frame");
        frame.sort_by(0usize).expect("sort");
        assert_eq!(frame.rows(), 3);
    }

    #[test]
    fn sort_by_string_column() {
        let mut frame = Frame::with_columns(
            Flavour::Default,
            vec![Column::from(vec!["pear", "apple", "quince", "fig"])],
        )
        .expect("frame");
        frame.sort_by(0usize).expect("sort");
        let sorted: Vec<String> = (0..4)
            .map(|row| frame.get_str(0usize, row).expect("get").expect("value"))
            .collect();
        assert_eq!(sorted, ["apple", "fig", "pear", "quince"]);
    }

    #[test]
    fn rows_round_trip_through_get_and_set() {
        let mut frame = sample_default();
        let row = frame.get_row(1).expect("get_row");
        assert_eq!(
            row,
            vec![Cell::I32(2), Cell::Str("two".to_string()), Cell::F64(2.5)]
        );
        frame
            .set_row(0, row.clone())
            .expect("set_row");
        assert_eq!(frame.get_row(0).expect("get_row"), row);
    }

    #[test]
    fn live_region_equality_ignores_spare_capacity() {
        let mut grown = sample_default();
        grown
            .add_row(vec![Cell::I32(4), Cell::Str("four".to_string()), Cell::F64(4.5)])
            .expect("add_row");
        grown.remove_row(3).expect("remove_row");
        let pristine = sample_default();
        assert_ne!(grown.capacity(), pristine.capacity());
        assert_eq!(grown, pristine);
    }

    #[test]
    fn display_renders_headers_and_nulls() {
        let frame = sample_nullable();
        let rendered = frame.to_string();
        assert!(rendered.contains("id"));
        assert!(rendered.contains("label"));
        assert!(rendered.contains("null"));
        assert!(rendered.contains("three"));
    }
}
