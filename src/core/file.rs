//! Purpose: Read and write `.df` files.
//! Exports: `FILE_EXTENSION`, `write_file`, `read_file`.
//! Role: Buffered whole-file glue over the compression envelope.
//! Invariants: Written paths always end in `.df`; reads verify the magic
//! Invariants: before touching the inflater.
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::core::envelope::{self, FILE_MAGIC};
use crate::core::error::{Error, ErrorKind};
use crate::core::frame::Frame;

/// The file extension given to persisted frames.
pub const FILE_EXTENSION: &str = ".df";

/// Persists a frame, appending the `.df` extension when the path lacks
/// it. Returns the path actually written.
pub fn write_file(path: impl AsRef<Path>, frame: &Frame) -> Result<PathBuf, Error> {
    let path = ensure_extension(path.as_ref());
    let bytes = envelope::compress(frame)?;
    let file = File::create(&path)
        .map_err(|err| Error::new(ErrorKind::Io).with_path(&path).with_source(err))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&bytes)
        .and_then(|()| writer.flush())
        .map_err(|err| Error::new(ErrorKind::Io).with_path(&path).with_source(err))?;
    Ok(path)
}

/// Reads a `.df` file back into a frame.
pub fn read_file(path: impl AsRef<Path>) -> Result<Frame, Error> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|err| Error::new(ErrorKind::Io).with_path(path).with_source(err))?;
    let mut bytes = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut bytes)
        .map_err(|err| Error::new(ErrorKind::Io).with_path(path).with_source(err))?;
    if bytes.len() < 2 || bytes[..2] != FILE_MAGIC {
        return Err(Error::new(ErrorKind::Format)
            .with_message(format!(
                "not a {FILE_EXTENSION} file, starts with {:02x?}",
                &bytes.get(..2).unwrap_or(&bytes)
            ))
            .with_path(path));
    }
    envelope::decompress(&bytes).map_err(|err| err.with_path(path))
}

fn ensure_extension(path: &Path) -> PathBuf {
    let matches = path
        .file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.ends_with(FILE_EXTENSION));
    if matches {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(FILE_EXTENSION);
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{read_file, write_file, FILE_EXTENSION};
    use crate::core::column::{Column, Flavour};
    use crate::core::error::ErrorKind;
    use crate::core::frame::Frame;
    use std::fs;
    use std::io::Write;

    fn sample() -> Frame {
        Frame::with_named_columns(
            Flavour::Default,
            ["id", "label"],
            vec![
                Column::from(vec![1i32, 2, 3]),
                Column::from(vec!["one", "two", "three"]),
            ],
        )
        .expect("frame")
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.df");
        let frame = sample();
        let written = write_file(&path, &frame).expect("write");
        assert_eq!(written, path);
        assert_eq!(read_file(&path).expect("read"), frame);
    }

    #[test]
    fn missing_extension_is_appended() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data");
        let written = write_file(&path, &sample()).expect("write");
        assert!(written.to_string_lossy().ends_with(FILE_EXTENSION));
        assert!(written.exists());
    }

    #[test]
    fn zeroed_magic_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.df");
        write_file(&path, &sample()).expect("write");
        let mut bytes = fs::read(&path).expect("read bytes");
        bytes[0] = 0x00;
        bytes[1] = 0x00;
        fs::write(&path, &bytes).expect("rewrite");
        let err = read_file(&path).expect_err("bad magic");
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn arbitrary_file_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("noise.df");
        let mut file = fs::File::create(&path).expect("create");
        file.write_all(b"plain text, not a frame").expect("write");
        drop(file);
        let err = read_file(&path).expect_err("not a df file");
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_file(dir.path().join("absent.df")).expect_err("missing file");
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
