//! Purpose: Wrap token streams in DEFLATE plus the df file magic, and in Base64.
//! Exports: `FILE_MAGIC`, `compress`, `decompress`, `to_base64`, `from_base64`.
//! Role: The layer between the token codec and files or text transports.
//! Invariants: Compressed output always starts with the two magic bytes; the
//! Invariants: zlib header they replace is restored before inflation.
use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::core::codec;
use crate::core::error::{Error, ErrorKind};
use crate::core::frame::Frame;

/// The two leading bytes of every compressed frame: `df`.
pub const FILE_MAGIC: [u8; 2] = [0x64, 0x66];

// Header of a zlib stream at the default compression level.
const ZLIB_MAGIC: [u8; 2] = [0x78, 0x9C];

/// Serialises and deflates a frame, stamping the file magic over the
/// zlib header.
pub fn compress(frame: &Frame) -> Result<Vec<u8>, Error> {
    let tokens = codec::serialize(frame)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tokens).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("compression failed")
            .with_source(err)
    })?;
    let mut compressed = encoder.finish().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("compression failed")
            .with_source(err)
    })?;
    compressed[..2].copy_from_slice(&FILE_MAGIC);
    Ok(compressed)
}

/// Restores the zlib header, inflates and deserialises. The input must
/// carry the file magic.
pub fn decompress(bytes: &[u8]) -> Result<Frame, Error> {
    if bytes.len() < 2 || bytes[..2] != FILE_MAGIC {
        return Err(Error::new(ErrorKind::Format).with_message("missing df magic"));
    }
    let mut restored = bytes.to_vec();
    restored[..2].copy_from_slice(&ZLIB_MAGIC);
    let mut tokens = Vec::with_capacity(restored.len());
    ZlibDecoder::new(restored.as_slice())
        .read_to_end(&mut tokens)
        .map_err(|err| {
            Error::new(ErrorKind::Format)
                .with_message("invalid data format")
                .with_source(err)
        })?;
    codec::deserialize(&tokens)
}

/// Encodes the compressed frame as standard Base64 without line breaks.
pub fn to_base64(frame: &Frame) -> Result<String, Error> {
    Ok(STANDARD.encode(compress(frame)?))
}

/// Decodes a Base64 string produced by [`to_base64`].
pub fn from_base64(encoded: &str) -> Result<Frame, Error> {
    let bytes = STANDARD.decode(encoded).map_err(|err| {
        Error::new(ErrorKind::Format)
            .with_message("invalid base64 payload")
            .with_source(err)
    })?;
    decompress(&bytes)
}

#[cfg(test)]
mod tests {
    use super::{compress, decompress, from_base64, to_base64, FILE_MAGIC};
    use crate::core::column::{Column, Flavour};
    use crate::core::error::ErrorKind;
    use crate::core::frame::Frame;

    fn sample() -> Frame {
        Frame::with_named_columns(
            Flavour::Nullable,
            ["n", "s"],
            vec![
                Column::from(vec![Some(1i32), None, Some(3)]),
                Column::from(vec![Some("a,b"), None, Some("c<d")]),
            ],
        )
        .expect("frame")
    }

    #[test]
    fn compressed_frames_start_with_the_magic() {
        let bytes = compress(&sample()).expect("compress");
        assert_eq!(&bytes[..2], &FILE_MAGIC);
    }

    #[test]
    fn compress_round_trips() {
        let frame = sample();
        let bytes = compress(&frame).expect("compress");
        assert_eq!(decompress(&bytes).expect("decompress"), frame);
    }

    #[test]
    fn missing_magic_is_rejected() {
        let mut bytes = compress(&sample()).expect("compress");
        bytes[0] = 0x00;
        bytes[1] = 0x00;
        let err = decompress(&bytes).expect_err("no magic");
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn corrupted_body_is_a_format_error() {
        let mut bytes = compress(&sample()).expect("compress");
        let mid = bytes.len() / 2;
        for byte in &mut bytes[mid..] {
            *byte = !*byte;
        }
        let err = decompress(&bytes).expect_err("corrupt body");
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn base64_round_trips() {
        let frame = sample();
        let encoded = to_base64(&frame).expect("encode");
        assert!(!encoded.contains('\n'));
        // The df magic survives the Base64 envelope.
        assert!(encoded.starts_with("ZGZ"));
        assert_eq!(from_base64(&encoded).expect("decode"), frame);
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err = from_base64("not*base64*at*all").expect_err("bad base64");
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
