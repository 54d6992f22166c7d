//! Record Frames
//!
//! Encoding and decoding of the length-prefixed, checksummed frames that
//! make up `records.dat`.

use std::io::{self, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, VtError};

use super::{Record, DATA_HEADER_SIZE, DATA_MAGIC, FRAME_HEADER_SIZE, MAX_FRAME_PAYLOAD, VERSION};

/// Outcome of reading one frame
#[derive(Debug)]
pub(crate) enum FrameRead {
    /// A complete, checksum-valid frame
    Frame {
        record: Record,
        /// Bytes occupied on disk (header + payload)
        len: u64,
    },

    /// Clean end of file on a frame boundary
    End,

    /// File ends in the middle of a frame (partial write)
    Torn,
}

/// Write the record file header into a fresh file
pub(crate) fn write_data_header<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_all(DATA_MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    Ok(())
}

/// Validate the record file header at the reader's current position
pub(crate) fn check_data_header<R: Read>(reader: &mut R) -> Result<()> {
    let mut header = [0u8; DATA_HEADER_SIZE as usize];
    if read_full(reader, &mut header)? < header.len() {
        return Err(VtError::Corruption("Record file header truncated".to_string()));
    }
    if &header[0..4] != DATA_MAGIC {
        return Err(VtError::Corruption(format!(
            "Invalid record file magic: expected VTRS, got {:?}",
            &header[0..4]
        )));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != VERSION {
        return Err(VtError::Storage(format!(
            "Unsupported record file version: {}",
            version
        )));
    }
    Ok(())
}

/// Encode a record as `[len(4)][crc(4)][bincode payload]`
pub(crate) fn encode_frame(record: &Record) -> Result<Bytes> {
    let payload = bincode::serialize(record)?;
    if payload.len() > MAX_FRAME_PAYLOAD as usize {
        return Err(VtError::Storage(format!(
            "Record {} too large: {} bytes",
            record.key,
            payload.len()
        )));
    }

    let crc = crc32fast::hash(&payload);

    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.put_u32_le(payload.len() as u32);
    buf.put_u32_le(crc);
    buf.put_slice(&payload);
    Ok(buf.freeze())
}

/// Read the next frame from `reader`
///
/// A checksum mismatch or an undecodable payload is a corruption error;
/// running out of bytes mid-frame is reported as `Torn`.
pub(crate) fn read_frame<R: Read>(reader: &mut R) -> Result<FrameRead> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    let got = read_full(reader, &mut header)?;
    if got == 0 {
        return Ok(FrameRead::End);
    }
    if got < FRAME_HEADER_SIZE {
        return Ok(FrameRead::Torn);
    }

    let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    if len > MAX_FRAME_PAYLOAD {
        return Err(VtError::Corruption(format!(
            "Frame declares {} byte payload (max {})",
            len, MAX_FRAME_PAYLOAD
        )));
    }

    let mut payload = vec![0u8; len as usize];
    if read_full(reader, &mut payload)? < payload.len() {
        return Ok(FrameRead::Torn);
    }

    let actual = crc32fast::hash(&payload);
    if actual != crc {
        return Err(VtError::Corruption(format!(
            "Frame CRC mismatch: expected {:08x}, got {:08x}",
            crc, actual
        )));
    }

    let record: Record = bincode::deserialize(&payload)
        .map_err(|e| VtError::Corruption(format!("Undecodable frame payload: {}", e)))?;

    Ok(FrameRead::Frame {
        record,
        len: (FRAME_HEADER_SIZE + payload.len()) as u64,
    })
}

/// Fill `buf` as far as the reader allows; returns bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
