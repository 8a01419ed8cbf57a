// crates/canopen-core/src/od/io.rs

//! Default byte-copy I/O and the I/O pair returned by `get_sub`.

use super::stream::{OdStatus, Stream};
use super::ObjectDictionary;
use crate::error::OdError;
use log::trace;

/// Which implementation an [`IoPair`] dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IoKind {
    Default,
    Extension,
}

/// Metadata about a resolved sub-object, returned alongside its
/// [`IoPair`] by `get_sub`.
#[derive(Debug, Clone, Copy)]
pub struct SubInfo {
    pub attribute: crate::types::Attribute,
    pub data_length: usize,
}

/// A resolved sub-object: its cursor plus the read/write implementation
/// to use (default byte-copy, or a registered extension).
pub struct IoPair {
    pub stream: Stream,
    kind: IoKind,
    index: u16,
}

impl IoPair {
    pub(super) fn new(stream: Stream, extended_and_active: bool, index: u16) -> Self {
        IoPair {
            stream,
            kind: if extended_and_active { IoKind::Extension } else { IoKind::Default },
            index,
        }
    }

    /// Reads `buf.len()` bytes, continuing a segmented transfer from the
    /// stream's current `data_offset`.
    pub fn read<'a>(
        &mut self,
        od: &mut ObjectDictionary<'a>,
        sub_index: u8,
        buf: &mut [u8],
    ) -> Result<OdStatus, OdError> {
        let (status, _n) = match self.kind {
            IoKind::Default => default_read(&mut self.stream, buf)?,
            IoKind::Extension => od.dispatch_extension_read(self.index, &mut self.stream, sub_index, buf)?,
        };
        Ok(status)
    }

    /// Writes `buf`, continuing a segmented transfer from the stream's
    /// current `data_offset`.
    pub fn write<'a>(
        &mut self,
        od: &mut ObjectDictionary<'a>,
        sub_index: u8,
        buf: &[u8],
    ) -> Result<OdStatus, OdError> {
        let (status, _n) = match self.kind {
            IoKind::Default => default_write(&mut self.stream, buf)?,
            IoKind::Extension => od.dispatch_extension_write(self.index, &mut self.stream, sub_index, buf)?,
        };
        Ok(status)
    }
}

/// Default byte-copy read (see module docs on `ObjectDictionary::get_sub`
/// for the segmented-transfer contract this implements).
pub fn default_read(stream: &mut Stream, buf: &mut [u8]) -> Result<(OdStatus, usize), OdError> {
    if stream.data.is_empty() {
        return Err(OdError::SubNotExist);
    }
    if stream.data_offset >= stream.data_length {
        return Err(OdError::DevIncompat);
    }
    let remaining = stream.data_length - stream.data_offset;
    let count = buf.len();
    if remaining > count {
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = stream.data[stream.data_offset + i].get();
        }
        stream.data_offset += count;
        trace!("OD default read: partial, {} bytes, offset now {}", count, stream.data_offset);
        Ok((OdStatus::Partial, count))
    } else {
        for (i, slot) in buf.iter_mut().enumerate().take(remaining) {
            *slot = stream.data[stream.data_offset + i].get();
        }
        stream.data_offset = 0;
        trace!("OD default read: complete, {} bytes", remaining);
        Ok((OdStatus::Ok, remaining))
    }
}

/// Default byte-copy write, mirroring [`default_read`]. Rejects a final
/// call that supplies more bytes than remain with `DataLong`.
pub fn default_write(stream: &mut Stream, buf: &[u8]) -> Result<(OdStatus, usize), OdError> {
    if stream.data.is_empty() {
        return Err(OdError::SubNotExist);
    }
    if stream.data_offset >= stream.data_length {
        return Err(OdError::DevIncompat);
    }
    let remaining = stream.data_length - stream.data_offset;
    let count = buf.len();
    if count < remaining {
        for (i, byte) in buf.iter().enumerate() {
            stream.data[stream.data_offset + i].set(*byte);
        }
        stream.data_offset += count;
        Ok((OdStatus::Partial, count))
    } else if count == remaining {
        for (i, byte) in buf.iter().enumerate() {
            stream.data[stream.data_offset + i].set(*byte);
        }
        stream.data_offset = 0;
        Ok((OdStatus::Ok, remaining))
    } else {
        Err(OdError::DataLong)
    }
}
