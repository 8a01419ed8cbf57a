// crates/canopen-core/src/od/extension.rs

//! Per-entry I/O override mechanism.
//!
//! The catalog itself never holds extension state: per the arena/index
//! style favored over raw pointer-identity comparisons, installed
//! extensions live in [`super::ObjectDictionary`]'s own registry, keyed
//! by entry index. This also breaks the cyclic reference a service's
//! extension would otherwise hold back into the OD that owns it: the
//! registry holds a boxed trait object, not a pointer back to the OD.

use super::stream::{OdStatus, Stream};
use crate::error::OdError;

/// A per-entry read/write override, installed once at service init.
///
/// Implementors typically close over a handle to the owning service's
/// own state (e.g. `Rc<RefCell<EmergencyCore>>`) rather than storing
/// that state directly, so several extensions can share one service.
pub trait OdExtension {
    /// Reads `buf.len()` bytes starting at `stream.data_offset`.
    fn read(
        &mut self,
        stream: &mut Stream,
        sub_index: u8,
        buf: &mut [u8],
    ) -> Result<(OdStatus, usize), OdError>;

    /// Writes `buf` starting at `stream.data_offset`.
    fn write(
        &mut self,
        stream: &mut Stream,
        sub_index: u8,
        buf: &[u8],
    ) -> Result<(OdStatus, usize), OdError>;
}

/// Extension stub installed for an `extended` entry with nothing
/// registered yet: any access fails with `UnsuppAccess`.
pub struct DisabledExtension;

impl OdExtension for DisabledExtension {
    fn read(
        &mut self,
        _stream: &mut Stream,
        _sub_index: u8,
        _buf: &mut [u8],
    ) -> Result<(OdStatus, usize), OdError> {
        Err(OdError::UnsuppAccess)
    }

    fn write(
        &mut self,
        _stream: &mut Stream,
        _sub_index: u8,
        _buf: &[u8],
    ) -> Result<(OdStatus, usize), OdError> {
        Err(OdError::UnsuppAccess)
    }
}
