// crates/canopen-core/src/error.rs

//! Crate-wide error taxonomy: OD-access errors (the CiA "ODR" result
//! codes), node-init errors, and the CAN-driver collaborator error.

use core::fmt;

/// Object Dictionary access result codes.
///
/// Returned synchronously from every OD read/write/resolution operation.
/// Each variant maps to a 32-bit CiA SDO abort code via [`OdError::abort_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OdError {
    Partial,
    OutOfMemory,
    UnsuppAccess,
    WriteOnly,
    ReadOnly,
    IdxNotExist,
    NoMap,
    MapLen,
    ParIncompat,
    DevIncompat,
    Hw,
    TypeMismatch,
    DataLong,
    DataShort,
    SubNotExist,
    InvalidValue,
    ValueHigh,
    ValueLow,
    MaxLessMin,
    NoResource,
    General,
    DataTransf,
    DataLocCtrl,
    DataDevState,
    OdMissing,
    NoData,
}

impl OdError {
    /// Maps this result code to the 32-bit CiA SDO abort code an SDO
    /// server would report for it.
    ///
    /// `DataDevState` and `OdMissing` are kept as distinct variants (the
    /// originating source's ODR table names both independently) but
    /// share one abort code, since both describe "no data available"
    /// for different reasons at the same wire result; see DESIGN.md.
    pub fn abort_code(self) -> u32 {
        match self {
            OdError::Partial => 0x0000_0000,
            OdError::OutOfMemory => 0x0500_0400,
            OdError::UnsuppAccess => 0x0601_0000,
            OdError::WriteOnly => 0x0601_0001,
            OdError::ReadOnly => 0x0601_0002,
            OdError::IdxNotExist => 0x0602_0000,
            OdError::NoMap => 0x0604_0041,
            OdError::MapLen => 0x0604_0042,
            OdError::ParIncompat => 0x0604_0043,
            OdError::DevIncompat => 0x0604_0047,
            OdError::Hw => 0x0606_0000,
            OdError::TypeMismatch => 0x0607_0010,
            OdError::DataLong => 0x0607_0012,
            OdError::DataShort => 0x0607_0013,
            OdError::SubNotExist => 0x0609_0011,
            OdError::InvalidValue => 0x0609_0030,
            OdError::ValueHigh => 0x0609_0031,
            OdError::ValueLow => 0x0609_0032,
            OdError::MaxLessMin => 0x0609_0036,
            OdError::NoResource => 0x060A_0023,
            OdError::General => 0x0800_0000,
            OdError::DataTransf => 0x0800_0020,
            OdError::DataLocCtrl => 0x0800_0021,
            OdError::DataDevState => 0x0800_0023,
            OdError::OdMissing => 0x0800_0023,
            OdError::NoData => 0x0800_0024,
        }
    }
}

impl fmt::Display for OdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OD access error {:?} (abort {:#010X})", self, self.abort_code())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for OdError {}

/// Fatal outcomes from a service's `init` call (e.g. the Emergency module).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyInitError {
    /// A required argument was missing/null, or out of its valid range
    /// (node id, producer COB-ID reserved bits).
    IllegalArgument,
    /// A required Object Dictionary entry could not be resolved.
    OdParameters(OdError),
}

impl fmt::Display for EmergencyInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmergencyInitError::IllegalArgument => write!(f, "illegal argument to Emergency::init"),
            EmergencyInitError::OdParameters(e) => write!(f, "OD parameter error during init: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EmergencyInitError {}

/// Errors surfaced by the CAN driver collaborator (see [`crate::can`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanError {
    /// The non-blocking transmit queue is full; caller should retry later.
    BufferFull,
    /// The requested CAN id or filter configuration was rejected by the driver.
    InvalidConfiguration,
    /// The transmit slot was never configured via `configure_tx`.
    NotConfigured,
}

impl fmt::Display for CanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanError::BufferFull => write!(f, "CAN transmit buffer full"),
            CanError::InvalidConfiguration => write!(f, "invalid CAN configuration"),
            CanError::NotConfigured => write!(f, "CAN transmit slot not configured"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CanError {}

impl From<CanError> for OdError {
    fn from(err: CanError) -> Self {
        match err {
            CanError::BufferFull => OdError::NoResource,
            CanError::InvalidConfiguration => OdError::InvalidValue,
            CanError::NotConfigured => OdError::DevIncompat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dev_state_and_od_missing_are_distinct_variants_same_abort_code() {
        // Open Question #1: preserve both names, but they share one
        // abort code; do not merge the variants, do not split the code.
        assert_ne!(OdError::DataDevState, OdError::OdMissing);
        assert_eq!(OdError::DataDevState.abort_code(), OdError::OdMissing.abort_code());
    }

    #[test]
    fn abort_codes_match_cia_table() {
        assert_eq!(OdError::IdxNotExist.abort_code(), 0x0602_0000);
        assert_eq!(OdError::TypeMismatch.abort_code(), 0x0607_0010);
        assert_eq!(OdError::DataLong.abort_code(), 0x0607_0012);
        assert_eq!(OdError::SubNotExist.abort_code(), 0x0609_0011);
        assert_eq!(OdError::InvalidValue.abort_code(), 0x0609_0030);
        assert_eq!(OdError::ParIncompat.abort_code(), 0x0604_0043);
        assert_eq!(OdError::DevIncompat.abort_code(), 0x0604_0047);
        assert_eq!(OdError::NoData.abort_code(), 0x0800_0024);
    }
}
