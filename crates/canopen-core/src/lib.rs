#![cfg_attr(not(feature = "std"), no_std)]

// 'alloc' is used for dynamic allocation (e.g., the OD's extension
// registry and the Emergency history buffer).
extern crate alloc;

// --- Foundation Modules ---
pub mod types;
pub mod error;
pub mod codec;
pub(crate) mod log;

// --- Object Dictionary Access Layer ---
pub mod od;

// --- Emergency (EMCY) Producer/Consumer ---
pub mod emergency;

// --- Top-level Exports ---
pub use error::{CanError, EmergencyInitError, OdError};
pub use emergency::{
    CanErrorFlags, CanTransmit, EmergencyCore, EmergencyErrorCode, ProcessOutcome, RxEmergency,
    TxConfig, TxHandle,
};
pub use od::{Entry, ObjectDictionary, OdExtension, OdStatus};
pub use types::NodeId;
