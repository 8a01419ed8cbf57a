// crates/canopen-core/src/emergency/mod.rs

//! The Emergency (EMCY) producer/consumer: error-status bookkeeping,
//! history buffer, inhibit-paced frame transmission, and the OD
//! extensions that expose it through 0x1014/0x1015/0x1003 and the
//! manufacturer status-bits entry.

mod can;
mod codes;
mod extensions;
mod fifo;
mod state;

pub use can::{CanErrorFlags, CanTransmit, TxConfig, TxHandle};
pub use codes::EmergencyErrorCode;
pub use state::RxEmergency;

use crate::codec::{read_u16_le, read_u32_le};
use crate::error::{CanError, EmergencyInitError, OdError};
use crate::log::{my_trace, my_warn};
use crate::od::{Entry, ObjectDictionary};
use crate::types::NodeId;
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec;
use core::cell::RefCell;
use extensions::{CobIdExtension, InhibitTimeExtension, StatusBitsExtension};
use fifo::{Fifo, Overflow};
use state::EmergencyState;

struct LogCtx(u8);
impl crate::log::LogMetadata for LogCtx {
    fn meta(&self) -> alloc::string::String {
        alloc::format!("emcy node_id={}", self.0)
    }
}

#[cfg(feature = "emcy-history")]
use extensions::PredefinedErrorFieldExtension;

/// Number of error-status condition bits tracked, default configuration
/// (`EM_ERR_STATUS_BITS_COUNT`, §6: a multiple of 8 in `[48, 256]`).
pub const DEFAULT_ERR_STATUS_BITS_COUNT: usize = 48;
/// Default history/producer buffer depth (`EM_BUFFER_SIZE`, §6: `[1, 254]`).
pub const DEFAULT_BUFFER_SIZE: usize = 8;

/// Result of one `process` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub frame_sent: bool,
    pub error_register: u8,
}

const EDGE_TABLE: &[(CanErrorFlags, u8, EmergencyErrorCode)] = &[
    (CanErrorFlags::TX_WARN.union(CanErrorFlags::RX_WARN), codes::CO_EM_CAN_BUS_WARNING, EmergencyErrorCode::Generic),
    (CanErrorFlags::TX_PASSIVE, codes::CO_EM_CAN_TX_BUS_PASSIVE, EmergencyErrorCode::CanPassive),
    (CanErrorFlags::TX_BUS_OFF, codes::CO_EM_CAN_TX_BUS_OFF, EmergencyErrorCode::BusOffRecovered),
    (CanErrorFlags::TX_OVERFLOW, codes::CO_EM_CAN_TX_OVERFLOW, EmergencyErrorCode::CanOverrun),
    (CanErrorFlags::TX_PDO_LATE, codes::CO_EM_TPDO_LATE, EmergencyErrorCode::Communication),
    (CanErrorFlags::RX_PASSIVE, codes::CO_EM_CAN_RX_BUS_PASSIVE, EmergencyErrorCode::CanPassive),
    (CanErrorFlags::RX_OVERFLOW, codes::CO_EM_CAN_RXB_OVERFLOW, EmergencyErrorCode::CanOverrun),
];

/// Bitmask categories contributing to the Error Register (0x1001),
/// following the CiA 301 layout: bit 0 generic, bit 4 communication,
/// bit 7 manufacturer-specific. This crate only distinguishes
/// communication-class conditions (the CAN-driver edges) from
/// everything else, since the illustrative bit table does not carry
/// current/voltage/temperature distinctions of its own.
fn bit_category(bit: u8) -> u8 {
    match bit {
        codes::CO_EM_CAN_BUS_WARNING
        | codes::CO_EM_CAN_TX_BUS_PASSIVE
        | codes::CO_EM_CAN_TX_BUS_OFF
        | codes::CO_EM_CAN_TX_OVERFLOW
        | codes::CO_EM_TPDO_LATE
        | codes::CO_EM_CAN_RX_BUS_PASSIVE
        | codes::CO_EM_CAN_RXB_OVERFLOW => 1 << 4,
        codes::CO_EM_WRONG_ERROR_REPORT | codes::CO_EM_EMERGENCY_BUFFER_FULL => 1 << 0,
        _ => 1 << 7,
    }
}

fn compute_error_register(shared: &EmergencyState) -> u8 {
    let mut reg = 0u8;
    for (byte_idx, &byte) in shared.error_status_bits.iter().enumerate() {
        if byte == 0 {
            continue;
        }
        for bit_in_byte in 0..8u8 {
            if byte & (1 << bit_in_byte) != 0 {
                reg |= bit_category((byte_idx as u8) * 8 + bit_in_byte);
            }
        }
    }
    reg
}

fn build_frame(message_word: u32, info_word: u32) -> [u8; 8] {
    let mut frame = [0u8; 8];
    frame[0..4].copy_from_slice(&message_word.to_le_bytes());
    frame[4..8].copy_from_slice(&info_word.to_le_bytes());
    frame
}

/// The Emergency producer/consumer core.
///
/// Generic over the CAN driver collaborator rather than boxed as a
/// trait object, matching the teacher's preference for a generic bound
/// (e.g. `DllErrorManager<C: ErrorCounters, H: ErrorHandler>`) over
/// dynamic dispatch at this layer; only the OD's own extension registry
/// needs `dyn` erasure, one level up.
pub struct EmergencyCore<C: CanTransmit> {
    shared: Rc<RefCell<EmergencyState>>,
    can: Rc<RefCell<C>>,
}

impl<C: CanTransmit> EmergencyCore<C> {
    /// Zeroes Emergency state, resolves the error register, validates
    /// and applies the initial producer COB-ID, and installs the OD
    /// extensions for 0x1014, 0x1015 (if supplied), 0x1003 (if supplied
    /// and the `emcy-history` feature is enabled), and the
    /// manufacturer status-bits entry (if supplied).
    #[allow(clippy::too_many_arguments)]
    pub fn init<'a>(
        od: &mut ObjectDictionary<'a>,
        can: C,
        node_id: NodeId,
        error_register_entry: &'static Entry,
        cobid_entry: &'static Entry,
        inhibit_entry: Option<&'static Entry>,
        preerr_entry: Option<&'static Entry>,
        statusbits_entry: Option<&'static Entry>,
    ) -> Result<Self, EmergencyInitError> {
        let error_register =
            od.get_ptr(error_register_entry, 0).map_err(EmergencyInitError::OdParameters)?;

        let mut cobid_buf = [0u8; 4];
        od.get_value(cobid_entry, 0, &mut cobid_buf, true)
            .map_err(EmergencyInitError::OdParameters)?;
        let raw = read_u32_le(&cobid_buf);
        if raw & 0x7FFF_F800 != 0 {
            return Err(EmergencyInitError::IllegalArgument);
        }
        let can_id = (raw & 0x7FF) as u16;
        let producer_enabled = (raw & (1 << 31)) == 0 && can_id != 0;

        let shared = Rc::new(RefCell::new(EmergencyState {
            error_register,
            error_status_bits: vec![0u8; DEFAULT_ERR_STATUS_BITS_COUNT / 8],
            fifo: Fifo::new(DEFAULT_BUFFER_SIZE),
            producer_can_id: can_id,
            producer_enabled,
            node_id: node_id.get(),
            inhibit_time_us: 0,
            inhibit_timer_us: 0,
            can_error_status_old: CanErrorFlags::NONE,
            tx_handle: None,
            pre_signal: None,
            rx_callback: None,
        }));
        let can = Rc::new(RefCell::new(can));

        if producer_enabled {
            let effective_id = if can_id == 0x80 { 0x80 + node_id.get() as u16 } else { can_id };
            let handle = can
                .borrow_mut()
                .configure_tx(TxConfig { can_id: effective_id, rtr: false, dlc: 8 })
                .map_err(|_: CanError| EmergencyInitError::IllegalArgument)?;
            shared.borrow_mut().tx_handle = Some(handle);
        }

        od.install_extension(
            cobid_entry,
            Box::new(CobIdExtension { shared: Rc::clone(&shared), can: Rc::clone(&can) }),
        )
        .map_err(EmergencyInitError::OdParameters)?;

        if let Some(entry) = inhibit_entry {
            od.install_extension(entry, Box::new(InhibitTimeExtension { shared: Rc::clone(&shared) }))
                .map_err(EmergencyInitError::OdParameters)?;
        }

        #[cfg(feature = "emcy-history")]
        if let Some(entry) = preerr_entry {
            od.install_extension(
                entry,
                Box::new(PredefinedErrorFieldExtension { shared: Rc::clone(&shared) }),
            )
            .map_err(EmergencyInitError::OdParameters)?;
        }
        #[cfg(not(feature = "emcy-history"))]
        let _ = preerr_entry;

        if let Some(entry) = statusbits_entry {
            od.install_extension(entry, Box::new(StatusBitsExtension { shared: Rc::clone(&shared) }))
                .map_err(EmergencyInitError::OdParameters)?;
        }

        my_trace!(LogCtx(node_id.get()), "initialized, producer_enabled={}", producer_enabled);
        Ok(EmergencyCore { shared, can })
    }

    /// Registers a "work pending" signal invoked after `error(...)`
    /// enqueues an entry, to wake a worker task that runs `process`.
    pub fn set_pre_signal(&mut self, cb: impl FnMut() + 'static) {
        self.shared.borrow_mut().pre_signal = Some(Box::new(cb));
    }

    /// Registers the application callback invoked for every received
    /// (and self-produced) emergency, and installs the CAN receive
    /// filter for the standard EMCY COB-ID range.
    #[cfg(feature = "emcy-consumer")]
    pub fn set_rx_callback(&mut self, cb: impl FnMut(RxEmergency) + 'static) -> Result<(), CanError> {
        self.can.borrow_mut().configure_rx_filter(0x80, 0x780)?;
        self.shared.borrow_mut().rx_callback = Some(Box::new(cb));
        Ok(())
    }

    /// Feeds one received CAN frame into the consumer path. Frames with
    /// ident `0x80` (Sync) are discarded.
    #[cfg(feature = "emcy-consumer")]
    pub fn on_can_frame(&mut self, can_id: u16, data: &[u8; 8]) {
        if can_id == 0x80 {
            return;
        }
        let error_code = read_u16_le(&data[0..2]);
        let error_register = data[2];
        let error_bit = data[3];
        let info_code = read_u32_le(&data[4..8]);
        let node_id = (can_id.wrapping_sub(0x80) & 0x7F) as u8;

        let mut shared = self.shared.borrow_mut();
        if let Some(cb) = shared.rx_callback.as_mut() {
            cb(RxEmergency { node_id, error_code, error_register, error_bit, info_code });
        }
    }

    /// The reporting entry point. Sets or clears one bit in
    /// `error_status_bits` and, if the bit changed, enqueues an
    /// emergency message.
    pub fn error(&mut self, set: bool, bit: u8, code: EmergencyErrorCode, info: u32) {
        let mut shared = self.shared.borrow_mut();
        let n_bytes = shared.error_status_bits.len();
        let idx = (bit >> 3) as usize;
        let (bit, code, info) = if idx >= n_bytes {
            my_warn!("error report for bit {} exceeds {} tracked bits, redirecting", bit, n_bytes * 8);
            (codes::CO_EM_WRONG_ERROR_REPORT, EmergencyErrorCode::SoftwareInternal, bit as u32)
        } else {
            (bit, code, info)
        };

        let idx = (bit >> 3) as usize;
        let mask = 1u8 << (bit & 7);
        let currently_set = shared.error_status_bits[idx] & mask != 0;

        let final_code = if set {
            if currently_set {
                return;
            }
            shared.error_status_bits[idx] |= mask;
            code
        } else {
            if !currently_set {
                return;
            }
            shared.error_status_bits[idx] &= !mask;
            EmergencyErrorCode::NoError
        };

        let code_bytes = final_code.code().to_le_bytes();
        let message_word = u32::from_le_bytes([code_bytes[0], code_bytes[1], 0, bit]);
        if !shared.fifo.push(message_word, info) {
            shared.fifo.overflow = Overflow::Raised;
        }
        if let Some(cb) = shared.pre_signal.as_mut() {
            cb();
        }
    }

    pub fn error_report(&mut self, bit: u8, code: EmergencyErrorCode, info: u32) {
        self.error(true, bit, code, info);
    }

    pub fn error_reset(&mut self, bit: u8) {
        self.error(false, bit, EmergencyErrorCode::NoError, 0);
    }

    /// Periodic step: detects CAN-driver error edges, recomputes the
    /// error register, and dispatches at most one queued emergency
    /// frame, subject to inhibit-time pacing.
    pub fn process(
        &mut self,
        nmt_is_pre_or_operational: bool,
        time_delta_us: u32,
        out_timer_next_us: Option<&mut u32>,
    ) -> ProcessOutcome {
        let new_status = self.can.borrow().error_status();
        let old_status = self.shared.borrow().can_error_status_old;
        for &(flag, bit, code) in EDGE_TABLE {
            let was = old_status.contains(flag);
            let now = new_status.contains(flag);
            if was != now {
                self.error(now, bit, code, 0);
            }
        }
        self.shared.borrow_mut().can_error_status_old = new_status;

        let register_value = compute_error_register(&self.shared.borrow());
        self.shared.borrow().error_register[0].set(register_value);

        let mut shared = self.shared.borrow_mut();
        if shared.inhibit_timer_us < shared.inhibit_time_us {
            shared.inhibit_timer_us = shared.inhibit_timer_us.saturating_add(time_delta_us);
        }

        let mut frame_sent = false;
        if !shared.fifo.is_empty() && shared.inhibit_timer_us >= shared.inhibit_time_us {
            let tx_handle = shared.tx_handle;
            let producer_enabled = shared.producer_enabled;
            shared.fifo.patch_head_msg_word(|w| {
                let mut bytes = w.to_le_bytes();
                bytes[2] = register_value;
                u32::from_le_bytes(bytes)
            });
            let (message_word, info_word) = shared.fifo.peek_head().expect("checked non-empty above");

            let mut dispatched = true;
            if producer_enabled && nmt_is_pre_or_operational {
                if let Some(handle) = tx_handle {
                    let frame = build_frame(message_word, info_word);
                    match self.can.borrow_mut().send(handle, &frame) {
                        Ok(()) => frame_sent = true,
                        Err(CanError::BufferFull) => dispatched = false,
                        Err(_) => {}
                    }
                }
            }

            if dispatched {
                shared.inhibit_timer_us = 0;
                #[cfg(feature = "emcy-consumer")]
                if let Some(cb) = shared.rx_callback.as_mut() {
                    let bytes = message_word.to_le_bytes();
                    cb(RxEmergency {
                        node_id: 0,
                        error_code: u16::from_le_bytes([bytes[0], bytes[1]]),
                        error_register: register_value,
                        error_bit: bytes[3],
                        info_code: info_word,
                    });
                }
                shared.fifo.pop_head();

                let overflow = shared.fifo.overflow;
                let now_empty = shared.fifo.is_empty();
                match overflow {
                    Overflow::Raised => {
                        shared.fifo.overflow = Overflow::Clearing;
                        drop(shared);
                        self.error(true, codes::CO_EM_EMERGENCY_BUFFER_FULL, EmergencyErrorCode::Generic, 0);
                        shared = self.shared.borrow_mut();
                    }
                    Overflow::Clearing if now_empty => {
                        shared.fifo.overflow = Overflow::None;
                        drop(shared);
                        self.error(false, codes::CO_EM_EMERGENCY_BUFFER_FULL, EmergencyErrorCode::NoError, 0);
                        shared = self.shared.borrow_mut();
                    }
                    _ => {}
                }
            }
        }

        if let Some(out) = out_timer_next_us {
            if !shared.fifo.is_empty() && shared.inhibit_timer_us < shared.inhibit_time_us {
                let remaining = shared.inhibit_time_us - shared.inhibit_timer_us;
                *out = (*out).min(remaining);
            }
        }

        ProcessOutcome { frame_sent, error_register: register_value }
    }
}
