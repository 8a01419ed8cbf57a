// crates/canopen-core/src/emergency/extensions.rs

//! OD extensions installed by [`super::EmergencyCore::init`].
//!
//! Each extension holds an `Rc<RefCell<_>>` clone of the Emergency
//! state/driver handles rather than a back-pointer into
//! `EmergencyCore` itself: the core owns the canonical `Rc`, the OD's
//! registry holds non-owning-in-spirit clones, breaking the
//! OD-borrows-service / service-borrows-OD cycle without `unsafe`. See
//! DESIGN.md for the full rationale.

use super::can::{CanTransmit, TxConfig};
use super::state::EmergencyState;
use crate::codec::{read_u16_le, read_u32_le, write_u32_le};
use crate::error::OdError;
use crate::od::{self, OdExtension, OdStatus, Stream};
use alloc::rc::Rc;
use core::cell::RefCell;

fn write_u32_le_cells(data: &[core::cell::Cell<u8>], value: u32) {
    let bytes = value.to_le_bytes();
    for (cell, byte) in data.iter().zip(bytes.iter()) {
        cell.set(*byte);
    }
}

/// Overrides reads and writes of 0x1014 COB-ID EMCY.
pub struct CobIdExtension<C: CanTransmit> {
    pub(super) shared: Rc<RefCell<EmergencyState>>,
    pub(super) can: Rc<RefCell<C>>,
}

impl<C: CanTransmit> OdExtension for CobIdExtension<C> {
    fn read(
        &mut self,
        stream: &mut Stream,
        _sub_index: u8,
        buf: &mut [u8],
    ) -> Result<(OdStatus, usize), OdError> {
        if buf.len() != 4 || stream.data_offset != 0 {
            return Err(OdError::DevIncompat);
        }
        let shared = self.shared.borrow();
        let effective_id = effective_can_id(shared.producer_can_id, shared.node_id);
        let disable_bit: u32 = if shared.producer_enabled { 0 } else { 1 << 31 };
        let value = disable_bit | (effective_id as u32 & 0x7FF);
        write_u32_le(buf, value);
        Ok((OdStatus::Ok, 4))
    }

    fn write(
        &mut self,
        stream: &mut Stream,
        _sub_index: u8,
        buf: &[u8],
    ) -> Result<(OdStatus, usize), OdError> {
        if buf.len() != 4 || stream.data_offset != 0 {
            return Err(OdError::DevIncompat);
        }
        let raw = read_u32_le(buf);
        if raw & 0x7FFF_F800 != 0 {
            return Err(OdError::InvalidValue);
        }
        let new_can_id = (raw & 0x7FF) as u16;
        let new_enabled = (raw & (1 << 31)) == 0 && new_can_id != 0;

        let mut shared = self.shared.borrow_mut();
        if shared.producer_enabled
            && new_enabled
            && new_can_id != shared.producer_can_id
            && new_can_id != 0
        {
            return Err(OdError::InvalidValue);
        }

        let was_enabled = shared.producer_enabled;
        shared.producer_can_id = new_can_id;
        shared.producer_enabled = new_enabled;

        if new_enabled && !was_enabled {
            let effective_id = effective_can_id(new_can_id, shared.node_id);
            let handle = self
                .can
                .borrow_mut()
                .configure_tx(TxConfig { can_id: effective_id, rtr: false, dlc: 8 })?;
            shared.tx_handle = Some(handle);
        }
        drop(shared);

        write_u32_le_cells(stream.data, raw);
        Ok((OdStatus::Ok, 4))
    }
}

fn effective_can_id(stored: u16, node_id: u8) -> u16 {
    if stored == 0x80 { 0x80 + node_id as u16 } else { stored }
}

/// Overrides writes of 0x1015 Inhibit time EMCY; reads fall through to
/// the default byte-copy path (the value is never computed).
pub struct InhibitTimeExtension {
    pub(super) shared: Rc<RefCell<EmergencyState>>,
}

impl OdExtension for InhibitTimeExtension {
    fn read(
        &mut self,
        stream: &mut Stream,
        _sub_index: u8,
        buf: &mut [u8],
    ) -> Result<(OdStatus, usize), OdError> {
        od::default_read(stream, buf)
    }

    fn write(
        &mut self,
        stream: &mut Stream,
        _sub_index: u8,
        buf: &[u8],
    ) -> Result<(OdStatus, usize), OdError> {
        if buf.len() != 2 || stream.data_offset != 0 {
            return Err(OdError::DevIncompat);
        }
        let value = read_u16_le(buf);
        {
            let mut shared = self.shared.borrow_mut();
            shared.inhibit_time_us = value as u32 * 100;
            shared.inhibit_timer_us = 0;
        }
        od::default_write(stream, buf)
    }
}

/// Overrides reads and writes of 0x1003 Predefined error field.
#[cfg(feature = "emcy-history")]
pub struct PredefinedErrorFieldExtension {
    pub(super) shared: Rc<RefCell<EmergencyState>>,
}

#[cfg(feature = "emcy-history")]
impl OdExtension for PredefinedErrorFieldExtension {
    fn read(
        &mut self,
        _stream: &mut Stream,
        sub_index: u8,
        buf: &mut [u8],
    ) -> Result<(OdStatus, usize), OdError> {
        let shared = self.shared.borrow();
        if sub_index == 0 {
            if buf.len() != 1 {
                return Err(OdError::DevIncompat);
            }
            buf[0] = shared.fifo.count as u8;
            Ok((OdStatus::Ok, 1))
        } else {
            if buf.len() != 4 {
                return Err(OdError::DevIncompat);
            }
            match shared.fifo.nth_newest_msg_word(sub_index as usize) {
                Some(word) => {
                    write_u32_le(buf, word);
                    Ok((OdStatus::Ok, 4))
                }
                None => Err(OdError::NoData),
            }
        }
    }

    fn write(
        &mut self,
        _stream: &mut Stream,
        sub_index: u8,
        buf: &[u8],
    ) -> Result<(OdStatus, usize), OdError> {
        if sub_index != 0 {
            return Err(OdError::ReadOnly);
        }
        if buf.len() != 1 {
            return Err(OdError::DevIncompat);
        }
        if buf[0] != 0 {
            return Err(OdError::InvalidValue);
        }
        self.shared.borrow_mut().fifo.clear();
        Ok((OdStatus::Ok, 1))
    }
}

/// Overrides reads and writes of the manufacturer status-bits entry,
/// acting directly on `error_status_bits` rather than the entry's own
/// `'static` backing cells.
pub struct StatusBitsExtension {
    pub(super) shared: Rc<RefCell<EmergencyState>>,
}

impl OdExtension for StatusBitsExtension {
    fn read(
        &mut self,
        stream: &mut Stream,
        _sub_index: u8,
        buf: &mut [u8],
    ) -> Result<(OdStatus, usize), OdError> {
        let shared = self.shared.borrow();
        let total = shared.error_status_bits.len().min(stream.data_length);
        if stream.data_offset >= total {
            return Err(OdError::DevIncompat);
        }
        let remaining = total - stream.data_offset;
        let count = buf.len().min(remaining);
        buf[..count]
            .copy_from_slice(&shared.error_status_bits[stream.data_offset..stream.data_offset + count]);
        if remaining > buf.len() {
            stream.data_offset += buf.len();
            Ok((OdStatus::Partial, buf.len()))
        } else {
            stream.data_offset = 0;
            Ok((OdStatus::Ok, remaining))
        }
    }

    fn write(
        &mut self,
        stream: &mut Stream,
        _sub_index: u8,
        buf: &[u8],
    ) -> Result<(OdStatus, usize), OdError> {
        let mut shared = self.shared.borrow_mut();
        let total = shared.error_status_bits.len().min(stream.data_length);
        if stream.data_offset >= total {
            return Err(OdError::DevIncompat);
        }
        let remaining = total - stream.data_offset;
        let count = buf.len();
        if count > remaining {
            return Err(OdError::DataLong);
        }
        shared.error_status_bits[stream.data_offset..stream.data_offset + count].copy_from_slice(buf);
        if count < remaining {
            stream.data_offset += count;
            Ok((OdStatus::Partial, count))
        } else {
            stream.data_offset = 0;
            Ok((OdStatus::Ok, count))
        }
    }
}
