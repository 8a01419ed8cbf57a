// crates/canopen-core/src/emergency/state.rs

//! The Emergency producer/consumer's shared mutable state, wrapped by
//! `EmergencyCore` in an `Rc<RefCell<_>>` so the OD extensions
//! installed on 0x1014/0x1015/0x1003/status-bits can reach it without a
//! back-pointer into `EmergencyCore` itself (see DESIGN.md).

use super::can::CanErrorFlags;
use super::can::TxHandle;
use super::fifo::Fifo;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::Cell;

/// One received (or self-produced) emergency, delivered to the
/// registered consumer callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxEmergency {
    /// `0` for an emergency this node produced itself.
    pub node_id: u8,
    pub error_code: u16,
    pub error_register: u8,
    pub error_bit: u8,
    pub info_code: u32,
}

pub(crate) struct EmergencyState {
    pub(crate) error_register: &'static [Cell<u8>],
    pub(crate) error_status_bits: Vec<u8>,
    pub(crate) fifo: Fifo,
    pub(crate) producer_can_id: u16,
    pub(crate) producer_enabled: bool,
    pub(crate) node_id: u8,
    pub(crate) inhibit_time_us: u32,
    pub(crate) inhibit_timer_us: u32,
    pub(crate) can_error_status_old: CanErrorFlags,
    pub(crate) tx_handle: Option<TxHandle>,
    pub(crate) pre_signal: Option<Box<dyn FnMut()>>,
    pub(crate) rx_callback: Option<Box<dyn FnMut(RxEmergency)>>,
}
