// crates/canopen-core/src/od/catalog.rs

//! An illustrative OD catalog: the mandatory communication entries plus
//! a couple of representative application entries.
//!
//! This plays the role of the teacher's `od::utils::new_cn_default`
//! generator output, adapted to a `'static` table since this crate has
//! no EDS/DCF code-generation input (that tooling is out of scope).

use super::{ArrayDescriptor, Entry, EntryKind, RecordDescriptor, RecordField, VarDescriptor};
use crate::types::Attribute;
use core::cell::Cell;

static DEVICE_TYPE: [Cell<u8>; 4] = [Cell::new(0); 4];
static ERROR_REGISTER: [Cell<u8>; 1] = [Cell::new(0)];

// 0x1003 Predefined Error Field: sub 0 (count) + up to 8 newest 32-bit
// message words. Entirely extension-managed at runtime; this backing
// only serves `od_orig = true` / zero-copy access.
static PREDEF_ERR_COUNT: [Cell<u8>; 1] = [Cell::new(0)];
static PREDEF_ERR_ELEMENTS: [Cell<u8>; 8 * 4] = [Cell::new(0); 8 * 4];

static COBID_EMCY: [Cell<u8>; 4] = [Cell::new(0x80), Cell::new(0x00), Cell::new(0x00), Cell::new(0x00)];
static INHIBIT_TIME_EMCY: [Cell<u8>; 2] = [Cell::new(0); 2];
static MANUFACTURER_STATUS_BITS: [Cell<u8>; 6] = [Cell::new(0); 6];

static IDENTITY_SUB0: [Cell<u8>; 1] = [Cell::new(4)];
static IDENTITY_VENDOR_ID: [Cell<u8>; 4] = [Cell::new(0); 4];
static IDENTITY_PRODUCT_CODE: [Cell<u8>; 4] = [Cell::new(0); 4];
static IDENTITY_REVISION: [Cell<u8>; 4] = [Cell::new(0); 4];
static IDENTITY_SERIAL: [Cell<u8>; 4] = [Cell::new(0); 4];

static IDENTITY_FIELDS: [RecordField; 4] = [
    RecordField { sub_index: 1, var: VarDescriptor { data: &IDENTITY_VENDOR_ID, attribute: Attribute::SDO_R } },
    RecordField { sub_index: 2, var: VarDescriptor { data: &IDENTITY_PRODUCT_CODE, attribute: Attribute::SDO_R } },
    RecordField { sub_index: 3, var: VarDescriptor { data: &IDENTITY_REVISION, attribute: Attribute::SDO_R } },
    RecordField { sub_index: 4, var: VarDescriptor { data: &IDENTITY_SERIAL, attribute: Attribute::SDO_R } },
];

// 0x1016 Consumer heartbeat time: representative plain array entry, two
// elements, non-extended.
static HEARTBEAT_SUB0: [Cell<u8>; 1] = [Cell::new(2)];
static HEARTBEAT_ELEMENTS: [Cell<u8>; 2 * 4] = [Cell::new(0); 2 * 4];

/// Entries, declared ascending by index (the `find` binary-search
/// invariant). `0x1002` is a manufacturer-specific status register, not
/// a standard entry, but it sits correctly between `0x1001` and
/// `0x1003` in index order.
static CATALOG: [Entry; 8] = [
    Entry {
        index: 0x1000,
        name: "DeviceType",
        kind: EntryKind::Var(VarDescriptor { data: &DEVICE_TYPE, attribute: Attribute::SDO_R }, false),
    },
    Entry {
        index: 0x1001,
        name: "ErrorRegister",
        kind: EntryKind::Var(VarDescriptor { data: &ERROR_REGISTER, attribute: Attribute::SDO_R }, false),
    },
    Entry {
        index: 0x1002,
        name: "ManufacturerStatusBits",
        kind: EntryKind::Var(
            VarDescriptor { data: &MANUFACTURER_STATUS_BITS, attribute: Attribute::SDO_R | Attribute::SDO_W },
            true,
        ),
    },
    Entry {
        index: 0x1003,
        name: "PredefinedErrorField",
        kind: EntryKind::Array(
            ArrayDescriptor {
                sub0: VarDescriptor { data: &PREDEF_ERR_COUNT, attribute: Attribute::SDO_R | Attribute::SDO_W },
                elements: &PREDEF_ERR_ELEMENTS,
                element_attribute: Attribute::SDO_R,
                element_length: 4,
                element_stride: 4,
            },
            true,
        ),
    },
    Entry {
        index: 0x1014,
        name: "COB-ID EMCY",
        kind: EntryKind::Var(VarDescriptor { data: &COBID_EMCY, attribute: Attribute::SDO_R | Attribute::SDO_W }, true),
    },
    Entry {
        index: 0x1015,
        name: "InhibitTimeEMCY",
        kind: EntryKind::Var(
            VarDescriptor { data: &INHIBIT_TIME_EMCY, attribute: Attribute::SDO_R | Attribute::SDO_W },
            true,
        ),
    },
    Entry {
        index: 0x1016,
        name: "ConsumerHeartbeatTime",
        kind: EntryKind::Array(
            ArrayDescriptor {
                sub0: VarDescriptor { data: &HEARTBEAT_SUB0, attribute: Attribute::SDO_R },
                elements: &HEARTBEAT_ELEMENTS,
                element_attribute: Attribute::SDO_R | Attribute::SDO_W,
                element_length: 4,
                element_stride: 4,
            },
            false,
        ),
    },
    Entry {
        index: 0x1018,
        name: "IdentityObject",
        kind: EntryKind::Record(RecordDescriptor { fields: &IDENTITY_FIELDS }, false),
    },
];

/// Returns the illustrative default catalog, sorted ascending by index.
pub fn new_default() -> &'static [Entry] {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::od::find;

    #[test]
    fn default_catalog_is_sorted_and_lookup_works() {
        let catalog = new_default();
        assert!(catalog.windows(2).all(|w| w[0].index < w[1].index));
        assert_eq!(find(catalog, 0x1014).unwrap().name, "COB-ID EMCY");
        assert!(find(catalog, 0x1013).is_none());
    }

    #[test]
    fn identity_object_exposes_four_record_fields() {
        let catalog = new_default();
        let entry = find(catalog, 0x1018).unwrap();
        assert_eq!(entry.sub_entries_count(), 5);
    }
}
