// crates/canopen-core/src/od/entry.rs

//! Shape-polymorphic Object Dictionary entries.

use crate::types::Attribute;
use core::cell::Cell;

/// A single sub-object: one byte run of backing storage plus its
/// access attributes.
#[derive(Debug)]
pub struct VarDescriptor {
    pub data: &'static [Cell<u8>],
    pub attribute: Attribute,
}

/// A fixed-stride collection of identically-typed elements, addressed by
/// sub-index 1..=N. Sub-index 0 holds the element count.
#[derive(Debug)]
pub struct ArrayDescriptor {
    /// Always a 1-byte `VarDescriptor` holding the highest sub-index.
    pub sub0: VarDescriptor,
    pub elements: &'static [Cell<u8>],
    pub element_attribute: Attribute,
    pub element_length: usize,
    pub element_stride: usize,
}

impl ArrayDescriptor {
    pub fn element_count(&self) -> usize {
        if self.element_stride == 0 { 0 } else { self.elements.len() / self.element_stride }
    }
}

/// One named sub-index of a [`RecordDescriptor`].
#[derive(Debug)]
pub struct RecordField {
    pub sub_index: u8,
    pub var: VarDescriptor,
}

/// A heterogeneous set of sub-indices, matched explicitly rather than
/// addressed by stride (sub-indices need not be contiguous).
#[derive(Debug)]
pub struct RecordDescriptor {
    pub fields: &'static [RecordField],
}

/// The shape-specific payload of an [`Entry`], carrying the `extended`
/// bit per descriptor rather than doubling the enum to six arms.
#[derive(Debug)]
pub enum EntryKind {
    Var(VarDescriptor, bool),
    Array(ArrayDescriptor, bool),
    Record(RecordDescriptor, bool),
}

/// One row of the Object Dictionary catalog.
#[derive(Debug)]
pub struct Entry {
    pub index: u16,
    pub name: &'static str,
    pub kind: EntryKind,
}

impl Entry {
    pub fn extended(&self) -> bool {
        match &self.kind {
            EntryKind::Var(_, ext) | EntryKind::Array(_, ext) | EntryKind::Record(_, ext) => *ext,
        }
    }

    /// Number of addressable sub-indices, including sub-index 0.
    pub fn sub_entries_count(&self) -> u8 {
        match &self.kind {
            EntryKind::Var(_, _) => 1,
            EntryKind::Array(d, _) => d.element_count() as u8 + 1,
            EntryKind::Record(d, _) => {
                1 + d.fields.iter().filter(|f| f.sub_index != 0).count() as u8
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_element_count_from_stride() {
        static ELEMS: [Cell<u8>; 8] = [Cell::new(0); 8];
        static SUB0: [Cell<u8>; 1] = [Cell::new(2)];
        let d = ArrayDescriptor {
            sub0: VarDescriptor { data: &SUB0, attribute: Attribute::NONE },
            elements: &ELEMS,
            element_attribute: Attribute::NONE,
            element_length: 4,
            element_stride: 4,
        };
        assert_eq!(d.element_count(), 2);
    }

    #[test]
    fn entry_extended_flag_reads_through_each_shape() {
        static DATA: [Cell<u8>; 2] = [Cell::new(0); 2];
        let e = Entry {
            index: 0x2000,
            name: "test",
            kind: EntryKind::Var(VarDescriptor { data: &DATA, attribute: Attribute::NONE }, true),
        };
        assert!(e.extended());
        assert_eq!(e.sub_entries_count(), 1);
    }
}
