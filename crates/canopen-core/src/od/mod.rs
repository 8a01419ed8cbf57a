// crates/canopen-core/src/od/mod.rs

//! The Object Dictionary access layer: catalog lookup, segmented
//! byte-copy I/O, and the per-entry extension registry.

mod entry;
mod extension;
mod io;
mod stream;

pub mod catalog;

pub use entry::{ArrayDescriptor, Entry, EntryKind, RecordDescriptor, RecordField, VarDescriptor};
pub use extension::{DisabledExtension, OdExtension};
pub use io::{default_read, default_write, IoPair, SubInfo};
pub use stream::{OdStatus, Stream};

use crate::error::OdError;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use core::cell::Cell;
use log::trace;

/// Binary-searches a catalog sorted ascending by index.
pub fn find(catalog: &'static [Entry], index: u16) -> Option<&'static Entry> {
    catalog.binary_search_by_key(&index, |e| e.index).ok().map(|i| &catalog[i])
}

fn resolve_sub(
    entry: &'static Entry,
    sub_index: u8,
) -> Result<(&'static [Cell<u8>], crate::types::Attribute, usize), OdError> {
    match &entry.kind {
        EntryKind::Var(d, _) => {
            if sub_index != 0 {
                return Err(OdError::SubNotExist);
            }
            Ok((d.data, d.attribute, d.data.len()))
        }
        EntryKind::Array(d, _) => {
            let count = d.element_count();
            if sub_index as usize > count {
                return Err(OdError::SubNotExist);
            }
            if sub_index == 0 {
                Ok((d.sub0.data, d.sub0.attribute, d.sub0.data.len()))
            } else {
                let start = (sub_index as usize - 1) * d.element_stride;
                let end = start + d.element_length;
                if end > d.elements.len() {
                    return Err(OdError::SubNotExist);
                }
                Ok((&d.elements[start..end], d.element_attribute, d.element_length))
            }
        }
        EntryKind::Record(d, _) => d
            .fields
            .iter()
            .find(|f| f.sub_index == sub_index)
            .map(|f| (f.var.data, f.var.attribute, f.var.data.len()))
            .ok_or(OdError::SubNotExist),
    }
}

/// The Object Dictionary: an immutable `'static` catalog plus the
/// mutable registry of per-entry I/O extensions installed at service
/// init.
///
/// The lifetime `'a` bounds the extensions this OD can hold (they may
/// close over non-`'static` service state, e.g. `Rc<RefCell<...>>`
/// shared with the owning node), mirroring the teacher's own
/// lifetime-parameterized storage borrow.
pub struct ObjectDictionary<'a> {
    catalog: &'static [Entry],
    extensions: BTreeMap<u16, Box<dyn OdExtension + 'a>>,
}

impl<'a> ObjectDictionary<'a> {
    pub fn new(catalog: &'static [Entry]) -> Self {
        ObjectDictionary { catalog, extensions: BTreeMap::new() }
    }

    pub fn catalog(&self) -> &'static [Entry] {
        self.catalog
    }

    pub fn find(&self, index: u16) -> Option<&'static Entry> {
        find(self.catalog, index)
    }

    /// Resolves one sub-object and its I/O implementation.
    ///
    /// `od_orig = true` always selects the default byte-copy path, even
    /// for an extended entry. `od_orig = false` on an extended entry
    /// selects the registered extension if one has been installed, or
    /// fails with `DevIncompat` if the extension slot is still null.
    pub fn get_sub(
        &self,
        entry: &'static Entry,
        sub_index: u8,
        od_orig: bool,
    ) -> Result<(SubInfo, IoPair), OdError> {
        let (data, attribute, data_length) = resolve_sub(entry, sub_index)?;
        let use_extension = !od_orig && entry.extended();
        if use_extension && !self.extensions.contains_key(&entry.index) {
            return Err(OdError::DevIncompat);
        }
        let stream = Stream::new(data, data_length);
        let info = SubInfo { attribute, data_length };
        Ok((info, IoPair::new(stream, use_extension, entry.index)))
    }

    /// Installs a per-entry I/O override. Fails with `ParIncompat` if
    /// the entry is not marked `extended`.
    pub fn install_extension(
        &mut self,
        entry: &'static Entry,
        ext: Box<dyn OdExtension + 'a>,
    ) -> Result<(), OdError> {
        if !entry.extended() {
            return Err(OdError::ParIncompat);
        }
        trace!("installing OD extension on index {:#06X}", entry.index);
        self.extensions.insert(entry.index, ext);
        Ok(())
    }

    pub(crate) fn dispatch_extension_read(
        &mut self,
        index: u16,
        stream: &mut Stream,
        sub_index: u8,
        buf: &mut [u8],
    ) -> Result<(OdStatus, usize), OdError> {
        match self.extensions.get_mut(&index) {
            Some(ext) => ext.read(stream, sub_index, buf),
            None => DisabledExtension.read(stream, sub_index, buf),
        }
    }

    pub(crate) fn dispatch_extension_write(
        &mut self,
        index: u16,
        stream: &mut Stream,
        sub_index: u8,
        buf: &[u8],
    ) -> Result<(OdStatus, usize), OdError> {
        match self.extensions.get_mut(&index) {
            Some(ext) => ext.write(stream, sub_index, buf),
            None => DisabledExtension.write(stream, sub_index, buf),
        }
    }

    /// Reads exactly `buf.len()` bytes from `(entry, sub_index)` in one
    /// call. Fails with `TypeMismatch` unless `buf.len()` equals the
    /// sub-object's declared length.
    pub fn get_value(
        &mut self,
        entry: &'static Entry,
        sub_index: u8,
        buf: &mut [u8],
        od_orig: bool,
    ) -> Result<OdStatus, OdError> {
        let (info, mut io) = self.get_sub(entry, sub_index, od_orig)?;
        if info.data_length != buf.len() {
            return Err(OdError::TypeMismatch);
        }
        if io.stream.data.is_empty() {
            return Err(OdError::DevIncompat);
        }
        io.read(self, sub_index, buf)
    }

    /// Writes exactly `buf.len()` bytes to `(entry, sub_index)` in one
    /// call. Fails with `TypeMismatch` unless `buf.len()` equals the
    /// sub-object's declared length.
    pub fn set_value(
        &mut self,
        entry: &'static Entry,
        sub_index: u8,
        buf: &[u8],
        od_orig: bool,
    ) -> Result<OdStatus, OdError> {
        let (info, mut io) = self.get_sub(entry, sub_index, od_orig)?;
        if info.data_length != buf.len() {
            return Err(OdError::TypeMismatch);
        }
        if io.stream.data.is_empty() {
            return Err(OdError::DevIncompat);
        }
        io.write(self, sub_index, buf)
    }

    /// Returns the raw backing storage for a sub-object at its original
    /// OD location, bypassing any installed extension. For zero-copy
    /// callers only.
    pub fn get_ptr(
        &self,
        entry: &'static Entry,
        sub_index: u8,
    ) -> Result<&'static [Cell<u8>], OdError> {
        resolve_sub(entry, sub_index).map(|(data, _, _)| data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attribute;

    static VAR_DATA: [Cell<u8>; 4] = [Cell::new(0x80), Cell::new(0x00), Cell::new(0x00), Cell::new(0x00)];

    #[test]
    fn find_missing_returns_none_present_returns_entry() {
        static CATALOG: [Entry; 2] = [
            Entry {
                index: 0x1000,
                name: "DeviceType",
                kind: EntryKind::Var(
                    VarDescriptor { data: &VAR_DATA, attribute: Attribute::SDO_R },
                    false,
                ),
            },
            Entry {
                index: 0x1014,
                name: "COB-ID EMCY",
                kind: EntryKind::Var(
                    VarDescriptor { data: &VAR_DATA, attribute: Attribute::SDO_R },
                    false,
                ),
            },
        ];
        assert!(find(&CATALOG, 0x1013).is_none());
        assert_eq!(find(&CATALOG, 0x1014).unwrap().index, 0x1014);
    }

    #[test]
    fn get_value_typed_u32_reads_little_endian() {
        static CATALOG: [Entry; 1] = [Entry {
            index: 0x1014,
            name: "COB-ID EMCY",
            kind: EntryKind::Var(VarDescriptor { data: &VAR_DATA, attribute: Attribute::SDO_R }, false),
        }];
        let mut od = ObjectDictionary::new(&CATALOG);
        let entry = od.find(0x1014).unwrap();
        let mut dst = [0u8; 4];
        let status = od.get_value(entry, 0, &mut dst, true).unwrap();
        assert_eq!(status, OdStatus::Ok);
        assert_eq!(u32::from_le_bytes(dst), 0x0000_0080);
    }

    #[test]
    fn get_value_length_mismatch_is_type_mismatch() {
        static CATALOG: [Entry; 1] = [Entry {
            index: 0x1014,
            name: "COB-ID EMCY",
            kind: EntryKind::Var(VarDescriptor { data: &VAR_DATA, attribute: Attribute::SDO_R }, false),
        }];
        let mut od = ObjectDictionary::new(&CATALOG);
        let entry = od.find(0x1014).unwrap();
        let mut dst = [0u8; 2];
        assert_eq!(od.get_value(entry, 0, &mut dst, true), Err(OdError::TypeMismatch));
    }

    #[test]
    fn install_extension_on_non_extended_entry_fails() {
        static CATALOG: [Entry; 1] = [Entry {
            index: 0x1014,
            name: "COB-ID EMCY",
            kind: EntryKind::Var(VarDescriptor { data: &VAR_DATA, attribute: Attribute::SDO_R }, false),
        }];
        struct Noop;
        impl OdExtension for Noop {
            fn read(&mut self, _s: &mut Stream, _si: u8, _b: &mut [u8]) -> Result<(OdStatus, usize), OdError> {
                Ok((OdStatus::Ok, 0))
            }
            fn write(&mut self, _s: &mut Stream, _si: u8, _b: &[u8]) -> Result<(OdStatus, usize), OdError> {
                Ok((OdStatus::Ok, 0))
            }
        }
        let mut od = ObjectDictionary::new(&CATALOG);
        let entry = od.find(0x1014).unwrap();
        assert_eq!(od.install_extension(entry, Box::new(Noop)), Err(OdError::ParIncompat));
    }

    #[test]
    fn extension_override_selected_by_od_orig_flag() {
        static CATALOG: [Entry; 1] = [Entry {
            index: 0x1014,
            name: "COB-ID EMCY",
            kind: EntryKind::Var(VarDescriptor { data: &VAR_DATA, attribute: Attribute::SDO_R }, true),
        }];
        struct Tagged;
        impl OdExtension for Tagged {
            fn read(&mut self, _s: &mut Stream, _si: u8, buf: &mut [u8]) -> Result<(OdStatus, usize), OdError> {
                buf.fill(0xEE);
                Ok((OdStatus::Ok, buf.len()))
            }
            fn write(&mut self, _s: &mut Stream, _si: u8, _b: &[u8]) -> Result<(OdStatus, usize), OdError> {
                Ok((OdStatus::Ok, 0))
            }
        }
        let mut od = ObjectDictionary::new(&CATALOG);
        let entry = od.find(0x1014).unwrap();
        od.install_extension(entry, Box::new(Tagged)).unwrap();

        let mut dst = [0u8; 4];
        od.get_value(entry, 0, &mut dst, false).unwrap();
        assert_eq!(dst, [0xEE; 4]);

        let mut dst2 = [0u8; 4];
        od.get_value(entry, 0, &mut dst2, true).unwrap();
        assert_eq!(u32::from_le_bytes(dst2), 0x0000_0080);
    }

    #[test]
    fn extended_entry_with_no_extension_installed_fails_dev_incompat() {
        static CATALOG: [Entry; 1] = [Entry {
            index: 0x1014,
            name: "COB-ID EMCY",
            kind: EntryKind::Var(VarDescriptor { data: &VAR_DATA, attribute: Attribute::SDO_R }, true),
        }];
        let mut od = ObjectDictionary::new(&CATALOG);
        let entry = od.find(0x1014).unwrap();
        let mut dst = [0u8; 4];
        assert_eq!(od.get_value(entry, 0, &mut dst, false), Err(OdError::DevIncompat));
        // od_orig bypasses the extension slot entirely, so it still works.
        assert!(od.get_value(entry, 0, &mut dst, true).is_ok());
    }
}
