// SPDX-License-Identifier: MIT

//! Standalone newtypes for the quantities carried by HID report descriptor
//! items. These exist for type safety only and are thin wrappers around
//! their underlying integer type.
//!
//! In this document and unless stated otherwise, a reference to "Section a.b.c" refers to the
//! [HID Device Class Definition for HID 1.11](https://www.usb.org/document-library/device-class-definition-hid-111).

/// Creates the `From` conversions to and from the underlying integer type
/// plus a passthrough `Display` implementation.
/// Use like this: `impl_newtype!(Foo, u32)`.
macro_rules! impl_newtype {
    ($tipo:ident, $to:ty) => {
        impl From<$tipo> for $to {
            fn from(v: $tipo) -> $to {
                v.0
            }
        }
        impl From<&$tipo> for $to {
            fn from(v: &$tipo) -> $to {
                v.0
            }
        }
        impl From<$to> for $tipo {
            fn from(v: $to) -> Self {
                $tipo(v)
            }
        }
        impl std::fmt::Display for $tipo {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------- GLOBAL ITEMS ---------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsagePage(pub u16);

impl_newtype!(UsagePage, u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalMinimum(pub i32);

impl_newtype!(LogicalMinimum, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalMaximum(pub i32);

impl_newtype!(LogicalMaximum, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalMinimum(pub i32);

impl_newtype!(PhysicalMinimum, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalMaximum(pub i32);

impl_newtype!(PhysicalMaximum, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit(pub u32);

impl_newtype!(Unit, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitExponent(pub u32);

impl_newtype!(UnitExponent, u32);

/// The size of one field in bits, see Section 6.2.2.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSize(pub usize);

impl_newtype!(ReportSize, usize);

/// A report ID, see Section 6.2.2.7. The value 0 is never sent by a device;
/// it stands for the implicit default report of devices that declare no
/// report IDs at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportId(pub u8);

impl_newtype!(ReportId, u8);

/// The number of fields declared by one main item, see Section 6.2.2.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportCount(pub usize);

impl_newtype!(ReportCount, usize);

// ----------------- LOCAL ITEMS --------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageId(pub u16);

impl_newtype!(UsageId, u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageMinimum(pub u32);

impl_newtype!(UsageMinimum, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageMaximum(pub u32);

impl_newtype!(UsageMaximum, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringIndex(pub u32);

impl_newtype!(StringIndex, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringMinimum(pub u32);

impl_newtype!(StringMinimum, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringMaximum(pub u32);

impl_newtype!(StringMaximum, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesignatorIndex(pub u32);

impl_newtype!(DesignatorIndex, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesignatorMinimum(pub u32);

impl_newtype!(DesignatorMinimum, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesignatorMaximum(pub u32);

impl_newtype!(DesignatorMaximum, u32);

/// The raw data value of a Delimiter item, see Section 6.2.2.8:
/// 1 opens a set of aliased usages, 0 closes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter(pub u32);

impl_newtype!(Delimiter, u32);

// ----------------- DEVICE DESCRIPTION --------------------

/// Identifies one collection within a parsed device description.
///
/// Collection numbers are assigned in discovery order starting at 1, so a
/// collection's index in the description table is its number minus one.
/// The value 0 is reserved as the "no parent" sentinel carried by top-level
/// collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionNumber(pub u8);

impl_newtype!(CollectionNumber, u8);

impl CollectionNumber {
    /// The sentinel for "no enclosing collection".
    pub const NONE: CollectionNumber = CollectionNumber(0);
}

// ----------------- HUT CONVERSIONS --------------------

#[cfg(feature = "hut")]
impl From<&hut::UsagePage> for UsagePage {
    fn from(hut: &hut::UsagePage) -> UsagePage {
        UsagePage(u16::from(hut))
    }
}

#[cfg(feature = "hut")]
impl From<hut::UsagePage> for UsagePage {
    fn from(hut: hut::UsagePage) -> UsagePage {
        UsagePage::from(&hut)
    }
}

#[cfg(feature = "hut")]
impl From<&hut::Usage> for UsageId {
    fn from(hut: &hut::Usage) -> UsageId {
        UsageId((u32::from(hut) & 0xffff) as u16)
    }
}

#[cfg(feature = "hut")]
impl From<hut::Usage> for UsageId {
    fn from(hut: hut::Usage) -> UsageId {
        UsageId::from(&hut)
    }
}
