// SPDX-License-Identifier: MIT

//! The HID item layer. This module handles splitting a report descriptor
//! byte stream into its individual items and turning items back into bytes.
//! Interpretation of the resulting [ItemType]s is left to the caller, see
//! [`DeviceDescription`](crate::DeviceDescription).
//!
//! In this document and unless stated otherwise, a reference to "Section a.b.c" refers to the
//! [HID Device Class Definition for HID 1.11](https://www.usb.org/document-library/device-class-definition-hid-111).
//!
//! # Reading HID Report Descriptor items
//!
//! The [ItemReader] walks the descriptor one item at a time and never reads
//! past a bound it has not checked first:
//!
//! ```
//! # use crate::hiddesc::hid::*;
//! # fn count(bytes: &[u8]) {
//! for item in ItemReader::new(bytes) {
//!     let item = item.unwrap();
//!     println!("item at offset {:02x}", item.offset());
//!     match item.item() {
//!         ItemType::Main(MainItem::Input(flags)) => println!("an input field"),
//!         _ => {}
//!     }
//! }
//! # }
//! ```
//!
//! # Building HID Report Descriptors programmatically
//!
//! ```
//! # use crate::hiddesc::hid::*;
//! # use crate::hiddesc::types::*;
//! use hut;
//!
//! let rdesc: Vec<u8> = ReportDescriptorBuilder::new()
//!     .usage_page(hut::UsagePage::GenericDesktop)
//!     .usage_id(hut::GenericDesktop::Mouse)
//!     .open_collection(CollectionKind::Application)
//!     .append(ReportSize::from(8).into())
//!     .append(ReportCount::from(1).into())
//!     .input(MainDataFlags::new().constant())
//!     .close_collection()
//!     .build();
//! ```
//!
//! Note that the [ReportDescriptorBuilder] does **not** validate the item
//! sequence; validation is the parser's job.

use crate::types::*;
use crate::{ensure, ErrorKind, ParseError};

/// Convenience function to extract a single bit as bool from a value
fn bit(bits: u32, bit: u8) -> bool {
    assert!(bit < 32);
    bits & (1 << bit) != 0
}

/// Header byte reserved for long items, see Section 6.2.2.3.
const LONG_ITEM_HEADER: u8 = 0b11111110;

/// One value extracted from the 0, 1, 2 or 4 (LE) payload bytes of a short
/// item. The payload length is kept because it decides how sign extension
/// works for the signed conversions.
pub(crate) struct ItemValue {
    value: u32,
    nbytes: usize,
}

impl ItemValue {
    /// Decode a payload that is already known to be 0, 1, 2 or 4 bytes.
    pub(crate) fn new(data: &[u8]) -> ItemValue {
        let value = match data.len() {
            0 => 0,
            1 => data[0] as u32,
            2 => u16::from_le_bytes(data[0..2].try_into().unwrap()) as u32,
            4 => u32::from_le_bytes(data[0..4].try_into().unwrap()),
            n => unreachable!("short item payload of {n} bytes"),
        };
        ItemValue {
            value,
            nbytes: data.len(),
        }
    }
}

impl From<&ItemValue> for u32 {
    fn from(v: &ItemValue) -> u32 {
        v.value
    }
}

impl From<&ItemValue> for usize {
    fn from(v: &ItemValue) -> usize {
        v.value as usize
    }
}

impl From<&ItemValue> for u16 {
    fn from(v: &ItemValue) -> u16 {
        (v.value & 0xFFFF) as u16
    }
}

impl From<&ItemValue> for u8 {
    fn from(v: &ItemValue) -> u8 {
        (v.value & 0xFF) as u8
    }
}

impl From<&ItemValue> for i32 {
    fn from(v: &ItemValue) -> i32 {
        match v.nbytes {
            0 => 0,
            1 => ((v.value & 0xFF) as i8) as i32,
            2 => ((v.value & 0xFFFF) as i16) as i32,
            4 => v.value as i32,
            n => unreachable!("short item payload of {n} bytes"),
        }
    }
}

/// Encode a value in the fewest payload bytes a short item allows.
fn unsigned_bytes(value: u32) -> Vec<u8> {
    let bytes = value.to_le_bytes();
    match value {
        0..=0xff => bytes[..1].to_vec(),
        0x100..=0xffff => bytes[..2].to_vec(),
        _ => bytes.to_vec(),
    }
}

/// Encode a signed value in the fewest payload bytes that keep its sign bit.
fn signed_bytes(value: i32) -> Vec<u8> {
    if let Ok(v) = i8::try_from(value) {
        v.to_le_bytes().to_vec()
    } else if let Ok(v) = i16::try_from(value) {
        v.to_le_bytes().to_vec()
    } else {
        value.to_le_bytes().to_vec()
    }
}

/// Prepend the short item header for the given prefix and payload,
/// see Section 6.2.2.2. The payload must be 0, 1, 2 or 4 bytes.
fn encode_item(prefix: u8, data: &[u8]) -> Vec<u8> {
    let code: u8 = match data.len() {
        0 => 0b00,
        1 => 0b01,
        2 => 0b10,
        4 => 0b11,
        n => unreachable!("item payload of {n} bytes"),
    };
    let mut bytes = Vec::with_capacity(data.len() + 1);
    bytes.push(prefix | code);
    bytes.extend_from_slice(data);
    bytes
}

/// The type of a HID item is one of [MainItem], [GlobalItem], or [LocalItem].
///
/// [ItemType::Long] items are reserved for future use (Section 6.2.2.3) and
/// skipped during parsing; [ItemType::Reserved] covers the fourth, reserved
/// item type bit pattern and is rejected during parsing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemType {
    Main(MainItem),
    Global(GlobalItem),
    Local(LocalItem),
    Long { tag: u8 },
    Reserved { header: u8 },
}

impl ItemType {
    /// Decode an item from its header byte and bounds-checked payload.
    pub(crate) fn decode(header: u8, data: &[u8]) -> ItemType {
        match (header & 0b1100) >> 2 {
            0 => ItemType::Main(MainItem::decode(header, data)),
            1 => ItemType::Global(GlobalItem::decode(header, data)),
            2 => ItemType::Local(LocalItem::decode(header, data)),
            _ => ItemType::Reserved { header },
        }
    }

    /// Return the HID bytes representing this [ItemType], with the payload
    /// encoded in the fewest bytes possible. This is the inverse of the
    /// decoding done by the [ItemReader].
    ///
    /// [ItemType::Long] and [ItemType::Reserved] items carry no
    /// re-encodable payload and yield their header only.
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            ItemType::Main(item) => item.as_bytes(),
            ItemType::Global(item) => item.as_bytes(),
            ItemType::Local(item) => item.as_bytes(),
            ItemType::Long { .. } => vec![LONG_ITEM_HEADER],
            ItemType::Reserved { header } => vec![header & 0b11111100],
        }
    }
}

impl From<MainItem> for ItemType {
    fn from(item: MainItem) -> ItemType {
        ItemType::Main(item)
    }
}

impl From<GlobalItem> for ItemType {
    fn from(item: GlobalItem) -> ItemType {
        ItemType::Global(item)
    }
}

impl From<LocalItem> for ItemType {
    fn from(item: LocalItem) -> ItemType {
        ItemType::Local(item)
    }
}

impl From<CollectionKind> for ItemType {
    fn from(kind: CollectionKind) -> ItemType {
        ItemType::Main(MainItem::Collection(kind))
    }
}

impl From<(UsagePage, UsageId)> for ItemType {
    fn from(usage: (UsagePage, UsageId)) -> ItemType {
        ItemType::Local(LocalItem::Usage(usage.0, usage.1))
    }
}

/// Creates a `From<Foo> for ItemType` implementation that wraps the newtype
/// into its item variant. Use like this:
/// `impl_from_item!(UsagePage => Global, GlobalItem::UsagePage)`.
macro_rules! impl_from_item {
    ($tipo:ty => $outer:ident, $inner:ident :: $variant:ident) => {
        impl From<$tipo> for ItemType {
            fn from(v: $tipo) -> ItemType {
                ItemType::$outer($inner::$variant(v))
            }
        }
    };
}

impl_from_item!(UsagePage => Global, GlobalItem::UsagePage);
impl_from_item!(LogicalMinimum => Global, GlobalItem::LogicalMinimum);
impl_from_item!(LogicalMaximum => Global, GlobalItem::LogicalMaximum);
impl_from_item!(PhysicalMinimum => Global, GlobalItem::PhysicalMinimum);
impl_from_item!(PhysicalMaximum => Global, GlobalItem::PhysicalMaximum);
impl_from_item!(UnitExponent => Global, GlobalItem::UnitExponent);
impl_from_item!(Unit => Global, GlobalItem::Unit);
impl_from_item!(ReportSize => Global, GlobalItem::ReportSize);
impl_from_item!(ReportId => Global, GlobalItem::ReportId);
impl_from_item!(ReportCount => Global, GlobalItem::ReportCount);
impl_from_item!(UsageId => Local, LocalItem::UsageId);
impl_from_item!(UsageMinimum => Local, LocalItem::UsageMinimum);
impl_from_item!(UsageMaximum => Local, LocalItem::UsageMaximum);
impl_from_item!(DesignatorIndex => Local, LocalItem::DesignatorIndex);
impl_from_item!(DesignatorMinimum => Local, LocalItem::DesignatorMinimum);
impl_from_item!(DesignatorMaximum => Local, LocalItem::DesignatorMaximum);
impl_from_item!(StringIndex => Local, LocalItem::StringIndex);
impl_from_item!(StringMinimum => Local, LocalItem::StringMinimum);
impl_from_item!(StringMaximum => Local, LocalItem::StringMaximum);
impl_from_item!(Delimiter => Local, LocalItem::Delimiter);

/// Main Items, see Section 6.2.2.4
///
/// > Main items are used to either define or group certain types of data fields within a
/// > Report descriptor. There are two types of Main items: data and non-data. Data-
/// > type Main items are used to create a field within a report and include Input,
/// > Output, and Feature. Other items do not create fields and are subsequently
/// > referred to as non-data Main items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MainItem {
    Input(MainDataFlags),
    Output(MainDataFlags),
    Feature(MainDataFlags),
    Collection(CollectionKind),
    EndCollection,
    /// A main item with a tag outside the ones Section 6.2.2.4 defines.
    Reserved { header: u8 },
}

impl MainItem {
    fn decode(header: u8, data: &[u8]) -> MainItem {
        let value = u32::from(&ItemValue::new(data));
        match header & 0b11111100 {
            0b10000000 => MainItem::Input(MainDataFlags(value)),
            0b10010000 => MainItem::Output(MainDataFlags(value)),
            0b10110000 => MainItem::Feature(MainDataFlags(value)),
            0b10100000 => MainItem::Collection(CollectionKind::from(
                data.first().copied().unwrap_or(0),
            )),
            0b11000000 => MainItem::EndCollection,
            _ => MainItem::Reserved { header },
        }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            MainItem::Input(flags) => encode_item(0b10000000, &flags.data_bytes()),
            MainItem::Output(flags) => encode_item(0b10010000, &flags.data_bytes()),
            MainItem::Feature(flags) => encode_item(0b10110000, &flags.data_bytes()),
            MainItem::Collection(kind) => encode_item(0b10100000, &[u8::from(*kind)]),
            MainItem::EndCollection => encode_item(0b11000000, &[]),
            MainItem::Reserved { header } => vec![header & 0b11111100],
        }
    }
}

/// The flag bits shared by the Input, Output and Feature items,
/// see Section 6.2.2.5.
///
/// > An Input item describes information about the data provided by one or more
/// > physical controls. [...] The Output item is used to define an output data
/// > field in a report. [...] Feature items describe device configuration
/// > information that can be sent to the device.
///
/// The flags come in pairs (bit set or unset); for readability both states
/// have an accessor. Bit 7 (volatile) is reserved on Input items but kept
/// accessible here since the decode is shared between the three item kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MainDataFlags(pub(crate) u32);

impl MainDataFlags {
    /// All flags at their Section 6.2.2.5 defaults
    /// (data, array, absolute, no wrap, linear, preferred state, no null).
    pub fn new() -> MainDataFlags {
        MainDataFlags(0)
    }

    /// The raw flag bits as found in the item payload.
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// True if the data is constant and never changes, typically used
    /// for padding fields. Mutually exclusive with [Self::is_data].
    pub fn is_constant(&self) -> bool {
        bit(self.0, 0)
    }

    /// True if the field carries data.
    pub fn is_data(&self) -> bool {
        !self.is_constant()
    }

    /// True if the field is a variable, i.e. each declared usage gets its
    /// own field. Mutually exclusive with [Self::is_array].
    pub fn is_variable(&self) -> bool {
        bit(self.0, 1)
    }

    /// True if the field is an array reporting usage indices.
    pub fn is_array(&self) -> bool {
        !self.is_variable()
    }

    /// True if the data is relative to the previous report.
    pub fn is_relative(&self) -> bool {
        bit(self.0, 2)
    }

    /// True if the data is absolute.
    pub fn is_absolute(&self) -> bool {
        !self.is_relative()
    }

    /// True if the data wraps around at the logical extents
    /// (e.g. a dial that can spin past 360 degrees).
    pub fn wraps(&self) -> bool {
        bit(self.0, 3)
    }

    /// True if the data was pre-processed on the device and the logical
    /// range is no longer linear.
    pub fn is_nonlinear(&self) -> bool {
        bit(self.0, 4)
    }

    /// True if the control has no state it returns to when the user stops
    /// interacting with it.
    pub fn has_no_preferred_state(&self) -> bool {
        bit(self.0, 5)
    }

    /// True if the control has a state in which it sends no meaningful data
    /// (e.g. a joystick in its neutral position).
    pub fn has_null_state(&self) -> bool {
        bit(self.0, 6)
    }

    /// True if the control value should not be changed by the host.
    /// Reserved on Input items.
    pub fn is_volatile(&self) -> bool {
        bit(self.0, 7)
    }

    /// True if the control emits a fixed-size stream of bytes rather than
    /// a single bit field.
    pub fn is_buffered_bytes(&self) -> bool {
        bit(self.0, 8)
    }

    /// Mark the field constant (padding).
    pub fn constant(self) -> MainDataFlags {
        MainDataFlags(self.0 | 1 << 0)
    }

    /// Mark the field a variable.
    pub fn variable(self) -> MainDataFlags {
        MainDataFlags(self.0 | 1 << 1)
    }

    /// Mark the field relative.
    pub fn relative(self) -> MainDataFlags {
        MainDataFlags(self.0 | 1 << 2)
    }

    /// Mark the field as wrapping at the logical extents.
    pub fn wrap(self) -> MainDataFlags {
        MainDataFlags(self.0 | 1 << 3)
    }

    /// Mark the field nonlinear.
    pub fn nonlinear(self) -> MainDataFlags {
        MainDataFlags(self.0 | 1 << 4)
    }

    /// Mark the control as having no preferred state.
    pub fn no_preferred_state(self) -> MainDataFlags {
        MainDataFlags(self.0 | 1 << 5)
    }

    /// Mark the control as having a null state.
    pub fn null_state(self) -> MainDataFlags {
        MainDataFlags(self.0 | 1 << 6)
    }

    /// Mark the control volatile. Ignored on Input items.
    pub fn volatile(self) -> MainDataFlags {
        MainDataFlags(self.0 | 1 << 7)
    }

    /// Mark the control as a buffered byte stream.
    pub fn buffered_bytes(self) -> MainDataFlags {
        MainDataFlags(self.0 | 1 << 8)
    }

    fn data_bytes(&self) -> Vec<u8> {
        if self.0 > 0xff {
            self.0.to_le_bytes()[..2].to_vec()
        } else {
            vec![self.0 as u8]
        }
    }
}

impl From<u32> for MainDataFlags {
    fn from(value: u32) -> MainDataFlags {
        MainDataFlags(value)
    }
}

/// See Section 6.2.2.6. A collection groups several fields together.
///
/// > A Collection item identifies a relationship between two or more data (Input,
/// > Output, or Feature.) For example, a mouse could be described as a collection of
/// > two to four data (x, y, button 1, button 2). While the Collection item opens a
/// > collection of data, the End Collection item closes a collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollectionKind {
    Physical,
    Application,
    Logical,
    Report,
    NamedArray,
    UsageSwitch,
    UsageModifier,
    Reserved { value: u8 },
    VendorDefined { value: u8 },
}

impl From<u8> for CollectionKind {
    fn from(v: u8) -> CollectionKind {
        match v {
            0x00 => CollectionKind::Physical,
            0x01 => CollectionKind::Application,
            0x02 => CollectionKind::Logical,
            0x03 => CollectionKind::Report,
            0x04 => CollectionKind::NamedArray,
            0x05 => CollectionKind::UsageSwitch,
            0x06 => CollectionKind::UsageModifier,
            value @ 0x07..=0x7f => CollectionKind::Reserved { value },
            value @ 0x80..=0xff => CollectionKind::VendorDefined { value },
        }
    }
}

impl From<CollectionKind> for u8 {
    fn from(kind: CollectionKind) -> u8 {
        match kind {
            CollectionKind::Physical => 0x00,
            CollectionKind::Application => 0x01,
            CollectionKind::Logical => 0x02,
            CollectionKind::Report => 0x03,
            CollectionKind::NamedArray => 0x04,
            CollectionKind::UsageSwitch => 0x05,
            CollectionKind::UsageModifier => 0x06,
            CollectionKind::Reserved { value } => value,
            CollectionKind::VendorDefined { value } => value,
        }
    }
}

/// See Section 6.2.2.7, a global item applies to all subsequently defined
/// items until changed or restored.
///
/// > Global items describe rather than define data from a control. A new Main item
/// > assumes the characteristics of the item state table. Global items can change the
/// > state table. As a result Global item tags apply to all subsequently defined items
/// > unless overridden by another Global item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GlobalItem {
    UsagePage(UsagePage),
    LogicalMinimum(LogicalMinimum),
    LogicalMaximum(LogicalMaximum),
    PhysicalMinimum(PhysicalMinimum),
    PhysicalMaximum(PhysicalMaximum),
    UnitExponent(UnitExponent),
    Unit(Unit),
    ReportSize(ReportSize),
    ReportId(ReportId),
    ReportCount(ReportCount),
    Push,
    Pop,
    /// A global item with a tag outside the ones Section 6.2.2.7 defines.
    Reserved { header: u8 },
}

impl GlobalItem {
    fn decode(header: u8, data: &[u8]) -> GlobalItem {
        let value = ItemValue::new(data);
        match header & 0b11111100 {
            0b00000100 => GlobalItem::UsagePage(UsagePage(u16::from(&value))),
            0b00010100 => GlobalItem::LogicalMinimum(LogicalMinimum(i32::from(&value))),
            // The maxima are sign extended like the minima. Strictly the
            // sign of a maximum depends on the preceding minimum but the
            // bit accounting here never needs the distinction.
            0b00100100 => GlobalItem::LogicalMaximum(LogicalMaximum(i32::from(&value))),
            0b00110100 => GlobalItem::PhysicalMinimum(PhysicalMinimum(i32::from(&value))),
            0b01000100 => GlobalItem::PhysicalMaximum(PhysicalMaximum(i32::from(&value))),
            0b01010100 => GlobalItem::UnitExponent(UnitExponent(u32::from(&value))),
            0b01100100 => GlobalItem::Unit(Unit(u32::from(&value))),
            0b01110100 => GlobalItem::ReportSize(ReportSize(usize::from(&value))),
            0b10000100 => GlobalItem::ReportId(ReportId(u8::from(&value))),
            0b10010100 => GlobalItem::ReportCount(ReportCount(usize::from(&value))),
            0b10100100 => GlobalItem::Push,
            0b10110100 => GlobalItem::Pop,
            _ => GlobalItem::Reserved { header },
        }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let data = match self {
            GlobalItem::UsagePage(v) => unsigned_bytes(u16::from(v) as u32),
            GlobalItem::LogicalMinimum(v) => signed_bytes(i32::from(v)),
            GlobalItem::LogicalMaximum(v) => signed_bytes(i32::from(v)),
            GlobalItem::PhysicalMinimum(v) => signed_bytes(i32::from(v)),
            GlobalItem::PhysicalMaximum(v) => signed_bytes(i32::from(v)),
            GlobalItem::UnitExponent(v) => unsigned_bytes(u32::from(v)),
            GlobalItem::Unit(v) => unsigned_bytes(u32::from(v)),
            GlobalItem::ReportSize(v) => unsigned_bytes(usize::from(v) as u32),
            GlobalItem::ReportId(v) => unsigned_bytes(u8::from(v) as u32),
            GlobalItem::ReportCount(v) => unsigned_bytes(usize::from(v) as u32),
            GlobalItem::Push | GlobalItem::Pop | GlobalItem::Reserved { .. } => vec![],
        };
        encode_item(self.prefix(), &data)
    }

    fn prefix(&self) -> u8 {
        match self {
            GlobalItem::UsagePage(_) => 0b00000100,
            GlobalItem::LogicalMinimum(_) => 0b00010100,
            GlobalItem::LogicalMaximum(_) => 0b00100100,
            GlobalItem::PhysicalMinimum(_) => 0b00110100,
            GlobalItem::PhysicalMaximum(_) => 0b01000100,
            GlobalItem::UnitExponent(_) => 0b01010100,
            GlobalItem::Unit(_) => 0b01100100,
            GlobalItem::ReportSize(_) => 0b01110100,
            GlobalItem::ReportId(_) => 0b10000100,
            GlobalItem::ReportCount(_) => 0b10010100,
            GlobalItem::Push => 0b10100100,
            GlobalItem::Pop => 0b10110100,
            GlobalItem::Reserved { header } => header & 0b11111100,
        }
    }
}

/// See Section 6.2.2.8, a local item applies to the next [MainItem] only.
///
/// > Local item tags define characteristics of controls. These items do not carry over to
/// > the next Main item. If a Main item defines more than one control, it may be
/// > preceded by several similar Local item tags. For example, an Input item may
/// > have several Usage tags associated with it, one for each control.
///
/// Note that [LocalItem::UsageId] does not exist in the HID specification, it is
/// a split made here: a Usage declared with a 4-byte payload carries its own
/// Usage Page in the upper 16 bits ([LocalItem::Usage]), a shorter payload
/// inherits the Usage Page from the global state ([LocalItem::UsageId]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalItem {
    Usage(UsagePage, UsageId),
    UsageId(UsageId),
    UsageMinimum(UsageMinimum),
    UsageMaximum(UsageMaximum),
    DesignatorIndex(DesignatorIndex),
    DesignatorMinimum(DesignatorMinimum),
    DesignatorMaximum(DesignatorMaximum),
    StringIndex(StringIndex),
    StringMinimum(StringMinimum),
    StringMaximum(StringMaximum),
    Delimiter(Delimiter),
    /// A local item with a tag outside the ones Section 6.2.2.8 defines.
    Reserved { header: u8 },
}

impl LocalItem {
    fn decode(header: u8, data: &[u8]) -> LocalItem {
        let value = ItemValue::new(data);
        match header & 0b11111100 {
            0b00001000 => match data.len() {
                4 => LocalItem::Usage(
                    UsagePage((u32::from(&value) >> 16) as u16),
                    UsageId(u16::from(&value)),
                ),
                _ => LocalItem::UsageId(UsageId(u16::from(&value))),
            },
            0b00011000 => LocalItem::UsageMinimum(UsageMinimum(u32::from(&value))),
            0b00101000 => LocalItem::UsageMaximum(UsageMaximum(u32::from(&value))),
            0b00111000 => LocalItem::DesignatorIndex(DesignatorIndex(u32::from(&value))),
            0b01001000 => LocalItem::DesignatorMinimum(DesignatorMinimum(u32::from(&value))),
            0b01011000 => LocalItem::DesignatorMaximum(DesignatorMaximum(u32::from(&value))),
            0b01111000 => LocalItem::StringIndex(StringIndex(u32::from(&value))),
            0b10001000 => LocalItem::StringMinimum(StringMinimum(u32::from(&value))),
            0b10011000 => LocalItem::StringMaximum(StringMaximum(u32::from(&value))),
            0b10101000 => LocalItem::Delimiter(Delimiter(u32::from(&value))),
            _ => LocalItem::Reserved { header },
        }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let data = match self {
            LocalItem::Usage(page, id) => {
                let usage = (u16::from(page) as u32) << 16 | u16::from(id) as u32;
                unsigned_bytes(usage)
            }
            LocalItem::UsageId(id) => unsigned_bytes(u16::from(id) as u32),
            LocalItem::UsageMinimum(v) => unsigned_bytes(u32::from(v)),
            LocalItem::UsageMaximum(v) => unsigned_bytes(u32::from(v)),
            LocalItem::DesignatorIndex(v) => unsigned_bytes(u32::from(v)),
            LocalItem::DesignatorMinimum(v) => unsigned_bytes(u32::from(v)),
            LocalItem::DesignatorMaximum(v) => unsigned_bytes(u32::from(v)),
            LocalItem::StringIndex(v) => unsigned_bytes(u32::from(v)),
            LocalItem::StringMinimum(v) => unsigned_bytes(u32::from(v)),
            LocalItem::StringMaximum(v) => unsigned_bytes(u32::from(v)),
            LocalItem::Delimiter(v) => unsigned_bytes(u32::from(v)),
            LocalItem::Reserved { .. } => vec![],
        };
        encode_item(self.prefix(), &data)
    }

    fn prefix(&self) -> u8 {
        match self {
            LocalItem::Usage(_, _) => 0b00001000,
            LocalItem::UsageId(_) => 0b00001000,
            LocalItem::UsageMinimum(_) => 0b00011000,
            LocalItem::UsageMaximum(_) => 0b00101000,
            LocalItem::DesignatorIndex(_) => 0b00111000,
            LocalItem::DesignatorMinimum(_) => 0b01001000,
            LocalItem::DesignatorMaximum(_) => 0b01011000,
            LocalItem::StringIndex(_) => 0b01111000,
            LocalItem::StringMinimum(_) => 0b10001000,
            LocalItem::StringMaximum(_) => 0b10011000,
            LocalItem::Delimiter(_) => 0b10101000,
            LocalItem::Reserved { header } => header & 0b11111100,
        }
    }
}

/// One decoded item together with its position in the descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorItem {
    offset: usize,
    size: usize,
    header: u8,
    item: ItemType,
}

impl DescriptorItem {
    /// The byte offset of this item in the report descriptor it was read
    /// from. Errors reference this offset, not the position after the item.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The length of this item in bytes, header included.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The raw header byte of this item.
    pub fn header(&self) -> u8 {
        self.header
    }

    /// The decoded item.
    pub fn item(&self) -> &ItemType {
        &self.item
    }
}

/// Walks a report descriptor byte buffer one item at a time.
///
/// Short items are decoded per Section 6.2.2.2 (a size code of 3 means a
/// 4 byte payload); long items (Section 6.2.2.3) are length-checked and
/// surfaced as [ItemType::Long] without further decoding.
///
/// Every declared payload length is checked against the remaining buffer
/// before any payload byte is touched; a truncated item fails with
/// [ErrorKind::UnexpectedEnd] at the offset of the item's header byte.
pub struct ItemReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ItemReader<'a> {
    pub fn new(bytes: &'a [u8]) -> ItemReader<'a> {
        ItemReader { bytes, offset: 0 }
    }

    fn read_item(&mut self) -> Result<DescriptorItem, ParseError> {
        let start = self.offset;
        let header = self.bytes[start];
        let remaining = self.bytes.len() - start - 1;

        if header == LONG_ITEM_HEADER {
            // One data size byte and one tag byte, then up to 255 data bytes.
            ensure!(
                remaining >= 2,
                ParseError::with_args(start, ErrorKind::UnexpectedEnd, &[2, remaining as u32])
            );
            let data_len = self.bytes[start + 1] as usize;
            let tag = self.bytes[start + 2];
            ensure!(
                remaining - 2 >= data_len,
                ParseError::with_args(
                    start,
                    ErrorKind::UnexpectedEnd,
                    &[data_len as u32, (remaining - 2) as u32]
                )
            );
            self.offset = start + 3 + data_len;
            return Ok(DescriptorItem {
                offset: start,
                size: 3 + data_len,
                header,
                item: ItemType::Long { tag },
            });
        }

        let payload: usize = match header & 0b11 {
            0b00 => 0,
            0b01 => 1,
            0b10 => 2,
            _ => 4,
        };
        ensure!(
            remaining >= payload,
            ParseError::with_args(
                start,
                ErrorKind::UnexpectedEnd,
                &[payload as u32, remaining as u32]
            )
        );
        let data = &self.bytes[start + 1..start + 1 + payload];
        self.offset = start + 1 + payload;
        Ok(DescriptorItem {
            offset: start,
            size: payload + 1,
            header,
            item: ItemType::decode(header, data),
        })
    }
}

impl Iterator for ItemReader<'_> {
    type Item = Result<DescriptorItem, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        Some(self.read_item())
    }
}

/// A struct for programmatically building a HID Report Descriptor.
///
/// ```
/// # use crate::hiddesc::hid::*;
/// # use crate::hiddesc::types::*;
/// use hut;
///
/// let rdesc: Vec<u8> = ReportDescriptorBuilder::new()
///     .usage_page(hut::UsagePage::GenericDesktop)
///     .usage_id(hut::GenericDesktop::Mouse)
///     .open_collection(CollectionKind::Application)
///     .append(LogicalMinimum::from(0).into())
///     .append(LogicalMaximum::from(1).into())
///     .append(ReportSize::from(1).into())
///     .append(ReportCount::from(8).into())
///     .usage_id(hut::GenericDesktop::X)
///     .input(MainDataFlags::new().variable())
///     .close_collection()
///     .build();
/// ```
///
/// The builder appends items verbatim, it does **not** check that
/// collections are balanced or that the item sequence is meaningful.
#[derive(Default)]
pub struct ReportDescriptorBuilder {
    items: Vec<ItemType>,
}

impl ReportDescriptorBuilder {
    pub fn new() -> ReportDescriptorBuilder {
        ReportDescriptorBuilder::default()
    }

    /// Append an item to this builder. This will append the necessary
    /// bytes once [ReportDescriptorBuilder::build()] is called.
    pub fn append(mut self, item: ItemType) -> Self {
        self.items.push(item);
        self
    }

    /// Append the Usage Page of the given usage.
    ///
    /// Note that this appends the Usage Page only, not the Usage ID, so
    /// `usage_page(hut::GenericDesktop::X)` followed by a Usage from a
    /// different page leaves the mismatched page in place.
    ///
    /// This is a convenience wrapper for [Self::append()].
    #[cfg(feature = "hut")]
    pub fn usage_page(self, usage_page: impl hut::AsUsagePage) -> Self {
        let usage_page: UsagePage = usage_page.usage_page().into();
        self.append(usage_page.into())
    }

    /// Append the Usage ID of the given usage, without its Usage Page.
    ///
    /// This is a convenience wrapper for [Self::append()].
    #[cfg(feature = "hut")]
    pub fn usage_id(self, usage: impl hut::AsUsage) -> Self {
        let usage_id: UsageId = usage.usage().into();
        self.append(usage_id.into())
    }

    /// Open a collection of the given kind. Close it with
    /// [close_collection()](Self::close_collection).
    pub fn open_collection(self, kind: CollectionKind) -> Self {
        self.append(kind.into())
    }

    /// Close the most recently opened collection.
    pub fn close_collection(self) -> Self {
        self.append(MainItem::EndCollection.into())
    }

    /// Save the current global state, to be restored with
    /// [pop()](Self::pop).
    pub fn push(self) -> Self {
        self.append(GlobalItem::Push.into())
    }

    /// Restore the global state saved by the matching [push()](Self::push).
    pub fn pop(self) -> Self {
        self.append(GlobalItem::Pop.into())
    }

    /// Append an Input item with the given flags.
    pub fn input(self, flags: MainDataFlags) -> Self {
        self.append(MainItem::Input(flags).into())
    }

    /// Append an Output item with the given flags.
    pub fn output(self, flags: MainDataFlags) -> Self {
        self.append(MainItem::Output(flags).into())
    }

    /// Append a Feature item with the given flags.
    pub fn feature(self, flags: MainDataFlags) -> Self {
        self.append(MainItem::Feature(flags).into())
    }

    /// Build the report descriptor bytes for the current builder state.
    ///
    /// Each item's payload is encoded in the minimum number of bytes that
    /// holds its value.
    pub fn build(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = vec![];
        self.items.iter().for_each(|item| {
            bytes.extend(item.as_bytes());
        });
        bytes
    }
}
