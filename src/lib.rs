// SPDX-License-Identifier: MIT

//! A parser turning a HID Report Descriptor into a device description: the
//! nested collections a device declares and, per report ID, the number of
//! Input, Output and Feature bits a report of that ID carries. This is the
//! information a driver needs before it can route and size the reports a
//! device sends, without interpreting individual fields.
//!
//! ```
//! # use hiddesc::*;
//! let bytes: &[u8] = &[
//!     0x05, 0x01, // Usage Page (Generic Desktop)
//!     0x09, 0x02, // Usage (Mouse)
//!     0xa1, 0x01, // Collection (Application)
//!     0x75, 0x08, //   Report Size (8)
//!     0x95, 0x01, //   Report Count (1)
//!     0x81, 0x01, //   Input (Cnst,Arr,Abs)
//!     0xc0,       // End Collection
//! ];
//! let description = DeviceDescription::try_from(bytes).unwrap();
//! let collection = description.collections().first().unwrap();
//! assert_eq!(collection.input_bits(), 8);
//! let report = description.report(ReportId(0)).unwrap();
//! assert_eq!(report.input_bits(), 8);
//! ```
//!
//! Parsing is a single forward pass over the descriptor with no backtracking
//! and no partial results: the first malformed construct aborts the parse
//! with a [ParseError] carrying the byte offset of the offending item, an
//! [ErrorKind] and up to six error-specific diagnostic arguments. A
//! [DeviceDescription] owns all of its storage, dropping it releases
//! everything.
//!
//! The byte-level item layer lives in the [hid] module and can be used on
//! its own to itemize or build descriptors.

use thiserror::Error;

pub mod hid;
pub mod types;

use hid::*;
pub use types::*;

macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err);
        }
    };
}
pub(crate) use ensure;

/// Push/Pop nesting bound for the global item state, see
/// [ErrorKind::PushResources].
const GLOBAL_STACK_DEPTH: usize = 16;

/// Collection numbers are 8 bit, with 0 reserved as the no-parent sentinel.
const MAX_COLLECTIONS: usize = 255;

/// The reason a report descriptor was rejected.
///
/// Each kind fills [ParseError::args] with its own diagnostic values,
/// documented per variant. Unused trailing arguments are zero.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An item's declared payload or long-item body runs past the end of
    /// the buffer. `args[0]` is the declared payload length, `args[1]` the
    /// number of bytes actually left after the header.
    #[error("item payload runs past the end of the descriptor")]
    UnexpectedEnd,
    /// A reserved or unknown item tag, or an item value with no defined
    /// meaning. `args[0]` is the offending header byte or value.
    #[error("reserved or unknown item")]
    InvalidItem,
    /// Local or global item state improperly matched with a main item:
    /// an unterminated or reversed usage/designator/string range, a main
    /// item without ReportSize/ReportCount in scope, or a data field
    /// outside any collection.
    #[error("item state does not match the main item")]
    InvalidItemMix,
    /// Push nesting exceeded the supported depth. `args[0]` is the depth
    /// bound.
    #[error("push stack depth exceeded")]
    PushResources,
    /// Pop with no matching Push.
    #[error("pop with no matching push")]
    PopUnderflow,
    /// A Report ID item appeared while no collection was open. `args[0]`
    /// is the report ID.
    #[error("report id declared outside any collection")]
    ReportIdOutsideCollection,
    /// Explicit and implicit report ID use was mixed, a report ID spanned
    /// two top-level collections, or a report ID of zero was declared.
    /// `args[0]` is the report ID in scope (0 for none), `args[1]` the
    /// current top-level collection number.
    #[error("mixed explicit and implicit report id use")]
    ReportIdRegime,
    /// A top-level collection was opened with zero or more than one usage,
    /// or with aliased usages. `args[0]` is the would-be collection number,
    /// `args[1]` the usage count.
    #[error("top-level collection needs exactly one usage")]
    TopLevelCollectionUsage,
    /// A non-constant Input/Output/Feature item had no usage in scope.
    /// Only constant fields may go without one (report padding).
    #[error("non-constant main item with no usage")]
    MainItemNoUsage,
    /// An End Collection with no open collection, or end of input with
    /// collections still open. In the latter case `args[0]` is the number
    /// of collections left open.
    #[error("unbalanced end of collection")]
    UnexpectedEndCollection,
    /// A delimiter was still open at the end of the descriptor.
    #[error("delimiter left open")]
    NoCloseDelimiter,
    /// An item other than a usage declaration appeared inside a delimiter.
    /// `args[0]` is the offending item's header byte.
    #[error("only usages are allowed inside a delimiter")]
    InvalidDelimiterContent,
    /// A delimiter was opened while one was open, or closed while none
    /// was. `args[0]` is the delimiter value.
    #[error("delimiter open/close mismatch")]
    MismatchedDelimiter,
    /// The descriptor declares no top-level collection at all.
    #[error("no top-level collection found")]
    NoCollections,
    /// A report's accumulated bits are not a multiple of 8. `args[0..3]`
    /// are the Input/Output/Feature bit totals, `args[3]` the report ID.
    #[error("report bit length is not byte aligned")]
    ByteAlignment,
    /// A structurally valid construct this parser does not support: an
    /// Array-type main item combined with aliased usages, or more than
    /// 255 collections (`args[0]` is the collection count).
    #[error("valid but unsupported descriptor construct")]
    Unsupported,
}

/// The diagnostic record of a failed parse.
///
/// `offset` is the byte offset of the item that triggered the failure (for
/// end-of-input validation it is the descriptor length). The meaning of
/// `args` depends on `kind`, see [ErrorKind]; unused entries are zero.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at byte offset {offset}")]
pub struct ParseError {
    pub offset: usize,
    pub kind: ErrorKind,
    pub args: [u32; 6],
}

impl ParseError {
    pub(crate) fn new(offset: usize, kind: ErrorKind) -> ParseError {
        ParseError {
            offset,
            kind,
            args: [0; 6],
        }
    }

    pub(crate) fn with_args(offset: usize, kind: ErrorKind, args: &[u32]) -> ParseError {
        let mut padded = [0u32; 6];
        padded[..args.len()].copy_from_slice(args);
        ParseError {
            offset,
            kind,
            args: padded,
        }
    }
}

type Result<T> = std::result::Result<T, ParseError>;

/// The three kinds of data reports a HID device exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Input,
    Output,
    Feature,
}

/// One collection of a parsed device description.
///
/// Collections form a tree: the parent link is the [CollectionNumber] of
/// the enclosing collection, [CollectionNumber::NONE] for top-level ones.
/// Numbers are assigned in discovery order starting at 1, so a number is
/// resolved against [DeviceDescription::collections] at index number − 1.
///
/// The bit totals count the fields declared directly inside this
/// collection; bits of nested collections are recorded on the nested
/// collection only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectionDesc {
    usage_page: UsagePage,
    usage_id: UsageId,
    kind: CollectionKind,
    number: CollectionNumber,
    parent: CollectionNumber,
    input_bits: u32,
    output_bits: u32,
    feature_bits: u32,
}

impl CollectionDesc {
    /// The usage page naming this collection.
    pub fn usage_page(&self) -> UsagePage {
        self.usage_page
    }

    /// The usage naming this collection. Nested collections opened without
    /// a usage report usage 0.
    pub fn usage_id(&self) -> UsageId {
        self.usage_id
    }

    /// The collection kind (Application, Physical, ...).
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// This collection's number, unique within the description.
    pub fn number(&self) -> CollectionNumber {
        self.number
    }

    /// The number of the enclosing collection, or `None` for a top-level
    /// collection.
    pub fn parent(&self) -> Option<CollectionNumber> {
        match self.parent {
            CollectionNumber::NONE => None,
            parent => Some(parent),
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.parent == CollectionNumber::NONE
    }

    /// The number of bits of the given report kind declared directly in
    /// this collection.
    pub fn bits(&self, kind: ReportKind) -> u32 {
        match kind {
            ReportKind::Input => self.input_bits,
            ReportKind::Output => self.output_bits,
            ReportKind::Feature => self.feature_bits,
        }
    }

    pub fn input_bits(&self) -> u32 {
        self.input_bits
    }

    pub fn output_bits(&self) -> u32 {
        self.output_bits
    }

    pub fn feature_bits(&self) -> u32 {
        self.feature_bits
    }

    fn add_bits(&mut self, kind: ReportKind, bits: u32) {
        let total = match kind {
            ReportKind::Input => &mut self.input_bits,
            ReportKind::Output => &mut self.output_bits,
            ReportKind::Feature => &mut self.feature_bits,
        };
        *total = total.saturating_add(bits);
    }
}

/// The accumulated report lengths for one report ID.
///
/// The totals are the sum of `report size × report count` over every main
/// item carrying this report ID; the report-ID prefix byte a device sends
/// on the wire is not included. [ReportId] 0 stands for the single implicit
/// report of a device that declares no report IDs at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportIdEntry {
    report_id: ReportId,
    collection: CollectionNumber,
    input_bits: u32,
    output_bits: u32,
    feature_bits: u32,
}

impl ReportIdEntry {
    pub fn report_id(&self) -> ReportId {
        self.report_id
    }

    /// The top-level collection this report ID belongs to. A report ID
    /// never spans top-level collections.
    pub fn collection_number(&self) -> CollectionNumber {
        self.collection
    }

    /// The total number of bits of the given kind in this report.
    pub fn bits(&self, kind: ReportKind) -> u32 {
        match kind {
            ReportKind::Input => self.input_bits,
            ReportKind::Output => self.output_bits,
            ReportKind::Feature => self.feature_bits,
        }
    }

    pub fn input_bits(&self) -> u32 {
        self.input_bits
    }

    pub fn output_bits(&self) -> u32 {
        self.output_bits
    }

    pub fn feature_bits(&self) -> u32 {
        self.feature_bits
    }

    /// The report length in bytes. Exact, since a successful parse
    /// guarantees every total is byte aligned.
    pub fn byte_length(&self, kind: ReportKind) -> u32 {
        self.bits(kind) / 8
    }

    fn add_bits(&mut self, kind: ReportKind, bits: u32) {
        let total = match kind {
            ReportKind::Input => &mut self.input_bits,
            ReportKind::Output => &mut self.output_bits,
            ReportKind::Feature => &mut self.feature_bits,
        };
        *total = total.saturating_add(bits);
    }
}

/// The result of parsing a report descriptor.
///
/// Both tables are in discovery order, sized exactly to what the
/// descriptor declared, and owned by this struct.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescription {
    collections: Vec<CollectionDesc>,
    reports: Vec<ReportIdEntry>,
}

impl DeviceDescription {
    /// All collections in discovery order. Index 0 is the first top-level
    /// collection.
    pub fn collections(&self) -> &[CollectionDesc] {
        &self.collections
    }

    /// All report IDs in discovery order. A device that declares no report
    /// IDs has a single entry for the implicit [ReportId] 0.
    pub fn reports(&self) -> &[ReportIdEntry] {
        &self.reports
    }

    /// Look up a collection by its number. [CollectionNumber::NONE] has no
    /// collection.
    pub fn collection(&self, number: CollectionNumber) -> Option<&CollectionDesc> {
        let index = usize::from(u8::from(number)).checked_sub(1)?;
        self.collections.get(index)
    }

    /// Look up the entry for the given report ID.
    pub fn report(&self, id: ReportId) -> Option<&ReportIdEntry> {
        self.reports.iter().find(|entry| entry.report_id == id)
    }

    /// The top-level collections of the device.
    pub fn top_level_collections(&self) -> impl Iterator<Item = &CollectionDesc> {
        self.collections.iter().filter(|c| c.is_top_level())
    }
}

impl TryFrom<&[u8]> for DeviceDescription {
    type Error = ParseError;

    fn try_from(bytes: &[u8]) -> Result<DeviceDescription> {
        parse_report_descriptor(bytes)
    }
}

/// Parse a raw HID report descriptor into a [DeviceDescription].
///
/// Equivalent to [`DeviceDescription::try_from`].
pub fn parse(bytes: &[u8]) -> Result<DeviceDescription> {
    parse_report_descriptor(bytes)
}

// Everything here takes part in Push/Pop snapshots; only the usage page,
// report size/count and report ID feed the materialized description.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, Default)]
struct GlobalState {
    usage_page: Option<UsagePage>,
    logical_minimum: Option<LogicalMinimum>,
    logical_maximum: Option<LogicalMaximum>,
    physical_minimum: Option<PhysicalMinimum>,
    physical_maximum: Option<PhysicalMaximum>,
    unit_exponent: Option<UnitExponent>,
    unit: Option<Unit>,
    report_size: Option<ReportSize>,
    report_id: Option<ReportId>,
    report_count: Option<ReportCount>,
}

/// One usage, or one contiguous usage range, declared by local items.
#[derive(Debug, Clone, Copy)]
struct UsageEntry {
    /// Usage page carried by a 4-byte Usage item; `None` defers to the
    /// usage page in the global state.
    page: Option<UsagePage>,
    first: u32,
    last: u32,
    /// True if declared between Delimiter items, i.e. one of several
    /// aliases for the same field.
    delimited: bool,
}

impl UsageEntry {
    fn count(&self) -> u32 {
        self.last.saturating_sub(self.first).saturating_add(1)
    }
}

#[derive(Debug, Clone, Default)]
struct LocalState {
    usages: Vec<UsageEntry>,
    pending_usage_min: Option<u32>,
    pending_usage_max: Option<u32>,
    pending_designator_min: Option<u32>,
    pending_designator_max: Option<u32>,
    pending_string_min: Option<u32>,
    pending_string_max: Option<u32>,
    delimiter_open: bool,
}

impl LocalState {
    fn usage_count(&self) -> u32 {
        self.usages
            .iter()
            .fold(0u32, |acc, entry| acc.saturating_add(entry.count()))
    }

    fn any_delimited(&self) -> bool {
        self.usages.iter().any(|entry| entry.delimited)
    }

    /// True if a usage, designator or string range is missing its other
    /// half. Checked when a main item consumes the local state.
    fn has_pending_range(&self) -> bool {
        self.pending_usage_min.is_some()
            || self.pending_usage_max.is_some()
            || self.pending_designator_min.is_some()
            || self.pending_designator_max.is_some()
            || self.pending_string_min.is_some()
            || self.pending_string_max.is_some()
    }

    /// The first declared usage, with the global usage page filled in
    /// where the usage did not carry its own.
    fn first_usage(&self, global_page: Option<UsagePage>) -> (UsagePage, UsageId) {
        let fallback = global_page.unwrap_or(UsagePage(0));
        match self.usages.first() {
            Some(entry) => (
                entry.page.unwrap_or(fallback),
                UsageId((entry.first & 0xffff) as u16),
            ),
            None => (fallback, UsageId(0)),
        }
    }

    fn clear(&mut self) {
        *self = LocalState::default();
    }
}

/// The mutable item state of one parse: current global and local state
/// plus the Push/Pop snapshot stack.
#[derive(Debug, Default)]
struct ItemState {
    globals: GlobalState,
    locals: LocalState,
    saved: Vec<(GlobalState, LocalState)>,
}

impl ItemState {
    fn apply_global(&mut self, item: &GlobalItem, offset: usize, in_collection: bool) -> Result<()> {
        match item {
            GlobalItem::UsagePage(v) => self.globals.usage_page = Some(*v),
            GlobalItem::LogicalMinimum(v) => self.globals.logical_minimum = Some(*v),
            GlobalItem::LogicalMaximum(v) => self.globals.logical_maximum = Some(*v),
            GlobalItem::PhysicalMinimum(v) => self.globals.physical_minimum = Some(*v),
            GlobalItem::PhysicalMaximum(v) => self.globals.physical_maximum = Some(*v),
            GlobalItem::UnitExponent(v) => self.globals.unit_exponent = Some(*v),
            GlobalItem::Unit(v) => self.globals.unit = Some(*v),
            GlobalItem::ReportSize(v) => self.globals.report_size = Some(*v),
            GlobalItem::ReportId(id) => {
                // An explicit ID of zero would make the implicit report 0
                // coexist with the explicit regime.
                ensure!(
                    u8::from(id) != 0,
                    ParseError::with_args(offset, ErrorKind::ReportIdRegime, &[0])
                );
                ensure!(
                    in_collection,
                    ParseError::with_args(
                        offset,
                        ErrorKind::ReportIdOutsideCollection,
                        &[u8::from(id) as u32]
                    )
                );
                self.globals.report_id = Some(*id);
            }
            GlobalItem::ReportCount(v) => self.globals.report_count = Some(*v),
            GlobalItem::Push => {
                ensure!(
                    self.saved.len() < GLOBAL_STACK_DEPTH,
                    ParseError::with_args(
                        offset,
                        ErrorKind::PushResources,
                        &[GLOBAL_STACK_DEPTH as u32]
                    )
                );
                self.saved.push((self.globals, self.locals.clone()));
            }
            GlobalItem::Pop => {
                let Some((globals, locals)) = self.saved.pop() else {
                    return Err(ParseError::new(offset, ErrorKind::PopUnderflow));
                };
                self.globals = globals;
                self.locals = locals;
            }
            GlobalItem::Reserved { header } => {
                return Err(ParseError::with_args(
                    offset,
                    ErrorKind::InvalidItem,
                    &[*header as u32],
                ));
            }
        }
        Ok(())
    }

    fn apply_local(&mut self, item: &LocalItem, offset: usize) -> Result<()> {
        let locals = &mut self.locals;
        let delimited = locals.delimiter_open;
        match item {
            LocalItem::Usage(page, id) => locals.usages.push(UsageEntry {
                page: Some(*page),
                first: u16::from(id) as u32,
                last: u16::from(id) as u32,
                delimited,
            }),
            LocalItem::UsageId(id) => locals.usages.push(UsageEntry {
                page: None,
                first: u16::from(id) as u32,
                last: u16::from(id) as u32,
                delimited,
            }),
            LocalItem::UsageMinimum(v) => {
                let min = u32::from(v);
                match locals.pending_usage_max.take() {
                    Some(max) => {
                        ensure!(
                            min <= max,
                            ParseError::with_args(offset, ErrorKind::InvalidItemMix, &[min, max])
                        );
                        locals.usages.push(UsageEntry {
                            page: None,
                            first: min,
                            last: max,
                            delimited,
                        });
                    }
                    None => locals.pending_usage_min = Some(min),
                }
            }
            LocalItem::UsageMaximum(v) => {
                let max = u32::from(v);
                match locals.pending_usage_min.take() {
                    Some(min) => {
                        ensure!(
                            min <= max,
                            ParseError::with_args(offset, ErrorKind::InvalidItemMix, &[min, max])
                        );
                        locals.usages.push(UsageEntry {
                            page: None,
                            first: min,
                            last: max,
                            delimited,
                        });
                    }
                    None => locals.pending_usage_max = Some(max),
                }
            }
            // Designator and string declarations have no bearing on report
            // layout; they are tracked only far enough to validate range
            // pairing.
            LocalItem::DesignatorIndex(_) => {}
            LocalItem::DesignatorMinimum(v) => {
                let min = u32::from(v);
                match locals.pending_designator_max.take() {
                    Some(max) => ensure!(
                        min <= max,
                        ParseError::with_args(offset, ErrorKind::InvalidItemMix, &[min, max])
                    ),
                    None => locals.pending_designator_min = Some(min),
                }
            }
            LocalItem::DesignatorMaximum(v) => {
                let max = u32::from(v);
                match locals.pending_designator_min.take() {
                    Some(min) => ensure!(
                        min <= max,
                        ParseError::with_args(offset, ErrorKind::InvalidItemMix, &[min, max])
                    ),
                    None => locals.pending_designator_max = Some(max),
                }
            }
            LocalItem::StringIndex(_) => {}
            LocalItem::StringMinimum(v) => {
                let min = u32::from(v);
                match locals.pending_string_max.take() {
                    Some(max) => ensure!(
                        min <= max,
                        ParseError::with_args(offset, ErrorKind::InvalidItemMix, &[min, max])
                    ),
                    None => locals.pending_string_min = Some(min),
                }
            }
            LocalItem::StringMaximum(v) => {
                let max = u32::from(v);
                match locals.pending_string_min.take() {
                    Some(min) => ensure!(
                        min <= max,
                        ParseError::with_args(offset, ErrorKind::InvalidItemMix, &[min, max])
                    ),
                    None => locals.pending_string_max = Some(max),
                }
            }
            LocalItem::Delimiter(d) => match u32::from(d) {
                1 => {
                    ensure!(
                        !locals.delimiter_open,
                        ParseError::with_args(offset, ErrorKind::MismatchedDelimiter, &[1])
                    );
                    locals.delimiter_open = true;
                }
                0 => {
                    ensure!(
                        locals.delimiter_open,
                        ParseError::with_args(offset, ErrorKind::MismatchedDelimiter, &[0])
                    );
                    locals.delimiter_open = false;
                }
                value => {
                    return Err(ParseError::with_args(
                        offset,
                        ErrorKind::InvalidItem,
                        &[value],
                    ));
                }
            },
            LocalItem::Reserved { header } => {
                return Err(ParseError::with_args(
                    offset,
                    ErrorKind::InvalidItem,
                    &[*header as u32],
                ));
            }
        }
        Ok(())
    }
}

/// The open-collection stack plus every collection discovered so far. The
/// node table becomes [DeviceDescription::collections] once the parse
/// succeeds.
#[derive(Debug, Default)]
struct CollectionStack {
    nodes: Vec<CollectionDesc>,
    open: Vec<usize>,
}

impl CollectionStack {
    fn depth(&self) -> usize {
        self.open.len()
    }

    /// The number of the top-level collection currently open.
    fn top_level(&self) -> Option<CollectionNumber> {
        self.open.first().map(|&index| self.nodes[index].number)
    }

    fn innermost_mut(&mut self) -> Option<&mut CollectionDesc> {
        self.open.last().map(|&index| &mut self.nodes[index])
    }

    fn open_collection(
        &mut self,
        kind: CollectionKind,
        usage_page: UsagePage,
        usage_id: UsageId,
        offset: usize,
    ) -> Result<()> {
        ensure!(
            self.nodes.len() < MAX_COLLECTIONS,
            ParseError::with_args(
                offset,
                ErrorKind::Unsupported,
                &[self.nodes.len() as u32 + 1]
            )
        );
        let number = CollectionNumber((self.nodes.len() + 1) as u8);
        let parent = self
            .open
            .last()
            .map(|&index| self.nodes[index].number)
            .unwrap_or(CollectionNumber::NONE);
        self.nodes.push(CollectionDesc {
            usage_page,
            usage_id,
            kind,
            number,
            parent,
            input_bits: 0,
            output_bits: 0,
            feature_bits: 0,
        });
        self.open.push(self.nodes.len() - 1);
        Ok(())
    }

    fn close_collection(&mut self, offset: usize) -> Result<()> {
        ensure!(
            self.open.pop().is_some(),
            ParseError::new(offset, ErrorKind::UnexpectedEndCollection)
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdRegime {
    Implicit,
    Explicit,
}

/// Per-report-ID accumulation plus the explicit/implicit declaration
/// regime. A descriptor must commit to one regime for all of its main
/// items.
#[derive(Debug, Default)]
struct ReportTable {
    entries: Vec<ReportIdEntry>,
    regime: Option<IdRegime>,
}

impl ReportTable {
    fn record(
        &mut self,
        id: Option<ReportId>,
        collection: CollectionNumber,
        kind: ReportKind,
        bits: u32,
        offset: usize,
    ) -> Result<()> {
        let regime = match id {
            Some(_) => IdRegime::Explicit,
            None => IdRegime::Implicit,
        };
        let id = id.unwrap_or(ReportId(0));
        let args = [u8::from(id) as u32, u8::from(collection) as u32];
        match self.regime {
            None => self.regime = Some(regime),
            Some(current) => ensure!(
                current == regime,
                ParseError::with_args(offset, ErrorKind::ReportIdRegime, &args)
            ),
        }
        let entry = match self.entries.iter().position(|e| e.report_id == id) {
            Some(position) => {
                // A report ID never spans top-level collections.
                ensure!(
                    self.entries[position].collection == collection,
                    ParseError::with_args(offset, ErrorKind::ReportIdRegime, &args)
                );
                &mut self.entries[position]
            }
            None => {
                self.entries.push(ReportIdEntry {
                    report_id: id,
                    collection,
                    input_bits: 0,
                    output_bits: 0,
                    feature_bits: 0,
                });
                self.entries.last_mut().unwrap()
            }
        };
        entry.add_bits(kind, bits);
        Ok(())
    }
}

/// True for the items allowed between a delimiter open and close: usage
/// declarations, the delimiter items themselves, and long items (which
/// are skipped everywhere).
fn delimiter_content_allowed(item: &ItemType) -> bool {
    matches!(
        item,
        ItemType::Local(
            LocalItem::Usage(..)
                | LocalItem::UsageId(..)
                | LocalItem::UsageMinimum(..)
                | LocalItem::UsageMaximum(..)
                | LocalItem::Delimiter(..)
        ) | ItemType::Long { .. }
    )
}

/// All mutable state of one parse invocation. Confined to the stack of the
/// parse call, so concurrent parses are independent by construction.
#[derive(Debug, Default)]
struct ParseSession {
    state: ItemState,
    collections: CollectionStack,
    reports: ReportTable,
}

impl ParseSession {
    fn apply(&mut self, item: &DescriptorItem) -> Result<()> {
        let offset = item.offset();
        if self.state.locals.delimiter_open && !delimiter_content_allowed(item.item()) {
            return Err(ParseError::with_args(
                offset,
                ErrorKind::InvalidDelimiterContent,
                &[item.header() as u32],
            ));
        }
        match item.item() {
            ItemType::Main(main) => self.apply_main(main, offset),
            ItemType::Global(global) => {
                self.state
                    .apply_global(global, offset, self.collections.depth() > 0)
            }
            ItemType::Local(local) => self.state.apply_local(local, offset),
            // Long items are reserved for future use; nothing to interpret.
            ItemType::Long { .. } => Ok(()),
            ItemType::Reserved { header } => Err(ParseError::with_args(
                offset,
                ErrorKind::InvalidItem,
                &[*header as u32],
            )),
        }
    }

    fn apply_main(&mut self, item: &MainItem, offset: usize) -> Result<()> {
        match item {
            MainItem::Input(flags) => self.data_main(ReportKind::Input, *flags, offset),
            MainItem::Output(flags) => self.data_main(ReportKind::Output, *flags, offset),
            MainItem::Feature(flags) => self.data_main(ReportKind::Feature, *flags, offset),
            MainItem::Collection(kind) => self.open_collection(*kind, offset),
            MainItem::EndCollection => self.collections.close_collection(offset),
            MainItem::Reserved { header } => Err(ParseError::with_args(
                offset,
                ErrorKind::InvalidItem,
                &[*header as u32],
            )),
        }?;
        // Section 6.2.2.8: local items do not carry over to the next main
        // item. This holds for every main item, collections included.
        self.state.locals.clear();
        Ok(())
    }

    fn open_collection(&mut self, kind: CollectionKind, offset: usize) -> Result<()> {
        let locals = &self.state.locals;
        ensure!(
            !locals.has_pending_range(),
            ParseError::new(offset, ErrorKind::InvalidItemMix)
        );
        if self.collections.depth() == 0 {
            // A top-level collection must be named by exactly one usage,
            // and aliased usages cannot name it.
            let count = locals.usage_count();
            ensure!(
                count == 1 && !locals.any_delimited(),
                ParseError::with_args(
                    offset,
                    ErrorKind::TopLevelCollectionUsage,
                    &[self.collections.nodes.len() as u32 + 1, count]
                )
            );
        }
        let (usage_page, usage_id) = locals.first_usage(self.state.globals.usage_page);
        self.collections
            .open_collection(kind, usage_page, usage_id, offset)
    }

    fn data_main(&mut self, kind: ReportKind, flags: MainDataFlags, offset: usize) -> Result<()> {
        let locals = &self.state.locals;
        let globals = &self.state.globals;
        ensure!(
            !locals.has_pending_range(),
            ParseError::new(offset, ErrorKind::InvalidItemMix)
        );
        let Some(report_size) = globals.report_size else {
            return Err(ParseError::new(offset, ErrorKind::InvalidItemMix));
        };
        let Some(report_count) = globals.report_count else {
            return Err(ParseError::new(offset, ErrorKind::InvalidItemMix));
        };
        if locals.usages.is_empty() {
            // Only constant fields may go without a usage; they pad the
            // report.
            ensure!(
                flags.is_constant(),
                ParseError::new(offset, ErrorKind::MainItemNoUsage)
            );
        } else if flags.is_array() && locals.any_delimited() {
            // Aliased usages cannot be matched to array indices.
            return Err(ParseError::new(offset, ErrorKind::Unsupported));
        }
        let Some(collection) = self.collections.top_level() else {
            // A data field outside any collection belongs to no report.
            return Err(ParseError::new(offset, ErrorKind::InvalidItemMix));
        };
        let bits = (usize::from(report_size) as u64)
            .saturating_mul(usize::from(report_count) as u64)
            .min(u32::MAX as u64) as u32;
        self.reports
            .record(globals.report_id, collection, kind, bits, offset)?;
        if let Some(node) = self.collections.innermost_mut() {
            node.add_bits(kind, bits);
        }
        Ok(())
    }

    /// End-of-input validation, then freeze the tables.
    fn finish(self, end: usize) -> Result<DeviceDescription> {
        ensure!(
            !self.state.locals.delimiter_open,
            ParseError::new(end, ErrorKind::NoCloseDelimiter)
        );
        ensure!(
            self.collections.open.is_empty(),
            ParseError::with_args(
                end,
                ErrorKind::UnexpectedEndCollection,
                &[self.collections.open.len() as u32]
            )
        );
        ensure!(
            !self.collections.nodes.is_empty(),
            ParseError::new(end, ErrorKind::NoCollections)
        );
        for entry in &self.reports.entries {
            ensure!(
                entry.input_bits % 8 == 0
                    && entry.output_bits % 8 == 0
                    && entry.feature_bits % 8 == 0,
                ParseError::with_args(
                    end,
                    ErrorKind::ByteAlignment,
                    &[
                        entry.input_bits,
                        entry.output_bits,
                        entry.feature_bits,
                        u8::from(entry.report_id) as u32
                    ]
                )
            );
        }
        Ok(DeviceDescription {
            collections: self.collections.nodes,
            reports: self.reports.entries,
        })
    }
}

fn parse_report_descriptor(bytes: &[u8]) -> Result<DeviceDescription> {
    let mut session = ParseSession::default();
    for item in ItemReader::new(bytes) {
        session.apply(&item?)?;
    }
    session.finish(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hut;

    fn variable() -> MainDataFlags {
        MainDataFlags::new().variable()
    }

    fn constant() -> MainDataFlags {
        MainDataFlags::new().constant()
    }

    #[rustfmt::skip]
    const BOOT_MOUSE: &[u8] = &[
        0x05, 0x01, // Usage Page (Generic Desktop)
        0x09, 0x02, // Usage (Mouse)
        0xa1, 0x01, // Collection (Application)
        0x09, 0x01, //   Usage (Pointer)
        0xa1, 0x00, //   Collection (Physical)
        0x05, 0x09, //     Usage Page (Button)
        0x19, 0x01, //     Usage Minimum (1)
        0x29, 0x03, //     Usage Maximum (3)
        0x15, 0x00, //     Logical Minimum (0)
        0x25, 0x01, //     Logical Maximum (1)
        0x95, 0x03, //     Report Count (3)
        0x75, 0x01, //     Report Size (1)
        0x81, 0x02, //     Input (Data,Var,Abs)
        0x95, 0x01, //     Report Count (1)
        0x75, 0x05, //     Report Size (5)
        0x81, 0x01, //     Input (Cnst,Arr,Abs)
        0x05, 0x01, //     Usage Page (Generic Desktop)
        0x09, 0x30, //     Usage (X)
        0x09, 0x31, //     Usage (Y)
        0x15, 0x81, //     Logical Minimum (-127)
        0x25, 0x7f, //     Logical Maximum (127)
        0x75, 0x08, //     Report Size (8)
        0x95, 0x02, //     Report Count (2)
        0x81, 0x06, //     Input (Data,Var,Rel)
        0xc0,       //   End Collection
        0xc0,       // End Collection
    ];

    #[test]
    fn boot_mouse() {
        let desc = parse(BOOT_MOUSE).unwrap();

        assert_eq!(desc.collections().len(), 2);
        let application = &desc.collections()[0];
        assert_eq!(application.number(), CollectionNumber(1));
        assert_eq!(application.kind(), CollectionKind::Application);
        assert_eq!(application.usage_page(), UsagePage(0x01));
        assert_eq!(application.usage_id(), UsageId(0x02));
        assert!(application.is_top_level());
        assert_eq!(application.parent(), None);

        let physical = &desc.collections()[1];
        assert_eq!(physical.number(), CollectionNumber(2));
        assert_eq!(physical.kind(), CollectionKind::Physical);
        assert_eq!(physical.parent(), Some(CollectionNumber(1)));
        // fields are accounted to the innermost collection
        assert_eq!(physical.input_bits(), 24);
        assert_eq!(application.input_bits(), 0);

        assert_eq!(desc.reports().len(), 1);
        let report = desc.report(ReportId(0)).unwrap();
        assert_eq!(report.collection_number(), CollectionNumber(1));
        assert_eq!(report.input_bits(), 24);
        assert_eq!(report.output_bits(), 0);
        assert_eq!(report.feature_bits(), 0);
        assert_eq!(report.byte_length(ReportKind::Input), 3);

        assert_eq!(desc.top_level_collections().count(), 1);
        assert_eq!(desc.collection(CollectionNumber::NONE), None);
        assert_eq!(
            desc.collection(CollectionNumber(2)).unwrap().number(),
            CollectionNumber(2)
        );
    }

    #[test]
    fn single_collection_with_padding() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Mouse)
            .open_collection(CollectionKind::Application)
            .append(ReportSize::from(1).into())
            .append(ReportCount::from(8).into())
            .input(constant())
            .close_collection()
            .build();
        let desc = parse(&rdesc).unwrap();
        assert_eq!(desc.collections().len(), 1);
        assert_eq!(desc.collections()[0].input_bits(), 8);
        assert_eq!(desc.reports().len(), 1);
        assert_eq!(desc.reports()[0].report_id(), ReportId(0));
    }

    #[test]
    fn unterminated_collection() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Mouse)
            .open_collection(CollectionKind::Application)
            .append(ReportSize::from(1).into())
            .append(ReportCount::from(8).into())
            .input(constant())
            .build();
        let err = parse(&rdesc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedEndCollection);
        assert_eq!(err.offset, rdesc.len());
        assert_eq!(err.args[0], 1);
    }

    #[test]
    fn extra_end_collection() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x02, // Usage (Mouse)
            0xa1, 0x01, // Collection (Application)
            0x75, 0x08, //   Report Size (8)
            0x95, 0x01, //   Report Count (1)
            0x81, 0x01, //   Input (Cnst,Arr,Abs)
            0xc0,       // End Collection
            0xc0,       // End Collection (unmatched)
        ];
        let err = parse(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedEndCollection);
        assert_eq!(err.offset, 13);
    }

    #[test]
    fn byte_alignment() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Mouse)
            .open_collection(CollectionKind::Application)
            .append(ReportSize::from(3).into())
            .append(ReportCount::from(1).into())
            .input(constant())
            .close_collection()
            .build();
        let err = parse(&rdesc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ByteAlignment);
        assert_eq!(err.offset, rdesc.len());
        // input/output/feature totals plus the report id
        assert_eq!(err.args[..4], [3, 0, 0, 0]);
    }

    #[test]
    fn local_state_resets_after_main_item() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Mouse)
            .open_collection(CollectionKind::Application)
            .append(LogicalMinimum::from(0).into())
            .append(LogicalMaximum::from(1).into())
            .append(ReportSize::from(8).into())
            .append(ReportCount::from(1).into())
            .usage_id(hut::GenericDesktop::X)
            .input(variable())
            .input(variable()) // usage was consumed by the previous item
            .close_collection()
            .build();
        let err = parse(&rdesc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MainItemNoUsage);
        // the second input item, before the trailing end collection
        assert_eq!(err.offset, rdesc.len() - 3);
    }

    #[test]
    fn report_id_spans_top_level_collections() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Keyboard)
            .open_collection(CollectionKind::Application)
            .append(ReportId::from(1u8).into())
            .append(ReportSize::from(8).into())
            .append(ReportCount::from(1).into())
            .usage_id(hut::GenericDesktop::X)
            .input(variable())
            .close_collection()
            .usage_id(hut::GenericDesktop::Mouse)
            .open_collection(CollectionKind::Application)
            .usage_id(hut::GenericDesktop::Y)
            .input(variable()) // still report id 1, now in collection 2
            .close_collection()
            .build();
        let err = parse(&rdesc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReportIdRegime);
        assert_eq!(err.args[0], 1);
        assert_eq!(err.args[1], 2);
    }

    #[test]
    fn implicit_then_explicit_report_id() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Keyboard)
            .open_collection(CollectionKind::Application)
            .append(ReportSize::from(8).into())
            .append(ReportCount::from(1).into())
            .usage_id(hut::GenericDesktop::X)
            .input(variable())
            .close_collection()
            .usage_id(hut::GenericDesktop::Mouse)
            .open_collection(CollectionKind::Application)
            .append(ReportId::from(2u8).into())
            .usage_id(hut::GenericDesktop::Y)
            .input(variable())
            .close_collection()
            .build();
        let err = parse(&rdesc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReportIdRegime);
        assert_eq!(err.args[0], 2);
        assert_eq!(err.args[1], 2);
    }

    #[test]
    fn explicit_zero_report_id() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x06, // Usage (Keyboard)
            0xa1, 0x01, // Collection (Application)
            0x85, 0x00, //   Report ID (0)
            0xc0,       // End Collection
        ];
        let err = parse(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReportIdRegime);
        assert_eq!(err.offset, 6);
    }

    #[test]
    fn report_id_outside_collection() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x85, 0x01, // Report ID (1)
        ];
        let err = parse(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReportIdOutsideCollection);
        assert_eq!(err.offset, 2);
        assert_eq!(err.args[0], 1);
    }

    #[test]
    fn pop_underflow() {
        let err = parse(&[0xb4]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PopUnderflow);
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn push_depth_bound() {
        let bytes = [0xa4u8; GLOBAL_STACK_DEPTH + 1];
        let err = parse(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PushResources);
        assert_eq!(err.offset, GLOBAL_STACK_DEPTH);
        assert_eq!(err.args[0], GLOBAL_STACK_DEPTH as u32);
    }

    #[test]
    fn push_pop_restores_global_state() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Mouse)
            .open_collection(CollectionKind::Application)
            .append(LogicalMinimum::from(0).into())
            .append(LogicalMaximum::from(1).into())
            .append(ReportSize::from(8).into())
            .append(ReportCount::from(1).into())
            .push()
            .append(ReportSize::from(16).into())
            .usage_id(hut::GenericDesktop::X)
            .input(variable()) // 16 bits
            .pop()
            .usage_id(hut::GenericDesktop::Y)
            .input(variable()) // 8 bits, size restored by pop
            .close_collection()
            .build();
        let desc = parse(&rdesc).unwrap();
        assert_eq!(desc.report(ReportId(0)).unwrap().input_bits(), 24);
    }

    #[test]
    fn delimited_usages() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Keyboard)
            .open_collection(CollectionKind::Application)
            .append(LogicalMinimum::from(0).into())
            .append(LogicalMaximum::from(1).into())
            .append(ReportSize::from(8).into())
            .append(ReportCount::from(1).into())
            .append(Delimiter::from(1u32).into())
            .usage_id(hut::GenericDesktop::X)
            .usage_id(hut::GenericDesktop::Y)
            .append(Delimiter::from(0u32).into())
            .input(variable())
            .close_collection()
            .build();
        let desc = parse(&rdesc).unwrap();
        assert_eq!(desc.report(ReportId(0)).unwrap().input_bits(), 8);
    }

    #[test]
    fn delimiter_left_open() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Keyboard)
            .open_collection(CollectionKind::Application)
            .append(Delimiter::from(1u32).into())
            .usage_id(hut::GenericDesktop::X)
            .build();
        let err = parse(&rdesc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoCloseDelimiter);
        assert_eq!(err.offset, rdesc.len());
    }

    #[test]
    fn invalid_delimiter_content() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x06, // Usage (Keyboard)
            0xa1, 0x01, // Collection (Application)
            0xa9, 0x01, //   Delimiter (open)
            0x15, 0x00, //   Logical Minimum (0)
        ];
        let err = parse(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidDelimiterContent);
        assert_eq!(err.offset, 8);
        assert_eq!(err.args[0], 0x15);
    }

    #[test]
    fn mismatched_delimiter() {
        // close with nothing open
        let err = parse(&[0xa9, 0x00]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MismatchedDelimiter);
        assert_eq!(err.offset, 0);

        // open while open
        let err = parse(&[0xa9, 0x01, 0xa9, 0x01]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MismatchedDelimiter);
        assert_eq!(err.offset, 2);

        // delimiter value with no defined meaning
        let err = parse(&[0xa9, 0x02]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidItem);
        assert_eq!(err.args[0], 2);
    }

    #[test]
    fn array_with_delimited_usages() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Keyboard)
            .open_collection(CollectionKind::Application)
            .append(ReportSize::from(8).into())
            .append(ReportCount::from(1).into())
            .append(Delimiter::from(1u32).into())
            .usage_id(hut::GenericDesktop::X)
            .usage_id(hut::GenericDesktop::Y)
            .append(Delimiter::from(0u32).into())
            .input(MainDataFlags::new()) // data, array
            .close_collection()
            .build();
        let err = parse(&rdesc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unsupported);
    }

    #[test]
    fn truncated_item_reports_item_offset() {
        // a single header byte declaring a 4-byte payload
        let err = parse(&[0x07]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedEnd);
        assert_eq!(err.offset, 0);
        assert_eq!(err.args[0], 4);
        assert_eq!(err.args[1], 0);
    }

    #[test]
    fn no_collections() {
        let err = parse(&[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoCollections);
        assert_eq!(err.offset, 0);

        let err = parse(&[0x05, 0x01]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoCollections);
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn invalid_items() {
        // reserved item type
        let err = parse(&[0x0c]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidItem);
        assert_eq!(err.args[0], 0x0c);

        // reserved main item tag
        let err = parse(&[0x05, 0x01, 0x00]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidItem);
        assert_eq!(err.offset, 2);

        // reserved global item tag
        let err = parse(&[0xc4]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidItem);

        // reserved local item tag
        let err = parse(&[0xf8]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidItem);
    }

    #[test]
    fn missing_report_size_or_count() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Mouse)
            .open_collection(CollectionKind::Application)
            .append(ReportCount::from(1).into())
            .usage_id(hut::GenericDesktop::X)
            .input(variable())
            .close_collection()
            .build();
        let err = parse(&rdesc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidItemMix);
    }

    #[test]
    fn data_field_outside_collection() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .append(ReportSize::from(8).into())
            .append(ReportCount::from(1).into())
            .usage_id(hut::GenericDesktop::X)
            .input(variable())
            .build();
        let err = parse(&rdesc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidItemMix);
    }

    #[test]
    fn top_level_collection_usage() {
        // no usage at all
        let err = parse(&[0xa1, 0x01]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TopLevelCollectionUsage);
        assert_eq!(err.args[..2], [1, 0]);

        // more than one usage
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::X)
            .usage_id(hut::GenericDesktop::Y)
            .open_collection(CollectionKind::Application)
            .build();
        let err = parse(&rdesc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TopLevelCollectionUsage);
        assert_eq!(err.args[..2], [1, 2]);

        // a single but aliased usage
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .append(Delimiter::from(1u32).into())
            .usage_id(hut::GenericDesktop::Mouse)
            .append(Delimiter::from(0u32).into())
            .open_collection(CollectionKind::Application)
            .build();
        let err = parse(&rdesc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TopLevelCollectionUsage);
    }

    #[test]
    fn top_level_usage_from_range() {
        // a one-element usage range names the collection
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .append(UsageMinimum::from(5u32).into())
            .append(UsageMaximum::from(5u32).into())
            .open_collection(CollectionKind::Application)
            .append(ReportSize::from(8).into())
            .append(ReportCount::from(1).into())
            .input(constant())
            .close_collection()
            .build();
        let desc = parse(&rdesc).unwrap();
        assert_eq!(desc.collections()[0].usage_id(), UsageId(5));
    }

    #[test]
    fn unterminated_usage_range() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Keyboard)
            .open_collection(CollectionKind::Application)
            .append(ReportSize::from(8).into())
            .append(ReportCount::from(1).into())
            .append(UsageMinimum::from(1u32).into())
            .input(variable())
            .close_collection()
            .build();
        let err = parse(&rdesc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidItemMix);
    }

    #[test]
    fn reversed_usage_range() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .append(UsageMinimum::from(5u32).into())
            .append(UsageMaximum::from(2u32).into())
            .build();
        let err = parse(&rdesc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidItemMix);
        assert_eq!(err.args[..2], [5, 2]);
    }

    #[test]
    fn long_items_are_skipped() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01,                   // Usage Page (Generic Desktop)
            0xfe, 0x03, 0x42, 1, 2, 3,    // long item, tag 0x42, 3 data bytes
            0x09, 0x02,                   // Usage (Mouse)
            0xa1, 0x01,                   // Collection (Application)
            0x75, 0x08,                   //   Report Size (8)
            0x95, 0x01,                   //   Report Count (1)
            0x81, 0x01,                   //   Input (Cnst,Arr,Abs)
            0xc0,                         // End Collection
        ];
        let desc = parse(&bytes).unwrap();
        assert_eq!(desc.report(ReportId(0)).unwrap().input_bits(), 8);
    }

    #[test]
    fn nested_collection_numbering() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Mouse)
            .open_collection(CollectionKind::Application)
            .usage_id(hut::GenericDesktop::Pointer)
            .open_collection(CollectionKind::Physical)
            .open_collection(CollectionKind::Logical)
            .close_collection()
            .close_collection()
            .usage_id(hut::GenericDesktop::Pointer)
            .open_collection(CollectionKind::Physical)
            .close_collection()
            .close_collection()
            .build();
        let desc = parse(&rdesc).unwrap();
        let numbers: Vec<u8> = desc.collections().iter().map(|c| c.number().0).collect();
        let parents: Vec<u8> = desc
            .collections()
            .iter()
            .map(|c| c.parent().map(|p| p.0).unwrap_or(0))
            .collect();
        assert_eq!(numbers, [1, 2, 3, 4]);
        assert_eq!(parents, [0, 1, 2, 1]);
        assert_eq!(
            desc.collection(CollectionNumber(3)).unwrap().kind(),
            CollectionKind::Logical
        );
        // nested collections opened without a usage report usage 0
        assert_eq!(desc.collection(CollectionNumber(3)).unwrap().usage_id(), UsageId(0));
    }

    #[test]
    fn per_report_id_accounting() {
        let rdesc = ReportDescriptorBuilder::new()
            .usage_page(hut::UsagePage::GenericDesktop)
            .usage_id(hut::GenericDesktop::Keyboard)
            .open_collection(CollectionKind::Application)
            .append(ReportId::from(1u8).into())
            .append(LogicalMinimum::from(0).into())
            .append(LogicalMaximum::from(1).into())
            .append(ReportSize::from(8).into())
            .append(ReportCount::from(2).into())
            .usage_id(hut::GenericDesktop::X)
            .input(variable())
            .append(ReportCount::from(1).into())
            .usage_id(hut::GenericDesktop::Y)
            .feature(variable())
            .close_collection()
            .usage_id(hut::GenericDesktop::Mouse)
            .open_collection(CollectionKind::Application)
            .append(ReportId::from(2u8).into())
            .append(ReportSize::from(16).into())
            .append(ReportCount::from(1).into())
            .usage_id(hut::GenericDesktop::X)
            .input(variable())
            .append(ReportSize::from(8).into())
            .usage_id(hut::GenericDesktop::Y)
            .output(variable())
            .close_collection()
            .build();
        let desc = parse(&rdesc).unwrap();

        assert_eq!(desc.collections().len(), 2);
        assert_eq!(desc.reports().len(), 2);

        let first = desc.report(ReportId(1)).unwrap();
        assert_eq!(first.collection_number(), CollectionNumber(1));
        assert_eq!(first.input_bits(), 16);
        assert_eq!(first.output_bits(), 0);
        assert_eq!(first.feature_bits(), 8);

        let second = desc.report(ReportId(2)).unwrap();
        assert_eq!(second.collection_number(), CollectionNumber(2));
        assert_eq!(second.input_bits(), 16);
        assert_eq!(second.output_bits(), 8);
        assert_eq!(second.feature_bits(), 0);
    }
}
