//! Flat byte arena holding a compiled circuit.
//!
//! The arena is the executable form of a [`Circuit`](crate::circuit::Circuit):
//! a single contiguous buffer of variable-length records, produced once by the
//! [`compiler`](crate::compiler) and then mutated in place by the
//! [`evaluator`](crate::evaluator). Nothing allocates per tick.
//!
//! Storage is a `Vec<u32>`, so the byte view is always 4-aligned and every
//! record header can be reinterpreted with `bytemuck` without copies into
//! misaligned memory. Typed reads and writes check alignment and bounds and
//! panic on violation: a bad offset is a compiler bug, not a runtime
//! condition. Loading an arena from outside runs [`Arena::validate`] first.
//!
//! See [`layout`] for the record formats.

pub mod dump;
pub mod layout;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use bytemuck::Pod;

use layout::{
    BusRecord, FunctionRecord, GateRecord, InputRecord, RecordKind, UnaryRecord,
    GATE_OUTPUT_FIELD, TOTAL_SIZE_FIELD,
};

pub use dump::{Records, RecordInfo};

/// Byte offset into an [`Arena`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Offset(pub(crate) u32);

impl Offset {
    /// Offset of the root record.
    pub const ROOT: Offset = Offset(0);

    /// Creates an offset from a raw byte position.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw byte position.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns this offset advanced by `bytes`.
    #[inline]
    pub const fn add(self, bytes: u32) -> Self {
        Self(self.0 + bytes)
    }
}

impl core::fmt::Display for Offset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Errors produced when loading or validating an arena.
#[derive(Debug)]
pub enum ArenaError {
    /// Raw image length is not a multiple of 4.
    UnalignedLength(usize),
    /// A record or array extends past its container or the arena end.
    Truncated {
        /// Offset of the offending record.
        offset: u32,
        /// Byte position the record claims to reach.
        end: u32,
        /// Limit it must stay within.
        limit: u32,
    },
    /// A record does not start on a 4-byte boundary.
    Misaligned(u32),
    /// Byte 0 of a record is not a known tag.
    UnknownTag {
        /// Offset of the record.
        offset: u32,
        /// Tag byte found.
        tag: u8,
    },
    /// A record's `total_size` is smaller than its header or not aligned.
    BadRecordSize {
        /// Offset of the record.
        offset: u32,
        /// Size found.
        total_size: u32,
    },
    /// The arena does not start with a root record spanning the whole buffer.
    MissingRoot,
    /// An input cell points outside the arena.
    DanglingInput {
        /// Offset of the input cell.
        cell: u32,
        /// Target it points to.
        target: u32,
    },
    /// A function's target table names a record of the wrong kind.
    BadTarget {
        /// Offset of the function record.
        function: u32,
        /// Offset found in the table.
        target: u32,
    },
    /// A record's connector count disagrees with the layout that feeds it:
    /// a function versus its boundary targets, or a bus versus its shared
    /// storage.
    ArityMismatch {
        /// Offset of the record.
        record: u32,
        /// Count the record declares.
        expected: u32,
        /// Count its layout provides.
        found: u32,
    },
    /// I/O failure while reading or writing an arena file.
    #[cfg(feature = "std")]
    Io(std::io::Error),
}

impl core::fmt::Display for ArenaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnalignedLength(len) => write!(f, "arena length {len} is not a multiple of 4"),
            Self::Truncated { offset, end, limit } => write!(
                f,
                "record at {offset:#x} reaches {end:#x}, past its limit {limit:#x}"
            ),
            Self::Misaligned(offset) => write!(f, "record at {offset:#x} is not 4-byte aligned"),
            Self::UnknownTag { offset, tag } => {
                write!(f, "unknown record tag {tag} at {offset:#x}")
            }
            Self::BadRecordSize { offset, total_size } => {
                write!(f, "record at {offset:#x} has invalid size {total_size}")
            }
            Self::MissingRoot => write!(f, "arena does not start with a root record"),
            Self::DanglingInput { cell, target } => {
                write!(f, "input cell {cell:#x} points outside the arena ({target:#x})")
            }
            Self::BadTarget { function, target } => write!(
                f,
                "function at {function:#x} lists {target:#x}, which is not a boundary node"
            ),
            Self::ArityMismatch {
                record,
                expected,
                found,
            } => write!(
                f,
                "record at {record:#x} declares {expected} connectors but its layout provides {found}"
            ),
            #[cfg(feature = "std")]
            Self::Io(e) => write!(f, "arena I/O failed: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ArenaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for ArenaError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Contiguous, 4-aligned record buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Arena {
    words: Vec<u32>,
}

impl Arena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Size in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        (self.words.len() * 4) as u32
    }

    /// Returns `true` if nothing has been allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Byte view of the whole arena.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    #[inline]
    fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.words)
    }

    /// Appends `bytes` zeroed bytes (rounded up to 4) and returns the offset
    /// of the first one.
    pub(crate) fn alloc(&mut self, bytes: u32) -> Offset {
        let at = Offset(self.len());
        let words = layout::align4(bytes) / 4;
        let new_len = self.words.len() + words as usize;
        assert!(
            new_len <= (u32::MAX / 4) as usize,
            "arena exceeds the 32-bit offset space"
        );
        self.words.resize(new_len, 0);
        at
    }

    // --- Typed access ---

    /// Reads a `T` at `at`.
    ///
    /// # Panics
    ///
    /// Panics if `at` is not aligned for `T` or the value extends past the end.
    #[inline]
    pub fn read<T: Pod>(&self, at: Offset) -> T {
        match self.try_read(at) {
            Some(value) => value,
            None => panic!(
                "arena read of {} bytes at {at} out of bounds or misaligned (len {})",
                core::mem::size_of::<T>(),
                self.len()
            ),
        }
    }

    /// Reads a `T` at `at`, or `None` if it is misaligned or out of bounds.
    pub fn try_read<T: Pod>(&self, at: Offset) -> Option<T> {
        let start = at.0 as usize;
        let end = start.checked_add(core::mem::size_of::<T>())?;
        let bytes = self.as_bytes().get(start..end)?;
        bytemuck::try_from_bytes::<T>(bytes).ok().copied()
    }

    /// Writes `value` at `at`.
    ///
    /// # Panics
    ///
    /// Panics if `at` is not aligned for `T` or the value extends past the end.
    #[inline]
    pub fn write<T: Pod>(&mut self, at: Offset, value: &T) {
        let len = self.len();
        let start = at.0 as usize;
        let end = start + core::mem::size_of::<T>();
        let Some(bytes) = self.bytes_mut().get_mut(start..end) else {
            panic!("arena write at {at} past end (len {len})");
        };
        match bytemuck::try_from_bytes_mut::<T>(bytes) {
            Ok(slot) => *slot = *value,
            Err(e) => panic!("arena write at {at} rejected: {e:?}"),
        }
    }

    /// Reads a 4-byte cell.
    #[inline]
    pub fn read_u32(&self, at: Offset) -> u32 {
        self.read(at)
    }

    /// Writes a 4-byte cell.
    #[inline]
    pub fn write_u32(&mut self, at: Offset, value: u32) {
        self.write(at, &value);
    }

    /// Reads a signal byte; any non-zero value is true.
    #[inline]
    pub fn read_bool(&self, at: Offset) -> bool {
        self.as_bytes()[at.0 as usize] != 0
    }

    /// Writes a signal byte.
    #[inline]
    pub fn write_bool(&mut self, at: Offset, level: bool) {
        self.bytes_mut()[at.0 as usize] = u8::from(level);
    }

    /// Record kind stored at `at`.
    ///
    /// # Panics
    ///
    /// Panics if byte 0 of the record is not a known tag.
    pub fn kind(&self, at: Offset) -> RecordKind {
        let tag = self.as_bytes()[at.0 as usize];
        match RecordKind::from_tag(tag) {
            Some(kind) => kind,
            None => panic!("unknown record tag {tag} at {at}"),
        }
    }

    /// `total_size` of the record at `at`.
    #[inline]
    pub fn record_size(&self, at: Offset) -> u32 {
        self.read_u32(at.add(TOTAL_SIZE_FIELD))
    }

    /// Offset of output connector `index` of the record at `record`, whose
    /// enclosing container starts at `container`.
    ///
    /// Returns `None` for kinds without outputs or an out-of-range index.
    pub fn output_cell(&self, record: Offset, index: u16, container: Offset) -> Option<Offset> {
        match self.kind(record) {
            k if k.is_gate() => (index == 0).then(|| record.add(GATE_OUTPUT_FIELD)),
            k if k.is_unary() => {
                let h: UnaryRecord = self.read(record);
                (index < h.input_output_count)
                    .then(|| record.add(h.outputs_offset + u32::from(index)))
            }
            k if k.is_input() => {
                let h: InputRecord = self.read(record);
                (index < h.output_count).then(|| record.add(h.outputs_offset + u32::from(index)))
            }
            RecordKind::Function => {
                let h: FunctionRecord = self.read(record);
                (index < h.output_count).then(|| record.add(h.outputs_offset + u32::from(index)))
            }
            RecordKind::Bus => {
                let h: BusRecord = self.read(record);
                (index < h.shared_output_count)
                    .then(|| container.add(h.shared_outputs_offset + u32::from(index)))
            }
            _ => None,
        }
    }

    /// Committed output level of a binary gate record.
    pub fn gate_output(&self, record: Offset) -> bool {
        let h: GateRecord = self.read(record);
        h.output != 0
    }

    // --- Persistence ---

    /// Raw image of the arena (host byte order).
    pub fn save(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Rebuilds an arena from a raw image and validates it.
    pub fn load(bytes: &[u8]) -> Result<Self, ArenaError> {
        let arena = Self::from_raw(bytes)?;
        arena.validate()?;
        Ok(arena)
    }

    /// Rebuilds an arena from a raw image without structural validation.
    pub fn from_raw(bytes: &[u8]) -> Result<Self, ArenaError> {
        if bytes.len() % 4 != 0 {
            return Err(ArenaError::UnalignedLength(bytes.len()));
        }
        let mut words = Vec::with_capacity(bytes.len() / 4);
        for chunk in bytes.chunks_exact(4) {
            words.push(u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        Ok(Self { words })
    }

    /// Writes the raw image to `path`.
    #[cfg(feature = "std")]
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ArenaError> {
        std::fs::write(path.as_ref(), self.as_bytes())?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "arena_save: {} bytes to {}",
            self.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Reads and validates a raw image from `path`.
    #[cfg(feature = "std")]
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ArenaError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::load(&bytes)
    }
}
