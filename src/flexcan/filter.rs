//! Receive FIFO ID filter table
//!
//! Entries use format A: one full identifier per element. The table is a
//! dense prefix of entries followed by zeros; removing an entry moves the
//! ones behind it down by one element.

/// Maximum number of ID filter elements.
pub const MAX_FILTERS: usize = 128;

const IDE: u32 = 1 << 30;

/// A CAN message identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Id {
    /// 11-bit identifier
    Standard(u16),
    /// 29-bit identifier
    Extended(u32),
}

impl Id {
    /// Marks an extended identifier in a CMSIS id.
    pub const CMSIS_IDE: u32 = 1 << 31;

    /// Decode a CMSIS id.
    pub const fn from_cmsis(id: u32) -> Self {
        if id & Self::CMSIS_IDE != 0 {
            Id::Extended(id & 0x1FFF_FFFF)
        } else {
            Id::Standard((id & 0x7FF) as u16)
        }
    }

    /// Encode as a CMSIS id.
    pub const fn to_cmsis(self) -> u32 {
        match self {
            Id::Standard(id) => id as u32 & 0x7FF,
            Id::Extended(id) => (id & 0x1FFF_FFFF) | Self::CMSIS_IDE,
        }
    }
}

/// Table element that accepts `id`.
pub fn entry(id: Id) -> u32 {
    match id {
        Id::Standard(id) => (id as u32 & 0x7FF) << 19,
        Id::Extended(id) => ((id & 0x1FFF_FFFF) | (1 << 29)) << 1,
    }
}

/// Individual mask that pairs with [`entry(id)`](entry).
///
/// `mask` selects the identifier bits that must match. The frame format
/// always has to match.
pub fn mask(id: Id, mask: u32) -> u32 {
    match id {
        Id::Standard(_) => ((mask & 0x7FF) << 19) | IDE,
        Id::Extended(_) => ((mask & 0x1FFF_FFFF) << 1) | IDE,
    }
}

/// The software copy of the ID filter table.
pub struct FilterTable {
    entries: [u32; MAX_FILTERS],
    capacity: usize,
    len: usize,
}

impl FilterTable {
    /// An empty table with `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`MAX_FILTERS`].
    pub const fn new(capacity: usize) -> Self {
        assert!(capacity <= MAX_FILTERS);
        FilterTable {
            entries: [0; MAX_FILTERS],
            capacity,
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.entries = [0; MAX_FILTERS];
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// The table as handed to the vendor layer, zeros included.
    pub fn entries(&self) -> &[u32] {
        &self.entries[..self.capacity]
    }

    /// Append an entry, and return its index.
    ///
    /// Returns `None` if the table is full.
    pub fn push(&mut self, entry: u32) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        let index = self.len;
        self.entries[index] = entry;
        self.len += 1;
        Some(index)
    }

    /// Remove the first element equal to `entry`, and return its index.
    ///
    /// Returns `None` if the entry isn't in the table.
    pub fn remove(&mut self, entry: u32) -> Option<usize> {
        let index = self.entries[..self.len].iter().position(|e| *e == entry)?;
        self.entries.copy_within(index + 1..self.len, index);
        self.len -= 1;
        self.entries[self.len] = 0;
        Some(index)
    }
}
