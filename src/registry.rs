//! The name-keyed texture registry: a dense slot vector with a hash map
//! for name lookup and a free-list for O(1) slot reuse. Slot 0 is a
//! permanent sentinel and never holds a caller texture.

use std::collections::HashMap;

use crate::error::{TextureError, TextureResult};
use crate::flags::TextureFlags;
use crate::format::NativeFormat;
use crate::memory::TextureStorage;
use crate::source::OriginalCopy;

/// Stable identifier for a registry entry. `0` is the permanent
/// "none/default" sentinel; binds resolve it to the default texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u32);

impl TextureHandle {
    pub const NONE: TextureHandle = TextureHandle(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// One live registry slot.
#[derive(Debug)]
pub struct TextureEntry {
    pub name: String,
    pub src_width: u32,
    pub src_height: u32,
    pub width: u32,
    pub height: u32,
    pub format: NativeFormat,
    pub num_mips: u32,
    pub size_bytes: usize,
    pub flags: TextureFlags,
    /// Packed 4444 palette, present iff the format is indexed.
    pub palette: Option<Vec<u8>>,
    pub storage: Option<TextureStorage>,
    pub original: Option<OriginalCopy>,
}

impl TextureEntry {
    fn new(name: &str, flags: TextureFlags) -> Self {
        Self {
            name: name.to_owned(),
            src_width: 0,
            src_height: 0,
            width: 0,
            height: 0,
            format: NativeFormat::Rgb565,
            num_mips: 1,
            size_bytes: 0,
            flags,
            palette: None,
            storage: None,
            original: None,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        self.flags.contains(TextureFlags::UPLOADED)
    }
}

/// Diagnostic row for one live entry.
#[derive(Clone, Debug)]
pub struct EntryInfo {
    pub handle: TextureHandle,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
    pub format: NativeFormat,
    pub flags: TextureFlags,
    pub num_mips: u32,
}

pub struct TextureRegistry {
    /// Slot 0 stays `None` forever.
    slots: Vec<Option<TextureEntry>>,
    names: HashMap<String, u32>,
    free_list: Vec<u32>,
    capacity: usize,
    live: usize,
}

impl TextureRegistry {
    /// `capacity` counts usable slots, the sentinel excluded.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity.min(64) + 1);
        slots.push(None);
        Self {
            slots,
            names: HashMap::new(),
            free_list: Vec::new(),
            capacity,
            live: 0,
        }
    }

    pub fn find(&self, name: &str) -> Option<TextureHandle> {
        self.names.get(name).map(|&index| TextureHandle(index))
    }

    /// Claim a slot for `name`: the free-list first, then a fresh slot.
    /// The caller guarantees the name is not yet registered.
    pub fn allocate(&mut self, name: &str, flags: TextureFlags) -> TextureResult<TextureHandle> {
        debug_assert!(!self.names.contains_key(name));

        let index = if let Some(index) = self.free_list.pop() {
            index
        } else if self.slots.len() <= self.capacity {
            self.slots.push(None);
            (self.slots.len() - 1) as u32
        } else {
            return Err(TextureError::OutOfSlots { capacity: self.capacity });
        };

        self.names.insert(name.to_owned(), index);
        self.slots[index as usize] = Some(TextureEntry::new(name, flags));
        self.live += 1;
        Ok(TextureHandle(index))
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&TextureEntry> {
        if handle.is_none() {
            return None;
        }
        self.slots.get(handle.index())?.as_ref()
    }

    pub fn get_mut(&mut self, handle: TextureHandle) -> Option<&mut TextureEntry> {
        if handle.is_none() {
            return None;
        }
        self.slots.get_mut(handle.index())?.as_mut()
    }

    /// Unlink the entry, returning it so the caller can release its
    /// storage. No-op for the sentinel, stale or out-of-range handles.
    pub fn remove(&mut self, handle: TextureHandle) -> Option<TextureEntry> {
        if handle.is_none() {
            return None;
        }
        let entry = self.slots.get_mut(handle.index())?.take()?;
        self.names.remove(&entry.name);
        self.free_list.push(handle.raw());
        self.live -= 1;
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureHandle, &TextureEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| Some((TextureHandle(index as u32), slot.as_ref()?)))
    }

    /// Drain every live entry for teardown, sentinel order preserved.
    pub fn drain(&mut self) -> Vec<TextureEntry> {
        let mut entries = Vec::with_capacity(self.live);
        for index in 1..self.slots.len() {
            if let Some(entry) = self.slots[index].take() {
                self.names.remove(&entry.name);
                self.free_list.push(index as u32);
                entries.push(entry);
            }
        }
        self.live = 0;
        entries
    }
}
