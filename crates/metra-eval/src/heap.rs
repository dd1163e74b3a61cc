//! Reference-counted object heap with string interning.
//!
//! Objects live in an append-only arena indexed by id. Ids start at 1, grow
//! monotonically and are never reused; a freed slot stays empty until
//! [`ObjHeap::clear`]. Reference counts are only reachable through the heap
//! API, and misuse (dangling pointer, underflow) is reported as a
//! [`HeapError`] that the interpreter treats as fatal.
//!
//! An allocation's initial reference belongs to the intern table. Nothing
//! releases it during a run, so every distinct string a run builds (literals
//! and concatenation results alike) stays live until [`ObjHeap::clear`].

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::value::Pointer;

/// A heap object. String data is immutable and shared by cheap clones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Obj {
    Str(Rc<str>),
}

impl Obj {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Obj::Str(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Obj::Str(s) => Some(s),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Obj::Str(_) => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    #[error("invalid pointer {0}")]
    InvalidPointer(Pointer),
    #[error("refcount underflow on {pointer}: releasing {requested} of {held}")]
    Underflow {
        pointer: Pointer,
        held: u32,
        requested: u32,
    },
    #[error("refcount delta must be positive")]
    NonPositiveDelta,
    #[error("refcount overflow on {0}")]
    Overflow(Pointer),
}

#[derive(Debug)]
struct HeapEntry {
    obj: Obj,
    refs: u32,
}

#[derive(Debug, Default)]
pub struct ObjHeap {
    /// Slot `i` holds the object with id `i + 1`.
    slots: Vec<Option<HeapEntry>>,
    interned: HashMap<Rc<str>, Pointer>,
    live: usize,
}

impl ObjHeap {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, p: Pointer) -> Option<&HeapEntry> {
        let idx = (p.id() as usize).checked_sub(1)?;
        self.slots.get(idx)?.as_ref()
    }

    fn slot_mut(&mut self, p: Pointer) -> Option<&mut HeapEntry> {
        let idx = (p.id() as usize).checked_sub(1)?;
        self.slots.get_mut(idx)?.as_mut()
    }

    /// Store `obj` and return its pointer.
    ///
    /// A string whose content is already interned returns the existing
    /// pointer with its refcount untouched. Otherwise a fresh entry starts
    /// at refcount 1.
    pub fn allocate(&mut self, obj: Obj) -> Pointer {
        let Obj::Str(text) = &obj;
        if let Some(&existing) = self.interned.get(text) {
            tracing::trace!(pointer = %existing, "intern hit");
            return existing;
        }
        let text = Rc::clone(text);
        let id = u32::try_from(self.slots.len() + 1).unwrap_or(u32::MAX);
        let pointer = Pointer::from_raw(id);
        self.slots.push(Some(HeapEntry { obj, refs: 1 }));
        self.interned.insert(text, pointer);
        self.live += 1;
        tracing::trace!(%pointer, "allocated");
        pointer
    }

    pub fn allocate_str(&mut self, s: &str) -> Pointer {
        self.allocate(Obj::string(s))
    }

    /// Look up an object without failing on null or dead pointers.
    pub fn try_get(&self, p: Pointer) -> Option<&Obj> {
        self.slot(p).map(|entry| &entry.obj)
    }

    pub fn get(&self, p: Pointer) -> Result<&Obj, HeapError> {
        self.try_get(p).ok_or(HeapError::InvalidPointer(p))
    }

    /// Shared handle to a string's contents.
    pub fn get_str(&self, p: Pointer) -> Result<Rc<str>, HeapError> {
        match self.get(p)? {
            Obj::Str(s) => Ok(Rc::clone(s)),
        }
    }

    pub fn add_ref(&mut self, p: Pointer, n: u32) -> Result<(), HeapError> {
        if n == 0 {
            return Err(HeapError::NonPositiveDelta);
        }
        let entry = self.slot_mut(p).ok_or(HeapError::InvalidPointer(p))?;
        entry.refs = entry.refs.checked_add(n).ok_or(HeapError::Overflow(p))?;
        tracing::trace!(pointer = %p, refs = entry.refs, "add_ref");
        Ok(())
    }

    /// Drop `n` references. Returns `Ok(false)` if `p` is not live.
    ///
    /// When the count reaches zero the entry and its intern mapping are
    /// removed.
    pub fn release(&mut self, p: Pointer, n: u32) -> Result<bool, HeapError> {
        if n == 0 {
            return Err(HeapError::NonPositiveDelta);
        }
        let Some(entry) = self.slot_mut(p) else {
            return Ok(false);
        };
        if n > entry.refs {
            return Err(HeapError::Underflow {
                pointer: p,
                held: entry.refs,
                requested: n,
            });
        }
        entry.refs -= n;
        tracing::trace!(pointer = %p, refs = entry.refs, "release");
        if entry.refs == 0 {
            self.remove(p);
        }
        Ok(true)
    }

    /// Remove an entry regardless of its count. Returns whether it was live.
    pub fn force_free(&mut self, p: Pointer) -> bool {
        self.remove(p)
    }

    fn remove(&mut self, p: Pointer) -> bool {
        let Some(idx) = (p.id() as usize).checked_sub(1) else {
            return false;
        };
        let Some(entry) = self.slots.get_mut(idx).and_then(Option::take) else {
            return false;
        };
        let Obj::Str(text) = &entry.obj;
        if self.interned.get(text) == Some(&p) {
            self.interned.remove(text);
        }
        self.live -= 1;
        tracing::trace!(pointer = %p, "freed");
        true
    }

    /// Current count, or `None` if `p` is not live.
    pub fn ref_count(&self, p: Pointer) -> Option<u32> {
        self.slot(p).map(|entry| entry.refs)
    }

    pub fn is_alive(&self, p: Pointer) -> bool {
        self.slot(p).is_some()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn interned_len(&self) -> usize {
        self.interned.len()
    }

    /// Drop everything and restart ids at 1. Only between runs.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.interned.clear();
        self.live = 0;
    }
}
