//! Conversion state carried between codec calls.

use std::cell::Cell;

use crate::error::{Result, StdioError};

/// Partial progress through a multibyte sequence (`mbstate_t`).
///
/// Eight bytes, alignment one, so a C `mbstate_t` can be reinterpreted as
/// this type. The all-zero value is the initial state.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionState {
    count: u8,
    shift: u8,
    pending: [u8; 4],
    reserved: [u8; 2],
}

impl ConversionState {
    pub const INITIAL: Self = Self {
        count: 0,
        shift: 0,
        pending: [0; 4],
        reserved: [0; 2],
    };

    #[must_use]
    pub const fn new() -> Self {
        Self::INITIAL
    }

    /// True when no bytes are pending and no shift sequence is active
    /// (`mbsinit`).
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.count == 0 && self.shift == 0
    }

    pub fn reset(&mut self) {
        *self = Self::INITIAL;
    }

    /// Number of bytes of an unfinished character held from earlier calls.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        usize::from(self.count)
    }

    pub(crate) fn pending(&self) -> &[u8] {
        &self.pending[..usize::from(self.count)]
    }

    pub(crate) fn set_pending(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= self.pending.len());
        self.pending = [0; 4];
        self.pending[..bytes.len()].copy_from_slice(bytes);
        self.count = bytes.len() as u8;
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending = [0; 4];
        self.count = 0;
    }

    pub(crate) fn shift(&self) -> Shift {
        if self.shift == Shift::Jis0208 as u8 {
            Shift::Jis0208
        } else {
            Shift::Ascii
        }
    }

    pub(crate) fn set_shift(&mut self, shift: Shift) {
        self.shift = shift as u8;
    }
}

/// Shift identifiers stored in [`ConversionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Shift {
    Ascii = 0,
    Jis0208 = 1,
}

/// Which entry point an implicit (thread-local) state belongs to.
///
/// Each C function that accepts a null state keeps its own hidden state, so
/// interleaving `mbtowc` and `mbrlen` calls cannot corrupt each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum DefaultSlot {
    Decode,
    Encode,
    Mbtowc,
    Mblen,
    Mbrlen,
    Mbrtowc,
    Wctomb,
    Wcrtomb,
    Mbsrtowcs,
    Wcsrtombs,
}

const SLOT_COUNT: usize = DefaultSlot::Wcsrtombs as usize + 1;

thread_local! {
    static DEFAULT_STATES: Cell<[ConversionState; SLOT_COUNT]> =
        const { Cell::new([ConversionState::INITIAL; SLOT_COUNT]) };
}

/// Run `f` against the calling thread's implicit state for `slot`.
///
/// During thread teardown the thread-local may already be gone; `f` then
/// sees a fresh initial state that is not kept.
pub fn with_default_state<R>(slot: DefaultSlot, f: impl FnOnce(&mut ConversionState) -> R) -> R {
    let idx = slot as usize;
    let mut state = DEFAULT_STATES
        .try_with(|cell| cell.get()[idx])
        .unwrap_or_default();
    let out = f(&mut state);
    let _ = DEFAULT_STATES.try_with(|cell| {
        let mut all = cell.get();
        all[idx] = state;
        cell.set(all);
    });
    out
}

/// Collects the bytes of one character across calls.
///
/// Bytes left over from an earlier call come first, then bytes from the
/// current source. `used` counts only bytes taken from the current source.
pub(crate) struct Assembler<'s> {
    seq: [u8; 4],
    filled: usize,
    src: &'s [u8],
    used: usize,
}

impl<'s> Assembler<'s> {
    pub(crate) fn resume(state: &ConversionState, src: &'s [u8]) -> Self {
        let mut seq = [0u8; 4];
        let pending = state.pending();
        seq[..pending.len()].copy_from_slice(pending);
        Self {
            seq,
            filled: pending.len(),
            src,
            used: 0,
        }
    }

    /// No byte of the current character has been seen yet.
    pub(crate) fn is_fresh(&self) -> bool {
        self.filled == 0
    }

    pub(crate) fn used(&self) -> usize {
        self.used
    }

    /// Lead byte of the current character, taking it from the source when
    /// nothing is pending. `None` when the source is exhausted.
    pub(crate) fn lead(&mut self) -> Option<u8> {
        if self.filled > 0 {
            return Some(self.seq[0]);
        }
        let b = *self.src.get(self.used)?;
        self.seq[0] = b;
        self.filled = 1;
        self.used += 1;
        Some(b)
    }

    /// Take bytes until the character is `need` bytes long.
    ///
    /// `valid(position, byte)` vets each byte as it arrives. Running out of
    /// source parks the prefix in `state` and reports an incomplete
    /// sequence.
    pub(crate) fn complete(
        &mut self,
        need: usize,
        state: &mut ConversionState,
        valid: impl Fn(usize, u8) -> bool,
    ) -> Result<[u8; 4]> {
        while self.filled < need {
            let Some(&b) = self.src.get(self.used) else {
                state.set_pending(&self.seq[..self.filled]);
                return Err(StdioError::IncompleteSequence);
            };
            if !valid(self.filled, b) {
                return Err(StdioError::InvalidSequence);
            }
            self.seq[self.filled] = b;
            self.filled += 1;
            self.used += 1;
        }
        state.clear_pending();
        Ok(self.seq)
    }

    /// Start a new character after a shift sequence was consumed.
    pub(crate) fn restart(&mut self) {
        self.filled = 0;
    }
}
