//! Shared line store for one streaming session.
//!
//! The buffer sits between exactly two tasks: the stream ingestor (single
//! writer) and the playback scheduler (single reader). The writer appends and
//! overwrites under a short-lived lock; the reader watches a length channel
//! and only takes the read lock when it actually needs a snapshot, so neither
//! side ever waits on the other for long.

use std::sync::RwLock;

use tokio::sync::watch;

use crate::types::LogLine;

#[derive(Debug, Default)]
struct BufferState {
    lines: Vec<LogLine>,
    next_sequence: u64,
}

/// Ordered append/overwrite log-line store.
///
/// Invariant: only the last line is ever mutated ([`overwrite_last`]); all
/// earlier lines are immutable once superseded. No line is ever deleted
/// except by a full [`reset`].
///
/// [`overwrite_last`]: LineBuffer::overwrite_last
/// [`reset`]: LineBuffer::reset
#[derive(Debug)]
pub struct LineBuffer {
    state: RwLock<BufferState>,
    /// Characters in the `\n`-joined concatenation of all lines.
    /// Published after the lines themselves, so a reader that observes a
    /// length can always snapshot at least that much text. A watch channel
    /// cannot miss an update between a check and an await.
    len_tx: watch::Sender<usize>,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            state: RwLock::new(BufferState::default()),
            len_tx,
        }
    }

    /// Append a new immutable line
    pub fn append(&self, text: impl Into<String>) {
        let text = text.into();
        let added = text.chars().count();
        let mut state = self.state.write().expect("line buffer lock poisoned");
        // Joining newline for every line after the first
        let joiner = usize::from(!state.lines.is_empty());
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.lines.push(LogLine::new(sequence, text));
        drop(state);

        self.len_tx.send_modify(|len| *len += added + joiner);
    }

    /// Replace the most recent line's text in place.
    ///
    /// Used for carriage-return progress overwrites and for the incremental
    /// reveal of an unterminated line. On an empty buffer this appends, which
    /// matches how a terminal treats a carriage return on a blank screen.
    pub fn overwrite_last(&self, text: impl Into<String>) {
        let text = text.into();
        let new_chars = text.chars().count();
        let mut state = self.state.write().expect("line buffer lock poisoned");
        let Some(last) = state.lines.last_mut() else {
            drop(state);
            self.append(text);
            return;
        };
        let old_chars = last.text.chars().count();
        last.text = text;
        drop(state);

        self.len_tx
            .send_modify(|len| *len = *len + new_chars - old_chars);
    }

    /// Clear all lines and restart the sequence counter
    pub fn reset(&self) {
        let mut state = self.state.write().expect("line buffer lock poisoned");
        state.lines.clear();
        state.next_sequence = 0;
        drop(state);

        self.len_tx.send_modify(|len| *len = 0);
    }

    /// Get the current ordered line list (copy-on-read; the caller never sees
    /// a half-written line)
    pub fn snapshot(&self) -> Vec<LogLine> {
        self.state
            .read()
            .expect("line buffer lock poisoned")
            .lines
            .clone()
    }

    /// Characters in the `\n`-joined concatenation of all lines.
    ///
    /// Lock-free; the playback reader uses this for its caught-up check.
    pub fn total_chars(&self) -> usize {
        *self.len_tx.borrow()
    }

    /// Subscribe to length changes.
    ///
    /// The playback reader awaits `changed()` on this receiver while caught
    /// up; every mutation publishes the new length, including shrinking
    /// overwrites and resets.
    pub fn watch_len(&self) -> watch::Receiver<usize> {
        self.len_tx.subscribe()
    }

    /// Number of buffered lines
    pub fn line_count(&self) -> usize {
        self.state
            .read()
            .expect("line buffer lock poisoned")
            .lines
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.line_count() == 0
    }

    /// The full `\n`-joined text (snapshot semantics)
    pub fn concatenated(&self) -> String {
        let state = self.state.read().expect("line buffer lock poisoned");
        let mut out = String::with_capacity(*self.len_tx.borrow());
        for (i, line) in state.lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&line.text);
        }
        out
    }
}
