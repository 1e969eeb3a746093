//! Registry of live note instances.
//!
//! The step renderer inserts a note here when it hands a voice to the
//! graph. The note leaves the registry when the graph reports it ended,
//! or all at once on stop.

use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Handle for one scheduled note instance.
    pub struct NoteKey;
}

/// Scheduler-side record of a note handed to the graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiveNote {
    pub channel: usize,
    pub step: usize,
    /// Audio clock time the note was scheduled to start
    pub scheduled_time: f64,
    pub audible_duration: f64,
    /// Scheduler step counter when the note was scheduled
    pub absolute_step: u64,
}

impl LiveNote {
    pub fn expected_end(&self) -> f64 {
        self.scheduled_time + self.audible_duration
    }
}

#[derive(Default)]
pub struct NoteRegistry {
    notes: SlotMap<NoteKey, LiveNote>,
}

impl NoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, note: LiveNote) -> NoteKey {
        self.notes.insert(note)
    }

    /// Remove a note. Unknown or stale keys return `None`.
    pub fn remove(&mut self, key: NoteKey) -> Option<LiveNote> {
        self.notes.remove(key)
    }

    pub fn get(&self, key: NoteKey) -> Option<&LiveNote> {
        self.notes.get(key)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    /// Whether another live note on `channel` was scheduled at `time`.
    pub fn has_note_at(&self, channel: usize, time: f64) -> bool {
        self.notes.values().any(|n| n.channel == channel && n.scheduled_time == time)
    }

    /// Remove notes whose expected end is more than `grace` seconds
    /// before `now`. Covers end reports lost to a full event queue.
    pub fn expire(&mut self, now: f64, grace: f64) -> Vec<(NoteKey, LiveNote)> {
        let stale: Vec<NoteKey> = self
            .notes
            .iter()
            .filter(|(_, n)| n.expected_end() + grace < now)
            .map(|(k, _)| k)
            .collect();
        stale
            .into_iter()
            .filter_map(|k| self.notes.remove(k).map(|n| (k, n)))
            .collect()
    }
}
