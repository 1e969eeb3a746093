//! VoicePool: fixed voice slots owned by the audio graph.

use crate::registry::NoteKey;
use crate::voice::Voice;
use crate::Frame;

/// Maximum number of simultaneous voices.
pub const MAX_VOICES: usize = 256;

/// Fixed-capacity pool of voices keyed by note.
pub struct VoicePool {
    /// Voice slots (None = free).
    pub(crate) slots: Vec<Option<(NoteKey, Voice)>>,
}

impl VoicePool {
    /// Create a new empty voice pool.
    pub fn new() -> Self {
        Self { slots: (0..MAX_VOICES).map(|_| None).collect() }
    }

    /// Place a voice. When the pool is full the voice with the earliest
    /// start is stolen and returned.
    pub fn allocate(&mut self, key: NoteKey, voice: Voice) -> Option<(NoteKey, Voice)> {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.is_none()) {
            *slot = Some((key, voice));
            return None;
        }
        let id = self.find_steal_candidate();
        self.slots[id].replace((key, voice))
    }

    /// Slot of the oldest voice.
    fn find_steal_candidate(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|(_, v)| (i, v.start_frame())))
            .min_by_key(|(_, start)| *start)
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    pub fn get(&self, key: NoteKey) -> Option<&Voice> {
        self.slots.iter().flatten().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Kill (remove) a voice immediately.
    pub fn kill(&mut self, key: NoteKey) -> Option<Voice> {
        let slot = self.slots.iter_mut().find(|s| matches!(s, Some((k, _)) if *k == key))?;
        slot.take().map(|(_, v)| v)
    }

    /// Remove every voice, handing each to `on_kill`.
    pub fn kill_all(&mut self, mut on_kill: impl FnMut(NoteKey, Voice)) {
        for slot in &mut self.slots {
            if let Some((key, voice)) = slot.take() {
                on_kill(key, voice);
            }
        }
    }

    /// Mix every voice at output frame `now`, scaled by its channel gain.
    /// Voices on channels beyond `gains` are silent.
    #[inline]
    pub fn render(&mut self, now: u64, gains: &[f32]) -> Frame {
        let mut out = Frame::silence();
        for (_, voice) in self.slots.iter_mut().flatten() {
            let gain = gains.get(voice.channel).copied().unwrap_or(0.0);
            out.mix(voice.render(now).scaled(gain));
        }
        out
    }

    /// Remove voices that have stopped, handing each to `on_end`.
    pub fn reap_finished(&mut self, mut on_end: impl FnMut(NoteKey, Voice)) {
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|(_, voice)| !voice.playing) {
                if let Some((key, voice)) = slot.take() {
                    on_end(key, voice);
                }
            }
        }
    }

    /// Count of active (occupied) voice slots.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new()
    }
}
