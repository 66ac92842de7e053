use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    Absent,
    Present,
}

/// What a single observation did to the presence state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    None,
    /// Absent to present with the cooldown satisfied. An event fires.
    Arrived,
    /// A person was seen while absent, but the cooldown had not elapsed.
    /// Presence stays `Absent`.
    ArrivalSuppressed,
    /// The scene stayed empty for the whole grace window.
    Departed,
}

/// Debounced presence state machine, free of any I/O.
///
/// Times are monotonic offsets from session start. Callers must pass a
/// non-decreasing `now`.
#[derive(Clone, Debug)]
pub struct PresenceState {
    presence: Presence,
    last_seen_at: Option<Duration>,
    last_event_at: Option<Duration>,
    absence_grace: Duration,
    event_cooldown: Duration,
}

impl PresenceState {
    pub fn new(absence_grace: Duration, event_cooldown: Duration) -> Self {
        Self {
            presence: Presence::Absent,
            last_seen_at: None,
            last_event_at: None,
            absence_grace,
            event_cooldown,
        }
    }

    pub fn observe(&mut self, person_detected: bool, now: Duration) -> Transition {
        if person_detected {
            self.last_seen_at = Some(now);
            if self.presence == Presence::Present {
                return Transition::None;
            }
            if !self.cooldown_elapsed(now) {
                return Transition::ArrivalSuppressed;
            }
            self.presence = Presence::Present;
            self.last_event_at = Some(now);
            return Transition::Arrived;
        }

        if self.presence == Presence::Present && self.absent_for(now) >= self.absence_grace {
            self.presence = Presence::Absent;
            return Transition::Departed;
        }
        Transition::None
    }

    fn cooldown_elapsed(&self, now: Duration) -> bool {
        match self.last_event_at {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.event_cooldown,
        }
    }

    fn absent_for(&self, now: Duration) -> Duration {
        self.last_seen_at
            .map(|seen| now.saturating_sub(seen))
            .unwrap_or(Duration::ZERO)
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    pub fn is_present(&self) -> bool {
        self.presence == Presence::Present
    }

    pub fn last_seen_at(&self) -> Option<Duration> {
        self.last_seen_at
    }

    pub fn last_event_at(&self) -> Option<Duration> {
        self.last_event_at
    }
}
