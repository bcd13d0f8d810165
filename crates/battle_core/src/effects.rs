//! Timed status effects.
//!
//! Effects are applied incrementally as simulation time advances. Every
//! application is linear in the elapsed time: applying `Δt = 5` once has the
//! same result as applying `Δt = 1` five times.

use serde::{Deserialize, Serialize};

/// Kind tag of a status effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Loses a fixed amount of health per time unit. Given to a unit whose
    /// move failed.
    DamageOverTime,
}

impl EffectKind {
    /// Name used in logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DamageOverTime => "damage_over_time",
        }
    }

    /// How many effects of this kind one unit may hold at once.
    #[must_use]
    pub const fn cap(self) -> usize {
        match self {
            Self::DamageOverTime => 1,
        }
    }
}

/// Remaining lifetime of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectDuration {
    /// Never expires.
    Unbounded,
    /// Expires once the countdown reaches zero or below.
    Remaining(i64),
}

/// An active effect on a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Effect {
    /// What the effect does.
    pub kind: EffectKind,
    /// Remaining lifetime.
    pub duration: EffectDuration,
    /// Strength per time unit.
    pub magnitude: i64,
}

/// Health lost per time unit under the move-failure penalty.
pub const DAMAGE_OVER_TIME_MAGNITUDE: i64 = 1;

impl Effect {
    /// The move-failure penalty: unbounded, one damage per time unit.
    #[must_use]
    pub const fn damage_over_time() -> Self {
        Self {
            kind: EffectKind::DamageOverTime,
            duration: EffectDuration::Unbounded,
            magnitude: DAMAGE_OVER_TIME_MAGNITUDE,
        }
    }

    /// Builder method to give the effect a finite lifetime.
    #[must_use]
    pub const fn with_duration(mut self, remaining: i64) -> Self {
        self.duration = EffectDuration::Remaining(remaining);
        self
    }

    /// Apply the effect for `elapsed` time units to a unit with `hp` health.
    ///
    /// Returns the new health and counts the lifetime down by `elapsed`.
    #[must_use]
    pub fn apply(&mut self, hp: i64, elapsed: i64) -> i64 {
        let new_hp = match self.kind {
            EffectKind::DamageOverTime => hp.saturating_sub(self.magnitude.saturating_mul(elapsed)),
        };
        if let EffectDuration::Remaining(ref mut remaining) = self.duration {
            *remaining = remaining.saturating_sub(elapsed);
        }
        new_hp
    }

    /// Whether the effect has run out and should be purged.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        match self.duration {
            EffectDuration::Unbounded => false,
            EffectDuration::Remaining(remaining) => remaining <= 0,
        }
    }
}
