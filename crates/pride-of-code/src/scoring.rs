use crate::config::ScoringConfig;
use serde::Serialize;
use tracing::{debug, info};

/// One entry of the award history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Award {
    pub reason: String,
    pub base: f64,
    pub multiplier: f64,
    pub awarded: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSnapshot {
    pub total: f64,
    pub streak: u32,
    pub multiplier: f64,
    pub best_streak: u32,
}

/// Running score. Consecutive successes raise the multiplier, any failure
/// drops it back to 1 without touching the total.
#[derive(Debug, Clone, Default)]
pub struct ScoreTracker {
    config: ScoringConfig,
    total: f64,
    streak: u32,
    best_streak: u32,
    history: Vec<Award>,
}

impl ScoreTracker {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// `1 + streak_step * (streak - 1)`, capped at `max_multiplier`.
    pub fn multiplier_for(&self, streak: u32) -> f64 {
        let growth = self.config.streak_step * f64::from(streak.saturating_sub(1));
        (1.0 + growth).min(self.config.max_multiplier).max(1.0)
    }

    /// The multiplier the current streak earns.
    pub fn multiplier(&self) -> f64 {
        self.multiplier_for(self.streak)
    }

    /// Extends the streak and awards `base_amount` times its multiplier.
    /// Returns the awarded amount.
    pub fn add_points(&mut self, base_amount: f64, reason: impl Into<String>) -> f64 {
        let base = if base_amount.is_finite() && base_amount > 0.0 {
            base_amount
        } else {
            0.0
        };
        self.streak = self.streak.saturating_add(1);
        self.best_streak = self.best_streak.max(self.streak);
        let multiplier = self.multiplier();
        let awarded = base * multiplier;
        self.total += awarded;
        let reason = reason.into();
        info!(%reason, base, multiplier, awarded, streak = self.streak, "points awarded");
        self.history.push(Award {
            reason,
            base,
            multiplier,
            awarded,
        });
        awarded
    }

    pub fn reset_streak(&mut self) {
        if self.streak > 0 {
            debug!(streak = self.streak, "streak broken");
        }
        self.streak = 0;
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    pub fn history(&self) -> &[Award] {
        &self.history
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            total: self.total,
            streak: self.streak,
            multiplier: self.multiplier(),
            best_streak: self.best_streak,
        }
    }
}
