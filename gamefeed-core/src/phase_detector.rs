//! Stateful game phase detection, tracking game-to-game transitions including the
//! two-broadcast rug mechanism and seed reveals.

use crate::model::{raw, Phase};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Describes a phase transition between two events (or a game-id change at a fixed phase).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub previous_phase: Phase,
    pub new_phase: Phase,
    pub previous_game_id: String,
    pub new_game_id: String,
    pub is_new_game: bool,
    pub is_seed_reveal: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseDetectorStats {
    pub current_phase: Phase,
    pub current_game_id: String,
    pub rug_count: u64,
    pub games_seen: u64,
}

/// Stateful classifier from raw `gameStateUpdate` fields to a [`Phase`], tracking current
/// `(phase, game_id)` across calls to detect transitions.
#[derive(Debug, Default)]
pub struct PhaseDetector {
    current_phase: Phase,
    current_game_id: String,
    rug_count: u64,
    games_seen: u64,
}

impl PhaseDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    pub fn current_game_id(&self) -> &str {
        &self.current_game_id
    }

    /// Pure classifier: priority-ordered over `active`, `rugged`, `cooldownTimer`, and
    /// `allowPreRoundBuys`. Depends only on `data`.
    pub fn detect(&self, data: &Value) -> Phase {
        let active = raw::bool_or(data, "active", false);
        let rugged = raw::bool_or(data, "rugged", false);
        let timer = raw::i64_or(data, "cooldownTimer", 0);
        let allow_buys = raw::bool_or(data, "allowPreRoundBuys", false);

        if active && !rugged {
            Phase::Active
        } else if rugged {
            Phase::Rugged
        } else if timer > 0 {
            if allow_buys {
                Phase::Presale
            } else {
                Phase::Cooldown
            }
        } else if allow_buys {
            Phase::Presale
        } else {
            Phase::Unknown
        }
    }

    /// Classify `data` and update internal state, returning a [`Transition`] if the
    /// `(phase, game_id)` pair changed. Returns `None` on a quiescent tick.
    pub fn process(&mut self, data: &Value) -> Option<Transition> {
        let new_phase = self.detect(data);
        let new_game_id = raw::str_or(data, "gameId", "");

        let phase_changed = new_phase != self.current_phase;
        let game_changed = new_game_id != self.current_game_id
            && !self.current_game_id.is_empty()
            && !new_game_id.is_empty();

        let transition = if phase_changed || game_changed {
            let mut is_seed_reveal = false;
            let mut is_new_game = false;

            if new_phase == Phase::Rugged && !game_changed {
                self.rug_count += 1;
                let seed_revealed = raw::obj(data, "provablyFair")
                    .and_then(|pf| raw::str_opt(pf, "serverSeed"))
                    .is_some();
                if seed_revealed {
                    is_seed_reveal = true;
                }
            }

            if game_changed {
                is_new_game = true;
                self.games_seen += 1;
            }

            let transition = Transition {
                previous_phase: self.current_phase,
                new_phase,
                previous_game_id: self.current_game_id.clone(),
                new_game_id: new_game_id.clone(),
                is_new_game,
                is_seed_reveal,
            };

            if transition.is_seed_reveal {
                info!(game_id = %self.current_game_id, "seed reveal");
            }
            if transition.is_new_game {
                info!(new_game_id = %new_game_id, prev_game_id = %self.current_game_id, "new game");
            }

            Some(transition)
        } else {
            None
        };

        self.current_phase = new_phase;
        self.current_game_id = new_game_id;

        transition
    }

    pub fn stats(&self) -> PhaseDetectorStats {
        PhaseDetectorStats {
            current_phase: self.current_phase,
            current_game_id: self.current_game_id.clone(),
            rug_count: self.rug_count,
            games_seen: self.games_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detect_priority_order() {
        let detector = PhaseDetector::new();
        assert_eq!(
            detector.detect(&json!({ "active": true, "rugged": false })),
            Phase::Active
        );
        assert_eq!(
            detector.detect(&json!({ "active": true, "rugged": true })),
            Phase::Rugged
        );
        assert_eq!(
            detector.detect(&json!({ "cooldownTimer": 5, "allowPreRoundBuys": true })),
            Phase::Presale
        );
        assert_eq!(detector.detect(&json!({ "cooldownTimer": 5 })), Phase::Cooldown);
        assert_eq!(
            detector.detect(&json!({ "allowPreRoundBuys": true })),
            Phase::Presale
        );
        assert_eq!(detector.detect(&json!({})), Phase::Unknown);
    }

    #[test]
    fn first_non_unknown_tick_always_transitions() {
        let mut detector = PhaseDetector::new();
        let transition = detector
            .process(&json!({ "gameId": "G1", "active": true }))
            .expect("first classification always transitions");
        assert_eq!(transition.previous_phase, Phase::Unknown);
        assert_eq!(transition.new_phase, Phase::Active);
        assert!(!transition.is_new_game, "no previous game id to transition from");
    }

    #[test]
    fn rug_transition_with_seed_reveal_is_not_a_new_game() {
        let mut detector = PhaseDetector::new();
        detector
            .process(&json!({ "gameId": "G1", "active": true }))
            .unwrap();

        let transition = detector
            .process(&json!({
                "gameId": "G1",
                "rugged": true,
                "provablyFair": { "serverSeed": "revealed_seed" },
            }))
            .expect("rug is a phase transition");

        assert_eq!(transition.new_phase, Phase::Rugged);
        assert!(transition.is_seed_reveal);
        assert!(!transition.is_new_game);
        assert_eq!(detector.stats().rug_count, 1);
    }

    #[test]
    fn new_game_id_is_flagged_and_counted() {
        let mut detector = PhaseDetector::new();
        detector
            .process(&json!({ "gameId": "G1", "rugged": true }))
            .unwrap();

        let transition = detector
            .process(&json!({ "gameId": "G2", "cooldownTimer": 15000 }))
            .expect("new game id transitions");

        assert_eq!(transition.previous_game_id, "G1");
        assert_eq!(transition.new_game_id, "G2");
        assert!(transition.is_new_game);
        assert_eq!(detector.stats().games_seen, 1);
        assert_eq!(transition.new_phase, Phase::Cooldown);
    }

    #[test]
    fn quiescent_tick_returns_none() {
        let mut detector = PhaseDetector::new();
        detector
            .process(&json!({ "gameId": "G1", "active": true }))
            .unwrap();
        assert!(detector
            .process(&json!({ "gameId": "G1", "active": true, "price": 2.0 }))
            .is_none());
    }
}
