//! Session milestones and the mastery goal.
//!
//! A session is ranked by its weakest metric, so one strong band cannot carry
//! the rest.

use resonance_core::ScoreRecord;
use std::fmt;

pub const REAL_ALPHA_THRESHOLD: u8 = 97;
pub const SECOND_ALPHA_THRESHOLD: u8 = 85;
pub const LEVEL_ONE_THRESHOLD: u8 = 70;

/// Mastered drill prompts needed to complete the course.
pub const MASTERY_SESSIONS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Milestone {
    LevelOne,
    SecondAlpha,
    RealAlpha,
}

impl Milestone {
    /// The highest milestone whose threshold the lowest metric reaches.
    pub fn reached(record: &ScoreRecord) -> Option<Self> {
        if !record.speech_detected {
            return None;
        }
        let lowest = lowest_metric(record);
        if lowest >= REAL_ALPHA_THRESHOLD {
            Some(Self::RealAlpha)
        } else if lowest >= SECOND_ALPHA_THRESHOLD {
            Some(Self::SecondAlpha)
        } else if lowest >= LEVEL_ONE_THRESHOLD {
            Some(Self::LevelOne)
        } else {
            None
        }
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::RealAlpha => "Excellent: real alpha deep voice achieved.",
            Self::SecondAlpha => "Bravo: second alpha milestone reached.",
            Self::LevelOne => "Level 1 alpha deep voice unlocked.",
        };
        f.write_str(text)
    }
}

pub fn lowest_metric(record: &ScoreRecord) -> u8 {
    record.metrics().values().copied().min().unwrap_or(0)
}

/// `"N / 7 sessions completed"`, marked as mastered once the goal is met.
pub fn mastery_status(completed: usize) -> String {
    if completed >= MASTERY_SESSIONS {
        format!("mastered ({completed} / {MASTERY_SESSIONS} sessions completed)")
    } else {
        format!("{completed} / {MASTERY_SESSIONS} sessions completed")
    }
}
