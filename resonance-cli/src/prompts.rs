//! Practice prompts.
//!
//! The word list is a JSON object mapping a category name to a list of words
//! and sentences. A missing or unreadable list never stops a session: a short
//! built-in list is used instead.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

pub const FALLBACK_PROMPTS: &[&str] = &[
    "GROUND",
    "BOOM",
    "ALPHA VOICE",
    "RESONANCE",
    "Command the room with your resonance.",
];

/// Reads every prompt from `path`, in category order.
pub fn load(path: &Path) -> Vec<String> {
    let parsed = std::fs::read_to_string(path)
        .map_err(|err| err.to_string())
        .and_then(|text| {
            serde_json::from_str::<BTreeMap<String, Vec<String>>>(&text).map_err(|err| err.to_string())
        });

    match parsed {
        Ok(categories) => {
            let prompts: Vec<String> = categories
                .into_values()
                .flatten()
                .map(|p| p.trim().to_owned())
                .filter(|p| !p.is_empty())
                .collect();
            if prompts.is_empty() {
                tracing::warn!(path = %path.display(), "word list is empty, using built-in prompts");
                fallback()
            } else {
                prompts
            }
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "word list unavailable, using built-in prompts");
            fallback()
        }
    }
}

pub fn fallback() -> Vec<String> {
    FALLBACK_PROMPTS.iter().map(|p| (*p).to_owned()).collect()
}

/// More than one word: recorded with the longer sentence window.
///
/// Two and three word phrases such as "ALPHA VOICE" get the sentence window
/// but belong to neither [`words`] nor [`sentences`]; they only show up when
/// the whole list is practiced.
pub fn is_sentence(prompt: &str) -> bool {
    prompt.split_whitespace().count() > 1
}

/// Single words only.
pub fn words(prompts: &[String]) -> Vec<String> {
    prompts
        .iter()
        .filter(|p| p.split_whitespace().count() == 1)
        .cloned()
        .collect()
}

/// Full sentences: more than three words.
pub fn sentences(prompts: &[String]) -> Vec<String> {
    prompts
        .iter()
        .filter(|p| p.split_whitespace().count() > 3)
        .cloned()
        .collect()
}

/// Cycles through prompts on a fixed interval while a live session records.
#[derive(Debug, Clone)]
pub struct PromptRotation {
    prompts: Vec<String>,
    index: usize,
    interval: Duration,
    shown_at: Instant,
}

impl PromptRotation {
    /// Starts on the first prompt. An empty list rotates the built-in prompts.
    pub fn new(prompts: Vec<String>, interval: Duration, now: Instant) -> Self {
        let prompts = if prompts.is_empty() { fallback() } else { prompts };
        Self {
            prompts,
            index: 0,
            interval,
            shown_at: now,
        }
    }

    pub fn current(&self) -> &str {
        &self.prompts[self.index % self.prompts.len()]
    }

    /// Moves to the next prompt once the current one has been shown for the
    /// full interval. Returns the new prompt when it changed.
    pub fn advance(&mut self, now: Instant) -> Option<&str> {
        if now.saturating_duration_since(self.shown_at) <= self.interval {
            return None;
        }
        self.shown_at = now;
        self.index += 1;
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load(&dir.path().join("words.json")), fallback());
    }

    #[test]
    fn invalid_json_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert_eq!(load(&path), fallback());
    }

    #[test]
    fn loads_categories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.json");
        std::fs::write(
            &path,
            r#"{
                "Level_2_Belly_Involvement": ["BOOM", "  "],
                "Level_1_Chest_Resonance": ["GROUND", "The ground beneath me vibrates."]
            }"#,
        )
        .unwrap();
        assert_eq!(
            load(&path),
            vec!["GROUND", "The ground beneath me vibrates.", "BOOM"]
        );
    }

    #[test]
    fn splits_words_and_sentences() {
        let prompts = fallback();
        assert_eq!(words(&prompts), vec!["GROUND", "BOOM", "RESONANCE"]);
        assert_eq!(sentences(&prompts), vec!["Command the room with your resonance."]);
        assert!(is_sentence("ALPHA VOICE"));
        assert!(!is_sentence("BOOM"));
        // Short phrases are in neither split.
        assert!(!words(&prompts).contains(&"ALPHA VOICE".to_owned()));
        assert!(!sentences(&prompts).contains(&"ALPHA VOICE".to_owned()));
    }

    #[test]
    fn rotation_waits_for_the_interval() {
        let start = Instant::now();
        let list = vec!["first one here now".to_owned(), "second one here now".to_owned()];
        let mut rotation = PromptRotation::new(list, Duration::from_secs(3), start);
        assert_eq!(rotation.current(), "first one here now");

        assert_eq!(rotation.advance(start + Duration::from_secs(2)), None);
        assert_eq!(
            rotation.advance(start + Duration::from_secs(4)),
            Some("second one here now")
        );
        // The interval restarts from the change.
        assert_eq!(rotation.advance(start + Duration::from_secs(6)), None);
        assert_eq!(
            rotation.advance(start + Duration::from_secs(8)),
            Some("first one here now")
        );
    }

    #[test]
    fn empty_rotation_uses_built_in_prompts() {
        let rotation = PromptRotation::new(Vec::new(), Duration::from_secs(3), Instant::now());
        assert_eq!(rotation.current(), FALLBACK_PROMPTS[0]);
    }
}
