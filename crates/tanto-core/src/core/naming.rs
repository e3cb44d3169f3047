//! Track Naming
//!
//! Derived tracks get names from a small prefix grammar:
//!
//! ```text
//! [<number>-][<nato word>-]<rest>
//! ```
//!
//! A sub track advances the NATO word (`main` -> `alpha-main` ->
//! `bravo-main`), a side track advances the number (`main` -> `0-main` ->
//! `1-main`). Candidates are checked against every track name in every
//! workspace until a free one turns up.

use std::collections::HashSet;

use crate::core::{CoreError, CoreResult};

pub const NATO_ALPHABET: [&str; 26] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliett",
    "kilo", "lima", "mike", "november", "oscar", "papa", "quebec", "romeo", "sierra", "tango",
    "uniform", "victor", "whiskey", "x-ray", "yankee", "zulu",
];

const DELIMITER: &str = "-";

// =============================================================================
// Grammar
// =============================================================================

/// A track name split into its prefixes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameParts {
    pub number: String,
    pub nato: String,
    pub rest: String,
}

fn is_number(w: &str) -> bool {
    !w.is_empty() && w.chars().all(|c| c.is_ascii_digit())
}

fn is_nato(w: &str) -> bool {
    NATO_ALPHABET.contains(&w)
}

impl NameParts {
    /// Splits a name. A prefix is only taken if something is left after it.
    pub fn parse(name: &str) -> Self {
        let words: Vec<&str> = name.split(DELIMITER).collect();
        let mut at = 0;
        let mut number = String::new();
        let mut nato = String::new();

        if words.len() - at >= 2 && is_number(words[at]) {
            number = words[at].to_string();
            at += 1;
        }

        // "x-ray" spans two words
        let remaining = words.len() - at;
        let nato_words = if remaining >= 2 && is_nato(words[at]) {
            1
        } else if remaining >= 3 && is_nato(&words[at..at + 2].join(DELIMITER)) {
            2
        } else {
            0
        };
        if nato_words > 0 {
            nato = words[at..at + nato_words].join(DELIMITER);
            at += nato_words;
        }

        Self {
            number,
            nato,
            rest: words[at..].join(DELIMITER),
        }
    }

    pub fn join(&self) -> String {
        join_words(&[&self.number, &self.nato, &self.rest])
    }
}

fn join_words(words: &[&str]) -> String {
    words
        .iter()
        .filter(|w| !w.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(DELIMITER)
}

/// NATO word starting with `c`, `zulu` if none does
pub fn nato_for_letter(c: char) -> &'static str {
    let c = c.to_ascii_lowercase();
    NATO_ALPHABET
        .iter()
        .find(|word| word.starts_with(c))
        .copied()
        .unwrap_or(NATO_ALPHABET[25])
}

/// The NATO word after `nato`, wrapping from `zulu` to `alpha`.
/// An empty word advances to `alpha`.
pub fn next_nato(nato: &str) -> &'static str {
    match nato.chars().next() {
        None => NATO_ALPHABET[0],
        Some(c) => {
            let c = c.to_ascii_lowercase();
            let next = if c.is_ascii_lowercase() {
                (((c as u8 - b'a') + 1) % 26 + b'a') as char
            } else {
                'a'
            };
            nato_for_letter(next)
        }
    }
}

/// `n + 1` for a numeric prefix, `"0"` otherwise
pub fn next_number(number: &str) -> String {
    match number.parse::<u64>() {
        Ok(n) if is_number(number) => (n + 1).to_string(),
        _ => "0".to_string(),
    }
}

pub fn sub_track_name(name: &str) -> String {
    let parts = NameParts::parse(name);
    join_words(&[&parts.number, next_nato(&parts.nato), &parts.rest])
}

/// Name with the number advanced, or set to `number` if given
pub fn side_track_name(name: &str, number: Option<usize>) -> String {
    let parts = NameParts::parse(name);
    let number = match number {
        Some(n) => n.to_string(),
        None => next_number(&parts.number),
    };
    join_words(&[&number, &parts.nato, &parts.rest])
}

/// Inserts `nato` in front of the name's NATO word:
/// `21-whiskey-x` -> `21-alpha-whiskey-x`
pub fn extend_nato(name: &str, nato: &str) -> String {
    let parts = NameParts::parse(name);
    join_words(&[&parts.number, nato, &parts.nato, &parts.rest])
}

// =============================================================================
// Collision-free Naming
// =============================================================================

/// Finds free names against a set of taken ones
pub struct TrackNamer<'a> {
    taken: &'a HashSet<String>,
    budget: usize,
}

impl<'a> TrackNamer<'a> {
    /// `budget` bounds the number of candidates tried per request
    pub fn new(taken: &'a HashSet<String>, budget: usize) -> Self {
        Self { taken, budget }
    }

    /// Walks candidates from `first` using `step`. When `step` comes back to
    /// where the current cycle started, `widen` moves to a fresh cycle.
    fn search(
        &self,
        first: String,
        step: impl Fn(&str) -> String,
        widen: impl Fn(&str) -> String,
    ) -> CoreResult<String> {
        let mut name = first.clone();
        let mut cycle_start = name.clone();
        for _ in 0..self.budget {
            if !self.taken.contains(&name) {
                return Ok(name);
            }
            name = step(&name);
            if name == cycle_start {
                name = widen(&name);
                cycle_start = name.clone();
            }
        }
        Err(CoreError::NameCollisionExhausted(first))
    }

    /// Name for a new version of `base` (clones, merges, bisections)
    pub fn sub_name(&self, base: &str) -> CoreResult<String> {
        self.search(sub_track_name(base), sub_track_name, |w| {
            side_track_name(w, None)
        })
    }

    /// Name for a sibling of `base` (mix results)
    pub fn side_name(&self, base: &str, number: Option<usize>) -> CoreResult<String> {
        self.search(
            side_track_name(base, number),
            |w| side_track_name(w, None),
            |w| extend_nato(w, NATO_ALPHABET[0]),
        )
    }

    /// Name for a track linked to clip `index` of `parent`
    pub fn link_name(&self, parent: &str, index: usize) -> CoreResult<String> {
        let first = join_words(&[&index.to_string(), NATO_ALPHABET[0], parent]);
        self.search(first, sub_track_name, |w| extend_nato(w, NATO_ALPHABET[0]))
    }
}
