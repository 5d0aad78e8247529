// Chord Inference - One chord per bar with sequence-wide diversity
// Greedy, order-dependent selection threaded through an explicit accumulator

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::chords::chord_candidates;
use crate::notes::Letter;

/// Chord chosen for each bar, plus every chord used along the way
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordAssignment {
    /// Root letter per bar, in bar order
    pub chords: Vec<Letter>,

    /// Chords marked used during the pass
    pub used: BTreeSet<Letter>,
}

/// Running state of the diversity heuristic
///
/// Bars must be fed in order; the result of each bar depends on the
/// chords chosen before it.
#[derive(Debug, Clone, Default)]
pub struct ChordSelector {
    used: BTreeSet<Letter>,
    previous: Option<Letter>,
}

impl ChordSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a chord for the next bar from its letters
    ///
    /// A bar without any named letters reuses the previous chord (the
    /// tonic if nothing was chosen yet) and leaves the used set alone.
    pub fn select(&mut self, letters: &[Letter]) -> Letter {
        if letters.is_empty() {
            let chord = self.previous.unwrap_or(Letter::C);
            self.previous = Some(chord);
            return chord;
        }

        let candidates = chord_candidates(letters);
        self.select_from_candidates(&candidates)
    }

    /// Pick among max-hit candidates (ascending degree order)
    ///
    /// 1. First candidate not used anywhere earlier in the sequence
    /// 2. Otherwise first candidate differing from the previous bar
    /// 3. Otherwise the first candidate
    pub fn select_from_candidates(&mut self, candidates: &[Letter]) -> Letter {
        let first = match candidates.first() {
            Some(first) => *first,
            None => return self.previous.unwrap_or(Letter::C),
        };

        let chord = candidates
            .iter()
            .copied()
            .find(|c| !self.used.contains(c))
            .or_else(|| candidates.iter().copied().find(|c| Some(*c) != self.previous))
            .unwrap_or(first);

        self.used.insert(chord);
        self.previous = Some(chord);
        chord
    }

    pub fn into_used(self) -> BTreeSet<Letter> {
        self.used
    }
}

/// Infer one chord per bar over the whole ordered bar sequence
pub fn infer_chords(bar_letters: &[Vec<Letter>]) -> ChordAssignment {
    let mut selector = ChordSelector::new();
    let chords = bar_letters.iter().map(|letters| selector.select(letters)).collect();

    ChordAssignment {
        chords,
        used: selector.into_used(),
    }
}
