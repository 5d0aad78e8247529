// Diatonic Chords - Degree member sets, candidate matching and voicing
// Every chord is named by its root letter in C major (C = degree 1)

use std::collections::BTreeSet;

use crate::error::ArrangementError;
use crate::notes::{Letter, NoteName};

/// Scale positions that count as members of the chord on each degree
///
/// The sets are not wrapped modulo 7, so positions 8 and above never match
/// a bar letter. Chord matching output depends on this exact table.
pub fn degree_members(root: Letter) -> &'static [u8] {
    match root {
        Letter::C => &[1, 3, 5],
        Letter::D => &[2, 4, 6],
        Letter::E => &[3, 5, 7],
        Letter::F => &[4, 6, 8],
        Letter::G => &[5, 7, 9],
        Letter::A => &[6, 8, 10],
        Letter::B => &[7, 9, 11, 13],
    }
}

/// Semitone gaps stacked above the root to voice each degree
pub fn interval_gaps(root: Letter) -> &'static [u8] {
    match root {
        Letter::C => &[4, 3],
        Letter::D => &[3, 4],
        Letter::E => &[3, 4],
        Letter::F => &[4, 3],
        Letter::G => &[4, 3],
        Letter::A => &[3, 4],
        Letter::B => &[3, 3, 4],
    }
}

/// MIDI pitches of the chord on `root` with its root in `octave`
///
/// A root outside the pitch table means the upstream data is corrupt.
pub fn chord_pitches(root: Letter, octave: i8) -> Result<Vec<u8>, ArrangementError> {
    let name = NoteName::new(root, octave);
    let root_pitch = name
        .pitch()
        .ok_or_else(|| ArrangementError::musical(format!("unable to find {} note", name)))?;

    let mut pitches = vec![root_pitch];
    let mut current = root_pitch;
    for &gap in interval_gaps(root) {
        current = current
            .checked_add(gap)
            .filter(|p| *p <= 127)
            .ok_or_else(|| ArrangementError::musical(format!("chord {} exceeds MIDI range", name)))?;
        pitches.push(current);
    }

    Ok(pitches)
}

/// Number of distinct bar positions that belong to the chord on `root`
fn hit_count(root: Letter, positions: &BTreeSet<u8>) -> usize {
    let members = degree_members(root);
    positions.iter().filter(|p| members.contains(*p)).count()
}

/// Chords whose member sets cover the most distinct letters of a bar
///
/// Ties are kept, in ascending degree order.
pub fn chord_candidates(letters: &[Letter]) -> Vec<Letter> {
    let positions: BTreeSet<u8> = letters.iter().map(|l| l.position()).collect();

    let hits: Vec<(Letter, usize)> = Letter::ALL
        .iter()
        .map(|&root| (root, hit_count(root, &positions)))
        .collect();

    let max_hits = hits.iter().map(|(_, h)| *h).max().unwrap_or(0);

    hits.into_iter()
        .filter(|(_, h)| *h == max_hits)
        .map(|(root, _)| root)
        .collect()
}

/// Bar letters that are members of the given chord, in scale order
pub fn in_chord_letters(root: Letter, letters: &[Letter]) -> Vec<Letter> {
    let members = degree_members(root);
    let distinct: BTreeSet<Letter> = letters.iter().copied().collect();
    distinct
        .into_iter()
        .filter(|l| members.contains(&l.position()))
        .collect()
}
