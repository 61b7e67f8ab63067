// This file is part of tournament-bracket.
//
// tournament-bracket is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// tournament-bracket is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use log::{trace, warn};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::{
    TournamentId,
    bracket::Bracket,
    builder::BuildError,
    format::Format,
    matches::{Match, MatchId, MatchState, Side, Slot, SlotRef},
    progression::Outcome,
    team::TeamRef,
};

#[derive(Error, Debug, Eq, PartialEq)]
pub enum StoreError {
    #[error("store: match {0} not found")]
    NotFound(MatchId),
    #[error("store: match {0} was already completed")]
    Conflict(MatchId),
    #[error("store: {slot} already holds {occupant}")]
    SlotTaken { slot: SlotRef, occupant: String },
    #[error("store: match {0} changed since it was loaded")]
    Stale(MatchId),
}

/// Where matches live between calls into the engine.
///
/// `commit` is the only write. It must apply an outcome atomically: either
/// the source match is completed and every placement lands, or nothing
/// changes. It must also refuse to complete a match twice, which is what
/// keeps two concurrent reports from both succeeding.
pub trait MatchStore {
    fn load(&self, id: &MatchId) -> Option<Match>;

    /// # Errors
    ///
    /// If the source match is already completed, a target slot holds another
    /// team, or a match is missing.
    fn commit(&mut self, outcome: &Outcome) -> Result<(), StoreError>;

    /// The slot a loser drops into under first open slot routing.
    fn first_open_losers_slot(&self) -> Option<SlotRef> {
        None
    }
}

trait Matches {
    fn lookup(&self, id: &MatchId) -> Option<&Match>;
    fn lookup_mut(&mut self, id: &MatchId) -> Option<&mut Match>;
}

impl Matches for Bracket {
    fn lookup(&self, id: &MatchId) -> Option<&Match> {
        self.get(id)
    }

    fn lookup_mut(&mut self, id: &MatchId) -> Option<&mut Match> {
        self.get_mut(id)
    }
}

impl MatchStore for Bracket {
    fn load(&self, id: &MatchId) -> Option<Match> {
        self.get(id).cloned()
    }

    fn commit(&mut self, outcome: &Outcome) -> Result<(), StoreError> {
        commit_in_memory(self, outcome)
    }

    fn first_open_losers_slot(&self) -> Option<SlotRef> {
        Bracket::first_open_losers_slot(self)
    }
}

/// Whether `team` still has to be written into `slot`. Writing the same team
/// again is a no-op.
fn needs_placing(target: &Match, slot: &SlotRef, team: &TeamRef) -> Result<bool, StoreError> {
    match target.slot(slot.side) {
        Slot::Empty => Ok(true),
        Slot::Team { team: occupant, .. } if occupant.id == team.id => {
            trace!("{} is already in {slot}", team.id);
            Ok(false)
        }
        Slot::Team { team: occupant, .. } => Err(StoreError::SlotTaken {
            slot: slot.clone(),
            occupant: occupant.id.to_string(),
        }),
        Slot::Bye => Err(StoreError::SlotTaken {
            slot: slot.clone(),
            occupant: "a bye".to_string(),
        }),
    }
}

fn place<M: Matches + ?Sized>(
    matches: &mut M,
    slot: &SlotRef,
    team: &TeamRef,
) -> Result<bool, StoreError> {
    let target = matches
        .lookup_mut(&slot.match_id)
        .ok_or_else(|| StoreError::NotFound(slot.match_id.clone()))?;

    if !needs_placing(target, slot, team)? {
        return Ok(false);
    }

    trace!("placing {} into {slot}", team.id);
    *target.slot_mut(slot.side) = Slot::team(team.clone());
    target.refresh_state();
    Ok(true)
}

/// Checks everything first, then writes, so a failed commit leaves the
/// matches untouched.
fn commit_in_memory<M: Matches + ?Sized>(
    matches: &mut M,
    outcome: &Outcome,
) -> Result<(), StoreError> {
    let source = matches
        .lookup(&outcome.match_id)
        .ok_or_else(|| StoreError::NotFound(outcome.match_id.clone()))?;

    if source.is_completed() {
        warn!("refusing to complete {} twice", outcome.match_id);
        return Err(StoreError::Conflict(outcome.match_id.clone()));
    }
    if source.side_of(&outcome.winner).is_none() {
        return Err(StoreError::Stale(outcome.match_id.clone()));
    }

    let mut placements = Vec::new();
    for (slot, team) in outcome.placements() {
        let target = matches
            .lookup(&slot.match_id)
            .ok_or_else(|| StoreError::NotFound(slot.match_id.clone()))?;

        if needs_placing(target, slot, team)? {
            placements.push((slot, team));
        }
    }

    let source = matches
        .lookup_mut(&outcome.match_id)
        .ok_or_else(|| StoreError::NotFound(outcome.match_id.clone()))?;

    for (side, score) in [(Side::A, outcome.score_a), (Side::B, outcome.score_b)] {
        if let Slot::Team { score: slot_score, .. } = source.slot_mut(side) {
            *slot_score = Some(score);
        }
    }
    source.state = MatchState::Completed {
        winner: outcome.winner.clone(),
    };

    for (slot, team) in placements {
        place(matches, slot, team)?;
    }

    Ok(())
}

/// The flat match list of a round robin or Swiss tournament. Pairings are
/// generated elsewhere; this only records results.
#[derive(Clone, Debug, Default)]
pub struct Fixtures {
    pub tournament_id: TournamentId,
    pub format: Format,
    matches: Vec<Match>,
    index: FxHashMap<MatchId, usize>,
}

impl Fixtures {
    /// # Errors
    ///
    /// If `format` is an elimination format or a match id repeats.
    pub fn new(
        tournament_id: TournamentId,
        format: Format,
        matches: Vec<Match>,
    ) -> Result<Self, BuildError> {
        if !format.uses_standings() {
            return Err(BuildError::UnsupportedFormat(format));
        }

        let mut index = FxHashMap::default();
        for (i, game) in matches.iter().enumerate() {
            if index.insert(game.id.clone(), i).is_some() {
                return Err(BuildError::DuplicateMatch(game.id.clone()));
            }
        }

        Ok(Self {
            tournament_id,
            format,
            matches,
            index,
        })
    }

    #[must_use]
    pub fn get(&self, id: &MatchId) -> Option<&Match> {
        self.matches.get(*self.index.get(id)?)
    }

    #[must_use]
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// The history a standings procedure ranks from.
    pub fn completed(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(|game| game.is_completed())
    }
}

impl Matches for Fixtures {
    fn lookup(&self, id: &MatchId) -> Option<&Match> {
        self.get(id)
    }

    fn lookup_mut(&mut self, id: &MatchId) -> Option<&mut Match> {
        self.matches.get_mut(*self.index.get(id)?)
    }
}

impl MatchStore for Fixtures {
    fn load(&self, id: &MatchId) -> Option<Match> {
        self.get(id).cloned()
    }

    fn commit(&mut self, outcome: &Outcome) -> Result<(), StoreError> {
        commit_in_memory(self, outcome)
    }
}
