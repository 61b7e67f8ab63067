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

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    format::Format,
    matches::{Match, MatchId, MatchState, Section, Side, Slot, SlotRef},
    team::{TeamId, TeamRef},
};

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Round {
    pub round: u32,
    pub matches: Vec<Match>,
}

impl Round {
    #[must_use]
    pub fn new(round: u32, matches: Vec<Match>) -> Self {
        Self { round, matches }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Location {
    Winners(usize, usize),
    Losers(usize, usize),
    GrandFinal,
}

/// A full elimination bracket. `rounds` is the single elimination tree, or
/// the winners bracket when `format` is double elimination.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(from = "BracketParts")]
pub struct Bracket {
    pub format: Format,
    /// Slots in round one, a power of two.
    pub size: usize,
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub losers: Vec<Round>,
    #[serde(default)]
    pub grand_final: Option<Match>,
    #[serde(skip)]
    index: FxHashMap<MatchId, Location>,
}

#[derive(Deserialize)]
struct BracketParts {
    format: Format,
    size: usize,
    rounds: Vec<Round>,
    #[serde(default)]
    losers: Vec<Round>,
    #[serde(default)]
    grand_final: Option<Match>,
}

impl From<BracketParts> for Bracket {
    fn from(parts: BracketParts) -> Self {
        Self::new(
            parts.format,
            parts.size,
            parts.rounds,
            parts.losers,
            parts.grand_final,
        )
    }
}

impl PartialEq for Bracket {
    fn eq(&self, other: &Self) -> bool {
        self.format == other.format
            && self.size == other.size
            && self.rounds == other.rounds
            && self.losers == other.losers
            && self.grand_final == other.grand_final
    }
}

impl Eq for Bracket {}

#[derive(Error, Debug, Eq, PartialEq)]
pub enum BracketError {
    #[error("bracket: {0}")]
    Invariant(String),
}

fn invariant(message: String) -> Result<(), BracketError> {
    Err(BracketError::Invariant(message))
}

impl Bracket {
    #[must_use]
    pub fn new(
        format: Format,
        size: usize,
        rounds: Vec<Round>,
        losers: Vec<Round>,
        grand_final: Option<Match>,
    ) -> Self {
        let mut bracket = Self {
            format,
            size,
            rounds,
            losers,
            grand_final,
            index: FxHashMap::default(),
        };

        bracket.reindex();
        bracket
    }

    fn reindex(&mut self) {
        let mut index = FxHashMap::default();

        for (i, round) in self.rounds.iter().enumerate() {
            for (j, game) in round.matches.iter().enumerate() {
                index.insert(game.id.clone(), Location::Winners(i, j));
            }
        }
        for (i, round) in self.losers.iter().enumerate() {
            for (j, game) in round.matches.iter().enumerate() {
                index.insert(game.id.clone(), Location::Losers(i, j));
            }
        }
        if let Some(game) = &self.grand_final {
            index.insert(game.id.clone(), Location::GrandFinal);
        }

        self.index = index;
    }

    #[must_use]
    pub fn get(&self, id: &MatchId) -> Option<&Match> {
        match *self.index.get(id)? {
            Location::Winners(i, j) => self.rounds.get(i)?.matches.get(j),
            Location::Losers(i, j) => self.losers.get(i)?.matches.get(j),
            Location::GrandFinal => self.grand_final.as_ref(),
        }
    }

    pub fn get_mut(&mut self, id: &MatchId) -> Option<&mut Match> {
        match *self.index.get(id)? {
            Location::Winners(i, j) => self.rounds.get_mut(i)?.matches.get_mut(j),
            Location::Losers(i, j) => self.losers.get_mut(i)?.matches.get_mut(j),
            Location::GrandFinal => self.grand_final.as_mut(),
        }
    }

    /// Every match: winners bracket, losers bracket, then the grand final.
    pub fn matches(&self) -> impl Iterator<Item = &Match> {
        self.rounds
            .iter()
            .chain(self.losers.iter())
            .flat_map(|round| round.matches.iter())
            .chain(self.grand_final.iter())
    }

    /// The match whose winner takes the tournament.
    #[must_use]
    pub fn last_match(&self) -> Option<&Match> {
        match self.format {
            Format::DoubleElimination => self.grand_final.as_ref(),
            Format::SingleElimination | Format::RoundRobin | Format::Swiss => {
                self.rounds.last()?.matches.first()
            }
        }
    }

    #[must_use]
    pub fn champion(&self) -> Option<&TeamRef> {
        let last = self.last_match()?;
        let winner = last.winner()?;
        last.team(last.side_of(winner)?)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.champion().is_some()
    }

    /// Matches with two teams and no result yet.
    pub fn ready(&self) -> impl Iterator<Item = &Match> {
        self.matches()
            .filter(|game| game.state == MatchState::Ready)
    }

    /// The first ready match, by section then round then position. Owned, so
    /// the bracket can be written to while it is being played.
    #[must_use]
    pub fn next_ready(&self) -> Option<Match> {
        self.ready().next().cloned()
    }

    /// Slots that are filled by a winner moving forward, as opposed to a
    /// loser dropping down.
    #[must_use]
    pub fn winner_fed_slots(&self) -> FxHashSet<SlotRef> {
        self.matches()
            .filter_map(|game| game.next.clone())
            .collect()
    }

    /// The earliest empty losers bracket slot, by round then position, that
    /// takes a dropped loser.
    #[must_use]
    pub fn first_open_losers_slot(&self) -> Option<SlotRef> {
        let winner_fed = self.winner_fed_slots();

        self.losers
            .iter()
            .flat_map(|round| round.matches.iter())
            .flat_map(|game| {
                [Side::A, Side::B]
                    .into_iter()
                    .filter(|side| game.slot(*side).is_empty())
                    .map(|side| SlotRef::new(game.id.clone(), side))
            })
            .find(|slot| !winner_fed.contains(slot))
    }

    /// Checks the structural invariants of an elimination bracket.
    ///
    /// # Errors
    ///
    /// The first invariant found broken.
    pub fn validate(&self) -> Result<(), BracketError> {
        if !self.format.is_elimination() {
            return invariant(format!("{} has no bracket", self.format));
        }
        if self.size < 2 || !self.size.is_power_of_two() {
            return invariant(format!("size {} is not a power of two", self.size));
        }

        self.validate_rounds()?;
        self.validate_links()?;
        self.validate_byes()?;
        self.validate_teams()
    }

    fn validate_rounds(&self) -> Result<(), BracketError> {
        let mut expected = self.size / 2;

        for (i, round) in self.rounds.iter().enumerate() {
            if round.round as usize != i + 1 {
                return invariant(format!("round {} is stored at index {i}", round.round));
            }
            if round.matches.len() != expected {
                return invariant(format!(
                    "round {} has {} matches, expected {expected}",
                    round.round,
                    round.matches.len()
                ));
            }
            for (j, game) in round.matches.iter().enumerate() {
                if game.round != round.round || game.position as usize != j + 1 {
                    return invariant(format!("{} is out of place", game.id));
                }
            }

            expected /= 2;
        }

        if self.rounds.last().map(|round| round.matches.len()) != Some(1) {
            return invariant("the last round is not a single final".to_string());
        }

        Ok(())
    }

    fn validate_links(&self) -> Result<(), BracketError> {
        let mut incoming: FxHashMap<&MatchId, usize> = FxHashMap::default();
        let mut roots = Vec::new();

        for game in self.matches() {
            for link in game.next.iter().chain(game.loser_next.iter()) {
                let Some(target) = self.get(&link.match_id) else {
                    return invariant(format!("{} links to missing {}", game.id, link.match_id));
                };
                if !target.slot(link.side).is_empty() && target.team(link.side).is_none() {
                    return invariant(format!("{} links into a bye at {link}", game.id));
                }
                *incoming.entry(&target.id).or_default() += 1;
            }

            if game.next.is_none() {
                roots.push(&game.id);
            }
        }

        if roots.len() != 1 {
            return invariant(format!("expected one final, found {}", roots.len()));
        }
        if self.last_match().map(|game| &game.id) != roots.first().copied() {
            return invariant("the final is not the last match".to_string());
        }

        for round in &self.rounds {
            for game in &round.matches {
                if let Some(next) = &game.next
                    && game.section == Section::Winners
                    && let Some(target) = self.get(&next.match_id)
                    && target.section == Section::Winners
                {
                    let position = game.position.div_ceil(2);
                    if target.round != game.round + 1
                        || target.position != position
                        || next.side != Side::from_position(game.position)
                    {
                        return invariant(format!("{} links to the wrong slot {next}", game.id));
                    }
                }
            }
        }

        for game in self.matches() {
            let feeds = incoming.get(&game.id).copied().unwrap_or_default();
            let byes = [&game.slot_a, &game.slot_b]
                .into_iter()
                .filter(|slot| **slot == Slot::Bye)
                .count();
            let expected = if game.section == Section::Winners && game.round == 1 {
                0
            } else {
                2 - byes
            };

            if feeds != expected {
                return invariant(format!(
                    "{} is fed by {feeds} matches, expected {expected}",
                    game.id
                ));
            }
        }

        Ok(())
    }

    fn validate_byes(&self) -> Result<(), BracketError> {
        for game in self.matches() {
            match (&game.slot_a, &game.slot_b) {
                (Slot::Bye, Slot::Bye) => {
                    return invariant(format!("{} has two byes", game.id));
                }
                (Slot::Team { team, .. }, Slot::Bye) | (Slot::Bye, Slot::Team { team, .. }) => {
                    if game.winner() != Some(&team.id) {
                        return invariant(format!("bye {} is not won by {}", game.id, team.id));
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn validate_teams(&self) -> Result<(), BracketError> {
        for round in self.rounds.iter().chain(self.losers.iter()) {
            let mut seen: FxHashSet<&TeamId> = FxHashSet::default();

            for game in &round.matches {
                for team in [game.team(Side::A), game.team(Side::B)].into_iter().flatten() {
                    if !seen.insert(&team.id) {
                        return invariant(format!(
                            "{} appears twice in round {}",
                            team.id, round.round
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// # Errors
    ///
    /// If the snapshot isn't valid RON.
    pub fn from_ron(string: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(string)?)
    }

    /// # Errors
    ///
    /// If serialization fails.
    pub fn to_ron(&self) -> anyhow::Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }
}

impl fmt::Display for Bracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for round in &self.rounds {
            writeln!(f, "winners round {}", round.round)?;
            for game in &round.matches {
                writeln!(f, "  {game}")?;
            }
        }
        for round in &self.losers {
            writeln!(f, "losers round {}", round.round)?;
            for game in &round.matches {
                writeln!(f, "  {game}")?;
            }
        }
        if let Some(game) = &self.grand_final {
            writeln!(f, "grand final")?;
            writeln!(f, "  {game}")?;
        }

        Ok(())
    }
}
