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

use std::{fmt, str::FromStr};

use log::{debug, trace};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    bracket::{Bracket, Round},
    format::Format,
    losers,
    matches::{Match, MatchId, MatchState, Section, Side, Slot, SlotRef},
    team::{TeamId, TeamRef},
};

#[derive(Error, Debug, Eq, PartialEq)]
pub enum BuildError {
    #[error("build: at least two teams are needed, got {0}")]
    InsufficientParticipants(usize),
    #[error("build: seed {0} is used more than once")]
    DuplicateSeed(u32),
    #[error("build: team {0} is entered more than once")]
    DuplicateTeam(TeamId),
    #[error("build: match {0} is listed more than once")]
    DuplicateMatch(MatchId),
    #[error("build: {0} is not supported here")]
    UnsupportedFormat(Format),
    #[error("build: {0}")]
    Invariant(String),
}

/// How seeds are laid out over the round one matches.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Placement {
    /// Slot `i` plays its mirror `size - 1 - i` in match `i + 1`.
    #[default]
    Fold,
    /// The same pairings, ordered so that the top two seeds are in opposite
    /// halves and can only meet in the final.
    Separated,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fold => write!(f, "fold"),
            Self::Separated => write!(f, "separated"),
        }
    }
}

impl FromStr for Placement {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value {
            "fold" => Ok(Self::Fold),
            "separated" => Ok(Self::Separated),
            _ => Err(anyhow::Error::msg(format!(
                "Error trying to convert '{value}' to a Placement!"
            ))),
        }
    }
}

/// Builds the initial bracket with fold placement.
///
/// # Errors
///
/// If there are fewer than two teams, a seed or team is repeated, or the
/// format is not an elimination format.
pub fn build(teams: &[TeamRef], format: Format) -> Result<Bracket, BuildError> {
    build_with(teams, format, Placement::default())
}

/// # Errors
///
/// See [`build`].
pub fn build_with(
    teams: &[TeamRef],
    format: Format,
    placement: Placement,
) -> Result<Bracket, BuildError> {
    match format {
        Format::SingleElimination | Format::DoubleElimination => {}
        Format::RoundRobin | Format::Swiss => return Err(BuildError::UnsupportedFormat(format)),
    }

    let seeded = seed_order(teams)?;
    let size = seeded.len().next_power_of_two();
    let mut rounds = winners_bracket(&seeded, size, placement)?;

    let mut bracket = match format {
        Format::DoubleElimination => {
            let (losers, grand_final) = losers::attach(&mut rounds)?;
            Bracket::new(format, size, rounds, losers, Some(grand_final))
        }
        Format::SingleElimination | Format::RoundRobin | Format::Swiss => {
            Bracket::new(format, size, rounds, Vec::new(), None)
        }
    };

    advance_byes(&mut bracket)?;

    debug!(
        "built {format} bracket: {} teams, size {size}, {} rounds, {} losers rounds",
        seeded.len(),
        bracket.rounds.len(),
        bracket.losers.len()
    );

    Ok(bracket)
}

/// Sorts by ascending seed, rejecting repeats.
fn seed_order(teams: &[TeamRef]) -> Result<Vec<TeamRef>, BuildError> {
    if teams.len() < 2 {
        return Err(BuildError::InsufficientParticipants(teams.len()));
    }

    let mut seeds = FxHashSet::default();
    let mut ids = FxHashSet::default();

    for team in teams {
        if !seeds.insert(team.seed) {
            return Err(BuildError::DuplicateSeed(team.seed));
        }
        if !ids.insert(&team.id) {
            return Err(BuildError::DuplicateTeam(team.id.clone()));
        }
    }

    let mut seeded = teams.to_vec();
    seeded.sort_unstable_by_key(|team| team.seed);

    Ok(seeded)
}

pub(crate) fn to_u32(value: usize) -> Result<u32, BuildError> {
    u32::try_from(value).map_err(|_| BuildError::Invariant(format!("{value} does not fit a round")))
}

/// Slot index pairs for each round one match, in match order.
fn pairings(size: usize, placement: Placement) -> Vec<(usize, usize)> {
    match placement {
        Placement::Fold => (0..size / 2).map(|i| (i, size - 1 - i)).collect(),
        Placement::Separated => {
            let mut order = vec![0];

            while order.len() < size {
                let width = order.len() * 2;
                order = order
                    .into_iter()
                    .flat_map(|slot| [slot, width - 1 - slot])
                    .collect();
            }

            order
                .chunks_exact(2)
                .map(|pair| (pair[0], pair[1]))
                .collect()
        }
    }
}

fn winners_bracket(
    seeded: &[TeamRef],
    size: usize,
    placement: Placement,
) -> Result<Vec<Round>, BuildError> {
    let slot = |index: usize| match seeded.get(index) {
        Some(team) => Slot::team(team.clone()),
        None => Slot::Bye,
    };

    let mut first = Vec::with_capacity(size / 2);
    for (i, (a, b)) in pairings(size, placement).into_iter().enumerate() {
        let mut game = Match::new(Section::Winners, 1, to_u32(i + 1)?);
        game.slot_a = slot(a);
        game.slot_b = slot(b);

        match (game.team(Side::A).cloned(), game.team(Side::B).cloned()) {
            (Some(_), Some(_)) => game.state = MatchState::Ready,
            (Some(team), None) | (None, Some(team)) => {
                trace!("{} is a bye for {}", game.id, team.id);
                game.state = MatchState::Completed { winner: team.id };
            }
            (None, None) => {
                return Err(BuildError::Invariant(format!(
                    "{} has no teams in a bracket of {size}",
                    game.id
                )));
            }
        }

        first.push(game);
    }

    let mut rounds = vec![Round::new(1, first)];
    let mut count = size / 4;
    let mut round = 2;

    while count >= 1 {
        let matches = (1..=count)
            .map(|position| Ok(Match::new(Section::Winners, round, to_u32(position)?)))
            .collect::<Result<Vec<_>, BuildError>>()?;

        rounds.push(Round::new(round, matches));
        count /= 2;
        round += 1;
    }

    for i in 1..rounds.len() {
        let (earlier, later) = rounds.split_at_mut(i);
        let Some(previous) = earlier.last_mut() else {
            continue;
        };
        let next_round = &later[0];

        for game in &mut previous.matches {
            let position = game.position.div_ceil(2);
            let target = next_round
                .matches
                .iter()
                .find(|next| next.position == position)
                .ok_or_else(|| {
                    BuildError::Invariant(format!("{} has no match to advance to", game.id))
                })?;

            game.next = Some(SlotRef::new(
                target.id.clone(),
                Side::from_position(game.position),
            ));
        }
    }

    Ok(rounds)
}

/// Moves every bye winner into its next match.
fn advance_byes(bracket: &mut Bracket) -> Result<(), BuildError> {
    let byes: Vec<(TeamRef, SlotRef)> = bracket
        .rounds
        .first()
        .map(|round| {
            round
                .matches
                .iter()
                .filter(|game| game.is_bye())
                .filter_map(|game| {
                    let winner = game.team(game.side_of(game.winner()?)?)?;
                    Some((winner.clone(), game.next.clone()?))
                })
                .collect()
        })
        .unwrap_or_default();

    for (team, slot) in byes {
        let target = bracket
            .get_mut(&slot.match_id)
            .ok_or_else(|| BuildError::Invariant(format!("bye links to missing {slot}")))?;

        trace!("{} advances to {slot} on a bye", team.id);
        *target.slot_mut(slot.side) = Slot::team(team);
        target.refresh_state();
    }

    Ok(())
}
