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

//! The losers bracket and grand final of a double elimination bracket.
//!
//! Losers round one pairs the losers of winners round one. Even losers
//! rounds `2r` match the survivors of the previous losers round against the
//! losers of winners round `r + 1`, dropped in reverse order to delay
//! rematches. Odd losers rounds after the first halve the field. The losers
//! bracket champion meets the winners bracket champion in a single grand
//! final.
//!
//! Byes in winners round one leave holes. A losers match that can only
//! ever receive one team is dropped and that team is linked straight through
//! to where the match's winner would have gone; a match that can receive no
//! team is dropped along with its output.

use log::trace;
use rustc_hash::FxHashMap;

use crate::{
    bracket::Round,
    builder::{BuildError, to_u32},
    matches::{Match, MatchId, Section, Side, SlotRef},
};

#[derive(Clone, Debug, Eq, PartialEq)]
enum Feed {
    WinnerOf(MatchId),
    LoserOf(MatchId),
    Nothing,
}

impl Feed {
    fn is_live(&self) -> bool {
        *self != Self::Nothing
    }
}

fn loser_of(game: &Match) -> Feed {
    if game.is_bye() {
        Feed::Nothing
    } else {
        Feed::LoserOf(game.id.clone())
    }
}

/// Builds the losers bracket and grand final for `winners`, setting the
/// winners bracket's loser links and pointing its final at the grand final.
pub(crate) fn attach(winners: &mut [Round]) -> Result<(Vec<Round>, Match), BuildError> {
    let grand_final = Match::new(Section::GrandFinal, 1, 1);
    let depth = winners.len();

    let Some(final_round) = winners.last_mut() else {
        return Err(BuildError::Invariant("no winners bracket".to_string()));
    };
    for game in &mut final_round.matches {
        game.next = Some(SlotRef::new(grand_final.id.clone(), Side::A));
    }

    if depth == 1 {
        for game in &mut final_round.matches {
            game.loser_next = Some(SlotRef::new(grand_final.id.clone(), Side::B));
        }
        return Ok((Vec::new(), grand_final));
    }

    let mut rounds = Vec::new();
    let mut links: Vec<(Feed, SlotRef)> = Vec::new();
    let mut previous: Vec<Feed> = Vec::new();

    for losers_round in 1..=2 * (depth - 1) {
        let inputs: Vec<[Feed; 2]> = if losers_round == 1 {
            winners[0]
                .matches
                .chunks_exact(2)
                .map(|pair| [loser_of(&pair[0]), loser_of(&pair[1])])
                .collect()
        } else if losers_round % 2 == 0 {
            let dropping = &winners[losers_round / 2].matches;
            previous
                .iter()
                .zip(dropping.iter().rev())
                .map(|(survivor, game)| [survivor.clone(), loser_of(game)])
                .collect()
        } else {
            previous
                .chunks_exact(2)
                .map(|pair| [pair[0].clone(), pair[1].clone()])
                .collect()
        };

        let round = to_u32(losers_round)?;
        let mut matches = Vec::new();
        let mut survivors = Vec::with_capacity(inputs.len());

        for (i, [a, b]) in inputs.into_iter().enumerate() {
            match (a.is_live(), b.is_live()) {
                (true, true) => {
                    let game = Match::new(Section::Losers, round, to_u32(i + 1)?);
                    links.push((a, SlotRef::new(game.id.clone(), Side::A)));
                    links.push((b, SlotRef::new(game.id.clone(), Side::B)));
                    survivors.push(Feed::WinnerOf(game.id.clone()));
                    matches.push(game);
                }
                (true, false) => survivors.push(a),
                (false, true) => survivors.push(b),
                (false, false) => survivors.push(Feed::Nothing),
            }
        }

        if !matches.is_empty() {
            rounds.push(Round::new(round, matches));
        }
        previous = survivors;
    }

    match previous.as_slice() {
        [champion] if champion.is_live() => {
            links.push((champion.clone(), SlotRef::new(grand_final.id.clone(), Side::B)));
        }
        _ => {
            return Err(BuildError::Invariant(
                "the losers bracket has no champion".to_string(),
            ));
        }
    }

    let mut losers_index: FxHashMap<MatchId, (usize, usize)> = FxHashMap::default();
    for (i, round) in rounds.iter().enumerate() {
        for (j, game) in round.matches.iter().enumerate() {
            losers_index.insert(game.id.clone(), (i, j));
        }
    }

    for (feed, slot) in links {
        trace!("{feed:?} feeds {slot}");

        match feed {
            Feed::WinnerOf(id) => {
                let (i, j) = losers_index.get(&id).copied().ok_or_else(|| {
                    BuildError::Invariant(format!("{id} is not in the losers bracket"))
                })?;
                rounds[i].matches[j].next = Some(slot);
            }
            Feed::LoserOf(id) => {
                let game = winners
                    .iter_mut()
                    .flat_map(|round| round.matches.iter_mut())
                    .find(|game| game.id == id)
                    .ok_or_else(|| {
                        BuildError::Invariant(format!("{id} is not in the winners bracket"))
                    })?;
                game.loser_next = Some(slot);
            }
            Feed::Nothing => {
                return Err(BuildError::Invariant(format!("nothing feeds {slot}")));
            }
        }
    }

    Ok((rounds, grand_final))
}
