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

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    TournamentId,
    format::Format,
    matches::{Match, MatchId, MatchState, Section, Side, SlotRef},
    standings::StandingsProcedure,
    store::{MatchStore, StoreError},
    team::{TeamId, TeamRef},
};

/// Where a double elimination loser drops to.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum LoserRouting {
    /// Follow the match's `loser_next` link laid down by the builder.
    #[default]
    Template,
    /// The earliest empty losers bracket slot that takes a dropped loser,
    /// whatever the template says. Seeding in the losers bracket then depends
    /// on the order results come in.
    FirstOpenSlot,
}

impl fmt::Display for LoserRouting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template => write!(f, "template"),
            Self::FirstOpenSlot => write!(f, "first_open_slot"),
        }
    }
}

impl FromStr for LoserRouting {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value {
            "template" => Ok(Self::Template),
            "first_open_slot" => Ok(Self::FirstOpenSlot),
            _ => Err(anyhow::Error::msg(format!(
                "Error trying to convert '{value}' to a LoserRouting!"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReportedResult {
    pub score_a: u32,
    pub score_b: u32,
    /// Overrides the scores, e.g. for a forfeit.
    #[serde(default)]
    pub winner: Option<TeamId>,
}

impl ReportedResult {
    #[must_use]
    pub fn new(score_a: u32, score_b: u32) -> Self {
        Self {
            score_a,
            score_b,
            winner: None,
        }
    }

    #[must_use]
    pub fn with_winner(mut self, winner: TeamId) -> Self {
        self.winner = Some(winner);
        self
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Effect {
    /// Put the winner into a later match.
    Advance { to: SlotRef, team: TeamRef },
    /// Put a winners bracket loser into the losers bracket.
    DropToLosers { to: SlotRef, team: TeamRef },
    Champion(TeamId),
    /// Forward to the standings procedure.
    RecomputeStandings {
        tournament_id: TournamentId,
        format: Format,
    },
}

impl Effect {
    #[must_use]
    pub fn placement(&self) -> Option<(&SlotRef, &TeamRef)> {
        match self {
            Self::Advance { to, team } | Self::DropToLosers { to, team } => Some((to, team)),
            Self::Champion(_) | Self::RecomputeStandings { .. } => None,
        }
    }
}

/// Everything the caller has to persist for one reported result.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Outcome {
    pub match_id: MatchId,
    pub winner: TeamId,
    pub loser: TeamId,
    pub state: MatchState,
    pub score_a: u32,
    pub score_b: u32,
    pub effects: Vec<Effect>,
}

impl Outcome {
    pub fn placements(&self) -> impl Iterator<Item = (&SlotRef, &TeamRef)> {
        self.effects.iter().filter_map(Effect::placement)
    }

    #[must_use]
    pub fn champion(&self) -> Option<&TeamId> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::Champion(team) => Some(team),
            _ => None,
        })
    }

    #[must_use]
    pub fn recompute(&self) -> Option<(TournamentId, Format)> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::RecomputeStandings {
                tournament_id,
                format,
            } => Some((*tournament_id, *format)),
            _ => None,
        })
    }
}

#[derive(Error, Debug, Eq, PartialEq)]
pub enum ProgressionError {
    #[error("report: match {0} is already completed")]
    AlreadyCompleted(MatchId),
    #[error("report: match {0} is still waiting for teams")]
    NotReady(MatchId),
    #[error("report: {score_a}-{score_b} in {match_id} is a tie and no winner was named")]
    AmbiguousResult {
        match_id: MatchId,
        score_a: u32,
        score_b: u32,
    },
    #[error("report: {team} is not playing in {match_id}")]
    NotAParticipant { match_id: MatchId, team: TeamId },
    #[error("report: match {0} not found")]
    MatchNotFound(MatchId),
}

#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Progression(#[from] ProgressionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("record: standings recomputation failed: {0}")]
    Standings(Box<dyn std::error::Error + Send + Sync>),
}

/// The progression engine for one tournament. Holds no match state, so one
/// value can serve any number of threads.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Progression {
    pub tournament_id: TournamentId,
    pub format: Format,
    #[serde(default)]
    pub loser_routing: LoserRouting,
}

impl Progression {
    #[must_use]
    pub fn new(tournament_id: TournamentId, format: Format) -> Self {
        Self {
            tournament_id,
            format,
            loser_routing: LoserRouting::default(),
        }
    }

    #[must_use]
    pub fn with_loser_routing(mut self, loser_routing: LoserRouting) -> Self {
        self.loser_routing = loser_routing;
        self
    }

    /// Decides `game` and describes what has to change. Losers are routed by
    /// the match's own `loser_next` link.
    ///
    /// # Errors
    ///
    /// If the match is already completed, is missing a team, the scores are
    /// tied with no winner named, or the named winner isn't playing.
    pub fn report_result(
        &self,
        game: &Match,
        result: &ReportedResult,
    ) -> Result<Outcome, ProgressionError> {
        self.decide(game, result, game.loser_next.clone())
    }

    /// Like [`Progression::report_result`], loading the match from `store`
    /// and routing losers by `self.loser_routing`.
    ///
    /// # Errors
    ///
    /// `MatchNotFound`, or any error of [`Progression::report_result`].
    pub fn report_result_in<S: MatchStore + ?Sized>(
        &self,
        store: &S,
        match_id: &MatchId,
        result: &ReportedResult,
    ) -> Result<Outcome, ProgressionError> {
        let game = store
            .load(match_id)
            .ok_or_else(|| ProgressionError::MatchNotFound(match_id.clone()))?;

        let drop = match (self.format, game.section, self.loser_routing) {
            (Format::DoubleElimination, Section::Winners, LoserRouting::FirstOpenSlot)
                if !game.is_completed() =>
            {
                store
                    .first_open_losers_slot()
                    .or_else(|| game.loser_next.clone())
            }
            _ => game.loser_next.clone(),
        };

        self.decide(&game, result, drop)
    }

    /// Load, decide, commit, then hand any standings signal on.
    ///
    /// The standings procedure runs after the commit, so if it fails the
    /// result is already stored and the recomputation can simply be run
    /// again.
    ///
    /// # Errors
    ///
    /// Any engine error, a store conflict, or a failed recomputation.
    pub fn record<S, P>(
        &self,
        store: &mut S,
        standings: &mut P,
        match_id: &MatchId,
        result: &ReportedResult,
    ) -> Result<Outcome, RecordError>
    where
        S: MatchStore + ?Sized,
        P: StandingsProcedure + ?Sized,
    {
        let outcome = self.report_result_in(&*store, match_id, result)?;
        store.commit(&outcome)?;

        if let Some((tournament_id, format)) = outcome.recompute() {
            standings
                .recompute(tournament_id, format)
                .map_err(|error| RecordError::Standings(error.into()))?;
        }

        Ok(outcome)
    }

    fn winning_side(game: &Match, result: &ReportedResult) -> Result<Side, ProgressionError> {
        if game.is_completed() {
            return Err(ProgressionError::AlreadyCompleted(game.id.clone()));
        }
        if game.team(Side::A).is_none() || game.team(Side::B).is_none() {
            return Err(ProgressionError::NotReady(game.id.clone()));
        }

        if let Some(winner) = &result.winner {
            return game
                .side_of(winner)
                .ok_or_else(|| ProgressionError::NotAParticipant {
                    match_id: game.id.clone(),
                    team: winner.clone(),
                });
        }

        match result.score_a.cmp(&result.score_b) {
            std::cmp::Ordering::Greater => Ok(Side::A),
            std::cmp::Ordering::Less => Ok(Side::B),
            std::cmp::Ordering::Equal => Err(ProgressionError::AmbiguousResult {
                match_id: game.id.clone(),
                score_a: result.score_a,
                score_b: result.score_b,
            }),
        }
    }

    fn decide(
        &self,
        game: &Match,
        result: &ReportedResult,
        drop: Option<SlotRef>,
    ) -> Result<Outcome, ProgressionError> {
        let side = Self::winning_side(game, result)?;
        let (Some(winner), Some(loser)) = (game.team(side), game.team(side.opposite())) else {
            return Err(ProgressionError::NotReady(game.id.clone()));
        };

        let mut effects = Vec::new();

        match self.format {
            Format::SingleElimination => Self::advance(game, winner, &mut effects),
            Format::DoubleElimination => {
                Self::advance(game, winner, &mut effects);

                if game.section == Section::Winners
                    && let Some(to) = drop
                {
                    trace!("{} drops to {to}", loser.id);
                    effects.push(Effect::DropToLosers {
                        to,
                        team: loser.clone(),
                    });
                }
            }
            Format::RoundRobin | Format::Swiss => {
                effects.push(Effect::RecomputeStandings {
                    tournament_id: self.tournament_id,
                    format: self.format,
                });
            }
        }

        debug!(
            "{}: {} beats {} {}-{}",
            game.id, winner.id, loser.id, result.score_a, result.score_b
        );

        Ok(Outcome {
            match_id: game.id.clone(),
            winner: winner.id.clone(),
            loser: loser.id.clone(),
            state: MatchState::Completed {
                winner: winner.id.clone(),
            },
            score_a: result.score_a,
            score_b: result.score_b,
            effects,
        })
    }

    fn advance(game: &Match, winner: &TeamRef, effects: &mut Vec<Effect>) {
        let Some(next) = &game.next else {
            info!("{winner} wins the tournament");
            effects.push(Effect::Champion(winner.id.clone()));
            return;
        };

        // Winners bracket slots follow position parity; the losers bracket
        // and grand final use the side stored on the link.
        let side = match game.section {
            Section::Winners => Side::from_position(game.position),
            Section::Losers | Section::GrandFinal | Section::Table => next.side,
        };

        effects.push(Effect::Advance {
            to: SlotRef::new(next.match_id.clone(), side),
            team: winner.clone(),
        });
    }
}
