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

use serde::{Deserialize, Serialize};

use crate::team::{TeamId, TeamRef};

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct MatchId(pub String);

impl MatchId {
    #[must_use]
    pub fn new(section: Section, round: u32, position: u32) -> Self {
        match section {
            Section::GrandFinal => Self("GF".to_string()),
            Section::Winners => Self(format!("W{round}-{position}")),
            Section::Losers => Self(format!("L{round}-{position}")),
            Section::Table => Self(format!("T{round}-{position}")),
        }
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MatchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Which part of the tournament a match belongs to.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Section {
    #[default]
    Winners,
    Losers,
    GrandFinal,
    /// Round robin and Swiss pairings: no tree.
    Table,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Winners => write!(f, "winners"),
            Self::Losers => write!(f, "losers"),
            Self::GrandFinal => write!(f, "grand_final"),
            Self::Table => write!(f, "table"),
        }
    }
}

impl FromStr for Section {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value {
            "winners" => Ok(Self::Winners),
            "losers" => Ok(Self::Losers),
            "grand_final" => Ok(Self::GrandFinal),
            "table" => Ok(Self::Table),
            _ => Err(anyhow::Error::msg(format!(
                "Error trying to convert '{value}' to a Section!"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Side {
    #[default]
    A,
    B,
}

impl Side {
    /// Odd positions feed `slot_a` of the next round, even positions `slot_b`.
    #[must_use]
    pub fn from_position(position: u32) -> Self {
        if position % 2 == 1 { Self::A } else { Self::B }
    }

    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "a"),
            Self::B => write!(f, "b"),
        }
    }
}

/// One side of one match.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct SlotRef {
    pub match_id: MatchId,
    pub side: Side,
}

impl SlotRef {
    #[must_use]
    pub fn new(match_id: MatchId, side: Side) -> Self {
        Self { match_id, side }
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.match_id, self.side)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Slot {
    /// Waiting for a team from an earlier match.
    #[default]
    Empty,
    Team {
        team: TeamRef,
        score: Option<u32>,
    },
    /// Never receives a team.
    Bye,
}

impl Slot {
    #[must_use]
    pub fn team(team: TeamRef) -> Self {
        Self::Team { team, score: None }
    }

    #[must_use]
    pub fn as_team(&self) -> Option<&TeamRef> {
        match self {
            Self::Team { team, .. } => Some(team),
            Self::Empty | Self::Bye => None,
        }
    }

    #[must_use]
    pub fn score(&self) -> Option<u32> {
        match self {
            Self::Team { score, .. } => *score,
            Self::Empty | Self::Bye => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::Empty
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "-"),
            Self::Team { team, score: None } => write!(f, "{team}"),
            Self::Team {
                team,
                score: Some(score),
            } => write!(f, "{team} [{score}]"),
            Self::Bye => write!(f, "bye"),
        }
    }
}

/// Only `Completed` carries a winner, so a winner can't exist without the
/// match being over.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum MatchState {
    #[default]
    Pending,
    Ready,
    Completed {
        winner: TeamId,
    },
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::Completed { winner } => write!(f, "completed {winner}"),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Match {
    pub id: MatchId,
    #[serde(default)]
    pub section: Section,
    pub round: u32,
    pub position: u32,
    #[serde(default)]
    pub slot_a: Slot,
    #[serde(default)]
    pub slot_b: Slot,
    #[serde(default)]
    pub state: MatchState,
    /// Where the winner goes.
    #[serde(default)]
    pub next: Option<SlotRef>,
    /// Where the loser goes, double elimination winners bracket only.
    #[serde(default)]
    pub loser_next: Option<SlotRef>,
}

impl Match {
    #[must_use]
    pub fn new(section: Section, round: u32, position: u32) -> Self {
        Self {
            id: MatchId::new(section, round, position),
            section,
            round,
            position,
            ..Self::default()
        }
    }

    /// A round robin or Swiss pairing produced outside the bracket builder.
    #[must_use]
    pub fn pairing(id: MatchId, round: u32, position: u32, home: TeamRef, away: TeamRef) -> Self {
        let mut pairing = Self {
            id,
            section: Section::Table,
            round,
            position,
            slot_a: Slot::team(home),
            slot_b: Slot::team(away),
            ..Self::default()
        };
        pairing.refresh_state();
        pairing
    }

    #[must_use]
    pub fn slot(&self, side: Side) -> &Slot {
        match side {
            Side::A => &self.slot_a,
            Side::B => &self.slot_b,
        }
    }

    pub fn slot_mut(&mut self, side: Side) -> &mut Slot {
        match side {
            Side::A => &mut self.slot_a,
            Side::B => &mut self.slot_b,
        }
    }

    #[must_use]
    pub fn team(&self, side: Side) -> Option<&TeamRef> {
        self.slot(side).as_team()
    }

    /// The side `team` occupies, if any.
    #[must_use]
    pub fn side_of(&self, team: &TeamId) -> Option<Side> {
        [Side::A, Side::B]
            .into_iter()
            .find(|side| self.team(*side).is_some_and(|occupant| occupant.id == *team))
    }

    #[must_use]
    pub fn winner(&self) -> Option<&TeamId> {
        match &self.state {
            MatchState::Completed { winner } => Some(winner),
            MatchState::Pending | MatchState::Ready => None,
        }
    }

    /// The team that lost, when the match was played between two teams.
    #[must_use]
    pub fn loser(&self) -> Option<&TeamRef> {
        let winner = self.winner()?;
        let side = self.side_of(winner)?;
        self.team(side.opposite())
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.state, MatchState::Completed { .. })
    }

    /// Exactly one team and one bye.
    #[must_use]
    pub fn is_bye(&self) -> bool {
        matches!(
            (&self.slot_a, &self.slot_b),
            (Slot::Team { .. }, Slot::Bye) | (Slot::Bye, Slot::Team { .. })
        )
    }

    /// Moves `Pending` to `Ready` once both slots hold teams. A completed
    /// match is left alone.
    pub fn refresh_state(&mut self) {
        if self.is_completed() {
            return;
        }

        self.state = if self.team(Side::A).is_some() && self.team(Side::B).is_some() {
            MatchState::Ready
        } else {
            MatchState::Pending
        };
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} vs {}", self.id, self.slot_a, self.slot_b)?;

        if let Some(winner) = self.winner() {
            write!(f, " -> {winner}")?;
        }

        Ok(())
    }
}
