//! Seeded bracket building and match-by-match progression for tournaments.
//!
//! ## Formats
//!
//! * single elimination - a binary tree of matches, byes for the top seeds
//! * double elimination - a winners bracket, a losers bracket fed by its
//!   losers, and a grand final
//! * round robin and Swiss - flat lists of pairings ranked by an external
//!   standings procedure
//!
//! ## Flow
//!
//! [`builder::build`] runs once when a tournament starts. After that each
//! reported result goes through [`progression::Progression::report_result`],
//! which returns an [`progression::Outcome`] describing every write without
//! performing any. A [`store::MatchStore`] applies that outcome atomically,
//! and [`progression::Progression::record`] strings the steps together.

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

#![deny(clippy::panic)]

pub mod bracket;
pub mod builder;
pub mod format;
mod losers;
pub mod matches;
pub mod progression;
pub mod settings;
pub mod standings;
pub mod store;
pub mod team;
pub mod utils;

pub type TournamentId = u64;

pub const COPYRIGHT: &str = r".SH COPYRIGHT
Copyright (C) 2026 Developers of the tournament-bracket project

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU Affero General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU Affero General Public License for more details.

You should have received a copy of the GNU Affero General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.
";

#[cfg(test)]
mod tests {
    use super::*;
    use bracket::Bracket;
    use builder::build;
    use format::Format;
    use progression::{Progression, ReportedResult};
    use store::MatchStore;
    use team::TeamRef;

    fn teams(count: u32) -> Vec<TeamRef> {
        (1..=count)
            .map(|seed| TeamRef::new(&format!("t{seed}"), &format!("Team {seed}"), seed))
            .collect()
    }

    /// Plays every ready match with the better seed winning.
    fn play_favorites(bracket: &mut Bracket, progression: &Progression) -> anyhow::Result<()> {
        let mut standings = |_: TournamentId, _: Format| -> anyhow::Result<()> { Ok(()) };

        while let Some(game) = bracket.next_ready() {
            let (Some(a), Some(b)) = (game.slot_a.as_team(), game.slot_b.as_team()) else {
                unreachable!("a ready match has two teams");
            };
            let result = if a.seed < b.seed {
                ReportedResult::new(1, 0)
            } else {
                ReportedResult::new(0, 1)
            };

            progression.record(bracket, &mut standings, &game.id, &result)?;
        }

        Ok(())
    }

    #[test]
    fn favorites_win_single_elimination() -> anyhow::Result<()> {
        for count in [2, 3, 5, 8, 13, 32] {
            let mut bracket = build(&teams(count), Format::SingleElimination)?;
            play_favorites(&mut bracket, &Progression::new(1, Format::SingleElimination))?;

            assert_eq!(bracket.champion().map(|team| team.seed), Some(1));
            assert!(bracket.matches().all(|game| game.is_completed()));
            bracket.validate()?;
        }

        Ok(())
    }

    #[test]
    fn favorites_win_double_elimination() -> anyhow::Result<()> {
        for count in [2, 4, 6, 8, 11] {
            let mut bracket = build(&teams(count), Format::DoubleElimination)?;
            play_favorites(&mut bracket, &Progression::new(1, Format::DoubleElimination))?;

            assert_eq!(bracket.champion().map(|team| team.seed), Some(1));
            assert_eq!(
                bracket.load(&"GF".into()).and_then(|game| game.loser().map(|team| team.seed)),
                Some(2)
            );
        }

        Ok(())
    }

    #[test]
    fn snapshots_round_trip_through_ron() -> anyhow::Result<()> {
        let bracket = build(&teams(6), Format::DoubleElimination)?;
        let restored = Bracket::from_ron(&bracket.to_ron()?)?;

        assert_eq!(restored, bracket);
        for game in bracket.matches() {
            assert_eq!(restored.get(&game.id), Some(game));
        }
        assert!(restored.get(&"L2-2".into()).is_some());
        restored.validate()?;
        Ok(())
    }
}
