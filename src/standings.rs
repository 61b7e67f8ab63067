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

use crate::{TournamentId, format::Format};

/// The external procedure that rebuilds a round robin or Swiss table from
/// every completed match. Running it twice on the same matches must give the
/// same table.
pub trait StandingsProcedure {
    /// # Errors
    ///
    /// If the table could not be rebuilt.
    fn recompute(&mut self, tournament_id: TournamentId, format: Format) -> anyhow::Result<()>;
}

impl<F> StandingsProcedure for F
where
    F: FnMut(TournamentId, Format) -> anyhow::Result<()>,
{
    fn recompute(&mut self, tournament_id: TournamentId, format: Format) -> anyhow::Result<()> {
        self(tournament_id, format)
    }
}
