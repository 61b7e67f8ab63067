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

use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    TournamentId,
    builder::Placement,
    format::Format,
    progression::{LoserRouting, Progression},
    team::TeamRef,
};

/// Per tournament settings, stored as RON.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub tournament_id: TournamentId,
    #[serde(default)]
    pub format: Format,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default)]
    pub loser_routing: LoserRouting,
}

impl Settings {
    /// # Errors
    ///
    /// If the string isn't valid RON for `Settings`.
    pub fn from_ron(string: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(string)?)
    }

    /// # Errors
    ///
    /// If the file can't be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let string = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_ron(&string).with_context(|| format!("parsing {}", path.display()))
    }

    #[must_use]
    pub fn progression(&self) -> Progression {
        Progression::new(self.tournament_id, self.format).with_loser_routing(self.loser_routing)
    }
}

/// Reads a RON list of teams.
///
/// # Errors
///
/// If the file can't be read or parsed.
pub fn load_teams(path: &Path) -> anyhow::Result<Vec<TeamRef>> {
    let string = fs::read_to_string(path)
        .with_context(|| format!("reading teams from {}", path.display()))?;
    ron::from_str(&string).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() -> anyhow::Result<()> {
        let settings = Settings::from_ron("(tournament_id: 12)")?;

        assert_eq!(settings.tournament_id, 12);
        assert_eq!(settings.format, Format::SingleElimination);
        assert_eq!(settings.placement, Placement::Fold);
        assert_eq!(settings.loser_routing, LoserRouting::Template);
        Ok(())
    }

    #[test]
    fn full_settings() -> anyhow::Result<()> {
        let settings = Settings::from_ron(
            "(
                tournament_id: 3,
                format: DoubleElimination,
                placement: Separated,
                loser_routing: FirstOpenSlot,
            )",
        )?;

        let progression = settings.progression();
        assert_eq!(progression.tournament_id, 3);
        assert_eq!(progression.format, Format::DoubleElimination);
        assert_eq!(progression.loser_routing, LoserRouting::FirstOpenSlot);
        Ok(())
    }

    #[test]
    fn teams_parse_from_ron() -> anyhow::Result<()> {
        let teams: Vec<TeamRef> = ron::from_str(
            r#"[
                (id: "red", display_name: "Red", seed: 1),
                (id: "blue", seed: 2),
            ]"#,
        )?;

        assert_eq!(teams.len(), 2);
        assert_eq!(teams[1].name(), "blue");
        Ok(())
    }

    #[test]
    fn bad_settings_are_an_error() {
        assert!(Settings::from_ron("(format: Knockout)").is_err());
    }
}
