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

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Format {
    #[default]
    SingleElimination,
    DoubleElimination,
    RoundRobin,
    Swiss,
}

impl Format {
    /// Elimination formats form a tree of matches linked by `next`.
    #[must_use]
    pub fn is_elimination(self) -> bool {
        match self {
            Self::SingleElimination | Self::DoubleElimination => true,
            Self::RoundRobin | Self::Swiss => false,
        }
    }

    /// Table formats rank teams by standings instead of a tree.
    #[must_use]
    pub fn uses_standings(self) -> bool {
        !self.is_elimination()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleElimination => write!(f, "single_elimination"),
            Self::DoubleElimination => write!(f, "double_elimination"),
            Self::RoundRobin => write!(f, "round_robin"),
            Self::Swiss => write!(f, "swiss"),
        }
    }
}

impl FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.to_lowercase().replace('-', "_").as_str() {
            "single" | "single_elimination" => Ok(Self::SingleElimination),
            "double" | "double_elimination" => Ok(Self::DoubleElimination),
            "round_robin" => Ok(Self::RoundRobin),
            "swiss" => Ok(Self::Swiss),
            _ => Err(anyhow::Error::msg(format!(
                "Error trying to convert '{value}' to a Format!"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::Format;

    #[test]
    fn parse_formats() -> anyhow::Result<()> {
        assert_eq!(Format::from_str("single")?, Format::SingleElimination);
        assert_eq!(
            Format::from_str("Double-Elimination")?,
            Format::DoubleElimination
        );
        assert_eq!(Format::from_str("round_robin")?, Format::RoundRobin);
        assert_eq!(Format::from_str("swiss")?, Format::Swiss);

        let format = Format::Swiss;
        assert_eq!(Format::from_str(&format.to_string())?, format);

        Ok(())
    }

    #[test]
    fn parse_unknown_format() {
        let error = Format::from_str("ladder").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Error trying to convert 'ladder' to a Format!"
        );
    }

    #[test]
    fn table_formats_use_standings() {
        assert!(Format::RoundRobin.uses_standings());
        assert!(Format::Swiss.uses_standings());
        assert!(!Format::DoubleElimination.uses_standings());
    }
}
