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

use std::{io::Write, path::PathBuf};

use clap::{self, CommandFactory, Parser, ValueEnum};
use log::info;
use rand::Rng;

use tournament_bracket::{
    COPYRIGHT, TournamentId,
    bracket::Bracket,
    builder::{Placement, build_with},
    format::Format,
    progression::{LoserRouting, ReportedResult},
    settings::{Settings, load_teams},
    utils::init_logger,
};

/// A Tournament Bracket Builder
///
/// Builds a seeded single or double elimination bracket from a RON list of
/// teams, optionally plays it out, and prints it.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// A RON list of teams: [(id: "red", display_name: "Red", seed: 1), ...]
    #[arg(index = 1, value_name = "teams")]
    teams: Option<PathBuf>,

    /// Read the tournament settings from a RON file
    #[arg(long, value_name = "file")]
    settings: Option<PathBuf>,

    /// Override the format from the settings
    #[arg(long)]
    format: Option<Format>,

    /// Override the round one placement from the settings: fold or separated
    #[arg(long)]
    placement: Option<Placement>,

    /// Override the loser routing from the settings: template or
    /// first_open_slot
    #[arg(long)]
    loser_routing: Option<LoserRouting>,

    /// Play every match out
    #[arg(long, value_enum)]
    simulate: Option<Simulate>,

    /// Write the final bracket to a RON file
    #[arg(long, value_name = "file")]
    save: Option<PathBuf>,

    /// Whether the application is being run by systemd
    #[arg(long)]
    systemd: bool,

    /// Log more, may be repeated
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Build the manpage
    #[arg(long)]
    man: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Simulate {
    /// The better seed always wins
    Favorites,
    /// Random scores, ties are replayed
    Random,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.man {
        let mut buffer: Vec<u8> = Vec::default();
        let cmd = Args::command().name("bracket").long_version(None);
        let man = clap_mangen::Man::new(cmd).date("2026-10-15");

        man.render(&mut buffer)?;
        write!(buffer, "{COPYRIGHT}")?;

        std::fs::write("bracket.1", buffer)?;
        return Ok(());
    }

    init_logger(args.systemd, args.verbose);

    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(format) = args.format {
        settings.format = format;
    }
    if let Some(placement) = args.placement {
        settings.placement = placement;
    }
    if let Some(loser_routing) = args.loser_routing {
        settings.loser_routing = loser_routing;
    }

    let Some(teams_path) = &args.teams else {
        return Err(anyhow::Error::msg("a teams file is required"));
    };
    let teams = load_teams(teams_path)?;
    let mut bracket = build_with(&teams, settings.format, settings.placement)?;
    info!(
        "tournament {}: {} teams in a {} bracket",
        settings.tournament_id,
        teams.len(),
        settings.format
    );

    if let Some(simulate) = args.simulate {
        play(&mut bracket, &settings, simulate)?;
    }

    println!("{bracket}");
    if let Some(champion) = bracket.champion() {
        println!("champion: {champion}");
    }

    if let Some(path) = &args.save {
        std::fs::write(path, bracket.to_ron()?)?;
        info!("saved the bracket to {}", path.display());
    }

    Ok(())
}

fn play(bracket: &mut Bracket, settings: &Settings, simulate: Simulate) -> anyhow::Result<()> {
    let progression = settings.progression();
    let mut rng = rand::rng();
    let mut standings = |tournament_id: TournamentId, format: Format| -> anyhow::Result<()> {
        info!("tournament {tournament_id}: {format} standings need recomputing");
        Ok(())
    };

    while let Some(game) = bracket.next_ready() {
        let (Some(a), Some(b)) = (game.slot_a.as_team(), game.slot_b.as_team()) else {
            break;
        };

        let result = match simulate {
            Simulate::Favorites => {
                if a.seed < b.seed {
                    ReportedResult::new(1, 0)
                } else {
                    ReportedResult::new(0, 1)
                }
            }
            Simulate::Random => loop {
                let score_a = rng.random_range(0..=5);
                let score_b = rng.random_range(0..=5);
                if score_a != score_b {
                    break ReportedResult::new(score_a, score_b);
                }
            },
        };

        let outcome = progression.record(bracket, &mut standings, &game.id, &result)?;
        info!("{}: {a} {}-{} {b}", game.id, outcome.score_a, outcome.score_b);
    }

    Ok(())
}
