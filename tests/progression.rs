use std::{
    sync::{Arc, Mutex},
    thread,
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use rustc_hash::FxHashMap;

use tournament_bracket::{
    TournamentId,
    bracket::Bracket,
    builder::{Placement, build, build_with},
    format::Format,
    matches::{Match, MatchId, Section, Side},
    progression::{LoserRouting, Progression, ProgressionError, RecordError, ReportedResult},
    store::{Fixtures, MatchStore, StoreError},
    team::{TeamId, TeamRef},
};

fn teams(count: u32) -> Vec<TeamRef> {
    (1..=count)
        .map(|seed| TeamRef::new(&format!("t{seed}"), "", seed))
        .collect()
}

fn no_standings(_: TournamentId, _: Format) -> anyhow::Result<()> {
    Ok(())
}

/// Plays every ready match out, picking winners with `pick`, and returns the
/// matches played in order.
fn play_out<F>(
    bracket: &mut Bracket,
    progression: &Progression,
    mut pick: F,
) -> anyhow::Result<Vec<MatchId>>
where
    F: FnMut(&Match) -> Side,
{
    let mut played = Vec::new();

    while let Some(game) = bracket.next_ready() {
        let result = match pick(&game) {
            Side::A => ReportedResult::new(2, 1),
            Side::B => ReportedResult::new(1, 2),
        };
        progression.record(bracket, &mut no_standings, &game.id, &result)?;
        played.push(game.id);
    }

    Ok(played)
}

/// Like [`play_out`], but reports a random ready match each step and picks
/// winners at random, so losers drop in whatever order results arrive.
fn play_out_any_order(
    bracket: &mut Bracket,
    progression: &Progression,
    rng: &mut StdRng,
) -> anyhow::Result<usize> {
    let mut played = 0;

    loop {
        let ready: Vec<Match> = bracket.ready().cloned().collect();
        if ready.is_empty() {
            return Ok(played);
        }

        let game = &ready[rng.random_range(0..ready.len())];
        let result = if rng.random_bool(0.5) {
            ReportedResult::new(2, 1)
        } else {
            ReportedResult::new(1, 2)
        };
        progression.record(bracket, &mut no_standings, &game.id, &result)?;
        played += 1;
    }
}

/// Every team but the champion goes out on its second loss, except the
/// winners bracket champion, which goes out on its first if it loses the
/// grand final. The champion has lost once only if it came from the losers
/// bracket.
fn assert_double_elimination_losses(bracket: &Bracket, teams: &[TeamRef], case: &str) {
    let mut losses: FxHashMap<&TeamId, u32> = FxHashMap::default();
    for game in bracket.matches() {
        if let Some(loser) = game.loser() {
            *losses.entry(&loser.id).or_default() += 1;
        }
    }

    let grand_final = bracket.grand_final.as_ref().expect("a grand final");
    let winners_champion = grand_final.team(Side::A).map(|team| &team.id);
    let champion = grand_final.winner().expect("the grand final is played");

    for team in teams {
        let lost = losses.get(&team.id).copied().unwrap_or_default();
        let expected = match (&team.id == champion, Some(&team.id) == winners_champion) {
            (true, true) => 0,
            (true, false) | (false, true) => 1,
            (false, false) => 2,
        };

        assert_eq!(lost, expected, "{case}: {} lost {lost} times", team.id);
    }
}

fn better_seed(game: &Match) -> Side {
    match (game.team(Side::A), game.team(Side::B)) {
        (Some(a), Some(b)) if b.seed < a.seed => Side::B,
        _ => Side::A,
    }
}

#[test]
fn eight_favorites() -> anyhow::Result<()> {
    let mut bracket = build(&teams(8), Format::SingleElimination)?;
    let played = play_out(
        &mut bracket,
        &Progression::new(1, Format::SingleElimination),
        better_seed,
    )?;

    assert_eq!(played.len(), 7);
    assert_eq!(bracket.champion().map(|team| team.seed), Some(1));
    assert!(bracket.is_finished());
    Ok(())
}

#[test]
fn winners_land_by_position_parity() -> anyhow::Result<()> {
    for count in [3, 7, 8, 12, 17] {
        for placement in [Placement::Fold, Placement::Separated] {
            let mut bracket = build_with(&teams(count), Format::SingleElimination, placement)?;
            let mut rng = StdRng::seed_from_u64(u64::from(count));
            play_out(
                &mut bracket,
                &Progression::new(1, Format::SingleElimination),
                |_| if rng.random_bool(0.5) { Side::A } else { Side::B },
            )?;

            for game in bracket.matches() {
                let (Some(next), Some(winner)) = (&game.next, game.winner()) else {
                    continue;
                };
                let side = if game.position % 2 == 1 { Side::A } else { Side::B };
                let target = bracket.get(&next.match_id).expect("linked matches exist");

                assert_eq!(target.team(side).map(|team| &team.id), Some(winner));
            }
        }
    }

    Ok(())
}

#[test]
fn reporting_twice_is_refused() -> anyhow::Result<()> {
    let mut bracket = build(&teams(4), Format::SingleElimination)?;
    let progression = Progression::new(1, Format::SingleElimination);
    let id = MatchId::from("W1-1");

    progression.record(&mut bracket, &mut no_standings, &id, &ReportedResult::new(3, 0))?;
    let error = progression
        .record(&mut bracket, &mut no_standings, &id, &ReportedResult::new(0, 3))
        .expect_err("the match is completed");

    assert!(matches!(
        error,
        RecordError::Progression(ProgressionError::AlreadyCompleted(_))
    ));
    assert_eq!(
        bracket.get(&id).and_then(Match::winner),
        Some(&TeamId::from("t1"))
    );
    Ok(())
}

#[test]
fn double_elimination_play_outs() -> anyhow::Result<()> {
    for count in 2..=20 {
        for routing in [LoserRouting::Template, LoserRouting::FirstOpenSlot] {
            let field = teams(count);
            let mut bracket = build(&field, Format::DoubleElimination)?;
            let progression =
                Progression::new(1, Format::DoubleElimination).with_loser_routing(routing);
            let mut rng = StdRng::seed_from_u64(u64::from(count) * 31);

            let played = play_out(&mut bracket, &progression, |_| {
                if rng.random_bool(0.5) { Side::A } else { Side::B }
            })?;

            let case = format!("{count} teams, {routing}");
            assert_eq!(played.len(), usize::try_from(2 * count - 2)?, "{case}");
            assert!(bracket.champion().is_some(), "{case}");
            assert_double_elimination_losses(&bracket, &field, &case);
        }
    }

    Ok(())
}

#[test]
fn double_elimination_results_in_any_order() -> anyhow::Result<()> {
    for count in 2..=24 {
        for routing in [LoserRouting::Template, LoserRouting::FirstOpenSlot] {
            for placement in [Placement::Fold, Placement::Separated] {
                for run in 0..8 {
                    let field = teams(count);
                    let mut bracket = build_with(&field, Format::DoubleElimination, placement)?;
                    let progression = Progression::new(1, Format::DoubleElimination)
                        .with_loser_routing(routing);
                    let mut rng = StdRng::seed_from_u64(u64::from(count) * 1000 + run);

                    let played = play_out_any_order(&mut bracket, &progression, &mut rng)?;

                    let case = format!("{count} teams, {routing}, {placement}, run {run}");
                    assert_eq!(played, usize::try_from(2 * count - 2)?, "{case}");
                    assert!(bracket.is_finished(), "{case}");
                    assert_double_elimination_losses(&bracket, &field, &case);
                    bracket.validate()?;
                }
            }
        }
    }

    Ok(())
}

#[test]
fn every_winners_loser_drops_down() -> anyhow::Result<()> {
    let mut bracket = build(&teams(8), Format::DoubleElimination)?;
    play_out(
        &mut bracket,
        &Progression::new(1, Format::DoubleElimination),
        better_seed,
    )?;

    for game in bracket.matches().filter(|game| game.section == Section::Winners) {
        let loser = game.loser().expect("every winners match is played");
        let dropped = bracket
            .matches()
            .filter(|other| matches!(other.section, Section::Losers | Section::GrandFinal))
            .filter(|other| other.side_of(&loser.id).is_some())
            .count();

        assert!(dropped >= 1, "{} never reached the losers bracket", loser.id);
    }

    Ok(())
}

#[test]
fn concurrent_reports_complete_a_match_once() -> anyhow::Result<()> {
    let bracket = Arc::new(Mutex::new(build(&teams(4), Format::SingleElimination)?));
    let progression = Progression::new(1, Format::SingleElimination);

    let handles: Vec<_> = [ReportedResult::new(1, 0), ReportedResult::new(0, 1)]
        .into_iter()
        .map(|result| {
            let bracket = Arc::clone(&bracket);
            let progression = progression.clone();
            thread::spawn(move || {
                let mut bracket = bracket.lock().expect("the lock isn't poisoned");
                progression
                    .record(&mut *bracket, &mut no_standings, &"W1-1".into(), &result)
                    .is_ok()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|handle| handle.join().expect("the thread doesn't panic"))
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1);

    let bracket = bracket.lock().expect("the lock isn't poisoned");
    let winner = bracket.get(&"W1-1".into()).and_then(Match::winner).cloned();
    let final_slot = bracket.get(&"W2-1".into()).and_then(|game| game.team(Side::A));
    assert_eq!(final_slot.map(|team| team.id.clone()), winner);
    Ok(())
}

#[test]
fn stale_outcomes_conflict_on_commit() -> anyhow::Result<()> {
    let mut bracket = build(&teams(4), Format::SingleElimination)?;
    let progression = Progression::new(1, Format::SingleElimination);
    let id = MatchId::from("W1-2");

    // Both decided against the same snapshot, as two servers would.
    let first = progression.report_result_in(&bracket, &id, &ReportedResult::new(1, 0))?;
    let second = progression.report_result_in(&bracket, &id, &ReportedResult::new(0, 1))?;

    bracket.commit(&first)?;
    assert_eq!(bracket.commit(&second), Err(StoreError::Conflict(id.clone())));

    let game = bracket.load(&"W2-1".into()).expect("the final exists");
    assert_eq!(game.team(Side::B).map(|team| team.id.clone()), Some(first.winner));
    Ok(())
}

#[test]
fn round_robin_results_drive_standings() -> anyhow::Result<()> {
    let [red, blue, green] = [
        TeamRef::new("red", "Red", 1),
        TeamRef::new("blue", "Blue", 2),
        TeamRef::new("green", "Green", 3),
    ];
    let pairings = vec![
        Match::pairing("T1-1".into(), 1, 1, red.clone(), blue.clone()),
        Match::pairing("T2-1".into(), 2, 1, blue.clone(), green.clone()),
        Match::pairing("T3-1".into(), 3, 1, green, red),
    ];
    let mut fixtures = Fixtures::new(9, Format::RoundRobin, pairings)?;
    let progression = Progression::new(9, Format::RoundRobin);

    let mut calls = Vec::new();
    let mut standings = |tournament_id: TournamentId, format: Format| -> anyhow::Result<()> {
        calls.push((tournament_id, format));
        Ok(())
    };

    let results = [
        ("T1-1", ReportedResult::new(0, 1)),
        ("T2-1", ReportedResult::new(1, 1).with_winner(blue.id.clone())),
        ("T3-1", ReportedResult::new(2, 0)),
    ];
    for (id, result) in results {
        let outcome = progression.record(&mut fixtures, &mut standings, &id.into(), &result)?;

        assert!(outcome.placements().next().is_none());
        assert!(outcome.champion().is_none());
    }

    let winners: Vec<_> = fixtures
        .completed()
        .filter_map(|game| game.winner().map(|team| team.to_string()))
        .collect();
    assert_eq!(winners, ["blue", "blue", "green"]);
    assert_eq!(calls, vec![(9, Format::RoundRobin); 3]);
    assert_eq!(fixtures.completed().count(), 3);
    Ok(())
}
