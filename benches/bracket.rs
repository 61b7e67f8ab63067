#[cfg(feature = "bench")]
use std::{hint::black_box, time::Duration};

#[cfg(feature = "bench")]
use criterion::{Criterion, criterion_group, criterion_main};

#[cfg(feature = "bench")]
use tournament_bracket::{
    TournamentId,
    builder::build,
    format::Format,
    progression::{Progression, ReportedResult},
    team::TeamRef,
};

#[cfg(feature = "bench")]
fn teams(count: u32) -> Vec<TeamRef> {
    (1..=count)
        .map(|seed| TeamRef::new(&format!("t{seed}"), "", seed))
        .collect()
}

#[cfg(feature = "bench")]
fn build_brackets(c: &mut Criterion) {
    let teams = teams(200);
    c.bench_function("build_double_elimination_200", move |b| {
        b.iter(|| build(black_box(&teams), Format::DoubleElimination).unwrap());
    });
}

#[cfg(feature = "bench")]
fn play_outs(c: &mut Criterion) {
    let bracket = build(&teams(64), Format::DoubleElimination).unwrap();
    let progression = Progression::new(1, Format::DoubleElimination);
    let mut standings = |_: TournamentId, _: Format| -> anyhow::Result<()> { Ok(()) };

    c.bench_function("play_out_double_elimination_64", move |b| {
        b.iter(|| {
            let mut bracket = bracket.clone();
            while let Some(game) = bracket.next_ready() {
                progression
                    .record(&mut bracket, &mut standings, &game.id, &ReportedResult::new(1, 0))
                    .unwrap();
            }
            bracket
        });
    });
}

#[cfg(feature = "bench")]
criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = build_brackets, play_outs
}

#[cfg(feature = "bench")]
criterion_main!(benches);

#[cfg(not(feature = "bench"))]
fn main() {
    eprintln!("You must enable pass `--features=bench`");
}
