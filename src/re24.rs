use crate::bases::BaseOutState;
use crate::inning::simulate;
use crate::matrix::RunExpectancyMatrix;
use crate::outcome::{Outcome, Vocabulary};
use crate::play::{innings, Play, PlayerId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayValue {
    pub inning_id: String,
    pub sequence: u32,
    pub batter: PlayerId,
    pub pitcher: PlayerId,
    pub outcome: Option<Outcome>,
    pub plate_appearance: bool,
    pub runs_on_play: u8,
    pub re24: f64,
}

// the inning's last play, or any play ending it, leaves no further expectancy
pub fn run_value(
    before: &BaseOutState,
    after: &BaseOutState,
    runs: u8,
    final_play: bool,
    matrix: &RunExpectancyMatrix,
) -> f64 {
    let re_before = matrix.lookup(before);
    let re_after = if final_play || after.is_over() {
        0.0
    } else {
        matrix.lookup(after)
    };
    re_after - re_before + f64::from(runs)
}

pub fn value_inning(
    plays: &[Play],
    vocabulary: Vocabulary,
    matrix: &RunExpectancyMatrix,
) -> Vec<PlayValue> {
    let results = simulate(plays, vocabulary);
    let last = results.len().saturating_sub(1);
    plays
        .iter()
        .zip(&results)
        .enumerate()
        .map(|(i, (play, result))| {
            let outcome = result.outcome.clone().ok().flatten();
            PlayValue {
                inning_id: play.inning_id.clone(),
                sequence: play.sequence,
                batter: play.batter,
                pitcher: play.pitcher,
                outcome,
                plate_appearance: outcome.map_or(false, Outcome::is_plate_appearance),
                runs_on_play: result.runs(),
                re24: run_value(&result.before, &result.after, result.runs(), i == last, matrix),
            }
        })
        .collect()
}

pub fn value_season(
    plays: &[Play],
    vocabulary: Vocabulary,
    matrix: &RunExpectancyMatrix,
) -> Vec<PlayValue> {
    innings(plays)
        .flat_map(|inning| value_inning(inning, vocabulary, matrix))
        .collect()
}
