use crate::inning::{simulate, SimulatedPlay};
use crate::outcome::Vocabulary;
use crate::play::{innings, Play, Season};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// How well a season's replayed runs agree with the runs the game logs recorded.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunAudit {
    innings: u32,
    matching: u32,
    absolute_error: u64,
    unrecognized: BTreeMap<String, u32>,
}

impl RunAudit {
    pub fn build(plays: &[Play], vocabulary: Vocabulary) -> RunAudit {
        let mut audit = RunAudit::default();
        for inning in innings(plays) {
            audit.record(inning, &simulate(inning, vocabulary));
        }
        audit
    }

    pub fn record(&mut self, inning: &[Play], results: &[SimulatedPlay]) {
        let simulated: u32 = results.iter().map(|r| u32::from(r.runs())).sum();
        let recorded: u32 = inning.iter().map(|play| u32::from(play.runs)).sum();
        self.innings += 1;
        if simulated == recorded {
            self.matching += 1;
        } else {
            debug!(
                inning = inning.first().map_or("", |play| play.inning_id.as_str()),
                simulated, recorded, "run mismatch"
            );
            self.absolute_error += u64::from(simulated.max(recorded) - simulated.min(recorded));
        }

        for result in results {
            if let Err(code) = &result.outcome {
                *self.unrecognized.entry(code.clone()).or_default() += 1;
            }
        }
    }

    pub fn matching_share(&self) -> f64 {
        if self.innings == 0 {
            1.0
        } else {
            f64::from(self.matching) / f64::from(self.innings)
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn mean_absolute_error(&self) -> f64 {
        if self.innings == 0 {
            0.0
        } else {
            self.absolute_error as f64 / f64::from(self.innings)
        }
    }

    pub fn report(&self, season: Season) {
        info!(%season, "{}", self);
        for (code, count) in &self.unrecognized {
            warn!(%season, code = %code, count, "unrecognized result code treated as a no-op");
        }
    }
}

impl fmt::Display for RunAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "innings: {}, matching: {:.3}, mean abs error: {:.3}",
            self.innings,
            self.matching_share(),
            self.mean_absolute_error()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RunAudit;
    use crate::inning::simulate;
    use crate::outcome::Vocabulary;
    use crate::play::{innings, Play};
    use assert_approx_eq::assert_approx_eq;
    use maplit::btreemap;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_audit() {
        let mut plays = Play::inning("a", &[("HR", 0, 0), ("K", 0, 0), ("K", 0, 1), ("K", 0, 2)]);
        plays[0].runs = 1;
        let mut second = Play::inning(
            "b",
            &[("1B", 0, 0), ("E6", 1, 0), ("HR", 1, 0), ("E6", 0, 0), ("XYZ", 0, 0)],
        );
        // the log credits the error with a run we can't see
        second[1].runs = 1;
        second[2].runs = 2;
        plays.extend(second);

        let audit = RunAudit::build(&plays, Vocabulary::Modern);
        assert_approx_eq!(audit.matching_share(), 0.5);
        assert_approx_eq!(audit.mean_absolute_error(), 0.5);
        assert_eq!(
            audit.unrecognized,
            btreemap! {
                "E6".to_string() => 2,
                "XYZ".to_string() => 1,
            }
        );
        assert_eq!(
            audit.to_string(),
            "innings: 2, matching: 0.500, mean abs error: 0.500"
        );
    }

    #[test]
    fn test_empty() {
        let audit = RunAudit::build(&[], Vocabulary::Legacy);
        assert_approx_eq!(audit.matching_share(), 1.0);
        assert_approx_eq!(audit.mean_absolute_error(), 0.0);
    }

    #[test]
    fn test_runs_conserved() {
        // logs whose Run column came from the same rules always reconcile
        let mut rng = StdRng::seed_from_u64(8);
        let mut plays = Vec::new();
        for i in 0..200 {
            let mut inning = Play::random_inning(&mut rng, &i.to_string());
            let results = simulate(&inning, Vocabulary::Modern);
            for (play, result) in inning.iter_mut().zip(&results) {
                play.runs = result.runs();
            }
            plays.extend(inning);
        }
        assert_eq!(innings(&plays).count(), 200);
        let audit = RunAudit::build(&plays, Vocabulary::Modern);
        assert_approx_eq!(audit.matching_share(), 1.0);
        assert!(audit.unrecognized.is_empty());
    }

    #[test]
    fn test_recorded_runs_reconcile() {
        // runs as the box score had them
        let mut plays = Play::inning(
            "a",
            &[
                ("1B", 0, 0),
                ("BB", 0b001, 0),
                ("2B", 0b011, 0),
                ("FO", 0b110, 0),
                ("HR", 0b010, 1),
                ("K", 0, 1),
                ("PO", 0, 2),
            ],
        );
        plays[2].runs = 1;
        plays[3].runs = 1;
        plays[4].runs = 2;
        let mut loaded = Play::inning(
            "b",
            &[
                ("BB", 0, 0),
                ("BB", 0b001, 0),
                ("BB", 0b011, 0),
                ("BB", 0b111, 0),
                ("DP", 0b111, 0),
                ("K", 0b100, 2),
            ],
        );
        loaded[3].runs = 1;
        loaded[4].runs = 1;
        plays.extend(loaded);

        for inning in innings(&plays) {
            let scored: Vec<u8> = simulate(inning, Vocabulary::Modern)
                .iter()
                .map(|result| result.runs())
                .collect();
            let recorded: Vec<u8> = inning.iter().map(|play| play.runs).collect();
            assert_eq!(scored, recorded);
        }
        let audit = RunAudit::build(&plays, Vocabulary::Modern);
        assert_eq!(audit.innings, 2);
        assert_approx_eq!(audit.matching_share(), 1.0);
        assert_approx_eq!(audit.mean_absolute_error(), 0.0);
    }
}

