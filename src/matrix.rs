use crate::bases::{BaseOutState, Bases};
use crate::inning::simulate;
use crate::outcome::Vocabulary;
use crate::play::{innings, Play, Season};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Mean runs scored in the rest of a half-inning, by occupancy code (0-7) and outs (0-2).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunExpectancyMatrix {
    values: [[f64; 3]; 8],
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MatrixRow {
    #[serde(rename = "OBC")]
    pub occupancy: u8,
    #[serde(rename = "Outs")]
    pub outs: u8,
    #[serde(rename = "RunExpectancy")]
    pub run_expectancy: f64,
}

impl RunExpectancyMatrix {
    // zero past the third out or for a state never observed
    pub fn get(&self, occupancy: u8, outs: u8) -> f64 {
        if outs >= 3 {
            return 0.0;
        }
        self.values[usize::from(occupancy & 0b111)][usize::from(outs)]
    }

    pub fn lookup<T: Copy>(&self, state: &BaseOutState<T>) -> f64 {
        self.get(state.occupancy(), state.outs)
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().flatten().all(|x| *x == 0.0)
    }

    // opening states count every run the inning scored, later states the runs still to come
    pub fn build(plays: &[Play], vocabulary: Vocabulary) -> RunExpectancyMatrix {
        let mut observations = Observations::default();
        for inning in innings(plays) {
            let results = simulate(inning, vocabulary);
            let total: u32 = results.iter().map(|r| u32::from(r.runs())).sum();
            if let Some(first) = results.first() {
                observations.record(&first.before, total);
            }
            let mut scored = 0;
            for result in &results {
                scored += u32::from(result.runs());
                if !result.after.is_over() {
                    observations.record(&result.after, total - scored);
                }
            }
        }
        observations.finish()
    }

    pub fn from_rows<I: IntoIterator<Item = MatrixRow>>(rows: I) -> RunExpectancyMatrix {
        let mut matrix = RunExpectancyMatrix::default();
        for row in rows {
            if row.outs < 3 && row.run_expectancy.is_finite() {
                matrix.values[usize::from(row.occupancy & 0b111)][usize::from(row.outs)] =
                    row.run_expectancy.max(0.0);
            }
        }
        matrix
    }

    pub fn rows(&self) -> Vec<MatrixRow> {
        (0..3)
            .flat_map(|outs| {
                (0..8).map(move |occupancy| MatrixRow {
                    occupancy,
                    outs,
                    run_expectancy: self.get(occupancy, outs),
                })
            })
            .collect()
    }
}

impl fmt::Display for RunExpectancyMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Outs")?;
        for occupancy in 0..8 {
            write!(f, " {:>6}", format!("{:?}", Bases::from_occupancy(occupancy, ())))?;
        }
        writeln!(f)?;
        for outs in 0..3 {
            write!(f, "{:>4}", outs)?;
            for occupancy in 0..8 {
                write!(f, " {:>6.3}", self.get(occupancy, outs))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Observations {
    runs: [[u64; 3]; 8],
    count: [[u32; 3]; 8],
}

impl Observations {
    fn record(&mut self, state: &BaseOutState, runs: u32) {
        let (occupancy, outs) = (usize::from(state.occupancy()), usize::from(state.outs));
        if outs < 3 {
            self.runs[occupancy][outs] += u64::from(runs);
            self.count[occupancy][outs] += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(&self) -> RunExpectancyMatrix {
        let mut matrix = RunExpectancyMatrix::default();
        for occupancy in 0..8 {
            for outs in 0..3 {
                let count = self.count[occupancy][outs];
                if count > 0 {
                    matrix.values[occupancy][outs] =
                        self.runs[occupancy][outs] as f64 / f64::from(count);
                }
            }
        }
        matrix
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

#[derive(Debug, Clone)]
pub struct MatrixStore {
    dir: PathBuf,
}

impl MatrixStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> MatrixStore {
        MatrixStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, season: Season) -> PathBuf {
        self.dir.join(format!("re_matrix_{}.csv", season))
    }

    pub fn load(&self, season: Season) -> Result<RunExpectancyMatrix> {
        let path = self.path(season);
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let rows = reader
            .deserialize()
            .collect::<std::result::Result<Vec<MatrixRow>, _>>()
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(RunExpectancyMatrix::from_rows(rows))
    }

    pub fn save(&self, season: Season, matrix: &RunExpectancyMatrix) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(season);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        for row in matrix.rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    // the current season may still be in progress and is always rebuilt
    #[instrument(skip(self, plays, vocabulary))]
    pub fn load_or_build(
        &self,
        season: Season,
        plays: &[Play],
        vocabulary: Vocabulary,
        current: bool,
    ) -> RunExpectancyMatrix {
        if !current && self.path(season).exists() {
            match self.load(season) {
                Ok(matrix) => {
                    debug!("loaded cached run expectancy matrix");
                    return matrix;
                }
                Err(err) => warn!("rebuilding run expectancy matrix: {:#}", err),
            }
        }

        let matrix = RunExpectancyMatrix::build(plays, vocabulary);
        if let Err(err) = self.save(season, &matrix) {
            warn!("unable to persist run expectancy matrix: {:#}", err);
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::{MatrixRow, MatrixStore, RunExpectancyMatrix};
    use crate::outcome::Vocabulary;
    use crate::play::{Play, Season};
    use assert_approx_eq::assert_approx_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_build() {
        let mut plays = Play::inning("a", &[("HR", 0, 0), ("K", 0, 0), ("K", 0, 1), ("K", 0, 2)]);
        plays.extend(Play::inning(
            "b",
            &[("1B", 0, 0), ("K", 1, 0), ("HR", 1, 1), ("PO", 0, 1), ("PO", 0, 2)],
        ));
        let matrix = RunExpectancyMatrix::build(&plays, Vocabulary::Modern);

        // (---, 0 outs): opening of a (1 run), after the home run in a (0), opening of b (2)
        assert_approx_eq!(matrix.get(0, 0), 1.0);
        // (1--, 0 outs): after b's single
        assert_approx_eq!(matrix.get(0b001, 0), 2.0);
        // (1--, 1 out): after b's strikeout
        assert_approx_eq!(matrix.get(0b001, 1), 2.0);
        // (---, 1 out): a after K (0), b after HR (0)
        assert_approx_eq!(matrix.get(0, 1), 0.0);
        // never seen
        assert_approx_eq!(matrix.get(0b111, 0), 0.0);
        assert_approx_eq!(matrix.get(0, 3), 0.0);
    }

    #[test]
    fn test_build_synthetic_season() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut plays = Vec::new();
        for i in 0..2000 {
            plays.extend(Play::random_inning(&mut rng, &i.to_string()));
        }
        let matrix = RunExpectancyMatrix::build(&plays, Vocabulary::Modern);
        assert!(matrix.rows().iter().all(|row| row.run_expectancy >= 0.0));
        assert!(matrix.get(0, 0) > matrix.get(0, 1));
        assert!(matrix.get(0, 1) > matrix.get(0, 2));
        assert!(matrix.get(0b001, 0) > matrix.get(0, 2));
        assert!(matrix.get(0, 2) <= matrix.get(0b111, 0));
    }

    #[test]
    fn test_rows_round_trip() {
        let rows = vec![
            MatrixRow {
                occupancy: 0,
                outs: 0,
                run_expectancy: 0.5,
            },
            MatrixRow {
                occupancy: 7,
                outs: 2,
                run_expectancy: 0.8,
            },
        ];
        let matrix = RunExpectancyMatrix::from_rows(rows);
        let all = matrix.rows();
        assert_eq!(all.len(), 24);
        assert_eq!(RunExpectancyMatrix::from_rows(all), matrix);
        assert_approx_eq!(matrix.get(7, 2), 0.8);
    }

    #[test]
    fn test_display() {
        let matrix = RunExpectancyMatrix::from_rows(vec![MatrixRow {
            occupancy: 0b011,
            outs: 1,
            run_expectancy: 1.25,
        }]);
        let table = matrix.to_string();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Outs"));
        assert!(lines[0].contains("12-"));
        assert!(lines[2].contains("1.250"));
    }

    #[test]
    fn test_store() {
        let dir = std::env::temp_dir().join(format!("run-expectancy-test-{}", std::process::id()));
        let store = MatrixStore::new(&dir);
        let season = Season(1);

        let plays = Play::inning("a", &[("HR", 0, 0), ("K", 0, 0), ("K", 0, 1), ("K", 0, 2)]);
        let built = store.load_or_build(season, &plays, Vocabulary::Modern, false);
        assert_eq!(store.load(season).unwrap(), built);

        // a cached past season is read back rather than rebuilt
        let other = Play::inning("b", &[("K", 0, 0), ("K", 0, 1), ("K", 0, 2)]);
        assert_eq!(store.load_or_build(season, &other, Vocabulary::Modern, false), built);
        // the current season never is
        let rebuilt = store.load_or_build(season, &other, Vocabulary::Modern, true);
        assert_approx_eq!(rebuilt.get(0, 0), 0.0);
        assert_eq!(store.load(season).unwrap(), rebuilt);

        std::fs::remove_dir_all(&dir).ok();
    }
}
