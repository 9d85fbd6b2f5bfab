use crate::audit::RunAudit;
use crate::gamelog::Gamelog;
use crate::matrix::{MatrixRow, MatrixStore, RunExpectancyMatrix};
use crate::neutral::{NeutralLedger, NeutralLine, TeamNeutralLine};
use crate::outcome::Vocabulary;
use crate::play::{Play, Season};
use crate::re24::{value_season, PlayValue};
use anyhow::{Context as _, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct Context {
    pub store: MatrixStore,
    pub legacy: BTreeSet<Season>,
    // never read from disk
    pub current: Option<Season>,
}

impl Context {
    pub fn vocabulary(&self, season: Season) -> Vocabulary {
        Vocabulary::for_legacy(self.legacy.contains(&season))
    }

    pub fn is_current(&self, season: Season) -> bool {
        self.current == Some(season)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonReport {
    pub season: Season,
    pub vocabulary: Vocabulary,
    #[serde(skip)]
    pub matrix: RunExpectancyMatrix,
    #[serde(rename = "matrix")]
    pub matrix_rows: Vec<MatrixRow>,
    pub plays: Vec<PlayValue>,
    pub pitchers: Vec<NeutralLine>,
    pub teams: Vec<TeamNeutralLine>,
    pub league_neutral_era: f64,
    pub audit: RunAudit,
}

#[instrument(skip(plays, context), fields(plays = plays.len()))]
pub fn process(season: Season, plays: &[Play], context: &Context) -> SeasonReport {
    let vocabulary = context.vocabulary(season);
    let matrix =
        context
            .store
            .load_or_build(season, plays, vocabulary, context.is_current(season));
    debug!("run expectancy matrix:\n{}", matrix);

    let values = value_season(plays, vocabulary, &matrix);
    let ledger = if matrix.is_empty() {
        NeutralLedger::default()
    } else {
        NeutralLedger::build(plays, &matrix)
    };
    let audit = RunAudit::build(plays, vocabulary);
    audit.report(season);

    let report = SeasonReport {
        season,
        vocabulary,
        matrix,
        matrix_rows: matrix.rows(),
        plays: values,
        pitchers: ledger.lines(season),
        teams: ledger.team_lines(season),
        league_neutral_era: ledger.league.era(),
        audit,
    };
    info!(
        pitchers = report.pitchers.len(),
        league_neutral_era = report.league_neutral_era,
        "processed season"
    );
    report
}

pub fn process_all(gamelog: &Gamelog, context: &Context) -> Vec<SeasonReport> {
    gamelog
        .seasons
        .par_iter()
        .map(|(season, plays)| process(*season, plays, context))
        .collect()
}

impl SeasonReport {
    /// Writes `season_S<n>.json` and `re_matrix_S<n>.txt` to `dir`.
    pub fn export(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let path = dir.join(format!("season_{}.json", self.season));
        let mut writer = BufWriter::new(
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?,
        );
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("failed to write {}", path.display()))?;
        writer.flush()?;

        let path = dir.join(format!("re_matrix_{}.txt", self.season));
        fs::write(&path, self.matrix.to_string())
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{process, process_all, Context};
    use crate::gamelog::Gamelog;
    use crate::matrix::MatrixStore;
    use crate::outcome::Vocabulary;
    use crate::play::{Play, Season};
    use assert_approx_eq::assert_approx_eq;
    use maplit::btreeset;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("run-expectancy-{}-{}", name, std::process::id()))
    }

    fn context(dir: &Path) -> Context {
        Context {
            store: MatrixStore::new(dir),
            legacy: btreeset! { Season(2), Season(3) },
            current: Some(Season(7)),
        }
    }

    #[test]
    fn test_vocabulary() {
        let context = context(&temp_dir("vocabulary"));
        assert_eq!(context.vocabulary(Season(2)), Vocabulary::Legacy);
        assert_eq!(context.vocabulary(Season(7)), Vocabulary::Modern);
        assert!(context.is_current(Season(7)));
        assert!(!context.is_current(Season(6)));
    }

    #[test]
    fn test_process() {
        let dir = temp_dir("process");
        let context = context(&dir);

        let mut plays = Play::inning("a", &[("HR", 0, 0), ("K", 0, 0), ("K", 0, 1), ("K", 0, 2)]);
        plays.extend(Play::inning(
            "b",
            &[("1B", 0, 0), ("K", 1, 0), ("HR", 1, 1), ("PO", 0, 1), ("PO", 0, 2)],
        ));
        for play in &mut plays {
            play.pitcher = 5;
            play.pitcher_team = Some("Crabs".to_string());
        }
        plays[0].runs = 1;
        plays[6].runs = 2;

        let report = process(Season(7), &plays, &context);
        assert_eq!(report.vocabulary, Vocabulary::Modern);
        assert_eq!(report.matrix_rows.len(), 24);
        assert_eq!(report.plays.len(), plays.len());
        assert_approx_eq!(report.audit.matching_share(), 1.0);
        assert_eq!(report.pitchers.len(), 1);
        assert_eq!(report.pitchers[0].neutral_outs, 6);
        assert_approx_eq!(report.pitchers[0].neutral_runs, 3.0);
        assert_approx_eq!(report.league_neutral_era, 9.0);
        assert_eq!(report.pitchers[0].era_minus, 100);
        assert_eq!(report.teams.len(), 1);
        assert_eq!(report.teams[0].team, "Crabs");
        assert_approx_eq!(report.teams[0].neutral_era, 9.0);

        report.export(&dir).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.join("season_S7.json")).unwrap()).unwrap();
        assert_eq!(json["season"], 7);
        assert_eq!(json["vocabulary"], "modern");
        assert_eq!(json["matrix"].as_array().unwrap().len(), 24);
        assert_eq!(json["matrix"][0]["OBC"], 0);
        assert_eq!(json["plays"].as_array().unwrap().len(), 9);
        assert_eq!(json["teams"][0]["team"], "Crabs");
        let table = fs::read_to_string(dir.join("re_matrix_S7.txt")).unwrap();
        assert!(table.starts_with("Outs"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_matrix_skips_neutral() {
        let dir = temp_dir("empty");
        let plays = Play::inning("a", &[("K", 0, 0), ("K", 0, 1), ("K", 0, 2)]);
        let report = process(Season(7), &plays, &context(&dir));
        assert!(report.matrix.is_empty());
        assert!(report.pitchers.is_empty());
        assert!(report.teams.is_empty());
        assert_approx_eq!(report.league_neutral_era, 0.0);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_process_all() {
        let dir = temp_dir("process-all");
        let mut rng = StdRng::seed_from_u64(3);
        let mut seasons = BTreeMap::new();
        for season in 4..8 {
            let mut plays = Vec::new();
            for i in 0..50 {
                plays.extend(Play::random_inning(&mut rng, &format!("{}-{}", season, i)));
            }
            seasons.insert(Season(season), plays);
        }
        let gamelog = Gamelog { seasons };

        let reports = process_all(&gamelog, &context(&dir));
        let order: Vec<Season> = reports.iter().map(|report| report.season).collect();
        assert_eq!(order, vec![Season(4), Season(5), Season(6), Season(7)]);
        for report in &reports {
            assert!(report.matrix_rows.iter().all(|row| row.run_expectancy >= 0.0));
            assert_eq!(report.plays.len(), gamelog.seasons[&report.season].len());
        }
        // past seasons were persisted for next time
        assert!(dir.join("re_matrix_S4.csv").exists());

        fs::remove_dir_all(&dir).ok();
    }
}
