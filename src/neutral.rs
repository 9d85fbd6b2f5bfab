use crate::bases::BaseOutState;
use crate::inning::replay;
use crate::matrix::RunExpectancyMatrix;
use crate::outcome::classify_neutral;
use crate::play::{innings, Play, PlayerId, Season};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::AddAssign;

pub const GAME_INNINGS: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerOwner {
    Inherited,
    Pitcher(PlayerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct NeutralInning {
    pub runs: f64,
    pub outs: u8,
}

// Runners on base when the slice starts are inherited. A slice ending short of three outs is
// also charged the expectancy of the runners it left, net of the inherited ones.
pub fn simulate_neutral_inning(
    plays: &[Play],
    pitcher: Option<PlayerId>,
    matrix: &RunExpectancyMatrix,
) -> NeutralInning {
    let plays = match pitcher {
        Some(pitcher) => {
            let start = plays.iter().position(|play| play.pitcher == pitcher);
            let end = plays.iter().rposition(|play| play.pitcher == pitcher);
            match (start, end) {
                (Some(start), Some(end)) => &plays[start..=end],
                _ => return NeutralInning::default(),
            }
        }
        None => plays,
    };
    let start = match plays.first() {
        Some(play) => BaseOutState::from_code(play.occupancy, play.outs, RunnerOwner::Inherited),
        None => return NeutralInning::default(),
    };
    let responsible = |owner: &RunnerOwner| match pitcher {
        Some(pitcher) => *owner == RunnerOwner::Pitcher(pitcher),
        None => *owner != RunnerOwner::Inherited,
    };

    let results = replay(start, plays, classify_neutral, |play| {
        RunnerOwner::Pitcher(play.pitcher)
    });
    let scored = results
        .iter()
        .flat_map(|result| result.scored.iter())
        .filter(|owner| responsible(owner))
        .count();
    #[allow(clippy::cast_precision_loss)]
    let mut runs = scored as f64;

    let end = results.last().map_or(start, |result| result.after);
    if !end.is_over() {
        let left_behind = BaseOutState::new(end.bases.retain(|owner| !responsible(owner)), end.outs);
        runs += (matrix.lookup(&end) - matrix.lookup(&left_behind)).max(0.0);
    }

    NeutralInning {
        runs,
        outs: end.outs.saturating_sub(start.outs).min(3),
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NeutralTotals {
    pub runs: f64,
    pub outs: u32,
}

impl AddAssign<NeutralInning> for NeutralTotals {
    fn add_assign(&mut self, inning: NeutralInning) {
        self.runs += inning.runs;
        self.outs += u32::from(inning.outs);
    }
}

impl AddAssign for NeutralTotals {
    fn add_assign(&mut self, other: NeutralTotals) {
        self.runs += other.runs;
        self.outs += other.outs;
    }
}

impl NeutralTotals {
    pub fn innings_pitched(&self) -> f64 {
        f64::from(self.outs) / 3.0
    }

    pub fn era(&self) -> f64 {
        let ip = self.innings_pitched();
        if ip > 0.0 {
            self.runs * GAME_INNINGS / ip
        } else {
            0.0
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn era_minus(&self, league: &NeutralTotals) -> i64 {
        let league_era = league.era();
        if league_era > 0.0 {
            (100.0 * self.era() / league_era).round() as i64
        } else {
            100
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeutralLine {
    pub season: Season,
    pub pitcher: PlayerId,
    // `<n>TM` for a pitcher's combined line across n teams
    pub team: String,
    pub neutral_runs: f64,
    pub neutral_outs: u32,
    pub neutral_innings_pitched: f64,
    pub neutral_era: f64,
    pub era_minus: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamNeutralLine {
    pub season: Season,
    pub team: String,
    pub neutral_runs: f64,
    pub neutral_outs: u32,
    pub neutral_innings_pitched: f64,
    pub neutral_era: f64,
    pub era_minus: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NeutralLedger {
    pub league: NeutralTotals,
    pitchers: BTreeMap<(PlayerId, String), NeutralTotals>,
    teams: BTreeMap<String, NeutralTotals>,
}

impl NeutralLedger {
    pub fn build(plays: &[Play], matrix: &RunExpectancyMatrix) -> NeutralLedger {
        let mut ledger = NeutralLedger::default();
        for inning in innings(plays) {
            let whole = simulate_neutral_inning(inning, None, matrix);
            ledger.league += whole;
            let team = inning
                .first()
                .and_then(|play| play.pitcher_team.as_deref())
                .unwrap_or_default();
            *ledger.teams.entry(team.to_string()).or_default() += whole;

            let mut appearances: Vec<(PlayerId, &str)> = Vec::new();
            for play in inning {
                let key = (play.pitcher, play.pitcher_team.as_deref().unwrap_or_default());
                if !appearances.contains(&key) {
                    appearances.push(key);
                }
            }
            for (pitcher, team) in appearances {
                *ledger
                    .pitchers
                    .entry((pitcher, team.to_string()))
                    .or_default() += simulate_neutral_inning(inning, Some(pitcher), matrix);
            }
        }
        ledger
    }

    pub fn lines(&self, season: Season) -> Vec<NeutralLine> {
        let line = |pitcher: PlayerId, team: String, totals: &NeutralTotals| NeutralLine {
            season,
            pitcher,
            team,
            neutral_runs: totals.runs,
            neutral_outs: totals.outs,
            neutral_innings_pitched: totals.innings_pitched(),
            neutral_era: totals.era(),
            era_minus: totals.era_minus(&self.league),
        };

        let mut lines = Vec::new();
        let mut combined: BTreeMap<PlayerId, (usize, NeutralTotals)> = BTreeMap::new();
        for ((pitcher, team), totals) in &self.pitchers {
            lines.push(line(*pitcher, team.clone(), totals));
            let entry = combined.entry(*pitcher).or_default();
            entry.0 += 1;
            entry.1 += *totals;
        }
        for (pitcher, (teams, totals)) in combined {
            if teams > 1 {
                lines.push(line(pitcher, format!("{}TM", teams), &totals));
            }
        }
        lines
    }

    pub fn team_lines(&self, season: Season) -> Vec<TeamNeutralLine> {
        self.teams
            .iter()
            .map(|(team, totals)| TeamNeutralLine {
                season,
                team: team.clone(),
                neutral_runs: totals.runs,
                neutral_outs: totals.outs,
                neutral_innings_pitched: totals.innings_pitched(),
                neutral_era: totals.era(),
                era_minus: totals.era_minus(&self.league),
            })
            .collect()
    }
}
