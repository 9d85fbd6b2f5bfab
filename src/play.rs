use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub type PlayerId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Season(pub u16);

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl FromStr for Season {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Season> {
        let s = s.trim();
        let number = s
            .strip_prefix('S')
            .or_else(|| s.strip_prefix('s'))
            .unwrap_or(s);
        Ok(Season(
            number
                .parse()
                .with_context(|| format!("invalid season {:?}", s))?,
        ))
    }
}

/// One row of a game log: a plate appearance or a base-running event.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Play {
    pub season: Season,
    pub session: u32,
    pub game_id: String,
    pub inning_id: String,
    // assigned from row order
    pub sequence: u32,
    pub exact_result: Option<String>,
    pub old_result: Option<String>,
    pub neutral_result: Option<String>,
    // bitwise
    pub occupancy: u8,
    pub outs: u8,
    pub batter: PlayerId,
    pub pitcher: PlayerId,
    pub pitcher_team: Option<String>,
    pub diff: Option<f64>,
    pub rbi: u8,
    pub runs: u8,
}

impl Play {
    #[cfg(test)]
    pub fn test(code: &str, occupancy: u8, outs: u8) -> Play {
        Play {
            season: Season(7),
            session: 1,
            game_id: "1".to_string(),
            inning_id: "1-1T".to_string(),
            sequence: 0,
            exact_result: Some(code.to_string()),
            old_result: Some(code.to_string()),
            neutral_result: None,
            occupancy,
            outs,
            batter: 0,
            pitcher: 0,
            pitcher_team: None,
            diff: None,
            rbi: 0,
            runs: 0,
        }
    }

    #[cfg(test)]
    #[allow(clippy::cast_possible_truncation)]
    pub fn inning(id: &str, codes: &[(&str, u8, u8)]) -> Vec<Play> {
        codes
            .iter()
            .enumerate()
            .map(|(i, (code, occupancy, outs))| {
                let mut play = Play::test(code, *occupancy, *outs);
                play.inning_id = id.to_string();
                play.sequence = i as u32;
                play
            })
            .collect()
    }

    #[cfg(test)]
    pub fn random_inning<R: rand::Rng>(rng: &mut R, id: &str) -> Vec<Play> {
        const CODES: &[&str] = &[
            "1B", "1B", "2B", "3B", "HR", "BB", "IBB", "BUNT 1B", "K", "K", "K", "FO", "FO", "PO",
            "LO", "LGO", "LGO", "RGO", "RGO", "DP", "BUNT Sac", "BUNT GO", "STEAL 2B", "STEAL 3B",
            "CS 2B", "MSTEAL 3B", "Auto K", "AUTO BB",
        ];
        let len = rng.gen_range(3, 14);
        let mut plays = Play::inning(
            id,
            &(0..len)
                .map(|_| (CODES[rng.gen_range(0, CODES.len())], 0_u8, 0_u8))
                .collect::<Vec<_>>(),
        );
        for play in &mut plays {
            play.diff = Some(f64::from(rng.gen_range(0_u16, 501)));
            play.batter = rng.gen_range(1, 40);
        }
        plays
    }
}

pub fn innings(plays: &[Play]) -> impl Iterator<Item = &[Play]> + '_ {
    let mut rest = plays;
    std::iter::from_fn(move || {
        let first = rest.first()?;
        let len = rest
            .iter()
            .position(|play| play.inning_id != first.inning_id)
            .unwrap_or_else(|| rest.len());
        let (inning, tail) = rest.split_at(len);
        rest = tail;
        Some(inning)
    })
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

// coerce blanks, `#N/A` and stray text instead of failing the row
pub mod lenient {
    use super::Deserializer;
    use serde::Deserialize;

    fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(|s| s.trim().trim_end_matches('%'))
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|x| x.is_finite()))
    }

    pub fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        number(deserializer)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        Ok(number(deserializer)?.map_or(0, |x| x.max(0.0).min(255.0) as u8))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn session<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        Ok(number(deserializer)?.map_or(0, |x| x.max(0.0) as u32))
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        Ok(number(deserializer)?.map_or(0, |x| x as i64))
    }

    pub fn code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan")))
    }
}

#[cfg(test)]
mod tests {
    use super::{innings, Play, Season};

    #[test]
    fn test_innings() {
        let mut plays = Vec::new();
        for (id, code) in &[("a", "K"), ("a", "1B"), ("b", "HR"), ("c", "PO"), ("c", "FO")] {
            let mut play = Play::test(code, 0, 0);
            play.inning_id = (*id).to_string();
            plays.push(play);
        }
        let lens: Vec<usize> = innings(&plays).map(<[Play]>::len).collect();
        assert_eq!(lens, vec![2, 1, 2]);
        assert_eq!(innings(&[]).count(), 0);
    }

    #[test]
    fn test_season_parse() {
        assert_eq!("S7".parse::<Season>().unwrap(), Season(7));
        assert_eq!(" s12 ".parse::<Season>().unwrap(), Season(12));
        assert_eq!("3".parse::<Season>().unwrap(), Season(3));
        assert!("Sx".parse::<Season>().is_err());
        assert_eq!(Season(4).to_string(), "S4");
    }
}
