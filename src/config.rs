use crate::bases::OccupancyLayout;
use crate::play::Season;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Builds run expectancy matrices, RE24 and neutral pitching lines from game logs.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Config {
    /// Directory of per-season game logs (`S7.csv`, `S7.csv.gz`)
    #[arg(long, default_value = "gamelogs")]
    pub gamelogs: PathBuf,

    /// Where matrices and season reports are written
    #[arg(long, default_value = "out")]
    pub out: PathBuf,

    /// Where parsed game logs are cached [default: user cache dir]
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Seasons logged with the old result codes
    #[arg(long, value_delimiter = ',', default_value = "S2,S3")]
    pub legacy_seasons: Vec<Season>,

    /// Season still in progress [default: the latest season in the logs]
    #[arg(long)]
    pub current_season: Option<Season>,

    #[arg(long, value_enum, default_value_t = OccupancyLayout::Sheet)]
    pub occupancy_layout: OccupancyLayout,

    /// Always parse the game logs, ignoring the cache
    #[arg(long)]
    pub no_cache: bool,
}

impl Config {
    pub fn cache_dir(&self) -> Result<Option<PathBuf>> {
        if self.no_cache {
            return Ok(None);
        }
        match &self.cache_dir {
            Some(dir) => Ok(Some(dir.clone())),
            None => Ok(Some(
                dirs::cache_dir()
                    .context("unable to find cache dir")?
                    .join(env!("CARGO_PKG_NAME")),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::bases::OccupancyLayout;
    use crate::play::Season;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(&["run-expectancy"]).unwrap();
        assert_eq!(config.gamelogs, PathBuf::from("gamelogs"));
        assert_eq!(config.legacy_seasons, vec![Season(2), Season(3)]);
        assert_eq!(config.current_season, None);
        assert_eq!(config.occupancy_layout, OccupancyLayout::Sheet);
        assert!(!config.no_cache);
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from(&[
            "run-expectancy",
            "--legacy-seasons",
            "S1,s2,3",
            "--current-season",
            "S12",
            "--occupancy-layout",
            "bitwise",
            "--cache-dir",
            "/tmp/re",
            "--no-cache",
        ])
        .unwrap();
        assert_eq!(config.legacy_seasons, vec![Season(1), Season(2), Season(3)]);
        assert_eq!(config.current_season, Some(Season(12)));
        assert_eq!(config.occupancy_layout, OccupancyLayout::Bitwise);
        assert_eq!(config.cache_dir().unwrap(), None);

        assert!(Config::try_parse_from(&["run-expectancy", "--current-season", "twelve"]).is_err());
    }

    #[test]
    fn test_cache_dir() {
        let config = Config::try_parse_from(&["run-expectancy", "--cache-dir", "/tmp/re"]).unwrap();
        assert_eq!(config.cache_dir().unwrap(), Some(PathBuf::from("/tmp/re")));
    }
}
