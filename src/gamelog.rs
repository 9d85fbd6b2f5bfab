use crate::bases::OccupancyLayout;
use crate::play::{lenient, Play, PlayerId, Season};
use crate::read_dir::{read_dir, Entries};
use anyhow::{Context, Result};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

const GAMELOG_VERSION: u64 = 1;

#[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Gamelog {
    pub seasons: BTreeMap<Season, Vec<Play>>,
}

// only the columns we use; unparseable cells are coerced
#[derive(Debug, Deserialize)]
struct Row {
    #[serde(rename = "Session", default, deserialize_with = "lenient::session")]
    session: u32,
    #[serde(rename = "Game ID", default, deserialize_with = "lenient::code")]
    game_id: Option<String>,
    #[serde(rename = "Inning ID", default, deserialize_with = "lenient::code")]
    inning_id: Option<String>,
    #[serde(rename = "Exact Result", default, deserialize_with = "lenient::code")]
    exact_result: Option<String>,
    #[serde(rename = "Old Result", default, deserialize_with = "lenient::code")]
    old_result: Option<String>,
    #[serde(rename = "Result at Neutral", default, deserialize_with = "lenient::code")]
    neutral_result: Option<String>,
    #[serde(rename = "OBC", default, deserialize_with = "lenient::count")]
    occupancy: u8,
    #[serde(rename = "Outs", default, deserialize_with = "lenient::count")]
    outs: u8,
    #[serde(rename = "Hitter ID", default, deserialize_with = "lenient::id")]
    batter: PlayerId,
    #[serde(rename = "Pitcher ID", default, deserialize_with = "lenient::id")]
    pitcher: PlayerId,
    #[serde(rename = "Pitcher Team", default, deserialize_with = "lenient::code")]
    pitcher_team: Option<String>,
    #[serde(rename = "Diff", default, deserialize_with = "lenient::float")]
    diff: Option<f64>,
    #[serde(rename = "RBI", default, deserialize_with = "lenient::count")]
    rbi: u8,
    #[serde(rename = "Run", default, deserialize_with = "lenient::count")]
    runs: u8,
}

impl Row {
    fn into_play(self, season: Season, layout: OccupancyLayout) -> Play {
        Play {
            season,
            session: self.session,
            game_id: self.game_id.unwrap_or_default(),
            inning_id: self.inning_id.unwrap_or_default(),
            sequence: 0,
            exact_result: self.exact_result,
            old_result: self.old_result,
            neutral_result: self.neutral_result,
            occupancy: layout.to_bitwise(self.occupancy),
            outs: self.outs.min(3),
            batter: self.batter,
            pitcher: self.pitcher,
            pitcher_team: self.pitcher_team,
            diff: self.diff,
            rbi: self.rbi,
            runs: self.runs,
        }
    }
}

#[derive(Debug, Hash)]
struct CacheKey<'a> {
    version: u64,
    layout: OccupancyLayout,
    entries: &'a Entries,
}

impl Gamelog {
    // the cache holds until a file is added, removed or modified
    pub fn load<P: AsRef<Path>>(
        dir: P,
        cache_dir: Option<&Path>,
        layout: OccupancyLayout,
    ) -> Result<Gamelog> {
        let dir = dir.as_ref();
        let entries = read_dir(dir)?;
        let cache_path = cache_dir.map(|cache_dir| get_cache_path(cache_dir, &entries, layout));
        if let Some(cache_path) = &cache_path {
            if let Ok(cache) = Gamelog::load_from_cache(cache_path) {
                debug!(path = %cache_path.display(), "loaded cached game logs");
                return Ok(cache);
            }
        }

        let mut seasons: BTreeMap<Season, Vec<Play>> = BTreeMap::new();
        for entry in &entries {
            let season = match season_of(&entry.path) {
                Some(season) => season,
                None => {
                    warn!(path = %entry.path.display(), "no season in file name, skipping");
                    continue;
                }
            };
            let plays = read_file(&dir.join(&entry.path), season, layout)?;
            seasons.entry(season).or_default().extend(plays);
        }

        let gamelog = Gamelog {
            seasons: seasons
                .into_iter()
                .map(|(season, plays)| (season, group_innings(plays)))
                .collect(),
        };
        info!(
            files = entries.len(),
            seasons = gamelog.seasons.len(),
            plays = gamelog.seasons.values().map(Vec::len).sum::<usize>(),
            "loaded game logs"
        );

        if let Some(cache_path) = &cache_path {
            if let Err(err) = gamelog.save_to_cache(cache_path) {
                warn!("unable to cache game logs: {:#}", err);
            }
        }
        Ok(gamelog)
    }

    pub fn latest_season(&self) -> Option<Season> {
        self.seasons.keys().next_back().copied()
    }

    fn load_from_cache(path: &Path) -> Result<Gamelog> {
        let mut reader = GzDecoder::new(File::open(path)?);
        Ok(bincode::deserialize_from(&mut reader)?)
    }

    fn save_to_cache(&self, path: &Path) -> Result<()> {
        let mut writer = GzEncoder::new(Vec::new(), Compression::default());
        bincode::serialize_into(&mut writer, self)?;
        let data = writer.finish()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }
}

fn get_cache_path(cache_dir: &Path, entries: &Entries, layout: OccupancyLayout) -> PathBuf {
    let mut hasher = FxHasher::default();
    let key = CacheKey {
        version: GAMELOG_VERSION,
        layout,
        entries,
    };
    key.hash(&mut hasher);
    cache_dir.join(format!("gamelog-{:x}.bincode.gz", hasher.finish()))
}

// `S7.csv`, `s7.csv.gz`, or a directory named for the season (`S7/part-1.csv`)
fn season_of(path: &Path) -> Option<Season> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    let stem = name.strip_suffix(".gz").unwrap_or(&name);
    let stem = stem.strip_suffix(".csv").unwrap_or(stem);
    stem.parse().ok().or_else(|| {
        path.parent()?
            .file_name()?
            .to_str()?
            .parse()
            .ok()
    })
}

#[instrument(skip(layout))]
fn read_file(path: &Path, season: Season, layout: OccupancyLayout) -> Result<Vec<Play>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader: Box<dyn Read> = if path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("gz"))
    {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut plays = Vec::new();
    let mut skipped = 0_usize;
    for (i, row) in reader.deserialize::<Row>().enumerate() {
        match row {
            Ok(row) => plays.push(row.into_play(season, layout)),
            Err(err) if err.is_io_error() => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
            Err(err) => {
                skipped += 1;
                debug!(row = i + 1, "skipping row: {}", err);
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, "skipped malformed rows");
    }
    debug!(plays = plays.len(), "read game log");
    Ok(plays)
}

fn group_innings(plays: Vec<Play>) -> Vec<Play> {
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut innings: Vec<Vec<Play>> = Vec::new();
    for play in plays {
        let i = *index.entry(play.inning_id.clone()).or_insert_with(|| {
            innings.push(Vec::new());
            innings.len() - 1
        });
        innings[i].push(play);
    }

    let mut plays = Vec::with_capacity(innings.iter().map(Vec::len).sum());
    for inning in innings {
        for (sequence, mut play) in (0_u32..).zip(inning) {
            play.sequence = sequence;
            plays.push(play);
        }
    }
    plays
}
