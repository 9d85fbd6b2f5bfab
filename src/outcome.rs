use crate::bases::{Base, BaseOutState, Bases};
use crate::play::Play;
use serde::Serialize;

// left-side groundouts with 1st and 2nd taken and nobody out, recorded as triple plays
pub const TRIPLE_PLAY_WINDOW: std::ops::RangeInclusive<f64> = 496.0..=500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    Single,
    BuntSingle,
    Double,
    Triple,
    HomeRun,
    Walk(WalkKind),
    Strikeout(StrikeoutKind),
    GroundOut { side: Side, bunt: bool },
    FlyOut,
    PopOut,
    LineOut,
    LineOutDoublePlay { runner: Base },
    DoublePlay,
    TriplePlay,
    SacFly,
    SacBunt,
    StolenBase(Steal),
    CaughtStealing(Steal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WalkKind {
    Regular,
    Intentional,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StrikeoutKind {
    Regular,
    Automatic,
    Bunt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Steal {
    Second,
    Third,
    Home,
    // double steals move the trailing runner up too
    DoubleThird,
    DoubleHome,
    // legacy logs don't say
    Lead,
}

impl Steal {
    pub fn runners(self) -> (Base, Option<Base>) {
        match self {
            Steal::Second | Steal::Lead => (Base::First, None),
            Steal::Third => (Base::Second, None),
            Steal::Home => (Base::Third, None),
            Steal::DoubleThird => (Base::Second, Some(Base::First)),
            Steal::DoubleHome => (Base::Third, Some(Base::Second)),
        }
    }

    fn resolve<T: Copy>(self, state: &BaseOutState<T>) -> Steal {
        if self != Steal::Lead {
            return self;
        }
        let bases = &state.bases;
        // runners with an open base ahead of them, short of home
        let free = Bases([
            bases.get(Base::First).filter(|_| !bases.is_occupied(Base::Second)),
            bases.get(Base::Second).filter(|_| !bases.is_occupied(Base::Third)),
            None,
        ]);
        match free.lead() {
            Some(Base::Second) => Steal::Third,
            Some(_) => Steal::Second,
            None if bases.is_occupied(Base::Third) => Steal::Home,
            None => Steal::Second,
        }
    }
}

impl Outcome {
    pub fn resolve<T: Copy>(self, state: &BaseOutState<T>, tie_break: Option<f64>) -> Outcome {
        let bases = &state.bases;
        match self {
            Outcome::LineOut if state.outs < 2 => match bases.trailing() {
                Some(runner) => Outcome::LineOutDoublePlay { runner },
                None => self,
            },
            Outcome::GroundOut {
                side: Side::Left,
                bunt: false,
            } if state.outs == 0
                && bases.is_occupied(Base::First)
                && bases.is_occupied(Base::Second)
                && tie_break.map_or(false, |x| TRIPLE_PLAY_WINDOW.contains(&x)) =>
            {
                Outcome::TriplePlay
            }
            Outcome::StolenBase(steal) => Outcome::StolenBase(steal.resolve(state)),
            Outcome::CaughtStealing(steal) => Outcome::CaughtStealing(steal.resolve(state)),
            _ => self,
        }
    }

    pub fn is_plate_appearance(self) -> bool {
        !matches!(self, Outcome::StolenBase(_) | Outcome::CaughtStealing(_))
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Vocabulary {
    Legacy,
    Modern,
    Neutral,
}

impl Vocabulary {
    pub fn for_legacy(legacy: bool) -> Vocabulary {
        if legacy {
            Vocabulary::Legacy
        } else {
            Vocabulary::Modern
        }
    }

    pub fn parse(self, code: &str) -> Option<Outcome> {
        match self {
            Vocabulary::Legacy => parse_legacy(code),
            Vocabulary::Modern => parse_modern(code),
            Vocabulary::Neutral => parse_modern(code).or_else(|| parse_legacy(code)),
        }
    }

    // `Err` carries the unrecognized code, `Ok(None)` means the row had none
    pub fn classify(self, play: &Play) -> Result<Option<Outcome>, String> {
        let code = match self {
            Vocabulary::Legacy => play.old_result.as_deref(),
            Vocabulary::Modern => {
                if play.exact_result.as_deref() == Some("LGO")
                    && play.old_result.as_deref() == Some("LO")
                {
                    return Ok(Some(Outcome::LineOut));
                }
                match play.exact_result.as_deref() {
                    Some(code) => Some(code),
                    None => {
                        return Vocabulary::Legacy.classify(play);
                    }
                }
            }
            Vocabulary::Neutral => play
                .neutral_result
                .as_deref()
                .or_else(|| play.old_result.as_deref()),
        };
        match code {
            Some(code) => self.parse(code).map(Some).ok_or_else(|| code.to_string()),
            None => Ok(None),
        }
    }
}

pub fn classify_neutral(play: &Play) -> Result<Option<Outcome>, String> {
    Vocabulary::Neutral.classify(play)
}

fn parse_common(code: &str) -> Option<Outcome> {
    Some(match code {
        "1B" => Outcome::Single,
        "2B" => Outcome::Double,
        "3B" => Outcome::Triple,
        "HR" => Outcome::HomeRun,
        "BB" => Outcome::Walk(WalkKind::Regular),
        "IBB" => Outcome::Walk(WalkKind::Intentional),
        "Auto BB" => Outcome::Walk(WalkKind::Automatic),
        "K" => Outcome::Strikeout(StrikeoutKind::Regular),
        "Auto K" => Outcome::Strikeout(StrikeoutKind::Automatic),
        "FO" => Outcome::FlyOut,
        "PO" => Outcome::PopOut,
        "LO" => Outcome::LineOut,
        "LGO" => Outcome::GroundOut {
            side: Side::Left,
            bunt: false,
        },
        "RGO" => Outcome::GroundOut {
            side: Side::Right,
            bunt: false,
        },
        "DP" => Outcome::DoublePlay,
        "TP" => Outcome::TriplePlay,
        _ => return None,
    })
}

fn parse_legacy(code: &str) -> Option<Outcome> {
    parse_common(code).or(match code {
        "Sac" => Some(Outcome::SacFly),
        "Bunt" => Some(Outcome::SacBunt),
        "SB" => Some(Outcome::StolenBase(Steal::Lead)),
        "CS" => Some(Outcome::CaughtStealing(Steal::Lead)),
        _ => None,
    })
}

fn parse_modern(code: &str) -> Option<Outcome> {
    if let Some(outcome) = parse_common(code) {
        return Some(outcome);
    }
    Some(match code.to_ascii_uppercase().as_str() {
        "BUNT 1B" => Outcome::BuntSingle,
        "AUTO BB" => Outcome::Walk(WalkKind::Automatic),
        "AUTO K" => Outcome::Strikeout(StrikeoutKind::Automatic),
        "BUNT K" => Outcome::Strikeout(StrikeoutKind::Bunt),
        "BUNT GO" => Outcome::GroundOut {
            side: Side::Left,
            bunt: true,
        },
        "BUNT DP" => Outcome::DoublePlay,
        "BUNT SAC" => Outcome::SacBunt,
        "STEAL 2B" => Outcome::StolenBase(Steal::Second),
        "STEAL 3B" => Outcome::StolenBase(Steal::Third),
        "STEAL HOME" => Outcome::StolenBase(Steal::Home),
        "MSTEAL 3B" => Outcome::StolenBase(Steal::DoubleThird),
        "MSTEAL HOME" => Outcome::StolenBase(Steal::DoubleHome),
        "CS 2B" => Outcome::CaughtStealing(Steal::Second),
        "CS 3B" => Outcome::CaughtStealing(Steal::Third),
        "CS HOME" => Outcome::CaughtStealing(Steal::Home),
        "CMS 3B" => Outcome::CaughtStealing(Steal::DoubleThird),
        "CMS HOME" => Outcome::CaughtStealing(Steal::DoubleHome),
        _ => return None,
    })
}
