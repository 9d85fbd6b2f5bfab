use crate::bases::{Base, BaseOutState, Bases};
use crate::outcome::{Outcome, Side, Vocabulary};
use crate::play::Play;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<T> {
    pub state: BaseOutState<T>,
    pub scored: Vec<T>,
}

impl<T> Transition<T> {
    #[allow(clippy::cast_possible_truncation)]
    pub fn runs(&self) -> u8 {
        self.scored.len() as u8
    }
}

// the bases are cleared once three outs are reached
pub fn advance<T: Copy>(
    before: &BaseOutState<T>,
    outcome: Outcome,
    batter: T,
    tie_break: Option<f64>,
) -> Transition<T> {
    let outcome = outcome.resolve(before, tie_break);
    let mut bases = before.bases;
    let mut outs = before.outs;
    let mut scored = Vec::new();

    match outcome {
        Outcome::HomeRun => {
            scored.extend(bases.runners());
            scored.push(batter);
            bases = Bases::empty();
        }
        Outcome::Triple => {
            scored.extend(bases.runners());
            bases = Bases([None, None, Some(batter)]);
        }
        Outcome::Double => {
            scored.extend(bases.take(Base::Third));
            scored.extend(bases.take(Base::Second));
            bases = Bases([None, Some(batter), bases.get(Base::First)]);
        }
        Outcome::Single | Outcome::BuntSingle => {
            scored.extend(bases.take(Base::Third));
            if outcome == Outcome::Single && outs == 2 {
                // two-out hits score everyone on base
                scored.extend(bases.take(Base::Second));
                scored.extend(bases.take(Base::First));
                bases = Bases([Some(batter), None, None]);
            } else {
                bases = Bases([Some(batter), bases.get(Base::First), bases.get(Base::Second)]);
            }
        }
        Outcome::Walk(_) => {
            // forced runners only: push the batter onto first and shove along until an empty base
            let mut swap = Some(batter);
            for slot in &mut bases.0 {
                swap = std::mem::replace(slot, swap);
                if swap.is_none() {
                    break;
                }
            }
            scored.extend(swap);
        }
        Outcome::SacFly | Outcome::FlyOut => {
            outs += 1;
            if outs <= 2 {
                scored.extend(bases.take(Base::Third));
            }
        }
        Outcome::SacBunt => {
            outs += 1;
            if outs <= 2 {
                if !bases.is_occupied(Base::Third) {
                    let runner = bases.take(Base::Second);
                    bases.set(Base::Third, runner);
                }
                if !bases.is_occupied(Base::Second) {
                    let runner = bases.take(Base::First);
                    bases.set(Base::Second, runner);
                }
            }
        }
        Outcome::Strikeout(_) | Outcome::PopOut | Outcome::LineOut => {
            outs += 1;
        }
        Outcome::LineOutDoublePlay { runner } => {
            outs += 2;
            bases.take(runner);
        }
        Outcome::GroundOut { side, bunt } => {
            let left = side == Side::Left || bunt;
            let first_at_start = bases.is_occupied(Base::First);
            outs += 1;
            if outs <= 2 && bases.take(Base::First).is_some() {
                outs += 1;
            }
            if outs <= 2 {
                scored.extend(bases.take(Base::Third));
                // a ball to the left side holds the runner on second unless the double play
                // already went through first
                if !(left && !first_at_start) {
                    let runner = bases.take(Base::Second);
                    if runner.is_some() {
                        bases.set(Base::Third, runner);
                    }
                }
            }
        }
        Outcome::DoublePlay => {
            if outs == 0 {
                scored.extend(bases.get(Base::Third));
            }
            outs += 2;
            bases = Bases([None, None, bases.get(Base::Second)]);
        }
        Outcome::TriplePlay => {
            outs = 3;
        }
        Outcome::StolenBase(steal) => {
            let (runner, trailing) = steal.runners();
            scored.extend(move_up(&mut bases, runner));
            if let Some(trailing) = trailing {
                scored.extend(move_up(&mut bases, trailing));
            }
        }
        Outcome::CaughtStealing(steal) => {
            let (runner, trailing) = steal.runners();
            bases.take(runner);
            outs += 1;
            if let Some(trailing) = trailing {
                scored.extend(move_up(&mut bases, trailing));
            }
        }
    }

    if outs >= 3 {
        outs = 3;
        bases = Bases::empty();
    }

    Transition {
        state: BaseOutState { bases, outs },
        scored,
    }
}

fn move_up<T: Copy>(bases: &mut Bases<T>, base: Base) -> Option<T> {
    let next = base.next();
    if let Some(next) = next {
        if bases.is_occupied(next) {
            return None;
        }
    }
    let runner = bases.take(base)?;
    match next {
        Some(next) => {
            bases.set(next, Some(runner));
            None
        }
        None => Some(runner),
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPlay<T = ()> {
    pub before: BaseOutState<T>,
    pub after: BaseOutState<T>,
    pub scored: Vec<T>,
    // `Ok(None)` for a row without a code, `Err` for an unknown one
    pub outcome: Result<Option<Outcome>, String>,
}

impl<T> SimulatedPlay<T> {
    #[allow(clippy::cast_possible_truncation)]
    pub fn runs(&self) -> u8 {
        self.scored.len() as u8
    }
}

// plays after the third out come back as zero-run no-ops
pub fn replay<T, C, B>(
    start: BaseOutState<T>,
    plays: &[Play],
    classify: C,
    batter: B,
) -> Vec<SimulatedPlay<T>>
where
    T: Copy + std::fmt::Debug,
    C: Fn(&Play) -> Result<Option<Outcome>, String>,
    B: Fn(&Play) -> T,
{
    let mut state = start;
    let mut results = Vec::with_capacity(plays.len());
    for play in plays {
        if state.is_over() {
            results.push(SimulatedPlay {
                before: state,
                after: state,
                scored: Vec::new(),
                outcome: Ok(None),
            });
            continue;
        }

        let outcome = classify(play);
        let transition = match &outcome {
            Ok(Some(outcome)) => advance(&state, *outcome, batter(play), play.diff),
            _ => Transition {
                state,
                scored: Vec::new(),
            },
        };
        trace!(
            inning = %play.inning_id,
            sequence = play.sequence,
            ?outcome,
            before = ?state,
            after = ?transition.state,
            scored = transition.runs(),
        );
        results.push(SimulatedPlay {
            before: state,
            after: transition.state,
            scored: transition.scored,
            outcome,
        });
        state = transition.state;
    }
    results
}

pub fn simulate(plays: &[Play], vocabulary: Vocabulary) -> Vec<SimulatedPlay> {
    let start = match plays.first() {
        Some(play) => BaseOutState::from_code(play.occupancy, play.outs, ()),
        None => return Vec::new(),
    };
    replay(start, plays, |play| vocabulary.classify(play), |_| ())
}
