use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Base {
    First,
    Second,
    Third,
}

impl Base {
    pub const ALL: [Base; 3] = [Base::First, Base::Second, Base::Third];

    const fn index(self) -> usize {
        match self {
            Base::First => 0,
            Base::Second => 1,
            Base::Third => 2,
        }
    }

    const fn bit(self) -> u8 {
        1 << self.index()
    }

    pub const fn next(self) -> Option<Base> {
        match self {
            Base::First => Some(Base::Second),
            Base::Second => Some(Base::Third),
            Base::Third => None,
        }
    }
}

// `()` when only occupancy matters, an owner when we care who put a runner on
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bases<T>(pub [Option<T>; 3]);

impl<T: Copy> Bases<T> {
    pub const fn empty() -> Bases<T> {
        Bases([None, None, None])
    }

    pub fn from_occupancy(code: u8, runner: T) -> Bases<T> {
        let mut bases = Bases::empty();
        for base in Base::ALL {
            if code & base.bit() != 0 {
                bases.set(base, Some(runner));
            }
        }
        bases
    }

    pub fn get(&self, base: Base) -> Option<T> {
        self.0[base.index()]
    }

    pub fn set(&mut self, base: Base, runner: Option<T>) {
        self.0[base.index()] = runner;
    }

    pub fn take(&mut self, base: Base) -> Option<T> {
        self.0[base.index()].take()
    }

    pub fn is_occupied(&self, base: Base) -> bool {
        self.get(base).is_some()
    }

    pub fn runners(&self) -> impl Iterator<Item = T> + '_ {
        self.0.iter().flatten().copied()
    }

    pub fn occupancy(&self) -> u8 {
        Base::ALL
            .iter()
            .filter(|base| self.is_occupied(**base))
            .fold(0, |code, base| code | base.bit())
    }

    pub fn trailing(&self) -> Option<Base> {
        Base::ALL.iter().copied().find(|base| self.is_occupied(*base))
    }

    pub fn lead(&self) -> Option<Base> {
        Base::ALL.iter().rev().copied().find(|base| self.is_occupied(*base))
    }

    pub fn retain<F>(&self, f: F) -> Bases<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut bases = *self;
        for slot in &mut bases.0 {
            if !slot.as_ref().map_or(false, &f) {
                *slot = None;
            }
        }
        bases
    }
}

impl<T: Copy> Default for Bases<T> {
    fn default() -> Bases<T> {
        Bases::empty()
    }
}

impl<T> fmt::Debug for Bases<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |i: usize, c: char| if self.0[i].is_some() { c } else { '-' };
        write!(f, "{}{}{}", mark(0, '1'), mark(1, '2'), mark(2, '3'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BaseOutState<T = ()> {
    pub bases: Bases<T>,
    pub outs: u8,
}

impl<T: Copy> BaseOutState<T> {
    pub fn new(bases: Bases<T>, outs: u8) -> BaseOutState<T> {
        BaseOutState {
            bases,
            outs: outs.min(3),
        }
    }

    // codes above 7 keep their low three bits
    pub fn from_code(occupancy: u8, outs: u8, runner: T) -> BaseOutState<T> {
        BaseOutState::new(Bases::from_occupancy(occupancy & 0b111, runner), outs)
    }

    pub fn occupancy(&self) -> u8 {
        self.bases.occupancy()
    }

    pub const fn is_over(&self) -> bool {
        self.outs >= 3
    }
}

impl<T: Copy> Default for BaseOutState<T> {
    fn default() -> BaseOutState<T> {
        BaseOutState {
            bases: Bases::empty(),
            outs: 0,
        }
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum OccupancyLayout {
    /// bit 0 = first, bit 1 = second, bit 2 = third
    Bitwise,
    /// 0 empty, 1-3 a single runner on that base, 4 = 1st+2nd, 5 = 1st+3rd, 6 = 2nd+3rd, 7 loaded
    Sheet,
}

impl OccupancyLayout {
    pub fn to_bitwise(self, code: u8) -> u8 {
        match self {
            OccupancyLayout::Bitwise => code & 0b111,
            OccupancyLayout::Sheet => match code {
                3 => 0b100,
                4 => 0b011,
                5 => 0b101,
                6 => 0b110,
                7 => 0b111,
                other => other & 0b011,
            },
        }
    }
}
