//! Dice notation.

use std::fmt;
use std::str::FromStr;

use loremaster_core::error::DomainError;
use loremaster_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

const MAX_DICE: u32 = 100;
const MAX_SIDES: u32 = 1000;

/// A parsed `NdM+K` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceExpression {
    /// Number of dice.
    pub count: u32,
    /// Faces per die.
    pub sides: u32,
    /// Flat modifier.
    pub modifier: i32,
}

/// Outcome of rolling a `DiceExpression`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    /// Individual die results.
    pub rolls: Vec<u32>,
    /// Flat modifier applied.
    pub modifier: i32,
    /// Sum of rolls plus modifier.
    pub total: i32,
}

impl DiceExpression {
    /// Rolls the expression.
    #[allow(clippy::cast_possible_wrap)]
    pub fn roll(&self, rng: &mut dyn DeterministicRng) -> DiceRoll {
        let rolls: Vec<u32> = (0..self.count)
            .map(|_| rng.next_u32_range(1, self.sides))
            .collect();
        // Bounded by MAX_DICE * MAX_SIDES, well inside i32.
        let sum: u32 = rolls.iter().sum();
        DiceRoll {
            total: sum as i32 + self.modifier,
            modifier: self.modifier,
            rolls,
        }
    }
}

impl FromStr for DiceExpression {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::Validation(format!("invalid dice expression `{s}`"));
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let compact = compact.to_ascii_lowercase();

        let (dice, modifier) = match compact.find(['+', '-']) {
            Some(pos) => {
                let modifier: i32 = compact[pos..].parse().map_err(|_| invalid())?;
                (&compact[..pos], modifier)
            }
            None => (compact.as_str(), 0),
        };

        let (count, sides) = dice.split_once('d').ok_or_else(invalid)?;
        let count: u32 = if count.is_empty() {
            1
        } else {
            count.parse().map_err(|_| invalid())?
        };
        let sides: u32 = sides.parse().map_err(|_| invalid())?;

        if !(1..=MAX_DICE).contains(&count) || !(2..=MAX_SIDES).contains(&sides) {
            return Err(invalid());
        }

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}
