//! Exact outcome probabilities for rolling one to five dice at once.

use std::fmt;
use std::sync::LazyLock;

use num_rational::Ratio;

use crate::combinatorics::{DISTINCT_KEEPS, multinomial_probability};
use crate::types::{ConstructionError, DiceCounts, Die, Hand};

static DISTRIBUTIONS: LazyLock<Vec<RollDistribution>> = LazyLock::new(|| {
    (1..=Hand::NUM_DICE)
        .map(RollDistribution::enumerate)
        .collect()
});

/// One sorted result of a roll, with its reduced probability.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Outcome {
    pub counts: DiceCounts,
    pub probability: Ratio<u32>,
}

/// The probability mass function over sorted outcomes of rolling `dice` fair dice.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RollDistribution {
    dice: usize,
    outcomes: Vec<Outcome>,
}

/// Looks up the shared distribution for `k` dice, `k` in 1..=5.
pub fn distribution(k: usize) -> Result<&'static RollDistribution, ConstructionError> {
    if !(1..=Hand::NUM_DICE).contains(&k) {
        return Err(ConstructionError::InvalidRollSize { got: k });
    }
    Ok(&DISTRIBUTIONS[k - 1])
}

impl Outcome {
    pub fn faces(&self) -> Vec<Die> {
        self.counts.faces()
    }
}

impl RollDistribution {
    fn enumerate(dice: usize) -> Self {
        let mut outcomes: Vec<Outcome> = DISTINCT_KEEPS
            .iter()
            .map(|&raw| DiceCounts::new_unchecked(raw))
            .filter(|counts| counts.len() == dice)
            .map(|counts| Outcome {
                counts,
                probability: multinomial_probability(&counts),
            })
            .collect();
        outcomes.sort_by_key(Outcome::faces);
        Self { dice, outcomes }
    }

    pub fn dice(&self) -> usize {
        self.dice
    }

    /// Outcomes in lexicographic order of their sorted faces.
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn probability_of(&self, counts: &DiceCounts) -> Ratio<u32> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.counts == *counts)
            .map_or(Ratio::from_integer(0), |outcome| outcome.probability)
    }

    pub fn total(&self) -> Ratio<u32> {
        self.outcomes.iter().map(|outcome| outcome.probability).sum()
    }
}

/// Renders the table as a constant array for embedding elsewhere.
impl fmt::Display for RollDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "pub const ROLL_{k}_PROB: [([Die; {k}], Ratio<u32>); {n}] = [",
            k = self.dice,
            n = self.outcomes.len()
        )?;
        for outcome in &self.outcomes {
            let faces: Vec<String> = outcome.faces().iter().map(Die::to_string).collect();
            writeln!(
                f,
                "    ([{}], Ratio::new_raw({}, {})),",
                faces.join(", "),
                outcome.probability.numer(),
                outcome.probability.denom()
            )?;
        }
        writeln!(f, "];")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(faces: &[Die]) -> DiceCounts {
        DiceCounts::try_from(faces).unwrap()
    }

    #[test]
    fn every_distribution_sums_to_one() {
        for k in 1..=5 {
            assert_eq!(distribution(k).unwrap().total(), Ratio::from_integer(1), "k={k}");
        }
    }

    #[test]
    fn outcome_counts() {
        let sizes: Vec<usize> = (1..=5)
            .map(|k| distribution(k).unwrap().outcomes().len())
            .collect();
        assert_eq!(sizes, vec![6, 21, 56, 126, 252]);
    }

    #[test]
    fn single_die_is_uniform() {
        let one = distribution(1).unwrap();
        for face in 1..=6 {
            assert_eq!(one.probability_of(&counts(&[face])), Ratio::new(1, 6));
        }
    }

    #[test]
    fn two_dice() {
        let two = distribution(2).unwrap();
        assert_eq!(two.probability_of(&counts(&[1, 1])), Ratio::new(1, 36));
        assert_eq!(two.probability_of(&counts(&[1, 2])), Ratio::new(1, 18));
        assert_eq!(two.probability_of(&counts(&[2, 1])), Ratio::new(1, 18));
    }

    #[test]
    fn outcomes_are_lexicographic() {
        let three = distribution(3).unwrap();
        let faces: Vec<Vec<Die>> = three.outcomes().iter().map(Outcome::faces).collect();
        let mut sorted = faces.clone();
        sorted.sort();
        assert_eq!(faces, sorted);
        assert_eq!(faces.first(), Some(&vec![1, 1, 1]));
        assert_eq!(faces.last(), Some(&vec![6, 6, 6]));
    }

    /// Aggregating all 6^3 ordered rolls must land on the same table.
    #[test]
    fn matches_brute_force_enumeration() {
        let three = distribution(3).unwrap();
        let mut tallies = std::collections::HashMap::new();
        for a in 1..=6 {
            for b in 1..=6 {
                for c in 1..=6 {
                    *tallies.entry(counts(&[a, b, c])).or_insert(0u32) += 1;
                }
            }
        }
        for outcome in three.outcomes() {
            assert_eq!(outcome.probability, Ratio::new(tallies[&outcome.counts], 216));
        }
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        assert_eq!(
            distribution(0),
            Err(ConstructionError::InvalidRollSize { got: 0 })
        );
        assert_eq!(
            distribution(6),
            Err(ConstructionError::InvalidRollSize { got: 6 })
        );
    }

    #[test]
    fn renders_constant_table() {
        let rendered = distribution(1).unwrap().to_string();
        assert!(rendered.starts_with("pub const ROLL_1_PROB: [([Die; 1], Ratio<u32>); 6] = [\n"));
        assert!(rendered.contains("    ([3], Ratio::new_raw(1, 6)),\n"));
        assert!(rendered.ends_with("];\n"));
    }
}
