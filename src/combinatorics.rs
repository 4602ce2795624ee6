use std::sync::LazyLock;

use num_rational::Ratio;

use crate::types::{DiceCounts, Hand};

pub const DISTINCT_HAND_COUNT: usize =
    BINOM[Hand::NUM_DICE + Hand::NUM_FACES - 1][Hand::NUM_FACES - 1];
/// Every five-dice multiset as per-face counts, in rank order.
pub const DISTINCT_HANDS: [[u8; Hand::NUM_FACES]; DISTINCT_HAND_COUNT] = make_distinct_hands();
pub const DISTINCT_KEEP_COUNT: usize = compute_distinct_keep_count();
/// Every multiset of zero to five dice as per-face counts.
pub const DISTINCT_KEEPS: [[u8; Hand::NUM_FACES]; DISTINCT_KEEP_COUNT] = make_distinct_keeps();

/// Every hand, indexed by its rank.
pub static HANDS: LazyLock<Vec<Hand>> = LazyLock::new(|| {
    DISTINCT_HANDS
        .iter()
        .map(Hand::from_counts_unchecked)
        .collect()
});

/// The reroll options of every hand, indexed by the hand's rank.
pub static REROLL_OPTIONS: LazyLock<Vec<Vec<RerollOption>>> =
    LazyLock::new(|| HANDS.iter().map(Hand::reroll_options).collect());

const MAX: usize = Hand::NUM_DICE + Hand::NUM_FACES;

/// Precomputed Pascal's triangle with 11 rows.
const BINOM: [[usize; MAX]; MAX] = make_binom();

/// Dice picked up for a reroll, and the dice left on the table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RerollOption {
    pub reroll: DiceCounts,
    pub keep: DiceCounts,
}

impl Hand {
    /// A bijection between hands and 0..252, by stars-and-bars.
    pub fn rank(&self) -> usize {
        rank_counts(self.counts().counts())
    }

    /// Every way to pick up a nonempty subset of the dice. Equal faces are interchangeable, so
    /// each distinct multiset shows up once.
    pub fn reroll_options(&self) -> Vec<RerollOption> {
        let counts = *self.counts().counts();
        let mut options = Vec::new();
        for k0 in 0..=counts[0] {
            for k1 in 0..=counts[1] {
                for k2 in 0..=counts[2] {
                    for k3 in 0..=counts[3] {
                        for k4 in 0..=counts[4] {
                            for k5 in 0..=counts[5] {
                                let keep = [k0, k1, k2, k3, k4, k5];
                                if keep == counts {
                                    continue;
                                }
                                let keep = DiceCounts::new_unchecked(keep);
                                let reroll = self.counts().checked_sub(&keep).expect(
                                    "Must be valid because keep is a submultiset of the hand.",
                                );
                                options.push(RerollOption { reroll, keep });
                            }
                        }
                    }
                }
            }
        }
        options
    }

    /// The chance of rolling into this hand after keeping `keep` and rerolling the rest.
    pub fn probability_given_keep(&self, keep: &DiceCounts) -> Ratio<u32> {
        match self.counts().checked_sub(keep) {
            Ok(rolled) => multinomial_probability(&rolled),
            Err(_) => Ratio::from_integer(0),
        }
    }

    pub fn probability(&self) -> Ratio<u32> {
        multinomial_probability(&self.counts())
    }
}

/// Rank of a five-dice count vector. Counts must sum to five.
pub(crate) fn rank_counts(counts: &[u8; Hand::NUM_FACES]) -> usize {
    let mut rank: usize = 0;
    let mut dice_remaining: usize = Hand::NUM_DICE;
    for face in 0..Hand::NUM_DICE {
        let count = counts[face] as usize;
        for i in 0..count {
            let dice_left = dice_remaining - i;
            let faces_left = Hand::NUM_FACES - face - 1;
            rank += BINOM[dice_left + faces_left - 1][faces_left - 1];
        }
        dice_remaining -= count;
    }
    rank
}

/// The chance that rolling `counts.len()` fair dice shows exactly this multiset.
pub fn multinomial_probability(counts: &DiceCounts) -> Ratio<u32> {
    let n = counts.len();
    let mut denominator = (Hand::NUM_FACES as u32).pow(n as u32);
    for &count in counts.counts() {
        denominator *= factorial(count as usize) as u32;
    }
    Ratio::new(factorial(n) as u32, denominator)
}

const fn factorial(n: usize) -> usize {
    let mut ans = 1;
    let mut i = 2;
    while i <= n {
        ans *= i;
        i += 1;
    }
    ans
}

const fn make_binom() -> [[usize; MAX]; MAX] {
    let mut binom = [[0; MAX]; MAX];
    let mut i = 0;
    while i < MAX {
        binom[i][0] = 1;
        binom[i][i] = 1;
        let mut j = 1;
        while j < i {
            binom[i][j] = binom[i - 1][j - 1] + binom[i - 1][j];
            j += 1;
        }
        i += 1;
    }
    binom
}

const fn compute_distinct_keep_count() -> usize {
    let mut total = 0usize;
    let mut n_kept = 0usize;
    while n_kept <= Hand::NUM_DICE {
        total += BINOM[n_kept + Hand::NUM_FACES - 1][n_kept];
        n_kept += 1;
    }
    total
}

/// Raw counts rather than `Hand`s, since validated construction is not const.
const fn make_distinct_hands() -> [[u8; Hand::NUM_FACES]; DISTINCT_HAND_COUNT] {
    let n = Hand::NUM_DICE as u8;
    let mut hands = [[n, 0, 0, 0, 0, 0]; DISTINCT_HAND_COUNT];
    let mut i = 0;
    let mut c0 = 0u8;
    while c0 <= n {
        let mut c1 = 0u8;
        while c0 + c1 <= n {
            let mut c2 = 0u8;
            while c0 + c1 + c2 <= n {
                let mut c3 = 0u8;
                while c0 + c1 + c2 + c3 <= n {
                    let mut c4 = 0u8;
                    while c0 + c1 + c2 + c3 + c4 <= n {
                        let c5 = n - c0 - c1 - c2 - c3 - c4;
                        hands[i] = [c0, c1, c2, c3, c4, c5];
                        i += 1;
                        c4 += 1;
                    }
                    c3 += 1;
                }
                c2 += 1;
            }
            c1 += 1;
        }
        c0 += 1;
    }
    hands
}

const fn make_distinct_keeps() -> [[u8; Hand::NUM_FACES]; DISTINCT_KEEP_COUNT] {
    let n = Hand::NUM_DICE as u8;
    let mut keeps = [[0, 0, 0, 0, 0, 0]; DISTINCT_KEEP_COUNT];
    let mut i = 0;
    let mut c0 = 0u8;
    while c0 <= n {
        let mut c1 = 0u8;
        while c0 + c1 <= n {
            let mut c2 = 0u8;
            while c0 + c1 + c2 <= n {
                let mut c3 = 0u8;
                while c0 + c1 + c2 + c3 <= n {
                    let mut c4 = 0u8;
                    while c0 + c1 + c2 + c3 + c4 <= n {
                        let mut c5 = 0u8;
                        while c0 + c1 + c2 + c3 + c4 + c5 <= n {
                            keeps[i] = [c0, c1, c2, c3, c4, c5];
                            c5 += 1;
                            i += 1;
                        }
                        c4 += 1;
                    }
                    c3 += 1;
                }
                c2 += 1;
            }
            c1 += 1;
        }
        c0 += 1;
    }
    keeps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(dice: [u8; 5]) -> Hand {
        Hand::try_from(dice).unwrap()
    }

    #[test]
    fn rank_is_bijection() {
        let mut rank_to_hand: [Option<Hand>; DISTINCT_HAND_COUNT] = [None; DISTINCT_HAND_COUNT];
        for distinct_hand in DISTINCT_HANDS {
            let hand = Hand::from_counts_unchecked(&distinct_hand);
            let rank = hand.rank();
            if let Some(existing) = rank_to_hand[rank].replace(hand) {
                panic!("rank not injective: {hand:?} collided with {existing:?} at rank {rank}.");
            }
        }
        // No collisions, so now check every rank is hit.
        assert!(
            rank_to_hand.iter().all(Option::is_some),
            "rank not surjective: {rank_to_hand:#?}"
        );
    }

    #[test]
    fn hands_are_stored_in_rank_order() {
        for (i, hand) in HANDS.iter().enumerate() {
            assert_eq!(hand.rank(), i);
        }
    }

    #[test]
    fn distinct_counts() {
        assert_eq!(DISTINCT_HAND_COUNT, 252);
        assert_eq!(DISTINCT_KEEP_COUNT, 462);
    }

    #[test]
    fn test_probability() {
        let cases = [
            ([1, 1, 1, 1, 1], Ratio::new(1, 7776)),
            ([4, 4, 4, 4, 4], Ratio::new(1, 7776)),
            ([1, 2, 3, 4, 5], Ratio::new(120, 7776)),
            ([1, 2, 4, 5, 6], Ratio::new(120, 7776)),
        ];
        for (dice, expected) in cases {
            assert_eq!(hand(dice).probability(), expected, "hand {dice:?}");
        }
    }

    #[test]
    fn probabilities_sum_to_one() {
        let total: Ratio<u32> = HANDS.iter().map(Hand::probability).sum();
        assert_eq!(total, Ratio::from_integer(1));
    }

    #[test]
    fn test_probability_given_keep() {
        let cases = [
            ([1, 1, 1, 1, 1], [4, 0, 0, 0, 0, 0], Ratio::new(1, 6)),
            ([1, 1, 1, 1, 1], [3, 0, 0, 0, 0, 0], Ratio::new(1, 36)),
            ([1, 3, 4, 5, 6], [2, 0, 0, 0, 0, 0], Ratio::from_integer(0)),
        ];
        for (dice, keep, expected) in cases {
            let keep = DiceCounts::try_from(keep).unwrap();
            assert_eq!(hand(dice).probability_given_keep(&keep), expected);
        }
    }

    #[test]
    fn reroll_options_of_five_of_a_kind() {
        let options = hand([1, 1, 1, 1, 1]).reroll_options();
        let kept: Vec<usize> = options.iter().map(|option| option.keep.len()).collect();
        assert_eq!(kept, vec![0, 1, 2, 3, 4]);
        assert!(options.iter().all(|option| option.reroll.len() + option.keep.len() == 5));
    }

    #[test]
    fn reroll_options_are_deduplicated() {
        assert_eq!(hand([1, 2, 3, 4, 5]).reroll_options().len(), 31);
        assert_eq!(hand([2, 2, 3, 3, 3]).reroll_options().len(), 11);
        assert_eq!(REROLL_OPTIONS[hand([6, 6, 6, 6, 6]).rank()].len(), 5);
    }
}
