use crate::types::{Category, Die, Hand};

impl Category {
    /// The points `hand` earns in this category. Never fails; a hand that does not qualify
    /// scores 0.
    pub fn score(&self, hand: &Hand) -> u8 {
        let counts = hand.counts();
        // Highest face present at least `n` times.
        let highest_with = |n: u8| (1..=6).rev().find(|&face: &Die| counts.count(face) >= n);
        match self {
            Category::Ones
            | Category::Twos
            | Category::Threes
            | Category::Fours
            | Category::Fives
            | Category::Sixes => {
                let face = self
                    .upper_face()
                    .expect("Upper-section categories always have a face.");
                face * counts.count(face)
            }
            Category::OnePair => highest_with(2).map_or(0, |face| 2 * face),
            Category::TwoPairs => {
                let pairs: Vec<Die> = (1..=6).filter(|&face| counts.count(face) >= 2).collect();
                match pairs.as_slice() {
                    [low, high] => 2 * low + 2 * high,
                    _ => 0,
                }
            }
            Category::ThreeOfAKind => highest_with(3).map_or(0, |face| 3 * face),
            Category::FourOfAKind => highest_with(4).map_or(0, |face| 4 * face),
            Category::SmallStraight => match hand.dice() {
                [1, 2, 3, 4, 5] => 15,
                _ => 0,
            },
            Category::LargeStraight => match hand.dice() {
                [2, 3, 4, 5, 6] => 20,
                _ => 0,
            },
            Category::FullHouse => match *hand.dice() {
                [a, b, c, d, e] if a == b && b != c && c == d && d == e => 2 * a + 3 * c,
                [a, b, c, d, e] if a == b && b == c && c != d && d == e => 3 * a + 2 * d,
                _ => 0,
            },
            Category::Chance => hand.sum(),
            Category::Yatzy => {
                if counts.count(hand.dice()[0]) == Hand::NUM_DICE as u8 {
                    50
                } else {
                    0
                }
            }
        }
    }
}
