use rand::Rng;
use thiserror::Error;

use crate::choices::Action;
use crate::types::{DiceCounts, Die, GameState, Hand, RerollsLeft, Scoreboard, ScoringError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("the game is over")]
    GameOver,
    #[error("no rerolls left this round")]
    NoRerollsLeft,
    #[error("a reroll needs at least one die")]
    EmptyReroll,
    #[error("cannot reroll {dice}, they are not all in the hand")]
    DiceNotInHand { dice: DiceCounts },
    #[error("rerolled {expected} dice but got {got} back")]
    OutcomeSize { expected: usize, got: usize },
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

fn roll_die<R: Rng + ?Sized>(rng: &mut R) -> Die {
    rng.random_range(1..=Hand::NUM_FACES as Die)
}

/// Rolls `n` dice.
pub fn roll_dice<R: Rng + ?Sized>(rng: &mut R, n: usize) -> DiceCounts {
    let faces: Vec<Die> = (0..n).map(|_| roll_die(rng)).collect();
    DiceCounts::tally(&faces)
}

impl Hand {
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let dice: [Die; Hand::NUM_DICE] = std::array::from_fn(|_| roll_die(rng));
        Hand::try_from(dice).expect("Every die is drawn from 1..=6, so this should not fail.")
    }
}

impl GameState {
    /// Starts a round on `board` with a fresh roll and every reroll available.
    pub fn start<R: Rng + ?Sized>(board: Scoreboard, rng: &mut R) -> Result<Self, MoveError> {
        if board.is_complete() {
            return Err(MoveError::GameOver);
        }
        Ok(Self::new(Hand::roll(rng), RerollsLeft::default(), board))
    }

    /// Picks up `reroll` and puts `outcome` down in its place.
    pub fn reroll_with(&self, reroll: &DiceCounts, outcome: &DiceCounts) -> Result<Self, MoveError> {
        if self.is_terminal() {
            return Err(MoveError::GameOver);
        }
        let rerolls_left = self.rerolls_left().spend().ok_or(MoveError::NoRerollsLeft)?;
        if reroll.is_empty() {
            return Err(MoveError::EmptyReroll);
        }
        let keep = self
            .hand()
            .counts()
            .checked_sub(reroll)
            .map_err(|_| MoveError::DiceNotInHand { dice: *reroll })?;
        if outcome.len() != reroll.len() {
            return Err(MoveError::OutcomeSize {
                expected: reroll.len(),
                got: outcome.len(),
            });
        }
        let hand = Hand::from_counts_unchecked(&keep.merged(outcome));
        Ok(Self::new(hand, rerolls_left, *self.board()))
    }

    /// Plays `action`. Scoring moves on to a freshly rolled round unless that was the last
    /// category, in which case the finished state is returned.
    pub fn apply<R: Rng + ?Sized>(&self, action: &Action, rng: &mut R) -> Result<Self, MoveError> {
        if self.is_terminal() {
            return Err(MoveError::GameOver);
        }
        match action {
            Action::Score(category) => {
                let board = self.board().select(*category, self.hand())?;
                if board.is_complete() {
                    Ok(Self::new(*self.hand(), self.rerolls_left(), board))
                } else {
                    Self::start(board, rng)
                }
            }
            Action::Reroll(dice) => {
                let outcome = roll_dice(rng, dice.len());
                self.reroll_with(dice, &outcome)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choices::choices;
    use crate::types::Category;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn dice(faces: &[Die]) -> DiceCounts {
        DiceCounts::try_from(faces).unwrap()
    }

    fn state(hand: &str, rerolls: u8) -> GameState {
        GameState::new(
            hand.parse().unwrap(),
            RerollsLeft::try_from(rerolls).unwrap(),
            Scoreboard::default(),
        )
    }

    #[test]
    fn rolled_hands_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let hand = Hand::roll(&mut rng);
            assert!(hand.dice().iter().all(|die| (1..=6).contains(die)));
            assert!(hand.dice().is_sorted());
        }
    }

    #[test]
    fn roll_dice_has_requested_size() {
        let mut rng = StdRng::seed_from_u64(1);
        for n in 0..=5 {
            assert_eq!(roll_dice(&mut rng, n).len(), n);
        }
    }

    #[test]
    fn reroll_with_replaces_dice() {
        let next = state("12333", 2)
            .reroll_with(&dice(&[1, 2]), &dice(&[3, 3]))
            .unwrap();
        assert_eq!(next.hand(), &"33333".parse::<Hand>().unwrap());
        assert_eq!(next.rerolls_left().get(), 1);
    }

    #[test]
    fn reroll_with_rejects_bad_moves() {
        assert_eq!(
            state("12333", 0).reroll_with(&dice(&[1]), &dice(&[6])),
            Err(MoveError::NoRerollsLeft)
        );
        assert_eq!(
            state("12333", 1).reroll_with(&dice(&[]), &dice(&[])),
            Err(MoveError::EmptyReroll)
        );
        assert_eq!(
            state("12333", 1).reroll_with(&dice(&[6]), &dice(&[1])),
            Err(MoveError::DiceNotInHand { dice: dice(&[6]) })
        );
        assert_eq!(
            state("12333", 1).reroll_with(&dice(&[1, 2]), &dice(&[1])),
            Err(MoveError::OutcomeSize {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn scoring_starts_next_round() {
        let mut rng = StdRng::seed_from_u64(3);
        let next = state("12333", 0)
            .apply(&Action::Score(Category::Threes), &mut rng)
            .unwrap();
        assert_eq!(next.board().get(Category::Threes), Some(9));
        assert_eq!(next.rerolls_left(), RerollsLeft::default());
        assert_eq!(next.round(), 1);
    }

    #[test]
    fn scoring_filled_category_fails() {
        let mut rng = StdRng::seed_from_u64(3);
        let board = Scoreboard::default().record(Category::Chance, 20).unwrap();
        let s = GameState::new("12333".parse().unwrap(), RerollsLeft::default(), board);
        assert_eq!(
            s.apply(&Action::Score(Category::Chance), &mut rng),
            Err(MoveError::Scoring(ScoringError::AlreadyFilled {
                category: Category::Chance
            }))
        );
    }

    #[test]
    fn full_game_lasts_fifteen_rounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut s = GameState::start(Scoreboard::default(), &mut rng).unwrap();
        let mut scored = 0;
        while !s.is_terminal() {
            let action = *choices(&s).last().unwrap();
            if matches!(action, Action::Score(_)) {
                scored += 1;
            }
            s = s.apply(&action, &mut rng).unwrap();
        }
        assert_eq!(scored, 15);
        assert_eq!(
            s.apply(&Action::Score(Category::Ones), &mut rng),
            Err(MoveError::GameOver)
        );
        assert_eq!(
            GameState::start(*s.board(), &mut rng),
            Err(MoveError::GameOver)
        );
    }
}
