use std::fmt;
use std::str::FromStr;

use enum_map::{Enum, EnumMap};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount, EnumIter, EnumString};
use thiserror::Error;

/// A single die face on 1..=6.
pub type Die = u8;

pub const UPPER_SECTION_BONUS: u16 = 50;

/// Five dice, always stored in non-decreasing order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Hand([Die; Hand::NUM_DICE]);

/// A multiset of at most five dice, stored as per-face counts.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct DiceCounts([u8; Hand::NUM_FACES]);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RerollsLeft(u8);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DiceState {
    pub hand: Hand,
    pub rerolls_left: RerollsLeft,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Enum, EnumIter, EnumCount, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Ones,
    Twos,
    Threes,
    Fours,
    Fives,
    Sixes,
    OnePair,
    TwoPairs,
    ThreeOfAKind,
    FourOfAKind,
    SmallStraight,
    LargeStraight,
    FullHouse,
    Chance,
    Yatzy,
}

/// The recorded points of every category, `None` while unfilled.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Scoreboard {
    slots: EnumMap<Category, Option<u8>>,
}

/// The part of a scoreboard that the rest of the game depends on: which categories are
/// filled, and how far the upper section is towards the bonus.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct ScorecardState {
    pub capped_upper_section_score: CappedUpperSectionScore,
    score_category_state: EnumMap<Category, ScoreCategoryState>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct CappedUpperSectionScore(u8);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Hash)]
pub enum ScoreCategoryState {
    #[default]
    Unscored,
    Scored,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GameState {
    hand: Hand,
    rerolls_left: RerollsLeft,
    board: Scoreboard,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConstructionError {
    #[error("value {got} exceeds the maximum of {max}")]
    ValueTooLarge { max: u8, got: u8 },
    #[error("expected {expected} dice, got {got}")]
    SumMismatch { expected: usize, got: usize },
    #[error("die face {got} is outside 1..=6")]
    FaceOutOfRange { got: u8 },
    #[error("cannot take a {face} away, there are not enough of them")]
    Underflow { face: Die },
    #[error("cannot roll {got} dice, expected between 1 and 5")]
    InvalidRollSize { got: usize },
    #[error("unknown category `{0}`")]
    UnknownCategory(String),
    #[error("category {0} appears more than once")]
    DuplicateCategory(Category),
    #[error("malformed input `{0}`")]
    Malformed(String),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum ScoringError {
    #[error("category {category} is already filled")]
    AlreadyFilled { category: Category },
}

impl Hand {
    pub const NUM_DICE: usize = 5;
    pub const NUM_FACES: usize = 6;

    pub fn dice(&self) -> &[Die; Self::NUM_DICE] {
        &self.0
    }

    pub fn counts(&self) -> DiceCounts {
        DiceCounts::tally(&self.0)
    }

    pub fn sum(&self) -> u8 {
        self.0.iter().sum()
    }

    /// Caller guarantees the counts add up to exactly five dice.
    pub(crate) fn from_counts_unchecked(counts: &[u8; Self::NUM_FACES]) -> Self {
        let mut dice = [0; Self::NUM_DICE];
        let mut i = 0;
        for (face, &count) in (1..).zip(counts.iter()) {
            for _ in 0..count {
                dice[i] = face;
                i += 1;
            }
        }
        Self(dice)
    }
}

impl TryFrom<[Die; Hand::NUM_DICE]> for Hand {
    type Error = ConstructionError;

    fn try_from(mut dice: [Die; Hand::NUM_DICE]) -> Result<Self, Self::Error> {
        if let Some(&got) = dice.iter().find(|&&die| !(1..=6).contains(&die)) {
            return Err(Self::Error::FaceOutOfRange { got });
        }
        dice.sort_unstable();
        Ok(Self(dice))
    }
}

impl TryFrom<&[Die]> for Hand {
    type Error = ConstructionError;

    fn try_from(dice: &[Die]) -> Result<Self, Self::Error> {
        let array: [Die; Hand::NUM_DICE] =
            dice.try_into().map_err(|_| Self::Error::SumMismatch {
                expected: Hand::NUM_DICE,
                got: dice.len(),
            })?;
        Self::try_from(array)
    }
}

impl TryFrom<&DiceCounts> for Hand {
    type Error = ConstructionError;

    fn try_from(counts: &DiceCounts) -> Result<Self, Self::Error> {
        if counts.len() != Hand::NUM_DICE {
            return Err(Self::Error::SumMismatch {
                expected: Hand::NUM_DICE,
                got: counts.len(),
            });
        }
        Ok(Self::from_counts_unchecked(counts.counts()))
    }
}

impl FromStr for Hand {
    type Err = ConstructionError;

    /// Accepts `1,2,3,3,3`, `1 2 3 3 3` or `12333`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ConstructionError::Malformed(s.to_string());
        let trimmed = s.trim();
        let is_separator = |c: char| c == ',' || c.is_whitespace();
        let dice = if trimmed.contains(is_separator) {
            trimmed
                .split(is_separator)
                .filter(|token| !token.is_empty())
                .map(|token| token.parse::<Die>().map_err(|_| malformed()))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            trimmed
                .chars()
                .map(|c| c.to_digit(10).map(|d| d as Die).ok_or_else(malformed))
                .collect::<Result<Vec<_>, _>>()?
        };
        Self::try_from(dice.as_slice())
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_faces(f, &self.0)
    }
}

impl DiceCounts {
    pub fn counts(&self) -> &[u8; Hand::NUM_FACES] {
        &self.0
    }

    /// How many dice show `face`. Faces outside 1..=6 never appear.
    pub fn count(&self, face: Die) -> u8 {
        match face {
            1..=6 => self.0[face as usize - 1],
            _ => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(|&c| c as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The dice in non-decreasing order.
    pub fn faces(&self) -> Vec<Die> {
        (1..)
            .zip(self.0.iter())
            .flat_map(|(face, &count)| std::iter::repeat_n(face, count as usize))
            .collect()
    }

    pub fn checked_sub(&self, other: &DiceCounts) -> Result<DiceCounts, ConstructionError> {
        let mut result = self.0;
        for (i, slot) in result.iter_mut().enumerate() {
            *slot = slot
                .checked_sub(other.0[i])
                .ok_or(ConstructionError::Underflow { face: i as Die + 1 })?;
        }
        Ok(Self(result))
    }

    /// Per-face sum. Callers keep the total at or below five dice.
    pub(crate) fn merged(&self, other: &DiceCounts) -> [u8; Hand::NUM_FACES] {
        let mut result = self.0;
        for (slot, &count) in result.iter_mut().zip(other.0.iter()) {
            *slot += count;
        }
        result
    }

    /// Faces must already be on 1..=6.
    pub(crate) fn tally(faces: &[Die]) -> Self {
        let mut counts = [0; Hand::NUM_FACES];
        for &face in faces {
            counts[face as usize - 1] += 1;
        }
        Self(counts)
    }

    pub(crate) const fn new_unchecked(counts: [u8; Hand::NUM_FACES]) -> Self {
        Self(counts)
    }
}

impl TryFrom<[u8; Hand::NUM_FACES]> for DiceCounts {
    type Error = ConstructionError;

    fn try_from(value: [u8; Hand::NUM_FACES]) -> Result<Self, Self::Error> {
        if let Some(&got) = value.iter().find(|&&x| x > Hand::NUM_DICE as u8) {
            Err(Self::Error::ValueTooLarge {
                max: Hand::NUM_DICE as u8,
                got,
            })
        } else if value.iter().map(|&x| x as usize).sum::<usize>() > Hand::NUM_DICE {
            Err(Self::Error::SumMismatch {
                expected: Hand::NUM_DICE,
                got: value.iter().map(|&x| x as usize).sum(),
            })
        } else {
            Ok(Self(value))
        }
    }
}

impl TryFrom<&[Die]> for DiceCounts {
    type Error = ConstructionError;

    fn try_from(faces: &[Die]) -> Result<Self, Self::Error> {
        if faces.len() > Hand::NUM_DICE {
            return Err(Self::Error::SumMismatch {
                expected: Hand::NUM_DICE,
                got: faces.len(),
            });
        }
        if let Some(&got) = faces.iter().find(|&&die| !(1..=6).contains(&die)) {
            return Err(Self::Error::FaceOutOfRange { got });
        }
        Ok(Self::tally(faces))
    }
}

impl fmt::Display for DiceCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_faces(f, &self.faces())
    }
}

fn write_faces(f: &mut fmt::Formatter<'_>, faces: &[Die]) -> fmt::Result {
    for (i, face) in faces.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{face}")?;
    }
    Ok(())
}

impl RerollsLeft {
    pub const MAX: u8 = 2;

    pub fn get(&self) -> u8 {
        self.0
    }

    /// One reroll fewer, or `None` when none are left.
    pub fn spend(&self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..=Self::MAX).map(Self)
    }
}

impl Default for RerollsLeft {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl TryFrom<u8> for RerollsLeft {
    type Error = ConstructionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MAX {
            Err(Self::Error::ValueTooLarge {
                max: Self::MAX,
                got: value,
            })
        } else {
            Ok(Self(value))
        }
    }
}

impl DiceState {
    pub fn new(hand: Hand, rerolls_left: RerollsLeft) -> Self {
        Self { hand, rerolls_left }
    }
}

impl Category {
    pub fn is_upper_section(&self) -> bool {
        self.upper_face().is_some()
    }

    pub fn is_lower_section(&self) -> bool {
        !self.is_upper_section()
    }

    /// The face counted by an upper-section category.
    pub fn upper_face(&self) -> Option<Die> {
        match self {
            Category::Ones => Some(1),
            Category::Twos => Some(2),
            Category::Threes => Some(3),
            Category::Fours => Some(4),
            Category::Fives => Some(5),
            Category::Sixes => Some(6),
            _ => None,
        }
    }
}

impl Scoreboard {
    pub fn get(&self, category: Category) -> Option<u8> {
        self.slots[category]
    }

    pub fn is_filled(&self, category: Category) -> bool {
        self.slots[category].is_some()
    }

    pub fn unfilled(&self) -> impl Iterator<Item = Category> {
        Category::iter().filter(move |&category| !self.is_filled(category))
    }

    /// Number of filled categories, which is also the number of rounds played.
    pub fn round(&self) -> usize {
        self.slots.values().filter(|slot| slot.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.round() == Category::COUNT
    }

    pub fn upper_section_sum(&self) -> u16 {
        self.slots
            .iter()
            .filter(|(category, _)| category.is_upper_section())
            .filter_map(|(_, slot)| slot.map(u16::from))
            .sum()
    }

    /// Sum of the recorded points, without the bonus.
    pub fn raw_sum(&self) -> u16 {
        self.slots.values().filter_map(|slot| slot.map(u16::from)).sum()
    }

    pub fn has_bonus(&self) -> bool {
        self.upper_section_sum() >= CappedUpperSectionScore::CAP as u16
    }

    pub fn final_score(&self) -> u16 {
        let bonus = if self.has_bonus() {
            UPPER_SECTION_BONUS
        } else {
            0
        };
        self.raw_sum() + bonus
    }

    /// Records `points` in an unfilled category.
    pub fn record(&self, category: Category, points: u8) -> Result<Self, ScoringError> {
        if self.is_filled(category) {
            return Err(ScoringError::AlreadyFilled { category });
        }
        let mut slots = self.slots;
        slots[category] = Some(points);
        Ok(Self { slots })
    }

    /// Scores `hand` in `category`.
    pub fn select(&self, category: Category, hand: &Hand) -> Result<Self, ScoringError> {
        self.record(category, category.score(hand))
    }

    pub fn scorecard_state(&self) -> ScorecardState {
        ScorecardState::from(self)
    }
}

impl FromStr for Scoreboard {
    type Err = ConstructionError;

    /// Parses `ones=0,threes=15`. The empty string is the empty board.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut board = Scoreboard::default();
        for entry in s.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let (name, points) = entry
                .split_once('=')
                .ok_or_else(|| ConstructionError::Malformed(entry.to_string()))?;
            let name = name.trim();
            let category = Category::from_str(name)
                .map_err(|_| ConstructionError::UnknownCategory(name.to_string()))?;
            let points = points
                .trim()
                .parse::<u8>()
                .map_err(|_| ConstructionError::Malformed(entry.to_string()))?;
            board = board
                .record(category, points)
                .map_err(|_| ConstructionError::DuplicateCategory(category))?;
        }
        Ok(board)
    }
}

impl fmt::Display for Scoreboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (category, slot) in self.slots.iter() {
            if let Some(points) = slot {
                if !first {
                    f.write_str(",")?;
                }
                write!(f, "{category}={points}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl ScorecardState {
    pub fn score_category_state(&self) -> &EnumMap<Category, ScoreCategoryState> {
        &self.score_category_state
    }

    pub fn score(&self, category: Category, points: u8) -> Result<Self, ScoringError> {
        if self.score_category_state[category] != ScoreCategoryState::Unscored {
            return Err(ScoringError::AlreadyFilled { category });
        }
        Ok(self.fill(category, points))
    }

    fn fill(&self, category: Category, points: u8) -> Self {
        let mut next = *self;
        next.score_category_state[category] = ScoreCategoryState::Scored;
        if category.is_upper_section() {
            next.capped_upper_section_score = next.capped_upper_section_score.add_clamped(points);
        }
        next.normalized()
    }

    /// Once the bonus is out of reach the upper-section progress no longer matters, so every
    /// such state collapses onto a score of zero.
    fn normalized(mut self) -> Self {
        if self.capped_upper_section_score.score() + self.max_remaining_upper_section_score()
            < CappedUpperSectionScore::CAP
        {
            self.capped_upper_section_score = CappedUpperSectionScore::default();
        }
        self
    }

    pub fn unscored(&self) -> impl Iterator<Item = Category> {
        Category::iter()
            .filter(move |&category| self.score_category_state[category] == ScoreCategoryState::Unscored)
    }

    pub fn filled_count(&self) -> usize {
        Category::COUNT - self.unscored().count()
    }

    pub fn is_terminal(&self) -> bool {
        self.unscored().next().is_none()
    }

    pub fn max_remaining_upper_section_score(&self) -> u8 {
        self.unscored()
            .filter_map(|category| category.upper_face())
            .map(|face| face * Hand::NUM_DICE as u8)
            .sum()
    }

    pub fn bonus_secured(&self) -> bool {
        self.capped_upper_section_score.score() == CappedUpperSectionScore::CAP
    }

    /// Every distinct state one scored category away. Lower-section points never change the
    /// state, so a single representative is enough for them.
    pub fn successors(&self) -> Vec<Self> {
        let mut successors = Vec::new();
        for category in self.unscored() {
            let candidate_points: Vec<u8> = match category.upper_face() {
                Some(face) => (0..=Hand::NUM_DICE as u8).map(|n| n * face).collect(),
                None => vec![0],
            };
            for points in candidate_points {
                let next = self.fill(category, points);
                if !successors.contains(&next) {
                    successors.push(next);
                }
            }
        }
        successors
    }
}

impl From<&Scoreboard> for ScorecardState {
    fn from(board: &Scoreboard) -> Self {
        let mut state = Self::default();
        for (category, slot) in board.slots.iter() {
            if slot.is_some() {
                state.score_category_state[category] = ScoreCategoryState::Scored;
            }
        }
        let upper = board.upper_section_sum().min(CappedUpperSectionScore::CAP as u16) as u8;
        state.capped_upper_section_score = CappedUpperSectionScore(upper);
        state.normalized()
    }
}

impl CappedUpperSectionScore {
    pub const CAP: u8 = 63;

    pub fn score(&self) -> u8 {
        self.0
    }

    pub fn add_clamped(&self, other: u8) -> Self {
        let clamped_other = std::cmp::min(other, Self::CAP);
        Self(std::cmp::min(self.0 + clamped_other, Self::CAP))
    }
}

impl TryFrom<u8> for CappedUpperSectionScore {
    type Error = ConstructionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::CAP {
            Err(Self::Error::ValueTooLarge {
                max: Self::CAP,
                got: value,
            })
        } else {
            Ok(Self(value))
        }
    }
}

impl GameState {
    pub fn new(hand: Hand, rerolls_left: RerollsLeft, board: Scoreboard) -> Self {
        Self {
            hand,
            rerolls_left,
            board,
        }
    }

    pub fn hand(&self) -> &Hand {
        &self.hand
    }

    pub fn rerolls_left(&self) -> RerollsLeft {
        self.rerolls_left
    }

    pub fn board(&self) -> &Scoreboard {
        &self.board
    }

    pub fn dice_state(&self) -> DiceState {
        DiceState::new(self.hand, self.rerolls_left)
    }

    pub fn round(&self) -> usize {
        self.board.round()
    }

    pub fn rounds_remaining(&self) -> usize {
        Category::COUNT - self.board.round()
    }

    pub fn is_terminal(&self) -> bool {
        self.board.is_complete()
    }
}
