//! Exact backward induction over the whole game.
//!
//! Values are stored as *future* points: the expected points still to be earned from a
//! scorecard onwards, upper-section bonus included. The points already on the board are
//! added back at the public entry points, which is sound because the future depends on the
//! board only through its [`ScorecardState`].

use std::collections::VecDeque;
use std::sync::LazyLock;
use std::time::Instant;

use num_bigint::BigInt;
use num_rational::{BigRational, Ratio};
use num_traits::Zero;
use rayon::ThreadPool;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use strum::EnumCount;
use thiserror::Error;
use tracing::{debug, info};

use crate::choices::{Action, choices};
use crate::combinatorics::{DISTINCT_KEEPS, HANDS, REROLL_OPTIONS};
use crate::config::EngineConfig;
use crate::types::{
    Category, ConstructionError, DiceCounts, DiceState, GameState, Hand, RerollsLeft,
    ScorecardState, Scoreboard, ScoringError, UPPER_SECTION_BONUS,
};
use crate::{MapMemo, Memo, VecMemo, dice_state_index};

pub type Value = BigRational;
/// Future value of every dice state under one scorecard.
pub type Widget = VecMemo<DiceState, Value>;

/// Chance of each hand on a fresh roll of five dice, indexed by rank.
static HAND_PROBABILITIES: LazyLock<Vec<Value>> =
    LazyLock::new(|| HANDS.iter().map(|hand| to_value(hand.probability())).collect());

/// For the dice kept, the rank of every hand reachable by rerolling the rest and its
/// probability.
static KEEP_TRANSITIONS: LazyLock<VecMemo<DiceCounts, Vec<(usize, Value)>>> =
    LazyLock::new(precompute_keep_transitions);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Precondition(#[from] ConstructionError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("unreachable state: {0}")]
    Unreachable(String),
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStats {
    /// Scorecards with a known round-start value.
    pub round_start: usize,
    /// Scorecards with a retained widget.
    pub full_state: usize,
}

/// Owns both caches. Round-start values are keyed by scorecard; full-state values live in a
/// widget per scorecard, kept only for scorecards that were asked about directly.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    pool: Option<ThreadPool>,
    round_start: MapMemo<ScorecardState, Value>,
    full_state: MapMemo<ScorecardState, Widget>,
}

fn to_value(p: Ratio<u32>) -> Value {
    Value::new(BigInt::from(*p.numer()), BigInt::from(*p.denom()))
}

fn points(points: impl Into<BigInt>) -> Value {
    Value::from_integer(points.into())
}

fn precompute_keep_transitions() -> VecMemo<DiceCounts, Vec<(usize, Value)>> {
    let mut memo: VecMemo<DiceCounts, Vec<(usize, Value)>> = VecMemo::new();
    for raw_keep in DISTINCT_KEEPS {
        let keep = DiceCounts::new_unchecked(raw_keep);
        if keep.len() == Hand::NUM_DICE {
            continue;
        }
        let transitions = HANDS
            .iter()
            .enumerate()
            .filter_map(|(rank, hand)| {
                let p = hand.probability_given_keep(&keep);
                (!p.is_zero()).then(|| (rank, to_value(p)))
            })
            .collect();
        memo.set(keep, transitions);
    }
    memo
}

/// Future value of a finished scorecard: the bonus, if it was reached.
fn terminal_future(scorecard: &ScorecardState) -> Value {
    if scorecard.bonus_secured() {
        points(UPPER_SECTION_BONUS)
    } else {
        Value::zero()
    }
}

/// Points for scoring `hand` in `category` plus the future of the scorecard that follows.
fn score_value<S: Memo<ScorecardState, Value>>(
    scorecard: &ScorecardState,
    category: Category,
    hand: &Hand,
    round_start: &S,
) -> Result<Value, EngineError> {
    let category_points = category.score(hand);
    let next = scorecard.score(category, category_points)?;
    let future = if next.is_terminal() {
        terminal_future(&next)
    } else {
        round_start.get(&next).cloned().ok_or_else(|| {
            EngineError::Unreachable(format!(
                "round-start value of {next:?} was needed before it was solved"
            ))
        })?
    };
    Ok(future + points(category_points))
}

fn best_score_value<S: Memo<ScorecardState, Value>>(
    scorecard: &ScorecardState,
    hand: &Hand,
    round_start: &S,
) -> Result<Value, EngineError> {
    let mut best: Option<Value> = None;
    for category in scorecard.unscored() {
        let value = score_value(scorecard, category, hand, round_start)?;
        if best.as_ref().is_none_or(|b| value > *b) {
            best = Some(value);
        }
    }
    best.ok_or_else(|| EngineError::Unreachable(format!("{scorecard:?} has nothing left to score")))
}

/// Expected future after keeping `keep` and rerolling the rest, with `rerolls_left` rerolls
/// remaining once the dice land.
fn keep_value(keep: &DiceCounts, rerolls_left: u8, widget: &Widget) -> Value {
    let transitions = KEEP_TRANSITIONS
        .get(keep)
        .expect("Every multiset of at most four dice has its transitions precomputed.");
    let mut ev = Value::zero();
    for (target_rank, p) in transitions {
        let target = widget
            .raw_get(dice_state_index(*target_rank, rerolls_left))
            .expect("Our dice DP is working backwards, so every valid transition must be accounted for.");
        ev += p * target;
    }
    ev
}

fn round_start_from_widget(widget: &Widget) -> Value {
    let mut ev = Value::zero();
    for (rank, p) in HAND_PROBABILITIES.iter().enumerate() {
        let value = widget
            .raw_get(dice_state_index(rank, RerollsLeft::MAX))
            .expect("A finished widget covers every dice state.");
        ev += p * value;
    }
    ev
}

/// Solves one round under `scorecard_state`, returning the future value of every dice state.
///
/// Requires the round-start value of every non-terminal successor scorecard to be in
/// `round_start` already.
///
/// * `scorecard_state` - The state to solve the dice DP on. Must not be terminal.
/// * `round_start` - The current memo of ScorecardState -> future value.
pub fn dice_dp<S: Memo<ScorecardState, Value>>(
    scorecard_state: &ScorecardState,
    round_start: &S,
) -> Result<Widget, EngineError> {
    let mut widget = Widget::new();
    // Scoring is allowed at every reroll count, so it seeds all three levels.
    for hand in HANDS.iter() {
        let best = best_score_value(scorecard_state, hand, round_start)?;
        for rerolls_left in RerollsLeft::all() {
            widget.set(DiceState::new(*hand, rerolls_left), best.clone());
        }
    }
    for rerolls_left in RerollsLeft::all().skip(1) {
        let after_reroll = rerolls_left
            .spend()
            .expect("Level zero was skipped, so a reroll is always left.")
            .get();
        // Many hands share a kept multiset; evaluate each once per level.
        let mut keep_memo: MapMemo<DiceCounts, Value> = MapMemo::new();
        for (rank, hand) in HANDS.iter().enumerate() {
            let dice_state = DiceState::new(*hand, rerolls_left);
            let mut best = widget
                .get(&dice_state)
                .cloned()
                .expect("We initialised the widget with every dice state.");
            for option in &REROLL_OPTIONS[rank] {
                let ev = match keep_memo.get(&option.keep) {
                    Some(ev) => ev.clone(),
                    None => {
                        let ev = keep_value(&option.keep, after_reroll, &widget);
                        keep_memo.set(option.keep, ev.clone());
                        ev
                    }
                };
                if ev > best {
                    best = ev;
                }
            }
            widget.set(dice_state, best);
        }
    }
    Ok(widget)
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            pool: None,
            round_start: MapMemo::new(),
            full_state: MapMemo::new(),
        }
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            pool: config.build_pool()?,
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Exact expected final score of `state` under optimal play.
    pub fn value(&mut self, state: &GameState) -> Result<Value, EngineError> {
        let board = state.board();
        if state.is_terminal() {
            return Ok(points(board.final_score()));
        }
        let scorecard = board.scorecard_state();
        self.ensure_widget(&scorecard)?;
        let widget = self
            .full_state
            .get(&scorecard)
            .expect("ensure_widget stores the widget.");
        let future = widget
            .get(&state.dice_state())
            .cloned()
            .expect("A finished widget covers every dice state.");
        Ok(points(board.raw_sum()) + future)
    }

    /// Expected final score of `board` at the start of a round, before any dice are rolled.
    pub fn round_start_value(&mut self, board: &Scoreboard) -> Result<Value, EngineError> {
        if board.is_complete() {
            return Ok(points(board.final_score()));
        }
        let scorecard = board.scorecard_state();
        if self.round_start.get(&scorecard).is_none() {
            let stages = self.unsolved_stages(&scorecard);
            self.solve_stages(stages)?;
        }
        let future = self.round_start.get(&scorecard).cloned().ok_or_else(|| {
            EngineError::Unreachable(format!("{scorecard:?} was not solved by its own precompute"))
        })?;
        Ok(points(board.raw_sum()) + future)
    }

    /// Expected final score after each legal action, in the order of [`choices`].
    pub fn candidates(&mut self, state: &GameState) -> Result<Vec<(Action, Value)>, EngineError> {
        if state.is_terminal() {
            return Ok(Vec::new());
        }
        let scorecard = state.board().scorecard_state();
        self.ensure_widget(&scorecard)?;
        let widget = self
            .full_state
            .get(&scorecard)
            .expect("ensure_widget stores the widget.");
        let raw = points(state.board().raw_sum());
        let hand = state.hand();

        let mut candidates = Vec::new();
        for action in choices(state) {
            let future = match action {
                Action::Score(category) => {
                    score_value(&scorecard, category, hand, &self.round_start)?
                }
                Action::Reroll(dice) => {
                    let keep = hand.counts().checked_sub(&dice)?;
                    let after_reroll = state
                        .rerolls_left()
                        .spend()
                        .ok_or_else(|| {
                            EngineError::Unreachable(
                                "reroll offered with no rerolls left".to_string(),
                            )
                        })?
                        .get();
                    keep_value(&keep, after_reroll, widget)
                }
            };
            candidates.push((action, &raw + future));
        }
        Ok(candidates)
    }

    /// The optimal action and its value. The first maximal candidate wins ties.
    pub fn best_action(&mut self, state: &GameState) -> Result<Option<(Action, Value)>, EngineError> {
        let mut best: Option<(Action, Value)> = None;
        for (action, value) in self.candidates(state)? {
            if best.as_ref().is_none_or(|(_, b)| value > *b) {
                best = Some((action, value));
            }
        }
        Ok(best)
    }

    /// Solves the round-start value of every scorecard reachable from `board`, one stage of
    /// equally filled scorecards at a time. Returns how many were newly solved.
    pub fn precompute(&mut self, board: &Scoreboard) -> Result<usize, EngineError> {
        if board.is_complete() {
            return Ok(0);
        }
        let stages = self.unsolved_stages(&board.scorecard_state());
        self.solve_stages(stages)
    }

    pub fn clear(&mut self) {
        self.round_start.clear();
        self.full_state.clear();
    }

    /// Solved round-start futures, in the shape [`dice_dp`] expects.
    pub fn round_start_memo(&self) -> &MapMemo<ScorecardState, Value> {
        &self.round_start
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            round_start: self.round_start.len(),
            full_state: self.full_state.len(),
        }
    }

    fn ensure_widget(&mut self, scorecard: &ScorecardState) -> Result<(), EngineError> {
        if self.full_state.get(scorecard).is_some() {
            return Ok(());
        }
        let mut stages = self.unsolved_stages(scorecard);
        // The root is alone in the least filled stage, and its widget is built below.
        if stages.last().is_some_and(|stage| stage.contains(scorecard)) {
            stages.pop();
        }
        self.solve_stages(stages)?;

        let widget = dice_dp(scorecard, &self.round_start)?;
        if self.round_start.get(scorecard).is_none() {
            self.round_start
                .set(*scorecard, round_start_from_widget(&widget));
        }
        debug!(
            filled = scorecard.filled_count(),
            upper = scorecard.capped_upper_section_score.score(),
            "retained widget"
        );
        self.full_state.set(*scorecard, widget);
        Ok(())
    }

    /// Unsolved non-terminal scorecards reachable from `root`, grouped by filled count, most
    /// filled first. A solved scorecard's successors are all solved, so the search stops there.
    fn unsolved_stages(&self, root: &ScorecardState) -> Vec<Vec<ScorecardState>> {
        let is_unsolved = |state: &ScorecardState| {
            !state.is_terminal() && self.round_start.get(state).is_none()
        };
        let mut stages: Vec<Vec<ScorecardState>> = vec![Vec::new(); Category::COUNT];
        if !is_unsolved(root) {
            return Vec::new();
        }
        let mut seen: FxHashSet<ScorecardState> = FxHashSet::default();
        let mut queue = VecDeque::from([*root]);
        seen.insert(*root);
        while let Some(state) = queue.pop_front() {
            stages[state.filled_count()].push(state);
            for next in state.successors() {
                if is_unsolved(&next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        stages
            .into_iter()
            .rev()
            .filter(|stage| !stage.is_empty())
            .collect()
    }

    fn solve_stages(&mut self, stages: Vec<Vec<ScorecardState>>) -> Result<usize, EngineError> {
        let mut solved = 0;
        for stage in stages {
            let started = Instant::now();
            let filled = stage.first().map_or(0, ScorecardState::filled_count);
            // Every worker only reads later stages; results are published after the barrier.
            let values = self.solve_stage(&stage)?;
            for (state, value) in values {
                self.round_start.set(state, value);
            }
            solved += stage.len();
            info!(
                filled,
                states = stage.len(),
                elapsed = ?started.elapsed(),
                "solved stage"
            );
        }
        Ok(solved)
    }

    fn solve_stage(
        &self,
        stage: &[ScorecardState],
    ) -> Result<Vec<(ScorecardState, Value)>, EngineError> {
        let round_start = &self.round_start;
        let solve = |state: &ScorecardState| -> Result<(ScorecardState, Value), EngineError> {
            let widget = dice_dp(state, round_start)?;
            debug!(
                filled = state.filled_count(),
                upper = state.capped_upper_section_score.score(),
                "solved round start"
            );
            Ok((*state, round_start_from_widget(&widget)))
        };
        if !self.config.parallel || stage.len() == 1 {
            return stage.iter().map(&solve).collect();
        }
        match &self.pool {
            Some(pool) => pool.install(|| stage.par_iter().map(&solve).collect()),
            None => stage.par_iter().map(&solve).collect(),
        }
    }
}
