use std::fmt;

use crate::combinatorics::REROLL_OPTIONS;
use crate::types::{Category, DiceCounts, GameState};

/// What a player can do with the dice in front of them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Action {
    Score(Category),
    /// Pick up these dice and roll them again, keeping the rest.
    Reroll(DiceCounts),
}

/// Every legal action: unfilled categories in declaration order, then, while rerolls remain,
/// every distinct nonempty selection of dice to reroll.
pub fn choices(state: &GameState) -> Vec<Action> {
    let mut actions: Vec<Action> = state.board().unfilled().map(Action::Score).collect();
    if state.is_terminal() || state.rerolls_left().get() == 0 {
        return actions;
    }
    actions.extend(
        REROLL_OPTIONS[state.hand().rank()]
            .iter()
            .map(|option| Action::Reroll(option.reroll)),
    );
    actions
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Score(category) => write!(f, "score {category}"),
            Action::Reroll(dice) => write!(f, "reroll {dice}"),
        }
    }
}
