//! Exact values from the reference computation. Any change here is a change in the rules.

use num_bigint::BigInt;
use yatzy_ev::types::{Category, GameState, Hand, RerollsLeft, Scoreboard};
use yatzy_ev::{Action, Engine, EngineConfig, Value};

const LATE_BOARD: &str = "ones=0,threes=15,fours=20,fives=25,sixes=0,one_pair=0,\
                          two_pairs=0,three_of_a_kind=0,four_of_a_kind=0,\
                          small_straight=0,large_straight=0,full_house=0,chance=0";

fn board(extra: &str) -> Scoreboard {
    if extra.is_empty() {
        LATE_BOARD.parse().unwrap()
    } else {
        format!("{LATE_BOARD},{extra}").parse().unwrap()
    }
}

fn state(dice: &str, rerolls: u8, board: Scoreboard) -> GameState {
    GameState::new(
        dice.parse::<Hand>().unwrap(),
        RerollsLeft::try_from(rerolls).unwrap(),
        board,
    )
}

fn ratio(text: &str) -> Value {
    let (numer, denom) = text.split_once('/').unwrap();
    Value::new(
        numer.parse::<BigInt>().unwrap(),
        denom.parse::<BigInt>().unwrap(),
    )
}

#[test]
fn two_rounds_left_state() {
    let mut engine = Engine::default();
    let value = engine.value(&state("12333", 2, board(""))).unwrap();
    assert_eq!(value, ratio("5600043843528996095/49358138940850176"));
}

#[test]
fn two_rounds_left_round_start() {
    let mut engine = Engine::default();
    let value = engine.round_start_value(&board("")).unwrap();
    assert_eq!(value, ratio("97234186447978735018445/863569998909114679296"));
}

#[test]
fn only_yatzy_left() {
    let mut engine = Engine::default();
    let value = engine.round_start_value(&board("twos=4")).unwrap();
    assert_eq!(value, ratio("439518929/3779136"));
}

#[test]
fn only_twos_left() {
    let mut engine = Engine::default();
    let value = engine.round_start_value(&board("yatzy=50")).unwrap();
    assert_eq!(value, ratio("8766298916615/58773123072"));
}

#[test]
fn only_twos_left_mid_round() {
    let mut engine = Engine::default();
    let s = state("22256", 1, board("yatzy=50"));
    assert_eq!(engine.value(&s).unwrap(), ratio("500/3"));

    let (action, value) = engine.best_action(&s).unwrap().unwrap();
    let five_six = yatzy_ev::types::DiceCounts::try_from(&[5u8, 6][..]).unwrap();
    assert_eq!(action, Action::Reroll(five_six));
    assert_eq!(value, ratio("500/3"));
}

#[test]
fn no_rerolls_left() {
    let mut engine = Engine::default();
    let s = state("22226", 0, board(""));
    assert_eq!(engine.value(&s).unwrap(), ratio("454635473/3779136"));
    let candidates = engine.candidates(&s).unwrap();
    assert_eq!(candidates.len(), 2);
    assert!(
        candidates
            .iter()
            .all(|(action, _)| matches!(action, Action::Score(Category::Twos | Category::Yatzy)))
    );
}

#[test]
fn value_is_idempotent() {
    let mut engine = Engine::default();
    let s = state("12333", 2, board(""));
    let first = engine.value(&s).unwrap();
    let second = engine.value(&s).unwrap();
    assert_eq!(first, second);
    assert_eq!(s, state("12333", 2, board("")));
}

#[test]
fn precompute_solves_every_reachable_scorecard() {
    let mut engine = Engine::new(EngineConfig::sequential()).unwrap();
    // The root, yatzy filled, and twos filled with the bonus either lost or secured.
    assert_eq!(engine.precompute(&board("")).unwrap(), 4);
    assert_eq!(
        engine.round_start_value(&board("")).unwrap(),
        ratio("97234186447978735018445/863569998909114679296")
    );
}

#[test]
fn parallel_and_sequential_agree() {
    // Twos, one_pair, chance and yatzy still open.
    let start: Scoreboard = "ones=0,threes=15,fours=20,fives=25,sixes=0,two_pairs=0,\
                             three_of_a_kind=0,four_of_a_kind=0,small_straight=0,\
                             large_straight=0,full_house=0"
        .parse()
        .unwrap();

    let mut sequential = Engine::new(EngineConfig::sequential()).unwrap();
    let mut parallel = Engine::new(EngineConfig {
        parallel: true,
        threads: Some(2),
    })
    .unwrap();
    let solved = sequential.precompute(&start).unwrap();
    assert_eq!(parallel.precompute(&start).unwrap(), solved);
    assert_eq!(
        sequential.round_start_value(&start).unwrap(),
        parallel.round_start_value(&start).unwrap()
    );
    let s = state("11366", 2, start);
    assert_eq!(sequential.value(&s).unwrap(), parallel.value(&s).unwrap());
}

#[test]
fn clear_resets_caches() {
    let mut engine = Engine::default();
    let before = engine.round_start_value(&board("twos=4")).unwrap();
    assert!(engine.stats().round_start > 0);
    engine.clear();
    assert_eq!(engine.stats().round_start, 0);
    assert_eq!(engine.round_start_value(&board("twos=4")).unwrap(), before);
}
