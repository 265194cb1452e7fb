//! End-to-end solver checks: an independent brute-force expectimax on a
//! small game, determinism, resumption from a saved partial table, and the
//! published optimal value of the standard game.

use std::io::Cursor;

use rustc_hash::FxHashMap;
use yahtzee_solver::{
    all_unused_categories, keep_all_subrolls, load_values, save_values, solve, Anchor, Category,
    DiceRoll, JokerRule, RuleParams, ScoringKind, Valuation, YahtzeeFlag, YahtzeeRules,
};

/// Two three-sided dice, one reroll, three upper categories plus chance and
/// a five-of-a-kind slot. Small enough for naive game-tree evaluation.
fn mini_rules() -> YahtzeeRules {
    let params = RuleParams {
        dice_count: 2,
        sides: 3,
        rerolls: 1,
        bonus_threshold: 6,
        bonus_value: 5,
        yahtzee_bonus: 10,
    };
    let categories = vec![
        Category::upper("1", 1),
        Category::upper("2", 2),
        Category::upper("3", 3),
        Category {
            name: "C",
            kind: ScoringKind::NOfAKind {
                min_count: 1,
                valuation: Valuation::TotalPips,
            },
            joker: JokerRule::Disallowed,
        },
        Category {
            name: "Y",
            kind: ScoringKind::FiveOfAKind { value: 10 },
            joker: JokerRule::Disallowed,
        },
    ];
    YahtzeeRules::new(params, categories).unwrap()
}

/// Naive expectimax over the raw game tree. Deliberately structured unlike
/// the production solver: plain recursion on (anchor, partial roll, rerolls)
/// with per-anchor memoization only, no tier bookkeeping, no catalogs.
fn naive_anchor_value(
    rules: &YahtzeeRules,
    anchor: Anchor,
    memo: &mut FxHashMap<Anchor, f64>,
) -> f64 {
    if rules.is_terminal(anchor) {
        return 0.0;
    }
    if let Some(&value) = memo.get(&anchor) {
        return value;
    }
    let empty = rules.empty_roll().clone();
    let value = naive_fill(rules, anchor, &empty, rules.rerolls(), memo);
    memo.insert(anchor, value);
    value
}

fn naive_fill(
    rules: &YahtzeeRules,
    anchor: Anchor,
    partial: &DiceRoll,
    rerolls: u32,
    memo: &mut FxHashMap<Anchor, f64>,
) -> f64 {
    if partial.size() == rules.dice_count() {
        return naive_complete(rules, anchor, partial, rerolls, memo);
    }
    let mut sum = 0.0;
    for face in 1..=rules.sides() {
        let bigger = partial.add_one(face).unwrap();
        sum += naive_fill(rules, anchor, &bigger, rerolls, memo);
    }
    sum / rules.sides() as f64
}

fn naive_complete(
    rules: &YahtzeeRules,
    anchor: Anchor,
    roll: &DiceRoll,
    rerolls: u32,
    memo: &mut FxHashMap<Anchor, f64>,
) -> f64 {
    let mut best = f64::NEG_INFINITY;
    if rerolls == 0 {
        for &cat in rules.unused_categories(anchor) {
            let (successor, score) = rules.apply(anchor, roll, cat).unwrap();
            let value = score.total() as f64 + naive_anchor_value(rules, successor, memo);
            best = best.max(value);
        }
    } else {
        for keep in roll.all_subrolls() {
            best = best.max(naive_fill(rules, anchor, &keep, rerolls - 1, memo));
        }
    }
    best
}

#[test]
fn matches_naive_expectimax_on_mini_game() {
    let rules = mini_rules();
    let (value, table) = solve(&rules, keep_all_subrolls, all_unused_categories, None).unwrap();

    let mut memo = FxHashMap::default();
    let naive = naive_anchor_value(&rules, Anchor::START, &mut memo);
    assert!(
        (value - naive).abs() < 1e-9,
        "solver {value} vs naive {naive}"
    );

    // agree on every anchor, not just the initial one
    for yahtzee in [YahtzeeFlag::Unused, YahtzeeFlag::Zero, YahtzeeFlag::Nonzero] {
        for upper_total in 0..=rules.bonus_threshold() {
            for used in 0..=rules.max_anchor().used {
                let anchor = Anchor {
                    yahtzee,
                    upper_total,
                    used,
                };
                let solved = table.get(rules.anchor_to_index(anchor)).unwrap();
                let naive = naive_anchor_value(&rules, anchor, &mut memo);
                assert!(
                    (solved - naive).abs() < 1e-9,
                    "disagree at {}: solver {solved} vs naive {naive}",
                    rules.anchor_to_string(anchor)
                );
            }
        }
    }
}

#[test]
fn solving_twice_is_bit_identical() {
    let rules = mini_rules();
    let (v1, t1) = solve(&rules, keep_all_subrolls, all_unused_categories, None).unwrap();
    let (v2, t2) = solve(&rules, keep_all_subrolls, all_unused_categories, None).unwrap();
    assert_eq!(v1.to_bits(), v2.to_bits());
    for index in 0..t1.len() {
        assert_eq!(
            t1.get(index).map(f64::to_bits),
            t2.get(index).map(f64::to_bits)
        );
    }
}

#[test]
fn resuming_from_a_saved_partial_table_completes_the_solve() {
    let rules = mini_rules();
    let (_, full) = solve(&rules, keep_all_subrolls, all_unused_categories, None).unwrap();

    // persist the full table, reload only every third line as a partial run
    let mut buf = Vec::new();
    save_values(&mut buf, &rules, &full).unwrap();
    let partial_text: String = String::from_utf8(buf)
        .unwrap()
        .lines()
        .enumerate()
        .filter(|(i, _)| i % 3 == 0)
        .map(|(_, line)| format!("{line}\n"))
        .collect();
    let seed = load_values(Cursor::new(partial_text), &rules).unwrap();
    assert!(seed.solved_count() < full.solved_count());

    let (resumed_value, resumed) = solve(
        &rules,
        keep_all_subrolls,
        all_unused_categories,
        Some(seed),
    )
    .unwrap();
    assert_eq!(
        resumed_value.to_bits(),
        full.get(rules.anchor_to_index(Anchor::START)).unwrap().to_bits()
    );
    for index in 0..full.len() {
        assert_eq!(
            resumed.get(index).map(f64::to_bits),
            full.get(index).map(f64::to_bits),
            "resumed table diverges at index {index}"
        );
    }
}

/// Optimal expected score of standard Yahtzee, per Verhoeff and Glenn.
/// Solves the full 393k-anchor table; run with `--ignored --release`.
#[test]
#[ignore]
fn standard_game_optimal_value() {
    let rules = YahtzeeRules::standard();
    let (value, table) = solve(&rules, keep_all_subrolls, all_unused_categories, None).unwrap();
    assert!(
        (value - 254.5896).abs() < 0.01,
        "expected about 254.59, got {value}"
    );
    assert_eq!(table.solved_count(), rules.table_len());
}
