//! A miniature rectifier-network robustness query, encoded directly
//! through the formula API: inputs in an L-infinity box around a center,
//! the network as equality chains, and the negated postcondition. A SAT
//! answer is a concrete counterexample; UNSAT means the region is robust.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use veriplex::{solve, AtomStore, Formula, SolveOutcome};

fn rat(n: i64, d: i64) -> BigRational {
    BigRational::new(BigInt::from(n), BigInt::from(d))
}

/// `var >= lo and var <= hi`.
fn in_box(store: &mut AtomStore, var: &str, lo: BigRational, hi: BigRational) -> Formula {
    let ge = store.ineq(vec![(var.to_owned(), rat(1, 1))], lo);
    let le = store.ineq(vec![(var.to_owned(), rat(-1, 1))], -hi);
    Formula::and(Formula::Atom(ge), Formula::Atom(le))
}

/// `lhs = Σ terms + constant`, as two opposing inequalities.
fn equality(
    store: &mut AtomStore,
    lhs: &str,
    terms: &[(&str, BigRational)],
    constant: BigRational,
) -> Formula {
    let mut forward: Vec<(String, BigRational)> = vec![(lhs.to_owned(), rat(1, 1))];
    let mut backward: Vec<(String, BigRational)> = vec![(lhs.to_owned(), rat(-1, 1))];
    for (var, coeff) in terms {
        forward.push(((*var).to_owned(), -coeff.clone()));
        backward.push(((*var).to_owned(), coeff.clone()));
    }
    let ge = store.ineq(forward, constant.clone());
    let le = store.ineq(backward, -constant);
    Formula::and(Formula::Atom(ge), Formula::Atom(le))
}

/// The network: z = x0 + x1 - 3/2, h = max(0, z), s = h - 1/4.
fn network(store: &mut AtomStore) -> Formula {
    let pre_activation = equality(
        store,
        "z",
        &[("x0", rat(1, 1)), ("x1", rat(1, 1))],
        rat(-3, 2),
    );
    let activation = Formula::Atom(store.relu("z", "h"));
    let logit = equality(store, "s", &[("h", rat(1, 1))], rat(-1, 4));
    Formula::conj([pre_activation, activation, logit])
}

#[test]
fn high_region_is_robust() {
    // Around (1, 1) with radius 1/10 the pre-activation stays in
    // [3/10, 7/10], so s stays in [1/20, 9/20]; s <= 0 has no witness.
    let mut store = AtomStore::new();
    let pre = Formula::and(
        in_box(&mut store, "x0", rat(9, 10), rat(11, 10)),
        in_box(&mut store, "x1", rat(9, 10), rat(11, 10)),
    );
    let net = network(&mut store);
    let negated_post = Formula::Atom(store.ineq(vec![("s".to_owned(), rat(-1, 1))], rat(0, 1)));
    let query = Formula::conj([pre, net, negated_post]);

    let outcome = solve(&query, &mut store).unwrap();
    assert_eq!(outcome, SolveOutcome::Unsat);
}

#[test]
fn low_region_has_counterexample() {
    // Around (0, 0) the rectifier is inactive, h = 0 and s = -1/4; a
    // witness for s <= 0 exists.
    let mut store = AtomStore::new();
    let pre = Formula::and(
        in_box(&mut store, "x0", rat(-1, 10), rat(1, 10)),
        in_box(&mut store, "x1", rat(-1, 10), rat(1, 10)),
    );
    let net = network(&mut store);
    let negated_post = Formula::Atom(store.ineq(vec![("s".to_owned(), rat(-1, 1))], rat(0, 1)));
    let query = Formula::conj([pre, net, negated_post]);

    match solve(&query, &mut store).unwrap() {
        SolveOutcome::Sat { assignment, .. } => {
            // The witness is a genuine forward pass through the network.
            let z = &assignment["x0"] + &assignment["x1"] - rat(3, 2);
            assert_eq!(assignment["z"], z);
            let h = if z.is_negative() {
                BigRational::zero()
            } else {
                z.clone()
            };
            assert_eq!(assignment["h"], h);
            assert_eq!(assignment["s"], &h - rat(1, 4));
            assert!(!assignment["s"].is_positive());
        }
        other => panic!("expected a counterexample, got {other:?}"),
    }
}

#[test]
fn low_region_is_robustly_low() {
    // Same region, opposite question: s >= 1/20 has no witness because
    // h is pinned to 0 there.
    let mut store = AtomStore::new();
    let pre = Formula::and(
        in_box(&mut store, "x0", rat(-1, 10), rat(1, 10)),
        in_box(&mut store, "x1", rat(-1, 10), rat(1, 10)),
    );
    let net = network(&mut store);
    let negated_post = Formula::Atom(store.ineq(vec![("s".to_owned(), rat(1, 1))], rat(1, 20)));
    let query = Formula::conj([pre, net, negated_post]);

    let outcome = solve(&query, &mut store).unwrap();
    assert_eq!(outcome, SolveOutcome::Unsat);
}
