//! Property tests for the simplex and ReLUplex layers: soundness of
//! returned witnesses and completeness on feasible random systems built
//! around a known solution point.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use proptest::prelude::*;
use veriplex_core::{AtomId, LinearAtom, ReluAtom};
use veriplex_lra::{CheckOutcome, Reluplex, ReluplexOutcome, Tableau};

fn rat(n: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(n))
}

/// A random linear system that is feasible by construction: coefficients
/// are drawn freely, the bound of each inequality is the value of its
/// left-hand side at a fixed point, minus a non-negative margin.
#[derive(Debug, Clone)]
struct FeasibleSystem {
    point: Vec<i64>,
    ineqs: Vec<(Vec<i64>, i64)>,
}

fn feasible_system() -> impl Strategy<Value = FeasibleSystem> {
    (1usize..=8)
        .prop_flat_map(|nvars| {
            let point = proptest::collection::vec(-10i64..=10, nvars);
            let ineq = (proptest::collection::vec(-3i64..=3, nvars), 0i64..=4);
            (point, proptest::collection::vec(ineq, 1..=12))
        })
        .prop_map(|(point, raw)| {
            let ineqs = raw
                .into_iter()
                .map(|(coeffs, margin)| {
                    let lhs: i64 = coeffs
                        .iter()
                        .zip(&point)
                        .map(|(c, x)| c * x)
                        .sum();
                    (coeffs, lhs - margin)
                })
                .collect();
            FeasibleSystem { point, ineqs }
        })
}

fn build_tableau(system: &FeasibleSystem) -> (Tableau, Vec<usize>) {
    let mut tableau = Tableau::new();
    let vars: Vec<usize> = (0..system.point.len())
        .map(|i| tableau.var(&format!("x{i}")))
        .collect();
    for (index, (coeffs, bound)) in system.ineqs.iter().enumerate() {
        let slack = tableau.slack_var(format!("s${index}"));
        let row: Vec<(usize, BigRational)> = coeffs
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != 0)
            .map(|(i, &c)| (vars[i], rat(c)))
            .collect();
        tableau.add_row(slack, row);
        tableau
            .assert_lower(slack, rat(*bound), AtomId(index as u32))
            .expect("bounds on fresh slacks cannot conflict");
    }
    (tableau, vars)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(192))]

    /// Completeness on feasible systems: Check returns SAT, and the
    /// witness satisfies every original inequality exactly (soundness).
    #[test]
    fn prop_check_is_sound_and_complete(system in feasible_system()) {
        let (mut tableau, vars) = build_tableau(&system);
        prop_assert_eq!(tableau.check(), CheckOutcome::Sat);

        for (coeffs, bound) in &system.ineqs {
            let lhs: BigRational = coeffs
                .iter()
                .enumerate()
                .map(|(i, &c)| rat(c) * tableau.value(vars[i]))
                .sum();
            prop_assert!(lhs >= rat(*bound), "violated: {coeffs:?} >= {bound}");
        }
    }

    /// Bound tightening around the known point keeps the system
    /// satisfiable, and the witness respects every bound.
    #[test]
    fn prop_check_respects_variable_bounds(
        system in feasible_system(),
        slack_width in 0i64..=5,
    ) {
        let (mut tableau, vars) = build_tableau(&system);
        let offset = system.ineqs.len() as u32;
        for (i, &var) in vars.iter().enumerate() {
            let center = system.point[i];
            tableau
                .assert_lower(var, rat(center - slack_width), AtomId(offset + 2 * i as u32))
                .expect("interval around the point is nonempty");
            tableau
                .assert_upper(var, rat(center + slack_width), AtomId(offset + 2 * i as u32 + 1))
                .expect("interval around the point is nonempty");
        }

        prop_assert_eq!(tableau.check(), CheckOutcome::Sat);
        for (i, &var) in vars.iter().enumerate() {
            let value = tableau.value(var);
            prop_assert!(*value >= rat(system.point[i] - slack_width));
            prop_assert!(*value <= rat(system.point[i] + slack_width));
        }
    }
}

/// A random rectifier problem that is feasible by construction: the
/// point fixes the inputs, outputs are their rectifications, and the
/// inequalities are sampled around the combined point.
#[derive(Debug, Clone)]
struct FeasibleReluSystem {
    inputs: Vec<i64>,
    ineqs: Vec<(Vec<i64>, i64)>,
}

fn feasible_relu_system() -> impl Strategy<Value = FeasibleReluSystem> {
    (1usize..=3)
        .prop_flat_map(|npairs| {
            let inputs = proptest::collection::vec(-5i64..=5, npairs);
            let ineq = (proptest::collection::vec(-2i64..=2, 2 * npairs), 0i64..=3);
            (inputs, proptest::collection::vec(ineq, 0..=4))
        })
        .prop_map(|(inputs, raw)| {
            let combined: Vec<i64> = inputs
                .iter()
                .copied()
                .chain(inputs.iter().map(|&x| x.max(0)))
                .collect();
            let ineqs = raw
                .into_iter()
                .map(|(coeffs, margin)| {
                    let lhs: i64 = coeffs
                        .iter()
                        .zip(&combined)
                        .map(|(c, x)| c * x)
                        .sum();
                    (coeffs, lhs - margin)
                })
                .collect();
            FeasibleReluSystem { inputs, ineqs }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    /// ReLUplex soundness and completeness on feasible inputs: a SAT
    /// verdict is returned and its witness rectifies every pair exactly.
    #[test]
    fn prop_reluplex_witness_rectifies(system in feasible_relu_system()) {
        let npairs = system.inputs.len();
        let names: Vec<(String, String)> = (0..npairs)
            .map(|i| (format!("x{i}"), format!("y{i}")))
            .collect();

        let mut solver = Reluplex::new();
        for (index, (coeffs, bound)) in system.ineqs.iter().enumerate() {
            let terms: Vec<(String, BigRational)> = coeffs
                .iter()
                .enumerate()
                .filter(|(_, &c)| c != 0)
                .map(|(i, &c)| {
                    let name = if i < npairs {
                        names[i].0.clone()
                    } else {
                        names[i - npairs].1.clone()
                    };
                    (name, rat(c))
                })
                .collect();
            let atom = LinearAtom::new(terms, rat(*bound));
            solver
                .assert_ineq(AtomId(index as u32), &atom)
                .expect("feasible system must build");
        }
        for (index, (x, y)) in names.iter().enumerate() {
            solver
                .assert_relu(
                    AtomId((system.ineqs.len() + index) as u32),
                    &ReluAtom { x: x.clone(), y: y.clone() },
                )
                .expect("rectifier bounds cannot conflict here");
        }

        match solver.solve() {
            ReluplexOutcome::Sat(assignment) => {
                for (x, y) in &names {
                    let vx = &assignment[x];
                    let vy = &assignment[y];
                    let expected = if vx.is_negative() {
                        BigRational::zero()
                    } else {
                        vx.clone()
                    };
                    prop_assert_eq!(vy, &expected, "pair ({}, {}) not rectified", x, y);
                }
            }
            other => prop_assert!(false, "expected sat on feasible input, got {other:?}"),
        }
    }
}
