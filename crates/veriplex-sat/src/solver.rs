//! DPLL solver: recursive backtracking with unit propagation and
//! pure-literal elimination.
//!
//! Assignments live on a trail that is fully rewound on backtrack.
//! Decisions pick the first unassigned variable in ascending index order
//! and try `true` before `false`. There is no learned-clause database;
//! callers may append clauses between `solve` calls (the DPLL(T) driver's
//! blocking clauses only ever add).

use crate::clause::Clause;
use crate::literal::{Literal, Variable};
use tracing::debug;

/// Result of a solve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveResult {
    /// Satisfiable, with a total assignment indexed by variable.
    /// Variables not constrained by any clause default to `false`.
    Sat(Vec<bool>),
    /// Unsatisfiable.
    Unsat,
}

/// A DPLL solver over a growable clause set.
#[derive(Debug, Default)]
pub struct Solver {
    num_vars: usize,
    clauses: Vec<Clause>,
    values: Vec<Option<bool>>,
    trail: Vec<Variable>,
    decisions: u64,
    propagations: u64,
}

impl Solver {
    /// Create a solver for `num_vars` variables.
    pub fn new(num_vars: usize) -> Self {
        Solver {
            num_vars,
            ..Solver::default()
        }
    }

    /// Grow the variable count.
    pub fn ensure_num_vars(&mut self, num_vars: usize) {
        if num_vars > self.num_vars {
            self.num_vars = num_vars;
        }
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Number of clauses.
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// Decisions made across all solve calls.
    pub fn num_decisions(&self) -> u64 {
        self.decisions
    }

    /// Unit propagations across all solve calls.
    pub fn num_propagations(&self) -> u64 {
        self.propagations
    }

    /// Append a clause. Duplicate literals are merged; tautological
    /// clauses (containing a literal and its negation) are dropped.
    pub fn add_clause(&mut self, mut literals: Vec<Literal>) {
        literals.sort();
        literals.dedup();
        let tautology = literals
            .iter()
            .any(|&lit| literals.binary_search(&lit.negated()).is_ok());
        if tautology {
            return;
        }
        for lit in &literals {
            self.ensure_num_vars(lit.variable().index() + 1);
        }
        self.clauses.push(Clause::new(literals));
    }

    /// Decide satisfiability of the current clause set.
    pub fn solve(&mut self) -> SolveResult {
        self.values = vec![None; self.num_vars];
        self.trail.clear();
        let sat = self.search();
        debug!(
            sat,
            decisions = self.decisions,
            propagations = self.propagations,
            "sat solve finished"
        );
        if sat {
            let model = self
                .values
                .iter()
                .map(|value| value.unwrap_or(false))
                .collect();
            SolveResult::Sat(model)
        } else {
            SolveResult::Unsat
        }
    }

    /// Value of a literal under the current partial assignment.
    fn lit_value(&self, lit: Literal) -> Option<bool> {
        self.values[lit.variable().index()].map(|value| value == lit.is_positive())
    }

    fn enqueue(&mut self, lit: Literal) {
        let var = lit.variable();
        self.values[var.index()] = Some(lit.is_positive());
        self.trail.push(var);
    }

    fn unwind(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some(var) = self.trail.pop() {
                self.values[var.index()] = None;
            }
        }
    }

    /// Unit propagation to fixpoint. Returns false on conflict (a clause
    /// with every literal falsified).
    fn propagate(&mut self) -> bool {
        loop {
            let mut changed = false;
            for idx in 0..self.clauses.len() {
                let mut satisfied = false;
                let mut unassigned = None;
                let mut unassigned_count = 0usize;
                for &lit in self.clauses[idx].literals.iter() {
                    match self.lit_value(lit) {
                        Some(true) => {
                            satisfied = true;
                            break;
                        }
                        Some(false) => {}
                        None => {
                            unassigned = Some(lit);
                            unassigned_count += 1;
                        }
                    }
                }
                if satisfied {
                    continue;
                }
                match (unassigned_count, unassigned) {
                    (0, _) => return false,
                    (1, Some(unit)) => {
                        self.enqueue(unit);
                        self.propagations += 1;
                        changed = true;
                    }
                    _ => {}
                }
            }
            if !changed {
                return true;
            }
        }
    }

    /// Assign every variable that occurs with a single polarity in the
    /// unresolved clauses. Returns true if anything was assigned.
    fn eliminate_pure_literals(&mut self) -> bool {
        let mut pos = vec![false; self.num_vars];
        let mut neg = vec![false; self.num_vars];
        for clause in &self.clauses {
            if clause
                .literals
                .iter()
                .any(|&lit| self.lit_value(lit) == Some(true))
            {
                continue;
            }
            for &lit in clause.literals.iter() {
                if self.lit_value(lit).is_none() {
                    if lit.is_positive() {
                        pos[lit.variable().index()] = true;
                    } else {
                        neg[lit.variable().index()] = true;
                    }
                }
            }
        }
        let mut assigned = false;
        for index in 0..self.num_vars {
            if self.values[index].is_some() {
                continue;
            }
            let var = Variable(index as u32);
            match (pos[index], neg[index]) {
                (true, false) => {
                    self.enqueue(Literal::new(var, true));
                    assigned = true;
                }
                (false, true) => {
                    self.enqueue(Literal::new(var, false));
                    assigned = true;
                }
                _ => {}
            }
        }
        assigned
    }

    /// Unit propagation and pure-literal elimination to a joint fixpoint.
    fn simplify(&mut self) -> bool {
        loop {
            if !self.propagate() {
                return false;
            }
            if !self.eliminate_pure_literals() {
                return true;
            }
        }
    }

    fn all_satisfied(&self) -> bool {
        self.clauses.iter().all(|clause| {
            clause
                .literals
                .iter()
                .any(|&lit| self.lit_value(lit) == Some(true))
        })
    }

    fn next_unassigned(&self) -> Option<Variable> {
        self.values
            .iter()
            .position(Option::is_none)
            .map(|index| Variable(index as u32))
    }

    fn search(&mut self) -> bool {
        let mark = self.trail.len();
        if !self.simplify() {
            self.unwind(mark);
            return false;
        }
        if self.all_satisfied() {
            return true;
        }
        let var = match self.next_unassigned() {
            Some(var) => var,
            // Everything assigned without conflict but some clause
            // unsatisfied cannot happen; propagate would have conflicted.
            None => {
                self.unwind(mark);
                return false;
            }
        };
        self.decisions += 1;
        for value in [true, false] {
            let saved = self.trail.len();
            self.enqueue(Literal::new(var, value));
            if self.search() {
                return true;
            }
            self.unwind(saved);
        }
        self.unwind(mark);
        false
    }
}
