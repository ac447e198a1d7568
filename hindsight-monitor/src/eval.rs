//! Incremental PCTL evaluation over frontiers
//!
//! Every subformula of the active property is evaluated bottom-up on each
//! newly constructed frontier, reading only the frontier's propositions and
//! its immediate predecessors' cached summaries. Both operands of a binary
//! connective are always evaluated: descendants may depend on a child's cache
//! entry even when the parent's value is already decided.

use hindsight_core::ast::{compile, CompiledFormula, CompiledOp, CompiledSpec, Formula, FormulaRegistry};
use rustc_hash::FxHashSet;

use crate::frontier::Frontier;

#[derive(Debug)]
pub struct Evaluator {
    spec: CompiledSpec,
}

impl Evaluator {
    pub fn new(spec: CompiledSpec) -> Self {
        Self { spec }
    }

    pub fn from_formula(formula: &Formula) -> Self {
        Self::new(compile(formula))
    }

    pub fn registry(&self) -> &FormulaRegistry {
        &self.spec.registry
    }

    /// Number of cache slots each frontier must carry.
    pub fn cache_slots(&self) -> usize {
        self.spec.registry.len()
    }

    /// Canonical rendering of the property.
    pub fn property(&self) -> &str {
        &self.spec.source
    }

    /// Evaluate the whole property on one frontier, filling its `now` cache
    /// and setting its verdict. Returns the top-level value.
    pub fn evaluate(&self, frontier: &mut Frontier) -> bool {
        // A non-root frontier reaching evaluation without predecessors is a
        // graph-construction defect, not a runtime condition.
        assert!(
            frontier.is_root() || frontier.predecessor_count() > 0,
            "frontier {} evaluated with no predecessors",
            frontier.name
        );
        let (now, predecessors, propositions) = frontier.eval_parts();
        let value = eval_node(&self.spec.root, propositions, &predecessors, now);
        frontier.value = value;
        frontier.evaluated = true;
        value
    }
}

fn eval_node(
    node: &CompiledFormula,
    propositions: &FxHashSet<String>,
    predecessors: &[&Vec<bool>],
    now: &mut Vec<bool>,
) -> bool {
    let value = match &node.op {
        CompiledOp::Proposition(name) => propositions.contains(name),
        CompiledOp::Constant(value) => *value,
        CompiledOp::Not(inner) => !eval_node(inner, propositions, predecessors, now),
        CompiledOp::And(lhs, rhs) => {
            let left = eval_node(lhs, propositions, predecessors, now);
            let right = eval_node(rhs, propositions, predecessors, now);
            left && right
        }
        CompiledOp::Or(lhs, rhs) => {
            let left = eval_node(lhs, propositions, predecessors, now);
            let right = eval_node(rhs, propositions, predecessors, now);
            left || right
        }
        CompiledOp::Implies(lhs, rhs) => {
            let left = eval_node(lhs, propositions, predecessors, now);
            let right = eval_node(rhs, propositions, predecessors, now);
            !left || right
        }
        CompiledOp::Iff(lhs, rhs) => {
            let left = eval_node(lhs, propositions, predecessors, now);
            let right = eval_node(rhs, propositions, predecessors, now);
            left == right
        }
        CompiledOp::Paren(inner) => eval_node(inner, propositions, predecessors, now),
        CompiledOp::Ey(inner) => {
            let child = inner.id.index();
            eval_node(inner, propositions, predecessors, now);
            predecessors.iter().any(|summary| summary[child])
        }
        CompiledOp::Ay(inner) => {
            let child = inner.id.index();
            eval_node(inner, propositions, predecessors, now);
            predecessors.is_empty() || predecessors.iter().all(|summary| summary[child])
        }
        CompiledOp::Ep(inner) => {
            let own = node.id.index();
            let current = eval_node(inner, propositions, predecessors, now);
            current || predecessors.iter().any(|summary| summary[own])
        }
        CompiledOp::Ap(inner) => {
            let own = node.id.index();
            let current = eval_node(inner, propositions, predecessors, now);
            // With no predecessors this is exactly the current value, never
            // vacuously true.
            current
                || (!predecessors.is_empty()
                    && predecessors.iter().all(|summary| summary[own]))
        }
        CompiledOp::Es(lhs, rhs) => {
            let own = node.id.index();
            let left = eval_node(lhs, propositions, predecessors, now);
            let right = eval_node(rhs, propositions, predecessors, now);
            right || (left && predecessors.iter().any(|summary| summary[own]))
        }
        CompiledOp::As(lhs, rhs) => {
            let own = node.id.index();
            let left = eval_node(lhs, propositions, predecessors, now);
            let right = eval_node(rhs, propositions, predecessors, now);
            right
                || (left
                    && !predecessors.is_empty()
                    && predecessors.iter().all(|summary| summary[own]))
        }
        CompiledOp::Ah { inner, dual } => {
            // AH phi = not EP(not phi); the EP accumulator lives under its
            // derived key so successors can continue the recurrence.
            let current = eval_node(inner, propositions, predecessors, now);
            let ever_violated =
                !current || predecessors.iter().any(|summary| summary[dual.index()]);
            now[dual.index()] = ever_violated;
            !ever_violated
        }
        CompiledOp::Eh { inner, dual } => {
            // EH phi = not AP(not phi).
            let current = eval_node(inner, propositions, predecessors, now);
            let always_violated = !current
                || (!predecessors.is_empty()
                    && predecessors.iter().all(|summary| summary[dual.index()]));
            now[dual.index()] = always_violated;
            !always_violated
        }
    };
    now[node.id.index()] = value;
    value
}
