//! PCTL formula tree, canonical rendering, and the subformula key registry
//!
//! Every node of a property has a canonical string form; that string is the
//! identity under which evaluation results are cached on frontiers. A single
//! compile pass interns each distinct rendering into a dense [`FormulaId`] so
//! the per-frontier caches can be flat `Vec<bool>`s instead of string-keyed
//! maps.

use std::fmt;

use rustc_hash::FxHashMap;

/// A past-time CTL formula as produced by the parser.
///
/// `Paren` is semantically transparent but kept as a node: its rendering
/// differs from its child's, so it owns a distinct cache slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    /// Atomic proposition, true on a frontier that carries it.
    Proposition(String),
    /// `TRUE` / `FALSE` literal.
    Constant(bool),
    /// Logical negation.
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
    /// Parenthesized group.
    Paren(Box<Formula>),
    /// Exists yesterday: held in at least one immediate predecessor.
    Ey(Box<Formula>),
    /// Always yesterday: held in every immediate predecessor.
    Ay(Box<Formula>),
    /// Exists previously: `E(TRUE S phi)`.
    Ep(Box<Formula>),
    /// Always previously: `A(TRUE S phi)`.
    Ap(Box<Formula>),
    /// Exists historically: dual of `Ap`.
    Eh(Box<Formula>),
    /// Always historically: dual of `Ep`.
    Ah(Box<Formula>),
    /// Exists since: `E(phi S psi)`.
    Es(Box<Formula>, Box<Formula>),
    /// Always since: `A(phi S psi)`.
    As(Box<Formula>, Box<Formula>),
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Proposition(name) => write!(f, "{name}"),
            Formula::Constant(true) => write!(f, "TRUE"),
            Formula::Constant(false) => write!(f, "FALSE"),
            Formula::Not(inner) => write!(f, "! {inner}"),
            Formula::And(lhs, rhs) => write!(f, "{lhs} & {rhs}"),
            Formula::Or(lhs, rhs) => write!(f, "{lhs} | {rhs}"),
            Formula::Implies(lhs, rhs) => write!(f, "{lhs} -> {rhs}"),
            Formula::Iff(lhs, rhs) => write!(f, "{lhs} <-> {rhs}"),
            Formula::Paren(inner) => write!(f, "({inner})"),
            Formula::Ey(inner) => write!(f, "EY({inner})"),
            Formula::Ay(inner) => write!(f, "AY({inner})"),
            Formula::Ep(inner) => write!(f, "EP({inner})"),
            Formula::Ap(inner) => write!(f, "AP({inner})"),
            Formula::Eh(inner) => write!(f, "EH({inner})"),
            Formula::Ah(inner) => write!(f, "AH({inner})"),
            Formula::Es(lhs, rhs) => write!(f, "E({lhs} S {rhs})"),
            Formula::As(lhs, rhs) => write!(f, "A({lhs} S {rhs})"),
        }
    }
}

/// Dense index of a distinct subformula rendering within one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormulaId(u32);

impl FormulaId {
    /// Position of this key in a frontier's flat evaluation cache.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interner mapping canonical subformula strings to [`FormulaId`]s.
#[derive(Debug, Clone, Default)]
pub struct FormulaRegistry {
    ids: FxHashMap<String, FormulaId>,
    keys: Vec<String>,
}

impl FormulaRegistry {
    fn intern(&mut self, key: String) -> FormulaId {
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let id = FormulaId(self.keys.len() as u32);
        self.ids.insert(key.clone(), id);
        self.keys.push(key);
        id
    }

    pub fn id_of(&self, key: &str) -> Option<FormulaId> {
        self.ids.get(key).copied()
    }

    pub fn key_of(&self, id: FormulaId) -> &str {
        &self.keys[id.index()]
    }

    /// Number of distinct cache slots a frontier must carry.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Canonical keys in id order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

/// A formula node annotated with its cache slot.
#[derive(Debug, Clone)]
pub struct CompiledFormula {
    pub id: FormulaId,
    pub op: CompiledOp,
}

/// Lowered operator shapes consumed by the evaluator.
///
/// `Ah`/`Eh` carry a second slot: the cache key of their internal dual
/// accumulator (`EP(! phi)` / `AP(! phi)` respectively), which successors read
/// through their predecessor snapshots.
#[derive(Debug, Clone)]
pub enum CompiledOp {
    Proposition(String),
    Constant(bool),
    Not(Box<CompiledFormula>),
    And(Box<CompiledFormula>, Box<CompiledFormula>),
    Or(Box<CompiledFormula>, Box<CompiledFormula>),
    Implies(Box<CompiledFormula>, Box<CompiledFormula>),
    Iff(Box<CompiledFormula>, Box<CompiledFormula>),
    Paren(Box<CompiledFormula>),
    Ey(Box<CompiledFormula>),
    Ay(Box<CompiledFormula>),
    Ep(Box<CompiledFormula>),
    Ap(Box<CompiledFormula>),
    Eh {
        inner: Box<CompiledFormula>,
        dual: FormulaId,
    },
    Ah {
        inner: Box<CompiledFormula>,
        dual: FormulaId,
    },
    Es(Box<CompiledFormula>, Box<CompiledFormula>),
    As(Box<CompiledFormula>, Box<CompiledFormula>),
}

/// A compiled property: the annotated tree plus its key registry.
#[derive(Debug, Clone)]
pub struct CompiledSpec {
    pub root: CompiledFormula,
    pub registry: FormulaRegistry,
    /// Canonical rendering of the whole property.
    pub source: String,
}

/// Assign every distinct subformula rendering a stable dense id.
pub fn compile(formula: &Formula) -> CompiledSpec {
    let mut registry = FormulaRegistry::default();
    let root = compile_node(formula, &mut registry);
    CompiledSpec {
        root,
        registry,
        source: formula.to_string(),
    }
}

fn compile_node(formula: &Formula, registry: &mut FormulaRegistry) -> CompiledFormula {
    let id = registry.intern(formula.to_string());
    let op = match formula {
        Formula::Proposition(name) => CompiledOp::Proposition(name.clone()),
        Formula::Constant(value) => CompiledOp::Constant(*value),
        Formula::Not(inner) => CompiledOp::Not(Box::new(compile_node(inner, registry))),
        Formula::And(lhs, rhs) => CompiledOp::And(
            Box::new(compile_node(lhs, registry)),
            Box::new(compile_node(rhs, registry)),
        ),
        Formula::Or(lhs, rhs) => CompiledOp::Or(
            Box::new(compile_node(lhs, registry)),
            Box::new(compile_node(rhs, registry)),
        ),
        Formula::Implies(lhs, rhs) => CompiledOp::Implies(
            Box::new(compile_node(lhs, registry)),
            Box::new(compile_node(rhs, registry)),
        ),
        Formula::Iff(lhs, rhs) => CompiledOp::Iff(
            Box::new(compile_node(lhs, registry)),
            Box::new(compile_node(rhs, registry)),
        ),
        Formula::Paren(inner) => CompiledOp::Paren(Box::new(compile_node(inner, registry))),
        Formula::Ey(inner) => CompiledOp::Ey(Box::new(compile_node(inner, registry))),
        Formula::Ay(inner) => CompiledOp::Ay(Box::new(compile_node(inner, registry))),
        Formula::Ep(inner) => CompiledOp::Ep(Box::new(compile_node(inner, registry))),
        Formula::Ap(inner) => CompiledOp::Ap(Box::new(compile_node(inner, registry))),
        Formula::Ah(inner) => {
            let dual = registry.intern(format!("EP(! {inner})"));
            CompiledOp::Ah {
                inner: Box::new(compile_node(inner, registry)),
                dual,
            }
        }
        Formula::Eh(inner) => {
            let dual = registry.intern(format!("AP(! {inner})"));
            CompiledOp::Eh {
                inner: Box::new(compile_node(inner, registry)),
                dual,
            }
        }
        Formula::Es(lhs, rhs) => CompiledOp::Es(
            Box::new(compile_node(lhs, registry)),
            Box::new(compile_node(rhs, registry)),
        ),
        Formula::As(lhs, rhs) => CompiledOp::As(
            Box::new(compile_node(lhs, registry)),
            Box::new(compile_node(rhs, registry)),
        ),
    };
    CompiledFormula { id, op }
}
