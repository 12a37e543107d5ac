//! # Circuit — Wire Store and Lazy Evaluator
//!
//! A [`Circuit`] maps wire names to expression nodes and resolves a wire to
//! its 16-bit signal on demand. The walk uses an explicit work stack, so
//! chain depth is bounded by memory rather than by the thread stack, and
//! every node it computes is memoized.
//!
//! ## Cache policy
//!
//! Binding a wire with [`Circuit::set`] (or anything built on it) clears a
//! warm cache before the new node is visible, so a resolve never observes a
//! value computed from an older definition. [`Circuit::invalidate`] is still
//! public and idempotent.
//!
//! ## Example
//!
//! ```rust
//! use wire_circuit::Circuit;
//!
//! let mut circuit = Circuit::from_instructions([
//!     "x AND y -> w",
//!     "4 -> x",
//!     "2 -> y",
//! ]).unwrap();
//! assert_eq!(circuit.resolve("w").unwrap(), 0);
//!
//! circuit.set_wire("x", "6").unwrap();
//! assert_eq!(circuit.resolve("w").unwrap(), 2);
//! ```

use crate::arena::{NodeArena, NodeId};
use crate::cache::{CacheState, CacheStats, EvalCache};
use crate::signal_ir::{
    parse_expression, parse_instruction, parse_wire_name, Instruction, Node, Operand, ParseError,
    Signal, WireName,
};
use anyhow::Context;
use blake3::Hasher;
use log::{debug, info, trace};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Hex-encoded BLAKE3 of a circuit's canonical text.
pub type CircuitHash = String;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CircuitError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Parse failure while loading a multi-line listing (1-based line)
    #[error("line {line}: {source}")]
    Line { line: usize, source: ParseError },
    #[error("unknown wire: {0}")]
    UnknownWire(WireName),
    /// The wire whose node was re-entered while still being resolved
    #[error("cyclic definition through wire {0}")]
    CyclicDefinition(WireName),
}

/// A set of named wires and the memoized signals resolved from them.
#[derive(Debug, Default)]
pub struct Circuit {
    connections: HashMap<WireName, NodeId>,
    arena: NodeArena,
    cache: EvalCache,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a circuit from instruction lines. Blank lines are skipped.
    pub fn from_instructions<I, S>(lines: I) -> Result<Self, CircuitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut circuit = Self::new();
        for (idx, line) in lines.into_iter().enumerate() {
            let line = line.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            let ins = parse_instruction(line)
                .map_err(|source| CircuitError::Line { line: idx + 1, source })?;
            circuit.apply(ins);
        }
        debug!("loaded circuit with {} wires", circuit.len());
        Ok(circuit)
    }

    /// Reads a newline-separated instruction listing from disk.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.to_string_lossy()))?;
        let circuit = Self::from_instructions(text.lines())
            .with_context(|| format!("parsing {}", path.to_string_lossy()))?;
        info!("{} wires loaded from {}", circuit.len(), path.to_string_lossy());
        Ok(circuit)
    }

    /// Parses one instruction line and binds its target.
    pub fn take_instruction(&mut self, line: &str) -> Result<(), CircuitError> {
        let ins = parse_instruction(line)?;
        self.apply(ins);
        Ok(())
    }

    pub fn apply(&mut self, ins: Instruction) {
        self.set(ins.target, ins.node);
    }

    /// Binds `target` to an expression given as text (`"x AND y"`, `"3176"`).
    pub fn set_wire(&mut self, target: &str, expression: &str) -> Result<(), CircuitError> {
        let target = parse_wire_name(target)?;
        let node = parse_expression(expression)?;
        self.set(target, node);
        Ok(())
    }

    /// Inserts or silently overwrites the node bound to `target`.
    ///
    /// Referenced wires do not have to exist yet. Rebinding reuses the
    /// wire's arena slot, so the arena holds one node per wire. Rebinding to
    /// an equal node keeps the cache warm.
    pub fn set(&mut self, target: impl Into<WireName>, node: Node) {
        let target = target.into();
        if let Some(&id) = self.connections.get(&target) {
            if self.arena.get(id) == Some(&node) {
                return;
            }
            if self.cache.clear() {
                debug!("rebinding {target} cleared the evaluation cache");
            }
            self.arena.replace(id, node);
            return;
        }
        if self.cache.clear() {
            debug!("binding {target} cleared the evaluation cache");
        }
        let id = self.arena.alloc(node);
        self.connections.insert(target, id);
    }

    pub fn get(&self, name: &str) -> Result<&Node, CircuitError> {
        let id = self.node_id(name)?;
        self.arena
            .get(id)
            .ok_or_else(|| CircuitError::UnknownWire(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connections.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Defined wire names in sorted order.
    pub fn wires(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.connections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolves a wire to its signal, reusing memoized node values.
    pub fn resolve(&mut self, wire: &str) -> Result<Signal, CircuitError> {
        let mut resolver = Resolver {
            connections: &self.connections,
            arena: &self.arena,
            cache: &mut self.cache,
            in_progress: HashSet::new(),
        };
        resolver.wire(wire)
    }

    /// Resolves every wire, sorted by name. Stops at the first failure.
    pub fn resolve_all(&mut self) -> Result<Vec<(WireName, Signal)>, CircuitError> {
        let names: Vec<WireName> = self.wires().into_iter().map(str::to_string).collect();
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let value = self.resolve(&name)?;
            out.push((name, value));
        }
        Ok(out)
    }

    /// Resolves `source`, binds `target` to that value as a literal and
    /// resolves `query` under the new definition.
    pub fn override_and_resolve(
        &mut self,
        source: &str,
        target: &str,
        query: &str,
    ) -> Result<Signal, CircuitError> {
        let value = self.resolve(source)?;
        debug!("overriding {target} with {source}={value}");
        self.set_wire(target, &value.to_string())?;
        self.invalidate();
        self.resolve(query)
    }

    /// Drops every memoized value. A no-op on a cold cache.
    pub fn invalidate(&mut self) {
        if self.cache.clear() {
            debug!("evaluation cache invalidated");
        }
    }

    pub fn cache_state(&self) -> CacheState {
        self.cache.state()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// One canonical instruction per wire, sorted by wire name.
    pub fn canonical_text(&self) -> String {
        let mut buf = String::new();
        for name in self.wires() {
            if let Ok(node) = self.get(name) {
                let ins = Instruction {
                    target: name.to_string(),
                    node: node.clone(),
                };
                buf.push_str(&ins.to_string());
                buf.push('\n');
            }
        }
        buf
    }

    pub fn hash(&self) -> CircuitHash {
        let mut hasher = Hasher::new();
        hasher.update(self.canonical_text().as_bytes());
        let digest = hasher.finalize();
        hex::encode(digest.as_bytes())
    }

    fn node_id(&self, name: &str) -> Result<NodeId, CircuitError> {
        self.connections
            .get(name)
            .copied()
            .ok_or_else(|| CircuitError::UnknownWire(name.to_string()))
    }
}

/// Work item of the resolver's explicit stack. `Enter` schedules a node,
/// `Exit` computes it once every wire input is memoized.
enum Frame<'a> {
    Enter(NodeId, &'a str),
    Exit(NodeId, &'a str),
}

struct Resolver<'a> {
    connections: &'a HashMap<WireName, NodeId>,
    arena: &'a NodeArena,
    cache: &'a mut EvalCache,
    in_progress: HashSet<NodeId>,
}

impl<'a> Resolver<'a> {
    fn wire(&mut self, name: &str) -> Result<Signal, CircuitError> {
        let connections: &'a HashMap<WireName, NodeId> = self.connections;
        let arena: &'a NodeArena = self.arena;
        let (root, &id) = connections
            .get_key_value(name)
            .ok_or_else(|| CircuitError::UnknownWire(name.to_string()))?;
        let mut stack = vec![Frame::Enter(id, root.as_str())];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(id, wire) => {
                    if self.cache.lookup(id).is_some() {
                        continue;
                    }
                    // Pending exits on the stack are exactly the ancestors of this frame.
                    if !self.in_progress.insert(id) {
                        return Err(CircuitError::CyclicDefinition(wire.to_string()));
                    }
                    let node = arena
                        .get(id)
                        .ok_or_else(|| CircuitError::UnknownWire(wire.to_string()))?;
                    stack.push(Frame::Exit(id, wire));
                    self.schedule_inputs(node, &mut stack)?;
                }
                Frame::Exit(id, wire) => {
                    let node = arena
                        .get(id)
                        .ok_or_else(|| CircuitError::UnknownWire(wire.to_string()))?;
                    let value = self.compute(node, wire)?;
                    self.in_progress.remove(&id);
                    trace!("{wire} = {value}");
                    self.cache.store(id, value);
                }
            }
        }
        self.cache
            .peek(id)
            .ok_or_else(|| CircuitError::CyclicDefinition(name.to_string()))
    }

    /// Pushes wire inputs right to left so the left input resolves first.
    fn schedule_inputs(&self, node: &'a Node, stack: &mut Vec<Frame<'a>>) -> Result<(), CircuitError> {
        for input in node.wire_inputs().into_iter().flatten().rev() {
            let id = self.node_id(input)?;
            stack.push(Frame::Enter(id, input));
        }
        Ok(())
    }

    /// Applies a node whose wire inputs are already memoized.
    fn compute(&self, node: &Node, wire: &str) -> Result<Signal, CircuitError> {
        let value = match node {
            Node::Literal(value) => *value,
            Node::Wire(name) => self.memoized(name, wire)?,
            Node::Not(operand) => !self.operand(operand, wire)?,
            Node::Binary { op, left, right } => {
                let left = self.operand(left, wire)?;
                let right = self.operand(right, wire)?;
                op.apply(left, right)
            }
        };
        Ok(value)
    }

    fn operand(&self, operand: &Operand, wire: &str) -> Result<Signal, CircuitError> {
        match operand {
            Operand::Literal(value) => Ok(*value),
            Operand::Wire(name) => self.memoized(name, wire),
        }
    }

    /// Inputs are memoized before their reader's exit frame runs.
    fn memoized(&self, input: &str, wire: &str) -> Result<Signal, CircuitError> {
        let id = self.node_id(input)?;
        self.cache
            .peek(id)
            .ok_or_else(|| CircuitError::CyclicDefinition(wire.to_string()))
    }

    fn node_id(&self, name: &str) -> Result<NodeId, CircuitError> {
        self.connections
            .get(name)
            .copied()
            .ok_or_else(|| CircuitError::UnknownWire(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "123 -> x\n456 -> y\nx AND y -> d\nx OR y -> e\nx LSHIFT 2 -> f\ny RSHIFT 2 -> g\nNOT x -> h\nNOT y -> i\n";

    fn sample() -> Circuit {
        Circuit::from_instructions(SAMPLE.lines()).unwrap()
    }

    #[test]
    fn sample_signals() {
        let mut circuit = sample();
        let expected = [
            ("d", 72),
            ("e", 507),
            ("f", 492),
            ("g", 114),
            ("h", 65412),
            ("i", 65079),
            ("x", 123),
            ("y", 456),
        ];
        for (wire, value) in expected {
            assert_eq!(circuit.resolve(wire).unwrap(), value, "wire {wire}");
        }
    }

    #[test]
    fn resolve_all_is_sorted() {
        let mut circuit = sample();
        let all = circuit.resolve_all().unwrap();
        let names: Vec<&str> = all.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["d", "e", "f", "g", "h", "i", "x", "y"]);
        assert_eq!(all[0].1, 72);
    }

    #[test]
    fn redefinition_takes_effect() {
        let mut circuit = Circuit::new();
        circuit.take_instruction("4 -> x").unwrap();
        circuit.take_instruction("2 -> y").unwrap();
        circuit.take_instruction("x AND y -> w").unwrap();
        assert_eq!(circuit.resolve("w").unwrap(), 0);

        circuit.set("x", Node::Literal(6));
        circuit.invalidate();
        assert_eq!(circuit.resolve("w").unwrap(), 2);
    }

    #[test]
    fn set_clears_warm_cache() {
        let mut circuit = Circuit::from_instructions(["4 -> x", "2 -> y", "x AND y -> w"]).unwrap();
        assert_eq!(circuit.resolve("w").unwrap(), 0);
        assert_eq!(circuit.cache_state(), CacheState::Warm);

        circuit.set("x", Node::Literal(6));
        assert_eq!(circuit.cache_state(), CacheState::Cold);
        assert_eq!(circuit.resolve("w").unwrap(), 2);
    }

    #[test]
    fn rebinding_reuses_the_arena_slot() {
        let mut circuit = Circuit::from_instructions(["4 -> x", "x OR 1 -> w"]).unwrap();
        for value in 0..1000u16 {
            circuit.set("x", Node::Literal(value));
            assert_eq!(circuit.resolve("w").unwrap(), value | 1);
        }
        assert_eq!(circuit.arena.len(), 2);
        assert_eq!(circuit.len(), 2);
    }

    #[test]
    fn rebinding_equal_node_keeps_cache_warm() {
        let mut circuit = Circuit::from_instructions(["4 -> x", "x OR 1 -> w"]).unwrap();
        assert_eq!(circuit.resolve("w").unwrap(), 5);
        circuit.set_wire("x", "4").unwrap();
        assert_eq!(circuit.cache_state(), CacheState::Warm);
        assert_eq!(circuit.cache_stats().invalidations, 0);

        circuit.set_wire("x", "8").unwrap();
        assert_eq!(circuit.cache_state(), CacheState::Cold);
        assert_eq!(circuit.resolve("w").unwrap(), 9);
    }

    #[test]
    fn invalidate_is_idempotent() {
        let mut circuit = sample();
        circuit.invalidate();
        assert_eq!(circuit.cache_stats().invalidations, 0);

        circuit.resolve("d").unwrap();
        circuit.invalidate();
        circuit.invalidate();
        assert_eq!(circuit.cache_state(), CacheState::Cold);
        assert_eq!(circuit.cache_stats().invalidations, 1);
        assert_eq!(circuit.resolve("d").unwrap(), 72);
    }

    #[test]
    fn repeated_resolve_hits_cache() {
        let mut circuit = sample();
        let first = circuit.resolve("f").unwrap();
        let before = circuit.cache_stats();
        let second = circuit.resolve("f").unwrap();
        let after = circuit.cache_stats();
        assert_eq!(first, second);
        assert_eq!(after.evaluations, before.evaluations);
        assert_eq!(after.hits, before.hits + 1);
    }

    #[test]
    fn forward_references_resolve() {
        let mut circuit =
            Circuit::from_instructions(["b OR 1 -> a", "c LSHIFT 1 -> b", "3 -> c"]).unwrap();
        assert_eq!(circuit.resolve("a").unwrap(), 7);
    }

    #[test]
    fn shared_upstream_wire_is_computed_once() {
        let mut circuit = Circuit::from_instructions([
            "123 -> x",
            "x AND 255 -> y",
            "y OR 1 -> p",
            "y LSHIFT 1 -> q",
        ])
        .unwrap();
        assert_eq!(circuit.resolve("p").unwrap(), 123);
        // p, y, x
        assert_eq!(circuit.cache_stats().evaluations, 3);

        assert_eq!(circuit.resolve("q").unwrap(), 246);
        let stats = circuit.cache_stats();
        assert_eq!(stats.evaluations, 4);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn unknown_wire_fails() {
        let mut circuit = Circuit::from_instructions(["zz AND 1 -> a"]).unwrap();
        assert_eq!(
            circuit.resolve("nope"),
            Err(CircuitError::UnknownWire("nope".into()))
        );
        assert_eq!(
            circuit.resolve("a"),
            Err(CircuitError::UnknownWire("zz".into()))
        );
        assert!(matches!(circuit.get("nope"), Err(CircuitError::UnknownWire(_))));
    }

    #[test]
    fn self_reference_is_cyclic() {
        let mut circuit = Circuit::from_instructions(["a -> a"]).unwrap();
        assert_eq!(
            circuit.resolve("a"),
            Err(CircuitError::CyclicDefinition("a".into()))
        );
    }

    #[test]
    fn mutual_cycle_is_detected_and_recoverable() {
        let mut circuit =
            Circuit::from_instructions(["b AND 1 -> a", "NOT c -> b", "a OR 2 -> c"]).unwrap();
        assert!(matches!(
            circuit.resolve("c"),
            Err(CircuitError::CyclicDefinition(_))
        ));

        circuit.set_wire("b", "5").unwrap();
        assert_eq!(circuit.resolve("a").unwrap(), 1);
        assert_eq!(circuit.resolve("c").unwrap(), 3);
    }

    #[test]
    fn override_flow_rebinds_through_string_form() {
        let mut circuit =
            Circuit::from_instructions(["b LSHIFT 1 -> a", "c -> b", "3 -> c"]).unwrap();
        assert_eq!(circuit.resolve("a").unwrap(), 6);
        assert_eq!(circuit.override_and_resolve("a", "b", "a").unwrap(), 12);
        assert_eq!(circuit.get("b").unwrap(), &Node::Literal(6));
    }

    #[test]
    fn load_reports_line_numbers() {
        let err = Circuit::from_instructions(["1 -> a", "", "a XOR 2 -> b"]).unwrap_err();
        assert_eq!(
            err,
            CircuitError::Line {
                line: 3,
                source: ParseError::UnknownOperator("XOR".into()),
            }
        );
    }

    #[test]
    fn take_instruction_rejects_missing_arrow() {
        let mut circuit = Circuit::new();
        assert!(matches!(
            circuit.take_instruction("1 a"),
            Err(CircuitError::Parse(ParseError::MalformedInstruction(_)))
        ));
        assert!(circuit.is_empty());
    }

    #[test]
    fn hash_ignores_order_and_whitespace() {
        let a = Circuit::from_instructions(["  x  AND y -> d", "1 -> x", "2 -> y"]).unwrap();
        let b = Circuit::from_instructions(["2 -> y", "1 -> x", "x AND y -> d"]).unwrap();
        assert_eq!(a.canonical_text(), "x AND y -> d\n1 -> x\n2 -> y\n");
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);
    }
}
