//! # Signal IR — Instructions and Expression Nodes
//!
//! This module holds the data model of a wire circuit and the parser that
//! turns one textual instruction into a `(target, node)` pair.
//!
//! ## Instruction Format
//!
//! ```text
//! 123 -> x
//! x AND y -> d
//! p LSHIFT 2 -> q
//! NOT e -> f
//! ```
//!
//! ## Example
//!
//! ```rust
//! use wire_circuit::signal_ir::{parse_instruction, BinaryOp, Node, Operand};
//!
//! let ins = parse_instruction("x AND 7 -> d").unwrap();
//! assert_eq!(ins.target, "d");
//! assert_eq!(
//!     ins.node,
//!     Node::Binary {
//!         op: BinaryOp::And,
//!         left: Operand::Wire("x".into()),
//!         right: Operand::Literal(7),
//!     }
//! );
//! assert_eq!(ins.to_string(), "x AND 7 -> d");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A value carried on a wire: the 16-bit bus width.
pub type Signal = u16;

/// Name of a wire inside one circuit.
pub type WireName = String;

const ARROW: &str = "->";
const NOT_KEYWORD: &str = "NOT";

/// Binary gate operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BinaryOp {
    /// Bitwise AND
    And,
    /// Bitwise OR
    Or,
    /// Left shift, bits shifted past bit 15 are dropped
    Lshift,
    /// Logical right shift
    Rshift,
}

/// A gate input: either a constant or the signal of another wire.
///
/// Operands never nest; `NOT (x AND y)` is not part of the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    Literal(Signal),
    Wire(WireName),
}

/// The expression bound to a wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Node {
    /// Constant signal
    Literal(Signal),
    /// Back-reference to another wire by name, resolved lazily
    Wire(WireName),
    /// Bitwise complement of one operand
    Not(Operand),
    /// Two-input gate
    Binary {
        op: BinaryOp,
        left: Operand,
        right: Operand,
    },
}

/// One parsed `<expr> -> <target>` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub target: WireName,
    pub node: Node,
}

/// Errors that can occur when parsing an instruction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Missing arrow, bad token count, bad wire name or out-of-range literal
    #[error("malformed instruction: {0:?}")]
    MalformedInstruction(String),
    /// Operator token outside AND/OR/LSHIFT/RSHIFT/NOT
    #[error("unknown operator: {0:?}")]
    UnknownOperator(String),
}

impl BinaryOp {
    pub fn keyword(self) -> &'static str {
        match self {
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Lshift => "LSHIFT",
            BinaryOp::Rshift => "RSHIFT",
        }
    }

    /// Applies the gate. Shifts by 16 or more yield 0.
    pub fn apply(self, left: Signal, right: Signal) -> Signal {
        match self {
            BinaryOp::And => left & right,
            BinaryOp::Or => left | right,
            BinaryOp::Lshift => left.checked_shl(u32::from(right)).unwrap_or(0),
            BinaryOp::Rshift => left.checked_shr(u32::from(right)).unwrap_or(0),
        }
    }
}

impl FromStr for BinaryOp {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(BinaryOp::And),
            "OR" => Ok(BinaryOp::Or),
            "LSHIFT" => Ok(BinaryOp::Lshift),
            "RSHIFT" => Ok(BinaryOp::Rshift),
            other => Err(ParseError::UnknownOperator(other.to_string())),
        }
    }
}

impl From<Operand> for Node {
    fn from(operand: Operand) -> Self {
        match operand {
            Operand::Literal(value) => Node::Literal(value),
            Operand::Wire(name) => Node::Wire(name),
        }
    }
}

impl Operand {
    pub fn as_wire(&self) -> Option<&str> {
        match self {
            Operand::Literal(_) => None,
            Operand::Wire(name) => Some(name.as_str()),
        }
    }
}

impl Node {
    /// Wires this node reads, left input first.
    pub fn wire_inputs(&self) -> [Option<&str>; 2] {
        match self {
            Node::Literal(_) => [None, None],
            Node::Wire(name) => [Some(name.as_str()), None],
            Node::Not(operand) => [operand.as_wire(), None],
            Node::Binary { left, right, .. } => [left.as_wire(), right.as_wire()],
        }
    }
}

impl FromStr for Node {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_expression(s)
    }
}

impl FromStr for Instruction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_instruction(s)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(value) => write!(f, "{}", value),
            Operand::Wire(name) => f.write_str(name),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(value) => write!(f, "{}", value),
            Node::Wire(name) => f.write_str(name),
            Node::Not(operand) => write!(f, "{} {}", NOT_KEYWORD, operand),
            Node::Binary { op, left, right } => write!(f, "{} {} {}", left, op, right),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.node, ARROW, self.target)
    }
}

/// Parses one `<expr> -> <target>` line.
pub fn parse_instruction(line: &str) -> Result<Instruction, ParseError> {
    let malformed = || ParseError::MalformedInstruction(line.to_string());
    let (expr, target) = line.split_once(ARROW).ok_or_else(malformed)?;
    if target.contains(ARROW) {
        return Err(malformed());
    }
    let target = parse_wire_name(target).map_err(|_| malformed())?;
    let node = parse_expression(expr).map_err(|err| match err {
        ParseError::MalformedInstruction(_) => malformed(),
        other => other,
    })?;
    Ok(Instruction { target, node })
}

/// Parses the left side of an instruction; the token count picks the shape.
pub fn parse_expression(text: &str) -> Result<Node, ParseError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.as_slice() {
        [lone] => parse_operand(lone).map(Node::from),
        [op, operand] => {
            if *op != NOT_KEYWORD {
                return Err(misplaced_token(op, text));
            }
            Ok(Node::Not(parse_operand(operand)?))
        }
        [left, op, right] => {
            let op = BinaryOp::from_str(op).map_err(|_| misplaced_token(op, text))?;
            Ok(Node::Binary {
                op,
                left: parse_operand(left)?,
                right: parse_operand(right)?,
            })
        }
        _ => Err(ParseError::MalformedInstruction(text.trim().to_string())),
    }
}

/// Error for a token found where an operator belongs. Upper-case words
/// name an operator we do not know; operands and known binary keywords
/// mean the expression has the wrong shape.
fn misplaced_token(token: &str, text: &str) -> ParseError {
    let looks_like_operator = token.bytes().all(|b| b.is_ascii_uppercase());
    if looks_like_operator && BinaryOp::from_str(token).is_err() {
        ParseError::UnknownOperator(token.to_string())
    } else {
        ParseError::MalformedInstruction(text.trim().to_string())
    }
}

/// All-digit tokens are literals, anything else must be a wire name.
pub fn parse_operand(token: &str) -> Result<Operand, ParseError> {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        return Signal::from_str(token)
            .map(Operand::Literal)
            .map_err(|_| ParseError::MalformedInstruction(token.to_string()));
    }
    parse_wire_name(token).map(Operand::Wire)
}

/// Wire names are an ASCII letter followed by letters, digits or `_`.
pub fn parse_wire_name(text: &str) -> Result<WireName, ParseError> {
    let name = text.trim();
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            first.is_ascii_alphabetic() && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid || is_keyword(name) {
        return Err(ParseError::MalformedInstruction(text.to_string()));
    }
    Ok(name.to_string())
}

fn is_keyword(name: &str) -> bool {
    name == NOT_KEYWORD || BinaryOp::from_str(name).is_ok()
}
