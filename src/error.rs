//! Error type shared by the node model, the op registry and the graph passes.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// No op with this name is registered.
    #[error("Unknown op {0:?}")]
    UnknownOp(String),

    /// An op with this name is already registered.
    #[error("Duplicate op registration {0:?}")]
    DuplicateOp(String),

    /// A dynamic arity function could not produce a count.
    #[error("Op {op:?} failed to resolve its arity: {reason}")]
    Arity { op: String, reason: String },

    /// A required attribute is missing from the dictionary.
    #[error("Missing required attribute `{key}`")]
    MissingAttr { key: String },

    /// An attribute value is not valid attribute syntax.
    #[error("Failed to parse attribute `{key}` = {value:?}\n{report}")]
    AttrParse {
        key: String,
        value: String,
        /// Rendered diagnostic pointing into `value`.
        report: String,
    },

    /// An attribute value parsed but has the wrong shape for the reader.
    #[error("Attribute `{key}` = {found:?} is not a valid {expected}")]
    AttrType {
        key: String,
        expected: &'static str,
        found: String,
    },

    /// A node has a different number of data inputs than its op declares.
    #[error("Node {node} expects {expected} input(s) but has {actual}")]
    InputCountMismatch {
        node: String,
        expected: u32,
        actual: usize,
    },

    /// An entry refers past the last output of its node.
    #[error("Entry refers to output {index} of node {node} which only has {num_outputs} output(s)")]
    OutputIndexOutOfRange {
        node: String,
        index: u32,
        num_outputs: u32,
    },

    /// An entry to an operator output carries a mutation version.
    #[error("Entry to non-variable node {node} carries version {version}")]
    VersionOnNonVariable { node: String, version: u32 },

    /// An entry refers to a variable version that was never produced.
    #[error("Entry to variable {node} carries version {version} but latest is {latest}")]
    VersionAhead {
        node: String,
        version: u32,
        latest: u32,
    },

    /// An op declares a mutation of an input that is not a variable.
    #[error("Node {node} mutates input {input} which is not a variable")]
    MutateNonVariable { node: String, input: u32 },

    /// An op declares a mutation of an input slot that does not exist.
    #[error("Node {node} mutates input {input} but only has {num_inputs} input(s)")]
    InvalidMutateInput {
        node: String,
        input: u32,
        num_inputs: usize,
    },

    /// The input or control-dependency chain of a node reaches itself.
    #[error("Cycle detected through node {node}")]
    Cycle { node: String },
}

pub type Result<T> = std::result::Result<T, Error>;
