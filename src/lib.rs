pub mod attrs;
pub mod builder;
pub mod error;
pub mod graph;
pub mod node;
pub mod op;
pub mod ops;
pub mod parser;

pub use attrs::{AttrDict, AttrParam, AttrReader, NodeAttrs};
pub use builder::GraphBuilder;
pub use error::{Error, Result};
pub use graph::{Graph, IndexedEntry, IndexedGraph, IndexedNode};
pub use node::{Node, NodeEntry, NodePtr, NodeWeak, VariableParam};
pub use op::{Arity, Op, OpRegistry};
