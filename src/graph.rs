use crate::attrs::NodeAttrs;
use crate::error::{Error, Result};
use crate::node::{Node, NodeEntry, NodePtr};
use crate::op::Op;
use ahash::AHashMap;
use log::{debug, warn};

/// The nodes reachable from a set of output entries.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub outputs: Vec<NodeEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// The `nth` predecessor of `node`, data inputs first, then control deps.
fn predecessor(node: &Node, nth: usize) -> Option<NodePtr> {
    match node.inputs.get(nth) {
        Some(entry) => Some(entry.node.clone()),
        None => node.control_deps.get(nth - node.inputs.len()).cloned(),
    }
}

impl Graph {
    pub fn new(outputs: Vec<NodeEntry>) -> Self {
        Self { outputs }
    }

    /// Every reachable node once, predecessors before their users.
    ///
    /// Iterative so that deep graphs do not exhaust the call stack. Fails on
    /// the first cycle found.
    pub fn post_order(&self) -> Result<Vec<NodePtr>> {
        let mut visits: AHashMap<usize, Visit> = AHashMap::new();
        let mut order = Vec::new();

        for root in self.outputs.iter().map(|entry| &entry.node) {
            if visits.contains_key(&root.key()) {
                continue;
            }
            visits.insert(root.key(), Visit::InProgress);
            let mut stack: Vec<(NodePtr, usize)> = vec![(root.clone(), 0)];

            while let Some(top) = stack.last_mut() {
                let next = predecessor(&top.0.borrow(), top.1);
                top.1 += 1;

                match next {
                    Some(pred) => match visits.get(&pred.key()) {
                        Some(Visit::Done) => {}
                        Some(Visit::InProgress) => {
                            return Err(Error::Cycle { node: pred.label() })
                        }
                        None => {
                            visits.insert(pred.key(), Visit::InProgress);
                            stack.push((pred, 0));
                        }
                    },
                    None => {
                        if let Some((done, _)) = stack.pop() {
                            visits.insert(done.key(), Visit::Done);
                            order.push(done);
                        }
                    }
                }
            }
        }

        Ok(order)
    }

    /// Checks structural consistency and returns every problem found.
    ///
    /// Covers input counts against the declared arity, output indices, entry
    /// versions and arity functions that fail.
    pub fn check(&self) -> Vec<Error> {
        let order = match self.post_order() {
            Ok(order) => order,
            Err(err) => return vec![err],
        };

        let mut issues = Vec::new();
        for ptr in order.iter() {
            let node = ptr.borrow();
            if !node.is_variable() {
                match node.num_inputs() {
                    Ok(expected) if expected as usize != node.inputs.len() => {
                        issues.push(Error::InputCountMismatch {
                            node: node.label(),
                            expected,
                            actual: node.inputs.len(),
                        })
                    }
                    Ok(_) => {}
                    Err(err) => issues.push(err),
                }
            }
            for entry in node.inputs.iter() {
                check_entry(entry, &mut issues);
            }
        }
        for entry in self.outputs.iter() {
            check_entry(entry, &mut issues);
        }

        if !issues.is_empty() {
            warn!("Graph check found {} issue(s)", issues.len());
        }
        issues
    }
}

fn check_entry(entry: &NodeEntry, issues: &mut Vec<Error>) {
    let node = entry.node.borrow();

    match node.num_outputs() {
        Ok(num_outputs) if entry.index >= num_outputs => {
            issues.push(Error::OutputIndexOutOfRange {
                node: node.label(),
                index: entry.index,
                num_outputs,
            })
        }
        Ok(_) => {}
        Err(err) => issues.push(err),
    }

    if !node.is_variable() && entry.version != 0 {
        issues.push(Error::VersionOnNonVariable {
            node: node.label(),
            version: entry.version,
        });
    } else if node.is_variable() && entry.version > node.version() {
        issues.push(Error::VersionAhead {
            node: node.label(),
            version: entry.version,
            latest: node.version(),
        });
    }
}

/// An output of an [`IndexedNode`], addressed by node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexedEntry {
    pub node_id: u32,
    pub index: u32,
    pub version: u32,
}

#[derive(Debug, Clone)]
pub struct IndexedNode {
    pub op: Option<&'static Op>,
    pub attrs: NodeAttrs,
    pub inputs: Vec<IndexedEntry>,
    pub control_deps: Vec<u32>,
}

impl IndexedNode {
    pub fn is_variable(&self) -> bool {
        self.op.is_none()
    }
}

/// Read-only arena copy of a [`Graph`].
///
/// Nodes are stored in post order and refer to each other by `u32` id, so the
/// snapshot owns no shared handles and can be read from many threads.
#[derive(Debug, Clone)]
pub struct IndexedGraph {
    nodes: Vec<IndexedNode>,
    outputs: Vec<IndexedEntry>,
    input_nodes: Vec<u32>,
    /// `entry_offsets[id]` is the id of the first output entry of node `id`.
    entry_offsets: Vec<u32>,
}

impl IndexedGraph {
    pub fn new(graph: &Graph) -> Result<Self> {
        let order = graph.post_order()?;
        let ids: AHashMap<usize, u32> = order
            .iter()
            .enumerate()
            .map(|(id, ptr)| (ptr.key(), id as u32))
            .collect();
        // Post order covers every input and control dep, so lookups never miss.
        let lookup = |ptr: &NodePtr| ids[&ptr.key()];
        let index_entry = |entry: &NodeEntry| IndexedEntry {
            node_id: lookup(&entry.node),
            index: entry.index,
            version: entry.version,
        };

        let mut nodes = Vec::with_capacity(order.len());
        let mut input_nodes = Vec::new();
        let mut entry_offsets = Vec::with_capacity(order.len() + 1);
        entry_offsets.push(0);

        for (id, ptr) in order.iter().enumerate() {
            let node = ptr.borrow();
            if node.is_variable() {
                input_nodes.push(id as u32);
            }
            let last: u32 = entry_offsets.last().copied().unwrap_or_default();
            let next = last
                .checked_add(node.num_outputs()?)
                .ok_or_else(|| Error::Arity {
                    op: node.label(),
                    reason: "total number of output entries overflows u32".to_owned(),
                })?;
            entry_offsets.push(next);

            nodes.push(IndexedNode {
                op: node.op,
                attrs: node.attrs.clone(),
                inputs: node.inputs.iter().map(index_entry).collect(),
                control_deps: node.control_deps.iter().map(lookup).collect(),
            });
        }

        let outputs = graph.outputs.iter().map(index_entry).collect();

        debug!(
            "Indexed graph with {} node(s) and {} entries",
            nodes.len(),
            entry_offsets.last().copied().unwrap_or_default()
        );

        Ok(Self {
            nodes,
            outputs,
            input_nodes,
            entry_offsets,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: u32) -> Option<&IndexedNode> {
        self.nodes.get(id as usize)
    }

    pub fn nodes(&self) -> &[IndexedNode] {
        &self.nodes
    }

    pub fn outputs(&self) -> &[IndexedEntry] {
        &self.outputs
    }

    /// Ids of the variable nodes.
    pub fn input_nodes(&self) -> &[u32] {
        &self.input_nodes
    }

    pub fn num_node_entries(&self) -> u32 {
        self.entry_offsets.last().copied().unwrap_or_default()
    }

    /// Dense id of an output entry, unique across the whole graph.
    ///
    /// # Panics
    /// Panics if `entry.node_id` is not a node of this graph.
    pub fn entry_id(&self, entry: &IndexedEntry) -> u32 {
        self.entry_offsets[entry.node_id as usize] + entry.index
    }
}
