//! Graph vertices and the entries that connect them.

use crate::attrs::NodeAttrs;
use crate::error::Result;
use crate::op::Op;
use std::cell::{Ref, RefCell, RefMut};
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::Arc;

/// Shared handle to a [`Node`].
///
/// Cloning aliases the same node; equality and hashing follow node identity.
/// Handles are confined to one thread, use
/// [`IndexedGraph`](crate::graph::IndexedGraph) to share a graph across threads.
#[derive(Clone)]
pub struct NodePtr(Rc<RefCell<Node>>);

/// Non-owning handle to a [`Node`].
#[derive(Clone)]
pub struct NodeWeak(Weak<RefCell<Node>>);

/// Version bookkeeping stored in the parsed slot of variable nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariableParam {
    /// Number of times the variable was written by a mutating op.
    pub version: u32,
}

/// One output of one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeEntry {
    pub node: NodePtr,
    /// Position among the outputs of `node`, not bounds checked.
    pub index: u32,
    /// Mutation version of a variable `node`, always 0 for op outputs.
    pub version: u32,
}

/// An operation in the computation graph, or a placeholder variable when
/// `op` is `None`.
#[derive(Debug, Default)]
pub struct Node {
    pub op: Option<&'static Op>,
    pub inputs: Vec<NodeEntry>,
    /// Nodes that must run before this one without passing it any data.
    pub control_deps: Vec<NodePtr>,
    pub attrs: NodeAttrs,
}

impl Node {
    /// Creates an empty node behind a shared handle.
    pub fn create() -> NodePtr {
        NodePtr::new(Node::default())
    }

    pub fn create_variable(name: impl Into<String>) -> NodePtr {
        let mut node = Node::default();
        node.attrs = NodeAttrs::named(name);
        node.attrs.parsed = Some(Arc::new(VariableParam::default()));
        NodePtr::new(node)
    }

    pub fn is_variable(&self) -> bool {
        self.op.is_none()
    }

    /// A variable has exactly one output, itself.
    pub fn num_outputs(&self) -> Result<u32> {
        match self.op {
            None => Ok(1),
            Some(op) => op.num_outputs(&self.attrs),
        }
    }

    /// The number of inputs the op declares, which may differ from
    /// `inputs.len()` in a graph under construction. Variables take none.
    pub fn num_inputs(&self) -> Result<u32> {
        match self.op {
            None => Ok(0),
            Some(op) => op.num_inputs(&self.attrs),
        }
    }

    /// Runs the op's attribute parser unless the attributes are already parsed.
    pub fn ensure_parsed(&mut self) -> Result<()> {
        match self.op {
            Some(op) if !self.attrs.is_parsed() => op.parse_attrs(&mut self.attrs),
            _ => Ok(()),
        }
    }

    /// Latest mutation version of a variable, 0 for op nodes.
    pub fn version(&self) -> u32 {
        if !self.is_variable() {
            return 0;
        }
        self.attrs
            .parsed_as::<VariableParam>()
            .map(|param| param.version)
            .unwrap_or_default()
    }

    /// Records one more mutation of a variable and returns the new version.
    /// Returns `None` for op nodes.
    pub fn bump_version(&mut self) -> Option<u32> {
        if !self.is_variable() {
            return None;
        }
        let version = self.version() + 1;
        self.attrs.parsed = Some(Arc::new(VariableParam { version }));
        Some(version)
    }

    /// Name for diagnostics.
    pub fn label(&self) -> String {
        let name = if self.attrs.name.is_empty() {
            "<unnamed>"
        } else {
            self.attrs.name.as_str()
        };
        match self.op {
            Some(op) => format!("{}({})", name, op.name()),
            None => name.to_owned(),
        }
    }
}

impl Drop for Node {
    // Unlinks uniquely owned predecessors one by one so long chains do not
    // recurse through nested drops.
    fn drop(&mut self) {
        if self.inputs.is_empty() && self.control_deps.is_empty() {
            return;
        }

        let mut pending: Vec<NodePtr> = self.inputs.drain(..).map(|entry| entry.node).collect();
        pending.append(&mut self.control_deps);

        while let Some(NodePtr(rc)) = pending.pop() {
            if let Ok(cell) = Rc::try_unwrap(rc) {
                let mut node = cell.into_inner();
                pending.extend(node.inputs.drain(..).map(|entry| entry.node));
                pending.append(&mut node.control_deps);
            }
        }
    }
}

impl NodePtr {
    pub fn new(node: Node) -> Self {
        Self(Rc::new(RefCell::new(node)))
    }

    /// Panics if the node is currently borrowed mutably.
    pub fn borrow(&self) -> Ref<'_, Node> {
        self.0.borrow()
    }

    /// Panics if the node is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, Node> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the node, stable while any strong handle is alive.
    pub fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn downgrade(&self) -> NodeWeak {
        NodeWeak(Rc::downgrade(&self.0))
    }

    pub fn is_variable(&self) -> bool {
        self.borrow().is_variable()
    }

    pub fn num_outputs(&self) -> Result<u32> {
        self.borrow().num_outputs()
    }

    pub fn num_inputs(&self) -> Result<u32> {
        self.borrow().num_inputs()
    }

    pub fn label(&self) -> String {
        match self.0.try_borrow() {
            Ok(node) => node.label(),
            Err(_) => "<borrowed>".to_owned(),
        }
    }
}

impl PartialEq for NodePtr {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for NodePtr {}

impl Hash for NodePtr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl std::fmt::Debug for NodePtr {
    // Only the label, edges may form cycles.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodePtr({})", self.label())
    }
}

impl NodeWeak {
    pub fn upgrade(&self) -> Option<NodePtr> {
        self.0.upgrade().map(NodePtr)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl std::fmt::Debug for NodeWeak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeWeak(alive: {})", self.is_alive())
    }
}

impl NodeEntry {
    pub fn new(node: NodePtr, index: u32, version: u32) -> Self {
        Self {
            node,
            index,
            version,
        }
    }

    /// Output `index` of an op node.
    pub fn output(node: NodePtr, index: u32) -> Self {
        Self::new(node, index, 0)
    }

    /// The latest version of a variable node.
    pub fn variable(node: NodePtr) -> Self {
        let version = node.borrow().version();
        Self::new(node, 0, version)
    }

    pub fn is_variable(&self) -> bool {
        self.node.is_variable()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::op::{Op, OpRegistry};

    #[test]
    fn test_create_is_empty_variable() {
        let node = Node::create();
        let node = node.borrow();

        assert!(node.is_variable());
        assert!(node.inputs.is_empty());
        assert!(node.control_deps.is_empty());
        assert_eq!(node.attrs.name, "");
        assert!(!node.attrs.is_parsed());
        assert_eq!(node.num_outputs(), Ok(1));
        assert_eq!(node.num_inputs(), Ok(0));
    }

    #[test]
    fn test_op_arity() {
        let registry = OpRegistry::new();
        let op = registry
            .register(Op::new("pair").set_num_inputs(3).set_num_outputs(2))
            .unwrap();
        let node = Node::create();
        node.borrow_mut().op = Some(op);

        assert!(!node.is_variable());
        assert_eq!(node.num_inputs(), Ok(3));
        assert_eq!(node.num_outputs(), Ok(2));
    }

    #[test]
    fn test_variable_versions() {
        let var = Node::create_variable("w");
        assert_eq!(var.borrow().version(), 0);

        assert_eq!(var.borrow_mut().bump_version(), Some(1));
        assert_eq!(var.borrow_mut().bump_version(), Some(2));
        assert_eq!(NodeEntry::variable(var.clone()).version, 2);

        // Plain created nodes without bookkeeping start at version 0.
        let plain = Node::create();
        assert_eq!(plain.borrow_mut().bump_version(), Some(1));
    }

    #[test]
    fn test_bump_version_on_op_node() {
        let registry = OpRegistry::new();
        let node = Node::create();
        node.borrow_mut().op = Some(registry.register(Op::new("relu")).unwrap());

        assert_eq!(node.borrow_mut().bump_version(), None);
        assert_eq!(node.borrow().version(), 0);
    }

    #[test]
    fn test_entry_identity() {
        let node = Node::create();
        let a = NodeEntry::output(node.clone(), 0);
        let b = NodeEntry::output(node.clone(), 0);
        let c = NodeEntry::output(Node::create(), 0);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, NodeEntry::new(node, 1, 0));
    }

    #[test]
    fn test_label() {
        let registry = OpRegistry::new();
        let node = Node::create();
        assert_eq!(node.label(), "<unnamed>");

        node.borrow_mut().attrs.name = "fc1".into();
        node.borrow_mut().op = Some(registry.register(Op::new("dense")).unwrap());
        assert_eq!(node.label(), "fc1(dense)");
        assert_eq!(format!("{:?}", node), "NodePtr(fc1(dense))");
    }

    #[test]
    fn test_drop_deep_chain() {
        let root = Node::create();
        let weak = root.downgrade();
        let mut tail = root;
        for _ in 0..200_000 {
            let next = Node::create();
            next.borrow_mut().inputs.push(NodeEntry::output(tail, 0));
            tail = next;
        }

        drop(tail);
        assert!(!weak.is_alive());
    }
}
