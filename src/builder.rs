use crate::attrs::NodeAttrs;
use crate::error::{Error, Result};
use crate::node::{Node, NodeEntry, NodePtr};
use crate::op::OpRegistry;
use log::{debug, trace};

/// Creates nodes against an op registry and keeps variable versions
/// consistent while wiring them.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder<'r> {
    registry: &'r OpRegistry,
}

impl<'r> GraphBuilder<'r> {
    pub fn new(registry: &'r OpRegistry) -> Self {
        Self { registry }
    }

    /// A fresh placeholder variable, referenced at version 0.
    pub fn variable(&self, name: impl Into<String>) -> NodeEntry {
        NodeEntry::variable(Node::create_variable(name))
    }

    /// Applies `op_name` to `inputs` and returns one entry per output.
    ///
    /// Attributes are parsed through the op, the input count is checked
    /// against the resolved arity and variable inputs are stamped with their
    /// versions, bumping the ones the op mutates.
    pub fn apply<I, K, V>(
        &self,
        op_name: &str,
        name: impl Into<String>,
        attrs: I,
        scalars: Vec<f64>,
        inputs: Vec<NodeEntry>,
    ) -> Result<Vec<NodeEntry>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let op = self.registry.find(op_name)?;

        let mut node = Node::default();
        node.op = Some(op);
        node.attrs = NodeAttrs::named(name);
        node.attrs.scalars = scalars;
        for (key, value) in attrs {
            node.attrs.set(key, value);
        }
        op.parse_attrs(&mut node.attrs)?;

        let expected = node.num_inputs()?;
        if expected as usize != inputs.len() {
            return Err(Error::InputCountMismatch {
                node: node.label(),
                expected,
                actual: inputs.len(),
            });
        }
        node.inputs = inputs;
        update_versions(&mut node)?;

        let num_outputs = node.num_outputs()?;
        debug!(
            "Created node {} with {} input(s) and {} output(s)",
            node.label(),
            node.inputs.len(),
            num_outputs
        );

        let node = NodePtr::new(node);
        Ok((0..num_outputs)
            .map(|index| NodeEntry::output(node.clone(), index))
            .collect())
    }

    /// Orders `dep` before `node` without a data edge.
    pub fn add_control_dep(&self, node: &NodePtr, dep: NodePtr) {
        trace!("Control dependency {} -> {}", dep.label(), node.label());
        node.borrow_mut().control_deps.push(dep);
    }
}

/// Stamps variable inputs of `node` with their latest version, then bumps the
/// version of every input the op mutates.
///
/// All mutated inputs are validated before any version changes, so a failure
/// leaves every variable untouched. Each input is bumped once even if the op
/// lists it more than once.
pub fn update_versions(node: &mut Node) -> Result<()> {
    let Some(op) = node.op else {
        return Ok(());
    };

    let mut mutated = op.mutate_inputs(&node.attrs);
    mutated.sort_unstable();
    mutated.dedup();

    for &input in &mutated {
        match node.inputs.get(input as usize) {
            None => {
                return Err(Error::InvalidMutateInput {
                    node: node.label(),
                    input,
                    num_inputs: node.inputs.len(),
                })
            }
            Some(entry) if !entry.node.is_variable() => {
                return Err(Error::MutateNonVariable {
                    node: node.label(),
                    input,
                })
            }
            Some(_) => {}
        }
    }

    for entry in node.inputs.iter_mut() {
        if entry.node.is_variable() {
            entry.version = entry.node.borrow().version();
        }
    }

    for input in mutated {
        let entry = &mut node.inputs[input as usize];
        if let Some(version) = entry.node.borrow_mut().bump_version() {
            entry.version = version;
        }
        trace!(
            "Variable {} now at version {}",
            entry.node.label(),
            entry.version
        );
    }

    Ok(())
}
