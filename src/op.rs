use crate::attrs::{AttrDict, AttrParam, AttrReader, NodeAttrs};
use crate::error::{Error, Result};
use crate::ops::register_builtin;
use ahash::AHashMap;
use log::{debug, warn};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

pub type ArityFn = Box<dyn Fn(&NodeAttrs) -> Result<u32> + Send + Sync>;
pub type AttrParserFn = Box<dyn Fn(&[f64], &AttrDict) -> Result<Arc<dyn AttrParam>> + Send + Sync>;
pub type MutateInputsFn = Box<dyn Fn(&NodeAttrs) -> Vec<u32> + Send + Sync>;

/// Number of inputs or outputs of an op.
pub enum Arity {
    Fixed(u32),
    /// Resolved from the node's attributes on every query.
    Dynamic(ArityFn),
}

impl Arity {
    pub fn resolve(&self, attrs: &NodeAttrs) -> Result<u32> {
        match self {
            Self::Fixed(count) => Ok(*count),
            Self::Dynamic(get_count) => get_count(attrs),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }
}

impl std::fmt::Debug for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(count) => write!(f, "Fixed({})", count),
            Self::Dynamic(_) => write!(f, "Dynamic"),
        }
    }
}

/// Immutable descriptor of an operator kind.
///
/// Built with the `set_*` chain and handed to an [`OpRegistry`], which owns it
/// for the rest of the process. Nodes only hold `&'static Op`.
pub struct Op {
    name: String,
    description: String,
    num_inputs: Arity,
    num_outputs: Arity,
    attr_parser: Option<AttrParserFn>,
    mutate_inputs: Option<MutateInputsFn>,
}

impl Op {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            num_inputs: Arity::Fixed(1),
            num_outputs: Arity::Fixed(1),
            attr_parser: None,
            mutate_inputs: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn set_num_inputs(mut self, count: u32) -> Self {
        self.num_inputs = Arity::Fixed(count);
        self
    }

    pub fn set_num_outputs(mut self, count: u32) -> Self {
        self.num_outputs = Arity::Fixed(count);
        self
    }

    pub fn set_num_inputs_fn<F>(mut self, get_count: F) -> Self
    where
        F: Fn(&NodeAttrs) -> Result<u32> + Send + Sync + 'static,
    {
        self.num_inputs = Arity::Dynamic(Box::new(get_count));
        self
    }

    pub fn set_num_outputs_fn<F>(mut self, get_count: F) -> Self
    where
        F: Fn(&NodeAttrs) -> Result<u32> + Send + Sync + 'static,
    {
        self.num_outputs = Arity::Dynamic(Box::new(get_count));
        self
    }

    pub fn set_attr_parser<P, F>(mut self, parse: F) -> Self
    where
        P: AttrParam,
        F: Fn(&AttrReader<'_>) -> Result<P> + Send + Sync + 'static,
    {
        self.attr_parser = Some(Box::new(move |scalars: &[f64], dict: &AttrDict| {
            let param = parse(&AttrReader::new(scalars, dict))?;
            Ok(Arc::new(param) as Arc<dyn AttrParam>)
        }));
        self
    }

    /// Marks the input positions this op writes to.
    pub fn set_mutate_inputs<F>(mut self, get_inputs: F) -> Self
    where
        F: Fn(&NodeAttrs) -> Vec<u32> + Send + Sync + 'static,
    {
        self.mutate_inputs = Some(Box::new(get_inputs));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn num_inputs(&self, attrs: &NodeAttrs) -> Result<u32> {
        self.num_inputs.resolve(attrs)
    }

    pub fn num_outputs(&self, attrs: &NodeAttrs) -> Result<u32> {
        self.num_outputs.resolve(attrs)
    }

    pub fn input_arity(&self) -> &Arity {
        &self.num_inputs
    }

    pub fn output_arity(&self) -> &Arity {
        &self.num_outputs
    }

    /// Runs the registered attribute parser, if any, and stores its result in
    /// `attrs.parsed`.
    pub fn parse_attrs(&self, attrs: &mut NodeAttrs) -> Result<()> {
        if let Some(parse) = &self.attr_parser {
            attrs.parsed = Some(parse(&attrs.scalars, &attrs.dict)?);
        }
        Ok(())
    }

    pub fn mutate_inputs(&self, attrs: &NodeAttrs) -> Vec<u32> {
        match &self.mutate_inputs {
            Some(get_inputs) => get_inputs(attrs),
            None => Vec::new(),
        }
    }
}

impl std::fmt::Debug for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Op")
            .field("name", &self.name)
            .field("num_inputs", &self.num_inputs)
            .field("num_outputs", &self.num_outputs)
            .field("attr_parser", &self.attr_parser.is_some())
            .field("mutate_inputs", &self.mutate_inputs.is_some())
            .finish()
    }
}

/// Owns op descriptors for the lifetime of the process.
#[derive(Debug, Default)]
pub struct OpRegistry {
    ops: RwLock<AHashMap<String, &'static Op>>,
}

static GLOBAL: OnceLock<OpRegistry> = OnceLock::new();

impl OpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin() -> Result<Self> {
        let registry = Self::new();
        register_builtin(&registry)?;
        Ok(registry)
    }

    /// Process-wide registry, preloaded with the builtin ops.
    pub fn global() -> &'static OpRegistry {
        GLOBAL.get_or_init(|| {
            let registry = Self::new();
            if let Err(err) = register_builtin(&registry) {
                warn!("Failed to register builtin ops: {}", err);
            }
            registry
        })
    }

    pub fn register(&self, op: Op) -> Result<&'static Op> {
        let mut ops = self.ops.write().unwrap_or_else(PoisonError::into_inner);
        if ops.contains_key(op.name()) {
            return Err(Error::DuplicateOp(op.name().to_owned()));
        }

        debug!("Registering op {:?}", op);
        let op: &'static Op = Box::leak(Box::new(op));
        ops.insert(op.name().to_owned(), op);
        Ok(op)
    }

    pub fn get(&self, name: &str) -> Option<&'static Op> {
        let ops = self.ops.read().unwrap_or_else(PoisonError::into_inner);
        ops.get(name).copied()
    }

    pub fn find(&self, name: &str) -> Result<&'static Op> {
        self.get(name)
            .ok_or_else(|| Error::UnknownOp(name.to_owned()))
    }

    pub fn list_names(&self) -> Vec<String> {
        let ops = self.ops.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = ops.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct CountParam {
        count: u32,
    }

    #[test]
    fn test_register_and_find() {
        let registry = OpRegistry::new();
        let op = registry
            .register(Op::new("relu").describe("Rectified linear unit."))
            .unwrap();

        assert!(std::ptr::eq(op, registry.find("relu").unwrap()));
        assert_eq!(op.description(), "Rectified linear unit.");
        assert_eq!(
            registry.find("gelu").unwrap_err(),
            Error::UnknownOp("gelu".into())
        );
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = OpRegistry::new();
        registry.register(Op::new("relu")).unwrap();

        assert_eq!(
            registry.register(Op::new("relu")).unwrap_err(),
            Error::DuplicateOp("relu".into())
        );
    }

    #[test]
    fn test_default_arity() {
        let op = Op::new("identity");
        let attrs = NodeAttrs::default();

        assert_eq!(op.num_inputs(&attrs), Ok(1));
        assert_eq!(op.num_outputs(&attrs), Ok(1));
        assert!(!op.output_arity().is_dynamic());
    }

    #[test]
    fn test_dynamic_arity_reads_attrs() {
        let op = Op::new("stack")
            .set_num_inputs_fn(|attrs| attrs.reader().require::<u32>("count"));
        let mut attrs = NodeAttrs::default();

        assert!(op.input_arity().is_dynamic());
        assert!(matches!(op.num_inputs(&attrs), Err(Error::MissingAttr { .. })));

        attrs.set("count", "5");
        assert_eq!(op.num_inputs(&attrs), Ok(5));
    }

    #[test]
    fn test_parse_attrs() {
        let op = Op::new("stack").set_attr_parser(|reader| {
            Ok(CountParam {
                count: reader.require("count")?,
            })
        });
        let mut attrs = NodeAttrs::default();
        attrs.set("count", "3");

        op.parse_attrs(&mut attrs).unwrap();
        assert_eq!(attrs.parsed_as::<CountParam>(), Some(&CountParam { count: 3 }));
    }

    #[test]
    fn test_parse_attrs_without_parser() {
        let op = Op::new("identity");
        let mut attrs = NodeAttrs::default();

        op.parse_attrs(&mut attrs).unwrap();
        assert!(!attrs.is_parsed());
    }

    #[test]
    fn test_global_has_builtin() {
        let names = OpRegistry::global().list_names();
        assert!(names.contains(&"add".to_string()));
        assert!(names.contains(&"elemwise_sum".to_string()));
    }
}
