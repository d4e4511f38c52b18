//! A handful of builtin ops that exercise fixed, dynamic and mutating arity.

use crate::attrs::NodeAttrs;
use crate::error::Result;
use crate::op::{Op, OpRegistry};

#[derive(Debug, Clone, PartialEq)]
pub struct ElemwiseSumParam {
    pub num_args: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitParam {
    pub num_outputs: u32,
    pub axis: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleParam {
    pub factor: f64,
}

fn num_args(attrs: &NodeAttrs) -> Result<u32> {
    attrs.reader().require("num_args")
}

fn num_split_outputs(attrs: &NodeAttrs) -> Result<u32> {
    attrs.reader().require("num_outputs")
}

pub fn register_builtin(registry: &OpRegistry) -> Result<()> {
    registry.register(
        Op::new("add")
            .describe("Elementwise sum of two operands.")
            .set_num_inputs(2),
    )?;

    registry.register(
        Op::new("elemwise_sum")
            .describe("Elementwise sum of `num_args` operands.")
            .set_num_inputs_fn(num_args)
            .set_attr_parser(|reader| {
                Ok(ElemwiseSumParam {
                    num_args: reader.require("num_args")?,
                })
            }),
    )?;

    registry.register(
        Op::new("split")
            .describe("Split one operand into `num_outputs` parts along `axis`.")
            .set_num_outputs_fn(num_split_outputs)
            .set_attr_parser(|reader| {
                Ok(SplitParam {
                    num_outputs: reader.require("num_outputs")?,
                    axis: reader.get_or("axis", 0)?,
                })
            }),
    )?;

    registry.register(
        Op::new("assign")
            .describe("Write the second operand into the first, which must be a variable.")
            .set_num_inputs(2)
            .set_mutate_inputs(|_| vec![0]),
    )?;

    registry.register(
        Op::new("scale")
            .describe("Multiply the operand by `scalars[0]` or the `scalar` attribute.")
            .set_attr_parser(|reader| {
                let factor = match reader.scalar(0) {
                    Some(factor) => factor,
                    None => reader.get_or("scalar", 1.0)?,
                };
                Ok(ScaleParam { factor })
            }),
    )?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;

    fn registry() -> OpRegistry {
        OpRegistry::with_builtin().unwrap()
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!(
            registry().list_names(),
            vec!["add", "assign", "elemwise_sum", "scale", "split"]
        );
    }

    #[test]
    fn test_register_twice_fails() {
        let registry = registry();
        assert_eq!(
            register_builtin(&registry),
            Err(Error::DuplicateOp("add".into()))
        );
    }

    #[test]
    fn test_elemwise_sum() {
        let op = registry().find("elemwise_sum").unwrap();
        let mut attrs = NodeAttrs::default();
        attrs.set("num_args", "4");

        assert_eq!(op.num_inputs(&attrs), Ok(4));
        assert_eq!(op.num_outputs(&attrs), Ok(1));
        op.parse_attrs(&mut attrs).unwrap();
        assert_eq!(
            attrs.parsed_as::<ElemwiseSumParam>(),
            Some(&ElemwiseSumParam { num_args: 4 })
        );
    }

    #[test]
    fn test_split_defaults() {
        let op = registry().find("split").unwrap();
        let mut attrs = NodeAttrs::default();
        attrs.set("num_outputs", "3");

        op.parse_attrs(&mut attrs).unwrap();
        assert_eq!(
            attrs.parsed_as::<SplitParam>(),
            Some(&SplitParam {
                num_outputs: 3,
                axis: 0
            })
        );
    }

    #[test]
    fn test_scale_prefers_scalars() {
        let op = registry().find("scale").unwrap();
        let mut attrs = NodeAttrs::default();
        attrs.set("scalar", "3");

        op.parse_attrs(&mut attrs).unwrap();
        assert_eq!(attrs.parsed_as::<ScaleParam>().unwrap().factor, 3.0);

        attrs.scalars.push(0.5);
        op.parse_attrs(&mut attrs).unwrap();
        assert_eq!(attrs.parsed_as::<ScaleParam>().unwrap().factor, 0.5);
    }

    #[test]
    fn test_assign_mutates_first_input() {
        let op = registry().find("assign").unwrap();
        assert_eq!(op.mutate_inputs(&NodeAttrs::default()), vec![0]);
    }
}
