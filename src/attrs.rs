use crate::error::{Error, Result};
use crate::parser::{parse_value, render_errors, FromAttr};
use ahash::AHashMap;
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// Named attributes of a node before they are parsed.
pub type AttrDict = AHashMap<String, String>;

/// Operator specific structure produced by an op's attribute parser.
pub trait AttrParam: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Debug + Send + Sync> AttrParam for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The attributes of a node, e.g. `axis` or `epsilon`.
#[derive(Debug, Clone, Default)]
pub struct NodeAttrs {
    /// Used for diagnostics only, not required to be unique.
    pub name: String,
    /// Positional attributes.
    pub scalars: Vec<f64>,
    pub dict: AttrDict,
    /// Cached structured view of `scalars`/`dict`, set by the op's attribute parser.
    /// Not invalidated when the raw attributes change afterwards.
    pub parsed: Option<Arc<dyn AttrParam>>,
}

impl NodeAttrs {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.dict.insert(key.into(), value.into());
    }

    /// The parsed attributes, if populated and of type `P`.
    pub fn parsed_as<P: AttrParam>(&self) -> Option<&P> {
        let param: &dyn AttrParam = self.parsed.as_deref()?;
        <dyn AttrParam as AttrParam>::as_any(param).downcast_ref::<P>()
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed.is_some()
    }

    pub fn reader(&self) -> AttrReader<'_> {
        AttrReader::new(&self.scalars, &self.dict)
    }
}

/// Typed read access to raw `(scalars, dict)` attributes.
#[derive(Debug, Clone, Copy)]
pub struct AttrReader<'a> {
    scalars: &'a [f64],
    dict: &'a AttrDict,
}

impl<'a> AttrReader<'a> {
    pub fn new(scalars: &'a [f64], dict: &'a AttrDict) -> Self {
        Self { scalars, dict }
    }

    pub fn scalar(&self, position: usize) -> Option<f64> {
        self.scalars.get(position).copied()
    }

    /// The raw, unparsed dictionary value.
    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.dict.get(key).map(String::as_str)
    }

    pub fn get<T: FromAttr>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.dict.get(key) else {
            return Ok(None);
        };

        let value = parse_value(raw).map_err(|errs| Error::AttrParse {
            key: key.to_owned(),
            value: raw.clone(),
            report: render_errors(key, raw, errs),
        })?;

        T::from_attr(&value)
            .map(Some)
            .ok_or_else(|| Error::AttrType {
                key: key.to_owned(),
                expected: T::EXPECTED,
                found: raw.clone(),
            })
    }

    pub fn get_or<T: FromAttr>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    pub fn require<T: FromAttr>(&self, key: &str) -> Result<T> {
        self.get(key)?.ok_or_else(|| Error::MissingAttr {
            key: key.to_owned(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct AxisParam {
        axis: i64,
    }

    fn attrs(pairs: &[(&str, &str)]) -> NodeAttrs {
        let mut attrs = NodeAttrs::named("n");
        for (k, v) in pairs {
            attrs.set(*k, *v);
        }
        attrs
    }

    #[test]
    fn test_parsed_absent_by_default() {
        let attrs = NodeAttrs::default();
        assert!(!attrs.is_parsed());
        assert_eq!(attrs.parsed_as::<AxisParam>(), None);
    }

    #[test]
    fn test_parsed_typed_access() {
        let mut attrs = NodeAttrs::default();
        attrs.parsed = Some(Arc::new(AxisParam { axis: 2 }));

        assert_eq!(attrs.parsed_as::<AxisParam>(), Some(&AxisParam { axis: 2 }));
        // Wrong type reads as absent rather than failing.
        assert_eq!(attrs.parsed_as::<u32>(), None);
    }

    #[test]
    fn test_reader_typed() {
        let attrs = attrs(&[("axis", "-1"), ("eps", "1e-5"), ("shape", "(2, 3)"), ("flag", "True")]);
        let reader = attrs.reader();

        assert_eq!(reader.require::<i64>("axis"), Ok(-1));
        assert_eq!(reader.require::<f64>("eps"), Ok(1e-5));
        assert_eq!(reader.require::<Vec<i64>>("shape"), Ok(vec![2, 3]));
        assert_eq!(reader.require::<bool>("flag"), Ok(true));
        assert_eq!(reader.get::<i64>("missing"), Ok(None));
        assert_eq!(reader.get_or::<u32>("missing", 4), Ok(4));
    }

    #[test]
    fn test_reader_errors() {
        let attrs = attrs(&[("axis", "-1"), ("bad", "(1,")]);
        let reader = attrs.reader();

        assert_eq!(
            reader.require::<u32>("axis"),
            Err(Error::AttrType {
                key: "axis".into(),
                expected: "non-negative 32-bit integer",
                found: "-1".into(),
            })
        );
        assert_eq!(
            reader.require::<u32>("num_args"),
            Err(Error::MissingAttr {
                key: "num_args".into()
            })
        );
        assert!(matches!(
            reader.get::<Vec<i64>>("bad"),
            Err(Error::AttrParse { key, .. }) if key == "bad"
        ));
    }

    #[test]
    fn test_reader_scalars() {
        let mut attrs = NodeAttrs::default();
        attrs.scalars = vec![0.5, 2.0];
        let reader = attrs.reader();

        assert_eq!(reader.scalar(1), Some(2.0));
        assert_eq!(reader.scalar(2), None);
    }
}
