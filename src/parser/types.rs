pub type Span = std::ops::Range<usize>;

/// A dictionary attribute value after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Tuple(Vec<AttrValue>),
    None,
}

impl AttrValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(int) => Some(*int),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(float) => Some(*float),
            Self::Int(int) => Some(*int as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[AttrValue]> {
        match self {
            Self::Tuple(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

/// Conversion from a parsed [`AttrValue`] into a concrete attribute type.
pub trait FromAttr: Sized {
    /// Human readable name used in type errors.
    const EXPECTED: &'static str;

    fn from_attr(value: &AttrValue) -> Option<Self>;
}

impl FromAttr for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_attr(value: &AttrValue) -> Option<Self> {
        value.as_int()
    }
}

impl FromAttr for u32 {
    const EXPECTED: &'static str = "non-negative 32-bit integer";

    fn from_attr(value: &AttrValue) -> Option<Self> {
        value.as_int().and_then(|int| int.try_into().ok())
    }
}

impl FromAttr for usize {
    const EXPECTED: &'static str = "non-negative integer";

    fn from_attr(value: &AttrValue) -> Option<Self> {
        value.as_int().and_then(|int| int.try_into().ok())
    }
}

impl FromAttr for f64 {
    const EXPECTED: &'static str = "number";

    fn from_attr(value: &AttrValue) -> Option<Self> {
        value.as_float()
    }
}

impl FromAttr for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_attr(value: &AttrValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromAttr for String {
    const EXPECTED: &'static str = "string";

    fn from_attr(value: &AttrValue) -> Option<Self> {
        match value {
            AttrValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromAttr for Vec<i64> {
    const EXPECTED: &'static str = "tuple of integers";

    fn from_attr(value: &AttrValue) -> Option<Self> {
        value.as_tuple()?.iter().map(AttrValue::as_int).collect()
    }
}

impl FromAttr for Vec<f64> {
    const EXPECTED: &'static str = "tuple of numbers";

    fn from_attr(value: &AttrValue) -> Option<Self> {
        value.as_tuple()?.iter().map(AttrValue::as_float).collect()
    }
}
