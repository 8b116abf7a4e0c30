use std::fmt;

/// Loosely typed attribute argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Int(v) => Some(*v as f32),
            Value::Float(v) => Some(*v as f32),
            Value::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Non-negative integral value.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Int(v) => u32::try_from(*v).ok(),
            Value::Float(v) if *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64 => {
                Some(*v as u32)
            }
            Value::Float(_) => None,
            Value::Str(s) => s.trim().parse().ok(),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
        }
    }
}

/// Reads `N` floats, `None` if there are too few or one is not numeric.
pub(crate) fn floats<const N: usize>(values: &[Value]) -> Option<[f32; N]> {
    if values.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (o, v) in out.iter_mut().zip(values) {
        *o = v.as_f32()?;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_conversions() {
        assert_eq!(Value::from(3).as_f32(), Some(3.0));
        assert_eq!(Value::from("2.5").as_f32(), Some(2.5));
        assert_eq!(Value::from(-1).as_u32(), None);
        assert_eq!(Value::from(800.0).as_u32(), Some(800));
        assert_eq!(Value::from(1.5).as_u32(), None);
    }

    #[test]
    fn floats_requires_enough_values() {
        let v = [Value::from(1), Value::from(2.0)];
        assert_eq!(floats::<2>(&v), Some([1.0, 2.0]));
        assert_eq!(floats::<3>(&v), None);
        assert_eq!(floats::<1>(&[Value::from("x")]), None);
    }
}
