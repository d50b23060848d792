use std::cmp::Ordering;
use std::fmt;

/// The type tag of a [`YarnValue`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Str,
    Bool,
    Number,
    Null,
}

impl ValueKind {
    /// The name used for this kind when variables are written out as text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Null => "null",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::Str),
            "bool" => Some(Self::Bool),
            "number" => Some(Self::Number),
            "null" => Some(Self::Null),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// `PartialEq` is structural. Script operators go through `equals` and
// `compare`, which convert between types first.
#[derive(Debug, Clone, PartialEq)]
pub enum YarnValue {
    Str(String),
    Bool(bool),
    Number(f32),
    Null,
}

impl YarnValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Str(_) => ValueKind::Str,
            Self::Bool(_) => ValueKind::Bool,
            Self::Number(_) => ValueKind::Number,
            Self::Null => ValueKind::Null,
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            Self::Str(val) => {
                val.clone()
            }
            Self::Number(val) => {
                if val.is_nan() {
                    "NaN".to_string()
                } else {
                    val.to_string()
                }
            }
            Self::Bool(val) => {
                match val {
                    true => "True".to_string(),
                    false => "False".to_string(),
                }
            }
            Self::Null => {
                "null".to_string()
            }
        }
    }

    pub fn as_number(&self) -> f32 {
        match self {
            Self::Str(val) => {
                val.trim().parse::<f32>()
                    .unwrap_or(0.0)
            }
            Self::Number(val) => {
                *val
            }
            Self::Bool(val) => {
                if *val { 1.0 } else { 0.0 }
            }
            Self::Null => {
                0.0
            }
        }
    }

    /// Truthiness used by conditionals: non-empty strings, non-zero numbers.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Str(val) => {
                !val.is_empty()
            }
            Self::Bool(val) => {
                *val
            }
            Self::Number(val) => {
                !val.is_nan() && *val != 0.0
            }
            Self::Null => {
                false
            }
        }
    }

    pub fn add(&self, other: &Self) -> Option<Self> {
        let res = match (self, other) {
            // catches:
            // number + string
            // string + string
            // bool + string
            // null + string
            (Self::Str(_), _)
                | (_, Self::Str(_))
                => {
                Self::Str(self.as_string() + &other.as_string())
            }
            // catches:
            // number + number
            // bool (=> 0 or 1) + number
            // null (=> 0) + number
            // bool (=> 0 or 1) + bool (=> 0 or 1)
            // null (=> 0) + null (=> 0)
            (Self::Number(_), _)
                | (_, Self::Number(_))
                | (Self::Bool(_), Self::Bool(_))
                | (Self::Null, Self::Null)
                => {
                Self::Number(self.as_number() + other.as_number())
            }
            _ => {
                return None;
            }
        };
        Some(res)
    }

    pub fn sub(&self, other: &Self) -> Option<Self> {
        self.numeric_op(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &Self) -> Option<Self> {
        self.numeric_op(other, |a, b| a * b)
    }

    pub fn div(&self, other: &Self) -> Option<Self> {
        self.numeric_op(other, |a, b| a / b)
    }

    pub fn rem(&self, other: &Self) -> Option<Self> {
        self.numeric_op(other, |a, b| a % b)
    }

    pub fn neg(&self) -> Self {
        match self {
            Self::Number(val) => {
                Self::Number(-val)
            }
            Self::Str(val) if val.trim().is_empty() => {
                Self::Number(-0.0)
            }
            Self::Null => {
                Self::Number(-0.0)
            }
            _ => {
                Self::Number(std::f32::NAN)
            }
        }
    }

    /// Equality as seen by `==` in scripts. A string on either side compares
    /// text; anything else compares as numbers, so `null == 0`.
    pub fn equals(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Ordering as seen by `<`, `>` and friends in scripts. `None` when a
    /// number is NaN.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Str(_), _) | (_, Self::Str(_)) => {
                Some(self.as_string().cmp(&other.as_string()))
            }
            _ => {
                self.as_number().partial_cmp(&other.as_number())
            }
        }
    }

    fn numeric_op<F>(&self, other: &Self, op: F) -> Option<Self>
    where
        F: Fn(f32, f32) -> f32,
    {
        match (self, other) {
            (Self::Number(_), Self::Number(_))
                | (Self::Number(_), Self::Null)
                | (Self::Null, Self::Number(_))
                => {
                Some(Self::Number(op(self.as_number(), other.as_number())))
            }
            _ => None,
        }
    }
}

impl fmt::Display for YarnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<String> for YarnValue {
    fn from(val: String) -> Self {
        Self::Str(val)
    }
}

impl From<&str> for YarnValue {
    fn from(val: &str) -> Self {
        Self::Str(val.to_string())
    }
}

impl From<f32> for YarnValue {
    fn from(val: f32) -> Self {
        Self::Number(val)
    }
}

impl From<f64> for YarnValue {
    fn from(val: f64) -> Self {
        Self::Number(val as f32)
    }
}

impl From<bool> for YarnValue {
    fn from(val: bool) -> Self {
        Self::Bool(val)
    }
}
