//! Form-style parameter serialization.
//!
//! [`Params`] is an insertion-ordered mapping from field names to values.
//! [`Params::encode`] turns it into `key=value` pairs joined with `&`, with
//! keys and values percent-encoded as URL components and spaces written as
//! `+`. The same string works as a query string or a form-encoded body.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left as-is when encoding a URL component.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode one key or value.
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

/// A zero-argument function producing a value at encode time.
pub type Producer = Arc<dyn Fn() -> String + Send + Sync>;

/// A single parameter value.
#[derive(Clone)]
pub enum ParamValue {
    /// Emitted once.
    Scalar(String),
    /// Emitted once per element, repeating the key.
    List(Vec<String>),
    /// Called on every encode; its result is emitted once.
    Producer(Producer),
}

impl ParamValue {
    /// Wrap a function that yields the value when the params are encoded.
    pub fn producer<F, T>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: ToString,
    {
        ParamValue::Producer(Arc::new(move || f().to_string()))
    }

    /// Wrap any sequence of displayable values.
    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        ParamValue::List(values.into_iter().map(|v| v.to_string()).collect())
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            ParamValue::List(values) => f.debug_tuple("List").field(values).finish(),
            ParamValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::List(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::list(values)
    }
}

macro_rules! scalar_from_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    ParamValue::Scalar(value.to_string())
                }
            }
        )*
    };
}

scalar_from_display!(bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Insertion-ordered request parameters.
///
/// Re-inserting an existing key replaces its value but keeps its position.
#[derive(Debug, Clone, Default)]
pub struct Params {
    entries: IndexMap<String, ParamValue>,
}

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the one it replaced.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder form of [`Params::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add a repeated-key list.
    pub fn with_list<I, T>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.with(key, ParamValue::list(values))
    }

    /// Add a value computed at encode time.
    pub fn with_producer<F, T>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: ToString,
    {
        self.with(key, ParamValue::producer(f))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to a URL-encoded string.
    pub fn encode(&self) -> String {
        let mut pairs = Vec::with_capacity(self.entries.len());

        for (key, value) in &self.entries {
            match value {
                ParamValue::Scalar(v) => pairs.push(pair(key, v)),
                ParamValue::List(values) => pairs.extend(values.iter().map(|v| pair(key, v))),
                ParamValue::Producer(f) => pairs.push(pair(key, &f())),
            }
        }

        // `%` itself encodes to `%25`, so only encoded spaces match here.
        pairs.join("&").replace("%20", "+")
    }
}

fn pair(key: &str, value: &str) -> String {
    format!("{}={}", encode_component(key), encode_component(value))
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}
