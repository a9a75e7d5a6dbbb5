//! Query-string parameters for backend requests.
//!
//! # Design
//! `Query` keeps insertion order so the final URL lists parameters in the
//! order the caller supplied them. Values that are null or empty strings are
//! carried through but dropped at render time, so callers can pass optional
//! fields straight through without filtering them first.

/// A single query-string value before stringification.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl QueryValue {
    /// The string placed in the URL, or `None` when the entry must be omitted.
    ///
    /// Floats use Rust's shortest round-trip `Display`, which never switches to
    /// exponent notation: `1e21` renders as `1000000000000000000000` and `1e-7`
    /// as `0.0000001`, not `1e+21` / `1e-7`. Integral floats drop the fraction.
    pub fn render(&self) -> Option<String> {
        match self {
            QueryValue::Null => None,
            QueryValue::Str(s) if s.is_empty() => None,
            QueryValue::Str(s) => Some(s.clone()),
            QueryValue::Int(n) => Some(n.to_string()),
            QueryValue::Float(f) if f.is_infinite() => Some(
                if f.is_sign_positive() { "Infinity" } else { "-Infinity" }.to_string(),
            ),
            QueryValue::Float(f) => Some(f.to_string()),
            QueryValue::Bool(b) => Some(b.to_string()),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        QueryValue::Str(value.clone())
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

macro_rules! int_query_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for QueryValue {
                fn from(value: $t) -> Self {
                    QueryValue::Int(i64::from(value))
                }
            }
        )*
    };
}

int_query_value!(i8, i16, i32, i64, u8, u16, u32);

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(QueryValue::Null, Into::into)
    }
}

/// Ordered query parameters. Setting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    entries: Vec<(String, QueryValue)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Query::set`].
    pub fn param(mut self, key: &str, value: impl Into<QueryValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<QueryValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries that survive rendering, stringified and in order.
    pub fn rendered(&self) -> impl Iterator<Item = (&str, String)> {
        self.iter()
            .filter_map(|(k, v)| v.render().map(|rendered| (k, rendered)))
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: AsRef<str>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        for (k, v) in iter {
            query.set(k.as_ref(), v);
        }
        query
    }
}
