use serde_json::Value;

/// A parsed report document with typed, dotted-path lookups.
///
/// Lookups never fail: a missing segment, a `null`, or a value of the wrong
/// type all read as `None`.
#[derive(Debug, Clone)]
pub struct Report {
    doc: Value,
}

impl Report {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body).map(Self::new)
    }

    pub fn new(doc: Value) -> Self {
        Self { doc }
    }

    /// String value at `path`, e.g. `"TestDetail.Name"`.
    pub fn str_at(&self, path: &str) -> Option<&str> {
        self.lookup(path)?.as_str()
    }

    /// Numeric value at `path`. Integers and floats both qualify.
    pub fn f64_at(&self, path: &str) -> Option<f64> {
        self.lookup(path)?.as_f64()
    }

    /// Whether a non-null value of any type sits at `path`.
    pub fn exists(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.doc, |node, key| node.as_object()?.get(key))
            .filter(|v| !v.is_null())
    }
}
