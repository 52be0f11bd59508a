//! Local URIs (path plus query string) as built by `Context::build_url`.

use std::collections::BTreeMap;

use kstring::KString;

use crate::{ppath::PPath, url_encoding::{url_encode, query_decode, UrlDecodingError}};


// ------------------------------------------------------------------

/// Query arguments, ordered by key so that generated URLs are
/// stable. A `None` value means "remove this key" when merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryArgs(BTreeMap<KString, Option<KString>>);

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chaining.
    pub fn with(mut self, key: &str, val: &str) -> Self {
        self.set(key, val);
        self
    }

    /// Chaining.
    pub fn without(mut self, key: &str) -> Self {
        self.unset(key);
        self
    }

    pub fn set(&mut self, key: &str, val: &str) {
        self.0.insert(KString::from_ref(key), Some(KString::from_ref(val)));
    }

    pub fn unset(&mut self, key: &str) {
        self.0.insert(KString::from_ref(key), None);
    }

    pub fn insert(&mut self, key: KString, val: Option<KString>) {
        self.0.insert(key, val);
    }

    pub fn remove(&mut self, key: &str) -> Option<Option<KString>> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_ref().map(|v| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KString, &Option<KString>)> {
        self.0.iter()
    }

    /// Apply `other` on top of self: `Some` values overwrite, `None`
    /// values delete.
    pub fn merge(&mut self, other: &QueryArgs) {
        for (k, v) in other.iter() {
            match v {
                Some(_) => { self.0.insert(k.clone(), v.clone()); }
                None => { self.0.remove(k); }
            }
        }
    }

    /// `foo` part in `?foo`. Keys without `=` get the empty string as
    /// value.
    pub fn from_query_str(s: &str) -> Result<Self, UrlDecodingError> {
        let mut m = BTreeMap::new();
        for partraw in s.split('&') {
            if ! partraw.is_empty() {
                let (key, val) = partraw.split_once('=').unwrap_or((partraw, ""));
                m.insert(KString::from_string(query_decode(key)?),
                         Some(KString::from_string(query_decode(val)?)));
            }
        }
        Ok(QueryArgs(m))
    }

    /// Serialized form, leaving out `None` values.
    pub fn to_query_string(&self) -> String {
        let mut s = String::new();
        for (k, v) in &self.0 {
            if let Some(v) = v {
                if ! s.is_empty() {
                    s.push('&');
                }
                s.push_str(&url_encode(k));
                s.push('=');
                s.push_str(&url_encode(v));
            }
        }
        s
    }
}

impl<const N: usize> From<[(&str, &str); N]> for QueryArgs {
    fn from(keyvals: [(&str, &str); N]) -> Self {
        let mut q = QueryArgs::new();
        for (k, v) in keyvals {
            q.set(k, v);
        }
        q
    }
}


// ------------------------------------------------------------------

/// A URI without a scheme or authority part; i.e. relative or
/// absolute path.
#[derive(Debug)]
pub struct LocalUri {
    path: PPath,
    query: QueryArgs,
    // todo: fragment
}

impl LocalUri {
    pub fn new(path: PPath, query: QueryArgs) -> Self {
        Self { path, query }
    }
}

impl From<&LocalUri> for String {
    fn from(a: &LocalUri) -> Self {
        let mut s = a.path.to_url_string();
        let q = a.query.to_query_string();
        if ! q.is_empty() {
            s.push('?');
            s.push_str(&q);
        }
        s
    }
}
