//! URL-propagated state: values that round-trip through the query
//! string of the URLs a component generates.

//! Only keys that were declared via `set_default` are state; other
//! request parameters are visible through `get` but never exported
//! unless passed explicitly.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use kstring::KString;

use crate::auri::QueryArgs;

/// The per-request storage behind all `UrlState` views. Keys are
/// fully qualified.
#[derive(Debug, Default)]
pub struct StateBag {
    /// From the request's query string
    request: BTreeMap<KString, KString>,
    /// Declared state keys with their default values
    defaults: BTreeMap<KString, KString>,
    /// Set during this request; `None` means explicitly unset
    values: BTreeMap<KString, Option<KString>>,
}

impl StateBag {
    pub fn from_query(query: &QueryArgs) -> Self {
        let mut request = BTreeMap::new();
        for (k, v) in query.iter() {
            if let Some(v) = v {
                request.insert(k.clone(), v.clone());
            }
        }
        StateBag { request, ..Default::default() }
    }

    fn current(&self, key: &str) -> Option<&KString> {
        match self.values.get(key) {
            Some(v) => v.as_ref(),
            None => self.request.get(key)
        }
    }
}

/// A namespaced view onto the request's `StateBag`.
#[derive(Debug, Clone)]
pub struct UrlState {
    bag: Rc<RefCell<StateBag>>,
    // "" or ending in "-"
    prefix: KString,
}

impl UrlState {
    pub fn new(bag: Rc<RefCell<StateBag>>, namespace: &str) -> Self {
        UrlState { bag, prefix: KString::from_ref("") }.nested(namespace)
    }

    /// A view for a child namespace; the empty namespace gives a view
    /// identical to self.
    pub fn nested(&self, namespace: &str) -> Self {
        let prefix =
            if namespace.is_empty() {
                self.prefix.clone()
            } else {
                KString::from_string(format!("{}{namespace}-", self.prefix))
            };
        UrlState { bag: self.bag.clone(), prefix }
    }

    pub fn namespace_prefix(&self) -> &str {
        &self.prefix
    }

    /// The fully qualified query parameter name for `key`.
    pub fn qualify(&self, key: &str) -> KString {
        if self.prefix.is_empty() {
            KString::from_ref(key)
        } else {
            KString::from_string(format!("{}{key}", self.prefix))
        }
    }

    pub fn get(&self, key: &str) -> Option<KString> {
        let key = self.qualify(key);
        let bag = self.bag.borrow();
        bag.current(&key).or_else(|| bag.defaults.get(&key)).cloned()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.bag.borrow_mut().values.insert(self.qualify(key),
                                            Some(KString::from_ref(value)));
    }

    pub fn unset(&self, key: &str) {
        self.bag.borrow_mut().values.insert(self.qualify(key), None);
    }

    /// Declare `key` as state with the given default. Values equal to
    /// the default are not exported.
    pub fn set_default(&self, key: &str, default: &str) {
        self.bag.borrow_mut().defaults.insert(self.qualify(key),
                                              KString::from_ref(default));
    }

    /// The query to propagate for a link: all declared state (of all
    /// namespaces) that differs from its default, with `args`
    /// (unqualified keys, relative to this view) applied on top.
    pub fn export(&self, args: &QueryArgs) -> QueryArgs {
        let bag = self.bag.borrow();
        let mut out = QueryArgs::new();
        for (key, default) in &bag.defaults {
            if let Some(v) = bag.current(key) {
                if v != default {
                    out.insert(key.clone(), Some(v.clone()));
                }
            }
        }
        for (key, val) in args.iter() {
            let key = self.qualify(key);
            match val {
                Some(v) if bag.defaults.get(&key) != Some(v) => {
                    out.insert(key, Some(v.clone()));
                }
                _ => { out.remove(&key); }
            }
        }
        out
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn bag(query: &str) -> Rc<RefCell<StateBag>> {
        Rc::new(RefCell::new(StateBag::from_query(
            &QueryArgs::from_query_str(query).unwrap())))
    }

    #[test]
    fn t_get_set() {
        let state = UrlState::new(bag("page=2&other=x"), "");
        state.set_default("page", "1");
        state.set_default("sort", "name");
        assert_eq!(state.get("page").unwrap().as_str(), "2");
        assert_eq!(state.get("sort").unwrap().as_str(), "name");
        assert_eq!(state.get("other").unwrap().as_str(), "x");
        state.set("sort", "date");
        assert_eq!(state.get("sort").unwrap().as_str(), "date");
        state.unset("page");
        assert_eq!(state.get("page").unwrap().as_str(), "1");
        assert_eq!(state.get("missing"), None);
    }

    #[test]
    fn t_export() {
        let state = UrlState::new(bag("page=2&other=x"), "");
        state.set_default("page", "1");
        state.set_default("sort", "name");
        // `other` is not declared, thus not propagated
        assert_eq!(state.export(&QueryArgs::new()).to_query_string(), "page=2");
        assert_eq!(state.export(&QueryArgs::new().with("page", "1")).to_query_string(), "");
        assert_eq!(state.export(&QueryArgs::new().with("sort", "date").with("q", "a"))
                   .to_query_string(),
                   "page=2&q=a&sort=date");
        assert_eq!(state.export(&QueryArgs::new().without("page")).to_query_string(), "");
    }

    #[test]
    fn t_nested() {
        let b = bag("list-page=3&list-items-open=1");
        let root = UrlState::new(b.clone(), "");
        let list = root.nested("list");
        let items = list.nested("items");
        assert_eq!(items.namespace_prefix(), "list-items-");
        assert_eq!(list.nested("").namespace_prefix(), "list-");
        list.set_default("page", "1");
        items.set_default("open", "0");
        assert_eq!(list.get("page").unwrap().as_str(), "3");
        assert_eq!(items.get("open").unwrap().as_str(), "1");
        assert_eq!(root.get("list-page").unwrap().as_str(), "3");
        // the whole bag is exported, args are qualified relative to the view
        assert_eq!(items.export(&QueryArgs::new().with("open", "0")).to_query_string(),
                   "list-page=3");
        assert_eq!(list.export(&QueryArgs::new().with("page", "4")).to_query_string(),
                   "list-items-open=1&list-page=4");
    }
}
