//! Thread-local bindings for the template helpers `e`, `__` and `url`,
//! for rendering templates without a component (error pages, tools).

//! Bindings are per thread, so concurrent requests (and tests) don't
//! see each other's. Use `scoped` to get the previous binding back
//! whatever happens.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::auri::QueryArgs;
use crate::filters::html_escape;
use crate::template::{self, IncludePath, RenderError, RenderErrorKind, ViewHelpers};
use crate::component::MAX_RENDER_DEPTH;

pub type EscapeFn = Rc<dyn Fn(&str) -> String>;
pub type TranslateFn = Rc<dyn Fn(&str) -> String>;
pub type UrlFn = Rc<dyn Fn(&str, &QueryArgs) -> anyhow::Result<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperName {
    Escape,
    Translate,
    Url,
}

#[derive(Clone)]
pub enum Binding {
    Escape(EscapeFn),
    Translate(TranslateFn),
    Url(UrlFn),
}

impl Binding {
    pub fn name(&self) -> HelperName {
        match self {
            Binding::Escape(_) => HelperName::Escape,
            Binding::Translate(_) => HelperName::Translate,
            Binding::Url(_) => HelperName::Url,
        }
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Binding::{:?}(..)", self.name())
    }
}

#[derive(Default)]
struct Bindings {
    escape: Option<EscapeFn>,
    translate: Option<TranslateFn>,
    url: Option<UrlFn>,
}

impl Bindings {
    fn get(&self, name: HelperName) -> Option<Binding> {
        match name {
            HelperName::Escape => self.escape.clone().map(Binding::Escape),
            HelperName::Translate => self.translate.clone().map(Binding::Translate),
            HelperName::Url => self.url.clone().map(Binding::Url),
        }
    }

    fn take(&mut self, name: HelperName) -> Option<Binding> {
        match name {
            HelperName::Escape => self.escape.take().map(Binding::Escape),
            HelperName::Translate => self.translate.take().map(Binding::Translate),
            HelperName::Url => self.url.take().map(Binding::Url),
        }
    }

    fn put(&mut self, binding: Binding) -> Option<Binding> {
        let old = self.take(binding.name());
        match binding {
            Binding::Escape(f) => self.escape = Some(f),
            Binding::Translate(f) => self.translate = Some(f),
            Binding::Url(f) => self.url = Some(f),
        }
        old
    }
}

thread_local! {
    static BINDINGS: RefCell<Bindings> = RefCell::new(Bindings::default());
}

/// Bind a helper, returning the binding it replaces.
pub fn connect(binding: Binding) -> Option<Binding> {
    BINDINGS.with(|b| b.borrow_mut().put(binding))
}

/// Remove the binding for `name`, returning it.
pub fn disconnect(name: HelperName) -> Option<Binding> {
    BINDINGS.with(|b| b.borrow_mut().take(name))
}

pub fn current(name: HelperName) -> Option<Binding> {
    BINDINGS.with(|b| b.borrow().get(name))
}

/// Restores the binding that was replaced when dropped.
#[must_use]
pub struct ScopedBinding {
    name: HelperName,
    previous: Option<Binding>,
}

impl Drop for ScopedBinding {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(b) => { connect(b); }
            None => { disconnect(self.name); }
        }
    }
}

/// `connect` until the returned guard is dropped.
pub fn scoped(binding: Binding) -> ScopedBinding {
    let name = binding.name();
    ScopedBinding { name, previous: connect(binding) }
}


/// `ViewHelpers` going through the current bindings. Unbound helpers
/// fall back to `html_escape`, the identity, and `href` plus query.
struct StaticHelpers<'a> {
    include_path: &'a IncludePath,
    depth: Cell<usize>,
}

impl<'a> ViewHelpers for StaticHelpers<'a> {
    fn escape(&self, s: &str) -> String {
        match current(HelperName::Escape) {
            Some(Binding::Escape(f)) => f(s),
            _ => html_escape(s)
        }
    }

    fn translate(&self, phrase: &str) -> String {
        match current(HelperName::Translate) {
            Some(Binding::Translate(f)) => f(phrase),
            _ => phrase.into()
        }
    }

    fn url(&self, href: &str, args: &QueryArgs) -> anyhow::Result<String> {
        match current(HelperName::Url) {
            Some(Binding::Url(f)) => f(href, args),
            _ => {
                let q = args.to_query_string();
                Ok(if q.is_empty() {
                    href.into()
                } else {
                    let sep = if href.contains('?') { '&' } else { '?' };
                    format!("{href}{sep}{q}")
                })
            }
        }
    }

    fn render(&self, file: &Value, model: &Map<String, Value>) -> Result<String, RenderError> {
        let name = template::file_name(file)?;
        let depth = self.depth.get();
        if depth >= MAX_RENDER_DEPTH {
            return Err(RenderErrorKind::RecursionLimit {
                file: name.into(),
                limit: MAX_RENDER_DEPTH
            }.into())
        }
        self.depth.set(depth + 1);
        let result = template::render_file(self.include_path, name, model, self);
        self.depth.set(depth);
        result
    }
}

/// Render `file` outside of any component, with the helpers bound on
/// this thread.
pub fn render_standalone<F, M>(
    include_path: &IncludePath,
    file: F,
    model: &M,
) -> Result<String, RenderError>
where F: Into<Value>,
      M: Serialize + ?Sized
{
    let file = file.into();
    let model = template::model_map(template::file_name(&file)?, model)?;
    let helpers = StaticHelpers { include_path, depth: Cell::new(0) };
    helpers.render(&file, &model)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn escape_ptr() -> Option<EscapeFn> {
        match current(HelperName::Escape) {
            Some(Binding::Escape(f)) => Some(f),
            _ => None
        }
    }

    #[test]
    fn t_connect_disconnect() {
        let upper: EscapeFn = Rc::new(|s: &str| s.to_uppercase());
        assert!(connect(Binding::Escape(upper.clone())).is_none());
        let prev = connect(Binding::Escape(Rc::new(|s: &str| s.to_string())));
        assert!(matches!(prev, Some(Binding::Escape(ref f)) if Rc::ptr_eq(f, &upper)));
        assert!(disconnect(HelperName::Escape).is_some());
        assert!(disconnect(HelperName::Escape).is_none());
        assert!(current(HelperName::Url).is_none());
    }

    #[test]
    fn t_render_standalone() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("page.tpl"),
                       "{{ e(x) }} {{ __('Hi') }} {{ url('/a', b=1) }}")?;
        let ip = IncludePath::new([dir.path()]);
        let model = json!({"x": "<&>"});
        assert_eq!(render_standalone(&ip, "page.tpl", &model)?, "&lt;&amp;&gt; Hi /a?b=1");
        let _t = scoped(Binding::Translate(Rc::new(|_: &str| String::from("Salut"))));
        let _u = scoped(Binding::Url(Rc::new(|href: &str, _: &QueryArgs| Ok::<_, anyhow::Error>(format!("#{href}")))));
        assert_eq!(render_standalone(&ip, "page.tpl", &model)?, "&lt;&amp;&gt; Salut #/a");
        Ok(())
    }

    #[test]
    fn t_bindings_restored_after_failure() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("bad.tpl"), "{{ e('x') }}{{ nope }}")?;
        let ip = IncludePath::new([dir.path()]);

        let outer: EscapeFn = Rc::new(|s: &str| format!("<{s}>"));
        let _outer = scoped(Binding::Escape(outer.clone()));
        {
            let _inner = scoped(Binding::Escape(Rc::new(|s: &str| s.to_string())));
            assert!(render_standalone(&ip, "bad.tpl", &()).is_err());
            assert!(render_standalone(&ip, "missing.tpl", &()).err().unwrap().is_not_found());
            assert!(render_standalone(&ip, 1.5, &()).is_err());
        }
        assert!(Rc::ptr_eq(&escape_ptr().unwrap(), &outer));
        drop(_outer);
        assert!(escape_ptr().is_none());
        Ok(())
    }
}
