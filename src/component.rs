//! The component base: what every presentation component embeds to
//! get at its context, the registry, its URL state, translation and
//! template rendering.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use kstring::KString;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::auri::QueryArgs;
use crate::context::Context;
use crate::filters::{self, OutputFilter};
use crate::registry::{Registry, RegistryError};
use crate::template::{self, IncludePath, RenderError, RenderErrorKind, ViewHelpers};
use crate::trace;
use crate::url_state::UrlState;

/// Nested `render` calls beyond this fail instead of overflowing the
/// stack.
pub const MAX_RENDER_DEPTH: usize = 64;

pub trait Component {
    /// Called once by `mount`, before `execute`; declare URL state
    /// here.
    fn initialize_state(&mut self) {}

    /// Handle the request, return the response body.
    fn execute(&mut self) -> Result<String>;
}

/// Run `initialize_state` and box the component.
pub fn mount<'c, C: Component + 'c>(mut component: C) -> Box<dyn Component + 'c> {
    component.initialize_state();
    Box::new(component)
}

/// Creates the root component for a request.
pub trait ComponentFactory: Send + Sync {
    fn create<'c>(&self, context: &'c dyn Context) -> Result<Box<dyn Component + 'c>>;
}

impl<F> ComponentFactory for F
where F: for<'c> Fn(&'c dyn Context) -> Result<Box<dyn Component + 'c>> + Send + Sync
{
    fn create<'c>(&self, context: &'c dyn Context) -> Result<Box<dyn Component + 'c>> {
        self(context)
    }
}


pub struct ComponentCore<'c> {
    context: &'c dyn Context,
    registry: Arc<Registry>,
    state: UrlState,
    i18n: HashMap<KString, KString>,
    output_filters: Vec<OutputFilter>,
    render_depth: Cell<usize>,
}

impl<'c> ComponentCore<'c> {
    pub fn new(context: &'c dyn Context, url_namespace: &str) -> Self {
        ComponentCore {
            context,
            registry: context.registry().clone(),
            state: context.url_state_container(url_namespace),
            i18n: HashMap::new(),
            output_filters: filters::default_filters(),
            render_depth: Cell::new(0),
        }
    }

    pub fn context(&self) -> &'c dyn Context {
        self.context
    }

    pub fn state(&self) -> &UrlState {
        &self.state
    }

    /// The registry entry `name`.
    pub fn get<T: std::any::Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        self.registry.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Chaining.
    pub fn set_phrase(&mut self, phrase: &str, translation: &str) -> &mut Self {
        self.i18n.insert(KString::from_ref(phrase), KString::from_ref(translation));
        self
    }

    /// The local phrase table, else the context's translation, else
    /// `phrase` unchanged.
    pub fn translate(&self, phrase: &str) -> String {
        Context::translate(self, phrase).unwrap_or_else(|| phrase.into())
    }

    pub fn set_output_filters(&mut self, output_filters: Vec<OutputFilter>) {
        self.output_filters = output_filters;
    }

    pub fn push_output_filter(&mut self, output_filter: OutputFilter) {
        self.output_filters.push(output_filter);
    }

    /// Pass `s` through the output filters, in order.
    pub fn escape(&self, s: &str) -> String {
        filters::apply(&self.output_filters, s)
    }

    /// A URL to `href`. With `Some(args)`, the component's state is
    /// propagated and `args` (local keys) applied on top; with `None`
    /// no state is carried over.
    pub fn url(&self, href: &str, args: Option<&QueryArgs>) -> Result<String> {
        match args {
            None => self.context.build_url(href, None),
            Some(args) => self.context.build_url(href, Some(&self.state.export(args))),
        }
    }

    /// Render the template `file` (searched on the include path) with
    /// the variables in `model`, which must serialize to an object (or
    /// null). Fails with `WrongArgumentType` if `file` is not a
    /// string, before looking at any file.
    pub fn render<F, M>(&self, file: F, model: &M) -> Result<String, RenderError>
    where F: Into<Value>,
          M: Serialize + ?Sized
    {
        let file = file.into();
        let name = template::file_name(&file)?;
        let model = template::model_map(name, model)?;
        self.render_named(name, &model)
    }

    fn render_named(&self, name: &str, model: &Map<String, Value>) -> Result<String, RenderError> {
        let depth = self.render_depth.get();
        if depth >= MAX_RENDER_DEPTH {
            return Err(RenderErrorKind::RecursionLimit {
                file: name.into(),
                limit: MAX_RENDER_DEPTH
            }.into())
        }
        trace!("component: render {name:?} at depth {depth}");
        self.render_depth.set(depth + 1);
        let result = template::render_file(self.context.include_path(), name, model, self);
        self.render_depth.set(depth);
        result
    }
}

impl<'c> ViewHelpers for ComponentCore<'c> {
    fn escape(&self, s: &str) -> String {
        ComponentCore::escape(self, s)
    }

    fn translate(&self, phrase: &str) -> String {
        ComponentCore::translate(self, phrase)
    }

    fn url(&self, href: &str, args: &QueryArgs) -> Result<String> {
        ComponentCore::url(self, href, Some(args))
    }

    fn render(&self, file: &Value, model: &Map<String, Value>) -> Result<String, RenderError> {
        self.render_named(template::file_name(file)?, model)
    }
}

/// Components are the context of their child components.
impl<'c> Context for ComponentCore<'c> {
    fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    fn url_state_container(&self, namespace: &str) -> UrlState {
        self.state.nested(namespace)
    }

    fn build_url(&self, href: &str, query: Option<&QueryArgs>) -> Result<String> {
        self.context.build_url(href, query)
    }

    fn translate(&self, phrase: &str) -> Option<String> {
        match self.i18n.get(phrase) {
            Some(t) => Some(t.to_string()),
            None => self.context.translate(phrase)
        }
    }

    fn include_path(&self) -> &IncludePath {
        self.context.include_path()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::i18n::Phrasebook;
    use crate::lang_en_de::Lang;
    use rouille::Request;
    use serde_json::json;

    fn with_core<R>(
        url: &str,
        files: &[(&str, &str)],
        f: impl FnOnce(&mut ComponentCore) -> R,
    ) -> R {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            std::fs::write(dir.path().join(name), contents).unwrap();
        }
        let include_path = IncludePath::new([dir.path()]);
        let mut phrasebook = Phrasebook::new();
        phrasebook.add(Lang::De, "Hello", "Hallo").add(Lang::De, "Bye", "Tschüss");
        let mut registry = Registry::new();
        registry.register("site_name", String::from("Example"));
        let request = Request::fake_http(
            "GET", url,
            vec![("Accept-Language".into(), "de".into())],
            vec![]);
        let context = RequestContext::new(
            &request, Arc::new(registry), &include_path, &phrasebook).unwrap();
        let mut core = ComponentCore::new(&context, "");
        f(&mut core)
    }

    #[test]
    fn t_escape() {
        with_core("/", &[], |core| {
            assert_eq!(core.escape("<script>"), "&lt;script&gt;");
            core.push_output_filter(filters::by_name("nl2br").unwrap());
            assert_eq!(core.escape("a&b\nc"), "a&amp;b<br />\nc");
            core.set_output_filters(vec![]);
            assert_eq!(core.escape("<b>"), "<b>");
        })
    }

    #[test]
    fn t_translate() {
        with_core("/", &[], |core| {
            core.set_phrase("Bye", "Ciao");
            assert_eq!(core.translate("Hello"), "Hallo");
            assert_eq!(core.translate("Bye"), "Ciao");
            assert_eq!(core.translate("Unknown"), "Unknown");
        })
    }

    #[test]
    fn t_registry() {
        with_core("/", &[], |core| {
            assert!(core.has("site_name"));
            assert_eq!(core.get::<String>("site_name").unwrap().as_str(), "Example");
            assert!(matches!(core.get::<String>("db"), Err(RegistryError::Missing(_))));
        })
    }

    #[test]
    fn t_url() -> Result<()> {
        with_core("/list?list-page=2&other=1", &[], |core| {
            let list = ComponentCore::new(core, "list");
            list.state().set_default("page", "1");
            list.state().set_default("sort", "name");
            assert_eq!(list.url("", Some(&QueryArgs::new()))?, "/list?list-page=2");
            assert_eq!(list.url("detail", Some(&QueryArgs::from([("sort", "date")])))?,
                       "/detail?list-page=2&list-sort=date");
            assert_eq!(list.url("", Some(&QueryArgs::from([("page", "1")])))?, "/list");
            assert_eq!(list.url("/", None)?, "/");
            Ok(())
        })
    }

    #[test]
    fn t_render() -> Result<()> {
        with_core("/?p-page=3", &[
            ("page.tpl", "<h1>{{ e(title) }}</h1>{% for i in items %}{{ render('item.tpl', n=i) }}{% endfor %}"),
            ("item.tpl", "<a href=\"{{ e(url('', page=n)) }}\">{{ __('Hello') }} {{ n }} of {{ title }}</a>"),
        ], |core| {
            let pager = ComponentCore::new(core, "p");
            pager.state().set_default("page", "1");
            let out = pager.render("page.tpl", &json!({"title": "A<B", "items": [1, 2]}))?;
            assert_eq!(out,
                       "<h1>A&lt;B</h1>\
                        <a href=\"/\">Hallo 1 of A<B</a>\
                        <a href=\"/?p-page=2\">Hallo 2 of A<B</a>");
            Ok(())
        })
    }

    #[test]
    fn t_render_not_found() {
        with_core("/", &[], |core| {
            let e = core.render("missing.tpl", &()).err().unwrap();
            assert!(e.is_not_found());
            match e.kind() {
                RenderErrorKind::TemplateNotFound { file, include_path } => {
                    assert_eq!(file, "missing.tpl");
                    assert_eq!(include_path, &core.include_path().to_string());
                    assert!(! include_path.is_empty());
                }
                other => panic!("unexpected {other:?}"),
            }
        })
    }

    #[test]
    fn t_render_wrong_argument_type() {
        with_core("/", &[("42", "found")], |core| {
            // would be found if it were searched for
            assert_eq!(core.render("42", &()).unwrap(), "found");
            let e = core.render(42, &()).err().unwrap();
            assert!(matches!(e.kind(), RenderErrorKind::WrongArgumentType("number")));
            let e = core.render(Value::Null, &()).err().unwrap();
            assert!(matches!(e.kind(), RenderErrorKind::WrongArgumentType("null")));
        })
    }

    #[test]
    fn t_failed_render_leaves_no_trace() {
        with_core("/", &[
            ("bad.tpl", "partial output {{ render('inner.tpl') }}"),
            ("inner.tpl", "{{ undefined }}"),
            ("good.tpl", "ok"),
        ], |core| {
            let e = core.render("bad.tpl", &()).err().unwrap();
            assert_eq!(e.to_string(), "inner.tpl:1: undefined variable \"undefined\"");
            assert_eq!(core.render_depth.get(), 0);
            assert_eq!(core.render("good.tpl", &()).unwrap(), "ok");
        })
    }

    #[test]
    fn t_recursion_limit() {
        with_core("/", &[("loop.tpl", "{{ render('loop.tpl') }}")], |core| {
            let e = core.render("loop.tpl", &()).err().unwrap();
            assert!(matches!(e.kind(), RenderErrorKind::RecursionLimit { .. }));
            assert_eq!(core.render_depth.get(), 0);
        })
    }

    struct Greeter<'c> {
        core: ComponentCore<'c>,
        greeting: String,
    }

    impl<'c> Component for Greeter<'c> {
        fn initialize_state(&mut self) {
            self.core.state().set_default("who", "world");
        }
        fn execute(&mut self) -> Result<String> {
            let who = self.core.state().get("who").map(|s| s.to_string()).unwrap_or_default();
            Ok(format!("{} {}", self.greeting, self.core.escape(&who)))
        }
    }

    fn greeter<'c>(context: &'c dyn Context) -> Result<Box<dyn Component + 'c>> {
        Ok(mount(Greeter {
            core: ComponentCore::new(context, "g"),
            greeting: "Hi".into(),
        }))
    }

    #[test]
    fn t_factory() -> Result<()> {
        let factory: Box<dyn ComponentFactory> = Box::new(greeter);
        with_core("/?g-who=%3Cyou%3E", &[], |core| {
            let mut component = factory.create(core)?;
            assert_eq!(component.execute()?, "Hi &lt;you&gt;");
            Ok(())
        })
    }
}
