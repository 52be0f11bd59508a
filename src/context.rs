//! What a component is bound to: the request (for the root component)
//! or its parent component.

use std::cell::RefCell;
use std::net::IpAddr;
use std::rc::Rc;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Result, Context as _};
use rouille::{Request, input::priority_header_preferred};

use crate::auri::{QueryArgs, LocalUri};
use crate::http_request_method::HttpRequestMethod;
use crate::i18n::Phrasebook;
use crate::language::Language;
use crate::ppath::PPath;
use crate::registry::Registry;
use crate::template::IncludePath;
use crate::url_state::{StateBag, UrlState};

/// The capabilities a component gets from whatever encloses it.
pub trait Context {
    fn registry(&self) -> &Arc<Registry>;

    /// The state view for `namespace`, nested within the view of self.
    fn url_state_container(&self, namespace: &str) -> UrlState;

    /// Resolve `href` against the current location and add `query`
    /// (fully qualified keys). An empty `href` means the current path.
    fn build_url(&self, href: &str, query: Option<&QueryArgs>) -> Result<String>;

    /// `None` if there is no translation at this level.
    fn translate(&self, _phrase: &str) -> Option<String> {
        None
    }

    fn include_path(&self) -> &IncludePath;
}


/// The root context, built per request.
pub struct RequestContext<'r, L: Language> {
    request: &'r Request,
    registry: Arc<Registry>,
    include_path: &'r IncludePath,
    phrasebook: &'r Phrasebook<L>,
    path: PPath,
    path_string: String,
    now: SystemTime,
    method: HttpRequestMethod,
    lang: L,
    state: Rc<RefCell<StateBag>>,
}

impl<'r, L: Language> RequestContext<'r, L> {
    pub fn new(
        request: &'r Request,
        registry: Arc<Registry>,
        include_path: &'r IncludePath,
        phrasebook: &'r Phrasebook<L>,
    ) -> Result<Self> {
        let path_original = request.url(); // path only
        let path = PPath::from_str(&path_original);
        let path_string = path.to_string();
        let method = HttpRequestMethod::from_str(request.method())?;
        let query = QueryArgs::from_query_str(request.raw_query_string())
            .with_context(|| format!("parsing query string of {:?}", request.raw_url()))?;

        let param_lang: Option<L> = query.get("lang").and_then(L::maybe_from_start);
        let browser_lang: Option<L> = request.header("Accept-Language").and_then(|s| {
            let ss = L::strs();
            priority_header_preferred(s, ss.iter().cloned())
                .and_then(|i| L::maybe_from(ss[i]))
        });
        let lang = param_lang.or(browser_lang).unwrap_or_default();

        Ok(RequestContext {
            request,
            registry,
            include_path,
            phrasebook,
            path,
            path_string,
            now: SystemTime::now(),
            method,
            lang,
            state: Rc::new(RefCell::new(StateBag::from_query(&query))),
        })
    }

    /// Like the request part in Apache style Combined Log Format
    pub fn request_line(&self) -> String {
        // `Request` does not keep the original request line string,
        // thus reconstruct it.
        format!("{} {}", self.request.method(), self.request.raw_url())
    }
    /// `foo` part in `?foo`
    pub fn query_string(&self) -> &str {
        self.request.raw_query_string()
    }
    pub fn user_agent(&self) -> Option<&str> {
        self.request.header("user-agent")
    }
    pub fn referer(&self) -> Option<&str> {
        self.request.header("referer")
    }
    pub fn header(&self, key: &str) -> Option<&str> {
        self.request.header(key)
    }
    pub fn client_ip(&self) -> IpAddr {
        self.request.remote_addr().ip()
    }
    pub fn method(&self) -> HttpRequestMethod { self.method }
    pub fn path(&self) -> &PPath { &self.path }
    pub fn path_str(&self) -> &str { &self.path_string }
    pub fn now(&self) -> &SystemTime { &self.now }
    pub fn lang(&self) -> L { self.lang }
    pub fn request(&self) -> &Request { self.request }
}

impl<'r, L: Language> Context for RequestContext<'r, L> {
    fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    fn url_state_container(&self, namespace: &str) -> UrlState {
        UrlState::new(self.state.clone(), namespace)
    }

    fn build_url(&self, href: &str, query: Option<&QueryArgs>) -> Result<String> {
        let (href, fragment) = match href.split_once('#') {
            Some((h, f)) => (h, Some(f)),
            None => (href, None)
        };
        let (hrefpath, hrefquery) = href.split_once('?').unwrap_or((href, ""));
        let mut args = QueryArgs::from_query_str(hrefquery)
            .with_context(|| format!("parsing query part of href {href:?}"))?;
        if let Some(query) = query {
            args.merge(query);
        }
        let mut url =
            if hrefpath.contains("://") {
                let mut url = hrefpath.to_string();
                let q = args.to_query_string();
                if ! q.is_empty() {
                    url.push('?');
                    url.push_str(&q);
                }
                url
            } else {
                let path =
                    if hrefpath.is_empty() {
                        self.path.clone()
                    } else {
                        self.path.add(&PPath::from_str(hrefpath))
                    };
                String::from(&LocalUri::new(path, args))
            };
        if let Some(fragment) = fragment {
            url.push('#');
            url.push_str(fragment);
        }
        Ok(url)
    }

    fn translate(&self, phrase: &str) -> Option<String> {
        self.phrasebook.lookup(self.lang, phrase).map(String::from)
    }

    fn include_path(&self) -> &IncludePath {
        self.include_path
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang_en_de::Lang;

    fn with_context<R>(
        url: &str,
        headers: Vec<(String, String)>,
        f: impl FnOnce(&RequestContext<Lang>) -> R,
    ) -> R {
        let request = Request::fake_http("GET", url, headers, vec![]);
        let include_path = IncludePath::default();
        let mut phrasebook = Phrasebook::new();
        phrasebook.add(Lang::De, "Hello", "Hallo");
        let context = RequestContext::new(
            &request, Arc::new(Registry::new()), &include_path, &phrasebook)
            .unwrap();
        f(&context)
    }

    #[test]
    fn t_build_url() -> Result<()> {
        with_context("/blog/post?page=2", vec![], |c| {
            let q = QueryArgs::from([("page", "3")]);
            assert_eq!(c.build_url("", None)?, "/blog/post");
            assert_eq!(c.build_url("", Some(&q))?, "/blog/post?page=3");
            assert_eq!(c.build_url("other", None)?, "/blog/other");
            assert_eq!(c.build_url("/", None)?, "/");
            assert_eq!(c.build_url("/x?a=1&page=1#top", Some(&q))?, "/x?a=1&page=3#top");
            assert_eq!(c.build_url("/x?a=1", Some(&QueryArgs::new().without("a")))?, "/x");
            assert_eq!(c.build_url("https://example.com/a b", Some(&q))?,
                       "https://example.com/a b?page=3");
            assert_eq!(c.build_url("a b", None)?, "/blog/a%20b");
            Ok::<(), anyhow::Error>(())
        })?;
        with_context("/a%3Fb%20c?page=2", vec![], |c| {
            assert_eq!(c.path_str(), "/a?b c");
            assert_eq!(c.build_url("", Some(&QueryArgs::from([("page", "3")])))?,
                       "/a%3Fb%20c?page=3");
            assert_eq!(c.build_url("#top", None)?, "/a%3Fb%20c#top");
            Ok(())
        })
    }

    #[test]
    fn t_lang() {
        let hdr = vec![("Accept-Language".to_string(), "de-CH, de;q=0.9".to_string())];
        assert_eq!(with_context("/", vec![], |c| c.lang()), Lang::En);
        assert_eq!(with_context("/", hdr.clone(), |c| c.lang()), Lang::De);
        assert_eq!(with_context("/?lang=en", hdr.clone(), |c| c.lang()), Lang::En);
        assert_eq!(with_context("/", hdr, |c| c.translate("Hello")),
                   Some("Hallo".to_string()));
        assert_eq!(with_context("/", vec![], |c| c.translate("Hello")), None);
    }

    #[test]
    fn t_state_from_query() {
        with_context("/?list-page=4", vec![], |c| {
            let state = c.url_state_container("list");
            assert_eq!(state.get("page").unwrap().as_str(), "4");
            assert_eq!(c.request_line(), "GET /?list-page=4");
            assert_eq!(c.path_str(), "/");
        })
    }
}
