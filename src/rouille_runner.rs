use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::rc::Rc;

use anyhow::{anyhow, Result};
use rouille::{Server, Request, Response};
use serde_json::json;

use crate::apachelog::{log_combined, Logs};
use crate::component::ComponentFactory;
use crate::context::RequestContext;
use crate::http_request_method::HttpRequestMethodGrouped;
use crate::http_response_status_codes::HttpResponseStatusCode;
use crate::i18n::Phrasebook;
use crate::language::Language;
use crate::registry::Registry;
use crate::static_adapter::{self, Binding};
use crate::template::IncludePath;
use crate::webutils::{errorpage_from_status, htmlresponse};
use crate::{trace, warn};

/// Rendered for error responses if found on the include path, with
/// `code`, `title` and `desc` as model.
pub const ERROR_TEMPLATE: &str = "error.tpl";

/// Everything shared by all requests.
pub struct App<L: Language> {
    pub registry: Arc<Registry>,
    pub include_path: IncludePath,
    pub phrasebook: Arc<Phrasebook<L>>,
    /// Creates the component that handles every request
    pub root: Box<dyn ComponentFactory>,
    pub logs: Mutex<Logs>,
}

impl<L: Language> App<L> {
    /// With an empty registry and phrasebook, logging to stderr.
    pub fn new(root: impl ComponentFactory + 'static, include_path: IncludePath) -> Self {
        App {
            registry: Arc::new(Registry::new()),
            include_path,
            phrasebook: Arc::new(Phrasebook::new()),
            root: Box::new(root),
            logs: Logs::stderr(),
        }
    }
}

/// An error page, from `ERROR_TEMPLATE` if there is one.
pub fn error_response<L: Language>(
    app: &App<L>,
    lang: L,
    status: HttpResponseStatusCode,
) -> Response {
    let _translate = static_adapter::scoped(Binding::Translate(Rc::new({
        let phrasebook = app.phrasebook.clone();
        move |phrase: &str| phrasebook.lookup(lang, phrase).unwrap_or(phrase).to_string()
    })));
    let model = json!({
        "code": status.code(),
        "title": status.title(),
        "desc": status.desc(),
    });
    match static_adapter::render_standalone(&app.include_path, ERROR_TEMPLATE, &model) {
        Ok(body) => htmlresponse(status, body),
        Err(e) => {
            if ! e.is_not_found() {
                warn!("error page template: {e:#}");
            }
            errorpage_from_status(status)
        }
    }
}

/// Run the root component for `request`.
pub fn handle_request<L: Language>(app: &App<L>, request: &Request) -> Response {
    match RequestContext::new(request, app.registry.clone(), &app.include_path,
                              &app.phrasebook) {
        Ok(context) => {
            let errorpage = |status: HttpResponseStatusCode| {
                error_response(app, context.lang(), status)
            };
            log_combined(&context, &app.logs, &errorpage, || {
                match context.method().to_grouped() {
                    HttpRequestMethodGrouped::Simple(method) => {
                        let mut root = app.root.create(&context)?;
                        let body = root.execute()?;
                        trace!("{:?}: {} bytes", context.request_line(), body.len());
                        Ok(htmlresponse(HttpResponseStatusCode::OK200,
                                        if method.has_body() { body } else { String::new() }))
                    }
                    HttpRequestMethodGrouped::Other(method) => {
                        warn!("method {:?} not implemented", method.as_str());
                        Ok(errorpage(HttpResponseStatusCode::NotImplemented501))
                    }
                }
            })
        }
        Err(e) => {
            warn!("{:?} {:?}: {e:#}", request.method(), request.raw_url());
            error_response(app, L::default(), HttpResponseStatusCode::InternalServerError500)
        }
    }
}

/// Make a handler for Rouille's `start_server` procedure.
pub fn server_handler<L: Language>(
    app: Arc<App<L>>,
) -> impl Fn(&Request) -> Response + Send + Sync + 'static
{
    move |request: &Request| -> Response {
        handle_request(&app, request)
    }
}


pub struct Tlskeys {
    pub crt: Vec<u8>,
    pub key: Vec<u8>,
}

pub struct RouilleRunner<L: Language> {
    app: Arc<App<L>>,
}

impl<L: Language> RouilleRunner<L> {
    pub fn new(app: Arc<App<L>>) -> Self {
        RouilleRunner { app }
    }

    /// Run a rouille server in a new thread. The thread only returns
    /// if the server could not be started.
    pub fn run_server(
        &self,
        thread_name: &str,
        addr: String,
        tlskeys: Option<Tlskeys>,
    ) -> Result<JoinHandle<Result<()>>, std::io::Error>
    {
        thread::Builder::new().name(thread_name.into()).spawn({
            let app = self.app.clone();
            move || -> Result<()> {
                let handler = server_handler(app);
                let server =
                    if let Some(Tlskeys { crt, key }) = tlskeys {
                        Server::new_ssl(addr.clone(), handler, crt, key)
                    } else {
                        Server::new(addr.clone(), handler)
                    }
                    .map_err(|e| anyhow!("starting server on {addr:?}: {e}"))?;
                eprintln!("Listening on {:?}", server.server_addr());
                server.run();
                Ok(())
            }
        })
    }
}
