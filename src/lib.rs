pub mod warn;
pub mod util;
pub mod url_encoding;
pub mod ppath;
pub mod auri;
pub mod language;
pub mod lang_en_de;
pub mod i18n;
pub mod filters;
pub mod registry;
pub mod url_state;
pub mod template;
pub mod context;
pub mod component;
pub mod static_adapter;
pub mod http_request_method;
pub mod http_response_status_codes;
pub mod webutils;
pub mod apachelog;
pub mod rouille_runner;
pub mod virtual_browser;
pub mod config;

// demo
pub mod hello;
