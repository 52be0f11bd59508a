//! Pattern matching help for HTTP request methods.

// https://developer.mozilla.org/en-US/docs/Web/HTTP/Methods

use anyhow::{Result, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpRequestMethod {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    CONNECT,
    OPTIONS,
    TRACE,
    PATCH,
}

/// The methods a component can answer: it renders a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpRequestMethodSimple {
    GET,
    HEAD,
    POST,
}

pub enum HttpRequestMethodGrouped {
    Simple(HttpRequestMethodSimple),
    /// PUT, DELETE, PATCH, OPTIONS, TRACE, CONNECT
    Other(HttpRequestMethod),
}

impl HttpRequestMethodSimple {
    pub fn is_post(self) -> bool {
        self == HttpRequestMethodSimple::POST
    }

    /// Whether the response carries a body.
    pub fn has_body(self) -> bool {
        self != HttpRequestMethodSimple::HEAD
    }
}

impl HttpRequestMethod {
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(Self::GET),
            "HEAD" => Ok(Self::HEAD),
            "POST" => Ok(Self::POST),
            "PUT" => Ok(Self::PUT),
            "PATCH" => Ok(Self::PATCH),
            "DELETE" => Ok(Self::DELETE),
            "OPTIONS" => Ok(Self::OPTIONS),
            "CONNECT" => Ok(Self::CONNECT),
            "TRACE" => Ok(Self::TRACE),
            _ => bail!("invalid http request method {s:?}")
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::HEAD => "HEAD",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::PATCH => "PATCH",
            Self::DELETE => "DELETE",
            Self::OPTIONS => "OPTIONS",
            Self::CONNECT => "CONNECT",
            Self::TRACE => "TRACE",
        }
    }

    pub fn is_post(self) -> bool {
        self == Self::POST
    }

    pub fn to_grouped(self) -> HttpRequestMethodGrouped {
        match self {
            Self::GET => HttpRequestMethodGrouped::Simple(HttpRequestMethodSimple::GET),
            Self::HEAD => HttpRequestMethodGrouped::Simple(HttpRequestMethodSimple::HEAD),
            Self::POST => HttpRequestMethodGrouped::Simple(HttpRequestMethodSimple::POST),
            other => HttpRequestMethodGrouped::Other(other),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_from_str() {
        assert_eq!(HttpRequestMethod::from_str("PATCH").unwrap().as_str(), "PATCH");
        assert!(HttpRequestMethod::from_str("get").is_err());
        assert!(matches!(HttpRequestMethod::HEAD.to_grouped(),
                         HttpRequestMethodGrouped::Simple(m) if ! m.has_body()));
        assert!(matches!(HttpRequestMethod::DELETE.to_grouped(),
                         HttpRequestMethodGrouped::Other(HttpRequestMethod::DELETE)));
    }
}
