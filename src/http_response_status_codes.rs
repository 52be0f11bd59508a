//! The HTTP response statuses this server sends, with the texts used
//! on error pages.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpResponseStatusCode {
    OK200,
    BadRequest400,
    NotFound404,
    InternalServerError500,
    NotImplemented501,
}

impl HttpResponseStatusCode {
    pub fn code(self) -> u16 {
        match self {
            Self::OK200 => 200,
            Self::BadRequest400 => 400,
            Self::NotFound404 => 404,
            Self::InternalServerError500 => 500,
            Self::NotImplemented501 => 501,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::OK200 => "OK",
            Self::BadRequest400 => "Bad Request",
            Self::NotFound404 => "Not Found",
            Self::InternalServerError500 => "Internal Server Error",
            Self::NotImplemented501 => "Not Implemented",
        }
    }

    pub fn desc(self) -> &'static str {
        match self {
            Self::OK200 => "The request succeeded.",
            Self::BadRequest400 =>
                "The server cannot process the request due to a client error.",
            Self::NotFound404 => "The requested resource could not be found.",
            Self::InternalServerError500 =>
                "The server encountered an unexpected condition that prevented it \
                 from fulfilling the request.",
            Self::NotImplemented501 =>
                "The request method is not supported by the server and cannot be handled.",
        }
    }
}
