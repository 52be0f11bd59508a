use std::borrow::Cow;

use rouille::{Response, ResponseBody};

use crate::filters::html_escape;
use crate::http_response_status_codes::HttpResponseStatusCode;


pub fn errorpage_from_status(status: HttpResponseStatusCode) -> Response {
    // XX configure response looks and contents.
    let title = html_escape(status.title());
    let explanation = html_escape(status.desc());
    let resp = format!("<html><head><title>{title}</title></head><body><h1>{title}</h1>\
                        <p>{explanation}</p></body></html>\n");
    htmlresponse(status, resp)
}

/// A response with `body` as `text/html`.
pub fn htmlresponse(status: HttpResponseStatusCode, body: String) -> Response {
    Response {
        status_code: status.code(),
        headers: vec![(Cow::from("Content-Type"),
                       Cow::from("text/html; charset=utf-8"))],
        data: ResponseBody::from_string(body),
        upgrade: None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_errorpage() {
        let r = errorpage_from_status(HttpResponseStatusCode::NotImplemented501);
        assert_eq!(r.status_code, 501);
        let (mut data, _) = r.data.into_reader_and_size();
        let mut body = String::new();
        std::io::Read::read_to_string(&mut data, &mut body).unwrap();
        assert!(body.contains("<h1>Not Implemented</h1>"));
    }
}
