//! Output filters, applied in order to strings printed from templates
//! via `e(...)`.

use std::sync::Arc;

use lazy_static::lazy_static;

pub type OutputFilter = Arc<dyn Fn(&str) -> String + Send + Sync>;

lazy_static! {
    static ref DEFAULT_FILTERS: Vec<OutputFilter> = vec![
        Arc::new(html_escape) as OutputFilter
    ];
}

/// The filter chain components start out with. Since HTML is the
/// most common output, that's just `html_escape`.
pub fn default_filters() -> Vec<OutputFilter> {
    DEFAULT_FILTERS.clone()
}

pub fn html_escape(s: &str) -> String {
    let mut buf = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            '\'' => buf.push_str("&#39;"),
            _ => buf.push(c)
        }
    }
    buf
}

/// Insert `<br />` before each newline. Must come *after*
/// `html_escape` in a chain or the tags get escaped.
pub fn nl2br(s: &str) -> String {
    let mut buf = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\n' {
            buf.push_str("<br />");
        }
        buf.push(c);
    }
    buf
}

pub fn trim(s: &str) -> String {
    s.trim().into()
}

/// Look up a filter by the name used in configuration.
pub fn by_name(name: &str) -> Option<OutputFilter> {
    match name {
        "html_escape" => Some(Arc::new(html_escape)),
        "nl2br" => Some(Arc::new(nl2br)),
        "trim" => Some(Arc::new(trim)),
        _ => None
    }
}

/// Apply `filters` in sequence.
pub fn apply(filters: &[OutputFilter], s: &str) -> String {
    let mut out = s.to_string();
    for filter in filters {
        out = filter(&out);
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & \"b\" 'c'"), "a &amp; &quot;b&quot; &#39;c&#39;");
        assert_eq!(html_escape("Motörhead"), "Motörhead");
        assert_eq!(html_escape(""), "");
    }

    #[test]
    fn t_chain() {
        let chain = vec![by_name("trim").unwrap(),
                         by_name("html_escape").unwrap(),
                         by_name("nl2br").unwrap()];
        assert_eq!(apply(&chain, "  a<b\nc  "), "a&lt;b<br />\nc");
        assert_eq!(apply(&default_filters(), "<script>"), "&lt;script&gt;");
        assert_eq!(apply(&[], "<script>"), "<script>");
        assert!(by_name("htmlspecialchars").is_none());
    }
}
