use pct_str::{PctString, URIReserved, InvalidPctString, PctStr};

/// Percent-encode for use as a query key or value (or path segment).
pub fn url_encode(s: &str) -> String {
    let p = PctString::encode(s.chars(), URIReserved);
    p.to_string()
}

// Don't return InvalidPctString: it holds a &str into the request,
// which would then have to live as long as any anyhow::Error it ends
// up in. Make our own that owns the string.

#[derive(Debug, thiserror::Error)]
#[error("url decoding error: {0}")]
pub struct UrlDecodingError(Box<String>);

impl From<InvalidPctString<&str>> for UrlDecodingError {
    fn from(e: InvalidPctString<&str>) -> Self {
        Self(Box::new(format!("{}", e)))
    }
}

pub fn url_decode(s: &str) -> Result<String, UrlDecodingError> {
    let p = PctStr::new(s)?;
    Ok(p.decode())
}

/// Like `url_decode` but also turns `+` into space, as sent by
/// browsers for GET forms.
pub fn query_decode(s: &str) -> Result<String, UrlDecodingError> {
    let mut out = String::new();
    for (i, part) in s.split('+').enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&url_decode(part)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_roundtrip() {
        assert_eq!(url_encode("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(url_decode("a%20b%26c%3Dd").unwrap(), "a b&c=d");
        assert_eq!(query_decode("a+b%2B").unwrap(), "a b+");
        assert!(url_decode("%zz").is_err());
    }
}
