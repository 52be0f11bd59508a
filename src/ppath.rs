//! Paths independent of the local file system (pure functions), for
//! resolving hrefs in `Context::build_url`.

//! Does not concern itself with handling ".." or ".", i.e. does not
//! offer canonicalization; browsers do that.

use kstring::KString;

use crate::url_encoding::url_encode;

/// Careful, this drops any empty segments, regardless whether at the
/// beginning, end or in the middle.
pub fn path_segments<'s>(s: &'s str) -> impl Iterator<Item = &'s str>
{
    s.split('/').filter(|s| !s.is_empty())
}

#[derive(Clone, Debug, PartialEq)]
pub struct PPath {
    is_absolute: bool,
    ends_with_slash: bool,
    segments: Vec<KString>, // without empty ones
}

impl PPath {
    pub fn new(is_absolute: bool,
               ends_with_slash: bool,
               segments: Vec<KString>
    ) -> Self {
        PPath { is_absolute, ends_with_slash, segments }
    }

    pub fn from_str(s: &str) -> Self {
        // XX allow the empty string?
        let is_absolute = s.starts_with('/');
        let ends_with_slash = s.ends_with('/');
        PPath {
            is_absolute,
            ends_with_slash,
            segments: path_segments(s).map(KString::from_ref).collect()
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.is_absolute
    }
    pub fn ends_with_slash(&self) -> bool {
        self.ends_with_slash
    }
    /// without empty ones
    pub fn segments(&self) -> &[KString] {
        &self.segments
    }

    /// Get the path explicitly as a path to a directory, i.e. sets
    /// ends_with_slash.
    pub fn as_dir(&self) -> Self {
        PPath { is_absolute: self.is_absolute,
                ends_with_slash: true,
                segments: self.segments.clone() }
    }

    /// Like a browser: unless self ends with a slash, its last
    /// segment is replaced.
    pub fn add_segments(&self, segments: &[KString], ends_with_slash: bool) -> Self {
        let mut newsegments =
            if self.ends_with_slash || self.segments.is_empty() {
                self.segments.clone()
            } else {
                self.segments[0..self.segments.len() - 1].to_vec()
            };
        newsegments.extend_from_slice(segments);
        PPath {
            is_absolute: self.is_absolute,
            ends_with_slash,
            segments: newsegments
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        if other.is_absolute {
            other.clone()
        } else {
            self.add_segments(&other.segments, other.ends_with_slash)
        }
    }

    /// The segments as they are, for display and logging.
    pub fn to_string(&self) -> String {
        self.join(|segment| segment.to_string())
    }

    /// Each segment percent-encoded, for use in hrefs.
    pub fn to_url_string(&self) -> String {
        self.join(url_encode)
    }

    fn join(&self, segment_str: impl Fn(&str) -> String) -> String {
        let mut s = String::new();
        if self.is_absolute {
            s.push('/');
        }
        if self.segments.is_empty() {
            if ! self.is_absolute {
                s.push('.');
                if self.ends_with_slash {
                    s.push('/');
                }
            }
        } else {
            s.push_str(&itertools::join(
                self.segments.iter().map(|segment| segment_str(segment)), "/"));
            if self.ends_with_slash {
                s.push('/');
            }
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_add() {
        let t = |base: &str, rel: &str| -> String {
            PPath::from_str(base).add(&PPath::from_str(rel)).to_string()
        };
        assert_eq!(t("/", "hello"), "/hello");
        assert_eq!(t("/hello", "foo"), "/foo");
        assert_eq!(t("/world/", "foo"), "/world/foo");
        assert_eq!(t("/hello", "bar/baz/"), "/bar/baz/");
        assert_eq!(t("foo/hum/", "bar/baz/"), "foo/hum/bar/baz/");
        assert_eq!(t("/world/", "/abs"), "/abs");
        assert_eq!(t("/", "/"), "/");
    }

    #[test]
    fn t_to_string() {
        assert_eq!(PPath::from_str("/foo///bar/").to_string(), "/foo/bar/");
        assert_eq!(PPath::from_str("").to_string(), ".");
        assert_eq!(PPath::from_str("/").segments().len(), 0);
        assert_eq!(PPath::from_str("/a/b").as_dir().to_string(), "/a/b/");
    }

    #[test]
    fn t_to_url_string() {
        let p = PPath::from_str("/a?b c/ä#/");
        assert_eq!(p.to_string(), "/a?b c/ä#/");
        assert_eq!(p.to_url_string(), "/a%3Fb%20c/%C3%A4%23/");
        assert_eq!(PPath::from_str("").to_url_string(), ".");
    }
}
