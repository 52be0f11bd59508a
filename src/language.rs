use std::fmt::Debug;
use std::hash::Hash;

/// Take `n` characters if available, fewer if reaching EOS before that
/// point. Returns true iff (at least) `n` characters were available.
fn str_take(s: &str, n: usize) -> (&str, bool) {
    let mut ci = 0;
    for (i, _) in s.char_indices() {
        if ci == n {
            return (&s[0..i], true)
        }
        ci += 1;
    }
    (s, ci == n)
}

pub trait Language: Clone + Copy + PartialEq + Eq + Hash + Debug + Default
    + Send + Sync + 'static
{
    fn maybe_from(s: &str) -> Option<Self> where Self: Sized;

    /// Accepts "de_CH", "de-CH" etc.
    fn maybe_from_start(s: &str) -> Option<Self> {
        let (start, ok) = str_take(s, 2);
        if ! ok { return None }
        Self::maybe_from(start)
    }

    /// 2-letter lower-case language code.
    fn as_str(self) -> &'static str;

    /// The codes, in the order of preference.
    fn strs() -> &'static [&'static str];
}
