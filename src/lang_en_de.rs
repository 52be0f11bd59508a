//! The languages of the demo app: English (the default) and German.

use crate::language::Language;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Lang {
    En,
    De,
}

// Same order in both
const LANGS: &[Lang] = &[Lang::En, Lang::De];
const CODES: &[&str] = &["en", "de"];

impl Language for Lang {
    fn maybe_from(s: &str) -> Option<Self> {
        let i = CODES.iter().position(|code| *code == s)?;
        Some(LANGS[i])
    }

    fn as_str(self) -> &'static str {
        CODES[self as usize]
    }

    fn strs() -> &'static [&'static str] {
        CODES
    }
}

impl Default for Lang {
    fn default() -> Self {
        Lang::En
    }
}

/// Lenient: region suffixes are ignored, unknown codes give the
/// default.
impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Lang::maybe_from_start(s).unwrap_or_default()
    }
}
