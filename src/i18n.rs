//! Phrase tables for the root context's `translate`.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Result, anyhow, bail, Context};
use kstring::KString;

use crate::language::Language;
use crate::warn;

#[derive(Debug, Clone)]
pub struct Phrasebook<L: Language> {
    phrases: HashMap<L, HashMap<KString, KString>>,
}

impl<L: Language> Default for Phrasebook<L> {
    fn default() -> Self {
        Self { phrases: HashMap::new() }
    }
}

impl<L: Language> Phrasebook<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chaining.
    pub fn add(&mut self, lang: L, phrase: &str, translation: &str) -> &mut Self {
        self.phrases.entry(lang).or_default().insert(
            KString::from_ref(phrase), KString::from_ref(translation));
        self
    }

    pub fn lookup(&self, lang: L, phrase: &str) -> Option<&str> {
        self.phrases.get(&lang)?.get(phrase).map(|s| s.as_str())
    }

    /// Parse `{"de": {"Hello": "Hallo"}, ...}`. Unknown language codes
    /// are an error.
    pub fn from_json(s: &str) -> Result<Self> {
        let raw: HashMap<String, HashMap<String, String>> = serde_json::from_str(s)?;
        let mut book = Self::new();
        for (langstr, table) in raw {
            let lang = match L::maybe_from(&langstr) {
                Some(l) => l,
                None => bail!("unknown language code {langstr:?}, expecting one of {:?}",
                              L::strs())
            };
            for (phrase, translation) in table {
                book.add(lang, &phrase, &translation);
            }
        }
        Ok(book)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).with_context(
            || anyhow!("opening phrasebook for reading: {path:?}"))?;
        let book = Self::from_json(&s).with_context(
            || anyhow!("parsing phrasebook {path:?}"))?;
        if book.phrases.is_empty() {
            warn!("phrasebook {path:?} is empty");
        }
        Ok(book)
    }
}
