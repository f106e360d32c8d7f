//! Language packs: `languages.json` maps a language code to a table of
//! message keys. Messages may contain `{name}` placeholders.

use std::collections::HashMap;
use std::path::Path;

use crate::assets;
use crate::config::load_json_or_bundled;
use crate::error::Result;

pub const DEFAULT_LANGUAGE: &str = "id";

/// Languages offered in the picker, as (code, display name)
pub const LANGUAGE_CHOICES: [(&str, &str); 2] = [("id", "Indonesia"), ("en", "English")];

#[derive(Debug, Clone, Default)]
pub struct Languages {
    packs: HashMap<String, HashMap<String, String>>,
}

impl Languages {
    pub fn load(path: &Path) -> Result<Self> {
        let packs = load_json_or_bundled(path, assets::LANGUAGES)?;
        Ok(Self { packs })
    }

    pub fn bundled() -> Result<Self> {
        let bytes = assets::bundled(assets::LANGUAGES)?;
        Ok(Self {
            packs: serde_json::from_slice(&bytes)?,
        })
    }

    pub fn has_key(&self, lang: &str, key: &str) -> bool {
        self.packs.get(lang).is_some_and(|pack| pack.contains_key(key))
    }

    /// Looks up `key`; a missing key yields the key itself
    pub fn t(&self, lang: &str, key: &str) -> String {
        self.t_args(lang, key, &[])
    }

    pub fn t_args(&self, lang: &str, key: &str, args: &[(&str, &str)]) -> String {
        let template = self
            .packs
            .get(lang)
            .and_then(|pack| pack.get(key))
            .map(String::as_str)
            .unwrap_or(key);
        fill(template, args)
    }
}

/// Replaces each `{name}` with its value; unknown placeholders stay as-is
pub fn fill(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in args {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}
