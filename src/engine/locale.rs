//! Locale resolution for letter templates, subjects and senders.

use std::collections::HashMap;

/// Languages letters are produced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    De,
    Fr,
    It,
    En,
}

impl Language {
    pub const FALLBACK: Language = Language::En;

    pub fn code(&self) -> &'static str {
        match self {
            Language::De => "de",
            Language::Fr => "fr",
            Language::It => "it",
            Language::En => "en",
        }
    }
}

/// Per-language letter data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterLocale {
    pub language: Language,
    pub template: String,
    pub subject: String,
    pub sender: String,
}

#[derive(Debug, Clone)]
struct LanguageEntry {
    template: String,
    subject: String,
    sender: String,
}

/// Maps raw CRM locale tags to a [`Language`] and its letter data.
///
/// The per-language tables are total over [`Language`]; construction through
/// [`LocaleResolver::default`] guarantees every language has an entry.
#[derive(Debug, Clone)]
pub struct LocaleResolver {
    tags: HashMap<String, Language>,
    de: LanguageEntry,
    fr: LanguageEntry,
    it: LanguageEntry,
    en: LanguageEntry,
}

const LOCALE_TAGS: [(&str, Language); 18] = [
    ("de_CH", Language::De),
    ("de_DE", Language::De),
    ("de_AT", Language::De),
    ("de_BE", Language::De),
    ("de_LI", Language::De),
    ("de_LU", Language::De),
    ("de", Language::De),
    ("fr_FR", Language::Fr),
    ("fr_BE", Language::Fr),
    ("fr_CA", Language::Fr),
    ("fr_LU", Language::Fr),
    ("en_GB", Language::En),
    ("en_US", Language::En),
    ("en_AU", Language::En),
    ("en_CA", Language::En),
    ("en_NZ", Language::En),
    ("it_IT", Language::It),
    ("it_CH", Language::It),
];

fn entry(template: &str, subject: &str, sender: &str) -> LanguageEntry {
    LanguageEntry {
        template: template.to_string(),
        subject: subject.to_string(),
        sender: sender.to_string(),
    }
}

impl Default for LocaleResolver {
    fn default() -> Self {
        Self {
            tags: LOCALE_TAGS
                .iter()
                .map(|(tag, lang)| (tag.to_string(), *lang))
                .collect(),
            de: entry(
                "texinvoiceletterde",
                "Mitgliederbeitrag 2015",
                "Piratenpartei Schweiz <info@piratenpartei.ch>",
            ),
            fr: entry(
                "texinvoiceletterfr",
                "Cotisation 2015",
                "Parti Pirate Suisse <info@partipirate.ch>",
            ),
            it: entry(
                "texinvoiceletterit",
                "Quota 2015",
                "Partito Pirata Svizzera <info@partitopirata.ch>",
            ),
            en: entry(
                "texinvoiceletteren",
                "Membership Fee 2015",
                "Pirate Party Switzerland <info@pirateparty.ch>",
            ),
        }
    }
}

impl LocaleResolver {
    /// Map a raw locale tag to a language; misses and absent tags fall back
    /// to English.
    pub fn resolve_language(&self, raw: Option<&str>) -> Language {
        raw.and_then(|tag| self.tags.get(tag).copied())
            .unwrap_or(Language::FALLBACK)
    }

    fn entry(&self, language: Language) -> &LanguageEntry {
        match language {
            Language::De => &self.de,
            Language::Fr => &self.fr,
            Language::It => &self.it,
            Language::En => &self.en,
        }
    }

    pub fn template_for(&self, language: Language) -> &str {
        &self.entry(language).template
    }

    pub fn subject_for(&self, language: Language) -> &str {
        &self.entry(language).subject
    }

    pub fn sender_for(&self, language: Language) -> &str {
        &self.entry(language).sender
    }

    /// Resolve a raw tag straight to the letter data for its language.
    pub fn letter_locale(&self, raw: Option<&str>) -> LetterLocale {
        let language = self.resolve_language(raw);
        LetterLocale {
            language,
            template: self.template_for(language).to_string(),
            subject: self.subject_for(language).to_string(),
            sender: self.sender_for(language).to_string(),
        }
    }
}
