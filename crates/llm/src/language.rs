use docsum_common::{DocsumError, PipelineConfig, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};
use whatlang::Lang;

use crate::llm_trait::TranslationService;
use crate::prompts::DEFAULT_PROMPT;
use crate::retry::RetryPolicy;
use crate::types::{LanguageCode, Prompt};

/// Instructions shorter than this are too short for trigram detection
const MIN_PROMPT_DETECTION_CHARS: usize = 40;

/// Statistical language detection over a bounded prefix
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    prefix_chars: usize,
    default_language: LanguageCode,
}

impl LanguageDetector {
    pub fn new(prefix_chars: usize, default_language: LanguageCode) -> Self {
        Self {
            prefix_chars: prefix_chars.max(1),
            default_language,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.language_detection_prefix,
            LanguageCode::new(&config.default_language),
        )
    }

    pub fn default_language(&self) -> &LanguageCode {
        &self.default_language
    }

    /// Detect the dominant language of `text`.
    ///
    /// Only the first `prefix_chars` characters are inspected. When the
    /// detector has no guess at all the default language is returned.
    pub fn detect(&self, text: &str) -> Result<LanguageCode> {
        if text.trim().is_empty() {
            return Err(DocsumError::empty_input("cannot detect language of empty text"));
        }

        let sample = match text.char_indices().nth(self.prefix_chars) {
            Some((end, _)) => &text[..end],
            None => text,
        };

        match whatlang::detect(sample) {
            Some(info) => {
                let code = language_code(info.lang());
                debug!(
                    "Detected language: {} (confidence {:.2}, reliable: {})",
                    code,
                    info.confidence(),
                    info.is_reliable()
                );
                Ok(code)
            }
            None => {
                debug!(
                    "Language detector had no guess, using default {}",
                    self.default_language
                );
                Ok(self.default_language.clone())
            }
        }
    }

    /// Detect the language of a short instruction.
    ///
    /// Returns `None` unless the text is long enough and the detector calls
    /// its guess reliable. Short instructions get misread as Latin or Turkish
    /// far too often to act on.
    pub fn detect_reliable(&self, text: &str) -> Option<LanguageCode> {
        if text.trim().chars().count() < MIN_PROMPT_DETECTION_CHARS {
            return None;
        }

        let info = whatlang::detect(text)?;
        if !info.is_reliable() {
            debug!(
                "Unreliable guess {} (confidence {:.2}) ignored",
                info.lang().code(),
                info.confidence()
            );
            return None;
        }
        Some(language_code(info.lang()))
    }
}

/// Map a detected language to ISO 639-1 where one is common, ISO 639-3 otherwise
fn language_code(lang: Lang) -> LanguageCode {
    let code = match lang {
        Lang::Eng => "en",
        Lang::Nld => "nl",
        Lang::Deu => "de",
        Lang::Fra => "fr",
        Lang::Spa => "es",
        Lang::Ita => "it",
        Lang::Por => "pt",
        Lang::Rus => "ru",
        Lang::Ukr => "uk",
        Lang::Pol => "pl",
        Lang::Swe => "sv",
        Lang::Dan => "da",
        Lang::Nob => "no",
        Lang::Fin => "fi",
        Lang::Tur => "tr",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Cmn => "zh",
        other => other.code(),
    };
    LanguageCode::new(code)
}

/// Translates the instruction prompt into the document language
pub struct PromptLocalizer {
    detector: LanguageDetector,
    translator: Arc<dyn TranslationService>,
    retry: RetryPolicy,
}

impl PromptLocalizer {
    pub fn new(
        detector: LanguageDetector,
        translator: Arc<dyn TranslationService>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            detector,
            translator,
            retry,
        }
    }

    /// Localize `prompt` (or the built-in default) into `target`.
    ///
    /// Never fails: when translation is unavailable the original prompt is
    /// kept and the returned prompt is marked degraded.
    pub async fn localize(&self, prompt: Option<&str>, target: &LanguageCode) -> Prompt {
        let custom = prompt.map(str::trim).filter(|p| !p.is_empty());
        let (original, language) = match custom {
            // Undetectable instructions are taken to be in the default language
            Some(text) => {
                let language = self
                    .detector
                    .detect_reliable(text)
                    .unwrap_or_else(|| self.detector.default_language().clone());
                (text.to_string(), language)
            }
            None => (
                DEFAULT_PROMPT.to_string(),
                self.detector.default_language().clone(),
            ),
        };

        if &language == target {
            debug!("Prompt already in {}, no translation needed", target);
            return Prompt::unchanged(original, language);
        }

        let translator = &self.translator;
        let text = original.as_str();
        let translated = self
            .retry
            .run("Prompt translation", move || translator.translate(text, target))
            .await;

        match translated {
            Ok(localized) => {
                info!("Prompt translated from {} to {}", language, target);
                Prompt {
                    original,
                    localized,
                    language,
                    degraded: None,
                }
            }
            Err(e) => {
                let reason = match e {
                    DocsumError::TranslationUnavailable(_) => e,
                    other => DocsumError::translation_unavailable(other.to_string()),
                }
                .to_string();
                warn!("{}; keeping the untranslated prompt", reason);
                Prompt {
                    localized: original.clone(),
                    original,
                    language,
                    degraded: Some(reason),
                }
            }
        }
    }
}
