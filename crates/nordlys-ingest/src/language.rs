//! The language gate.
//!
//! Built once per worker so classification never serializes across the
//! pool. Two modes, fixed at startup:
//!
//! - **Detection enabled**: every surviving post is classified with an
//!   n-gram detector; mistagged posts in a target language are caught and
//!   the detected ISO code is unioned into the declared set.
//! - **Detection disabled**: a post is accepted iff its declared languages
//!   intersect the target set, unchanged.

use std::str::FromStr;

use lingua::{IsoCode639_1, Language, LanguageDetector, LanguageDetectorBuilder};

/// Posts with English confidence above this are rejected unless English is
/// itself a target language.
const ENGLISH_VETO_CONFIDENCE: f64 = 0.8;

/// Minimum relative distance between top candidates; below this the
/// detector refuses to pick a language at all.
const MINIMUM_RELATIVE_DISTANCE: f64 = 0.25;

/// Configuration for the language gate.
#[derive(Debug, Clone)]
pub struct LanguageGateConfig {
    /// Run the detector on every post rather than trusting declared tags.
    pub run_detection: bool,
    /// Minimum confidence for the best target language, in [0, 1].
    pub confidence_threshold: f64,
    /// Target ISO-639-1 codes. `None` means all supported languages.
    pub target_languages: Option<Vec<String>>,
}

/// Per-worker language classifier.
pub struct LanguageGate {
    detector: Option<LanguageDetector>,
    threshold: f64,
    targets: Vec<Language>,
    target_codes: Vec<String>,
    english_is_target: bool,
}

impl LanguageGate {
    pub fn new(config: &LanguageGateConfig) -> Self {
        let targets = match &config.target_languages {
            Some(codes) => {
                let mut targets = Vec::with_capacity(codes.len());
                for code in codes {
                    match language_for_code(code) {
                        Some(language) => targets.push(language),
                        None => {
                            tracing::warn!(code = %code, "language not supported by the detector, skipping");
                        }
                    }
                }
                targets
            }
            None => {
                tracing::info!("no target languages configured, detecting all supported languages");
                let mut all: Vec<Language> = Language::all().into_iter().collect();
                all.sort();
                all
            }
        };

        let target_codes = targets.iter().map(|lang| iso_code(*lang)).collect();
        let english_is_target = targets.contains(&Language::English);

        // The detector is built over all languages so the target languages
        // are reliably separated from their close relatives.
        let detector = config.run_detection.then(|| {
            LanguageDetectorBuilder::from_all_languages()
                .with_minimum_relative_distance(MINIMUM_RELATIVE_DISTANCE)
                .build()
        });

        Self {
            detector,
            threshold: config.confidence_threshold,
            targets,
            target_codes,
            english_is_target,
        }
    }

    /// Decide whether a post passes the gate.
    ///
    /// Returns the post's language set on acceptance (declared codes plus
    /// the detected code when detection ran), `None` on rejection.
    pub fn evaluate(&self, text: &str, declared: &[String]) -> Option<Vec<String>> {
        match &self.detector {
            Some(detector) => self.detect(detector, text, declared),
            None => {
                let matches = declared
                    .iter()
                    .any(|code| self.target_codes.iter().any(|t| t.eq_ignore_ascii_case(code)));
                matches.then(|| declared.to_vec())
            }
        }
    }

    fn detect(
        &self,
        detector: &LanguageDetector,
        text: &str,
        declared: &[String],
    ) -> Option<Vec<String>> {
        let english_confidence = detector.compute_language_confidence(text, Language::English);
        if english_confidence > ENGLISH_VETO_CONFIDENCE && !self.english_is_target {
            return None;
        }

        let mut best: Option<(Language, f64)> = None;
        for language in &self.targets {
            let confidence = detector.compute_language_confidence(text, *language);
            if best.map_or(true, |(_, top)| confidence > top) {
                best = Some((*language, confidence));
            }
        }

        let (best_language, best_confidence) = best?;
        if best_confidence < self.threshold {
            return None;
        }

        tracing::debug!(
            language = ?best_language,
            confidence = best_confidence,
            threshold = self.threshold,
            "language detected"
        );

        let code = iso_code(best_language);
        let mut languages = declared.to_vec();
        if !languages.iter().any(|l| l.eq_ignore_ascii_case(&code)) {
            languages.push(code);
        }
        Some(languages)
    }
}

/// Lowercase ISO-639-1 code for a detector language.
fn iso_code(language: Language) -> String {
    language.iso_code_639_1().to_string().to_lowercase()
}

/// The detector language for an ISO-639-1 code, if it models one.
fn language_for_code(code: &str) -> Option<Language> {
    let iso = IsoCode639_1::from_str(&code.to_lowercase()).ok()?;
    Some(Language::from_iso_code_639_1(&iso))
}
