use anyhow::{Context, Result};
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::Arc;
use unic_langid::LanguageIdentifier;

/// Fluent sources compiled into the binary, keyed by language code
const LOCALE_SOURCES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("hi", include_str!("../locales/hi/main.ftl")),
];

const DEFAULT_LANGUAGE: &str = "en";

type Bundle = fluent_bundle::concurrent::FluentBundle<FluentResource>;

/// Localization manager for the quiz bot.
///
/// Bundles use the concurrent memoizer so one manager can be shared behind
/// an [`Arc`] by handlers running on any runtime thread.
pub struct LocalizationManager {
    bundles: HashMap<String, Bundle>,
}

impl LocalizationManager {
    /// Create a new localization manager
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for (locale_str, source) in LOCALE_SOURCES {
            let locale: LanguageIdentifier = locale_str
                .parse()
                .with_context(|| format!("Invalid locale identifier: {}", locale_str))?;
            let bundle = Self::create_bundle(locale, source)?;
            bundles.insert(locale_str.to_string(), bundle);
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale: LanguageIdentifier, source: &str) -> Result<Bundle> {
        let mut bundle = Bundle::new_concurrent(vec![locale.clone()]);
        // Telegram renders the isolation marks as stray glyphs
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow::anyhow!("{} parse errors: {:?}", locale, errors))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow::anyhow!("{} duplicate messages: {:?}", locale, errors))?;

        Ok(bundle)
    }

    /// Get a localized message in a specific language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&FluentArgs>,
    ) -> String {
        let bundle = match self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {}", key),
        };

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None if language != DEFAULT_LANGUAGE => {
                return self.get_message_in_language(key, DEFAULT_LANGUAGE, args)
            }
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let mut errors = vec![];
        bundle
            .format_pattern(pattern, args, &mut errors)
            .into_owned()
    }

    /// Get a localized message with arguments in a specific language
    pub fn get_message_with_args_in_language(
        &self,
        key: &str,
        language: &str,
        args: &[(&str, &str)],
    ) -> String {
        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            fluent_args.set(*name, FluentValue::from(*value));
        }
        self.get_message_in_language(key, language, Some(&fluent_args))
    }

    /// Check if a language is supported
    pub fn is_language_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }

    /// Detect the appropriate language based on user's Telegram language code
    pub fn detect_language(&self, language_code: Option<&str>) -> String {
        if let Some(code) = language_code {
            // "hi-IN" -> "hi", "en_US" -> "en"
            let lang = code
                .split(['-', '_'])
                .next()
                .unwrap_or(DEFAULT_LANGUAGE)
                .to_ascii_lowercase();

            if self.is_language_supported(&lang) {
                return lang;
            }
        }

        DEFAULT_LANGUAGE.to_string()
    }
}

/// Build the shared manager handed to every handler
pub fn create_localization_manager() -> Result<Arc<LocalizationManager>> {
    Ok(Arc::new(LocalizationManager::new()?))
}

/// Convenience function to get a localized message in user's language
pub fn t_lang(manager: &LocalizationManager, key: &str, language_code: Option<&str>) -> String {
    let language = manager.detect_language(language_code);
    manager.get_message_in_language(key, &language, None)
}

/// Convenience function to get a localized message with arguments in user's language
pub fn t_args_lang(
    manager: &LocalizationManager,
    key: &str,
    args: &[(&str, &str)],
    language_code: Option<&str>,
) -> String {
    let language = manager.detect_language(language_code);
    manager.get_message_with_args_in_language(key, &language, args)
}
