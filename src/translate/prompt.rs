use std::collections::BTreeMap;

use crate::config::PromptConfig;

/// Convert a language code to the name used in prompts. Unknown codes are
/// returned unchanged.
pub fn language_name(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "en" => "English".to_string(),
        "es" => "Spanish".to_string(),
        "fr" => "French".to_string(),
        "de" => "German".to_string(),
        "it" => "Italian".to_string(),
        "pt" => "Portuguese".to_string(),
        "ja" => "Japanese".to_string(),
        "zh" => "Chinese".to_string(),
        "ko" => "Korean".to_string(),
        "ru" => "Russian".to_string(),
        "ar" => "Arabic".to_string(),
        _ => code.to_string(),
    }
}

/// Japanese, Chinese and Korean targets
pub fn is_cjk_language(code: &str) -> bool {
    matches!(code.to_lowercase().as_str(), "ja" | "zh" | "ko")
}

const JAPANESE_GUIDE: &str = "\
- Write natural Japanese, mixing kanji, hiragana and katakana the way native subtitles do
- Write foreign names and loanwords in katakana
- Match politeness to the speakers: plain form between friends and family, desu/masu form with strangers or superiors
- Keep lines short; subtitles are read at a glance";

const SPANISH_GUIDE: &str = "\
- Use correct accents and tildes (á, é, í, ó, ú, ñ) and opening marks (¿ ¡)
- Choose tú or usted according to the relationship between the speakers
- Prefer neutral Spanish over regional slang";

/// Optional extra guidance per target language, keyed by language code.
#[derive(Debug, Clone)]
pub struct StyleGuides {
    guides: BTreeMap<String, String>,
}

impl Default for StyleGuides {
    fn default() -> Self {
        let mut guides = BTreeMap::new();
        guides.insert("ja".to_string(), JAPANESE_GUIDE.to_string());
        guides.insert("es".to_string(), SPANISH_GUIDE.to_string());
        Self { guides }
    }
}

impl StyleGuides {
    /// Built-in guides with configured entries layered on top
    pub fn from_config(config: &PromptConfig) -> Self {
        let mut style_guides = Self::default();
        for (code, guide) in &config.style_guides {
            style_guides.insert(code, guide);
        }
        style_guides
    }

    pub fn insert(&mut self, code: &str, guide: &str) {
        self.guides.insert(code.to_lowercase(), guide.trim().to_string());
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.guides
            .get(&code.to_lowercase())
            .map(String::as_str)
            .filter(|guide| !guide.is_empty())
    }
}

/// Builds the generation prompt for one subtitle entry
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    style_guides: StyleGuides,
}

impl PromptBuilder {
    pub fn new(style_guides: StyleGuides) -> Self {
        Self { style_guides }
    }

    pub fn build(&self, text: &str, target_language: &str, context: Option<&str>) -> String {
        let name = language_name(target_language);
        let mut prompt = format!("Translate this subtitle text to {}.\n\n", name);

        if let Some(ctx) = context.map(str::trim).filter(|ctx| !ctx.is_empty()) {
            prompt.push_str(&format!(
                "[Context - DO NOT translate this part]\n\
                 {}\n\
                 Use this context for character names, tone and terminology.\n\n",
                ctx
            ));
        }

        if let Some(guide) = self.style_guides.get(target_language) {
            prompt.push_str(&format!("[{} style guidelines]\n{}\n\n", name, guide));
        }

        prompt.push_str(&format!(
            "CRITICAL RULES - FOLLOW EXACTLY:\n\
             1. Output ONLY the {name} translation\n\
             2. NO explanations, notes, comments, or annotations\n\
             3. NO translation notes like \"Translation note:\" or \"注：\"\n\
             4. NO alternative suggestions or variations\n\
             5. {script_rule}\n\
             6. Keep the same number of lines as the original\n\
             7. Preserve line breaks exactly as they appear\n\
             8. Do not add any extra text before or after the translation\n\n",
            name = name,
            script_rule = script_rule(target_language, &name),
        ));

        prompt.push_str(&format!("Original text:\n{}\n\n{} translation:", text, name));
        prompt
    }
}

fn script_rule(target_language: &str, name: &str) -> String {
    match target_language.to_lowercase().as_str() {
        "ja" => "NO Korean Hangul; write Japanese script only".to_string(),
        "zh" => "NO Japanese kana or Korean Hangul; write Chinese characters only".to_string(),
        "ko" => "NO Japanese kana or Chinese characters; write Korean Hangul only".to_string(),
        _ => format!("NO Chinese, Japanese or Korean characters; write {} only", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_names() {
        assert_eq!(language_name("ja"), "Japanese");
        assert_eq!(language_name("ES"), "Spanish");
        assert_eq!(language_name("xx"), "xx");
    }

    #[test]
    fn test_prompt_structure() {
        let prompt = PromptBuilder::default().build("Hello\nthere", "fr", None);

        assert!(prompt.starts_with("Translate this subtitle text to French."));
        assert!(prompt.contains("Output ONLY the French translation"));
        assert!(prompt.contains("NO Chinese, Japanese or Korean characters"));
        assert!(prompt.ends_with("Original text:\nHello\nthere\n\nFrench translation:"));
        assert!(!prompt.contains("[Context"));
        assert!(!prompt.contains("style guidelines"));
    }

    #[test]
    fn test_context_block() {
        let builder = PromptBuilder::default();
        let with_context = builder.build("Hi", "de", Some("Sci-fi series; Captain Vega is female"));
        assert!(with_context.contains("[Context - DO NOT translate this part]\nSci-fi series; Captain Vega is female"));
        assert!(with_context.contains("character names, tone and terminology"));

        let blank_context = builder.build("Hi", "de", Some("   "));
        assert!(!blank_context.contains("[Context"));
    }

    #[test]
    fn test_language_guides() {
        let builder = PromptBuilder::default();

        let ja = builder.build("Hi", "ja", None);
        assert!(ja.contains("[Japanese style guidelines]"));
        assert!(ja.contains("katakana"));
        assert!(!ja.contains("NO Chinese, Japanese or Korean characters"));

        let es = builder.build("Hi", "es", None);
        assert!(es.contains("[Spanish style guidelines]"));
        assert!(es.contains("usted"));

        let unknown = builder.build("Hi", "sw", None);
        assert!(unknown.contains("Translate this subtitle text to sw."));
        assert!(!unknown.contains("style guidelines"));
    }

    #[test]
    fn test_configured_guides() {
        let mut config = PromptConfig::default();
        config.style_guides.insert("FR".to_string(), "Use vous by default.".to_string());
        config.style_guides.insert("es".to_string(), String::new());

        let builder = PromptBuilder::new(StyleGuides::from_config(&config));
        assert!(builder.build("Hi", "fr", None).contains("[French style guidelines]\nUse vous by default."));
        assert!(!builder.build("Hi", "es", None).contains("style guidelines"));
    }

    #[test]
    fn test_deterministic() {
        let builder = PromptBuilder::default();
        assert_eq!(
            builder.build("Hello", "ja", Some("ctx")),
            builder.build("Hello", "ja", Some("ctx"))
        );
    }
}
