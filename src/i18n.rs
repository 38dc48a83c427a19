// Localized notification texts shown to the admin after console actions

use crate::models::Language;
use std::collections::HashMap;

const MESSAGES: &[(&str, &str, &str)] = &[
    (
        "products_load_failed",
        "Failed to load products",
        "उत्पाद लोड नहीं हो सके",
    ),
    ("product_deleted", "Product deleted", "उत्पाद हटा दिया गया"),
    ("product_delete_failed", "Failed to delete", "हटाने में विफल"),
    (
        "delete_confirmation_required",
        "Are you sure you want to delete this product?",
        "क्या आप वाकई इस उत्पाद को हटाना चाहते हैं?",
    ),
    (
        "product_created",
        "Product created successfully!",
        "उत्पाद सफलतापूर्वक बनाया गया!",
    ),
    (
        "product_updated",
        "Product updated successfully!",
        "उत्पाद सफलतापूर्वक अपडेट किया गया!",
    ),
    (
        "product_save_failed",
        "Failed to save product. Please try again.",
        "उत्पाद सहेजने में विफल। कृपया पुनः प्रयास करें।",
    ),
    (
        "pack_sizes_required",
        "Please add at least one Pack Size.",
        "कृपया कम से कम एक पैक साइज़ जोड़ें।",
    ),
    (
        "english_title_required",
        "English Product Name is required.",
        "अंग्रेज़ी उत्पाद नाम आवश्यक है।",
    ),
    (
        "invalid_credentials",
        "Invalid email or password",
        "अमान्य ईमेल या पासवर्ड",
    ),
    ("signed_in", "Signed in", "साइन इन हो गया"),
    ("signed_out", "Signed out", "साइन आउट हो गया"),
    (
        "unsupported_image",
        "Please upload a PNG/JPG image.",
        "कृपया PNG/JPG छवि अपलोड करें।",
    ),
    ("form_not_found", "Form not found", "फ़ॉर्म नहीं मिला"),
    ("product_not_found", "Product not found", "उत्पाद नहीं मिला"),
    ("row_out_of_range", "That row no longer exists", "वह पंक्ति अब मौजूद नहीं है"),
    ("form_closed", "Form closed", "फ़ॉर्म बंद किया गया"),
    (
        "save_in_progress",
        "This product is already being saved",
        "यह उत्पाद पहले से सहेजा जा रहा है",
    ),
];

pub struct I18n {
    messages: HashMap<Language, HashMap<&'static str, &'static str>>,
}

impl Default for I18n {
    fn default() -> Self {
        Self::new()
    }
}

impl I18n {
    pub fn new() -> Self {
        let mut en = HashMap::new();
        let mut hi = HashMap::new();
        for (key, english, hindi) in MESSAGES {
            en.insert(*key, *english);
            hi.insert(*key, *hindi);
        }

        let mut messages = HashMap::new();
        messages.insert(Language::En, en);
        messages.insert(Language::Hi, hi);
        Self { messages }
    }

    /// Picks the notification language from an `Accept-Language` value.
    pub fn language_for(accept_language: &str) -> Language {
        if accept_language.trim().to_ascii_lowercase().starts_with("hi") {
            Language::Hi
        } else {
            Language::En
        }
    }

    pub fn get(&self, lang: Language, key: &str) -> String {
        self.messages
            .get(&lang)
            .and_then(|msgs| msgs.get(key))
            .or_else(|| {
                self.messages
                    .get(&Language::En)
                    .and_then(|msgs| msgs.get(key))
            })
            .map(|msg| msg.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i18n_english() {
        let i18n = I18n::new();
        assert_eq!(
            i18n.get(Language::En, "pack_sizes_required"),
            "Please add at least one Pack Size."
        );
    }

    #[test]
    fn test_i18n_hindi() {
        let i18n = I18n::new();
        assert_eq!(i18n.get(Language::Hi, "product_deleted"), "उत्पाद हटा दिया गया");
    }

    #[test]
    fn unknown_keys_echo_the_key() {
        let i18n = I18n::new();
        assert_eq!(i18n.get(Language::Hi, "no_such_message"), "no_such_message");
    }

    #[test]
    fn accept_language_selects_hindi_only_when_preferred() {
        assert_eq!(I18n::language_for("hi-IN,hi;q=0.9,en;q=0.8"), Language::Hi);
        assert_eq!(I18n::language_for("en-US"), Language::En);
        assert_eq!(I18n::language_for(""), Language::En);
    }
}
