//! Labeled field descriptors for the product form, and the login page.

use crate::models::Language;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Input,
    Textarea,
    Image,
    List,
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_label: Option<&'static str>,
}

impl FieldSpec {
    fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            placeholder: None,
            key_label: None,
            value_label: None,
        }
    }

    fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    fn placeholder(mut self, placeholder: &'static str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    fn columns(mut self, key_label: &'static str, value_label: &'static str) -> Self {
        self.key_label = Some(key_label);
        self.value_label = Some(value_label);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: &'static str,
    pub shared: bool,
    pub fields: Vec<FieldSpec>,
}

/**
 * form_sections
 * Form sections as rendered while editing `lang`. Only the English title is
 * marked required.
 */
pub fn form_sections(lang: Language) -> Vec<Section> {
    let hindi = lang == Language::Hi;

    vec![
        Section {
            title: "Global Details (Shared across languages)",
            shared: true,
            fields: vec![
                FieldSpec::new("image", "Product Image", FieldKind::Image)
                    .placeholder("Click to upload PNG/JPG"),
                FieldSpec::new("pack_sizes", "Pack Sizes", FieldKind::List)
                    .required(true)
                    .placeholder("e.g. 500ml, 1kg"),
            ],
        },
        Section {
            title: "Basic Information",
            shared: false,
            fields: vec![
                FieldSpec::new("title", "Product Name", FieldKind::Input)
                    .required(lang == Language::En)
                    .placeholder(if hindi { "उत्पाद का नाम" } else { "Product Name" }),
                FieldSpec::new("subtitle", "Subtitle", FieldKind::Input).placeholder(if hindi {
                    "संक्षिप्त विवरण"
                } else {
                    "Short Tagline"
                }),
                FieldSpec::new("description", "Description", FieldKind::Textarea)
                    .placeholder("Detailed summary of the product..."),
            ],
        },
        Section {
            title: "Technical Specifications",
            shared: false,
            fields: vec![
                FieldSpec::new("composition", "Chemical Composition", FieldKind::Table).columns(
                    if hindi { "घटक (e.g. Nitrogen)" } else { "Ingredient" },
                    "Value (e.g. 10%)",
                ),
            ],
        },
        Section {
            title: "Application & Benefits",
            shared: false,
            fields: vec![
                FieldSpec::new("usage.timing", "Timing (When to apply)", FieldKind::Input)
                    .placeholder("e.g. Early morning"),
                FieldSpec::new("usage.general", "General Dose", FieldKind::Input)
                    .placeholder("e.g. 5ml per liter"),
                FieldSpec::new("usage.methods", "Application Methods", FieldKind::List)
                    .placeholder("e.g. Foliar Spray"),
                FieldSpec::new("crop_recommendations", "Crop Recommendations", FieldKind::Table)
                    .columns("Crop (e.g. Wheat)", "Dose (e.g. 50kg/acre)"),
                FieldSpec::new("benefits", "Key Benefits", FieldKind::List)
                    .placeholder("e.g. Increases yield"),
            ],
        },
        Section {
            title: "Safety & Storage",
            shared: false,
            fields: vec![
                FieldSpec::new("storage", "Storage Info", FieldKind::Input)
                    .placeholder("e.g. Keep in cool dry place"),
                FieldSpec::new("safety", "Safety Precautions", FieldKind::Input)
                    .placeholder("e.g. Wear gloves"),
            ],
        },
    ]
}

/**
 * editing_notice
 * Banner naming the language being edited.
 */
pub fn editing_notice(lang: Language) -> String {
    format!(
        "You are currently editing {} content. Switch tabs to translate the information manually.",
        lang.display_name()
    )
}

fn html_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/**
 * login_page
 * Login entry point the auth gate redirects to.
 */
pub fn login_page(email: &str, error: Option<&str>) -> String {
    let error_html = error
        .map(|msg| format!(r#"<p class="error">{}</p>"#, html_escape(msg)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Admin Login</title></head>
<body>
<h2>Admin Login</h2>
{error_html}
<form method="post" action="/login">
<label>Email <input type="email" name="email" value="{email}" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Sign In</button>
</form>
</body>
</html>
"#,
        error_html = error_html,
        email = html_escape(email),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(sections: &[Section], name: &str) -> FieldSpec {
        sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .find(|f| f.name == name)
            .cloned()
            .unwrap()
    }

    #[test]
    fn title_is_required_only_in_english() {
        assert!(field(&form_sections(Language::En), "title").required);
        assert!(!field(&form_sections(Language::Hi), "title").required);
        assert!(field(&form_sections(Language::Hi), "pack_sizes").required);
    }

    #[test]
    fn hindi_tab_uses_hindi_placeholders() {
        let sections = form_sections(Language::Hi);
        assert_eq!(field(&sections, "title").placeholder, Some("उत्पाद का नाम"));
        assert_eq!(
            field(&sections, "composition").key_label,
            Some("घटक (e.g. Nitrogen)")
        );
    }

    #[test]
    fn only_global_section_is_shared() {
        let sections = form_sections(Language::En);
        assert_eq!(sections.len(), 5);
        assert_eq!(sections.iter().filter(|s| s.shared).count(), 1);
    }

    #[test]
    fn login_page_escapes_user_input() {
        let page = login_page("\"><script>", Some("Invalid email or password"));
        assert!(page.contains("&quot;&gt;&lt;script&gt;"));
        assert!(page.contains("Invalid email or password"));
        assert!(!page.contains("<script>"));
    }
}
