use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Languages the catalog carries content for. Adding a language means adding
/// a variant here and to `ALL`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Hi];

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "Hindi",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Ordered string mapping as the catalog API sends it (`composition`,
/// `crop_recommendations`). Keys are unique; re-inserting a key replaces its
/// value but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValueMap(Vec<(String, String)>);

impl KeyValueMap {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeyValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for KeyValueMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for KeyValueMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyValueVisitor;

        impl<'de> Visitor<'de> for KeyValueVisitor {
            type Value = KeyValueMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of string values or null")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(KeyValueMap::new())
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(KeyValueMap::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = KeyValueMap::new();
                while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
                    map.insert(key, value_text(value));
                }
                Ok(map)
            }
        }

        deserializer.deserialize_any(KeyValueVisitor)
    }
}

/**
 * value_text
 * Reads any JSON scalar as text; null is empty.
 */
fn value_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/**
 * value_list
 * Reads an array of scalars as text entries, dropping nulls. Anything that
 * is not an array reads as an empty list.
 */
fn value_list(value: serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter(|item| !item.is_null())
            .map(value_text)
            .collect(),
        _ => Vec::new(),
    }
}

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    serde_json::Value::deserialize(deserializer).map(value_text)
}

fn text_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    serde_json::Value::deserialize(deserializer).map(value_list)
}

/**
 * opaque_id
 * Product ids arrive as strings or numbers and are kept as text.
 */
fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "product id must be a string or number, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct UsageInfo {
    pub timing: String,
    pub general: String,
    pub method: Vec<String>,
}

impl<'de> Deserialize<'de> for UsageInfo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Older records store the application methods as a bare array; any
        // other non-object shape carries no usage details.
        Ok(match serde_json::Value::deserialize(deserializer)? {
            methods @ serde_json::Value::Array(_) => UsageInfo {
                method: value_list(methods),
                ..UsageInfo::default()
            },
            serde_json::Value::Object(mut fields) => {
                let method = fields
                    .remove("method")
                    .or_else(|| fields.remove("methods"))
                    .map(value_list)
                    .unwrap_or_default();
                UsageInfo {
                    timing: fields.remove("timing").map(value_text).unwrap_or_default(),
                    general: fields.remove("general").map(value_text).unwrap_or_default(),
                    method,
                }
            }
            _ => UsageInfo::default(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LocalizedContent {
    #[serde(default, deserialize_with = "text")]
    pub title: String,
    #[serde(default, deserialize_with = "text")]
    pub subtitle: String,
    #[serde(default, deserialize_with = "text")]
    pub description: String,
    #[serde(default, deserialize_with = "text")]
    pub storage: String,
    #[serde(default, deserialize_with = "text")]
    pub safety: String,
    #[serde(default, deserialize_with = "text_list")]
    pub benefits: Vec<String>,
    #[serde(default)]
    #[schema(value_type = HashMap<String, String>)]
    pub composition: KeyValueMap,
    #[serde(default)]
    #[schema(value_type = HashMap<String, String>)]
    pub crop_recommendations: KeyValueMap,
    #[serde(default)]
    pub usage_info: UsageInfo,
}

pub static EMPTY_CONTENT: LocalizedContent = LocalizedContent {
    title: String::new(),
    subtitle: String::new(),
    description: String::new(),
    storage: String::new(),
    safety: String::new(),
    benefits: Vec::new(),
    composition: KeyValueMap::new(),
    crop_recommendations: KeyValueMap::new(),
    usage_info: UsageInfo {
        timing: String::new(),
        general: String::new(),
        method: Vec::new(),
    },
};

/// Catalog product in its canonical in-memory shape.
///
/// Whatever shape the API returned, `translations` always holds an `en`
/// entry after deserialization: either the nested English translation or,
/// for records written before translations existed, the fields stored at the
/// product root. Other languages are present only when the API sent them.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Product {
    pub id: String,
    pub image_url: Option<String>,
    pub pack_sizes: Vec<String>,
    pub translations: BTreeMap<Language, LocalizedContent>,
}

impl Product {
    pub fn translation(&self, lang: Language) -> Option<&LocalizedContent> {
        self.translations.get(&lang)
    }

    pub fn has_translation(&self, lang: Language) -> bool {
        self.translations.contains_key(&lang)
    }
}

#[derive(Deserialize)]
struct RawProduct {
    #[serde(deserialize_with = "opaque_id")]
    id: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default, deserialize_with = "text_list")]
    pack_sizes: Vec<String>,
    #[serde(default)]
    translations: Option<HashMap<String, Option<LocalizedContent>>>,
    #[serde(flatten)]
    root: LocalizedContent,
}

impl From<RawProduct> for Product {
    fn from(raw: RawProduct) -> Self {
        let mut translations = BTreeMap::new();
        for (code, content) in raw.translations.into_iter().flatten() {
            match (Language::from_code(&code), content) {
                (Some(lang), Some(content)) => {
                    translations.insert(lang, content);
                }
                (None, _) => log::debug!("Ignoring translation for unsupported language {}", code),
                _ => {}
            }
        }
        translations.entry(Language::En).or_insert(raw.root);

        Product {
            id: raw.id,
            image_url: raw.image_url.filter(|url| !url.trim().is_empty()),
            pack_sizes: raw.pack_sizes,
            translations,
        }
    }
}

impl<'de> Deserialize<'de> for Product {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawProduct::deserialize(deserializer).map(Product::from)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductsEnvelope {
    #[serde(default)]
    pub list: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct ApiError {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }

    pub fn error(message: String, error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            error: Some(error),
        }
    }
}

/// One entry of the product list as displayed in the selected language.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProductCard {
    pub id: String,
    pub image_url: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub pack_size_count: usize,
    pub missing_translation: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductListing {
    pub language: Language,
    pub search: String,
    pub total: usize,
    pub products: Vec<ProductCard>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ProductQuery {
    pub lang: Option<Language>,
    pub q: Option<String>,
    pub refresh: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DeleteQuery {
    pub confirm: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OpenFormRequest {
    pub product_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OpenFormResponse {
    pub form_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SwitchLanguageRequest {
    pub language: Language,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ImageQuery {
    pub file_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_root_fields_become_the_english_translation() {
        let product: Product = serde_json::from_value(json!({
            "id": 7,
            "title": "Foo",
            "usage_info": ["Spray", "Drip"],
            "pack_sizes": ["1kg"]
        }))
        .unwrap();

        assert_eq!(product.id, "7");
        let en = product.translation(Language::En).unwrap();
        assert_eq!(en.title, "Foo");
        assert_eq!(en.usage_info.method, vec!["Spray", "Drip"]);
        assert!(!product.has_translation(Language::Hi));
    }

    #[test]
    fn nested_translations_take_priority_over_root_fields() {
        let product: Product = serde_json::from_value(json!({
            "id": "p1",
            "title": "Root title",
            "translations": {
                "en": { "title": "Nested title" },
                "hi": { "title": "हिंदी", "usage_info": { "timing": "सुबह", "method": ["छिड़काव"] } },
                "mr": { "title": "ignored" }
            }
        }))
        .unwrap();

        assert_eq!(product.translations.len(), 2);
        assert_eq!(product.translation(Language::En).unwrap().title, "Nested title");
        let hi = product.translation(Language::Hi).unwrap();
        assert_eq!(hi.usage_info.timing, "सुबह");
        assert_eq!(hi.usage_info.method, vec!["छिड़काव"]);
    }

    #[test]
    fn translations_without_english_fall_back_to_root() {
        let product: Product = serde_json::from_value(json!({
            "id": "p2",
            "title": "Root title",
            "translations": { "hi": { "title": "हिंदी" }, "en": null }
        }))
        .unwrap();

        assert_eq!(product.translation(Language::En).unwrap().title, "Root title");
        assert!(product.has_translation(Language::Hi));
    }

    #[test]
    fn nulls_and_missing_fields_read_as_empty() {
        let product: Product = serde_json::from_value(json!({
            "id": "p3",
            "image_url": "",
            "pack_sizes": null,
            "translations": {
                "en": {
                    "title": null,
                    "benefits": null,
                    "composition": null,
                    "usage_info": null
                }
            }
        }))
        .unwrap();

        assert_eq!(product.image_url, None);
        assert!(product.pack_sizes.is_empty());
        assert_eq!(product.translation(Language::En), Some(&EMPTY_CONTENT));
    }

    #[test]
    fn usage_info_accepts_methods_alias() {
        let usage: UsageInfo =
            serde_json::from_value(json!({ "general": "5ml/l", "methods": ["Drip"] })).unwrap();
        assert_eq!(usage.general, "5ml/l");
        assert_eq!(usage.method, vec!["Drip"]);
    }

    #[test]
    fn mappings_keep_document_order_and_stringify_scalars() {
        let content: LocalizedContent = serde_json::from_str(
            r#"{"composition": {"Zinc": "12%", "Boron": 0.5, "Nitrogen": "10%"}}"#,
        )
        .unwrap();

        let keys: Vec<&str> = content.composition.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Zinc", "Boron", "Nitrogen"]);
        assert_eq!(content.composition.iter().nth(1), Some(("Boron", "0.5")));
    }

    #[test]
    fn reinserting_a_key_replaces_value_in_place() {
        let map: KeyValueMap = vec![("N", "10%"), ("P", "5%"), ("N", "20%")]
            .into_iter()
            .collect();

        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"N":"20%","P":"5%"}"#);
    }

    #[test]
    fn canonical_product_serializes_without_root_fields() {
        let product: Product =
            serde_json::from_value(json!({ "id": "p4", "title": "Foo", "pack_sizes": ["1L"] }))
                .unwrap();
        let value = serde_json::to_value(&product).unwrap();

        assert!(value.get("title").is_none());
        assert_eq!(value["translations"]["en"]["title"], "Foo");
        assert_eq!(value["translations"]["en"]["usage_info"]["method"], json!([]));
    }

    #[test]
    fn language_codes_parse_case_insensitively() {
        assert_eq!(Language::from_code("HI"), Some(Language::Hi));
        assert_eq!(Language::from_code(" en "), Some(Language::En));
        assert_eq!(Language::from_code("mr"), None);
    }

    #[test]
    fn odd_field_shapes_read_leniently() {
        let product: Product = serde_json::from_value(json!({
            "id": 12,
            "title": 42,
            "pack_sizes": ["1kg", 5, null],
            "benefits": "not a list",
            "usage_info": "Spray at dawn"
        }))
        .unwrap();

        let en = product.translation(Language::En).unwrap();
        assert_eq!(en.title, "42");
        assert_eq!(product.pack_sizes, vec!["1kg", "5"]);
        assert!(en.benefits.is_empty());
        assert_eq!(en.usage_info, UsageInfo::default());
    }
}
