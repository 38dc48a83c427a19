//! Editable state of one product while the admin works on it.
//!
//! A `ProductForm` is opened empty (create) or from an existing `Product`
//! (edit). It keeps one `LocalizedDraft` per supported language plus the
//! fields shared by all languages, and turns itself back into the payload the
//! catalog API expects on submit.

use crate::builders::{KeyValueBuilder, ListBuilder};
use crate::error::{ConsoleError, ValidationError, ValidationField};
use crate::models::{Language, LocalizedContent, Product, UsageInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FormMode {
    Create,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TextField {
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "subtitle")]
    Subtitle,
    #[serde(rename = "description")]
    Description,
    #[serde(rename = "storage")]
    Storage,
    #[serde(rename = "safety")]
    Safety,
    #[serde(rename = "usage.timing")]
    UsageTiming,
    #[serde(rename = "usage.general")]
    UsageGeneral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ListField {
    /// Shared across languages.
    #[serde(rename = "pack_sizes")]
    PackSizes,
    #[serde(rename = "benefits")]
    Benefits,
    #[serde(rename = "usage.methods")]
    UsageMethods,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TableField {
    #[serde(rename = "composition")]
    Composition,
    #[serde(rename = "crop_recommendations")]
    CropRecommendations,
}

/// A single edit to one field of the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldEdit {
    SetText { field: TextField, value: String },
    AddItem { list: ListField },
    SetItem { list: ListField, index: usize, value: String },
    RemoveItem { list: ListField, index: usize },
    AddRow { table: TableField },
    SetKey { table: TableField, index: usize, value: String },
    SetValue { table: TableField, index: usize, value: String },
    RemoveRow { table: TableField, index: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageDraft {
    pub timing: String,
    pub general: String,
    pub methods: ListBuilder,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalizedDraft {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub storage: String,
    pub safety: String,
    pub benefits: ListBuilder,
    pub composition: KeyValueBuilder,
    pub crop_recommendations: KeyValueBuilder,
    pub usage: UsageDraft,
}

impl LocalizedDraft {
    pub fn from_content(content: &LocalizedContent) -> Self {
        Self {
            title: content.title.clone(),
            subtitle: content.subtitle.clone(),
            description: content.description.clone(),
            storage: content.storage.clone(),
            safety: content.safety.clone(),
            benefits: ListBuilder::from_items(content.benefits.iter().cloned()),
            composition: KeyValueBuilder::from_map(&content.composition),
            crop_recommendations: KeyValueBuilder::from_map(&content.crop_recommendations),
            usage: UsageDraft {
                timing: content.usage_info.timing.clone(),
                general: content.usage_info.general.clone(),
                methods: ListBuilder::from_items(content.usage_info.method.iter().cloned()),
            },
        }
    }

    pub fn to_content(&self) -> LocalizedContent {
        LocalizedContent {
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            description: self.description.clone(),
            storage: self.storage.clone(),
            safety: self.safety.clone(),
            benefits: self.benefits.non_blank(),
            composition: self.composition.fold(),
            crop_recommendations: self.crop_recommendations.fold(),
            usage_info: UsageInfo {
                timing: self.usage.timing.clone(),
                general: self.usage.general.clone(),
                method: self.usage.methods.non_blank(),
            },
        }
    }

    fn text_mut(&mut self, field: TextField) -> &mut String {
        match field {
            TextField::Title => &mut self.title,
            TextField::Subtitle => &mut self.subtitle,
            TextField::Description => &mut self.description,
            TextField::Storage => &mut self.storage,
            TextField::Safety => &mut self.safety,
            TextField::UsageTiming => &mut self.usage.timing,
            TextField::UsageGeneral => &mut self.usage.general,
        }
    }

    fn table_mut(&mut self, field: TableField) -> &mut KeyValueBuilder {
        match field {
            TableField::Composition => &mut self.composition,
            TableField::CropRecommendations => &mut self.crop_recommendations,
        }
    }
}

/// Image picked for upload but not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Changes on every attach so clients never show a stale preview.
    pub preview_token: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePart {
    Upload(PendingImage),
    /// Editing without a new image: the current URL is sent back unchanged.
    Existing(String),
    None,
}

/// Everything a create or update request carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPayload {
    pub pack_sizes: Vec<String>,
    pub image: ImagePart,
    pub translations: BTreeMap<Language, LocalizedContent>,
}

impl ProductPayload {
    /// Text parts of the multipart body, structured values JSON-encoded.
    pub fn text_fields(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        let mut fields = Vec::with_capacity(3);
        if let ImagePart::Existing(url) = &self.image {
            fields.push(("existing_image_url", url.clone()));
        }
        fields.push(("pack_sizes", serde_json::to_string(&self.pack_sizes)?));
        fields.push(("translations", serde_json::to_string(&self.translations)?));
        Ok(fields)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductForm {
    product_id: Option<String>,
    existing_image_url: Option<String>,
    active_language: Language,
    pack_sizes: ListBuilder,
    image: Option<PendingImage>,
    drafts: BTreeMap<Language, LocalizedDraft>,
    saving: bool,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductForm {
    pub fn new() -> Self {
        Self {
            product_id: None,
            existing_image_url: None,
            active_language: Language::En,
            pack_sizes: ListBuilder::new(),
            image: None,
            drafts: Language::ALL
                .into_iter()
                .map(|lang| (lang, LocalizedDraft::default()))
                .collect(),
            saving: false,
        }
    }

    pub fn load(product: Option<&Product>) -> Self {
        let Some(product) = product else {
            return Self::new();
        };

        let drafts = Language::ALL
            .into_iter()
            .map(|lang| {
                let draft = product
                    .translation(lang)
                    .map(LocalizedDraft::from_content)
                    .unwrap_or_default();
                (lang, draft)
            })
            .collect();

        Self {
            product_id: Some(product.id.clone()),
            existing_image_url: product.image_url.clone(),
            active_language: Language::En,
            pack_sizes: ListBuilder::from_items(product.pack_sizes.iter().cloned()),
            image: None,
            drafts,
            saving: false,
        }
    }

    pub fn mode(&self) -> FormMode {
        if self.product_id.is_some() {
            FormMode::Edit
        } else {
            FormMode::Create
        }
    }

    pub fn product_id(&self) -> Option<&str> {
        self.product_id.as_deref()
    }

    pub fn existing_image_url(&self) -> Option<&str> {
        self.existing_image_url.as_deref()
    }

    pub fn active_language(&self) -> Language {
        self.active_language
    }

    pub fn switch_language(&mut self, lang: Language) {
        self.active_language = lang;
    }

    pub fn pack_sizes(&self) -> &ListBuilder {
        &self.pack_sizes
    }

    pub fn pending_image(&self) -> Option<&PendingImage> {
        self.image.as_ref()
    }

    pub fn draft(&self, lang: Language) -> &LocalizedDraft {
        // Every language gets a draft in `new` and `load`.
        &self.drafts[&lang]
    }

    fn draft_mut(&mut self, lang: Language) -> &mut LocalizedDraft {
        self.drafts.entry(lang).or_default()
    }

    fn list_mut(&mut self, lang: Language, field: ListField) -> &mut ListBuilder {
        match field {
            ListField::PackSizes => &mut self.pack_sizes,
            ListField::Benefits => &mut self.draft_mut(lang).benefits,
            ListField::UsageMethods => &mut self.draft_mut(lang).usage.methods,
        }
    }

    /// Applies one edit to `lang`'s draft. Other languages are never touched;
    /// pack size edits go to the shared list whatever `lang` is.
    pub fn apply(&mut self, lang: Language, edit: FieldEdit) -> Result<(), ConsoleError> {
        match edit {
            FieldEdit::SetText { field, value } => {
                *self.draft_mut(lang).text_mut(field) = value;
            }
            FieldEdit::AddItem { list } => self.list_mut(lang, list).add_row(),
            FieldEdit::SetItem { list, index, value } => {
                self.list_mut(lang, list).set(index, value)?
            }
            FieldEdit::RemoveItem { list, index } => {
                self.list_mut(lang, list).remove(index)?;
            }
            FieldEdit::AddRow { table } => self.draft_mut(lang).table_mut(table).add_row(),
            FieldEdit::SetKey {
                table,
                index,
                value,
            } => self.draft_mut(lang).table_mut(table).set_key(index, value)?,
            FieldEdit::SetValue {
                table,
                index,
                value,
            } => self
                .draft_mut(lang)
                .table_mut(table)
                .set_value(index, value)?,
            FieldEdit::RemoveRow { table, index } => {
                self.draft_mut(lang).table_mut(table).remove(index)?;
            }
        }
        Ok(())
    }

    /// Replaces the pending image; the previous bytes and preview go with it.
    pub fn attach_image(
        &mut self,
        file_name: impl Into<String>,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ConsoleError> {
        let content_type = content_type.trim().to_ascii_lowercase();
        if !content_type.starts_with("image/") {
            return Err(ConsoleError::UnsupportedImage(content_type));
        }

        self.image = Some(PendingImage {
            file_name: file_name.into(),
            content_type,
            bytes,
            preview_token: Uuid::new_v4(),
        });
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pack_sizes.trimmed().is_empty() {
            return Err(ValidationError::new(ValidationField::PackSizes));
        }
        if self.draft(Language::En).title.trim().is_empty() {
            return Err(ValidationError::new(ValidationField::EnglishTitle));
        }
        Ok(())
    }

    pub fn serialize(&self) -> ProductPayload {
        let image = match (&self.image, self.mode(), &self.existing_image_url) {
            (Some(pending), _, _) => ImagePart::Upload(pending.clone()),
            (None, FormMode::Edit, Some(url)) => ImagePart::Existing(url.clone()),
            _ => ImagePart::None,
        };

        ProductPayload {
            pack_sizes: self.pack_sizes.trimmed(),
            image,
            translations: Language::ALL
                .into_iter()
                .map(|lang| (lang, self.draft(lang).to_content()))
                .collect(),
        }
    }

    /// Validates and serializes. A missing English title switches the form
    /// back to English so the field is in view.
    pub fn prepare_submission(&mut self) -> Result<ProductPayload, ValidationError> {
        if let Err(err) = self.validate() {
            if err.field == ValidationField::EnglishTitle {
                self.active_language = Language::En;
            }
            return Err(err);
        }
        Ok(self.serialize())
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Prepares the submission and marks the form as saving until
    /// `end_save`. Refused while an earlier save is still running.
    pub fn begin_save(&mut self) -> Result<ProductPayload, ConsoleError> {
        if self.saving {
            return Err(ConsoleError::SaveInProgress);
        }
        let payload = self.prepare_submission()?;
        self.saving = true;
        Ok(payload)
    }

    pub fn end_save(&mut self) {
        self.saving = false;
    }
}
