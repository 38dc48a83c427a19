use actix_web::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// Fields the console checks before a save is sent to the catalog API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationField {
    PackSizes,
    EnglishTitle,
}

impl ValidationField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PackSizes => "pack_sizes",
            Self::EnglishTitle => "en.title",
        }
    }

    pub fn message_key(self) -> &'static str {
        match self {
            Self::PackSizes => "pack_sizes_required",
            Self::EnglishTitle => "english_title_required",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed for {}", .field.as_str())]
pub struct ValidationError {
    pub field: ValidationField,
}

impl ValidationError {
    pub fn new(field: ValidationField) -> Self {
        Self { field }
    }
}

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),

    #[error("row {index} is out of range for a list of {len}")]
    RowOutOfRange { index: usize, len: usize },

    #[error("unsupported image type: {0}")]
    UnsupportedImage(String),

    #[error("form {0} not found")]
    FormNotFound(Uuid),

    #[error("product {0} not found")]
    ProductNotFound(String),

    #[error("delete requires confirmation")]
    ConfirmationRequired,

    #[error("a save of this form is already running")]
    SaveInProgress,
}

impl ConsoleError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::RowOutOfRange { .. } => StatusCode::BAD_REQUEST,
            Self::UnsupportedImage(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::FormNotFound(_) | Self::ProductNotFound(_) => StatusCode::NOT_FOUND,
            Self::ConfirmationRequired | Self::SaveInProgress => StatusCode::CONFLICT,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Transport(_) => "transport_error",
            Self::RowOutOfRange { .. } => "row_out_of_range",
            Self::UnsupportedImage(_) => "unsupported_image",
            Self::FormNotFound(_) => "form_not_found",
            Self::ProductNotFound(_) => "product_not_found",
            Self::ConfirmationRequired => "confirmation_required",
            Self::SaveInProgress => "save_in_progress",
        }
    }

    /// Offending field for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation(e) => Some(e.field.as_str()),
            _ => None,
        }
    }
}
