use crate::api::ApiClient;
use crate::builders::ListBuilder;
use crate::error::ConsoleError;
use crate::form::{FieldEdit, FormMode, LocalizedDraft, ProductForm};
use crate::layout::{editing_notice, form_sections, Section};
use crate::listing::ListView;
use crate::models::{Language, ProductListing};
use crate::session::{Session, SessionStore};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// What the admin sees of an open form: the active language's draft plus
/// the shared fields and the field layout for that language.
#[derive(Debug, Clone, Serialize)]
pub struct FormView {
    pub form_id: Uuid,
    pub mode: FormMode,
    pub product_id: Option<String>,
    pub active_language: Language,
    pub notice: String,
    pub pack_sizes: ListBuilder,
    pub preview_url: Option<String>,
    pub saving: bool,
    pub content: LocalizedDraft,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewSource {
    Pending { content_type: String, bytes: Vec<u8> },
    Remote(String),
}

struct OpenForm {
    owner: Uuid,
    form: ProductForm,
}

/// Console state shared by all workers: signed-in sessions, the product list
/// and every open form. A form belongs to the session that opened it. Locks
/// are released before any remote call.
pub struct Console {
    sessions: SessionStore,
    api: ApiClient,
    list: RwLock<ListView>,
    forms: RwLock<HashMap<Uuid, OpenForm>>,
}

impl Console {
    pub fn new(sessions: SessionStore, api: ApiClient) -> Self {
        Self {
            sessions,
            api,
            list: RwLock::new(ListView::new()),
            forms: RwLock::new(HashMap::new()),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn list_read(&self) -> RwLockReadGuard<'_, ListView> {
        self.list.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn list_write(&self) -> RwLockWriteGuard<'_, ListView> {
        self.list.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn forms_read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, OpenForm>> {
        self.forms.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn forms_write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, OpenForm>> {
        self.forms.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Signs in against the catalog API and starts a new session holding the
    /// returned token.
    pub async fn login(&self, email: &str, password: &str) -> Result<Arc<Session>, ConsoleError> {
        let token = self.api.login(email, password).await?;
        let session = Arc::new(Session::new());
        session.set_token(token);
        self.sessions.insert(session.clone());
        log::info!("Admin {} signed in (session {})", email, session.id());
        Ok(session)
    }

    /// Ends `session` and drops every form it had open.
    pub fn logout(&self, session: &Session) {
        self.sessions.remove(session.id());
        session.clear();
        let dropped = {
            let mut forms = self.forms_write();
            let before = forms.len();
            forms.retain(|_, open| open.owner != session.id());
            before - forms.len()
        };
        log::info!(
            "Session {} signed out, discarded {} open form(s)",
            session.id(),
            dropped
        );
    }

    /// Fetches the full collection and replaces the local list with it.
    pub async fn reload(&self, session: &Session) -> Result<usize, ConsoleError> {
        let products = self.api.list_products(session).await?;
        let count = products.len();
        self.list_write().replace(products);
        log::debug!("Loaded {} products", count);
        Ok(count)
    }

    pub async fn products(
        &self,
        session: &Session,
        lang: Language,
        search: &str,
        refresh: bool,
    ) -> Result<ProductListing, ConsoleError> {
        let loaded = self.list_read().is_loaded();
        if refresh || !loaded {
            self.reload(session).await?;
        }

        let list = self.list_read();
        let products = list.cards(lang, search);
        Ok(ProductListing {
            language: lang,
            search: search.trim().to_string(),
            total: list.products().len(),
            products,
        })
    }

    /// Deletes on the server first; the local entry goes only once the API
    /// has acknowledged.
    pub async fn delete_product(
        &self,
        session: &Session,
        id: &str,
        confirmed: bool,
    ) -> Result<(), ConsoleError> {
        if !confirmed {
            return Err(ConsoleError::ConfirmationRequired);
        }

        self.api.delete_product(session, id).await?;
        self.list_write().remove(id);
        log::info!("Deleted product {}", id);
        Ok(())
    }

    pub fn open_form(
        &self,
        session: &Session,
        product_id: Option<&str>,
    ) -> Result<Uuid, ConsoleError> {
        let form = match product_id {
            Some(id) => {
                let list = self.list_read();
                let product = list
                    .find(id)
                    .ok_or_else(|| ConsoleError::ProductNotFound(id.to_string()))?;
                ProductForm::load(Some(product))
            }
            None => ProductForm::new(),
        };

        let form_id = Uuid::new_v4();
        self.forms_write().insert(
            form_id,
            OpenForm {
                owner: session.id(),
                form,
            },
        );
        log::debug!("Opened form {} for {:?}", form_id, product_id);
        Ok(form_id)
    }

    fn with_form<T>(
        &self,
        session: &Session,
        form_id: Uuid,
        f: impl FnOnce(&mut ProductForm) -> Result<T, ConsoleError>,
    ) -> Result<T, ConsoleError> {
        let mut forms = self.forms_write();
        match forms.get_mut(&form_id) {
            Some(open) if open.owner == session.id() => f(&mut open.form),
            _ => Err(ConsoleError::FormNotFound(form_id)),
        }
    }

    fn view_of(form_id: Uuid, form: &ProductForm) -> FormView {
        let lang = form.active_language();
        let preview_url = match form.pending_image() {
            Some(image) => Some(format!(
                "/api/forms/{}/preview?v={}",
                form_id, image.preview_token
            )),
            None => form.existing_image_url().map(str::to_string),
        };

        FormView {
            form_id,
            mode: form.mode(),
            product_id: form.product_id().map(str::to_string),
            active_language: lang,
            notice: editing_notice(lang),
            pack_sizes: form.pack_sizes().clone(),
            preview_url,
            saving: form.is_saving(),
            content: form.draft(lang).clone(),
            sections: form_sections(lang),
        }
    }

    pub fn form_view(&self, session: &Session, form_id: Uuid) -> Result<FormView, ConsoleError> {
        self.with_form(session, form_id, |form| Ok(Self::view_of(form_id, form)))
    }

    /// Applies `edit` to `lang`, or to the form's active language.
    pub fn edit_form(
        &self,
        session: &Session,
        form_id: Uuid,
        lang: Option<Language>,
        edit: FieldEdit,
    ) -> Result<FormView, ConsoleError> {
        self.with_form(session, form_id, |form| {
            let lang = lang.unwrap_or_else(|| form.active_language());
            form.apply(lang, edit)?;
            Ok(Self::view_of(form_id, form))
        })
    }

    pub fn switch_form_language(
        &self,
        session: &Session,
        form_id: Uuid,
        lang: Language,
    ) -> Result<FormView, ConsoleError> {
        self.with_form(session, form_id, |form| {
            form.switch_language(lang);
            log::debug!("Form {} now editing {}", form_id, lang);
            Ok(Self::view_of(form_id, form))
        })
    }

    pub fn attach_image(
        &self,
        session: &Session,
        form_id: Uuid,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<FormView, ConsoleError> {
        self.with_form(session, form_id, |form| {
            form.attach_image(file_name, content_type, bytes)?;
            Ok(Self::view_of(form_id, form))
        })
    }

    pub fn preview(
        &self,
        session: &Session,
        form_id: Uuid,
    ) -> Result<Option<PreviewSource>, ConsoleError> {
        self.with_form(session, form_id, |form| {
            Ok(match form.pending_image() {
                Some(image) => Some(PreviewSource::Pending {
                    content_type: image.content_type.clone(),
                    bytes: image.bytes.clone(),
                }),
                None => form
                    .existing_image_url()
                    .map(|url| PreviewSource::Remote(url.to_string())),
            })
        })
    }

    /// Discards the form and its pending image.
    pub fn close_form(&self, session: &Session, form_id: Uuid) -> bool {
        let mut forms = self.forms_write();
        match forms.get(&form_id) {
            Some(open) if open.owner == session.id() => forms.remove(&form_id).is_some(),
            _ => false,
        }
    }

    /// Validates, sends the form as a create or update, and on success
    /// discards it and reloads the list. On failure the form stays open with
    /// its edits. A form is sent at most once at a time.
    pub async fn submit_form(
        &self,
        session: &Session,
        form_id: Uuid,
    ) -> Result<FormMode, ConsoleError> {
        let (payload, product_id) = self.with_form(session, form_id, |form| {
            let payload = form.begin_save()?;
            Ok((payload, form.product_id().map(str::to_string)))
        })?;

        let (mode, result) = match &product_id {
            Some(id) => (
                FormMode::Edit,
                self.api.update_product(session, id, payload).await,
            ),
            None => (FormMode::Create, self.api.create_product(session, payload).await),
        };
        if let Err(e) = result {
            log::error!("Saving form {} failed: {:#}", form_id, e);
            // The form may have been closed meanwhile.
            let _ = self.with_form(session, form_id, |form| {
                form.end_save();
                Ok(())
            });
            return Err(e.into());
        }

        self.close_form(session, form_id);
        log::info!("Saved form {} ({:?} {:?})", form_id, mode, product_id);

        if let Err(e) = self.reload(session).await {
            log::warn!("Reloading products after save failed: {}", e);
        }
        Ok(mode)
    }
}
