use crate::form::{ImagePart, ProductPayload};
use crate::models::{LoginRequest, LoginResponse, Product, ProductsEnvelope};
use crate::session::Session;
use anyhow::Result;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use std::env;

pub const DEFAULT_API_URL: &str = "https://swastik.tnbpos.in/api";

/// Client for the remote catalog API. Calls made for an admin carry that
/// admin's session credential as a bearer token when one is stored.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

/**
 * ensure_success
 * Passes 2xx responses through; anything else becomes an error carrying the
 * status and response body.
 */
async fn ensure_success(response: Response, action: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(anyhow::anyhow!(
        "Failed to {}: {}. Body: {}",
        action,
        status,
        body
    ))
}

/**
 * multipart_form
 * Text parts for the structured fields, plus the binary `image` part when a
 * new image was picked.
 */
fn multipart_form(payload: ProductPayload) -> Result<Form> {
    let mut form = Form::new();
    for (name, value) in payload.text_fields()? {
        form = form.text(name, value);
    }
    if let ImagePart::Upload(image) = payload.image {
        let part = Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.content_type)?;
        form = form.part("image", part);
    }
    Ok(form)
}

/**
 * decode_products
 * Decodes list entries one by one; an entry that cannot be read is logged and
 * skipped so the rest of the catalog still shows.
 */
fn decode_products(entries: Vec<serde_json::Value>) -> Vec<Product> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<Product>(entry) {
            Ok(product) => Some(product),
            Err(e) => {
                log::warn!("Skipping unreadable catalog entry #{}: {}", index, e);
                None
            }
        })
        .collect()
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let base_url = env::var("CATALOG_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        log::info!("Using catalog API at {}", base_url);
        Self::new(&base_url)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn product_url(&self, id: &str) -> String {
        self.url(&format!("/products/{}", urlencoding::encode(id)))
    }

    fn authorize(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        match session.get_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Exchanges admin credentials for a session token. The token is returned,
    /// not stored.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response, "sign in").await?;

        let login: LoginResponse = response.json().await?;
        login
            .token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("Login response did not contain a token"))
    }

    pub async fn list_products(&self, session: &Session) -> Result<Vec<Product>> {
        let response = self
            .authorize(self.client.get(self.url("/products")), session)
            .header("Accept", "application/json")
            .send()
            .await?;
        let response = ensure_success(response, "fetch products").await?;

        let envelope: ProductsEnvelope = response.json().await?;
        Ok(decode_products(envelope.list.unwrap_or_default()))
    }

    pub async fn create_product(&self, session: &Session, payload: ProductPayload) -> Result<()> {
        let response = self
            .authorize(self.client.post(self.url("/products")), session)
            .multipart(multipart_form(payload)?)
            .send()
            .await?;
        ensure_success(response, "create product").await?;
        Ok(())
    }

    pub async fn update_product(
        &self,
        session: &Session,
        id: &str,
        payload: ProductPayload,
    ) -> Result<()> {
        let response = self
            .authorize(self.client.put(self.product_url(id)), session)
            .multipart(multipart_form(payload)?)
            .send()
            .await?;
        ensure_success(response, &format!("update product {}", id)).await?;
        Ok(())
    }

    pub async fn delete_product(&self, session: &Session, id: &str) -> Result<()> {
        let response = self
            .authorize(self.client.delete(self.product_url(id)), session)
            .send()
            .await?;
        ensure_success(response, &format!("delete product {}", id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FieldEdit, ListField, ProductForm, TextField};
    use crate::models::Language;
    use crate::testing::{spawn_catalog, FakeCatalog, FAKE_TOKEN};
    use serde_json::json;
    use std::sync::Arc;

    fn signed_in() -> Session {
        let session = Session::new();
        session.set_token(FAKE_TOKEN);
        session
    }

    fn payload() -> ProductPayload {
        let mut form = ProductForm::new();
        form.apply(Language::En, FieldEdit::AddItem { list: ListField::PackSizes })
            .unwrap();
        form.apply(
            Language::En,
            FieldEdit::SetItem {
                list: ListField::PackSizes,
                index: 0,
                value: "1kg".into(),
            },
        )
        .unwrap();
        form.apply(
            Language::En,
            FieldEdit::SetText {
                field: TextField::Title,
                value: "Potash".into(),
            },
        )
        .unwrap();
        form.attach_image("potash.png", "image/png", b"PNGDATA".to_vec())
            .unwrap();
        form.serialize()
    }

    #[actix_web::test]
    async fn login_returns_token_without_storing_it() {
        let fake = Arc::new(FakeCatalog::default());
        let api = ApiClient::new(&spawn_catalog(fake.clone()).await.unwrap()).unwrap();

        let token = api.login("admin@example.com", "secret").await.unwrap();
        assert_eq!(token, FAKE_TOKEN);
        assert_eq!(fake.last_request().unwrap().authorization, None);

        assert!(api.login("admin@example.com", "wrong").await.is_err());
    }

    #[actix_web::test]
    async fn requests_carry_the_callers_token() {
        let fake = Arc::new(FakeCatalog::with_products(vec![json!({ "id": 1, "title": "Legacy" })]));
        let api = ApiClient::new(&spawn_catalog(fake.clone()).await.unwrap()).unwrap();

        api.list_products(&Session::new()).await.unwrap();
        let products = api.list_products(&signed_in()).await.unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "1");
        let requests = fake.requests();
        assert_eq!(requests[0].authorization, None);
        assert_eq!(
            requests[1].authorization.as_deref(),
            Some("Bearer tok-123")
        );
    }

    #[actix_web::test]
    async fn missing_list_reads_as_empty() {
        let fake = Arc::new(FakeCatalog::default());
        fake.omit_list();
        let api = ApiClient::new(&spawn_catalog(fake).await.unwrap()).unwrap();

        assert!(api.list_products(&signed_in()).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn odd_entries_do_not_break_the_list() {
        let fake = Arc::new(FakeCatalog::with_products(vec![
            json!({ "id": 1, "title": "Good" }),
            json!({ "id": 2, "title": "Dawn Spray", "usage_info": "Spray at dawn" }),
            json!({ "id": 3, "title": "Mixed", "pack_sizes": ["1kg", 5] }),
            json!({ "title": "No id" }),
            json!("not a product"),
        ]));
        let api = ApiClient::new(&spawn_catalog(fake).await.unwrap()).unwrap();

        let products = api.list_products(&signed_in()).await.unwrap();
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        let dawn = products[1].translation(Language::En).unwrap();
        assert_eq!(dawn.title, "Dawn Spray");
        assert!(dawn.usage_info.method.is_empty());
        assert_eq!(products[2].pack_sizes, vec!["1kg", "5"]);
    }

    #[actix_web::test]
    async fn create_sends_multipart_parts() {
        let fake = Arc::new(FakeCatalog::default());
        let api = ApiClient::new(&spawn_catalog(fake.clone()).await.unwrap()).unwrap();

        api.create_product(&signed_in(), payload()).await.unwrap();

        let request = fake.last_request().unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/api/products");
        assert!(request
            .content_type
            .as_deref()
            .unwrap_or_default()
            .starts_with("multipart/form-data"));
        let body = String::from_utf8_lossy(&request.body);
        assert!(body.contains("name=\"pack_sizes\""));
        assert!(body.contains(r#"["1kg"]"#));
        assert!(body.contains("name=\"translations\""));
        assert!(body.contains("filename=\"potash.png\""));
        assert!(body.contains("PNGDATA"));
        assert!(!body.contains("existing_image_url"));
    }

    #[actix_web::test]
    async fn update_and_delete_address_the_product_id() {
        let fake = Arc::new(FakeCatalog::with_products(vec![json!({ "id": "a b", "title": "X" })]));
        let api = ApiClient::new(&spawn_catalog(fake.clone()).await.unwrap()).unwrap();
        let session = signed_in();

        api.update_product(&session, "a b", payload()).await.unwrap();
        assert_eq!(fake.last_request().unwrap().path, "/api/products/a%20b");

        api.delete_product(&session, "a b").await.unwrap();
        let request = fake.last_request().unwrap();
        assert_eq!(request.method, "DELETE");
        assert_eq!(request.path, "/api/products/a%20b");
    }

    #[actix_web::test]
    async fn server_errors_surface_as_failures() {
        let fake = Arc::new(FakeCatalog::default());
        fake.fail_writes();
        let api = ApiClient::new(&spawn_catalog(fake).await.unwrap()).unwrap();
        let session = signed_in();

        let err = api.delete_product(&session, "missing").await.unwrap_err();
        assert!(err.to_string().contains("500"));
        assert!(api.create_product(&session, payload()).await.is_err());
    }
}
