use crate::console::{Console, PreviewSource};
use crate::error::ConsoleError;
use crate::form::{FieldEdit, FormMode};
use crate::i18n::I18n;
use crate::layout::login_page;
use crate::models::{
    ApiError, ApiResponse, DeleteQuery, ImageQuery, Language, LoginRequest, OpenFormRequest,
    OpenFormResponse, ProductListing, ProductQuery, SwitchLanguageRequest,
};
use crate::session::{self, LOGIN_PATH};
use actix_web::http::header;
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

type ConsoleData = web::Data<Arc<Console>>;

/**
 * get_language_from_request
 * Notification language from the `Accept-Language` header, English by default.
 */
fn get_language_from_request(req: &HttpRequest) -> Language {
    req.headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|h| h.to_str().ok())
        .map(I18n::language_for)
        .unwrap_or(Language::En)
}

/**
 * error_response
 * Maps a console error to the response envelope. `transport_key` names the
 * generic notification shown when the catalog API call itself failed.
 */
fn error_response(
    err: &ConsoleError,
    i18n: &I18n,
    lang: Language,
    transport_key: &str,
) -> HttpResponse {
    let message_key = match err {
        ConsoleError::Validation(e) => e.field.message_key(),
        ConsoleError::Transport(_) => transport_key,
        ConsoleError::ConfirmationRequired => "delete_confirmation_required",
        other => other.code(),
    };
    let detail = match err {
        ConsoleError::Transport(_) => None,
        other => Some(other.to_string()),
    };

    HttpResponse::build(err.status()).json(ApiResponse::<()>::error(
        i18n.get(lang, message_key),
        ApiError {
            code: err.code().to_string(),
            field: err.field().map(str::to_string),
            detail,
        },
    ))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: String,
    pub authenticated: bool,
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthCheckResponse))
)]
#[get("/health")]
pub async fn health_check(req: HttpRequest, console: ConsoleData) -> impl Responder {
    HttpResponse::Ok().json(HealthCheckResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        authenticated: console.sessions().from_request(&req).is_some(),
    })
}

pub async fn show_login(req: HttpRequest, console: ConsoleData) -> impl Responder {
    if console.sessions().from_request(&req).is_some() {
        return HttpResponse::SeeOther()
            .insert_header((header::LOCATION, "/api/products"))
            .finish();
    }
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(login_page("", None))
}

pub async fn submit_login(
    req: HttpRequest,
    form: web::Form<LoginRequest>,
    console: ConsoleData,
    i18n: web::Data<I18n>,
) -> impl Responder {
    let form = form.into_inner();
    match console.login(&form.email, &form.password).await {
        Ok(session) => HttpResponse::SeeOther()
            .cookie(console.sessions().cookie(&session))
            .insert_header((header::LOCATION, "/api/products"))
            .finish(),
        Err(e) => {
            log::warn!("Login for {} failed: {}", form.email, e);
            let lang = get_language_from_request(&req);
            let message = i18n.get(lang, "invalid_credentials");
            HttpResponse::Unauthorized()
                .content_type("text/html; charset=utf-8")
                .body(login_page(&form.email, Some(&message)))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in, session cookie set"),
        (status = 502, description = "Invalid email or password")
    )
)]
pub async fn api_login(
    req: HttpRequest,
    body: web::Json<LoginRequest>,
    console: ConsoleData,
    i18n: web::Data<I18n>,
) -> impl Responder {
    let lang = get_language_from_request(&req);
    match console.login(&body.email, &body.password).await {
        Ok(session) => HttpResponse::Ok()
            .cookie(console.sessions().cookie(&session))
            .json(ApiResponse::success(()).with_message(i18n.get(lang, "signed_in"))),
        Err(e) => {
            log::warn!("Login for {} failed: {}", body.email, e);
            error_response(&e, &i18n, lang, "invalid_credentials")
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Signed out"))
)]
pub async fn api_logout(
    req: HttpRequest,
    console: ConsoleData,
    i18n: web::Data<I18n>,
) -> impl Responder {
    if let Some(session) = console.sessions().from_request(&req) {
        console.logout(&session);
    }
    let lang = get_language_from_request(&req);
    HttpResponse::Ok()
        .cookie(session::removal_cookie())
        .json(ApiResponse::success(()).with_message(i18n.get(lang, "signed_out")))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Products shown in the selected language", body = ProductListing),
        (status = 303, description = "No admin session"),
        (status = 502, description = "Catalog API unavailable")
    )
)]
pub async fn get_products(
    req: HttpRequest,
    query: web::Query<ProductQuery>,
    console: ConsoleData,
    i18n: web::Data<I18n>,
) -> impl Responder {
    let session = match session::gate(console.sessions(), &req) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    let query = query.into_inner();
    let view_language = query.lang.unwrap_or_default();
    let search = query.q.unwrap_or_default();
    match console
        .products(&session, view_language, &search, query.refresh.unwrap_or(false))
        .await
    {
        Ok(listing) => HttpResponse::Ok().json(ApiResponse::success(listing)),
        Err(e) => {
            log::error!("Loading products failed: {}", e);
            error_response(&e, &i18n, get_language_from_request(&req), "products_load_failed")
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product id"), DeleteQuery),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 409, description = "Deletion was not confirmed"),
        (status = 502, description = "Catalog API rejected the delete")
    )
)]
pub async fn delete_product(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<DeleteQuery>,
    console: ConsoleData,
    i18n: web::Data<I18n>,
) -> impl Responder {
    let session = match session::gate(console.sessions(), &req) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    let id = path.into_inner();
    let lang = get_language_from_request(&req);
    match console
        .delete_product(&session, &id, query.confirm.unwrap_or(false))
        .await
    {
        Ok(()) => HttpResponse::Ok()
            .json(ApiResponse::success(()).with_message(i18n.get(lang, "product_deleted"))),
        Err(e) => {
            if !matches!(e, ConsoleError::ConfirmationRequired) {
                log::error!("Deleting product {} failed: {}", id, e);
            }
            error_response(&e, &i18n, lang, "product_delete_failed")
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/forms",
    request_body = OpenFormRequest,
    responses(
        (status = 201, description = "Form opened", body = OpenFormResponse),
        (status = 404, description = "Product not in the loaded list")
    )
)]
pub async fn open_form(
    req: HttpRequest,
    body: Option<web::Json<OpenFormRequest>>,
    console: ConsoleData,
    i18n: web::Data<I18n>,
) -> impl Responder {
    let session = match session::gate(console.sessions(), &req) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    let request = body.map(web::Json::into_inner).unwrap_or_default();
    match console.open_form(&session, request.product_id.as_deref()) {
        Ok(form_id) => HttpResponse::Created().json(ApiResponse::success(OpenFormResponse { form_id })),
        Err(e) => error_response(&e, &i18n, get_language_from_request(&req), "products_load_failed"),
    }
}

#[utoipa::path(
    get,
    path = "/api/forms/{id}",
    params(("id" = Uuid, Path, description = "Form id")),
    responses((status = 200, description = "Form in its active language"), (status = 404, description = "Unknown form"))
)]
pub async fn get_form(
    req: HttpRequest,
    path: web::Path<Uuid>,
    console: ConsoleData,
    i18n: web::Data<I18n>,
) -> impl Responder {
    let session = match session::gate(console.sessions(), &req) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    match console.form_view(&session, path.into_inner()) {
        Ok(view) => HttpResponse::Ok().json(ApiResponse::success(view)),
        Err(e) => error_response(&e, &i18n, get_language_from_request(&req), "form_not_found"),
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EditQuery {
    /// Language to edit; the form's active language when omitted.
    pub lang: Option<Language>,
}

#[utoipa::path(
    patch,
    path = "/api/forms/{id}",
    params(("id" = Uuid, Path, description = "Form id"), EditQuery),
    request_body = FieldEdit,
    responses((status = 200, description = "Edit applied"), (status = 400, description = "Row out of range"))
)]
pub async fn edit_form(
    req: HttpRequest,
    path: web::Path<Uuid>,
    query: web::Query<EditQuery>,
    edit: web::Json<FieldEdit>,
    console: ConsoleData,
    i18n: web::Data<I18n>,
) -> impl Responder {
    let session = match session::gate(console.sessions(), &req) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    match console.edit_form(&session, path.into_inner(), query.lang, edit.into_inner()) {
        Ok(view) => HttpResponse::Ok().json(ApiResponse::success(view)),
        Err(e) => error_response(&e, &i18n, get_language_from_request(&req), "form_not_found"),
    }
}

#[utoipa::path(
    put,
    path = "/api/forms/{id}/language",
    params(("id" = Uuid, Path, description = "Form id")),
    request_body = SwitchLanguageRequest,
    responses((status = 200, description = "Active language switched"))
)]
pub async fn switch_language(
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<SwitchLanguageRequest>,
    console: ConsoleData,
    i18n: web::Data<I18n>,
) -> impl Responder {
    let session = match session::gate(console.sessions(), &req) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    match console.switch_form_language(&session, path.into_inner(), body.language) {
        Ok(view) => HttpResponse::Ok().json(ApiResponse::success(view)),
        Err(e) => error_response(&e, &i18n, get_language_from_request(&req), "form_not_found"),
    }
}

#[utoipa::path(
    put,
    path = "/api/forms/{id}/image",
    params(("id" = Uuid, Path, description = "Form id"), ImageQuery),
    request_body(content = Vec<u8>, content_type = "image/*", description = "Raw image bytes"),
    responses(
        (status = 200, description = "Image attached"),
        (status = 415, description = "Not an image")
    )
)]
pub async fn upload_image(
    req: HttpRequest,
    path: web::Path<Uuid>,
    query: web::Query<ImageQuery>,
    body: web::Bytes,
    console: ConsoleData,
    i18n: web::Data<I18n>,
) -> impl Responder {
    let session = match session::gate(console.sessions(), &req) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    let file_name = query
        .file_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "image".to_string());

    match console.attach_image(&session, path.into_inner(), &file_name, content_type, body.to_vec()) {
        Ok(view) => HttpResponse::Ok().json(ApiResponse::success(view)),
        Err(e) => error_response(&e, &i18n, get_language_from_request(&req), "unsupported_image"),
    }
}

#[utoipa::path(
    get,
    path = "/api/forms/{id}/preview",
    params(("id" = Uuid, Path, description = "Form id")),
    responses(
        (status = 200, description = "Pending image bytes"),
        (status = 307, description = "Current product image"),
        (status = 404, description = "No image")
    )
)]
pub async fn get_preview(
    req: HttpRequest,
    path: web::Path<Uuid>,
    console: ConsoleData,
    i18n: web::Data<I18n>,
) -> impl Responder {
    let session = match session::gate(console.sessions(), &req) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    match console.preview(&session, path.into_inner()) {
        Ok(Some(PreviewSource::Pending {
            content_type,
            bytes,
        })) => HttpResponse::Ok().content_type(content_type).body(bytes),
        Ok(Some(PreviewSource::Remote(url))) => HttpResponse::TemporaryRedirect()
            .insert_header((header::LOCATION, url))
            .finish(),
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => error_response(&e, &i18n, get_language_from_request(&req), "form_not_found"),
    }
}

#[utoipa::path(
    delete,
    path = "/api/forms/{id}",
    params(("id" = Uuid, Path, description = "Form id")),
    responses((status = 200, description = "Form discarded"), (status = 404, description = "Unknown form"))
)]
pub async fn close_form(
    req: HttpRequest,
    path: web::Path<Uuid>,
    console: ConsoleData,
    i18n: web::Data<I18n>,
) -> impl Responder {
    let session = match session::gate(console.sessions(), &req) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    let form_id = path.into_inner();
    let lang = get_language_from_request(&req);
    if console.close_form(&session, form_id) {
        HttpResponse::Ok().json(ApiResponse::success(()).with_message(i18n.get(lang, "form_closed")))
    } else {
        error_response(&ConsoleError::FormNotFound(form_id), &i18n, lang, "form_not_found")
    }
}

#[utoipa::path(
    post,
    path = "/api/forms/{id}/submit",
    params(("id" = Uuid, Path, description = "Form id")),
    responses(
        (status = 200, description = "Product saved, form discarded"),
        (status = 409, description = "A save of this form is already running"),
        (status = 422, description = "Required field missing"),
        (status = 502, description = "Catalog API rejected the save; form kept")
    )
)]
pub async fn submit_form(
    req: HttpRequest,
    path: web::Path<Uuid>,
    console: ConsoleData,
    i18n: web::Data<I18n>,
) -> impl Responder {
    let session = match session::gate(console.sessions(), &req) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    let lang = get_language_from_request(&req);
    match console.submit_form(&session, path.into_inner()).await {
        Ok(mode) => {
            let key = match mode {
                FormMode::Create => "product_created",
                FormMode::Edit => "product_updated",
            };
            HttpResponse::Ok().json(ApiResponse::success(mode).with_message(i18n.get(lang, key)))
        }
        Err(e) => error_response(&e, &i18n, lang, "product_save_failed"),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_IMAGE_BYTES))
        .route(LOGIN_PATH, web::get().to(show_login))
        .route(LOGIN_PATH, web::post().to(submit_login))
        .service(
            web::scope("/api")
                .service(health_check)
                .service(
                    web::scope("/auth")
                        .route("/login", web::post().to(api_login))
                        .route("/logout", web::post().to(api_logout)),
                )
                .service(
                    web::scope("/products")
                        .route("", web::get().to(get_products))
                        .route("/{id}", web::delete().to(delete_product)),
                )
                .service(
                    web::scope("/forms")
                        .route("", web::post().to(open_form))
                        .route("/{id}", web::get().to(get_form))
                        .route("/{id}", web::patch().to(edit_form))
                        .route("/{id}", web::delete().to(close_form))
                        .route("/{id}/language", web::put().to(switch_language))
                        .route("/{id}/image", web::put().to(upload_image))
                        .route("/{id}/preview", web::get().to(get_preview))
                        .route("/{id}/submit", web::post().to(submit_form)),
                ),
        );
}
