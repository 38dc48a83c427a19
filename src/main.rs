mod api;
mod builders;
mod console;
mod error;
mod form;
mod handlers;
mod i18n;
mod layout;
mod listing;
mod models;
mod session;
#[cfg(test)]
mod testing;

use crate::api::ApiClient;
use crate::console::Console;
use crate::i18n::I18n;
use crate::session::SessionStore;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health_check,
        handlers::api_login,
        handlers::api_logout,
        handlers::get_products,
        handlers::delete_product,
        handlers::open_form,
        handlers::get_form,
        handlers::edit_form,
        handlers::switch_language,
        handlers::upload_image,
        handlers::get_preview,
        handlers::close_form,
        handlers::submit_form
    ),
    components(schemas(
        models::ApiError,
        models::Language,
        models::LocalizedContent,
        models::UsageInfo,
        models::Product,
        models::ProductCard,
        models::ProductListing,
        models::LoginRequest,
        models::OpenFormRequest,
        models::OpenFormResponse,
        models::SwitchLanguageRequest,
        form::FormMode,
        form::FieldEdit,
        form::TextField,
        form::ListField,
        form::TableField,
        handlers::HealthCheckResponse
    ))
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    dotenv::from_filename(format!("{}/.env.local", manifest_dir)).ok();
    dotenv::from_filename(format!("{}/.env", manifest_dir)).ok();
    dotenv::from_filename(".env.local").ok();
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_address = format!("{}:{}", host, port);

    let sessions = SessionStore::from_env().map_err(|e| {
        log::error!("Failed to set up admin sessions: {:#}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;
    let api = ApiClient::from_env().map_err(|e| {
        log::error!("Failed to build catalog API client: {:#}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;
    let console = web::Data::new(Arc::new(Console::new(sessions, api)));
    let i18n = web::Data::new(I18n::new());

    log::info!("Starting catalog admin console at http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(console.clone())
            .app_data(i18n.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .service(SwaggerUi::new("/api/docs/{_:.*}").url("/api/openapi.json", ApiDoc::openapi()))
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_form_edit_and_image_bodies() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(doc["components"]["schemas"]["FieldEdit"].is_object());
        assert!(doc["components"]["schemas"]["TextField"].is_object());

        let edit = &doc["paths"]["/api/forms/{id}"]["patch"]["requestBody"]["content"];
        assert_eq!(
            edit["application/json"]["schema"]["$ref"],
            "#/components/schemas/FieldEdit"
        );
        let upload = &doc["paths"]["/api/forms/{id}/image"]["put"]["requestBody"]["content"];
        assert!(upload["image/*"].is_object());
    }
}
