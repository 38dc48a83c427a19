//! In-process stand-in for the remote catalog API, used by the client and
//! handler tests.

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const FAKE_TOKEN: &str = "tok-123";
pub const FAKE_PASSWORD: &str = "secret";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    products: Mutex<Vec<Value>>,
    requests: Mutex<Vec<RecordedRequest>>,
    fail_writes: AtomicBool,
    omit_list: AtomicBool,
}

impl FakeCatalog {
    pub fn with_products(products: Vec<Value>) -> Self {
        Self {
            products: Mutex::new(products),
            ..Self::default()
        }
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn omit_list(&self) {
        self.omit_list.store(true, Ordering::SeqCst);
    }

    pub fn products(&self) -> Vec<Value> {
        self.products.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn respond(&self, method: &str, path: &str, body: &[u8]) -> HttpResponse {
        let failing = self.fail_writes.load(Ordering::SeqCst);
        let product_id = path.strip_prefix("/api/products/").map(|id| {
            urlencoding::decode(id)
                .map(|id| id.into_owned())
                .unwrap_or_else(|_| id.to_string())
        });

        match (method, path, product_id) {
            ("POST", "/api/auth/login", _) => {
                let credentials: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
                if credentials["password"] == FAKE_PASSWORD {
                    HttpResponse::Ok().json(json!({ "token": FAKE_TOKEN }))
                } else {
                    HttpResponse::Unauthorized().json(json!({ "message": "Invalid credentials" }))
                }
            }
            ("GET", "/api/products", _) => {
                if self.omit_list.load(Ordering::SeqCst) {
                    return HttpResponse::Ok().json(json!({}));
                }
                HttpResponse::Ok().json(json!({ "list": self.products() }))
            }
            (_, _, _) if failing && method != "GET" => {
                HttpResponse::InternalServerError().json(json!({ "message": "boom" }))
            }
            ("POST", "/api/products", _) => {
                let mut products = self.products.lock().unwrap();
                let created = json!({
                    "id": format!("new-{}", products.len() + 1),
                    "pack_sizes": ["1kg"],
                    "translations": { "en": { "title": "Created" } }
                });
                products.push(created.clone());
                HttpResponse::Created().json(created)
            }
            ("PUT", _, Some(id)) => HttpResponse::Ok().json(json!({ "id": id })),
            ("DELETE", _, Some(id)) => {
                self.products
                    .lock()
                    .unwrap()
                    .retain(|p| p["id"].as_str() != Some(id.as_str()));
                HttpResponse::Ok().json(json!({ "success": true }))
            }
            _ => HttpResponse::NotFound().finish(),
        }
    }
}

async fn record(
    req: HttpRequest,
    body: web::Bytes,
    fake: web::Data<Arc<FakeCatalog>>,
) -> HttpResponse {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let recorded = RecordedRequest {
        method: req.method().to_string(),
        path: req.path().to_string(),
        authorization: header("Authorization"),
        content_type: header("Content-Type"),
        body: body.to_vec(),
    };
    fake.requests.lock().unwrap().push(recorded);
    fake.respond(req.method().as_str(), req.path(), &body)
}

/// Serves `fake` on an ephemeral local port and returns its API base URL.
pub async fn spawn_catalog(fake: Arc<FakeCatalog>) -> std::io::Result<String> {
    let data = web::Data::new(fake);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .app_data(web::PayloadConfig::new(4 * 1024 * 1024))
            .default_service(web::to(record))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))?;
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    Ok(format!("http://{}/api", addr))
}
