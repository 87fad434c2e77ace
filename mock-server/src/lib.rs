use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Port used when `PORT` is unset or not a port number.
pub const DEFAULT_PORT: u16 = 3000;

/// Every route the router serves, as `(method, path)`.
pub const ROUTES: &[(&str, &str)] = &[
    ("POST", "/auth/register"),
    ("POST", "/auth/login"),
    ("POST", "/auth/refresh"),
    ("GET", "/api/profile"),
    ("GET", "/health"),
    ("GET", "/api/books"),
    ("GET", "/api/books/isbn/{isbn}"),
    ("GET", "/api/books/format/{format}"),
    ("GET", "/api/books/author/{author}"),
];

const ACCESS_TTL_MINUTES: i64 = 15;
const REFRESH_TTL_DAYS: i64 = 7;

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub username: String,
    #[serde(skip)]
    pub password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub year: String,
    pub genre: String,
    pub price: String,
    pub stock: String,
    pub format: String,
}

/// One request as seen by the server, before routing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshInput {
    #[serde(default)]
    pub refresh_token: String,
}

/// In-memory stand-in for the auth database and the catalog.
#[derive(Default)]
pub struct MockState {
    next_user_id: AtomicU64,
    users: RwLock<Vec<User>>,
    access_tokens: RwLock<HashMap<String, u64>>,
    refresh_tokens: RwLock<HashMap<String, u64>>,
    books: RwLock<Vec<Book>>,
    requests: Mutex<Vec<RecordedRequest>>,
    catalog_down: AtomicBool,
}

impl MockState {
    pub fn seeded() -> Self {
        MockState {
            next_user_id: AtomicU64::new(1),
            books: RwLock::new(seed_books()),
            ..MockState::default()
        }
    }

    /// Every request received so far, oldest first.
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// While down, every catalog endpoint answers 500.
    pub fn set_catalog_down(&self, down: bool) {
        self.catalog_down.store(down, Ordering::Relaxed);
    }

    async fn issue_tokens(&self, user_id: u64) -> Value {
        let now = Utc::now();
        let access = format!("access-{}", Uuid::new_v4());
        let refresh = format!("refresh-{}", Uuid::new_v4());
        self.access_tokens.write().await.insert(access.clone(), user_id);
        self.refresh_tokens.write().await.insert(refresh.clone(), user_id);
        json!({
            "access_token": access,
            "access_expires_at_utc": timestamp(now + Duration::minutes(ACCESS_TTL_MINUTES)),
            "refresh_token": refresh,
            "refresh_expires_at_utc": timestamp(now + Duration::days(REFRESH_TTL_DAYS)),
        })
    }
}

pub type Db = Arc<MockState>;

type JsonReply = (StatusCode, Json<Value>);

pub fn app() -> Router {
    app_with_state(Arc::new(MockState::seeded()))
}

pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/api/profile", get(profile))
        .route("/health", get(health))
        .route("/api/books", get(list_books))
        .route("/api/books/isbn/{isbn}", get(books_by_isbn))
        .route("/api/books/format/{format}", get(books_by_format))
        .route("/api/books/author/{author}", get(books_by_author))
        .layer(middleware::from_fn_with_state(db.clone(), record_request))
        .with_state(db)
}

/// Loopback address for the `PORT` value, if any.
pub fn listen_addr(port: Option<&str>) -> String {
    let port = port
        .and_then(|p| p.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    format!("127.0.0.1:{port}")
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, Arc::new(MockState::seeded())).await
}

pub async fn run_with_state(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(db)).await
}

async fn record_request(State(db): State<Db>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        authorization: request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    if let Ok(mut requests) = db.requests.lock() {
        requests.push(recorded);
    }
    next.run(request).await
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn error_reply(status: StatusCode, message: &str) -> JsonReply {
    (status, Json(json!({ "error": message })))
}

// --- auth ---

async fn register(State(db): State<Db>, Json(input): Json<RegisterInput>) -> Result<JsonReply, JsonReply> {
    let email = input.email.trim().to_lowercase();
    let username = input.username.trim().to_string();
    if email.is_empty() || username.is_empty() || input.password.is_empty() {
        return Err(error_reply(StatusCode::BAD_REQUEST, "email, username and password are required"));
    }

    let user = {
        let mut users = db.users.write().await;
        if users.iter().any(|u| u.email == email || u.username == username) {
            return Err(error_reply(StatusCode::CONFLICT, "email or username already exists"));
        }
        let user = User {
            id: db.next_user_id.fetch_add(1, Ordering::Relaxed),
            email,
            username,
            password: input.password,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        user
    };

    let tokens = db.issue_tokens(user.id).await;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "user registered", "user": user, "tokens": tokens })),
    ))
}

async fn login(State(db): State<Db>, Json(input): Json<LoginInput>) -> Result<JsonReply, JsonReply> {
    let who = if input.email.trim().is_empty() { &input.username } else { &input.email };
    let who = who.trim().to_lowercase();
    if who.is_empty() || input.password.is_empty() {
        return Err(error_reply(StatusCode::BAD_REQUEST, "email/username and password are required"));
    }

    let user = db
        .users
        .read()
        .await
        .iter()
        .find(|u| u.email == who || u.username.to_lowercase() == who)
        .filter(|u| u.password == input.password)
        .cloned()
        .ok_or_else(|| error_reply(StatusCode::UNAUTHORIZED, "invalid credentials"))?;

    let tokens = db.issue_tokens(user.id).await;
    Ok((
        StatusCode::OK,
        Json(json!({ "message": "login successful", "user": user, "tokens": tokens })),
    ))
}

async fn refresh(State(db): State<Db>, Json(input): Json<RefreshInput>) -> Result<JsonReply, JsonReply> {
    let token = input.refresh_token.trim();
    if token.is_empty() {
        return Err(error_reply(StatusCode::BAD_REQUEST, "refresh_token is required"));
    }
    let user_id = db
        .refresh_tokens
        .read()
        .await
        .get(token)
        .copied()
        .ok_or_else(|| error_reply(StatusCode::UNAUTHORIZED, "invalid or revoked refresh token"))?;

    let access = format!("access-{}", Uuid::new_v4());
    db.access_tokens.write().await.insert(access.clone(), user_id);
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "new access token issued",
            "access_token": access,
            "access_expires_at_utc": timestamp(Utc::now() + Duration::minutes(ACCESS_TTL_MINUTES)),
        })),
    ))
}

async fn profile(State(db): State<Db>, headers: HeaderMap) -> Result<JsonReply, JsonReply> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| error_reply(StatusCode::UNAUTHORIZED, "missing bearer token"))?;
    let user_id = db
        .access_tokens
        .read()
        .await
        .get(token)
        .copied()
        .ok_or_else(|| error_reply(StatusCode::UNAUTHORIZED, "invalid token"))?;
    let users = db.users.read().await;
    let user = users
        .iter()
        .find(|u| u.id == user_id)
        .ok_or_else(|| error_reply(StatusCode::NOT_FOUND, "user not found"))?;
    Ok((StatusCode::OK, Json(json!({ "user": user }))))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// --- catalog ---

async fn list_books(State(db): State<Db>) -> Response {
    filtered_books(&db, |_| true, None).await
}

async fn books_by_isbn(State(db): State<Db>, Path(isbn): Path<String>) -> Response {
    let message = format!("book with ISBN {isbn} not found");
    filtered_books(&db, |b| b.isbn == isbn, Some(&message)).await
}

async fn books_by_format(State(db): State<Db>, Path(format): Path<String>) -> Response {
    let message = format!("no books with format '{format}'");
    filtered_books(&db, |b| b.format.eq_ignore_ascii_case(&format), Some(&message)).await
}

async fn books_by_author(State(db): State<Db>, Path(author): Path<String>) -> Response {
    let message = format!("no books by author '{author}'");
    filtered_books(&db, |b| b.author.eq_ignore_ascii_case(&author), Some(&message)).await
}

/// An empty match answers 404 with `not_found` when given, otherwise an
/// empty document.
async fn filtered_books(db: &MockState, keep: impl Fn(&Book) -> bool, not_found: Option<&str>) -> Response {
    if db.catalog_down.load(Ordering::Relaxed) {
        return message_xml(StatusCode::INTERNAL_SERVER_ERROR, "catalog database unavailable");
    }
    let books = db.books.read().await;
    let matching: Vec<&Book> = books.iter().filter(|b| keep(b)).collect();
    match not_found {
        Some(message) if matching.is_empty() => message_xml(StatusCode::NOT_FOUND, message),
        _ => xml_reply(StatusCode::OK, catalog_xml(&matching)),
    }
}

pub fn catalog_xml(books: &[&Book]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<?xml-stylesheet type=\"text/xsl\" href=\"/books.xsl\"?>\n<books>",
    );
    for book in books {
        xml.push_str(&format!("<book isbn=\"{}\">", escape(&book.isbn)));
        for (tag, value) in [
            ("title", &book.title),
            ("author", &book.author),
            ("year", &book.year),
            ("genre", &book.genre),
            ("price", &book.price),
            ("stock", &book.stock),
            ("format", &book.format),
        ] {
            xml.push_str(&format!("<{tag}>{}</{tag}>", escape(value)));
        }
        xml.push_str("</book>");
    }
    xml.push_str("</books>");
    xml
}

fn escape(raw: &str) -> String {
    quick_xml::escape::escape(raw).into_owned()
}

fn message_xml(status: StatusCode, message: &str) -> Response {
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<response><message>{}</message></response>",
        escape(message)
    );
    xml_reply(status, xml)
}

fn xml_reply(status: StatusCode, xml: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/xml")], xml).into_response()
}

fn seed_books() -> Vec<Book> {
    let book = |isbn: &str, title: &str, author: &str, year: &str, genre: &str, price: &str, stock: &str, format: &str| Book {
        isbn: isbn.to_string(),
        title: title.to_string(),
        author: author.to_string(),
        year: year.to_string(),
        genre: genre.to_string(),
        price: price.to_string(),
        stock: stock.to_string(),
        format: format.to_string(),
    };
    vec![
        book("9780441013593", "Dune", "Frank Herbert", "1965", "Science Fiction", "9.99", "12", "Paperback"),
        book("9780547928227", "The Hobbit", "J. R. R. Tolkien", "1937", "Fantasy", "14.50", "4", "Hardcover"),
        book("9780060850524", "Brave New World", "Aldous Huxley", "1932", "Dystopian", "11.25", "0", "eBook"),
    ]
}
