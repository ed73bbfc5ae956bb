use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

use server::config::{
    AppConfig, CorsConfig, DeploymentConfig, DocumentsConfig, EmailConfig, GraphQLConfig,
    ServerConfig,
};
use server::documents::{DocumentError, DocumentExtractor, mime};
use server::graphql::GraphQLClient;
use server::mail::{MailError, Mailer, StatusEmail};
use server::state::AppState;
use server::utils::jwt::TokenVerifier;

const PRIVATE_KEY: &[u8] = include_bytes!("../../fixtures/jwt_private.pem");
const FOREIGN_PRIVATE_KEY: &[u8] = include_bytes!("../../fixtures/foreign_private.pem");
const PUBLIC_KEY: &str = include_str!("../../fixtures/jwt_public.pem");

pub const ADMIN_SECRET: &str = "test-admin-secret";

pub mod routes {
    pub const HEALTH: &str = "/";
    pub const NOTIFY: &str = "/";
    pub const UPLOAD: &str = "/upload";
    pub const USER: &str = "/user";
    pub const IS_REGISTERED: &str = "/isregistered";
}

/// Leading bytes the fake extractor uses to recognise document types.
pub mod magic {
    pub const DOCX: &[u8] = b"PK\x03\x04";
    pub const RTF: &[u8] = b"{\\rtf1";
    pub const DOC: &[u8] = b"\xD0\xCF\x11\xE0";
    pub const PNG: &[u8] = b"\x89PNG";
}

// ---------------------------------------------------------------------------
// Fake GraphQL engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FakeUser {
    pub role: &'static str,
    pub registered: bool,
}

#[derive(Debug, Clone)]
pub struct StoredWork {
    pub content: String,
    pub status: String,
    pub teacher_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub query: String,
    pub variables: Value,
    pub headers: HeaderMap,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_promoted(&self) -> bool {
        self.header("x-hasura-admin-secret") == Some(ADMIN_SECRET)
            && self.header("x-hasura-use-backend-only-permissions") == Some("true")
    }
}

/// In-memory stand-in for the database behind the GraphQL engine.
#[derive(Debug, Default)]
pub struct FakeDb {
    pub users: HashMap<i64, FakeUser>,
    pub works: BTreeMap<i64, StoredWork>,
    /// `(work_id, title_id)`
    pub essays: Vec<(i64, i64)>,
    /// `(work_id, character_id)`
    pub characterizations: Vec<(i64, i64)>,
    pub requests: Vec<RecordedRequest>,
    /// Reject every essay/characterization insert.
    pub fail_subtype: bool,
    /// Answer every request like a failing gateway in front of the engine.
    pub unavailable: bool,
    next_id: i64,
}

impl FakeDb {
    pub fn requests_matching(&self, needle: &str) -> Vec<RecordedRequest> {
        self.requests
            .iter()
            .filter(|r| r.query.contains(needle))
            .cloned()
            .collect()
    }

    fn execute(&mut self, query: &str, vars: &Value) -> Value {
        if query.contains("insert_works_one") {
            self.next_id += 1;
            let id = self.next_id;
            self.works.insert(
                id,
                StoredWork {
                    content: vars["content"].as_str().unwrap_or_default().to_string(),
                    status: vars["status"].as_str().unwrap_or_default().to_string(),
                    teacher_id: vars["requestedTeacherID"].as_i64(),
                },
            );
            return json!({"data": {"insert_works_one": {"id": id}}});
        }

        for (field, typename) in [
            ("insert_essays_one", "essays"),
            ("insert_characterizations_one", "characterizations"),
        ] {
            if !query.contains(field) {
                continue;
            }
            if self.fail_subtype {
                return json!({
                    "data": null,
                    "errors": [{"message": "Foreign key violation. insert or update violates foreign key constraint"}],
                });
            }
            let row = (
                vars["workID"].as_i64().unwrap_or_default(),
                vars["subjectID"].as_i64().unwrap_or_default(),
            );
            if typename == "essays" {
                self.essays.push(row);
            } else {
                self.characterizations.push(row);
            }
            return json!({"data": {field: {"__typename": typename}}});
        }

        if query.contains("delete_works_by_pk") {
            let id = vars["id"].as_i64().unwrap_or_default();
            let deleted = self.works.remove(&id).map(|_| json!({"id": id}));
            return json!({"data": {"delete_works_by_pk": deleted}});
        }

        if query.contains("users(") {
            let id = vars["id"].as_i64().unwrap_or_default();
            let users: Vec<Value> = self
                .users
                .get(&id)
                .map(|u| {
                    json!({
                        "role": u.role,
                        "updated_at": u.registered.then_some("2024-09-01T10:00:00.123456"),
                    })
                })
                .into_iter()
                .collect();
            return json!({"data": {"users": users}});
        }

        json!({"data": null, "errors": [{"message": "unknown operation"}]})
    }
}

type SharedDb = Arc<Mutex<FakeDb>>;

async fn graphql_endpoint(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let query = body["query"].as_str().unwrap_or_default().to_string();
    let variables = body["variables"].clone();

    let mut db = db.lock().unwrap();
    db.requests.push(RecordedRequest {
        query: query.clone(),
        variables: variables.clone(),
        headers,
    });
    if db.unavailable {
        return (
            StatusCode::BAD_GATEWAY,
            "<html><body><h1>502 Bad Gateway</h1></body></html>",
        )
            .into_response();
    }
    Json(db.execute(&query, &variables)).into_response()
}

async fn spawn_fake_graphql(db: SharedDb) -> SocketAddr {
    let app = Router::new()
        .route("/v1/graphql", post(graphql_endpoint))
        .with_state(db);
    serve(app).await
}

/// Base URL of a port nothing listens on.
pub async fn closed_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

// ---------------------------------------------------------------------------
// Fake document extractor and mailer
// ---------------------------------------------------------------------------

/// Detects types by magic prefix; "extraction" strips the prefix.
#[derive(Default)]
pub struct FakeDocuments {
    pub detect_calls: AtomicUsize,
    pub parse_calls: AtomicUsize,
    /// Fail every call as if the service were down.
    pub unavailable: AtomicBool,
}

impl FakeDocuments {
    pub fn calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst) + self.parse_calls.load(Ordering::SeqCst)
    }

    fn classify(document: &[u8]) -> (&'static str, usize) {
        for (prefix, mime) in [
            (magic::DOCX, mime::DOCX),
            (magic::RTF, mime::RTF),
            (magic::DOC, mime::DOC),
            (magic::PNG, "image/png"),
        ] {
            if document.starts_with(prefix) {
                return (mime, prefix.len());
            }
        }
        ("text/plain; charset=UTF-8", 0)
    }
}

#[async_trait]
impl DocumentExtractor for FakeDocuments {
    async fn detect(&self, document: Bytes) -> Result<String, DocumentError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DocumentError::Status(503));
        }
        Ok(Self::classify(&document).0.to_string())
    }

    async fn parse(&self, document: Bytes) -> Result<String, DocumentError> {
        self.parse_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DocumentError::Status(503));
        }
        let (_, skip) = Self::classify(&document);
        Ok(String::from_utf8_lossy(&document[skip..]).into_owned())
    }
}

#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<StatusEmail>>,
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send_status(&self, email: &StatusEmail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Stub HTTP service for the real outbound clients
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body should be JSON")
    }
}

type Responder = fn(&CapturedRequest) -> (StatusCode, String);

#[derive(Clone)]
struct StubState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    respond: Responder,
}

/// Records every request and answers with `respond`.
pub struct StubService {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl StubService {
    pub async fn spawn(respond: Responder) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(stub_endpoint).with_state(StubState {
            requests: requests.clone(),
            respond,
        });
        let addr = serve(app).await;
        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn stub_endpoint(
    State(stub): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let request = CapturedRequest {
        method,
        path: uri.path().to_string(),
        headers,
        body,
    };
    let response = (stub.respond)(&request);
    stub.requests.lock().unwrap().push(request);
    response
}

pub fn email_config(api_url: String) -> EmailConfig {
    EmailConfig {
        api_key: "test-key".to_string(),
        api_url,
        sender_address: "no-reply@eseuri.com".to_string(),
        sender_name: "Eseuri".to_string(),
        approved_template: "approved".to_string(),
        rejected_template: "rejected".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Claims carried by a test token.
pub struct TokenSpec {
    pub user_id: i64,
    pub role: &'static str,
    pub registered: bool,
    pub exp_offset: i64,
}

impl TokenSpec {
    pub fn student(user_id: i64) -> Self {
        Self {
            user_id,
            role: "student",
            registered: true,
            exp_offset: 3600,
        }
    }

    pub fn teacher(user_id: i64) -> Self {
        Self {
            role: "teacher",
            ..Self::student(user_id)
        }
    }

    pub fn unregistered(mut self) -> Self {
        self.registered = false;
        self
    }

    pub fn expired(mut self) -> Self {
        self.exp_offset = -3600;
        self
    }

    fn claims(&self) -> Value {
        json!({
            "sub": format!("auth0|{}", self.user_id),
            "iat": Utc::now().timestamp(),
            "exp": (Utc::now() + Duration::seconds(self.exp_offset)).timestamp(),
            "https://hasura.io/jwt/claims": {
                "X-Hasura-Default-Role": self.role,
                "X-Hasura-Allowed-Roles": [self.role],
                "X-Hasura-User-Id": self.user_id.to_string(),
            },
            "https://eseuri.com": {"hasCompletedRegistration": self.registered},
        })
    }
}

pub fn sign(spec: &TokenSpec) -> String {
    sign_with(spec, PRIVATE_KEY)
}

/// A well-formed token signed with a key the server does not trust.
pub fn sign_foreign(spec: &TokenSpec) -> String {
    sign_with(spec, FOREIGN_PRIVATE_KEY)
}

fn sign_with(spec: &TokenSpec, pem: &[u8]) -> String {
    let key = EncodingKey::from_rsa_pem(pem).expect("Failed to read test private key");
    encode(&Header::new(Algorithm::RS256), &spec.claims(), &key).expect("Failed to sign token")
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

/// A running test server backed by in-memory fakes.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: SharedDb,
    pub documents: Arc<FakeDocuments>,
    pub mailer: Arc<FakeMailer>,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

/// Form fields of an upload request. The file part is always sent first.
#[derive(Default)]
pub struct UploadForm<'a> {
    pub file: Option<(&'a str, Vec<u8>)>,
    pub work_type: Option<&'a str>,
    pub subject: Option<&'a str>,
    pub requested_teacher: Option<&'a str>,
}

impl<'a> UploadForm<'a> {
    pub fn new(file_name: &'a str, contents: &[u8], work_type: &'a str, subject: &'a str) -> Self {
        Self {
            file: Some((file_name, contents.to_vec())),
            work_type: Some(work_type),
            subject: Some(subject),
            requested_teacher: None,
        }
    }

    pub fn requested_teacher(mut self, id: &'a str) -> Self {
        self.requested_teacher = Some(id);
        self
    }

    fn into_form(self) -> Form {
        let mut form = Form::new();
        if let Some((name, bytes)) = self.file {
            form = form.part(
                "file",
                Part::bytes(bytes)
                    .file_name(name.to_string())
                    .mime_str("application/octet-stream")
                    .expect("Failed to set MIME type"),
            );
        }
        for (field, value) in [
            ("type", self.work_type),
            ("subject", self.subject),
            ("requestedTeacher", self.requested_teacher),
        ] {
            if let Some(value) = value {
                form = form.text(field, value.to_string());
            }
        }
        form
    }
}

fn test_config(graphql: SocketAddr) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
            upload_limit: 32 * 1024 * 1024,
        },
        deployment: DeploymentConfig {
            hosted: false,
            context: "development".to_string(),
            url: None,
            base_path: "/api".to_string(),
        },
        graphql: GraphQLConfig {
            endpoint: format!("http://{graphql}"),
            admin_secret: ADMIN_SECRET.to_string(),
            jwt_secret: json!({"type": "RS256", "key": PUBLIC_KEY}).to_string(),
        },
        documents: DocumentsConfig {
            url: "http://127.0.0.1:9".to_string(),
        },
        email: email_config("http://127.0.0.1:9".to_string()),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a tweaked configuration.
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let db = SharedDb::default();
        let graphql_addr = spawn_fake_graphql(db.clone()).await;

        let mut config = test_config(graphql_addr);
        configure(&mut config);

        let http = Client::new();
        let documents = Arc::new(FakeDocuments::default());
        let mailer = Arc::new(FakeMailer::default());

        let state = AppState {
            verifier: Arc::new(
                TokenVerifier::from_secret_json(&config.graphql.jwt_secret)
                    .expect("Failed to build token verifier"),
            ),
            graphql: GraphQLClient::new(http.clone(), &config.graphql),
            documents: documents.clone(),
            mailer: mailer.clone(),
            config,
        };

        let addr = serve(server::build_router(state)).await;

        Self {
            addr,
            client: http,
            db,
            documents,
            mailer,
        }
    }

    pub fn db(&self) -> MutexGuard<'_, FakeDb> {
        self.db.lock().unwrap()
    }

    /// Seed a user row in the fake database.
    pub fn add_user(&self, id: i64, role: &'static str, registered: bool) {
        self.db().users.insert(id, FakeUser { role, registered });
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn upload_with_token(&self, form: UploadForm<'_>, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(routes::UPLOAD))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form.into_form())
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    pub async fn upload_without_token(&self, form: UploadForm<'_>) -> TestResponse {
        let res = self
            .client
            .post(self.url(routes::UPLOAD))
            .multipart(form.into_form())
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> i64 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'")
    }

    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}
