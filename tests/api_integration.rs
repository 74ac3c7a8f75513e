//! End-to-end API tests
//!
//! Requests go through the full router (auth, policy, store, triggers) with
//! the in-memory store, the in-memory push gateway and inline notification
//! delivery, so every push is visible once the response is back.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use ward_connect::config::{
    DatabaseConfig, JwtConfig, LogConfig, NotificationConfig, PushConfig, ServerConfig, Settings,
    UploadConfig,
};
use ward_connect::models::{Role, User};
use ward_connect::notification::MemoryPushGateway;
use ward_connect::server::{create_app, AppState};
use ward_connect::store::{
    patch_of, DocumentStore, Filter, MemoryStore, Sort, StoreResult, Upserted,
};
use ward_connect::uploads::ImageStore;

struct TestApp {
    app: Router,
    state: AppState,
    gateway: Arc<MemoryPushGateway>,
    _uploads: TempDir,
}

fn test_settings(upload_dir: &str) -> Settings {
    Settings {
        server: ServerConfig::default(),
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            issuer: None,
            audience: None,
            expiry_days: 30,
        },
        database: DatabaseConfig::default(),
        push: PushConfig {
            provider: "memory".to_string(),
            ..Default::default()
        },
        notifications: NotificationConfig {
            mode: "inline".to_string(),
            ..Default::default()
        },
        uploads: UploadConfig {
            dir: upload_dir.to_string(),
            max_size: 1024 * 1024,
        },
        log: LogConfig::default(),
    }
}

fn test_app() -> TestApp {
    test_app_with(Arc::new(MemoryStore::new()))
}

fn test_app_with(backend: Arc<dyn DocumentStore>) -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let settings = test_settings(&uploads.path().to_string_lossy());

    let gateway = Arc::new(MemoryPushGateway::new(100));
    let images = ImageStore::open(&settings.uploads).unwrap();
    let (state, outbox) = AppState::new(
        settings,
        backend,
        gateway.clone(),
        images,
    );
    assert!(outbox.is_none(), "inline mode has no outbox");

    TestApp {
        app: create_app(state.clone()),
        state,
        gateway,
        _uploads: uploads,
    }
}

impl TestApp {
    /// Insert a user directly and return it with a bearer token
    async fn seed_user(
        &self,
        name: &str,
        phone: &str,
        role: Role,
        ward: &str,
        push_token: Option<&str>,
    ) -> (User, String) {
        let hash = self.state.passwords.hash("secret123").unwrap();
        let mut user = User::new(
            name.to_string(),
            phone.to_string(),
            hash,
            role,
            ward.to_string(),
            "Central".to_string(),
            "Kerala".to_string(),
        );
        user.expo_push_token = push_token.map(str::to_string);
        self.state.store.create(&user).await.unwrap();

        let token = self.state.tokens.issue(&user.id).unwrap();
        (user, token)
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        send(self.app.clone(), request).await
    }

    fn pushes_titled(&self, title: &str) -> usize {
        self.gateway
            .messages()
            .iter()
            .filter(|m| m.title == title)
            .count()
    }
}

/// Memory store that applies one queued patch right after a given document is
/// first read, the way a concurrent request would land between a handler's
/// read and its write.
#[derive(Default)]
struct InterleavingStore {
    inner: MemoryStore,
    queued: Mutex<Option<(&'static str, String, Map<String, Value>)>>,
}

impl InterleavingStore {
    fn after_read(&self, collection: &'static str, id: &str, patch: Map<String, Value>) {
        *self.queued.lock().unwrap() = Some((collection, id.to_string(), patch));
    }
}

#[async_trait]
impl DocumentStore for InterleavingStore {
    fn backend_name(&self) -> &'static str {
        "interleaving"
    }

    async fn insert(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        unique: &[&str],
    ) -> StoreResult<()> {
        self.inner.insert(collection, id, doc, unique).await
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let found = self.inner.find_by_id(collection, id).await?;

        let due = {
            let mut queued = self.queued.lock().unwrap();
            let hit = matches!(queued.as_ref(), Some((c, i, _)) if *c == collection && i == id);
            if hit {
                queued.take()
            } else {
                None
            }
        };
        if let Some((collection, id, patch)) = due {
            self.inner
                .patch(collection, &id, &Filter::new(), patch, &[])
                .await?;
        }

        Ok(found)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Value>> {
        self.inner.find_one(collection, filter).await
    }

    async fn find(&self, collection: &str, filter: &Filter, sort: Sort) -> StoreResult<Vec<Value>> {
        self.inner.find(collection, filter, sort).await
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        condition: &Filter,
        patch: Map<String, Value>,
        unique: &[&str],
    ) -> StoreResult<Option<Value>> {
        self.inner.patch(collection, id, condition, patch, unique).await
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        patch: Map<String, Value>,
    ) -> StoreResult<Upserted<Value>> {
        self.inner.upsert(collection, id, doc, patch).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn multipart_image(file_name: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----wardconnectboundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let t = test_app();

    let (status, body) = t
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Asha",
                "phone": "9000000001",
                "password": "secret123",
                "ward": "Ward 5",
                "district": "Central",
                "state": "Kerala"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "citizen");
    assert!(body["token"].as_str().is_some());
    assert!(body.get("passwordHash").is_none());

    let (status, body) = t
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "phone": "9000000001", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = t
        .request(Method::GET, "/api/users/profile", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Asha");

    let (status, body) = t
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "phone": "9000000001", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid phone or password");
}

#[tokio::test]
async fn test_duplicate_phone_is_conflict() {
    let t = test_app();
    let registration = json!({
        "name": "Ravi",
        "phone": "9000000002",
        "password": "secret123",
        "ward": "Ward 1",
        "district": "Central",
        "state": "Kerala"
    });

    let (status, _) = t
        .request(Method::POST, "/api/auth/register", None, Some(registration.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = t
        .request(Method::POST, "/api/auth/register", None, Some(registration))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn test_privileged_self_registration_is_refused() {
    let t = test_app();

    let (status, body) = t
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Mallory",
                "phone": "9000000003",
                "password": "secret123",
                "role": "admin",
                "ward": "Ward 1",
                "district": "Central",
                "state": "Kerala"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_missing_or_invalid_token_is_unauthorized() {
    let t = test_app();

    let (status, _) = t.request(Method::GET, "/api/complaints", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t
        .request(Method::GET, "/api/complaints", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_complaint_notifies_whole_ward_despite_spelling() {
    let t = test_app();
    let (_, reporter) = t
        .seed_user("Reporter", "9100000001", Role::Citizen, "Ward 5", None)
        .await;
    t.seed_user("A", "9100000002", Role::Citizen, "Ward 5", Some("ExpoPushToken[a]"))
        .await;
    t.seed_user("B", "9100000003", Role::Citizen, "ward 5 ", Some("ExpoPushToken[b]"))
        .await;
    t.seed_user("C", "9100000004", Role::Citizen, "Ward 6", Some("ExpoPushToken[c]"))
        .await;
    t.seed_user("D", "9100000005", Role::Citizen, "Ward 5", None)
        .await;

    let (status, body) = t
        .request(
            Method::POST,
            "/api/complaints",
            Some(&reporter),
            Some(json!({ "title": "Broken streetlight", "description": "Dark since Monday" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "open");
    assert_eq!(body["ward"], "Ward 5");

    assert_eq!(t.gateway.messages_to("ExpoPushToken[a]").len(), 1);
    assert_eq!(t.gateway.messages_to("ExpoPushToken[b]").len(), 1);
    assert!(t.gateway.messages_to("ExpoPushToken[c]").is_empty());

    let pushed = t.gateway.messages();
    assert_eq!(pushed.len(), 2);
    assert!(pushed.iter().all(|m| m.title == "🚨 New Issue Reported"));
    assert_eq!(pushed[0].body, "\"Broken streetlight\" reported in Ward 5");
}

#[tokio::test]
async fn test_complaint_visibility_by_role() {
    let t = test_app();
    let (_, alice) = t
        .seed_user("Alice", "9200000001", Role::Citizen, "Ward 2", None)
        .await;
    let (_, bob) = t
        .seed_user("Bob", "9200000002", Role::Citizen, "Ward 2", None)
        .await;
    let (_, member) = t
        .seed_user("Member", "9200000003", Role::WardMember, "ward 2", None)
        .await;

    for (token, title) in [(&alice, "Pothole"), (&bob, "Garbage")] {
        let (status, _) = t
            .request(
                Method::POST,
                "/api/complaints",
                Some(token),
                Some(json!({ "title": title, "description": "Please fix" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, own) = t.request(Method::GET, "/api/complaints", Some(&alice), None).await;
    assert_eq!(own.as_array().unwrap().len(), 1);
    assert_eq!(own[0]["title"], "Pothole");

    let (_, ward) = t.request(Method::GET, "/api/complaints", Some(&member), None).await;
    assert_eq!(ward.as_array().unwrap().len(), 2);
    for listed in ward.as_array().unwrap() {
        let reporter = &listed["userDetails"];
        match listed["title"].as_str().unwrap() {
            "Pothole" => assert_eq!(reporter["phone"], "9200000001"),
            _ => assert_eq!(reporter["name"], "Bob"),
        }
    }

    let (_, feed) = t
        .request(Method::GET, "/api/complaints/ward", Some(&bob), None)
        .await;
    assert_eq!(feed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_resolve_notifies_once() {
    let t = test_app();
    let (_, reporter) = t
        .seed_user("Reporter", "9300000001", Role::Citizen, "Ward 7", Some("ExpoPushToken[r]"))
        .await;
    let (member, member_token) = t
        .seed_user("Member", "9300000002", Role::WardMember, "Ward 7", None)
        .await;

    let (_, complaint) = t
        .request(
            Method::POST,
            "/api/complaints",
            Some(&reporter),
            Some(json!({ "title": "Water leak", "description": "Main line" })),
        )
        .await;
    let uri = format!("/api/complaints/{}", complaint["id"].as_str().unwrap());

    let (status, body) = t
        .request(
            Method::PUT,
            &uri,
            Some(&member_token),
            Some(json!({ "status": "resolved" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "resolved");
    assert_eq!(body["resolvedBy"], member.id.as_str());
    assert!(body["resolvedAt"].as_str().is_some());
    assert_eq!(t.pushes_titled("✅ Issue Resolved"), 1);

    // Resolving again is not a new transition
    let (status, body) = t
        .request(
            Method::PUT,
            &uri,
            Some(&member_token),
            Some(json!({ "status": "resolved" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "resolved");
    assert_eq!(t.pushes_titled("✅ Issue Resolved"), 1);
}

#[tokio::test]
async fn test_concurrent_resolves_notify_once() {
    let t = test_app();
    let (_, reporter) = t
        .seed_user("Reporter", "9400000001", Role::Citizen, "Ward 8", Some("ExpoPushToken[r]"))
        .await;
    let (_, first) = t
        .seed_user("First", "9400000002", Role::WardMember, "Ward 8", None)
        .await;
    let (_, second) = t
        .seed_user("Second", "9400000003", Role::WardMember, "Ward 8", None)
        .await;

    let (_, complaint) = t
        .request(
            Method::POST,
            "/api/complaints",
            Some(&reporter),
            Some(json!({ "title": "Fallen tree", "description": "Blocking road" })),
        )
        .await;
    let uri = format!("/api/complaints/{}", complaint["id"].as_str().unwrap());
    let resolve = json!({ "status": "resolved" });

    let (a, b) = tokio::join!(
        t.request(Method::PUT, &uri, Some(&first), Some(resolve.clone())),
        t.request(Method::PUT, &uri, Some(&second), Some(resolve.clone())),
    );
    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);
    assert_eq!(t.pushes_titled("✅ Issue Resolved"), 1);
}

#[tokio::test]
async fn test_ward_member_cannot_update_other_ward() {
    let t = test_app();
    let (_, reporter) = t
        .seed_user("Reporter", "9500000001", Role::Citizen, "South", None)
        .await;
    let (_, north) = t
        .seed_user("North Member", "9500000002", Role::WardMember, "North", None)
        .await;

    let (_, complaint) = t
        .request(
            Method::POST,
            "/api/complaints",
            Some(&reporter),
            Some(json!({ "title": "Drain", "description": "Overflowing" })),
        )
        .await;
    let uri = format!("/api/complaints/{}", complaint["id"].as_str().unwrap());

    let (status, body) = t
        .request(Method::PUT, &uri, Some(&north), Some(json!({ "status": "in-progress" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "not authorized for this ward");

    let (status, _) = t
        .request(Method::PUT, &uri, Some(&reporter), Some(json!({ "status": "resolved" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_announcement_is_role_gated_and_notifies() {
    let t = test_app();
    let (_, citizen) = t
        .seed_user("Citizen", "9600000001", Role::Citizen, "Ward 3", Some("ExpoPushToken[c]"))
        .await;
    let (_, member) = t
        .seed_user("Member", "9600000002", Role::WardMember, "Ward 3", None)
        .await;
    let notice = json!({ "title": "Water cut", "content": "No supply on Sunday" });

    let (status, _) = t
        .request(Method::POST, "/api/announcements", Some(&citizen), Some(notice.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t
        .request(Method::POST, "/api/announcements", Some(&member), Some(notice))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["priority"], "normal");
    assert_eq!(t.pushes_titled("📢 Water cut"), 1);

    let (status, list) = t
        .request(Method::GET, "/api/announcements?ward=ward%203", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_business_approval_flow() {
    let t = test_app();
    let (_, admin) = t
        .seed_user("Admin", "9700000001", Role::Admin, "Ward 1", None)
        .await;
    let (_, owner) = t
        .seed_user("Owner", "9700000002", Role::Business, "Ward 1", None)
        .await;
    let (_, other) = t
        .seed_user("Other", "9700000003", Role::Citizen, "Ward 1", None)
        .await;

    let (status, by_admin) = t
        .request(Method::POST, "/api/businesses", Some(&admin), Some(json!({ "name": "Clinic" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(by_admin["status"], "active");

    let (status, listing) = t
        .request(Method::POST, "/api/businesses", Some(&owner), Some(json!({ "name": "Bakery" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(listing["status"], "pending");
    let uri = format!("/api/businesses/{}", listing["id"].as_str().unwrap());

    let (status, by_citizen) = t
        .request(Method::POST, "/api/businesses", Some(&other), Some(json!({ "name": "Tailor" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(by_citizen["status"], "pending");

    // Citizens only see active listings
    let (_, visible) = t.request(Method::GET, "/api/businesses", Some(&other), None).await;
    assert_eq!(visible.as_array().unwrap().len(), 1);
    assert_eq!(visible[0]["name"], "Clinic");
    assert_eq!(visible[0]["ownerDetails"]["name"], "Admin");

    let (_, all) = t.request(Method::GET, "/api/businesses", Some(&admin), None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    // Owners edit details but not status
    let (status, _) = t
        .request(Method::PUT, &uri, Some(&owner), Some(json!({ "status": "active" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = t
        .request(Method::PUT, &uri, Some(&owner), Some(json!({ "category": "Food" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"], "Food");

    let (status, _) = t
        .request(Method::PUT, &uri, Some(&other), Some(json!({ "name": "Mine now" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t
        .request(Method::PUT, &uri, Some(&admin), Some(json!({ "status": "active" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");

    let (_, mine) = t.request(Method::GET, "/api/businesses/my", Some(&owner), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_job_posting_requires_business_ownership() {
    let t = test_app();
    let (_, owner) = t
        .seed_user("Owner", "9800000001", Role::Business, "Ward 4", None)
        .await;
    let (_, rival) = t
        .seed_user("Rival", "9800000002", Role::Business, "Ward 4", None)
        .await;

    let (_, business) = t
        .request(Method::POST, "/api/businesses", Some(&owner), Some(json!({ "name": "Garage" })))
        .await;
    let job = json!({
        "businessId": business["id"],
        "title": "Mechanic",
        "type": "part-time"
    });

    let (status, _) = t
        .request(Method::POST, "/api/jobs", Some(&rival), Some(job.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t
        .request(Method::POST, "/api/jobs", Some(&owner), Some(job))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ward"], "Ward 4");
    assert_eq!(body["type"], "part-time");

    let (_, jobs) = t.request(Method::GET, "/api/jobs?ward=ward%204", None, None).await;
    assert_eq!(jobs.as_array().unwrap().len(), 1);
    assert_eq!(jobs[0]["businessDetails"]["name"], "Garage");
}

#[tokio::test]
async fn test_emergency_close_by_requester_only() {
    let t = test_app();
    let (requester, token) = t
        .seed_user("Requester", "9900000001", Role::Citizen, "Ward 9", None)
        .await;
    let (_, neighbour) = t
        .seed_user("Neighbour", "9900000002", Role::Citizen, "Ward 9", None)
        .await;

    let (status, emergency) = t
        .request(
            Method::POST,
            "/api/emergency",
            Some(&token),
            Some(json!({ "type": "medical", "location": "Temple road" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(emergency["contactNumber"], requester.phone.as_str());
    let uri = format!("/api/emergency/{}/close", emergency["id"].as_str().unwrap());

    let (status, _) = t.request(Method::PUT, &uri, Some(&neighbour), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t.request(Method::PUT, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isActive"], false);

    let (_, active) = t.request(Method::GET, "/api/emergency?ward=Ward%209", None, None).await;
    assert!(active.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_blood_donation_lifecycle() {
    let t = test_app();
    let (_, donor) = t
        .seed_user("Donor", "9010000001", Role::Citizen, "Ward 2", Some("ExpoPushToken[d]"))
        .await;
    let (_, requester) = t
        .seed_user("Requester", "9010000002", Role::Citizen, "Ward 2", Some("ExpoPushToken[q]"))
        .await;
    t.seed_user("Neighbour", "9010000003", Role::Citizen, "ward 2", None)
        .await;

    let (status, body) = t
        .request(
            Method::POST,
            "/api/blood-donation/register",
            Some(&donor),
            Some(json!({ "bloodGroup": "O-" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Successfully registered as blood donor");

    let (status, body) = t
        .request(
            Method::POST,
            "/api/blood-donation/register",
            Some(&donor),
            Some(json!({ "bloodGroup": "O-", "contactNumber": "9999999999" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["donor"]["contactNumber"], "9999999999");

    let (_, donors) = t
        .request(
            Method::GET,
            "/api/blood-donation/donors?compatibleWith=AB%2B",
            Some(&requester),
            None,
        )
        .await;
    let donors = donors.as_array().unwrap();
    assert_eq!(donors.len(), 1);
    assert_eq!(donors[0]["userDetails"]["name"], "Donor");

    let (status, body) = t
        .request(
            Method::POST,
            "/api/blood-donation/request",
            Some(&requester),
            Some(json!({ "bloodGroup": "AB+", "urgency": "critical" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["notifiedUsers"], 2);
    assert_eq!(body["emergency"]["type"], "blood");
    assert!(body["emergency"]["details"]
        .as_str()
        .unwrap()
        .ends_with("Urgency: critical"));
    assert_eq!(t.gateway.messages_to("ExpoPushToken[d]").len(), 1);
    assert!(t.gateway.messages_to("ExpoPushToken[q]").is_empty());

    let (status, body) = t
        .request(Method::PUT, "/api/blood-donation/complete", Some(&donor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["donor"]["isAvailable"], false);
    assert!(body["donor"]["lastDonationDate"].as_str().is_some());

    // Completing again from an unavailable state still leaves the donor unavailable
    let (status, body) = t
        .request(
            Method::PUT,
            "/api/blood-donation/availability",
            Some(&donor),
            Some(json!({ "isAvailable": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "You are now unavailable");
    let (status, body) = t
        .request(Method::PUT, "/api/blood-donation/complete", Some(&donor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["donor"]["isAvailable"], false);

    let (_, status_body) = t
        .request(Method::GET, "/api/blood-donation/my-status", Some(&donor), None)
        .await;
    assert_eq!(status_body["isRegistered"], true);

    let (status, body) = t
        .request(
            Method::PUT,
            "/api/blood-donation/availability",
            Some(&requester),
            Some(json!({ "isAvailable": true })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "You are not registered as a donor");
}

#[tokio::test]
async fn test_push_token_registration() {
    let t = test_app();
    let (user, token) = t
        .seed_user("Tokenless", "9020000001", Role::Citizen, "Ward 1", None)
        .await;

    let (status, body) = t
        .request(
            Method::POST,
            "/api/users/push-token",
            Some(&token),
            Some(json!({ "token": "ExpoPushToken[new]" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Push token registered successfully");

    let stored: User = t.state.store.get(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.expo_push_token.as_deref(), Some("ExpoPushToken[new]"));

    let (status, _) = t
        .request(Method::POST, "/api/users/push-token", Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_image_upload() {
    let t = test_app();
    let (_, token) = t
        .seed_user("Uploader", "9030000001", Role::Citizen, "Ward 1", None)
        .await;

    let upload = |content_type: String, body: Vec<u8>| {
        Request::builder()
            .method(Method::POST)
            .uri("/api/complaints/upload")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    };

    let (content_type, body) = multipart_image("notes.txt", "text/plain", b"hello");
    let (status, body) = send(t.app.clone(), upload(content_type, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Images only!");

    let (content_type, body) = multipart_image("photo.png", "image/png", b"\x89PNG fake");
    let (status, body) = send(t.app.clone(), upload(content_type, body)).await;
    assert_eq!(status, StatusCode::OK);
    let url = body["imageUrl"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/image-"));
    assert!(url.ends_with(".png"));

    let served = t
        .app
        .clone()
        .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(served.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let t = test_app();

    let (status, body) = t.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["backend"], "memory");
    assert_eq!(body["push"]["provider"], "memory");
    assert_eq!(body["push"]["mode"], "inline");

    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&text).contains("ward_store_up"));
}

#[tokio::test]
async fn test_profile_update_keeps_push_token_registered_meanwhile() {
    let backend = Arc::new(InterleavingStore::default());
    let t = test_app_with(backend.clone());
    let (user, token) = t
        .seed_user("Meera", "9030000001", Role::Citizen, "Ward 3", None)
        .await;

    // The token lands after the caller is loaded but before the profile write
    backend.after_read(
        "users",
        &user.id,
        patch_of([("expoPushToken", json!("ExpoPushToken[late]"))]),
    );

    let (status, body) = t
        .request(
            Method::PUT,
            "/api/users/profile",
            Some(&token),
            Some(json!({ "name": "Meera K", "profile": { "age": 41 } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Meera K");
    assert_eq!(body["profile"]["age"], 41);

    let stored: User = t.state.store.get(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Meera K");
    assert_eq!(stored.profile.age, Some(41));
    assert_eq!(stored.expo_push_token.as_deref(), Some("ExpoPushToken[late]"));
}

#[tokio::test]
async fn test_owner_edit_keeps_approval_made_meanwhile() {
    let backend = Arc::new(InterleavingStore::default());
    let t = test_app_with(backend.clone());
    let (_, owner) = t
        .seed_user("Owner", "9040000001", Role::Business, "Ward 6", None)
        .await;

    let (_, listing) = t
        .request(Method::POST, "/api/businesses", Some(&owner), Some(json!({ "name": "Pharmacy" })))
        .await;
    assert_eq!(listing["status"], "pending");
    let id = listing["id"].as_str().unwrap();

    // An admin approves while the owner's edit is in flight
    backend.after_read("businesses", id, patch_of([("status", json!("active"))]));

    let (status, body) = t
        .request(
            Method::PUT,
            &format!("/api/businesses/{}", id),
            Some(&owner),
            Some(json!({ "address": "Market street" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["address"], "Market street");
    assert_eq!(body["status"], "active");
}

#[tokio::test]
async fn test_admin_update_rejects_taken_phone() {
    let t = test_app();
    let (_, admin) = t
        .seed_user("Admin", "9050000001", Role::Admin, "Ward 1", None)
        .await;
    let (target, _) = t
        .seed_user("Target", "9050000002", Role::Citizen, "Ward 1", None)
        .await;
    let uri = format!("/api/users/{}", target.id);

    let (status, _) = t
        .request(Method::PUT, &uri, Some(&admin), Some(json!({ "phone": "9050000001" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = t
        .request(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "role": "ward_member", "isVerified": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "ward_member");
    assert_eq!(body["isVerified"], true);
    assert_eq!(body["phone"], "9050000002");
}
