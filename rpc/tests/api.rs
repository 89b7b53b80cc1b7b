//! Router-level tests: real handlers over nullable stores, clock and issuer.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use poap_attendance::{AttendanceLedger, ValidationPolicy, ValidationWorkflow};
use poap_badge::BadgeError;
use poap_crypto::{derive_address, keypair_from_seed, sign_message};
use poap_identity::{Ed25519Oracle, IdentityResolver, NewIdentity, SessionKeys};
use poap_nullables::{NullBadgeGateway, NullClock, NullStore};
use poap_registry::EnrollmentRegistry;
use poap_rpc::{router, AppState, RpcMetrics};
use poap_types::{IdentityAddress, Role, RoleProfile, SECS_PER_DAY};

const MORNING: u64 = 19_000 * SECS_PER_DAY + 9 * 3600;

struct TestApp {
    app: Router,
    clock: Arc<NullClock>,
    badges: Arc<NullBadgeGateway>,
    identities: Arc<IdentityResolver>,
    sessions: Arc<SessionKeys>,
    admin: IdentityAddress,
    lecturer: IdentityAddress,
    student: IdentityAddress,
}

fn addr(b: u8) -> IdentityAddress {
    IdentityAddress::from_bytes(&[b; 20])
}

impl TestApp {
    fn new() -> Self {
        Self::with_policy(ValidationPolicy::RequireMark)
    }

    fn with_policy(policy: ValidationPolicy) -> Self {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(MORNING));
        let badges = Arc::new(NullBadgeGateway::new());
        let identities = Arc::new(IdentityResolver::new(store.clone(), clock.clone()));

        let admin = addr(0xad);
        identities.bootstrap_admin(&admin, "Registrar").unwrap();
        for (b, role) in [(0x10, Role::Lecturer), (0x20, Role::Student)] {
            identities
                .create_identity(
                    &admin,
                    NewIdentity {
                        address: addr(b),
                        name: format!("user-{b}"),
                        profile: RoleProfile::empty(role),
                    },
                )
                .unwrap();
        }

        let sessions = Arc::new(
            SessionKeys::new(b"router-test-secret-0123456789", 3600, clock.clone()).unwrap(),
        );
        let registry = Arc::new(EnrollmentRegistry::new(
            store.clone(),
            identities.clone(),
            clock.clone(),
        ));
        let ledger = Arc::new(AttendanceLedger::new(store.clone(), registry.clone()));
        let workflow = Arc::new(ValidationWorkflow::new(
            ledger.clone(),
            badges.clone(),
            clock.clone(),
            policy,
        ));

        let state = AppState {
            identities: identities.clone(),
            sessions: sessions.clone(),
            oracle: Arc::new(Ed25519Oracle),
            registry,
            ledger,
            workflow,
            metrics: Arc::new(RpcMetrics::new().unwrap()),
            clock: clock.clone(),
            secure_cookies: false,
        };

        Self {
            app: router(state),
            clock,
            badges,
            identities,
            sessions,
            admin,
            lecturer: addr(0x10),
            student: addr(0x20),
        }
    }

    fn token(&self, address: &IdentityAddress) -> String {
        let identity = self.identities.resolve(address).unwrap();
        self.sessions.issue(&identity).unwrap().token
    }

    async fn raw(&self, req: Request<Body>) -> axum::response::Response {
        self.app.clone().oneshot(req).await.unwrap()
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        caller: Option<&IdentityAddress>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(caller) = caller {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", self.token(caller)));
        }
        let req = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = self.raw(req).await;
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// CS101 owned by the lecturer, with the student enrolled.
    async fn seed_class(&self) {
        let (status, _) = self
            .call(
                Method::POST,
                "/api/classes",
                Some(&self.lecturer),
                Some(json!({ "classId": "CS101", "title": "Intro to Systems" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = self
            .call(
                Method::POST,
                "/api/classes/CS101/students",
                Some(&self.lecturer),
                Some(json!({ "studentAddress": self.student.as_str() })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], true);
    }
}

#[tokio::test]
async fn health_needs_no_session() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_or_garbage_session_is_unauthorized() {
    let app = TestApp::new();
    let (status, _) = app.call(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/api/auth/me")
        .header(COOKIE, "token=not-a-jwt")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.raw(req).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wallet_login_sets_cookie_and_resolves_role() {
    let app = TestApp::new();
    let keypair = keypair_from_seed(&[7u8; 32]);
    let address = derive_address(&keypair.public);
    app.identities
        .create_identity(
            &app.admin,
            NewIdentity {
                address: address.clone(),
                name: "Ada".into(),
                profile: RoleProfile::empty(Role::Lecturer),
            },
        )
        .unwrap();

    let message = "Sign in to POAP attendance";
    let signature = sign_message(message.as_bytes(), &keypair.private);
    let body = json!({
        "address": address.as_str().to_uppercase(),
        "publicKey": hex::encode(keypair.public.as_bytes()),
        "message": message,
        "signature": hex::encode(signature.as_bytes()),
    });
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.raw(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let login: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(login["role"], "lecturer");
    assert_eq!(login["address"], address.as_str());

    let session_cookie = cookie.split(';').next().unwrap().to_string();
    let req = Request::builder()
        .uri("/api/auth/me")
        .header(COOKIE, session_cookie)
        .body(Body::empty())
        .unwrap();
    let resp = app.raw(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_rejects_bad_signature_and_unknown_account() {
    let app = TestApp::new();
    let keypair = keypair_from_seed(&[9u8; 32]);
    let address = derive_address(&keypair.public);
    let signature = sign_message(b"some other message", &keypair.private);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({
                "address": address.as_str(),
                "publicKey": hex::encode(keypair.public.as_bytes()),
                "message": "Sign in",
                "signature": hex::encode(signature.as_bytes()),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let signature = sign_message(b"Sign in", &keypair.private);
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({
                "address": address.as_str(),
                "publicKey": hex::encode(keypair.public.as_bytes()),
                "message": "Sign in",
                "signature": hex::encode(signature.as_bytes()),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mark_validate_and_reject_second_validation() {
    let app = TestApp::new();
    app.seed_class().await;

    let (status, mark) = app
        .call(
            Method::POST,
            "/api/attendance/mark",
            Some(&app.student),
            Some(json!({ "classId": "CS101" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mark["validated"], false);
    assert_eq!(mark["markedAt"], MORNING);

    let validate = json!({ "classId": "CS101", "studentIdentity": app.student.as_str() });
    let (status, body) = app
        .call(
            Method::POST,
            "/api/attendance/validate",
            Some(&app.lecturer),
            Some(validate.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["validatedAt"], MORNING);
    assert_eq!(body["badgeStatus"], "issued");
    assert!(body["badgeRef"].is_string());

    app.clock.advance(600);
    let (status, body) = app
        .call(
            Method::POST,
            "/api/attendance/validate",
            Some(&app.lecturer),
            Some(validate),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["validatedAt"], MORNING);
    assert!(body["message"].as_str().unwrap().contains("already validated"));

    let req = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let resp = app.raw(req).await;
    let text = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(text.to_vec()).unwrap();
    assert!(text.contains("poap_attendance_marks_total 1"));
    assert!(text.contains("poap_attendance_already_validated_total 1"));
}

#[tokio::test]
async fn validate_without_mark_is_not_found() {
    let app = TestApp::new();
    app.seed_class().await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/attendance/validate",
            Some(&app.lecturer),
            Some(json!({ "classId": "CS101", "studentAddress": app.student.as_str() })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn badge_outage_reports_pending_then_retry_issues() {
    let app = TestApp::new();
    app.seed_class().await;
    app.badges
        .push_outcome(Err(BadgeError::Unavailable("issuer down".into())));

    app.call(
        Method::POST,
        "/api/attendance/mark",
        Some(&app.student),
        Some(json!({ "classId": "CS101" })),
    )
    .await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/attendance/validate",
            Some(&app.lecturer),
            Some(json!({ "classId": "CS101", "studentAddress": app.student.as_str() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["badgeStatus"], "pending");
    assert!(body.get("badgeRef").is_none());
    let id = body["attendanceId"].as_u64().unwrap();

    let (status, retry) = app
        .call(
            Method::POST,
            &format!("/api/attendance/{id}/badge"),
            Some(&app.lecturer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(retry["badgeStatus"], "issued");
    assert_eq!(retry["validatedAt"], MORNING);
}

#[tokio::test]
async fn role_comes_from_the_store_not_the_token() {
    let app = TestApp::new();
    app.seed_class().await;
    let stale_token = app.token(&app.student);

    app.identities
        .assign_role(&app.admin, &app.student, Role::Lecturer)
        .unwrap();

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/attendance/mark")
        .header(AUTHORIZATION, format!("Bearer {stale_token}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "classId": "CS101" }).to_string()))
        .unwrap();
    assert_eq!(app.raw(req).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn class_endpoints_enforce_ownership() {
    let app = TestApp::new();
    app.seed_class().await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/classes",
            Some(&app.student),
            Some(json!({ "classId": "HACK1", "title": "Nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/classes",
            Some(&app.lecturer),
            Some(json!({ "classId": "CS101", "title": "Again" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/api/classes/CS101/students/{}", app.student.as_str());
    let (status, _) = app.call(Method::DELETE, &uri, Some(&app.student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.call(Method::DELETE, &uri, Some(&app.lecturer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);

    let (status, _) = app
        .call(Method::GET, "/api/classes/CS101", Some(&app.student), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::GET, "/api/classes/CS101", Some(&app.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Intro to Systems");
}

#[tokio::test]
async fn admin_provisions_accounts_and_classes() {
    let app = TestApp::new();
    let new_lecturer = addr(0x30);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/admin/accounts",
            Some(&app.admin),
            Some(json!({
                "address": new_lecturer.as_str(),
                "name": "Grace",
                "role": "lecturer",
                "department": "Mathematics",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "lecturer");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/admin/accounts",
            Some(&app.lecturer),
            Some(json!({ "address": addr(0x31).as_str(), "name": "X", "role": "student" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, class) = app
        .call(
            Method::POST,
            "/api/classes",
            Some(&app.admin),
            Some(json!({
                "classId": "MA201",
                "title": "Linear Algebra",
                "lecturer": new_lecturer.as_str(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(class["lecturer"], new_lecturer.as_str());

    let (status, accounts) = app
        .call(Method::GET, "/api/admin/accounts", Some(&app.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accounts.as_array().unwrap().len(), 4);

    let uri = format!("/api/admin/accounts/{}/role", app.admin.as_str());
    let (status, _) = app
        .call(
            Method::PUT,
            &uri,
            Some(&app.admin),
            Some(json!({ "role": "student" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn class_listing_is_paginated_newest_first() {
    let app = TestApp::new();
    app.seed_class().await;
    for _ in 0..3 {
        app.call(
            Method::POST,
            "/api/attendance/mark",
            Some(&app.student),
            Some(json!({ "classId": "CS101" })),
        )
        .await;
        app.clock.advance(60);
    }

    let (status, first) = app
        .call(
            Method::GET,
            "/api/attendance/class/CS101?count=2",
            Some(&app.student),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = first["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["markedAt"], MORNING + 120);
    assert_eq!(items[1]["markedAt"], MORNING + 60);

    let cursor = first["cursor"].as_str().unwrap();
    let (_, second) = app
        .call(
            Method::GET,
            &format!("/api/attendance/class/CS101?count=2&cursor={cursor}"),
            Some(&app.lecturer),
            None,
        )
        .await;
    let items = second["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["markedAt"], MORNING);
    assert!(second.get("cursor").is_none());

    let (status, _) = app
        .call(
            Method::GET,
            "/api/attendance/class/CS101",
            Some(&app.admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn student_stats_and_profile() {
    let app = TestApp::new();
    app.seed_class().await;
    app.call(
        Method::POST,
        "/api/attendance/mark",
        Some(&app.student),
        Some(json!({ "classId": "CS101" })),
    )
    .await;
    app.call(
        Method::POST,
        "/api/attendance/validate",
        Some(&app.lecturer),
        Some(json!({ "classId": "CS101", "studentAddress": app.student.as_str() })),
    )
    .await;

    let (status, stats) = app
        .call(
            Method::GET,
            "/api/student/attendance/stats",
            Some(&app.student),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats[0]["classTitle"], "Intro to Systems");
    assert_eq!(stats[0]["total"], 1);
    assert_eq!(stats[0]["validated"], 1);

    let (status, profile) = app
        .call(Method::GET, "/api/student/profile", Some(&app.student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["enrolledClasses"].as_array().unwrap().len(), 1);
    assert_eq!(profile["attendance"][0]["validated"], true);

    let (status, _) = app
        .call(
            Method::GET,
            "/api/student/attendance/stats",
            Some(&app.lecturer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn profile_update_keeps_role() {
    let app = TestApp::new();
    let (status, body) = app
        .call(
            Method::PUT,
            "/api/profile",
            Some(&app.student),
            Some(json!({ "name": "Renamed", "studentId": "S-42" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["role"], "student");

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/profile",
            Some(&app.student),
            Some(json!({ "department": "Physics" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lecturer_initiated_validation_takes_a_date() {
    let app = TestApp::with_policy(ValidationPolicy::LecturerInitiated);
    app.seed_class().await;
    let validate = |date: &str| {
        json!({
            "classId": "CS101",
            "studentIdentity": app.student.as_str(),
            "date": date,
        })
    };

    // MORNING falls on 2022-01-08.
    let (status, body) = app
        .call(
            Method::POST,
            "/api/attendance/validate",
            Some(&app.lecturer),
            Some(validate("2022-01-07")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["validatedAt"], 18_999 * SECS_PER_DAY);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/attendance/validate",
            Some(&app.lecturer),
            Some(validate("2022-01-07T16:30:00Z")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["validatedAt"], 18_999 * SECS_PER_DAY);

    for bad in ["2022-01-09", "yesterday"] {
        let (status, _) = app
            .call(
                Method::POST,
                "/api/attendance/validate",
                Some(&app.lecturer),
                Some(validate(bad)),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
    }

    let (status, body) = app
        .call(
            Method::POST,
            "/api/attendance/validate",
            Some(&app.lecturer),
            Some(json!({ "classId": "CS101", "studentIdentity": app.student.as_str() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["validatedAt"], MORNING);
}

#[tokio::test]
async fn require_mark_refuses_a_date() {
    let app = TestApp::new();
    app.seed_class().await;
    app.call(
        Method::POST,
        "/api/attendance/mark",
        Some(&app.student),
        Some(json!({ "classId": "CS101" })),
    )
    .await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/attendance/validate",
            Some(&app.lecturer),
            Some(json!({
                "classId": "CS101",
                "studentAddress": app.student.as_str(),
                "date": "2022-01-08",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lecturer_updates_and_deletes_classes() {
    let app = TestApp::new();
    app.seed_class().await;

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/classes/CS101",
            Some(&app.student),
            Some(json!({ "name": "Hijacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/classes/CS101",
            Some(&app.lecturer),
            Some(json!({ "name": "Systems II", "description": "Kernels" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Systems II");
    assert_eq!(body["description"], "Kernels");
    assert_eq!(body["students"].as_array().unwrap().len(), 1);

    app.call(
        Method::POST,
        "/api/attendance/mark",
        Some(&app.student),
        Some(json!({ "classId": "CS101" })),
    )
    .await;
    let (status, _) = app
        .call(Method::DELETE, "/api/classes/CS101", Some(&app.lecturer), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/classes",
            Some(&app.lecturer),
            Some(json!({ "classId": "EMPTY1", "title": "Never held" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .call(Method::DELETE, "/api/classes/EMPTY1", Some(&app.student), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .call(Method::DELETE, "/api/classes/EMPTY1", Some(&app.lecturer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Class deleted successfully");
    let (status, _) = app
        .call(Method::GET, "/api/classes/EMPTY1", Some(&app.lecturer), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lecturer_edits_enrolled_student_details() {
    let app = TestApp::new();
    app.seed_class().await;
    let uri = format!("/api/classes/CS101/students/{}", app.student.as_str());

    let (status, body) = app
        .call(
            Method::PUT,
            &uri,
            Some(&app.lecturer),
            Some(json!({ "name": "Ada Lovelace", "studentId": "S-9" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada Lovelace");
    assert_eq!(body["profile"]["student"]["student_id"], "S-9");

    let (status, _) = app
        .call(
            Method::PUT,
            &uri,
            Some(&app.student),
            Some(json!({ "name": "Self" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let stranger = format!("/api/classes/CS101/students/{}", addr(0x77).as_str());
    let (status, _) = app
        .call(
            Method::PUT,
            &stranger,
            Some(&app.lecturer),
            Some(json!({ "name": "Nobody" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn account_deletion_refuses_referenced_accounts() {
    let app = TestApp::new();
    app.seed_class().await;
    let spare = addr(0x40);
    app.identities
        .create_identity(
            &app.admin,
            NewIdentity {
                address: spare.clone(),
                name: "Spare".into(),
                profile: RoleProfile::empty(Role::Student),
            },
        )
        .unwrap();

    let uri = |a: &IdentityAddress| format!("/api/admin/accounts/{}", a.as_str());
    let (status, _) = app
        .call(Method::DELETE, &uri(&spare), Some(&app.lecturer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for referenced in [&app.lecturer, &app.student] {
        let (status, _) = app
            .call(Method::DELETE, &uri(referenced), Some(&app.admin), None)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    // Unenrolled, but attendance still names the student.
    app.call(
        Method::POST,
        "/api/attendance/mark",
        Some(&app.student),
        Some(json!({ "classId": "CS101" })),
    )
    .await;
    app.call(
        Method::DELETE,
        &format!("/api/classes/CS101/students/{}", app.student.as_str()),
        Some(&app.lecturer),
        None,
    )
    .await;
    let (status, _) = app
        .call(Method::DELETE, &uri(&app.student), Some(&app.admin), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(Method::DELETE, &uri(&spare), Some(&app.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Account deleted successfully");
    let (status, _) = app
        .call(Method::DELETE, &uri(&spare), Some(&app.admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, accounts) = app
        .call(Method::GET, "/api/admin/accounts", Some(&app.admin), None)
        .await;
    assert_eq!(accounts.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn student_lists_issued_badges() {
    let app = TestApp::new();
    app.seed_class().await;
    app.call(
        Method::POST,
        "/api/attendance/mark",
        Some(&app.student),
        Some(json!({ "classId": "CS101" })),
    )
    .await;
    let (_, validated) = app
        .call(
            Method::POST,
            "/api/attendance/validate",
            Some(&app.lecturer),
            Some(json!({ "classId": "CS101", "studentAddress": app.student.as_str() })),
        )
        .await;
    app.call(
        Method::POST,
        "/api/attendance/mark",
        Some(&app.student),
        Some(json!({ "classId": "CS101" })),
    )
    .await;

    let (status, badges) = app
        .call(Method::GET, "/api/student/badges", Some(&app.student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let badges = badges.as_array().unwrap();
    assert_eq!(badges.len(), 1);
    assert_eq!(badges[0]["badgeRef"], validated["badgeRef"]);
    assert_eq!(badges[0]["classId"], "CS101");
    assert_eq!(badges[0]["validatedAt"], MORNING);

    let (status, _) = app
        .call(Method::GET, "/api/student/badges", Some(&app.lecturer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
