//! Request handlers and their JSON shapes.

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;

use poap_attendance::{AttendanceError, BadgeStatus, ClassAttendanceStats, ValidationOutcome};
use poap_identity::{LoginProof, NewIdentity, ProfileUpdate};
use poap_registry::{ClassUpdate, NewClass, StudentDetails};
use poap_store::{AttendanceRecord, ClassRecord};
use poap_types::{
    AdminPermission, AttendanceId, BadgeRef, ClassId, DayIndex, Identity, IdentityAddress, Role,
    RoleProfile, Timestamp,
};

use crate::pagination::{paginate, Page, PaginationParams};
use crate::session::{cleared_cookie, session_cookie};
use crate::{AppState, RpcError, Session};

// ── Views ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    pub address: IdentityAddress,
    pub name: String,
    pub role: Role,
    pub profile: RoleProfile,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Identity> for IdentityView {
    fn from(identity: Identity) -> Self {
        let role = identity.role();
        Self {
            address: identity.header.address,
            name: identity.header.name,
            role,
            profile: identity.profile,
            created_at: identity.header.created_at,
            updated_at: identity.header.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassView {
    pub class_id: ClassId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub lecturer: IdentityAddress,
    pub students: BTreeSet<IdentityAddress>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<ClassRecord> for ClassView {
    fn from(class: ClassRecord) -> Self {
        Self {
            class_id: class.class_id,
            title: class.title,
            description: class.description,
            lecturer: class.lecturer,
            students: class.students,
            created_at: class.created_at,
            updated_at: class.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceView {
    pub id: AttendanceId,
    pub class_id: ClassId,
    pub student: IdentityAddress,
    pub marked_at: Option<Timestamp>,
    pub validated: bool,
    pub validated_at: Option<Timestamp>,
    pub badge_ref: Option<BadgeRef>,
}

impl From<AttendanceRecord> for AttendanceView {
    fn from(record: AttendanceRecord) -> Self {
        Self {
            id: record.id,
            class_id: record.class_id,
            student: record.student,
            marked_at: record.marked_at,
            validated: record.validated,
            validated_at: record.validated_at,
            badge_ref: record.badge_ref,
        }
    }
}

fn class_id(raw: &str) -> Result<ClassId, RpcError> {
    Ok(ClassId::parse(raw)?)
}

fn address(raw: &str) -> Result<IdentityAddress, RpcError> {
    Ok(IdentityAddress::parse(raw)?)
}

/// An ISO 8601 date (`2024-03-05`) or RFC 3339 instant, as its UTC day.
fn utc_day(raw: &str) -> Result<DayIndex, RpcError> {
    let invalid = || RpcError::InvalidRequest(format!("invalid date: {raw}"));
    let date = match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => DateTime::parse_from_rfc3339(raw)
            .map_err(|_| invalid())?
            .with_timezone(&Utc)
            .date_naive(),
    };
    let secs = date
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().timestamp())
        .ok_or_else(invalid)?;
    let secs = u64::try_from(secs).map_err(|_| invalid())?;
    Ok(Timestamp::new(secs).day())
}

// ── Health & metrics ─────────────────────────────────────────────────────

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, RpcError> {
    let body = state
        .metrics
        .encode_text()
        .map_err(|e| RpcError::Internal(format!("encode metrics: {e}")))?;
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    ))
}

// ── Auth ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub address: IdentityAddress,
    pub role: Role,
    pub token: String,
    pub expires_at: Timestamp,
}

pub async fn login(
    State(state): State<AppState>,
    Json(proof): Json<LoginProof>,
) -> Result<impl IntoResponse, RpcError> {
    let address = state.oracle.verify(&proof)?;
    let identity = state.identities.resolve(&address)?;
    let session = state.sessions.issue(&identity)?;
    state.metrics.logins.inc();
    tracing::info!(address = %address, role = %identity.role(), "login");

    let cookie = session_cookie(&session.token, state.sessions.ttl_secs(), state.secure_cookies);
    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            address,
            role: identity.role(),
            token: session.token,
            expires_at: session.expires_at,
        }),
    ))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(SET_COOKIE, cleared_cookie(state.secure_cookies))],
        Json(json!({ "message": "Logout successful" })),
    )
}

pub async fn me(session: Session) -> Json<IdentityView> {
    Json(session.identity.into())
}

// ── Accounts ─────────────────────────────────────────────────────────────

pub async fn list_accounts(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<IdentityView>>, RpcError> {
    let accounts = state.identities.list(session.address())?;
    Ok(Json(accounts.into_iter().map(IdentityView::from).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub address: String,
    pub name: String,
    pub role: String,
    pub student_id: Option<String>,
    pub graduation_date: Option<Timestamp>,
    pub department: Option<String>,
    pub specialization: Option<String>,
}

impl CreateAccountRequest {
    fn profile(&self) -> Result<RoleProfile, RpcError> {
        let role: Role = self.role.parse()?;
        let student_fields = self.student_id.is_some() || self.graduation_date.is_some();
        let lecturer_fields = self.department.is_some() || self.specialization.is_some();
        let misplaced = match role {
            Role::Student => lecturer_fields,
            Role::Lecturer => student_fields,
            Role::Admin => student_fields || lecturer_fields,
        };
        if misplaced {
            return Err(RpcError::InvalidRequest(format!(
                "fields given that do not apply to role {role}"
            )));
        }
        Ok(match role {
            Role::Student => RoleProfile::Student {
                student_id: self.student_id.as_deref().unwrap_or_default().trim().to_string(),
                graduation_date: self.graduation_date,
            },
            Role::Lecturer => RoleProfile::Lecturer {
                department: self.department.as_deref().unwrap_or_default().trim().to_string(),
                specialization: self.specialization.clone(),
            },
            Role::Admin => RoleProfile::Admin {
                permissions: AdminPermission::ALL.to_vec(),
                super_admin: false,
            },
        })
    }
}

pub async fn create_account(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<IdentityView>), RpcError> {
    let new = NewIdentity {
        address: address(&req.address)?,
        name: req.name.clone(),
        profile: req.profile()?,
    };
    let identity = state.identities.create_identity(session.address(), new)?;
    Ok((StatusCode::CREATED, Json(identity.into())))
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
}

pub async fn assign_role(
    State(state): State<AppState>,
    session: Session,
    Path(target): Path<String>,
    Json(req): Json<AssignRoleRequest>,
) -> Result<Json<IdentityView>, RpcError> {
    let role: Role = req.role.parse()?;
    let identity = state
        .identities
        .assign_role(session.address(), &address(&target)?, role)?;
    Ok(Json(identity.into()))
}

/// Refuses while a class or attendance record still names the account.
pub async fn delete_account(
    State(state): State<AppState>,
    session: Session,
    Path(target): Path<String>,
) -> Result<Json<Value>, RpcError> {
    session.require(Role::Admin)?;
    let target = address(&target)?;
    if state.registry.references_account(&target)? || state.ledger.has_student_records(&target)? {
        return Err(RpcError::Conflict(format!(
            "{target} is still referenced by classes or attendance records"
        )));
    }
    state.identities.delete_identity(session.address(), &target)?;
    Ok(Json(json!({ "message": "Account deleted successfully" })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub student_id: Option<String>,
    pub graduation_date: Option<Timestamp>,
    pub department: Option<String>,
    pub specialization: Option<String>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<IdentityView>, RpcError> {
    let update = ProfileUpdate {
        name: req.name,
        student_id: req.student_id,
        graduation_date: req.graduation_date,
        department: req.department,
        specialization: req.specialization,
    };
    let identity = state.identities.update_profile(session.address(), update)?;
    Ok(Json(identity.into()))
}

// ── Classes ──────────────────────────────────────────────────────────────

pub async fn list_classes(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<ClassView>>, RpcError> {
    let classes = state.registry.classes_for(&session.identity)?;
    Ok(Json(classes.into_iter().map(ClassView::from).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassRequest {
    pub class_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Owning lecturer when an administrator creates the class.
    pub lecturer: Option<String>,
}

pub async fn create_class(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateClassRequest>,
) -> Result<(StatusCode, Json<ClassView>), RpcError> {
    let new = NewClass {
        class_id: class_id(&req.class_id)?,
        title: req.title,
        description: req.description,
    };
    let class = match req.lecturer.as_deref() {
        Some(lecturer) => {
            state
                .registry
                .provision_class(session.address(), &address(lecturer)?, new)?
        }
        None => state.registry.create_class(session.address(), new)?,
    };
    Ok((StatusCode::CREATED, Json(class.into())))
}

pub async fn get_class(
    State(state): State<AppState>,
    session: Session,
    Path(raw_class): Path<String>,
) -> Result<Json<ClassView>, RpcError> {
    let class = state
        .registry
        .class_visible_to(&class_id(&raw_class)?, &session.identity)?;
    Ok(Json(class.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClassRequest {
    #[serde(alias = "name")]
    pub title: Option<String>,
    pub description: Option<String>,
}

pub async fn update_class(
    State(state): State<AppState>,
    session: Session,
    Path(raw_class): Path<String>,
    Json(req): Json<UpdateClassRequest>,
) -> Result<Json<ClassView>, RpcError> {
    let update = ClassUpdate {
        title: req.title,
        description: req.description,
    };
    let class = state
        .registry
        .update_class(&class_id(&raw_class)?, session.address(), update)?;
    Ok(Json(class.into()))
}

/// Refuses while attendance records exist for the class.
pub async fn delete_class(
    State(state): State<AppState>,
    session: Session,
    Path(raw_class): Path<String>,
) -> Result<Json<Value>, RpcError> {
    let class_id = class_id(&raw_class)?;
    state.registry.owned_class(&class_id, session.address())?;
    if state.ledger.has_class_records(&class_id)? {
        return Err(RpcError::Conflict(format!(
            "class {class_id} has attendance records"
        )));
    }
    state.registry.delete_class(&class_id, session.address())?;
    Ok(Json(json!({ "message": "Class deleted successfully" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    #[serde(alias = "studentIdentity")]
    pub student_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub class_id: ClassId,
    pub student_address: IdentityAddress,
    /// Whether the enrolled set changed.
    pub changed: bool,
}

pub async fn enroll_student(
    State(state): State<AppState>,
    session: Session,
    Path(raw_class): Path<String>,
    Json(req): Json<EnrollRequest>,
) -> Result<Json<EnrollmentResponse>, RpcError> {
    let class_id = class_id(&raw_class)?;
    let student = address(&req.student_address)?;
    let changed = state.registry.enroll(&class_id, session.address(), &student)?;
    Ok(Json(EnrollmentResponse {
        class_id,
        student_address: student,
        changed,
    }))
}

pub async fn unenroll_student(
    State(state): State<AppState>,
    session: Session,
    Path((raw_class, raw_student)): Path<(String, String)>,
) -> Result<Json<EnrollmentResponse>, RpcError> {
    let class_id = class_id(&raw_class)?;
    let student = address(&raw_student)?;
    let changed = state
        .registry
        .unenroll(&class_id, session.address(), &student)?;
    Ok(Json(EnrollmentResponse {
        class_id,
        student_address: student,
        changed,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditStudentRequest {
    pub name: Option<String>,
    pub student_id: Option<String>,
}

pub async fn edit_student(
    State(state): State<AppState>,
    session: Session,
    Path((raw_class, raw_student)): Path<(String, String)>,
    Json(req): Json<EditStudentRequest>,
) -> Result<Json<IdentityView>, RpcError> {
    let details = StudentDetails {
        name: req.name,
        student_id: req.student_id,
    };
    let student = state.registry.edit_student(
        &class_id(&raw_class)?,
        session.address(),
        &address(&raw_student)?,
        details,
    )?;
    Ok(Json(student.into()))
}

// ── Attendance ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    pub class_id: String,
}

pub async fn mark_attendance(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<MarkRequest>,
) -> Result<(StatusCode, Json<AttendanceView>), RpcError> {
    session.require(Role::Student)?;
    let record = state.ledger.mark_attendance(
        &class_id(&req.class_id)?,
        session.address(),
        state.clock.now(),
    )?;
    state.metrics.marks.inc();
    Ok((StatusCode::OK, Json(record.into())))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub class_id: String,
    #[serde(alias = "studentIdentity")]
    pub student_address: String,
    /// Day to record, lecturer-initiated policy only. Defaults to today.
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub message: &'static str,
    pub attendance_id: AttendanceId,
    pub validated_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_ref: Option<BadgeRef>,
    pub badge_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_error: Option<String>,
}

impl ValidationResponse {
    fn new(message: &'static str, outcome: ValidationOutcome) -> Self {
        let badge_error = match &outcome.badge {
            BadgeStatus::Issued { .. } => None,
            BadgeStatus::Failed { reason } | BadgeStatus::Pending { reason } => {
                Some(reason.clone())
            }
        };
        Self {
            message,
            attendance_id: outcome.record.id,
            validated_at: outcome.validated_at,
            badge_ref: outcome.badge.badge_ref().cloned(),
            badge_status: outcome.badge.label(),
            badge_error,
        }
    }
}

fn observe_badge(state: &AppState, badge: &BadgeStatus) {
    if !matches!(badge, BadgeStatus::Issued { .. }) {
        state
            .metrics
            .badge_failures
            .with_label_values(&[badge.label()])
            .inc();
    }
}

pub async fn validate_attendance(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidationResponse>, RpcError> {
    let class_id = class_id(&req.class_id)?;
    let student = address(&req.student_address)?;
    let day = req.date.as_deref().map(utc_day).transpose()?;

    let outcome = match state
        .workflow
        .validate_on(&class_id, session.address(), &student, day)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            if matches!(e, AttendanceError::AlreadyValidated { .. }) {
                state.metrics.already_validated.inc();
            }
            return Err(e.into());
        }
    };

    state
        .metrics
        .validations
        .with_label_values(&[state.workflow.policy().as_str()])
        .inc();
    observe_badge(&state, &outcome.badge);
    Ok(Json(ValidationResponse::new(
        "Attendance validated successfully",
        outcome,
    )))
}

pub async fn retry_badge(
    State(state): State<AppState>,
    session: Session,
    Path(raw_id): Path<String>,
) -> Result<Json<ValidationResponse>, RpcError> {
    let id: AttendanceId = raw_id.parse()?;
    let outcome = state.workflow.retry_badge(id, session.address()).await?;
    observe_badge(&state, &outcome.badge);
    Ok(Json(ValidationResponse::new("Badge issuance retried", outcome)))
}

pub async fn class_attendance(
    State(state): State<AppState>,
    session: Session,
    Path(raw_class): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Page<AttendanceView>>, RpcError> {
    let records = state
        .ledger
        .class_records(&class_id(&raw_class)?, session.address())?;
    let page = paginate(records, &params);
    Ok(Json(Page {
        items: page.items.into_iter().map(AttendanceView::from).collect(),
        cursor: page.cursor,
    }))
}

// ── Student ──────────────────────────────────────────────────────────────

pub async fn attendance_stats(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<ClassAttendanceStats>>, RpcError> {
    session.require(Role::Student)?;
    Ok(Json(state.ledger.attendance_stats(session.address())?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeView {
    pub attendance_id: AttendanceId,
    pub class_id: ClassId,
    pub badge_ref: BadgeRef,
    pub validated_at: Option<Timestamp>,
}

pub async fn student_badges(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<BadgeView>>, RpcError> {
    session.require(Role::Student)?;
    let badges = state
        .ledger
        .student_badges(session.address())?
        .into_iter()
        .filter_map(|record| {
            Some(BadgeView {
                badge_ref: record.badge_ref?,
                attendance_id: record.id,
                class_id: record.class_id,
                validated_at: record.validated_at,
            })
        })
        .collect();
    Ok(Json(badges))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfileResponse {
    pub profile: IdentityView,
    pub enrolled_classes: Vec<ClassView>,
    pub attendance: Vec<AttendanceView>,
}

pub async fn student_profile(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<StudentProfileResponse>, RpcError> {
    session.require(Role::Student)?;
    let classes = state.registry.classes_for(&session.identity)?;
    let records = state.ledger.student_records(session.address())?;
    Ok(Json(StudentProfileResponse {
        profile: session.identity.into(),
        enrolled_classes: classes.into_iter().map(ClassView::from).collect(),
        attendance: records.into_iter().map(AttendanceView::from).collect(),
    }))
}
