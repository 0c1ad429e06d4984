#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use escola_api::app::{app, AppState};
use escola_api::auth::password::hash_password;
use escola_api::config::AppConfig;
use escola_api::database::models::*;
use escola_api::database::MemoryStore;
use escola_api::types::Role;

pub const PASSWORD: &str = "senha-correta-123";

// Argon2 is slow in debug builds; every seeded user shares one hash
static PASSWORD_HASH: Lazy<String> =
    Lazy::new(|| hash_password(PASSWORD, None).expect("hash test password"));

/// Two schools. In school one: classrooms A and B, a teacher assigned to A
/// (and formerly to B), a student enrolled in A, a second student enrolled
/// in B, a guardian of both, a secretary. School two holds classroom C and
/// its own secretary.
pub struct World {
    pub store: MemoryStore,
    pub state: AppState,
    pub router: Router,

    pub school: Uuid,
    pub other_school: Uuid,

    pub admin: Uuid,
    pub secretary: Uuid,
    pub other_secretary: Uuid,
    pub teacher: Uuid,
    pub student_user: Uuid,
    pub sibling_user: Uuid,
    pub guardian: Uuid,
    pub idle_teacher: Uuid,

    pub classroom_a: Uuid,
    pub classroom_b: Uuid,
    pub classroom_c: Uuid,

    pub enrollment_a: Uuid,
    pub classmate_enrollment_a: Uuid,
    pub enrollment_b: Uuid,
    pub enrollment_c: Uuid,

    pub assessment_a: Uuid,
    pub assessment_b: Uuid,
    pub assessment_c: Uuid,

    pub grade_a: Uuid,
    pub classmate_grade_a: Uuid,
    pub grade_b: Uuid,

    pub session_a: Uuid,
}

impl World {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let now = Utc::now();

        let school = Uuid::new_v4();
        let other_school = Uuid::new_v4();
        for (id, name) in [(school, "Escola Centro"), (other_school, "Escola Norte")] {
            store.insert_school(School {
                id,
                name: name.to_string(),
                is_active: true,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            });
        }

        let user = |tenant: Option<Uuid>, email: &str, role: Role| {
            let id = Uuid::new_v4();
            store.insert_user(User {
                id,
                tenant_id: tenant,
                name: email.to_string(),
                email: email.to_string(),
                role,
                password_hash: PASSWORD_HASH.clone(),
                is_active: true,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            });
            id
        };

        let admin = user(None, "admin@escola.br", Role::AdminGlobal);
        let secretary = user(Some(school), "secretaria@centro.br", Role::Secretary);
        let other_secretary = user(Some(other_school), "secretaria@norte.br", Role::Secretary);
        let teacher = user(Some(school), "prof@centro.br", Role::Teacher);
        let idle_teacher = user(Some(school), "sem-turma@centro.br", Role::Teacher);
        let student_user = user(Some(school), "aluno@centro.br", Role::Student);
        let sibling_user = user(Some(school), "irmao@centro.br", Role::Student);
        let classmate_user = user(Some(school), "colega@centro.br", Role::Student);
        let guardian = user(Some(school), "responsavel@centro.br", Role::Guardian);

        let classroom = |tenant: Uuid, name: &str| {
            let id = Uuid::new_v4();
            store.insert_classroom(Classroom {
                id,
                tenant_id: tenant,
                name: name.to_string(),
                school_year: 2025,
            });
            id
        };
        let classroom_a = classroom(school, "7A");
        let classroom_b = classroom(school, "8B");
        let classroom_c = classroom(other_school, "9C");

        let subject = Uuid::new_v4();
        store.link_teacher(TeacherClassroomLink {
            id: Uuid::new_v4(),
            tenant_id: school,
            teacher_id: teacher,
            classroom_id: classroom_a,
            subject_id: subject,
            valid_from: now - Duration::days(60),
            valid_to: None,
            deleted_at: None,
        });
        store.link_teacher(TeacherClassroomLink {
            id: Uuid::new_v4(),
            tenant_id: school,
            teacher_id: teacher,
            classroom_id: classroom_b,
            subject_id: subject,
            valid_from: now - Duration::days(365),
            valid_to: Some(now - Duration::days(90)),
            deleted_at: None,
        });

        let profile = |tenant: Uuid, user_id: Uuid| {
            let id = Uuid::new_v4();
            store.insert_student(StudentProfile {
                id,
                tenant_id: tenant,
                user_id,
                name: "Aluno".to_string(),
                deleted_at: None,
            });
            id
        };
        let student = profile(school, student_user);
        let sibling = profile(school, sibling_user);
        let classmate = profile(school, classmate_user);
        let outsider = Uuid::new_v4();

        for student_id in [student, sibling] {
            store.link_guardian(GuardianStudentLink {
                tenant_id: school,
                guardian_id: guardian,
                student_id,
                deleted_at: None,
            });
        }

        let enroll = |tenant: Uuid, student_id: Uuid, classroom_id: Uuid| {
            let id = Uuid::new_v4();
            store.insert_enrollment(Enrollment {
                id,
                tenant_id: tenant,
                student_id,
                classroom_id,
                status: EnrollmentStatus::Ativa,
                enrolled_at: now - Duration::days(30),
                deleted_at: None,
            });
            id
        };
        let enrollment_a = enroll(school, student, classroom_a);
        let classmate_enrollment_a = enroll(school, classmate, classroom_a);
        let enrollment_b = enroll(school, sibling, classroom_b);
        let enrollment_c = enroll(other_school, outsider, classroom_c);

        let assess = |tenant: Uuid, classroom_id: Uuid| {
            let id = Uuid::new_v4();
            store.insert_assessment(Assessment {
                id,
                tenant_id: tenant,
                classroom_id,
                subject_id: subject,
                title: "Prova 1".to_string(),
                max_score: Some(Decimal::new(10, 0)),
                held_on: NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date"),
            });
            id
        };
        let assessment_a = assess(school, classroom_a);
        let assessment_b = assess(school, classroom_b);
        let assessment_c = assess(other_school, classroom_c);

        let grade = |assessment_id: Uuid, enrollment_id: Uuid, classroom_id: Uuid, score: Decimal| {
            let id = Uuid::new_v4();
            store.insert_grade(Grade {
                id,
                tenant_id: school,
                assessment_id,
                enrollment_id,
                classroom_id,
                score,
                created_at: now,
                updated_at: now,
            });
            id
        };
        let grade_a = grade(assessment_a, enrollment_a, classroom_a, Decimal::new(70, 1));
        let classmate_grade_a = grade(assessment_a, classmate_enrollment_a, classroom_a, Decimal::new(55, 1));
        let grade_b = grade(assessment_b, enrollment_b, classroom_b, Decimal::new(90, 1));

        let session_a = Uuid::new_v4();
        store.insert_attendance_session(AttendanceSession {
            id: session_a,
            tenant_id: school,
            classroom_id: classroom_a,
            held_on: NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date"),
        });
        for (enrollment_id, status) in [
            (enrollment_a, AttendanceStatus::Presente),
            (classmate_enrollment_a, AttendanceStatus::Falta),
        ] {
            store.insert_attendance_record(AttendanceRecord {
                id: Uuid::new_v4(),
                tenant_id: school,
                session_id: session_a,
                classroom_id: classroom_a,
                enrollment_id,
                status,
            });
        }

        let state = AppState::new(AppConfig::development(), Arc::new(store.clone())).expect("app state");
        let router = app(state.clone());

        Self {
            store,
            state,
            router,
            school,
            other_school,
            admin,
            secretary,
            other_secretary,
            teacher,
            student_user,
            sibling_user,
            guardian,
            idle_teacher,
            classroom_a,
            classroom_b,
            classroom_c,
            enrollment_a,
            classmate_enrollment_a,
            enrollment_b,
            enrollment_c,
            assessment_a,
            assessment_b,
            assessment_c,
            grade_a,
            classmate_grade_a,
            grade_b,
            session_a,
        }
    }

    /// Token for `user` as login would have issued it at this moment
    pub fn token(&self, user: Uuid, tenant: Option<Uuid>, role: Role) -> String {
        self.state
            .codec
            .issue(user, tenant, role, self.state.codec.default_ttl())
            .expect("issue token")
            .token
    }

    pub fn token_for(&self, user: Uuid) -> String {
        let (tenant, role) = if user == self.admin {
            (None, Role::AdminGlobal)
        } else if user == self.secretary {
            (Some(self.school), Role::Secretary)
        } else if user == self.other_secretary {
            (Some(self.other_school), Role::Secretary)
        } else if user == self.teacher || user == self.idle_teacher {
            (Some(self.school), Role::Teacher)
        } else if user == self.guardian {
            (Some(self.school), Role::Guardian)
        } else {
            (Some(self.school), Role::Student)
        };
        self.token(user, tenant, role)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, None, Some(body)).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send_raw(method, uri, token, body.map(|body| body.to_string())).await
    }

    /// Like [`World::send`], with the request body passed through untouched
    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body)),
            None => request.body(Body::empty()),
        }
        .expect("build request");

        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

/// Ids of the `data` array of a list response
pub fn ids(body: &Value) -> Vec<Uuid> {
    body["data"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row["id"].as_str().and_then(|id| id.parse().ok()))
                .collect()
        })
        .unwrap_or_default()
}
