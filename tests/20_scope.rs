mod common;

use axum::http::StatusCode;
use chrono::Utc;
use uuid::Uuid;

use common::{ids, World};
use escola_api::database::models::User;
use escola_api::types::Role;

fn sorted(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    ids.sort();
    ids
}

#[tokio::test]
async fn teacher_sees_only_open_assignments() {
    let world = World::new();
    let token = world.token_for(world.teacher);

    let (status, body) = world.get("/api/classrooms", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![world.classroom_a]);

    // Assignment to B ended, C is another school
    for classroom in [world.classroom_b, world.classroom_c] {
        let (status, _) = world
            .get(&format!("/api/classrooms/{}", classroom), Some(&token))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (_, body) = world.get("/api/grades", Some(&token)).await;
    assert_eq!(sorted(ids(&body)), sorted(vec![world.grade_a, world.classmate_grade_a]));

    // Filtering on the closed classroom's assessment cannot widen the scope
    let (status, body) = world
        .get(&format!("/api/grades?assessmentId={}", world.assessment_b), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&body).is_empty());

    let (status, _) = world
        .get(&format!("/api/grades/{}", world.grade_b), Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn teacher_without_links_gets_empty_lists() {
    let world = World::new();
    let token = world.token_for(world.idle_teacher);

    for uri in ["/api/classrooms", "/api/assessments", "/api/enrollments", "/api/grades"] {
        let (status, body) = world.get(uri, Some(&token)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(ids(&body).is_empty(), "{uri}");
    }
}

#[tokio::test]
async fn student_sees_only_own_enrollment_rows() {
    let world = World::new();
    let token = world.token_for(world.student_user);

    let (_, body) = world.get("/api/classrooms", Some(&token)).await;
    assert_eq!(ids(&body), vec![world.classroom_a]);

    let (_, body) = world.get("/api/grades", Some(&token)).await;
    assert_eq!(ids(&body), vec![world.grade_a]);

    // Filtering by classroom does not widen an enrollment-level scope
    let (_, body) = world
        .get(&format!("/api/enrollments?classroomId={}", world.classroom_a), Some(&token))
        .await;
    assert_eq!(ids(&body), vec![world.enrollment_a]);

    let (_, body) = world.get("/api/attendance/records", Some(&token)).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["enrollmentId"], world.enrollment_a.to_string());
}

#[tokio::test]
async fn out_of_scope_fetch_is_forbidden_and_absent_is_not_found() {
    let world = World::new();
    let token = world.token_for(world.student_user);

    let (status, body) = world
        .get(&format!("/api/grades/{}", world.classmate_grade_a), Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "acesso negado");

    let (status, _) = world
        .get(&format!("/api/enrollments/{}", world.classmate_enrollment_a), Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = world
        .get(&format!("/api/grades/{}", Uuid::new_v4()), Some(&token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = world
        .get(&format!("/api/grades/{}", world.grade_a), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn guardian_sees_every_linked_student() {
    let world = World::new();
    let token = world.token_for(world.guardian);

    let (_, body) = world.get("/api/classrooms", Some(&token)).await;
    assert_eq!(sorted(ids(&body)), sorted(vec![world.classroom_a, world.classroom_b]));

    let (status, body) = world.get("/api/assessments", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sorted(ids(&body)), sorted(vec![world.assessment_a, world.assessment_b]));

    let (_, body) = world.get("/api/grades", Some(&token)).await;
    assert_eq!(sorted(ids(&body)), sorted(vec![world.grade_a, world.grade_b]));

    let (status, _) = world
        .get(&format!("/api/grades/{}", world.classmate_grade_a), Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn student_without_profile_is_forbidden() {
    let world = World::new();
    let orphan = Uuid::new_v4();
    world.store.insert_user(User {
        id: orphan,
        tenant_id: Some(world.school),
        name: "Sem Perfil".to_string(),
        email: "sem-perfil@centro.br".to_string(),
        role: Role::Student,
        password_hash: String::new(),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: None,
    });
    let token = world.token(orphan, Some(world.school), Role::Student);

    let (status, _) = world.get("/api/grades", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Scope is resolved before the lookup, so even a missing id is 403
    let (status, _) = world
        .get(&format!("/api/grades/{}", Uuid::new_v4()), Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn secretary_is_confined_to_own_school() {
    let world = World::new();
    let token = world.token_for(world.secretary);

    let (_, body) = world.get("/api/classrooms", Some(&token)).await;
    assert_eq!(sorted(ids(&body)), sorted(vec![world.classroom_a, world.classroom_b]));

    let (status, _) = world
        .get(&format!("/api/classrooms?tenant={}", world.other_school), Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = world
        .get(&format!("/api/enrollments/{}", world.enrollment_c), Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn global_admin_reads_across_schools() {
    let world = World::new();
    let token = world.token_for(world.admin);

    let (_, body) = world.get("/api/classrooms", Some(&token)).await;
    assert_eq!(
        sorted(ids(&body)),
        sorted(vec![world.classroom_a, world.classroom_b, world.classroom_c])
    );

    let (_, body) = world
        .get(&format!("/api/classrooms?tenant={}", world.other_school), Some(&token))
        .await;
    assert_eq!(ids(&body), vec![world.classroom_c]);
}

#[tokio::test]
async fn list_pages_are_clamped() {
    let world = World::new();
    let token = world.token_for(world.admin);

    let (_, body) = world.get("/api/classrooms?limit=1&offset=1", Some(&token)).await;
    assert_eq!(ids(&body).len(), 1);
    assert_eq!(body["meta"]["limit"], 1);
    assert_eq!(body["meta"]["offset"], 1);

    let (_, body) = world.get("/api/classrooms?limit=100000", Some(&token)).await;
    assert_eq!(body["meta"]["limit"], world.state.config.api.max_page_size);
}
