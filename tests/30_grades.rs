mod common;

use axum::http::{Method, StatusCode};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use common::World;
use escola_api::database::models::Assessment;

fn body(assessment: Uuid, enrollment: Uuid, score: &str) -> serde_json::Value {
    json!({ "assessmentId": assessment, "enrollmentId": enrollment, "score": score })
}

fn new_assessment(world: &World) -> Uuid {
    new_assessment_with_max(world, Some(Decimal::new(10, 0)))
}

fn new_assessment_with_max(world: &World, max_score: Option<Decimal>) -> Uuid {
    let id = Uuid::new_v4();
    world.store.insert_assessment(Assessment {
        id,
        tenant_id: world.school,
        classroom_id: world.classroom_a,
        subject_id: Uuid::new_v4(),
        title: "Trabalho".to_string(),
        max_score,
        held_on: NaiveDate::from_ymd_opt(2025, 4, 2).expect("valid date"),
    });
    id
}

#[tokio::test]
async fn first_write_records_without_audit() {
    let world = World::new();
    let token = world.token_for(world.teacher);
    let assessment = new_assessment(&world);

    let (status, response) = world
        .put("/api/grades", &token, body(assessment, world.enrollment_a, "6.0"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{response}");
    assert_eq!(response["data"]["outcome"], "recorded");
    assert!(world.store.grade_audits().is_empty());
}

#[tokio::test]
async fn overwrite_appends_exactly_one_audit() {
    let world = World::new();
    let token = world.token_for(world.teacher);

    let (status, response) = world
        .put("/api/grades", &token, body(world.assessment_a, world.enrollment_a, "8.5"))
        .await;
    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["data"]["outcome"], "revised");
    assert_eq!(response["data"]["grade"]["id"], world.grade_a.to_string());

    let audits = world.store.grade_audits();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].student_grade_id, world.grade_a);
    assert_eq!(audits[0].old_value, Decimal::new(70, 1));
    assert_eq!(audits[0].new_value, Decimal::new(85, 1));
    assert_eq!(audits[0].changed_by_id, world.teacher);

    // Same score again writes nothing
    let (status, response) = world
        .put("/api/grades", &token, body(world.assessment_a, world.enrollment_a, "8.50"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["data"]["outcome"], "unchanged");
    assert_eq!(world.store.grade_audits().len(), 1);

    let secretary = world.token_for(world.secretary);
    let (status, history) = world
        .get(&format!("/api/grades/{}/audit", world.grade_a), Some(&secretary))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["data"]["audits"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn students_and_guardians_cannot_write() {
    let world = World::new();

    for user in [world.student_user, world.guardian] {
        let token = world.token_for(user);
        let (status, response) = world
            .put("/api/grades", &token, body(world.assessment_a, world.enrollment_a, "10"))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(response["error"], "acesso negado");
    }
    assert!(world.store.grade_audits().is_empty());
}

#[tokio::test]
async fn teacher_cannot_write_outside_assignments() {
    let world = World::new();
    let token = world.token_for(world.teacher);

    let (status, _) = world
        .put("/api/grades", &token, body(world.assessment_b, world.enrollment_b, "5"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = world
        .put("/api/grades", &token, body(world.assessment_c, world.enrollment_c, "5"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(world.store.grade_audits().is_empty());
}

#[tokio::test]
async fn invalid_writes_are_rejected_before_the_ledger() {
    let world = World::new();
    let token = world.token_for(world.secretary);

    // 8.555 would be stored rounded
    for score in ["10.5", "-1", "8.555"] {
        let (status, _) = world
            .put("/api/grades", &token, body(world.assessment_a, world.enrollment_a, score))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{score}");
    }

    // Enrollment from a different classroom than the assessment
    let (status, _) = world
        .put("/api/grades", &token, body(world.assessment_a, world.enrollment_b, "5"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = world
        .put("/api/grades", &token, body(Uuid::new_v4(), world.enrollment_a, "5"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(world.store.grade_audits().is_empty());
    let grade = world
        .store
        .grades()
        .into_iter()
        .find(|g| g.id == world.grade_a)
        .expect("seeded grade");
    assert_eq!(grade.score, Decimal::new(70, 1));
}

#[tokio::test]
async fn score_must_fit_the_stored_column() {
    let world = World::new();
    let token = world.token_for(world.secretary);
    let unbounded = new_assessment_with_max(&world, None);

    let (status, response) = world
        .put("/api/grades", &token, body(unbounded, world.enrollment_a, "1000"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "BAD_REQUEST");

    let (status, _) = world
        .put("/api/grades", &token, body(unbounded, world.enrollment_a, "999.99"))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Same value at a wider scale is not a revision
    let (status, response) = world
        .put("/api/grades", &token, body(unbounded, world.enrollment_a, "999.990"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["data"]["outcome"], "unchanged");
    assert!(world.store.grade_audits().is_empty());
}

#[tokio::test]
async fn malformed_body_uses_the_error_envelope() {
    let world = World::new();
    let token = world.token_for(world.secretary);

    let (status, response) = world
        .send_raw(Method::PUT, "/api/grades", Some(&token), Some("{\"score\":".to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["success"], false);
    assert_eq!(response["code"], "BAD_REQUEST");

    let (status, response) = world
        .put("/api/grades", &token, json!({ "assessmentId": world.assessment_a, "score": "abc" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["success"], false);
    assert_eq!(response["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn concurrent_revisions_each_leave_an_audit() {
    let world = World::new();
    let token = world.token_for(world.teacher);

    let (first, second) = tokio::join!(
        world.put("/api/grades", &token, body(world.assessment_a, world.enrollment_a, "8")),
        world.put("/api/grades", &token, body(world.assessment_a, world.enrollment_a, "9")),
    );
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);

    let audits = world.store.grade_audits();
    assert_eq!(audits.len(), 2);
    // Serialized: the second audit starts where the first ended
    assert_eq!(audits[0].old_value, Decimal::new(70, 1));
    assert_eq!(audits[1].old_value, audits[0].new_value);
}
