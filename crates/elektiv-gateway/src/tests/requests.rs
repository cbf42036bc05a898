//! Request shaping: bearer headers, methods, bodies, and error mapping.

use super::harness::*;
use crate::{GatewayError, NewReview, PreferenceKind, StudentForm};

#[tokio::test]
async fn test_authenticated_requests_carry_the_bearer_token() {
    let access = make_token(1200);
    let tg = logged_in_gateway(&access).await;
    tg.backend
        .set_response("/auth/form/", CannedResponse::json(200, student_data_json()));

    tg.gateway.student_form().await.unwrap();

    let request = &tg.backend.requests_for("/auth/form/")[0];
    assert_eq!(request.method, "GET");
    assert_eq!(
        request.authorization.as_deref(),
        Some(format!("Bearer {access}").as_str())
    );
}

#[tokio::test]
async fn test_catalog_requests_are_anonymous() {
    let tg = logged_in_gateway(&make_token(1200)).await;
    tg.backend.set_response(
        "/subjects/all/",
        CannedResponse::json(
            200,
            serde_json::json!([{
                "id": 1,
                "code": "WP",
                "name": "Веб програмирање",
                "abstract": "Основи на веб технологии.",
                "subject_info": { "level": 2, "semester": 4, "season": "S" },
            }])
            .to_string(),
        ),
    );

    let subjects = tg.gateway.subjects().await.unwrap();
    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[0].code, "WP");
    assert_eq!(subjects[0].subject_info.season, "S");

    let request = &tg.backend.requests_for("/subjects/all/")[0];
    assert!(request.authorization.is_none());
}

#[tokio::test]
async fn test_server_errors_map_to_api_errors() {
    let tg = logged_in_gateway(&make_token(1200)).await;
    tg.backend.set_response(
        "/auth/form/",
        CannedResponse::json(500, r#"{"detail":"boom"}"#),
    );

    match tg.gateway.student_form().await {
        Err(GatewayError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("boom"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(tg.backend.hits("/auth/refresh/"), 0);

    // Unrouted path yields the backend's 404.
    match tg.gateway.recommendations().await {
        Err(GatewayError::Api { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_toggle_preference_posts_the_bucket() {
    let tg = logged_in_gateway(&make_token(1200)).await;
    tg.backend.set_response(
        "/subjects/toggle-subject-pref/",
        CannedResponse::json(200, "{}"),
    );

    tg.gateway
        .toggle_preference(17, PreferenceKind::Disliked)
        .await
        .unwrap();

    let request = &tg.backend.requests_for("/subjects/toggle-subject-pref/")[0];
    assert_eq!(request.method, "POST");
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["subject_id"], 17);
    assert_eq!(body["preference"], "disliked");
}

#[tokio::test]
async fn test_submit_review_posts_subject_and_text() {
    let tg = logged_in_gateway(&make_token(1200)).await;
    tg.backend.set_response(
        "/subjects/subject-review/",
        CannedResponse::json(201, "{}"),
    );

    tg.gateway
        .submit_review(&NewReview {
            subject: "WP".to_string(),
            text: "Одличен предмет.".to_string(),
        })
        .await
        .unwrap();

    let request = &tg.backend.requests_for("/subjects/subject-review/")[0];
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["subject"], "WP");
    assert_eq!(body["text"], "Одличен предмет.");
}

#[tokio::test]
async fn test_reviews_are_fetched_by_subject_code() {
    let tg = logged_in_gateway(&make_token(1200)).await;
    tg.backend.set_response(
        "/subjects/subject-review/WP/",
        CannedResponse::json(
            200,
            r#"[{"id":5,"subject":"WP","text":"Солидно.","votes":2}]"#,
        ),
    );

    let reviews = tg.gateway.reviews_for_subject("WP").await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].votes, 2);
}

#[tokio::test]
async fn test_form_update_uses_patch() {
    let tg = logged_in_gateway(&make_token(1200)).await;
    tg.backend
        .set_response("/auth/form/", CannedResponse::json(200, student_data_json()));

    let form = StudentForm {
        index: "191042".to_string(),
        study_track: "SIIS23".to_string(),
        current_year: 3,
        study_effort: "medium".to_string(),
        passed_subjects: vec![1, 2, 3],
        preferred_domains: vec!["web".to_string()],
        preferred_technologies: vec![],
        preferred_evaluation: vec![],
        favorite_professors: vec![],
    };
    tg.gateway.update_student_form(&form).await.unwrap();

    let request = &tg.backend.requests_for("/auth/form/")[0];
    assert_eq!(request.method, "PATCH");
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["passed_subjects"], serde_json::json!([1, 2, 3]));
}
