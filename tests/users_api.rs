mod common;

use actix_web::{http::StatusCode, test};
use serde_json::{json, Value};

use clubhub_service::models::{Club, Event, Role, User};
use common::{multipart_file, TestContext, PASSWORD};

#[actix_web::test]
async fn login_failures_are_indistinguishable() {
    let ctx = TestContext::new();
    ctx.add_user("ana", Role::User).await;
    let app = test_app!(ctx);

    let unknown = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "username": "nobody", "password": PASSWORD }))
        .to_request();
    let unknown = test::call_service(&app, unknown).await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown_body: Value = test::read_body_json(unknown).await;

    let wrong = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "username": "ana", "password": "not it" }))
        .to_request();
    let wrong = test::call_service(&app, wrong).await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong_body: Value = test::read_body_json(wrong).await;

    assert_eq!(unknown_body, wrong_body);
    assert_eq!(wrong_body["error"], "Invalid username or password");
    assert_eq!(wrong_body["success"], false);
}

#[actix_web::test]
async fn login_token_authorizes_mutations() {
    let ctx = TestContext::new();
    ctx.add_user("ana", Role::User).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "username": "ana", "password": PASSWORD }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["username"], "ana");
    assert!(body["user"].get("password").is_none());
    let token = body["token"].as_str().expect("token").to_string();

    let req = test::TestRequest::post()
        .uri("/api/clubs")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "name": "Chess", "category": "Games" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn mutations_without_a_token_are_rejected() {
    let ctx = TestContext::new();
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/clubs")
        .set_json(json!({ "name": "Chess", "category": "Games" }))
        .to_request();
    let err = test::try_call_service(&app, req)
        .await
        .err()
        .expect("request without a token must fail");
    assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::delete()
        .uri("/api/clubs/1")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let err = test::try_call_service(&app, req)
        .await
        .err()
        .expect("forged token must fail");
    assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

    // reads stay public
    let req = test::TestRequest::get().uri("/api/clubs").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn create_user_requires_admin_and_unique_username() {
    let ctx = TestContext::new();
    ctx.add_user("root", Role::Admin).await;
    ctx.add_user("ana", Role::User).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/users/create-user")
        .insert_header(ctx.bearer("ana", Role::User))
        .set_json(json!({ "username": "ben", "password": "pw", "role": "user" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/users/create-user")
        .insert_header(ctx.bearer("root", Role::Admin))
        .set_json(json!({ "username": "ben", "password": "pw", "role": "user" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["username"], "ben");
    assert!(body.get("password").is_none());

    let req = test::TestRequest::post()
        .uri("/api/users/create-user")
        .insert_header(ctx.bearer("root", Role::Admin))
        .set_json(json!({ "username": "ben", "password": "pw", "role": "user" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/users/create-user")
        .insert_header(ctx.bearer("root", Role::Admin))
        .set_json(json!({ "username": "boss", "password": "pw", "role": "superadmin" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/users/create-user")
        .insert_header(ctx.bearer("root", Role::Admin))
        .set_json(json!({ "username": "cy" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let ctx = TestContext::new();
    ctx.add_user("ana", Role::User).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/clubs")
        .insert_header(ctx.bearer("ana", Role::User))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn join_and_leave_club_updates_both_documents() {
    let ctx = TestContext::new();
    ctx.add_user("ana", Role::User).await;
    ctx.add_user("ben", Role::User).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/clubs")
        .insert_header(ctx.bearer("ana", Role::User))
        .set_json(json!({ "name": "Chess", "category": "Games" }))
        .to_request();
    let club: Value = test::call_and_read_body_json(&app, req).await;
    let club_id = club["id"].as_str().expect("id").to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/ben/clubs/{}", club_id))
        .insert_header(ctx.bearer("ben", Role::User))
        .to_request();
    let profile: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile["clubs"], json!([club_id]));

    let stored = ctx.db.find::<Club>(&club_id).await.unwrap().unwrap();
    assert_eq!(stored.members, vec!["ana", "ben"]);

    // someone else may not act for ben
    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/ben/clubs/{}", club_id))
        .insert_header(ctx.bearer("ana", Role::User))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/ben/clubs/{}", club_id))
        .insert_header(ctx.bearer("ben", Role::User))
        .to_request();
    let profile: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile["clubs"], json!([]));

    let stored = ctx.db.find::<Club>(&club_id).await.unwrap().unwrap();
    assert_eq!(stored.members, vec!["ana"]);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/ben/clubs/{}", club_id))
        .insert_header(ctx.bearer("ben", Role::User))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn deleting_a_user_strips_memberships() {
    let ctx = TestContext::new();
    ctx.add_user("ana", Role::User).await;
    ctx.add_user("ben", Role::User).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/clubs")
        .insert_header(ctx.bearer("ana", Role::User))
        .set_json(json!({ "name": "Chess", "category": "Games" }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/clubs/1/add-member")
        .insert_header(ctx.bearer("ben", Role::User))
        .set_json(json!({ "username": "ben" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::delete()
        .uri("/api/users/ben")
        .insert_header(ctx.bearer("ben", Role::User))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let club = ctx.db.find::<Club>("1").await.unwrap().unwrap();
    assert_eq!(club.members, vec!["ana"]);

    let req = test::TestRequest::get().uri("/api/users/ben").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn rename_rewrites_references() {
    let ctx = TestContext::new();
    ctx.add_user("ana", Role::User).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/clubs")
        .insert_header(ctx.bearer("ana", Role::User))
        .set_json(json!({ "name": "Chess", "category": "Games" }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::put()
        .uri("/api/users/ana")
        .insert_header(ctx.bearer("ana", Role::User))
        .set_json(json!({ "username": "anna", "bio": "hi" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["username"], "anna");
    assert_eq!(body["user"]["bio"], "hi");

    let club = ctx.db.find::<Club>("1").await.unwrap().unwrap();
    assert_eq!(club.members, vec!["anna"]);
    assert_eq!(club.created_by, "anna");
    assert!(ctx.db.find::<User>("ana").await.unwrap().is_none());
}

#[actix_web::test]
async fn profile_picture_upload_is_stored_under_uploads() {
    let ctx = TestContext::new();
    ctx.add_user("ana", Role::User).await;
    let app = test_app!(ctx);

    let (content_type, body) = multipart_file("profilePicture", "image/png", &[0x89, b'P', b'N', b'G', 1, 2, 3]);
    let req = test::TestRequest::post()
        .uri("/api/users/ana/profile-picture")
        .insert_header(ctx.bearer("ana", Role::User))
        .insert_header(content_type)
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let public = body["profilePicture"].as_str().expect("path").to_string();
    assert!(public.starts_with("/uploads/profile-pictures/ana-"));
    assert!(public.ends_with(".png"));

    let on_disk = ctx
        .config
        .upload_dir
        .join(public.trim_start_matches("/uploads/"));
    assert!(on_disk.exists());

    let (content_type, body) = multipart_file("profilePicture", "text/plain", b"hello");
    let req = test::TestRequest::post()
        .uri("/api/users/ana/profile-picture")
        .insert_header(ctx.bearer("ana", Role::User))
        .insert_header(content_type)
        .set_payload(body)
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNSUPPORTED_MEDIA_TYPE
    );
}

#[actix_web::test]
async fn deleted_users_token_is_rejected() {
    let ctx = TestContext::new();
    ctx.add_user("ana", Role::User).await;
    let app = test_app!(ctx);
    let bearer = ctx.bearer("ana", Role::User);

    let req = test::TestRequest::delete()
        .uri("/api/users/ana")
        .insert_header(bearer.clone())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::post()
        .uri("/api/clubs")
        .insert_header(bearer)
        .set_json(json!({ "name": "Chess", "category": "Games" }))
        .to_request();
    let err = test::try_call_service(&app, req)
        .await
        .err()
        .expect("token of a deleted account must fail");
    assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    assert!(ctx.db.find::<Club>("1").await.unwrap().is_none());
}

#[actix_web::test]
async fn demotion_applies_to_tokens_already_issued() {
    let ctx = TestContext::new();
    ctx.add_user("boss", Role::Superadmin).await;
    ctx.add_user("root", Role::Admin).await;
    let app = test_app!(ctx);
    let stale = ctx.bearer("root", Role::Admin);

    let req = test::TestRequest::put()
        .uri("/api/users/root")
        .insert_header(ctx.bearer("boss", Role::Superadmin))
        .set_json(json!({ "role": "user" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/users/create-user")
        .insert_header(stale)
        .set_json(json!({ "username": "ben", "password": "pw", "role": "user" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_cannot_demote_or_delete_a_superadmin() {
    let ctx = TestContext::new();
    ctx.add_user("boss", Role::Superadmin).await;
    ctx.add_user("root", Role::Admin).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::put()
        .uri("/api/users/boss")
        .insert_header(ctx.bearer("root", Role::Admin))
        .set_json(json!({ "role": "user" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri("/api/users/boss")
        .insert_header(ctx.bearer("root", Role::Admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let boss = ctx.db.find::<User>("boss").await.unwrap().unwrap();
    assert_eq!(boss.role, Role::Superadmin);
}

#[actix_web::test]
async fn legacy_documents_with_nulls_stay_usable() {
    let ctx = TestContext::new();
    ctx.add_user("ana", Role::User).await;
    std::fs::write(
        ctx.config.data_dir.join("clubs.json"),
        r#"[{ "id": "1", "name": "Chess", "category": "Games", "capacity": null,
              "members": [null, "ben"], "createdBy": "ben" }]"#,
    )
    .unwrap();
    std::fs::write(
        ctx.config.data_dir.join("events.json"),
        r#"[{ "id": "1", "title": "Open night", "capacity": null, "attendees": [null] }]"#,
    )
    .unwrap();
    let app = test_app!(ctx);

    let req = test::TestRequest::get().uri("/api/clubs").to_request();
    let clubs: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(clubs[0]["capacity"], "unlimited");
    assert_eq!(clubs[0]["members"], json!(["ben"]));

    let req = test::TestRequest::post()
        .uri("/api/users/ana/clubs/1")
        .insert_header(ctx.bearer("ana", Role::User))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/users/ana/events/1")
        .insert_header(ctx.bearer("ana", Role::User))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let event = ctx.db.find::<Event>("1").await.unwrap().unwrap();
    assert_eq!(event.attendees, vec!["ana"]);
    assert!(event.start_date.is_none());
    let club = ctx.db.find::<Club>("1").await.unwrap().unwrap();
    assert_eq!(club.members, vec!["ben", "ana"]);
}
