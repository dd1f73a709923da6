use std::path::PathBuf;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use deed_core::{CompletionSummary, GroupId, Round, RoundId, UserId};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod service;
pub mod store;

pub use error::{ServiceError, SnapshotError};
pub use service::{Exchange, MemberStatus};
pub use store::Store;

use store::GroupRecord;

#[derive(Clone)]
pub struct AppState {
    exchange: Exchange,
}

impl AppState {
    pub fn new(exchange: Exchange) -> Self {
        Self { exchange }
    }

    pub async fn with_persistence(
        path: impl Into<PathBuf>,
        seed: Option<u64>,
    ) -> Result<Self, SnapshotError> {
        let store = Store::with_persistence(path).await?;
        Ok(Self::new(Exchange::new(store, seed)))
    }

    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", post(create_user).get(list_users))
        .route("/users/:username", get(get_user))
        .route("/users/:username/groups", get(user_groups))
        .route("/groups", post(create_group).get(list_groups))
        .route("/groups/:id", get(get_group))
        .route("/groups/:id/join", post(join_group))
        .route("/groups/:id/members", get(group_members))
        .route("/groups/:id/rounds", post(start_round).get(list_rounds))
        .route("/groups/:id/current-round", get(current_round))
        .route("/rounds/:id", get(get_round))
        .route("/rounds/:id/advance", post(advance_round))
        .route("/rounds/:id/assignments", get(round_assignments))
        .route("/rounds/:id/members", get(round_members))
        .route("/rounds/:id/deeds/:user_id", get(my_deed))
        .route("/rounds/:id/deeds/:user_id/submit", post(submit_deed))
        .route("/rounds/:id/deeds/:user_id/verify", post(verify_deed))
        .route("/rounds/:id/verifications/:receiver_id", get(verification_inbox))
        .route("/rounds/:id/completion", get(completion))
        .route("/rounds/:id/celebration/:user_id", get(celebration))
        .route("/rounds/:id/celebration/:user_id/seen", post(mark_seen))
        .route("/deed-templates", get(list_templates).post(create_template))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
    name: String,
}

async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Response, ServiceError> {
    let username = payload.username.trim();
    let name = payload.name.trim();
    if username.is_empty() || name.is_empty() {
        return Ok((StatusCode::BAD_REQUEST, "username and name required").into_response());
    }
    let user = state.exchange.create_user(username, name).await?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

async fn list_users(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.exchange.store().users().await)
}

async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Response, ServiceError> {
    let user = state
        .exchange
        .store()
        .user_by_username(&username)
        .await
        .ok_or(ServiceError::NotFound("user"))?;
    Ok(Json(user).into_response())
}

async fn user_groups(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Response, ServiceError> {
    let store = state.exchange.store();
    let user = store
        .user_by_username(&username)
        .await
        .ok_or(ServiceError::NotFound("user"))?;
    Ok(Json(store.groups_for_user(&user.id).await).into_response())
}

#[derive(Deserialize)]
struct CreateGroupRequest {
    name: String,
}

#[derive(Serialize)]
struct CreateGroupResponse {
    group: GroupRecord,
    round: Round,
}

async fn create_group(
    State(state): State<AppState>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<Response, ServiceError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Ok((StatusCode::BAD_REQUEST, "name required").into_response());
    }
    let (group, round) = state.exchange.create_group(name).await?;
    Ok((StatusCode::CREATED, Json(CreateGroupResponse { group, round })).into_response())
}

async fn list_groups(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.exchange.store().groups().await)
}

async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<Response, ServiceError> {
    let group = state
        .exchange
        .store()
        .group(&GroupId::from(group_id))
        .await
        .ok_or(ServiceError::NotFound("group"))?;
    Ok(Json(group).into_response())
}

#[derive(Deserialize)]
struct JoinRequest {
    user_id: String,
}

#[derive(Serialize)]
struct JoinResponse {
    joined: bool,
    group_id: GroupId,
    user_id: UserId,
}

async fn join_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(payload): Json<JoinRequest>,
) -> Result<Response, ServiceError> {
    let group_id = GroupId::from(group_id);
    let user_id = UserId::from(payload.user_id);
    let joined = state.exchange.join_group(&group_id, &user_id).await?;
    Ok(Json(JoinResponse {
        joined,
        group_id,
        user_id,
    })
    .into_response())
}

async fn group_members(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<Response, ServiceError> {
    let group_id = GroupId::from(group_id);
    let store = state.exchange.store();
    store
        .group(&group_id)
        .await
        .ok_or(ServiceError::NotFound("group"))?;
    Ok(Json(store.group_members(&group_id).await).into_response())
}

async fn list_rounds(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<Response, ServiceError> {
    let group_id = GroupId::from(group_id);
    let store = state.exchange.store();
    store
        .group(&group_id)
        .await
        .ok_or(ServiceError::NotFound("group"))?;
    Ok(Json(store.rounds_for_group(&group_id).await).into_response())
}

#[derive(Deserialize, Default)]
struct StartRoundRequest {
    name: Option<String>,
}

async fn start_round(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    payload: Option<Json<StartRoundRequest>>,
) -> Result<Response, ServiceError> {
    let Json(payload) = payload.unwrap_or_default();
    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let round = state
        .exchange
        .start_round(&GroupId::from(group_id), name)
        .await?;
    Ok((StatusCode::CREATED, Json(round)).into_response())
}

async fn current_round(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<Response, ServiceError> {
    let round = state
        .exchange
        .current_round(&GroupId::from(group_id))
        .await?;
    Ok(Json(round).into_response())
}

async fn get_round(
    State(state): State<AppState>,
    Path(round_id): Path<String>,
) -> Result<Response, ServiceError> {
    let round = state.exchange.round(&RoundId::from(round_id)).await?;
    Ok(Json(round).into_response())
}

async fn advance_round(
    State(state): State<AppState>,
    Path(round_id): Path<String>,
) -> Result<Response, ServiceError> {
    let round = state
        .exchange
        .advance_round(&RoundId::from(round_id))
        .await?;
    Ok(Json(round).into_response())
}

async fn round_assignments(
    State(state): State<AppState>,
    Path(round_id): Path<String>,
) -> Result<Response, ServiceError> {
    let round_id = RoundId::from(round_id);
    state.exchange.round(&round_id).await?;
    Ok(Json(state.exchange.store().assignments_for_round(&round_id).await).into_response())
}

async fn round_members(
    State(state): State<AppState>,
    Path(round_id): Path<String>,
) -> Result<Response, ServiceError> {
    let members: Vec<MemberStatus> = state
        .exchange
        .member_statuses(&RoundId::from(round_id))
        .await?;
    Ok(Json(members).into_response())
}

async fn my_deed(
    State(state): State<AppState>,
    Path((round_id, user_id)): Path<(String, String)>,
) -> Result<Response, ServiceError> {
    let deed = state
        .exchange
        .assignment_for(&RoundId::from(round_id), &UserId::from(user_id))
        .await?;
    Ok(Json(deed).into_response())
}

#[derive(Deserialize)]
struct SubmitRequest {
    proof: String,
}

async fn submit_deed(
    State(state): State<AppState>,
    Path((round_id, user_id)): Path<(String, String)>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Response, ServiceError> {
    let proof = payload.proof.trim();
    if proof.is_empty() {
        return Ok((StatusCode::BAD_REQUEST, "proof required").into_response());
    }
    let deed = state
        .exchange
        .submit(
            &RoundId::from(round_id),
            &UserId::from(user_id),
            proof.to_string(),
        )
        .await?;
    Ok(Json(deed).into_response())
}

#[derive(Deserialize)]
struct VerifyRequest {
    verifier_id: String,
    approve: bool,
}

async fn verify_deed(
    State(state): State<AppState>,
    Path((round_id, user_id)): Path<(String, String)>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Response, ServiceError> {
    let deed = state
        .exchange
        .verify(
            &RoundId::from(round_id),
            &UserId::from(user_id),
            &UserId::from(payload.verifier_id),
            payload.approve,
        )
        .await?;
    Ok(Json(deed).into_response())
}

async fn verification_inbox(
    State(state): State<AppState>,
    Path((round_id, receiver_id)): Path<(String, String)>,
) -> Result<Response, ServiceError> {
    let deeds = state
        .exchange
        .pending_verifications(&RoundId::from(round_id), &UserId::from(receiver_id))
        .await?;
    Ok(Json(deeds).into_response())
}

async fn completion(
    State(state): State<AppState>,
    Path(round_id): Path<String>,
) -> Result<Response, ServiceError> {
    let summary = state
        .exchange
        .check_complete(&RoundId::from(round_id))
        .await?;
    Ok(Json(summary).into_response())
}

#[derive(Serialize)]
struct CelebrationView {
    show: bool,
    summary: CompletionSummary,
}

async fn celebration(
    State(state): State<AppState>,
    Path((round_id, user_id)): Path<(String, String)>,
) -> Result<Response, ServiceError> {
    let round_id = RoundId::from(round_id);
    let user_id = UserId::from(user_id);
    let summary = state.exchange.check_complete(&round_id).await?;
    let show = state
        .exchange
        .should_show_celebration(&round_id, &user_id)
        .await?;
    Ok(Json(CelebrationView { show, summary }).into_response())
}

#[derive(Serialize)]
struct SeenResponse {
    already_seen: bool,
}

async fn mark_seen(
    State(state): State<AppState>,
    Path((round_id, user_id)): Path<(String, String)>,
) -> Result<Response, ServiceError> {
    let already_seen = state
        .exchange
        .mark_seen(&RoundId::from(round_id), &UserId::from(user_id))
        .await?;
    Ok(Json(SeenResponse { already_seen }).into_response())
}

async fn list_templates(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.exchange.store().templates().await)
}

#[derive(Deserialize)]
struct CreateTemplateRequest {
    description: String,
}

async fn create_template(
    State(state): State<AppState>,
    Json(payload): Json<CreateTemplateRequest>,
) -> Response {
    let description = payload.description.trim();
    if description.is_empty() {
        return (StatusCode::BAD_REQUEST, "description required").into_response();
    }
    let template = state
        .exchange
        .store()
        .insert_template(description, Utc::now())
        .await;
    (StatusCode::CREATED, Json(template)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn json_body(res: axum::response::Response) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn test_app() -> Router {
        app(AppState::new(Exchange::new(Store::default(), Some(42))))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn create_user(app: &Router, username: &str) -> String {
        let res = send(
            app,
            Method::POST,
            "/users",
            Some(json!({ "username": username, "name": username.to_uppercase() })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        json_body(res).await["id"].as_str().unwrap().to_string()
    }

    /// Group with the given members and a freshly started round.
    async fn group_with_round(app: &Router, usernames: &[&str]) -> (String, String, Vec<String>) {
        let res = send(app, Method::POST, "/groups", Some(json!({ "name": "friends" }))).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let group_id = json_body(res).await["group"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let mut users = Vec::new();
        for username in usernames {
            let user_id = create_user(app, username).await;
            let res = send(
                app,
                Method::POST,
                &format!("/groups/{group_id}/join"),
                Some(json!({ "user_id": user_id })),
            )
            .await;
            assert_eq!(res.status(), StatusCode::OK);
            users.push(user_id);
        }

        let res = send(app, Method::POST, &format!("/groups/{group_id}/rounds"), None).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let round_id = json_body(res).await["id"].as_str().unwrap().to_string();
        (group_id, round_id, users)
    }

    async fn receiver_of(app: &Router, round_id: &str, giver: &str) -> String {
        let res = send(app, Method::GET, &format!("/rounds/{round_id}/deeds/{giver}"), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        json_body(res).await["receiver_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = test_app();
        let res = send(&app, Method::GET, "/health", None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["status"], "ok");
    }

    #[tokio::test]
    async fn users_are_unique_and_listed_by_group() {
        let app = test_app();
        let (group_id, _, _) = group_with_round(&app, &["ana"]).await;

        let res = send(
            &app,
            Method::POST,
            "/users",
            Some(json!({ "username": "ana", "name": "Other" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = send(
            &app,
            Method::POST,
            "/users",
            Some(json!({ "username": "  ", "name": "Blank" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = send(&app, Method::GET, "/users/ana/groups", None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let groups = json_body(res).await;
        assert_eq!(groups.as_array().unwrap().len(), 1);
        assert_eq!(groups[0]["id"], group_id.as_str());

        let res = send(&app, Method::GET, "/users/nobody", None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn starting_a_round_assigns_everyone() {
        let app = test_app();
        let (group_id, round_id, users) = group_with_round(&app, &["a", "b", "c"]).await;

        let res = send(&app, Method::GET, &format!("/groups/{group_id}/current-round"), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let current = json_body(res).await;
        assert_eq!(current["id"], round_id.as_str());
        assert_eq!(current["status"], "active");

        let res = send(&app, Method::GET, &format!("/rounds/{round_id}/assignments"), None).await;
        let deeds = json_body(res).await;
        let deeds = deeds.as_array().unwrap();
        assert_eq!(deeds.len(), users.len());
        for deed in deeds {
            assert_ne!(deed["user_id"], deed["receiver_id"]);
            assert_eq!(deed["verification_status"], "active");
            assert_eq!(deed["completed"], false);
        }

        let res = send(&app, Method::GET, &format!("/groups/{group_id}/rounds"), None).await;
        let rounds = json_body(res).await;
        assert_eq!(rounds.as_array().unwrap().len(), 2);
        assert_eq!(rounds[1]["status"], "completed");
    }

    #[tokio::test]
    async fn verification_flow_over_http() {
        let app = test_app();
        let (_, round_id, users) = group_with_round(&app, &["a", "b", "c"]).await;
        let giver = &users[0];
        let receiver = receiver_of(&app, &round_id, giver).await;
        let outsider = users
            .iter()
            .find(|u| *u != giver && **u != receiver)
            .unwrap();
        let submit_uri = format!("/rounds/{round_id}/deeds/{giver}/submit");
        let verify_uri = format!("/rounds/{round_id}/deeds/{giver}/verify");

        let res = send(&app, Method::POST, &submit_uri, Some(json!({ "proof": "" }))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = send(&app, Method::POST, &submit_uri, Some(json!({ "proof": "done" }))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["verification_status"], "pending");

        let res = send(&app, Method::POST, &submit_uri, Some(json!({ "proof": "again" }))).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = send(
            &app,
            Method::GET,
            &format!("/rounds/{round_id}/verifications/{receiver}"),
            None,
        )
        .await;
        let inbox = json_body(res).await;
        assert_eq!(inbox.as_array().unwrap().len(), 1);
        assert_eq!(inbox[0]["user_id"], giver.as_str());

        let res = send(
            &app,
            Method::POST,
            &verify_uri,
            Some(json!({ "verifier_id": outsider, "approve": true })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = send(
            &app,
            Method::POST,
            &verify_uri,
            Some(json!({ "verifier_id": receiver, "approve": false })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let rejected = json_body(res).await;
        assert_eq!(rejected["verification_status"], "rejected");
        assert!(rejected["proof"].is_null());

        let res = send(&app, Method::POST, &submit_uri, Some(json!({ "proof": "redo" }))).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = send(
            &app,
            Method::POST,
            &verify_uri,
            Some(json!({ "verifier_id": receiver, "approve": true })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let approved = json_body(res).await;
        assert_eq!(approved["completed"], true);
        assert_eq!(approved["verified_by"], receiver.as_str());

        let res = send(
            &app,
            Method::POST,
            &verify_uri,
            Some(json!({ "verifier_id": receiver, "approve": false })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = send(&app, Method::GET, &format!("/rounds/{round_id}/completion"), None).await;
        assert_eq!(
            json_body(res).await,
            json!({ "totalMembers": 3, "completedCount": 1, "allComplete": false })
        );

        let res = send(&app, Method::GET, &format!("/rounds/{round_id}/members"), None).await;
        let members = json_body(res).await;
        let first = members
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["id"] == giver.as_str())
            .unwrap()
            .clone();
        assert_eq!(first["completed"], true);
        assert_eq!(first["verification_status"], "approved");
    }

    #[tokio::test]
    async fn celebration_shows_until_seen() {
        let app = test_app();
        let (_, round_id, users) = group_with_round(&app, &["a", "b"]).await;
        for giver in &users {
            let receiver = receiver_of(&app, &round_id, giver).await;
            let res = send(
                &app,
                Method::POST,
                &format!("/rounds/{round_id}/deeds/{giver}/submit"),
                Some(json!({ "proof": "done" })),
            )
            .await;
            assert_eq!(res.status(), StatusCode::OK);
            let res = send(
                &app,
                Method::POST,
                &format!("/rounds/{round_id}/deeds/{giver}/verify"),
                Some(json!({ "verifier_id": receiver, "approve": true })),
            )
            .await;
            assert_eq!(res.status(), StatusCode::OK);
        }

        let user = &users[0];
        let celebration_uri = format!("/rounds/{round_id}/celebration/{user}");
        let res = send(&app, Method::GET, &celebration_uri, None).await;
        let view = json_body(res).await;
        assert_eq!(view["show"], true);
        assert_eq!(view["summary"]["allComplete"], true);

        let seen_uri = format!("{celebration_uri}/seen");
        let res = send(&app, Method::POST, &seen_uri, None).await;
        assert_eq!(json_body(res).await["already_seen"], false);
        let res = send(&app, Method::POST, &seen_uri, None).await;
        assert_eq!(json_body(res).await["already_seen"], true);

        let res = send(&app, Method::GET, &celebration_uri, None).await;
        assert_eq!(json_body(res).await["show"], false);

        let res = send(
            &app,
            Method::GET,
            &format!("/rounds/{round_id}/celebration/nobody"),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn advance_twice_returns_same_round() {
        let app = test_app();
        let (group_id, round_id, _) = group_with_round(&app, &["a", "b"]).await;
        let uri = format!("/rounds/{round_id}/advance");

        let res = send(&app, Method::POST, &uri, None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let next = json_body(res).await;
        let res = send(&app, Method::POST, &uri, None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let again = json_body(res).await;

        assert_eq!(next["id"], again["id"]);
        assert_eq!(next["predecessor_id"], round_id.as_str());
        let res = send(&app, Method::GET, &format!("/groups/{group_id}/rounds"), None).await;
        assert_eq!(json_body(res).await.as_array().unwrap().len(), 3);

        let res = send(&app, Method::POST, "/rounds/missing/advance", None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn named_round_and_unknown_records() {
        let app = test_app();
        let (group_id, _, _) = group_with_round(&app, &["a", "b"]).await;
        let res = send(
            &app,
            Method::POST,
            &format!("/groups/{group_id}/rounds"),
            Some(json!({ "name": "Holiday week" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(json_body(res).await["name"], "Holiday week");

        let res = send(&app, Method::GET, "/groups/unknown", None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = send(&app, Method::POST, "/groups/unknown/rounds", None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = send(
            &app,
            Method::POST,
            &format!("/groups/{group_id}/join"),
            Some(json!({ "user_id": "ghost" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = send(&app, Method::GET, "/rounds/unknown/completion", None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn templates_are_created_and_listed() {
        let app = test_app();
        let res = send(
            &app,
            Method::POST,
            "/deed-templates",
            Some(json!({ "description": "Cook dinner for {target}" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = send(&app, Method::GET, "/deed-templates", None).await;
        let templates = json_body(res).await;
        assert_eq!(templates.as_array().unwrap().len(), 1);
        assert_eq!(templates[0]["description"], "Cook dinner for {target}");

        let (_, round_id, users) = group_with_round(&app, &["a", "b"]).await;
        let res = send(
            &app,
            Method::GET,
            &format!("/rounds/{round_id}/deeds/{}", users[0]),
            None,
        )
        .await;
        let deed = json_body(res).await;
        assert_eq!(deed["deed_description"], "Cook dinner for B");
    }

    #[tokio::test]
    async fn persistence_writes_and_loads_state() {
        let path = std::env::temp_dir().join(format!("deeds_state_{}.json", uuid::Uuid::new_v4()));
        let state = AppState::with_persistence(path.clone(), Some(1)).await.unwrap();
        let app = app(state);

        let res = send(&app, Method::POST, "/groups", Some(json!({ "name": "kept" }))).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        assert!(tokio::fs::metadata(&path).await.is_ok());

        let loaded = AppState::with_persistence(path.clone(), None).await.unwrap();
        let groups = loaded.exchange().store().groups().await;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "kept");
        let _ = tokio::fs::remove_file(&path).await;
    }
}
