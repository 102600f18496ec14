use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::auth::{AuthError, NewUser};
use crate::entity::{
    payment,
    user::{self, ROLE_ADMIN, ROLE_USER},
    whatsapp_number::{self, DEFAULT_MODEL, normalize_phone_number},
};

use super::{
    ApiErr, AppState,
    dto::{
        CreateAgentRequest, CreateUserRequest, ListAgentsQuery, ListPaymentsQuery, ListUsersQuery,
        NumberResponse, PaginatedResponse, PaymentResponse, TokenLimitRequest, UpdateAgentRequest,
        UserResponse,
    },
    jwt::AdminClaims,
    page_params,
};

// ---------- users ----------

pub async fn list_users(
    AdminClaims(_): AdminClaims,
    State(state): State<AppState>,
    Query(params): Query<ListUsersQuery>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiErr> {
    let (page, page_size) = page_params(params.page, params.page_size);

    let mut query = user::Entity::find();

    if let Some(ref search) = params.search
        && !search.is_empty()
    {
        query = query.filter(
            user::Column::Username
                .contains(search.as_str())
                .or(user::Column::Email.contains(search.as_str())),
        );
    }

    let paginator = query
        .order_by_asc(user::Column::CreatedAt)
        .paginate(&state.db, page_size);

    let total = paginator.num_items().await.map_err(ApiErr::internal)?;
    let users = paginator
        .fetch_page(page - 1)
        .await
        .map_err(ApiErr::internal)?;

    Ok(Json(PaginatedResponse {
        data: users.into_iter().map(UserResponse::from).collect(),
        total,
        page,
        page_size,
    }))
}

pub async fn create_user(
    AdminClaims(claims): AdminClaims,
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiErr> {
    let username = body.username.trim();
    let email = body.email.trim();
    if username.is_empty() || email.is_empty() || body.password.is_empty() {
        return Err(ApiErr::bad_request(
            "username, email and password are required",
        ));
    }
    if !email.contains('@') {
        return Err(ApiErr::bad_request("email is not valid"));
    }
    let limit = body.ai_token_limit.unwrap_or(state.default_token_limit);
    if limit < 0 {
        return Err(ApiErr::bad_request("ai_token_limit must be >= 0"));
    }

    let model = state
        .auth
        .create_user(NewUser {
            username,
            email,
            password: &body.password,
            role: if body.is_admin { ROLE_ADMIN } else { ROLE_USER },
            ai_token_limit: limit,
        })
        .await
        .map_err(|e| match e {
            AuthError::Db(db_err) => {
                ApiErr::from_write(db_err, "Username or email already exists")
            }
            other => ApiErr::internal(other),
        })?;

    tracing::info!(admin = %claims.sub, user_id = %model.id, "user created");

    Ok((StatusCode::CREATED, Json(UserResponse::from(model))))
}

pub async fn get_user(
    AdminClaims(_): AdminClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiErr> {
    let user = find_user(&state.db, id).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn delete_user(
    AdminClaims(claims): AdminClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiErr> {
    let user = find_user(&state.db, id).await?;

    // Last-admin check first so the message is unambiguous.
    if user.is_admin() && count_admins(&state.db).await? == 1 {
        return Err(ApiErr::conflict("Cannot delete the last admin user"));
    }
    if claims.sub == id {
        return Err(ApiErr::conflict("Cannot delete your own account"));
    }

    let active: user::ActiveModel = user.into();
    active.delete(&state.db).await.map_err(ApiErr::internal)?;

    tracing::info!(admin = %claims.sub, user_id = %id, "user deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn activate_user(
    AdminClaims(claims): AdminClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiErr> {
    let updated = set_active(&state.db, id, true).await?;
    tracing::info!(admin = %claims.sub, user_id = %id, "user activated");
    Ok(Json(updated))
}

pub async fn deactivate_user(
    AdminClaims(claims): AdminClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiErr> {
    if claims.sub == id {
        return Err(ApiErr::conflict("Cannot deactivate your own account"));
    }
    let updated = set_active(&state.db, id, false).await?;
    tracing::info!(admin = %claims.sub, user_id = %id, "user deactivated");
    Ok(Json(updated))
}

pub async fn set_token_limit(
    AdminClaims(_): AdminClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TokenLimitRequest>,
) -> Result<Json<UserResponse>, ApiErr> {
    if body.limit < 0 {
        return Err(ApiErr::bad_request("limit must be >= 0"));
    }
    let user = find_user(&state.db, id).await?;

    let mut active: user::ActiveModel = user.into();
    active.ai_token_limit = Set(body.limit);
    active.updated_at = Set(Utc::now().naive_utc());
    let updated = active.update(&state.db).await.map_err(ApiErr::internal)?;

    Ok(Json(UserResponse::from(updated)))
}

pub async fn reset_tokens(
    AdminClaims(_): AdminClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiErr> {
    let user = find_user(&state.db, id).await?;

    let mut active: user::ActiveModel = user.into();
    active.ai_tokens_used = Set(0);
    active.updated_at = Set(Utc::now().naive_utc());
    let updated = active.update(&state.db).await.map_err(ApiErr::internal)?;

    Ok(Json(UserResponse::from(updated)))
}

async fn find_user(db: &DatabaseConnection, id: Uuid) -> Result<user::Model, ApiErr> {
    user::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ApiErr::internal)?
        .ok_or_else(|| ApiErr::not_found("User not found"))
}

async fn set_active(db: &DatabaseConnection, id: Uuid, is_active: bool) -> Result<UserResponse, ApiErr> {
    let user = find_user(db, id).await?;

    let mut active: user::ActiveModel = user.into();
    active.is_active = Set(is_active);
    active.updated_at = Set(Utc::now().naive_utc());
    let updated = active.update(db).await.map_err(ApiErr::internal)?;

    Ok(UserResponse::from(updated))
}

async fn count_admins(db: &DatabaseConnection) -> Result<u64, ApiErr> {
    user::Entity::find()
        .filter(user::Column::Role.eq(ROLE_ADMIN))
        .count(db)
        .await
        .map_err(ApiErr::internal)
}

// ---------- agents ----------

pub async fn list_agents(
    AdminClaims(_): AdminClaims,
    State(state): State<AppState>,
    Query(params): Query<ListAgentsQuery>,
) -> Result<Json<Vec<NumberResponse>>, ApiErr> {
    let mut query = whatsapp_number::Entity::find();
    if let Some(user_id) = params.user_id {
        query = query.filter(whatsapp_number::Column::UserId.eq(user_id));
    }

    let numbers = query
        .order_by_asc(whatsapp_number::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(ApiErr::internal)?;

    Ok(Json(numbers.into_iter().map(NumberResponse::from).collect()))
}

pub async fn add_agent(
    AdminClaims(_): AdminClaims,
    State(state): State<AppState>,
    Json(body): Json<CreateAgentRequest>,
) -> Result<(StatusCode, Json<NumberResponse>), ApiErr> {
    let owner_id = body
        .user_id
        .ok_or_else(|| ApiErr::bad_request("user_id is required"))?;
    find_user(&state.db, owner_id).await?;

    let created = insert_agent(&state.db, owner_id, body).await?;
    Ok((StatusCode::CREATED, Json(NumberResponse::from(created))))
}

pub async fn edit_agent(
    AdminClaims(_): AdminClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAgentRequest>,
) -> Result<Json<NumberResponse>, ApiErr> {
    let number = whatsapp_number::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(ApiErr::internal)?
        .ok_or_else(|| ApiErr::not_found("Agent not found"))?;

    let updated = update_agent(&state.db, number, body).await?;
    Ok(Json(NumberResponse::from(updated)))
}

pub async fn delete_agent(
    AdminClaims(_): AdminClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiErr> {
    let res = whatsapp_number::Entity::delete_by_id(id)
        .exec(&state.db)
        .await
        .map_err(ApiErr::internal)?;

    if res.rows_affected == 0 {
        return Err(ApiErr::not_found("Agent not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Validate and insert a number for `owner_id`. Shared with the user routes.
pub(super) async fn insert_agent(
    db: &DatabaseConnection,
    owner_id: Uuid,
    body: CreateAgentRequest,
) -> Result<whatsapp_number::Model, ApiErr> {
    let phone = normalize_phone_number(&body.phone_number)
        .ok_or_else(|| ApiErr::bad_request("phone_number is not a valid phone number"))?;
    let model = match body.model {
        Some(m) => validated_model(m)?,
        None => DEFAULT_MODEL.to_string(),
    };

    let now = Utc::now().naive_utc();
    whatsapp_number::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(owner_id),
        phone_number: Set(phone),
        display_name: Set(body.display_name),
        ai_enabled: Set(body.ai_enabled),
        prompt: Set(body.prompt),
        model: Set(model),
        respond_groups: Set(body.respond_groups),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(|e| ApiErr::from_write(e, "Phone number already registered"))
}

/// Apply the present fields of `body`. Shared with the user routes.
pub(super) async fn update_agent(
    db: &DatabaseConnection,
    number: whatsapp_number::Model,
    body: UpdateAgentRequest,
) -> Result<whatsapp_number::Model, ApiErr> {
    let mut active: whatsapp_number::ActiveModel = number.into();

    if let Some(display_name) = body.display_name {
        active.display_name = Set(Some(display_name));
    }
    if let Some(ai_enabled) = body.ai_enabled {
        active.ai_enabled = Set(ai_enabled);
    }
    if let Some(prompt) = body.prompt {
        // Empty string clears the prompt.
        active.prompt = Set(Some(prompt).filter(|p| !p.trim().is_empty()));
    }
    if let Some(model) = body.model {
        active.model = Set(validated_model(model)?);
    }
    if let Some(respond_groups) = body.respond_groups {
        active.respond_groups = Set(respond_groups);
    }
    active.updated_at = Set(Utc::now().naive_utc());

    active.update(db).await.map_err(ApiErr::internal)
}

fn validated_model(model: String) -> Result<String, ApiErr> {
    let model = model.trim();
    if model.is_empty() {
        return Err(ApiErr::bad_request("model must not be empty"));
    }
    Ok(model.to_string())
}

// ---------- payments ----------

pub async fn list_payments(
    AdminClaims(_): AdminClaims,
    State(state): State<AppState>,
    Query(params): Query<ListPaymentsQuery>,
) -> Result<Json<PaginatedResponse<PaymentResponse>>, ApiErr> {
    let (page, page_size) = page_params(params.page, params.page_size);

    let mut query = payment::Entity::find();
    if let Some(ref status) = params.status
        && !status.is_empty()
    {
        query = query.filter(payment::Column::Status.eq(status.as_str()));
    }

    let paginator = query
        .order_by_desc(payment::Column::CreatedAt)
        .paginate(&state.db, page_size);

    let total = paginator.num_items().await.map_err(ApiErr::internal)?;
    let items = paginator
        .fetch_page(page - 1)
        .await
        .map_err(ApiErr::internal)?;

    Ok(Json(PaginatedResponse {
        data: items.into_iter().map(PaymentResponse::from).collect(),
        total,
        page,
        page_size,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::*;
    use crate::entity::{payment, user, whatsapp_number};
    use axum::http::{Method, StatusCode};
    use sea_orm::{ActiveModelTrait, EntityTrait, Set};
    use serde_json::json;
    use uuid::Uuid;

    // ===== auth gate =====

    #[tokio::test]
    async fn deactivated_admin_token_is_refused() {
        let db = setup_db().await;
        insert_user(&db, "admin1", true).await;
        let stale = insert_user(&db, "admin2", true).await;
        let victim = insert_user(&db, "victim", false).await;
        set_active(&db, stale, false).await;
        let app = router(offline_state(db.clone()));

        let res = send(
            &app,
            Method::DELETE,
            &format!("/admin/users/{victim}"),
            Some(&admin_token(stale)),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert!(user::Entity::find_by_id(victim).one(&db).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deleted_admin_token_is_401() {
        let db = setup_db().await;
        insert_user(&db, "admin1", true).await;

        let res = send(
            &router(offline_state(db)),
            Method::GET,
            "/admin/users",
            Some(&admin_token(Uuid::now_v7())),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn demoted_admin_token_is_403() {
        let db = setup_db().await;
        let demoted = insert_user(&db, "admin2", true).await;
        let row = user::Entity::find_by_id(demoted).one(&db).await.unwrap().unwrap();
        let mut active: user::ActiveModel = row.into();
        active.role = Set(user::ROLE_USER.to_string());
        active.update(&db).await.unwrap();

        let res = send(
            &router(offline_state(db)),
            Method::GET,
            "/admin/users",
            Some(&admin_token(demoted)),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn activate_without_token_is_401() {
        let db = setup_db().await;
        let target = insert_user(&db, "user1", false).await;

        let res = send(
            &router(offline_state(db)),
            Method::POST,
            &format!("/admin/activate/{target}"),
            None,
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn activate_with_garbage_token_is_401() {
        let db = setup_db().await;
        let target = insert_user(&db, "user1", false).await;

        let res = send(
            &router(offline_state(db)),
            Method::POST,
            &format!("/admin/activate/{target}"),
            Some("not-a-jwt"),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn activate_with_user_token_is_403() {
        let db = setup_db().await;
        let caller = insert_user(&db, "user1", false).await;

        let res = send(
            &router(offline_state(db)),
            Method::POST,
            &format!("/admin/activate/{caller}"),
            Some(&user_token(caller)),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    // ===== activation / limits =====

    #[tokio::test]
    async fn deactivate_then_activate() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;
        let target = insert_user(&db, "user1", false).await;
        let app = router(offline_state(db.clone()));
        let token = admin_token(admin);

        let res = send(&app, Method::POST, &format!("/admin/deactivate/{target}"), Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["is_active"], false);

        let res = send(&app, Method::POST, &format!("/admin/activate/{target}"), Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);

        let row = user::Entity::find_by_id(target).one(&db).await.unwrap().unwrap();
        assert!(row.is_active);
    }

    #[tokio::test]
    async fn deactivate_self_rejected() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;

        let res = send(
            &router(offline_state(db)),
            Method::POST,
            &format!("/admin/deactivate/{admin}"),
            Some(&admin_token(admin)),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn activate_unknown_user_is_404() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;

        let res = send(
            &router(offline_state(db)),
            Method::POST,
            &format!("/admin/activate/{}", Uuid::now_v7()),
            Some(&admin_token(admin)),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn token_limit_set_and_validated() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;
        let target = insert_user(&db, "user1", false).await;
        let app = router(offline_state(db));
        let token = admin_token(admin);
        let uri = format!("/admin/token-limit/{target}");

        let res = send(&app, Method::POST, &uri, Some(&token), Some(json!({"limit": -5}))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = send(&app, Method::POST, &uri, Some(&token), Some(json!({"limit": 5000}))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["ai_token_limit"], 5000);
    }

    // ===== users =====

    #[tokio::test]
    async fn create_user_and_duplicate_conflict() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;
        let app = router(offline_state(db));
        let token = admin_token(admin);
        let body = json!({"username": "bob", "email": "bob@example.com", "password": "pw"});

        let res = send(&app, Method::POST, "/admin/users", Some(&token), Some(body.clone())).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = body_json(res).await;
        assert_eq!(created["role"], "user");
        assert_eq!(created["ai_token_limit"], 100_000);

        let res = send(&app, Method::POST, "/admin/users", Some(&token), Some(body)).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn list_users_paginates_and_searches() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;
        insert_user(&db, "carol", false).await;
        insert_user(&db, "dave", false).await;
        let app = router(offline_state(db));
        let token = admin_token(admin);

        let res = send(&app, Method::GET, "/admin/users?page_size=2", Some(&token), None).await;
        let body = body_json(res).await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let res = send(&app, Method::GET, "/admin/users?search=car", Some(&token), None).await;
        let body = body_json(res).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["data"][0]["username"], "carol");
    }

    #[tokio::test]
    async fn delete_last_admin_rejected() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;

        let res = send(
            &router(offline_state(db)),
            Method::DELETE,
            &format!("/admin/users/{admin}"),
            Some(&admin_token(admin)),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn delete_user_cascades_numbers() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;
        let target = insert_user(&db, "user1", false).await;
        insert_number(&db, target, "+966500000001").await;

        let res = send(
            &router(offline_state(db.clone())),
            Method::DELETE,
            &format!("/admin/users/{target}"),
            Some(&admin_token(admin)),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let remaining = whatsapp_number::Entity::find().all(&db).await.unwrap();
        assert!(remaining.is_empty());
    }

    // ===== agents =====

    #[tokio::test]
    async fn add_edit_delete_agent() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;
        let owner = insert_user(&db, "user1", false).await;
        let app = router(offline_state(db));
        let token = admin_token(admin);

        let res = send(
            &app,
            Method::POST,
            "/admin/agents",
            Some(&token),
            Some(json!({"user_id": owner, "phone_number": "+966 50 000 0001", "prompt": "Be brief"})),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let agent = body_json(res).await;
        assert_eq!(agent["phone_number"], "+966500000001");
        assert_eq!(agent["model"], whatsapp_number::DEFAULT_MODEL);
        assert_eq!(agent["ai_enabled"], false);
        let agent_id = agent["id"].as_str().unwrap().to_string();

        let res = send(
            &app,
            Method::PATCH,
            &format!("/admin/agents/{agent_id}"),
            Some(&token),
            Some(json!({"ai_enabled": true, "model": "gpt-4o", "respond_groups": true})),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let edited = body_json(res).await;
        assert_eq!(edited["ai_enabled"], true);
        assert_eq!(edited["model"], "gpt-4o");
        assert_eq!(edited["respond_groups"], true);
        assert_eq!(edited["prompt"], "Be brief");

        let res = send(&app, Method::DELETE, &format!("/admin/agents/{agent_id}"), Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = send(&app, Method::DELETE, &format!("/admin/agents/{agent_id}"), Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn add_agent_validation() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;
        let owner = insert_user(&db, "user1", false).await;
        insert_number(&db, owner, "+966500000001").await;
        let app = router(offline_state(db));
        let token = admin_token(admin);

        let missing_owner = send(
            &app,
            Method::POST,
            "/admin/agents",
            Some(&token),
            Some(json!({"phone_number": "+966500000002"})),
        )
        .await;
        assert_eq!(missing_owner.status(), StatusCode::BAD_REQUEST);

        let unknown_owner = send(
            &app,
            Method::POST,
            "/admin/agents",
            Some(&token),
            Some(json!({"user_id": Uuid::now_v7(), "phone_number": "+966500000002"})),
        )
        .await;
        assert_eq!(unknown_owner.status(), StatusCode::NOT_FOUND);

        let bad_phone = send(
            &app,
            Method::POST,
            "/admin/agents",
            Some(&token),
            Some(json!({"user_id": owner, "phone_number": "call me"})),
        )
        .await;
        assert_eq!(bad_phone.status(), StatusCode::BAD_REQUEST);

        let duplicate = send(
            &app,
            Method::POST,
            "/admin/agents",
            Some(&token),
            Some(json!({"user_id": owner, "phone_number": "+966500000001"})),
        )
        .await;
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn list_agents_filters_by_owner() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;
        let a = insert_user(&db, "a", false).await;
        let b = insert_user(&db, "b", false).await;
        insert_number(&db, a, "+966500000001").await;
        insert_number(&db, b, "+966500000002").await;
        let app = router(offline_state(db));
        let token = admin_token(admin);

        let all = body_json(send(&app, Method::GET, "/admin/agents", Some(&token), None).await).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let only_a = body_json(
            send(&app, Method::GET, &format!("/admin/agents?user_id={a}"), Some(&token), None).await,
        )
        .await;
        assert_eq!(only_a.as_array().unwrap().len(), 1);
        assert_eq!(only_a[0]["phone_number"], "+966500000001");
    }

    #[tokio::test]
    async fn get_user_by_id() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;
        let target = insert_user(&db, "user1", false).await;
        let app = router(offline_state(db));
        let token = admin_token(admin);

        let res = send(&app, Method::GET, &format!("/admin/users/{target}"), Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["id"], target.to_string());
        assert_eq!(body["username"], "user1");
        assert!(body.get("password_hash").is_none());

        let res = send(
            &app,
            Method::GET,
            &format!("/admin/users/{}", Uuid::now_v7()),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reset_tokens_zeroes_usage() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;
        let target = insert_user(&db, "user1", false).await;
        let row = user::Entity::find_by_id(target).one(&db).await.unwrap().unwrap();
        let mut active: user::ActiveModel = row.into();
        active.ai_tokens_used = Set(750);
        active.update(&db).await.unwrap();

        let res = send(
            &router(offline_state(db.clone())),
            Method::POST,
            &format!("/admin/reset-tokens/{target}"),
            Some(&admin_token(admin)),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["ai_tokens_used"], 0);
        assert_eq!(body["ai_token_limit"], 1000);

        let row = user::Entity::find_by_id(target).one(&db).await.unwrap().unwrap();
        assert_eq!(row.ai_tokens_used, 0);
    }

    // ===== payments =====

    #[tokio::test]
    async fn list_payments_filters_by_status() {
        let db = setup_db().await;
        let admin = insert_user(&db, "admin1", true).await;
        let buyer = insert_user(&db, "buyer", false).await;
        insert_payment(&db, Some(buyer), "pay_1", payment::STATUS_PENDING).await;
        insert_payment(&db, Some(buyer), "pay_2", payment::STATUS_PAID).await;
        insert_payment(&db, None, "pay_3", payment::STATUS_PAID).await;
        let app = router(offline_state(db));
        let token = admin_token(admin);

        let all = body_json(send(&app, Method::GET, "/admin/payments", Some(&token), None).await).await;
        assert_eq!(all["total"], 3);
        assert_eq!(all["data"].as_array().unwrap().len(), 3);

        let res = send(&app, Method::GET, "/admin/payments?status=paid", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let paid = body_json(res).await;
        assert_eq!(paid["total"], 2);
        assert!(
            paid["data"]
                .as_array()
                .unwrap()
                .iter()
                .all(|p| p["status"] == "paid")
        );

        let res = send(&app, Method::GET, "/admin/payments", Some(&user_token(buyer)), None).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
