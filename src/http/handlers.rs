use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::deliveries::DeliveryService;
use crate::app::menus::{MenuService, MenuUpsert};
use crate::app::mess_cut::{MessCutService, PgMessCutStore};
use crate::app::messes::{MessService, NewMess};
use crate::app::notifications::NotificationService;
use crate::app::subscriptions::SubscriptionService;
use crate::app::users::UserService;
use crate::domain::delivery::{Delivery, MealSlot, SkippedDelivery};
use crate::domain::menu::MenuEntry;
use crate::domain::mess::{Mess, MessListing};
use crate::domain::serde_date;
use crate::domain::subscription::Subscription;
use crate::domain::user::{Capability, User, UserRole};
use crate::http::{AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

fn parse_date(value: &str) -> Result<Date, AppError> {
    Date::parse(value, &serde_date::FORMAT)
        .map_err(|_| AppError::bad_request("invalid date, expected YYYY-MM-DD"))
}

fn parse_slot(value: &str) -> Result<MealSlot, AppError> {
    MealSlot::from_db(value)
        .ok_or_else(|| AppError::bad_request("meal_slot must be breakfast, lunch or dinner"))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SignupRequest {
    pub handle: String,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub password: String,
}

pub async fn signup(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    const MAX_PASSWORD_LEN: usize = 128;

    if payload.handle.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.display_name.trim().is_empty()
    {
        return Err(AppError::bad_request(
            "handle, email and display_name are required",
        ));
    }
    if payload.password.len() < 8 {
        return Err(AppError::bad_request("password must be at least 8 characters"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let role = match payload.role.as_deref() {
        None | Some("customer") => UserRole::Customer,
        Some("mess_owner") => UserRole::MessOwner,
        // Admin accounts are only minted by an existing admin.
        Some("admin") => {
            let caller_is_admin = auth
                .as_ref()
                .map(|auth| auth.role == UserRole::Admin)
                .unwrap_or(false);
            if !caller_is_admin {
                return Err(AppError::forbidden("only an admin can create admin accounts"));
            }
            UserRole::Admin
        }
        Some(_) => {
            return Err(AppError::bad_request(
                "role must be customer, mess_owner or admin",
            ))
        }
    };

    let service = auth_service(&state);
    let user = service
        .signup(
            payload.handle,
            payload.email,
            payload.display_name,
            payload.phone,
            role,
            payload.password,
        )
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::conflict("handle or email already in use")
            } else {
                tracing::error!(error = ?err, "failed to sign up");
                AppError::internal("failed to sign up")
            }
        })?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_expires_at: OffsetDateTime,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.identifier.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("identifier and password are required"));
    }

    let service = auth_service(&state);
    let tokens = service
        .login(&payload.identifier, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match tokens {
        Some(tokens) => Ok(Json(token_response(tokens))),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    let service = auth_service(&state);
    let tokens = service.refresh(&payload.refresh_token).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to refresh token");
        AppError::internal("failed to refresh token")
    })?;

    match tokens {
        Some(tokens) => Ok(Json(token_response(tokens))),
        None => Err(AppError::unauthorized("invalid refresh token")),
    }
}

pub async fn revoke_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<StatusCode, AppError> {
    let service = auth_service(&state);
    service
        .revoke_refresh_token(&payload.refresh_token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to revoke token");
            AppError::internal("failed to revoke token")
        })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let service = auth_service(&state);
    let user = service
        .get_current_user(auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to load current user");
            AppError::internal("failed to load current user")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(user))
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.db.clone(),
        state.paseto_access_key,
        state.paseto_refresh_key,
        state.access_ttl_minutes,
        state.refresh_ttl_days,
    )
}

fn token_response(tokens: crate::app::auth::TokenPair) -> AuthTokenResponse {
    AuthTokenResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        access_expires_at: tokens.access_expires_at,
        refresh_expires_at: tokens.refresh_expires_at,
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|err| err.as_database_error())
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    auth.require(Capability::ListUsers)?;
    let limit = query.limit.unwrap_or(100).clamp(1, 500);

    let service = UserService::new(state.db.clone());
    let users = service.list_users(limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list users");
        AppError::internal("failed to list users")
    })?;

    Ok(Json(users))
}

pub async fn get_user(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    if auth.user_id != id {
        auth.require(Capability::ListUsers)?;
    }

    let service = UserService::new(state.db.clone());
    let user = service
        .get_user(id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to load user");
            AppError::internal("failed to load user")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub phone: Option<String>,
}

pub async fn update_profile(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    if auth.user_id != id {
        return Err(AppError::forbidden("cannot update another user's profile"));
    }

    let service = UserService::new(state.db.clone());
    let user = service
        .update_profile(id, payload.display_name, payload.phone)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to update profile");
            AppError::internal("failed to update profile")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(user))
}

// ---------------------------------------------------------------------------
// Messes & menus
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateMessRequest {
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rate_breakfast: i32,
    pub rate_lunch: i32,
    pub rate_dinner: i32,
}

pub async fn create_mess(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateMessRequest>,
) -> Result<(StatusCode, Json<Mess>), AppError> {
    auth.require(Capability::ManageMess)?;

    if payload.name.trim().is_empty() || payload.address.trim().is_empty() {
        return Err(AppError::bad_request("name and address are required"));
    }
    if !(-90.0..=90.0).contains(&payload.latitude)
        || !(-180.0..=180.0).contains(&payload.longitude)
    {
        return Err(AppError::bad_request("invalid coordinates"));
    }
    if payload.rate_breakfast < 0 || payload.rate_lunch < 0 || payload.rate_dinner < 0 {
        return Err(AppError::bad_request("rates must not be negative"));
    }

    let service = MessService::new(state.db.clone());
    let mess = service
        .create(
            auth.user_id,
            NewMess {
                name: payload.name,
                description: payload.description,
                address: payload.address,
                latitude: payload.latitude,
                longitude: payload.longitude,
                rate_breakfast: payload.rate_breakfast,
                rate_lunch: payload.rate_lunch,
                rate_dinner: payload.rate_dinner,
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, owner_id = %auth.user_id, "failed to create mess");
            AppError::internal("failed to create mess")
        })?;

    Ok((StatusCode::CREATED, Json(mess)))
}

#[derive(Deserialize)]
pub struct ListMessesQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub limit: Option<i64>,
}

pub async fn list_messes(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListMessesQuery>,
) -> Result<Json<Vec<MessListing>>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let near = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => Some((lat, lng)),
        (None, None) => None,
        _ => return Err(AppError::bad_request("lat and lng must be given together")),
    };

    let service = MessService::new(state.db.clone());
    let listings = service.list(near, limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list messes");
        AppError::internal("failed to list messes")
    })?;

    Ok(Json(listings))
}

pub async fn get_mess(
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Mess>, AppError> {
    let service = MessService::new(state.db.clone());
    let mess = service
        .get(id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, mess_id = %id, "failed to load mess");
            AppError::internal("failed to load mess")
        })?
        .ok_or_else(|| AppError::not_found("mess not found"))?;

    Ok(Json(mess))
}

#[derive(Deserialize)]
pub struct UpdateMessRequest {
    pub description: Option<String>,
    pub address: Option<String>,
    pub rate_breakfast: Option<i32>,
    pub rate_lunch: Option<i32>,
    pub rate_dinner: Option<i32>,
}

pub async fn update_mess(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateMessRequest>,
) -> Result<Json<Mess>, AppError> {
    auth.require(Capability::ManageMess)?;

    let service = MessService::new(state.db.clone());
    let mess = service
        .update(
            id,
            auth.user_id,
            payload.description,
            payload.address,
            payload.rate_breakfast,
            payload.rate_lunch,
            payload.rate_dinner,
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, mess_id = %id, "failed to update mess");
            AppError::internal("failed to update mess")
        })?
        .ok_or_else(|| AppError::not_found("mess not found"))?;

    Ok(Json(mess))
}

pub async fn get_menu(
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<MenuEntry>>, AppError> {
    let service = MenuService::new(state.db.clone());
    let entries = service.week(id).await.map_err(|err| {
        tracing::error!(error = ?err, mess_id = %id, "failed to load menu");
        AppError::internal("failed to load menu")
    })?;

    Ok(Json(entries))
}

#[derive(Deserialize)]
pub struct MenuEntryRequest {
    pub weekday: i16,
    pub meal_slot: String,
    pub items: String,
}

#[derive(Deserialize)]
pub struct PutMenuRequest {
    pub entries: Vec<MenuEntryRequest>,
}

#[derive(Serialize)]
pub struct PutMenuResponse {
    pub updated: usize,
}

pub async fn put_menu(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<PutMenuRequest>,
) -> Result<Json<PutMenuResponse>, AppError> {
    auth.require(Capability::ManageMenu)?;
    require_mess_owner(&state, id, &auth).await?;

    let mut entries = Vec::with_capacity(payload.entries.len());
    for entry in payload.entries {
        if !(0..=6).contains(&entry.weekday) {
            return Err(AppError::bad_request("weekday must be 0 (Monday) to 6"));
        }
        entries.push(MenuUpsert {
            weekday: entry.weekday,
            meal_slot: parse_slot(&entry.meal_slot)?,
            items: entry.items,
        });
    }

    let service = MenuService::new(state.db.clone());
    let updated = service.upsert_week(id, entries).await.map_err(|err| {
        tracing::error!(error = ?err, mess_id = %id, "failed to update menu");
        AppError::internal("failed to update menu")
    })?;

    Ok(Json(PutMenuResponse { updated }))
}

async fn require_mess_owner(
    state: &AppState,
    mess_id: Uuid,
    auth: &AuthUser,
) -> Result<Mess, AppError> {
    let service = MessService::new(state.db.clone());
    let mess = service
        .get(mess_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, mess_id = %mess_id, "failed to load mess");
            AppError::internal("failed to load mess")
        })?
        .ok_or_else(|| AppError::not_found("mess not found"))?;

    if mess.owner_id != auth.user_id && auth.role != UserRole::Admin {
        return Err(AppError::forbidden("not the owner of this mess"));
    }
    Ok(mess)
}

pub async fn list_mess_subscriptions(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Subscription>>, AppError> {
    require_mess_owner(&state, id, &auth).await?;

    let service = SubscriptionService::new(state.db.clone());
    let subscriptions = service.list_for_mess(id).await.map_err(|err| {
        tracing::error!(error = ?err, mess_id = %id, "failed to list subscriptions");
        AppError::internal("failed to list subscriptions")
    })?;

    Ok(Json(subscriptions))
}

#[derive(Deserialize)]
pub struct MessDeliveriesQuery {
    pub date: String,
}

pub async fn list_mess_deliveries(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(query): Query<MessDeliveriesQuery>,
) -> Result<Json<Vec<Delivery>>, AppError> {
    require_mess_owner(&state, id, &auth).await?;
    let date = parse_date(&query.date)?;

    let service = DeliveryService::new(state.db.clone());
    let deliveries = service.list_for_mess_on(id, date).await.map_err(|err| {
        tracing::error!(error = ?err, mess_id = %id, "failed to list deliveries");
        AppError::internal("failed to list deliveries")
    })?;

    Ok(Json(deliveries))
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateSubscriptionRequest {
    pub mess_id: Uuid,
    pub meal_slots: Vec<String>,
    pub start_date: String,
    pub end_date: String,
}

pub async fn create_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    // Deliveries are provisioned up front, one row per day and slot.
    const MAX_PLAN_DAYS: i64 = 92;

    auth.require(Capability::Subscribe)?;

    if payload.meal_slots.is_empty() {
        return Err(AppError::bad_request("at least one meal slot is required"));
    }
    let mut slots = Vec::with_capacity(payload.meal_slots.len());
    for label in &payload.meal_slots {
        let slot = parse_slot(label)?;
        if slots.contains(&slot) {
            return Err(AppError::bad_request("duplicate meal slot"));
        }
        slots.push(slot);
    }
    let start_date = parse_date(&payload.start_date)?;
    let end_date = parse_date(&payload.end_date)?;
    if end_date < start_date {
        return Err(AppError::bad_request("end_date precedes start_date"));
    }
    if (end_date - start_date).whole_days() + 1 > MAX_PLAN_DAYS {
        return Err(AppError::bad_request("plan may cover at most 92 days"));
    }

    let mess = MessService::new(state.db.clone())
        .get(payload.mess_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, mess_id = %payload.mess_id, "failed to load mess");
            AppError::internal("failed to load mess")
        })?
        .ok_or_else(|| AppError::not_found("mess not found"))?;

    let service = SubscriptionService::new(state.db.clone());
    let subscription = service
        .create(auth.user_id, &mess, slots, start_date, end_date)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, customer_id = %auth.user_id, "failed to create subscription");
            AppError::internal("failed to create subscription")
        })?;

    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn list_my_subscriptions(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Subscription>>, AppError> {
    let service = SubscriptionService::new(state.db.clone());
    let subscriptions = service
        .list_for_customer(auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, customer_id = %auth.user_id, "failed to list subscriptions");
            AppError::internal("failed to list subscriptions")
        })?;

    Ok(Json(subscriptions))
}

async fn load_subscription(
    state: &AppState,
    subscription_id: Uuid,
) -> Result<Subscription, AppError> {
    SubscriptionService::new(state.db.clone())
        .get(subscription_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, subscription_id = %subscription_id, "failed to load subscription");
            AppError::internal("failed to load subscription")
        })?
        .ok_or_else(|| AppError::not_found("subscription not found"))
}

pub async fn get_subscription(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Subscription>, AppError> {
    let subscription = load_subscription(&state, id).await?;
    if subscription.customer_id != auth.user_id && auth.role != UserRole::Admin {
        require_mess_owner(&state, subscription.mess_id, &auth).await?;
    }

    Ok(Json(subscription))
}

pub async fn cancel_subscription(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let today = OffsetDateTime::now_utc().to_offset(state.mess_tz).date();
    let service = SubscriptionService::new(state.db.clone());
    let cancelled = service.cancel(id, auth.user_id, today).await.map_err(|err| {
        tracing::error!(error = ?err, subscription_id = %id, "failed to cancel subscription");
        AppError::internal("failed to cancel subscription")
    })?;

    if cancelled {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("no active subscription to cancel"))
    }
}

pub async fn list_subscription_deliveries(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Delivery>>, AppError> {
    let subscription = load_subscription(&state, id).await?;
    if subscription.customer_id != auth.user_id && auth.role != UserRole::Admin {
        return Err(AppError::forbidden("not your subscription"));
    }

    let service = DeliveryService::new(state.db.clone());
    let deliveries = service.list_for_subscription(id).await.map_err(|err| {
        tracing::error!(error = ?err, subscription_id = %id, "failed to list deliveries");
        AppError::internal("failed to list deliveries")
    })?;

    Ok(Json(deliveries))
}

// ---------------------------------------------------------------------------
// Mess cut
// ---------------------------------------------------------------------------

fn mess_cut_service(
    state: &AppState,
) -> MessCutService<PgMessCutStore, NotificationService> {
    MessCutService::new(
        PgMessCutStore::new(state.db.clone()),
        NotificationService::new(state.db.clone(), state.push.clone()),
        state.mess_tz,
    )
}

#[derive(Deserialize)]
pub struct EligibilityQuery {
    pub date: String,
    pub meal_slot: String,
}

#[derive(Serialize)]
pub struct EligibilityResponse {
    pub eligible: bool,
}

pub async fn mess_cut_eligibility(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<EligibilityQuery>,
) -> Result<Json<EligibilityResponse>, AppError> {
    let date = parse_date(&query.date)?;
    let slot = parse_slot(&query.meal_slot)?;

    let service = mess_cut_service(&state);
    let eligible = service.eligibility(date, slot, OffsetDateTime::now_utc());

    Ok(Json(EligibilityResponse { eligible }))
}

#[derive(Deserialize)]
pub struct MessCutRequest {
    pub date: String,
    pub meal_slot: String,
    pub reason: Option<String>,
}

pub async fn request_mess_cut(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<MessCutRequest>,
) -> Result<Json<SkippedDelivery>, AppError> {
    auth.require(Capability::RequestMessCut)?;

    let date = parse_date(&payload.date)?;
    let slot = parse_slot(&payload.meal_slot)?;

    let subscription = load_subscription(&state, id).await?;
    if subscription.customer_id != auth.user_id {
        return Err(AppError::forbidden("not your subscription"));
    }

    let service = mess_cut_service(&state);
    let skipped = service
        .request_skip(id, date, slot, payload.reason, OffsetDateTime::now_utc())
        .await?;

    Ok(Json(skipped))
}

pub async fn acknowledge_mess_cut(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    auth.require(Capability::AcknowledgeMessCut)?;
    require_delivery_owner(&state, id, &auth).await?;

    let service = mess_cut_service(&state);
    service.acknowledge(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_delivered(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    auth.require(Capability::MarkDelivered)?;
    require_delivery_owner(&state, id, &auth).await?;

    let service = DeliveryService::new(state.db.clone());
    let marked = service.mark_delivered(id).await.map_err(|err| {
        tracing::error!(error = ?err, delivery_id = %id, "failed to mark delivered");
        AppError::internal("failed to mark delivered")
    })?;

    if marked {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::conflict("delivery is not in scheduled state"))
    }
}

async fn require_delivery_owner(
    state: &AppState,
    delivery_id: Uuid,
    auth: &AuthUser,
) -> Result<(), AppError> {
    let service = DeliveryService::new(state.db.clone());
    let (_, owner_id) = service
        .get_with_owner(delivery_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, delivery_id = %delivery_id, "failed to load delivery");
            AppError::internal("failed to load delivery")
        })?
        .ok_or_else(|| AppError::not_found("delivery not found"))?;

    if owner_id != auth.user_id && auth.role != UserRole::Admin {
        return Err(AppError::forbidden("not the owner of this mess"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<crate::domain::notification::Notification>>, AppError> {
    let limit = query.limit.unwrap_or(30);
    if !(1..=200).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 200"));
    }
    let cursor = parse_cursor(query.cursor)?;

    let service = NotificationService::new(state.db.clone(), state.push.clone());
    let mut notifications = service
        .list(auth.user_id, cursor, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to list notifications");
            AppError::internal("failed to list notifications")
        })?;

    let next_cursor = if notifications.len() > limit as usize {
        let last = notifications.pop().expect("checked len");
        Some((last.created_at, last.id))
    } else {
        None
    };

    Ok(Json(ListResponse {
        items: notifications,
        next_cursor: encode_cursor(next_cursor),
    }))
}

pub async fn mark_notification_read(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = NotificationService::new(state.db.clone(), state.push.clone());
    let updated = service.mark_read(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, notification_id = %id, user_id = %auth.user_id, "failed to mark notification read");
        AppError::internal("failed to mark notification read")
    })?;

    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("notification not found"))
    }
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let service = NotificationService::new(state.db.clone(), state.push.clone());
    let count = service.unread_count(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to count notifications");
        AppError::internal("failed to count notifications")
    })?;

    Ok(Json(UnreadCountResponse { count }))
}
