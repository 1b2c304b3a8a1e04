use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::orders::{OrderWithItemsList, UpdateOrderStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    routes::params::OwnerOrderQuery,
    services::owner_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_restaurant_orders))
        .route("/orders/{order_code}/status", put(update_order_status))
        .route("/dashboard", get(dashboard))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OwnerRestaurant {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub is_approved: bool,
    pub is_active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DishStat {
    pub name: String,
    pub quantity: i64,
    pub revenue: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardAnalytics {
    pub total_orders: i64,
    pub total_revenue: i64,
    pub pending_orders: i64,
    pub top_dishes: Vec<DishStat>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardData {
    pub restaurant: OwnerRestaurant,
    pub analytics: DashboardAnalytics,
}

#[utoipa::path(
    get,
    path = "/api/restaurant-owner/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("mode" = Option<String>, Query, description = "Filter by mode: delivery, dinein"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Orders containing the caller's restaurant items", body = ApiResponse<OrderWithItemsList>),
        (status = 403, description = "Caller is not a restaurant owner or has no linked restaurant"),
    ),
    security(("bearer_auth" = [])),
    tag = "Restaurant Owner"
)]
pub async fn list_restaurant_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OwnerOrderQuery>,
) -> AppResult<Json<ApiResponse<OrderWithItemsList>>> {
    let resp = owner_service::list_restaurant_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/restaurant-owner/orders/{order_code}/status",
    params(
        ("order_code" = String, Path, description = "Order code")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<Order>),
        (status = 400, description = "Unknown status or illegal transition"),
        (status = 403, description = "Order has no line item of the caller's restaurant"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Restaurant Owner"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_code): Path<String>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = owner_service::update_order_status(&state, &user, &order_code, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/restaurant-owner/dashboard",
    responses(
        (status = 200, description = "Restaurant profile and order analytics", body = ApiResponse<DashboardData>),
        (status = 403, description = "Caller is not a restaurant owner"),
    ),
    security(("bearer_auth" = [])),
    tag = "Restaurant Owner"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardData>>> {
    let resp = owner_service::dashboard(&state, &user).await?;
    Ok(Json(resp))
}
