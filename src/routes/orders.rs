use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};

use crate::{
    dto::orders::{OrderList, OrderWithItems, PlaceOrderRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order))
        .route("/my-orders", get(list_my_orders))
        .route("/{order_code}", get(get_order))
        .route("/{order_code}/cancel", patch(cancel_order))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Validation failure with specific message"),
        (status = 403, description = "Caller is not a customer"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PlaceOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderWithItems>>)> {
    let resp = order_service::place_order(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/orders/my-orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Caller's orders, newest first", body = ApiResponse<OrderList>),
        (status = 403, description = "Caller is not a customer"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_my_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{order_code}",
    params(
        ("order_code" = String, Path, description = "Order code, e.g. ORD-1712345678901-42")
    ),
    responses(
        (status = 200, description = "Order with snapshotted items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not found or not owned by caller"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_code): Path<String>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, &user, &order_code).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{order_code}/cancel",
    params(
        ("order_code" = String, Path, description = "Order code")
    ),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<Order>),
        (status = 400, description = "Order already served or delivered"),
        (status = 404, description = "Not found or not owned by caller"),
        (status = 409, description = "Order already cancelled"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_code): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::cancel_order(&state, &user, &order_code).await?;
    Ok(Json(resp))
}
