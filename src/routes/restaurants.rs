use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::restaurants::RestaurantList,
    error::AppResult,
    models::Restaurant,
    response::ApiResponse,
    services::catalog,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_restaurants))
        .route("/{id}", get(get_restaurant))
}

#[utoipa::path(
    get,
    path = "/api/restaurants",
    responses(
        (status = 200, description = "List approved, active restaurants", body = ApiResponse<RestaurantList>)
    ),
    tag = "Restaurants"
)]
pub async fn list_restaurants(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<RestaurantList>>> {
    let resp = catalog::list_restaurants(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/restaurants/{id}",
    params(
        ("id" = Uuid, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Restaurant with category/menu tree", body = ApiResponse<Restaurant>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Restaurants"
)]
pub async fn get_restaurant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Restaurant>>> {
    let resp = catalog::get_restaurant(&state, id).await?;
    Ok(Json(resp))
}
