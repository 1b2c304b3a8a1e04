use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// List-view projection without the category/menu tree.
#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantSummary {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantList {
    pub items: Vec<RestaurantSummary>,
}
