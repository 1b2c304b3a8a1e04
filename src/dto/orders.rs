use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderLine, OrderMode};

/// One raw cart line as submitted by the client. Nothing in here is trusted:
/// prices and names are always re-resolved against the live menu.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CartLineRequest {
    pub item_id: Uuid,
    pub restaurant_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub items: Vec<CartLineRequest>,
    pub mode: OrderMode,
    pub address: Option<String>,
    pub table_number: Option<i32>,
    pub payment_method: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItemsList {
    pub items: Vec<OrderWithItems>,
}
