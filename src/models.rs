use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    RestaurantOwner,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Role::Customer),
            "restaurant_owner" => Some(Role::RestaurantOwner),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::RestaurantOwner => "restaurant_owner",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderMode {
    Delivery,
    Dinein,
}

impl OrderMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "delivery" => Some(OrderMode::Delivery),
            "dinein" => Some(OrderMode::Dinein),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderMode::Delivery => "delivery",
            OrderMode::Dinein => "dinein",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Card,
    Upi,
}

impl PaymentMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cod" => Some(PaymentMethod::Cod),
            "card" => Some(PaymentMethod::Card),
            "upi" => Some(PaymentMethod::Upi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Received,
    Preparing,
    Served,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "received" => Some(OrderStatus::Received),
            "preparing" => Some(OrderStatus::Preparing),
            "served" => Some(OrderStatus::Served),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Received => "received",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Served => "served",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Served | OrderStatus::Delivered | OrderStatus::Cancelled
        )
    }

    /// Explicit transition table for the fulfillment pipeline. Terminal
    /// states admit nothing; cancellation is only reachable before the
    /// kitchen hands the order over.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match self {
            Received => matches!(next, Preparing | Cancelled),
            Preparing => matches!(next, Served | Delivered | Cancelled),
            Served | Delivered | Cancelled => false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub restaurant_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub image: Option<String>,
    pub vegetarian: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_approved: bool,
    pub is_active: bool,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_code: String,
    pub user_id: Uuid,
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub total: i64,
    pub mode: OrderMode,
    pub address: Option<String>,
    pub table_number: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance_km: Option<f64>,
    pub estimated_time: String,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Revenue-recognition rule shared by the owner dashboard and admin
    /// stats: cancelled orders never count, and cash-on-delivery only
    /// counts once the order was actually handed over.
    pub fn counts_toward_revenue(&self) -> bool {
        if self.status == OrderStatus::Cancelled {
            return false;
        }
        match self.payment_method {
            PaymentMethod::Cod => matches!(
                self.status,
                OrderStatus::Served | OrderStatus::Delivered
            ),
            PaymentMethod::Card | PaymentMethod::Upi => true,
        }
    }
}

pub fn recognized_revenue(orders: &[Order]) -> i64 {
    orders
        .iter()
        .filter(|o| o.counts_toward_revenue())
        .map(|o| o.total)
        .sum()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub restaurant_id: Uuid,
    pub restaurant_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus, payment_method: PaymentMethod, total: i64) -> Order {
        Order {
            id: Uuid::new_v4(),
            order_code: "ORD-0-0".into(),
            user_id: Uuid::new_v4(),
            subtotal: total,
            delivery_fee: 0,
            total,
            mode: OrderMode::Delivery,
            address: Some("12 Main St".into()),
            table_number: None,
            latitude: None,
            longitude: None,
            distance_km: None,
            estimated_time: "30-40 mins".into(),
            payment_method,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn received_moves_to_preparing_or_cancelled_only() {
        let s = OrderStatus::Received;
        assert!(s.can_transition_to(OrderStatus::Preparing));
        assert!(s.can_transition_to(OrderStatus::Cancelled));
        assert!(!s.can_transition_to(OrderStatus::Served));
        assert!(!s.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn preparing_moves_to_fulfilled_or_cancelled() {
        let s = OrderStatus::Preparing;
        assert!(s.can_transition_to(OrderStatus::Served));
        assert!(s.can_transition_to(OrderStatus::Delivered));
        assert!(s.can_transition_to(OrderStatus::Cancelled));
        assert!(!s.can_transition_to(OrderStatus::Received));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for s in [
            OrderStatus::Served,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert!(s.is_terminal());
            for next in [
                OrderStatus::Received,
                OrderStatus::Preparing,
                OrderStatus::Served,
                OrderStatus::Delivered,
                OrderStatus::Cancelled,
            ] {
                assert!(!s.can_transition_to(next));
            }
        }
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(OrderStatus::parse("Preparing"), Some(OrderStatus::Preparing));
        assert_eq!(OrderStatus::parse("DELIVERED"), Some(OrderStatus::Delivered));
        assert_eq!(OrderStatus::parse("shipped"), None);
    }

    #[test]
    fn cancelled_orders_never_count_toward_revenue() {
        let o = order(OrderStatus::Cancelled, PaymentMethod::Card, 500);
        assert!(!o.counts_toward_revenue());
    }

    #[test]
    fn cod_counts_only_after_fulfillment() {
        assert!(!order(OrderStatus::Received, PaymentMethod::Cod, 100).counts_toward_revenue());
        assert!(!order(OrderStatus::Preparing, PaymentMethod::Cod, 100).counts_toward_revenue());
        assert!(order(OrderStatus::Served, PaymentMethod::Cod, 100).counts_toward_revenue());
        assert!(order(OrderStatus::Delivered, PaymentMethod::Cod, 100).counts_toward_revenue());
    }

    #[test]
    fn prepaid_counts_unless_cancelled() {
        assert!(order(OrderStatus::Received, PaymentMethod::Upi, 100).counts_toward_revenue());
        assert!(order(OrderStatus::Preparing, PaymentMethod::Card, 100).counts_toward_revenue());
    }

    #[test]
    fn recognized_revenue_sums_qualifying_totals() {
        let orders = vec![
            order(OrderStatus::Delivered, PaymentMethod::Cod, 300),
            order(OrderStatus::Received, PaymentMethod::Cod, 200),
            order(OrderStatus::Received, PaymentMethod::Card, 150),
            order(OrderStatus::Cancelled, PaymentMethod::Upi, 999),
        ];
        assert_eq!(recognized_revenue(&orders), 450);
    }
}
