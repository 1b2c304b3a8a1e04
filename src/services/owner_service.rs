use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{LockType, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{OrderWithItems, OrderWithItemsList, UpdateOrderStatusRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner},
    models::{OrderLine, OrderMode, OrderStatus, recognized_revenue},
    response::{ApiResponse, Meta},
    routes::owner::{DashboardAnalytics, DashboardData, DishStat, OwnerRestaurant},
    routes::params::{OwnerOrderQuery, SortOrder},
    services::order_service::{line_from_entity, order_from_entity},
    state::AppState,
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        restaurants::{Entity as Restaurants, Model as RestaurantModel},
    },
};

/// Resolve the caller's linked restaurant or refuse the request.
async fn linked_restaurant(state: &AppState, user: &AuthUser) -> AppResult<RestaurantModel> {
    ensure_owner(user)?;
    let restaurant_id = user.restaurant_id.ok_or_else(|| {
        AppError::Forbidden("Restaurant not linked to your account".into())
    })?;
    Restaurants::find_by_id(restaurant_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

/// Subquery condition: orders carrying at least one line item of the
/// restaurant.
fn restaurant_orders_condition(restaurant_id: Uuid) -> Condition {
    let sub = Query::select()
        .column(OrderItemCol::OrderId)
        .from(OrderItems)
        .and_where(OrderItemCol::RestaurantId.eq(restaurant_id))
        .to_owned();
    Condition::all().add(OrderCol::Id.in_subquery(sub))
}

pub async fn list_restaurant_orders(
    state: &AppState,
    user: &AuthUser,
    query: OwnerOrderQuery,
) -> AppResult<ApiResponse<OrderWithItemsList>> {
    let restaurant = linked_restaurant(state, user).await?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = restaurant_orders_condition(restaurant.id);
    if let Some(mode) = query.mode.as_deref().filter(|s| !s.is_empty()) {
        let mode = OrderMode::parse(mode)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown order mode {mode}")))?;
        condition = condition.add(OrderCol::Mode.eq(mode.as_str()));
    }
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status = OrderStatus::parse(status)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown order status {status}")))?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let page_orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = page_orders.iter().map(|o| o.id).collect();
    let mut lines_by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    if !order_ids.is_empty() {
        for item in OrderItems::find()
            .filter(OrderItemCol::OrderId.is_in(order_ids))
            .all(&state.orm)
            .await?
        {
            lines_by_order
                .entry(item.order_id)
                .or_default()
                .push(line_from_entity(item));
        }
    }

    let items = page_orders
        .into_iter()
        .map(|model| {
            let lines = lines_by_order.remove(&model.id).unwrap_or_default();
            Ok(OrderWithItems {
                order: order_from_entity(model)?,
                items: lines,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderWithItemsList { items },
        Some(meta),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    order_code: &str,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<crate::models::Order>> {
    let restaurant = linked_restaurant(state, user).await?;

    let next = OrderStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid status {}", payload.status)))?;

    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(OrderCol::OrderCode.eq(order_code))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let has_item = OrderItems::find()
        .filter(
            Condition::all()
                .add(OrderItemCol::OrderId.eq(order.id))
                .add(OrderItemCol::RestaurantId.eq(restaurant.id)),
        )
        .count(&txn)
        .await?
        > 0;
    if !has_item {
        return Err(AppError::Forbidden(
            "Unauthorized to update this order".into(),
        ));
    }

    let current = OrderStatus::parse(&order.status).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("unknown order status in store"))
    })?;
    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot change order status from {} to {}",
            current.as_str(),
            next.as_str()
        )));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(next.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({
            "order_code": order.order_code,
            "status": order.status,
            "restaurant_id": restaurant.id,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order status updated",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

pub async fn dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DashboardData>> {
    let restaurant = linked_restaurant(state, user).await?;

    let rows = Orders::find()
        .filter(restaurant_orders_condition(restaurant.id))
        .order_by_desc(OrderCol::CreatedAt)
        .find_with_related(OrderItems)
        .all(&state.orm)
        .await?;

    let mut orders = Vec::with_capacity(rows.len());
    let mut dish_stats: HashMap<Uuid, DishStat> = HashMap::new();
    for (order_model, items) in rows {
        for item in items.iter().filter(|i| i.restaurant_id == restaurant.id) {
            let stat = dish_stats.entry(item.item_id).or_insert_with(|| DishStat {
                name: item.item_name.clone(),
                quantity: 0,
                revenue: 0,
            });
            stat.quantity += item.quantity as i64;
            stat.revenue += item.unit_price * item.quantity as i64;
        }
        orders.push(order_from_entity(order_model)?);
    }

    let total_orders = orders
        .iter()
        .filter(|o| o.status != OrderStatus::Cancelled)
        .count() as i64;
    let pending_orders = orders
        .iter()
        .filter(|o| matches!(o.status, OrderStatus::Received | OrderStatus::Preparing))
        .count() as i64;
    let total_revenue = recognized_revenue(&orders);

    let mut top_dishes: Vec<DishStat> = dish_stats.into_values().collect();
    top_dishes.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    top_dishes.truncate(5);

    let data = DashboardData {
        restaurant: OwnerRestaurant {
            id: restaurant.id,
            name: restaurant.name,
            address: restaurant.address,
            is_approved: restaurant.is_approved,
            is_active: restaurant.is_active,
        },
        analytics: DashboardAnalytics {
            total_orders,
            total_revenue,
            pending_orders,
            top_dishes,
        },
    };

    Ok(ApiResponse::success("Dashboard", data, Some(Meta::empty())))
}
