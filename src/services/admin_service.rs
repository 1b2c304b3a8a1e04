use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::{
    audit::log_audit,
    dto::orders::{OrderList, UpdateOrderStatusRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderStatus, Role, recognized_revenue},
    response::{ApiResponse, Meta},
    routes::admin::{ResetResult, StatsData},
    routes::params::{OrderListQuery, SortOrder},
    services::order_service::order_from_entity,
    state::AppState,
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        users::{Column as UserCol, Entity as Users},
    },
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
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

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

/// Admin status updates accept any valid target status; this path is the
/// correction escape hatch, so the owner-side transition table is not
/// enforced here.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    order_code: &str,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let next = OrderStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid status {}", payload.status)))?;

    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(OrderCol::OrderCode.eq(order_code))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

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
        Some(serde_json::json!({ "order_code": order.order_code, "status": order.status })),
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

/// Administrative reset: removes every order (line items go with them via
/// cascade) and reports how many were removed. Irreversible.
pub async fn delete_all_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ResetResult>> {
    ensure_admin(user)?;

    let result = Orders::delete_many().exec(&state.orm).await?;
    let deleted = result.rows_affected;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "orders_reset",
        Some("orders"),
        Some(serde_json::json!({ "deleted": deleted })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Orders deleted",
        ResetResult { deleted },
        Some(Meta::empty()),
    ))
}

pub async fn stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<StatsData>> {
    ensure_admin(user)?;

    let orders = Orders::find()
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<Order>>>()?;

    let total_orders = orders.len() as i64;
    let total_revenue = recognized_revenue(&orders);
    let pending_orders = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Received)
        .count() as i64;

    let total_users = Users::find()
        .filter(UserCol::Role.ne(Role::Admin.as_str()))
        .count(&state.orm)
        .await? as i64;

    let data = StatsData {
        total_orders,
        total_revenue,
        total_users,
        pending_orders,
    };
    Ok(ApiResponse::success("Stats", data, Some(Meta::empty())))
}
