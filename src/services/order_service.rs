use std::collections::HashMap;

use chrono::Utc;
use password_hash::rand_core::{OsRng, RngCore};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{OrderList, OrderWithItems, PlaceOrderRequest},
    error::{AppError, AppResult},
    geo::{self, DeliveryQuote},
    middleware::auth::{AuthUser, ensure_customer},
    models::{Order, OrderLine, OrderMode, OrderStatus, PaymentMethod},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::catalog::{self, ItemSnapshot, RestaurantCatalog},
    state::AppState,
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders,
            Model as OrderModel,
        },
    },
};

/// A cart line after resolution against the live menu: quantities come from
/// the client, everything else from the catalog snapshot.
#[derive(Debug, Clone)]
struct ResolvedLine {
    restaurant_id: Uuid,
    restaurant_name: String,
    item: ItemSnapshot,
    quantity: i32,
}

pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_customer(user)?;

    let PlaceOrderRequest {
        items,
        mode,
        address,
        table_number,
        payment_method,
        latitude,
        longitude,
    } = payload;

    if items.is_empty() {
        return Err(AppError::BadRequest(
            "Order must include at least one item".into(),
        ));
    }
    for line in &items {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest(
                "Item quantity must be a positive number".into(),
            ));
        }
    }

    let payment_method = parse_payment_method(payment_method.as_deref())?;
    validate_mode_fields(mode, address.as_deref(), table_number)?;

    // Resolve every line against the current catalog; one fetch per distinct
    // restaurant within this submission.
    let mut catalogs: HashMap<Uuid, RestaurantCatalog> = HashMap::new();
    let mut resolved: Vec<ResolvedLine> = Vec::with_capacity(items.len());

    for line in &items {
        if !catalogs.contains_key(&line.restaurant_id) {
            let catalog = catalog::load_catalog(&state.orm, line.restaurant_id)
                .await?
                .ok_or_else(|| {
                    AppError::BadRequest(format!("Restaurant {} not found", line.restaurant_id))
                })?;
            if !catalog.restaurant.is_approved || !catalog.restaurant.is_active {
                return Err(AppError::BadRequest(format!(
                    "Restaurant {} is not accepting orders",
                    catalog.restaurant.name
                )));
            }
            catalogs.insert(line.restaurant_id, catalog);
        }
        let catalog = &catalogs[&line.restaurant_id];
        let item = catalog.find_item(line.item_id).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Item {} not available for restaurant {}",
                line.item_id, catalog.restaurant.name
            ))
        })?;
        resolved.push(ResolvedLine {
            restaurant_id: line.restaurant_id,
            restaurant_name: catalog.restaurant.name.clone(),
            item,
            quantity: line.quantity,
        });
    }

    let resolved = merge_lines(resolved);
    let subtotal: i64 = resolved
        .iter()
        .map(|l| l.item.price * l.quantity as i64)
        .sum();

    // Delivery economics are computed once per order, against the first
    // validated line's restaurant.
    let (delivery_fee, estimated_time, distance_km) = match mode {
        OrderMode::Delivery => {
            let reference = &catalogs[&resolved[0].restaurant_id].restaurant;
            let quote = match (reference.location(), latitude.zip(longitude)) {
                (Some((rest_lat, rest_lon)), Some((user_lat, user_lon))) => {
                    DeliveryQuote::compute(rest_lat, rest_lon, user_lat, user_lon)
                }
                _ => DeliveryQuote::fallback(),
            };
            (quote.fee, quote.estimated_time, Some(quote.distance_km))
        }
        OrderMode::Dinein => (0, geo::DINE_IN_TIME.to_string(), None),
    };
    let total = subtotal + delivery_fee;

    let txn = state.orm.begin().await?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        order_code: Set(generate_order_code()),
        user_id: Set(user.user_id),
        subtotal: Set(subtotal),
        delivery_fee: Set(delivery_fee),
        total: Set(total),
        mode: Set(mode.as_str().to_string()),
        address: Set(address),
        table_number: Set(table_number),
        latitude: Set(latitude),
        longitude: Set(longitude),
        distance_km: Set(distance_km),
        estimated_time: Set(estimated_time),
        payment_method: Set(payment_method.as_str().to_string()),
        status: Set(OrderStatus::Received.as_str().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut lines: Vec<OrderLine> = Vec::with_capacity(resolved.len());
    for line in resolved {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            item_id: Set(line.item.id),
            item_name: Set(line.item.name),
            restaurant_id: Set(line.restaurant_id),
            restaurant_name: Set(line.restaurant_name),
            unit_price: Set(line.item.price),
            quantity: Set(line.quantity),
            image: Set(line.item.image),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        lines.push(line_from_entity(item));
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_created",
        Some("orders"),
        Some(serde_json::json!({ "order_code": order.order_code, "total": order.total })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems {
            order: order_from_entity(order)?,
            items: lines,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_customer(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
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

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    order_code: &str,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_customer(user)?;
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::OrderCode.eq(order_code))
                .add(OrderCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(line_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Order",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    order_code: &str,
) -> AppResult<ApiResponse<Order>> {
    ensure_customer(user)?;

    let txn = state.orm.begin().await?;

    // Re-fetch under a row lock immediately before the status check to keep
    // the race window with a concurrent kitchen update as small as possible.
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::OrderCode.eq(order_code))
                .add(OrderCol::UserId.eq(user.user_id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    match stored_status(&order.status)? {
        OrderStatus::Cancelled => {
            return Err(AppError::Conflict("Order is already cancelled".into()));
        }
        OrderStatus::Served | OrderStatus::Delivered => {
            return Err(AppError::BadRequest(
                "Order can no longer be cancelled once served or delivered".into(),
            ));
        }
        OrderStatus::Received | OrderStatus::Preparing => {}
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_cancelled",
        Some("orders"),
        Some(serde_json::json!({ "order_code": order.order_code })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order cancelled",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

/// Merge lines sharing a (restaurant, item) pair by summing quantities,
/// preserving first-occurrence order.
fn merge_lines(lines: Vec<ResolvedLine>) -> Vec<ResolvedLine> {
    let mut index: HashMap<(Uuid, Uuid), usize> = HashMap::new();
    let mut merged: Vec<ResolvedLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match index.get(&(line.restaurant_id, line.item.id)) {
            Some(&at) => merged[at].quantity += line.quantity,
            None => {
                index.insert((line.restaurant_id, line.item.id), merged.len());
                merged.push(line);
            }
        }
    }
    merged
}

fn parse_payment_method(raw: Option<&str>) -> AppResult<PaymentMethod> {
    match raw {
        None => Ok(PaymentMethod::Cod),
        Some(s) => PaymentMethod::parse(s)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown payment method {s}"))),
    }
}

fn validate_mode_fields(
    mode: OrderMode,
    address: Option<&str>,
    table_number: Option<i32>,
) -> AppResult<()> {
    match mode {
        OrderMode::Delivery => {
            if address.map_or(true, |a| a.trim().is_empty()) {
                return Err(AppError::BadRequest(
                    "Delivery address is required for delivery orders".into(),
                ));
            }
        }
        OrderMode::Dinein => match table_number {
            Some(n) if n > 0 => {}
            _ => {
                return Err(AppError::BadRequest(
                    "Table number is required for dine-in orders".into(),
                ));
            }
        },
    }
    Ok(())
}

/// `ORD-<millisecond epoch>-<0..999>`; the random suffix keeps two orders
/// within the same millisecond apart.
fn generate_order_code() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = OsRng.next_u32() % 1000;
    format!("ORD-{millis}-{suffix}")
}

fn stored_status(raw: &str) -> AppResult<OrderStatus> {
    OrderStatus::parse(raw).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("unknown order status {raw} in store"))
    })
}

pub(crate) fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status = stored_status(&model.status)?;
    let mode = OrderMode::parse(&model.mode)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unknown order mode in store")))?;
    let payment_method = PaymentMethod::parse(&model.payment_method).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("unknown payment method in store"))
    })?;

    Ok(Order {
        id: model.id,
        order_code: model.order_code,
        user_id: model.user_id,
        subtotal: model.subtotal,
        delivery_fee: model.delivery_fee,
        total: model.total,
        mode,
        address: model.address,
        table_number: model.table_number,
        latitude: model.latitude,
        longitude: model.longitude,
        distance_km: model.distance_km,
        estimated_time: model.estimated_time,
        payment_method,
        status,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub(crate) fn line_from_entity(model: OrderItemModel) -> OrderLine {
    OrderLine {
        id: model.id,
        order_id: model.order_id,
        item_id: model.item_id,
        item_name: model.item_name,
        restaurant_id: model.restaurant_id,
        restaurant_name: model.restaurant_name,
        unit_price: model.unit_price,
        quantity: model.quantity,
        image: model.image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(restaurant_id: Uuid, item_id: Uuid, price: i64, quantity: i32) -> ResolvedLine {
        ResolvedLine {
            restaurant_id,
            restaurant_name: "Spice Villa".into(),
            item: ItemSnapshot {
                id: item_id,
                name: "Paneer Tikka".into(),
                price,
                image: None,
            },
            quantity,
        }
    }

    #[test]
    fn merge_sums_quantities_for_same_pair() {
        let rest = Uuid::new_v4();
        let item = Uuid::new_v4();
        let merged = merge_lines(vec![line(rest, item, 250, 2), line(rest, item, 250, 3)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].quantity, 5);
    }

    #[test]
    fn merge_keeps_distinct_pairs_in_submission_order() {
        let rest = Uuid::new_v4();
        let other_rest = Uuid::new_v4();
        let item = Uuid::new_v4();
        let merged = merge_lines(vec![
            line(rest, item, 250, 1),
            line(other_rest, item, 250, 1),
            line(rest, item, 250, 1),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].restaurant_id, rest);
        assert_eq!(merged[0].quantity, 2);
        assert_eq!(merged[1].restaurant_id, other_rest);
    }

    #[test]
    fn payment_method_defaults_to_cod() {
        assert_eq!(parse_payment_method(None).unwrap(), PaymentMethod::Cod);
    }

    #[test]
    fn payment_method_is_case_insensitive() {
        assert_eq!(parse_payment_method(Some("UPI")).unwrap(), PaymentMethod::Upi);
        assert_eq!(parse_payment_method(Some("Card")).unwrap(), PaymentMethod::Card);
    }

    #[test]
    fn unknown_payment_method_is_rejected() {
        assert!(parse_payment_method(Some("crypto")).is_err());
    }

    #[test]
    fn delivery_requires_an_address() {
        assert!(validate_mode_fields(OrderMode::Delivery, None, None).is_err());
        assert!(validate_mode_fields(OrderMode::Delivery, Some("  "), None).is_err());
        assert!(validate_mode_fields(OrderMode::Delivery, Some("12 Main St"), None).is_ok());
    }

    #[test]
    fn dinein_requires_a_positive_table_number() {
        assert!(validate_mode_fields(OrderMode::Dinein, None, None).is_err());
        assert!(validate_mode_fields(OrderMode::Dinein, None, Some(0)).is_err());
        assert!(validate_mode_fields(OrderMode::Dinein, None, Some(7)).is_ok());
    }

    #[test]
    fn order_code_has_expected_shape() {
        let code = generate_order_code();
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert!(parts[1].parse::<i64>().is_ok());
        let suffix: u32 = parts[2].parse().unwrap();
        assert!(suffix < 1000);
    }
}
