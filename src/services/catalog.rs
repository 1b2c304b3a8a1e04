use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::{
    dto::restaurants::{RestaurantList, RestaurantSummary},
    error::{AppError, AppResult},
    models::{Category, MenuItem, Restaurant},
    response::{ApiResponse, Meta},
    entity::{
        categories::{Column as CategoryCol, Entity as Categories, Model as CategoryModel},
        menu_items::{Entity as MenuItems, Model as MenuItemModel},
        restaurants::{Column as RestCol, Entity as Restaurants, Model as RestaurantModel},
    },
    state::AppState,
};

/// Current menu data for an item, captured at lookup time. This is what gets
/// snapshotted into an order line; the client-submitted price is never used.
#[derive(Debug, Clone)]
pub struct ItemSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub image: Option<String>,
}

/// A restaurant together with its current category/menu tree, loaded once per
/// validation call and searched linearly per line item.
#[derive(Debug)]
pub struct RestaurantCatalog {
    pub restaurant: RestaurantModel,
    pub categories: Vec<(CategoryModel, Vec<MenuItemModel>)>,
}

impl RestaurantCatalog {
    /// Linear search across all categories. A restaurant with no categories
    /// simply never matches; it is not an error.
    pub fn find_item(&self, item_id: Uuid) -> Option<ItemSnapshot> {
        self.categories
            .iter()
            .flat_map(|(_, items)| items.iter())
            .find(|item| item.id == item_id)
            .map(|item| ItemSnapshot {
                id: item.id,
                name: item.name.clone(),
                price: item.price,
                image: item.image.clone(),
            })
    }
}

pub async fn load_catalog<C: ConnectionTrait>(
    conn: &C,
    restaurant_id: Uuid,
) -> AppResult<Option<RestaurantCatalog>> {
    let restaurant = Restaurants::find_by_id(restaurant_id).one(conn).await?;
    let restaurant = match restaurant {
        Some(r) => r,
        None => return Ok(None),
    };

    let categories = Categories::find()
        .filter(CategoryCol::RestaurantId.eq(restaurant_id))
        .order_by_asc(CategoryCol::Position)
        .find_with_related(MenuItems)
        .all(conn)
        .await?;

    Ok(Some(RestaurantCatalog {
        restaurant,
        categories,
    }))
}

/// Public browse surface: approved, active restaurants only.
pub async fn list_restaurants(state: &AppState) -> AppResult<ApiResponse<RestaurantList>> {
    let restaurants = Restaurants::find()
        .filter(
            Condition::all()
                .add(RestCol::IsApproved.eq(true))
                .add(RestCol::IsActive.eq(true)),
        )
        .order_by_asc(RestCol::Name)
        .all(&state.orm)
        .await?;

    let total = restaurants.len() as i64;
    let items = restaurants
        .into_iter()
        .map(|r| RestaurantSummary {
            id: r.id,
            name: r.name,
            address: r.address,
            latitude: r.latitude,
            longitude: r.longitude,
        })
        .collect();

    Ok(ApiResponse::success(
        "Restaurants",
        RestaurantList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_restaurant(
    state: &AppState,
    restaurant_id: Uuid,
) -> AppResult<ApiResponse<Restaurant>> {
    let catalog = load_catalog(&state.orm, restaurant_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !catalog.restaurant.is_approved || !catalog.restaurant.is_active {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Restaurant",
        restaurant_model(catalog),
        Some(Meta::empty()),
    ))
}

pub fn restaurant_model(catalog: RestaurantCatalog) -> Restaurant {
    let RestaurantCatalog {
        restaurant,
        categories,
    } = catalog;
    Restaurant {
        id: restaurant.id,
        name: restaurant.name,
        address: restaurant.address,
        latitude: restaurant.latitude,
        longitude: restaurant.longitude,
        is_approved: restaurant.is_approved,
        is_active: restaurant.is_active,
        categories: categories
            .into_iter()
            .map(|(category, items)| Category {
                id: category.id,
                name: category.name,
                items: items
                    .into_iter()
                    .map(|item| MenuItem {
                        id: item.id,
                        name: item.name,
                        description: item.description,
                        price: item.price,
                        image: item.image,
                        vegetarian: item.vegetarian,
                    })
                    .collect(),
            })
            .collect(),
    }
}
