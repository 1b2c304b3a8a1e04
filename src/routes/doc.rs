use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        orders::{OrderList, OrderWithItems, OrderWithItemsList, PlaceOrderRequest, UpdateOrderStatusRequest},
        restaurants::{RestaurantList, RestaurantSummary},
    },
    models::{Category, MenuItem, Order, OrderLine, Restaurant, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, health, orders, owner, params, restaurants},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        restaurants::list_restaurants,
        restaurants::get_restaurant,
        orders::place_order,
        orders::list_my_orders,
        orders::get_order,
        orders::cancel_order,
        owner::list_restaurant_orders,
        owner::update_order_status,
        owner::dashboard,
        admin::list_all_orders,
        admin::update_order_status,
        admin::delete_all_orders,
        admin::stats
    ),
    components(
        schemas(
            User,
            Restaurant,
            Category,
            MenuItem,
            Order,
            OrderLine,
            PlaceOrderRequest,
            OrderList,
            OrderWithItems,
            OrderWithItemsList,
            RestaurantList,
            RestaurantSummary,
            UpdateOrderStatusRequest,
            owner::DashboardData,
            owner::DashboardAnalytics,
            owner::DishStat,
            admin::ResetResult,
            admin::StatsData,
            params::Pagination,
            params::OrderListQuery,
            params::OwnerOrderQuery,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<RestaurantList>,
            ApiResponse<admin::StatsData>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Restaurants", description = "Public restaurant browse endpoints"),
        (name = "Orders", description = "Customer order endpoints"),
        (name = "Restaurant Owner", description = "Restaurant fulfillment endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
