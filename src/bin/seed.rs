use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_food_orders_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "Admin", "admin@example.com", "admin123", "admin", None).await?;
    let customer_id =
        ensure_user(&pool, "Demo User", "demo@example.com", "demo123", "customer", None).await?;

    let burger_palace = ensure_restaurant(
        &pool,
        "Burger Palace",
        "42 High Street",
        Some((12.9716, 77.5946)),
        &[
            (
                "Burgers",
                &[
                    ("Classic Burger", "Beef patty with lettuce, tomato, cheese", 199, false),
                    ("Veggie Burger", "Plant-based patty with fresh veggies", 179, true),
                    ("Double Cheese Burger", "Two beef patties with extra cheese", 249, false),
                ][..],
            ),
            (
                "Sides",
                &[
                    ("French Fries", "Crispy golden fries", 99, true),
                    ("Onion Rings", "Crunchy onion rings", 119, true),
                ][..],
            ),
        ],
    )
    .await?;
    ensure_user(
        &pool,
        "Burger Palace Owner",
        "owner@burgerpalace.example.com",
        "owner123",
        "restaurant_owner",
        Some(burger_palace),
    )
    .await?;

    // No location set: orders against this one exercise the flat-rate quote.
    let spice_of_india = ensure_restaurant(
        &pool,
        "Spice of India",
        "7 Market Lane",
        None,
        &[
            (
                "Main Course",
                &[
                    ("Chicken Biryani", "Aromatic rice with tender chicken", 249, false),
                    ("Paneer Tikka Masala", "Cottage cheese in creamy tomato gravy", 229, true),
                    ("Dal Makhani", "Creamy black lentils", 189, true),
                ][..],
            ),
            (
                "Breads",
                &[
                    ("Butter Naan", "Soft Indian bread with butter", 49, true),
                    ("Garlic Naan", "Naan with garlic and herbs", 59, true),
                ][..],
            ),
        ],
    )
    .await?;
    ensure_user(
        &pool,
        "Spice of India Owner",
        "owner@spiceofindia.example.com",
        "owner123",
        "restaurant_owner",
        Some(spice_of_india),
    )
    .await?;

    println!("Seed completed. Admin ID: {admin_id}, Customer ID: {customer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
    restaurant_id: Option<Uuid>,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, restaurant_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role, restaurant_id = EXCLUDED.restaurant_id
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(restaurant_id)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_restaurant(
    pool: &sqlx::PgPool,
    name: &str,
    address: &str,
    location: Option<(f64, f64)>,
    categories: &[(&str, &[(&str, &str, i64, bool)])],
) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM restaurants WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        println!("Restaurant {name} already present");
        return Ok(id);
    }

    let restaurant_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO restaurants (id, name, address, latitude, longitude, is_approved, is_active)
        VALUES ($1, $2, $3, $4, $5, TRUE, TRUE)
        "#,
    )
    .bind(restaurant_id)
    .bind(name)
    .bind(address)
    .bind(location.map(|(lat, _)| lat))
    .bind(location.map(|(_, lon)| lon))
    .execute(pool)
    .await?;

    for (position, (category_name, items)) in categories.iter().enumerate() {
        let category_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO categories (id, restaurant_id, name, position) VALUES ($1, $2, $3, $4)",
        )
        .bind(category_id)
        .bind(restaurant_id)
        .bind(category_name)
        .bind(position as i32)
        .execute(pool)
        .await?;

        for (item_name, description, price, vegetarian) in items.iter() {
            sqlx::query(
                r#"
                INSERT INTO menu_items (id, category_id, name, description, price, vegetarian)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(category_id)
            .bind(item_name)
            .bind(description)
            .bind(price)
            .bind(vegetarian)
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded restaurant {name}");
    Ok(restaurant_id)
}
