use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db::traits::LedgerError,
    db_types::{AccountStatus, Cart, CartId, DeliveryService, DeliveryServiceId, Store, StoreId, UserId},
};

pub async fn insert_store(
    name: &str,
    status: AccountStatus,
    conn: &mut SqliteConnection,
) -> Result<Store, LedgerError> {
    let store = sqlx::query_as::<_, Store>(
        "INSERT INTO stores (id, name, description, status, rating, created_at) VALUES ($1, $2, '', $3, 0, $4) RETURNING *",
    )
    .bind(StoreId::random())
    .bind(name)
    .bind(status)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(store)
}

pub async fn fetch_store(store_id: &StoreId, conn: &mut SqliteConnection) -> Result<Option<Store>, LedgerError> {
    let store = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1").bind(store_id).fetch_optional(conn).await?;
    Ok(store)
}

pub async fn fetch_active_stores(conn: &mut SqliteConnection) -> Result<Vec<Store>, LedgerError> {
    let stores = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE status = 'active' ORDER BY created_at")
        .fetch_all(conn)
        .await?;
    Ok(stores)
}

pub async fn update_store_rating(store_id: &StoreId, value: f64, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE stores SET rating = $1 WHERE id = $2").bind(value).bind(store_id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::StoreNotFound(store_id.clone()));
    }
    Ok(())
}

//--------------------------------------  Delivery services  ---------------------------------------------------------
pub async fn insert_delivery_service(
    name: &str,
    signup_code: &str,
    admin_user_id: Option<&UserId>,
    conn: &mut SqliteConnection,
) -> Result<DeliveryService, LedgerError> {
    let service = sqlx::query_as::<_, DeliveryService>(
        "INSERT INTO delivery_services (id, name, signup_code, admin_user_id) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(DeliveryServiceId::random())
    .bind(name)
    .bind(signup_code)
    .bind(admin_user_id)
    .fetch_one(conn)
    .await?;
    Ok(service)
}

pub async fn set_delivery_service_admin(
    id: &DeliveryServiceId,
    admin_user_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    sqlx::query("UPDATE delivery_services SET admin_user_id = $1 WHERE id = $2")
        .bind(admin_user_id)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_delivery_service(
    id: &DeliveryServiceId,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryService>, LedgerError> {
    let service = sqlx::query_as::<_, DeliveryService>("SELECT * FROM delivery_services WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(service)
}

//--------------------------------------        Carts        ---------------------------------------------------------
pub async fn insert_cart(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Cart, LedgerError> {
    let cart = sqlx::query_as::<_, Cart>("INSERT INTO carts (id, user_id, is_completed) VALUES ($1, $2, FALSE) RETURNING *")
        .bind(CartId::random())
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    sqlx::query("UPDATE users SET current_cart_id = $1 WHERE id = $2")
        .bind(&cart.id)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(cart)
}

pub async fn fetch_cart(cart_id: &CartId, conn: &mut SqliteConnection) -> Result<Option<Cart>, LedgerError> {
    let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE id = $1").bind(cart_id).fetch_optional(conn).await?;
    Ok(cart)
}

/// Marks the customer's open cart as completed. Fails if the cart is missing, belongs to another user, or was
/// checked out already.
pub async fn claim_cart(cart_id: &CartId, customer_id: &UserId, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE carts SET is_completed = TRUE WHERE id = $1 AND user_id = $2 AND is_completed = FALSE")
        .bind(cart_id)
        .bind(customer_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 1 {
        return Ok(());
    }
    let err = match fetch_cart(cart_id, conn).await? {
        None => LedgerError::CartNotFound(cart_id.clone()),
        Some(cart) if &cart.user_id != customer_id => LedgerError::CartNotOwned(cart_id.clone()),
        Some(_) => LedgerError::CartAlreadyCheckedOut(cart_id.clone()),
    };
    Err(err)
}
