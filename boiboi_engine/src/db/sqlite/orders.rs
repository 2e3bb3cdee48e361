use chrono::Utc;
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db::traits::{LedgerError, OrderQueryFilter, RatingSubject},
    db_types::{
        new_object_id,
        NewOrder,
        Order,
        OrderId,
        OrderStatusType,
        OrderTransaction,
        ProgressStatus,
        UserId,
    },
};

const RECENT_RATINGS_ORDER: &str = "ORDER BY updated_at DESC, created_at DESC LIMIT $2";

/// Inserts the order transaction and the order. This is not atomic. Embed this call inside a transaction and pass
/// `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, LedgerError> {
    let now = Utc::now();
    let order_tx_id = new_object_id();
    let order_tx = sqlx::query_as::<_, OrderTransaction>(
        r#"
        INSERT INTO order_transactions (
            id, cart_id, customer_id, vendor_id, total_price, payment_reference, payment_method, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
        RETURNING *
        "#,
    )
    .bind(&order_tx_id)
    .bind(&order.cart_id)
    .bind(&order.customer_id)
    .bind(&order.store_id)
    .bind(order.price)
    .bind(&order.payment_reference)
    .bind(order.method)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    trace!("📝️ Order transaction {} recorded for {}", order_tx.id, order_tx.payment_reference);
    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (
            id, cart_id, customer_id, store_id, rider_id, code, status, progress_status, price, delivery_fee,
            service_charge, coupon_price, is_paid_for, order_transaction_id, delivery_location, delivery_instruction,
            rider_rating, vendor_rating, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, NULL, $5, $6, $7, $8, $9, $10, $11, TRUE, $12, $13, $14, NULL, NULL, $15, $15)
        RETURNING *
        "#,
    )
    .bind(OrderId::random())
    .bind(order.cart_id)
    .bind(order.customer_id)
    .bind(order.store_id)
    .bind(order.code)
    .bind(OrderStatusType::Ongoing)
    .bind(ProgressStatus::OrderReceivedByVendor)
    .bind(order.price)
    .bind(order.delivery_fee)
    .bind(order.service_charge)
    .bind(order.coupon_price)
    .bind(order_tx.id)
    .bind(order.delivery_location)
    .bind(order.delivery_instruction)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, LedgerError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, LedgerError> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(store_id) = query.store_id {
        where_clause.push("store_id = ");
        where_clause.push_bind_unseparated(store_id);
    }
    if let Some(rider_id) = query.rider_id {
        where_clause.push("rider_id = ");
        where_clause.push_bind_unseparated(rider_id);
    }
    if let Some(customer_id) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(customer_id);
    }
    if let Some(status) = query.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status);
    }
    builder.push(" ORDER BY created_at DESC");
    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

/// Moves an ongoing order to a terminal status. The update only applies if the order is still `ongoing`; otherwise
/// the error reflects the status that some other caller already set.
pub async fn finalize_order(
    order_id: &OrderId,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, LedgerError> {
    let updated = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = 'ongoing' RETURNING *",
    )
    .bind(status)
    .bind(Utc::now())
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(order) => Ok(order),
        None => Err(terminal_state_error(order_id, conn).await?),
    }
}

/// Works out why an order could not be changed: it is missing, or it already reached a terminal state.
pub async fn terminal_state_error(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<LedgerError, LedgerError> {
    let err = match fetch_order(order_id, conn).await? {
        None => LedgerError::OrderNotFound(order_id.clone()),
        Some(o) if o.status == OrderStatusType::Cancelled => LedgerError::OrderAlreadyCancelled,
        Some(_) => LedgerError::OrderAlreadyCompleted,
    };
    Ok(err)
}

/// Sets the progress status of an ongoing order. When `rider` is given the order is assigned to that rider too, but
/// only if it has no rider yet or already belongs to them.
pub async fn update_progress(
    order_id: &OrderId,
    status: ProgressStatus,
    rider: Option<&UserId>,
    conn: &mut SqliteConnection,
) -> Result<Order, LedgerError> {
    let mut builder = QueryBuilder::new("UPDATE orders SET ");
    let mut set_clause = builder.separated(", ");
    set_clause.push("progress_status = ");
    set_clause.push_bind_unseparated(status);
    set_clause.push("updated_at = ");
    set_clause.push_bind_unseparated(Utc::now());
    if let Some(rider) = rider {
        set_clause.push("rider_id = ");
        set_clause.push_bind_unseparated(rider.clone());
    }
    builder.push(" WHERE id = ");
    builder.push_bind(order_id.clone());
    builder.push(" AND status = 'ongoing'");
    if let Some(rider) = rider {
        builder.push(" AND (rider_id IS NULL OR rider_id = ");
        builder.push_bind(rider.clone());
        builder.push(")");
    }
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let updated = builder.build_query_as::<Order>().fetch_optional(&mut *conn).await?;
    match (updated, rider) {
        (Some(order), _) => Ok(order),
        (None, Some(rider)) => Err(assignment_error(order_id, rider, conn).await?),
        (None, None) => Err(terminal_state_error(order_id, conn).await?),
    }
}

/// Works out why a rider could not take an order: it is missing, finished, or held by another rider.
async fn assignment_error(
    order_id: &OrderId,
    rider: &UserId,
    conn: &mut SqliteConnection,
) -> Result<LedgerError, LedgerError> {
    let err = match fetch_order(order_id, &mut *conn).await? {
        Some(o) if o.status == OrderStatusType::Ongoing => {
            trace!("📝️ Order {order_id} is held by rider {:?}. {rider} cannot take it", o.rider_id);
            LedgerError::NotOrderParticipant(rider.clone())
        },
        _ => terminal_state_error(order_id, conn).await?,
    };
    Ok(err)
}

pub async fn update_ratings(
    order_id: &OrderId,
    rider_rating: Option<i64>,
    vendor_rating: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Order, LedgerError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders SET
            rider_rating = COALESCE($1, rider_rating),
            vendor_rating = COALESCE($2, vendor_rating)
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(rider_rating)
    .bind(vendor_rating)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    order.ok_or_else(|| LedgerError::OrderNotFound(order_id.clone()))
}

pub async fn fetch_recent_ratings(
    subject: &RatingSubject,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Option<i64>>, LedgerError> {
    let ratings: Vec<(Option<i64>,)> = match subject {
        RatingSubject::Rider(rider_id) => {
            let q = format!(
                "SELECT rider_rating FROM orders WHERE rider_id = $1 AND status = 'completed' {RECENT_RATINGS_ORDER}"
            );
            sqlx::query_as(&q).bind(rider_id).bind(limit).fetch_all(conn).await?
        },
        RatingSubject::Store(store_id) => {
            let q = format!(
                "SELECT vendor_rating FROM orders WHERE store_id = $1 AND status = 'completed' {RECENT_RATINGS_ORDER}"
            );
            sqlx::query_as(&q).bind(store_id).bind(limit).fetch_all(conn).await?
        },
    };
    Ok(ratings.into_iter().map(|(r,)| r).collect())
}
