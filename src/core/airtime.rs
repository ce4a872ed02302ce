//! Sell-airtime transaction store.
//!
//! Transactions are created `pending` by the seller and leave that state exactly
//! once, through [`transition`] or [`settle_pending`]. Both are conditional
//! updates keyed on the expected prior status, which is what keeps two racing
//! admin requests from both completing the same transaction.

use crate::{
    core::{
        directory,
        money::ensure_positive,
        pagination::{Page, PageRequest, total_pages},
    },
    entities::{AirtimeStatus, SellAirtime, sell_airtime},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Select, Set, prelude::*, sea_query::Expr};
use tracing::info;

/// Seller-supplied details of a new sell-airtime request
#[derive(Debug, Clone)]
pub struct NewSellAirtime {
    pub network: String,
    pub phone_number: String,
    /// Airtime face value, minor units
    pub amount_to_sell: i64,
    /// Cash to credit once confirmed, minor units
    pub amount_to_receive: i64,
}

/// Creates a pending sell-airtime transaction for an existing seller.
pub async fn create_sell_airtime(
    db: &DatabaseConnection,
    seller_id: Uuid,
    new: NewSellAirtime,
) -> Result<sell_airtime::Model> {
    ensure_positive(new.amount_to_sell)?;
    ensure_positive(new.amount_to_receive)?;
    if new.network.trim().is_empty() {
        return Err(Error::validation("network is required"));
    }
    if new.phone_number.trim().is_empty() {
        return Err(Error::validation("phoneNumber is required"));
    }

    directory::find_user_by_id(db, seller_id)
        .await?
        .ok_or_else(|| Error::not_found("user", seller_id))?;

    let now = chrono::Utc::now();
    let transaction = sell_airtime::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(seller_id),
        network: Set(new.network.trim().to_string()),
        phone_number: Set(new.phone_number.trim().to_string()),
        amount_to_sell: Set(new.amount_to_sell),
        amount_to_receive: Set(new.amount_to_receive),
        transaction_status: Set(AirtimeStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = transaction.insert(db).await?;
    info!(id = %created.id, seller = %seller_id, "Sell-airtime transaction created");
    Ok(created)
}

/// Retrieves a transaction by id, whatever its status.
pub async fn get_sell_airtime<C>(db: &C, id: Uuid) -> Result<Option<sell_airtime::Model>>
where
    C: ConnectionTrait,
{
    SellAirtime::find_by_id(id).one(db).await.map_err(Into::into)
}

/// Retrieves a transaction that is still `pending`.
///
/// # Errors
/// * `NotFound` if no transaction has this id
/// * `Conflict` if it already reached a terminal status
pub async fn find_pending<C>(db: &C, id: Uuid) -> Result<sell_airtime::Model>
where
    C: ConnectionTrait,
{
    let transaction = get_sell_airtime(db, id)
        .await?
        .ok_or_else(|| Error::not_found("sell_airtime", id))?;

    if transaction.transaction_status != AirtimeStatus::Pending {
        return Err(Error::Conflict {
            entity: "sell_airtime",
            key: id.to_string(),
            status: transaction.transaction_status.to_string(),
        });
    }
    Ok(transaction)
}

/// Moves a transaction from `expected` to `next`.
///
/// The write only applies while the stored status still equals `expected`.
///
/// # Errors
/// * `InvalidTransition` if `expected -> next` is not in the transition table
/// * `Conflict` if another request changed the status first
/// * `NotFound` if no transaction has this id
pub async fn transition<C>(
    db: &C,
    id: Uuid,
    expected: AirtimeStatus,
    next: AirtimeStatus,
) -> Result<sell_airtime::Model>
where
    C: ConnectionTrait,
{
    if !expected.can_transition_to(next) {
        return Err(Error::InvalidTransition {
            from: expected.to_string(),
            to: next.to_string(),
        });
    }

    let result = SellAirtime::update_many()
        .col_expr(sell_airtime::Column::TransactionStatus, Expr::value(next))
        .col_expr(sell_airtime::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(sell_airtime::Column::Id.eq(id))
        .filter(sell_airtime::Column::TransactionStatus.eq(expected))
        .exec(db)
        .await?;

    let current = get_sell_airtime(db, id)
        .await?
        .ok_or_else(|| Error::not_found("sell_airtime", id))?;

    if result.rows_affected == 0 {
        return Err(Error::Conflict {
            entity: "sell_airtime",
            key: id.to_string(),
            status: current.transaction_status.to_string(),
        });
    }
    Ok(current)
}

/// Moves a `pending` transaction to `next` only if it was sold by `seller_id`
/// for exactly `amount_to_receive`.
///
/// The guarded update is the first statement, so inside a transaction the
/// write lock is taken before anything is read. Failures are classified
/// afterwards from the stored row.
///
/// # Errors
/// * `InvalidTransition` if `pending -> next` is not in the transition table
/// * `NotFound` if no transaction has this id
/// * `Conflict` if it already left `pending`
/// * `Validation` if the seller or the amount does not match
pub async fn settle_pending<C>(
    db: &C,
    id: Uuid,
    next: AirtimeStatus,
    seller_id: Uuid,
    amount_to_receive: i64,
) -> Result<sell_airtime::Model>
where
    C: ConnectionTrait,
{
    if !AirtimeStatus::Pending.can_transition_to(next) {
        return Err(Error::InvalidTransition {
            from: AirtimeStatus::Pending.to_string(),
            to: next.to_string(),
        });
    }

    let result = SellAirtime::update_many()
        .col_expr(sell_airtime::Column::TransactionStatus, Expr::value(next))
        .col_expr(sell_airtime::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(sell_airtime::Column::Id.eq(id))
        .filter(sell_airtime::Column::TransactionStatus.eq(AirtimeStatus::Pending))
        .filter(sell_airtime::Column::UserId.eq(seller_id))
        .filter(sell_airtime::Column::AmountToReceive.eq(amount_to_receive))
        .exec(db)
        .await?;

    let current = get_sell_airtime(db, id)
        .await?
        .ok_or_else(|| Error::not_found("sell_airtime", id))?;
    if result.rows_affected == 1 {
        return Ok(current);
    }

    if current.transaction_status != AirtimeStatus::Pending {
        return Err(Error::Conflict {
            entity: "sell_airtime",
            key: id.to_string(),
            status: current.transaction_status.to_string(),
        });
    }
    if current.user_id != seller_id {
        return Err(Error::validation("transaction was not sold by this customer"));
    }
    Err(Error::validation(format!(
        "amountToSend {amount_to_receive} does not match amountToReceive {}",
        current.amount_to_receive
    )))
}

async fn fetch_page(
    db: &DatabaseConnection,
    query: Select<SellAirtime>,
    request: PageRequest,
) -> Result<Page<sell_airtime::Model>> {
    let paginator = query
        .order_by_desc(sell_airtime::Column::CreatedAt)
        .order_by_desc(sell_airtime::Column::Id)
        .paginate(db, request.size);
    let total_items = paginator.num_items().await?;
    let content = match request.offset() {
        Some(offset) if offset < total_items => paginator.fetch_page(request.page).await?,
        _ => Vec::new(),
    };

    Ok(Page {
        content,
        total_pages: total_pages(total_items, request.size),
        total_items,
        page: request.page,
        size: request.size,
    })
}

/// Lists all sell-airtime transactions, newest first.
pub async fn list_sell_airtime(
    db: &DatabaseConnection,
    request: PageRequest,
) -> Result<Page<sell_airtime::Model>> {
    fetch_page(db, SellAirtime::find(), request).await
}

/// Lists one seller's sell-airtime transactions, newest first.
pub async fn list_sell_airtime_for_seller(
    db: &DatabaseConnection,
    seller_id: Uuid,
    request: PageRequest,
) -> Result<Page<sell_airtime::Model>> {
    let query = SellAirtime::find().filter(sell_airtime::Column::UserId.eq(seller_id));
    fetch_page(db, query, request).await
}
