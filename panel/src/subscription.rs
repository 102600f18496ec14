//! Applying gateway payment status to local payments and subscriptions.
//!
//! The gateway is the only source of truth for whether a payment is paid. A
//! local payment that is already `paid` is never applied again, so replayed or
//! duplicate notifications cannot extend a subscription twice.

use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::entity::{payment, user};
use crate::gateway::GatewayPayment;

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Payment became `paid`. `user_id` is None for guest payments.
    Activated {
        user_id: Option<Uuid>,
        expires_at: Option<NaiveDateTime>,
    },
    /// Local row was already `paid`; nothing changed.
    AlreadyApplied,
    /// Not paid yet (or failed); the local status now mirrors the gateway.
    StatusRecorded(&'static str),
    /// No local payment carries this gateway reference.
    UnknownPayment,
}

/// Sync a gateway status lookup into the local `payment` row and, on the first
/// transition to paid, extend the owner's subscription by `period_days`.
///
/// The transition is claimed with a conditional `UPDATE ... WHERE status <> 'paid'`,
/// so when two requests race only the one that flips the row credits the owner.
pub async fn apply_gateway_status(
    db: &DatabaseConnection,
    remote: &GatewayPayment,
    period_days: i64,
) -> Result<Outcome, SubscriptionError> {
    let txn = db.begin().await?;

    let Some(local) = payment::Entity::find()
        .filter(payment::Column::ExternalReference.eq(remote.id.as_str()))
        .one(&txn)
        .await?
    else {
        return Ok(Outcome::UnknownPayment);
    };

    if local.is_paid() {
        return Ok(Outcome::AlreadyApplied);
    }

    let now = Utc::now().naive_utc();
    let new_status = remote.local_status();
    let user_id = local.user_id;

    if !claim_status(&txn, local.id, new_status, now).await? {
        // Another request marked it paid after our read.
        return Ok(Outcome::AlreadyApplied);
    }

    if !remote.is_paid() {
        txn.commit().await?;
        return Ok(Outcome::StatusRecorded(new_status));
    }

    let mut expires_at = None;
    if let Some(uid) = user_id
        && let Some(owner) = user::Entity::find_by_id(uid)
            .lock_exclusive()
            .one(&txn)
            .await?
    {
        let new_expiry = extend_expiry(owner.subscription_expires_at, now, period_days);
        let mut active: user::ActiveModel = owner.into();
        active.subscription_expires_at = Set(Some(new_expiry));
        active.updated_at = Set(now);
        active.update(&txn).await?;
        expires_at = Some(new_expiry);
    }

    txn.commit().await?;

    tracing::info!(
        payment_ref = %remote.id,
        user_id = ?user_id,
        expires_at = ?expires_at,
        "subscription activated"
    );

    Ok(Outcome::Activated { user_id, expires_at })
}

/// Set `status` on a payment that is not yet paid. False means the row was
/// already paid (or gone) by the time the update ran.
async fn claim_status<C: ConnectionTrait>(
    conn: &C,
    payment_id: Uuid,
    status: &str,
    now: NaiveDateTime,
) -> Result<bool, DbErr> {
    let res = payment::Entity::update_many()
        .col_expr(payment::Column::Status, Expr::value(status))
        .col_expr(payment::Column::UpdatedAt, Expr::value(now))
        .filter(payment::Column::Id.eq(payment_id))
        .filter(payment::Column::Status.ne(payment::STATUS_PAID))
        .exec(conn)
        .await?;
    Ok(res.rows_affected == 1)
}

/// A renewal stacks on an unexpired subscription; a lapsed one restarts from now.
pub fn extend_expiry(
    current: Option<NaiveDateTime>,
    now: NaiveDateTime,
    period_days: i64,
) -> NaiveDateTime {
    let base = match current {
        Some(exp) if exp > now => exp,
        _ => now,
    };
    Duration::try_days(period_days.max(0))
        .and_then(|period| base.checked_add_signed(period))
        .unwrap_or(NaiveDateTime::MAX)
}

pub fn is_subscribed(user: &user::Model, now: NaiveDateTime) -> bool {
    user.subscription_expires_at.is_some_and(|exp| exp > now)
}
