//! Voucher business logic - eligibility, discount computation and usage tracking.
//!
//! [`validate_voucher`] is a pure decision: it never changes usage counters and never
//! fails, reporting every problem (unknown code included) as an invalid result.
//! [`apply_voucher`] is the mutating counterpart, called by the checkout flow after a
//! successful validation. The two are not tied together transactionally, so a voucher
//! validated as eligible can still be rejected by `apply_voucher` if another checkout
//! consumed its last use in between.

use crate::{
    core::{
        clock::Clock,
        counter::{BoundedCounter, Ceiling},
    },
    entities::{DiscountScope, Voucher, VoucherStatus, VoucherType, voucher},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    QueryOrder, Set, TransactionTrait,
    prelude::*,
    sea_query::{Condition, Expr},
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

const CODE_MIN_LEN: usize = 3;
const CODE_MAX_LEN: usize = 50;
const MAX_PRIORITY: i32 = 10;

const USAGE_COUNTER: BoundedCounter<voucher::Column> = BoundedCounter {
    id: voucher::Column::Id,
    counter: voucher::Column::CurrentUsage,
    ceiling: Ceiling::OptionalColumn(voucher::Column::MaxUsage),
    touched_at: voucher::Column::UpdatedAt,
};

/// Arguments for [`create_voucher`]. Use [`CreateVoucherArgs::new`] for the defaults.
#[derive(Debug, Clone)]
pub struct CreateVoucherArgs {
    pub code: String,
    pub title: String,
    pub description: String,
    pub voucher_type: VoucherType,
    pub status: VoucherStatus,
    pub discount_scope: DiscountScope,
    pub discount_value: Option<f64>,
    pub discount_percent: Option<f64>,
    pub max_discount_amount: Option<f64>,
    pub min_order_amount: Option<f64>,
    pub applicable_movie_id: Option<i64>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub max_usage: Option<i32>,
    pub max_usage_per_user: Option<i32>,
    pub is_stackable: bool,
    pub priority: i32,
    pub is_active: bool,
}

impl CreateVoucherArgs {
    /// An active, all-movies voucher with no discount amounts, caps or usage limit set.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        voucher_type: VoucherType,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            description: String::new(),
            voucher_type,
            status: VoucherStatus::Active,
            discount_scope: DiscountScope::AllMovies,
            discount_value: None,
            discount_percent: None,
            max_discount_amount: None,
            min_order_amount: None,
            applicable_movie_id: None,
            valid_from,
            valid_until,
            max_usage: None,
            max_usage_per_user: None,
            is_stackable: false,
            priority: 0,
            is_active: true,
        }
    }
}

/// Partial update for [`update_voucher`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateVoucherArgs {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<VoucherStatus>,
    pub discount_value: Option<f64>,
    pub discount_percent: Option<f64>,
    pub max_discount_amount: Option<f64>,
    pub min_order_amount: Option<f64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_usage: Option<i32>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}

/// Why a voucher was judged ineligible. Checks run in declaration order and stop at
/// the first failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VoucherRejection {
    #[error("Invalid voucher code")]
    InvalidCode,
    #[error("Voucher is not active")]
    NotActive,
    #[error("Voucher has expired or not yet valid")]
    OutsideValidityWindow,
    #[error("Voucher usage limit exceeded")]
    UsageLimitExceeded,
    #[error("Minimum order amount is {minimum}")]
    BelowMinimumOrder { minimum: f64 },
    #[error("Voucher not applicable to this movie")]
    NotApplicableToMovie,
}

/// Outcome of [`validate_voucher`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher: Option<voucher::Model>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<f64>,
    /// Which check failed; callers only see `error`
    #[serde(skip)]
    pub rejection: Option<VoucherRejection>,
}

impl VoucherValidation {
    fn valid(voucher: voucher::Model, discount_amount: f64) -> Self {
        Self {
            is_valid: true,
            voucher: Some(voucher),
            error: None,
            discount_amount: Some(discount_amount),
            rejection: None,
        }
    }

    fn rejected(rejection: VoucherRejection) -> Self {
        Self {
            is_valid: false,
            voucher: None,
            error: Some(rejection.to_string()),
            discount_amount: None,
            rejection: Some(rejection),
        }
    }
}

/// Voucher counts by lifecycle state, see [`get_usage_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherUsageStats {
    pub total_vouchers: u64,
    pub active_vouchers: u64,
    pub used_vouchers: u64,
}

fn validate_code(code: &str) -> Result<()> {
    let well_formed = (CODE_MIN_LEN..=CODE_MAX_LEN).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_');

    if well_formed {
        Ok(())
    } else {
        Err(Error::Validation {
            message: format!(
                "Code must be {CODE_MIN_LEN}-{CODE_MAX_LEN} uppercase letters, numbers, hyphens or underscores, got '{code}'"
            ),
        })
    }
}

fn validate_amount(amount: Option<f64>) -> Result<()> {
    match amount {
        Some(value) if value < 0.0 || !value.is_finite() => {
            Err(Error::InvalidAmount { amount: value })
        }
        _ => Ok(()),
    }
}

fn validate_percent(percent: Option<f64>) -> Result<()> {
    match percent {
        Some(value) if !(0.0..=100.0).contains(&value) => Err(Error::Validation {
            message: format!("Discount percent must be between 0 and 100, got {value}"),
        }),
        _ => Ok(()),
    }
}

fn validate_window(valid_from: DateTime<Utc>, valid_until: DateTime<Utc>) -> Result<()> {
    if valid_from > valid_until {
        return Err(Error::Validation {
            message: format!("validFrom {valid_from} is after validUntil {valid_until}"),
        });
    }
    Ok(())
}

fn validate_max_usage(max_usage: Option<i32>) -> Result<()> {
    match max_usage {
        Some(cap) if cap < 1 => Err(Error::Validation {
            message: format!("maxUsage must be at least 1, got {cap}"),
        }),
        _ => Ok(()),
    }
}

fn validate_priority(priority: i32) -> Result<()> {
    if (0..=MAX_PRIORITY).contains(&priority) {
        Ok(())
    } else {
        Err(Error::Validation {
            message: format!("priority must be between 0 and {MAX_PRIORITY}, got {priority}"),
        })
    }
}

/// Creates a voucher with `current_usage = 0`. Codes are unique.
#[instrument(skip(db, clock, args), fields(code = %args.code))]
pub async fn create_voucher(
    db: &DatabaseConnection,
    clock: &impl Clock,
    args: CreateVoucherArgs,
) -> Result<voucher::Model> {
    validate_code(&args.code)?;
    validate_percent(args.discount_percent)?;
    for amount in [
        args.discount_value,
        args.max_discount_amount,
        args.min_order_amount,
    ] {
        validate_amount(amount)?;
    }
    validate_window(args.valid_from, args.valid_until)?;
    validate_max_usage(args.max_usage)?;
    validate_priority(args.priority)?;

    if get_voucher_by_code(db, &args.code).await?.is_some() {
        return Err(Error::DuplicateVoucherCode { code: args.code });
    }

    let now = clock.now();
    let code = args.code.clone();
    let voucher = voucher::ActiveModel {
        code: Set(args.code),
        title: Set(args.title),
        description: Set(args.description),
        voucher_type: Set(args.voucher_type),
        status: Set(args.status),
        discount_scope: Set(args.discount_scope),
        discount_value: Set(args.discount_value),
        discount_percent: Set(args.discount_percent),
        max_discount_amount: Set(args.max_discount_amount),
        min_order_amount: Set(args.min_order_amount),
        applicable_movie_id: Set(args.applicable_movie_id),
        valid_from: Set(args.valid_from),
        valid_until: Set(args.valid_until),
        max_usage: Set(args.max_usage),
        current_usage: Set(0),
        max_usage_per_user: Set(args.max_usage_per_user),
        is_stackable: Set(args.is_stackable),
        priority: Set(args.priority),
        is_active: Set(args.is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Error::from)
    .map_err(|e| {
        if e.is_unique_violation() {
            Error::DuplicateVoucherCode { code }
        } else {
            e
        }
    })?;

    info!(voucher_id = voucher.id, "Voucher created");
    Ok(voucher)
}

/// All vouchers, newest first.
pub async fn find_all_vouchers(db: &DatabaseConnection) -> Result<Vec<voucher::Model>> {
    Voucher::find()
        .order_by_desc(voucher::Column::CreatedAt)
        .order_by_desc(voucher::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Condition shared by every "currently usable" listing.
fn currently_active(now: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(voucher::Column::Status.eq(VoucherStatus::Active))
        .add(voucher::Column::IsActive.eq(true))
        .add(voucher::Column::ValidFrom.lte(now))
        .add(voucher::Column::ValidUntil.gte(now))
}

/// Active vouchers inside their validity window, highest priority first.
pub async fn find_active_vouchers(
    db: &DatabaseConnection,
    clock: &impl Clock,
) -> Result<Vec<voucher::Model>> {
    Voucher::find()
        .filter(currently_active(clock.now()))
        .order_by_desc(voucher::Column::Priority)
        .order_by_desc(voucher::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Vouchers usable for `movie_id` right now: those targeting the movie plus those
/// valid for all movies, highest priority first.
pub async fn find_by_movie_id(
    db: &DatabaseConnection,
    clock: &impl Clock,
    movie_id: i64,
) -> Result<Vec<voucher::Model>> {
    Voucher::find()
        .filter(currently_active(clock.now()))
        .filter(
            Condition::any()
                .add(voucher::Column::ApplicableMovieId.eq(movie_id))
                .add(voucher::Column::DiscountScope.eq(DiscountScope::AllMovies)),
        )
        .order_by_desc(voucher::Column::Priority)
        .order_by_asc(voucher::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a voucher by code, returning None if it does not exist.
pub async fn get_voucher_by_code<C>(db: &C, code: &str) -> Result<Option<voucher::Model>>
where
    C: ConnectionTrait,
{
    Voucher::find()
        .filter(voucher::Column::Code.eq(code))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a voucher by code.
pub async fn find_voucher_by_code<C>(db: &C, code: &str) -> Result<voucher::Model>
where
    C: ConnectionTrait,
{
    get_voucher_by_code(db, code)
        .await?
        .ok_or_else(|| Error::VoucherNotFound {
            key: code.to_string(),
        })
}

/// Finds a voucher by ID.
pub async fn find_voucher<C>(db: &C, voucher_id: i64) -> Result<voucher::Model>
where
    C: ConnectionTrait,
{
    Voucher::find_by_id(voucher_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::VoucherNotFound {
            key: format!("#{voucher_id}"),
        })
}

/// Discount granted by `voucher` on an order of `order_amount`.
///
/// - percentage: `order_amount * percent / 100`, capped at `max_discount_amount`
/// - fixed amount: `discount_value`, never more than the order itself
/// - anything else: 0
///
/// A negative or non-finite `order_amount` is treated as an empty order and yields 0.
#[must_use]
pub fn compute_discount(voucher: &voucher::Model, order_amount: f64) -> f64 {
    if !order_amount.is_finite() || order_amount <= 0.0 {
        return 0.0;
    }

    match (
        voucher.voucher_type,
        voucher.discount_percent,
        voucher.discount_value,
    ) {
        (VoucherType::Percentage, Some(percent), _) => {
            let discount = order_amount * percent / 100.0;
            match voucher.max_discount_amount {
                Some(cap) if discount > cap => cap,
                _ => discount,
            }
        }
        (VoucherType::FixedAmount, _, Some(value)) => value.min(order_amount),
        _ => 0.0,
    }
}

/// Runs the eligibility checks against an already loaded voucher and returns the
/// discount (0 when no order amount is given).
///
/// The movie check only runs when `movie_id` is given: a movie-specific voucher
/// validated without a movie is accepted.
pub fn evaluate_voucher(
    voucher: &voucher::Model,
    now: DateTime<Utc>,
    movie_id: Option<i64>,
    order_amount: Option<f64>,
) -> std::result::Result<f64, VoucherRejection> {
    if voucher.status != VoucherStatus::Active || !voucher.is_active {
        return Err(VoucherRejection::NotActive);
    }

    if voucher.valid_from > now || voucher.valid_until < now {
        return Err(VoucherRejection::OutsideValidityWindow);
    }

    if let Some(cap) = voucher.max_usage
        && voucher.current_usage >= cap
    {
        return Err(VoucherRejection::UsageLimitExceeded);
    }

    if let (Some(minimum), Some(amount)) = (voucher.min_order_amount, order_amount)
        && amount < minimum
    {
        return Err(VoucherRejection::BelowMinimumOrder { minimum });
    }

    if let Some(movie_id) = movie_id
        && voucher.discount_scope == DiscountScope::SpecificMovie
        && voucher.applicable_movie_id != Some(movie_id)
    {
        return Err(VoucherRejection::NotApplicableToMovie);
    }

    Ok(order_amount.map_or(0.0, |amount| compute_discount(voucher, amount)))
}

/// Checks whether `code` can be used for an order, and how much it would take off.
///
/// Never fails: an unknown code, a store error, or any failed check yields
/// `is_valid = false` with a human-readable `error`. Usage counters are not touched.
#[instrument(skip(db, clock))]
pub async fn validate_voucher(
    db: &DatabaseConnection,
    clock: &impl Clock,
    code: &str,
    movie_id: Option<i64>,
    order_amount: Option<f64>,
    customer_email: Option<&str>,
) -> VoucherValidation {
    let voucher = match find_voucher_by_code(db, code).await {
        Ok(voucher) => voucher,
        Err(Error::VoucherNotFound { .. }) => {
            return VoucherValidation::rejected(VoucherRejection::InvalidCode);
        }
        Err(e) => {
            warn!("Voucher lookup failed: {e}");
            return VoucherValidation::rejected(VoucherRejection::InvalidCode);
        }
    };

    match evaluate_voucher(&voucher, clock.now(), movie_id, order_amount) {
        Ok(discount) => VoucherValidation::valid(voucher, discount),
        Err(rejection) => {
            debug!(%rejection, "Voucher rejected");
            VoucherValidation::rejected(rejection)
        }
    }
}

/// Records one use of `code`.
///
/// The increment is a single conditional update against the usage cap, and the
/// status flips to `used_up` in the same transaction once the cap is reached.
/// Fails with [`Error::UsageLimitExceeded`] if the cap had already been reached.
#[instrument(skip(db, clock))]
pub async fn apply_voucher(
    db: &DatabaseConnection,
    clock: &impl Clock,
    code: &str,
) -> Result<voucher::Model> {
    let voucher = find_voucher_by_code(db, code).await?;
    let now = clock.now();

    let txn = db.begin().await?;

    if !USAGE_COUNTER.apply(&txn, voucher.id, 1, now).await? {
        // Either the row vanished (NotFound) or the cap was already reached
        find_voucher(&txn, voucher.id).await?;
        return Err(Error::UsageLimitExceeded {
            code: code.to_string(),
        });
    }

    Voucher::update_many()
        .col_expr(voucher::Column::Status, Expr::value(VoucherStatus::UsedUp))
        .filter(voucher::Column::Id.eq(voucher.id))
        .filter(voucher::Column::MaxUsage.is_not_null())
        .filter(Expr::col(voucher::Column::CurrentUsage).gte(Expr::col(voucher::Column::MaxUsage)))
        .exec(&txn)
        .await?;

    let updated = find_voucher(&txn, voucher.id).await?;
    txn.commit().await?;

    info!(
        usage = updated.current_usage,
        max_usage = ?updated.max_usage,
        status = ?updated.status,
        "Voucher applied"
    );
    Ok(updated)
}

/// Applies a partial update to a voucher.
#[instrument(skip(db, clock, patch))]
pub async fn update_voucher(
    db: &DatabaseConnection,
    clock: &impl Clock,
    voucher_id: i64,
    patch: UpdateVoucherArgs,
) -> Result<voucher::Model> {
    let existing = find_voucher(db, voucher_id).await?;

    validate_percent(patch.discount_percent)?;
    for amount in [
        patch.discount_value,
        patch.max_discount_amount,
        patch.min_order_amount,
    ] {
        validate_amount(amount)?;
    }
    validate_window(
        patch.valid_from.unwrap_or(existing.valid_from),
        patch.valid_until.unwrap_or(existing.valid_until),
    )?;
    validate_max_usage(patch.max_usage)?;
    if let Some(priority) = patch.priority {
        validate_priority(priority)?;
    }

    let mut active: voucher::ActiveModel = existing.into();
    if let Some(title) = patch.title {
        active.title = Set(title);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(status) = patch.status {
        active.status = Set(status);
    }
    if let Some(value) = patch.discount_value {
        active.discount_value = Set(Some(value));
    }
    if let Some(percent) = patch.discount_percent {
        active.discount_percent = Set(Some(percent));
    }
    if let Some(cap) = patch.max_discount_amount {
        active.max_discount_amount = Set(Some(cap));
    }
    if let Some(minimum) = patch.min_order_amount {
        active.min_order_amount = Set(Some(minimum));
    }
    if let Some(valid_from) = patch.valid_from {
        active.valid_from = Set(valid_from);
    }
    if let Some(valid_until) = patch.valid_until {
        active.valid_until = Set(valid_until);
    }
    if let Some(max_usage) = patch.max_usage {
        active.max_usage = Set(Some(max_usage));
    }
    if let Some(priority) = patch.priority {
        active.priority = Set(priority);
    }
    if let Some(is_active) = patch.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(clock.now());

    active.update(db).await.map_err(Into::into)
}

/// Switches a voucher off: status `inactive`, `is_active = false`.
#[instrument(skip(db, clock))]
pub async fn deactivate_voucher(
    db: &DatabaseConnection,
    clock: &impl Clock,
    voucher_id: i64,
) -> Result<voucher::Model> {
    let voucher = find_voucher(db, voucher_id).await?;

    let mut active: voucher::ActiveModel = voucher.into();
    active.status = Set(VoucherStatus::Inactive);
    active.is_active = Set(false);
    active.updated_at = Set(clock.now());

    let updated = active.update(db).await?;
    info!(voucher_id, "Voucher deactivated");
    Ok(updated)
}

/// Deletes a voucher.
#[instrument(skip(db))]
pub async fn remove_voucher(db: &DatabaseConnection, voucher_id: i64) -> Result<()> {
    let voucher = find_voucher(db, voucher_id).await?;
    voucher.delete(db).await?;
    info!(voucher_id, "Voucher removed");
    Ok(())
}

/// Counts all, active and used-up vouchers, optionally restricted to vouchers created
/// within `created_between` (inclusive).
pub async fn get_usage_stats(
    db: &DatabaseConnection,
    created_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Result<VoucherUsageStats> {
    let scope = || {
        let query = Voucher::find();
        match created_between {
            Some((from, until)) => query.filter(voucher::Column::CreatedAt.between(from, until)),
            None => query,
        }
    };

    let total_vouchers = scope().count(db).await?;
    let active_vouchers = scope()
        .filter(voucher::Column::Status.eq(VoucherStatus::Active))
        .count(db)
        .await?;
    let used_vouchers = scope()
        .filter(voucher::Column::Status.eq(VoucherStatus::UsedUp))
        .count(db)
        .await?;

    Ok(VoucherUsageStats {
        total_vouchers,
        active_vouchers,
        used_vouchers,
    })
}

/// Active vouchers whose validity ends within `days` days, soonest first.
///
/// Fails with [`Error::Validation`] when `now + days` is not a representable instant.
pub async fn find_expiring_vouchers(
    db: &DatabaseConnection,
    clock: &impl Clock,
    days: i64,
) -> Result<Vec<voucher::Model>> {
    let horizon = Duration::try_days(days)
        .and_then(|window| clock.now().checked_add_signed(window))
        .ok_or_else(|| Error::Validation {
            message: format!("Expiry window of {days} days is out of range"),
        })?;

    Voucher::find()
        .filter(voucher::Column::Status.eq(VoucherStatus::Active))
        .filter(voucher::Column::ValidUntil.lte(horizon))
        .order_by_asc(voucher::Column::ValidUntil)
        .all(db)
        .await
        .map_err(Into::into)
}
