//! Voucher entity - promotional codes and their usage counters.
//!
//! Only `Percentage` and `FixedAmount` vouchers carry computable discounts, and only the
//! `AllMovies` and `SpecificMovie` scopes are enforced; the remaining variants are kept
//! so records round-trip faithfully.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of discount a voucher grants
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum VoucherType {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "fixed_amount")]
    FixedAmount,
    #[sea_orm(string_value = "buy_one_get_one")]
    BuyOneGetOne,
    #[sea_orm(string_value = "free_item")]
    FreeItem,
    #[sea_orm(string_value = "combo_deal")]
    ComboDeal,
}

/// Lifecycle state of a voucher
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "used_up")]
    UsedUp,
}

/// Which orders a voucher may discount
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum DiscountScope {
    #[sea_orm(string_value = "all_movies")]
    AllMovies,
    #[sea_orm(string_value = "specific_movie")]
    SpecificMovie,
    #[sea_orm(string_value = "specific_genre")]
    SpecificGenre,
    #[sea_orm(string_value = "weekend_only")]
    WeekendOnly,
    #[sea_orm(string_value = "weekday_only")]
    WeekdayOnly,
    #[sea_orm(string_value = "premium_screens")]
    PremiumScreens,
    #[sea_orm(string_value = "concessions")]
    Concessions,
}

/// Voucher database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vouchers")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Redeemable code, uppercase `A-Z0-9-_`, 3 to 50 characters
    #[sea_orm(unique)]
    pub code: String,
    pub title: String,
    pub description: String,
    pub voucher_type: VoucherType,
    pub status: VoucherStatus,
    pub discount_scope: DiscountScope,
    /// Flat discount for `FixedAmount` vouchers
    pub discount_value: Option<f64>,
    /// Percentage (0-100) for `Percentage` vouchers
    pub discount_percent: Option<f64>,
    /// Upper bound applied to percentage discounts
    pub max_discount_amount: Option<f64>,
    /// Orders below this amount are rejected
    pub min_order_amount: Option<f64>,
    /// Target movie when `discount_scope` is `SpecificMovie`
    pub applicable_movie_id: Option<i64>,
    pub valid_from: DateTimeUtc,
    pub valid_until: DateTimeUtc,
    /// Usage cap across all customers; `None` means unlimited
    pub max_usage: Option<i32>,
    pub current_usage: i32,
    /// Informational per-customer cap, not enforced by the core
    pub max_usage_per_user: Option<i32>,
    pub is_stackable: bool,
    /// Higher priority vouchers are listed first
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::movie::Entity",
        from = "Column::ApplicableMovieId",
        to = "super::movie::Column::Id"
    )]
    Movie,
}

impl Related<super::movie::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movie.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
