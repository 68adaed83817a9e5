//! Offspring status dimensions and patch shapes
//!
//! The five status enums are stored as TEXT codes in the database; each
//! enum carries `as_str`/`parse` for the column round-trip. Serde uses the
//! same codes so API payloads and DB values never diverge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Whether the individual is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifeState {
    Alive,
    Deceased,
}

impl LifeState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifeState::Alive => "ALIVE",
            LifeState::Deceased => "DECEASED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ALIVE" => Some(LifeState::Alive),
            "DECEASED" => Some(LifeState::Deceased),
            _ => None,
        }
    }
}

/// Where the individual stands in the placement pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacementState {
    Unassigned,
    OptionHold,
    Reserved,
    Placed,
    Returned,
    Transferred,
}

impl PlacementState {
    pub fn as_str(self) -> &'static str {
        match self {
            PlacementState::Unassigned => "UNASSIGNED",
            PlacementState::OptionHold => "OPTION_HOLD",
            PlacementState::Reserved => "RESERVED",
            PlacementState::Placed => "PLACED",
            PlacementState::Returned => "RETURNED",
            PlacementState::Transferred => "TRANSFERRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNASSIGNED" => Some(PlacementState::Unassigned),
            "OPTION_HOLD" => Some(PlacementState::OptionHold),
            "RESERVED" => Some(PlacementState::Reserved),
            "PLACED" => Some(PlacementState::Placed),
            "RETURNED" => Some(PlacementState::Returned),
            "TRANSFERRED" => Some(PlacementState::Transferred),
            _ => None,
        }
    }
}

/// Whether the breeder intends to retain the individual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeeperIntent {
    Available,
    Withheld,
    Keep,
}

impl KeeperIntent {
    pub fn as_str(self) -> &'static str {
        match self {
            KeeperIntent::Available => "AVAILABLE",
            KeeperIntent::Withheld => "WITHHELD",
            KeeperIntent::Keep => "KEEP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(KeeperIntent::Available),
            "WITHHELD" => Some(KeeperIntent::Withheld),
            "KEEP" => Some(KeeperIntent::Keep),
            _ => None,
        }
    }
}

/// Payment progress for the individual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinancialState {
    None,
    DepositPending,
    DepositPaid,
    PaidInFull,
    Refunded,
    Chargeback,
}

impl FinancialState {
    pub fn as_str(self) -> &'static str {
        match self {
            FinancialState::None => "NONE",
            FinancialState::DepositPending => "DEPOSIT_PENDING",
            FinancialState::DepositPaid => "DEPOSIT_PAID",
            FinancialState::PaidInFull => "PAID_IN_FULL",
            FinancialState::Refunded => "REFUNDED",
            FinancialState::Chargeback => "CHARGEBACK",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(FinancialState::None),
            "DEPOSIT_PENDING" => Some(FinancialState::DepositPending),
            "DEPOSIT_PAID" => Some(FinancialState::DepositPaid),
            "PAID_IN_FULL" => Some(FinancialState::PaidInFull),
            "REFUNDED" => Some(FinancialState::Refunded),
            "CHARGEBACK" => Some(FinancialState::Chargeback),
            _ => None,
        }
    }
}

/// Contract documentation progress. Totally ordered; promotion is
/// monotonic and driven by the explicit discriminants, never by the
/// declaration position of a variant in some list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaperworkState {
    None = 0,
    Sent = 1,
    Signed = 2,
    Complete = 3,
}

impl PaperworkState {
    pub fn as_str(self) -> &'static str {
        match self {
            PaperworkState::None => "NONE",
            PaperworkState::Sent => "SENT",
            PaperworkState::Signed => "SIGNED",
            PaperworkState::Complete => "COMPLETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(PaperworkState::None),
            "SENT" => Some(PaperworkState::Sent),
            "SIGNED" => Some(PaperworkState::Signed),
            "COMPLETE" => Some(PaperworkState::Complete),
            _ => None,
        }
    }

    /// Position along NONE < SENT < SIGNED < COMPLETE
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Raise to at least `floor`; never regresses
    pub fn promote_to(&mut self, floor: PaperworkState) {
        if floor.ordinal() > self.ordinal() {
            *self = floor;
        }
    }
}

/// Fully resolved offspring status: every dimension and supporting field
/// is explicit on the output side of normalization (nulls are explicit,
/// not "unset").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffspringState {
    pub life: LifeState,
    pub placement: PlacementState,
    pub keeper: KeeperIntent,
    pub financial: FinancialState,
    pub paperwork: PaperworkState,
    pub died_at: Option<DateTime<Utc>>,
    pub placed_at: Option<DateTime<Utc>>,
    pub paid_in_full_at: Option<DateTime<Utc>>,
    pub contract_id: Option<Uuid>,
    pub contract_signed_at: Option<DateTime<Utc>>,
    pub promoted_animal_id: Option<Uuid>,
    pub buyer_party_id: Option<Uuid>,
    pub deposit_cents: Option<i64>,
    pub price_cents: Option<i64>,
}

impl Default for OffspringState {
    fn default() -> Self {
        OffspringState {
            life: LifeState::Alive,
            placement: PlacementState::Unassigned,
            keeper: KeeperIntent::Available,
            financial: FinancialState::None,
            paperwork: PaperworkState::None,
            died_at: None,
            placed_at: None,
            paid_in_full_at: None,
            contract_id: None,
            contract_signed_at: None,
            promoted_animal_id: None,
            buyer_party_id: None,
            deposit_cents: None,
            price_cents: None,
        }
    }
}

/// A partial update to an offspring's status.
///
/// Unspecified fields mean "keep current". Nullable fields use the
/// double-option pattern so a patch can distinguish "leave as-is"
/// (`None`) from "explicitly clear" (`Some(None)`); the normalizer needs
/// that distinction for the death and placement guards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OffspringPatch {
    pub life: Option<LifeState>,
    pub placement: Option<PlacementState>,
    pub keeper: Option<KeeperIntent>,
    pub financial: Option<FinancialState>,
    pub paperwork: Option<PaperworkState>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub died_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub placed_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub paid_in_full_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub contract_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub contract_signed_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub promoted_animal_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub buyer_party_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub deposit_cents: Option<Option<i64>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub price_cents: Option<Option<i64>>,
}

/// Deserialize a present-but-possibly-null field as `Some(Option<T>)`.
/// Combined with `#[serde(default)]`, an absent field stays `None`.
fn explicit_null<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// The complete set of patch rejections the normalizer can produce.
/// Each variant names the rule and field so callers can present an
/// actionable message.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionViolation {
    /// died_at was explicitly cleared while the individual stays deceased
    #[error("died_at cannot be cleared while life state is DECEASED")]
    DeathCleared,

    /// placement fields cannot move once the individual is deceased
    #[error("{field} cannot change once life state is DECEASED")]
    PlacementFrozenAfterDeath { field: &'static str },

    /// placed_at was explicitly cleared while placement stays PLACED
    #[error("placed_at cannot be cleared while placement state is PLACED")]
    PlacedAtCleared,

    /// an attempt was made to place a deceased individual
    #[error("a deceased individual cannot be placed")]
    PlacedWhileDeceased,

    /// placement moved to PLACED with no placement timestamp
    #[error("placement state PLACED requires a placed_at timestamp")]
    PlacedWithoutTimestamp,

    /// keeper intent tried to move from KEEP back to AVAILABLE
    #[error("keeper intent cannot move from KEEP back to AVAILABLE")]
    KeepRevoked,
}
