//! Offspring state normalization
//!
//! Pure function from `(current state, patch)` to a fully resolved state.
//! The cross-field invariants run as an ordered pipeline of named rules;
//! earlier rules may force fields that later rules read, so the order of
//! [`RULES`] is part of the contract:
//!
//! 1. death guard (explicit clear of died_at while deceased fails)
//! 2. death forcing (died_at implies DECEASED; DECEASED stamps died_at)
//! 3. frozen-after-death guard (placement fields locked once deceased)
//! 4. placed_at guard (explicit clear of placed_at while PLACED fails)
//! 5. placement forcing (placed_at and PLACED imply each other)
//! 6. buyer-implies-reserved
//! 7. keeper ratchet (KEEP is one-way; promotion forces KEEP)
//! 8. financial forcing (paid_in_full_at; deposit with buyer)
//! 9. paperwork promotion (contract milestones never regress paperwork)

use chrono::{DateTime, Utc};

use super::state::{
    FinancialState, KeeperIntent, LifeState, OffspringPatch, OffspringState, PaperworkState,
    PlacementState, TransitionViolation,
};

/// Inputs every rule can read: the pre-patch state (if any), the raw
/// patch (to detect explicit nulls and change attempts), and the clock
/// value used when death forcing must stamp a timestamp.
struct NormalizeCtx<'a> {
    current: Option<&'a OffspringState>,
    patch: &'a OffspringPatch,
    now: DateTime<Utc>,
}

type Rule = fn(&NormalizeCtx<'_>, &mut OffspringState) -> Result<(), TransitionViolation>;

/// Invariant rules in application order. Order matters: death forcing
/// must run before the placement rules, placement before the buyer rule,
/// and so on.
const RULES: &[Rule] = &[
    death_guard,
    death_forcing,
    frozen_after_death,
    placed_at_guard,
    placement_forcing,
    buyer_implies_reserved,
    keeper_ratchet,
    financial_forcing,
    paperwork_promotion,
];

/// Resolve a patch against the current state into a fully explicit state,
/// or reject it with the violated invariant.
///
/// Pure and deterministic: `now` is only used when a deceased individual
/// has no death timestamp yet.
pub fn normalize(
    current: Option<&OffspringState>,
    patch: &OffspringPatch,
    now: DateTime<Utc>,
) -> Result<OffspringState, TransitionViolation> {
    let mut draft = resolve_draft(current, patch);
    let ctx = NormalizeCtx { current, patch, now };
    for rule in RULES {
        rule(&ctx, &mut draft)?;
    }
    Ok(draft)
}

/// Step 1: patch value, else current value, else documented default.
fn resolve_draft(current: Option<&OffspringState>, patch: &OffspringPatch) -> OffspringState {
    let base = current.cloned().unwrap_or_default();
    OffspringState {
        life: patch.life.unwrap_or(base.life),
        placement: patch.placement.unwrap_or(base.placement),
        keeper: patch.keeper.unwrap_or(base.keeper),
        financial: patch.financial.unwrap_or(base.financial),
        paperwork: patch.paperwork.unwrap_or(base.paperwork),
        died_at: patch.died_at.unwrap_or(base.died_at),
        placed_at: patch.placed_at.unwrap_or(base.placed_at),
        paid_in_full_at: patch.paid_in_full_at.unwrap_or(base.paid_in_full_at),
        contract_id: patch.contract_id.unwrap_or(base.contract_id),
        contract_signed_at: patch.contract_signed_at.unwrap_or(base.contract_signed_at),
        promoted_animal_id: patch.promoted_animal_id.unwrap_or(base.promoted_animal_id),
        buyer_party_id: patch.buyer_party_id.unwrap_or(base.buyer_party_id),
        deposit_cents: patch.deposit_cents.unwrap_or(base.deposit_cents),
        price_cents: patch.price_cents.unwrap_or(base.price_cents),
    }
}

/// Explicitly clearing died_at while the individual is (or remains)
/// deceased is a resurrection-by-omission and is rejected. Resurrection
/// must set the life state explicitly as well.
fn death_guard(
    ctx: &NormalizeCtx<'_>,
    draft: &mut OffspringState,
) -> Result<(), TransitionViolation> {
    if ctx.patch.died_at == Some(None) && draft.life == LifeState::Deceased {
        return Err(TransitionViolation::DeathCleared);
    }
    Ok(())
}

/// A death timestamp implies DECEASED; DECEASED without a timestamp gets
/// one stamped from the clock.
fn death_forcing(
    ctx: &NormalizeCtx<'_>,
    draft: &mut OffspringState,
) -> Result<(), TransitionViolation> {
    if draft.died_at.is_some() {
        draft.life = LifeState::Deceased;
    } else if draft.life == LifeState::Deceased {
        draft.died_at = Some(ctx.now);
    }
    Ok(())
}

/// Once deceased, placement is frozen: the patch may not move
/// placement_state away from its current value nor change placed_at.
fn frozen_after_death(
    ctx: &NormalizeCtx<'_>,
    _draft: &mut OffspringState,
) -> Result<(), TransitionViolation> {
    let Some(current) = ctx.current else {
        return Ok(());
    };
    if current.life != LifeState::Deceased {
        return Ok(());
    }
    if let Some(requested) = ctx.patch.placement {
        if requested != current.placement {
            return Err(TransitionViolation::PlacementFrozenAfterDeath {
                field: "placement_state",
            });
        }
    }
    if let Some(requested) = ctx.patch.placed_at {
        if requested != current.placed_at {
            return Err(TransitionViolation::PlacementFrozenAfterDeath { field: "placed_at" });
        }
    }
    Ok(())
}

/// Explicitly clearing placed_at while placement stays PLACED is rejected.
fn placed_at_guard(
    ctx: &NormalizeCtx<'_>,
    draft: &mut OffspringState,
) -> Result<(), TransitionViolation> {
    if ctx.patch.placed_at == Some(None) && draft.placement == PlacementState::Placed {
        return Err(TransitionViolation::PlacedAtCleared);
    }
    Ok(())
}

/// placed_at and PLACED imply each other, checked in both directions.
/// Introducing a placement on a deceased individual fails; an individual
/// that was already PLACED may die without tripping this rule.
fn placement_forcing(
    ctx: &NormalizeCtx<'_>,
    draft: &mut OffspringState,
) -> Result<(), TransitionViolation> {
    let was_placed = ctx
        .current
        .is_some_and(|c| c.placement == PlacementState::Placed);

    if draft.placed_at.is_some() && draft.placement != PlacementState::Placed {
        if draft.life == LifeState::Deceased && !was_placed {
            return Err(TransitionViolation::PlacedWhileDeceased);
        }
        draft.placement = PlacementState::Placed;
    }

    if draft.placement == PlacementState::Placed {
        if draft.placed_at.is_none() {
            return Err(TransitionViolation::PlacedWithoutTimestamp);
        }
        if draft.life == LifeState::Deceased && !was_placed {
            return Err(TransitionViolation::PlacedWhileDeceased);
        }
    }
    Ok(())
}

/// An assigned buyer reserves the individual unless it is already placed
/// or deceased. Buyer assignment never downgrades PLACED.
fn buyer_implies_reserved(
    _ctx: &NormalizeCtx<'_>,
    draft: &mut OffspringState,
) -> Result<(), TransitionViolation> {
    if draft.buyer_party_id.is_some()
        && draft.placement != PlacementState::Placed
        && draft.life != LifeState::Deceased
    {
        draft.placement = PlacementState::Reserved;
    }
    Ok(())
}

/// KEEP is a one-way ratchet: moving back to AVAILABLE fails regardless
/// of any other field. A promoted individual (standalone adult-animal
/// record exists) is forced to KEEP.
fn keeper_ratchet(
    ctx: &NormalizeCtx<'_>,
    draft: &mut OffspringState,
) -> Result<(), TransitionViolation> {
    if let Some(current) = ctx.current {
        if current.keeper == KeeperIntent::Keep
            && ctx.patch.keeper == Some(KeeperIntent::Available)
        {
            return Err(TransitionViolation::KeepRevoked);
        }
    }
    if draft.promoted_animal_id.is_some() {
        draft.keeper = KeeperIntent::Keep;
    }
    Ok(())
}

/// A paid-in-full timestamp forces PAID_IN_FULL. A positive deposit with
/// an assigned buyer moves an otherwise-untouched financial state to
/// DEPOSIT_PENDING; terminal states are left alone.
fn financial_forcing(
    _ctx: &NormalizeCtx<'_>,
    draft: &mut OffspringState,
) -> Result<(), TransitionViolation> {
    if draft.paid_in_full_at.is_some() {
        draft.financial = FinancialState::PaidInFull;
    }
    if draft.deposit_cents.is_some_and(|cents| cents > 0)
        && draft.buyer_party_id.is_some()
        && draft.financial == FinancialState::None
    {
        draft.financial = FinancialState::DepositPending;
    }
    Ok(())
}

/// Contract milestones promote paperwork monotonically: a signature means
/// at least SIGNED, a sent contract means at least SENT.
fn paperwork_promotion(
    _ctx: &NormalizeCtx<'_>,
    draft: &mut OffspringState,
) -> Result<(), TransitionViolation> {
    if draft.contract_signed_at.is_some() {
        draft.paperwork.promote_to(PaperworkState::Signed);
    } else if draft.contract_id.is_some() {
        draft.paperwork.promote_to(PaperworkState::Sent);
    }
    Ok(())
}
