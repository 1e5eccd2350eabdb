//! Price negotiation state machine.
//!
//! The engine is a pure function from `(deal, request, requester)` to either
//! a [`DealChange`] or a [`NegotiationError`]. It performs no I/O; the only
//! ambient input is the injected [`Clock`] used to stamp `updated_at`.
//!
//! Status graph: `pending` and `in_progress` may move to any other status;
//! `completed` and `cancelled` are terminal. Price changes require
//! `in_progress`, buyers may only lower the price and sellers may only raise it.

use std::{fmt, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use entity::{Deal, DealStatus, UserRole};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::clock::{Clock, next_stamp};

pub(crate) const INVALID_PRICE: &str = "Please enter a valid price";
const UNCHANGED_PRICE: &str = "New price must be different from current price";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("Only the buyer or seller can update this deal")]
    Unauthorized,
    #[error("This deal is {0} and cannot be updated")]
    TerminalState(DealStatus),
    #[error("Price negotiation is unavailable for {} deals", .0.label())]
    NotNegotiable(DealStatus),
    #[error("{0}")]
    InvalidPrice(&'static str),
    #[error("As a {role}, you can only offer a {} price", direction_word(.role))]
    InvalidDirection { role: UserRole },
    #[error("The deal is already {}", .0.label())]
    StatusUnchanged(DealStatus),
}

fn direction_word(role: &UserRole) -> &'static str {
    match role {
        UserRole::Buyer => "lower",
        UserRole::Seller => "higher",
    }
}

impl NegotiationError {
    pub fn code(&self) -> &'static str {
        match self {
            NegotiationError::Unauthorized => "UNAUTHORIZED",
            NegotiationError::TerminalState(_) => "TERMINAL_STATE",
            NegotiationError::NotNegotiable(_) => "NOT_NEGOTIABLE",
            NegotiationError::InvalidPrice(_) => "INVALID_PRICE",
            NegotiationError::InvalidDirection { .. } => "INVALID_DIRECTION",
            NegotiationError::StatusUnchanged(_) => "UNCHANGED",
        }
    }
}

/// What an accepted request changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Status { from: DealStatus, to: DealStatus },
    Price { from: Decimal, to: Decimal },
}

/// Output of an accepted request: the next deal snapshot plus the
/// `updated_at` of the snapshot the checks ran against.
///
/// Only the engine constructs this, so a repository that accepts
/// `&DealChange` can only ever persist engine output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DealChange {
    deal: Deal,
    based_on: DateTime<Utc>,
    kind: ChangeKind,
}

impl DealChange {
    pub fn deal(&self) -> &Deal {
        &self.deal
    }

    pub fn into_deal(self) -> Deal {
        self.deal
    }

    pub fn based_on(&self) -> DateTime<Utc> {
        self.based_on
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceDirection {
    Decrease,
    Increase,
}

/// Display-only summary of a proposed price against the current one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceChange {
    pub direction: PriceDirection,
    pub percent: Decimal,
}

impl PriceChange {
    pub fn between(current: Decimal, proposed: Decimal) -> Self {
        let direction = if proposed < current {
            PriceDirection::Decrease
        } else {
            PriceDirection::Increase
        };
        let percent = (proposed - current)
            .checked_div(current)
            .map(|ratio| ratio.abs() * Decimal::ONE_HUNDRED)
            .unwrap_or(Decimal::ZERO);
        Self { direction, percent }
    }
}

impl fmt::Display for PriceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.direction {
            PriceDirection::Decrease => "Decrease",
            PriceDirection::Increase => "Increase",
        };
        write!(f, "{verb} by {:.2}%", self.percent.round_dp(2))
    }
}

#[derive(Clone)]
pub struct Negotiator {
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Negotiator").finish_non_exhaustive()
    }
}

impl Negotiator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn request_status_change(
        &self,
        deal: &Deal,
        requested: DealStatus,
        requester: Uuid,
    ) -> Result<DealChange, NegotiationError> {
        party_role(deal, requester)?;
        if !deal.status.can_transition_to(requested) {
            return Err(if deal.status.is_terminal() {
                NegotiationError::TerminalState(deal.status)
            } else {
                NegotiationError::StatusUnchanged(requested)
            });
        }

        let mut next = deal.clone();
        next.status = requested;
        next.updated_at = next_stamp(self.clock.as_ref(), deal.updated_at);
        Ok(DealChange {
            deal: next,
            based_on: deal.updated_at,
            kind: ChangeKind::Status {
                from: deal.status,
                to: requested,
            },
        })
    }

    pub fn request_price_change(
        &self,
        deal: &Deal,
        requester: Uuid,
        proposed: Decimal,
    ) -> Result<DealChange, NegotiationError> {
        check_price_change(deal, requester, proposed)?;

        let mut next = deal.clone();
        next.current_price = proposed;
        next.updated_at = next_stamp(self.clock.as_ref(), deal.updated_at);
        Ok(DealChange {
            deal: next,
            based_on: deal.updated_at,
            kind: ChangeKind::Price {
                from: deal.current_price,
                to: proposed,
            },
        })
    }
}

/// The requester's side of the deal. The buyer check wins if ids collide.
pub fn party_role(deal: &Deal, requester: Uuid) -> Result<UserRole, NegotiationError> {
    if deal.buyer_id == requester {
        Ok(UserRole::Buyer)
    } else if deal.seller_id == Some(requester) {
        Ok(UserRole::Seller)
    } else {
        Err(NegotiationError::Unauthorized)
    }
}

/// Run every price-change guard without producing a new snapshot.
pub fn check_price_change(
    deal: &Deal,
    requester: Uuid,
    proposed: Decimal,
) -> Result<PriceChange, NegotiationError> {
    let role = party_role(deal, requester)?;
    if deal.status != DealStatus::InProgress {
        return Err(NegotiationError::NotNegotiable(deal.status));
    }
    if proposed <= Decimal::ZERO {
        return Err(NegotiationError::InvalidPrice(INVALID_PRICE));
    }
    if proposed == deal.current_price {
        return Err(NegotiationError::InvalidPrice(UNCHANGED_PRICE));
    }
    let allowed = match role {
        UserRole::Buyer => proposed < deal.current_price,
        UserRole::Seller => proposed > deal.current_price,
    };
    if !allowed {
        return Err(NegotiationError::InvalidDirection { role });
    }
    Ok(PriceChange::between(deal.current_price, proposed))
}

/// Parse user-entered price text such as `45000`, `$45,000.50`.
pub fn parse_price(raw: &str) -> Result<Decimal, NegotiationError> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        return Err(NegotiationError::InvalidPrice(INVALID_PRICE));
    }
    Decimal::from_str(&cleaned).map_err(|_| NegotiationError::InvalidPrice(INVALID_PRICE))
}

/// Dollar formatting with thousands separators: `$45,000`, `$1,250.5`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).normalize();
    let text = rounded.abs().to_string();
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole.to_string(), Some(fraction.to_string())),
        None => (text, None),
    };
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(fraction) => format!("{sign}${grouped}.{fraction}"),
        None => format!("{sign}${grouped}"),
    }
}
