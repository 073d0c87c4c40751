use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{ProductCategory, ProductId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuoteId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteRoomId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteItemId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl QuoteRoomId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl QuoteItemId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    Draft,
    PendingApproval,
    PendingCustomer,
    Accepted,
    Rejected,
    Expired,
}

impl QuoteStatus {
    /// Statuses a lapsed `valid_until` moves to `Expired`.
    pub const EXPIRABLE: [QuoteStatus; 3] =
        [QuoteStatus::Draft, QuoteStatus::PendingApproval, QuoteStatus::PendingCustomer];

    pub fn is_expirable(&self) -> bool {
        Self::EXPIRABLE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::PendingCustomer => "PENDING_CUSTOMER",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "DRAFT" => Ok(Self::Draft),
            "PENDING_APPROVAL" => Ok(Self::PendingApproval),
            "PENDING_CUSTOMER" => Ok(Self::PendingCustomer),
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(format!("unknown quote status `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub quote_no: String,
    pub version: u32,
    pub status: QuoteStatus,
    pub is_active: bool,
    pub parent_quote_id: Option<QuoteId>,
    pub root_quote_id: Option<QuoteId>,
    pub title: Option<String>,
    pub total_amount: Decimal,
    /// Payable ratio in `(0, 1]`, e.g. `0.9500` for a 5% discount.
    pub discount_rate: Option<Decimal>,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    /// Id every member of this quote's family shares. A root quote written
    /// before lineage tracking may carry no `root_quote_id`; it is its own root.
    pub fn family_root(&self) -> QuoteId {
        self.root_quote_id.clone().unwrap_or_else(|| self.id.clone())
    }

    pub fn check_lineage(&self) -> Result<(), DomainError> {
        if self.parent_quote_id.as_ref() == Some(&self.id) {
            return Err(DomainError::InvariantViolation(format!(
                "quote {} lists itself as its parent version",
                self.id.0
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRoom {
    pub id: QuoteRoomId,
    pub tenant_id: TenantId,
    pub quote_id: QuoteId,
    pub name: String,
    pub measure_room_id: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub id: QuoteItemId,
    pub tenant_id: TenantId,
    pub quote_id: QuoteId,
    pub room_id: Option<QuoteRoomId>,
    /// Main item this accessory hangs off (e.g. the curtain a track belongs to).
    pub parent_id: Option<QuoteItemId>,
    pub category: ProductCategory,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub unit: Option<String>,
    pub unit_price: Decimal,
    pub quantity: Decimal,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    pub subtotal: Decimal,
    pub attributes: serde_json::Value,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A quote together with the rooms and items it owns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteTree {
    pub quote: Quote,
    pub rooms: Vec<QuoteRoom>,
    pub items: Vec<QuoteItem>,
}

impl QuoteTree {
    pub fn room_named(&self, name: &str) -> Option<&QuoteRoom> {
        self.rooms.iter().find(|room| room.name == name)
    }

    pub fn items_in_room<'a>(
        &'a self,
        room_id: &'a QuoteRoomId,
    ) -> impl Iterator<Item = &'a QuoteItem> + 'a {
        self.items.iter().filter(move |item| item.room_id.as_ref() == Some(room_id))
    }
}
