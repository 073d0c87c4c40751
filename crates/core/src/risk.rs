use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::QuoteItem;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Pass,
    RequiresApproval,
    Block,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub reasons: Vec<String>,
}

impl RiskAssessment {
    pub fn pass() -> Self {
        Self { level: RiskLevel::Pass, reasons: Vec::new() }
    }
}

/// Decides whether a quote may go straight to the customer.
pub trait RiskEvaluator: Send + Sync {
    fn evaluate(&self, items: &[QuoteItem], discount_rate: Option<Decimal>) -> RiskAssessment;
}

/// Flags deep discounts and unpriced lines.
///
/// `discount_rate` is the payable ratio: below `approval_floor` a manager has
/// to sign off, below `block_floor` the quote cannot be submitted at all.
#[derive(Clone, Debug)]
pub struct DiscountRiskEvaluator {
    pub approval_floor: Decimal,
    pub block_floor: Decimal,
}

impl Default for DiscountRiskEvaluator {
    fn default() -> Self {
        Self { approval_floor: Decimal::new(80, 2), block_floor: Decimal::new(50, 2) }
    }
}

impl RiskEvaluator for DiscountRiskEvaluator {
    fn evaluate(&self, items: &[QuoteItem], discount_rate: Option<Decimal>) -> RiskAssessment {
        let mut blocking = Vec::new();
        let mut approval = Vec::new();

        if items.is_empty() {
            blocking.push("quote has no items".to_string());
        }

        if let Some(rate) = discount_rate {
            if rate <= Decimal::ZERO || rate > Decimal::ONE {
                blocking.push(format!("discount rate {rate} is outside (0, 1]"));
            } else if rate < self.block_floor {
                blocking
                    .push(format!("discount rate {rate} is below the floor {}", self.block_floor));
            } else if rate < self.approval_floor {
                approval.push(format!(
                    "discount rate {rate} is below the approval threshold {}",
                    self.approval_floor
                ));
            }
        }

        for item in items.iter().filter(|item| item.unit_price <= Decimal::ZERO) {
            approval.push(format!("item `{}` has no positive unit price", item.product_name));
        }

        if !blocking.is_empty() {
            RiskAssessment { level: RiskLevel::Block, reasons: blocking }
        } else if !approval.is_empty() {
            RiskAssessment { level: RiskLevel::RequiresApproval, reasons: approval }
        } else {
            RiskAssessment::pass()
        }
    }
}
