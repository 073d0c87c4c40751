use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::quote::{Quote, QuoteId, QuoteItem, QuoteStatus};
use crate::errors::DomainError;
use crate::risk::{RiskEvaluator, RiskLevel};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub quote_id: QuoteId,
    pub status: QuoteStatus,
    /// Why approval is needed; empty when the quote goes straight to the customer.
    pub reasons: Vec<String>,
}

/// Status a draft moves to on submission, as decided by `evaluator`.
pub fn plan_submission(
    quote: &Quote,
    items: &[QuoteItem],
    evaluator: &dyn RiskEvaluator,
    now: DateTime<Utc>,
) -> Result<SubmissionOutcome, DomainError> {
    if quote.status != QuoteStatus::Draft {
        return Err(DomainError::InvalidState {
            quote_id: quote.id.clone(),
            status: quote.status,
            operation: "submit",
        });
    }
    if quote.valid_until.is_some_and(|valid_until| valid_until < now) {
        return Err(DomainError::InvalidState {
            quote_id: quote.id.clone(),
            status: quote.status,
            operation: "submit lapsed",
        });
    }

    let assessment = evaluator.evaluate(items, quote.discount_rate);
    let status = match assessment.level {
        RiskLevel::Block => {
            return Err(DomainError::SubmissionBlocked {
                quote_id: quote.id.clone(),
                reasons: assessment.reasons,
            })
        }
        RiskLevel::RequiresApproval => QuoteStatus::PendingApproval,
        RiskLevel::Pass => QuoteStatus::PendingCustomer,
    };

    Ok(SubmissionOutcome { quote_id: quote.id.clone(), status, reasons: assessment.reasons })
}
