use chrono::{DateTime, Utc};

use crate::domain::quote::{CustomerId, Quote, QuoteId, QuoteStatus, UserId};
use crate::errors::DomainError;

/// Strips a trailing `-V<n>` suffix: `QT1700-V3` → `QT1700`.
pub fn strip_version_suffix(quote_no: &str) -> &str {
    if let Some(index) = quote_no.rfind("-V") {
        let digits = &quote_no[index + 2..];
        if !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return &quote_no[..index];
        }
    }
    quote_no
}

pub fn versioned_quote_no(source_quote_no: &str, version: u32) -> String {
    format!("{}-V{}", strip_version_suffix(source_quote_no), version)
}

/// Fresh number for a quote that starts its own family.
pub fn generate_quote_no(now: DateTime<Utc>) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!("QT{}{}", now.format("%Y%m%d%H%M%S"), nonce[..6].to_ascii_uppercase())
}

pub fn next_version(family: &[Quote]) -> u32 {
    family.iter().map(|quote| quote.version).max().unwrap_or(0) + 1
}

/// Builds the row for the next version of `source` within its family.
///
/// The new version starts active and in `Draft`, keeps the source's money
/// fields, and points back at `source` through `parent_quote_id`.
pub fn plan_next_version(
    source: &Quote,
    family: &[Quote],
    created_by: &UserId,
    valid_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Quote, DomainError> {
    source.check_lineage()?;
    let version = next_version(family);
    let quote = Quote {
        id: QuoteId::generate(),
        tenant_id: source.tenant_id.clone(),
        customer_id: source.customer_id.clone(),
        quote_no: versioned_quote_no(&source.quote_no, version),
        version,
        status: QuoteStatus::Draft,
        is_active: true,
        parent_quote_id: Some(source.id.clone()),
        root_quote_id: Some(source.family_root()),
        title: source.title.clone(),
        total_amount: source.total_amount,
        discount_rate: source.discount_rate,
        discount_amount: source.discount_amount,
        final_amount: source.final_amount,
        valid_until,
        notes: source.notes.clone(),
        created_by: created_by.clone(),
        created_at: now,
        updated_at: now,
    };
    quote.check_lineage()?;
    Ok(quote)
}

/// Builds the head of a brand-new family copied from `source`.
pub fn plan_independent_copy(
    source: &Quote,
    target_customer: Option<&CustomerId>,
    created_by: &UserId,
    valid_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Quote {
    let id = QuoteId::generate();
    let provenance = format!("Copied from quote {}", source.quote_no);
    let notes = match source.notes.as_deref().map(str::trim) {
        Some(existing) if !existing.is_empty() => format!("{existing}\n{provenance}"),
        _ => provenance,
    };

    Quote {
        root_quote_id: Some(id.clone()),
        id,
        tenant_id: source.tenant_id.clone(),
        customer_id: target_customer.cloned().unwrap_or_else(|| source.customer_id.clone()),
        quote_no: generate_quote_no(now),
        version: 1,
        status: QuoteStatus::Draft,
        is_active: true,
        parent_quote_id: None,
        title: source.title.clone(),
        total_amount: source.total_amount,
        discount_rate: source.discount_rate,
        discount_amount: source.discount_amount,
        final_amount: source.final_amount,
        valid_until,
        notes: Some(notes),
        created_by: created_by.clone(),
        created_at: now,
        updated_at: now,
    }
}

/// Checks that exactly one member of a loaded family is active.
pub fn ensure_single_active(family: &[Quote]) -> Result<&Quote, DomainError> {
    let mut active = family.iter().filter(|quote| quote.is_active);
    match (active.next(), active.next()) {
        (Some(quote), None) => Ok(quote),
        (None, _) => Err(DomainError::InvariantViolation(
            "quote family has no active version".to_string(),
        )),
        (Some(_), Some(_)) => Err(DomainError::InvariantViolation(
            "quote family has more than one active version".to_string(),
        )),
    }
}
