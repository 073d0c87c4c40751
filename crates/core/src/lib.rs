pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod money;
pub mod quoting;
pub mod risk;

pub use catalog::{PriceCatalog, StaticPriceCatalog};
pub use config::{AppConfig, QuoteEngineSettings};
pub use domain::measure::{MeasureItem, MeasureSheet, MeasureSheetId, MeasureTaskId};
pub use domain::product::{Product, ProductCategory, ProductId};
pub use domain::quote::{
    CustomerId, Quote, QuoteId, QuoteItem, QuoteItemId, QuoteRoom, QuoteRoomId, QuoteStatus,
    QuoteTree, TenantId, UserId,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use quoting::expiration::{
    ExpirationCheck, ExpirationInfo, PriceChange, RefreshOutcome, SweepReport,
};
pub use quoting::reconcile::{ImportAction, ImportOutcome, ImportPreview, ImportSummary};
pub use quoting::submission::SubmissionOutcome;
pub use risk::{DiscountRiskEvaluator, RiskAssessment, RiskEvaluator, RiskLevel};
