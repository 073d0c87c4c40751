use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::product::ProductId;
use crate::domain::quote::TenantId;
use crate::errors::ApplicationError;

/// Current unit prices, looked up in one batch per call.
///
/// Products the catalog does not know (or no longer sells) are simply absent
/// from the returned map.
#[async_trait]
pub trait PriceCatalog: Send + Sync {
    async fn current_prices(
        &self,
        tenant_id: &TenantId,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Decimal>, ApplicationError>;
}

/// Fixed price list, keyed by tenant.
#[derive(Clone, Debug, Default)]
pub struct StaticPriceCatalog {
    prices: HashMap<(TenantId, ProductId), Decimal>,
}

impl StaticPriceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, tenant_id: &TenantId, product_id: &str, price: Decimal) -> Self {
        self.insert(tenant_id, product_id, price);
        self
    }

    pub fn insert(&mut self, tenant_id: &TenantId, product_id: &str, price: Decimal) {
        self.prices.insert((tenant_id.clone(), ProductId(product_id.to_string())), price);
    }
}

#[async_trait]
impl PriceCatalog for StaticPriceCatalog {
    async fn current_prices(
        &self,
        tenant_id: &TenantId,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Decimal>, ApplicationError> {
        Ok(product_ids
            .iter()
            .filter_map(|product_id| {
                self.prices
                    .get(&(tenant_id.clone(), product_id.clone()))
                    .map(|price| (product_id.clone(), *price))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::product::ProductId;
    use crate::domain::quote::TenantId;

    use super::{PriceCatalog, StaticPriceCatalog};

    #[tokio::test]
    async fn static_catalog_is_tenant_scoped() {
        let tenant = TenantId("t-1".to_string());
        let other = TenantId("t-2".to_string());
        let catalog = StaticPriceCatalog::new()
            .with_price(&tenant, "P-1", Decimal::new(12000, 2))
            .with_price(&other, "P-2", Decimal::new(5000, 2));

        let prices = catalog
            .current_prices(
                &tenant,
                &[ProductId("P-1".to_string()), ProductId("P-2".to_string())],
            )
            .await
            .expect("lookup");

        assert_eq!(prices.len(), 1);
        assert_eq!(prices.get(&ProductId("P-1".to_string())), Some(&Decimal::new(12000, 2)));
    }
}
