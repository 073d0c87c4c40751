use tracing::warn;

use crate::commands::CommandResult;
use slideboard_core::config::{AppConfig, LoadOptions};
use slideboard_core::domain::quote::TenantId;
use slideboard_db::{connect_from_config, QuoteEngine};

/// Runs `expire_all_overdue_quotes` once, for `tenant` or across all tenants.
/// Meant to be driven by an external scheduler (cron, systemd timer).
pub fn run(tenant: Option<&str>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "sweep-expired",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let tenant = match tenant.map(str::trim) {
        Some("") => {
            return CommandResult::failure(
                "sweep-expired",
                "invalid_argument",
                "--tenant must not be blank",
                2,
            );
        }
        other => other.map(|id| TenantId(id.to_string())),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "sweep-expired",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let engine = QuoteEngine::new(pool.clone(), config.quote_engine_settings());
        let report = engine.expire_all_overdue_quotes(tenant.as_ref()).await;
        pool.close().await;
        report.map_err(|error| {
            let error_class = if error.is_retryable() { "contention" } else { "sweep" };
            warn!(
                event_name = "quote.expiration.sweep_failed",
                retryable = error.is_retryable(),
                error = %error,
                "expiration sweep failed"
            );
            (error_class, error.to_string(), 5u8)
        })
    });

    match result {
        Ok(report) => CommandResult::success_with_details(
            "sweep-expired",
            format!("expired {} of {} overdue quotes", report.expired, report.processed),
            serde_json::to_value(report).ok(),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("sweep-expired", error_class, message, exit_code)
        }
    }
}
