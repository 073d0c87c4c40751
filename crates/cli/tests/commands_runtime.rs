use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use slideboard_cli::commands::{config, migrate, sweep};
use slideboard_core::domain::quote::{
    CustomerId, Quote, QuoteId, QuoteStatus, QuoteTree, TenantId, UserId,
};
use slideboard_db::repositories::{QuoteRepository, SqlQuoteRepository};
use slideboard_db::{connect_with_settings, migrations};

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(
        &[
            ("SLIDEBOARD_DATABASE_URL", "sqlite::memory:"),
            ("SLIDEBOARD_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 0, "expected successful migrate run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "ok");
        },
    );
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("SLIDEBOARD_DATABASE_URL", "postgres://elsewhere/db")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn sweep_expires_overdue_quotes_in_a_migrated_store() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = database_url(&dir.path().join("sweep.db"));
    seed_overdue_quotes(&url);

    with_env(&[("SLIDEBOARD_DATABASE_URL", url.as_str())], || {
        let scoped = sweep::run(Some("T-1"));
        assert_eq!(scoped.exit_code, 0, "unexpected output: {}", scoped.output);
        let payload = parse_payload(&scoped.output);
        assert_eq!(payload["command"], "sweep-expired");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["details"]["processed"], 1);
        assert_eq!(payload["details"]["expired"], 1);

        let everyone = sweep::run(None);
        let payload = parse_payload(&everyone.output);
        assert_eq!(payload["details"]["expired"], 1, "the other tenant is swept without --tenant");

        let idle = sweep::run(None);
        let payload = parse_payload(&idle.output);
        assert_eq!(payload["details"]["processed"], 0);
    });
}

#[test]
fn sweep_rejects_blank_tenant() {
    with_env(&[("SLIDEBOARD_DATABASE_URL", "sqlite::memory:")], || {
        let result = sweep::run(Some("  "));
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_argument");
    });
}

#[test]
fn sweep_reports_failure_against_unmigrated_store() {
    with_env(
        &[
            ("SLIDEBOARD_DATABASE_URL", "sqlite::memory:"),
            ("SLIDEBOARD_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = sweep::run(None);
            assert_eq!(result.exit_code, 5);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "sweep");
        },
    );
}

#[test]
fn config_attributes_values_to_their_source() {
    with_env(
        &[
            ("SLIDEBOARD_DATABASE_URL", "sqlite://from-env.db"),
            ("SLIDEBOARD_LOG_LEVEL", "debug"),
        ],
        || {
            let output = config::run();
            assert!(output.contains(
                "- database.url = sqlite://from-env.db (source: env (SLIDEBOARD_DATABASE_URL))"
            ));
            assert!(
                output.contains("- logging.level = debug (source: env (SLIDEBOARD_LOG_LEVEL))")
            );
            assert!(output.contains("- quotes.default_valid_days = 7 (source: default)"));
            assert!(output.contains("- quotes.price_change_threshold = 0.01 (source: default)"));
        },
    );
}

fn database_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

fn seed_overdue_quotes(url: &str) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    runtime.block_on(async {
        let pool = connect_with_settings(url, 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repository = SqlQuoteRepository::new(pool.clone());
        for (id, tenant) in [("Q-1", "T-1"), ("Q-2", "T-2")] {
            let tree =
                QuoteTree { quote: overdue_quote(id, tenant), rooms: vec![], items: vec![] };
            repository.insert_tree(&tree).await.expect("seed quote");
        }
        pool.close().await;
    });
}

fn overdue_quote(id: &str, tenant: &str) -> Quote {
    let now = Utc::now();
    Quote {
        id: QuoteId(id.to_string()),
        tenant_id: TenantId(tenant.to_string()),
        customer_id: CustomerId("C-1".to_string()),
        quote_no: format!("QT-{id}"),
        version: 1,
        status: QuoteStatus::PendingCustomer,
        is_active: true,
        parent_quote_id: None,
        root_quote_id: None,
        title: None,
        total_amount: Decimal::ZERO,
        discount_rate: None,
        discount_amount: Decimal::ZERO,
        final_amount: Decimal::ZERO,
        valid_until: Some(now - Duration::days(1)),
        notes: None,
        created_by: UserId("U-1".to_string()),
        created_at: now,
        updated_at: now,
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SLIDEBOARD_DATABASE_URL",
        "SLIDEBOARD_DATABASE_MAX_CONNECTIONS",
        "SLIDEBOARD_DATABASE_TIMEOUT_SECS",
        "SLIDEBOARD_LOGGING_LEVEL",
        "SLIDEBOARD_LOGGING_FORMAT",
        "SLIDEBOARD_LOG_LEVEL",
        "SLIDEBOARD_LOG_FORMAT",
        "SLIDEBOARD_QUOTES_DEFAULT_VALID_DAYS",
        "SLIDEBOARD_QUOTES_MEASURE_TOLERANCE_MM",
        "SLIDEBOARD_QUOTES_PRICE_CHANGE_THRESHOLD",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
