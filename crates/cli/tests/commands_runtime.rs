use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use orgroute_cli::commands::{chain, config, doctor, migrate, resolve, seed, step};
use orgroute_core::config::LoadOptions;
use serde_json::Value;

#[test]
fn migrate_applies_schema_then_reports_up_to_date() {
    with_database(|options| {
        let first = migrate::run(options);
        assert_eq!(first.exit_code, 0, "expected successful migrate run: {}", first.output);
        let payload = parse_payload(&first.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["applied_versions"], serde_json::json!([1, 2, 3]));

        let second = parse_payload(&migrate::run(options).output);
        assert_eq!(second["data"]["applied_versions"], serde_json::json!([]));
        assert_eq!(second["message"], "schema already up to date");
    });
}

#[test]
fn invalid_resolver_config_fails_with_config_exit_code() {
    with_env(&[("ORGROUTE_RESOLVER_CACHE_TTL_SECS", "7200")], || {
        let result = migrate::run(&LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_and_lists_expected_routes() {
    with_database(|options| {
        let first = seed::run(options);
        assert_eq!(first.exit_code, 0, "expected first seed success: {}", first.output);
        let second = seed::run(options);
        assert_eq!(second.exit_code, 0, "expected second seed success: {}", second.output);

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["message"], second_payload["message"]);

        let message = first_payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("employee 1 -> user 103 via ancestor_chain"));
        assert!(message.contains("employee 5 -> user 106 via same_unit"));
    });
}

#[test]
fn resolve_routes_seeded_requesters() {
    with_database(|options| {
        assert_eq!(seed::run(options).exit_code, 0);

        let result = resolve::run(options, 1, None);
        assert_eq!(result.exit_code, 0, "expected resolve success: {}", result.output);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["approver_user_id"], 103);

        let president = parse_payload(&resolve::run(options, 7, None).output);
        assert_eq!(president["status"], "ok");
        assert!(president["data"]["approver_user_id"].is_null());

        // nobody at 90+ in the program or college, so the president is next
        let above_dean = parse_payload(&resolve::run(options, 1, Some(90)).output);
        assert_eq!(above_dean["data"]["approver_user_id"], 107);
    });
}

#[test]
fn resolve_rejects_out_of_scale_levels() {
    with_database(|options| {
        let result = resolve::run(options, 1, Some(101));
        assert_eq!(result.exit_code, 7);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
        assert!(payload["correlation_id"].is_string());
    });
}

#[test]
fn chain_lists_approvers_lowest_level_first() {
    with_database(|options| {
        assert_eq!(seed::run(options).exit_code, 0);

        let result = chain::run(options, 1);
        assert_eq!(result.exit_code, 0, "expected chain success: {}", result.output);
        let payload = parse_payload(&result.output);
        let users: Vec<i64> = payload["data"]["chain"]
            .as_array()
            .map(|entries| entries.iter().filter_map(|entry| entry["user_id"].as_i64()).collect())
            .unwrap_or_default();
        assert_eq!(users, vec![104, 103, 111, 107]);
    });
}

#[test]
fn step_expands_slots_and_keeps_unresolved_entries() {
    with_database(|options| {
        assert_eq!(seed::run(options).exit_code, 0);

        let slots = r#"[{"type":"role","value":7},{"type":"role","value":404}]"#;
        let result = step::run(options, 1, slots, Vec::new(), Vec::new());
        assert_eq!(result.exit_code, 0, "expected step success: {}", result.output);

        let payload = parse_payload(&result.output);
        let approvers = payload["data"]["approvers"].as_array().cloned().unwrap_or_default();
        assert_eq!(approvers.len(), 3);
        assert_eq!(approvers[0]["user_id"], 103);
        assert_eq!(approvers[0]["escalation"], "self_approval");
        assert_eq!(approvers[1]["user_id"], 102);
        assert_eq!(approvers[2]["diagnostic"], "unknown_role");
    });
}

#[test]
fn step_rejects_malformed_slot_json() {
    with_database(|options| {
        let result = step::run(options, 1, "[{\"type\":", Vec::new(), Vec::new());
        assert_eq!(result.exit_code, 7);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
    });
}

#[test]
fn doctor_flags_unmigrated_database_then_passes_after_seed() {
    with_database(|options| {
        let before = doctor::run(options, true);
        assert_eq!(before.exit_code, 6);
        let report = parse_payload(&before.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(check_status(&report, "migrations_current"), "fail");
        assert_eq!(check_status(&report, "org_data"), "skipped");

        assert_eq!(seed::run(options).exit_code, 0);
        let after = doctor::run(options, true);
        assert_eq!(after.exit_code, 0, "expected doctor pass: {}", after.output);
        assert_eq!(parse_payload(&after.output)["overall_status"], "pass");

        let human = doctor::run(options, false);
        assert!(human.output.starts_with("doctor: all readiness checks passed"));
    });
}

#[test]
fn config_attributes_env_sources() {
    with_env(&[("ORGROUTE_RESOLVER_CACHE_TTL_SECS", "60")], || {
        let output = config::run(&LoadOptions::default());
        let ttl_line =
            "- resolver.cache_ttl_secs = 60 (source: env (ORGROUTE_RESOLVER_CACHE_TTL_SECS))";
        assert!(output.contains(ttl_line), "{output}");
        assert!(output.contains("- resolver.cache_enabled = true (source: default)"));
    });
}

fn check_status<'a>(report: &'a Value, name: &str) -> &'a str {
    report["checks"]
        .as_array()
        .and_then(|checks| checks.iter().find(|check| check["name"] == name))
        .and_then(|check| check["status"].as_str())
        .unwrap_or_default()
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn database_url(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

fn with_database(test_fn: impl FnOnce(&LoadOptions)) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(&dir.path().join("orgroute.db"));
    with_env(&[("ORGROUTE_DATABASE_URL", url.as_str())], || test_fn(&LoadOptions::default()));
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "ORGROUTE_DATABASE_URL",
        "ORGROUTE_DATABASE_MAX_CONNECTIONS",
        "ORGROUTE_DATABASE_TIMEOUT_SECS",
        "ORGROUTE_RESOLVER_CACHE_ENABLED",
        "ORGROUTE_RESOLVER_CACHE_TTL_SECS",
        "ORGROUTE_RESOLVER_MAX_HIERARCHY_DEPTH",
        "ORGROUTE_LOGGING_LEVEL",
        "ORGROUTE_LOGGING_FORMAT",
        "ORGROUTE_LOG_LEVEL",
        "ORGROUTE_LOG_FORMAT",
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
