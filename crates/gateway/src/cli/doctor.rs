use chrono::Utc;
use sml_domain::config::{Config, ConfigSeverity};
use sml_providers::resolve_api_key;
use sml_usage::{create_store, StoreCredentials};

/// Run all diagnostic checks and print a summary.
///
/// Returns `Ok(true)` when every check passes, `Ok(false)` when at least
/// one check failed.
pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("sml-assistant doctor");
    println!("====================\n");

    let mut all_passed = true;

    check_config_file(config_path);
    check_config_validation(config, &mut all_passed);
    check_upstream_key(config, &mut all_passed);
    check_upstream_reachable(config, &mut all_passed).await;
    check_usage_store(config, &mut all_passed).await;

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    Ok(all_passed)
}

// ── Individual checks ─────────────────────────────────────────────────

fn check_config_file(config_path: &str) {
    let exists = std::path::Path::new(config_path).exists();
    let detail = if exists {
        config_path.to_owned()
    } else {
        format!("{config_path} not found (using defaults)")
    };
    // Running on defaults is a supported setup.
    print_check("Config file", true, detail);
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
        return;
    }

    print_check(
        "Config validation",
        error_count == 0,
        format!("{} issue(s) ({error_count} error(s))", issues.len()),
    );
    for issue in &issues {
        println!("      {issue}");
    }
    if error_count > 0 {
        *all_passed = false;
    }
}

fn check_upstream_key(config: &Config, all_passed: &mut bool) {
    let env = &config.upstream.api_key_env;
    let ok = resolve_api_key(env).is_ok();
    print_check(
        "Upstream API key",
        ok,
        if ok {
            format!("${env} is set")
        } else {
            format!("${env} is not set; /v1/ask will answer 500")
        },
    );
    if !ok {
        *all_passed = false;
    }
}

async fn check_upstream_reachable(config: &Config, all_passed: &mut bool) {
    let url = &config.upstream.base_url;
    // Any HTTP answer, even 401 or 404, proves the host is reachable.
    let reachable = match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
    {
        Ok(client) => client.get(url).send().await.is_ok(),
        Err(_) => false,
    };

    print_check(
        "Upstream reachable",
        reachable,
        if reachable {
            url.clone()
        } else {
            format!("{url} (unreachable)")
        },
    );
    if !reachable {
        *all_passed = false;
    }
}

async fn check_usage_store(config: &Config, all_passed: &mut bool) {
    let store_cfg = &config.store;
    if StoreCredentials::from_env(store_cfg).is_none() {
        print_check(
            "Usage store",
            false,
            format!(
                "${} or ${} not set; per-caller rate limiting disabled",
                store_cfg.url_env, store_cfg.service_key_env
            ),
        );
        *all_passed = false;
        return;
    }

    let result = match create_store(store_cfg) {
        Ok(Some(store)) => store
            .count_since("sml-doctor-probe", Utc::now())
            .await
            .map_err(|e| e.to_string()),
        Ok(None) => Err("not configured".to_owned()),
        Err(e) => Err(e.to_string()),
    };

    match result {
        Ok(_) => print_check("Usage store", true, format!("table '{}' readable", store_cfg.table)),
        Err(e) => {
            print_check("Usage store", false, format!("table '{}': {e}", store_cfg.table));
            *all_passed = false;
        }
    }
}

// ── Formatting helper ─────────────────────────────────────────────────

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
