//! Doctor command - validate configuration and show status

use anyhow::Result;
use newsflow_adapters::state::SqliteStore;
use serde::Serialize;
use std::path::PathBuf;

use crate::config::AppConfig;

use crate::args::DoctorArgs;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    openai: CheckResult,
    state: CheckResult,
    sources: CheckResult,
    moderation: CheckResult,
    social: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        openai: CheckResult::error("Not checked"),
        state: CheckResult::error("Not checked"),
        sources: CheckResult::error("Not checked"),
        moderation: CheckResult::error("Not checked"),
        social: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.openai = check_openai(config);
        report.state = check_state(config).await;
        report.sources = check_sources(config);
        report.moderation = check_moderation(config);
        report.social = check_social(config);
    }

    let checks = [&report.config, &report.openai, &report.state];
    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = [
        &report.config,
        &report.openai,
        &report.state,
        &report.sources,
        &report.moderation,
        &report.social,
    ]
    .iter()
    .all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, args.check.as_deref());
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

fn check_env(env_var: &str, what: &str) -> CheckResult {
    match std::env::var(env_var) {
        Ok(value) if !value.is_empty() => {
            CheckResult::ok(format!("{}: {} (set)", what, env_var))
        }
        _ => CheckResult::warn(format!("{}: {} (not set)", what, env_var)),
    }
}

fn check_openai(config: &AppConfig) -> CheckResult {
    if config.openai.provider == "stub" {
        return CheckResult::ok("Stub AI provider (offline, no API key needed)");
    }

    if config.openai.api_key_env.is_empty() {
        return CheckResult::error("No OpenAI API key env var configured");
    }

    let key = check_env(&config.openai.api_key_env, "API key");
    if key.is_ok() {
        CheckResult::ok(format!(
            "Model: {}, Vision: {}, Image: {}, API key: {} (set)",
            config.openai.model,
            config.openai.vision_model,
            config.openai.image_model,
            config.openai.api_key_env
        ))
    } else {
        key
    }
}

async fn check_state(config: &AppConfig) -> CheckResult {
    match SqliteStore::new(&config.general.state_db_path).await {
        Ok(_) => CheckResult::ok(format!(
            "State database: {}",
            config.general.state_db_path.display()
        )),
        Err(e) => CheckResult::error(format!("Failed to open state database: {}", e)),
    }
}

fn check_sources(config: &AppConfig) -> CheckResult {
    let rss = config.sources.rss_feeds.len();
    let telegram = config.sources.telegram_channels.len();

    if rss + telegram == 0 {
        return CheckResult::warn("No ingestion sources configured");
    }

    CheckResult::ok(format!(
        "{} RSS feeds, {} Telegram channels",
        rss, telegram
    ))
}

fn check_moderation(config: &AppConfig) -> CheckResult {
    if !config.moderation.enabled {
        return CheckResult::ok("Moderation channel disabled");
    }

    if config.moderation.chat_id.is_empty() {
        return CheckResult::error("Moderation enabled but chat_id is not configured");
    }

    check_env(&config.moderation.bot_token_env, "Bot token")
}

fn check_social(config: &AppConfig) -> CheckResult {
    let mut enabled = Vec::new();
    let mut missing = Vec::new();

    let platforms: [(&str, bool, &str); 4] = [
        (
            "instagram",
            config.social.instagram.enabled,
            &config.social.instagram.access_token_env,
        ),
        (
            "facebook",
            config.social.facebook.enabled,
            &config.social.facebook.access_token_env,
        ),
        (
            "linkedin",
            config.social.linkedin.enabled,
            &config.social.linkedin.access_token_env,
        ),
        (
            "tiktok",
            config.social.tiktok.enabled,
            &config.social.tiktok.access_token_env,
        ),
    ];

    for (name, is_enabled, token_env) in platforms {
        if !is_enabled {
            continue;
        }
        enabled.push(name);
        if std::env::var(token_env).map(|v| v.is_empty()).unwrap_or(true) {
            missing.push(format!("{} ({})", name, token_env));
        }
    }

    if enabled.is_empty() {
        return CheckResult::warn("No social platforms enabled");
    }

    if !missing.is_empty() {
        return CheckResult::warn(format!("Tokens not set: {}", missing.join(", ")));
    }

    CheckResult::ok(format!("Enabled: {}", enabled.join(", ")))
}

fn print_report(report: &DoctorReport, only: Option<&str>) {
    println!("newsflow Doctor Report");
    println!("======================");
    println!();

    let checks = [
        ("config", "Config", &report.config),
        ("openai", "OpenAI", &report.openai),
        ("state", "State", &report.state),
        ("sources", "Sources", &report.sources),
        ("moderation", "Moderation", &report.moderation),
        ("social", "Social", &report.social),
    ];

    for (key, name, result) in checks {
        if only.is_none_or(|o| o == key) {
            print_check(name, result);
        }
    }

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: newsflow run --dry-run --once");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
