use std::env;
use std::path::{Path, PathBuf};

use deskhub_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source_for("DESKHUB_DATABASE_URL", config_file_path.as_deref()),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source_for("DESKHUB_DATABASE_MAX_CONNECTIONS", config_file_path.as_deref()),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source_for("DESKHUB_DATABASE_TIMEOUT_SECS", config_file_path.as_deref()),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source_for("DESKHUB_SERVER_BIND_ADDRESS", config_file_path.as_deref()),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        source_for("DESKHUB_SERVER_PORT", config_file_path.as_deref()),
    ));

    lines.push(render_line(
        "email.enabled",
        &config.email.enabled.to_string(),
        source_for("DESKHUB_EMAIL_ENABLED", config_file_path.as_deref()),
    ));
    lines.push(render_line(
        "email.smtp_server",
        config.email.smtp_server.as_deref().unwrap_or("(unset)"),
        source_for("DESKHUB_EMAIL_SMTP_SERVER", config_file_path.as_deref()),
    ));
    let password = config
        .email
        .password
        .as_ref()
        .map(|secret| redact(secret.expose_secret()))
        .unwrap_or_else(|| "(unset)".to_string());
    lines.push(render_line(
        "email.password",
        &password,
        source_for("DESKHUB_EMAIL_PASSWORD", config_file_path.as_deref()),
    ));

    lines.push(render_line(
        "uploads.directory",
        &config.uploads.directory,
        source_for("DESKHUB_UPLOADS_DIRECTORY", config_file_path.as_deref()),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source_for("DESKHUB_LOGGING_LEVEL", config_file_path.as_deref()),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format).to_lowercase(),
        source_for("DESKHUB_LOGGING_FORMAT", config_file_path.as_deref()),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("deskhub.toml"), PathBuf::from("config/deskhub.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn source_for(env_var: &str, config_file: Option<&Path>) -> String {
    if env::var(env_var).map(|value| !value.trim().is_empty()).unwrap_or(false) {
        return format!("env:{env_var}");
    }
    match config_file {
        Some(path) => format!("file:{}", path.display()),
        None => "default".to_string(),
    }
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("  {key} = {value}  ({source})")
}

fn redact(raw: &str) -> String {
    if raw.is_empty() {
        return "(unset)".to_string();
    }
    let visible: String = raw.chars().take(2).collect();
    format!("{visible}…(redacted)")
}

#[cfg(test)]
mod tests {
    use super::{redact, run};

    #[test]
    fn redact_hides_all_but_a_short_prefix() {
        assert_eq!(redact("supersecret"), "su…(redacted)");
        assert_eq!(redact(""), "(unset)");
    }

    #[test]
    fn config_output_never_prints_a_raw_password() {
        std::env::set_var("DESKHUB_EMAIL_PASSWORD", "hunter2-secret");
        let output = run();
        std::env::remove_var("DESKHUB_EMAIL_PASSWORD");

        assert!(output.contains("database.url"));
        assert!(!output.contains("hunter2-secret"));
    }
}
