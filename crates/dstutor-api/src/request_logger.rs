use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const CONSOLE_BODY_LIMIT: usize = 5000;

/// Safely truncate a string to a maximum number of characters
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        // Reserve space for "..." suffix
        let trunc_chars = max_chars.saturating_sub(3);
        format!("{}...", s.chars().take(trunc_chars).collect::<String>())
    }
}

/// Get or create the logs directory (~/.dstutor/logs)
pub fn get_logs_dir() -> Result<PathBuf> {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Failed to get home directory")?;

    let logs_dir = PathBuf::from(home_dir).join(".dstutor").join("logs");
    if !logs_dir.exists() {
        fs::create_dir_all(&logs_dir).context("Failed to create logs directory")?;
    }

    Ok(logs_dir)
}

/// First ten characters of the key, enough to tell keys apart
fn mask_key(api_key: &str) -> String {
    if api_key.is_empty() {
        return "(none)".to_string();
    }
    format!("{}***", api_key.chars().take(10).collect::<String>())
}

fn describe_url(url: &str) -> Vec<(&'static str, String)> {
    let mut fields = vec![("URL", url.to_string())];
    if let Ok(parsed) = reqwest::Url::parse(url) {
        fields.push(("Host", parsed.host_str().unwrap_or("unknown").to_string()));
        let port = parsed.port().map(|p| p.to_string()).unwrap_or_else(|| {
            if parsed.scheme() == "https" {
                "443 (default)".to_string()
            } else {
                "80 (default)".to_string()
            }
        });
        fields.push(("Port", port));
        fields.push(("Scheme", parsed.scheme().to_string()));
    }
    fields
}

fn print_limited(text: &str) {
    if text.chars().count() > CONSOLE_BODY_LIMIT {
        println!("{}", safe_truncate(text, CONSOLE_BODY_LIMIT));
        println!(
            "\n{}",
            format!("... (truncated, total {} bytes)", text.len()).bright_black()
        );
    } else {
        println!("{}", text);
    }
}

/// Log HTTP request details for debugging (console output)
pub fn log_request(url: &str, request: &serde_json::Value, api_key: &str, verbose: bool) {
    log::debug!("POST {}", url);
    if !verbose {
        return;
    }

    println!("\n{}", "═".repeat(80).bright_cyan());
    println!("{}", "🔍 HTTP REQUEST DEBUG".bright_cyan().bold());
    println!("{}", "═".repeat(80).bright_cyan());

    for (label, value) in describe_url(url) {
        println!("{}: {}", label.bright_yellow(), value);
    }

    println!("\n{}", "Headers:".bright_yellow());
    println!("  Content-Type: application/json");
    println!("  API key: {}", mask_key(api_key));

    println!("\n{}", "Request Body:".bright_yellow());
    match serde_json::to_string_pretty(request) {
        Ok(json) => print_limited(&json),
        Err(e) => println!("{}", format!("Error serializing request: {}", e).red()),
    }

    println!("{}", "═".repeat(80).bright_cyan());
    println!();
}

/// Log HTTP request to file for persistent debugging
pub fn log_request_to_file(url: &str, request: &serde_json::Value, model: &str, api_key: &str) -> Result<()> {
    let logs_dir = get_logs_dir()?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let filename = format!("req-{}-{}.txt", timestamp, model.replace('/', "-"));
    let file_path = logs_dir.join(&filename);

    let mut log_content = String::new();
    log_content.push_str("HTTP REQUEST LOG\n");
    log_content.push_str("================\n\n");
    log_content.push_str(&format!("Timestamp: {}\n", timestamp));
    log_content.push_str(&format!("Model: {}\n\n", model));

    for (label, value) in describe_url(url) {
        log_content.push_str(&format!("{}: {}\n", label, value));
    }

    log_content.push_str("\nHeaders:\n");
    log_content.push_str("  Content-Type: application/json\n");
    log_content.push_str(&format!("  API key: {}\n\n", mask_key(api_key)));

    log_content.push_str("Request Body:\n");
    match serde_json::to_string_pretty(request) {
        Ok(json) => {
            log_content.push_str(&json);
            log_content.push('\n');
        }
        Err(e) => log_content.push_str(&format!("Error serializing request: {}\n", e)),
    }

    fs::write(&file_path, log_content)
        .with_context(|| format!("Failed to write request log to {}", file_path.display()))?;

    println!("{}", format!("📝 Request logged to: {}", filename).bright_blue());
    Ok(())
}

/// Log HTTP response details for debugging (console output)
pub fn log_response(
    status: &reqwest::StatusCode,
    headers: &reqwest::header::HeaderMap,
    body: &str,
    verbose: bool,
) {
    log::debug!("response status {}", status.as_u16());
    if !verbose {
        return;
    }

    println!("\n{}", "═".repeat(80).bright_green());
    println!("{}", "📥 HTTP RESPONSE DEBUG".bright_green().bold());
    println!("{}", "═".repeat(80).bright_green());

    println!(
        "{}: {} {}",
        "Status".bright_yellow(),
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    );

    println!("\n{}", "Headers:".bright_yellow());
    for (name, value) in headers.iter() {
        if let Ok(val_str) = value.to_str() {
            println!("  {}: {}", name.as_str().bright_white(), val_str);
        }
    }

    println!("\n{}", "Response Body:".bright_yellow());
    // Pretty-print JSON, fall back to raw text
    let pretty = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok());
    print_limited(pretty.as_deref().unwrap_or(body));

    println!("{}", "═".repeat(80).bright_green());
    println!();
}
