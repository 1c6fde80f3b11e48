//! Small shared utilities: bounded polling, JSON extraction, slugs

use std::future::Future;

use thiserror::Error;
use tokio::time::{Duration, sleep};

/// Error from a bounded poll
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Gave up after {attempts} attempts")]
    Timeout { attempts: u32 },
    #[error("Poll operation failed: {0}")]
    Failed(String),
}

/// Poll `op` every `interval` until it yields a value, up to `max_attempts`.
///
/// `op` returns `Ok(Some(value))` when done, `Ok(None)` to keep waiting, and
/// `Err` to abort the poll. Used for every asynchronous external status
/// check (media container processing, etc.).
pub async fn poll_until<T, E, F, Fut>(
    mut op: F,
    interval: Duration,
    max_attempts: u32,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: std::fmt::Display,
{
    for attempt in 1..=max_attempts {
        match op().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                tracing::debug!(attempt = attempt, max = max_attempts, "Still pending");
            }
            Err(e) => return Err(PollError::Failed(e.to_string())),
        }

        if attempt < max_attempts {
            sleep(interval).await;
        }
    }

    Err(PollError::Timeout {
        attempts: max_attempts,
    })
}

/// Extract JSON from a model response (handles markdown code blocks)
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    // Check for ```json ... ``` blocks
    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return trimmed[start + 7..start + 7 + end].trim();
        }
    }

    // Check for ``` ... ``` blocks
    if let Some(start) = trimmed.find("```") {
        if let Some(end) = trimmed[start + 3..].find("```") {
            let content = trimmed[start + 3..start + 3 + end].trim();
            // Skip language identifier if present
            if let Some(newline) = content.find('\n') {
                let first_line = &content[..newline];
                if !first_line.starts_with('{') {
                    return content[newline + 1..].trim();
                }
            }
            return content;
        }
    }

    // Assume raw JSON
    trimmed
}

/// Derive a URL slug from a title: lowercase ASCII words joined by hyphens
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_returns_when_ready() {
        let calls = AtomicU32::new(0);
        let result = poll_until(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= 3 {
                    Ok::<_, std::convert::Infallible>(Some(n))
                } else {
                    Ok(None)
                }
            },
            Duration::from_secs(10),
            30,
        )
        .await
        .unwrap();

        assert_eq!(result, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_times_out() {
        let result: Result<(), _> = poll_until(
            || async { Ok::<_, std::convert::Infallible>(None) },
            Duration::from_secs(10),
            5,
        )
        .await;

        assert!(matches!(result, Err(PollError::Timeout { attempts: 5 })));
    }

    #[tokio::test]
    async fn test_poll_until_propagates_failure() {
        let result: Result<(), _> = poll_until(
            || async { Err::<Option<()>, _>("boom") },
            Duration::from_millis(1),
            5,
        )
        .await;

        assert!(matches!(result, Err(PollError::Failed(msg)) if msg == "boom"));
    }

    #[test]
    fn test_extract_json_raw() {
        let input = r#"{"approved": true}"#;
        assert_eq!(extract_json(input), input);
    }

    #[test]
    fn test_extract_json_code_block() {
        let input = "```json\n{\"approved\": true}\n```";
        assert_eq!(extract_json(input), r#"{"approved": true}"#);
    }

    #[test]
    fn test_extract_json_bare_fence_with_language() {
        let input = "```JSON\n{\"a\": 1}\n```";
        assert_eq!(extract_json(input), r#"{"a": 1}"#);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Multiple   spaces "), "multiple-spaces");
        assert_eq!(slugify("Ønsket økning"), "nsket-kning");
        assert_eq!(slugify("!!!"), "untitled");
    }
}
