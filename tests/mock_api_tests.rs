//! Mock API tests for the translation pipeline
//!
//! A scripted completion backend stands in for the model, and the OpenAI
//! client is checked against a local mock server.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use subtrans::config::Tone;
use subtrans::error::{Result, SubtransError};
use subtrans::pipeline::{translate_chunks, PipelineStats};
use subtrans::subtitle::split_into_chunks;
use subtrans::translate::cache::Lookup;
use subtrans::translate::{
    Completion, OpenAiClient, RetryReason, TranslationCache, TranslationClient,
    TranslationOutcome,
};
use subtrans::{translate_file, OutputPaths, PipelineContext};

/// Translates caption text lines by prefixing them, leaving indices and
/// timecodes alone. Counts calls.
struct PrefixCompletion {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Completion for PrefixCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (_, chunk) = prompt
            .split_once(": \n")
            .ok_or_else(|| SubtransError::Api("unexpected prompt".to_string()))?;
        Ok(fake_translate(chunk))
    }

    fn name(&self) -> &'static str {
        "prefix"
    }
}

/// Always fails like a rate-limited provider.
struct FailingCompletion {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Completion for FailingCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SubtransError::Api("429 Too Many Requests".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

fn fake_translate(chunk: &str) -> String {
    chunk
        .split('\n')
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty()
                || trimmed.chars().all(|c| c.is_ascii_digit())
                || trimmed.contains("-->")
            {
                line.to_string()
            } else {
                format!("FR {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn sample_document(blocks: usize) -> String {
    (1..=blocks)
        .map(|i| {
            format!(
                "{}\n00:00:{:02},000 --> 00:00:{:02},900\nLine {}\n",
                i,
                i % 60,
                i % 60,
                i
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn counting_client() -> (TranslationClient, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let client = TranslationClient::new(
        Box::new(PrefixCompletion {
            calls: calls.clone(),
        }),
        "French",
    )
    .with_retry_delay(Duration::ZERO);
    (client, calls)
}

fn failing_client() -> (TranslationClient, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let client = TranslationClient::new(
        Box::new(FailingCompletion {
            calls: calls.clone(),
        }),
        "French",
    )
    .with_retry_delay(Duration::ZERO);
    (client, calls)
}

fn write_input(dir: &Path, blocks: usize) -> (std::path::PathBuf, String) {
    let input = dir.join("movie.srt");
    let doc = sample_document(blocks);
    std::fs::write(&input, &doc).unwrap();
    (input, doc)
}

// ============================================================================
// Translation Client Tests
// ============================================================================

mod client_tests {
    use super::*;

    #[tokio::test]
    async fn test_valid_translation() {
        let (client, calls) = counting_client();
        let chunk = "1\n00:00:01,000 --> 00:00:02,000\nHello\n";

        let outcome = client.translate(chunk, Tone::Informal).await;
        assert_eq!(
            outcome,
            TranslationOutcome::Translated("1\n00:00:01,000 --> 00:00:02,000\nFR Hello\n".to_string())
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_original() {
        let (client, calls) = failing_client();
        let chunk = "1\n00:00:01,000 --> 00:00:02,000\nHello\n";

        let outcome = client.translate(chunk, Tone::Formal).await;
        assert!(outcome.is_fallback());
        assert!(matches!(
            outcome,
            TranslationOutcome::FallbackToOriginal {
                reason: RetryReason::RequestFailed(_),
                ..
            }
        ));
        assert_eq!(outcome.text(), chunk);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_custom_retry_budget() {
        let (client, calls) = failing_client();
        let client = client.with_max_retries(5);

        let outcome = client.translate("1\nt\nHi", Tone::Informal).await;
        assert_eq!(outcome.into_text(), "1\nt\nHi");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }
}

// ============================================================================
// Translation Cache Tests
// ============================================================================

mod cache_tests {
    use super::*;

    #[tokio::test]
    async fn test_cached_chunk_skips_client() {
        let dir = tempfile::tempdir().unwrap();
        let key = "1\n00:00:01,000 --> 00:00:02,000\nHello\n";

        let mut cache = TranslationCache::load(dir.path().join("movie_process.json")).unwrap();
        cache.insert(key, "1\n00:00:01,000 --> 00:00:02,000\nBonjour\n").unwrap();

        let (client, calls) = counting_client();
        let lookup = cache.get_or_translate(key, Tone::Informal, &client).await.unwrap();

        assert_eq!(
            lookup,
            Lookup::Cached("1\n00:00:01,000 --> 00:00:02,000\nBonjour\n".to_string())
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fresh_translation_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie_process.json");
        let key = "1\nt1\nHello\n";

        let mut cache = TranslationCache::load(&path).unwrap();
        let (client, calls) = counting_client();
        let lookup = cache.get_or_translate(key, Tone::Informal, &client).await.unwrap();
        assert!(matches!(lookup, Lookup::Fresh(TranslationOutcome::Translated(_))));

        // Second lookup is a hit.
        let again = cache.get_or_translate(key, Tone::Informal, &client).await.unwrap();
        assert_eq!(again.text(), "1\nt1\nFR Hello\n");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let reloaded = TranslationCache::load(&path).unwrap();
        assert_eq!(reloaded.get(key), Some("1\nt1\nFR Hello\n"));
    }

    #[tokio::test]
    async fn test_fallback_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie_process.json");

        let mut cache = TranslationCache::load(&path).unwrap();
        let (client, _) = failing_client();
        let lookup = cache.get_or_translate("1\nt\nHi", Tone::Informal, &client).await.unwrap();

        assert!(matches!(lookup, Lookup::Fresh(ref o) if o.is_fallback()));
        assert_eq!(cache.get("1\nt\nHi"), Some("1\nt\nHi"));
    }

    #[tokio::test]
    async fn test_cache_written_after_every_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie_process.json");
        let doc = sample_document(30);
        let chunks = split_into_chunks(&doc, 150);
        assert!(chunks.len() > 3);

        let (client, _) = counting_client();
        let ctx = PipelineContext::new(client).with_progress(false);
        let mut cache = TranslationCache::load(&path).unwrap();
        let mut stats = PipelineStats::default();

        translate_chunks(&ctx, &chunks[..2], &mut cache, &mut stats).await.unwrap();

        let on_disk = TranslationCache::load(&path).unwrap();
        assert_eq!(on_disk.len(), 2);
        assert!(on_disk.get(&chunks[0]).is_some());
        assert!(on_disk.get(&chunks[2]).is_none());
    }
}

// ============================================================================
// Pipeline Tests
// ============================================================================

mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let (input, _) = write_input(dir.path(), 25);

        let (client, calls) = counting_client();
        let ctx = PipelineContext::new(client)
            .with_chunk_size(200)
            .with_progress(false);

        let result = translate_file(&ctx, &input).await.unwrap();
        let paths = OutputPaths::for_input(&input);
        assert_eq!(result.paths, paths);

        let translated = std::fs::read_to_string(&paths.translated).unwrap();
        assert!(translated.starts_with("1\n00:00:01,000 --> 00:00:01,900\nFR Line 1\n\n2\n"));
        assert!(translated.ends_with("25\n00:00:25,000 --> 00:00:25,900\nFR Line 25"));

        let bilingual = std::fs::read_to_string(&paths.bilingual).unwrap();
        assert!(bilingual.starts_with("1\n00:00:01,000 --> 00:00:01,900\nLine 1\nFR Line 1\n\n2\n"));

        assert!(!paths.cache.exists());
        assert_eq!(result.stats.blocks_written, 25);
        assert_eq!(result.stats.translated, result.stats.chunks);
        assert_eq!(calls.load(Ordering::SeqCst), result.stats.chunks);
    }

    #[tokio::test]
    async fn test_resume_from_complete_cache_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let (input, doc) = write_input(dir.path(), 25);
        let paths = OutputPaths::for_input(&input);

        let mut cache = TranslationCache::load(&paths.cache).unwrap();
        for chunk in split_into_chunks(&doc, 200) {
            cache.insert(chunk.clone(), fake_translate(&chunk)).unwrap();
        }

        let (client, calls) = counting_client();
        let ctx = PipelineContext::new(client)
            .with_chunk_size(200)
            .with_progress(false);

        let result = translate_file(&ctx, &input).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.stats.cache_hits, result.stats.chunks);

        let translated = std::fs::read_to_string(&paths.translated).unwrap();
        assert!(translated.contains("25\n00:00:25,000 --> 00:00:25,900\nFR Line 25"));
        assert!(!paths.cache.exists());
    }

    #[tokio::test]
    async fn test_test_mode_limits_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let (input, doc) = write_input(dir.path(), 40);
        let chunks = split_into_chunks(&doc, 150);
        assert!(chunks.len() > 3);

        let (client, calls) = counting_client();
        let ctx = PipelineContext::new(client)
            .with_chunk_size(150)
            .with_test_mode(true)
            .with_progress(false);

        let result = translate_file(&ctx, &input).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.stats.chunks, 3);
        let expected_blocks = chunks[..3]
            .iter()
            .map(|c| subtrans::subtitle::index_lines(c).len())
            .sum::<usize>();
        assert_eq!(result.stats.blocks_written, expected_blocks);
    }

    #[tokio::test]
    async fn test_failures_degrade_to_original_text() {
        let dir = tempfile::tempdir().unwrap();
        let (input, doc) = write_input(dir.path(), 3);

        let (client, _) = failing_client();
        let ctx = PipelineContext::new(client).with_progress(false);

        let result = translate_file(&ctx, &input).await.unwrap();
        assert_eq!(result.stats.fallbacks, 1);

        let translated = std::fs::read_to_string(&result.paths.translated).unwrap();
        assert_eq!(translated, doc.trim());
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.txt");
        std::fs::write(&input, sample_document(2)).unwrap();

        let (client, calls) = counting_client();
        let ctx = PipelineContext::new(client).with_progress(false);

        let result = translate_file(&ctx, &input).await;
        assert!(matches!(result, Err(SubtransError::UnsupportedFormat(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!OutputPaths::for_input(&input).translated.exists());
    }
}

// ============================================================================
// OpenAI Client Tests
// ============================================================================

mod openai_tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_chat_completion_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .body_contains("gpt-4o-mini")
                    .body_contains("Hello");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "choices": [
                            {"message": {"role": "assistant", "content": "1\nt\nBonjour"}}
                        ]
                    }));
            })
            .await;

        let client = OpenAiClient::new("test-key".to_string())
            .with_model("gpt-4o-mini")
            .with_base_url(server.url("/v1"));

        let response = client.complete("Translate: \n1\nt\nHello").await.unwrap();
        assert_eq!(response, "1\nt\nBonjour");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let client = OpenAiClient::new("test-key".to_string()).with_base_url(server.url("/v1"));

        let result = client.complete("Hello").await;
        assert!(matches!(result, Err(SubtransError::Api(ref msg)) if msg.contains("429")));
    }

    #[tokio::test]
    async fn test_missing_content() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({"choices": []}));
            })
            .await;

        let client = OpenAiClient::new("test-key".to_string()).with_base_url(server.url("/v1"));

        assert!(client.complete("Hello").await.is_err());
    }
}
