use crate::config::Tone;
use crate::error::Result;
use crate::subtitle::reassemble::split_blocks;
use crate::subtitle::{merge, read_document, replace, split_into_chunks, DEFAULT_CHUNK_SIZE};
use crate::translate::cache::Lookup;
use crate::translate::{TranslationCache, TranslationClient};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Number of chunks processed in test mode.
pub const TEST_MODE_CHUNKS: usize = 3;

/// Everything a translation run needs, built once and shared by every stage.
pub struct PipelineContext {
    /// Translates individual chunks.
    pub client: TranslationClient,
    /// Tone forwarded to every translation request.
    pub tone: Tone,
    /// Chunk budget in characters.
    pub chunk_size: usize,
    /// Only process the first few chunks.
    pub test_mode: bool,
    /// Show a progress bar.
    pub show_progress: bool,
}

impl PipelineContext {
    pub fn new(client: TranslationClient) -> Self {
        Self {
            client,
            tone: Tone::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            test_mode: false,
            show_progress: true,
        }
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}

/// Files written next to the input document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Translation only.
    pub translated: PathBuf,
    /// Original and translation together.
    pub bilingual: PathBuf,
    /// Resume cache, removed after a successful run.
    pub cache: PathBuf,
}

impl OutputPaths {
    pub fn for_input(input: &Path) -> Self {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        Self {
            translated: input.with_file_name(format!("{}_translated.srt", stem)),
            bilingual: input.with_file_name(format!("{}_translated_bilingual.srt", stem)),
            cache: input.with_file_name(format!("{}_process.json", stem)),
        }
    }
}

/// Statistics from a translation run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Chunks processed in this run.
    pub chunks: usize,
    /// Chunks served from the resume cache.
    pub cache_hits: usize,
    /// Chunks translated by the model in this run.
    pub translated: usize,
    /// Chunks left in the original language after exhausting retries.
    pub fallbacks: usize,
    /// Caption blocks in the translated output.
    pub blocks_written: usize,
    /// Total time taken.
    pub total_time: Duration,
}

/// Result of a translation run.
#[derive(Debug)]
pub struct PipelineResult {
    pub paths: OutputPaths,
    pub stats: PipelineStats,
}

/// Translate chunks in order, consulting and updating the cache, and return
/// the concatenated translation.
pub async fn translate_chunks(
    ctx: &PipelineContext,
    chunks: &[String],
    cache: &mut TranslationCache,
    stats: &mut PipelineStats,
) -> Result<String> {
    let progress_bar = if ctx.show_progress {
        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut translated = String::new();

    for (index, chunk) in chunks.iter().enumerate() {
        let lookup = cache.get_or_translate(chunk, ctx.tone, &ctx.client).await?;

        stats.chunks += 1;
        match &lookup {
            Lookup::Cached(_) => {
                debug!("Chunk {} served from cache", index);
                stats.cache_hits += 1;
            }
            Lookup::Fresh(outcome) if outcome.is_fallback() => stats.fallbacks += 1,
            Lookup::Fresh(_) => stats.translated += 1,
        }

        translated.push_str(lookup.text());
        translated.push_str("\n\n");

        if let Some(ref pb) = progress_bar {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Translation complete");
    }

    Ok(translated)
}

/// Translate an SRT file and write the translated and bilingual documents
/// next to it.
///
/// The resume cache is loaded from, and saved to, `<basename>_process.json`
/// and deleted once both outputs have been written.
pub async fn translate_file(ctx: &PipelineContext, input: &Path) -> Result<PipelineResult> {
    let start_time = Instant::now();
    let paths = OutputPaths::for_input(input);

    let text = read_document(input)?;
    let mut chunks = split_into_chunks(&text, ctx.chunk_size);
    if ctx.test_mode {
        chunks.truncate(TEST_MODE_CHUNKS);
    }

    info!(
        "Translating {} chunks of {:?} into {} ({} tone)",
        chunks.len(),
        input,
        ctx.client.target_language(),
        ctx.tone
    );

    let mut cache = TranslationCache::load(&paths.cache)?;
    let mut stats = PipelineStats::default();
    let translated = translate_chunks(ctx, &chunks, &mut cache, &mut stats).await?;

    // Chunks concatenate back to the document, so this is the whole text
    // outside test mode.
    let original = chunks.concat();

    let translated_only = replace(&original, &translated);
    fs::write(&paths.translated, &translated_only)?;
    info!("Wrote {:?}", paths.translated);

    let bilingual = merge(&original, &translated);
    fs::write(&paths.bilingual, &bilingual)?;
    info!("Wrote {:?}", paths.bilingual);

    cache.remove()?;

    stats.blocks_written = split_blocks(&translated_only).len();
    stats.total_time = start_time.elapsed();

    Ok(PipelineResult { paths, stats })
}

/// Print a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                     Subtitle Translation Complete              ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Translated: {}", result.paths.translated.display());
    println!("  Bilingual:  {}", result.paths.bilingual.display());
    println!("  Captions:   {}", result.stats.blocks_written);
    println!();
    println!("  Chunks:     {}", result.stats.chunks);
    println!("    Translated:  {}", result.stats.translated);
    println!("    From cache:  {}", result.stats.cache_hits);
    println!("    Untranslated: {}", result.stats.fallbacks);
    println!(
        "  Total:      {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    if result.stats.fallbacks > 0 {
        println!();
        println!(
            "  Note: {} chunk(s) kept their original text after repeated failures",
            result.stats.fallbacks
        );
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
