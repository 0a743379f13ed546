/*!
 * Integration tests for the deck translation pipeline
 */

use anyhow::Result;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use slideshift::app_config::{FailurePolicy, OutputNaming};
use slideshift::deck::{DeckExtractor, ElementId, Position};
use slideshift::errors::{ErrorKind, PipelineError};
use slideshift::providers::mock::MockProvider;
use slideshift::translation::pipeline::{
    DeckPipeline, PipelineConfig, PipelineProgress, PipelineState, TranslationPassConfig,
};

use crate::common;
use crate::common::deck_fixtures::{
    break_local_header, hello_deck, numbered_deck, DeckFixture, PictureFixture, SlideFixture,
};

fn pipeline_config(dir: &std::path::Path) -> PipelineConfig {
    PipelineConfig::default().with_output_dir(dir.join("out"))
}

/// Scenario: "こんにちは" becomes "Hello", everything else is preserved
#[tokio::test]
async fn test_run_withHelloDeck_shouldTranslateAndPreserveLayout() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "hello.pptx", &hello_deck().build())?;
    let provider = MockProvider::working().with_dictionary([("こんにちは", "Hello")]);

    let mut pipeline = DeckPipeline::new(common::mock_service(&provider, 0), pipeline_config(temp_dir.path()));
    assert_eq!(pipeline.state(), PipelineState::Idle);

    let report = pipeline.run(&input).await?;

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(provider.call_count(), 1);
    assert_eq!(report.slides, 2);
    assert_eq!(report.translated_elements, 1);
    assert_eq!(report.skipped_elements, 1);
    assert_eq!(report.unique_requests, 1);
    assert!(report.failed_elements.is_empty());
    assert!(report.output_path.starts_with(temp_dir.path().join("out")));

    let source = DeckExtractor::new().extract_path(&input)?;
    let output = DeckExtractor::new().extract_path(&report.output_path)?;

    assert_eq!(output.slide_count(), 2);
    let title = &output.slides[0].texts[0];
    assert_eq!(title.source_text, "Hello");
    assert_eq!(title.position, source.slides[0].texts[0].position);
    assert_eq!(title.font_size, Some(24.0));
    assert_eq!(title.color.as_deref(), Some("FF0000"));
    assert!(title.bold);

    assert_eq!(output.slides[1].texts.len(), 1);
    assert_eq!(output.slides[1].texts[0].source_text, "");

    let source_image = &source.slides[0].images[0];
    let output_image = &output.slides[0].images[0];
    assert_eq!(
        Sha256::digest(&output_image.data.bytes),
        Sha256::digest(&source_image.data.bytes)
    );
    assert_eq!(output_image.position, source_image.position);
    assert_eq!(output_image.size, source_image.size);
    Ok(())
}

#[tokio::test]
async fn test_run_withWhitespaceElements_shouldNeverSendThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = DeckFixture::new().slide(SlideFixture::new().text("本文").text("   ").text("\t"));
    let input = common::create_test_file(temp_dir.path(), "ws.pptx", &deck.build())?;
    let provider = MockProvider::working();

    let mut pipeline = DeckPipeline::new(common::mock_service(&provider, 0), pipeline_config(temp_dir.path()));
    let report = pipeline.run(&input).await?;

    assert_eq!(provider.received_texts(), vec!["本文".to_string()]);
    assert_eq!(report.skipped_elements, 2);

    let output = DeckExtractor::new().extract_path(&report.output_path)?;
    let texts: Vec<&str> = output.text_elements().map(|e| e.source_text.as_str()).collect();
    assert_eq!(texts, vec!["[en] 本文", "   ", "\t"]);
    Ok(())
}

#[tokio::test]
async fn test_run_withShuffledCompletion_shouldAttributeByElement() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "many.pptx", &numbered_deck(24).build())?;
    let provider = MockProvider::shuffled(15);

    let mut config = pipeline_config(temp_dir.path());
    config.translation.concurrent_requests = 8;
    let mut pipeline = DeckPipeline::new(common::mock_service(&provider, 0), config);
    let report = pipeline.run(&input).await?;

    // 24 distinct titles plus one shared footer
    assert_eq!(provider.call_count(), 25);
    assert_eq!(report.unique_requests, 25);
    assert_eq!(report.translated_elements, 48);

    let output = DeckExtractor::new().extract_path(&report.output_path)?;
    for (i, slide) in output.slides.iter().enumerate() {
        assert_eq!(slide.texts[0].source_text, format!("[en] スライド {}", i + 1));
        assert_eq!(slide.texts[1].source_text, "[en] 共通のフッター");
    }
    Ok(())
}

#[tokio::test]
async fn test_run_withDedupeDisabled_shouldTranslateEveryElement() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "many.pptx", &numbered_deck(3).build())?;
    let provider = MockProvider::working();

    let mut config = pipeline_config(temp_dir.path());
    config.translation = TranslationPassConfig {
        dedupe_identical: false,
        ..TranslationPassConfig::default()
    };
    let mut pipeline = DeckPipeline::new(common::mock_service(&provider, 0), config);
    let report = pipeline.run(&input).await?;

    assert_eq!(provider.call_count(), 6);
    assert_eq!(report.unique_requests, 6);
    Ok(())
}

#[tokio::test]
async fn test_run_withPermanentFailure_shouldFailWithoutOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "hello.pptx", &hello_deck().build())?;
    let provider = MockProvider::failing(400);

    let mut pipeline = DeckPipeline::new(common::mock_service(&provider, 3), pipeline_config(temp_dir.path()));
    let error = pipeline.run(&input).await.unwrap_err();

    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(error.kind(), ErrorKind::Translation);
    match &error {
        PipelineError::Translation(e) => {
            assert_eq!(e.status, Some(400));
            assert_eq!(e.attempts, 1);
        }
        other => panic!("expected a translation error, got {:?}", other),
    }

    let out_dir = temp_dir.path().join("out");
    assert!(!out_dir.exists() || common::list_files(&out_dir)?.is_empty());
    assert_eq!(common::list_files(temp_dir.path())?, vec!["hello.pptx".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_run_withTransientFailures_shouldRetryAndSucceed() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "hello.pptx", &hello_deck().build())?;
    let provider = MockProvider::fail_first(2).with_dictionary([("こんにちは", "Hello")]);

    let mut pipeline = DeckPipeline::new(common::mock_service(&provider, 3), pipeline_config(temp_dir.path()));
    let report = pipeline.run(&input).await?;

    assert_eq!(provider.call_count(), 3);
    let output = DeckExtractor::new().extract_path(&report.output_path)?;
    assert_eq!(output.slides[0].texts[0].source_text, "Hello");
    Ok(())
}

#[tokio::test]
async fn test_run_withKeepSource_shouldWriteSourceForFailedElements() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = DeckFixture::new().slide(SlideFixture::new().text("一").text("二").text("三"));
    let input = common::create_test_file(temp_dir.path(), "partial.pptx", &deck.build())?;
    let provider = MockProvider::intermittent(2);

    let mut config = pipeline_config(temp_dir.path());
    config.translation.concurrent_requests = 1;
    config.translation.failure_policy = FailurePolicy::KeepSource;
    let mut pipeline = DeckPipeline::new(common::mock_service(&provider, 0), config);
    let report = pipeline.run(&input).await?;

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(report.failed_elements, vec![ElementId::new(0, 1)]);

    let output = DeckExtractor::new().extract_path(&report.output_path)?;
    let texts: Vec<&str> = output.text_elements().map(|e| e.source_text.as_str()).collect();
    assert_eq!(texts, vec!["[en] 一", "二", "[en] 三"]);
    Ok(())
}

#[tokio::test]
async fn test_run_withInvalidPackage_shouldFailInExtraction() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "fake.pptx", b"PK but not really")?;
    let provider = MockProvider::working();

    let mut pipeline = DeckPipeline::new(common::mock_service(&provider, 0), pipeline_config(temp_dir.path()));
    let error = pipeline.run(&input).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Extraction);
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(provider.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_withCorruptPartAfterSlides_shouldLeaveNoPartialOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut package = hello_deck().part("ppt/zz.bin", b"opaque trailing part").build();
    // extraction never opens this entry, reconstruction fails on it after the slides
    break_local_header(&mut package, "ppt/zz.bin");
    let input = common::create_test_file(temp_dir.path(), "hello.pptx", &package)?;
    let provider = MockProvider::working();

    let mut pipeline = DeckPipeline::new(common::mock_service(&provider, 0), pipeline_config(temp_dir.path()));
    let error = pipeline.run(&input).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Reconstruction);
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(provider.call_count(), 1);

    let out_dir = temp_dir.path().join("out");
    assert!(!out_dir.exists() || common::list_files(&out_dir)?.is_empty());
    assert_eq!(common::list_files(temp_dir.path())?, vec!["hello.pptx".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_run_twice_shouldProduceDistinctOutputs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "hello.pptx", &hello_deck().build())?;
    let provider = MockProvider::working();

    let mut config = pipeline_config(temp_dir.path());
    config.naming = OutputNaming::ContentHash;
    let mut pipeline = DeckPipeline::new(common::mock_service(&provider, 0), config);

    let first = pipeline.run(&input).await?;
    let second = pipeline.run(&input).await?;

    assert_ne!(first.output_path, second.output_path);
    assert!(first.output_path.exists() && second.output_path.exists());
    assert_eq!(common::list_files(&temp_dir.path().join("out"))?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_run_withoutOutputDir_shouldWriteNextToInput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "hello.pptx", &hello_deck().build())?;
    let provider = MockProvider::working();

    let mut pipeline = DeckPipeline::new(common::mock_service(&provider, 0), PipelineConfig::default());
    let report = pipeline.run(&input).await?;

    assert_eq!(report.output_path.parent(), Some(temp_dir.path()));
    let files = common::list_files(temp_dir.path())?;
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| !f.ends_with(".partial")));
    Ok(())
}

#[tokio::test]
async fn test_run_withMissingImage_shouldWarnAndContinue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let deck = DeckFixture::new().slide(
        SlideFixture::new()
            .text("図")
            .picture(PictureFixture::dangling("lost.png")),
    );
    let input = common::create_test_file(temp_dir.path(), "img.pptx", &deck.build())?;
    let provider = MockProvider::working();

    let mut pipeline = DeckPipeline::new(common::mock_service(&provider, 0), pipeline_config(temp_dir.path()));
    let report = pipeline.run(&input).await?;

    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("lost.png"));
    let output = DeckExtractor::new().extract_path(&report.output_path)?;
    assert_eq!(output.slides[0].texts[0].source_text, "[en] 図");
    assert_eq!(output.slides[0].texts[0].position, Position::new(838_200, 365_125));
    Ok(())
}

#[tokio::test]
async fn test_run_withProgress_shouldReportStatesInOrder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "many.pptx", &numbered_deck(2).build())?;
    let provider = MockProvider::working();

    let events: Arc<Mutex<Vec<PipelineProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut pipeline = DeckPipeline::new(common::mock_service(&provider, 0), pipeline_config(temp_dir.path()))
        .with_progress(move |progress| sink.lock().push(progress));
    pipeline.run(&input).await?;

    let events = events.lock().clone();
    let states: Vec<PipelineState> = events
        .iter()
        .filter_map(|e| match e {
            PipelineProgress::State(state) => Some(*state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            PipelineState::Extracting,
            PipelineState::Translating,
            PipelineState::Reconstructing,
            PipelineState::Done
        ]
    );

    let last_count = events.iter().rev().find_map(|e| match e {
        PipelineProgress::Translated { done, total } => Some((*done, *total)),
        _ => None,
    });
    assert_eq!(last_count, Some((4, 4)));
    Ok(())
}
