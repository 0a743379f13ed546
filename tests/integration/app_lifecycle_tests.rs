/*!
 * Application lifecycle tests: controller, folder mode and extraction
 */

use anyhow::Result;

use slideshift::app_config::Config;
use slideshift::app_controller::{self, Controller};
use slideshift::errors::{ErrorKind, PipelineError};
use slideshift::providers::mock::MockProvider;

use crate::common;
use crate::common::deck_fixtures::{break_local_header, hello_deck, numbered_deck, DeckFixture, SlideFixture};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_withConfig_withoutCredentials_shouldFail() {
    let result = Controller::with_config(Config::default());
    let error = result.err().expect("controller should not start without credentials");
    assert!(format!("{:#}", error).contains("translator.api_key"));
}

#[test]
fn test_withConfig_withValidConfig_shouldKeepSettings() -> Result<()> {
    let controller = Controller::with_config(common::test_config())?;
    assert_eq!(controller.config().target_language, "en");
    Ok(())
}

#[tokio::test]
async fn test_run_shouldTranslateIntoOutputDir() -> Result<()> {
    init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "hello.pptx", &hello_deck().build())?;
    let out_dir = temp_dir.path().join("translated");
    let provider = MockProvider::working().with_dictionary([("こんにちは", "Hello")]);
    let controller = Controller::with_service(common::test_config(), common::mock_service(&provider, 0));

    let report = controller.run(input, Some(out_dir.clone())).await?;

    assert_eq!(report.output_path.parent(), Some(out_dir.as_path()));
    let texts = app_controller::extract_texts(&report.output_path)?;
    assert_eq!(texts[0].source_text, "Hello");
    Ok(())
}

#[tokio::test]
async fn test_run_withFailure_shouldExposePipelineError() -> Result<()> {
    init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "hello.pptx", &hello_deck().build())?;
    let provider = MockProvider::failing(401);
    let controller = Controller::with_service(common::test_config(), common::mock_service(&provider, 0));

    let error = controller.run(input, None).await.unwrap_err();

    // the outer message is the user-facing one, the cause keeps the details
    assert_eq!(error.to_string(), "The translation service rejected the request.");
    let pipeline_error = error.downcast_ref::<PipelineError>().expect("pipeline error in chain");
    assert!(matches!(pipeline_error, PipelineError::Translation(e) if e.status == Some(401)));
    Ok(())
}

#[tokio::test]
async fn test_userFacingMessage_withUnreadableSlide_shouldHidePartNames() -> Result<()> {
    init_logging();
    let temp_dir = common::create_temp_dir()?;
    let mut package = hello_deck().build();
    break_local_header(&mut package, "ppt/slides/slide1.xml");
    let input = common::create_test_file(temp_dir.path(), "hello.pptx", &package)?;
    let provider = MockProvider::working();
    let controller = Controller::with_service(common::test_config(), common::mock_service(&provider, 0));

    let error = controller.run(input, None).await.unwrap_err();

    let message = app_controller::user_facing_message(&error);
    assert_eq!(message, "The file could not be read as a PowerPoint presentation.");
    assert!(!message.contains("ppt/"));
    // the detail stays available for debug logging
    assert!(format!("{:#}", error).contains("ppt/slides/slide1.xml"));
    let pipeline_error = error.downcast_ref::<PipelineError>().expect("pipeline error in chain");
    assert_eq!(pipeline_error.kind(), ErrorKind::Extraction);
    assert_eq!(provider.call_count(), 0);
    Ok(())
}

#[test]
fn test_userFacingMessage_withOtherError_shouldUseOuterContext() {
    let error = anyhow::anyhow!("inner detail").context("Input path does not exist");
    assert_eq!(app_controller::user_facing_message(&error), "Input path does not exist");
}

#[tokio::test]
async fn test_run_withMissingInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let provider = MockProvider::working();
    let controller = Controller::with_service(common::test_config(), common::mock_service(&provider, 0));

    let result = controller.run(temp_dir.path().join("absent.pptx"), None).await;
    assert!(result.is_err());
    assert_eq!(provider.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_withKeptSource_shouldWriteIssuesLog() -> Result<()> {
    init_logging();
    let temp_dir = common::create_temp_dir()?;
    let deck = DeckFixture::new().slide(SlideFixture::new().text("一").text("二"));
    let input = common::create_test_file(temp_dir.path(), "deck.pptx", &deck.build())?;
    let provider = MockProvider::intermittent(2);

    let mut config = common::keep_source_config();
    config.translation.concurrent_requests = 1;
    let controller = Controller::with_service(config, common::mock_service(&provider, 0));

    let report = controller.run(input, None).await?;
    assert_eq!(report.failed_elements.len(), 1);

    let log = std::fs::read_to_string(temp_dir.path().join("slideshift.issues.log"))?;
    assert!(log.contains("KEPT SOURCE slide 1 element 2"));
    Ok(())
}

#[tokio::test]
async fn test_runFolder_shouldTranslateEveryDeckAndReportFailures() -> Result<()> {
    init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input_dir = temp_dir.path().join("decks");
    std::fs::create_dir(&input_dir)?;
    common::create_test_file(&input_dir, "a.pptx", &hello_deck().build())?;
    common::create_test_file(&input_dir, "b.pptx", &numbered_deck(3).build())?;
    common::create_test_file(&input_dir, "broken.pptx", b"not a deck")?;
    common::create_test_file(&input_dir, "~$a.pptx", b"lock")?;

    let out_dir = temp_dir.path().join("out");
    let provider = MockProvider::working();
    let controller = Controller::with_service(common::test_config(), common::mock_service(&provider, 0));

    let summary = controller.run_folder(input_dir.clone(), Some(out_dir.clone())).await?;

    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].0.ends_with("broken.pptx"));
    assert_eq!(common::list_files(&out_dir)?.len(), 2);

    // outputs written next to the inputs are skipped on the next run
    let second = controller.run_folder(input_dir.clone(), None).await?;
    assert_eq!(second.reports.len(), 2);
    let third = controller.run_folder(input_dir, None).await?;
    assert_eq!(third.reports.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_runFolder_withNoDecks_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let provider = MockProvider::working();
    let controller = Controller::with_service(common::test_config(), common::mock_service(&provider, 0));

    assert!(controller.run_folder(temp_dir.path().to_path_buf(), None).await.is_err());
    Ok(())
}

#[test]
fn test_extractTexts_shouldListElementsInOrder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "many.pptx", &numbered_deck(2).build())?;

    let texts = app_controller::extract_texts(&input)?;
    let sources: Vec<&str> = texts.iter().map(|t| t.source_text.as_str()).collect();
    assert_eq!(sources, vec!["スライド 1", "共通のフッター", "スライド 2", "共通のフッター"]);

    let json = serde_json::to_value(&texts)?;
    assert_eq!(json[0]["id"]["slide"], 0);
    assert_eq!(json[0]["position"]["x"], 838_200);
    Ok(())
}
