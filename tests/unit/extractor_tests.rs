/*!
 * Tests for deck extraction
 */

use anyhow::Result;
use slideshift::deck::{DeckExtractor, ElementId, Position, Size};
use slideshift::errors::ExtractionError;

use crate::common;
use crate::common::deck_fixtures::{
    hello_deck, numbered_deck, DeckFixture, PictureFixture, RunFixture, ShapeFixture, SlideFixture, PNG_BYTES,
    TITLE_X, TITLE_Y,
};

#[test]
fn test_extractBytes_withHelloDeck_shouldReadSlidesInOrder() -> Result<()> {
    let document = DeckExtractor::new().extract_bytes("hello.pptx", hello_deck().build())?;

    assert_eq!(document.source_name, "hello.pptx");
    assert_eq!(document.slide_count(), 2);
    assert_eq!(document.slides[0].number, 1);
    assert_eq!(document.slides[1].part_name, "ppt/slides/slide2.xml");

    let title = &document.slides[0].texts[0];
    assert_eq!(title.id, ElementId::new(0, 0));
    assert_eq!(title.source_text, "こんにちは");
    assert_eq!(title.position, Position::new(TITLE_X, TITLE_Y));
    assert_eq!(title.font_size, Some(24.0));
    assert_eq!(title.color.as_deref(), Some("FF0000"));
    assert!(title.bold);

    let empty = &document.slides[1].texts[0];
    assert_eq!(empty.source_text, "");
    assert!(!empty.is_translatable());
    assert!(document.warnings.is_empty());
    Ok(())
}

#[test]
fn test_extractBytes_shouldLoadImageBytesAndLayout() -> Result<()> {
    let document = DeckExtractor::new().extract_bytes("hello.pptx", hello_deck().build())?;

    let images: Vec<_> = document.image_elements().collect();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].data.part_name, "ppt/media/image1.png");
    assert_eq!(images[0].data.bytes.as_ref(), PNG_BYTES);
    assert_eq!(images[0].position, Position::new(4_000_000, 2_000_000));
    assert_eq!(images[0].size, Size::new(1_270_000, 952_500));
    assert_eq!(images[0].rel_id, "rId2");
    Ok(())
}

#[test]
fn test_extractBytes_withMultipleRuns_shouldKeepRunOrder() -> Result<()> {
    let deck = DeckFixture::new().slide(SlideFixture::new().shape(ShapeFixture::at(
        0,
        0,
        vec![
            RunFixture::styled("太字", 18, "000000", true),
            RunFixture::plain(" と "),
            RunFixture::styled("赤", 18, "C00000", false),
        ],
    )));
    let document = DeckExtractor::new().extract_bytes("runs.pptx", deck.build())?;

    let texts: Vec<&str> = document.text_elements().map(|e| e.source_text.as_str()).collect();
    assert_eq!(texts, vec!["太字", " と ", "赤"]);
    assert_eq!(document.slides[0].texts[2].color.as_deref(), Some("C00000"));
    assert!(!document.slides[0].texts[2].bold);
    Ok(())
}

#[test]
fn test_extractBytes_withTable_shouldExtractCells() -> Result<()> {
    let deck = DeckFixture::new().slide(SlideFixture::new().text("表").table(&["項目", "値"]));
    let document = DeckExtractor::new().extract_bytes("table.pptx", deck.build())?;

    let texts: Vec<&str> = document.text_elements().map(|e| e.source_text.as_str()).collect();
    assert_eq!(texts, vec!["表", "項目", "値"]);
    assert_eq!(document.slides[0].texts[1].position, Position::new(500_000, 3_000_000));
    Ok(())
}

#[test]
fn test_extractBytes_withMissingMedia_shouldWarnAndSkipImage() -> Result<()> {
    let deck = DeckFixture::new().slide(
        SlideFixture::new()
            .text("画像なし")
            .picture(PictureFixture::dangling("gone.png")),
    );
    let document = DeckExtractor::new().extract_bytes("broken.pptx", deck.build())?;

    assert_eq!(document.image_elements().count(), 0);
    assert_eq!(document.warnings.len(), 1);
    assert!(document.warnings[0].contains("ppt/media/gone.png"));
    Ok(())
}

#[test]
fn test_extractBytes_withLinkedPicture_shouldWarnAndSkipIt() -> Result<()> {
    let deck = DeckFixture::new().slide(
        SlideFixture::new()
            .text("外部画像")
            .picture(PictureFixture::linked("https://example.com/chart.png"))
            .picture(PictureFixture::png("image1.png", 0, 0)),
    );
    let document = DeckExtractor::new().extract_bytes("linked.pptx", deck.build())?;

    let images: Vec<_> = document.image_elements().collect();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].data.part_name, "ppt/media/image1.png");
    assert_eq!(document.warnings.len(), 1);
    assert!(document.warnings[0].contains("linked image https://example.com/chart.png is not embedded"));
    assert_eq!(document.slides[0].texts[0].source_text, "外部画像");
    Ok(())
}

#[test]
fn test_extractBytes_withManySlides_shouldUsePresentationOrder() -> Result<()> {
    let document = DeckExtractor::new().extract_bytes("many.pptx", numbered_deck(12).build())?;

    assert_eq!(document.slide_count(), 12);
    assert_eq!(document.slides[9].texts[0].source_text, "スライド 10");
    assert_eq!(document.slides[11].part_name, "ppt/slides/slide12.xml");
    Ok(())
}

#[test]
fn test_extractBytes_withNonZipInput_shouldFail() {
    let result = DeckExtractor::new().extract_bytes("fake.pptx", b"not a zip file".to_vec());
    assert!(matches!(result, Err(ExtractionError::InvalidPackage(_))));
}

#[test]
fn test_extractPath_withMissingFile_shouldReturnIoError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let result = DeckExtractor::new().extract_path(&temp_dir.path().join("absent.pptx"));
    assert!(matches!(result, Err(ExtractionError::Io(_))));
    Ok(())
}

#[test]
fn test_extractPath_shouldUseFileName() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "会議.pptx", &hello_deck().build())?;

    let document = DeckExtractor::new().extract_path(&path)?;
    assert_eq!(document.source_name, "会議.pptx");
    assert_eq!(document.package().len(), std::fs::read(&path)?.len());
    Ok(())
}
