use image::{Rgb, RgbImage};
use ndarray::{array, Array2};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

use pet_seg_rs::{
    display::{FileDisplay, RecordingDisplay},
    AcquisitionState, ClassLabel, ImageAcquisition, OutOfRangePolicy, PetSegError,
    SegmentationEngine, SegmentationMask, SegmentationReporter, SegmentationResult, Session,
    SourceImage, StatusMessage,
};

// Engine defined locally so the scenarios control the mask it returns
#[derive(Debug)]
struct TestEngine {
    cells: Array2<i32>,
    confidence: f32,
    saw_image: AtomicBool,
}

impl TestEngine {
    fn new(cells: Array2<i32>, confidence: f32) -> Self {
        Self {
            cells,
            confidence,
            saw_image: AtomicBool::new(false),
        }
    }
}

impl SegmentationEngine for TestEngine {
    fn segment(&self, image: &SourceImage) -> pet_seg_rs::Result<SegmentationResult> {
        self.saw_image.store(image.width() > 0, Ordering::SeqCst);
        SegmentationResult::from_mask(SegmentationMask::from_array(self.cells.clone()), self.confidence)
    }

    fn get_image_size(&self) -> u32 {
        128
    }
}

fn session_with(cells: Array2<i32>, confidence: f32) -> Session<TestEngine> {
    Session::new(
        TestEngine::new(cells, confidence),
        SegmentationReporter::default(),
        ImageAcquisition::new(true),
    )
}

fn photo() -> SourceImage {
    SourceImage::from(RgbImage::from_pixel(8, 6, Rgb([120, 80, 40])))
}

#[tokio::test]
async fn test_camera_capture_end_to_end() -> pet_seg_rs::Result<()> {
    let mut session = session_with(array![[0, 0], [1, 2]], 0.87);
    session.capture_from_camera(photo());
    assert!(matches!(
        session.acquisition().state(),
        AcquisitionState::Ready(_)
    ));

    let report = session.predict().await?;
    let lines: Vec<&str> = report.text.lines().collect();

    assert_eq!(lines[0], "Semantic Segmentation");
    assert_eq!(lines[1], "Confidence: 87.0%");
    assert_eq!(lines[2], "");
    assert_eq!(&lines[3..6], &["Pet: 50.0%", "Background: 25.0%", "Border: 25.0%"]);
    assert_eq!(lines.len(), 9);
    assert!(session.engine().saw_image.load(Ordering::SeqCst));
    Ok(())
}

#[tokio::test]
async fn test_predict_while_idle() {
    let mut session = session_with(array![[0]], 0.5);

    let outcome = session.predict().await;
    assert!(matches!(outcome, Err(PetSegError::NoImageSelected)));

    let status = StatusMessage::from_outcome(&outcome);
    assert_eq!(status.text, "Please select an image first");
    assert!(status.image.is_none());
}

#[tokio::test]
async fn test_empty_mask_reports_failure() {
    let mut session = session_with(Array2::zeros((0, 0)), 0.5);
    session.capture_from_camera(photo());

    let outcome = session.predict().await;
    assert!(matches!(outcome, Err(PetSegError::DegenerateInput { .. })));
    assert_eq!(StatusMessage::from_outcome(&outcome).text, "Segmentation failed");
}

#[tokio::test]
async fn test_out_of_range_cell_is_excluded() -> pet_seg_rs::Result<()> {
    let mut cells = Array2::zeros((4, 5));
    cells[[3, 4]] = 42;
    let mut session = session_with(cells, 0.9);
    session.capture_from_camera(photo());

    let report = session.predict().await?;
    assert_eq!(report.statistics.total_pixels, 20);
    assert_eq!(report.statistics.denominator, 19);
    assert_eq!(report.statistics.percentage(ClassLabel::Pet), 100.0);
    Ok(())
}

#[tokio::test]
async fn test_gallery_flow_with_permission() -> pet_seg_rs::Result<()> {
    let mut session = session_with(Array2::from_elem((3, 3), 2), 1.0);

    let request = session.select_from_gallery(photo());
    assert!(request.needs_permission);
    assert!(matches!(
        session.acquisition().state(),
        AcquisitionState::AwaitingPermission { .. }
    ));

    session.permission_granted();
    session.select_from_gallery(photo());

    let report = session.predict().await?;
    assert!(report.text.contains("Border: 100.0%"));
    assert!(report.text.contains("Pet: 0.0%"));
    assert!(report.text.contains("Confidence: 100.0%"));
    Ok(())
}

#[tokio::test]
async fn test_report_written_to_file_display() -> pet_seg_rs::Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().join("mask.png");

    let mut session = session_with(array![[0, 1], [1, 1]], 0.42);
    session.capture_from_camera(photo());

    let mut display = FileDisplay::with_writer(&output, Vec::new());
    session.predict_and_display(&mut display).await?;

    let mask = image::open(&output)?.to_rgb8();
    assert_eq!(*mask.get_pixel(0, 0), Rgb([255, 0, 0]));
    assert_eq!(*mask.get_pixel(1, 1), Rgb([0, 255, 0]));

    let text = String::from_utf8(display.into_writer()).unwrap();
    assert!(text.starts_with("Selected model: Semantic Segmentation\n"));
    assert!(text.contains("Confidence: 42.0%"));
    Ok(())
}

#[tokio::test]
async fn test_strict_policy_surfaces_failure() {
    let mut session = Session::new(
        TestEngine::new(array![[0, 3]], 0.5),
        SegmentationReporter::new(OutOfRangePolicy::Reject),
        ImageAcquisition::new(false),
    );
    session.capture_from_camera(photo());

    let mut display = RecordingDisplay::new();
    let outcome = session.predict_and_display(&mut display).await;

    assert!(outcome.is_err());
    assert_eq!(display.last_text(), Some("Segmentation failed"));
}

#[tokio::test]
async fn test_shared_engine_between_sessions() -> pet_seg_rs::Result<()> {
    let engine = Arc::new(TestEngine::new(array![[1]], 0.3));
    let mut first = Session::with_shared_engine(
        Arc::clone(&engine),
        SegmentationReporter::default(),
        ImageAcquisition::default(),
    );
    let mut second = Session::with_shared_engine(
        engine,
        SegmentationReporter::default(),
        ImageAcquisition::default(),
    );

    first.capture_from_camera(photo());
    assert!(first.predict().await.is_ok());
    assert!(matches!(
        second.predict().await,
        Err(PetSegError::NoImageSelected)
    ));
    Ok(())
}
