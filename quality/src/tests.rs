use std::path::{Path, PathBuf};

use imaginarium::{ColorFormat, Image, ImageDesc};
use parking_lot::Mutex;

use crate::{Error, GrayImage, QualityBridge, QualityEngine, Result, SCORE_COMPONENTS, SCORE_FAILED};

#[derive(Clone, Copy, Debug, Default)]
enum Behavior {
    #[default]
    Mean,
    Fail,
    Panic,
    NotFinite,
}

#[derive(Debug)]
struct Received {
    gray: Vec<u8>,
    width: u32,
    height: u32,
    model_path: String,
    range_path: String,
}

#[derive(Default)]
struct FakeEngine {
    behavior: Behavior,
    received: Mutex<Vec<Received>>,
}

impl FakeEngine {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.received.lock().len()
    }
}

impl QualityEngine for FakeEngine {
    fn compute(
        &self,
        image: GrayImage<'_>,
        model_path: &str,
        range_path: &str,
    ) -> Result<[f64; SCORE_COMPONENTS]> {
        let mut gray = Vec::with_capacity((image.width * image.height) as usize);
        for row in image.data.chunks(image.stride).take(image.height as usize) {
            gray.extend_from_slice(&row[..image.width as usize]);
        }
        let mean = gray.iter().map(|&v| v as f64).sum::<f64>() / gray.len() as f64;

        self.received.lock().push(Received {
            gray,
            width: image.width,
            height: image.height,
            model_path: model_path.to_string(),
            range_path: range_path.to_string(),
        });

        match self.behavior {
            Behavior::Mean => Ok([mean, 1.0, 2.0, 3.0]),
            Behavior::Fail => Err(Error::Engine("model rejected".to_string())),
            Behavior::Panic => panic!("engine fault"),
            Behavior::NotFinite => Ok([f64::NAN; SCORE_COMPONENTS]),
        }
    }
}

fn write_rgb_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let bytes: Vec<u8> = (0..width * height * 3).map(|i| (i * 11 % 256) as u8).collect();
    let image =
        Image::new_with_data(ImageDesc::new(width, height, ColorFormat::RGB_U8), bytes).unwrap();
    let path = dir.join(name);
    image.save_file(&path).unwrap();
    path
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn scores_decoded_grayscale() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = write_rgb_png(dir.path(), "photo.png", 6, 4);
    let bridge = QualityBridge::new(FakeEngine::default());

    let score = bridge.compute_quality_score(path_str(&image_path), "model.yml", "range.yml");

    let received = bridge.engine().received.lock();
    assert_eq!(received.len(), 1);
    assert_eq!((received[0].width, received[0].height), (6, 4));
    assert_eq!(received[0].gray.len(), 24);
    assert_eq!(received[0].model_path, "model.yml");
    assert_eq!(received[0].range_path, "range.yml");

    let mean = received[0].gray.iter().map(|&v| v as f64).sum::<f64>() / 24.0;
    assert_eq!(score, mean as f32);
}

#[test]
fn repeated_scoring_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = write_rgb_png(dir.path(), "photo.png", 9, 7);
    let bridge = QualityBridge::new(FakeEngine::default());

    let first = bridge.compute_quality_score(path_str(&image_path), "m", "r");
    let second = bridge.compute_quality_score(path_str(&image_path), "m", "r");

    assert_eq!(first, second);
    let received = bridge.engine().received.lock();
    assert_eq!(received[0].gray, received[1].gray);
}

#[test]
fn missing_image_returns_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.jpg");
    let bridge = QualityBridge::new(FakeEngine::default());

    let score = bridge.compute_quality_score(path_str(&missing), "m", "r");

    assert_eq!(score, -1.0);
    assert_eq!(bridge.engine().calls(), 0);
}

#[test]
fn non_image_file_returns_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("readme.png");
    std::fs::write(&path, "just text").unwrap();
    let bridge = QualityBridge::new(FakeEngine::default());

    assert_eq!(bridge.compute_quality_score(path_str(&path), "m", "r"), SCORE_FAILED);

    let err = bridge.try_compute_quality_score(path_str(&path), "m", "r");
    assert!(matches!(err, Err(Error::ImageLoad { .. })));
}

#[test]
fn empty_arguments_are_rejected() {
    let bridge = QualityBridge::new(FakeEngine::default());

    assert!(matches!(
        bridge.try_compute_quality_score("", "m", "r"),
        Err(Error::EmptyArgument("image_path"))
    ));
    assert!(matches!(
        bridge.try_compute_quality_score("a.png", "", "r"),
        Err(Error::EmptyArgument("model_path"))
    ));
    assert_eq!(bridge.compute_quality_score("a.png", "m", ""), SCORE_FAILED);
    assert_eq!(bridge.engine().calls(), 0);
}

#[test]
fn engine_error_returns_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = write_rgb_png(dir.path(), "photo.png", 3, 3);
    let bridge = QualityBridge::new(FakeEngine::with(Behavior::Fail));

    assert_eq!(bridge.compute_quality_score(path_str(&image_path), "m", "r"), SCORE_FAILED);
    assert_eq!(bridge.engine().calls(), 1);
}

#[test]
fn engine_panic_does_not_escape() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = write_rgb_png(dir.path(), "photo.png", 3, 3);
    let bridge = QualityBridge::new(FakeEngine::with(Behavior::Panic));

    assert_eq!(bridge.compute_quality_score(path_str(&image_path), "m", "r"), SCORE_FAILED);
}

#[test]
fn non_finite_score_is_a_failure() {
    let image =
        Image::new_with_data(ImageDesc::new(2, 2, ColorFormat::L_U8), vec![1, 2, 3, 4]).unwrap();
    let bridge = QualityBridge::new(FakeEngine::with(Behavior::NotFinite));

    assert!(matches!(bridge.try_score_image(&image, "m", "r"), Err(Error::Engine(_))));
    assert_eq!(bridge.score_image(&image, "m", "r"), SCORE_FAILED);
}

#[test]
fn gray_image_is_passed_unchanged() {
    let image =
        Image::new_with_data(ImageDesc::new(3, 1, ColorFormat::L_U8), vec![0, 128, 255]).unwrap();
    let bridge = QualityBridge::new(FakeEngine::default());

    let score = bridge.score_image(&image, "m", "r");

    assert_eq!(bridge.engine().received.lock()[0].gray, vec![0, 128, 255]);
    assert!((score - 127.666_67).abs() < 1e-3);
}

#[test]
fn engine_reference_is_an_engine() {
    let engine = FakeEngine::default();
    let bridge = QualityBridge::new(&engine);
    let image =
        Image::new_with_data(ImageDesc::new(1, 1, ColorFormat::L_U8), vec![42]).unwrap();

    assert_eq!(bridge.score_image(&image, "m", "r"), 42.0);
    assert_eq!(engine.calls(), 1);
}
