//! Shared test utilities.
//!
//! Provides a throwaway site tree, synthetic image bytes, and in-memory
//! stand-ins for the network and the terminal.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let (site, config) = setup_site();
//! let fetcher = MockFetcher::new().with("https://img.example/a.png", png_bytes(8, 8));
//! let prompter = ScriptedPrompter::new().confirms([true, true]);
//! ```

use crate::config::BlogConfig;
use crate::fetch::{FetchError, Fetcher};
use crate::prompt::Prompter;
use chrono::{DateTime, FixedOffset, TimeZone};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, ImageFormat, Rgba, RgbaImage, RgbImage};
use std::collections::{HashMap, VecDeque};
use std::io::{self, Cursor};
use std::sync::Mutex;
use tempfile::TempDir;

// =========================================================================
// Fixture setup
// =========================================================================

pub const README_EN: &str = "# My site\n\nWelcome.\n\n## Blog list\n\n## About\n\nHello.\n";
pub const README_ZH: &str = "# 我的网站\n\n## 博客列表\n\n* [旧文章](/old/)\n";

/// A site root with an empty manifest and both README targets, plus the
/// stock config.
pub fn setup_site() -> (TempDir, BlogConfig) {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("_data")).unwrap();
    std::fs::write(tmp.path().join("_data/blogs.json"), "{}\n").unwrap();
    std::fs::write(tmp.path().join("README.md"), README_EN).unwrap();
    std::fs::write(tmp.path().join("README.zh_CN.md"), README_ZH).unwrap();
    (tmp, BlogConfig::default())
}

/// 2024-03-01 09:30:05 +08:00
pub fn fixed_now() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(8 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 3, 1, 9, 30, 5)
        .unwrap()
}

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Jpeg)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Png)
}

/// An animated GIF with `frames` solid-colored frames.
pub fn gif_bytes(width: u32, height: u32, frames: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder.set_repeat(Repeat::Infinite).unwrap();
        let frames = (0..frames).map(|i| {
            let shade = (i * 80 % 256) as u8;
            Frame::from_parts(
                RgbaImage::from_pixel(width, height, Rgba([shade, 255 - shade, 0, 255])),
                0,
                0,
                Delay::from_numer_denom_ms(100, 1),
            )
        });
        encoder.encode_frames(frames).unwrap();
    }
    buf
}

// =========================================================================
// Network and terminal stand-ins
// =========================================================================

/// Serves registered URLs from memory; everything else is a 404.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), body);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Answers prompts from a script and records every question asked.
///
/// Running out of answers is an error, so unexpected prompts fail the test.
#[derive(Default)]
pub struct ScriptedPrompter {
    confirms: Mutex<VecDeque<bool>>,
    selections: Mutex<VecDeque<Option<usize>>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirms(self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.confirms.lock().unwrap().extend(answers);
        self
    }

    pub fn selects(self, answers: impl IntoIterator<Item = Option<usize>>) -> Self {
        self.selections.lock().unwrap().extend(answers);
        self
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, message: &str) -> io::Result<bool> {
        self.questions.lock().unwrap().push(message.to_string());
        self.confirms
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::other(format!("unexpected confirm: {message}")))
    }

    fn select(&self, message: &str, _choices: &[String]) -> io::Result<Option<usize>> {
        self.questions.lock().unwrap().push(message.to_string());
        self.selections
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::other(format!("unexpected select: {message}")))
    }
}

#[test]
fn mock_fetcher_serves_registered_urls() {
    let fetcher = MockFetcher::new().with("https://a/x.png", vec![1, 2, 3]);
    assert_eq!(fetcher.fetch("https://a/x.png").unwrap(), vec![1, 2, 3]);
    assert!(matches!(
        fetcher.fetch("https://a/y.png"),
        Err(FetchError::Status { status: 404, .. })
    ));
    assert_eq!(fetcher.requested(), vec!["https://a/x.png", "https://a/y.png"]);
}

#[test]
fn scripted_prompter_errors_when_exhausted() {
    let prompter = ScriptedPrompter::new().confirms([true]);
    assert!(prompter.confirm("first").unwrap());
    assert!(prompter.confirm("second").is_err());
    assert_eq!(prompter.questions(), vec!["first", "second"]);
}
