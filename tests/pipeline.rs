//! Pipeline integration tests against in-memory backends.
//!
//! Every collaborator is a mock, so these run offline and deterministically.
//! Retry backoff is zero throughout.

use async_trait::async_trait;
use notes2story::backend::{ChatBackend, ChatRequest, Fetcher, ImageGenerator, ObjectStore};
use notes2story::{
    create_story_with, AssetError, ImageSize, RetryPolicy, S3Config, Services, Stage,
    StorageConfig, StoryConfig, StoryError, StoryProgressCallback, DEFAULT_ERROR_IMAGE,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

// ── Mocks ────────────────────────────────────────────────────────────────────

/// Replies with the same text to every request and records what it was sent.
struct FixedChat {
    reply: Result<String, (u16, String)>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FixedChat {
    fn ok(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn status(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err((status, body.to_string())),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatBackend for FixedChat {
    fn name(&self) -> &str {
        "mock chat"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, StoryError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err((status, body)) => Err(StoryError::Upstream {
                service: "mock chat".into(),
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

/// Fails the first calls with the scripted statuses, then succeeds.
struct ScriptedGenerator {
    script: Mutex<VecDeque<u16>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(failures: &[u16]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(failures.iter().copied().collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn always_ok() -> Arc<Self> {
        Self::new(&[])
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, AssetError> {
        let n = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        match self.script.lock().unwrap().pop_front() {
            None | Some(200) => Ok(format!("https://images.example/generated/{n}.png")),
            Some(status) => Err(AssetError::Generation {
                status: Some(status),
                detail: "content filter".into(),
            }),
        }
    }
}

/// Object store whose uploads are served back at `CDN`.
#[derive(Default)]
struct MemoryCdn {
    objects: Mutex<Vec<(String, Vec<u8>, String)>>,
}

const CDN: &str = "https://cdn.example/";

impl MemoryCdn {
    fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _, _)| k.clone())
            .collect()
    }
}

#[async_trait]
impl Fetcher for MemoryCdn {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        if url.starts_with("https://images.example/") {
            return Ok(png(40, 40));
        }
        let found = url.strip_prefix(CDN).and_then(|key| {
            self.objects
                .lock()
                .unwrap()
                .iter()
                .find(|(k, _, _)| k == key)
                .map(|(_, body, _)| body.clone())
        });
        found.ok_or_else(|| AssetError::Download {
            url: url.to_string(),
            detail: "HTTP 404".into(),
        })
    }
}

#[async_trait]
impl ObjectStore for MemoryCdn {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), AssetError> {
        self.objects
            .lock()
            .unwrap()
            .push((key.to_string(), body, content_type.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl StoryProgressCallback for RecordingProgress {
    fn on_stage_start(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("stage:{stage:?}").to_lowercase());
    }

    fn on_slide_complete(&self, index: usize, _total: usize, _url: &str, _attempts: u32) {
        self.events.lock().unwrap().push(format!("ok:{index}"));
    }

    fn on_slide_fallback(&self, index: usize, _total: usize, _error: &str) {
        self.events.lock().unwrap().push(format!("fallback:{index}"));
    }

    fn on_story_complete(&self, generated: usize, total: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done:{generated}/{total}"));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([250, 200, 40]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn content_reply(title: &str) -> String {
    json!({
        "storytitle": title,
        "s2paragraph1": "Plants turn sunlight into food.",
        "s3paragraph1": "Chlorophyll captures red and blue light.",
        "s4paragraph1": "Water molecules are split, releasing oxygen.",
        "s5paragraph1": "Carbon dioxide is fixed in the Calvin cycle.",
        "s6paragraph1": "The result is glucose, stored as starch.",
        "s1alt1": "A glowing green leaf under the sun, vector art",
        "s2alt1": "Sunbeams falling on a potted plant",
        "s3alt1": "A chloroplast with stacked thylakoids",
        "s4alt1": "Water droplets splitting into bubbles",
        "s5alt1": "CO2 molecules drifting into a leaf",
        "s6alt1": "Sugar cubes shaped like leaves"
    })
    .to_string()
}

fn seo_reply() -> String {
    json!({
        "metadescription": "Learn how plants turn sunlight into food in six slides.",
        "metakeywords": "photosynthesis, chlorophyll, biology"
    })
    .to_string()
}

fn config_with(storage: StorageConfig) -> StoryConfig {
    StoryConfig::builder()
        .vision_endpoint("https://mock.example/chat")
        .image_endpoint("https://mock.example/images")
        .storage(storage)
        .cdn_base(CDN)
        .retry(RetryPolicy::immediate(3))
        .slide_size(ImageSize::new(72, 120))
        .portrait_size(ImageSize::new(64, 85))
        .build()
        .unwrap()
}

fn config() -> StoryConfig {
    config_with(StorageConfig::directory("/unused"))
}

struct Harness {
    chat: Arc<FixedChat>,
    seo: Arc<FixedChat>,
    generator: Arc<ScriptedGenerator>,
    cdn: Arc<MemoryCdn>,
}

impl Harness {
    fn new(chat: Arc<FixedChat>, seo: Arc<FixedChat>, generator: Arc<ScriptedGenerator>) -> Self {
        Self {
            chat,
            seo,
            generator,
            cdn: Arc::new(MemoryCdn::default()),
        }
    }

    fn happy(title: &str) -> Self {
        Self::new(
            FixedChat::ok(content_reply(title)),
            FixedChat::ok(seo_reply()),
            ScriptedGenerator::always_ok(),
        )
    }

    fn services(&self) -> Services {
        Services::new(
            self.chat.clone(),
            self.generator.clone(),
            self.cdn.clone(),
            self.cdn.clone(),
        )
        .with_seo_chat(self.seo.clone())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_story_document_is_complete() {
    let h = Harness::happy("Photosynthesis");
    let story = create_story_with(&png(8, 8), &h.services(), &config())
        .await
        .unwrap();

    let doc: Value = serde_json::from_str(&story.json).unwrap();
    assert_eq!(doc["storytitle"], "Photosynthesis");
    for i in 2..=6 {
        assert!(doc[format!("s{i}paragraph1")].as_str().is_some_and(|s| !s.is_empty()));
    }
    for i in 1..=6 {
        assert!(doc[format!("s{i}alt1")].as_str().is_some_and(|s| !s.is_empty()));
        assert_eq!(
            doc[format!("s{i}image1")],
            format!("{CDN}photosynthesis/slide{i}.jpg")
        );
    }
    assert_eq!(
        doc["potraitcoverurl"],
        format!("{CDN}photosynthesis/portrait_cover.jpg")
    );
    assert_eq!(doc["metakeywords"], "photosynthesis, chlorophyll, biology");
    assert_eq!(doc.as_object().unwrap().len(), 1 + 5 + 6 + 6 + 3);

    let name = regex::Regex::new(r"^photosynthesis_\d{8}_\d{6}\.json$").unwrap();
    assert!(name.is_match(&story.filename), "got {}", story.filename);

    assert_eq!(story.stats.slides_generated, 6);
    assert_eq!(story.stats.generation_attempts, 6);
    assert!(!story.stats.portrait_fallback);
}

#[tokio::test]
async fn uploads_are_jpeg_at_fixed_canvas() {
    let h = Harness::happy("Photosynthesis");
    create_story_with(&png(8, 8), &h.services(), &config())
        .await
        .unwrap();

    let objects = h.cdn.objects.lock().unwrap();
    assert_eq!(objects.len(), 7);
    for (key, body, content_type) in objects.iter() {
        assert_eq!(content_type, "image/jpeg");
        let img = image::load_from_memory(body).unwrap();
        let expected = if key.ends_with("portrait_cover.jpg") {
            (64, 85)
        } else {
            (72, 120)
        };
        assert_eq!((img.width(), img.height()), expected, "{key}");
    }
}

#[tokio::test]
async fn slide_that_never_succeeds_gets_default_image() {
    // slide 1 ok, slide 2 fails all three attempts, the rest succeed
    let h = Harness::new(
        FixedChat::ok(content_reply("Photosynthesis")),
        FixedChat::ok(seo_reply()),
        ScriptedGenerator::new(&[200, 500, 500, 500]),
    );
    let story = create_story_with(&png(8, 8), &h.services(), &config())
        .await
        .unwrap();

    assert_eq!(story.document.slide_url(2), Some(DEFAULT_ERROR_IMAGE));
    assert_eq!(
        story.document.slide_url(3),
        Some("https://cdn.example/photosynthesis/slide3.jpg")
    );
    assert_eq!(h.generator.calls(), 1 + 3 + 4);
    assert_eq!(story.stats.slides_fallback, 1);
    assert!(!h.cdn.keys().contains(&"photosynthesis/slide2.jpg".to_string()));
}

#[tokio::test]
async fn every_slide_failing_still_completes_the_run() {
    let h = Harness::new(
        FixedChat::ok(content_reply("Photosynthesis")),
        FixedChat::ok(seo_reply()),
        ScriptedGenerator::new(&[429; 18]),
    );
    let story = create_story_with(&png(8, 8), &h.services(), &config())
        .await
        .unwrap();

    for i in 1..=6 {
        assert_eq!(story.document.slide_url(i), Some(DEFAULT_ERROR_IMAGE));
    }
    // the portrait is derived from slide 1's sentinel URL and falls back too
    assert_eq!(story.document.portrait_url(), DEFAULT_ERROR_IMAGE);
    assert_eq!(h.generator.calls(), 18);
    assert!(h.cdn.keys().is_empty());
    assert_eq!(h.seo.calls(), 1);
}

#[tokio::test]
async fn success_after_failures_stops_retrying() {
    let h = Harness::new(
        FixedChat::ok(content_reply("Photosynthesis")),
        FixedChat::ok(seo_reply()),
        ScriptedGenerator::new(&[503, 503]),
    );
    let story = create_story_with(&png(8, 8), &h.services(), &config())
        .await
        .unwrap();

    let slide1 = &story.document.illustration.slides[0];
    assert_eq!(slide1.attempts, 3);
    assert!(slide1.error.is_none());
    assert_eq!(slide1.public_url, "https://cdn.example/photosynthesis/slide1.jpg");
    assert_eq!(h.generator.calls(), 3 + 5);
}

#[tokio::test]
async fn storage_keys_follow_slug_and_prefix() {
    let storage = StorageConfig::S3(S3Config {
        bucket: "media".into(),
        prefix: "webstories/".into(),
        region: "ap-south-1".into(),
        ..S3Config::default()
    });
    let h = Harness::happy("AI & The Future: Part One");
    create_story_with(&png(8, 8), &h.services(), &config_with(storage))
        .await
        .unwrap();

    let keys = h.cdn.keys();
    assert_eq!(keys[0], "webstories/ai-&-the-future-part-one/slide1.jpg");
    assert_eq!(keys[5], "webstories/ai-&-the-future-part-one/slide6.jpg");
    assert_eq!(keys[6], "webstories/ai-&-the-future-part-one/portrait_cover.jpg");
}

#[tokio::test]
async fn non_json_vision_reply_stops_before_any_image_work() {
    let h = Harness::new(
        FixedChat::ok("Sorry, I can't make out the handwriting."),
        FixedChat::ok(seo_reply()),
        ScriptedGenerator::always_ok(),
    );
    let err = create_story_with(&png(8, 8), &h.services(), &config())
        .await
        .unwrap_err();

    assert!(matches!(err, StoryError::Format { .. }), "got {err:?}");
    assert_eq!(h.generator.calls(), 0);
    assert!(h.cdn.keys().is_empty());
    assert_eq!(h.seo.calls(), 0);
}

#[tokio::test]
async fn vision_upstream_error_is_fatal() {
    let h = Harness::new(
        FixedChat::status(401, "invalid api-key"),
        FixedChat::ok(seo_reply()),
        ScriptedGenerator::always_ok(),
    );
    let err = create_story_with(&png(8, 8), &h.services(), &config())
        .await
        .unwrap_err();
    assert!(matches!(err, StoryError::Upstream { status: 401, .. }));
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn seo_failure_aborts_after_uploads() {
    let h = Harness::new(
        FixedChat::ok(content_reply("Photosynthesis")),
        FixedChat::status(500, "boom"),
        ScriptedGenerator::always_ok(),
    );
    let err = create_story_with(&png(8, 8), &h.services(), &config())
        .await
        .unwrap_err();

    assert!(matches!(err, StoryError::Upstream { status: 500, .. }));
    // uploads are not rolled back
    assert_eq!(h.cdn.keys().len(), 7);
}

#[tokio::test]
async fn vision_request_carries_note_image_and_sampling() {
    let h = Harness::happy("Photosynthesis");
    create_story_with(&png(8, 8), &h.services(), &config())
        .await
        .unwrap();

    let vision = h.chat.requests.lock().unwrap();
    assert_eq!(vision.len(), 1);
    let image = vision[0].image.as_ref().unwrap();
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(vision[0].temperature, 0.7);
    assert_eq!(vision[0].max_tokens, 1000);

    let seo = h.seo.requests.lock().unwrap();
    assert_eq!(seo[0].system, "You are an expert SEO assistant.");
    assert!(seo[0].image.is_none());
    assert!(seo[0].user_text.contains("Photosynthesis"));
    assert!(seo[0].user_text.contains("Chlorophyll captures red and blue light."));
    assert_eq!(seo[0].temperature, 0.5);
    assert_eq!(seo[0].max_tokens, 300);
}

#[tokio::test]
async fn empty_image_is_rejected_before_any_call() {
    let h = Harness::happy("Photosynthesis");
    let err = create_story_with(&[], &h.services(), &config())
        .await
        .unwrap_err();
    assert!(matches!(err, StoryError::InvalidInput { .. }));
    assert_eq!(h.chat.calls(), 0);
}

#[tokio::test]
async fn runs_with_same_replies_are_identical() {
    let first = Harness::happy("Photosynthesis");
    let second = Harness::happy("Photosynthesis");
    let a = create_story_with(&png(8, 8), &first.services(), &config())
        .await
        .unwrap();
    let b = create_story_with(&png(8, 8), &second.services(), &config())
        .await
        .unwrap();

    assert_eq!(a.document.draft, b.document.draft);
    assert_eq!(a.document.seo, b.document.seo);
    assert_eq!(a.json, b.json);
}

#[tokio::test]
async fn progress_events_follow_pipeline_order() {
    let progress = Arc::new(RecordingProgress::default());
    let mut cfg = config();
    cfg.progress_callback = Some(progress.clone());

    let h = Harness::new(
        FixedChat::ok(content_reply("Photosynthesis")),
        FixedChat::ok(seo_reply()),
        ScriptedGenerator::new(&[200, 200, 500, 500, 500]),
    );
    create_story_with(&png(8, 8), &h.services(), &cfg)
        .await
        .unwrap();

    let events = progress.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "stage:extract",
            "stage:illustrate",
            "ok:1",
            "ok:2",
            "fallback:3",
            "ok:4",
            "ok:5",
            "ok:6",
            "stage:annotate",
            "done:5/6",
        ]
    );
}
