//! End-to-end pipeline runs against in-memory collaborators.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quill_core::{
    FeedEntry, FeedSource, GenerationRequest, Generator, ImageHost, ImageOrigin, PageFetcher, Pipeline, Progress,
    PublishOutcome, PublishTransport, QuillConfig, QuillError, Result, RunMode, Services, Stage, Topic,
};
use serde_json::{Value, json};

const SIGNATURE: &str = "*Written by the test desk.*";

struct Feeds(Option<Vec<FeedEntry>>);

#[async_trait]
impl FeedSource for Feeds {
    async fn entries(&self, url: &str) -> Result<Vec<FeedEntry>> {
        match &self.0 {
            Some(entries) => Ok(entries.clone()),
            None => Err(QuillError::FeedError(format!("{} is down", url))),
        }
    }
}

struct Pages(Option<String>);

#[async_trait]
impl PageFetcher for Pages {
    async fn fetch(&self, _url: &str) -> Result<String> {
        self.0.clone().ok_or_else(|| QuillError::InvalidUrl("unreachable".to_string()))
    }
}

/// Answers each kind of generation call with a canned reply.
struct Desk {
    topic: String,
    relevance: String,
    article: Option<String>,
    seo: String,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl Desk {
    fn new(topic: &str, article: &str) -> Self {
        Self {
            topic: topic.to_string(),
            relevance: "REPLACE".to_string(),
            article: Some(article.to_string()),
            seo: r#"{"slug": "resilience-patterns", "meta_title": "Resilience patterns", "meta_description": "How systems survive."}"#
                .to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn count(&self, needle: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| r.prompt.contains(needle)).count()
    }
}

#[async_trait]
impl Generator for Desk {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let prompt = request.prompt.as_str();

        if prompt.contains("art critic") {
            Ok("ACCEPT".to_string())
        } else if request.image_url.is_some() {
            Ok(self.relevance.clone())
        } else if prompt.contains("editor-in-chief") {
            Ok(self.topic.clone())
        } else if prompt.contains("Write a technical blog article") {
            self.article.clone().ok_or_else(|| QuillError::GenerationError("model overloaded".to_string()))
        } else if prompt.contains("SEO specialist") {
            Ok(self.seo.clone())
        } else {
            // Art direction and cleanup rewrite are left to their fallbacks.
            Err(QuillError::GenerationError("not scripted".to_string()))
        }
    }
}

#[derive(Default)]
struct Host {
    renders: AtomicUsize,
}

#[async_trait]
impl ImageHost for Host {
    fn render_url(&self, _prompt: &str) -> String {
        let n = self.renders.fetch_add(1, Ordering::SeqCst) + 1;
        format!("https://img.test/{}.png", n)
    }

    async fn wait_until_ready(&self, _url: &str) -> bool {
        true
    }
}

struct Transport {
    replies: Mutex<Vec<Value>>,
    calls: Mutex<Vec<(String, Option<Value>)>>,
}

impl Transport {
    fn new(publish_replies: Vec<Value>) -> Self {
        let mut replies = vec![json!({ "data": { "me": { "publications": { "edges": [{ "node": { "id": "pub-1" } }] } } } })];
        replies.extend(publish_replies);
        Self { replies: Mutex::new(replies), calls: Mutex::new(Vec::new()) }
    }

    fn publish_inputs(&self) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, variables)| variables.as_ref().map(|v| v["input"].clone()))
            .collect()
    }
}

#[async_trait]
impl PublishTransport for Transport {
    async fn execute(&self, query: &str, variables: Option<Value>) -> Result<Value> {
        self.calls.lock().unwrap().push((query.to_string(), variables));
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(QuillError::publish("unexpected call"));
        }
        Ok(replies.remove(0))
    }
}

fn published(url: &str) -> Value {
    json!({ "data": { "publishPost": { "post": { "url": url } } } })
}

fn config(placeholders: usize) -> QuillConfig {
    QuillConfig::builder()
        .generation_api_key("g")
        .publish_api_key("p")
        .signature(SIGNATURE)
        .placeholder_count(placeholders)
        .feeds(vec!["https://feeds.test/a".to_string(), "https://feeds.test/b".to_string()])
        .build()
}

struct Harness {
    desk: Arc<Desk>,
    host: Arc<Host>,
    transport: Arc<Transport>,
    pipeline: Pipeline,
}

fn harness(feeds: Feeds, pages: Pages, desk: Desk, transport: Transport, config: QuillConfig) -> Harness {
    let desk = Arc::new(desk);
    let host = Arc::new(Host::default());
    let transport = Arc::new(transport);
    let services = Services {
        feeds: Arc::new(feeds),
        pages: Arc::new(pages),
        generator: desk.clone(),
        images: host.clone(),
        transport: transport.clone(),
    };
    Harness { desk, host, transport, pipeline: Pipeline::new(services, config) }
}

fn headlines() -> Feeds {
    Feeds(Some(vec![
        FeedEntry::new("Postgres 18 released", "https://news.test/pg18"),
        FeedEntry::new("A new scheduler for Linux", "https://news.test/sched"),
    ]))
}

const TOPIC: &str = r#"{"title": "What Postgres 18 Changes", "original_link": "https://news.test/pg18",
    "summary": "A tour.", "keywords": ["Postgres", "Databases"]}"#;

const ARTICLE_WITH_MARKERS: &str = "Sure, here is the article!\n\n# What Postgres 18 Changes\n\nIntro.\n\n\
    ## Async I/O\n\n![IMG_PROMPT: disks spinning]\n\nText.\n\n**H2: Planner**\n\n[IMG PROMPT - a query plan]\n\n\
    ## Upgrades\n\n{img_prompt: a migration path}\n\nDone.\n\n*Written by the test desk.*\n";

async fn run(h: &Harness, mode: RunMode) -> (Result<quill_core::RunReport>, Vec<Progress>) {
    let mut events = Vec::new();
    let mut record = |p: Progress| events.push(p);
    let result = h.pipeline.run(mode, &mut record).await;
    (result, events)
}

#[tokio::test]
async fn test_dead_feeds_fall_back_and_still_publish() {
    let h = harness(
        Feeds(None),
        Pages(None),
        Desk::new("[]", "# T\n\n## One\n\nBody.\n"),
        Transport::new(vec![published("https://blog.test/resilience")]),
        config(2),
    );

    let (result, events) = run(&h, RunMode::Publish).await;
    let report = result.unwrap();

    assert_eq!(report.topic, Topic::fallback());
    assert_eq!(report.document.title, Topic::fallback().title);
    assert_eq!(
        report.receipt.unwrap().outcome,
        PublishOutcome::Published { url: "https://blog.test/resilience".to_string() }
    );
    assert_eq!(h.transport.publish_inputs().len(), 1);
    assert!(events.contains(&Progress::Started(Stage::Publish)));
}

#[tokio::test]
async fn test_three_markers_become_three_images() {
    let h = harness(
        headlines(),
        Pages(None),
        Desk::new(TOPIC, ARTICLE_WITH_MARKERS),
        Transport::new(vec![published("https://blog.test/pg18")]),
        config(3),
    );

    let report = run(&h, RunMode::Publish).await.0.unwrap();
    let body = &report.document.markdown_body;

    assert_eq!(report.inline_images.len(), 3);
    assert!(!body.contains("IMG_PROMPT") && !body.to_lowercase().contains("img prompt"));
    assert!(body.contains("![disks spinning](https://img.test/2.png)\n\n*disks spinning*"));
    assert!(body.contains("![a query plan](https://img.test/3.png)"));
    assert!(body.contains("![a migration path](https://img.test/4.png)"));
    assert!(body.contains("## Planner"));
    assert!(!body.contains("Sure, here is"));
    assert!(!body.starts_with("# "));
    assert_eq!(body.matches(SIGNATURE).count(), 1);

    let input = &h.transport.publish_inputs()[0];
    assert_eq!(input["slug"], "resilience-patterns");
    assert_eq!(input["publicationId"], "pub-1");
    let tags: Vec<&str> = input["tags"].as_array().unwrap().iter().map(|t| t["slug"].as_str().unwrap()).collect();
    assert_eq!(tags, vec!["engineering", "postgres", "databases"]);
}

#[tokio::test]
async fn test_kept_source_image_becomes_cover_without_rendering() {
    let page = r#"<html><head><meta property="og:image" content="https://news.test/pg18.jpg"></head></html>"#;
    let mut desk = Desk::new(TOPIC, "# T\n\nNo sections at all.\n");
    desk.relevance = "Keep".to_string();
    let h = harness(
        headlines(),
        Pages(Some(page.to_string())),
        desk,
        Transport::new(vec![published("https://blog.test/pg18")]),
        config(2),
    );

    let report = run(&h, RunMode::Publish).await.0.unwrap();

    assert_eq!(report.cover.url, "https://news.test/pg18.jpg");
    assert_eq!(report.cover.origin, ImageOrigin::Sourced);
    assert_eq!(h.host.renders.load(Ordering::SeqCst), 0);
    let input = &h.transport.publish_inputs()[0];
    assert_eq!(input["coverImageOptions"]["coverImageURL"], "https://news.test/pg18.jpg");
}

#[tokio::test]
async fn test_cover_rejection_is_retried_once_without_cover() {
    let h = harness(
        headlines(),
        Pages(None),
        Desk::new(TOPIC, ARTICLE_WITH_MARKERS),
        Transport::new(vec![
            json!({ "errors": [{ "message": "Invalid coverImageURL: could not fetch image" }] }),
            published("https://blog.test/pg18"),
        ]),
        config(3),
    );

    let receipt = run(&h, RunMode::Publish).await.0.unwrap().receipt.unwrap();

    assert!(receipt.cover_dropped);
    let inputs = h.transport.publish_inputs();
    assert_eq!(inputs.len(), 2);
    assert!(inputs[0].get("coverImageOptions").is_some());
    assert!(inputs[1].get("coverImageOptions").is_none());
    assert_eq!(h.transport.calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_dry_run_never_touches_the_platform() {
    let h = harness(headlines(), Pages(None), Desk::new(TOPIC, ARTICLE_WITH_MARKERS), Transport::new(vec![]), config(3));

    let (result, events) = run(&h, RunMode::DryRun).await;
    let report = result.unwrap();

    assert!(report.receipt.is_none());
    assert!(h.transport.calls.lock().unwrap().is_empty());
    assert!(!events.contains(&Progress::Started(Stage::Publish)));
    let rendered = report.document.render();
    assert!(rendered.starts_with("+++\ntitle = \"What Postgres 18 Changes\"\n"));
    assert!(rendered.contains("slug = \"resilience-patterns\""));
}

#[tokio::test]
async fn test_draft_failure_ends_the_run() {
    let mut desk = Desk::new(TOPIC, "");
    desk.article = None;
    let h = harness(headlines(), Pages(None), desk, Transport::new(vec![]), config(2));

    let (result, _) = run(&h, RunMode::Publish).await;

    assert!(matches!(result, Err(QuillError::GenerationError(_))));
    assert!(h.transport.calls.lock().unwrap().is_empty());
    assert_eq!(h.desk.count("SEO specialist"), 0);
}

#[tokio::test]
async fn test_publication_lookup_failure_is_fatal() {
    let h = harness(headlines(), Pages(None), Desk::new(TOPIC, ARTICLE_WITH_MARKERS), Transport::new(vec![]), config(3));
    h.transport.replies.lock().unwrap()[0] = json!({ "errors": [{ "message": "Invalid token" }] });

    let (result, _) = run(&h, RunMode::Publish).await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Invalid token"));
    assert_eq!(h.transport.calls.lock().unwrap().len(), 1);
}
