// ABOUTME: End-to-end extraction tests against a local mock server.
// ABOUTME: Covers body policies, batch numbering, the cookie challenge and HTTP failures.

use std::fs;
use std::time::Duration;

use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tintuc::{
    ArticleRecord, BatchWriter, ErrorCode, ExtractionPolicy, Extractor, SiteProfile, SiteRegistry,
};

fn article_page(paragraphs: usize) -> String {
    let body: String = (1..=paragraphs)
        .map(|i| format!("<p>Đoạn văn số {}.</p>", i))
        .collect();
    format!(
        r#"<html lang="vi"><head>
<meta property="og:title" content="Bản tin thử nghiệm">
<meta name="copyright" content="Tòa soạn">
<script type="application/ld+json">{{"@type":"NewsArticle","author":{{"name":"Lê Văn A"}},"datePublished":"2025-01-02"}}</script>
</head><body><article class="body">{}</article></body></html>"#,
        body
    )
}

fn local_registry() -> SiteRegistry {
    let mut registry = SiteRegistry::new();
    registry.register(SiteProfile::new("127.0.0.1", "article.body"));
    registry
}

fn extractor(policy: ExtractionPolicy) -> Extractor {
    Extractor::builder()
        .registry(local_registry())
        .policy(policy)
        .challenge_delay(Duration::from_millis(10))
        .timeout(Duration::from_secs(5))
        .seed(42)
        .build()
        .unwrap()
}

#[test]
fn fetches_and_keeps_first_paragraphs() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/tin/1");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(article_page(5));
    });

    let mut ex = extractor(ExtractionPolicy::ParagraphCount {
        count: 3,
        random: false,
    });
    let record = ex.extract_one(&server.url("/tin/1")).unwrap();
    mock.assert();

    assert_eq!(record.source, "127.0.0.1");
    assert_eq!(record.content_type, "article");
    assert_eq!(record.title.as_deref(), Some("Bản tin thử nghiệm"));
    assert_eq!(record.author.as_deref(), Some("Lê Văn A"));
    assert_eq!(record.date_published.as_deref(), Some("2025-01-02"));
    assert_eq!(record.date_modified, None);
    assert_eq!(
        record.body.as_deref(),
        Some("Đoạn văn số 1.\nĐoạn văn số 2.\nĐoạn văn số 3.")
    );
}

#[test]
fn random_window_is_contiguous() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/tin/dai");
        then.status(200).body(article_page(10));
    });

    let mut ex = extractor(ExtractionPolicy::ParagraphCount {
        count: 3,
        random: true,
    });
    let record = ex.extract_one(&server.url("/tin/dai")).unwrap();
    let lines: Vec<&str> = record.body.as_deref().unwrap().lines().collect();
    assert_eq!(lines.len(), 3);

    let first: usize = lines[0]
        .trim_start_matches("Đoạn văn số ")
        .trim_end_matches('.')
        .parse()
        .unwrap();
    for (offset, line) in lines.iter().enumerate() {
        assert_eq!(*line, format!("Đoạn văn số {}.", first + offset));
    }
}

#[test]
fn word_limit_caps_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/tin/2");
        then.status(200).body(article_page(4));
    });

    let mut ex = extractor(ExtractionPolicy::WordLimit(6));
    let record = ex.extract_one(&server.url("/tin/2")).unwrap();
    assert_eq!(record.word_count(), 6);
    assert_eq!(record.body.as_deref(), Some("Đoạn văn số 1. Đoạn văn"));
}

#[test]
fn batch_writes_successes_and_reports_missing_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/a");
        then.status(200).body(article_page(2));
    });
    server.mock(|when, then| {
        when.method(GET).path("/trong");
        then.status(200)
            .body("<html><body><div>Không có bài</div></body></html>");
    });
    server.mock(|when, then| {
        when.method(GET).path("/b");
        then.status(200).body(article_page(3));
    });

    let tmp = TempDir::new().unwrap();
    let mut ex = extractor(ExtractionPolicy::All);
    let mut writer = BatchWriter::new(tmp.path()).unwrap();
    let urls = [server.url("/a"), server.url("/trong"), server.url("/b")];
    let report = writer.run(&mut ex, &urls);

    assert_eq!(
        report.written,
        vec![tmp.path().join("127_1.json"), tmp.path().join("127_2.json")]
    );
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].url, urls[1]);
    assert_eq!(report.failures[0].code, ErrorCode::NoContent);

    let second: ArticleRecord =
        serde_json::from_str(&fs::read_to_string(&report.written[1]).unwrap()).unwrap();
    assert_eq!(second.word_count(), 12);
}

#[test]
fn cookie_challenge_is_answered_once() {
    let server = MockServer::start();
    let challenge = server.mock(|when, then| {
        when.method(GET).path("/bao-ve").header_missing("cookie");
        then.status(200).body(
            r#"<html><head><script>document.cookie="D1N=5f1c2a9e; path=/";window.location.reload(true);</script></head></html>"#,
        );
    });
    let article = server.mock(|when, then| {
        when.method(GET)
            .path("/bao-ve")
            .header("cookie", "D1N=5f1c2a9e");
        then.status(200).body(article_page(2));
    });

    let mut ex = extractor(ExtractionPolicy::All);
    let url = server.url("/bao-ve");
    let record = ex.extract_one(&url).unwrap();

    challenge.assert_hits(1);
    article.assert_hits(1);
    assert_eq!(record.body.as_deref(), Some("Đoạn văn số 1.\nĐoạn văn số 2."));
    assert_eq!(
        ex.session().cookie_header(&url).as_deref(),
        Some("D1N=5f1c2a9e")
    );
}

#[test]
fn answered_challenge_carries_over_to_other_articles() {
    let server = MockServer::start();
    let challenge_page = r#"<script>document.cookie="D1N=abc; path=/";window.location.reload();</script>"#;
    let mut challenges = Vec::new();
    let mut articles = Vec::new();
    for path in ["/threads/bai-mot.3633/", "/threads/bai-hai.3634/"] {
        challenges.push(server.mock(|when, then| {
            when.method(GET).path(path).header_missing("cookie");
            then.status(200).body(challenge_page);
        }));
        articles.push(server.mock(|when, then| {
            when.method(GET).path(path).header("cookie", "D1N=abc");
            then.status(200).body(article_page(1));
        }));
    }

    let mut ex = extractor(ExtractionPolicy::All);
    let urls = [
        server.url("/threads/bai-mot.3633/"),
        server.url("/threads/bai-hai.3634/"),
    ];
    for outcome in ex.extract_many(&urls) {
        assert_eq!(outcome.unwrap().body.as_deref(), Some("Đoạn văn số 1."));
    }

    challenges[0].assert_hits(1);
    challenges[1].assert_hits(0);
    articles[0].assert_hits(1);
    articles[1].assert_hits(1);
    assert_eq!(
        ex.session().cookie_header(&server.url("/")).as_deref(),
        Some("D1N=abc")
    );
}

#[test]
fn non_200_is_fetch_error_with_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/mat");
        then.status(404).body("not found");
    });

    let mut ex = extractor(ExtractionPolicy::All);
    let url = server.url("/mat");
    let err = ex.extract_one(&url).unwrap_err();
    assert_eq!(err.code, ErrorCode::Fetch);
    assert_eq!(err.status, Some(404));
    assert_eq!(err.url, url);
}

#[test]
fn unreachable_host_is_fetch_error() {
    let mut ex = extractor(ExtractionPolicy::All);
    // port 9 is discard; nothing listens there in the test environment
    let err = ex.extract_one("http://127.0.0.1:9/tin").unwrap_err();
    assert!(err.is_fetch());
    assert_eq!(err.status, None);
}
