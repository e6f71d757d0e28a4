//! End-to-end crawl against an in-memory fetcher: a synthetic 3-page
//! book index with one nested link.

use std::collections::HashMap;
use std::fs;

use url::Url;

use bookmirror::{BookCrawler, Error, Fetcher, Result};

struct MapFetcher(HashMap<String, Vec<u8>>);

impl MapFetcher {
    fn insert(&mut self, url: &str, body: impl Into<Vec<u8>>) {
        self.0.insert(url.to_string(), body.into());
    }
}

impl Fetcher for MapFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        self.0.get(url.as_str()).cloned().ok_or_else(|| Error::Fetch {
            url: url.to_string(),
            reason: "not found".to_string(),
        })
    }
}

fn page_html(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{title}</title></head>\
         <body><h1 class=\"page-subject\">{title}</h1>\
         <div class=\"page-content\">{body}</div></body></html>"
    )
}

fn book_fetcher() -> MapFetcher {
    let mut fetcher = MapFetcher(HashMap::new());

    fetcher.insert(
        "https://example.com/book/31",
        "<html><head>\
         <link rel=\"stylesheet\" href=\"/static/site.css\">\
         <style>.page { margin: 0; }</style>\
         </head><body>\
         <a class=\"list-group-item\" href=\"/204\" title=\"Intro\">\
           <span style=\"padding-left: 0px\">Intro</span></a>\
         <a class=\"list-group-item\" href=\"javascript:page(205)\" title=\"Nested\">\
           <span style=\"padding-left: 20px\">Nested</span></a>\
         <a class=\"list-group-item\" href=\"/206\" title=\"Outro\">Outro</a>\
         </body></html>",
    );
    fetcher.insert("https://example.com/static/site.css", "body { color: black; }");
    fetcher.insert("https://example.com/204", page_html("Intro", "<p>welcome</p>"));
    fetcher.insert(
        "https://example.com/205",
        page_html("Nested", "<p><img src=\"/img/fig.png\"></p>"),
    );
    fetcher.insert("https://example.com/206", page_html("Outro", "<p>bye</p>"));
    fetcher.insert("https://example.com/img/fig.png", vec![0x89u8, 0x50]);

    fetcher
}

#[test]
fn test_full_crawl() {
    let fetcher = book_fetcher();
    let tmp = tempfile::tempdir().unwrap();
    let book_url = Url::parse("https://example.com/book/31").unwrap();

    let crawler = BookCrawler::new(book_url, tmp.path(), &fetcher);
    let records = crawler.run().unwrap();

    // Base directory derives from the book URL path
    let base = tmp.path().join("book/31");
    assert_eq!(crawler.base_dir(), base);

    // Three pages, sequence-prefixed above the reserved offset
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].filename, "101_Intro.html");
    assert_eq!(records[1].filename, "102_Nested.html");
    assert_eq!(records[2].filename, "103_Outro.html");
    assert_eq!(records[1].indent, 20);

    for record in &records {
        assert!(base.join(&record.filename).exists());
    }

    // The nested page's image was localized
    let nested = fs::read_to_string(base.join("102_Nested.html")).unwrap();
    assert!(nested.contains("src=\"image/102/fig.png\""));
    assert_eq!(fs::read(base.join("image/102/fig.png")).unwrap(), [0x89, 0x50]);

    // Every page points at the combined stylesheet
    assert!(nested.contains("href=\"css/default.css\""));

    // Stylesheet carries provenance comments for both sources
    let css = fs::read_to_string(base.join("css/default.css")).unwrap();
    assert!(css.contains("/* From https://example.com/static/site.css */"));
    assert!(css.contains("body { color: black; }"));
    assert!(css.contains("/* Inline <style> */"));
    assert!(css.contains(".page { margin: 0; }"));

    // nav.xhtml reflects the nesting: Nested sits inside Intro's sublist
    let nav = fs::read_to_string(base.join("nav.xhtml")).unwrap();
    let intro = nav.find("101_Intro.html").unwrap();
    let nested_pos = nav.find("102_Nested.html").unwrap();
    let outro = nav.find("103_Outro.html").unwrap();
    assert!(intro < nested_pos && nested_pos < outro);
    assert_eq!(nav.matches("\n      <li>").count(), 2);
    assert!(nav.contains(">Nested</a>"));
}

#[test]
fn test_failed_page_is_skipped_and_crawl_continues() {
    let mut fetcher = book_fetcher();
    fetcher.0.remove("https://example.com/205");

    let tmp = tempfile::tempdir().unwrap();
    let book_url = Url::parse("https://example.com/book/31").unwrap();
    let crawler = BookCrawler::new(book_url, tmp.path(), &fetcher);
    let records = crawler.run().unwrap();

    // The unreachable page is missing; its neighbors keep their numbers
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].filename, "101_Intro.html");
    assert_eq!(records[1].filename, "103_Outro.html");

    let base = tmp.path().join("book/31");
    assert!(base.join("nav.xhtml").exists());
    let nav = fs::read_to_string(base.join("nav.xhtml")).unwrap();
    assert!(!nav.contains("Nested"));
}

#[test]
fn test_unreachable_index_is_fatal() {
    let fetcher = MapFetcher(HashMap::new());
    let tmp = tempfile::tempdir().unwrap();
    let book_url = Url::parse("https://example.com/book/31").unwrap();

    let crawler = BookCrawler::new(book_url, tmp.path(), &fetcher);
    assert!(matches!(crawler.run(), Err(Error::Fetch { .. })));
}

#[test]
fn test_single_page_mirror() {
    let fetcher = book_fetcher();
    let tmp = tempfile::tempdir().unwrap();
    let book_url = Url::parse("https://example.com/book/31").unwrap();

    let crawler = BookCrawler::new(book_url, tmp.path(), &fetcher);
    let page_url = Url::parse("https://example.com/204").unwrap();
    let page = crawler.mirror_page(&page_url, 100).unwrap();

    assert_eq!(page.filename, "100_Intro.html");
    assert!(tmp.path().join("book/31").join(&page.filename).exists());
}
