//! Crawl orchestration: walk a book index, mirror every page, and emit
//! the combined stylesheet and navigation document.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use url::{Position, Url};

use crate::dom::{Dom, NodeData, NodeId};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::page::{AssembledPage, assemble_page};
use crate::toc::{PageRecord, build_nav};
use crate::util::decode_text;

/// Class carried by every page link on a book index.
const PAGE_LINK_CLASS: &str = "list-group-item";

/// Matches the `javascript:page(<id>)` pseudo-URL shape used by some
/// index anchors instead of a plain href.
static PAGE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^javascript:page\(\s*(.*?)\s*\)").unwrap());

/// Matches the left-padding declaration that encodes nesting depth.
static PADDING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"padding-left\s*:\s*(\d+)").unwrap());

/// Where a page link points: either a plain URL, or a page id that has
/// to be turned into a same-origin URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Direct(String),
    PageId(String),
}

impl LinkTarget {
    pub fn parse(href: &str) -> Self {
        match PAGE_ID_RE.captures(href) {
            Some(caps) => LinkTarget::PageId(caps[1].to_string()),
            None => LinkTarget::Direct(href.to_string()),
        }
    }

    /// Resolve to an absolute URL against the book index URL.
    pub fn resolve(&self, base: &Url) -> Result<Url> {
        match self {
            LinkTarget::Direct(href) => Ok(base.join(href)?),
            LinkTarget::PageId(id) => {
                Ok(Url::parse(&format!("{}/{}", &base[..Position::BeforePath], id))?)
            }
        }
    }
}

/// One entry of the book index, in document order.
#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub title: String,
    pub target: LinkTarget,
    /// Left-padding of the entry's nested span; 0 = top-level.
    pub indent: u32,
}

/// Mirrors one book into an offline directory tree.
///
/// Pages are fetched and assembled sequentially in book order; the
/// navigation document depends on that ordering and on the monotonic
/// sequence numbers, so there is no parallelism here.
pub struct BookCrawler<'a> {
    book_url: Url,
    base_dir: PathBuf,
    page_offset: u32,
    fetcher: &'a dyn Fetcher,
}

impl<'a> BookCrawler<'a> {
    /// Create a crawler writing under `<out_root>/<book URL path>/`.
    pub fn new(book_url: Url, out_root: &Path, fetcher: &'a dyn Fetcher) -> Self {
        let rel = book_url.path().trim_start_matches('/');
        let base_dir = if rel.is_empty() {
            out_root.to_path_buf()
        } else {
            out_root.join(rel)
        };
        Self {
            book_url,
            base_dir,
            page_offset: 100,
            fetcher,
        }
    }

    /// Set the reserved sequence offset; generated filenames start at
    /// `offset + 1` so they never collide with reserved low numbers.
    pub fn with_page_offset(mut self, offset: u32) -> Self {
        self.page_offset = offset;
        self
    }

    /// Directory the mirrored book is written into.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Mirror the whole book.
    ///
    /// A single page's failure is logged and that page skipped; the
    /// crawl continues and the navigation document covers the pages
    /// that were assembled. Only a failure to fetch the index itself is
    /// fatal.
    pub fn run(&self) -> Result<Vec<PageRecord>> {
        info!("mirroring book index {}", self.book_url);
        let index = self.fetch_document(&self.book_url)?;

        let css_dir = self.base_dir.join("css");
        fs::create_dir_all(&css_dir)?;
        fs::write(css_dir.join("default.css"), self.combined_stylesheet(&index))?;

        let links = extract_links(&index);
        if links.is_empty() {
            warn!("no page links found on {}", self.book_url);
        }

        let mut records = Vec::new();
        for (i, link) in links.iter().enumerate() {
            let seq = self.page_offset + 1 + i as u32;
            let page_url = match link.target.resolve(&self.book_url) {
                Ok(url) => url,
                Err(err) => {
                    warn!("skipping {:?}, unresolvable link: {err}", link.title);
                    continue;
                }
            };
            match self.mirror_page(&page_url, seq) {
                Ok(page) => records.push(PageRecord {
                    title: link.title.clone(),
                    filename: page.filename,
                    indent: link.indent,
                }),
                Err(err) => warn!("skipping page {page_url}: {err}"),
            }
        }

        fs::write(self.base_dir.join("nav.xhtml"), build_nav(&records))?;
        info!(
            "mirrored {} of {} page(s) into {}",
            records.len(),
            links.len(),
            self.base_dir.display()
        );
        Ok(records)
    }

    /// Mirror a single page and write it under the base directory.
    pub fn mirror_page(&self, url: &Url, seq: u32) -> Result<AssembledPage> {
        info!("downloading page {url}");
        let bytes = self.fetcher.fetch(url)?;
        let html = decode_text(&bytes);

        fs::create_dir_all(&self.base_dir)?;
        let page = assemble_page(&html, url, seq, &self.base_dir, self.fetcher)?;
        fs::write(self.base_dir.join(&page.filename), &page.html)?;
        info!("saved {}", page.filename);
        Ok(page)
    }

    fn fetch_document(&self, url: &Url) -> Result<Dom> {
        let bytes = self.fetcher.fetch(url)?;
        Ok(Dom::parse(&decode_text(&bytes)))
    }

    /// Concatenate every linked stylesheet and inline style block, each
    /// preceded by a provenance comment. A stylesheet that fails to
    /// download contributes nothing beyond a warning.
    fn combined_stylesheet(&self, index: &Dom) -> String {
        let mut css = String::new();

        for link in index.find_all(is_stylesheet_link) {
            let Some(href) = index.attr(link, "href") else {
                continue;
            };
            let css_url = match self.book_url.join(href) {
                Ok(url) => url,
                Err(err) => {
                    warn!("unresolvable stylesheet href {href:?}: {err}");
                    continue;
                }
            };
            match self.fetcher.fetch(&css_url) {
                Ok(bytes) => {
                    let _ = write!(css, "\n/* From {css_url} */\n");
                    css.push_str(&decode_text(&bytes));
                }
                Err(err) => warn!("stylesheet download failed: {err}"),
            }
        }

        for style in index.find_all_by_tag("style") {
            css.push_str("\n/* Inline <style> */\n");
            css.push_str(&index.collect_text(style));
        }

        css
    }
}

fn is_stylesheet_link(node: &crate::dom::Node) -> bool {
    match &node.data {
        NodeData::Element { name, attrs, .. } => {
            name.local.as_ref() == "link"
                && attrs
                    .iter()
                    .any(|a| a.name.local.as_ref() == "rel" && a.value == "stylesheet")
        }
        _ => false,
    }
}

/// Enumerate the index's page links with their nesting metadata.
pub fn extract_links(index: &Dom) -> Vec<LinkRecord> {
    let mut links = Vec::new();
    for anchor in index.find_all(|node| {
        matches!(&node.data, NodeData::Element { name, classes, .. }
            if name.local.as_ref() == "a" && classes.iter().any(|c| c == PAGE_LINK_CLASS))
    }) {
        let Some(href) = index.attr(anchor, "href") else {
            continue;
        };
        let title = match index.attr(anchor, "title") {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => index.collect_text(anchor).trim().to_string(),
        };
        links.push(LinkRecord {
            title,
            target: LinkTarget::parse(href),
            indent: indent_of(index, anchor),
        });
    }
    links
}

/// Nesting depth of an index entry, read from the left-padding of a
/// span nested inside the anchor. Absent padding means top-level.
fn indent_of(index: &Dom, anchor: NodeId) -> u32 {
    let mut stack: Vec<NodeId> = index.children(anchor).collect();
    while let Some(id) = stack.pop() {
        if index.element_name(id).is_some_and(|n| n.as_ref() == "span") {
            if let Some(style) = index.attr(id, "style") {
                if let Some(caps) = PADDING_RE.captures(style) {
                    return caps[1].parse().unwrap_or(0);
                }
            }
        }
        stack.extend(index.children(id));
    }
    0
}
