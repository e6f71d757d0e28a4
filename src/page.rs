//! Page assembly: extract the content subtree from a fetched page and
//! re-embed it into the normalized output template.

use std::path::Path;

use log::debug;
use url::Url;

use crate::assets::localize_images;
use crate::dom::Dom;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::transform::transform_document;

/// Class marker identifying the page heading in the fetched document.
const SUBJECT_CLASS: &str = "page-subject";
/// Class marker identifying the reader-visible article body.
const CONTENT_CLASS: &str = "page-content";

/// URL fragment that identifies a math-rendering script. Presence of a
/// matching `<script src>` is the only signal that a page uses LaTeX
/// delimiters; this is best-effort sniffing, kept as-is from the site's
/// observed behavior.
const MATH_SCRIPT_MARKER: &str = "mathjax";

/// Normalized shell every mirrored page is embedded into. The assembler
/// only ever fills the title and the two slot divs.
const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="ko">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title> </title>
<link type="text/css" href="css/default.css" rel="stylesheet"/>
</head>
<body>
<div class="page" id="page">
<div id="page-subject">
</div>
<div id="page-content">
</div>
</div>
</body>
</html>"#;

/// A fully transformed page, ready to be written to disk.
#[derive(Debug, Clone)]
pub struct AssembledPage {
    /// Serialized HTML of the normalized document.
    pub html: String,
    /// Output filename: `{seq:03}_{sanitized title}.html`.
    pub filename: String,
    /// Page title as found in the source document.
    pub title: String,
}

/// Assemble one fetched page into its offline form.
///
/// Extracts the subject and content subtrees from `raw_html`, grafts
/// them into the template, localizes images under `image/<seq>/`, and
/// runs the text transformer over every text node. Returns an error if
/// the expected subject or content subtree is missing, so the caller
/// can skip the page without aborting the crawl.
pub fn assemble_page(
    raw_html: &str,
    page_url: &Url,
    seq: u32,
    out_root: &Path,
    fetcher: &dyn Fetcher,
) -> Result<AssembledPage> {
    let raw = Dom::parse(raw_html);

    let math_enabled = is_math_enabled(&raw);

    let title = raw
        .find_by_tag("title")
        .map(|id| raw.collect_text(id).trim().to_string())
        .unwrap_or_default();
    let filename = format!("{seq:03}_{}.html", sanitize_filename(&title));

    let subject = raw
        .find_by_tag_class("h1", SUBJECT_CLASS)
        .ok_or_else(|| Error::MissingElement(format!("h1.{SUBJECT_CLASS} on {page_url}")))?;
    let content = raw
        .find_by_tag_class("div", CONTENT_CLASS)
        .ok_or_else(|| Error::MissingElement(format!("div.{CONTENT_CLASS} on {page_url}")))?;

    let mut page = Dom::parse(PAGE_TEMPLATE);
    if let Some(title_el) = page.find_by_tag("title") {
        page.set_text(title_el, &title);
    }

    graft(&mut page, &raw, subject, "page-subject")?;
    graft(&mut page, &raw, content, "page-content")?;

    let subdir = seq.to_string();
    let localized = localize_images(&mut page, page_url, &subdir, out_root, fetcher);
    let transformed = transform_document(&mut page, math_enabled);
    debug!(
        "assembled {page_url}: {localized} image(s) localized, \
         {transformed} text node(s) transformed, math_enabled={math_enabled}"
    );

    Ok(AssembledPage {
        html: page.serialize(),
        filename,
        title,
    })
}

/// Copy a subtree out of the fetched document into a template slot.
fn graft(page: &mut Dom, raw: &Dom, src_root: crate::dom::NodeId, slot_id: &str) -> Result<()> {
    let slot = page
        .get_by_id(slot_id)
        .ok_or_else(|| Error::MissingElement(format!("template slot #{slot_id}")))?;
    let copied = page.import_subtree(raw, src_root);
    page.append(slot, copied);
    Ok(())
}

/// Heuristic math detection: any script whose address mentions the
/// math-rendering library.
fn is_math_enabled(dom: &Dom) -> bool {
    dom.find_all_by_tag("script").iter().any(|&script| {
        dom.attr(script, "src")
            .is_some_and(|src| src.contains(MATH_SCRIPT_MARKER))
    })
}

/// Strip characters that are illegal in filenames; everything else is
/// kept as-is.
fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect()
}
