//! Navigation document generation.
//!
//! The crawl produces a flat, indentation-annotated sequence of page
//! records; this module folds it into a two-level EPUB-style `nav.xhtml`
//! outline. Output is byte-stable: the same record sequence always
//! yields identical text.

use std::fmt::Write;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::util::escape_html;

/// One assembled page, in crawl order.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub title: String,
    pub filename: String,
    /// Indentation of the page's index entry; 0 = top-level.
    pub indent: u32,
}

/// Characters kept literal when encoding hrefs, matching the unreserved
/// set of RFC 3986.
const HREF_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const NAV_HEADER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>

<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="ko" xml:lang="ko">
<head>
  <title>ePub NAV</title>
  <meta charset="utf-8"/>
  <link href="css/default.css" rel="stylesheet" type="text/css"/>
</head>
<body epub:type="frontmatter">
  <nav epub:type="toc" id="toc" role="doc-toc">
    <h1>차례</h1>
    <ol>
"#;

const NAV_FOOTER: &str = r#"    </ol>
  </nav>
</body>
</html>"#;

/// Build the `nav.xhtml` navigation document.
///
/// Records with indent 0 open a new top-level entry; every following
/// record with indent > 0 joins that entry's sublist, until the next
/// top-level record. Each top-level entry always carries a sublist
/// element, possibly empty. A leading record with indent > 0 (no
/// top-level entry seen yet) is grouped under an implicit head-less
/// placeholder entry rather than being dropped.
pub fn build_nav(records: &[PageRecord]) -> String {
    let mut groups: Vec<(Option<&PageRecord>, Vec<&PageRecord>)> = Vec::new();

    for record in records {
        if record.indent == 0 {
            groups.push((Some(record), Vec::new()));
        } else {
            if groups.is_empty() {
                groups.push((None, Vec::new()));
            }
            groups.last_mut().unwrap().1.push(record);
        }
    }

    let mut nav = String::from(NAV_HEADER);
    for (head, children) in &groups {
        match head {
            Some(record) => {
                let _ = writeln!(nav, "      <li>{}", nav_link(record));
            }
            None => nav.push_str("      <li>\n"),
        }
        nav.push_str("        <ol>\n");
        for child in children {
            let _ = writeln!(nav, "          <li>{}</li>", nav_link(child));
        }
        nav.push_str("        </ol>\n");
        nav.push_str("      </li>\n");
    }
    nav.push_str(NAV_FOOTER);
    nav
}

fn nav_link(record: &PageRecord) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        encode_href(&record.filename),
        escape_html(&record.title)
    )
}

/// Percent-encode a filename for use as an href.
///
/// Characters below U+0100 are encoded per [`HREF_SAFE`]; anything
/// above passes through raw, mirroring how the mirrored filenames keep
/// their non-Latin characters readable on disk.
fn encode_href(filename: &str) -> String {
    let mut out = String::with_capacity(filename.len());
    let mut buf = [0u8; 4];
    for c in filename.chars() {
        if (c as u32) < 0x100 {
            let _ = write!(out, "{}", utf8_percent_encode(c.encode_utf8(&mut buf), HREF_SAFE));
        } else {
            out.push(c);
        }
    }
    out
}
