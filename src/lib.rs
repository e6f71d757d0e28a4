//! # bookmirror
//!
//! Mirror a multi-page online book into a self-contained, offline-readable
//! HTML bundle.
//!
//! The crawler walks a book's index page, fetches each content page,
//! extracts its article subtree, localizes referenced images, rewrites
//! LaTeX delimiters into MathML and custom diff-style markers into
//! highlight markup, and writes normalized standalone HTML files plus an
//! EPUB-style `nav.xhtml` navigation document and a combined stylesheet.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use url::Url;
//! use bookmirror::{BookCrawler, HttpFetcher};
//!
//! let fetcher = HttpFetcher::new();
//! let book_url = Url::parse("https://wikidocs.net/book/31").unwrap();
//! let crawler = BookCrawler::new(book_url, Path::new("."), &fetcher);
//! let records = crawler.run().unwrap();
//! println!("mirrored {} pages", records.len());
//! ```
//!
//! ## Pipeline
//!
//! Each stage is usable on its own:
//!
//! - [`dom`]: arena DOM parsed by html5ever, with subtree grafting and
//!   deterministic serialization
//! - [`transform`]: per-text-node LaTeX → MathML conversion and marker
//!   expansion
//! - [`assets`]: image localization against a [`Fetcher`]
//! - [`page`]: assembly of one fetched page into the output template
//! - [`toc`]: navigation document generation
//! - [`crawler`]: the orchestrating crawl

pub mod assets;
pub mod crawler;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod page;
pub mod toc;
pub mod transform;
pub(crate) mod util;

pub use crawler::{BookCrawler, LinkRecord, LinkTarget};
pub use error::{Error, Result};
pub use fetch::{Fetcher, HttpFetcher};
pub use page::{AssembledPage, assemble_page};
pub use toc::{PageRecord, build_nav};
