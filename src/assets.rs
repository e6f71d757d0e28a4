//! Image localization: download referenced images and rewrite their
//! `src` attributes to local relative paths.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use percent_encoding::percent_decode_str;
use url::Url;

use crate::dom::Dom;
use crate::fetch::Fetcher;

/// Localize every `<img>` in the document.
///
/// Each image reference is resolved against `page_url`, fetched, and
/// written to `<out_root>/image/<subdir>/<decoded-name>`; the `src`
/// attribute is rewritten to the matching relative path (always forward
/// slashes). Images are independent: a failed fetch is logged and that
/// reference is left as it was, pointing at the remote original.
///
/// Two distinct source URLs can decode to the same final path segment;
/// in that case the last write wins.
///
/// Returns the number of localized images.
pub fn localize_images(
    dom: &mut Dom,
    page_url: &Url,
    subdir: &str,
    out_root: &Path,
    fetcher: &dyn Fetcher,
) -> usize {
    let mut localized = 0;

    for img in dom.find_all_by_tag("img") {
        let Some(src) = dom.attr(img, "src").map(str::to_string) else {
            continue;
        };

        let img_url = match page_url.join(&src) {
            Ok(url) => url,
            Err(err) => {
                warn!("unresolvable image reference {src:?} on {page_url}: {err}");
                continue;
            }
        };

        let Some(name) = local_image_name(&img_url) else {
            warn!("image URL has no usable filename: {img_url}");
            continue;
        };

        let bytes = match fetcher.fetch(&img_url) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("image download failed, keeping remote reference: {err}");
                continue;
            }
        };

        let dir = out_root.join("image").join(subdir);
        let local_path = dir.join(&name);
        if let Err(err) = fs::create_dir_all(&dir).and_then(|_| fs::write(&local_path, &bytes)) {
            warn!("could not write {}: {err}", local_path.display());
            continue;
        }
        debug!("downloaded {img_url} -> {}", local_path.display());

        // Relative path within the page's output directory; forward
        // slashes regardless of platform.
        dom.set_attr(img, "src", &format!("image/{subdir}/{name}"));
        localized += 1;
    }

    localized
}

/// Derive the local filename: final path segment, percent-decoded.
fn local_image_name(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    if segment.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(segment).decode_utf8_lossy().to_string();
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use std::collections::HashMap;

    struct MapFetcher(HashMap<String, Vec<u8>>);

    impl Fetcher for MapFetcher {
        fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
            self.0.get(url.as_str()).cloned().ok_or_else(|| Error::Fetch {
                url: url.to_string(),
                reason: "not found".to_string(),
            })
        }
    }

    fn page_url() -> Url {
        Url::parse("https://example.com/book/204").unwrap()
    }

    #[test]
    fn test_localizes_relative_and_absolute_sources() {
        let mut dom = Dom::parse(
            "<html><body>\
             <img src=\"/images/a.png\">\
             <img src=\"https://cdn.example.com/pics/b%20c.jpg\">\
             </body></html>",
        );
        let fetcher = MapFetcher(HashMap::from([
            ("https://example.com/images/a.png".to_string(), vec![1u8, 2]),
            (
                "https://cdn.example.com/pics/b%20c.jpg".to_string(),
                vec![3u8],
            ),
        ]));

        let tmp = tempfile::tempdir().unwrap();
        let count = localize_images(&mut dom, &page_url(), "101", tmp.path(), &fetcher);
        assert_eq!(count, 2);

        let imgs = dom.find_all_by_tag("img");
        assert_eq!(dom.attr(imgs[0], "src"), Some("image/101/a.png"));
        // Percent-decoded final segment
        assert_eq!(dom.attr(imgs[1], "src"), Some("image/101/b c.jpg"));

        assert_eq!(fs::read(tmp.path().join("image/101/a.png")).unwrap(), [1, 2]);
        assert_eq!(fs::read(tmp.path().join("image/101/b c.jpg")).unwrap(), [3]);
    }

    #[test]
    fn test_failed_fetch_keeps_remote_reference() {
        let mut dom = Dom::parse(
            "<html><body><img src=\"https://example.com/gone.png\"></body></html>",
        );
        let fetcher = MapFetcher(HashMap::new());

        let tmp = tempfile::tempdir().unwrap();
        let count = localize_images(&mut dom, &page_url(), "101", tmp.path(), &fetcher);
        assert_eq!(count, 0);

        let img = dom.find_by_tag("img").unwrap();
        assert_eq!(dom.attr(img, "src"), Some("https://example.com/gone.png"));
        assert!(!tmp.path().join("image").exists());
    }

    #[test]
    fn test_one_failure_does_not_abort_others() {
        let mut dom = Dom::parse(
            "<html><body>\
             <img src=\"https://example.com/gone.png\">\
             <img src=\"https://example.com/ok.png\">\
             </body></html>",
        );
        let fetcher = MapFetcher(HashMap::from([(
            "https://example.com/ok.png".to_string(),
            vec![7u8],
        )]));

        let tmp = tempfile::tempdir().unwrap();
        let count = localize_images(&mut dom, &page_url(), "102", tmp.path(), &fetcher);
        assert_eq!(count, 1);

        let imgs = dom.find_all_by_tag("img");
        assert_eq!(dom.attr(imgs[0], "src"), Some("https://example.com/gone.png"));
        assert_eq!(dom.attr(imgs[1], "src"), Some("image/102/ok.png"));
    }
}
