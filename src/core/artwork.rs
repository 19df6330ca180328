use once_cell::sync::Lazy;
use regex::Regex;

static SIZE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+x\d+bb").expect("valid size token pattern"));

/// Rewrites the `<W>x<H>bb` thumbnail token of an artwork URL to request a
/// `size`x`size` rendition. URLs without the token are returned unchanged.
///
/// `.../100x100bb.jpg` → `.../600x600bb.jpg`
pub fn upgrade_artwork_url(url: &str, size: u32) -> String {
    SIZE_TOKEN
        .replace(url, format!("{size}x{size}bb").as_str())
        .into_owned()
}
