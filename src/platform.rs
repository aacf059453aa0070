//! User-facing side effects
//!
//! Clipboard, share sheet and link opening are injected capabilities so the
//! result view can be driven without a real platform behind it.

use crate::analysis::AnalysisResult;
use crate::{Result, SommelierError};
use chrono::{DateTime, Local};
use rand::Rng;
use tracing::{debug, info};
use url::Url;

/// Base URL for the playlist search
pub const PLAYLIST_SEARCH_BASE: &str = "https://open.spotify.com/search/";

/// Writes text to the system clipboard
pub trait ClipboardWriter {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Hands content to the platform share sheet
pub trait ShareSink {
    /// # Errors
    /// `UnsupportedFeature` if the platform has no share sheet.
    fn share(&self, request: &ShareRequest) -> Result<()>;
}

/// Opens a URL outside the app
pub trait LinkOpener {
    fn open(&self, url: &str) -> Result<()>;
}

/// Content offered to the share sheet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareRequest {
    pub title: String,
    pub text: String,
    pub url: String,
}

impl ShareRequest {
    /// Build the share payload for a tasting note
    pub fn for_result(result: &AnalysisResult) -> Result<Self> {
        Ok(Self {
            title: format!("The Vibe Sommelier: {}", result.playlist_title),
            text: format!(
                "My current vibe is {}. Tasting notes: {}",
                result.mood, result.note
            ),
            url: playlist_search_url(result)?.to_string(),
        })
    }
}

/// Search URL for "<mood> <genre> <genre> <genre>"
pub fn playlist_search_url(result: &AnalysisResult) -> Result<Url> {
    let mut terms = vec![result.mood.as_str()];
    terms.extend(result.genres.iter().map(String::as_str));
    let query = terms.join(" ");

    let mut url = Url::parse(PLAYLIST_SEARCH_BASE)
        .map_err(|e| SommelierError::ConfigError(format!("bad search URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| SommelierError::ConfigError("search URL cannot be a base".to_string()))?
        .pop_if_empty()
        .push(&query);
    Ok(url)
}

/// Share sink for platforms without a share sheet
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedShare;

impl ShareSink for UnsupportedShare {
    fn share(&self, request: &ShareRequest) -> Result<()> {
        debug!("[UI] No share sheet for \"{}\"", request.title);
        Err(SommelierError::UnsupportedFeature("share".to_string()))
    }
}

/// Clipboard backed by the egui context
pub struct EguiClipboard {
    ctx: egui::Context,
}

impl EguiClipboard {
    pub fn new(ctx: &egui::Context) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl ClipboardWriter for EguiClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        self.ctx.copy_text(text.to_string());
        Ok(())
    }
}

/// Link opener backed by the egui context
pub struct EguiLinkOpener {
    ctx: egui::Context,
}

impl EguiLinkOpener {
    pub fn new(ctx: &egui::Context) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl LinkOpener for EguiLinkOpener {
    fn open(&self, url: &str) -> Result<()> {
        info!("[UI] Opening {}", url);
        self.ctx.open_url(egui::OpenUrl::new_tab(url));
        Ok(())
    }
}

/// Decorative catalogue number and date shown on a result
///
/// Not part of session data; drawn again each time a result is shown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryStamp {
    pub number: u16,
    pub date: String,
}

impl RegistryStamp {
    pub fn generate() -> Self {
        Self::at(&mut rand::thread_rng(), Local::now())
    }

    /// Stamp from an explicit random source and clock
    pub fn at<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Local>) -> Self {
        Self {
            number: rng.gen_range(1000..=9999),
            date: now.format("%b %-d, %y").to_string(),
        }
    }
}

impl std::fmt::Display for RegistryStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} · {}", self.number, self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            playlist_title: "Velvet Dusk".into(),
            note: "Low amber light, a record crackling.".into(),
            color_palette: vec![
                "#2b1d0e".into(),
                "#5c3d2e".into(),
                "#b85c38".into(),
                "#e0c097".into(),
                "#f7f3e9".into(),
            ],
            genres: vec!["jazz".into(), "trip-hop".into(), "neo soul".into()],
            mood: "Intimate".into(),
            intensity: "Low".into(),
        }
    }

    #[test]
    fn test_search_url_is_percent_encoded() {
        let url = playlist_search_url(&sample_result()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://open.spotify.com/search/Intimate%20jazz%20trip-hop%20neo%20soul"
        );
    }

    #[test]
    fn test_search_url_escapes_slashes() {
        let mut result = sample_result();
        result.genres[0] = "r&b/soul".into();
        let url = playlist_search_url(&result).unwrap();
        assert!(url.as_str().contains("r&b%2Fsoul"));
        assert_eq!(url.path_segments().unwrap().count(), 2);
    }

    #[test]
    fn test_share_request_contents() {
        let request = ShareRequest::for_result(&sample_result()).unwrap();
        assert_eq!(request.title, "The Vibe Sommelier: Velvet Dusk");
        assert_eq!(
            request.text,
            "My current vibe is Intimate. Tasting notes: Low amber light, a record crackling."
        );
        assert!(request.url.starts_with(PLAYLIST_SEARCH_BASE));
    }

    #[test]
    fn test_unsupported_share_notice() {
        let request = ShareRequest::for_result(&sample_result()).unwrap();
        let err = UnsupportedShare.share(&request).unwrap_err();
        assert!(matches!(err, SommelierError::UnsupportedFeature(_)));
        assert_eq!(
            err.user_message(),
            "Sharing is not supported on this platform. Copy the link to share!"
        );
    }

    #[test]
    fn test_clipboard_writer_receives_hex() {
        #[derive(Default)]
        struct MemoryClipboard(RefCell<Vec<String>>);

        impl ClipboardWriter for MemoryClipboard {
            fn write_text(&self, text: &str) -> Result<()> {
                self.0.borrow_mut().push(text.to_string());
                Ok(())
            }
        }

        let clipboard = MemoryClipboard::default();
        let result = sample_result();
        clipboard.write_text(&result.color_palette[2]).unwrap();
        assert_eq!(clipboard.0.borrow().as_slice(), ["#b85c38"]);
    }

    #[test]
    fn test_registry_stamp_format() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Local.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let stamp = RegistryStamp::at(&mut rng, now);

        assert!((1000..=9999).contains(&stamp.number));
        assert_eq!(stamp.date, "Oct 19, 26");
        assert_eq!(stamp.to_string(), format!("#{} · Oct 19, 26", stamp.number));
    }

    #[test]
    fn test_registry_stamp_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let now = Local::now();
        for _ in 0..200 {
            let stamp = RegistryStamp::at(&mut rng, now);
            assert!((1000..=9999).contains(&stamp.number));
        }
    }
}
