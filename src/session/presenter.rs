// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Slice image resolution.
//!
//! For each (case, slice) the presenter first asks for the overlay image
//! (CT slice with the current mask composited), then for the raw slice if
//! that fails. Every request gets a fresh cache-busting token, and only the
//! latest ticket may change what is displayed: answers to superseded tickets
//! are dropped.

use crate::error::SessionError;
use crate::io::media::DecodedImage;
use std::time::{SystemTime, UNIX_EPOCH};

/// Which resource a ticket asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Slice with the segmentation overlay
    Overlay,
    /// Raw CT slice, used as fallback
    Original,
}

/// One image request issued by the presenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTicket {
    pub case: String,
    pub slice: u32,
    pub kind: ImageKind,
    /// Cache-busting token, distinct for every ticket
    pub token: u64,
}

impl ImageTicket {
    /// Service path of the resource, relative to the API prefix.
    pub fn path(&self) -> String {
        let route = match self.kind {
            ImageKind::Overlay => "slice_with_overlay",
            ImageKind::Original => "original_slice",
        };
        format!("/{}/{}/{}?t={}", route, self.case, self.slice, self.token)
    }
}

/// The image currently on screen.
#[derive(Debug, Clone)]
pub struct DisplayedSlice {
    pub case: String,
    pub slice: u32,
    pub kind: ImageKind,
    pub image: DecodedImage,
    /// Increases every time the displayed image changes
    pub version: u64,
}

/// What the caller should do after an image answer.
#[derive(Debug, PartialEq)]
pub enum LoadOutcome {
    /// The image is now displayed
    Displayed,
    /// The overlay failed; fetch this fallback ticket
    Fallback(ImageTicket),
    /// Both resources failed; the previous image stays on screen
    Failed(SessionError),
    /// The answer belongs to an older request and was ignored
    Superseded,
}

#[derive(Debug)]
pub struct SlicePresenter {
    next_token: u64,
    pending: Option<ImageTicket>,
    displayed: Option<DisplayedSlice>,
    version: u64,
}

impl Default for SlicePresenter {
    fn default() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self::with_seed(seed)
    }
}

impl SlicePresenter {
    /// Presenter whose first cache-busting token is `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            next_token: seed,
            pending: None,
            displayed: None,
            version: 0,
        }
    }

    fn ticket(&mut self, case: &str, slice: u32, kind: ImageKind) -> ImageTicket {
        let token = self.next_token;
        self.next_token = self.next_token.wrapping_add(1);
        let ticket = ImageTicket {
            case: case.to_string(),
            slice,
            kind,
            token,
        };
        self.pending = Some(ticket.clone());
        ticket
    }

    /// Start loading a slice. Supersedes any load still in progress.
    pub fn request(&mut self, case: &str, slice: u32) -> ImageTicket {
        self.ticket(case, slice, ImageKind::Overlay)
    }

    /// Handle the answer to a ticket.
    pub fn on_loaded(
        &mut self,
        ticket: &ImageTicket,
        result: Result<DecodedImage, SessionError>,
    ) -> LoadOutcome {
        if self.pending.as_ref() != Some(ticket) {
            log::debug!(
                "Dropping superseded image for {} slice {} (token {})",
                ticket.case,
                ticket.slice,
                ticket.token
            );
            return LoadOutcome::Superseded;
        }

        match (result, ticket.kind) {
            (Ok(image), kind) => {
                self.pending = None;
                self.version += 1;
                self.displayed = Some(DisplayedSlice {
                    case: ticket.case.clone(),
                    slice: ticket.slice,
                    kind,
                    image,
                    version: self.version,
                });
                LoadOutcome::Displayed
            }
            (Err(err), ImageKind::Overlay) => {
                log::warn!(
                    "Overlay for {} slice {} failed ({}), trying original slice",
                    ticket.case,
                    ticket.slice,
                    err
                );
                LoadOutcome::Fallback(self.ticket(&ticket.case, ticket.slice, ImageKind::Original))
            }
            (Err(err), ImageKind::Original) => {
                log::error!(
                    "Original slice {} of {} failed: {}",
                    ticket.slice,
                    ticket.case,
                    err
                );
                self.pending = None;
                LoadOutcome::Failed(SessionError::ImageLoadFailure {
                    case: ticket.case.clone(),
                    slice: ticket.slice,
                })
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn displayed(&self) -> Option<&DisplayedSlice> {
        self.displayed.as_ref()
    }

    /// Forget the displayed image and any load in progress.
    pub fn reset(&mut self) {
        self.pending = None;
        self.displayed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> DecodedImage {
        DecodedImage {
            width: 2,
            height: 2,
            pixels: vec![0; 16],
        }
    }

    fn not_found() -> SessionError {
        SessionError::RemoteRejected("Original CT not found".into())
    }

    #[test]
    fn test_paths_carry_distinct_tokens() {
        let mut presenter = SlicePresenter::with_seed(100);
        let first = presenter.request("A", 60);
        let second = presenter.request("A", 60);

        assert_eq!(first.path(), "/slice_with_overlay/A/60?t=100");
        assert_eq!(second.path(), "/slice_with_overlay/A/60?t=101");
    }

    #[test]
    fn test_overlay_success_displays() {
        let mut presenter = SlicePresenter::with_seed(0);
        let ticket = presenter.request("A", 60);

        assert_eq!(presenter.on_loaded(&ticket, Ok(image())), LoadOutcome::Displayed);
        let shown = presenter.displayed().unwrap();
        assert_eq!((shown.case.as_str(), shown.slice, shown.kind), ("A", 60, ImageKind::Overlay));
        assert!(!presenter.is_loading());
    }

    #[test]
    fn test_overlay_failure_falls_back_to_original() {
        let mut presenter = SlicePresenter::with_seed(0);
        let ticket = presenter.request("A", 60);

        let fallback = match presenter.on_loaded(&ticket, Err(not_found())) {
            LoadOutcome::Fallback(t) => t,
            other => panic!("expected fallback, got {:?}", other),
        };
        assert_eq!(fallback.case, "A");
        assert_eq!(fallback.slice, 60);
        assert_eq!(fallback.kind, ImageKind::Original);
        assert!(fallback.path().starts_with("/original_slice/A/60?t="));

        assert_eq!(presenter.on_loaded(&fallback, Ok(image())), LoadOutcome::Displayed);
        assert_eq!(presenter.displayed().unwrap().kind, ImageKind::Original);
    }

    #[test]
    fn test_double_failure_keeps_previous_image() {
        let mut presenter = SlicePresenter::with_seed(0);
        let first = presenter.request("A", 10);
        presenter.on_loaded(&first, Ok(image()));

        let ticket = presenter.request("A", 11);
        let fallback = match presenter.on_loaded(&ticket, Err(not_found())) {
            LoadOutcome::Fallback(t) => t,
            other => panic!("expected fallback, got {:?}", other),
        };
        let outcome = presenter.on_loaded(&fallback, Err(not_found()));

        assert_eq!(
            outcome,
            LoadOutcome::Failed(SessionError::ImageLoadFailure {
                case: "A".into(),
                slice: 11
            })
        );
        assert_eq!(presenter.displayed().unwrap().slice, 10);
        assert!(!presenter.is_loading());
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut presenter = SlicePresenter::with_seed(0);
        let old = presenter.request("A", 10);
        let new = presenter.request("A", 11);

        assert_eq!(presenter.on_loaded(&old, Ok(image())), LoadOutcome::Superseded);
        assert!(presenter.displayed().is_none());

        assert_eq!(presenter.on_loaded(&new, Ok(image())), LoadOutcome::Displayed);
        assert_eq!(presenter.displayed().unwrap().slice, 11);
    }

    #[test]
    fn test_stale_failure_does_not_trigger_fallback() {
        let mut presenter = SlicePresenter::with_seed(0);
        let old = presenter.request("A", 10);
        let _new = presenter.request("A", 11);

        assert_eq!(presenter.on_loaded(&old, Err(not_found())), LoadOutcome::Superseded);
        assert!(presenter.is_loading());
    }
}
