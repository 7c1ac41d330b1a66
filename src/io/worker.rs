// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Background execution of service requests.
//!
//! Each [`Request`] runs on its own short-lived thread and sends exactly one
//! [`Reply`] back over an `mpsc` channel. The UI thread drains the channel
//! once per frame, so all session state stays single-threaded.

use crate::error::SessionError;
use crate::io::api::SegmentationApi;
use crate::io::media::decode_image;
use crate::session::request::{Reply, Request};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// Runs one request against the service. Blocking.
pub fn execute(api: &dyn SegmentationApi, request: Request) -> Reply {
    match request {
        Request::ListCases => Reply::Cases(api.list_cases()),
        Request::VolumeInfo { case } => {
            let result = api.volume_info(&case);
            Reply::VolumeInfo { case, result }
        }
        Request::SliceImage(ticket) => {
            let result = api
                .fetch_image(&ticket)
                .and_then(|bytes| decode_image(&bytes));
            Reply::SliceImage { ticket, result }
        }
        Request::InteractionPoints {
            case,
            slice,
            revision,
        } => {
            let result = api.interaction_points(&case, slice);
            Reply::InteractionPoints {
                case,
                slice,
                revision,
                result,
            }
        }
        Request::Interact { case, point } => {
            let result = api.interact(&case, &point);
            Reply::Interact {
                case,
                point,
                result,
            }
        }
        Request::ClearSegmentation { case } => {
            let result = api.clear_segmentation(&case);
            Reply::ClearSegmentation { case, result }
        }
        Request::StartProcessing { case } => {
            let result = api.start_processing(&case);
            Reply::StartProcessing { case, result }
        }
        Request::JobStatus { case } => {
            let result = api.job_status(&case);
            Reply::JobStatus { case, result }
        }
        Request::Logs { case } => {
            let result = api.logs(&case);
            Reply::Logs { case, result }
        }
        Request::DeleteCase { case } => {
            let result = api.delete_case(&case);
            Reply::DeleteCase { case, result }
        }
        Request::DownloadResults { case, destination } => {
            let result = download_to(api, &case, destination);
            Reply::DownloadResults { case, result }
        }
    }
}

fn download_to(
    api: &dyn SegmentationApi,
    case: &str,
    destination: PathBuf,
) -> Result<PathBuf, SessionError> {
    let mut file = BufWriter::new(File::create(&destination)?);
    let written = api.download_results(case, &mut file)?;
    file.flush()?;
    log::info!(
        "Downloaded {} bytes of results for {} to {}",
        written,
        case,
        destination.display()
    );
    Ok(destination)
}

/// Spawns request threads and collects their replies.
pub struct Dispatcher {
    api: Arc<dyn SegmentationApi>,
    tx: Sender<Reply>,
    rx: Receiver<Reply>,
    repaint: Option<egui::Context>,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn SegmentationApi>) -> Self {
        let (tx, rx) = channel();
        Self {
            api,
            tx,
            rx,
            repaint: None,
        }
    }

    /// Wake the UI whenever a reply arrives.
    pub fn with_repaint(mut self, ctx: egui::Context) -> Self {
        self.repaint = Some(ctx);
        self
    }

    pub fn dispatch(&self, request: Request) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let repaint = self.repaint.clone();
        thread::spawn(move || {
            let reply = execute(api.as_ref(), request);
            // receiver is gone once the app has shut down
            let _ = tx.send(reply);
            if let Some(ctx) = repaint {
                ctx.request_repaint();
            }
        });
    }

    /// Replies that have arrived since the last call.
    pub fn poll_replies(&self) -> Vec<Reply> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::case::{Case, CaseStatus, JobStatus, SegmentationStats, VolumeInfo};
    use crate::models::point::InteractionPoint;
    use crate::session::presenter::{ImageKind, ImageTicket};
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// In-memory service: one CT case "A" without overlay images.
    #[derive(Default)]
    struct FakeApi {
        interactions: Mutex<Vec<(String, InteractionPoint)>>,
    }

    fn png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn missing(case: &str) -> SessionError {
        SessionError::RemoteRejected(format!("No CT found for {}", case))
    }

    impl SegmentationApi for FakeApi {
        fn list_cases(&self) -> Result<Vec<Case>, SessionError> {
            Ok(vec![Case::new("A", vec!["ct.nii.gz".into()])])
        }

        fn volume_info(&self, case: &str) -> Result<VolumeInfo, SessionError> {
            match case {
                "A" => Ok(VolumeInfo::new([4, 4, 9], [1.0, 1.0, 1.0])),
                other => Err(missing(other)),
            }
        }

        fn fetch_image(&self, ticket: &ImageTicket) -> Result<Vec<u8>, SessionError> {
            match ticket.kind {
                ImageKind::Overlay => Err(SessionError::Transport("HTTP 500".into())),
                ImageKind::Original => Ok(png()),
            }
        }

        fn interaction_points(&self, case: &str, slice: u32) -> Result<Vec<InteractionPoint>, SessionError> {
            let interactions = self.interactions.lock().unwrap();
            Ok(interactions
                .iter()
                .filter(|(c, p)| c == case && p.z == slice)
                .map(|(_, p)| *p)
                .collect())
        }

        fn interact(&self, case: &str, point: &InteractionPoint) -> Result<SegmentationStats, SessionError> {
            let mut interactions = self.interactions.lock().unwrap();
            interactions.push((case.to_string(), *point));
            Ok(SegmentationStats {
                total_voxels: 10 * interactions.len() as u64,
                unique_values: [0, 1].into_iter().collect(),
            })
        }

        fn clear_segmentation(&self, _case: &str) -> Result<(), SessionError> {
            self.interactions.lock().unwrap().clear();
            Ok(())
        }

        fn start_processing(&self, _case: &str) -> Result<(), SessionError> {
            Ok(())
        }

        fn job_status(&self, _case: &str) -> Result<JobStatus, SessionError> {
            Ok(JobStatus {
                status: CaseStatus::Running,
                message: "Running inference...".into(),
            })
        }

        fn logs(&self, _case: &str) -> Result<Vec<String>, SessionError> {
            Ok(vec!["Container started: abc123".into()])
        }

        fn delete_case(&self, case: &str) -> Result<(), SessionError> {
            Err(SessionError::RemoteRejected(format!("{} is locked", case)))
        }

        fn download_results(&self, _case: &str, sink: &mut dyn Write) -> Result<u64, SessionError> {
            sink.write_all(b"PK\x03\x04results")?;
            Ok(11)
        }
    }

    fn ticket(kind: ImageKind) -> ImageTicket {
        ImageTicket {
            case: "A".into(),
            slice: 4,
            kind,
            token: 7,
        }
    }

    #[test]
    fn test_execute_slice_image_decodes() {
        let api = FakeApi::default();
        match execute(&api, Request::SliceImage(ticket(ImageKind::Original))) {
            Reply::SliceImage { ticket: t, result } => {
                assert_eq!(t.token, 7);
                let image = result.unwrap();
                assert_eq!((image.width, image.height), (4, 4));
            }
            other => panic!("unexpected reply {:?}", other),
        }

        match execute(&api, Request::SliceImage(ticket(ImageKind::Overlay))) {
            Reply::SliceImage { result, .. } => assert!(result.is_err()),
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_execute_keeps_context() {
        let api = FakeApi::default();
        let point = InteractionPoint {
            x: 1,
            y: 2,
            z: 4,
            positive: true,
        };
        match execute(
            &api,
            Request::Interact {
                case: "A".into(),
                point,
            },
        ) {
            Reply::Interact {
                case,
                point: p,
                result,
            } => {
                assert_eq!(case, "A");
                assert_eq!(p, point);
                assert_eq!(result.unwrap().total_voxels, 10);
            }
            other => panic!("unexpected reply {:?}", other),
        }

        match execute(
            &api,
            Request::InteractionPoints {
                case: "A".into(),
                slice: 4,
                revision: 3,
            },
        ) {
            Reply::InteractionPoints {
                revision, result, ..
            } => {
                assert_eq!(revision, 3);
                assert_eq!(result.unwrap(), vec![point]);
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_execute_download_writes_file() {
        let api = FakeApi::default();
        let path = std::env::temp_dir().join(format!("segview_results_{}.zip", std::process::id()));
        match execute(
            &api,
            Request::DownloadResults {
                case: "A".into(),
                destination: path.clone(),
            },
        ) {
            Reply::DownloadResults { result, .. } => assert_eq!(result.unwrap(), path),
            other => panic!("unexpected reply {:?}", other),
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04results");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_dispatcher_delivers_replies() {
        let dispatcher = Dispatcher::new(Arc::new(FakeApi::default()));
        dispatcher.dispatch(Request::ListCases);
        dispatcher.dispatch(Request::DeleteCase { case: "A".into() });

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut replies = Vec::new();
        while replies.len() < 2 && Instant::now() < deadline {
            replies.extend(dispatcher.poll_replies());
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(replies.len(), 2);
        assert!(replies
            .iter()
            .any(|r| matches!(r, Reply::Cases(Ok(cases)) if cases.len() == 1)));
        assert!(replies
            .iter()
            .any(|r| matches!(r, Reply::DeleteCase { result: Err(_), .. })));
    }

    /// End-to-end: controller + worker + fake service.
    #[test]
    fn test_session_round_trip_with_fallback() {
        use crate::session::controller::{SessionController, SessionTimings};
        use crate::session::presenter::SlicePresenter;
        use crate::util::geometry::DisplayRect;

        let api = FakeApi::default();
        let now = Instant::now();
        let mut c = SessionController::with_presenter(SessionTimings::default(), SlicePresenter::with_seed(0));

        let pump = |c: &mut SessionController| {
            for _ in 0..10 {
                let requests = c.take_requests();
                if requests.is_empty() {
                    break;
                }
                for request in requests {
                    let reply = execute(&api, request);
                    c.handle(reply, now);
                }
            }
        };

        c.refresh_cases();
        c.select_case("A");
        pump(&mut c);
        assert_eq!(c.cases().len(), 1);
        assert_eq!(c.session().unwrap().current_slice, 4);
        // overlay fails, original slice is shown
        assert_eq!(c.displayed_slice().unwrap().kind, ImageKind::Original);

        let rect = DisplayRect::new(0.0, 0.0, 40.0, 40.0);
        c.click(25.0, 15.0, &rect, now).unwrap();
        pump(&mut c);
        let expected = InteractionPoint {
            x: 2,
            y: 1,
            z: 4,
            positive: true,
        };
        assert_eq!(c.current_points(), &[expected]);
        assert_eq!(c.session().unwrap().stats.as_ref().unwrap().total_voxels, 10);

        c.clear_segmentation(now).unwrap();
        pump(&mut c);
        assert!(c.current_points().is_empty());
    }
}
