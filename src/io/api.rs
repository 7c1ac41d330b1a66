// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Segmentation service client.
//!
//! [`SegmentationApi`] is the boundary to the backend: case listing, volume
//! metadata, slice images, point interactions, job control and downloads.
//! [`HttpApi`] implements it over blocking HTTP with `ureq`; calls are made
//! from worker threads, never from the UI thread.

use crate::error::SessionError;
use crate::models::case::{Case, JobStatus, SegmentationStats, VolumeInfo};
use crate::models::point::InteractionPoint;
use crate::session::presenter::ImageTicket;
use serde::Deserialize;
use std::io::{Read, Write};
use std::time::Duration;

/// Operations the session needs from the segmentation service.
pub trait SegmentationApi: Send + Sync {
    fn list_cases(&self) -> Result<Vec<Case>, SessionError>;
    fn volume_info(&self, case: &str) -> Result<VolumeInfo, SessionError>;
    /// Raw bytes of the image a ticket refers to.
    fn fetch_image(&self, ticket: &ImageTicket) -> Result<Vec<u8>, SessionError>;
    fn interaction_points(&self, case: &str, slice: u32) -> Result<Vec<InteractionPoint>, SessionError>;
    fn interact(&self, case: &str, point: &InteractionPoint) -> Result<SegmentationStats, SessionError>;
    fn clear_segmentation(&self, case: &str) -> Result<(), SessionError>;
    fn start_processing(&self, case: &str) -> Result<(), SessionError>;
    fn job_status(&self, case: &str) -> Result<JobStatus, SessionError>;
    fn logs(&self, case: &str) -> Result<Vec<String>, SessionError>;
    fn delete_case(&self, case: &str) -> Result<(), SessionError>;
    /// Stream the results archive into `sink`, returning the byte count.
    fn download_results(&self, case: &str, sink: &mut dyn Write) -> Result<u64, SessionError>;
}

// ----- wire formats ----------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct CaseListReply {
    #[serde(default)]
    pub uploads: Vec<Case>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VolumeInfoReply {
    #[serde(default)]
    pub success: bool,
    pub info: Option<VolumeInfo>,
    pub error: Option<String>,
}

impl VolumeInfoReply {
    pub fn into_result(self) -> Result<VolumeInfo, SessionError> {
        accepted(self.success, self.error)?;
        self.info
            .map(VolumeInfo::normalized)
            .ok_or_else(|| SessionError::RemoteRejected("response carried no volume info".into()))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePoint {
    pub x: u32,
    pub y: u32,
    pub positive: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PointsReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub points: Vec<WirePoint>,
    pub error: Option<String>,
}

impl PointsReply {
    pub fn into_result(self, slice: u32) -> Result<Vec<InteractionPoint>, SessionError> {
        accepted(self.success, self.error)?;
        Ok(self
            .points
            .into_iter()
            .map(|p| InteractionPoint {
                x: p.x,
                y: p.y,
                z: slice,
                positive: p.positive,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct InteractReply {
    #[serde(default)]
    pub success: bool,
    pub segmentation_stats: Option<SegmentationStats>,
    pub error: Option<String>,
}

impl InteractReply {
    pub fn into_result(self) -> Result<SegmentationStats, SessionError> {
        accepted(self.success, self.error)?;
        Ok(self.segmentation_stats.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AckReply {
    #[serde(default)]
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LogsReply {
    #[serde(default)]
    pub logs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

fn accepted(success: bool, error: Option<String>) -> Result<(), SessionError> {
    if success {
        Ok(())
    } else {
        Err(SessionError::RemoteRejected(
            error.unwrap_or_else(|| "request was not successful".into()),
        ))
    }
}

// ----- HTTP implementation ---------------------------------------------------

/// Blocking HTTP client for the segmentation service.
pub struct HttpApi {
    agent: ureq::Agent,
    base: String,
}

impl HttpApi {
    /// `server_url` like `http://localhost:5000`, `api_prefix` like `/api`.
    pub fn new(server_url: &str, api_prefix: &str, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
            base: join_base(server_url, api_prefix),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn get(&self, path: &str) -> Result<ureq::Response, SessionError> {
        let url = self.url(path);
        log::debug!("GET {}", url);
        self.agent.get(&url).call().map_err(map_error)
    }

    fn post_empty(&self, path: &str) -> Result<ureq::Response, SessionError> {
        let url = self.url(path);
        log::debug!("POST {}", url);
        self.agent.post(&url).call().map_err(map_error)
    }

    fn post_json(&self, path: &str, body: serde_json::Value) -> Result<ureq::Response, SessionError> {
        let url = self.url(path);
        log::debug!("POST {} {}", url, body);
        self.agent.post(&url).send_json(body).map_err(map_error)
    }
}

fn join_base(server_url: &str, api_prefix: &str) -> String {
    let prefix = api_prefix.trim_matches('/');
    let server = server_url.trim_end_matches('/');
    if prefix.is_empty() {
        server.to_string()
    } else {
        format!("{}/{}", server, prefix)
    }
}

fn map_error(err: ureq::Error) -> SessionError {
    match err {
        ureq::Error::Status(code, response) => {
            let message = response.into_json::<ErrorBody>().ok().and_then(|b| b.error);
            match message {
                Some(message) => SessionError::RemoteRejected(message),
                None => SessionError::Transport(format!("HTTP {}", code)),
            }
        }
        ureq::Error::Transport(transport) => SessionError::Transport(transport.to_string()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(response: ureq::Response) -> Result<T, SessionError> {
    response
        .into_json()
        .map_err(|e| SessionError::Transport(format!("invalid response body: {}", e)))
}

impl SegmentationApi for HttpApi {
    fn list_cases(&self) -> Result<Vec<Case>, SessionError> {
        let reply: CaseListReply = read_json(self.get("/list_uploads")?)?;
        Ok(reply.uploads)
    }

    fn volume_info(&self, case: &str) -> Result<VolumeInfo, SessionError> {
        let reply: VolumeInfoReply = read_json(self.get(&format!("/image_info/{}", case))?)?;
        reply.into_result()
    }

    fn fetch_image(&self, ticket: &ImageTicket) -> Result<Vec<u8>, SessionError> {
        let response = self.get(&ticket.path())?;
        let mut bytes = Vec::new();
        response.into_reader().read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn interaction_points(&self, case: &str, slice: u32) -> Result<Vec<InteractionPoint>, SessionError> {
        let reply: PointsReply =
            read_json(self.get(&format!("/get_interaction_points/{}/{}", case, slice))?)?;
        reply.into_result(slice)
    }

    fn interact(&self, case: &str, point: &InteractionPoint) -> Result<SegmentationStats, SessionError> {
        let body = serde_json::json!({
            "case_name": case,
            "x": point.x,
            "y": point.y,
            "z": point.z,
            "positive": point.positive,
        });
        let reply: InteractReply = read_json(self.post_json("/interact_segment", body)?)?;
        reply.into_result()
    }

    fn clear_segmentation(&self, case: &str) -> Result<(), SessionError> {
        let reply: AckReply = read_json(self.post_empty(&format!("/clear_segmentation/{}", case))?)?;
        accepted(reply.success, reply.error)
    }

    fn start_processing(&self, case: &str) -> Result<(), SessionError> {
        let body = serde_json::json!({ "case_name": case });
        let reply: AckReply = read_json(self.post_json("/run_docker", body)?)?;
        accepted(reply.success, reply.error)
    }

    fn job_status(&self, case: &str) -> Result<JobStatus, SessionError> {
        read_json(self.get(&format!("/status/{}", case))?)
    }

    fn logs(&self, case: &str) -> Result<Vec<String>, SessionError> {
        let reply: LogsReply = read_json(self.get(&format!("/logs/{}", case))?)?;
        Ok(reply.logs)
    }

    fn delete_case(&self, case: &str) -> Result<(), SessionError> {
        let url = self.url(&format!("/delete_upload/{}", case));
        log::debug!("DELETE {}", url);
        self.agent.delete(&url).call().map_err(map_error)?;
        Ok(())
    }

    fn download_results(&self, case: &str, sink: &mut dyn Write) -> Result<u64, SessionError> {
        let response = self.get(&format!("/download/{}", case))?;
        let written = std::io::copy(&mut response.into_reader(), sink)?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_base() {
        assert_eq!(join_base("http://localhost:5000/", "/api"), "http://localhost:5000/api");
        assert_eq!(join_base("http://host", "api/"), "http://host/api");
        assert_eq!(join_base("http://host", ""), "http://host");
    }

    #[test]
    fn test_volume_info_reply() {
        let reply: VolumeInfoReply = serde_json::from_str(
            r#"{"success": true, "info": {"shape": [512, 512, 120], "spacing": [0.78, 0.78, 2.5], "max_slice": 119}}"#,
        )
        .unwrap();
        let info = reply.into_result().unwrap();
        assert_eq!(info.shape, [512, 512, 120]);
        assert_eq!(info.max_slice, 119);
        assert_eq!(info.mid_slice(), 59);
    }

    #[test]
    fn test_volume_info_failure() {
        let reply: VolumeInfoReply =
            serde_json::from_str(r#"{"success": false, "error": "No CT found for case_9"}"#).unwrap();
        assert_eq!(
            reply.into_result(),
            Err(SessionError::RemoteRejected("No CT found for case_9".into()))
        );
    }

    #[test]
    fn test_points_reply_takes_slice_index() {
        let reply: PointsReply = serde_json::from_str(
            r#"{"success": true, "points": [{"x": 100, "y": 150, "positive": true}, {"x": 3, "y": 4, "positive": false}]}"#,
        )
        .unwrap();
        let points = reply.into_result(60).unwrap();
        assert_eq!(
            points,
            vec![
                InteractionPoint { x: 100, y: 150, z: 60, positive: true },
                InteractionPoint { x: 3, y: 4, z: 60, positive: false },
            ]
        );
    }

    #[test]
    fn test_interact_reply() {
        let reply: InteractReply = serde_json::from_str(
            r#"{"success": true, "point": {"x": 1, "y": 2, "z": 3, "positive": true},
                "segmentation_stats": {"unique_values": [0, 1], "total_voxels": 4200}}"#,
        )
        .unwrap();
        let stats = reply.into_result().unwrap();
        assert_eq!(stats.total_voxels, 4200);
        assert_eq!(stats.unique_values.into_iter().collect::<Vec<_>>(), vec![0, 1]);

        let reply: InteractReply =
            serde_json::from_str(r#"{"success": false, "error": "Interactive segmentation not available"}"#)
                .unwrap();
        assert!(matches!(reply.into_result(), Err(SessionError::RemoteRejected(_))));
    }

    #[test]
    fn test_case_list_reply() {
        let reply: CaseListReply = serde_json::from_str(
            r#"{"uploads": [{"case_name": "case_00001", "files": ["ct.nii.gz"]}, {"case_name": "case_00002", "files": []}]}"#,
        )
        .unwrap();
        let names: Vec<_> = reply.uploads.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["case_00001", "case_00002"]);
    }
}
