use async_trait::async_trait;
use scanlink_core::MediaInfo;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Error)]
pub enum MediaError {
    /// The user or platform refused access outright. Ends the ladder.
    #[error("permission denied")]
    PermissionDenied,

    /// This constraint set cannot be satisfied; a lower rung may still work.
    #[error("constraints not satisfiable: {0}")]
    NotSatisfiable(String),

    #[error("capture device error: {0}")]
    Device(String),
}

impl MediaError {
    pub fn is_hard_denial(&self) -> bool {
        matches!(self, MediaError::PermissionDenied)
    }
}

/// One rung of the capability ladder.
#[derive(Debug, Clone)]
pub struct MediaConstraints {
    pub label: &'static str,
    pub audio: bool,
    pub video: bool,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl MediaConstraints {
    pub fn info(&self) -> MediaInfo {
        MediaInfo {
            audio: self.audio,
            video: self.video,
        }
    }
}

/// Highest quality first, degrading down to a bare video-only capture.
pub fn default_ladder() -> Vec<MediaConstraints> {
    vec![
        MediaConstraints {
            label: "hd",
            audio: true,
            video: true,
            width: 1280,
            height: 720,
            frame_rate: 30,
        },
        MediaConstraints {
            label: "sd",
            audio: true,
            video: true,
            width: 640,
            height: 480,
            frame_rate: 30,
        },
        MediaConstraints {
            label: "low",
            audio: true,
            video: true,
            width: 320,
            height: 240,
            frame_rate: 15,
        },
        MediaConstraints {
            label: "video-only",
            audio: false,
            video: true,
            width: 640,
            height: 480,
            frame_rate: 15,
        },
    ]
}

/// The local tracks one granted constraint set produced.
#[derive(Clone)]
pub struct LocalMedia {
    pub tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
    pub info: MediaInfo,
    pub label: &'static str,
}

impl fmt::Debug for LocalMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalMedia")
            .field("label", &self.label)
            .field("info", &self.info)
            .field("tracks", &self.tracks.len())
            .finish()
    }
}

/// Capture seam. Real devices live behind the presentation layer; the
/// orchestrator only cares that something yields tracks or a typed failure.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<LocalMedia, MediaError>;
}

/// Sample-fed local tracks, enough to negotiate real transports without a
/// physical capture device.
pub struct SampleMediaSource;

#[async_trait]
impl MediaSource for SampleMediaSource {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<LocalMedia, MediaError> {
        let mut tracks: Vec<Arc<dyn TrackLocal + Send + Sync>> = Vec::new();

        if constraints.video {
            tracks.push(Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_VP8.to_owned(),
                    ..Default::default()
                },
                "video".to_owned(),
                "scanlink-local".to_owned(),
            )));
        }
        if constraints.audio {
            tracks.push(Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_OPUS.to_owned(),
                    ..Default::default()
                },
                "audio".to_owned(),
                "scanlink-local".to_owned(),
            )));
        }

        Ok(LocalMedia {
            tracks,
            info: constraints.info(),
            label: constraints.label,
        })
    }
}
