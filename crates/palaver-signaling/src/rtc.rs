//! A [`PeerFactory`] backed by the `webrtc` crate.
//!
//! Enabled with the `webrtc` feature. Each attempt gets its own
//! `RTCPeerConnection`; locally gathered candidates are forwarded to the
//! engine through the attempt's [`CandidateSink`].

use std::sync::Arc;

use palaver_protocol::{IceCandidate, SdpType, SessionDescription};
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use crate::{AttemptId, CandidateSink, PeerConnection, PeerError, PeerFactory};

/// Public STUN server used when no ICE servers are configured.
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

#[derive(Debug, Clone)]
pub struct WebRtcConfig {
    /// ICE server URLs handed to every peer connection.
    pub ice_servers: Vec<String>,
    /// Label of the data channel the offering side opens so the offer
    /// carries something to negotiate.
    pub data_channel_label: String,
}

impl Default for WebRtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_string()],
            data_channel_label: "palaver".to_string(),
        }
    }
}

pub struct WebRtcPeerFactory {
    api: API,
    config: WebRtcConfig,
}

impl WebRtcPeerFactory {
    /// Builds a factory with the default codec set registered.
    ///
    /// # Errors
    /// Returns a [`PeerError`] if codec registration fails.
    pub fn new(config: WebRtcConfig) -> Result<Self, PeerError> {
        let mut media = MediaEngine::default();
        media.register_default_codecs().map_err(to_peer_error)?;
        let api = APIBuilder::new().with_media_engine(media).build();
        Ok(Self { api, config })
    }
}

impl PeerFactory for WebRtcPeerFactory {
    type Peer = WebRtcPeer;

    async fn create(
        &self,
        attempt: AttemptId,
        candidates: CandidateSink,
    ) -> Result<WebRtcPeer, PeerError> {
        let config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: self.config.ice_servers.clone(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let pc = Arc::new(
            self.api
                .new_peer_connection(config)
                .await
                .map_err(to_peer_error)?,
        );

        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let sink = candidates.clone();
            Box::pin(async move {
                let Some(candidate) = candidate else {
                    return;
                };
                match candidate.to_json() {
                    Ok(init) => {
                        sink.emit(IceCandidate {
                            candidate: init.candidate,
                            sdp_mid: init.sdp_mid,
                            sdp_m_line_index: init.sdp_mline_index,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(attempt = %sink.attempt(), error = %e, "could not serialize local candidate");
                    }
                }
            })
        }));

        tracing::debug!(%attempt, "webrtc peer connection created");
        Ok(WebRtcPeer {
            pc,
            data_channel_label: self.config.data_channel_label.clone(),
        })
    }
}

pub struct WebRtcPeer {
    pc: Arc<RTCPeerConnection>,
    data_channel_label: String,
}

impl PeerConnection for WebRtcPeer {
    async fn create_offer(&self) -> Result<String, PeerError> {
        self.pc
            .create_data_channel(&self.data_channel_label, None)
            .await
            .map_err(to_peer_error)?;
        let offer = self.pc.create_offer(None).await.map_err(to_peer_error)?;
        Ok(offer.sdp)
    }

    async fn create_answer(&self) -> Result<String, PeerError> {
        let answer = self.pc.create_answer(None).await.map_err(to_peer_error)?;
        Ok(answer.sdp)
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        let description = to_rtc_description(description)?;
        self.pc
            .set_local_description(description)
            .await
            .map_err(to_peer_error)
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        let description = to_rtc_description(description)?;
        self.pc
            .set_remote_description(description)
            .await
            .map_err(to_peer_error)
    }

    async fn add_ice_candidate(
        &self,
        candidate: IceCandidate,
    ) -> Result<(), PeerError> {
        self.pc
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_m_line_index,
                username_fragment: None,
            })
            .await
            .map_err(to_peer_error)
    }

    async fn close(&self) -> Result<(), PeerError> {
        self.pc.close().await.map_err(to_peer_error)
    }
}

fn to_rtc_description(
    description: SessionDescription,
) -> Result<RTCSessionDescription, PeerError> {
    match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp),
        SdpType::Answer => RTCSessionDescription::answer(description.sdp),
    }
    .map_err(to_peer_error)
}

fn to_peer_error(e: webrtc::Error) -> PeerError {
    PeerError::new(e.to_string())
}
