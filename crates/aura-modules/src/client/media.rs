//! Media playback control and video search.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;

use aura_core::config::MediaConfig;

use super::{ensure_success, require, transport_error};
use crate::error::ModuleError;

/// Remote control of a music player.
#[async_trait]
pub trait MediaController: Send + Sync {
    /// Search for a track and start it. Returns the track name.
    async fn play_track(&self, query: &str) -> Result<String, ModuleError>;
    async fn pause(&self) -> Result<(), ModuleError>;
    async fn resume(&self) -> Result<(), ModuleError>;
    async fn next(&self) -> Result<(), ModuleError>;
    async fn previous(&self) -> Result<(), ModuleError>;
    /// Shift volume by `delta` percent. Returns the new level.
    async fn change_volume(&self, delta: i32) -> Result<u8, ModuleError>;
    async fn repeat_track(&self) -> Result<(), ModuleError>;
    async fn seek(&self, position_ms: u64) -> Result<(), ModuleError>;
}

/// Video lookup.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// Watch URL of the first hit, if any.
    async fn first_video(&self, query: &str) -> Result<Option<String>, ModuleError>;
}

// =============================================================================
// Spotify Web API
// =============================================================================

const SPOTIFY: &str = "Spotify";

pub struct SpotifyController {
    client: Client,
    token: String,
    api_url: String,
    timeout_secs: u64,
}

impl SpotifyController {
    pub fn new(client: Client, config: &MediaConfig, timeout_secs: u64) -> Self {
        Self {
            client,
            token: config.spotify_token.clone(),
            api_url: config.spotify_api_url.trim_end_matches('/').to_string(),
            timeout_secs,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.api_url, path))
            .bearer_auth(&self.token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ModuleError> {
        require(&self.token, "Spotify token")?;
        let response = request
            .send()
            .await
            .map_err(transport_error(SPOTIFY, self.timeout_secs))?;
        ensure_success(SPOTIFY, response).await
    }

    async fn player_command(&self, method: Method, path: &str) -> Result<(), ModuleError> {
        // Player endpoints reject an absent body on PUT/POST.
        let request = self.request(method, path).header("Content-Length", "0");
        self.send(request).await.map(|_| ())
    }
}

#[async_trait]
impl MediaController for SpotifyController {
    async fn play_track(&self, query: &str) -> Result<String, ModuleError> {
        let request = self
            .request(Method::GET, "search")
            .query(&[("q", query), ("type", "track"), ("limit", "1")]);
        let body: TrackSearch = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| ModuleError::upstream(SPOTIFY, e))?;

        let track = body
            .tracks
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ModuleError::NotFound(format!("No track matching '{query}'")))?;

        let play = self
            .request(Method::PUT, "me/player/play")
            .json(&serde_json::json!({ "uris": [track.uri] }));
        self.send(play).await?;
        tracing::info!(track = %track.name, "Playback started");
        Ok(track.name)
    }

    async fn pause(&self) -> Result<(), ModuleError> {
        self.player_command(Method::PUT, "me/player/pause").await
    }

    async fn resume(&self) -> Result<(), ModuleError> {
        self.player_command(Method::PUT, "me/player/play").await
    }

    async fn next(&self) -> Result<(), ModuleError> {
        self.player_command(Method::POST, "me/player/next").await
    }

    async fn previous(&self) -> Result<(), ModuleError> {
        self.player_command(Method::POST, "me/player/previous").await
    }

    async fn change_volume(&self, delta: i32) -> Result<u8, ModuleError> {
        let state: PlayerState = self
            .send(self.request(Method::GET, "me/player"))
            .await?
            .json()
            .await
            .map_err(|e| ModuleError::upstream(SPOTIFY, e))?;

        let level = clamp_volume(state.device.volume_percent.unwrap_or(50), delta);
        self.player_command(
            Method::PUT,
            &format!("me/player/volume?volume_percent={level}"),
        )
        .await?;
        Ok(level)
    }

    async fn repeat_track(&self) -> Result<(), ModuleError> {
        self.player_command(Method::PUT, "me/player/repeat?state=track").await
    }

    async fn seek(&self, position_ms: u64) -> Result<(), ModuleError> {
        self.player_command(
            Method::PUT,
            &format!("me/player/seek?position_ms={position_ms}"),
        )
        .await
    }
}

fn clamp_volume(current: i32, delta: i32) -> u8 {
    (current + delta).clamp(0, 100) as u8
}

#[derive(Debug, Deserialize)]
struct TrackSearch {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    name: String,
    uri: String,
}

#[derive(Debug, Deserialize)]
struct PlayerState {
    device: Device,
}

#[derive(Debug, Deserialize)]
struct Device {
    volume_percent: Option<i32>,
}

// =============================================================================
// YouTube Data API
// =============================================================================

pub struct YoutubeClient {
    client: Client,
    api_key: String,
    api_url: String,
    timeout_secs: u64,
}

impl YoutubeClient {
    pub fn new(client: Client, config: &MediaConfig, timeout_secs: u64) -> Self {
        Self {
            client,
            api_key: config.youtube_api_key.clone(),
            api_url: config.youtube_api_url.trim_end_matches('/').to_string(),
            timeout_secs,
        }
    }
}

#[async_trait]
impl VideoSearch for YoutubeClient {
    async fn first_video(&self, query: &str) -> Result<Option<String>, ModuleError> {
        require(&self.api_key, "YouTube api key")?;

        let response = self
            .client
            .get(format!("{}/search", self.api_url))
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", "1"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error("YouTube", self.timeout_secs))?;

        let body: VideoSearchResponse = ensure_success("YouTube", response)
            .await?
            .json()
            .await
            .map_err(|e| ModuleError::upstream("YouTube", e))?;

        Ok(body.first_watch_url())
    }
}

#[derive(Debug, Deserialize)]
struct VideoSearchResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: VideoId,
}

#[derive(Debug, Deserialize)]
struct VideoId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

impl VideoSearchResponse {
    fn first_watch_url(self) -> Option<String> {
        self.items
            .into_iter()
            .find_map(|item| item.id.video_id)
            .map(|id| format!("https://www.youtube.com/watch?v={id}"))
    }
}
