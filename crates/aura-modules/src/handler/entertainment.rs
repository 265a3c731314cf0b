//! Entertainment handler: music playback and video lookup.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use aura_core::types::{Intent, ModuleKind};

use super::document::find_by_stem;
use super::{safe_file_name, ModuleHandler};
use crate::client::{MediaController, VideoSearch};
use crate::error::ModuleError;
use crate::types::HandlerContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Play,
    Pause,
    Resume,
    Next,
    Previous,
    VolumeUp,
    VolumeDown,
    Repeat,
    Seek,
}

fn verb_of(intent: &Intent) -> Option<Verb> {
    let text = intent.routing_text();
    let has = |words: &[&str]| words.iter().any(|w| text.contains(w));

    if has(&["volume", "louder", "quieter"]) {
        if has(&["down", "decrease", "lower", "quieter"]) {
            return Some(Verb::VolumeDown);
        }
        return Some(Verb::VolumeUp);
    }
    if has(&["pause", "stop"]) {
        Some(Verb::Pause)
    } else if has(&["resume", "continue"]) {
        Some(Verb::Resume)
    } else if has(&["skip", "next"]) {
        Some(Verb::Next)
    } else if has(&["previous", "rewind"]) {
        Some(Verb::Previous)
    } else if has(&["repeat", "loop"]) {
        Some(Verb::Repeat)
    } else if has(&["seek", "jump"]) {
        Some(Verb::Seek)
    } else if has(&["play", "music", "song", "video", "movie", "spotify", "youtube", "entertainment"]) {
        Some(Verb::Play)
    } else {
        None
    }
}

/// Longest position a seek will accept, in seconds.
const MAX_SEEK_SECS: u64 = 24 * 60 * 60;

/// Playback position in seconds, at most [`MAX_SEEK_SECS`].
///
/// Accepts "m:ss", a plain number of seconds, or a three/four digit string
/// whose last two digits are seconds ("130" is 1:30).
fn parse_position(value: &Value) -> Option<u64> {
    let secs = match value.as_u64() {
        Some(secs) => secs,
        None => parse_position_text(value.as_str()?.trim())?,
    };
    (secs <= MAX_SEEK_SECS).then_some(secs)
}

fn parse_position_text(text: &str) -> Option<u64> {
    if let Some((minutes, seconds)) = text.split_once(':') {
        return minutes_and_seconds(minutes.trim(), seconds.trim());
    }
    if !text.chars().all(|c| c.is_ascii_digit()) || text.is_empty() {
        return None;
    }
    if text.len() <= 2 {
        return text.parse().ok();
    }
    let (minutes, seconds) = text.split_at(text.len() - 2);
    minutes_and_seconds(minutes, seconds)
}

fn minutes_and_seconds(minutes: &str, seconds: &str) -> Option<u64> {
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    if seconds >= 60 {
        return None;
    }
    minutes.checked_mul(60)?.checked_add(seconds)
}

pub struct EntertainmentHandler {
    media: Arc<dyn MediaController>,
    videos: Arc<dyn VideoSearch>,
    music_dir: PathBuf,
    volume_step: i32,
}

impl EntertainmentHandler {
    pub fn new(
        media: Arc<dyn MediaController>,
        videos: Arc<dyn VideoSearch>,
        music_dir: PathBuf,
        volume_step: u8,
    ) -> Self {
        Self {
            media,
            videos,
            music_dir,
            volume_step: i32::from(volume_step),
        }
    }

    async fn play(&self, intent: &Intent) -> Result<Value, ModuleError> {
        let query = intent
            .payload_str("query")
            .or_else(|| intent.payload_str("song"))
            .or_else(|| intent.payload_str("title"));
        let platform = intent
            .payload_str("platform")
            .map(str::to_lowercase)
            .unwrap_or_else(|| {
                if intent.routing_text().contains("youtube") || intent.routing_text().contains("video") {
                    "youtube".to_string()
                } else {
                    "spotify".to_string()
                }
            });

        let Some(query) = query else {
            self.media.resume().await?;
            return Ok(json!({ "status": "success", "message": "Playback resumed." }));
        };

        match platform.as_str() {
            "youtube" => match self.videos.first_video(query).await? {
                Some(url) => Ok(json!({ "status": "success", "platform": "youtube", "url": url })),
                None => Ok(json!({ "error": format!("No video found for '{query}'.") })),
            },
            "local" => match find_by_stem(&self.music_dir, safe_file_name(query)?).await? {
                Some(path) => Ok(json!({
                    "status": "success",
                    "platform": "local",
                    "path": path.to_string_lossy(),
                })),
                None => Ok(json!({ "error": format!("No local file named '{query}'.") })),
            },
            _ => {
                let track = self.media.play_track(query).await?;
                Ok(json!({
                    "status": "success",
                    "platform": "spotify",
                    "message": format!("Playing '{track}' on Spotify."),
                }))
            }
        }
    }
}

fn done(message: &str) -> Value {
    json!({ "status": "success", "message": message })
}

#[async_trait]
impl ModuleHandler for EntertainmentHandler {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Entertainment
    }

    async fn execute(&self, intent: &Intent, _ctx: &HandlerContext) -> Result<Value, ModuleError> {
        let Some(verb) = verb_of(intent) else {
            return Ok(json!({ "error": "Entertainment command not recognized." }));
        };

        match verb {
            Verb::Play => self.play(intent).await,
            Verb::Pause => {
                self.media.pause().await?;
                Ok(done("Playback paused."))
            }
            Verb::Resume => {
                self.media.resume().await?;
                Ok(done("Playback resumed."))
            }
            Verb::Next => {
                self.media.next().await?;
                Ok(done("Skipped to the next track."))
            }
            Verb::Previous => {
                self.media.previous().await?;
                Ok(done("Went back to the previous track."))
            }
            Verb::VolumeUp | Verb::VolumeDown => {
                let delta = if verb == Verb::VolumeUp {
                    self.volume_step
                } else {
                    -self.volume_step
                };
                let level = self.media.change_volume(delta).await?;
                Ok(json!({ "status": "success", "volume": level }))
            }
            Verb::Repeat => {
                self.media.repeat_track().await?;
                Ok(done("Repeating the current track."))
            }
            Verb::Seek => {
                let position = intent
                    .payload
                    .get("position")
                    .and_then(parse_position)
                    .ok_or_else(|| {
                        ModuleError::InvalidPayload("position must look like 1:30 or 90".to_string())
                    })?;
                self.media.seek(position.saturating_mul(1000)).await?;
                Ok(json!({
                    "status": "success",
                    "position": format!("{}:{:02}", position / 60, position % 60),
                }))
            }
        }
    }

    fn describe(&self, intent: &Intent) -> String {
        match verb_of(intent) {
            Some(verb) => format!("Media {verb:?}"),
            None => "Media command".to_string(),
        }
    }
}
