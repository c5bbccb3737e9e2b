use crate::domain::cycle::CYCLE_DAYS;
use crate::domain::models::{Playlist, PlaylistVideo};
use url::Url;

const VIDEO_ID_LEN: usize = 11;

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-')
}

/// Pulls the 11-character video id out of the URL forms users paste:
/// `youtu.be/<id>`, `watch?v=<id>`, `shorts/<id>`, `embed/<id>`.
pub fn extract_video_id(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    let host = parsed
        .host_str()?
        .to_ascii_lowercase()
        .trim_start_matches("www.")
        .trim_start_matches("m.")
        .to_string();

    let candidate = match host.as_str() {
        "youtu.be" => parsed.path_segments()?.next().map(ToOwned::to_owned),
        "youtube.com" | "music.youtube.com" => {
            if let Some((_, value)) = parsed.query_pairs().find(|(key, _)| key == "v") {
                Some(value.into_owned())
            } else {
                let mut segments = parsed.path_segments()?;
                match segments.next() {
                    Some("shorts") | Some("embed") => segments.next().map(ToOwned::to_owned),
                    _ => None,
                }
            }
        }
        _ => None,
    }?;

    is_video_id(&candidate).then_some(candidate)
}

/// Turns pasted URLs into day-numbered playlist entries. Unparseable lines
/// are dropped; the survivors must number exactly one per cycle day.
pub fn build_playlist_videos(urls: &[String]) -> Result<Vec<PlaylistVideo>, String> {
    let videos: Vec<PlaylistVideo> = urls
        .iter()
        .filter_map(|url| {
            extract_video_id(url).map(|video_id| (url.trim().to_string(), video_id))
        })
        .enumerate()
        .map(|(index, (url, video_id))| PlaylistVideo {
            url,
            video_id,
            day_number: index as u32 + 1,
        })
        .collect();

    if videos.len() != CYCLE_DAYS as usize {
        return Err(format!(
            "playlist needs exactly {CYCLE_DAYS} valid video links, found {}",
            videos.len()
        ));
    }
    Ok(videos)
}

pub fn video_for_day(playlist: &Playlist, cycle_day: u32) -> Option<&PlaylistVideo> {
    playlist
        .videos
        .iter()
        .find(|video| video.day_number == cycle_day)
}
