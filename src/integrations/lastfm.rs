use serde_json::{Value, json};

use crate::{constants::LASTFM_API_URL, error::ServiceError};

/// The track currently scrobbling, or `None` when nothing is playing.
pub async fn now_playing(
    client: &reqwest::Client,
    api_key: &str,
    username: &str,
) -> Result<Option<Value>, ServiceError> {
    let response = client
        .get(LASTFM_API_URL)
        .query(&[
            ("method", "user.getrecenttracks"),
            ("user", username),
            ("api_key", api_key),
            ("format", "json"),
            ("limit", "1"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ServiceError::Upstream(format!(
            "Last.fm returned status {}",
            response.status()
        )));
    }

    let data: Value = response.json().await?;
    Ok(current_track(&data))
}

fn current_track(data: &Value) -> Option<Value> {
    let track = match &data["recenttracks"]["track"] {
        Value::Array(tracks) => tracks.first()?,
        track @ Value::Object(_) => track,
        _ => return None,
    };

    let attr = &track["@attr"];
    if attr["nowplaying"].as_str() != Some("true") {
        return None;
    }

    Some(json!({
        "name": track["name"],
        "artist": { "#text": track["artist"]["#text"] },
        "url": track["url"],
        "@attr": attr,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::current_track;

    #[test]
    fn returns_track_only_while_playing() {
        let playing = json!({
            "recenttracks": { "track": [{
                "name": "Song",
                "artist": { "#text": "Band", "mbid": "" },
                "url": "https://last.fm/song",
                "@attr": { "nowplaying": "true" },
            }]}
        });
        let track = current_track(&playing).unwrap();
        assert_eq!(track["name"], "Song");
        assert_eq!(track["artist"]["#text"], "Band");
        assert!(track["artist"].get("mbid").is_none());

        let finished = json!({
            "recenttracks": { "track": [{ "name": "Song", "artist": { "#text": "Band" } }] }
        });
        assert!(current_track(&finished).is_none());
        assert!(current_track(&json!({ "recenttracks": { "track": [] } })).is_none());
    }
}
