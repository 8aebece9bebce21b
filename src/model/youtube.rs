// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! YouTube link handling.
//!
//! Registered links are stored as the user typed them, the video id is
//! extracted whenever a playable [`Track`](super::Track) is built.

const VIDEO_ID_LEN: usize = 11;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Extracts the 11 character video id from a YouTube link.
///
/// Recognised forms are `youtu.be/<id>`, `/v/<id>`, `/u/<x>/<id>`,
/// `embed/<id>`, `watch?v=<id>` and `&v=<id>`. When several markers appear,
/// the last one in the link wins. The id runs up to the first `#`, `&` or
/// `?`.
///
/// Returns `None` when no marker is present or the id is not exactly 11
/// characters long.
pub(crate) fn extract_video_id(url: &str) -> Option<String> {
    let chars: Vec<char> = url.chars().collect();

    let id_start = (0..chars.len())
        .rev()
        .find_map(|start| marker_len(&chars[start..]).map(|len| start + len))?;

    let id: String = chars[id_start..]
        .iter()
        .take_while(|c| !matches!(c, '#' | '&' | '?'))
        .collect();

    (id.chars().count() == VIDEO_ID_LEN).then_some(id)
}

/// Builds the canonical watch page link for a video id.
pub(crate) fn watch_url(video_id: &str) -> String {
    format!("{}{}", WATCH_URL, video_id)
}

// Length of the marker matching at the start of `s`, if any.
fn marker_len(s: &[char]) -> Option<usize> {
    let starts_with = |prefix: &str| {
        prefix.chars().count() <= s.len() && prefix.chars().zip(s).all(|(p, c)| p == *c)
    };

    // "youtu" + any character + "be/"
    if starts_with("youtu") && s.len() >= 9 && s[6..9] == ['b', 'e', '/'] {
        return Some(9);
    }
    if starts_with("v/") {
        return Some(2);
    }
    // "u/" + one word character + "/"
    if starts_with("u/") && s.len() >= 4 && is_word_char(s[2]) && s[3] == '/' {
        return Some(4);
    }

    ["embed/", "watch?v=", "&v="]
        .into_iter()
        .find(|marker| starts_with(marker))
        .map(|marker| marker.len())
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_common_link_shapes() {
        let expected = Some("dQw4w9WgXcQ".to_string());

        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), expected);
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=42"), expected);
        assert_eq!(extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"), expected);
        assert_eq!(extract_video_id("https://www.youtube.com/v/dQw4w9WgXcQ#t=1"), expected);
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"),
            expected
        );
        assert_eq!(extract_video_id("https://www.youtube.com/u/w/dQw4w9WgXcQ"), expected);
    }

    #[test]
    fn rejects_ids_of_the_wrong_length() {
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQX"), None);
    }

    #[test]
    fn rejects_links_without_a_marker() {
        assert_eq!(extract_video_id("https://example.com/song.mp3"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn last_marker_wins() {
        // The "v/" inside the path is earlier than the query marker.
        let url = "https://www.youtube.com/v/aaaaaaaaaaa?&v=dQw4w9WgXcQ";
        assert_eq!(extract_video_id(url), Some("dQw4w9WgXcQ".to_string()));
    }

    #[test]
    fn watch_url_round_trips() {
        assert_eq!(extract_video_id(&watch_url("dQw4w9WgXcQ")), Some("dQw4w9WgXcQ".to_string()));
    }
}
