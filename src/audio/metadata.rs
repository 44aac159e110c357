//! Audio file metadata extraction using the `lofty` crate.
//!
//! Used as a fallback for track properties that the decoder cannot determine
//! up front, such as the duration of MP3 streams without a frame count.

use std::path::Path;

use {
    lofty::{
        error::LoftyError,
        prelude::{AudioFile, TaggedFileExt},
        probe::Probe,
        tag::Accessor,
    },
    serde::{Deserialize, Serialize},
    thiserror::Error,
};

/// Error type for metadata extraction operations.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Failed to read or parse the audio file.
    #[error("Failed to read audio file: {0}")]
    ReadError(#[from] LoftyError),
}

/// Tag and property metadata of a single track.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Track title from the primary tag.
    pub title: Option<String>,
    /// Track artist from the primary tag.
    pub artist: Option<String>,
    /// Duration in milliseconds as estimated by `lofty`.
    pub duration_ms: u64,
}

impl TrackMetadata {
    /// Formats the tag fields for display as `"Artist - Title"`.
    ///
    /// # Returns
    ///
    /// The title or artist alone when only one is tagged, or `None` when
    /// neither is.
    #[must_use]
    pub fn display_line(&self) -> Option<String> {
        let title = self.title.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let artist = self.artist.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match (artist, title) {
            (Some(artist), Some(title)) => Some(format!("{artist} - {title}")),
            (None, Some(only)) | (Some(only), None) => Some(only.to_string()),
            (None, None) => None,
        }
    }
}

/// Reads tags and audio properties from files.
pub struct TagReader;

impl TagReader {
    /// Reads metadata from an audio file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the audio file.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError` if the file cannot be read or parsed.
    pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<TrackMetadata, MetadataError> {
        let tagged_file = Probe::open(path.as_ref())?.read()?;
        let primary_tag = tagged_file.primary_tag();

        Ok(TrackMetadata {
            title: primary_tag.and_then(|tag| tag.title().map(|s| s.to_string())),
            artist: primary_tag.and_then(|tag| tag.artist().map(|s| s.to_string())),
            duration_ms: u64::try_from(tagged_file.properties().duration().as_millis())
                .unwrap_or(u64::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::audio::metadata::{TagReader, TrackMetadata};

    #[test]
    fn test_read_metadata_missing_file() {
        let result = TagReader::read_metadata("/nonexistent/track.mp3");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read audio file")
        );
    }

    #[test]
    fn test_track_metadata_default() {
        let metadata = TrackMetadata::default();
        assert!(metadata.title.is_none());
        assert!(metadata.artist.is_none());
        assert_eq!(metadata.duration_ms, 0);
        assert_eq!(metadata.display_line(), None);
    }

    #[test]
    fn test_display_line() {
        let mut metadata = TrackMetadata {
            title: Some("Jak".to_string()),
            artist: Some("Kapela".to_string()),
            duration_ms: 1000,
        };
        assert_eq!(metadata.display_line().as_deref(), Some("Kapela - Jak"));

        metadata.artist = Some("  ".to_string());
        assert_eq!(metadata.display_line().as_deref(), Some("Jak"));

        metadata.title = None;
        metadata.artist = Some("Kapela".to_string());
        assert_eq!(metadata.display_line().as_deref(), Some("Kapela"));
    }
}
