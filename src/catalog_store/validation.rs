//! Structural checks on caller input, run before any store access.

use super::models::{GenreRef, NewEntity, NewTrack, TrackUpdate};
use std::fmt;

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField { field: &'static str },
    AmbiguousGenre,
    MissingGenre,
    EmptyBatch,
    EmptyUpdate,
    Malformed(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField { field } => {
                write!(f, "Field '{}' is required but was empty", field)
            }
            ValidationError::AmbiguousGenre => {
                write!(f, "Only one of 'genre_id' and 'genre_name' may be given")
            }
            ValidationError::MissingGenre => {
                write!(f, "One of 'genre_id' or 'genre_name' is required")
            }
            ValidationError::EmptyBatch => write!(f, "Batch must contain at least one track"),
            ValidationError::EmptyUpdate => write!(f, "Update must change at least one field"),
            ValidationError::Malformed(reason) => write!(f, "Malformed request: {}", reason),
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = Result<T, ValidationError>;

fn require(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

fn require_if_present(field: &'static str, value: Option<&str>) -> ValidationResult<()> {
    match value {
        Some(v) => require(field, v),
        None => Ok(()),
    }
}

fn genre_ref(id: Option<&str>, name: Option<&str>) -> ValidationResult<Option<GenreRef>> {
    match (id, name) {
        (Some(_), Some(_)) => Err(ValidationError::AmbiguousGenre),
        (Some(id), None) => {
            require("genre_id", id)?;
            Ok(Some(GenreRef::Id(id.to_string())))
        }
        (None, Some(name)) => {
            require("genre_name", name)?;
            Ok(Some(GenreRef::Name(name.to_string())))
        }
        (None, None) => Ok(None),
    }
}

/// Validates a creation body and returns the genre reference it carries.
pub fn validate_new_track(track: &NewTrack) -> ValidationResult<GenreRef> {
    require_if_present("id", track.id.as_deref())?;
    require("name", &track.name)?;
    require("url", &track.url)?;
    require("artist_id", &track.artist_id)?;
    require("album_id", &track.album_id)?;
    genre_ref(track.genre_id.as_deref(), track.genre_name.as_deref())?
        .ok_or(ValidationError::MissingGenre)
}

/// Validates a partial update and returns the genre reference, if any.
pub fn validate_track_update(update: &TrackUpdate) -> ValidationResult<Option<GenreRef>> {
    if update.is_empty() {
        return Err(ValidationError::EmptyUpdate);
    }
    require_if_present("name", update.name.as_deref())?;
    require_if_present("url", update.url.as_deref())?;
    require_if_present("artist_id", update.artist_id.as_deref())?;
    require_if_present("album_id", update.album_id.as_deref())?;
    genre_ref(update.genre_id.as_deref(), update.genre_name.as_deref())
}

pub fn validate_new_entity(entity: &NewEntity) -> ValidationResult<()> {
    require_if_present("id", entity.id.as_deref())?;
    require("name", &entity.name)
}

pub fn validate_name(name: &str) -> ValidationResult<()> {
    require("name", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_track() -> NewTrack {
        NewTrack {
            name: "Song".to_string(),
            url: "http://example.com/song.mp3".to_string(),
            genre_id: Some("g-1".to_string()),
            artist_id: "a-1".to_string(),
            album_id: "b-1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_valid_track() {
        assert_eq!(
            validate_new_track(&valid_track()),
            Ok(GenreRef::Id("g-1".to_string()))
        );
    }

    #[test]
    fn accepts_genre_by_name() {
        let mut track = valid_track();
        track.genre_id = None;
        track.genre_name = Some("Rock".to_string());
        assert_eq!(
            validate_new_track(&track),
            Ok(GenreRef::Name("Rock".to_string()))
        );
    }

    #[test]
    fn rejects_blank_name() {
        let mut track = valid_track();
        track.name = "   ".to_string();
        assert!(matches!(
            validate_new_track(&track),
            Err(ValidationError::EmptyField { field: "name" })
        ));
    }

    #[test]
    fn rejects_blank_artist() {
        let mut track = valid_track();
        track.artist_id = String::new();
        assert!(matches!(
            validate_new_track(&track),
            Err(ValidationError::EmptyField { field: "artist_id" })
        ));
    }

    #[test]
    fn rejects_missing_and_ambiguous_genre() {
        let mut track = valid_track();
        track.genre_id = None;
        assert_eq!(validate_new_track(&track), Err(ValidationError::MissingGenre));

        track.genre_id = Some("g-1".to_string());
        track.genre_name = Some("Rock".to_string());
        assert_eq!(
            validate_new_track(&track),
            Err(ValidationError::AmbiguousGenre)
        );
    }

    #[test]
    fn rejects_empty_update() {
        assert_eq!(
            validate_track_update(&TrackUpdate::default()),
            Err(ValidationError::EmptyUpdate)
        );
    }

    #[test]
    fn update_with_only_name_has_no_genre() {
        let update = TrackUpdate {
            name: Some("New".to_string()),
            ..Default::default()
        };
        assert_eq!(validate_track_update(&update), Ok(None));
    }

    #[test]
    fn rejects_blank_entity_name() {
        let entity = NewEntity {
            id: None,
            name: "".to_string(),
        };
        assert!(validate_new_entity(&entity).is_err());
        assert!(validate_name("Renamed").is_ok());
    }
}
