use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ctx::UserId, storage::StorageId, Error, Result};

pub type NoteId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Note {
    pub id: NoteId,
    pub owner: UserId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub image_ref: Option<StorageId>,
    pub image_url: Option<String>,
    /// Image to show for the note, resolved when the note is read.
    pub display_image_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Note {
    pub fn image(&self) -> NoteImage {
        NoteImage::from_columns(self.image_ref, self.image_url.clone())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// The image attached to a note. Stored as the `image_ref` / `image_url` column pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NoteImage {
    #[default]
    None,
    Blob(StorageId),
    ExternalUrl(String),
}

impl NoteImage {
    pub fn from_columns(image_ref: Option<StorageId>, image_url: Option<String>) -> Self {
        match (image_ref, non_empty(image_url)) {
            (Some(storage_id), _) => Self::Blob(storage_id),
            (None, Some(url)) => Self::ExternalUrl(url),
            (None, None) => Self::None,
        }
    }

    pub fn into_columns(self) -> (Option<StorageId>, Option<String>) {
        match self {
            Self::None => (None, None),
            Self::Blob(storage_id) => (Some(storage_id), None),
            Self::ExternalUrl(url) => (None, Some(url)),
        }
    }

    /// Image for a note being replaced: a fresh upload wins, then a changed url,
    /// otherwise the previous image stays.
    pub fn for_update(previous: &NoteImage, uploaded: Option<StorageId>, image_url: Option<String>) -> Self {
        if let Some(storage_id) = uploaded {
            return Self::Blob(storage_id);
        }

        let image_url = non_empty(image_url);
        let previous_url = match previous {
            Self::ExternalUrl(url) => Some(url.as_str()),
            _ => None,
        };

        if image_url.as_deref() != previous_url {
            return image_url.map(Self::ExternalUrl).unwrap_or_default();
        }

        previous.clone()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Full set of writable fields, already validated.
#[derive(Debug, Clone)]
pub struct NoteFields {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub image: NoteImage,
}

/// Note as submitted by a client for create and update.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoteForm {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Storage key of a freshly uploaded image.
    pub image_ref: Option<StorageId>,
    pub image_url: Option<String>,
}

impl NoteForm {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("Title is required".into()));
        }
        if self.content.trim().is_empty() {
            return Err(Error::Validation("Content is required".into()));
        }
        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(Error::Validation("Tags must not be empty".into()));
        }
        Ok(())
    }

    pub fn into_new_note(self) -> Result<NoteFields> {
        self.validate()?;

        let image = NoteImage::from_columns(self.image_ref, self.image_url);
        Ok(NoteFields {
            title: self.title,
            content: self.content,
            tags: self.tags,
            image,
        })
    }

    /// Replacement for a note whose current image is `previous`. Call
    /// [`NoteForm::validate`] first.
    pub fn into_replacement(self, previous: &NoteImage) -> NoteFields {
        let image = NoteImage::for_update(previous, self.image_ref, self.image_url);
        NoteFields {
            title: self.title,
            content: self.content,
            tags: self.tags,
            image,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchNotesQuery {
    #[serde(default)]
    pub query: String,
    pub tag: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct FindNotesResponse {
    pub results: Vec<Note>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateNoteResponse {
    pub id: NoteId,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct TagsResponse {
    pub results: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> NoteForm {
        NoteForm {
            title: "Mua sắm".into(),
            content: "Sữa, trứng".into(),
            tags: vec!["nhà".into()],
            image_ref: None,
            image_url: None,
        }
    }

    #[test]
    fn upload_replaces_url() {
        let previous = NoteImage::ExternalUrl("https://example.com/a.png".into());
        let uploaded = Uuid::now_v7();

        let image = NoteImage::for_update(&previous, Some(uploaded), Some("https://example.com/a.png".into()));

        assert_eq!(image, NoteImage::Blob(uploaded));
        assert_eq!(image.into_columns(), (Some(uploaded), None));
    }

    #[test]
    fn changed_url_replaces_blob() {
        let previous = NoteImage::Blob(Uuid::now_v7());

        let image = NoteImage::for_update(&previous, None, Some("https://example.com/b.png".into()));

        assert_eq!(image, NoteImage::ExternalUrl("https://example.com/b.png".into()));
    }

    #[test]
    fn unchanged_url_keeps_previous() {
        let blob = NoteImage::Blob(Uuid::now_v7());
        assert_eq!(NoteImage::for_update(&blob, None, None), blob);
        assert_eq!(NoteImage::for_update(&blob, None, Some("".into())), blob);

        let url = NoteImage::ExternalUrl("https://example.com/a.png".into());
        assert_eq!(
            NoteImage::for_update(&url, None, Some("https://example.com/a.png".into())),
            url
        );
    }

    #[test]
    fn cleared_url_removes_image() {
        let url = NoteImage::ExternalUrl("https://example.com/a.png".into());

        assert_eq!(NoteImage::for_update(&url, None, None), NoteImage::None);
    }

    #[test]
    fn blob_wins_on_create() {
        let storage_id = Uuid::now_v7();
        let fields = NoteForm {
            image_ref: Some(storage_id),
            image_url: Some("https://example.com/a.png".into()),
            ..form()
        }
        .into_new_note()
        .unwrap();

        assert_eq!(fields.image, NoteImage::Blob(storage_id));
    }

    #[test]
    fn rejects_blank_fields() {
        let blank_title = NoteForm {
            title: "  ".into(),
            ..form()
        };
        assert!(matches!(blank_title.validate(), Err(Error::Validation(_))));

        let blank_content = NoteForm {
            content: "".into(),
            ..form()
        };
        assert!(matches!(blank_content.validate(), Err(Error::Validation(_))));

        let blank_tag = NoteForm {
            tags: vec!["ok".into(), "".into()],
            ..form()
        };
        assert!(matches!(blank_tag.validate(), Err(Error::Validation(_))));

        assert!(form().validate().is_ok());
    }
}
