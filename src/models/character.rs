use serde::{Deserialize, Serialize};

use crate::archive;

/// Number of character reference slots.
pub const CHARACTER_SLOTS: u8 = 4;

/// Identity of a character slot, `1..=CHARACTER_SLOTS`.
pub type CharacterId = u8;

/// An uploaded reference image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceImage {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ReferenceImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

/// A reference character used to keep generated images visually consistent.
///
/// A character can only be marked as selected while it has an image; clearing
/// the image always deselects it. The fields are private so that every change
/// goes through the methods below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Character {
    id: CharacterId,
    image: Option<ReferenceImage>,
    /// Base64 form of `image`, kept alongside it so it is computed once per upload.
    image_base64: Option<String>,
    selected: bool,
}

impl Character {
    pub fn new(id: CharacterId) -> Self {
        Self {
            id,
            image: None,
            image_base64: None,
            selected: false,
        }
    }

    /// The fixed set of empty character slots.
    pub fn slots() -> Vec<Self> {
        (1..=CHARACTER_SLOTS).map(Self::new).collect()
    }

    pub fn id(&self) -> CharacterId {
        self.id
    }

    pub fn image(&self) -> Option<&ReferenceImage> {
        self.image.as_ref()
    }

    pub fn image_base64(&self) -> Option<&str> {
        self.image_base64.as_deref()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Selected and carrying an image, i.e. usable as a generation reference.
    pub fn is_ready(&self) -> bool {
        self.selected && self.image.is_some()
    }

    /// Attach an uploaded image. Uploading auto-selects the slot.
    pub fn attach_image(&mut self, image: ReferenceImage) {
        self.image_base64 = Some(archive::encode_file(&image.bytes));
        self.image = Some(image);
        self.selected = true;
    }

    pub fn clear_image(&mut self) {
        self.image = None;
        self.image_base64 = None;
        self.selected = false;
    }

    /// Returns `false` (and changes nothing) when selecting a slot without an image.
    pub fn set_selected(&mut self, selected: bool) -> bool {
        if selected && self.image.is_none() {
            return false;
        }
        self.selected = selected;
        true
    }
}
