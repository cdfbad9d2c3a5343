use serde::{Deserialize, Serialize};

use podgate_core::constants::MAX_IMAGE_LENGTH;
use podgate_core::error::GateError;
use podgate_core::msg::{is_checksum, Metadata};
use podgate_core::types::Address;
use podgate_store::{Model, ModelBucket};

pub const BUCKET_NAME: &str = "artifact";
pub const CHECKSUM_INDEX: &str = "checksum";

/// A permitted container image reference. The primary key is the image
/// bytes; artifacts are never mutated in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub metadata: Metadata,
    pub image: String,
    pub checksum: String,
    pub owner: Address,
}

impl Model for Artifact {
    fn validate(&self) -> Result<(), GateError> {
        self.metadata.validate()?;
        match self.image.len() {
            0 => return Err(GateError::Invalid("image must not be empty".into())),
            l if l > MAX_IMAGE_LENGTH => {
                return Err(GateError::Invalid(format!(
                    "image must not exceed {MAX_IMAGE_LENGTH} bytes"
                )))
            }
            _ => {}
        }
        if !is_checksum(&self.checksum) {
            return Err(GateError::Invalid(format!(
                "checksum {:?} does not match the checksum grammar",
                self.checksum
            )));
        }
        Ok(())
    }
}

fn checksum_index(a: &Artifact) -> Vec<Vec<u8>> {
    vec![a.checksum.clone().into_bytes()]
}

/// The artifact collection: keyed by image bytes, with a non-unique
/// checksum index.
pub fn bucket() -> ModelBucket<Artifact> {
    ModelBucket::new(BUCKET_NAME).with_index(CHECKSUM_INDEX, checksum_index, false)
}
