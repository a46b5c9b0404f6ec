//! Stable wire payload for vector index records.
//!
//! Field names are a compatibility contract: `concept_id`, `folder_id`
//! (legacy single-folder), `primary_folder`, `reference_folders`, and
//! `placement_confidences`. Legacy records carrying only `folder_id` are
//! normalized here, once, into the canonical [`Placement`]; the rest of
//! the core never branches on "is this a legacy record".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use arbor_core::Placement;

/// Serialized placement payload attached to each index record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPayload {
    pub concept_id: Uuid,
    /// Legacy single-folder field. Written by old indexers only; new
    /// payloads always use `primary_folder`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_folder: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_folders: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub placement_confidences: HashMap<Uuid, f32>,
}

impl IndexPayload {
    /// Serialize a canonical placement. Never writes the legacy field.
    pub fn from_placement(placement: &Placement) -> Self {
        Self {
            concept_id: placement.concept_id,
            folder_id: None,
            primary_folder: placement.primary_folder,
            reference_folders: placement.reference_folders.clone(),
            placement_confidences: placement.confidences.clone(),
        }
    }

    /// Normalize into the canonical placement record.
    ///
    /// A record with only `folder_id` set is treated as
    /// `primary_folder = folder_id`, `reference_folders = []`. When both
    /// fields are present, `primary_folder` wins.
    pub fn normalize(self) -> Placement {
        let primary = self.primary_folder.or(self.folder_id);
        Placement {
            concept_id: self.concept_id,
            primary_folder: primary,
            reference_folders: self.reference_folders,
            confidences: self.placement_confidences,
        }
    }
}
