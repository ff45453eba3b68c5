// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Model Capabilities
//!
//! The fixed capability vocabulary attached to model records and required
//! by operations. Capabilities are coarse-grained semantic labels; the
//! engine only ever checks set membership, never interprets them.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// A coarse-grained model capability label.
///
/// The vocabulary is closed; configuration documents referencing an
/// unknown capability fail at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelCapability {
    TextToText,
    TextToImage,
    ImageToText,
    TextImageToText,
    ImageEdit,
    TextToAudio,
    AudioToText,
    TextToEmbedding,
}

impl ModelCapability {
    /// All capabilities in the vocabulary, in declaration order
    pub fn all() -> &'static [ModelCapability] {
        &[
            ModelCapability::TextToText,
            ModelCapability::TextToImage,
            ModelCapability::ImageToText,
            ModelCapability::TextImageToText,
            ModelCapability::ImageEdit,
            ModelCapability::TextToAudio,
            ModelCapability::AudioToText,
            ModelCapability::TextToEmbedding,
        ]
    }
}

impl std::fmt::Display for ModelCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = match self {
            ModelCapability::TextToText => "text_to_text",
            ModelCapability::TextToImage => "text_to_image",
            ModelCapability::ImageToText => "image_to_text",
            ModelCapability::TextImageToText => "text_image_to_text",
            ModelCapability::ImageEdit => "image_edit",
            ModelCapability::TextToAudio => "text_to_audio",
            ModelCapability::AudioToText => "audio_to_text",
            ModelCapability::TextToEmbedding => "text_to_embedding",
        };
        write!(f, "{}", id)
    }
}

impl std::str::FromStr for ModelCapability {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text_to_text" => Ok(ModelCapability::TextToText),
            "text_to_image" => Ok(ModelCapability::TextToImage),
            "image_to_text" => Ok(ModelCapability::ImageToText),
            "text_image_to_text" => Ok(ModelCapability::TextImageToText),
            "image_edit" => Ok(ModelCapability::ImageEdit),
            "text_to_audio" => Ok(ModelCapability::TextToAudio),
            "audio_to_text" => Ok(ModelCapability::AudioToText),
            "text_to_embedding" => Ok(ModelCapability::TextToEmbedding),
            other => Err(PipelineError::InvalidDocument(format!(
                "Unknown model capability: {}",
                other
            ))),
        }
    }
}
