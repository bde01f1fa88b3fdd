//! Test doubles for the external collaborators

use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;

use pdfqa_core::{
    DecodingConfig, EmbeddingProvider, Error, GenerationModel, IngestionError, PageText,
    PdfTextExtractor, Result,
};

/// `w0 w1 ... w{n-1}`
pub fn numbered_words(n: usize) -> String {
    (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
}

/// Three pages of a dishwasher manual: loading, filter care, error codes
pub const DISHWASHER_MANUAL: [&str; 3] = [
    "Before the first wash, make sure the dishwasher is level and connected to the cold water supply. Load plates in the lower basket facing the centre and place glasses, cups and small bowls in the upper basket. Large pots and pans go at the back of the lower basket so they do not block the spray arms. Cutlery belongs in the basket with handles pointing down, except sharp knives, which should lie flat in the upper rack. Do not overload the machine, because water must reach every surface to wash it. Add detergent to the dispenser in the door and close the lid until it clicks. Rinse aid improves drying and prevents spots on glassware; refill it when the indicator light comes on. Select a programme with the selector knob and press start. The door locks while the programme runs and opens automatically after drying.",
    "The filter system sits at the bottom of the tub under the lower spray arm. Food particles collect in the coarse filter and the fine mesh filter, and a blocked filter leaves dirty residue on dishes. Check and clean the filters every two weeks, or sooner when you wash heavily soiled loads. To remove the filter, turn the cylinder anticlockwise and lift it out, then pull the flat mesh plate forward. Rinse both parts under running tap water and use a soft brush to scrub away grease. Never use a wire brush or scouring pad, as they damage the mesh. Put the flat plate back first, then insert the cylinder and turn it clockwise until the arrows line up. Running the dishwasher without the filter in place can damage the pump and voids the warranty. Wipe the door seal with a damp cloth at the same time.",
    "If a fault occurs, the display shows an error code and the programme stops. Error E24 means the water is not draining: the drain hose may be kinked, the sink trap blocked, or the outlet clogged with food. Straighten the hose, clear the trap and restart the programme. Error E15 indicates water in the base tray caused by a leak; switch off the supply tap and call customer service. Error E09 points to a heating element fault, which a technician must repair. When the display shows E01, the door is not closed properly, so press it firmly until it latches. Codes not listed in this table require a qualified service engineer. Before contacting support, note the model number printed on the label inside the door edge and the error code shown on the display.",
];

/// The manual as extracted pages 1 to 3
pub fn dishwasher_pages() -> Vec<PageText> {
    DISHWASHER_MANUAL
        .iter()
        .zip(1..)
        .map(|(text, page)| PageText::new(page, *text))
        .collect()
}

/// Extractor returning canned pages, or failing as if the file were unreadable
pub struct ScriptedExtractor {
    pages: Option<Vec<PageText>>,
}

impl ScriptedExtractor {
    pub fn pages(pages: Vec<PageText>) -> Self {
        Self { pages: Some(pages) }
    }

    pub fn unreadable() -> Self {
        Self { pages: None }
    }
}

#[async_trait]
impl PdfTextExtractor for ScriptedExtractor {
    async fn extract(&self, path: &Path) -> std::result::Result<Vec<PageText>, IngestionError> {
        self.pages.clone().ok_or_else(|| IngestionError::Unreadable {
            path: path.display().to_string(),
            reason: "scripted failure".to_string(),
        })
    }
}

/// Embedder whose every call fails
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::EmbeddingProvider("embedding service unavailable".to_string()))
    }

    fn dimension(&self) -> usize {
        384
    }

    fn model_id(&self) -> &str {
        "failing"
    }
}

/// Model that answers with a fixed reply and records every prompt it sees
pub struct RecordingModel {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl RecordingModel {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationModel for RecordingModel {
    async fn generate(&self, prompt: &str, _config: &DecodingConfig) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn model_id(&self) -> &str {
        "recording"
    }
}

/// Model whose every call fails
pub struct FailingModel;

#[async_trait]
impl GenerationModel for FailingModel {
    async fn generate(&self, _prompt: &str, _config: &DecodingConfig) -> Result<String> {
        Err(Error::Timeout("Request timed out".to_string()))
    }

    fn model_id(&self) -> &str {
        "failing"
    }
}
