//! Instruction and response schema for the sommelier persona

use serde_json::{json, Value};

/// Instruction sent with every image
pub const SOMMELIER_PROMPT: &str = r#"Analyze this image as a 'Vibe Sommelier'.
Imagine you are a sophisticated expert on aesthetics and music.
Provide a detailed 'Tasting Note' for the room/view/vibe in the `note` field.
Create a creative playlist name that fits the aesthetic in `playlistTitle`.
Identify the dominant color palette as exactly 5 hex codes, ordered left to right as they appear.
Suggest exactly 3 music genres that match this specific scene.
Identify the general mood and intensity (e.g., 'Mellow', 'Energetic')."#;

/// Fields every response must carry
pub const REQUIRED_FIELDS: &[&str] = &[
    "playlistTitle",
    "note",
    "colorPalette",
    "genres",
    "mood",
    "intensity",
];

/// JSON schema the model is instructed to answer with
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "playlistTitle": { "type": "STRING" },
            "note": { "type": "STRING" },
            "colorPalette": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            "genres": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            "mood": { "type": "STRING" },
            "intensity": { "type": "STRING" }
        },
        "required": REQUIRED_FIELDS,
    })
}
