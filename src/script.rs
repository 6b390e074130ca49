//! Normalization of chat model output into the canonical video script shape.
//!
//! Models asked for a video script reply in a handful of shapes depending on
//! prompt phrasing: `{ "video_script": [...] }`, `{ "scenes": [...] }`, or a
//! bare array of scenes. Each known shape is tried in a fixed priority order
//! and produces the same canonical structure; anything else is a structural
//! error carrying the parsed value for diagnosis.

use serde::Serialize;
use serde_json::Value;

use crate::error::Error;

/// Canonical script structure: a sequence of scenes under `video_script`.
///
/// Scene contents are whatever the model produced per item; per-item shape is
/// deliberately not validated.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VideoScript {
    pub video_script: Vec<Value>,
}

/// The upstream shape a reply was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptShape {
    /// Object already carrying an array-valued `video_script`
    Canonical,
    /// Object carrying the scene list under `scenes`
    ScenesKey,
    /// Bare array of scenes
    BareArray,
}

/// Parse raw model text into a [`VideoScript`].
///
/// Fails with [`Error::Parse`] (raw text preserved verbatim) when the text is
/// not JSON, and with [`Error::Structure`] (parsed value attached) when the
/// JSON matches none of the known shapes.
pub fn parse_script(text: &str) -> Result<(VideoScript, ScriptShape), Error> {
    let parsed: Value = serde_json::from_str(text).map_err(|_| Error::Parse {
        message: "Invalid JSON returned by model".to_string(),
        raw: text.to_string(),
    })?;

    normalize(parsed)
}

/// Normalize a parsed JSON value into the canonical shape.
///
/// Priority order:
/// 1. object with array-valued `video_script` (wins over a coexisting `scenes`)
/// 2. object with array-valued `scenes`
/// 3. bare array, wrapped unchanged
pub fn normalize(parsed: Value) -> Result<(VideoScript, ScriptShape), Error> {
    if let Value::Object(ref map) = parsed {
        if let Some(Value::Array(scenes)) = map.get("video_script") {
            return Ok((
                VideoScript {
                    video_script: scenes.clone(),
                },
                ScriptShape::Canonical,
            ));
        }

        // `scenes` only applies when `video_script` is absent or null; any
        // other non-array value blocks the fallback and fails structurally
        if matches!(map.get("video_script"), None | Some(Value::Null)) {
            if let Some(Value::Array(scenes)) = map.get("scenes") {
                return Ok((
                    VideoScript {
                        video_script: scenes.clone(),
                    },
                    ScriptShape::ScenesKey,
                ));
            }
        }
    }

    if let Value::Array(scenes) = parsed {
        return Ok((
            VideoScript {
                video_script: scenes,
            },
            ScriptShape::BareArray,
        ));
    }

    Err(Error::Structure {
        message: "Model did not return a valid video_script structure".to_string(),
        raw: parsed,
    })
}
