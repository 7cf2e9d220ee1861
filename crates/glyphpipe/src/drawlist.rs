//! JSON drawing payload handed from the renderer to the rasterizer.

use std::collections::BTreeSet;

use clap::ValueEnum;
use glyphpipe_frame::{
    FontId, FrameError, GlyphId, Hinting, MaskFormat, ScalerDescriptor, ScalerParams,
};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskArg {
    Bw,
    #[default]
    A8,
    Argb,
}

impl From<MaskArg> for MaskFormat {
    fn from(value: MaskArg) -> Self {
        match value {
            MaskArg::Bw => MaskFormat::Bw,
            MaskArg::A8 => MaskFormat::A8,
            MaskArg::Argb => MaskFormat::Argb,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintingArg {
    None,
    Slight,
    #[default]
    Normal,
    Full,
}

impl From<HintingArg> for Hinting {
    fn from(value: HintingArg) -> Self {
        match value {
            HintingArg::None => Hinting::None,
            HintingArg::Slight => Hinting::Slight,
            HintingArg::Normal => Hinting::Normal,
            HintingArg::Full => Hinting::Full,
        }
    }
}

fn default_scale() -> f32 {
    1.0
}

/// Scaler settings for one run, in the form they appear in the JSON payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    pub size: f32,
    #[serde(default = "default_scale")]
    pub scale_x: f32,
    #[serde(default)]
    pub skew_x: f32,
    #[serde(default)]
    pub hinting: HintingArg,
    #[serde(default)]
    pub mask: MaskArg,
    #[serde(default)]
    pub embolden: bool,
    #[serde(default)]
    pub vertical: bool,
}

impl RunParams {
    pub fn with_size(size: f32) -> Self {
        Self {
            size,
            scale_x: 1.0,
            skew_x: 0.0,
            hinting: HintingArg::default(),
            mask: MaskArg::default(),
            embolden: false,
            vertical: false,
        }
    }

    pub fn scaler_params(&self) -> ScalerParams {
        let mut flags = 0;
        if self.embolden {
            flags |= ScalerParams::FLAG_EMBOLDEN;
        }
        if self.vertical {
            flags |= ScalerParams::FLAG_VERTICAL;
        }
        ScalerParams {
            text_size: self.size,
            scale_x: self.scale_x,
            skew_x: self.skew_x,
            hinting: self.hinting.into(),
            mask_format: self.mask.into(),
            flags,
            ..ScalerParams::default()
        }
    }

    pub fn descriptor(&self) -> Result<ScalerDescriptor, FrameError> {
        ScalerDescriptor::new(&self.scaler_params())
    }
}

/// A run of glyphs drawn with one font and one set of scaler settings.
///
/// Glyphs are given either explicitly or as text, where each character maps
/// to the glyph id of its code point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub font_id: u32,
    pub params: RunParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub glyphs: Vec<GlyphId>,
}

impl TextRun {
    pub fn font(&self) -> FontId {
        FontId(self.font_id)
    }

    pub fn glyph_ids(&self) -> Vec<GlyphId> {
        if !self.glyphs.is_empty() {
            return self.glyphs.clone();
        }
        self.text
            .as_deref()
            .unwrap_or_default()
            .chars()
            .map(|c| GlyphId::try_from(u32::from(c)).unwrap_or(0))
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DrawListError {
    #[error("invalid draw list JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("run {index} has neither text nor glyphs")]
    EmptyRun { index: usize },

    #[error("run {index} has unusable scaler settings: {source}")]
    Params { index: usize, source: FrameError },
}

/// The full drawing payload: an ordered list of runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawList {
    pub runs: Vec<TextRun>,
}

impl DrawList {
    /// A single run of `text`.
    pub fn from_text(text: &str, font_id: u32, params: RunParams) -> Self {
        Self {
            runs: vec![TextRun {
                font_id,
                params,
                text: Some(text.to_string()),
                glyphs: Vec::new(),
            }],
        }
    }

    /// Parse and validate a payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, DrawListError> {
        let list: DrawList = serde_json::from_slice(bytes)?;
        list.validate()?;
        Ok(list)
    }

    pub fn encode(&self) -> Result<Vec<u8>, DrawListError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn validate(&self) -> Result<(), DrawListError> {
        for (index, run) in self.runs.iter().enumerate() {
            if run.glyphs.is_empty() && run.text.as_deref().is_none_or(str::is_empty) {
                return Err(DrawListError::EmptyRun { index });
            }
            run.params
                .descriptor()
                .map_err(|source| DrawListError::Params { index, source })?;
        }
        Ok(())
    }

    /// Distinct fonts referenced by any run.
    pub fn fonts(&self) -> BTreeSet<FontId> {
        self.runs.iter().map(TextRun::font).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_maps_to_code_points() {
        let list = DrawList::from_text("AB", 1, RunParams::with_size(12.0));
        assert_eq!(list.runs[0].glyph_ids(), vec![65, 66]);
    }

    #[test]
    fn explicit_glyphs_win_over_text() {
        let run = TextRun {
            font_id: 1,
            params: RunParams::with_size(12.0),
            text: Some("ignored".into()),
            glyphs: vec![10, 11],
        };
        assert_eq!(run.glyph_ids(), vec![10, 11]);
    }

    #[test]
    fn decode_fills_defaults() {
        let json = br#"{"runs":[{"font_id":3,"params":{"size":18},"glyphs":[1,2]}]}"#;
        let list = DrawList::decode(json).unwrap();
        let params = &list.runs[0].params;
        assert_eq!(params.scale_x, 1.0);
        assert_eq!(params.mask, MaskArg::A8);
        assert_eq!(params.hinting, HintingArg::Normal);
        assert_eq!(list.fonts().into_iter().collect::<Vec<_>>(), vec![FontId(3)]);
    }

    #[test]
    fn encoded_list_decodes_identically() {
        let mut params = RunParams::with_size(20.0);
        params.mask = MaskArg::Argb;
        params.embolden = true;
        let list = DrawList::from_text("glyph", 2, params);
        let decoded = DrawList::decode(&list.encode().unwrap()).unwrap();
        assert_eq!(decoded, list);
        assert_eq!(
            decoded.runs[0].params.scaler_params().flags,
            ScalerParams::FLAG_EMBOLDEN
        );
    }

    #[test]
    fn empty_run_rejected() {
        let json = br#"{"runs":[{"font_id":1,"params":{"size":12},"text":""}]}"#;
        assert!(matches!(
            DrawList::decode(json),
            Err(DrawListError::EmptyRun { index: 0 })
        ));
    }

    #[test]
    fn bad_size_rejected() {
        let json = br#"{"runs":[{"font_id":1,"params":{"size":-4},"glyphs":[1]}]}"#;
        assert!(matches!(
            DrawList::decode(json),
            Err(DrawListError::Params { index: 0, .. })
        ));
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(DrawList::decode(b"{runs"), Err(DrawListError::Json(_))));
    }
}
