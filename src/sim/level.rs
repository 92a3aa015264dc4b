//! Level data model and persisted level format
//!
//! A level is a terrain profile plus a flat list of typed objects. Levels are
//! validated once at load time; the simulation never sees malformed data.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::heightmap::Heightmap;

/// Only supported document version
pub const LEVEL_VERSION: u32 = 1;

/// Why a level document was rejected
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("Failed to read level: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse level: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported level version: {0}")]
    UnsupportedVersion(u32),

    #[error("Level has no segments")]
    EmptySegments,

    #[error("Segment {index} height is not finite")]
    BadSegment { index: usize },

    #[error("Invalid level metadata: {0}")]
    InvalidMeta(&'static str),

    #[error("Object {index} x={x} is outside [0, {len})")]
    ObjectOutOfRange { index: usize, x: f32, len: usize },

    #[error("Object {index} field `{field}` must be finite and positive")]
    BadObjectField { index: usize, field: &'static str },
}

/// Object types placed along the course
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Start,
    Checkpoint,
    Finish,
    Hazard,
    Wall,
    Collider,
    Decor,
    Sign,
}

impl ObjectKind {
    /// Kinds that end the run on contact
    pub fn is_lethal(&self) -> bool {
        matches!(self, ObjectKind::Hazard | ObjectKind::Wall | ObjectKind::Collider)
    }
}

/// Stable object handle (load order index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId(pub u32);

/// A placed object. `x` is a (real-valued) segment index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelObject {
    #[serde(skip)]
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub x: f32,
    /// World-Y override; defaults to the terrain height at `x`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<i32>,
}

impl LevelObject {
    pub fn new(kind: ObjectKind, x: f32) -> Self {
        Self {
            id: ObjectId::default(),
            kind,
            x,
            y: None,
            width: None,
            height: None,
            radius: None,
            message: None,
            src: None,
            scale: None,
            layer: None,
        }
    }

    pub fn with_y(mut self, y: f32) -> Self {
        self.y = Some(y);
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn check_fields(&self, index: usize) -> Result<(), LevelError> {
        let fields = [
            ("width", self.width),
            ("height", self.height),
            ("radius", self.radius),
            ("scale", self.scale),
        ];
        for (field, value) in fields {
            if value.is_some_and(|v| !(v.is_finite() && v > 0.0)) {
                return Err(LevelError::BadObjectField { index, field });
            }
        }
        if self.y.is_some_and(|y| !y.is_finite()) {
            return Err(LevelError::BadObjectField { index, field: "y" });
        }
        Ok(())
    }
}

/// Level metadata block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelMeta {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default = "default_virtual_height")]
    pub virtual_height: f32,
    #[serde(default = "default_segment_len")]
    pub segment_len: f32,
    #[serde(default)]
    pub avalanche_speed: f32,
    #[serde(default)]
    pub assets: Vec<String>,
}

fn default_segment_len() -> f32 {
    8.0
}

fn default_virtual_height() -> f32 {
    600.0
}

impl Default for LevelMeta {
    fn default() -> Self {
        Self {
            title: String::new(),
            width: None,
            virtual_height: default_virtual_height(),
            segment_len: default_segment_len(),
            avalanche_speed: 0.0,
            assets: Vec::new(),
        }
    }
}

/// On-disk level document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelDocument {
    pub version: u32,
    pub meta: LevelMeta,
    pub segments: Vec<Option<f32>>,
    #[serde(default)]
    pub objects: Vec<LevelObject>,
}

/// A validated, playable level
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub meta: LevelMeta,
    pub terrain: Heightmap,
    objects: Vec<LevelObject>,
}

impl Level {
    /// Build a level from parts, running the same validation as a loaded document
    pub fn new(
        meta: LevelMeta,
        segments: Vec<Option<f32>>,
        objects: Vec<LevelObject>,
    ) -> Result<Self, LevelError> {
        Self::from_document(LevelDocument {
            version: LEVEL_VERSION,
            meta,
            segments,
            objects,
        })
    }

    /// Parse and validate a JSON level document
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let doc: LevelDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    /// Read and validate a JSON level file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let level = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded level '{}' from {}", level.title(), path.display());
        Ok(level)
    }

    /// Validate a document and turn it into a level
    pub fn from_document(doc: LevelDocument) -> Result<Self, LevelError> {
        if doc.version != LEVEL_VERSION {
            return Err(LevelError::UnsupportedVersion(doc.version));
        }
        let meta = doc.meta;
        if !(meta.virtual_height.is_finite() && meta.virtual_height > 0.0) {
            return Err(LevelError::InvalidMeta("virtualHeight must be finite and positive"));
        }
        if !(meta.avalanche_speed.is_finite() && meta.avalanche_speed >= 0.0) {
            return Err(LevelError::InvalidMeta("avalancheSpeed must be finite and non-negative"));
        }
        let terrain = Heightmap::new(doc.segments, meta.segment_len)?;

        let len = terrain.len();
        let mut objects = doc.objects;
        for (index, obj) in objects.iter_mut().enumerate() {
            if !(obj.x.is_finite() && obj.x >= 0.0 && obj.x < len as f32) {
                return Err(LevelError::ObjectOutOfRange {
                    index,
                    x: obj.x,
                    len,
                });
            }
            obj.check_fields(index)?;
            obj.id = ObjectId(index as u32);
        }

        Ok(Self {
            meta,
            terrain,
            objects,
        })
    }

    /// Back to the persisted form
    pub fn to_document(&self) -> LevelDocument {
        LevelDocument {
            version: LEVEL_VERSION,
            meta: self.meta.clone(),
            segments: self.terrain.segments().to_vec(),
            objects: self.objects.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, LevelError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    pub fn objects(&self) -> &[LevelObject] {
        &self.objects
    }

    pub fn object(&self, id: ObjectId) -> Option<&LevelObject> {
        self.objects.get(id.0 as usize).filter(|o| o.id == id)
    }

    pub fn title(&self) -> &str {
        &self.meta.title
    }

    pub fn has_avalanche(&self) -> bool {
        self.meta.avalanche_speed > 0.0
    }

    /// World X of an object
    #[inline]
    pub fn object_x(&self, obj: &LevelObject) -> f32 {
        self.terrain.world_x(obj.x)
    }

    /// World Y of an object: explicit override, else the terrain under it
    pub fn object_y(&self, obj: &LevelObject) -> Option<f32> {
        obj.y.or_else(|| self.terrain.height_at(self.object_x(obj)))
    }

    /// World X of the start marker, else the first spot with ground
    pub fn start_x(&self) -> f32 {
        self.objects
            .iter()
            .find(|o| o.kind == ObjectKind::Start)
            .map(|o| self.object_x(o))
            .or_else(|| self.terrain.ground_at_or_after(0.0))
            .unwrap_or(0.0)
    }

    /// Y below which a body has left the world
    pub fn fall_limit(&self, margin: f32) -> f32 {
        self.meta.virtual_height + margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": 1,
        "meta": {
            "title": "Bunny Hill",
            "width": 6,
            "virtualHeight": 400,
            "segmentLen": 8,
            "avalancheSpeed": 90,
            "assets": ["sled.png"]
        },
        "segments": [100, 100, null, 110, 120, 120],
        "objects": [
            { "type": "start", "x": 0.5 },
            { "type": "hazard", "x": 4, "radius": 10 },
            { "type": "sign", "x": 1, "message": "Jump!" },
            { "type": "finish", "x": 5 }
        ]
    }"#;

    #[test]
    fn test_parse_valid_level() {
        let level = Level::from_json(SAMPLE).unwrap();
        assert_eq!(level.title(), "Bunny Hill");
        assert_eq!(level.terrain.len(), 6);
        assert!(level.terrain.is_gap(2));
        assert_eq!(level.objects().len(), 4);
        assert_eq!(level.objects()[1].kind, ObjectKind::Hazard);
        assert_eq!(level.objects()[2].message.as_deref(), Some("Jump!"));
        assert!(level.has_avalanche());
        assert_eq!(level.start_x(), 4.0);
    }

    #[test]
    fn test_ids_are_load_order() {
        let level = Level::from_json(SAMPLE).unwrap();
        let finish = level.object(ObjectId(3)).unwrap();
        assert_eq!(finish.kind, ObjectKind::Finish);
        assert!(level.object(ObjectId(9)).is_none());
    }

    #[test]
    fn test_rejects_wrong_version() {
        let json = SAMPLE.replace("\"version\": 1", "\"version\": 2");
        assert!(matches!(
            Level::from_json(&json),
            Err(LevelError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_rejects_empty_segments() {
        let json = SAMPLE.replace("[100, 100, null, 110, 120, 120]", "[]");
        assert!(matches!(Level::from_json(&json), Err(LevelError::EmptySegments)));
    }

    #[test]
    fn test_rejects_object_out_of_range() {
        let json = SAMPLE.replace("\"x\": 5 }", "\"x\": 6 }");
        assert!(matches!(
            Level::from_json(&json),
            Err(LevelError::ObjectOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn test_rejects_non_positive_field() {
        let json = SAMPLE.replace("\"radius\": 10", "\"radius\": -1");
        assert!(matches!(
            Level::from_json(&json),
            Err(LevelError::BadObjectField {
                index: 1,
                field: "radius"
            })
        ));
    }

    #[test]
    fn test_meta_fields_default() {
        let json = r#"{"version": 1, "meta": {}, "segments": [90, 90]}"#;
        let level = Level::from_json(json).unwrap();
        assert_eq!(level.meta.virtual_height, 600.0);
        assert_eq!(level.meta.segment_len, 8.0);
        assert!(!level.has_avalanche());
    }

    #[test]
    fn test_rejects_bad_meta() {
        for (from, to) in [
            ("\"virtualHeight\": 400", "\"virtualHeight\": 0"),
            ("\"segmentLen\": 8", "\"segmentLen\": -8"),
            ("\"avalancheSpeed\": 90", "\"avalancheSpeed\": -1"),
        ] {
            let json = SAMPLE.replace(from, to);
            assert!(
                matches!(Level::from_json(&json), Err(LevelError::InvalidMeta(_))),
                "{to}"
            );
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(Level::from_json("{ nope"), Err(LevelError::Parse(_))));
    }

    #[test]
    fn test_document_round_trip_keeps_gaps() {
        let level = Level::from_json(SAMPLE).unwrap();
        let again = Level::from_json(&level.to_json().unwrap()).unwrap();
        assert_eq!(level, again);
    }

    #[test]
    fn test_object_y_defaults_to_terrain() {
        let level = Level::from_json(SAMPLE).unwrap();
        let hazard = &level.objects()[1];
        assert_eq!(level.object_y(hazard), Some(120.0));
        let lifted = LevelObject::new(ObjectKind::Hazard, 4.0).with_y(50.0);
        assert_eq!(level.object_y(&lifted), Some(50.0));
    }

    #[test]
    fn test_start_falls_back_to_first_ground() {
        let level = Level::new(
            LevelMeta::default(),
            vec![None, None, Some(10.0), Some(10.0)],
            Vec::new(),
        )
        .unwrap();
        assert_eq!(level.start_x(), 16.0);
    }
}
