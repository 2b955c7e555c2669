use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DataShapeError;

/// A coordinate as it appears in the dataset.
///
/// The pair form is already longitude-first; the string form is
/// `"<lat>,<lng>"` and gets reversed during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCoords {
    Pair([f64; 2]),
    Text(String),
}

/// Canonical longitude-first position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

impl From<[f64; 2]> for LngLat {
    fn from(v: [f64; 2]) -> Self {
        LngLat { lng: v[0], lat: v[1] }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub label: String,
    pub coords: RawCoords,
    #[serde(default)]
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub label: String,
    pub color: String,
    pub places: Vec<Place>,
}

/// Identity of one (category, place) pair. The place index is stable
/// because categories are immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub category: String,
    pub place: usize,
}

impl PairKey {
    pub fn new(category: impl Into<String>, place: usize) -> Self {
        Self {
            category: category.into(),
            place,
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.category, self.place)
    }
}

/// How a marker should stand out on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerEmphasis {
    #[default]
    Normal,
    /// Attention treatment for places flagged `current`.
    Pulse,
}

impl MarkerEmphasis {
    pub fn for_place(place: &Place) -> Self {
        if place.current {
            MarkerEmphasis::Pulse
        } else {
            MarkerEmphasis::Normal
        }
    }
}

/// Validated, immutable list of categories.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    categories: Vec<Category>,
}

impl Dataset {
    /// Validate the categories. Ids must be unique and the id, label and
    /// color fields non-empty.
    pub fn new(categories: Vec<Category>) -> Result<Self, DataShapeError> {
        let mut seen = HashSet::new();
        for (index, category) in categories.iter().enumerate() {
            if category.id.trim().is_empty() {
                return Err(DataShapeError::EmptyField { index, field: "id" });
            }
            if category.label.trim().is_empty() {
                return Err(DataShapeError::EmptyField {
                    index,
                    field: "label",
                });
            }
            if category.color.trim().is_empty() {
                return Err(DataShapeError::EmptyField {
                    index,
                    field: "color",
                });
            }
            if !seen.insert(category.id.as_str()) {
                return Err(DataShapeError::DuplicateCategory(category.id.clone()));
            }
        }
        Ok(Self { categories })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, DataShapeError> {
        let categories: Vec<Category> = serde_yml::from_str(yaml)?;
        Self::new(categories)
    }

    pub fn from_json(json: &str) -> Result<Self, DataShapeError> {
        let categories: Vec<Category> = serde_json::from_str(json)?;
        Self::new(categories)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.id.as_str())
    }

    pub fn place(&self, key: &PairKey) -> Option<&Place> {
        self.category(&key.category)?.places.get(key.place)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
- id: lived
  label: Lived
  color: "#f00"
  places:
    - label: Chengdu
      coords: [104.06, 30.67]
      current: true
- id: visited
  label: Visited
  color: "#0f0"
  places:
    - label: Oslo
      coords: "59.91,10.75"
"##;

    #[test]
    fn test_from_yaml_accepts_both_coordinate_forms() {
        let data = Dataset::from_yaml(SAMPLE).unwrap();
        assert_eq!(data.categories().len(), 2);
        let lived = data.category("lived").unwrap();
        assert_eq!(lived.places[0].coords, RawCoords::Pair([104.06, 30.67]));
        assert!(lived.places[0].current);
        let visited = data.category("visited").unwrap();
        assert_eq!(
            visited.places[0].coords,
            RawCoords::Text("59.91,10.75".to_string())
        );
        assert!(!visited.places[0].current);
    }

    #[test]
    fn test_from_json_matches_yaml() {
        let json = r##"[{"id":"a","label":"A","color":"#f00","places":[{"label":"x","coords":[1,2]}]}]"##;
        let data = Dataset::from_json(json).unwrap();
        assert_eq!(data.ids().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let yaml = r##"
- { id: a, label: A, color: "#f00", places: [] }
- { id: a, label: B, color: "#0f0", places: [] }
"##;
        assert_eq!(
            Dataset::from_yaml(yaml),
            Err(DataShapeError::DuplicateCategory("a".to_string()))
        );
    }

    #[test]
    fn test_missing_field_is_parse_error() {
        let yaml = "- { id: a, label: A, places: [] }";
        assert!(matches!(
            Dataset::from_yaml(yaml),
            Err(DataShapeError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_id_rejected() {
        let yaml = r##"- { id: "", label: A, color: "#f00", places: [] }"##;
        assert_eq!(
            Dataset::from_yaml(yaml),
            Err(DataShapeError::EmptyField {
                index: 0,
                field: "id"
            })
        );
    }

    #[test]
    fn test_place_lookup_by_key() {
        let data = Dataset::from_yaml(SAMPLE).unwrap();
        assert_eq!(
            data.place(&PairKey::new("visited", 0)).map(|p| p.label.as_str()),
            Some("Oslo")
        );
        assert!(data.place(&PairKey::new("visited", 1)).is_none());
        assert!(data.place(&PairKey::new("nope", 0)).is_none());
    }

    #[test]
    fn test_emphasis_follows_current_flag() {
        let data = Dataset::from_yaml(SAMPLE).unwrap();
        let lived = &data.category("lived").unwrap().places[0];
        let visited = &data.category("visited").unwrap().places[0];
        assert_eq!(MarkerEmphasis::for_place(lived), MarkerEmphasis::Pulse);
        assert_eq!(MarkerEmphasis::for_place(visited), MarkerEmphasis::Normal);
    }
}
