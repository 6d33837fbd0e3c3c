//! Ontology entities and the structured classification they produce.

use serde::{Deserialize, Serialize};

/// The six partitions of the controlled vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    DocumentType,
    WorkType,
    Theme,
    AreaOfReference,
    GeoArea,
    FamilyGroup,
}

impl Category {
    /// All partitions, in the order type references are tested against.
    pub const ALL: [Category; 6] = [
        Category::DocumentType,
        Category::WorkType,
        Category::Theme,
        Category::AreaOfReference,
        Category::GeoArea,
        Category::FamilyGroup,
    ];

    /// Substring that marks a type reference as belonging to this partition.
    pub fn type_marker(self) -> &'static str {
        match self {
            Category::DocumentType => "DocumentType",
            Category::WorkType => "WorkType",
            Category::Theme => "Theme",
            Category::AreaOfReference => "AreaOfReference",
            Category::GeoArea => "GeoArea",
            Category::FamilyGroup => "SalesianFamilyGroup",
        }
    }

    /// Classify a declared type reference. First matching marker wins.
    pub fn from_type_reference(type_ref: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|category| type_ref.contains(category.type_marker()))
    }

    /// Plural key used when listing partitions.
    pub fn plural_key(self) -> &'static str {
        match self {
            Category::DocumentType => "document_types",
            Category::WorkType => "work_types",
            Category::Theme => "themes",
            Category::AreaOfReference => "areas_of_reference",
            Category::GeoArea => "geo_areas",
            Category::FamilyGroup => "salesian_family_groups",
        }
    }
}

/// One entry of the controlled vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyEntity {
    pub id: String,
    pub label: String,
    pub category: Category,
}

/// A scored reference to an ontology entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMatch {
    pub id: String,
    pub label: String,
    /// In `(0.0, 1.0]`.
    pub confidence: f32,
}

/// How a page relates to each ontology partition.
///
/// Single-valued fields hold the best positive-scoring entity. List fields
/// hold at most three entities, unique by id, sorted by descending
/// confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub document_type: Option<EntityMatch>,
    pub work_type: Option<EntityMatch>,
    pub themes: Vec<EntityMatch>,
    pub areas_of_reference: Vec<EntityMatch>,
    pub geo_area: Option<EntityMatch>,
    pub salesian_family_group: Option<EntityMatch>,
}

impl ClassificationResult {
    /// The label that stands for the whole page, if the ontology found one:
    /// document type, else work type, else the leading area of reference.
    pub fn primary(&self) -> Option<&EntityMatch> {
        self.document_type
            .as_ref()
            .or(self.work_type.as_ref())
            .or_else(|| self.areas_of_reference.first())
    }

    pub fn is_empty(&self) -> bool {
        self.document_type.is_none()
            && self.work_type.is_none()
            && self.themes.is_empty()
            && self.areas_of_reference.is_empty()
            && self.geo_area.is_none()
            && self.salesian_family_group.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(id: &str, confidence: f32) -> EntityMatch {
        EntityMatch {
            id: id.to_string(),
            label: id.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_type_reference_markers() {
        let base = "http://example.org/taxonomy#";
        assert_eq!(
            Category::from_type_reference(&format!("{base}DocumentType")),
            Some(Category::DocumentType)
        );
        assert_eq!(
            Category::from_type_reference(&format!("{base}SalesianFamilyGroup")),
            Some(Category::FamilyGroup)
        );
        assert_eq!(
            Category::from_type_reference(&format!("{base}AreaOfReference")),
            Some(Category::AreaOfReference)
        );
        assert_eq!(Category::from_type_reference(&format!("{base}Person")), None);
    }

    #[test]
    fn test_primary_precedence() {
        let mut result = ClassificationResult {
            areas_of_reference: vec![matched("Area_History", 0.4)],
            ..Default::default()
        };
        assert_eq!(result.primary().unwrap().id, "Area_History");

        result.work_type = Some(matched("Work_School", 0.2));
        assert_eq!(result.primary().unwrap().id, "Work_School");

        result.document_type = Some(matched("Doc_Image", 0.1));
        assert_eq!(result.primary().unwrap().id, "Doc_Image");
    }

    #[test]
    fn test_empty() {
        assert!(ClassificationResult::default().is_empty());
        assert!(ClassificationResult::default().primary().is_none());
    }
}
