//! SDMX-JSON structure messages.
//!
//! Only the parts the pipeline needs are modelled: the component list of a
//! data structure definition and the transformations of a VTL
//! transformation scheme. Both SDMX-JSON 1.0 (`assignmentStatus`,
//! `primaryMeasure`) and 2.0 (`usage`, `measures`) spellings are accepted.

use serde::Deserialize;

use crate::error::{RegistryError, RegistryResult};
use crate::models::{Component, ComponentRole, StructureRef};

#[derive(Debug, Deserialize)]
struct StructureMessage<T> {
    data: T,
}

// =============================================================================
// Data structure definitions
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataStructures {
    #[serde(default)]
    data_structures: Vec<RawDataStructure>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDataStructure {
    id: String,
    #[serde(rename = "agencyID", default)]
    agency_id: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    data_structure_components: RawComponents,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComponents {
    #[serde(default)]
    dimension_list: DimensionList,
    #[serde(default)]
    attribute_list: AttributeList,
    #[serde(default)]
    measure_list: MeasureList,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DimensionList {
    #[serde(default)]
    dimensions: Vec<RawComponent>,
    #[serde(default)]
    time_dimensions: Vec<RawComponent>,
}

#[derive(Debug, Default, Deserialize)]
struct AttributeList {
    #[serde(default)]
    attributes: Vec<RawComponent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeasureList {
    #[serde(default)]
    measures: Vec<RawComponent>,
    #[serde(default)]
    primary_measure: Option<RawComponent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComponent {
    id: String,
    #[serde(default)]
    usage: Option<String>,
    #[serde(default)]
    assignment_status: Option<String>,
}

impl RawComponent {
    /// Attributes are optional unless flagged; measures are mandatory unless flagged.
    fn is_mandatory(&self, default: bool) -> bool {
        match (&self.usage, &self.assignment_status) {
            (Some(usage), _) => usage.eq_ignore_ascii_case("mandatory"),
            (None, Some(status)) => status.eq_ignore_ascii_case("mandatory"),
            (None, None) => default,
        }
    }
}

/// Extract the components of `wanted` from an SDMX-JSON structure message.
///
/// When the message holds several DSDs the one matching `wanted` is used;
/// a single DSD is accepted as is.
pub fn parse_data_structure(body: &str, wanted: &StructureRef) -> RegistryResult<Vec<Component>> {
    let message: StructureMessage<DataStructures> =
        serde_json::from_str(body).map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

    let mut dsds = message.data.data_structures;
    let position = dsds
        .iter()
        .position(|d| d.id == wanted.id && d.agency_id == wanted.agency && d.version == wanted.version)
        .or(if dsds.len() == 1 { Some(0) } else { None })
        .ok_or_else(|| RegistryError::NotFound(wanted.short_urn()))?;
    let dsd = dsds.swap_remove(position);

    let parts = dsd.data_structure_components;
    let mut components = Vec::new();

    for dim in parts
        .dimension_list
        .dimensions
        .into_iter()
        .chain(parts.dimension_list.time_dimensions)
    {
        components.push(Component {
            id: dim.id,
            role: ComponentRole::Dimension,
            mandatory: true,
        });
    }
    for attr in parts.attribute_list.attributes {
        let mandatory = attr.is_mandatory(false);
        components.push(Component {
            id: attr.id,
            role: ComponentRole::Attribute,
            mandatory,
        });
    }
    for measure in parts
        .measure_list
        .measures
        .into_iter()
        .chain(parts.measure_list.primary_measure)
    {
        let mandatory = measure.is_mandatory(true);
        components.push(Component {
            id: measure.id,
            role: ComponentRole::Measure,
            mandatory,
        });
    }

    Ok(components)
}

// =============================================================================
// VTL transformation schemes
// =============================================================================

/// One VTL statement of a transformation scheme.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
    pub id: String,
    pub expression: String,
    pub result: String,
    #[serde(default)]
    pub is_persistent: bool,
}

impl Transformation {
    /// VTL assignment: `<-` for persistent results, `:=` otherwise.
    pub fn statement(&self) -> String {
        let op = if self.is_persistent { "<-" } else { ":=" };
        format!("{} {} {};", self.result, op, self.expression.trim().trim_end_matches(';'))
    }
}

/// A VTL transformation scheme as published in the registry.
#[derive(Debug, Clone)]
pub struct TransformationScheme {
    pub reference: StructureRef,
    pub vtl_version: Option<String>,
    pub transformations: Vec<Transformation>,
}

impl TransformationScheme {
    /// The scheme as a VTL program, one statement per line.
    pub fn program(&self) -> String {
        self.transformations
            .iter()
            .map(Transformation::statement)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Names of the results that survive the run.
    pub fn persistent_results(&self) -> Vec<&str> {
        self.transformations
            .iter()
            .filter(|t| t.is_persistent)
            .map(|t| t.result.as_str())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransformationSchemes {
    #[serde(default)]
    transformation_schemes: Vec<RawScheme>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScheme {
    id: String,
    #[serde(rename = "agencyID", default)]
    agency_id: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    vtl_version: Option<String>,
    #[serde(default)]
    transformations: Vec<Transformation>,
}

/// Extract the transformation scheme `wanted` from an SDMX-JSON structure message.
pub fn parse_transformation_scheme(body: &str, wanted: &StructureRef) -> RegistryResult<TransformationScheme> {
    let message: StructureMessage<TransformationSchemes> =
        serde_json::from_str(body).map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

    let raw = message
        .data
        .transformation_schemes
        .into_iter()
        .find(|s| s.id == wanted.id && (s.agency_id.is_empty() || s.agency_id == wanted.agency))
        .ok_or_else(|| RegistryError::NotFound(wanted.short_urn()))?;

    Ok(TransformationScheme {
        reference: StructureRef::new(
            if raw.agency_id.is_empty() { wanted.agency.clone() } else { raw.agency_id },
            raw.id,
            if raw.version.is_empty() { wanted.version.clone() } else { raw.version },
        ),
        vtl_version: raw.vtl_version,
        transformations: raw.transformations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_dsd_v2() {
        let body = json!({
            "data": {
                "dataStructures": [{
                    "id": "LEI_DATA",
                    "agencyID": "MD",
                    "version": "1.0",
                    "dataStructureComponents": {
                        "dimensionList": { "dimensions": [{ "id": "LEI" }] },
                        "attributeList": { "attributes": [
                            { "id": "LEGAL_NAME", "usage": "mandatory" },
                            { "id": "POSTAL_CODE", "usage": "optional" }
                        ]},
                        "measureList": { "measures": [] }
                    }
                }]
            }
        })
        .to_string();

        let comps = parse_data_structure(&body, &StructureRef::default()).unwrap();
        assert_eq!(comps.len(), 3);
        assert_eq!(comps[0].role, ComponentRole::Dimension);
        assert!(comps[1].mandatory);
        assert!(!comps[2].mandatory);
    }

    #[test]
    fn test_parse_dsd_v1_spelling() {
        let body = json!({
            "data": {
                "dataStructures": [{
                    "id": "LEI_DATA",
                    "agencyID": "MD",
                    "version": "1.0",
                    "dataStructureComponents": {
                        "attributeList": { "attributes": [
                            { "id": "CATEGORY", "assignmentStatus": "Mandatory" }
                        ]},
                        "measureList": { "primaryMeasure": { "id": "OBS_VALUE" } }
                    }
                }]
            }
        })
        .to_string();

        let comps = parse_data_structure(&body, &StructureRef::default()).unwrap();
        assert_eq!(comps[0].id, "CATEGORY");
        assert!(comps[0].mandatory);
        assert_eq!(comps[1].role, ComponentRole::Measure);
        assert!(comps[1].mandatory);
    }

    #[test]
    fn test_parse_dsd_not_found() {
        let body = json!({ "data": { "dataStructures": [] } }).to_string();
        let err = parse_data_structure(&body, &StructureRef::default()).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn test_parse_scheme_and_program() {
        let body = json!({
            "data": {
                "transformationSchemes": [{
                    "id": "LEI_VALIDATIONS",
                    "agencyID": "MD",
                    "version": "1.0",
                    "vtlVersion": "2.0",
                    "transformations": [
                        { "id": "T1", "result": "ds_tmp", "expression": "LEI_DATA[filter CATEGORY = \"GENERAL\"]", "isPersistent": false },
                        { "id": "T2", "result": "invalid_country", "expression": "check(ds_tmp#COUNTRY_HEADQUARTERS <> \"\" invalid);", "isPersistent": true }
                    ]
                }]
            }
        })
        .to_string();

        let wanted = StructureRef::new("MD", "LEI_VALIDATIONS", "1.0");
        let scheme = parse_transformation_scheme(&body, &wanted).unwrap();

        assert_eq!(scheme.vtl_version.as_deref(), Some("2.0"));
        assert_eq!(scheme.persistent_results(), vec!["invalid_country"]);

        let program = scheme.program();
        let lines: Vec<&str> = program.lines().collect();
        assert_eq!(lines[0], "ds_tmp := LEI_DATA[filter CATEGORY = \"GENERAL\"];");
        assert_eq!(lines[1], "invalid_country <- check(ds_tmp#COUNTRY_HEADQUARTERS <> \"\" invalid);");
    }

    #[test]
    fn test_invalid_json_is_invalid_response() {
        let err = parse_transformation_scheme("<html>", &StructureRef::default()).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidResponse(_)));
    }
}
