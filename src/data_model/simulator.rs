//! Simulators and their JSON-API representation.
//!
//! Simulators are exchanged as JSON-API documents:
//!
//! ```json
//! {"data": {"type": "simulator", "id": "tellurium",
//!           "attributes": {"version": "2.4.1", "algorithms": [], ...},
//!           "relationships": {"owner": null, "image": null, "parent": null}}}
//! ```
//!
//! The owner, image and parent of a simulator live in its metadata but are
//! transmitted as relationships which carry only a type and an id.

use derive_builder::Builder;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::data_model::common::{Format, PrimaryResourceMetadata, RemoteFile, User};
use crate::data_model::record::{sorted_eq, RecordError};
use crate::data_model::simulation::Algorithm;

/// A simulation tool packaged as a Docker image.
#[derive(Debug, Clone, Serialize, Deserialize, Builder, Default)]
#[serde(try_from = "SimulatorDocument", into = "SimulatorDocument")]
pub struct Simulator {
    #[builder(default, setter(into))]
    pub id: Option<String>,

    #[builder(default, setter(into))]
    pub version: Option<String>,

    #[builder(default, setter(into))]
    pub url: Option<String>,

    /// Format of the simulator image
    #[builder(default, setter(into))]
    pub format: Option<Format>,

    /// Id of the image on DockerHub, e.g. `crbm/biosimulations_tellurium:2.4.1`
    #[builder(default, setter(into))]
    pub docker_hub_image_id: Option<String>,

    #[builder(default, setter(into, each(name = "to_algorithms")))]
    pub algorithms: Vec<Algorithm>,

    #[builder(default, setter(into))]
    pub metadata: PrimaryResourceMetadata,
}

impl Simulator {
    /// JSON-API resource type
    pub const TYPE: &'static str = "simulator";
}

impl PartialEq for Simulator {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.version == other.version
            && self.url == other.url
            && self.format == other.format
            && self.docker_hub_image_id == other.docker_hub_image_id
            && sorted_eq(&self.algorithms, &other.algorithms)
            && self.metadata == other.metadata
    }
}

impl JsonSchema for Simulator {
    fn schema_name() -> String {
        "Simulator".to_string()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        SimulatorDocument::json_schema(generator)
    }
}

/// JSON-API document wrapping a simulator
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SimulatorDocument {
    #[serde(default)]
    pub data: SimulatorData,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct SimulatorData {
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub attributes: SimulatorAttributes,

    #[serde(default)]
    pub relationships: SimulatorRelationships,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorAttributes {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub format: Option<Format>,

    #[serde(default)]
    pub docker_hub_image_id: Option<String>,

    #[serde(default)]
    pub algorithms: Vec<Algorithm>,

    #[serde(default)]
    pub metadata: Option<PrimaryResourceMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct SimulatorRelationships {
    #[serde(default)]
    pub owner: Option<Relationship>,

    #[serde(default)]
    pub image: Option<Relationship>,

    #[serde(default)]
    pub parent: Option<Relationship>,
}

/// A to-one JSON-API relationship
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Relationship {
    pub data: ResourceIdentifier,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default)]
    pub id: Option<String>,
}

impl Relationship {
    fn new(resource_type: &str, id: Option<String>) -> Self {
        Relationship {
            data: ResourceIdentifier {
                resource_type: resource_type.to_string(),
                id,
            },
        }
    }

    fn expect_type(&self, expected: &str) -> Result<Option<String>, RecordError> {
        if self.data.resource_type != expected {
            return Err(RecordError::ResourceType {
                expected: expected.to_string(),
                found: self.data.resource_type.clone(),
            });
        }
        Ok(self.data.id.clone())
    }
}

impl From<Simulator> for SimulatorDocument {
    fn from(simulator: Simulator) -> Self {
        let mut metadata = simulator.metadata;
        let relationships = SimulatorRelationships {
            owner: metadata
                .owner
                .take()
                .map(|owner| Relationship::new(User::TYPE, owner.id)),
            image: metadata
                .image
                .take()
                .map(|image| Relationship::new(RemoteFile::TYPE, image.id)),
            parent: metadata
                .parent
                .take()
                .map(|parent| Relationship::new(Simulator::TYPE, parent.id)),
        };

        SimulatorDocument {
            data: SimulatorData {
                resource_type: Some(Simulator::TYPE.to_string()),
                id: simulator.id,
                attributes: SimulatorAttributes {
                    version: simulator.version,
                    url: simulator.url,
                    format: simulator.format,
                    docker_hub_image_id: simulator.docker_hub_image_id,
                    algorithms: simulator.algorithms,
                    metadata: Some(metadata),
                },
                relationships,
            },
        }
    }
}

impl TryFrom<SimulatorDocument> for Simulator {
    type Error = RecordError;

    fn try_from(document: SimulatorDocument) -> Result<Self, Self::Error> {
        let data = document.data;
        let found = data.resource_type.unwrap_or_default();
        if found != Simulator::TYPE {
            return Err(RecordError::ResourceType {
                expected: Simulator::TYPE.to_string(),
                found,
            });
        }

        let mut metadata = data.attributes.metadata.unwrap_or_default();
        if let Some(owner) = &data.relationships.owner {
            metadata.owner = Some(User {
                id: owner.expect_type(User::TYPE)?,
            });
        }
        if let Some(image) = &data.relationships.image {
            metadata.image = Some(RemoteFile {
                id: image.expect_type(RemoteFile::TYPE)?,
                ..Default::default()
            });
        }
        if let Some(parent) = &data.relationships.parent {
            metadata.parent = Some(Box::new(Simulator {
                id: parent.expect_type(Simulator::TYPE)?,
                ..Default::default()
            }));
        }

        Ok(Simulator {
            id: data.id,
            version: data.attributes.version,
            url: data.attributes.url,
            format: data.attributes.format,
            docker_hub_image_id: data.attributes.docker_hub_image_id,
            algorithms: data.attributes.algorithms,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::data_model::common::{License, Person};
    use crate::data_model::model::ModelFormat;
    use crate::data_model::record::JsonRecord;

    fn simulator() -> Simulator {
        SimulatorBuilder::default()
            .id("tellurium".to_string())
            .version("2.4.1".to_string())
            .url("https://tellurium.analogmachine.org".to_string())
            .docker_hub_image_id("crbm/biosimulations_tellurium:2.4.1".to_string())
            .to_algorithms(Algorithm {
                kisao_id: Some("KISAO:0000019".to_string()),
                model_formats: vec![ModelFormat::Sbml.format()],
                ..Default::default()
            })
            .metadata(PrimaryResourceMetadata {
                name: Some("tellurium".to_string()),
                license: Some(License::Apache2),
                authors: vec![Person::from_full_name("Herbert M Sauro")],
                owner: Some(User {
                    id: Some("jonrkarr".to_string()),
                }),
                image: Some(RemoteFile {
                    id: Some("tellurium-image".to_string()),
                    ..Default::default()
                }),
                parent: Some(Box::new(Simulator {
                    id: Some("roadrunner".to_string()),
                    ..Default::default()
                })),
                ..Default::default()
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_simulator_json_api_shape() {
        let value = simulator().to_json().unwrap();
        assert_eq!(value["data"]["type"], json!("simulator"));
        assert_eq!(value["data"]["id"], json!("tellurium"));
        assert_eq!(
            value["data"]["attributes"]["dockerHubImageId"],
            json!("crbm/biosimulations_tellurium:2.4.1")
        );
        assert_eq!(
            value["data"]["relationships"]["owner"],
            json!({"data": {"type": "user", "id": "jonrkarr"}})
        );
        assert_eq!(
            value["data"]["relationships"]["parent"],
            json!({"data": {"type": "simulator", "id": "roadrunner"}})
        );
        assert!(value["data"]["attributes"]["metadata"].get("owner").is_none());
    }

    #[test]
    fn test_simulator_round_trip() {
        let simulator = simulator();
        let value = simulator.to_json().unwrap();
        assert_eq!(Simulator::from_json(&value).unwrap(), simulator);
    }

    #[test]
    fn test_simulator_without_relationships() {
        let simulator = Simulator::from_json(&json!({
            "data": {"type": "simulator", "id": "copasi", "attributes": {"version": "4.27"}}
        }))
        .unwrap();
        assert_eq!(simulator.id.as_deref(), Some("copasi"));
        assert_eq!(simulator.metadata, PrimaryResourceMetadata::default());
        assert!(simulator.algorithms.is_empty());
    }

    #[test]
    fn test_simulator_with_wrong_type_is_rejected() {
        let result = Simulator::from_json(&json!({"data": {"type": "model", "id": "x"}}));
        assert!(result.is_err());

        let result = Simulator::from_json(&json!({}));
        assert!(result.is_err());
    }
}
