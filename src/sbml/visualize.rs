//! Rendering SBML models as images with MINERVA.
//!
//! MINERVA converts SBML to PNG but rejects some valid models. Layouts and
//! unit definitions are therefore stripped (units are replaced by a single
//! dimensionless unit) before the model is posted.

use std::fs;
use std::path::Path;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::data_model::common::RemoteFile;
use crate::model_io::error::ModelIoError;
use crate::xml::XmlElement;

/// MINERVA endpoint which converts SBML into PNG images
pub const MINERVA_ENDPOINT: &str = "https://minerva-dev.lcsb.uni.lu/minerva/api/convert/image/SBML:png";

/// Media type of the generated images
pub const PNG_MEDIA_TYPE: &str = "image/png";

/// Which parts of a model are removed before rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub remove_layouts: bool,
    pub remove_units: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            remove_layouts: true,
            remove_units: true,
        }
    }
}

/// Client of the MINERVA conversion service
#[derive(Debug, Clone)]
pub struct MinervaClient {
    client: Client,
    endpoint: String,
}

impl MinervaClient {
    pub fn new() -> Self {
        Self::with_endpoint(MINERVA_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        MinervaClient {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Renders the model at `model_path` into a PNG image at `image_path`.
    ///
    /// If the image already exists it is not regenerated.
    pub fn visualize(
        &self,
        model_path: &Path,
        image_path: &Path,
        options: RenderOptions,
    ) -> Result<RemoteFile, ModelIoError> {
        if !image_path.is_file() {
            self.render(model_path, image_path, options)?;
        } else {
            log::debug!("{} already exists", image_path.display());
        }

        Ok(RemoteFile {
            id: None,
            name: image_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            media_type: Some(PNG_MEDIA_TYPE.to_string()),
            size: Some(image_path.metadata()?.len()),
        })
    }

    fn render(&self, model_path: &Path, image_path: &Path, options: RenderOptions) -> Result<(), ModelIoError> {
        if !model_path.is_file() {
            return Err(ModelIoError::FileNotFound(model_path.to_path_buf()));
        }

        let content = fs::read_to_string(model_path)?;
        let mut root = XmlElement::parse(&content).map_err(|err| ModelIoError::InvalidDocument {
            path: model_path.display().to_string(),
            reason: err.to_string(),
        })?;
        prepare_for_rendering(&mut root, options);
        let body = root.to_xml_string()?;

        log::info!("Rendering {} with MINERVA", model_path.display());
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/sbml+xml; charset=utf-8")
            .body(body)
            .send()?;

        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ModelIoError::Visualization {
                model: model_path.display().to_string(),
                body,
            });
        }

        let image = response.bytes()?;
        fs::write(image_path, &image)?;
        Ok(())
    }
}

impl Default for MinervaClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a model with the public MINERVA service and default options
pub fn visualize_model(model_path: impl AsRef<Path>, image_path: impl AsRef<Path>) -> Result<RemoteFile, ModelIoError> {
    MinervaClient::new().visualize(model_path.as_ref(), image_path.as_ref(), RenderOptions::default())
}

/// Removes the parts of an SBML document MINERVA cannot render
pub fn prepare_for_rendering(root: &mut XmlElement, options: RenderOptions) {
    let Some(model) = root.child_mut("model") else {
        return;
    };

    if options.remove_layouts {
        model.retain_elements(|element| element.name != "listOfLayouts");
        if let Some(annotation) = model.child_mut("annotation") {
            annotation.retain_elements(|element| element.name != "listOfLayouts");
        }
    }

    if options.remove_units {
        if let Some(definitions) = model.child_mut("listOfUnitDefinitions") {
            for definition in definitions.elements_mut() {
                let prefix = definition.prefix.clone();
                let namespace = definition.namespace.clone();
                let qualify = |name: &str| match &prefix {
                    Some(prefix) => format!("{prefix}:{name}"),
                    None => name.to_string(),
                };

                let mut unit = XmlElement::new(&qualify("unit"))
                    .with_attr("kind", "dimensionless")
                    .with_attr("exponent", "0")
                    .with_attr("multiplier", "1")
                    .with_attr("scale", "0");
                unit.namespace = namespace.clone();

                let mut list = XmlElement::new(&qualify("listOfUnits")).with_child(unit);
                list.namespace = namespace;

                definition.retain_elements(|element| element.name != "listOfUnits");
                definition.push_element(list);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sbml xmlns="http://www.sbml.org/sbml/level3/version1/core" level="3" version="1"
      xmlns:layout="http://www.sbml.org/sbml/level3/version1/layout/version1">
  <model id="m">
    <listOfUnitDefinitions>
      <unitDefinition id="mM">
        <listOfUnits>
          <unit kind="mole" exponent="1" scale="-3" multiplier="1"/>
          <unit kind="litre" exponent="-1" scale="0" multiplier="1"/>
        </listOfUnits>
      </unitDefinition>
    </listOfUnitDefinitions>
    <layout:listOfLayouts>
      <layout:layout layout:id="l"/>
    </layout:listOfLayouts>
  </model>
</sbml>"#;

    #[test]
    fn test_prepare_for_rendering() {
        let mut root = XmlElement::parse(MODEL).unwrap();
        prepare_for_rendering(&mut root, RenderOptions::default());

        let model = root.child("model").unwrap();
        assert!(model.child("listOfLayouts").is_none());

        let units: Vec<&XmlElement> = model
            .descend(&["listOfUnitDefinitions", "unitDefinition", "listOfUnits"])
            .unwrap()
            .children_named("unit")
            .collect();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].attr("kind"), Some("dimensionless"));
        assert_eq!(units[0].attr("exponent"), Some("0"));
    }

    #[test]
    fn test_prepare_for_rendering_respects_options() {
        let mut root = XmlElement::parse(MODEL).unwrap();
        prepare_for_rendering(
            &mut root,
            RenderOptions {
                remove_layouts: false,
                remove_units: false,
            },
        );
        assert_eq!(root, XmlElement::parse(MODEL).unwrap());
    }

    #[tokio::test]
    async fn test_visualize_writes_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/convert/image/SBML:png"))
            .and(header("content-type", "application/sbml+xml; charset=utf-8"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.xml");
        let image_path = dir.path().join("model.png");
        std::fs::write(&model_path, MODEL).unwrap();

        let endpoint = format!("{}/convert/image/SBML:png", server.uri());
        let (file, image_path) = tokio::task::spawn_blocking(move || {
            let file = MinervaClient::with_endpoint(endpoint)
                .visualize(&model_path, &image_path, RenderOptions::default())
                .unwrap();
            (file, image_path)
        })
        .await
        .unwrap();

        assert_eq!(file.name.as_deref(), Some("model.png"));
        assert_eq!(file.media_type.as_deref(), Some("image/png"));
        assert_eq!(file.size, Some(4));
        assert!(image_path.is_file());
    }

    #[tokio::test]
    async fn test_visualize_reports_service_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("conversion failed"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.xml");
        std::fs::write(&model_path, MODEL).unwrap();
        let image_path = dir.path().join("model.png");

        let endpoint = server.uri();
        let result = tokio::task::spawn_blocking(move || {
            MinervaClient::with_endpoint(endpoint).visualize(&model_path, &image_path, RenderOptions::default())
        })
        .await
        .unwrap();

        match result {
            Err(ModelIoError::Visualization { body, .. }) => assert_eq!(body, "conversion failed"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
