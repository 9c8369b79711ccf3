//! Importer for the curated models of BioModels.
//!
//! The importer lists the manually curated models through the BioModels
//! REST API, downloads the SBML file of each into a cache directory, reads
//! it with the SBML reader, renders it with MINERVA and completes the model
//! with the metadata BioModels holds about it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::data_model::common::{Identifier, JournalReference, License, Person};
use crate::data_model::model::Model;
use crate::io::{load_json, save_json, IOError};
use crate::model_io::error::ModelIoError;
use crate::model_io::reader::ModelReader;
use crate::sbml::reader::SbmlModelReader;
use crate::sbml::visualize::{MinervaClient, RenderOptions};

/// Base URL of the BioModels REST API
pub const BIOMODELS_ENDPOINT: &str = "https://www.ebi.ac.uk/biomodels";

/// Query which selects the manually curated models
const CURATED_QUERY: &str = "*:* AND curationstatus:\"Manually curated\"";

const MODELS_FILE: &str = "models.json";
const STATS_FILE: &str = "stats.json";

/// Errors raised while importing models
#[derive(Debug, Error)]
pub enum ImportError {
    /// The request could not be sent or its response decoded
    #[error("BioModels request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// BioModels rejected a request
    #[error("BioModels request {url} failed with status {status}: {body}")]
    Status { url: String, status: u16, body: String },

    /// BioModels does not list a main file for the model
    #[error("{0} does not have a main file")]
    MissingFile(String),

    #[error(transparent)]
    Model(#[from] ModelIoError),

    /// The cache could not be read or written
    #[error(transparent)]
    Cache(#[from] IOError),

    #[error("Failed to access cache: {0}")]
    Io(#[from] std::io::Error),
}

/// Summary of the imported models
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportStats {
    pub total: usize,
    /// Number of models per modeling framework
    pub frameworks: BTreeMap<String, usize>,
    /// Number of models per taxon
    pub taxa: BTreeMap<String, usize>,
}

impl ImportStats {
    pub fn from_models(models: &[Model]) -> Self {
        let mut stats = ImportStats {
            total: models.len(),
            ..Default::default()
        };
        for model in models {
            if let Some(name) = model.framework.as_ref().and_then(|term| term.name.clone()) {
                *stats.frameworks.entry(name).or_default() += 1;
            }
            if let Some(name) = model.taxon.as_ref().and_then(|taxon| taxon.name.clone()) {
                *stats.taxa.entry(name).or_default() += 1;
            }
        }
        stats
    }
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    models: Vec<SearchHit>,
    #[serde(default)]
    matches: usize,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: Option<String>,
    description: Option<String>,
    files: ModelFiles,
    publication: Option<Publication>,
}

#[derive(Debug, Deserialize)]
struct ModelFiles {
    #[serde(default)]
    main: Vec<MainFile>,
}

#[derive(Debug, Deserialize)]
struct MainFile {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Publication {
    title: Option<String>,
    journal: Option<String>,
    year: Option<Value>,
    volume: Option<Value>,
    issue: Option<Value>,
    pages: Option<String>,
    link: Option<String>,
    #[serde(default)]
    authors: Vec<PublicationAuthor>,
}

#[derive(Debug, Deserialize)]
struct PublicationAuthor {
    name: String,
}

impl Publication {
    fn reference(&self) -> JournalReference {
        let authors: Vec<&str> = self.authors.iter().map(|author| author.name.as_str()).collect();
        let authors = match authors.as_slice() {
            [] => None,
            [single] => Some(single.to_string()),
            [init @ .., last] => Some(format!("{} & {}", init.join(", "), last)),
        };

        JournalReference {
            authors,
            title: self.title.clone(),
            journal: self.journal.clone(),
            volume: self.volume.as_ref().and_then(value_text),
            num: self.issue.as_ref().and_then(value_text),
            pages: self.pages.clone(),
            year: self
                .year
                .as_ref()
                .and_then(value_text)
                .and_then(|year| year.parse().ok()),
            doi: self
                .link
                .as_deref()
                .and_then(|link| link.split_once("doi.org/").or_else(|| link.split_once("doi/")))
                .map(|(_, doi)| doi.to_string()),
        }
    }
}

/// Text of a JSON string or number
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Imports curated models from BioModels
pub struct BioModelsImporter {
    client: Client,
    endpoint: String,
    cache_dir: PathBuf,
    max_models: Option<usize>,
    page_size: usize,
    reader: SbmlModelReader,
    minerva: Option<MinervaClient>,
}

impl BioModelsImporter {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        BioModelsImporter {
            client: Client::new(),
            endpoint: BIOMODELS_ENDPOINT.to_string(),
            cache_dir: cache_dir.into(),
            max_models: None,
            page_size: 100,
            reader: SbmlModelReader::new(),
            minerva: Some(MinervaClient::new()),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Stops after the first `max_models` models
    pub fn with_max_models(mut self, max_models: usize) -> Self {
        self.max_models = Some(max_models);
        self
    }

    pub fn with_reader(mut self, reader: SbmlModelReader) -> Self {
        self.reader = reader;
        self
    }

    /// Renders images with the given MINERVA client, or not at all
    pub fn with_minerva(mut self, minerva: Option<MinervaClient>) -> Self {
        self.minerva = minerva;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Imports the models and saves them, with their statistics, to the cache.
    ///
    /// Models which cannot be read (e.g. because they use unsupported
    /// packages) are logged and skipped.
    pub fn run(&self) -> Result<(Vec<Model>, ImportStats), ImportError> {
        fs::create_dir_all(&self.cache_dir)?;

        let ids = self.model_ids()?;
        let progress = ProgressBar::new(ids.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} | {elapsed}/{eta} | {msg}")
        {
            progress.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
        }

        let mut models = Vec::new();
        for id in &ids {
            progress.set_message(id.clone());
            match self.import_model(id) {
                Ok(model) => models.push(model),
                Err(ImportError::Model(err)) => log::warn!("Unable to import {}: {}", id, err),
                Err(err) => {
                    progress.abandon();
                    return Err(err);
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        let stats = ImportStats::from_models(&models);
        save_json(self.cache_dir.join(MODELS_FILE), &models)?;
        save_json(self.cache_dir.join(STATS_FILE), &stats)?;
        log::info!("Imported {} of {} models", models.len(), ids.len());

        Ok((models, stats))
    }

    /// Reloads the models and statistics saved by [`BioModelsImporter::run`]
    pub fn read_data(&self) -> Result<(Vec<Model>, ImportStats), ImportError> {
        let models = load_json(self.cache_dir.join(MODELS_FILE))?;
        let stats = load_json(self.cache_dir.join(STATS_FILE))?;
        Ok((models, stats))
    }

    /// Ids of the curated models, in ascending order
    pub fn model_ids(&self) -> Result<Vec<String>, ImportError> {
        let limit = self.max_models.unwrap_or(usize::MAX);
        let mut ids = Vec::new();

        loop {
            let page_size = self.page_size.min(limit - ids.len());
            let offset = ids.len().to_string();
            let num_results = page_size.to_string();
            let results: SearchResults = self.get_json(
                &format!("{}/search", self.endpoint),
                &[
                    ("query", CURATED_QUERY),
                    ("domain", "biomodels"),
                    ("sort", "id-ascending"),
                    ("offset", offset.as_str()),
                    ("numResults", num_results.as_str()),
                    ("format", "json"),
                ],
            )?;

            let received = results.models.len();
            ids.extend(results.models.into_iter().map(|hit| hit.id));
            if received == 0 || ids.len() >= limit || ids.len() >= results.matches {
                break;
            }
        }

        ids.truncate(limit);
        Ok(ids)
    }

    /// Downloads, reads and annotates one model
    pub fn import_model(&self, id: &str) -> Result<Model, ImportError> {
        let entry: ModelEntry = self.get_json(&format!("{}/{}", self.endpoint, id), &[("format", "json")])?;
        let file_name = entry
            .files
            .main
            .first()
            .map(|file| file.name.clone())
            .ok_or_else(|| ImportError::MissingFile(id.to_string()))?;

        let model_path = self.cache_dir.join(&file_name);
        if !model_path.is_file() {
            let url = format!("{}/model/download/{}", self.endpoint, id);
            let response = self.client.get(&url).query(&[("filename", &file_name)]).send()?;
            let response = check_status(&url, response)?;
            fs::write(&model_path, response.bytes()?)?;
        }

        let mut model = self.reader.run(&model_path)?;

        if let Some(minerva) = &self.minerva {
            let image_path = model_path.with_extension("png");
            match minerva.visualize(&model_path, &image_path, RenderOptions::default()) {
                Ok(image) => model.image = Some(image),
                Err(err) => log::warn!("Unable to render {}: {}", id, err),
            }
        }

        model.id = Some(id.to_string());
        if entry.name.is_some() {
            model.name = entry.name;
        }
        model.description = entry.description.filter(|description| !description.is_empty());
        model.identifiers = vec![Identifier {
            namespace: Some("biomodels.db".to_string()),
            id: Some(id.to_string()),
            url: None,
        }];
        if let Some(publication) = &entry.publication {
            model.refs = vec![publication.reference()];
            model.authors = publication
                .authors
                .iter()
                .map(|author| Person::from_full_name(&author.name))
                .collect();
        }
        model.license = Some(License::Cc0);

        Ok(model)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, ImportError> {
        let response = self.client.get(url).query(query).send()?;
        Ok(check_status(url, response)?.json()?)
    }
}

fn check_status(
    url: &str,
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, ImportError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ImportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::data_model::common::Taxon;
    use crate::taxonomy::StaticTaxonomy;

    const MODEL: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<sbml xmlns="http://www.sbml.org/sbml/level2/version4" level="2" version="4">
  <model id="BIOMD0000000001" name="Edelstein1996_EPSP_AChEvent">
    <annotation>
      <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
               xmlns:bqbiol="http://biomodels.net/biology-qualifiers/">
        <rdf:Description rdf:about="#model">
          <bqbiol:hasTaxon>
            <rdf:Bag>
              <rdf:li rdf:resource="http://identifiers.org/taxonomy/7787"/>
            </rdf:Bag>
          </bqbiol:hasTaxon>
        </rdf:Description>
      </rdf:RDF>
    </annotation>
    <listOfCompartments>
      <compartment id="comp1" size="1e-16"/>
    </listOfCompartments>
    <listOfSpecies>
      <species id="BLL" compartment="comp1" initialAmount="0"/>
    </listOfSpecies>
  </model>
</sbml>"##;

    #[test]
    fn test_reference() {
        let publication = Publication {
            title: Some("A kinetic mechanism for nicotinic acetylcholine receptors".to_string()),
            journal: Some("Biological cybernetics".to_string()),
            year: Some(json!(1996)),
            volume: Some(json!("75")),
            issue: None,
            pages: Some("361-379".to_string()),
            link: Some("http://identifiers.org/doi/10.1007/s004220050302".to_string()),
            authors: ["S J Edelstein", "O Schaad", "E Henry"]
                .into_iter()
                .map(|name| PublicationAuthor { name: name.to_string() })
                .collect(),
        };

        let reference = publication.reference();
        assert_eq!(reference.authors.as_deref(), Some("S J Edelstein, O Schaad & E Henry"));
        assert_eq!(reference.year, Some(1996));
        assert_eq!(reference.volume.as_deref(), Some("75"));
        assert_eq!(reference.num, None);
        assert_eq!(reference.doi.as_deref(), Some("10.1007/s004220050302"));
    }

    #[tokio::test]
    async fn test_run_and_read_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": 1,
                "models": [{"id": "BIOMD0000000001"}],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/BIOMD0000000001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Edelstein1996 - EPSP ACh event",
                "description": "<div>Model of a nicotinic EPSP</div>",
                "files": {"main": [{"name": "BIOMD0000000001_url.xml"}]},
                "publication": {
                    "title": "A kinetic mechanism for nicotinic acetylcholine receptors",
                    "journal": "Biological cybernetics",
                    "year": 1996,
                    "volume": "75",
                    "pages": "361-379",
                    "link": "http://identifiers.org/doi/10.1007/s004220050302",
                    "authors": [{"name": "S J Edelstein"}, {"name": "O Schaad"}],
                },
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/model/download/BIOMD0000000001"))
            .and(query_param("filename", "BIOMD0000000001_url.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MODEL))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("biomodels");
        let uri = server.uri();

        let ((models, stats), (cached_models, cached_stats)) = tokio::task::spawn_blocking(move || {
            let taxonomy = StaticTaxonomy::new().with_taxon(7787, "Tetronarce californica");
            let importer = BioModelsImporter::new(cache_dir)
                .with_endpoint(uri)
                .with_max_models(5)
                .with_reader(SbmlModelReader::with_taxonomy(taxonomy))
                .with_minerva(None);
            (importer.run().unwrap(), importer.read_data().unwrap())
        })
        .await
        .unwrap();

        assert_eq!(models.len(), 1);
        let model = &models[0];
        assert_eq!(model.id.as_deref(), Some("BIOMD0000000001"));
        assert_eq!(model.name.as_deref(), Some("Edelstein1996 - EPSP ACh event"));
        assert_eq!(
            model.file.as_ref().and_then(|file| file.name.as_deref()),
            Some("BIOMD0000000001_url.xml")
        );
        assert_eq!(
            model.taxon,
            Some(Taxon {
                id: Some(7787),
                name: Some("Tetronarce californica".to_string()),
            })
        );
        assert_eq!(model.authors.len(), 2);
        assert_eq!(model.authors[0], Person::from_full_name("S J Edelstein"));
        assert_eq!(model.license, Some(License::Cc0));

        assert_eq!(stats.total, 1);
        assert_eq!(stats.frameworks.get("non-spatial continuous framework"), Some(&1));
        assert_eq!(stats.taxa.get("Tetronarce californica"), Some(&1));

        assert_eq!(cached_models, models);
        assert_eq!(cached_stats, stats);
    }

    #[test]
    #[ignore = "requires access to BioModels, NCBI and MINERVA"]
    fn test_import_from_biomodels() {
        let dir = tempfile::tempdir().unwrap();
        let importer = BioModelsImporter::new(dir.path()).with_max_models(5);
        let (models, stats) = importer.run().unwrap();

        assert_eq!(models.len(), 5);
        assert_eq!(models[0].id.as_deref(), Some("BIOMD0000000001"));
        assert_eq!(models[0].name.as_deref(), Some("Edelstein1996 - EPSP ACh event"));
        assert!(models[0].file.as_ref().and_then(|file| file.size).unwrap_or(0) > 0);
        assert!(models[0].image.as_ref().and_then(|image| image.size).unwrap_or(0) > 0);
        assert_eq!(
            models[0].taxon,
            Some(Taxon {
                id: Some(7787),
                name: Some("Tetronarce californica".to_string()),
            })
        );
        assert_eq!(stats.total, 5);

        let (cached_models, cached_stats) = importer.read_data().unwrap();
        assert_eq!(cached_models, models);
        assert_eq!(cached_stats, stats);
    }
}
