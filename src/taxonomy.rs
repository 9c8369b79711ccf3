//! Resolution of NCBI taxonomy ids to scientific names.

use std::collections::HashMap;

use reqwest::blocking::Client;
use serde_json::Value;

/// Looks up the scientific name of a taxon
pub trait TaxonomyLookup {
    /// Returns `None` when the taxon is unknown or the lookup fails
    fn scientific_name(&self, taxon_id: u64) -> Option<String>;
}

/// Looks taxa up with the NCBI E-utilities `esummary` service
#[derive(Debug, Clone)]
pub struct NcbiTaxonomy {
    client: Client,
    endpoint: String,
}

impl NcbiTaxonomy {
    pub const ENDPOINT: &'static str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi";

    pub fn new() -> Self {
        Self::with_endpoint(Self::ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        NcbiTaxonomy {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    fn fetch(&self, taxon_id: u64) -> Result<Option<String>, reqwest::Error> {
        let summary: Value = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("db", "taxonomy".to_string()),
                ("id", taxon_id.to_string()),
                ("retmode", "json".to_string()),
            ])
            .send()?
            .error_for_status()?
            .json()?;

        Ok(summary["result"][taxon_id.to_string()]["scientificname"]
            .as_str()
            .map(str::to_string))
    }
}

impl Default for NcbiTaxonomy {
    fn default() -> Self {
        Self::new()
    }
}

impl TaxonomyLookup for NcbiTaxonomy {
    fn scientific_name(&self, taxon_id: u64) -> Option<String> {
        match self.fetch(taxon_id) {
            Ok(Some(name)) => Some(name),
            Ok(None) => {
                log::warn!("Taxon {} is not in the NCBI taxonomy", taxon_id);
                None
            }
            Err(err) => {
                log::warn!("Unable to look up taxon {}: {}", taxon_id, err);
                None
            }
        }
    }
}

/// A fixed table of taxa, e.g. for offline use
#[derive(Debug, Clone, Default)]
pub struct StaticTaxonomy {
    names: HashMap<u64, String>,
}

impl StaticTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_taxon(mut self, taxon_id: u64, name: impl Into<String>) -> Self {
        self.names.insert(taxon_id, name.into());
        self
    }
}

impl FromIterator<(u64, String)> for StaticTaxonomy {
    fn from_iter<I: IntoIterator<Item = (u64, String)>>(iter: I) -> Self {
        StaticTaxonomy {
            names: iter.into_iter().collect(),
        }
    }
}

impl TaxonomyLookup for StaticTaxonomy {
    fn scientific_name(&self, taxon_id: u64) -> Option<String> {
        self.names.get(&taxon_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_static_taxonomy() {
        let taxonomy = StaticTaxonomy::new().with_taxon(7787, "Tetronarce californica");
        assert_eq!(
            taxonomy.scientific_name(7787).as_deref(),
            Some("Tetronarce californica")
        );
        assert_eq!(taxonomy.scientific_name(9606), None);
    }

    #[tokio::test]
    async fn test_ncbi_taxonomy_reads_esummary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/esummary.fcgi"))
            .and(query_param("db", "taxonomy"))
            .and(query_param("id", "7787"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "uids": ["7787"],
                    "7787": {"uid": "7787", "scientificname": "Tetronarce californica"}
                }
            })))
            .mount(&server)
            .await;

        let endpoint = format!("{}/esummary.fcgi", server.uri());
        let name = tokio::task::spawn_blocking(move || {
            NcbiTaxonomy::with_endpoint(endpoint).scientific_name(7787)
        })
        .await
        .unwrap();

        assert_eq!(name.as_deref(), Some("Tetronarce californica"));
    }

    #[tokio::test]
    async fn test_ncbi_taxonomy_failure_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let endpoint = format!("{}/esummary.fcgi", server.uri());
        let name = tokio::task::spawn_blocking(move || {
            NcbiTaxonomy::with_endpoint(endpoint).scientific_name(1)
        })
        .await
        .unwrap();

        assert_eq!(name, None);
    }
}
