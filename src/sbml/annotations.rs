//! RDF annotations of SBML models.
//!
//! Models reference their taxon through a MIRIAM annotation:
//!
//! ```xml
//! <annotation>
//!   <rdf:RDF>
//!     <rdf:Description rdf:about="#model">
//!       <bqbiol:hasTaxon>
//!         <rdf:Bag><rdf:li rdf:resource="http://identifiers.org/taxonomy/7787"/></rdf:Bag>
//!       </bqbiol:hasTaxon>
//!     </rdf:Description>
//!   </rdf:RDF>
//! </annotation>
//! ```

use lazy_static::lazy_static;
use regex::Regex;

use crate::xml::XmlElement;

/// RDF namespace
pub const RDF_NAMESPACE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// BioModels biology qualifiers namespace
pub const BQBIOL_NAMESPACE: &str = "http://biomodels.net/biology-qualifiers/";

lazy_static! {
    static ref TAXONOMY_URL: Regex = Regex::new(r"^https?://identifiers\.org/taxonomy/(\d+)$")
        .expect("taxonomy pattern is valid");
}

/// The NCBI taxonomy id the model is annotated with.
///
/// Each step of the annotation path must be unambiguous; a model that
/// lists several descriptions or taxa has no taxon.
pub fn taxon_id(model: &XmlElement) -> Option<u64> {
    let annotation = single(model.children_named("annotation"))?;
    let rdf = single(annotation.children_ns(RDF_NAMESPACE, "RDF"))?;
    let description = single(rdf.children_ns(RDF_NAMESPACE, "Description"))?;
    let has_taxon = single(description.children_ns(BQBIOL_NAMESPACE, "hasTaxon"))?;
    let bag = single(has_taxon.children_ns(RDF_NAMESPACE, "Bag"))?;
    let item = single(bag.children_ns(RDF_NAMESPACE, "li"))?;
    let resource = item.attr_ns(RDF_NAMESPACE, "resource")?;

    TAXONOMY_URL
        .captures(resource.trim())
        .and_then(|captures| captures[1].parse().ok())
}

fn single<'a>(mut elements: impl Iterator<Item = &'a XmlElement>) -> Option<&'a XmlElement> {
    let first = elements.next()?;
    match elements.next() {
        Some(_) => None,
        None => Some(first),
    }
}
