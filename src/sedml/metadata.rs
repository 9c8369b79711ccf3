//! RDF metadata of simulation experiments.
//!
//! The descriptive metadata of a simulation (description, tags,
//! identifiers, references, authors, license and image) is stored in the
//! annotation of the SED-ML document using Dublin Core, FOAF and BIBO terms:
//!
//! ```xml
//! <annotation>
//!   <rdf:RDF>
//!     <rdf:Description>
//!       <dc:description>...</dc:description>
//!       <dc:subject>tag</dc:subject>
//!       <dcterms:identifier>
//!         <rdf:Description rdf:about="https://identifiers.org/...">
//!           <dc:source>biomodels.db</dc:source>
//!           <dc:identifier>BIOMD0000000001</dc:identifier>
//!         </rdf:Description>
//!       </dcterms:identifier>
//!       <dc:creator><foaf:Person><foaf:lastName>...</foaf:lastName></foaf:Person></dc:creator>
//!       <dcterms:references><bibo:Article>...</bibo:Article></dcterms:references>
//!       <dcterms:license>CC0</dcterms:license>
//!       <foaf:depiction><foaf:Image>...</foaf:Image></foaf:depiction>
//!     </rdf:Description>
//!   </rdf:RDF>
//! </annotation>
//! ```

use crate::data_model::common::{Identifier, JournalReference, License, Person, RemoteFile};
use crate::data_model::simulation::SimulationCore;
use crate::sbml::annotations::RDF_NAMESPACE;
use crate::xml::XmlElement;

pub const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
pub const DCTERMS_NAMESPACE: &str = "http://purl.org/dc/terms/";
pub const FOAF_NAMESPACE: &str = "http://xmlns.com/foaf/0.1/";
pub const BIBO_NAMESPACE: &str = "http://purl.org/ontology/bibo/";

/// Metadata shared by all simulations of a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationMetadata {
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub identifiers: Vec<Identifier>,
    pub references: Vec<JournalReference>,
    pub authors: Vec<Person>,
    pub license: Option<License>,
    pub image: Option<RemoteFile>,
}

impl SimulationMetadata {
    pub fn from_simulation(core: &SimulationCore) -> Self {
        SimulationMetadata {
            description: core.description.clone(),
            tags: core.tags.clone(),
            identifiers: core.identifiers.clone(),
            references: core.references.clone(),
            authors: core.authors.clone(),
            license: core.license,
            image: core.image.clone(),
        }
    }

    pub fn apply_to(&self, core: &mut SimulationCore) {
        core.description = self.description.clone();
        core.tags = self.tags.clone();
        core.identifiers = self.identifiers.clone();
        core.references = self.references.clone();
        core.authors = self.authors.clone();
        core.license = self.license;
        core.image = self.image.clone();
    }

    pub fn is_empty(&self) -> bool {
        *self == SimulationMetadata::default()
    }

    /// Reads the metadata from the `annotation` child of an element. Missing
    /// or unrecognized annotations yield empty metadata.
    pub fn read(parent: &XmlElement) -> Self {
        let mut metadata = SimulationMetadata::default();

        let descriptions = parent
            .children_named("annotation")
            .flat_map(|annotation| annotation.children_ns(RDF_NAMESPACE, "RDF"))
            .flat_map(|rdf| rdf.children_ns(RDF_NAMESPACE, "Description"));

        for description in descriptions {
            for element in description.elements() {
                match (element.namespace.as_deref(), element.name.as_str()) {
                    (Some(DC_NAMESPACE), "description") => {
                        metadata.description = non_empty_text(element);
                    }
                    (Some(DC_NAMESPACE), "subject") => {
                        metadata.tags.extend(non_empty_text(element));
                    }
                    (Some(DCTERMS_NAMESPACE), "identifier") => {
                        metadata
                            .identifiers
                            .extend(element.child_ns(RDF_NAMESPACE, "Description").map(read_identifier));
                    }
                    (Some(DCTERMS_NAMESPACE), "references") => {
                        metadata
                            .references
                            .extend(element.child_ns(BIBO_NAMESPACE, "Article").map(read_reference));
                    }
                    (Some(DC_NAMESPACE), "creator") => {
                        metadata
                            .authors
                            .extend(element.child_ns(FOAF_NAMESPACE, "Person").map(read_person));
                    }
                    (Some(DCTERMS_NAMESPACE), "license") => {
                        let value = element.text();
                        metadata.license = License::from_value(&value);
                        if metadata.license.is_none() {
                            log::warn!("License '{}' is not recognized", value);
                        }
                    }
                    (Some(FOAF_NAMESPACE), "depiction") => {
                        metadata.image = element.child_ns(FOAF_NAMESPACE, "Image").map(read_image);
                    }
                    _ => {}
                }
            }
        }

        metadata
    }

    /// Encodes the metadata as an `annotation` element, or `None` if there
    /// is nothing to encode
    pub fn to_annotation(&self) -> Option<XmlElement> {
        if self.is_empty() {
            return None;
        }

        let mut description = XmlElement::new("rdf:Description");

        if let Some(text) = &self.description {
            description.push_element(text_element("dc:description", text));
        }
        for tag in &self.tags {
            description.push_element(text_element("dc:subject", tag));
        }
        for identifier in &self.identifiers {
            description.push_element(XmlElement::new("dcterms:identifier").with_child(write_identifier(identifier)));
        }
        for person in &self.authors {
            description.push_element(XmlElement::new("dc:creator").with_child(write_person(person)));
        }
        for reference in &self.references {
            description.push_element(XmlElement::new("dcterms:references").with_child(write_reference(reference)));
        }
        if let Some(license) = self.license {
            description.push_element(text_element("dcterms:license", license.as_str()));
        }
        if let Some(image) = &self.image {
            description.push_element(XmlElement::new("foaf:depiction").with_child(write_image(image)));
        }

        let rdf = XmlElement::new("rdf:RDF")
            .with_attr("xmlns:rdf", RDF_NAMESPACE)
            .with_attr("xmlns:dc", DC_NAMESPACE)
            .with_attr("xmlns:dcterms", DCTERMS_NAMESPACE)
            .with_attr("xmlns:foaf", FOAF_NAMESPACE)
            .with_attr("xmlns:bibo", BIBO_NAMESPACE)
            .with_child(description);

        Some(XmlElement::new("annotation").with_child(rdf))
    }
}

fn non_empty_text(element: &XmlElement) -> Option<String> {
    let text = element.text();
    (!text.is_empty()).then_some(text)
}

fn child_text(element: &XmlElement, namespace: &str, name: &str) -> Option<String> {
    element.child_ns(namespace, name).and_then(non_empty_text)
}

fn text_element(name: &str, text: &str) -> XmlElement {
    XmlElement::new(name).with_text(text)
}

/// Appends `<name>text</name>` when the value is set
fn push_optional(parent: &mut XmlElement, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        parent.push_element(text_element(name, value));
    }
}

fn read_identifier(description: &XmlElement) -> Identifier {
    Identifier {
        namespace: child_text(description, DC_NAMESPACE, "source"),
        id: child_text(description, DC_NAMESPACE, "identifier"),
        url: description.attr_ns(RDF_NAMESPACE, "about").map(str::to_string),
    }
}

fn write_identifier(identifier: &Identifier) -> XmlElement {
    let mut description = XmlElement::new("rdf:Description");
    if let Some(url) = &identifier.url {
        description.set_attr("rdf:about", url.as_str());
    }
    push_optional(&mut description, "dc:source", identifier.namespace.as_deref());
    push_optional(&mut description, "dc:identifier", identifier.id.as_deref());
    description
}

fn read_person(person: &XmlElement) -> Person {
    Person {
        first_name: child_text(person, FOAF_NAMESPACE, "firstName"),
        middle_name: child_text(person, FOAF_NAMESPACE, "middleName"),
        last_name: child_text(person, FOAF_NAMESPACE, "lastName"),
    }
}

fn write_person(person: &Person) -> XmlElement {
    let mut element = XmlElement::new("foaf:Person");
    push_optional(&mut element, "foaf:firstName", person.first_name.as_deref());
    push_optional(&mut element, "foaf:middleName", person.middle_name.as_deref());
    push_optional(&mut element, "foaf:lastName", person.last_name.as_deref());
    element
}

fn read_reference(article: &XmlElement) -> JournalReference {
    JournalReference {
        authors: child_text(article, BIBO_NAMESPACE, "authorList"),
        title: child_text(article, DC_NAMESPACE, "title"),
        journal: child_text(article, BIBO_NAMESPACE, "journal"),
        volume: child_text(article, BIBO_NAMESPACE, "volume"),
        num: child_text(article, BIBO_NAMESPACE, "issue"),
        pages: child_text(article, BIBO_NAMESPACE, "pages"),
        year: child_text(article, DC_NAMESPACE, "date").and_then(|year| year.parse().ok()),
        doi: child_text(article, BIBO_NAMESPACE, "doi"),
    }
}

fn write_reference(reference: &JournalReference) -> XmlElement {
    let mut article = XmlElement::new("bibo:Article");
    push_optional(&mut article, "bibo:authorList", reference.authors.as_deref());
    push_optional(&mut article, "dc:title", reference.title.as_deref());
    push_optional(&mut article, "bibo:journal", reference.journal.as_deref());
    push_optional(&mut article, "bibo:volume", reference.volume.as_deref());
    push_optional(&mut article, "bibo:issue", reference.num.as_deref());
    push_optional(&mut article, "bibo:pages", reference.pages.as_deref());
    push_optional(&mut article, "dc:date", reference.year.map(|year| year.to_string()).as_deref());
    push_optional(&mut article, "bibo:doi", reference.doi.as_deref());
    article
}

fn read_image(image: &XmlElement) -> RemoteFile {
    RemoteFile {
        id: child_text(image, DC_NAMESPACE, "identifier"),
        name: child_text(image, DC_NAMESPACE, "title"),
        media_type: child_text(image, DC_NAMESPACE, "format"),
        size: child_text(image, DCTERMS_NAMESPACE, "extent").and_then(|size| size.parse().ok()),
    }
}

fn write_image(image: &RemoteFile) -> XmlElement {
    let mut element = XmlElement::new("foaf:Image");
    push_optional(&mut element, "dc:identifier", image.id.as_deref());
    push_optional(&mut element, "dc:title", image.name.as_deref());
    push_optional(&mut element, "dc:format", image.media_type.as_deref());
    push_optional(&mut element, "dcterms:extent", image.size.map(|size| size.to_string()).as_deref());
    element
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn metadata() -> SimulationMetadata {
        SimulationMetadata {
            description: Some("Time course of the EPSP".to_string()),
            tags: vec!["epsp".to_string(), "acetylcholine".to_string()],
            identifiers: vec![Identifier {
                namespace: Some("biomodels.db".to_string()),
                id: Some("BIOMD0000000001".to_string()),
                url: Some("https://identifiers.org/biomodels.db/BIOMD0000000001".to_string()),
            }],
            references: vec![JournalReference {
                authors: Some("S J Edelstein & J P Changeux".to_string()),
                title: Some("A kinetic mechanism".to_string()),
                journal: Some("Biol Cybern".to_string()),
                volume: Some("75".to_string()),
                num: Some("5".to_string()),
                pages: Some("361-379".to_string()),
                year: Some(1996),
                doi: Some("10.1007/s004220050302".to_string()),
            }],
            authors: vec![Person::from_full_name("Jonathan R Karr")],
            license: Some(License::Cc0),
            image: Some(RemoteFile {
                id: Some("image".to_string()),
                name: Some("model.png".to_string()),
                media_type: Some("image/png".to_string()),
                size: Some(1024),
            }),
        }
    }

    #[test]
    fn test_metadata_survives_xml() {
        let annotation = metadata().to_annotation().unwrap();
        let xml = XmlElement::new("sedML").with_child(annotation).to_xml_string().unwrap();
        let parsed = XmlElement::parse(&xml).unwrap();

        assert_eq!(SimulationMetadata::read(&parsed), metadata());
    }

    #[test]
    fn test_empty_annotations() {
        assert_eq!(SimulationMetadata::default().to_annotation(), None);

        for xml in [
            "<sedML/>",
            "<sedML><annotation></annotation></sedML>",
            r#"<sedML><annotation><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"/></annotation></sedML>"#,
            r#"<sedML><annotation><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description/></rdf:RDF></annotation></sedML>"#,
        ] {
            let element = XmlElement::parse(xml).unwrap();
            assert!(SimulationMetadata::read(&element).is_empty(), "{xml}");
        }
    }
}
