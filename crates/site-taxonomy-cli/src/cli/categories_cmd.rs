//! `site-taxonomy categories`: list the ontology's partitions.

use crate::cli::output;
use anyhow::{Context, Result};
use clap::Args;
use site_taxonomy::OntologyStore;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CategoriesArgs {
    /// RDF/XML ontology document
    #[arg(long, env = "SITE_TAXONOMY_ONTOLOGY")]
    pub ontology: PathBuf,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: CategoriesArgs) -> Result<()> {
    let store = OntologyStore::from_path(&args.ontology)
        .with_context(|| format!("loading ontology {}", args.ontology.display()))?;

    output::write_json(
        &serde_json::json!({
            "categories": store.categories(),
            "statistics": store.statistics(),
        }),
        args.output.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_lists_partitions() {
        let mut owl = tempfile::NamedTempFile::new().unwrap();
        write!(
            owl,
            r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#">
  <rdf:Description rdf:about="http://example.org/t#Theme_Youth">
    <rdfs:label>Youth</rdfs:label>
    <rdf:type rdf:resource="http://example.org/t#Theme"/>
  </rdf:Description>
</rdf:RDF>"#
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("categories.json");

        run(CategoriesArgs {
            ontology: owl.path().to_path_buf(),
            output: Some(out.clone()),
        })
        .unwrap();

        let listed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(listed["categories"]["themes"]["Theme_Youth"], "Youth");
        assert_eq!(listed["statistics"]["themes_count"], 1);
        assert_eq!(listed["statistics"]["geo_areas_count"], 0);
    }

    #[test]
    fn test_missing_ontology_fails() {
        let result = run(CategoriesArgs {
            ontology: PathBuf::from("/nonexistent/ontology.owl"),
            output: None,
        });
        assert!(result.is_err());
    }
}
