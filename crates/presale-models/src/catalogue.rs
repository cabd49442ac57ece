//! Catalogue of the documents a presale package can contain.
//!
//! Callers pick documents by id. Mandatory entries are always part of the
//! resulting manifest, whatever the selection says.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::ExpectedManifest;

/// File format of a catalogued document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Docx,
    Xlsx,
    Pptx,
}

impl DocumentFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Docx => "docx",
            DocumentFormat::Xlsx => "xlsx",
            DocumentFormat::Pptx => "pptx",
        }
    }
}

/// One document the remote can be asked to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentType {
    /// Stable selection id (`dossier`, `roi`, ...).
    pub id: String,
    /// File name the remote is told to use.
    pub file_name: String,
    /// File format.
    pub format: DocumentFormat,
    /// One-line description shown when listing the catalogue.
    pub description: String,
    /// Included in every manifest built from this catalogue.
    pub mandatory: bool,
}

impl DocumentType {
    /// Creates an optional document.
    pub fn new(
        id: impl Into<String>,
        file_name: impl Into<String>,
        format: DocumentFormat,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            format,
            description: description.into(),
            mandatory: false,
        }
    }

    /// Marks the document as always included.
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }
}

/// A selection named a document the catalogue does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown document '{id}' (known: {})", .known.join(", "))]
pub struct UnknownDocument {
    /// The id that was asked for.
    pub id: String,
    /// Ids the catalogue does know, in catalogue order.
    pub known: Vec<String>,
}

/// Ordered set of documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCatalogue {
    entries: Vec<DocumentType>,
}

impl DocumentCatalogue {
    /// Creates a catalogue. Later entries with a repeated id are dropped.
    pub fn new(entries: impl IntoIterator<Item = DocumentType>) -> Self {
        let mut kept: Vec<DocumentType> = Vec::new();
        for entry in entries {
            if !kept.iter().any(|e| e.id == entry.id) {
                kept.push(entry);
            }
        }
        Self { entries: kept }
    }

    /// The seven-document presale package. Only the client dossier is mandatory.
    pub fn standard() -> Self {
        use DocumentFormat::*;
        Self::new([
            DocumentType::new(
                "dossier",
                "01_Досье_на_клиента.docx",
                Docx,
                "Company profile, pains and decision makers",
            )
            .mandatory(),
            DocumentType::new(
                "use_cases",
                "02_Решения_BIMAR.xlsx",
                Xlsx,
                "Map of product modules to client scenarios",
            ),
            DocumentType::new(
                "roi",
                "03_Экономика_сделки.xlsx",
                Xlsx,
                "ROI calculator and pilot cost",
            ),
            DocumentType::new("sow", "04_Пилот_ТЗ.docx", Docx, "Statement of work for a 90-day pilot"),
            DocumentType::new(
                "stakeholders",
                "05_ЛПР_и_квалификация.xlsx",
                Xlsx,
                "Decision-maker map and MEDDPICC qualification",
            ),
            DocumentType::new(
                "presentation",
                "06_Питч_для_клиента.pptx",
                Pptx,
                "Client pitch, 10-12 slides",
            ),
            DocumentType::new(
                "verification",
                "07_Верификация.docx",
                Docx,
                "Presale readiness checklist",
            ),
        ])
    }

    /// Looks up a document by id.
    pub fn get(&self, id: &str) -> Option<&DocumentType> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// All documents in catalogue order.
    pub fn entries(&self) -> &[DocumentType] {
        &self.entries
    }

    /// Documents that are always included.
    pub fn mandatory(&self) -> impl Iterator<Item = &DocumentType> {
        self.entries.iter().filter(|e| e.mandatory)
    }

    /// Documents a caller may choose from.
    pub fn selectable(&self) -> impl Iterator<Item = &DocumentType> {
        self.entries.iter().filter(|e| !e.mandatory)
    }

    fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }
}

impl ExpectedManifest {
    /// Builds a manifest from catalogue ids plus every mandatory document.
    ///
    /// Ids are trimmed; blank ids are skipped. An empty selection yields
    /// only the mandatory documents.
    pub fn from_selection<S: AsRef<str>>(
        catalogue: &DocumentCatalogue,
        ids: &[S],
    ) -> Result<Self, UnknownDocument> {
        let mut names: Vec<&str> = catalogue.mandatory().map(|d| d.file_name.as_str()).collect();
        for id in ids.iter().map(|id| id.as_ref().trim()).filter(|id| !id.is_empty()) {
            let doc = catalogue.get(id).ok_or_else(|| UnknownDocument {
                id: id.to_string(),
                known: catalogue.ids(),
            })?;
            names.push(&doc.file_name);
        }
        Ok(ExpectedManifest::new(names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalogue() {
        let catalogue = DocumentCatalogue::standard();
        assert_eq!(catalogue.entries().len(), 7);

        let mandatory: Vec<_> = catalogue.mandatory().map(|d| d.id.as_str()).collect();
        assert_eq!(mandatory, vec!["dossier"]);
        assert_eq!(catalogue.selectable().count(), 6);

        let roi = catalogue.get("roi").unwrap();
        assert_eq!(roi.format, DocumentFormat::Xlsx);
        assert!(roi.file_name.ends_with(roi.format.extension()));
        assert!(catalogue.get("nope").is_none());
    }

    #[test]
    fn test_selection_always_includes_mandatory() {
        let catalogue = DocumentCatalogue::standard();
        let manifest = ExpectedManifest::from_selection(&catalogue, &["roi", " sow "]).unwrap();

        assert_eq!(manifest.len(), 3);
        assert!(manifest.contains("01_Досье_на_клиента.docx"));
        assert!(manifest.contains("03_Экономика_сделки.xlsx"));
        assert!(manifest.contains("04_Пилот_ТЗ.docx"));
    }

    #[test]
    fn test_empty_selection_is_mandatory_only() {
        let catalogue = DocumentCatalogue::standard();
        let manifest = ExpectedManifest::from_selection::<&str>(&catalogue, &[]).unwrap();
        assert_eq!(manifest.len(), 1);

        // Naming a mandatory document does not duplicate it.
        let manifest = ExpectedManifest::from_selection(&catalogue, &["dossier", ""]).unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn test_unknown_document_rejected() {
        let catalogue = DocumentCatalogue::standard();
        let err = ExpectedManifest::from_selection(&catalogue, &["roi", "budget"]).unwrap_err();
        assert_eq!(err.id, "budget");
        assert_eq!(err.known.len(), 7);
        assert!(err.to_string().starts_with("unknown document 'budget' (known: dossier, "));
    }

    #[test]
    fn test_repeated_ids_keep_first() {
        let catalogue = DocumentCatalogue::new([
            DocumentType::new("a", "a.docx", DocumentFormat::Docx, "first"),
            DocumentType::new("a", "b.docx", DocumentFormat::Docx, "second"),
        ]);
        assert_eq!(catalogue.entries().len(), 1);
        assert_eq!(catalogue.get("a").unwrap().file_name, "a.docx");
    }
}
