use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An entry in one of the settings catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Identifier sent to the backend.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
}

/// Language models the backend can generate answers with.
pub const AVAILABLE_LLMS: &[CatalogEntry] = &[
    CatalogEntry {
        id: "gemma-27b",
        name: "NVIDIA Gemma 27B",
    },
    CatalogEntry {
        id: "llama-3-70b",
        name: "Meta Llama 3 70B",
    },
    CatalogEntry {
        id: "mistral-large",
        name: "Mistral Large",
    },
    CatalogEntry {
        id: "gpt-4",
        name: "GPT-4 (OpenAI)",
    },
];

/// Vector databases the backend can retrieve embeddings from.
pub const AVAILABLE_VECTOR_DBS: &[CatalogEntry] = &[
    CatalogEntry {
        id: "qdrant",
        name: "Qdrant",
    },
    CatalogEntry {
        id: "chroma",
        name: "ChromaDB",
    },
    CatalogEntry {
        id: "milvus",
        name: "Milvus",
    },
    CatalogEntry {
        id: "pgvector",
        name: "PostgreSQL (pgvector)",
    },
];

/// Backend selection forwarded with every chat request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Identifier of the language model.
    pub llm: String,

    /// Identifier of the vector database.
    #[serde(rename = "vectorDb")]
    pub vector_db: String,
}

impl Settings {
    /// Create settings after checking both ids against their catalogs.
    pub fn new(llm: impl Into<String>, vector_db: impl Into<String>) -> Result<Self> {
        let mut settings = Self::default();
        settings.set_llm(llm)?;
        settings.set_vector_db(vector_db)?;
        Ok(settings)
    }

    /// Select a language model from [`AVAILABLE_LLMS`].
    pub fn set_llm(&mut self, llm: impl Into<String>) -> Result<()> {
        let llm = llm.into();
        lookup(AVAILABLE_LLMS, &llm, "llm")?;
        self.llm = llm;
        Ok(())
    }

    /// Select a vector database from [`AVAILABLE_VECTOR_DBS`].
    pub fn set_vector_db(&mut self, vector_db: impl Into<String>) -> Result<()> {
        let vector_db = vector_db.into();
        lookup(AVAILABLE_VECTOR_DBS, &vector_db, "vector_db")?;
        self.vector_db = vector_db;
        Ok(())
    }

    /// Display name of the selected language model.
    pub fn llm_name(&self) -> &str {
        display_name(AVAILABLE_LLMS, &self.llm)
    }

    /// Display name of the selected vector database.
    pub fn vector_db_name(&self) -> &str {
        display_name(AVAILABLE_VECTOR_DBS, &self.vector_db)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: AVAILABLE_LLMS[0].id.to_string(),
            vector_db: AVAILABLE_VECTOR_DBS[0].id.to_string(),
        }
    }
}

fn lookup(catalog: &'static [CatalogEntry], id: &str, param: &str) -> Result<&'static CatalogEntry> {
    catalog.iter().find(|entry| entry.id == id).ok_or_else(|| {
        let known: Vec<_> = catalog.iter().map(|entry| entry.id).collect();
        Error::validation(
            format!("unknown {param} '{id}' (choose one of: {})", known.join(", ")),
            Some(param.to_string()),
        )
    })
}

fn display_name<'a>(catalog: &'static [CatalogEntry], id: &'a str) -> &'a str {
    catalog
        .iter()
        .find(|entry| entry.id == id)
        .map(|entry| entry.name)
        .unwrap_or(id)
}
