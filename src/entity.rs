//! School entities: stored rows, request drafts and hydrated views.
//!
//! - **Rows** (`Professeur`, `Eleve`, `Classe`) mirror the tables. A child
//!   row holds the id of its professeur.
//! - **Drafts** are what a request body deserializes into. Every scalar is
//!   optional so that missing fields surface as validation violations
//!   rather than decode errors.
//! - **Views** are rows with their relations loaded, ready for the
//!   serializer.

use crate::resource::Resource;
use crate::serializer::{to_array, to_value, Exposable, FieldDescriptor, Group, SerializationContext};
use crate::versioning::ApiVersion;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;

/// Trait implemented by every stored row type.
///
/// # Example
///
/// ```ignore
/// impl Entity for Classe {
///     const TABLE: &'static str = "classe";
///     const RESOURCE: Resource = Resource::Classe;
///
///     fn id(&self) -> i64 {
///         self.id
///     }
/// }
/// ```
pub trait Entity: Send + Sync + Unpin + Clone + for<'r> FromRow<'r, SqliteRow> {
    /// Table holding the rows.
    const TABLE: &'static str;

    /// Resource the rows are exposed as.
    const RESOURCE: Resource;

    /// Generated primary key.
    fn id(&self) -> i64;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Professeur {
    pub id: i64,
    pub nom: String,
    pub prenom: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Eleve {
    pub id: i64,
    pub nom: String,
    pub prenom: String,
    pub moyenne: f64,
    pub professeur_id: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Classe {
    pub id: i64,
    pub nom: String,
    pub professeur_id: i64,
}

impl Entity for Professeur {
    const TABLE: &'static str = "professeur";
    const RESOURCE: Resource = Resource::Professeur;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for Eleve {
    const TABLE: &'static str = "eleve";
    const RESOURCE: Resource = Resource::Eleve;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for Classe {
    const TABLE: &'static str = "classe";
    const RESOURCE: Resource = Resource::Classe;

    fn id(&self) -> i64 {
        self.id
    }
}

/// Professeur as submitted in a request body.
///
/// `classes` / `eleves` hold the resolved `idClasse` / `idEleve` ids; ids
/// that matched no row are kept in the `unknown_*` lists for validation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfesseurDraft {
    pub nom: Option<String>,
    pub prenom: Option<String>,
    #[serde(skip)]
    pub classes: Vec<i64>,
    #[serde(skip)]
    pub eleves: Vec<i64>,
    #[serde(skip)]
    pub unknown_classes: Vec<i64>,
    #[serde(skip)]
    pub unknown_eleves: Vec<i64>,
}

/// Eleve as submitted in a request body; `professeur_id` is resolved from
/// `idProf` and stays `None` when that id matches no professeur.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EleveDraft {
    pub nom: Option<String>,
    pub prenom: Option<String>,
    pub moyenne: Option<f64>,
    #[serde(skip)]
    pub professeur_id: Option<i64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClasseDraft {
    pub nom: Option<String>,
    #[serde(skip)]
    pub professeur_id: Option<i64>,
}

/// Validated professeur fields, ready to persist.
#[derive(Clone, Debug, PartialEq)]
pub struct NewProfesseur {
    pub nom: String,
    pub prenom: String,
    /// Classes to reassign to this professeur.
    pub classes: Vec<i64>,
    /// Eleves to reassign to this professeur.
    pub eleves: Vec<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewEleve {
    pub nom: String,
    pub prenom: String,
    pub moyenne: f64,
    pub professeur_id: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewClasse {
    pub nom: String,
    pub professeur_id: i64,
}

/// Professeur with its classes and eleves.
#[derive(Clone, Debug)]
pub struct ProfesseurView {
    pub professeur: Professeur,
    pub classes: Vec<ClasseView>,
    pub eleves: Vec<EleveView>,
}

/// Eleve with its professeur.
#[derive(Clone, Debug)]
pub struct EleveView {
    pub eleve: Eleve,
    pub professeur: Option<Box<ProfesseurView>>,
}

/// Classe with its professeur.
#[derive(Clone, Debug)]
pub struct ClasseView {
    pub classe: Classe,
    pub professeur: Option<Box<ProfesseurView>>,
}

impl EleveView {
    /// View without the professeur, as nested under a professeur.
    pub fn bare(eleve: Eleve) -> Self {
        EleveView {
            eleve,
            professeur: None,
        }
    }
}

impl ClasseView {
    pub fn bare(classe: Classe) -> Self {
        ClasseView {
            classe,
            professeur: None,
        }
    }
}

const ALL_GROUPS: &[Group] = &[Group::GetProf, Group::GetEleve, Group::GetClasse];

impl Exposable for ProfesseurView {
    const RESOURCE: Resource = Resource::Professeur;
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("id", ALL_GROUPS, ApiVersion::V1_0),
        FieldDescriptor::new("nom", ALL_GROUPS, ApiVersion::V1_0),
        FieldDescriptor::new("prenom", ALL_GROUPS, ApiVersion::V1_0),
        FieldDescriptor::new("classe", &[Group::GetProf, Group::GetEleve], ApiVersion::V1_0),
        FieldDescriptor::new("eleves", &[Group::GetProf], ApiVersion::V1_0),
    ];

    fn id(&self) -> i64 {
        self.professeur.id
    }

    fn field(&self, name: &str, ctx: &SerializationContext<'_>) -> Option<Value> {
        match name {
            "id" => Some(json!(self.professeur.id)),
            "nom" => Some(json!(self.professeur.nom)),
            "prenom" => Some(json!(self.professeur.prenom)),
            "classe" => Some(to_array(&self.classes, ctx)),
            "eleves" => Some(to_array(&self.eleves, ctx)),
            _ => None,
        }
    }
}

impl Exposable for EleveView {
    const RESOURCE: Resource = Resource::Eleve;
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("id", &[Group::GetProf, Group::GetEleve], ApiVersion::V1_0),
        FieldDescriptor::new("nom", &[Group::GetProf, Group::GetEleve], ApiVersion::V1_0),
        FieldDescriptor::new("prenom", &[Group::GetProf, Group::GetEleve], ApiVersion::V1_0),
        FieldDescriptor::new("moyenne", &[Group::GetProf, Group::GetEleve], ApiVersion::V1_0),
        FieldDescriptor::new("professeur", &[Group::GetEleve], ApiVersion::V1_0),
    ];

    fn id(&self) -> i64 {
        self.eleve.id
    }

    fn field(&self, name: &str, ctx: &SerializationContext<'_>) -> Option<Value> {
        match name {
            "id" => Some(json!(self.eleve.id)),
            "nom" => Some(json!(self.eleve.nom)),
            "prenom" => Some(json!(self.eleve.prenom)),
            "moyenne" => Some(json!(self.eleve.moyenne)),
            "professeur" => self.professeur.as_deref().map(|p| to_value(p, ctx)),
            _ => None,
        }
    }
}

impl Exposable for ClasseView {
    const RESOURCE: Resource = Resource::Classe;
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("id", ALL_GROUPS, ApiVersion::V1_0),
        FieldDescriptor::new("nom", ALL_GROUPS, ApiVersion::V1_0),
        FieldDescriptor::new("professeur", &[Group::GetClasse], ApiVersion::V1_0),
    ];

    fn id(&self) -> i64 {
        self.classe.id
    }

    fn field(&self, name: &str, ctx: &SerializationContext<'_>) -> Option<Value> {
        match name {
            "id" => Some(json!(self.classe.id)),
            "nom" => Some(json!(self.classe.nom)),
            "professeur" => self.professeur.as_deref().map(|p| to_value(p, ctx)),
            _ => None,
        }
    }
}
