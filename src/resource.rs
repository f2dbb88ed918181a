//! The three REST resources and everything keyed by them: routes, cache
//! operations and tags, serialization groups, access-denied messages.

use crate::serializer::Group;

/// One of the exposed resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Professeur,
    Eleve,
    Classe,
}

/// A guarded write operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteAction {
    Create,
    Update,
    Delete,
}

impl WriteAction {
    fn verb(self) -> &'static str {
        match self {
            WriteAction::Create => "créer",
            WriteAction::Update => "modifier",
            WriteAction::Delete => "supprimer",
        }
    }
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Professeur, Resource::Eleve, Resource::Classe];

    /// Path segment under `/api`.
    pub fn segment(self) -> &'static str {
        match self {
            Resource::Professeur => "professeur",
            Resource::Eleve => "eleve",
            Resource::Classe => "classe",
        }
    }

    /// Operation name used in list cache keys.
    pub fn list_operation(self) -> &'static str {
        match self {
            Resource::Professeur => "getProfesseur",
            Resource::Eleve => "getEleve",
            Resource::Classe => "getClasses",
        }
    }

    /// Tag carried by every cached list page of this resource.
    pub fn cache_tag(self) -> &'static str {
        match self {
            Resource::Professeur => "professeurCache",
            Resource::Eleve => "eleveCache",
            Resource::Classe => "classeCache",
        }
    }

    /// Tags to evict after a write to this resource.
    ///
    /// Besides its own tag, a write touches every resource whose
    /// representation embeds this one: a professeur embeds its classes and
    /// eleves, an eleve embeds its professeur (and through it the classes), a
    /// classe embeds its professeur.
    pub fn invalidated_tags(self) -> &'static [&'static str] {
        match self {
            Resource::Professeur => &["professeurCache", "eleveCache", "classeCache"],
            Resource::Eleve => &["eleveCache", "professeurCache"],
            Resource::Classe => &["classeCache", "professeurCache", "eleveCache"],
        }
    }

    /// Serialization group of this resource's own representation.
    pub fn group(self) -> Group {
        match self {
            Resource::Professeur => Group::GetProf,
            Resource::Eleve => Group::GetEleve,
            Resource::Classe => Group::GetClasse,
        }
    }

    pub fn detail_path(self, id: i64) -> String {
        format!("/api/{}/{}", self.segment(), id)
    }

    fn noun(self) -> &'static str {
        match self {
            Resource::Professeur => "un professeur",
            Resource::Eleve => "un élève",
            Resource::Classe => "une classe",
        }
    }

    /// Message returned with a 403 when a non-admin attempts `action`.
    pub fn forbidden_message(self, action: WriteAction) -> String {
        format!(
            "Vous n'avez pas les droits suffisants pour {} {}",
            action.verb(),
            self.noun()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(Resource::Eleve.detail_path(3), "/api/eleve/3");
        assert_eq!(Resource::Professeur.detail_path(12), "/api/professeur/12");
    }

    #[test]
    fn test_forbidden_messages() {
        assert_eq!(
            Resource::Eleve.forbidden_message(WriteAction::Create),
            "Vous n'avez pas les droits suffisants pour créer un élève"
        );
        assert_eq!(
            Resource::Classe.forbidden_message(WriteAction::Delete),
            "Vous n'avez pas les droits suffisants pour supprimer une classe"
        );
    }

    #[test]
    fn test_write_always_invalidates_own_tag() {
        for resource in Resource::ALL {
            assert!(resource.invalidated_tags().contains(&resource.cache_tag()));
        }
    }
}
