//! Field constraints for submitted entities.
//!
//! Validation never stops at the first problem: every violated constraint is
//! reported, in field order.

use crate::entity::{ClasseDraft, EleveDraft, NewClasse, NewEleve, NewProfesseur, ProfesseurDraft};
use serde::Serialize;

/// Longest accepted name, in characters.
pub const MAX_NAME_LENGTH: usize = 255;

pub const MIN_MOYENNE: f64 = 0.0;
pub const MAX_MOYENNE: f64 = 20.0;

/// One violated constraint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Violation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// A submitted value that can be checked and turned into its persisted form.
pub trait Validate: Sized {
    type Valid;

    /// Every violated constraint; empty when the value is acceptable.
    fn validate(&self) -> Vec<Violation>;

    /// Convert an acceptable value. Only meaningful when `validate` is empty.
    fn into_valid(self) -> Self::Valid;

    /// Validate, then convert.
    ///
    /// # Errors
    ///
    /// Returns all violations when at least one constraint fails.
    fn check(self) -> Result<Self::Valid, Vec<Violation>> {
        let violations = self.validate();
        if violations.is_empty() {
            Ok(self.into_valid())
        } else {
            Err(violations)
        }
    }
}

/// Required, non-blank, at most `MAX_NAME_LENGTH` characters.
fn check_name(
    violations: &mut Vec<Violation>,
    field: &str,
    value: Option<&str>,
    blank_message: &str,
    length_message: &str,
) {
    match value.map(str::trim) {
        None | Some("") => violations.push(Violation::new(field, blank_message)),
        Some(_) => {
            if value.map_or(0, |v| v.chars().count()) > MAX_NAME_LENGTH {
                violations.push(Violation::new(field, length_message));
            }
        }
    }
}

fn length_message(subject: &str) -> String {
    format!(
        "{} ne peut pas faire plus de {} caractères",
        subject, MAX_NAME_LENGTH
    )
}

fn check_professeur_ref(violations: &mut Vec<Violation>, professeur_id: Option<i64>) {
    if professeur_id.is_none() {
        violations.push(Violation::new("professeur", "Le professeur est obligatoire"));
    }
}

impl Validate for ProfesseurDraft {
    type Valid = NewProfesseur;

    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        check_name(
            &mut violations,
            "nom",
            self.nom.as_deref(),
            "Le nom du professeur est obligatoire",
            &length_message("Le nom du professeur"),
        );
        check_name(
            &mut violations,
            "prenom",
            self.prenom.as_deref(),
            "Le prénom du professeur est obligatoire",
            &length_message("Le prénom du professeur"),
        );
        for id in &self.unknown_classes {
            violations.push(Violation::new(
                "idClasse",
                format!("La classe {} n'existe pas", id),
            ));
        }
        for id in &self.unknown_eleves {
            violations.push(Violation::new(
                "idEleve",
                format!("L'élève {} n'existe pas", id),
            ));
        }
        violations
    }

    fn into_valid(self) -> NewProfesseur {
        NewProfesseur {
            nom: self.nom.unwrap_or_default(),
            prenom: self.prenom.unwrap_or_default(),
            classes: self.classes,
            eleves: self.eleves,
        }
    }
}

impl Validate for EleveDraft {
    type Valid = NewEleve;

    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        check_name(
            &mut violations,
            "nom",
            self.nom.as_deref(),
            "Le nom de l'élève est obligatoire",
            &length_message("Le nom de l'élève"),
        );
        check_name(
            &mut violations,
            "prenom",
            self.prenom.as_deref(),
            "Le prénom de l'élève est obligatoire",
            &length_message("Le prénom de l'élève"),
        );
        match self.moyenne {
            None => violations.push(Violation::new("moyenne", "La moyenne est obligatoire")),
            Some(m) if !(MIN_MOYENNE..=MAX_MOYENNE).contains(&m) => violations.push(
                Violation::new("moyenne", "La moyenne doit être comprise entre 0 et 20"),
            ),
            Some(_) => {}
        }
        check_professeur_ref(&mut violations, self.professeur_id);
        violations
    }

    fn into_valid(self) -> NewEleve {
        NewEleve {
            nom: self.nom.unwrap_or_default(),
            prenom: self.prenom.unwrap_or_default(),
            moyenne: self.moyenne.unwrap_or_default(),
            professeur_id: self.professeur_id.unwrap_or_default(),
        }
    }
}

impl Validate for ClasseDraft {
    type Valid = NewClasse;

    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        check_name(
            &mut violations,
            "nom",
            self.nom.as_deref(),
            "Le nom de la classe est obligatoire",
            &length_message("Le nom de la classe"),
        );
        check_professeur_ref(&mut violations, self.professeur_id);
        violations
    }

    fn into_valid(self) -> NewClasse {
        NewClasse {
            nom: self.nom.unwrap_or_default(),
            professeur_id: self.professeur_id.unwrap_or_default(),
        }
    }
}
