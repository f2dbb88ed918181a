//! Demo data for local runs.

use crate::auth::{Authenticator, ROLE_ADMIN, ROLE_USER};
use crate::entity::{NewClasse, NewEleve, NewProfesseur};
use crate::error::Result;
use crate::repository::{DataRepository, Store};
use std::time::Duration;

pub const DEMO_USER: &str = "user@school.com";
pub const DEMO_ADMIN: &str = "admin@school.com";

const DEMO_ROWS: u32 = 20;
const DEMO_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Insert 20 professeurs, then 20 eleves (`moyenne = i`) and 20 classes, the
/// i-th of each attached to the i-th professeur.
///
/// Does nothing when professeurs already exist. Returns the number of
/// professeurs inserted.
///
/// # Errors
///
/// Returns `Err` if any insert fails.
pub async fn seed_demo_data(store: &Store) -> Result<u32> {
    if store.professeurs.count().await? > 0 {
        info!("Store already populated, skipping demo data");
        return Ok(0);
    }

    let mut professeurs = Vec::with_capacity(DEMO_ROWS as usize);
    for i in 0..DEMO_ROWS {
        let professeur = store
            .professeurs
            .create(&NewProfesseur {
                nom: format!("Nom :{}", i),
                prenom: format!("Prénom :{}", i),
                classes: Vec::new(),
                eleves: Vec::new(),
            })
            .await?;
        professeurs.push(professeur.id);
    }

    for (i, professeur_id) in professeurs.iter().enumerate() {
        store
            .eleves
            .create(&NewEleve {
                nom: format!("Nom :{}", i),
                prenom: format!("Prénom :{}", i),
                moyenne: i as f64,
                professeur_id: *professeur_id,
            })
            .await?;
    }

    for (i, professeur_id) in professeurs.iter().enumerate() {
        store
            .classes
            .create(&NewClasse {
                nom: format!("Nom : {}", i),
                professeur_id: *professeur_id,
            })
            .await?;
    }

    info!(
        "Seeded {} professeurs, eleves and classes",
        DEMO_ROWS
    );
    Ok(DEMO_ROWS)
}

/// Bearer tokens for the demo user and the demo admin, valid for a day.
///
/// # Errors
///
/// Returns `Error::Token` if signing fails.
pub fn demo_tokens(auth: &Authenticator) -> Result<(String, String)> {
    let user = auth.issue(DEMO_USER, &[ROLE_USER], DEMO_TOKEN_TTL)?;
    let admin = auth.issue(DEMO_ADMIN, &[ROLE_ADMIN], DEMO_TOKEN_TTL)?;
    Ok((user, admin))
}
