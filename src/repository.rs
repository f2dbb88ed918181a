//! Data repository trait and its SQLite implementation.
//!
//! `DataRepository` covers the reads every entity type supports. Writes are
//! inherent methods on `SqliteRepository<T>` per entity type, since each type
//! has its own columns and relation handling. `Store` bundles the three
//! repositories over one pool and hydrates rows into views.
//!
//! # Error Handling
//!
//! Every method returns `Err` only for store failures (connectivity, failed
//! statements, constraint violations). A missing row is `Ok(None)`.

use crate::entity::{
    Classe, ClasseView, Eleve, EleveView, Entity, NewClasse, NewEleve, NewProfesseur, Professeur,
    ProfesseurView,
};
use crate::error::Result;
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::Transaction;
use std::marker::PhantomData;

/// One page of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 10;

    /// Page `page` of `limit` rows. Zero values fall back to the defaults.
    pub fn new(page: u32, limit: u32) -> Self {
        Pagination {
            page: if page == 0 { Self::DEFAULT_PAGE } else { page },
            limit: if limit == 0 { Self::DEFAULT_LIMIT } else { limit },
        }
    }

    /// Parse raw query values; anything that is not a positive integer falls
    /// back to the default.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|v| v.trim().parse::<u32>().ok()).unwrap_or(0);
        Pagination::new(parse(page), parse(limit))
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination::new(Self::DEFAULT_PAGE, Self::DEFAULT_LIMIT)
    }
}

/// Read access to one entity type.
#[allow(async_fn_in_trait)]
pub trait DataRepository<T: Entity>: Send + Sync {
    /// Fetch entity by id.
    ///
    /// # Returns
    /// - `Ok(Some(entity))` - Entity found
    /// - `Ok(None)` - Entity not found (not an error)
    /// - `Err(e)` - Database error
    async fn fetch_by_id(&self, id: i64) -> Result<Option<T>>;

    /// Batch fetch, one slot per requested id.
    ///
    /// # Errors
    /// Returns `Err` if any fetch fails
    async fn fetch_by_ids(&self, ids: &[i64]) -> Result<Vec<Option<T>>> {
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            results.push(self.fetch_by_id(*id).await?);
        }
        Ok(results)
    }

    /// Rows `[(page-1)*limit, page*limit)` in ascending id order. A page past
    /// the end is empty.
    ///
    /// # Errors
    /// Returns `Err` if the query fails
    async fn find_all_with_pagination(&self, page: Pagination) -> Result<Vec<T>>;

    /// Count all rows.
    ///
    /// # Errors
    /// Returns `Err` if the query fails
    async fn count(&self) -> Result<u64>;
}

/// Entity types whose table has a `professeur_id` column.
pub trait HasProfesseur: Entity {}

impl HasProfesseur for Eleve {}
impl HasProfesseur for Classe {}

/// SQLite repository for entity type `T`.
pub struct SqliteRepository<T> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for SqliteRepository<T> {
    fn clone(&self) -> Self {
        SqliteRepository {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> SqliteRepository<T> {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteRepository {
            pool,
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> DataRepository<T> for SqliteRepository<T> {
    async fn fetch_by_id(&self, id: i64) -> Result<Option<T>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", T::TABLE);
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_all_with_pagination(&self, page: Pagination) -> Result<Vec<T>> {
        let sql = format!("SELECT * FROM {} ORDER BY id LIMIT ? OFFSET ?", T::TABLE);
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, T>(&sql)
            .bind(i64::from(page.limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        debug!(
            "Fetched {} {} rows (page {}, limit {})",
            rows.len(),
            T::TABLE,
            page.page,
            page.limit
        );
        Ok(rows)
    }

    async fn count(&self) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", T::TABLE);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }
}

impl<T: HasProfesseur> SqliteRepository<T> {
    /// Every row owned by professeur `professeur_id`, in id order.
    ///
    /// # Errors
    /// Returns `Err` if the query fails
    pub async fn find_by_professeur(&self, professeur_id: i64) -> Result<Vec<T>> {
        let sql = format!(
            "SELECT * FROM {} WHERE professeur_id = ? ORDER BY id",
            T::TABLE
        );
        let rows = sqlx::query_as::<_, T>(&sql)
            .bind(professeur_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// # Errors
    /// Returns `Err` if the statement fails
    pub async fn delete(&self, id: i64) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        info!("Deleted {} {}", T::TABLE, id);
        Ok(())
    }
}

/// Reassign the given classes and eleves to `professeur_id`.
async fn attach_children(
    tx: &mut Transaction<'_, Sqlite>,
    professeur_id: i64,
    classes: &[i64],
    eleves: &[i64],
) -> Result<()> {
    for id in classes {
        sqlx::query("UPDATE classe SET professeur_id = ? WHERE id = ?")
            .bind(professeur_id)
            .bind(*id)
            .execute(&mut **tx)
            .await?;
    }
    for id in eleves {
        sqlx::query("UPDATE eleve SET professeur_id = ? WHERE id = ?")
            .bind(professeur_id)
            .bind(*id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

impl SqliteRepository<Professeur> {
    /// Insert a professeur and attach the listed classes and eleves to it.
    ///
    /// # Errors
    /// Returns `Err` if any statement fails; nothing is written then.
    pub async fn create(&self, new: &NewProfesseur) -> Result<Professeur> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query("INSERT INTO professeur (nom, prenom) VALUES (?, ?)")
            .bind(&new.nom)
            .bind(&new.prenom)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        attach_children(&mut tx, id, &new.classes, &new.eleves).await?;

        tx.commit().await?;
        info!("Created professeur {}", id);

        Ok(Professeur {
            id,
            nom: new.nom.clone(),
            prenom: new.prenom.clone(),
        })
    }

    /// Overwrite the names of professeur `id` and attach the listed children.
    /// Children already attached stay attached.
    ///
    /// # Errors
    /// Returns `Err` if any statement fails; nothing is written then.
    pub async fn update(&self, id: i64, new: &NewProfesseur) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE professeur SET nom = ?, prenom = ? WHERE id = ?")
            .bind(&new.nom)
            .bind(&new.prenom)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        attach_children(&mut tx, id, &new.classes, &new.eleves).await?;

        tx.commit().await?;
        info!("Updated professeur {}", id);
        Ok(())
    }

    /// Delete professeur `id` together with its eleves and classes.
    ///
    /// # Errors
    /// Returns `Err` if any statement fails; nothing is deleted then.
    pub async fn delete_cascade(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let eleves = sqlx::query("DELETE FROM eleve WHERE professeur_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let classes = sqlx::query("DELETE FROM classe WHERE professeur_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM professeur WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(
            "Deleted professeur {} with {} eleves and {} classes",
            id, eleves, classes
        );
        Ok(())
    }
}

impl SqliteRepository<Eleve> {
    /// # Errors
    /// Returns `Err` if the insert fails
    pub async fn create(&self, new: &NewEleve) -> Result<Eleve> {
        let id = sqlx::query(
            "INSERT INTO eleve (nom, prenom, moyenne, professeur_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&new.nom)
        .bind(&new.prenom)
        .bind(new.moyenne)
        .bind(new.professeur_id)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        info!("Created eleve {}", id);

        Ok(Eleve {
            id,
            nom: new.nom.clone(),
            prenom: new.prenom.clone(),
            moyenne: new.moyenne,
            professeur_id: new.professeur_id,
        })
    }

    /// # Errors
    /// Returns `Err` if the update fails
    pub async fn update(&self, id: i64, new: &NewEleve) -> Result<()> {
        sqlx::query(
            "UPDATE eleve SET nom = ?, prenom = ?, moyenne = ?, professeur_id = ? WHERE id = ?",
        )
        .bind(&new.nom)
        .bind(&new.prenom)
        .bind(new.moyenne)
        .bind(new.professeur_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        info!("Updated eleve {}", id);
        Ok(())
    }
}

impl SqliteRepository<Classe> {
    /// # Errors
    /// Returns `Err` if the insert fails
    pub async fn create(&self, new: &NewClasse) -> Result<Classe> {
        let id = sqlx::query("INSERT INTO classe (nom, professeur_id) VALUES (?, ?)")
            .bind(&new.nom)
            .bind(new.professeur_id)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        info!("Created classe {}", id);

        Ok(Classe {
            id,
            nom: new.nom.clone(),
            professeur_id: new.professeur_id,
        })
    }

    /// # Errors
    /// Returns `Err` if the update fails
    pub async fn update(&self, id: i64, new: &NewClasse) -> Result<()> {
        sqlx::query("UPDATE classe SET nom = ?, professeur_id = ? WHERE id = ?")
            .bind(&new.nom)
            .bind(new.professeur_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        info!("Updated classe {}", id);
        Ok(())
    }
}

/// The three repositories over one pool.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    pub professeurs: SqliteRepository<Professeur>,
    pub eleves: SqliteRepository<Eleve>,
    pub classes: SqliteRepository<Classe>,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Store {
            professeurs: SqliteRepository::new(pool.clone()),
            eleves: SqliteRepository::new(pool.clone()),
            classes: SqliteRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Load the classes and eleves of `professeur`.
    ///
    /// # Errors
    /// Returns `Err` if a query fails
    pub async fn professeur_view(&self, professeur: Professeur) -> Result<ProfesseurView> {
        let classes = self.classes.find_by_professeur(professeur.id).await?;
        let eleves = self.eleves.find_by_professeur(professeur.id).await?;

        Ok(ProfesseurView {
            professeur,
            classes: classes.into_iter().map(ClasseView::bare).collect(),
            eleves: eleves.into_iter().map(EleveView::bare).collect(),
        })
    }

    /// # Errors
    /// Returns `Err` if a query fails
    pub async fn eleve_view(&self, eleve: Eleve) -> Result<EleveView> {
        let professeur = self.owner_view(eleve.professeur_id).await?;
        Ok(EleveView { eleve, professeur })
    }

    /// # Errors
    /// Returns `Err` if a query fails
    pub async fn classe_view(&self, classe: Classe) -> Result<ClasseView> {
        let professeur = self.owner_view(classe.professeur_id).await?;
        Ok(ClasseView { classe, professeur })
    }

    async fn owner_view(&self, professeur_id: i64) -> Result<Option<Box<ProfesseurView>>> {
        match self.professeurs.fetch_by_id(professeur_id).await? {
            Some(professeur) => Ok(Some(Box::new(self.professeur_view(professeur).await?))),
            None => Ok(None),
        }
    }
}
