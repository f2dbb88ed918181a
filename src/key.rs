//! Cache key construction for list pages.

/// Builder for cache keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Key of one list page as seen by one role set:
    /// `"{operation}-{page}-{limit}-{roles}"`.
    ///
    /// Roles are sorted and de-duplicated so two callers holding the same
    /// roles in a different order share an entry.
    pub fn list_key<S: AsRef<str>>(operation: &str, page: u32, limit: u32, roles: &[S]) -> String {
        let mut roles: Vec<&str> = roles.iter().map(|r| r.as_ref()).collect();
        roles.sort_unstable();
        roles.dedup();
        format!("{}-{}-{}-{}", operation, page, limit, roles.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_key_format() {
        let key = CacheKeyBuilder::list_key("getEleve", 2, 10, &["ROLE_USER"]);
        assert_eq!(key, "getEleve-2-10-ROLE_USER");
    }

    #[test]
    fn test_list_key_sorts_roles() {
        let a = CacheKeyBuilder::list_key("getProfesseur", 1, 10, &["ROLE_USER", "ROLE_ADMIN"]);
        let b = CacheKeyBuilder::list_key("getProfesseur", 1, 10, &["ROLE_ADMIN", "ROLE_USER"]);
        assert_eq!(a, b);
        assert_eq!(a, "getProfesseur-1-10-ROLE_ADMIN,ROLE_USER");
    }

    #[test]
    fn test_list_key_partitions_by_roles() {
        let user = CacheKeyBuilder::list_key("getClasses", 1, 10, &["ROLE_USER"]);
        let admin = CacheKeyBuilder::list_key("getClasses", 1, 10, &["ROLE_ADMIN", "ROLE_USER"]);
        assert_ne!(user, admin);
    }
}
