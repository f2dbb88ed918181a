//! Hypermedia links attached to serialized entities.

use crate::auth::ROLE_ADMIN;
use crate::resource::Resource;
use serde_json::{json, Map, Value};

/// A relation name and its target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub rel: &'static str,
    pub href: String,
}

/// Links for entity `id` of `resource` as seen by a caller holding `roles`.
///
/// `self` is always present; `delete` and `update` only for `ROLE_ADMIN`.
pub fn build_links(resource: Resource, id: i64, roles: &[String]) -> Vec<Link> {
    let href = resource.detail_path(id);
    let mut links = vec![Link {
        rel: "self",
        href: href.clone(),
    }];

    if roles.iter().any(|r| r == ROLE_ADMIN) {
        links.push(Link {
            rel: "delete",
            href: href.clone(),
        });
        links.push(Link {
            rel: "update",
            href,
        });
    }
    links
}

/// `{"self": {"href": "/api/eleve/3"}, ...}`
pub fn links_value(links: &[Link]) -> Value {
    let mut object = Map::new();
    for link in links {
        object.insert(link.rel.to_string(), json!({ "href": link.href }));
    }
    Value::Object(object)
}
