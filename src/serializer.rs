//! Group- and version-aware JSON rendering.
//!
//! Each exposable type publishes a static table of `FieldDescriptor`s. A
//! field is emitted only when the requested group is one of its groups and
//! the requested version is at least its `since` version; `None` values are
//! skipped. When the group is the type's own group the object also gets a
//! `_links` member (see `hateoas`).
//!
//! ```ignore
//! let ctx = SerializationContext::new(Group::GetEleve, ApiVersion::V1_0, &roles);
//! let json = serialize(&eleve_view, &ctx)?;
//! ```

use crate::error::Result;
use crate::hateoas;
use crate::resource::Resource;
use crate::versioning::ApiVersion;
use serde_json::{Map, Value};

/// Named field group selecting which fields a representation carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Group {
    GetProf,
    GetEleve,
    GetClasse,
}

/// Exposure rule for one serialized field.
#[derive(Clone, Copy, Debug)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub groups: &'static [Group],
    pub since: ApiVersion,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, groups: &'static [Group], since: ApiVersion) -> Self {
        FieldDescriptor {
            name,
            groups,
            since,
        }
    }

    pub fn is_exposed(&self, ctx: &SerializationContext<'_>) -> bool {
        self.groups.contains(&ctx.group) && ctx.version.includes(self.since)
    }
}

/// Group, version and caller roles for one rendering.
#[derive(Clone, Copy, Debug)]
pub struct SerializationContext<'a> {
    pub group: Group,
    pub version: ApiVersion,
    pub roles: &'a [String],
}

impl<'a> SerializationContext<'a> {
    pub fn new(group: Group, version: ApiVersion, roles: &'a [String]) -> Self {
        SerializationContext {
            group,
            version,
            roles,
        }
    }
}

/// A type that can be rendered through a descriptor table.
pub trait Exposable {
    /// Resource the links of this type point at.
    const RESOURCE: Resource;

    /// Every field this type can expose, in output order.
    const FIELDS: &'static [FieldDescriptor];

    fn id(&self) -> i64;

    /// Value of the field named `name`, or `None` when absent.
    ///
    /// Only called for names listed in `FIELDS` that are exposed in `ctx`.
    /// Nested values are rendered with the same `ctx`.
    fn field(&self, name: &str, ctx: &SerializationContext<'_>) -> Option<Value>;
}

/// Render `entity` as a JSON object.
pub fn to_value<E: Exposable>(entity: &E, ctx: &SerializationContext<'_>) -> Value {
    let mut object = Map::new();

    for descriptor in E::FIELDS.iter().filter(|d| d.is_exposed(ctx)) {
        match entity.field(descriptor.name, ctx) {
            Some(Value::Null) | None => {}
            Some(value) => {
                object.insert(descriptor.name.to_string(), value);
            }
        }
    }

    if ctx.group == E::RESOURCE.group() {
        let links = hateoas::build_links(E::RESOURCE, entity.id(), ctx.roles);
        object.insert("_links".to_string(), hateoas::links_value(&links));
    }

    Value::Object(object)
}

/// Render a slice of entities as a JSON array.
pub fn to_array<E: Exposable>(entities: &[E], ctx: &SerializationContext<'_>) -> Value {
    Value::Array(entities.iter().map(|e| to_value(e, ctx)).collect())
}

/// Render `entity` to a JSON string.
///
/// # Errors
///
/// Returns `Error::SerializationError` if JSON encoding fails.
pub fn serialize<E: Exposable>(entity: &E, ctx: &SerializationContext<'_>) -> Result<String> {
    Ok(serde_json::to_string(&to_value(entity, ctx))?)
}

/// Render a list page to a JSON string.
///
/// # Errors
///
/// Returns `Error::SerializationError` if JSON encoding fails.
pub fn serialize_list<E: Exposable>(
    entities: &[E],
    ctx: &SerializationContext<'_>,
) -> Result<String> {
    Ok(serde_json::to_string(&to_array(entities, ctx))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Badge {
        id: i64,
        label: String,
        color: Option<String>,
    }

    impl Exposable for Badge {
        const RESOURCE: Resource = Resource::Classe;
        const FIELDS: &'static [FieldDescriptor] = &[
            FieldDescriptor::new("id", &[Group::GetClasse, Group::GetProf], ApiVersion::V1_0),
            FieldDescriptor::new("label", &[Group::GetClasse], ApiVersion::V1_0),
            FieldDescriptor::new("color", &[Group::GetClasse], ApiVersion::new(2, 0)),
        ];

        fn id(&self) -> i64 {
            self.id
        }

        fn field(&self, name: &str, _ctx: &SerializationContext<'_>) -> Option<Value> {
            match name {
                "id" => Some(json!(self.id)),
                "label" => Some(json!(self.label)),
                "color" => self.color.as_ref().map(|c| json!(c)),
                _ => None,
            }
        }
    }

    fn badge() -> Badge {
        Badge {
            id: 7,
            label: "6e B".to_string(),
            color: Some("blue".to_string()),
        }
    }

    #[test]
    fn test_newer_fields_hidden_in_older_version() {
        let roles = vec!["ROLE_USER".to_string()];
        let v1 = SerializationContext::new(Group::GetClasse, ApiVersion::V1_0, &roles);
        let v2 = SerializationContext::new(Group::GetClasse, ApiVersion::new(2, 0), &roles);

        assert!(to_value(&badge(), &v1).get("color").is_none());
        assert_eq!(to_value(&badge(), &v2)["color"], "blue");
    }

    #[test]
    fn test_group_filters_fields_and_links() {
        let roles = vec!["ROLE_USER".to_string()];
        let ctx = SerializationContext::new(Group::GetProf, ApiVersion::V1_0, &roles);

        let value = to_value(&badge(), &ctx);
        assert_eq!(value, json!({"id": 7}));
    }

    #[test]
    fn test_none_values_omitted() {
        let roles = vec!["ROLE_USER".to_string()];
        let ctx = SerializationContext::new(Group::GetClasse, ApiVersion::new(2, 0), &roles);
        let mut b = badge();
        b.color = None;

        let value = to_value(&b, &ctx);
        assert!(value.get("color").is_none());
        assert_eq!(value["_links"]["self"]["href"], "/api/classe/7");
    }

    #[test]
    fn test_serialize_list() {
        let roles = vec!["ROLE_USER".to_string()];
        let ctx = SerializationContext::new(Group::GetProf, ApiVersion::V1_0, &roles);

        let json = serialize_list(&[badge(), badge()], &ctx).unwrap();
        assert_eq!(json, r#"[{"id":7},{"id":7}]"#);
    }
}
