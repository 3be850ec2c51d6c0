//! Binding of schemas to the combined configuration.
//!
//! A [`BoundView`] pairs a schema with a location in the combined tree.
//! Views hold no values: every access resolves the property path again,
//! so two reads of the same property always agree.

use super::combined::CombinedConfig;
use super::convert::{
    ConversionError, FromTypedValue, ScalarType, TypedValue, convert, convert_values,
};
use super::node::Scalar;
use super::path::{Locator, Resolution, resolve};
use super::schema::{Property, PropertyKind, Schema, SchemaRef, ValueKind};
use crate::error::{ConfigError, ConfigResult};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// How many nested views may be stacked below a root view.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Bind `schema` at `locator`.
pub fn bind(schema: &Arc<Schema>, config: &Arc<CombinedConfig>, locator: Locator) -> BoundView {
    BoundView {
        config: Arc::clone(config),
        schema: Arc::clone(schema),
        locator,
        depth: 0,
    }
}

/// The value of one property, shaped by its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Scalar(TypedValue),
    Array(Vec<TypedValue>),
    Nested(BoundView),
    NestedArray(Vec<BoundView>),
}

/// Types that can be built from a bound view.
///
/// ```
/// use chassis_config::config::{BoundView, FromBoundView};
/// use chassis_config::error::ConfigResult;
///
/// struct Artifact {
///     group_id: String,
///     version: String,
/// }
///
/// impl FromBoundView for Artifact {
///     fn from_view(view: &BoundView) -> ConfigResult<Self> {
///         Ok(Self {
///             group_id: view.string("group_id")?,
///             version: view.string("version")?,
///         })
///     }
/// }
/// ```
pub trait FromBoundView: Sized {
    fn from_view(view: &BoundView) -> ConfigResult<Self>;
}

/// A schema bound to a location in a combined configuration.
#[derive(Clone)]
pub struct BoundView {
    config: Arc<CombinedConfig>,
    schema: Arc<Schema>,
    locator: Locator,
    depth: usize,
}

impl BoundView {
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &Arc<CombinedConfig> {
        &self.config
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// The location of this view, rendered as an absolute path.
    pub fn path(&self) -> String {
        self.locator.to_string()
    }

    /// Resolve one property.
    pub fn get(&self, name: &str) -> ConfigResult<BoundValue> {
        let property = self.property(name)?;
        match property.descriptor.kind() {
            PropertyKind::Scalar(ty) => self.scalar(property, *ty).map(BoundValue::Scalar),
            PropertyKind::ScalarArray(ty) => self.scalars(property, *ty).map(BoundValue::Array),
            PropertyKind::Nested(target) => {
                self.nested_view(property, target).map(BoundValue::Nested)
            }
            PropertyKind::NestedArray(target) => {
                self.nested_views(property, target).map(BoundValue::NestedArray)
            }
        }
    }

    /// Resolve a scalar property into `T`.
    ///
    /// `T` must match the declared scalar type.
    pub fn get_as<T: FromTypedValue>(&self, name: &str) -> ConfigResult<T> {
        let property = self.property(name)?;
        let PropertyKind::Scalar(ty) = property.descriptor.kind() else {
            return Err(self.kind_mismatch(property, ValueKind::Scalar));
        };
        let value = self.scalar(property, *ty)?;
        self.typed(property, value)
    }

    pub fn string(&self, name: &str) -> ConfigResult<String> {
        self.get_as(name)
    }

    pub fn bool(&self, name: &str) -> ConfigResult<bool> {
        self.get_as(name)
    }

    pub fn i32(&self, name: &str) -> ConfigResult<i32> {
        self.get_as(name)
    }

    pub fn i64(&self, name: &str) -> ConfigResult<i64> {
        self.get_as(name)
    }

    pub fn f64(&self, name: &str) -> ConfigResult<f64> {
        self.get_as(name)
    }

    /// Resolve a scalar array property into a `Vec<T>`.
    pub fn list<T: FromTypedValue>(&self, name: &str) -> ConfigResult<Vec<T>> {
        let property = self.property(name)?;
        let PropertyKind::ScalarArray(ty) = property.descriptor.kind() else {
            return Err(self.kind_mismatch(property, ValueKind::ScalarArray));
        };
        self.scalars(property, *ty)?
            .into_iter()
            .map(|value| self.typed(property, value))
            .collect()
    }

    pub fn strings(&self, name: &str) -> ConfigResult<Vec<String>> {
        self.list(name)
    }

    pub fn nested(&self, name: &str) -> ConfigResult<BoundView> {
        let property = self.property(name)?;
        let PropertyKind::Nested(target) = property.descriptor.kind() else {
            return Err(self.kind_mismatch(property, ValueKind::Nested));
        };
        self.nested_view(property, target)
    }

    pub fn nested_list(&self, name: &str) -> ConfigResult<Vec<BoundView>> {
        let property = self.property(name)?;
        let PropertyKind::NestedArray(target) = property.descriptor.kind() else {
            return Err(self.kind_mismatch(property, ValueKind::NestedArray));
        };
        self.nested_views(property, target)
    }

    /// Build a `T` from this view.
    pub fn extract<T: FromBoundView>(&self) -> ConfigResult<T> {
        T::from_view(self)
    }

    fn property(&self, name: &str) -> ConfigResult<&Property> {
        self.schema
            .entry(name)
            .ok_or_else(|| ConfigError::UnknownProperty {
                schema: self.schema.name().to_string(),
                property: name.to_string(),
            })
    }

    fn resolve(&self, property: &Property) -> Resolution<'_> {
        resolve(&property.path, &self.locator, &self.config)
    }

    fn rendered(&self, property: &Property) -> String {
        self.locator.join(&property.path)
    }

    fn scalar(&self, property: &Property, ty: ScalarType) -> ConfigResult<TypedValue> {
        let resolution = self.resolve(property);
        if let Some(found) = resolution.first() {
            return convert_values(found.node.values(), ty)
                .map_err(|e| ConfigError::conversion(found.locator.to_string(), e));
        }

        let path = self.rendered(property);
        match property.descriptor.default_literal() {
            Some(literal) => {
                debug!(property = property.descriptor.name(), %path, "Using default value");
                convert(&Scalar::from(literal), ty).map_err(|e| ConfigError::conversion(path, e))
            }
            None => {
                debug!(property = property.descriptor.name(), %path, "Property not set");
                Err(ConfigError::missing(path))
            }
        }
    }

    fn scalars(&self, property: &Property, ty: ScalarType) -> ConfigResult<Vec<TypedValue>> {
        let resolution = self.resolve(property);
        let mut values = Vec::new();
        for found in resolution.matches() {
            for raw in found.node.values() {
                let value = convert(raw, ty)
                    .map_err(|e| ConfigError::conversion(found.locator.to_string(), e))?;
                values.push(value);
            }
        }
        Ok(values)
    }

    fn nested_view(&self, property: &Property, target: &SchemaRef) -> ConfigResult<BoundView> {
        let resolution = self.resolve(property);
        let Some(found) = resolution.first() else {
            return Err(ConfigError::missing(self.rendered(property)));
        };
        self.child(property, target, found.locator.clone())
    }

    fn nested_views(
        &self,
        property: &Property,
        target: &SchemaRef,
    ) -> ConfigResult<Vec<BoundView>> {
        self.resolve(property)
            .matches()
            .iter()
            .map(|found| self.child(property, target, found.locator.clone()))
            .collect()
    }

    fn child(
        &self,
        property: &Property,
        target: &SchemaRef,
        locator: Locator,
    ) -> ConfigResult<BoundView> {
        let depth = self.depth + 1;
        if depth > MAX_NESTING_DEPTH {
            return Err(ConfigError::invalid_schema(
                self.schema.name(),
                property.descriptor.name(),
                format!("nests deeper than {} levels at {}", MAX_NESTING_DEPTH, locator),
            ));
        }
        let schema = match target {
            SchemaRef::Schema(schema) => Arc::clone(schema),
            SchemaRef::Itself => Arc::clone(&self.schema),
        };
        Ok(BoundView {
            config: Arc::clone(&self.config),
            schema,
            locator,
            depth,
        })
    }

    fn typed<T: FromTypedValue>(&self, property: &Property, value: TypedValue) -> ConfigResult<T> {
        let declared = value.scalar_type();
        T::from_typed(value.clone()).ok_or_else(|| {
            ConfigError::conversion(
                self.rendered(property),
                ConversionError {
                    value: value.to_string(),
                    target: T::SCALAR_TYPE,
                    reason: format!("property is declared as {}", declared),
                },
            )
        })
    }

    fn kind_mismatch(&self, property: &Property, requested: ValueKind) -> ConfigError {
        ConfigError::KindMismatch {
            property: property.descriptor.name().to_string(),
            declared: property.descriptor.value_kind(),
            requested,
        }
    }
}

impl PartialEq for BoundView {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.config, &other.config)
            && Arc::ptr_eq(&self.schema, &other.schema)
            && self.locator == other.locator
    }
}

impl fmt::Debug for BoundView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundView")
            .field("schema", &self.schema.name())
            .field("path", &self.path())
            .field("depth", &self.depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::merge::merge;
    use crate::config::node::ConfigNode;
    use crate::config::overrides::Overrides;
    use crate::error::ErrorCode;

    fn artifact(group: &str, version: &str) -> ConfigNode {
        ConfigNode::new("artifact_info")
            .with_child(ConfigNode::leaf("groupId", [group]))
            .with_child(ConfigNode::leaf("version", [version]))
    }

    fn dependency(group: &str) -> ConfigNode {
        ConfigNode::new("dependency").with_child(ConfigNode::leaf("groupId", [group]))
    }

    fn base() -> ConfigNode {
        ConfigNode::root()
            .with_child(ConfigNode::leaf("version", ["2.1"]))
            .with_child(ConfigNode::leaf("hash", ["0xA1"]))
            .with_child(ConfigNode::leaf("authors", ["Mickey Mouse", "Donald Duck"]))
            .with_child(ConfigNode::leaf("single_author", ["Goofy"]))
            .with_child(artifact("com.github.anyloop", "0.1.0"))
            .with_child(
                ConfigNode::new("dependencies")
                    .with_child(dependency("commons-configuration"))
                    .with_child(dependency("commons-beanutils")),
            )
    }

    fn artifact_schema() -> Arc<Schema> {
        Schema::builder("ArtifactInfo")
            .scalar("group_id", ".groupId", ScalarType::String)
            .scalar("version", ".version", ScalarType::String)
            .build()
            .unwrap()
    }

    fn schema() -> Arc<Schema> {
        let dependency = Schema::builder("Dependency")
            .scalar("group_id", "groupId", ScalarType::String)
            .scalar("root_version", "/version", ScalarType::String)
            .build()
            .unwrap();
        Schema::builder("Example")
            .scalar("version", "version", ScalarType::String)
            .scalar("version_number", "version", ScalarType::I32)
            .scalar("hash", "hash", ScalarType::I64)
            .scalar_or("nonexistent_hash", "nonexistent_hash", ScalarType::I64, "0x22")
            .scalar("required", "required", ScalarType::String)
            .scalar_array("authors", "authors", ScalarType::String)
            .scalar_array("single_author", "single_author", ScalarType::String)
            .scalar_array("nobody", "nobody", ScalarType::String)
            .nested("artifact_info", "artifact_info", &artifact_schema())
            .nested("missing_info", "missing_info", &artifact_schema())
            .nested_array("dependencies", "dependencies.dependency", &dependency)
            .nested_array("none", "no.such.group", &dependency)
            .build()
            .unwrap()
    }

    fn view(trees: Vec<ConfigNode>, overrides: Overrides) -> BoundView {
        let sources = trees
            .into_iter()
            .enumerate()
            .map(|(i, tree)| (format!("source-{}", i), tree))
            .collect();
        let config = Arc::new(merge(sources, &overrides));
        bind(&schema(), &config, Locator::root())
    }

    #[test]
    fn test_scalars_defaults_and_missing() {
        let view = view(vec![base()], Overrides::new());
        assert_eq!(view.string("version").unwrap(), "2.1");
        assert_eq!(view.i64("hash").unwrap(), 161);
        assert_eq!(view.i64("nonexistent_hash").unwrap(), 34);

        let err = view.string("required").unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingProperty);
        assert!(err.to_string().contains("/required"));
    }

    #[test]
    fn test_conversion_failure_is_local() {
        let view = view(vec![base()], Overrides::new());
        let err = view.i32("version_number").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConversionFailed);
        assert_eq!(view.string("version").unwrap(), "2.1");
    }

    #[test]
    fn test_arrays_promote_and_default_to_empty() {
        let view = view(vec![base()], Overrides::new());
        assert_eq!(view.strings("authors").unwrap(), vec!["Mickey Mouse", "Donald Duck"]);
        assert_eq!(view.strings("single_author").unwrap(), vec!["Goofy"]);
        assert!(view.strings("nobody").unwrap().is_empty());
        assert!(view.nested_list("none").unwrap().is_empty());
    }

    #[test]
    fn test_nested_fields_fall_back_across_sources() {
        let overlay = ConfigNode::root().with_child(
            ConfigNode::new("artifact_info").with_child(ConfigNode::leaf("version", ["0.1.1"])),
        );
        let view = view(vec![base(), overlay], Overrides::new());

        let info = view.nested("artifact_info").unwrap();
        assert_eq!(info.string("group_id").unwrap(), "com.github.anyloop");
        assert_eq!(info.string("version").unwrap(), "0.1.1");
        assert_eq!(info.path(), "/artifact_info[0]");

        let err = view.nested("missing_info").unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingProperty);
    }

    #[test]
    fn test_nested_array_elements_resolve_relative_and_absolute() {
        let view = view(vec![base()], Overrides::new().with("version", "0.5.0").unwrap());
        let deps = view.nested_list("dependencies").unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].string("group_id").unwrap(), "commons-configuration");
        assert_eq!(deps[1].string("group_id").unwrap(), "commons-beanutils");
        // Absolute paths escape the pinned element.
        assert_eq!(deps[1].string("root_version").unwrap(), "0.5.0");
    }

    #[test]
    fn test_group_of_higher_source_hides_lower_members() {
        let versioned = |group: &str, version: &str| {
            dependency(group).with_child(ConfigNode::leaf("version", [version]))
        };
        let low = ConfigNode::root().with_child(
            ConfigNode::new("deps")
                .with_child(versioned("a", "1.0"))
                .with_child(versioned("b", "2.0"))
                .with_child(versioned("c", "3.0")),
        );
        let high = ConfigNode::root().with_child(
            ConfigNode::new("deps")
                .with_child(dependency("x"))
                .with_child(dependency("y")),
        );
        let member = Schema::builder("Member")
            .scalar("group_id", "groupId", ScalarType::String)
            .scalar("version", "version", ScalarType::String)
            .build()
            .unwrap();
        let schema = Schema::builder("Deps")
            .nested("first", "deps.dependency[0]", &member)
            .nested("third", "deps.dependency[2]", &member)
            .nested_array("all", "deps.dependency", &member)
            .scalar_array("versions", "deps.dependency.version", ScalarType::String)
            .scalar("third_group", "deps.dependency[2].groupId", ScalarType::String)
            .build()
            .unwrap();
        let config = Arc::new(merge(
            vec![("low".into(), low), ("high".into(), high)],
            &Overrides::new(),
        ));
        let view = bind(&schema, &config, Locator::root());

        let first = view.nested("first").unwrap();
        assert_eq!(first.string("group_id").unwrap(), "x");
        assert_eq!(first.string("version").unwrap_err().code(), ErrorCode::MissingProperty);

        let all = view.nested_list("all").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], first);
        assert_eq!(all[0].string("version").unwrap_err().code(), ErrorCode::MissingProperty);

        assert!(view.strings("versions").unwrap().is_empty());
        assert_eq!(view.nested("third").unwrap_err().code(), ErrorCode::MissingProperty);
        assert_eq!(
            view.string("third_group").unwrap_err().code(),
            ErrorCode::MissingProperty
        );
    }

    #[test]
    fn test_accessors_are_idempotent() {
        let view = view(vec![base()], Overrides::new());
        assert_eq!(view.get("authors").unwrap(), view.get("authors").unwrap());
        assert_eq!(view.get("dependencies").unwrap(), view.get("dependencies").unwrap());
        assert_eq!(
            view.get("hash").unwrap(),
            BoundValue::Scalar(TypedValue::I64(161))
        );
    }

    #[test]
    fn test_unknown_property_and_kind_mismatch() {
        let view = view(vec![base()], Overrides::new());
        assert_eq!(view.get("nope").unwrap_err().code(), ErrorCode::UnknownProperty);
        assert_eq!(view.string("authors").unwrap_err().code(), ErrorCode::KindMismatch);
        assert_eq!(view.strings("version").unwrap_err().code(), ErrorCode::KindMismatch);
        // Declared i64, requested i32.
        assert_eq!(view.i32("hash").unwrap_err().code(), ErrorCode::ConversionFailed);
    }

    #[test]
    fn test_default_equals_lowest_priority_source() {
        let defaulted = view(vec![base()], Overrides::new());
        let supplied = view(
            vec![
                ConfigNode::root().with_child(ConfigNode::leaf("nonexistent_hash", ["0x22"])),
                base(),
            ],
            Overrides::new(),
        );
        assert_eq!(
            defaulted.get("nonexistent_hash").unwrap(),
            supplied.get("nonexistent_hash").unwrap()
        );
    }

    #[test]
    fn test_recursive_nested_uses_the_same_schema() {
        let section = Schema::builder("Section")
            .scalar("title", "title", ScalarType::String)
            .recursive("inner", "inner")
            .build()
            .unwrap();
        let root = ConfigNode::root()
            .with_child(ConfigNode::leaf("title", ["outer"]))
            .with_child(ConfigNode::new("inner").with_child(ConfigNode::leaf("title", ["inner"])));
        let config = Arc::new(merge(vec![("s".into(), root)], &Overrides::new()));

        let view = bind(&section, &config, Locator::root());
        let inner = view.nested("inner").unwrap();
        assert!(Arc::ptr_eq(inner.schema(), view.schema()));
        assert_eq!(inner.string("title").unwrap(), "inner");
        assert_eq!(inner.nested("inner").unwrap_err().code(), ErrorCode::MissingProperty);
    }

    #[test]
    fn test_self_referential_schema_stops_at_depth_limit() {
        let tree_schema = Schema::builder("Tree")
            .scalar_or("label", "label", ScalarType::String, "")
            .recursive_array("children", "node")
            .build()
            .unwrap();

        let mut chain = ConfigNode::new("node").with_child(ConfigNode::leaf("label", ["leaf"]));
        for _ in 0..MAX_NESTING_DEPTH + 5 {
            chain = ConfigNode::new("node").with_child(chain);
        }
        let config = Arc::new(merge(
            vec![("tree".into(), ConfigNode::root().with_child(chain))],
            &Overrides::new(),
        ));

        let mut current = bind(&tree_schema, &config, Locator::root());
        for _ in 0..MAX_NESTING_DEPTH {
            let mut children = current.nested_list("children").unwrap();
            assert_eq!(children.len(), 1);
            current = children.remove(0);
        }
        let err = current.nested_list("children").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSchema);
    }
}
