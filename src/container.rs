use crate::error::ParseError;
use crate::parse::{self, DecodeOptions};
use crate::registry::{Registry, RegistryConfig};
use crate::schema::CompiledSchema;
use crate::snapshot::Snapshot;

/// Bundles a registry with the compiled schema it decodes against. Created
/// once per named configuration namespace at startup; declarations register
/// their compile-time defaults and rules onto it via
/// `Registry::update_definition` before any JSON is ever loaded.
pub struct Container {
    registry: Registry,
    schema: CompiledSchema,
}

impl Container {
    pub fn new(
        container_id: impl Into<String>,
        schema: CompiledSchema,
        initial: Snapshot,
        config: RegistryConfig,
    ) -> Self {
        Container {
            registry: Registry::new(container_id, initial, config),
            schema,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    /// Decodes `json` against this container's schema and, on success,
    /// publishes it. On failure the container's current snapshot is
    /// untouched and the error is tagged with this container's identity.
    pub fn load_and_publish(&self, json: &str, options: &DecodeOptions) -> Result<(), ParseError> {
        let snapshot = parse::decode(json, &self.schema, options)
            .map_err(|e| e.with_container(self.registry.container_id()))?;
        self.registry.load(snapshot);
        Ok(())
    }

    /// Applies an incremental patch against the current snapshot and, on
    /// success, publishes the result. Failure leaves the current snapshot
    /// untouched, same as `load_and_publish`.
    pub fn apply_patch_and_publish(&self, patch_json: &str, options: &DecodeOptions) -> Result<(), ParseError> {
        let current = self.registry.current();
        let next = parse::apply_patch(&current, patch_json, &self.schema, options)
            .map_err(|e| e.with_container(self.registry.container_id()))?;
        self.registry.load(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::FlagDefinition;
    use crate::identity::FlagId;
    use crate::schema::FlagSchema;
    use crate::value::FlagValue;

    fn schema_with_bool_flag(name: &str) -> (CompiledSchema, FlagId) {
        let id = FlagId::new("acme", name).unwrap();
        let declared = FlagDefinition::new(id.clone(), FlagValue::Boolean(false), vec![], true, "v1").unwrap();
        let mut schema = CompiledSchema::new();
        schema.declare(id.clone(), FlagSchema::new(declared));
        (schema, id)
    }

    #[test]
    fn load_and_publish_updates_current_snapshot() {
        let (schema, id) = schema_with_bool_flag("dark_mode");
        let container = Container::new("acme", schema, Snapshot::empty(0), RegistryConfig::default());

        let json = format!(
            r#"{{"metadata":{{"version":null,"generatedAtEpochMillis":1}},"flags":[{{"key":"{}","active":true,"salt":"v1","defaultValue":{{"type":"BOOLEAN","value":true}},"rules":[]}}]}}"#,
            id.render()
        );
        container.load_and_publish(&json, &DecodeOptions::strict()).unwrap();
        assert_eq!(container.registry().current().flag_count(), 1);
    }

    #[test]
    fn failed_decode_leaves_snapshot_untouched() {
        let (schema, _id) = schema_with_bool_flag("dark_mode");
        let container = Container::new("acme", schema, Snapshot::empty(0), RegistryConfig::default());
        let err = container.load_and_publish("not json", &DecodeOptions::strict());
        assert!(err.is_err());
        assert_eq!(container.registry().current().flag_count(), 0);
    }
}
