use std::path::Path;

use config::Config as CConfig;
use serde::{Deserialize, Serialize};

use crate::{
    conf::{RemoteConfig, ResourcesConfig, TableConfig},
    core::SyncError::{self, Config as ConfigError},
    query::QueryState,
};

const ENV_PREFIX: &str = "RESTABLE";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
}

impl Config {
    pub fn from_str(toml_str: &str) -> Result<Config, SyncError> {
        Self::build(
            CConfig::builder()
                .add_source(config::File::from_str(toml_str, config::FileFormat::Toml)),
        )
    }

    /// Load a TOML file, then apply `RESTABLE_SECTION__KEY` environment overrides.
    pub fn from_file(path: &Path) -> Result<Config, SyncError> {
        Self::build(
            CConfig::builder()
                .add_source(config::File::from(path).format(config::FileFormat::Toml))
                .add_source(
                    config::Environment::with_prefix(ENV_PREFIX)
                        .prefix_separator("_")
                        .separator("__"),
                ),
        )
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Config, SyncError> {
        let config = builder
            .build()
            .map_err(|e| ConfigError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigError(e.to_string()))?;
        if config.table.page_size == 0 || config.table.max_page_size == 0 {
            return Err(ConfigError("page sizes must be at least 1".into()));
        }
        Ok(config)
    }

    /// Endpoint path of a resource, relative to the remote base URL.
    pub fn path_for(&self, resource: &str) -> String {
        self.resources
            .get(resource)
            .and_then(|r| r.path.clone())
            .unwrap_or_else(|| resource.to_string())
    }

    /// Initial query snapshot for a resource table.
    pub fn query_for(&self, resource: &str) -> QueryState {
        let overrides = self.resources.get(resource);
        let page_size = overrides
            .and_then(|r| r.page_size)
            .unwrap_or(self.table.page_size);
        let state = QueryState::new(page_size).with_max_page_size(self.table.max_page_size);
        match overrides.and_then(|r| r.sort_field.as_deref()) {
            Some(field) => state.with_sort(field, overrides.map(|r| r.sort_direction).unwrap_or_default()),
            None => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::ResourceConfig;
    use crate::query::SortDirection;
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn load_correct_toml() {
        let toml = r#"
        [remote]
        base_url = "http://127.0.0.1:3000/api"
        timeout = "5s"

        [table]
        page_size = 20

        [resources.team]
        path = "team-members"
        sort_field = "name"
        sort_direction = "desc"
        "#;
        let conf = Config::from_str(toml);
        assert_eq!(
            conf,
            Ok(Config {
                remote: RemoteConfig {
                    base_url: String::from("http://127.0.0.1:3000/api"),
                    timeout: Duration::from_secs(5),
                },
                table: TableConfig {
                    page_size: 20,
                    max_page_size: 100,
                },
                resources: HashMap::from([(
                    "team".to_string(),
                    ResourceConfig {
                        path: Some("team-members".to_string()),
                        page_size: None,
                        sort_field: Some("name".to_string()),
                        sort_direction: SortDirection::Desc,
                    }
                )]),
            })
        );
    }

    #[test]
    fn empty_toml_uses_defaults() {
        assert_eq!(Config::from_str(""), Ok(Config::default()));
    }

    #[test]
    fn unknown_field_rejected() {
        let err = Config::from_str("[remote]\nbase = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError(_)));
    }

    #[test]
    fn zero_page_size_rejected() {
        let err = Config::from_str("[table]\npage_size = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError(_)));
    }

    #[test]
    fn query_for_applies_overrides() {
        let conf = Config::from_str(
            r#"
            [table]
            page_size = 10
            max_page_size = 50

            [resources.clients]
            page_size = 500

            [resources.users]
            sort_field = "email"
            "#,
        )
        .unwrap();

        assert_eq!(conf.query_for("clients").page_size(), 50);
        let users = conf.query_for("users");
        assert_eq!(users.sort_field(), Some("email"));
        assert_eq!(users.sort_direction(), SortDirection::Asc);
        assert_eq!(conf.query_for("faqs"), QueryState::new(10));
        assert_eq!(conf.path_for("faqs"), "faqs");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[remote]\nbase_url = \"http://example.test/api\"").unwrap();
        let conf = Config::from_file(file.path()).unwrap();
        assert_eq!(conf.remote.base_url, "http://example.test/api");
        assert_eq!(conf.table, TableConfig::default());
    }
}
