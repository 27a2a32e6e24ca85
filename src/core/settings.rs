//! Initial `local_settings.php` payload written to the shared directory.
//!
//! The served application includes this file verbatim, so output must be
//! byte-for-byte stable for a given configuration.

use serde::Serialize;

use crate::config::DatabaseConfig;
use crate::utils::template::{render, TemplateVars};

const FLAT_URL_TEMPLATE: &str = r#"<?php
  $db_url = "{{db_type}}://{{db_username}}:{{db_password}}@{{db_host}}/{{db_name}}";
"#;

const NESTED_ARRAY_TEMPLATE: &str = r#"<?php
  $databases = array ('default' => array ('default' => array (
    'database' => '{{db_name}}',
    'username' => '{{db_username}}',
    'password' => '{{db_password}}',
    'host' => '{{db_host}}',
    'port' => '',
    'driver' => '{{db_type}}',
    'prefix' => '',
  )));
"#;

/// Application schema generation, which decides the settings file shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchemaVersion {
    #[serde(rename = "6")]
    V6,
    #[serde(rename = "7")]
    V7,
}

impl SchemaVersion {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "6" => Some(SchemaVersion::V6),
            "7" => Some(SchemaVersion::V7),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::V6 => "6",
            SchemaVersion::V7 => "7",
        }
    }

    pub fn template(&self) -> &'static dyn SettingsTemplate {
        match self {
            SchemaVersion::V6 => &FlatUrlTemplate,
            SchemaVersion::V7 => &NestedArrayTemplate,
        }
    }
}

/// Renders the database connection block for one schema version.
pub trait SettingsTemplate: Send + Sync {
    fn render(&self, database: &DatabaseConfig) -> String;
}

/// Single `$db_url` connection string.
pub struct FlatUrlTemplate;

/// Nested `$databases` array with explicit keys.
pub struct NestedArrayTemplate;

fn template_vars(database: &DatabaseConfig) -> [(&'static str, &str); 5] {
    [
        (TemplateVars::DB_TYPE, database.db_type.as_str()),
        (TemplateVars::DB_NAME, database.name.as_str()),
        (TemplateVars::DB_USERNAME, database.username.as_str()),
        (TemplateVars::DB_PASSWORD, database.password.as_str()),
        (TemplateVars::DB_HOST, database.host.as_str()),
    ]
}

impl SettingsTemplate for FlatUrlTemplate {
    fn render(&self, database: &DatabaseConfig) -> String {
        render(FLAT_URL_TEMPLATE, &template_vars(database))
    }
}

impl SettingsTemplate for NestedArrayTemplate {
    fn render(&self, database: &DatabaseConfig) -> String {
        render(NESTED_ARRAY_TEMPLATE, &template_vars(database))
    }
}
