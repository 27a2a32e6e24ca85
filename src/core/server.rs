use serde::{Deserialize, Serialize};

use crate::defaults;

/// SSH coordinates of a deploy target host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Server {
    pub host: String,
    pub user: String,
    #[serde(default = "defaults::default_ssh_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
}

impl Server {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            port: defaults::default_ssh_port(),
            identity_file: None,
        }
    }
}
