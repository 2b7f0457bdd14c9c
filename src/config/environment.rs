//! Deployment environments
//!
//! Maps a named environment (development, staging, production) to the
//! concrete table name, region and provisioned capacity used to reach the
//! coffee roast table. Resolution is a pure lookup with no I/O.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Settings;
use crate::error::{Result, StoreError};

/// Base name shared by every environment's table
pub const DEFAULT_TABLE_BASE_NAME: &str = "coffee-bean-data";

/// Region used when neither the caller nor the environment specifies one
pub const DEFAULT_REGION: &str = "ap-southeast-1";

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[value(alias = "dev")]
    Development,
    #[value(aliases = ["stage", "uat"])]
    Staging,
    #[value(alias = "prod")]
    Production,
}

impl Environment {
    /// Every known environment, in promotion order
    pub const ALL: [Environment; 3] = [
        Environment::Development,
        Environment::Staging,
        Environment::Production,
    ];

    /// Lowercase name used in table names and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    fn defaults(&self) -> EnvironmentDefaults {
        match self {
            Environment::Development => EnvironmentDefaults {
                capacity: CapacityProfile {
                    read_capacity_units: 1,
                    write_capacity_units: 1,
                },
                retain_on_delete: false,
                point_in_time_recovery: false,
            },
            Environment::Staging => EnvironmentDefaults {
                capacity: CapacityProfile {
                    read_capacity_units: 5,
                    write_capacity_units: 5,
                },
                retain_on_delete: true,
                point_in_time_recovery: true,
            },
            Environment::Production => EnvironmentDefaults {
                capacity: CapacityProfile {
                    read_capacity_units: 10,
                    write_capacity_units: 10,
                },
                retain_on_delete: true,
                point_in_time_recovery: true,
            },
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

impl std::str::FromStr for Environment {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" | "uat" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(StoreError::InvalidEnvironment(s.to_string())),
        }
    }
}

/// Provisioned throughput for a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityProfile {
    pub read_capacity_units: u32,
    pub write_capacity_units: u32,
}

impl CapacityProfile {
    /// Both units must be positive.
    pub fn new(read_capacity_units: u32, write_capacity_units: u32) -> Result<Self> {
        if read_capacity_units == 0 || write_capacity_units == 0 {
            return Err(StoreError::InvalidInput(format!(
                "capacity units must be positive (read={}, write={})",
                read_capacity_units, write_capacity_units
            )));
        }
        Ok(Self {
            read_capacity_units,
            write_capacity_units,
        })
    }
}

struct EnvironmentDefaults {
    capacity: CapacityProfile,
    retain_on_delete: bool,
    point_in_time_recovery: bool,
}

/// Connection parameters for one environment's table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentProfile {
    pub environment: Environment,
    pub table_name: String,
    pub region: String,
    pub capacity: CapacityProfile,
    /// Whether the table is kept when its stack is torn down
    pub retain_on_delete: bool,
    pub point_in_time_recovery: bool,
}

/// Resolves environment names to [`EnvironmentProfile`]s.
///
/// Table names follow `<base-name>-<environment>` unless an explicit table
/// name override is configured. Capacity overrides replace the built-in
/// per-environment units one side at a time.
#[derive(Debug, Clone)]
pub struct EnvironmentResolver {
    base_name: String,
    region: String,
    table_name_override: Option<String>,
    read_capacity_override: Option<u32>,
    write_capacity_override: Option<u32>,
}

impl EnvironmentResolver {
    pub fn new(base_name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            region: region.into(),
            table_name_override: None,
            read_capacity_override: None,
            write_capacity_override: None,
        }
    }

    /// Build a resolver honouring the table and capacity overrides in settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let resolver = Self::new(&settings.table_base_name, &settings.aws_region)
            .with_capacity_overrides(settings.read_capacity_units, settings.write_capacity_units)?;

        Ok(match &settings.table_name {
            Some(name) => resolver.with_table_name(name),
            None => resolver,
        })
    }

    /// Use a fixed table name regardless of environment
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name_override = Some(table_name.into());
        self
    }

    /// Override read and/or write capacity units; zero is rejected
    pub fn with_capacity_overrides(mut self, read: Option<u32>, write: Option<u32>) -> Result<Self> {
        if read == Some(0) || write == Some(0) {
            return Err(StoreError::InvalidInput(
                "capacity overrides must be positive".to_string(),
            ));
        }
        self.read_capacity_override = read;
        self.write_capacity_override = write;
        Ok(self)
    }

    /// Resolve an environment by name.
    ///
    /// Unknown names fail with [`StoreError::InvalidEnvironment`].
    pub fn resolve(&self, name: &str) -> Result<EnvironmentProfile> {
        let environment: Environment = name.parse()?;
        Ok(self.profile(environment))
    }

    /// Build the profile for a known environment
    pub fn profile(&self, environment: Environment) -> EnvironmentProfile {
        let defaults = environment.defaults();

        let table_name = self
            .table_name_override
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.base_name, environment));

        let capacity = CapacityProfile {
            read_capacity_units: self
                .read_capacity_override
                .unwrap_or(defaults.capacity.read_capacity_units),
            write_capacity_units: self
                .write_capacity_override
                .unwrap_or(defaults.capacity.write_capacity_units),
        };

        EnvironmentProfile {
            environment,
            table_name,
            region: self.region.clone(),
            capacity,
            retain_on_delete: defaults.retain_on_delete,
            point_in_time_recovery: defaults.point_in_time_recovery,
        }
    }
}

impl Default for EnvironmentResolver {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_BASE_NAME, DEFAULT_REGION)
    }
}
