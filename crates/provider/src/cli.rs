use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use ruler_core::{Backend, ProviderConfig};

/// Manage Loki/Mimir ruler rule namespaces from YAML definitions.
///
/// Connection settings come from `RULER_*` environment variables (and a
/// `.env` file); the flags below override them.
#[derive(Parser, Debug)]
#[command(name = "ruler-provider", version, about = "Manage Loki/Mimir ruler rule namespaces")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Ruler base URL
    #[arg(long, global = true)]
    pub address: Option<String>,

    /// Tenant sent as X-Scope-OrgID
    #[arg(long, global = true)]
    pub tenant_id: Option<String>,

    /// Expression dialect: loki or mimir
    #[arg(long, global = true)]
    pub backend: Option<Backend>,

    /// Store only the SHA-256 of canonical rules
    #[arg(long, global = true)]
    pub store_rules_sha256: bool,

    /// Deadline for each remote operation, in seconds
    #[arg(long, global = true, default_value = "30", env = "RULER_TIMEOUT_SECS")]
    pub timeout: u64,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the effective configuration with secrets redacted
    Config,

    /// Print the state value (canonical YAML or digest) of a definition
    Normalize {
        /// Definition file, `-` for stdin
        file: PathBuf,
    },

    /// Parse and validate a definition without contacting the ruler
    Validate {
        file: PathBuf,
        /// Require `level:metric:operations` recording rule names instead of `level:metric`
        #[arg(long)]
        strict_recording_rule_check: bool,
    },

    /// Compare two definitions group by group
    Diff { old: PathBuf, new: PathBuf },

    /// Create or update a namespace on the ruler from a definition
    Apply {
        #[arg(long)]
        namespace: String,
        file: PathBuf,
        /// Require `level:metric:operations` recording rule names
        #[arg(long)]
        strict_recording_rule_check: bool,
    },

    /// Print the namespace as stored on the ruler
    Read {
        #[arg(long)]
        namespace: String,
    },

    /// Delete every group of a namespace
    Delete {
        #[arg(long)]
        namespace: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl CliArgs {
    /// Apply flag overrides on top of environment configuration.
    pub fn apply_overrides(&self, config: &mut ProviderConfig) {
        if let Some(address) = &self.address {
            config.address = Some(address.clone());
        }
        if let Some(tenant) = &self.tenant_id {
            config.tenant_id = Some(tenant.clone());
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if self.store_rules_sha256 {
            config.store_rules_sha256 = true;
        }
    }
}
