mod cli;

use std::future::Future;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;

use ruler_core::ProviderConfig;
use ruler_provider::{configure, ResourceData, ResourceSettings, RuleNamespaceResource};
use ruler_rules::{compare, parse, parse_groups, ChangeState};

use crate::cli::{CliArgs, Command, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    ruler_core::config::load_dotenv();
    let args = CliArgs::parse();

    let mut config = ProviderConfig::from_env().context("failed to load configuration")?;
    args.apply_overrides(&mut config);
    config.validate().context("invalid configuration")?;

    let timeout = Duration::from_secs(args.timeout);
    let settings = ResourceSettings::from_config(&config);

    match &args.command {
        Command::Config => {
            print_json(&config.redacted_summary())?;
        }

        Command::Normalize { file } => {
            let text = read_input(file)?;
            RuleNamespaceResource::validate_config(&text)
                .with_context(|| format!("{} is not a valid namespace definition", file.display()))?;
            let value = settings.state_value(&text);
            match args.output {
                OutputFormat::Text => print_state(&value),
                OutputFormat::Json => print_json(&json!({ "config_yaml": value }))?,
            }
        }

        Command::Validate {
            file,
            strict_recording_rule_check,
        } => {
            let text = read_input(file)?;
            let namespace = parse(&text)
                .with_context(|| format!("{} is not a valid namespace definition", file.display()))?;
            ruler_provider::reconcile::check(&namespace, &settings.validator, *strict_recording_rule_check)?;
            match args.output {
                OutputFormat::Text => println!(
                    "{}: {} group(s), {} rule(s) valid for {}",
                    file.display(),
                    namespace.groups.len(),
                    namespace.rule_count(),
                    config.backend
                ),
                OutputFormat::Json => print_json(&json!({
                    "valid": true,
                    "groups": namespace.groups.len(),
                    "rules": namespace.rule_count(),
                }))?,
            }
        }

        Command::Diff { old, new } => {
            let old_text = read_input(old)?;
            let new_text = read_input(new)?;
            let old_ns = parse_groups(&old_text)
                .with_context(|| format!("{} is not a valid namespace definition", old.display()))?;
            let new_ns = parse_groups(&new_text)
                .with_context(|| format!("{} is not a valid namespace definition", new.display()))?;

            let change = compare(&old_ns, &new_ns);
            let suppressed = settings.diff_suppress(&old_text, &new_text);
            match args.output {
                OutputFormat::Text => {
                    println!("namespace: {}", change.state);
                    for group in change.groups.iter().filter(|g| g.state != ChangeState::Unchanged) {
                        println!("  {:<10} {}", group.state, group.name);
                    }
                }
                OutputFormat::Json => print_json(&json!({
                    "change": change,
                    "suppressed": suppressed,
                }))?,
            }
        }

        Command::Apply {
            namespace,
            file,
            strict_recording_rule_check,
        } => {
            let resource = configure(&config).context("failed to configure ruler client")?;
            let mut data = ResourceData::new(namespace.clone(), read_input(file)?);
            data.strict_recording_rule_check = *strict_recording_rule_check;

            let report = with_deadline(timeout, resource.create(&mut data))
                .await?
                .with_context(|| format!("failed to apply namespace '{}'", namespace))?;
            match args.output {
                OutputFormat::Text => {
                    println!(
                        "namespace '{}': applied {} group(s), deleted {}",
                        namespace,
                        report.applied.len(),
                        report.deleted.len()
                    );
                    for name in &report.deleted {
                        println!("  deleted {}", name);
                    }
                }
                OutputFormat::Json => print_json(&json!({ "report": report, "resource": data }))?,
            }
        }

        Command::Read { namespace } => {
            let resource = configure(&config).context("failed to configure ruler client")?;
            let data = read_resource(&resource, namespace, timeout).await?;
            if data.id.is_none() {
                bail!("namespace '{}' not found on the ruler", namespace);
            }
            match args.output {
                OutputFormat::Text => print_state(&data.config_yaml),
                OutputFormat::Json => print_json(&json!({ "resource": data }))?,
            }
        }

        Command::Delete { namespace } => {
            let resource = configure(&config).context("failed to configure ruler client")?;
            let mut data = ResourceData::new(namespace.clone(), String::new());
            let removed = with_deadline(timeout, resource.delete(&mut data))
                .await?
                .with_context(|| format!("failed to delete namespace '{}'", namespace))?;
            match args.output {
                OutputFormat::Text => println!("namespace '{}': deleted {} group(s)", namespace, removed),
                OutputFormat::Json => print_json(&json!({ "namespace": namespace, "deleted": removed }))?,
            }
        }
    }

    Ok(())
}

async fn read_resource(
    resource: &RuleNamespaceResource,
    namespace: &str,
    timeout: Duration,
) -> Result<ResourceData> {
    let mut data = ResourceData::new(namespace, String::new());
    data.id = Some(ruler_provider::resource_id(namespace));
    with_deadline(timeout, resource.read(&mut data))
        .await?
        .with_context(|| format!("failed to read namespace '{}'", namespace))?;
    Ok(data)
}

/// Run `operation` under `deadline`. On expiry the operation is dropped and
/// the ruler may hold a partial update.
async fn with_deadline<T>(deadline: Duration, operation: impl Future<Output = T>) -> Result<T> {
    tokio::time::timeout(deadline, operation)
        .await
        .with_context(|| format!("operation timed out after {}s; remote state may be partially updated", deadline.as_secs()))
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Canonical YAML carries its own trailing newline; a digest does not.
fn print_state(value: &str) {
    if value.ends_with('\n') {
        print!("{}", value);
    } else {
        println!("{}", value);
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_input_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, "groups: []\n").unwrap();

        assert_eq!(read_input(&path).unwrap(), "groups: []\n");
    }

    #[test]
    fn read_input_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let err = read_input(&path).unwrap_err();
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[tokio::test]
    async fn deadline_expiry_is_an_error() {
        let result = with_deadline(Duration::from_millis(10), tokio::time::sleep(Duration::from_secs(5))).await;
        assert!(result.unwrap_err().to_string().contains("timed out"));
    }
}
