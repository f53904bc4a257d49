//! Resource lifecycle against the in-memory ruler.

use std::sync::Arc;
use std::time::Duration;

use ruler_client::{Call, ClientError, MemoryRuler, NamespaceGroups, Operation, RulerClient};
use ruler_core::{Backend, ProviderConfig, StateFormat};
use ruler_provider::{resource_id, with_client, ReconcileError, ResourceData, RuleNamespaceResource, Step};
use ruler_rules::{canonicalize, parse, AlertRule, RuleGroup};

const NAMESPACE: &str = "grafana-agent-traces";

const RULES: &str = r#"
namespace: grafana-agent-traces
groups:
  - name: grafana-agent
    rules:
      - alert: LogErrorMessages
        expr: '(sum(rate({deployment="grafana-agent-traces"} |= "level=error"[1m])) > 0.1)'
        for: 3m
        labels:
          team: sre
          route: team=sre
      - alert: LogWarnMessages
        expr: '(sum(rate({deployment="grafana-agent-traces"} |= "level=warn"[1m])) > 0.1)'
        for: 3m
        labels:
          team: sre
          route: team=sre
      - alert: LogInfoMessages
        expr: '(sum(rate({deployment="grafana-agent-traces"} |= "level=info"[1m])) > 0.1)'
        for: 3m
        labels:
          team: sre
          route: team=sre
"#;

const RULES_UPDATED: &str = r#"
namespace: grafana-agent-traces
groups:
  - name: grafana-agent
    rules:
      - alert: LogWarnMessages
        expr: |
          (sum(rate({deployment="grafana-agent-traces"} |= "level=warn"[1m])) > 0.1)
        for: 5m
        labels:
          team: sre
"#;

fn group(name: &str) -> RuleGroup {
    RuleGroup::new(
        name,
        vec![AlertRule::new(format!("{}Down", name), format!("count_over_time({{app=\"{}\"}}[5m]) == 0", name)).into()],
    )
}

fn groups_yaml(names: &[&str]) -> String {
    let mut text = String::from("groups:\n");
    for name in names {
        text.push_str(&format!(
            "  - name: {name}\n    rules:\n      - alert: {name}Down\n        expr: 'count_over_time({{app=\"{name}\"}}[5m]) == 0'\n"
        ));
    }
    text
}

fn setup(state_format: StateFormat) -> (Arc<MemoryRuler>, RuleNamespaceResource) {
    let ruler = Arc::new(MemoryRuler::new());
    let config = ProviderConfig {
        store_rules_sha256: state_format.is_hashed(),
        backend: Backend::Loki,
        ..ProviderConfig::default()
    };
    let resource = with_client(ruler.clone(), &config);
    (ruler, resource)
}

fn deletes(calls: &[Call]) -> Vec<&str> {
    calls
        .iter()
        .filter_map(|c| match c {
            Call::Delete { group, .. } => Some(group.as_str()),
            _ => None,
        })
        .collect()
}

fn creates(calls: &[Call]) -> Vec<&str> {
    calls
        .iter()
        .filter_map(|c| match c {
            Call::Create { group, .. } => Some(group.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn grafana_agent_create_then_update() {
    for format in [StateFormat::Yaml, StateFormat::Sha256] {
        let (ruler, resource) = setup(format);

        let mut data = ResourceData::new(NAMESPACE, RULES);
        resource.create(&mut data).await.unwrap();

        assert_eq!(data.id.as_deref(), Some(resource_id(NAMESPACE).as_str()));
        let created_state = data.config_yaml.clone();
        assert_eq!(created_state, resource.state_value(RULES), "{:?}", format);
        match format {
            StateFormat::Yaml => {
                let stored = parse(&created_state).unwrap();
                let names: Vec<_> = stored.groups[0].rules.iter().map(|r| r.name()).collect();
                assert_eq!(names, vec!["LogErrorMessages", "LogInfoMessages", "LogWarnMessages"]);
                assert!(created_state.starts_with("groups:\n    - name: grafana-agent\n      rules:\n        - alert: LogErrorMessages\n"));
            }
            StateFormat::Sha256 => {
                assert_eq!(created_state.len(), 64);
                assert!(created_state.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            }
        }

        // Same rules, different formatting and order: no change.
        assert!(resource.diff_suppress(&created_state, RULES));
        assert!(!resource.diff_suppress(&created_state, RULES_UPDATED));

        ruler.reset_calls().await;
        data.config_yaml = RULES_UPDATED.to_string();
        resource.update(&mut data).await.unwrap();

        assert_ne!(data.config_yaml, created_state);
        assert_eq!(data.config_yaml, resource.state_value(RULES_UPDATED));
        let remote = ruler.groups(NAMESPACE).await;
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].rules.len(), 1);
        assert_eq!(remote[0].rules[0].name(), "LogWarnMessages");
        assert!(remote[0].rules[0].labels().get("route").is_none());

        let calls = ruler.calls().await;
        assert_eq!(creates(&calls), vec!["grafana-agent"]);
        assert!(deletes(&calls).is_empty());
    }
}

#[tokio::test]
async fn update_deletes_exactly_the_dropped_group() {
    let (ruler, resource) = setup(StateFormat::Yaml);
    ruler
        .seed(NAMESPACE, vec![group("A"), group("B"), group("C")])
        .await;

    let mut data = ResourceData::new(NAMESPACE, groups_yaml(&["A", "C"]));
    data.id = Some(resource_id(NAMESPACE));
    let report = resource.update(&mut data).await.unwrap();

    assert_eq!(report.applied, vec!["A", "C"]);
    assert_eq!(report.deleted, vec!["B"]);

    let calls = ruler.calls().await;
    assert_eq!(deletes(&calls), vec!["B"]);
    assert_eq!(creates(&calls), vec!["A", "C"]);

    let mut names: Vec<_> = ruler.groups(NAMESPACE).await.into_iter().map(|g| g.name).collect();
    names.sort();
    assert_eq!(names, vec!["A", "C"]);
    assert_eq!(data.config_yaml, canonicalize(&parse(&groups_yaml(&["C", "A"])).unwrap()));
}

#[tokio::test]
async fn invalid_rules_make_no_remote_calls() {
    let (ruler, resource) = setup(StateFormat::Yaml);
    let text = "groups:\n  - name: g\n    rules:\n      - alert: NoSelector\n        expr: sum(rate(errors_total[5m]))\n      - alert: Unbalanced\n        expr: 'count_over_time({app=\"a\"}[5m]'\n";

    let mut data = ResourceData::new(NAMESPACE, text);
    match resource.create(&mut data).await {
        Err(ReconcileError::Validation(e)) => assert_eq!(e.messages.len(), 2, "{:?}", e.messages),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(ruler.calls().await.is_empty());
    assert!(data.id.is_none());
}

#[tokio::test]
async fn unparseable_config_is_a_parse_error() {
    let (ruler, resource) = setup(StateFormat::Yaml);
    let mut data = ResourceData::new(NAMESPACE, format!("{}---\n{}", RULES, RULES));
    assert!(matches!(
        resource.create(&mut data).await,
        Err(ReconcileError::Parse(ruler_rules::ParseError::MultipleNamespaces))
    ));
    assert!(ruler.calls().await.is_empty());
}

#[tokio::test]
async fn recording_rule_convention_is_checked_by_default() {
    let ruler = Arc::new(MemoryRuler::new());
    let resource = with_client(ruler.clone(), &ProviderConfig::default());
    let text = "groups:\n  - name: rec\n    rules:\n      - record: log_lines\n        expr: 'sum by (job) (rate({job=~\".+\"}[1m]))'\n";

    let mut data = ResourceData::new(NAMESPACE, text);
    assert!(!data.strict_recording_rule_check);
    match resource.create(&mut data).await {
        Err(ReconcileError::Validation(e)) => {
            assert!(e.to_string().contains("log_lines"));
            assert!(e.to_string().contains("1 recording rule(s)"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(ruler.calls().await.is_empty());
    assert!(data.id.is_none());
}

#[tokio::test]
async fn strict_recording_check_requires_operations() {
    let (ruler, resource) = setup(StateFormat::Yaml);
    let text = "groups:\n  - name: rec\n    rules:\n      - record: job:log_lines\n        expr: 'sum by (job) (rate({job=~\".+\"}[1m]))'\n";

    let mut data = ResourceData::new(NAMESPACE, text);
    data.strict_recording_rule_check = true;
    match resource.create(&mut data).await {
        Err(ReconcileError::Validation(e)) => assert!(e.to_string().contains("job:log_lines")),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(ruler.calls().await.is_empty());

    data.strict_recording_rule_check = false;
    resource.create(&mut data).await.unwrap();
    assert_eq!(creates(&ruler.calls().await), vec!["rec"]);

    data.strict_recording_rule_check = true;
    data.config_yaml = text.replace("job:log_lines", "job:log_lines:rate1m");
    resource.update(&mut data).await.unwrap();
}

#[test]
fn strict_recording_check_defaults_to_false_in_state() {
    let data: ResourceData = serde_json::from_str(r#"{"namespace":"n","config_yaml":""}"#).unwrap();
    assert!(!data.strict_recording_rule_check);
}

#[tokio::test]
async fn create_failure_keeps_earlier_groups() {
    let (ruler, resource) = setup(StateFormat::Yaml);
    ruler.fail_on(Operation::Create, "B").await;

    let mut data = ResourceData::new(NAMESPACE, groups_yaml(&["A", "B", "C"]));
    match resource.create(&mut data).await {
        Err(ReconcileError::Remote {
            step,
            group,
            completed,
            source,
            ..
        }) => {
            assert_eq!(step, Step::Create);
            assert_eq!(group.as_deref(), Some("B"));
            assert_eq!(completed, 1);
            assert!(matches!(source, ClientError::Status { status: 500, .. }));
        }
        other => panic!("expected remote error, got {:?}", other),
    }
    let names: Vec<_> = ruler.groups(NAMESPACE).await.into_iter().map(|g| g.name).collect();
    assert_eq!(names, vec!["A"]);

    // Re-running after the fault clears converges.
    ruler.clear_failures().await;
    resource.create(&mut data).await.unwrap();
    assert_eq!(ruler.groups(NAMESPACE).await.len(), 3);
}

#[tokio::test]
async fn read_of_missing_namespace_drops_resource() {
    let (_ruler, resource) = setup(StateFormat::Yaml);
    let mut data = ResourceData::new(NAMESPACE, "groups: []\n");
    data.id = Some(resource_id(NAMESPACE));
    resource.read(&mut data).await.unwrap();
    assert!(data.id.is_none());
}

#[tokio::test]
async fn read_reports_list_failures() {
    let (ruler, resource) = setup(StateFormat::Yaml);
    ruler.fail_on(Operation::List, NAMESPACE).await;
    let mut data = ResourceData::new(NAMESPACE, "");
    let err = resource.read(&mut data).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Remote { step: Step::List, .. }));
}

#[tokio::test]
async fn delete_removes_every_group() {
    let (ruler, resource) = setup(StateFormat::Yaml);
    ruler.seed(NAMESPACE, vec![group("A"), group("B")]).await;

    let mut data = ResourceData::new(NAMESPACE, "");
    data.id = Some(resource_id(NAMESPACE));
    assert_eq!(resource.delete(&mut data).await.unwrap(), 2);
    assert!(data.id.is_none());
    assert!(ruler.list_rules(NAMESPACE).await.unwrap_err().is_not_found());

    // Nothing left to delete is not an error.
    assert_eq!(resource.delete(&mut data).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_failure_reports_progress() {
    let (ruler, resource) = setup(StateFormat::Yaml);
    ruler.seed(NAMESPACE, vec![group("A"), group("B"), group("C")]).await;
    ruler.fail_on(Operation::Delete, "B").await;

    let mut data = ResourceData::new(NAMESPACE, "");
    data.id = Some(resource_id(NAMESPACE));
    let err = resource.delete(&mut data).await.unwrap_err();
    match &err {
        ReconcileError::Remote { step, completed, group, .. } => {
            assert_eq!(*step, Step::Delete);
            assert_eq!(*completed, 1);
            assert_eq!(group.as_deref(), Some("B"));
        }
        other => panic!("expected remote error, got {:?}", other),
    }
    assert!(err.to_string().contains("after 1 successful call(s)"));
    assert!(data.id.is_some());
    assert_eq!(ruler.groups(NAMESPACE).await.len(), 2);
}

#[tokio::test]
async fn state_value_degrades_instead_of_failing() {
    let (_ruler, resource) = setup(StateFormat::Yaml);

    assert_eq!(resource.state_value("groups: ["), "");
    assert_eq!(resource.state_value(""), "");

    // Fails lint for Loki (no stream selector): kept as written.
    let text = "groups:\n  - name: g\n    rules:\n      - alert: A\n        expr: sum(x)   >  1\n";
    let value = parse(&resource.state_value(text)).unwrap();
    assert_eq!(value.groups[0].rules[0].expr(), "sum(x)   >  1");

    // Passes lint: whitespace normalized.
    let text = "groups:\n  - name: g\n    rules:\n      - alert: A\n        expr: 'count_over_time({app=\"a\"}[5m])   >  1'\n";
    let value = parse(&resource.state_value(text)).unwrap();
    assert_eq!(value.groups[0].rules[0].expr(), "count_over_time({app=\"a\"}[5m]) > 1");
}

#[tokio::test]
async fn diff_suppression_ignores_formatting_noise() {
    let (_ruler, resource) = setup(StateFormat::Yaml);
    let stored = resource.state_value(&groups_yaml(&["A", "B"]));

    assert!(resource.diff_suppress(&stored, &groups_yaml(&["B", "A"])));
    assert!(!resource.diff_suppress(&stored, &groups_yaml(&["A"])));
    assert!(!resource.diff_suppress(&stored, "groups: ["));

    let (_ruler, hashed) = setup(StateFormat::Sha256);
    let digest = hashed.state_value(&groups_yaml(&["A", "B"]));
    assert!(hashed.diff_suppress(&digest, &groups_yaml(&["B", "A"])));
    assert!(!hashed.diff_suppress(&digest, &groups_yaml(&["A"])));
}

#[tokio::test]
async fn degraded_state_never_suppresses_a_diff() {
    let (_ruler, resource) = setup(StateFormat::Yaml);
    assert_eq!(resource.state_value("groups: ["), "");
    assert!(!resource.diff_suppress("", "groups: ["));
    assert!(!resource.diff_suppress("", "namespace: [unclosed"));

    let (_ruler, hashed) = setup(StateFormat::Sha256);
    assert!(!hashed.diff_suppress("", "groups: ["));
}

#[test]
fn validate_config_only_parses() {
    assert!(RuleNamespaceResource::validate_config(RULES).is_ok());
    assert!(RuleNamespaceResource::validate_config("").is_err());
    assert!(RuleNamespaceResource::validate_config("groups:\n  - name: g\n    rules:\n      - alert: A\n        expr: no selector\n").is_ok());
}

/// Delays every create so a deadline can land between two of them.
struct SlowRuler {
    inner: Arc<MemoryRuler>,
    delay: Duration,
}

#[async_trait::async_trait]
impl RulerClient for SlowRuler {
    async fn create_rule_group(&self, namespace: &str, group: &RuleGroup) -> Result<(), ClientError> {
        tokio::time::sleep(self.delay).await;
        self.inner.create_rule_group(namespace, group).await
    }

    async fn delete_rule_group(&self, namespace: &str, group: &str) -> Result<(), ClientError> {
        self.inner.delete_rule_group(namespace, group).await
    }

    async fn list_rules(&self, namespace: &str) -> Result<NamespaceGroups, ClientError> {
        self.inner.list_rules(namespace).await
    }

    fn client_name(&self) -> &str {
        "slow"
    }
}

#[tokio::test]
async fn deadline_abandons_remaining_steps() {
    let ruler = Arc::new(MemoryRuler::new());
    let slow = Arc::new(SlowRuler {
        inner: ruler.clone(),
        delay: Duration::from_millis(200),
    });
    let resource = with_client(slow, &ProviderConfig::default());

    let mut data = ResourceData::new(NAMESPACE, groups_yaml(&["A", "B", "C"]));
    let outcome = tokio::time::timeout(Duration::from_millis(300), resource.create(&mut data)).await;
    assert!(outcome.is_err());

    // Give a stray call time to land if cancellation were broken.
    tokio::time::sleep(Duration::from_millis(400)).await;
    let names: Vec<_> = ruler.groups(NAMESPACE).await.into_iter().map(|g| g.name).collect();
    assert_eq!(names, vec!["A"]);
    assert!(data.id.is_none());
}
