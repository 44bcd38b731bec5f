use popeye::error::FetchError;
use popeye::{CancelToken, Config, Error, Fetcher, Kind, Level, Object, SanitizerKind, run};
use serde_json::{Value, json};
use std::collections::HashSet;

/// Integration tests for complete sanitization runs against an in-memory cluster

struct MemoryFetcher {
    objects: Vec<Object>,
    failing: HashSet<Kind>,
}

impl MemoryFetcher {
    fn new(objects: Vec<Object>) -> Self {
        Self {
            objects,
            failing: HashSet::new(),
        }
    }

    fn failing(mut self, kind: Kind) -> Self {
        self.failing.insert(kind);
        self
    }
}

impl Fetcher for MemoryFetcher {
    async fn list(&self, kind: Kind) -> Result<Vec<Object>, FetchError> {
        if self.failing.contains(&kind) {
            return Err(FetchError::Client(format!("{} is forbidden", kind)));
        }
        Ok(self
            .objects
            .iter()
            .filter(|o| o.kind() == kind)
            .cloned()
            .collect())
    }

    async fn get(&self, kind: Kind, namespace: &str, name: &str) -> Result<Option<Object>, FetchError> {
        Ok(self
            .objects
            .iter()
            .find(|o| {
                o.kind() == kind
                    && o.meta().name.as_deref() == Some(name)
                    && o.meta().namespace.as_deref().unwrap_or_default() == namespace
            })
            .cloned())
    }
}

fn object<T: serde::de::DeserializeOwned>(value: Value, wrap: fn(T) -> Object) -> Object {
    wrap(serde_json::from_value(value).unwrap())
}

fn cluster() -> Vec<Object> {
    vec![
        object(
            json!({
                "metadata": {"name": "n1"},
                "status": {"conditions": [{"type": "Ready", "status": "True"}]}
            }),
            Object::Node,
        ),
        object(
            json!({"metadata": {"name": "default"}, "status": {"phase": "Active"}}),
            Object::Namespace,
        ),
        object(
            json!({
                "metadata": {"name": "p1", "namespace": "default", "labels": {"app": "fred"}},
                "spec": {
                    "serviceAccountName": "fred",
                    "volumes": [{"name": "cfg", "configMap": {"name": "fred-config"}}],
                    "containers": [{
                        "name": "c1",
                        "image": "fred:1.0",
                        "ports": [{"name": "http", "containerPort": 80}],
                        "livenessProbe": {"tcpSocket": {"port": 80}},
                        "readinessProbe": {"tcpSocket": {"port": 80}},
                        "resources": {"requests": {"cpu": "100m"}, "limits": {"cpu": "200m"}}
                    }]
                },
                "status": {
                    "phase": "Running",
                    "containerStatuses": [
                        {"name": "c1", "ready": true, "restartCount": 0, "image": "fred:1.0", "imageID": ""}
                    ]
                }
            }),
            Object::Pod,
        ),
        object(
            json!({
                "metadata": {"name": "s1", "namespace": "default"},
                "spec": {
                    "type": "ClusterIP",
                    "selector": {"app": "fred"},
                    "ports": [{"name": "web", "port": 80, "targetPort": "http", "protocol": "TCP"}]
                }
            }),
            Object::Service,
        ),
        object(
            json!({
                "metadata": {"name": "s1", "namespace": "default"},
                "subsets": [{"addresses": [{"ip": "10.0.0.1"}]}]
            }),
            Object::Endpoints,
        ),
        object(
            json!({"metadata": {"name": "fred-config", "namespace": "default"}}),
            Object::ConfigMap,
        ),
        object(
            json!({"metadata": {"name": "stale-config", "namespace": "default"}}),
            Object::ConfigMap,
        ),
        object(
            json!({"metadata": {"name": "fred", "namespace": "default"}}),
            Object::ServiceAccount,
        ),
    ]
}

#[tokio::test]
async fn test_full_run() {
    let fetcher = MemoryFetcher::new(cluster());
    let report = run(&fetcher, Config::default(), CancelToken::new()).await.unwrap();

    let names: Vec<&str> = report.sections().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        SanitizerKind::ALL.iter().map(|k| k.as_str()).collect::<Vec<_>>()
    );
    assert!(report.errors().is_empty());
    assert!(!report.is_cancelled());

    let section = |name: &str| {
        report
            .sections()
            .iter()
            .find(|s| s.name == name)
            .unwrap()
    };

    let services = section("service");
    assert_eq!(services.tally.ok, 1);
    assert_eq!(services.tally.score, 100);
    assert_eq!(services.outcome.get("default/s1").unwrap().len(), 0);

    let pods = section("pod");
    assert_eq!(pods.outcome.max_severity("default/p1"), Level::Ok);

    let configmaps = section("configmap");
    assert_eq!(configmaps.tally.ok, 1);
    assert_eq!(configmaps.tally.info, 1);
    assert_eq!(configmaps.outcome.max_severity("default/stale-config"), Level::Info);

    let json: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["popeye"]["sanitizers"].as_array().unwrap().len(), 7);
    assert_eq!(json["popeye"]["grade"], report.grade());
}

#[tokio::test]
async fn test_invalid_config_aborts() {
    let fetcher = MemoryFetcher::new(cluster());
    let config = Config::new().exclude("pod", "rx:([");
    let err = run(&fetcher, config, CancelToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn test_fetch_failure_degrades() {
    let fetcher = MemoryFetcher::new(cluster()).failing(Kind::Secret);
    let report = run(&fetcher, Config::default(), CancelToken::new()).await.unwrap();

    assert_eq!(report.errors().len(), 1);
    assert!(report.errors()[0].message.contains("secret is forbidden"));

    let names: Vec<&str> = report.sections().iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&"node"));
    assert!(names.contains(&"pod"));
    assert!(!names.contains(&"secret"));
    assert!(!names.contains(&"serviceaccount"));
}

#[tokio::test]
async fn test_cancelled_run_returns_partial_report() {
    let fetcher = MemoryFetcher::new(cluster());
    let cancel = CancelToken::new();
    cancel.cancel();

    let report = run(&fetcher, Config::default(), cancel).await.unwrap();
    assert!(report.is_cancelled());
    assert!(report.sections().is_empty());
    assert_eq!(report.errors()[0].message, "Run cancelled");
}

#[tokio::test]
async fn test_excludes_and_min_level() {
    let fetcher = MemoryFetcher::new(cluster());
    let config = Config::new()
        .with_sanitizers(&["cm"])
        .unwrap()
        .with_min_level(Level::Info)
        .exclude("configmap", "rx:^default/fred-");
    let report = run(&fetcher, config, CancelToken::new()).await.unwrap();

    assert_eq!(report.sections().len(), 1);
    let configmaps = &report.sections()[0];
    assert_eq!(configmaps.tally.total(), 1);
    assert!(!configmaps.outcome.contains("default/fred-config"));

    let json: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    let issues = &json["popeye"]["sanitizers"][0]["issues"];
    assert!(issues.get("default/stale-config").is_some());
}
