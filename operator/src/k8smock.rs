//! In-memory cluster used by the reconciliation tests
use crate::{
    store::{Child, Store},
    Error, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use common::{Paper, PaperSpec, PaperStatus};
use kube::{core::ErrorResponse, runtime::events::Event, ResourceExt};
use serde_json::{json, Value};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex},
};

pub const NAMESPACE: &str = "default";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 10, 1, 12, 0, 0).unwrap()
}

pub fn paper(name: &str, version: &str) -> Paper {
    let mut p = Paper::new(name, PaperSpec {
        version: version.to_string(),
        server_properties: None,
        service: None,
    });
    p.metadata.namespace = Some(NAMESPACE.to_string());
    p
}

#[derive(Clone, Debug)]
pub struct RecordedEvent {
    pub reason: String,
    pub note: String,
}

type Key = (String, String, String);

#[derive(Default)]
struct State {
    objects: BTreeMap<Key, Value>,
    created: Vec<(String, String)>,
    events: Vec<RecordedEvent>,
    revision: u64,
    failing_deletes: BTreeSet<String>,
    failing_status: bool,
}

impl State {
    fn next_revision(&mut self) -> String {
        self.revision += 1;
        self.revision.to_string()
    }
}

#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<State>>,
}

fn api_error(code: u16, reason: &str, message: String) -> Error {
    Error::from_kube(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    }))
}

fn key<K: Child>(ns: &str, name: &str) -> Key {
    (K::kind(&()).to_string(), ns.to_string(), name.to_string())
}

fn labels_of(obj: &Value) -> BTreeMap<String, String> {
    serde_json::from_value(obj["metadata"]["labels"].clone()).unwrap_or_default()
}

fn matches_selector(labels: &BTreeMap<String, String>, selector: &str) -> bool {
    selector.split(',').filter(|t| !t.is_empty()).all(|term| {
        if let Some((k, v)) = term.split_once("!=") {
            labels.get(k).map_or(true, |l| l != v)
        } else if let Some((k, v)) = term.split_once('=') {
            labels.get(k).is_some_and(|l| l == v)
        } else {
            labels.contains_key(term)
        }
    })
}

impl FakeStore {
    fn store_new<K: Child>(&self, ns: &str, obj: &K) -> Result<K> {
        let mut state = self.state.lock().unwrap();
        let name = obj.name_any();
        let k = key::<K>(ns, &name);
        if state.objects.contains_key(&k) {
            return Err(api_error(409, "AlreadyExists", format!("{} {name} already exists", k.0)));
        }
        let mut v = serde_json::to_value(obj)?;
        let rv = state.next_revision();
        v["metadata"]["namespace"] = json!(ns);
        v["metadata"]["uid"] = json!(format!("uid-{name}-{rv}"));
        v["metadata"]["resourceVersion"] = json!(rv);
        state.objects.insert(k, v.clone());
        Ok(serde_json::from_value(v)?)
    }

    fn update<K: Child>(&self, name: &str, f: impl FnOnce(&mut Value)) {
        let mut state = self.state.lock().unwrap();
        let rv = state.next_revision();
        let v = state.objects.get_mut(&key::<K>(NAMESPACE, name)).unwrap();
        f(v);
        v["metadata"]["resourceVersion"] = json!(rv);
    }

    pub fn add_paper(&self, p: Paper) {
        self.store_new(NAMESPACE, &p).unwrap();
    }

    /// Seed an object as if it had been created earlier
    pub fn insert<K: Child>(&self, obj: K) {
        self.store_new(NAMESPACE, &obj).unwrap();
    }

    pub fn paper(&self, name: &str) -> Paper {
        self.get::<Paper>(name).unwrap()
    }

    pub fn get<K: Child>(&self, name: &str) -> Option<K> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&key::<K>(NAMESPACE, name))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    pub fn count<K: Child>(&self) -> usize {
        let kind = K::kind(&()).to_string();
        let state = self.state.lock().unwrap();
        state.objects.keys().filter(|k| k.0 == kind).count()
    }

    pub fn update_paper(&self, name: &str, f: impl FnOnce(&mut Paper)) {
        self.update::<Paper>(name, |v| {
            let mut p: Paper = serde_json::from_value(v.clone()).unwrap();
            f(&mut p);
            *v = serde_json::to_value(&p).unwrap();
        });
    }

    pub fn set_spec_version(&self, name: &str, version: &str) {
        self.update_paper(name, |p| p.spec.version = version.to_string());
    }

    pub fn set_pod_phase(&self, name: &str, phase: &str) {
        self.update::<k8s_openapi::api::core::v1::Pod>(name, |v| {
            v["status"] = json!({ "phase": phase });
        });
    }

    pub fn set_pod_label(&self, name: &str, label: &str, value: &str) {
        self.update::<k8s_openapi::api::core::v1::Pod>(name, |v| {
            v["metadata"]["labels"][label] = json!(value);
        });
    }

    pub fn mark_terminating<K: Child>(&self, name: &str) {
        self.update::<K>(name, |v| {
            v["metadata"]["deletionTimestamp"] = json!("2022-10-01T11:00:00Z");
        });
    }

    /// How many times an object with that name was created
    pub fn created_count<K: Child>(&self, name: &str) -> usize {
        let kind = K::kind(&()).to_string();
        let state = self.state.lock().unwrap();
        state.created.iter().filter(|(k, n)| *k == kind && n == name).count()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn fail_delete_of(&self, name: &str) {
        self.state.lock().unwrap().failing_deletes.insert(name.to_string());
    }

    pub fn fail_status_writes(&self) {
        self.state.lock().unwrap().failing_status = true;
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn get_opt<K: Child>(&self, ns: &str, name: &str) -> Result<Option<K>> {
        let state = self.state.lock().unwrap();
        match state.objects.get(&key::<K>(ns, name)) {
            Some(v) => Ok(Some(serde_json::from_value(v.clone())?)),
            None => Ok(None),
        }
    }

    async fn create<K: Child>(&self, ns: &str, obj: &K) -> Result<K> {
        let created = self.store_new(ns, obj)?;
        let mut state = self.state.lock().unwrap();
        state
            .created
            .push((K::kind(&()).to_string(), created.name_any()));
        Ok(created)
    }

    async fn replace<K: Child>(&self, ns: &str, name: &str, obj: &K) -> Result<K> {
        let mut state = self.state.lock().unwrap();
        let k = key::<K>(ns, name);
        let current = match state.objects.get(&k) {
            Some(v) => v["metadata"]["resourceVersion"].clone(),
            None => return Err(api_error(404, "NotFound", format!("{} {name} not found", k.0))),
        };
        if let Some(rv) = obj.resource_version() {
            if json!(rv) != current {
                return Err(api_error(409, "Conflict", format!("{} {name} was modified", k.0)));
            }
        }
        let mut v = serde_json::to_value(obj)?;
        v["metadata"]["resourceVersion"] = json!(state.next_revision());
        state.objects.insert(k, v.clone());
        Ok(serde_json::from_value(v)?)
    }

    async fn delete<K: Child>(&self, ns: &str, name: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if state.failing_deletes.contains(name) {
            return Err(api_error(500, "InternalError", format!("cannot delete {name}")));
        }
        Ok(state.objects.remove(&key::<K>(ns, name)).is_some())
    }

    async fn list_labeled<K: Child>(&self, ns: &str, selector: &str) -> Result<Vec<K>> {
        let kind = K::kind(&()).to_string();
        let state = self.state.lock().unwrap();
        state
            .objects
            .iter()
            .filter(|(k, v)| k.0 == kind && k.1 == ns && matches_selector(&labels_of(v), selector))
            .map(|(_, v)| serde_json::from_value(v.clone()).map_err(Error::SerializationError))
            .collect()
    }

    async fn replace_status(&self, paper: &Paper, status: PaperStatus) -> Result<Paper> {
        let mut state = self.state.lock().unwrap();
        if state.failing_status {
            return Err(api_error(500, "InternalError", "status writes are failing".to_string()));
        }
        let ns = paper.namespace().unwrap_or_default();
        let k = key::<Paper>(&ns, &paper.name_any());
        let current = match state.objects.get(&k) {
            Some(v) => v["metadata"]["resourceVersion"].clone(),
            None => return Err(api_error(404, "NotFound", format!("Paper {} not found", k.2))),
        };
        if json!(paper.resource_version()) != current {
            return Err(api_error(409, "Conflict", format!("Paper {} was modified", k.2)));
        }
        let rv = state.next_revision();
        let Some(v) = state.objects.get_mut(&k) else {
            return Err(api_error(404, "NotFound", format!("Paper {} not found", k.2)));
        };
        v["status"] = serde_json::to_value(&status)?;
        v["metadata"]["resourceVersion"] = json!(rv);
        Ok(serde_json::from_value(v.clone())?)
    }

    async fn record(&self, _paper: &Paper, ev: Event) {
        self.state.lock().unwrap().events.push(RecordedEvent {
            reason: ev.reason,
            note: ev.note.unwrap_or_default(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_terms() {
        let labels = BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("v".to_string(), "old".to_string()),
        ]);
        assert!(matches_selector(&labels, "a=1,v,v!=new"));
        assert!(!matches_selector(&labels, "a=1,v,v!=old"));
        assert!(!matches_selector(&labels, "a=1,w"));
        assert!(matches_selector(&labels, "w!=x"));
    }
}
