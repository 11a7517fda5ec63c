use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use logincmd_config::SettingsStore;
use logincmd_core::{append_jsonl_line, unix_now_ms};
use logincmd_scheduler::{
    CommandSink, DispatchError, Identity, IdentityProbe, LoginScheduler, SchedulerConfig,
};

/// Wiring for the `run` subcommand.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub settings_path: PathBuf,
    pub control_dir: PathBuf,
    pub outbox_path: PathBuf,
    pub tick_interval: Duration,
}

/// One control event file. The control directory stands in for the host's
/// identity-change notifications: `login`/`logout` are the edge triggers and
/// `identity` publishes the readiness-query answer.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ControlEvent {
    Login,
    Logout,
    Identity {
        name: String,
        #[serde(default)]
        world_id: u16,
        #[serde(default)]
        world_name: String,
    },
}

pub type SharedIdentity = Arc<Mutex<Option<Identity>>>;

struct ControlProbe {
    identity: SharedIdentity,
}

impl IdentityProbe for ControlProbe {
    fn current_identity(&self) -> Option<Identity> {
        self.identity
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

#[derive(Debug, Serialize)]
struct OutboxRecord<'a> {
    timestamp_unix_ms: u64,
    command_text: &'a str,
}

/// Sink that appends every dispatched command to a JSONL outbox file for the
/// host process to consume.
struct OutboxSink {
    path: PathBuf,
}

impl CommandSink for OutboxSink {
    fn dispatch(&mut self, command_text: &str) -> Result<(), DispatchError> {
        append_jsonl_line(
            &self.path,
            &OutboxRecord {
                timestamp_unix_ms: unix_now_ms(),
                command_text,
            },
        )
        .map_err(|error| DispatchError::new(format!("{error:#}")))
    }
}

/// Drives the scheduler on a fixed tick until ctrl-c: consume control events,
/// then run one scheduler cycle against a single wall-clock sample.
pub async fn run_loop(config: RunConfig) -> Result<()> {
    let store = SettingsStore::new(config.settings_path.clone());
    let settings = store.load()?;

    let identity: SharedIdentity = Arc::new(Mutex::new(None));
    let mut scheduler = LoginScheduler::new(
        settings,
        Box::new(ControlProbe {
            identity: Arc::clone(&identity),
        }),
        Box::new(OutboxSink {
            path: config.outbox_path.clone(),
        }),
        Box::new(store),
        SchedulerConfig::default(),
        unix_now_ms(),
    );

    println!(
        "logincmd run: settings={} control_dir={} outbox={} tick_ms={}",
        config.settings_path.display(),
        config.control_dir.display(),
        config.outbox_path.display(),
        config.tick_interval.as_millis(),
    );

    let mut interval = tokio::time::interval(config.tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now_unix_ms = unix_now_ms();
                match drain_control_events(&config.control_dir) {
                    Ok(events) => {
                        for event in events {
                            apply_control_event(&mut scheduler, &identity, event, now_unix_ms);
                        }
                    }
                    Err(error) => {
                        tracing::warn!(
                            "control event drain failed: dir={} error={error:#}",
                            config.control_dir.display()
                        );
                    }
                }
                scheduler.tick(now_unix_ms);
            }
            _ = tokio::signal::ctrl_c() => {
                println!("logincmd run shutdown requested");
                scheduler.shutdown(unix_now_ms());
                return Ok(());
            }
        }
    }
}

/// Consumes every `*.json` control file in name order. Files are removed as
/// they are read; a malformed file is removed too, with a diagnostic, so it
/// cannot wedge the channel.
pub fn drain_control_events(control_dir: &Path) -> Result<Vec<ControlEvent>> {
    if !control_dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(control_dir)
        .with_context(|| format!("failed to read {}", control_dir.display()))?
    {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", control_dir.display()))?;
        let path = entry.path();
        if path.extension().and_then(|value| value.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut events = Vec::new();
    for path in paths {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        match serde_json::from_str::<ControlEvent>(&raw) {
            Ok(event) => events.push(event),
            Err(error) => {
                tracing::warn!(
                    "malformed control event dropped: path={} error={error}",
                    path.display()
                );
            }
        }
        let _ = std::fs::remove_file(&path);
    }
    Ok(events)
}

pub fn apply_control_event(
    scheduler: &mut LoginScheduler,
    identity: &SharedIdentity,
    event: ControlEvent,
    now_unix_ms: u64,
) {
    match event {
        ControlEvent::Login => scheduler.on_login(now_unix_ms),
        ControlEvent::Logout => {
            if let Ok(mut guard) = identity.lock() {
                *guard = None;
            }
            scheduler.on_logout();
        }
        ControlEvent::Identity {
            name,
            world_id,
            world_name,
        } => {
            if let Ok(mut guard) = identity.lock() {
                *guard = Some(Identity {
                    name,
                    world_id,
                    world_name,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logincmd_config::{CommandEntry, CommandStatus, Settings};
    use tempfile::tempdir;

    fn write_event(dir: &Path, name: &str, payload: &str) {
        std::fs::create_dir_all(dir).expect("create control dir");
        std::fs::write(dir.join(name), payload).expect("write control event");
    }

    #[test]
    fn unit_drain_returns_events_in_name_order_and_consumes_files() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path().join("control");
        write_event(&dir, "002-identity.json", r#"{"event":"identity","name":"Foo","worldId":21,"worldName":"World1"}"#);
        write_event(&dir, "001-login.json", r#"{"event":"login"}"#);
        write_event(&dir, "readme.txt", "ignored");

        let events = drain_control_events(&dir).expect("drain events");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ControlEvent::Login);
        assert!(matches!(&events[1], ControlEvent::Identity { name, .. } if name == "Foo"));

        assert!(!dir.join("001-login.json").exists());
        assert!(!dir.join("002-identity.json").exists());
        assert!(dir.join("readme.txt").exists());
    }

    #[test]
    fn regression_malformed_control_event_is_dropped_not_fatal() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path().join("control");
        write_event(&dir, "001-bad.json", "{ nope");
        write_event(&dir, "002-login.json", r#"{"event":"login"}"#);

        let events = drain_control_events(&dir).expect("drain events");
        assert_eq!(events, vec![ControlEvent::Login]);
        assert!(!dir.join("001-bad.json").exists());
    }

    #[test]
    fn unit_missing_control_dir_yields_no_events() {
        let temp = tempdir().expect("tempdir");
        let events = drain_control_events(&temp.path().join("absent")).expect("drain events");
        assert!(events.is_empty());
    }

    #[test]
    fn functional_control_events_drive_scheduler_to_outbox() {
        let temp = tempdir().expect("tempdir");
        let outbox_path = temp.path().join("outbox.jsonl");
        let store = SettingsStore::new(temp.path().join("settings.json"));

        let settings = Settings {
            global_commands: vec![CommandEntry {
                name: "wave".to_string(),
                command_text: "/wave".to_string(),
                ..CommandEntry::default()
            }],
            ..Settings::default()
        };

        let identity: SharedIdentity = Arc::new(Mutex::new(None));
        let mut scheduler = LoginScheduler::new(
            settings,
            Box::new(ControlProbe {
                identity: Arc::clone(&identity),
            }),
            Box::new(OutboxSink {
                path: outbox_path.clone(),
            }),
            Box::new(store),
            SchedulerConfig::default(),
            0,
        );

        apply_control_event(&mut scheduler, &identity, ControlEvent::Login, 0);
        apply_control_event(
            &mut scheduler,
            &identity,
            ControlEvent::Identity {
                name: "Foo".to_string(),
                world_id: 21,
                world_name: "World1".to_string(),
            },
            0,
        );
        scheduler.tick(0);

        assert_eq!(scheduler.active_character_display(), "Foo@World1");
        assert_eq!(scheduler.execution_plan()[0].status, CommandStatus::Sent);
        let outbox = std::fs::read_to_string(&outbox_path).expect("read outbox");
        assert!(outbox.contains("/wave"));

        apply_control_event(&mut scheduler, &identity, ControlEvent::Logout, 1);
        assert_eq!(scheduler.active_character_display(), "Not logged in");
        assert!(scheduler.execution_plan().is_empty());
    }
}
