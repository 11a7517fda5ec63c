use anyhow::{Context, Result};

use crate::models::{Settings, TransferPayload};
use crate::sanitize::{sanitize_transfer, TransferCounts};

/// Renders the current profiles and global commands as a pretty-printed
/// transfer payload.
pub fn export_transfer(settings: &Settings) -> Result<String> {
    let payload = TransferPayload {
        profiles: settings.profiles.clone(),
        global_commands: settings.global_commands.clone(),
    };
    let mut encoded =
        serde_json::to_string_pretty(&payload).context("failed to encode transfer payload")?;
    encoded.push('\n');
    Ok(encoded)
}

/// Parses and sanitizes a transfer payload without touching any live
/// configuration. A malformed payload is an error the caller reports; the
/// returned counts describe the sanitized result.
pub fn import_transfer(raw: &str) -> Result<(TransferPayload, TransferCounts)> {
    let mut payload = serde_json::from_str::<TransferPayload>(raw.trim())
        .context("transfer payload is not valid JSON")?;
    let counts = sanitize_transfer(&mut payload);
    Ok((payload, counts))
}

/// Replaces the configured profiles and global commands with an imported
/// payload. Logs and toggles are untouched.
pub fn apply_transfer(settings: &mut Settings, payload: TransferPayload) {
    settings.profiles = payload.profiles;
    settings.global_commands = payload.global_commands;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommandEntry, Profile, RunMode};
    use uuid::Uuid;

    #[test]
    fn functional_export_then_import_preserves_profiles_and_commands() {
        let settings = Settings {
            profiles: vec![Profile {
                label: "Main".to_string(),
                character_name: "Foo".to_string(),
                world_name: "World1".to_string(),
                commands: vec![CommandEntry {
                    name: "greet".to_string(),
                    command_text: "/wave".to_string(),
                    run_mode: RunMode::OncePerSession,
                    ..CommandEntry::default()
                }],
                ..Profile::default()
            }],
            global_commands: vec![CommandEntry {
                name: "global".to_string(),
                command_text: "/sit".to_string(),
                ..CommandEntry::default()
            }],
            ..Settings::default()
        };

        let encoded = export_transfer(&settings).expect("export payload");
        assert!(encoded.contains("\"globalCommands\""));
        assert!(encoded.contains("\"OncePerSession\""));

        let (payload, counts) = import_transfer(&encoded).expect("import payload");
        assert_eq!(counts.profiles, 1);
        assert_eq!(counts.commands, 2);
        assert_eq!(payload.profiles, settings.profiles);
        assert_eq!(payload.global_commands, settings.global_commands);
    }

    #[test]
    fn regression_malformed_import_fails_without_payload() {
        let error = import_transfer("{ truncated").expect_err("import should fail");
        assert!(error.to_string().contains("not valid JSON"));
    }

    #[test]
    fn unit_import_sanitizes_ids_and_strings() {
        let raw = r#"{
            "profiles": [
                {"id": "00000000-0000-0000-0000-000000000000", "label": "  Main  ",
                 "commands": [{"name": " greet ", "commandText": " /wave ", "delayMs": 999999999}]}
            ],
            "globalCommands": []
        }"#;

        let (payload, counts) = import_transfer(raw).expect("import payload");
        assert_eq!(counts.profiles, 1);
        assert_eq!(counts.commands, 1);
        assert_ne!(payload.profiles[0].id, Uuid::nil());
        assert_eq!(payload.profiles[0].label, "Main");
        assert_eq!(payload.profiles[0].commands[0].command_text, "/wave");
        assert_eq!(
            payload.profiles[0].commands[0].delay_ms,
            crate::sanitize::MAX_DELAY_MS
        );
    }

    #[test]
    fn functional_apply_transfer_replaces_lists_and_keeps_journal() {
        let mut settings = Settings {
            logs: vec![crate::models::LogEntry {
                timestamp_unix_ms: 1,
                character_key: "Foo@World1".to_string(),
                command_text: "/wave".to_string(),
                status: crate::models::CommandStatus::Sent,
                message: "Sent".to_string(),
            }],
            ..Settings::default()
        };

        apply_transfer(
            &mut settings,
            TransferPayload {
                profiles: vec![Profile::default()],
                global_commands: vec![CommandEntry::default()],
            },
        );

        assert_eq!(settings.profiles.len(), 1);
        assert_eq!(settings.global_commands.len(), 1);
        assert_eq!(settings.logs.len(), 1);
    }
}
