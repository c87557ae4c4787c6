//! Read web pages aloud, one chunk of text at a time.
//!
//! The page is segmented into readable chunks, each chunk is synthesized by a
//! remote speech service and played locally, and a single-threaded controller
//! keeps the queue, the look-ahead cache and the saved reading position in
//! step with what the user asks for.

pub mod audio;
pub mod cancellation;
pub mod chunker;
pub mod config;
pub mod console;
pub mod controller;
pub mod error;
pub mod messages;
pub mod page;
pub mod positions;
pub mod preferences;
pub mod runtime;
pub mod segmenter;
pub mod speech;
pub mod storage;
pub mod surface;
pub mod text_utils;

use std::fs;
use std::path::Path;
use ts_rs::TS;

fn export_single_type<T: TS + 'static>(out_dir: &Path) -> Result<(), String> {
    T::export_all_to(out_dir).map_err(|err| err.to_string())
}

/// Write TypeScript definitions of the host message types into `out_dir`.
pub fn export_ts_bindings(out_dir: &Path) -> Result<(), String> {
    fs::create_dir_all(out_dir)
        .map_err(|err| format!("Failed to create {}: {err}", out_dir.display()))?;

    for entry in fs::read_dir(out_dir)
        .map_err(|err| format!("Failed to list {}: {err}", out_dir.display()))?
    {
        let entry = entry.map_err(|err| format!("Failed to read entry: {err}"))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("ts") {
            fs::remove_file(&path)
                .map_err(|err| format!("Failed to remove {}: {err}", path.display()))?;
        }
    }

    export_single_type::<speech::Voice>(out_dir)?;
    export_single_type::<messages::HostMessage>(out_dir)?;
    export_single_type::<messages::StatusReply>(out_dir)?;
    export_single_type::<messages::HostResponse>(out_dir)?;

    let index_content = r#"export type { Voice } from "./Voice";
export type { HostMessage } from "./HostMessage";
export type { StatusReply } from "./StatusReply";
export type { HostResponse } from "./HostResponse";
"#;

    fs::write(out_dir.join("index.ts"), index_content).map_err(|err| {
        format!(
            "Failed to write {}: {err}",
            out_dir.join("index.ts").display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn bindings_are_written_with_index() {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!("announce-bindings-{nonce}"));
        fs::create_dir_all(&dir).expect("create dir");
        fs::write(dir.join("Stale.ts"), "export type Stale = never;").expect("write stale");

        export_ts_bindings(&dir).expect("export bindings");

        assert!(!dir.join("Stale.ts").exists());
        assert!(dir.join("index.ts").exists());
        let message = fs::read_to_string(dir.join("HostMessage.ts")).expect("read HostMessage");
        assert!(message.contains("TTS_SPEAK"));
        let _ = fs::remove_dir_all(&dir);
    }
}
