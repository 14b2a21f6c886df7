//! Fake remote libraries.

use plsync_transport::{Credentials, MemoryTransport};

/// Library root on the fake remote host.
pub const REMOTE_ROOT: &str = "/media/CHIA/Music";

pub fn credentials() -> Credentials {
    Credentials::new("192.168.178.43", "pi", REMOTE_ROOT)
}

/// Remote-style manifest text: one library key per line.
pub fn manifest_text(keys: &[&str]) -> String {
    keys.iter().map(|k| format!("{k}\n")).collect()
}

/// A remote holding `playlist` with `keys` and a file for every key.
pub fn remote_library(playlist: &str, keys: &[&str]) -> MemoryTransport {
    let transport = MemoryTransport::new()
        .with_dir(REMOTE_ROOT)
        .with_file(format!("{REMOTE_ROOT}/{playlist}"), manifest_text(keys));
    for key in keys {
        transport.insert_file(format!("{REMOTE_ROOT}/{key}"), format!("audio:{key}"));
    }
    transport
}
