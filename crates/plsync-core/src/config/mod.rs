//! Configuration loading and resolution
//!
//! Configuration is TOML, loaded from up to three sources that are merged
//! field by field (later sources override earlier):
//!
//! 1. **Global** - `<config_dir>/plsync/config.toml`
//! 2. **Project** - `plsync.toml` in the working directory
//! 3. **Explicit** - a file named on the command line
//!
//! ```toml
//! [library]
//! local_root = "E:\\Albums"
//! playlists_dir = "D:\\Music\\Playlists"
//! extensions = ["mp3"]
//!
//! [remote]
//! host = "192.168.178.43"
//! username = "pi"
//! root = "/media/CHIA/Music"
//! flavor = "putty"
//!
//! [backup]
//! keep = 5
//! ```

mod file;
mod resolver;
mod settings;

pub use file::{BackupSection, ConfigFile, LibrarySection, RemoteSection};
pub use resolver::ConfigResolver;
pub use settings::{BackupConfig, LibraryConfig, RemoteConfig, SyncConfig};
