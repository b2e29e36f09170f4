use clap::Parser;

use crate::config::{AppConfig, StoreKind};

/// Command-line overrides, applied on top of the environment
#[derive(Debug, Parser)]
#[command(name = "byteware-inventory-api")]
#[command(about = "ByteWare inventory backend - items, overview and supplier profiles")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "Port to listen on (overrides PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Address to bind (overrides BIND_ADDRESS)")]
    pub bind: Option<String>,

    #[arg(long, help = "Document store backend: postgres or memory (overrides STORE)")]
    pub store: Option<StoreKind>,
}

impl Cli {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
        }
        if let Some(store) = self.store {
            config.database.store = store;
        }
    }
}
