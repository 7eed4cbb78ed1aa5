use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UsbIdsError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no readable usb.ids found (tried {tried:?})")]
    NotFound { tried: Vec<PathBuf> },
}
