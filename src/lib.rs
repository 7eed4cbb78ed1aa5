use std::ffi::OsString;
use std::io::{self, Write};
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::Context;
use tracing::{debug, warn};
use usb_descriptors::{decode_source, Reporter};
use usb_ids::UsbIdDatabase;

pub const DEFAULT_DEVICES_DIR: &str = "/sys/bus/usb";

pub const DEFAULT_USB_IDS_PATHS: &[&str] = &[
    "/res/usb.ids",
    "/usr/share/hwdata/usb.ids",
    "/usr/share/misc/usb.ids",
    "/usr/share/usb.ids",
    "/var/lib/usbutils/usb.ids",
];

const DEVICES_DIR_VAR: &str = "LSUSB_DEVICES_DIR";
const USB_IDS_VAR: &str = "LSUSB_USB_IDS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Every file directly inside this directory is one device source.
    pub devices_dir: PathBuf,
    /// Candidates for the ID database, the first readable one is used.
    pub usb_ids_paths: Vec<PathBuf>,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            devices_dir: PathBuf::from(DEFAULT_DEVICES_DIR),
            usb_ids_paths: DEFAULT_USB_IDS_PATHS.iter().map(PathBuf::from).collect(),
            verbose: false,
        }
    }
}

impl Config {
    /// Defaults, overridden by `LSUSB_DEVICES_DIR` and `LSUSB_USB_IDS`.
    pub fn from_env(verbose: bool) -> Self {
        Self::with_overrides(
            verbose,
            env::var_os(DEVICES_DIR_VAR),
            env::var_os(USB_IDS_VAR),
        )
    }

    fn with_overrides(
        verbose: bool,
        devices_dir: Option<OsString>,
        usb_ids: Option<OsString>,
    ) -> Self {
        let mut config = Self {
            verbose,
            ..Default::default()
        };
        if let Some(devices_dir) = devices_dir.filter(|dir| !dir.is_empty()) {
            config.devices_dir = devices_dir.into();
        }
        if let Some(usb_ids) = usb_ids.filter(|path| !path.is_empty()) {
            config.usb_ids_paths = vec![usb_ids.into()];
        }
        config
    }
}

/// What happened to the sources and devices of one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub reported: usize,
    pub skipped_devices: usize,
    pub skipped_sources: usize,
}

impl AddAssign for Tally {
    fn add_assign(&mut self, other: Self) {
        self.reported += other.reported;
        self.skipped_devices += other.skipped_devices;
        self.skipped_sources += other.skipped_sources;
    }
}

/// Loads the ID database, falling back to an empty one so that devices are
/// still listed by number.
pub fn load_database(paths: &[PathBuf]) -> UsbIdDatabase {
    UsbIdDatabase::open_first(paths).unwrap_or_else(|err| {
        warn!("Failed to open usb.ids: {err}");
        UsbIdDatabase::default()
    })
}

/// Lists the device sources in `dir`, sorted by path. Failing to list the
/// directory itself is the only fatal error of a run.
pub fn device_sources(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;

    let mut sources = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(err) => {
                warn!("Failed to read an entry of {}: {err}", dir.display());
                continue;
            }
        };
        if path.is_dir() {
            debug!(path = %path.display(), "skipping directory");
            continue;
        }
        sources.push(path);
    }

    sources.sort();
    Ok(sources)
}

/// Decodes one source and writes every device in it. Bad records are warned
/// about and skipped; only a failure to write the report is returned.
pub fn report_source(
    source: &Path,
    text: &str,
    reporter: &Reporter<'_>,
    out: &mut impl Write,
) -> io::Result<Tally> {
    let mut tally = Tally::default();

    let records = match decode_source(text) {
        Ok(records) => records,
        Err(err) => {
            warn!("Failed to decode {}: {err}", source.display());
            tally.skipped_sources += 1;
            return Ok(tally);
        }
    };

    for (index, record) in records.into_iter().enumerate() {
        let device = match record {
            Ok(device) => device,
            Err(err) => {
                warn!("Skipping device {index} in {}: {err}", source.display());
                tally.skipped_devices += 1;
                continue;
            }
        };

        for line in reporter.render(&device) {
            writeln!(out, "{line}")?;
        }
        tally.reported += 1;
    }

    Ok(tally)
}

/// Lists every device described under `config.devices_dir`.
///
/// Once the output can no longer be written (a closed pipe, say) the listing
/// stops, but the run still succeeds.
pub fn run(config: &Config, out: &mut impl Write) -> anyhow::Result<Tally> {
    let sources = device_sources(&config.devices_dir)?;
    let database = load_database(&config.usb_ids_paths);
    let reporter = Reporter::new(&database, config.verbose);

    let mut tally = Tally::default();
    for source in sources {
        let text = match fs::read_to_string(&source) {
            Ok(text) => text,
            Err(err) => {
                warn!("Failed to open {}: {err}", source.display());
                tally.skipped_sources += 1;
                continue;
            }
        };
        match report_source(&source, &text, &reporter, out) {
            Ok(found) => tally += found,
            Err(err) => {
                output_closed(&err);
                return Ok(tally);
            }
        }
    }

    if let Err(err) = out.flush() {
        output_closed(&err);
    }
    Ok(tally)
}

fn output_closed(err: &io::Error) {
    if err.kind() == io::ErrorKind::BrokenPipe {
        debug!("output closed, stopping");
    } else {
        warn!("Failed to write the device list: {err}");
    }
}
