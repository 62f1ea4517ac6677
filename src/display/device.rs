// src/display/device.rs

//! Display controller discovery.
//!
//! Opens a DRM device node, enumerates connectors/encoders/CRTCs, and
//! selects the pipeline the session will drive: the first connected
//! connector, its largest mode, and the encoder/CRTC pair currently bound
//! to it. Pure discovery; nothing here mutates hardware state beyond the
//! device open itself.

use log::{debug, info, warn};
use std::fs::{File, OpenOptions};
use std::os::unix::io::{AsFd, BorrowedFd};
use std::path::Path;
use std::sync::Arc;

use drm::control::{connector, crtc, Device as ControlDevice, Mode};
use drm::Device;

use crate::config::DeviceConfig;
use crate::display::error::AcquireError;

/// An open DRM device node.
///
/// Cheaply cloneable so the GBM allocation device and the mode-setting
/// side can share one descriptor; the node closes when the last clone is
/// dropped.
#[derive(Debug, Clone)]
pub struct Card(Arc<File>);

impl AsFd for Card {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl Device for Card {}
impl ControlDevice for Card {}

impl Card {
    /// Opens a single device node read/write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self(Arc::new(file)))
    }

    /// Probes `/dev/dri/card0..N` and picks the node backed by the first
    /// acceptable driver module. Module order in the configuration wins
    /// over node numbering, matching the fixed probe order of the classic
    /// backends.
    pub fn probe(config: &DeviceConfig) -> Result<Self, AcquireError> {
        let mut candidates: Vec<(String, Card)> = Vec::new();

        for index in 0..=config.max_card_index {
            let path = format!("/dev/dri/card{}", index);
            let card = match Card::open(&path) {
                Ok(card) => card,
                Err(err) => {
                    debug!("skipping {}: {}", path, err);
                    continue;
                }
            };
            match card.get_driver() {
                Ok(driver) => {
                    let name = driver.name().to_string_lossy().into_owned();
                    debug!("{} is driven by '{}'", path, name);
                    candidates.push((name, card));
                }
                Err(err) => warn!("could not identify driver for {}: {}", path, err),
            }
        }

        for module in &config.modules {
            if let Some(pos) = candidates.iter().position(|(name, _)| name == module) {
                info!("using DRM device driven by '{}'", module);
                return Ok(candidates.swap_remove(pos).1);
            }
        }

        Err(AcquireError::NoDeviceFound)
    }
}

/// The connector/encoder/CRTC/mode selection for one session.
#[derive(Debug)]
pub struct SelectedPipeline {
    pub crtc: crtc::Handle,
    pub connector: connector::Handle,
    pub mode: Mode,
    /// CRTC configuration captured before we touch the display, restored
    /// at teardown. Best-effort: absence only costs the cosmetic restore.
    pub original_crtc: Option<crtc::Info>,
}

/// Enumerates the controller's resources and resolves the scanout
/// pipeline per the fixed policy: first connected connector, largest
/// mode, the encoder the connector is currently bound to.
pub fn select_pipeline(card: &Card) -> Result<SelectedPipeline, AcquireError> {
    let resources = card
        .resource_handles()
        .map_err(AcquireError::ResourceQueryFailed)?;

    let mut selected_connector: Option<connector::Info> = None;
    for handle in resources.connectors() {
        let info = match card.get_connector(*handle, false) {
            Ok(info) => info,
            Err(err) => {
                warn!("failed to query connector {:?}: {}", handle, err);
                continue;
            }
        };
        if info.state() == connector::State::Connected {
            selected_connector = Some(info);
            break;
        }
        // Not selected: the probe handle is dropped here and never reused.
    }

    // Captured before the mode-set so teardown can put the pipe back.
    let original_crtc = resources
        .crtcs()
        .first()
        .and_then(|handle| card.get_crtc(*handle).ok());

    let connector_info = selected_connector.ok_or(AcquireError::NoConnectedDisplay)?;

    let mode = largest_by_area(connector_info.modes(), |mode| {
        let (width, height) = mode.size();
        u32::from(width) * u32::from(height)
    })
    .map(|index| connector_info.modes()[index])
    .ok_or(AcquireError::NoUsableMode)?;

    let bound_encoder = connector_info.current_encoder();
    let mut selected_encoder = None;
    for handle in resources.encoders() {
        let info = match card.get_encoder(*handle) {
            Ok(info) => info,
            Err(err) => {
                warn!("failed to query encoder {:?}: {}", handle, err);
                continue;
            }
        };
        if Some(info.handle()) == bound_encoder {
            selected_encoder = Some(info);
            break;
        }
    }

    let encoder = selected_encoder.ok_or(AcquireError::NoMatchingEncoder)?;
    // An encoder without an active CRTC cannot scan anything out.
    let crtc = encoder.crtc().ok_or(AcquireError::NoMatchingEncoder)?;

    let (width, height) = mode.size();
    info!(
        "selected pipeline: connector {:?}, crtc {:?}, mode {}x{}@{}",
        connector_info.handle(),
        crtc,
        width,
        height,
        mode.vrefresh()
    );

    Ok(SelectedPipeline {
        crtc,
        connector: connector_info.handle(),
        mode,
        original_crtc,
    })
}

/// Index of the item with the largest area; ties keep the first listed.
fn largest_by_area<T>(items: &[T], area: impl Fn(&T) -> u32) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (index, item) in items.iter().enumerate() {
        let current = area(item);
        match best {
            Some((_, best_area)) if current <= best_area => {}
            _ => best = Some((index, current)),
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(size: &(u32, u32)) -> u32 {
        size.0 * size.1
    }

    #[test]
    fn picks_the_largest_resolution() {
        // Mirrors a connector advertising 800x600, 1920x1080, 1280x720.
        let modes = [(800, 600), (1920, 1080), (1280, 720)];
        assert_eq!(largest_by_area(&modes, area), Some(1));
    }

    #[test]
    fn ties_keep_the_first_listed_mode() {
        let modes = [(1280, 720), (720, 1280), (640, 480)];
        assert_eq!(largest_by_area(&modes, area), Some(0));
    }

    #[test]
    fn empty_mode_list_selects_nothing() {
        let modes: [(u32, u32); 0] = [];
        assert_eq!(largest_by_area(&modes, area), None);
    }

    #[test]
    fn strictly_larger_mode_wins_regardless_of_position() {
        let modes = [(640, 480), (800, 600), (3840, 2160), (1920, 1080)];
        assert_eq!(largest_by_area(&modes, area), Some(2));
    }
}
