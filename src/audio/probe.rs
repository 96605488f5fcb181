//! Decide at runtime whether JACK should be used.
//!
//! cpal is asked which hosts it was built with, and each one is initialized.
//! A host counts as listed only if it comes up with a default input device,
//! which for the JACK host means a server is reachable. The probe only looks:
//! every host it creates is dropped before it returns.

use cpal::traits::HostTrait;
use tracing::debug;

use super::backend::BackendKind;
use super::quiet::{quietly, Streams};
use crate::error::{HearError, HearResult};

/// Host-API names starting with this (any case) belong to JACK.
pub const PROFESSIONAL_PREFIX: &str = "jack";

/// A source of host-API names.
pub trait HostApiRegistry {
    fn host_api_names(&self) -> HearResult<Vec<String>>;
}

/// The hosts cpal can bring up on this machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalHostRegistry;

impl HostApiRegistry for CpalHostRegistry {
    fn host_api_names(&self) -> HearResult<Vec<String>> {
        let ids = cpal::available_hosts();
        let mut names = Vec::new();
        let mut idle = Vec::new();
        let mut failures = Vec::new();

        quietly(Streams::Both, || {
            for id in &ids {
                match cpal::host_from_id(*id) {
                    Ok(host) => {
                        if host.default_input_device().is_some() {
                            names.push(id.name().to_string());
                        } else {
                            idle.push(id.name());
                        }
                    }
                    Err(e) => failures.push(format!("{}: {}", id.name(), e)),
                }
            }
        });

        for name in &idle {
            debug!("Host {} has no input device, not listed", name);
        }
        for failure in &failures {
            debug!("Host unavailable: {}", failure);
        }

        if !ids.is_empty() && failures.len() == ids.len() {
            return Err(HearError::BackendUnavailable(failures.join("; ")));
        }

        debug!("Host APIs: {:?}", names);
        Ok(names)
    }
}

/// True if any host-API name marks the JACK server as present.
pub fn is_professional_backend_listed<S: AsRef<str>>(names: &[S]) -> bool {
    names
        .iter()
        .any(|name| name.as_ref().to_lowercase().starts_with(PROFESSIONAL_PREFIX))
}

/// Probe cpal's hosts for a running JACK server.
pub fn is_professional_backend_active() -> HearResult<bool> {
    let names = CpalHostRegistry.host_api_names()?;
    Ok(is_professional_backend_listed(&names))
}

/// Pick the backend for a session from what `registry` reports.
pub fn select_backend<R: HostApiRegistry + ?Sized>(registry: &R) -> HearResult<BackendKind> {
    let names = registry.host_api_names()?;
    if is_professional_backend_listed(&names) {
        Ok(BackendKind::Professional)
    } else {
        Ok(BackendKind::General)
    }
}
