//! The `hear` entry points: look up the host APIs once, then run the matching backend.

pub mod body;

use tracing::info;

use crate::audio::{
    capture, interrupt_signal, select_backend, Backend, BackendKind, Block, CaptureParams,
    CpalBackend, CpalHostRegistry, HostApiRegistry, JackBackend, StopSignal,
};
use crate::error::HearResult;

/// Capture until Ctrl+C, handing every block to `callback`.
///
/// Uses JACK when a server is running and cpal's default input otherwise. If
/// JACK is detected but cannot be opened the error is returned; there is no
/// fallback to cpal.
///
/// Fails with [`HearError::Interrupt`](crate::error::HearError::Interrupt) if
/// the process already has a Ctrl+C handler, since nothing could end capture.
/// Use [`hear_with`] and stop from your own body in that case.
pub fn hear<F>(callback: F, params: &CaptureParams) -> HearResult<()>
where
    F: FnMut(&Block) -> anyhow::Result<()> + Send + 'static,
{
    let signal = interrupt_signal()?;
    signal.reset();
    let body = body::default_body(signal.clone());
    dispatch(
        &CpalHostRegistry,
        &JackBackend,
        &CpalBackend,
        callback,
        params,
        body,
        signal,
    )
}

/// Like [`hear`], but capture lasts exactly as long as `body` runs.
pub fn hear_with<F, B>(callback: F, params: &CaptureParams, body: B) -> HearResult<()>
where
    F: FnMut(&Block) -> anyhow::Result<()> + Send + 'static,
    B: FnOnce() -> anyhow::Result<()>,
{
    dispatch(
        &CpalHostRegistry,
        &JackBackend,
        &CpalBackend,
        callback,
        params,
        body,
        StopSignal::default(),
    )
}

fn dispatch<R, P, G, F, B>(
    registry: &R,
    professional: &P,
    general: &G,
    callback: F,
    params: &CaptureParams,
    body: B,
    stop: StopSignal,
) -> HearResult<()>
where
    R: HostApiRegistry + ?Sized,
    P: Backend,
    G: Backend,
    F: FnMut(&Block) -> anyhow::Result<()> + Send + 'static,
    B: FnOnce() -> anyhow::Result<()>,
{
    params.validate()?;

    let kind = select_backend(registry)?;
    info!("Using {} backend", kind);

    match kind {
        BackendKind::Professional => capture(professional, params, callback, body, stop),
        BackendKind::General => capture(general, params, callback, body, stop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BlockSink, Session, StopReason};
    use crate::error::HearError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    struct Unreachable(Arc<AtomicBool>);

    impl HostApiRegistry for Unreachable {
        fn host_api_names(&self) -> HearResult<Vec<String>> {
            self.0.store(true, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    struct FixedHosts(Vec<&'static str>);

    impl HostApiRegistry for FixedHosts {
        fn host_api_names(&self) -> HearResult<Vec<String>> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    #[derive(Default)]
    struct CountingBackend {
        kind: Option<BackendKind>,
        refuse_open: bool,
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    impl CountingBackend {
        fn new(kind: BackendKind) -> Self {
            Self {
                kind: Some(kind),
                ..Default::default()
            }
        }

        fn refusing(kind: BackendKind) -> Self {
            Self {
                refuse_open: true,
                ..Self::new(kind)
            }
        }

        fn opens(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        fn closes(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }
    }

    struct CountingSession(Arc<AtomicUsize>);

    impl Backend for CountingBackend {
        type Session = CountingSession;

        fn kind(&self) -> BackendKind {
            self.kind.unwrap_or(BackendKind::General)
        }

        fn open(&self, _params: &CaptureParams, _sink: BlockSink) -> HearResult<CountingSession> {
            if self.refuse_open {
                return Err(HearError::ProfessionalOpen(jack::Error::ClientError(
                    jack::ClientStatus::FAILURE,
                )));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(CountingSession(self.closed.clone()))
        }
    }

    impl Session for CountingSession {
        fn start(&mut self) -> HearResult<()> {
            Ok(())
        }

        fn close(self) -> HearResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn run(
        hosts: Vec<&'static str>,
        professional: &CountingBackend,
        general: &CountingBackend,
    ) -> HearResult<()> {
        dispatch(
            &FixedHosts(hosts),
            professional,
            general,
            |_block: &Block| Ok(()),
            &CaptureParams::default(),
            || Ok(()),
            StopSignal::default(),
        )
    }

    #[test]
    fn test_invalid_params_rejected_before_host_lookup() {
        let looked_up = Arc::new(AtomicBool::new(false));
        let params = CaptureParams {
            channels: 0,
            ..Default::default()
        };

        let result = dispatch(
            &Unreachable(looked_up.clone()),
            &CountingBackend::new(BackendKind::Professional),
            &CountingBackend::new(BackendKind::General),
            |_block: &Block| Ok(()),
            &params,
            || Ok(()),
            StopSignal::default(),
        );

        assert!(matches!(result, Err(HearError::InvalidParams(_))));
        assert!(!looked_up.load(Ordering::SeqCst));
    }

    #[test]
    fn test_registry_failure_propagates() {
        struct Broken;
        impl HostApiRegistry for Broken {
            fn host_api_names(&self) -> HearResult<Vec<String>> {
                Err(HearError::BackendUnavailable("no hosts".to_string()))
            }
        }

        let general = CountingBackend::new(BackendKind::General);
        let result = dispatch(
            &Broken,
            &CountingBackend::new(BackendKind::Professional),
            &general,
            |_block: &Block| Ok(()),
            &CaptureParams::default(),
            || Ok(()),
            StopSignal::default(),
        );
        assert!(matches!(result, Err(HearError::BackendUnavailable(_))));
        assert_eq!(general.opens(), 0);
    }

    #[test]
    fn test_jack_listed_routes_to_professional() {
        let professional = CountingBackend::new(BackendKind::Professional);
        let general = CountingBackend::new(BackendKind::General);

        run(vec!["ALSA", "JACK"], &professional, &general).unwrap();

        assert_eq!((professional.opens(), professional.closes()), (1, 1));
        assert_eq!(general.opens(), 0);
    }

    #[test]
    fn test_without_jack_routes_to_general() {
        let professional = CountingBackend::new(BackendKind::Professional);
        let general = CountingBackend::new(BackendKind::General);

        run(vec!["ALSA"], &professional, &general).unwrap();

        assert_eq!(professional.opens(), 0);
        assert_eq!((general.opens(), general.closes()), (1, 1));
    }

    #[test]
    fn test_professional_open_failure_does_not_fall_back() {
        let professional = CountingBackend::refusing(BackendKind::Professional);
        let general = CountingBackend::new(BackendKind::General);

        let result = run(vec!["ALSA", "JACK"], &professional, &general);

        assert!(matches!(result, Err(HearError::ProfessionalOpen(_))));
        assert_eq!(general.opens(), 0);
        assert_eq!(general.closes(), 0);
    }

    #[test]
    fn test_default_body_ends_on_interrupt_and_closes_once() {
        let professional = CountingBackend::new(BackendKind::Professional);
        let general = CountingBackend::new(BackendKind::General);
        let signal = StopSignal::default();

        let trigger = signal.clone();
        let interrupter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            trigger.trigger(StopReason::Interrupted);
        });

        let result = dispatch(
            &FixedHosts(vec!["JACK"]),
            &professional,
            &general,
            |_block: &Block| Ok(()),
            &CaptureParams::default(),
            body::default_body(signal.clone()),
            signal.clone(),
        );
        interrupter.join().unwrap();

        assert!(result.is_ok());
        assert_eq!(signal.reason(), Some(StopReason::Interrupted));
        assert_eq!((professional.opens(), professional.closes()), (1, 1));
        assert_eq!(general.opens(), 0);
    }
}
