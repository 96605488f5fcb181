//! JACK capture through a named client with one input port per channel.
//!
//! JACK pulls: every process cycle it hands us one buffer per registered port.
//! Those buffers go to the sink as-is, in registration order.

use jack::{
    AudioIn, Client, ClientOptions, ClientStatus, ClosureProcessHandler, Control, PortFlags,
    PortSpec, ProcessScope,
};
use tracing::{debug, info, warn};

use super::backend::{capture, Backend, BackendKind, CaptureParams, Session};
use super::block::{Block, BlockSink};
use super::stop::StopSignal;
use crate::error::{HearError, HearResult};

type ProcessFn = Box<dyn FnMut(&Client, &ProcessScope) -> Control + Send>;
type ActiveClient = jack::AsyncClient<(), ClosureProcessHandler<ProcessFn>>;

/// Name of the `index`th (zero-based) input port.
pub fn input_port_name(index: usize) -> String {
    format!("input_{}", index + 1)
}

/// Something that can connect two JACK ports by full name.
pub trait PortConnector {
    fn connect(&self, source: &str, destination: &str) -> Result<(), jack::Error>;
}

impl PortConnector for Client {
    fn connect(&self, source: &str, destination: &str) -> Result<(), jack::Error> {
        self.connect_ports_by_name(source, destination)
    }
}

/// Pair capture sources with our inputs in order and connect each pair.
///
/// A failed connection (already connected, port vanished) is skipped. Extra
/// inputs without a source stay unconnected. Returns how many connections were made.
pub fn connect_capture_ports<C: PortConnector + ?Sized>(
    connector: &C,
    sources: &[String],
    inputs: &[String],
) -> usize {
    let mut connected = 0;
    for (source, input) in sources.iter().zip(inputs) {
        match connector.connect(source, input) {
            Ok(()) => {
                debug!("Connected {} -> {}", source, input);
                connected += 1;
            }
            Err(e) => debug!("Skipping {} -> {}: {}", source, input, e),
        }
    }
    connected
}

/// The JACK audio server.
#[derive(Debug, Clone, Copy, Default)]
pub struct JackBackend;

enum JackState {
    Inactive { client: Client, process: ProcessFn },
    Active(ActiveClient),
}

pub struct JackSession {
    state: Option<JackState>,
    inputs: Vec<String>,
}

impl Backend for JackBackend {
    type Session = JackSession;

    fn kind(&self) -> BackendKind {
        BackendKind::Professional
    }

    fn open(&self, params: &CaptureParams, mut sink: BlockSink) -> HearResult<JackSession> {
        let (client, status) = Client::new(&params.client_name, ClientOptions::empty())
            .map_err(HearError::ProfessionalOpen)?;

        if status.contains(ClientStatus::SERVER_STARTED) {
            info!("JACK server started");
        }
        if status.contains(ClientStatus::NAME_NOT_UNIQUE) {
            info!("unique name '{}' assigned", client.name());
        }

        let channels = params.channels as usize;
        let mut ports = Vec::with_capacity(channels);
        let mut inputs = Vec::with_capacity(channels);
        for index in 0..channels {
            let port = client.register_port(&input_port_name(index), AudioIn::default())?;
            inputs.push(port.name()?);
            ports.push(port);
        }

        info!(
            "JACK client '{}' registered {} input(s) at {}Hz, {} frames per cycle",
            client.name(),
            channels,
            client.sample_rate(),
            client.buffer_size()
        );

        let process: ProcessFn = Box::new(move |client: &Client, ps: &ProcessScope| {
            debug_assert_eq!(ports.len(), sink.channels());
            debug_assert_eq!(ps.n_frames(), client.buffer_size());

            if sink.deliver_planar(ports.iter().map(|port| port.as_slice(ps))) {
                Control::Continue
            } else {
                Control::Quit
            }
        });

        Ok(JackSession {
            state: Some(JackState::Inactive { client, process }),
            inputs,
        })
    }
}

impl JackSession {
    fn connect_physical_inputs(&self, client: &Client) {
        let audio = AudioIn::default();
        let sources = client.ports(
            None,
            Some(audio.jack_port_type()),
            PortFlags::IS_PHYSICAL | PortFlags::IS_OUTPUT,
        );

        if sources.is_empty() {
            warn!("No physical capture ports found, JACK inputs left unconnected");
            return;
        }

        let connected = connect_capture_ports(client, &sources, &self.inputs);
        info!(
            "Connected {}/{} JACK input(s) to physical capture ports",
            connected,
            self.inputs.len()
        );
    }

    fn release(&mut self) -> HearResult<()> {
        match self.state.take() {
            Some(JackState::Active(active)) => {
                let (client, _, _) = active.deactivate()?;
                debug!("JACK client deactivated");
                drop(client);
                debug!("JACK client closed");
            }
            Some(JackState::Inactive { client, .. }) => {
                drop(client);
                debug!("JACK client closed");
            }
            None => {}
        }
        Ok(())
    }
}

impl Session for JackSession {
    fn start(&mut self) -> HearResult<()> {
        match self.state.take() {
            Some(JackState::Inactive { client, process }) => {
                let active = client.activate_async((), ClosureProcessHandler::new(process))?;
                self.connect_physical_inputs(active.as_client());
                self.state = Some(JackState::Active(active));
                Ok(())
            }
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    fn close(mut self) -> HearResult<()> {
        self.release()
    }
}

impl Drop for JackSession {
    fn drop(&mut self) {
        if self.state.is_some() {
            debug!("Dropping open JackSession, cleaning up");
            if let Err(e) = self.release() {
                warn!("Failed to release JACK client: {}", e);
            }
        }
    }
}

/// Capture from JACK with the given client name, running `body` for the duration.
pub fn hear_professional<F, B>(
    callback: F,
    channels: u16,
    body: B,
    client_name: &str,
) -> HearResult<()>
where
    F: FnMut(&Block) -> anyhow::Result<()> + Send + 'static,
    B: FnOnce() -> anyhow::Result<()>,
{
    let params = CaptureParams {
        channels,
        client_name: client_name.to_string(),
        ..Default::default()
    };
    capture(&JackBackend, &params, callback, body, StopSignal::default())
}
