pub mod backend;
pub mod block;
pub mod cpal_backend;
pub mod jack_backend;
pub mod probe;
pub mod quiet;
pub mod stop;

pub use backend::{capture, Backend, BackendKind, CaptureParams, Session};
pub use block::{deinterleave, interleave, Block, BlockCallback, BlockSink, FaultSlot};
pub use cpal_backend::{hear_general, CpalBackend, CpalSession};
pub use jack_backend::{hear_professional, JackBackend, JackSession};
pub use probe::{
    is_professional_backend_active, select_backend, CpalHostRegistry, HostApiRegistry,
};
pub use quiet::{quietly, suppress_output, QuietGuard, Streams};
pub use stop::{interrupt_signal, StopReason, StopSignal};
