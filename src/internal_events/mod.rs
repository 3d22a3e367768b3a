//! Logs and metrics emitted while decoding.
//!
//! Every notable decode event is a struct implementing [`InternalEvent`]; the
//! `emit!` macro hands it to [`emit`], which writes the `tracing` record and
//! updates the `metrics` counters in one place.

mod ipfix;
mod prelude;

pub use self::ipfix::*;
pub use self::prelude::{error_stage, error_type, skip_reason};

pub trait InternalEvent: Sized {
    fn emit(self);

    fn name(&self) -> Option<&'static str> {
        None
    }
}

#[cfg(test)]
pub fn emit(event: impl InternalEvent) {
    if let Some(name) = event.name() {
        test_util::record_internal_event(name);
    }
    event.emit();
}

#[cfg(not(test))]
pub fn emit(event: impl InternalEvent) {
    event.emit();
}

macro_rules! emit {
    ($event:expr) => {
        $crate::internal_events::emit($event)
    };
}
