use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::geo::{GeolocationError, GeolocationSample};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GeolocationOperation {
    /// One reading of the current position. The shell answers with an
    /// unsupported error when the platform has no geolocation.
    CurrentPosition,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum GeolocationOutput {
    Position { lat: f64, lng: f64 },
    Error(GeolocationError),
}

impl Operation for GeolocationOperation {
    type Output = GeolocationOutput;
}

impl From<GeolocationOutput> for GeolocationSample {
    fn from(output: GeolocationOutput) -> Self {
        match output {
            GeolocationOutput::Position { lat, lng } => GeolocationSample::located(lat, lng),
            GeolocationOutput::Error(error) => GeolocationSample::failed(error),
        }
    }
}

pub struct Geolocation<Ev> {
    context: CapabilityContext<GeolocationOperation, Ev>,
}

impl<Ev> Capability<Ev> for Geolocation<Ev> {
    type Operation = GeolocationOperation;
    type MappedSelf<MappedEv> = Geolocation<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Geolocation::new(self.context.map_event(f))
    }
}

impl<Ev> Geolocation<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<GeolocationOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn current_position<F>(&self, callback: F)
    where
        F: FnOnce(GeolocationSample) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx
                .request_from_shell(GeolocationOperation::CurrentPosition)
                .await;
            ctx.update_app(callback(output.into()));
        });
    }
}
