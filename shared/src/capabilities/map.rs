use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::geo::LatLng;
use crate::route::{RouteId, RouteSummary};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MapOperation {
    FlyTo {
        center: LatLng,
        zoom: f64,
    },
    /// Ask the routing collaborator for a route and draw it under `route_id`.
    DrawRoute {
        route_id: RouteId,
        from: LatLng,
        to: LatLng,
    },
    RemoveRoute {
        route_id: RouteId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MapOutput {
    RouteDrawn(RouteSummary),
    RouteFailed { message: String },
}

impl Operation for MapOperation {
    type Output = MapOutput;
}

pub struct MapControl<Ev> {
    context: CapabilityContext<MapOperation, Ev>,
}

impl<Ev> Capability<Ev> for MapControl<Ev> {
    type Operation = MapOperation;
    type MappedSelf<MappedEv> = MapControl<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        MapControl::new(self.context.map_event(f))
    }
}

impl<Ev> MapControl<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<MapOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn fly_to(&self, center: LatLng, zoom: f64) {
        self.notify(MapOperation::FlyTo { center, zoom });
    }

    pub fn remove_route(&self, route_id: RouteId) {
        self.notify(MapOperation::RemoveRoute { route_id });
    }

    pub fn draw_route<F>(&self, route_id: RouteId, from: LatLng, to: LatLng, callback: F)
    where
        F: FnOnce(Result<RouteSummary, String>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx
                .request_from_shell(MapOperation::DrawRoute { route_id, from, to })
                .await;
            let result = match output {
                MapOutput::RouteDrawn(summary) => Ok(summary),
                MapOutput::RouteFailed { message } => Err(message),
            };
            ctx.update_app(callback(result));
        });
    }

    fn notify(&self, operation: MapOperation) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(operation).await;
        });
    }
}
